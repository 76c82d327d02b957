//! Configuration for store connections and snapshot operations
//!
//! Tool arguments and CLI flags both resolve into these structures. Backup and
//! restore options use camelCase on the wire, matching the tool schemas.

use chrono::{DateTime, Utc};
use redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::model::PatternSet;
use crate::{RedisMcpError, Result};

/// Directory used when a backup or restore names no path
pub const DEFAULT_BACKUP_DIR: &str = "./backups";

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    6379
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

fn default_max_retries() -> usize {
    redis_mcp_retry::DEFAULT_MAX_ATTEMPTS
}

/// Settings for opening a store connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub db: i64,
    #[serde(default)]
    pub tls: bool,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Connection attempts before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            username: None,
            password: None,
            db: 0,
            tls: false,
            connect_timeout_ms: default_connect_timeout_ms(),
            max_retries: default_max_retries(),
        }
    }
}

impl ConnectionConfig {
    pub fn new<S: Into<String>>(host: S, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(RedisMcpError::configuration("host must not be empty"));
        }
        if self.port == 0 {
            return Err(RedisMcpError::configuration("port must be between 1 and 65535"));
        }
        if self.db < 0 {
            return Err(RedisMcpError::configuration(format!(
                "database index must not be negative, got {}",
                self.db
            )));
        }
        if self.connect_timeout_ms == 0 {
            return Err(RedisMcpError::configuration(
                "connect timeout must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Connection URL without credentials, for logs and messages
    pub fn display_url(&self) -> String {
        let scheme = if self.tls { "rediss" } else { "redis" };
        format!("{scheme}://{}:{}/{}", self.host, self.port, self.db)
    }

    /// Build the `redis` crate's connection info
    pub fn to_connection_info(&self) -> Result<ConnectionInfo> {
        self.validate()?;
        let addr = if self.tls {
            ConnectionAddr::TcpTls {
                host: self.host.clone(),
                port: self.port,
                insecure: false,
                tls_params: None,
            }
        } else {
            ConnectionAddr::Tcp(self.host.clone(), self.port)
        };
        Ok(ConnectionInfo {
            addr,
            redis: RedisConnectionInfo {
                db: self.db,
                username: self.username.clone(),
                password: self.password.clone(),
                ..RedisConnectionInfo::default()
            },
        })
    }
}

/// Default snapshot file name for a backup taken at `now`
///
/// `redis-backup-2024-05-01T12-00-00-000Z.json`: an ISO-8601 UTC timestamp
/// with `:` and `.` replaced so the name is portable.
pub fn default_backup_filename(now: DateTime<Utc>) -> String {
    let stamp = now
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
        .replace([':', '.'], "-");
    format!("redis-backup-{stamp}.json")
}

/// Options for creating a backup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupOptions {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub include_patterns: Option<Vec<String>>,
    #[serde(default)]
    pub exclude_patterns: Option<Vec<String>>,
}

impl BackupOptions {
    /// Destination file, using the default directory and a timestamped
    /// name where none is given
    pub fn destination(&self, now: DateTime<Utc>) -> PathBuf {
        let dir = self.path.as_deref().unwrap_or(DEFAULT_BACKUP_DIR);
        let filename = self
            .filename
            .clone()
            .unwrap_or_else(|| default_backup_filename(now));
        PathBuf::from(dir).join(filename)
    }

    /// Absent include patterns mean everything, absent exclude patterns
    /// nothing. An explicit empty include list selects no keys.
    pub fn patterns(&self) -> PatternSet {
        let include = self
            .include_patterns
            .clone()
            .unwrap_or_else(|| vec!["*".to_string()]);
        PatternSet::new(include, self.exclude_patterns.clone().unwrap_or_default())
    }
}

/// Options for restoring a backup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreOptions {
    pub filename: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub flush_before_restore: Option<bool>,
}

impl RestoreOptions {
    pub fn new<S: Into<String>>(filename: S) -> Self {
        Self {
            filename: filename.into(),
            ..Self::default()
        }
    }

    /// Source file to read
    ///
    /// # Errors
    /// * `RedisMcpError::Configuration` - the filename is empty
    pub fn source(&self) -> Result<PathBuf> {
        if self.filename.trim().is_empty() {
            return Err(RedisMcpError::configuration(
                "a backup filename is required for restore",
            ));
        }
        let dir = self.path.as_deref().unwrap_or(DEFAULT_BACKUP_DIR);
        Ok(PathBuf::from(dir).join(&self.filename))
    }

    pub fn flush_first(&self) -> bool {
        self.flush_before_restore.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_connection_defaults() {
        let config = ConnectionConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 6379);
        assert_eq!(config.db, 0);
        assert_eq!(config.connect_timeout_ms, 5000);
        assert!(config.validate().is_ok());
        assert_eq!(config.display_url(), "redis://localhost:6379/0");
    }

    #[test]
    fn test_connection_from_tool_arguments() {
        let config: ConnectionConfig = serde_json::from_str(
            r#"{"host": "cache.internal", "port": 6380, "password": "s3cret", "db": 2, "tls": true}"#,
        )
        .unwrap();
        assert_eq!(config.host, "cache.internal");
        assert_eq!(config.max_retries, redis_mcp_retry::DEFAULT_MAX_ATTEMPTS);
        assert_eq!(config.display_url(), "rediss://cache.internal:6380/2");

        let info = config.to_connection_info().unwrap();
        assert_eq!(info.redis.db, 2);
        assert_eq!(info.redis.password.as_deref(), Some("s3cret"));
        assert!(matches!(info.addr, ConnectionAddr::TcpTls { port: 6380, .. }));
    }

    #[test]
    fn test_connection_validation() {
        let mut config = ConnectionConfig::new("", 6379);
        assert!(matches!(
            config.validate(),
            Err(RedisMcpError::Configuration(_))
        ));

        config.host = "localhost".to_string();
        config.db = -1;
        assert!(config.validate().is_err());

        config.db = 0;
        config.port = 0;
        assert!(config.to_connection_info().is_err());
    }

    #[test]
    fn test_default_backup_filename() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 45).unwrap();
        assert_eq!(
            default_backup_filename(now),
            "redis-backup-2024-05-01T12-30-45-000Z.json"
        );
    }

    #[test]
    fn test_backup_options_resolution() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let defaults = BackupOptions::default();
        assert_eq!(
            defaults.destination(now),
            PathBuf::from("./backups/redis-backup-2024-05-01T00-00-00-000Z.json")
        );
        assert_eq!(defaults.patterns(), PatternSet::default());

        let options: BackupOptions = serde_json::from_str(
            r#"{"filename": "nightly.json", "path": "/var/backups",
                "includePatterns": ["user:*"], "excludePatterns": ["user:tmp:*"]}"#,
        )
        .unwrap();
        assert_eq!(
            options.destination(now),
            PathBuf::from("/var/backups/nightly.json")
        );
        let patterns = options.patterns();
        assert_eq!(patterns.include, vec!["user:*".to_string()]);
        assert_eq!(patterns.exclude, vec!["user:tmp:*".to_string()]);
    }

    #[test]
    fn test_explicit_empty_include_selects_nothing() {
        let options: BackupOptions = serde_json::from_str(r#"{"includePatterns": []}"#).unwrap();
        let patterns = options.patterns();
        assert!(patterns.include.is_empty());
        assert!(patterns.exclude.is_empty());
    }

    #[test]
    fn test_restore_options() {
        let options: RestoreOptions = serde_json::from_str(
            r#"{"filename": "nightly.json", "flushBeforeRestore": true}"#,
        )
        .unwrap();
        assert_eq!(
            options.source().unwrap(),
            PathBuf::from("./backups/nightly.json")
        );
        assert!(options.flush_first());

        assert!(!RestoreOptions::new("x.json").flush_first());
        assert!(matches!(
            RestoreOptions::new("  ").source(),
            Err(RedisMcpError::Configuration(_))
        ));
    }
}
