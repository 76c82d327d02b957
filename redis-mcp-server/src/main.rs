/*!
redis-mcp - Redis tool server with snapshot backup and restore.

`serve` (the default) speaks the tool protocol on stdin/stdout. The other
subcommands run a single backup, restore or snapshot inspection from the
command line.
*/

mod rpc;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use redis_mcp_core::observability::{init_logging, LogFormat};
use redis_mcp_core::{
    BackupEngine, BackupOptions, ConnectionConfig, KeyRecord, LocalFileStorage, RedisStore,
    RestoreEngine, RestoreOptions, SnapshotCodec, StorageAdapter, ToolRouter,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabled::{Table, Tabled};
use tracing::{error, info, warn};

use crate::rpc::RpcServer;

#[derive(Parser)]
#[command(name = "redis-mcp")]
#[command(about = "Redis tool server with snapshot backup and restore")]
#[command(version)]
struct Cli {
    /// Redis server host
    #[arg(long, global = true, env = "REDIS_HOST", default_value = "localhost")]
    host: String,

    /// Redis server port
    #[arg(long, global = true, env = "REDIS_PORT", default_value_t = 6379)]
    port: u16,

    /// Username for ACL authentication
    #[arg(long, global = true, env = "REDIS_USERNAME")]
    username: Option<String>,

    /// Password for authentication
    #[arg(long, global = true, env = "REDIS_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Database index
    #[arg(long, global = true, env = "REDIS_DB", default_value_t = 0)]
    db: i64,

    /// Connect over TLS
    #[arg(long, global = true)]
    tls: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log line format (text or json)
    #[arg(long, global = true, default_value = "text")]
    log_format: LogFormat,

    /// Print collected metrics to stderr when the command finishes
    #[cfg(feature = "metrics")]
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve tool calls over stdin/stdout (default)
    Serve {
        /// Skip connecting at startup; clients call connect_redis themselves
        #[arg(long)]
        no_connect: bool,
    },
    /// Back up matching keys to a snapshot file
    Backup {
        /// Snapshot file name (defaults to a timestamped name)
        #[arg(short, long)]
        filename: Option<String>,
        /// Backup directory
        #[arg(short, long)]
        path: Option<String>,
        /// Key patterns to include (repeatable)
        #[arg(short, long = "include")]
        include: Vec<String>,
        /// Key patterns to exclude (repeatable)
        #[arg(short, long = "exclude")]
        exclude: Vec<String>,
    },
    /// Restore a snapshot file into the database
    Restore {
        /// Snapshot file name
        filename: String,
        /// Backup directory
        #[arg(short, long)]
        path: Option<String>,
        /// Flush the database before restoring
        #[arg(long)]
        flush: bool,
    },
    /// Show the records stored in a snapshot file
    Inspect {
        /// Path to the snapshot file
        file: PathBuf,
    },
}

#[derive(Tabled)]
struct RecordInfo {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "TTL")]
    ttl: String,
    #[tabled(rename = "Size")]
    size: usize,
}

impl From<&KeyRecord> for RecordInfo {
    fn from(record: &KeyRecord) -> Self {
        Self {
            key: record.key.clone(),
            kind: record.kind().to_string(),
            ttl: match record.expiry() {
                Some(seconds) => format!("{seconds}s"),
                None => "none".to_string(),
            },
            size: record.value.len(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.log_format)?;

    let connection = connection_config(&cli);
    let command = cli.command.unwrap_or(Commands::Serve { no_connect: false });

    match command {
        Commands::Serve { no_connect } => serve(connection, no_connect).await?,
        Commands::Backup {
            filename,
            path,
            include,
            exclude,
        } => {
            let options = backup_options(filename, path, include, exclude);
            backup(&connection, &options).await?
        }
        Commands::Restore {
            filename,
            path,
            flush,
        } => {
            let options = RestoreOptions {
                filename,
                path,
                flush_before_restore: Some(flush),
            };
            restore(&connection, &options).await?
        }
        Commands::Inspect { file } => inspect(&file)?,
    }

    #[cfg(feature = "metrics")]
    {
        if cli.metrics {
            eprintln!("{}", redis_mcp_core::observability::gather_metrics()?);
        }
    }

    Ok(())
}

fn connection_config(cli: &Cli) -> ConnectionConfig {
    ConnectionConfig {
        host: cli.host.clone(),
        port: cli.port,
        username: cli.username.clone(),
        password: cli.password.clone(),
        db: cli.db,
        tls: cli.tls,
        ..ConnectionConfig::default()
    }
}

async fn serve(connection: ConnectionConfig, no_connect: bool) -> Result<(), anyhow::Error> {
    let mut router = ToolRouter::new();

    if !no_connect {
        let result = router.connect(connection).await;
        if let Some(message) = result.error {
            warn!("{message}; waiting for connect_redis");
        }
    }

    info!("redis-mcp serving on stdio");
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    RpcServer::new(router).run(stdin, stdout, shutdown).await
}

async fn backup(
    connection: &ConnectionConfig,
    options: &BackupOptions,
) -> Result<(), anyhow::Error> {
    let store = RedisStore::connect(connection).await?;
    let destination = options.destination(Utc::now());

    let report = BackupEngine::new(Arc::new(store))
        .backup(&options.patterns(), &destination)
        .await
        .with_context(|| format!("Backup failed: {}", destination.display()))?;

    println!("Backup completed successfully. Saved to {}", report.path.display());
    println!("  Keys captured: {}", report.captured);
    println!("  Keys skipped: {}", report.skipped);
    println!("  Size: {}", format_size(report.bytes as u64));
    Ok(())
}

async fn restore(
    connection: &ConnectionConfig,
    options: &RestoreOptions,
) -> Result<(), anyhow::Error> {
    let source = options.source()?;
    let store = RedisStore::connect(connection).await?;

    let report = RestoreEngine::new(Arc::new(store))
        .restore(&source, options.flush_first())
        .await
        .with_context(|| format!("Restore failed: {}", source.display()))?;

    println!("Restore completed successfully from {}", source.display());
    println!("  Records restored: {}", report.restored);
    println!("  Records skipped: {}", report.skipped);
    if report.failed > 0 {
        warn!(failed = report.failed, "some records could not be restored");
        println!("  Records failed: {}", report.failed);
    }
    Ok(())
}

fn inspect(file: &Path) -> Result<(), anyhow::Error> {
    let storage = LocalFileStorage::new();
    let bytes = storage.load(file)?;
    let snapshot = SnapshotCodec::new().decode(&bytes)?;

    println!("Snapshot: {}", file.display());
    println!("  Size: {}", format_size(bytes.len() as u64));
    match snapshot.created_at {
        Some(created_at) => println!("  Created: {}", created_at.format("%Y-%m-%d %H:%M:%S UTC")),
        None => println!("  Created: unknown (legacy format)"),
    }
    for (kind, count) in snapshot.kind_counts() {
        println!("  {kind}: {count}");
    }

    if snapshot.is_empty() {
        println!("No keys in snapshot");
    } else {
        let rows: Vec<RecordInfo> = snapshot.records().map(RecordInfo::from).collect();
        println!("{}", Table::new(rows));
    }
    Ok(())
}

fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Without any `--include` flag the whole keyspace is backed up
fn backup_options(
    filename: Option<String>,
    path: Option<String>,
    include: Vec<String>,
    exclude: Vec<String>,
) -> BackupOptions {
    BackupOptions {
        filename,
        path,
        include_patterns: (!include.is_empty()).then_some(include),
        exclude_patterns: Some(exclude),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults_to_serve() {
        let cli = Cli::try_parse_from(["redis-mcp"]).unwrap();
        assert!(cli.command.is_none());
        let config = connection_config(&cli);
        assert_eq!(config.port, 6379);
        assert_eq!(config.db, 0);
    }

    #[test]
    fn test_backup_flags() {
        let cli = Cli::try_parse_from([
            "redis-mcp", "--port", "6380", "backup", "-i", "user:*", "-e", "user:tmp*",
        ])
        .unwrap();
        assert_eq!(cli.port, 6380);
        match cli.command {
            Some(Commands::Backup { include, exclude, .. }) => {
                assert_eq!(include, vec!["user:*"]);
                assert_eq!(exclude, vec!["user:tmp*"]);
            }
            _ => panic!("expected backup command"),
        }
    }

    #[test]
    fn test_backup_without_include_covers_everything() {
        let options = backup_options(None, None, Vec::new(), vec!["tmp:*".to_string()]);
        assert_eq!(options.patterns().include, vec!["*".to_string()]);

        let options = backup_options(None, None, vec!["user:*".to_string()], Vec::new());
        assert_eq!(options.patterns().include, vec!["user:*".to_string()]);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
    }
}
