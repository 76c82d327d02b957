/*!
Logging and metrics setup.

Logs always go to stderr: stdout is reserved for the tool protocol. With the
`metrics` feature, backup and restore runs are counted in a Prometheus
registry that [`gather_metrics`] renders in the text exposition format.
*/

#[cfg(feature = "metrics")]
use prometheus::{Counter, Encoder, Histogram, HistogramOpts, Registry, TextEncoder};
#[cfg(feature = "metrics")]
use std::sync::OnceLock;
#[cfg(feature = "metrics")]
use std::time::Duration;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

use crate::{RedisMcpError, Result};

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = RedisMcpError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(RedisMcpError::configuration(format!(
                "unknown log format '{other}' (expected text or json)"
            ))),
        }
    }
}

fn env_filter(verbose: bool) -> EnvFilter {
    let default = if verbose { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence; otherwise the level is `info`, or `debug`
/// when `verbose` is set.
///
/// # Errors
/// * `RedisMcpError::Configuration` - a global subscriber is already installed
pub fn init_logging(verbose: bool, format: LogFormat) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().with_current_span(false).try_init(),
    };

    installed.map_err(|e| {
        RedisMcpError::configuration(format!("Failed to set global tracing subscriber: {e}"))
    })?;

    #[cfg(feature = "metrics")]
    SnapshotMetrics::global();

    Ok(())
}

#[cfg(feature = "metrics")]
static METRICS: OnceLock<Option<SnapshotMetrics>> = OnceLock::new();

/// Counters for backup and restore runs
#[cfg(feature = "metrics")]
#[derive(Debug)]
pub struct SnapshotMetrics {
    pub backups_total: Counter,
    pub restores_total: Counter,
    pub keys_captured_total: Counter,
    pub keys_skipped_total: Counter,
    pub records_restored_total: Counter,
    pub records_failed_total: Counter,
    pub snapshot_size_bytes: Histogram,
    pub backup_duration_seconds: Histogram,
    pub restore_duration_seconds: Histogram,

    registry: Registry,
}

#[cfg(feature = "metrics")]
fn counter(registry: &Registry, name: &str, help: &str) -> Result<Counter> {
    let counter = Counter::new(name, help)
        .map_err(|e| RedisMcpError::configuration(format!("Failed to create {name} metric: {e}")))?;
    registry
        .register(Box::new(counter.clone()))
        .map_err(|e| RedisMcpError::configuration(format!("Failed to register {name}: {e}")))?;
    Ok(counter)
}

#[cfg(feature = "metrics")]
fn histogram(registry: &Registry, opts: HistogramOpts) -> Result<Histogram> {
    let name = opts.common_opts.name.clone();
    let histogram = Histogram::with_opts(opts)
        .map_err(|e| RedisMcpError::configuration(format!("Failed to create {name} metric: {e}")))?;
    registry
        .register(Box::new(histogram.clone()))
        .map_err(|e| RedisMcpError::configuration(format!("Failed to register {name}: {e}")))?;
    Ok(histogram)
}

#[cfg(feature = "metrics")]
impl SnapshotMetrics {
    fn new() -> Result<Self> {
        let registry = Registry::new();

        Ok(Self {
            backups_total: counter(
                &registry,
                "redis_mcp_backups_total",
                "Snapshot files written",
            )?,
            restores_total: counter(
                &registry,
                "redis_mcp_restores_total",
                "Snapshot files replayed into the store",
            )?,
            keys_captured_total: counter(
                &registry,
                "redis_mcp_keys_captured_total",
                "Keys captured into snapshots",
            )?,
            keys_skipped_total: counter(
                &registry,
                "redis_mcp_keys_skipped_total",
                "Keys skipped during capture (unsupported type or fetch failure)",
            )?,
            records_restored_total: counter(
                &registry,
                "redis_mcp_records_restored_total",
                "Snapshot records written back to the store",
            )?,
            records_failed_total: counter(
                &registry,
                "redis_mcp_records_failed_total",
                "Snapshot records whose write failed",
            )?,
            snapshot_size_bytes: histogram(
                &registry,
                HistogramOpts::new("redis_mcp_snapshot_size_bytes", "Encoded snapshot size")
                    .buckets(prometheus::exponential_buckets(1024.0, 4.0, 10).unwrap_or_default()),
            )?,
            backup_duration_seconds: histogram(
                &registry,
                HistogramOpts::new(
                    "redis_mcp_backup_duration_seconds",
                    "Duration of backup runs in seconds",
                ),
            )?,
            restore_duration_seconds: histogram(
                &registry,
                HistogramOpts::new(
                    "redis_mcp_restore_duration_seconds",
                    "Duration of restore runs in seconds",
                ),
            )?,
            registry,
        })
    }

    /// Shared instance, or `None` if the registry could not be built
    pub fn global() -> Option<&'static SnapshotMetrics> {
        METRICS
            .get_or_init(|| match Self::new() {
                Ok(metrics) => Some(metrics),
                Err(e) => {
                    tracing::warn!(error = %e, "metrics disabled");
                    None
                }
            })
            .as_ref()
    }

    pub fn record_backup(&self, captured: usize, skipped: usize, bytes: usize, elapsed: Duration) {
        self.backups_total.inc();
        self.keys_captured_total.inc_by(captured as f64);
        self.keys_skipped_total.inc_by(skipped as f64);
        self.snapshot_size_bytes.observe(bytes as f64);
        self.backup_duration_seconds.observe(elapsed.as_secs_f64());
    }

    pub fn record_restore(&self, restored: usize, failed: usize, elapsed: Duration) {
        self.restores_total.inc();
        self.records_restored_total.inc_by(restored as f64);
        self.records_failed_total.inc_by(failed as f64);
        self.restore_duration_seconds.observe(elapsed.as_secs_f64());
    }

    /// Gather metrics in Prometheus format
    pub fn gather(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| RedisMcpError::storage(format!("Failed to encode metrics: {e}")))?;
        String::from_utf8(buffer)
            .map_err(|e| RedisMcpError::storage(format!("Failed to convert metrics to string: {e}")))
    }
}

/// Render all snapshot metrics; empty when the registry is unavailable
#[cfg(feature = "metrics")]
pub fn gather_metrics() -> Result<String> {
    match SnapshotMetrics::global() {
        Some(metrics) => metrics.gather(),
        None => Ok(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!(matches!(
            "xml".parse::<LogFormat>(),
            Err(RedisMcpError::Configuration(_))
        ));
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn test_metrics_gathering() {
        let metrics = SnapshotMetrics::global().expect("registry builds");
        metrics.record_backup(3, 1, 2048, Duration::from_millis(5));
        metrics.record_restore(3, 0, Duration::from_millis(5));

        let text = gather_metrics().unwrap();
        assert!(text.contains("redis_mcp_backups_total"));
        assert!(text.contains("redis_mcp_records_restored_total"));
    }
}
