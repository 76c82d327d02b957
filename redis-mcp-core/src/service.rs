/*!
Structured results and the snapshot service.

Every tool answers with an [`OperationResult`]; engine and store errors are
converted into its `error` field here, so nothing raw crosses the tool
boundary.
*/

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::backup::{BackupEngine, DEFAULT_CONCURRENCY};
use crate::config::{BackupOptions, RestoreOptions};
use crate::restore::RestoreEngine;
use crate::store::{KeyValueStore, StoreResult};
use crate::RedisMcpError;

/// `{success, data?, error?}` result returned by every tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> OperationResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err<S: Into<String>>(message: S) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    /// Wrap a store call's outcome
    pub fn from_store(result: StoreResult<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::err(format!("Redis operation failed: {e}")),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> OperationResult<U> {
        OperationResult {
            success: self.success,
            data: self.data.map(f),
            error: self.error,
        }
    }
}

/// Backup and restore with option defaults applied
#[derive(Clone)]
pub struct SnapshotService {
    store: Arc<dyn KeyValueStore>,
    concurrency: usize,
}

impl SnapshotService {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Create a backup; the message names the written file
    pub async fn backup(&self, options: &BackupOptions) -> OperationResult<String> {
        let destination = options.destination(Utc::now());
        let engine = BackupEngine::new(self.store.clone()).with_concurrency(self.concurrency);

        match engine.backup(&options.patterns(), &destination).await {
            Ok(report) => OperationResult::ok(format!(
                "Backup completed successfully. Saved to {}",
                report.path.display()
            )),
            Err(e) => {
                warn!(path = %destination.display(), error = %e, "backup failed");
                OperationResult::err(format!("Backup failed: {e}"))
            }
        }
    }

    /// Restore a backup; the message names the source file
    pub async fn restore(&self, options: &RestoreOptions) -> OperationResult<String> {
        let source = match options.source() {
            Ok(source) => source,
            Err(e) => return OperationResult::err(format!("Restore failed: {e}")),
        };
        let engine = RestoreEngine::new(self.store.clone());

        match engine.restore(&source, options.flush_first()).await {
            Ok(_) => OperationResult::ok(format!(
                "Restore completed successfully from {}",
                source.display()
            )),
            Err(e @ (RedisMcpError::NotFound(_) | RedisMcpError::FlushFailed(_))) => {
                warn!(path = %source.display(), error = %e, "restore rejected");
                OperationResult::err(e.to_string())
            }
            Err(e) => {
                warn!(path = %source.display(), error = %e, "restore failed");
                OperationResult::err(format!("Restore failed: {e}"))
            }
        }
    }
}
