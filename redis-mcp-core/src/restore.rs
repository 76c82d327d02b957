/*!
Restore engine: replay a snapshot file into the store.
*/

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::codec::SnapshotCodec;
use crate::model::{KeyRecord, Snapshot, TypedValue};
use crate::storage::{load_off_runtime, LocalFileStorage, StorageAdapter};
use crate::store::{KeyValueStore, StoreResult};
use crate::{RedisMcpError, Result};

/// Outcome of a completed restore
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    /// Snapshot file that was replayed; `None` for in-memory snapshots
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Records written, including their TTL
    pub restored: usize,
    /// Records whose value or TTL write failed
    pub failed: usize,
    /// Empty collections, for which there is nothing to write
    pub skipped: usize,
}

/// Replays snapshots into a store
///
/// Records are written one at a time in key order. A record whose write
/// fails is logged and counted; the rest of the snapshot still goes through.
pub struct RestoreEngine<S: StorageAdapter = LocalFileStorage> {
    store: Arc<dyn KeyValueStore>,
    storage: Arc<S>,
}

impl RestoreEngine<LocalFileStorage> {
    /// Engine reading snapshots from the local filesystem
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_storage(store, LocalFileStorage::new())
    }
}

impl<S: StorageAdapter + 'static> RestoreEngine<S> {
    pub fn with_storage(store: Arc<dyn KeyValueStore>, storage: S) -> Self {
        Self {
            store,
            storage: Arc::new(storage),
        }
    }

    /// Read, decode and replay the snapshot at `source`
    ///
    /// Nothing is sent to the store unless the whole file decodes.
    ///
    /// # Errors
    /// * `RedisMcpError::NotFound` - `source` does not exist
    /// * `RedisMcpError::Json` / `RedisMcpError::InvalidFormat` /
    ///   `RedisMcpError::Compression` - the file is not a valid snapshot
    /// * `RedisMcpError::FlushFailed` - `flush_first` was set and the flush failed
    pub async fn restore(&self, source: &Path, flush_first: bool) -> Result<RestoreReport> {
        let bytes = load_off_runtime(Arc::clone(&self.storage), source.to_path_buf()).await?;
        let snapshot = SnapshotCodec::new().decode(&bytes)?;
        debug!(path = %source.display(), records = snapshot.len(), "snapshot decoded");

        let mut report = self.apply(&snapshot, flush_first).await?;
        report.path = Some(source.to_path_buf());

        info!(
            path = %source.display(),
            restored = report.restored,
            failed = report.failed,
            skipped = report.skipped,
            "restore complete"
        );
        Ok(report)
    }

    /// Replay an in-memory snapshot
    pub async fn apply(&self, snapshot: &Snapshot, flush_first: bool) -> Result<RestoreReport> {
        let started = Instant::now();

        if flush_first {
            self.store
                .flushdb()
                .await
                .map_err(RedisMcpError::FlushFailed)?;
            debug!("database flushed before restore");
        }

        let mut report = RestoreReport::default();
        for record in snapshot.records() {
            match self.write_record(record).await {
                Ok(true) => report.restored += 1,
                Ok(false) => {
                    debug!(key = %record.key, kind = %record.kind(), "empty collection, nothing to write");
                    report.skipped += 1;
                }
                Err(e) => {
                    warn!(key = %record.key, kind = %record.kind(), error = %e, "record restore failed");
                    report.failed += 1;
                }
            }
        }

        #[cfg(feature = "metrics")]
        {
            if let Some(metrics) = crate::observability::SnapshotMetrics::global() {
                metrics.record_restore(report.restored, report.failed, started.elapsed());
            }
        }
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, "snapshot applied");

        Ok(report)
    }

    /// Write one record and its TTL; `Ok(false)` when there was nothing to write
    async fn write_record(&self, record: &KeyRecord) -> StoreResult<bool> {
        let key = record.key.as_str();
        let written = match &record.value {
            TypedValue::String(value) => {
                self.store.set(key, value, None).await?;
                true
            }
            TypedValue::Hash(fields) => {
                if fields.is_empty() {
                    false
                } else {
                    let pairs: Vec<(String, String)> = fields
                        .iter()
                        .map(|(field, value)| (field.clone(), value.clone()))
                        .collect();
                    self.store.hset_multiple(key, &pairs).await?;
                    true
                }
            }
            TypedValue::List(items) => {
                // Replace rather than append so repeated restores converge
                self.store.del(&[key.to_string()]).await?;
                if !items.is_empty() {
                    self.store.rpush(key, items).await?;
                }
                !items.is_empty()
            }
            TypedValue::Set(members) => {
                if members.is_empty() {
                    false
                } else {
                    let members: Vec<String> = members.iter().cloned().collect();
                    self.store.sadd(key, &members).await?;
                    true
                }
            }
            TypedValue::SortedSet(members) => {
                if members.is_empty() {
                    false
                } else {
                    self.store.zadd(key, members).await?;
                    true
                }
            }
        };

        if written {
            if let Some(seconds) = record.expiry() {
                self.store.expire(key, seconds).await?;
            }
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SortedSetMember;
    use crate::store::MemoryStore;
    use std::collections::BTreeMap;

    fn sample_snapshot() -> Snapshot {
        let mut fields = BTreeMap::new();
        fields.insert("name".to_string(), "ada".to_string());

        Snapshot::from_iter([
            KeyRecord::persistent("greeting", TypedValue::String("hello".into())),
            KeyRecord::new("session", 120, TypedValue::Hash(fields)),
            KeyRecord::persistent(
                "queue",
                TypedValue::List(vec!["a".into(), "b".into(), "c".into()]),
            ),
            KeyRecord::persistent(
                "board",
                TypedValue::SortedSet(vec![SortedSetMember::new("ada", 10.0)]),
            ),
            KeyRecord::persistent("empty", TypedValue::Set(Default::default())),
        ])
    }

    #[tokio::test]
    async fn test_apply_writes_every_kind() {
        let store = Arc::new(MemoryStore::new());
        let engine = RestoreEngine::new(store.clone());

        let report = engine.apply(&sample_snapshot(), false).await.unwrap();
        assert_eq!(report.restored, 4);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 0);

        assert_eq!(store.get("greeting").await.unwrap().as_deref(), Some("hello"));
        assert_eq!(store.lrange("queue", 0, -1).await.unwrap(), vec!["a", "b", "c"]);
        assert!(store.ttl("session").await.unwrap() > 0);
        assert_eq!(store.ttl("board").await.unwrap(), -1);
        assert_eq!(store.key_type("empty").await.unwrap(), "none");
    }

    #[tokio::test]
    async fn test_list_restore_replaces_existing_list() {
        let store = Arc::new(MemoryStore::new());
        store.rpush("queue", &["stale".to_string()]).await.unwrap();
        let engine = RestoreEngine::new(store.clone());

        engine.apply(&sample_snapshot(), false).await.unwrap();
        engine.apply(&sample_snapshot(), false).await.unwrap();
        assert_eq!(store.lrange("queue", 0, -1).await.unwrap(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_flush_failure_aborts_before_writes() {
        let store = Arc::new(MemoryStore::new());
        store.fail_on("flushdb", None).await;
        let engine = RestoreEngine::new(store.clone());

        let result = engine.apply(&sample_snapshot(), true).await;
        assert!(matches!(result, Err(RedisMcpError::FlushFailed(_))));
        assert_eq!(store.write_count().await, 0);
    }

    #[tokio::test]
    async fn test_failed_record_is_counted_and_skipped() {
        let store = Arc::new(MemoryStore::new());
        store.fail_on("hset_multiple", Some("session")).await;
        let engine = RestoreEngine::new(store.clone());

        let report = engine.apply(&sample_snapshot(), false).await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.restored, 3);
        assert_eq!(store.key_type("session").await.unwrap(), "none");
    }
}
