/*!
Backup engine: capture matching keys from the store into a snapshot file.
*/

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::codec::SnapshotCodec;
use crate::glob::GlobSet;
use crate::model::{KeyRecord, PatternSet, Snapshot, TypeKind, TypedValue, NO_EXPIRY};
use crate::storage::{save_off_runtime, LocalFileStorage, StorageAdapter};
use crate::store::{KeyValueStore, StoreResult};
use crate::Result;

/// Default number of keys fetched concurrently
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Outcome of a completed backup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupReport {
    /// File the snapshot was written to
    pub path: PathBuf,
    /// Keys written to the snapshot
    pub captured: usize,
    /// Selected keys left out (unsupported type, vanished, or fetch failure)
    pub skipped: usize,
    /// Encoded snapshot size
    pub bytes: usize,
}

/// Captures keys from a store and writes them as a snapshot document
///
/// ```rust
/// use redis_mcp_core::{BackupEngine, MemoryStore, PatternSet};
/// use redis_mcp_core::store::KeyValueStore;
/// use std::sync::Arc;
///
/// # let rt = tokio::runtime::Runtime::new().unwrap();
/// # rt.block_on(async {
/// let store = Arc::new(MemoryStore::new());
/// store.set("user:1", "ada", None).await.unwrap();
///
/// let engine = BackupEngine::new(store);
/// let snapshot = engine.capture(&PatternSet::include("user:*")).await.unwrap();
/// assert!(snapshot.contains_key("user:1"));
/// # });
/// ```
pub struct BackupEngine<S: StorageAdapter = LocalFileStorage> {
    store: Arc<dyn KeyValueStore>,
    storage: Arc<S>,
    concurrency: usize,
}

impl BackupEngine<LocalFileStorage> {
    /// Engine writing snapshots to the local filesystem
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_storage(store, LocalFileStorage::new())
    }
}

impl<S: StorageAdapter + 'static> BackupEngine<S> {
    pub fn with_storage(store: Arc<dyn KeyValueStore>, storage: S) -> Self {
        Self {
            store,
            storage: Arc::new(storage),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Bound on keys fetched at once; values below 1 are treated as 1
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Capture matching keys and write them to `destination`
    ///
    /// The file is written atomically: after an error the destination holds
    /// its previous content, or nothing.
    ///
    /// # Errors
    /// * `RedisMcpError::Configuration` - a pattern is malformed
    /// * `RedisMcpError::Storage` - the directory or file cannot be written
    /// * `RedisMcpError::Json` / `RedisMcpError::Compression` - encoding failed
    pub async fn backup(&self, patterns: &PatternSet, destination: &Path) -> Result<BackupReport> {
        let started = Instant::now();
        let (snapshot, skipped) = self.collect(patterns).await?;

        let codec = SnapshotCodec::for_path(destination);
        let bytes = codec.encode(&snapshot)?;
        let size = bytes.len();
        save_off_runtime(Arc::clone(&self.storage), bytes, destination.to_path_buf()).await?;

        let report = BackupReport {
            path: destination.to_path_buf(),
            captured: snapshot.len(),
            skipped,
            bytes: size,
        };

        #[cfg(feature = "metrics")]
        {
            if let Some(metrics) = crate::observability::SnapshotMetrics::global() {
                metrics.record_backup(report.captured, report.skipped, report.bytes, started.elapsed());
            }
        }

        info!(
            path = %destination.display(),
            captured = report.captured,
            skipped = report.skipped,
            bytes = report.bytes,
            compression = codec.algorithm_name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "backup written"
        );
        Ok(report)
    }

    /// Capture matching keys into an in-memory snapshot
    pub async fn capture(&self, patterns: &PatternSet) -> Result<Snapshot> {
        let (snapshot, _) = self.collect(patterns).await?;
        Ok(snapshot)
    }

    async fn collect(&self, patterns: &PatternSet) -> Result<(Snapshot, usize)> {
        // Reject malformed patterns before touching the store
        GlobSet::compile(&patterns.include)?;
        let excludes = GlobSet::compile(&patterns.exclude)?;

        let mut candidates = BTreeSet::new();
        for pattern in &patterns.include {
            match self.store.keys(pattern).await {
                Ok(keys) => candidates.extend(keys),
                Err(e) => warn!(pattern = %pattern, error = %e, "key listing failed, pattern skipped"),
            }
        }

        let selected: Vec<String> = candidates
            .into_iter()
            .filter(|key| !excludes.matches_any(key))
            .collect();
        let total = selected.len();
        debug!(selected = total, "keys selected for backup");

        let records: Vec<Option<KeyRecord>> = stream::iter(selected)
            .map(|key| self.fetch_record(key))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut snapshot = Snapshot::now();
        for record in records.into_iter().flatten() {
            snapshot.insert(record);
        }
        let skipped = total - snapshot.len();
        Ok((snapshot, skipped))
    }

    /// Fetch one key; `None` means the key is left out of the snapshot
    async fn fetch_record(&self, key: String) -> Option<KeyRecord> {
        let type_name = match self.store.key_type(&key).await {
            Ok(name) => name,
            Err(e) => {
                warn!(key = %key, error = %e, "type lookup failed, key skipped");
                return None;
            }
        };

        let Some(kind) = TypeKind::from_store_name(&type_name) else {
            warn!(key = %key, store_type = %type_name, "unsupported type, key skipped");
            return None;
        };

        let value = match self.fetch_value(&key, kind).await {
            Ok(Some(value)) => value,
            Ok(None) => {
                debug!(key = %key, "key vanished during backup");
                return None;
            }
            Err(e) => {
                warn!(key = %key, kind = %kind, error = %e, "value fetch failed, key skipped");
                return None;
            }
        };

        let ttl = match self.store.ttl(&key).await {
            Ok(ttl) => ttl,
            Err(e) => {
                warn!(key = %key, error = %e, "ttl lookup failed, recording no expiry");
                NO_EXPIRY
            }
        };

        Some(KeyRecord::new(key, ttl, value))
    }

    async fn fetch_value(&self, key: &str, kind: TypeKind) -> StoreResult<Option<TypedValue>> {
        let value = match kind {
            TypeKind::String => match self.store.get(key).await? {
                Some(value) => TypedValue::String(value),
                None => return Ok(None),
            },
            TypeKind::Hash => TypedValue::Hash(self.store.hgetall(key).await?),
            TypeKind::List => TypedValue::List(self.store.lrange(key, 0, -1).await?),
            TypeKind::Set => TypedValue::Set(self.store.smembers(key).await?.into_iter().collect()),
            TypeKind::SortedSet => {
                TypedValue::SortedSet(self.store.zrange_withscores(key, 0, -1).await?)
            }
        };
        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::RedisMcpError;
    use tempfile::TempDir;

    async fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.set("user:1", "ada", None).await.unwrap();
        store.set("user:2", "grace", Some(300)).await.unwrap();
        store
            .hset_multiple(
                "profile:1",
                &[("name".to_string(), "ada".to_string())],
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_capture_selects_and_excludes() {
        let store = seeded_store().await;
        let engine = BackupEngine::new(store);

        let snapshot = engine
            .capture(&PatternSet::include("user:*").excluding("user:2"))
            .await
            .unwrap();
        assert_eq!(snapshot.keys().collect::<Vec<_>>(), vec!["user:1"]);
    }

    #[tokio::test]
    async fn test_capture_records_ttl() {
        let store = seeded_store().await;
        let engine = BackupEngine::new(store).with_concurrency(1);

        let snapshot = engine.capture(&PatternSet::default()).await.unwrap();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.get("user:1").unwrap().ttl, NO_EXPIRY);
        let ttl = snapshot.get("user:2").unwrap().ttl;
        assert!(ttl > 0 && ttl <= 300);
    }

    #[tokio::test]
    async fn test_malformed_pattern_is_rejected() {
        let store = seeded_store().await;
        let engine = BackupEngine::new(store);

        let result = engine.capture(&PatternSet::include("user:[")).await;
        assert!(matches!(result, Err(RedisMcpError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_backup_reports_counts() {
        let temp_dir = TempDir::new().unwrap();
        let store = seeded_store().await;
        store.insert_unsupported("events", "stream").await;
        let engine = BackupEngine::new(store);

        let destination = temp_dir.path().join("out/backup.json");
        let report = engine
            .backup(&PatternSet::default(), &destination)
            .await
            .unwrap();

        assert_eq!(report.captured, 3);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.path, destination);
        assert_eq!(std::fs::metadata(&destination).unwrap().len() as usize, report.bytes);
    }

    /// Remembers which thread performed each write
    #[derive(Default)]
    struct ThreadRecordingStorage {
        writer: std::sync::Mutex<Option<std::thread::ThreadId>>,
    }

    impl StorageAdapter for ThreadRecordingStorage {
        fn save(&self, _data: &[u8], _path: &Path) -> Result<()> {
            *self.writer.lock().unwrap() = Some(std::thread::current().id());
            Ok(())
        }

        fn load(&self, path: &Path) -> Result<Vec<u8>> {
            Err(RedisMcpError::NotFound(path.to_path_buf()))
        }

        fn exists(&self, _path: &Path) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn test_snapshot_write_runs_on_blocking_pool() {
        let store = seeded_store().await;
        let engine = BackupEngine::with_storage(store, ThreadRecordingStorage::default());

        engine
            .backup(&PatternSet::default(), Path::new("unused.json"))
            .await
            .unwrap();

        let writer = engine.storage.writer.lock().unwrap().unwrap();
        assert_ne!(writer, std::thread::current().id());
    }

    #[tokio::test]
    async fn test_empty_include_list_selects_nothing() {
        let store = seeded_store().await;
        let engine = BackupEngine::new(store);

        let snapshot = engine
            .capture(&PatternSet::new(Vec::new(), Vec::new()))
            .await
            .unwrap();
        assert!(snapshot.is_empty());
    }
}
