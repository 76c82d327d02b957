/*!
# redis-mcp core

Store client, tool dispatcher and snapshot engine behind the `redis-mcp`
tool server.

This crate provides:

- A [`KeyValueStore`] trait with a Redis implementation ([`RedisStore`]) and
  an in-memory one ([`MemoryStore`]) used in tests
- The tool catalog and [`ToolRouter`], which turns tool calls into store
  calls and wraps every answer in an [`OperationResult`]
- Backup and restore of typed key data to JSON snapshot files, optionally
  gzip-compressed, through [`BackupEngine`] and [`RestoreEngine`]

## Usage

```rust
use redis_mcp_core::{BackupEngine, MemoryStore, PatternSet, RestoreEngine};
use redis_mcp_core::store::KeyValueStore;
use std::sync::Arc;

# let rt = tokio::runtime::Runtime::new().unwrap();
# rt.block_on(async {
let dir = tempfile::tempdir().unwrap();
let path = dir.path().join("backup.json");

let source = Arc::new(MemoryStore::new());
source.set("user:1", "ada", None).await.unwrap();
BackupEngine::new(source).backup(&PatternSet::default(), &path).await.unwrap();

let target = Arc::new(MemoryStore::new());
let report = RestoreEngine::new(target.clone()).restore(&path, false).await.unwrap();
assert_eq!(report.restored, 1);
assert_eq!(target.get("user:1").await.unwrap().as_deref(), Some("ada"));
# });
```
*/

pub mod backup;
pub mod codec;
pub mod compression;
pub mod config;
pub mod error;
pub mod glob;
pub mod model;
pub mod observability;
pub mod restore;
pub mod service;
pub mod storage;
pub mod store;
pub mod tools;

#[cfg(test)]
mod error_tests;

pub use backup::{BackupEngine, BackupReport};
pub use codec::SnapshotCodec;
pub use config::{BackupOptions, ConnectionConfig, RestoreOptions};
pub use error::{RedisMcpError, Result};
pub use model::{KeyRecord, PatternSet, Snapshot, SortedSetMember, TypeKind, TypedValue};
pub use restore::{RestoreEngine, RestoreReport};
pub use service::{OperationResult, SnapshotService};
pub use storage::{LocalFileStorage, StorageAdapter};
pub use store::{KeyValueStore, MemoryStore, RedisStore, StoreError};
pub use tools::{ToolError, ToolResponse, ToolRouter};
