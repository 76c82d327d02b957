/*!
Storage adapters for snapshot files.

Engines read and write snapshot bytes through [`StorageAdapter`], keeping the
backup and restore logic independent of where documents live.
*/

pub mod local;

use crate::{RedisMcpError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use local::LocalFileStorage;

/// Storage abstraction for saving and loading snapshot data
pub trait StorageAdapter: Send + Sync {
    /// Save snapshot data to the specified location
    ///
    /// Implementations must be all-or-nothing: after an error the location
    /// holds either its previous content or nothing.
    fn save(&self, data: &[u8], path: &Path) -> Result<()>;

    /// Load snapshot data from the specified location
    ///
    /// # Errors
    /// * `RedisMcpError::NotFound` - nothing exists at `path`
    fn load(&self, path: &Path) -> Result<Vec<u8>>;

    /// Check if a snapshot exists at the specified location
    fn exists(&self, path: &Path) -> bool;
}

/// Run `save` on the blocking pool so file syncs never stall async workers
pub(crate) async fn save_off_runtime<S>(storage: Arc<S>, data: Vec<u8>, path: PathBuf) -> Result<()>
where
    S: StorageAdapter + ?Sized + 'static,
{
    tokio::task::spawn_blocking(move || storage.save(&data, &path))
        .await
        .map_err(|e| RedisMcpError::storage(format!("snapshot write task failed: {e}")))?
}

/// Run `load` on the blocking pool
pub(crate) async fn load_off_runtime<S>(storage: Arc<S>, path: PathBuf) -> Result<Vec<u8>>
where
    S: StorageAdapter + ?Sized + 'static,
{
    tokio::task::spawn_blocking(move || storage.load(&path))
        .await
        .map_err(|e| RedisMcpError::storage(format!("snapshot read task failed: {e}")))?
}
