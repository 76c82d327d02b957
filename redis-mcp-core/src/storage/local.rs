/*!
Local filesystem storage adapter implementation.
*/

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use super::StorageAdapter;
use crate::{RedisMcpError, Result};

/// Local filesystem storage adapter
///
/// Writes go to a temporary file in the destination directory which is then
/// renamed over the target, so readers never observe a half-written
/// snapshot. Missing parent directories are created.
///
/// # Example
/// ```rust
/// use redis_mcp_core::storage::{LocalFileStorage, StorageAdapter};
/// use std::path::Path;
///
/// # let dir = tempfile::tempdir()?;
/// let storage = LocalFileStorage::with_base_dir(dir.path());
/// storage.save(b"{}", Path::new("nightly/backup.json"))?;
/// assert!(storage.exists(Path::new("nightly/backup.json")));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct LocalFileStorage {
    /// Optional base directory for relative snapshot paths
    base_dir: Option<PathBuf>,
}

impl LocalFileStorage {
    /// Paths provided to save/load are used as-is.
    pub fn new() -> Self {
        Self { base_dir: None }
    }

    /// Relative paths are resolved against `base_dir`.
    pub fn with_base_dir<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: Some(base_dir.as_ref().to_path_buf()),
        }
    }

    /// Resolve the full path for a given storage path
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) => base.join(path),
            None => path.to_path_buf(),
        }
    }

    fn ensure_dir(&self, dir: &Path) -> Result<()> {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            fs::create_dir_all(dir).map_err(|e| {
                RedisMcpError::storage(format!(
                    "Failed to create directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }
}

impl StorageAdapter for LocalFileStorage {
    fn save(&self, data: &[u8], path: &Path) -> Result<()> {
        let full_path = self.resolve_path(path);
        let dir = match full_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        self.ensure_dir(&dir)?;

        let write_error = |e: std::io::Error| {
            RedisMcpError::storage(format!(
                "Failed to write snapshot to {}: {}",
                full_path.display(),
                e
            ))
        };

        let mut temp = NamedTempFile::new_in(&dir).map_err(write_error)?;
        temp.write_all(data).map_err(write_error)?;
        temp.as_file().sync_all().map_err(write_error)?;
        temp.persist(&full_path).map_err(|e| write_error(e.error))?;

        debug!(path = %full_path.display(), bytes = data.len(), "snapshot file written");
        Ok(())
    }

    fn load(&self, path: &Path) -> Result<Vec<u8>> {
        let full_path = self.resolve_path(path);

        fs::read(&full_path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => RedisMcpError::NotFound(full_path.clone()),
            _ => RedisMcpError::storage(format!(
                "Failed to read snapshot from {}: {}",
                full_path.display(),
                e
            )),
        })
    }

    fn exists(&self, path: &Path) -> bool {
        self.resolve_path(path).is_file()
    }
}
