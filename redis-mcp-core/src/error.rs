/*!
Error types for the redis-mcp core.
*/

use std::path::PathBuf;
use thiserror::Error;

use crate::store::StoreError;

/// Result type used throughout the redis-mcp core.
pub type Result<T> = std::result::Result<T, RedisMcpError>;

/// Errors that can occur during backup, restore and tool dispatch.
#[derive(Error, Debug)]
pub enum RedisMcpError {
    /// Invalid caller-supplied settings (patterns, filenames, connection options)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Snapshot file does not exist
    #[error("Backup file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// I/O errors during file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Compression/decompression errors
    #[error("Compression error: {0}")]
    Compression(String),

    /// Structurally invalid snapshot document
    #[error("Invalid snapshot format: {0}")]
    InvalidFormat(String),

    /// Snapshot storage errors (directory creation, atomic writes)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Store client failures
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Flushing before a restore failed; no record was written
    #[error("Failed to flush database before restore: {0}")]
    FlushFailed(StoreError),
}

impl RedisMcpError {
    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a new compression error
    pub fn compression<S: Into<String>>(msg: S) -> Self {
        Self::Compression(msg.into())
    }

    /// Create a new storage error
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new invalid format error
    pub fn invalid_format<S: Into<String>>(msg: S) -> Self {
        Self::InvalidFormat(msg.into())
    }
}
