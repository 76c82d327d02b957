/*!
Compression adapters for snapshot files.

Snapshots are plain indented JSON by default. Files whose name ends in `.gz`
are gzip-compressed; decoding recognizes gzip input by its magic bytes, so a
reader never needs to know how a file was written.
*/

use crate::{RedisMcpError, Result};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use std::io::{Read, Write};
use std::path::Path;

/// Leading bytes of every gzip member
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Compression abstraction for snapshot data
pub trait CompressionAdapter: Send + Sync {
    /// Compress the input data
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Decompress the input data
    fn decompress(&self, compressed_data: &[u8]) -> Result<Vec<u8>>;

    /// Get the name of the compression algorithm
    fn algorithm_name(&self) -> &str;
}

/// Gzip compression adapter
///
/// # Example
/// ```rust
/// use redis_mcp_core::compression::{CompressionAdapter, GzipCompressor};
///
/// let compressor = GzipCompressor::new();
/// let data = b"{\"version\": 1, \"keys\": {}}";
/// let compressed = compressor.compress(data)?;
/// let decompressed = compressor.decompress(&compressed)?;
/// assert_eq!(data, &decompressed[..]);
/// # Ok::<(), redis_mcp_core::RedisMcpError>(())
/// ```
#[derive(Debug, Clone)]
pub struct GzipCompressor {
    compression_level: Compression,
}

impl GzipCompressor {
    /// Create a new gzip compressor with default compression level (6)
    pub fn new() -> Self {
        Self {
            compression_level: Compression::default(),
        }
    }

    /// Create a new gzip compressor with the specified level (0-9)
    pub fn with_level(level: u32) -> Self {
        Self {
            compression_level: Compression::new(level.min(9)),
        }
    }
}

impl Default for GzipCompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressionAdapter for GzipCompressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), self.compression_level);

        encoder.write_all(data).map_err(|e| {
            RedisMcpError::compression(format!("Failed to write data for compression: {e}"))
        })?;

        encoder
            .finish()
            .map_err(|e| RedisMcpError::compression(format!("Failed to finish compression: {e}")))
    }

    fn decompress(&self, compressed_data: &[u8]) -> Result<Vec<u8>> {
        let mut decoder = GzDecoder::new(compressed_data);
        let mut decompressed = Vec::new();

        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| RedisMcpError::compression(format!("Failed to decompress data: {e}")))?;

        Ok(decompressed)
    }

    fn algorithm_name(&self) -> &str {
        "gzip"
    }
}

/// Pass-through adapter for human-readable snapshots
#[derive(Debug, Clone, Default)]
pub struct NoCompression;

impl NoCompression {
    pub fn new() -> Self {
        Self
    }
}

impl CompressionAdapter for NoCompression {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn decompress(&self, compressed_data: &[u8]) -> Result<Vec<u8>> {
        Ok(compressed_data.to_vec())
    }

    fn algorithm_name(&self) -> &str {
        "none"
    }
}

pub fn is_gzip(data: &[u8]) -> bool {
    data.starts_with(&GZIP_MAGIC)
}

/// Pick the compressor for a destination file from its extension
pub fn for_path(path: &Path) -> Box<dyn CompressionAdapter> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("gz") => Box::new(GzipCompressor::new()),
        _ => Box::new(NoCompression::new()),
    }
}
