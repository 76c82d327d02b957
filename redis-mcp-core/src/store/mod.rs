/*!
Key-value store client abstraction.

[`KeyValueStore`] is the capability set the engines and the tool layer use.
Each method is one round trip to the store. [`RedisStore`] talks to a real
server; [`MemoryStore`] keeps everything in-process.
*/

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use redis_mcp_retry::RetryableError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::model::SortedSetMember;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

/// Result type for store client calls
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failures reported by a store client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Connection lost, refused or never established
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("not connected to the store")]
    NotConnected,

    #[error("operation timed out after {0} ms")]
    Timeout(u64),

    /// Operation against a key holding the wrong kind of value
    #[error("WRONGTYPE operation against key '{0}' holding the wrong kind of value")]
    WrongType(String),

    /// The store rejected the command
    #[error("command failed: {0}")]
    Command(String),
}

impl StoreError {
    pub fn unavailable<S: Into<String>>(msg: S) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn command<S: Into<String>>(msg: S) -> Self {
        Self::Command(msg.into())
    }
}

impl RetryableError for StoreError {
    fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Timeout(_))
    }
}

/// Type and TTL of a single key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    pub key: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub ttl: i64,
}

/// Typed operations against a key-value store
///
/// List and sorted-set ranges use store semantics: `start`/`stop` are
/// inclusive and negative indexes count from the end.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    // ---- keys ----

    /// Keys matching a glob pattern
    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>>;

    /// Store type name (`string`, `hash`, `list`, `set`, `zset`, `none`, ...)
    async fn key_type(&self, key: &str) -> StoreResult<String>;

    /// Remaining seconds; -1 when persistent, -2 when the key does not exist
    async fn ttl(&self, key: &str) -> StoreResult<i64>;

    async fn expire(&self, key: &str, seconds: u64) -> StoreResult<bool>;

    /// Delete keys, returning how many existed
    async fn del(&self, keys: &[String]) -> StoreResult<i64>;

    // ---- strings ----

    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    async fn set(&self, key: &str, value: &str, expire_seconds: Option<u64>) -> StoreResult<()>;

    async fn incr_by(&self, key: &str, delta: i64) -> StoreResult<i64>;

    async fn decr_by(&self, key: &str, delta: i64) -> StoreResult<i64>;

    async fn mset(&self, pairs: &[(String, String)]) -> StoreResult<()>;

    async fn mget(&self, keys: &[String]) -> StoreResult<Vec<Option<String>>>;

    // ---- hashes ----

    /// Set one field, returning 1 if it was new
    async fn hset(&self, key: &str, field: &str, value: &str) -> StoreResult<i64>;

    /// Set several fields in one call, returning how many were new
    async fn hset_multiple(&self, key: &str, fields: &[(String, String)]) -> StoreResult<i64>;

    async fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>>;

    async fn hgetall(&self, key: &str) -> StoreResult<BTreeMap<String, String>>;

    async fn hdel(&self, key: &str, fields: &[String]) -> StoreResult<i64>;

    // ---- lists ----

    /// Prepend values, returning the new length
    async fn lpush(&self, key: &str, values: &[String]) -> StoreResult<i64>;

    /// Append values, returning the new length
    async fn rpush(&self, key: &str, values: &[String]) -> StoreResult<i64>;

    /// Pop from the head; `count` of `None` pops a single element
    async fn lpop(&self, key: &str, count: Option<usize>) -> StoreResult<Vec<String>>;

    async fn rpop(&self, key: &str, count: Option<usize>) -> StoreResult<Vec<String>>;

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>>;

    // ---- sets ----

    async fn sadd(&self, key: &str, members: &[String]) -> StoreResult<i64>;

    async fn srem(&self, key: &str, members: &[String]) -> StoreResult<i64>;

    async fn smembers(&self, key: &str) -> StoreResult<Vec<String>>;

    // ---- sorted sets ----

    async fn zadd(&self, key: &str, members: &[SortedSetMember]) -> StoreResult<i64>;

    async fn zrem(&self, key: &str, members: &[String]) -> StoreResult<i64>;

    async fn zrange(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>>;

    async fn zrange_withscores(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> StoreResult<Vec<SortedSetMember>>;

    // ---- database ----

    async fn flushdb(&self) -> StoreResult<()>;

    async fn flushall(&self) -> StoreResult<()>;

    // ---- composed ----

    /// Type and TTL of a key
    async fn key_info(&self, key: &str) -> StoreResult<KeyInfo> {
        let kind = self.key_type(key).await?;
        let ttl = self.ttl(key).await?;
        Ok(KeyInfo {
            key: key.to_string(),
            kind,
            ttl,
        })
    }

    /// Delete every key matching a pattern, returning how many were removed
    async fn delete_by_pattern(&self, pattern: &str) -> StoreResult<i64> {
        let keys = self.keys(pattern).await?;
        if keys.is_empty() {
            return Ok(0);
        }
        self.del(&keys).await
    }
}
