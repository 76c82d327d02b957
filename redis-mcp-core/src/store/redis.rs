/*!
Store client backed by a Redis server.
*/

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError};
use redis_mcp_retry::with_backoff;
use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::time::Duration;
use tracing::{debug, info};

use super::{KeyValueStore, StoreError, StoreResult};
use crate::config::ConnectionConfig;
use crate::model::SortedSetMember;
use crate::{RedisMcpError, Result};

impl From<RedisError> for StoreError {
    fn from(err: RedisError) -> Self {
        if err.is_connection_dropped()
            || err.is_connection_refusal()
            || err.is_io_error()
            || err.is_timeout()
        {
            StoreError::Unavailable(err.to_string())
        } else {
            StoreError::Command(err.to_string())
        }
    }
}

/// [`KeyValueStore`] over a multiplexed, auto-reconnecting connection
///
/// Cloning is cheap; clones share the underlying connection.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
    url: String,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore").field("url", &self.url).finish()
    }
}

impl RedisStore {
    /// Open a connection, retrying transient failures with backoff
    ///
    /// Each attempt is bounded by `connect_timeout_ms`.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let info = config.to_connection_info()?;
        let client = Client::open(info).map_err(StoreError::from)?;
        let timeout = Duration::from_millis(config.connect_timeout_ms);
        let url = config.display_url();

        let manager = with_backoff("connect", config.max_retries, |attempt| {
            let client = client.clone();
            let url = url.as_str();
            async move {
                debug!(url, attempt, "opening store connection");
                match tokio::time::timeout(timeout, ConnectionManager::new(client)).await {
                    Ok(result) => result.map_err(StoreError::from),
                    Err(_) => Err(StoreError::Timeout(timeout.as_millis() as u64)),
                }
            }
        })
        .await
        .map_err(|e| RedisMcpError::Store(e.into_inner()))?;

        info!(url = %url, "connected to store");
        Ok(Self { manager, url })
    }

    /// Connection URL without credentials
    pub fn url(&self) -> &str {
        &self.url
    }

    fn conn(&self) -> ConnectionManager {
        self.manager.clone()
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>> {
        let keys: Vec<String> = self.conn().keys(pattern).await?;
        Ok(keys)
    }

    async fn key_type(&self, key: &str) -> StoreResult<String> {
        let kind: String = self.conn().key_type(key).await?;
        Ok(kind)
    }

    async fn ttl(&self, key: &str) -> StoreResult<i64> {
        let ttl: i64 = self.conn().ttl(key).await?;
        Ok(ttl)
    }

    async fn expire(&self, key: &str, seconds: u64) -> StoreResult<bool> {
        let seconds = i64::try_from(seconds).unwrap_or(i64::MAX);
        let applied: bool = self.conn().expire(key, seconds).await?;
        Ok(applied)
    }

    async fn del(&self, keys: &[String]) -> StoreResult<i64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let removed: i64 = self.conn().del(keys).await?;
        Ok(removed)
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let value: Option<String> = self.conn().get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, expire_seconds: Option<u64>) -> StoreResult<()> {
        let mut conn = self.conn();
        let _: () = match expire_seconds {
            Some(seconds) => conn.set_ex(key, value, seconds).await?,
            None => conn.set(key, value).await?,
        };
        Ok(())
    }

    async fn incr_by(&self, key: &str, delta: i64) -> StoreResult<i64> {
        let value: i64 = self.conn().incr(key, delta).await?;
        Ok(value)
    }

    async fn decr_by(&self, key: &str, delta: i64) -> StoreResult<i64> {
        let value: i64 = self.conn().decr(key, delta).await?;
        Ok(value)
    }

    async fn mset(&self, pairs: &[(String, String)]) -> StoreResult<()> {
        if pairs.is_empty() {
            return Ok(());
        }
        let _: () = redis::cmd("MSET")
            .arg(pairs)
            .query_async(&mut self.conn())
            .await?;
        Ok(())
    }

    async fn mget(&self, keys: &[String]) -> StoreResult<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let values: Vec<Option<String>> = redis::cmd("MGET")
            .arg(keys)
            .query_async(&mut self.conn())
            .await?;
        Ok(values)
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> StoreResult<i64> {
        let added: i64 = self.conn().hset(key, field, value).await?;
        Ok(added)
    }

    async fn hset_multiple(&self, key: &str, fields: &[(String, String)]) -> StoreResult<i64> {
        if fields.is_empty() {
            return Ok(0);
        }
        let added: i64 = redis::cmd("HSET")
            .arg(key)
            .arg(fields)
            .query_async(&mut self.conn())
            .await?;
        Ok(added)
    }

    async fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        let value: Option<String> = self.conn().hget(key, field).await?;
        Ok(value)
    }

    async fn hgetall(&self, key: &str) -> StoreResult<BTreeMap<String, String>> {
        let fields: BTreeMap<String, String> = self.conn().hgetall(key).await?;
        Ok(fields)
    }

    async fn hdel(&self, key: &str, fields: &[String]) -> StoreResult<i64> {
        let removed: i64 = self.conn().hdel(key, fields).await?;
        Ok(removed)
    }

    async fn lpush(&self, key: &str, values: &[String]) -> StoreResult<i64> {
        let len: i64 = self.conn().lpush(key, values).await?;
        Ok(len)
    }

    async fn rpush(&self, key: &str, values: &[String]) -> StoreResult<i64> {
        let len: i64 = self.conn().rpush(key, values).await?;
        Ok(len)
    }

    async fn lpop(&self, key: &str, count: Option<usize>) -> StoreResult<Vec<String>> {
        let mut conn = self.conn();
        match count.map(NonZeroUsize::new) {
            // A zero count pops nothing
            Some(None) => Ok(Vec::new()),
            Some(Some(n)) => {
                let values: Option<Vec<String>> = conn.lpop(key, Some(n)).await?;
                Ok(values.unwrap_or_default())
            }
            None => {
                let value: Option<String> = conn.lpop(key, None).await?;
                Ok(value.into_iter().collect())
            }
        }
    }

    async fn rpop(&self, key: &str, count: Option<usize>) -> StoreResult<Vec<String>> {
        let mut conn = self.conn();
        match count.map(NonZeroUsize::new) {
            Some(None) => Ok(Vec::new()),
            Some(Some(n)) => {
                let values: Option<Vec<String>> = conn.rpop(key, Some(n)).await?;
                Ok(values.unwrap_or_default())
            }
            None => {
                let value: Option<String> = conn.rpop(key, None).await?;
                Ok(value.into_iter().collect())
            }
        }
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>> {
        let values: Vec<String> = redis::cmd("LRANGE")
            .arg(key)
            .arg(start)
            .arg(stop)
            .query_async(&mut self.conn())
            .await?;
        Ok(values)
    }

    async fn sadd(&self, key: &str, members: &[String]) -> StoreResult<i64> {
        let added: i64 = self.conn().sadd(key, members).await?;
        Ok(added)
    }

    async fn srem(&self, key: &str, members: &[String]) -> StoreResult<i64> {
        let removed: i64 = self.conn().srem(key, members).await?;
        Ok(removed)
    }

    async fn smembers(&self, key: &str) -> StoreResult<Vec<String>> {
        let members: Vec<String> = self.conn().smembers(key).await?;
        Ok(members)
    }

    async fn zadd(&self, key: &str, members: &[SortedSetMember]) -> StoreResult<i64> {
        if members.is_empty() {
            return Ok(0);
        }
        let mut cmd = redis::cmd("ZADD");
        cmd.arg(key);
        for entry in members {
            cmd.arg(entry.score).arg(&entry.member);
        }
        let added: i64 = cmd.query_async(&mut self.conn()).await?;
        Ok(added)
    }

    async fn zrem(&self, key: &str, members: &[String]) -> StoreResult<i64> {
        let removed: i64 = self.conn().zrem(key, members).await?;
        Ok(removed)
    }

    async fn zrange(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>> {
        let members: Vec<String> = redis::cmd("ZRANGE")
            .arg(key)
            .arg(start)
            .arg(stop)
            .query_async(&mut self.conn())
            .await?;
        Ok(members)
    }

    async fn zrange_withscores(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> StoreResult<Vec<SortedSetMember>> {
        let pairs: Vec<(String, f64)> = redis::cmd("ZRANGE")
            .arg(key)
            .arg(start)
            .arg(stop)
            .arg("WITHSCORES")
            .query_async(&mut self.conn())
            .await?;
        Ok(pairs
            .into_iter()
            .map(|(member, score)| SortedSetMember { member, score })
            .collect())
    }

    async fn flushdb(&self) -> StoreResult<()> {
        let _: () = redis::cmd("FLUSHDB").query_async(&mut self.conn()).await?;
        Ok(())
    }

    async fn flushall(&self) -> StoreResult<()> {
        let _: () = redis::cmd("FLUSHALL").query_async(&mut self.conn()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redis::ErrorKind;

    #[test]
    fn test_error_classification() {
        let io: RedisError =
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused").into();
        assert!(matches!(StoreError::from(io), StoreError::Unavailable(_)));

        let rejected: RedisError = (ErrorKind::TypeError, "unexpected reply").into();
        assert!(matches!(StoreError::from(rejected), StoreError::Command(_)));
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_config() {
        let config = ConnectionConfig::new("", 6379);
        let result = RedisStore::connect(&config).await;
        assert!(matches!(result, Err(RedisMcpError::Configuration(_))));
    }
}
