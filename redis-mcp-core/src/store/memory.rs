/*!
In-process store client.

Mirrors the store's observable behavior closely enough to drive the engines
and the tool layer without a server: glob key listing, TTL bookkeeping, type
checks, and removal of collections once they become empty. Failures can be
injected per operation (and optionally per key) to exercise error paths.
*/

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::{KeyValueStore, StoreError, StoreResult};
use crate::glob::GlobPattern;
use crate::model::{KeyRecord, SortedSetMember, TypedValue};

#[derive(Debug, Clone)]
enum StoredValue {
    String(String),
    Hash(BTreeMap<String, String>),
    List(VecDeque<String>),
    Set(BTreeSet<String>),
    /// Kept ordered by (score, member)
    SortedSet(Vec<SortedSetMember>),
    /// A type the snapshot model does not cover, e.g. `stream`
    Unsupported(String),
}

impl StoredValue {
    fn type_name(&self) -> &str {
        match self {
            StoredValue::String(_) => "string",
            StoredValue::Hash(_) => "hash",
            StoredValue::List(_) => "list",
            StoredValue::Set(_) => "set",
            StoredValue::SortedSet(_) => "zset",
            StoredValue::Unsupported(name) => name,
        }
    }

    fn is_empty_collection(&self) -> bool {
        match self {
            StoredValue::Hash(h) => h.is_empty(),
            StoredValue::List(l) => l.is_empty(),
            StoredValue::Set(s) => s.is_empty(),
            StoredValue::SortedSet(z) => z.is_empty(),
            StoredValue::String(_) | StoredValue::Unsupported(_) => false,
        }
    }
}

impl From<TypedValue> for StoredValue {
    fn from(value: TypedValue) -> Self {
        match value {
            TypedValue::String(s) => StoredValue::String(s),
            TypedValue::Hash(h) => StoredValue::Hash(h),
            TypedValue::List(l) => StoredValue::List(l.into()),
            TypedValue::Set(s) => StoredValue::Set(s),
            TypedValue::SortedSet(mut z) => {
                sort_members(&mut z);
                StoredValue::SortedSet(z)
            }
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: StoredValue,
    expires_at: Option<Instant>,
}

#[derive(Debug, Clone)]
struct Fault {
    operation: String,
    key: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    entries: HashMap<String, Entry>,
    faults: Vec<Fault>,
    writes: usize,
}

impl State {
    fn purge_expired(&mut self) {
        let now = Instant::now();
        self.entries
            .retain(|_, entry| entry.expires_at.map_or(true, |at| at > now));
    }

    fn check_fault(&self, operation: &str, key: Option<&str>) -> StoreResult<()> {
        let hit = self.faults.iter().any(|fault| {
            fault.operation == operation
                && match (&fault.key, key) {
                    (None, _) => true,
                    (Some(expected), Some(actual)) => expected == actual,
                    (Some(_), None) => false,
                }
        });
        if hit {
            return Err(StoreError::unavailable(format!(
                "injected failure for {operation}"
            )));
        }
        Ok(())
    }

    fn read(&self, key: &str) -> Option<&StoredValue> {
        self.entries.get(key).map(|entry| &entry.value)
    }

    /// Existing value for a write, or a fresh one from `init`
    fn write_slot(&mut self, key: &str, init: fn() -> StoredValue) -> &mut StoredValue {
        self.writes += 1;
        &mut self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry {
                value: init(),
                expires_at: None,
            })
            .value
    }

    fn drop_if_empty(&mut self, key: &str) {
        if self
            .entries
            .get(key)
            .is_some_and(|entry| entry.value.is_empty_collection())
        {
            self.entries.remove(key);
        }
    }
}

fn wrong_type(key: &str) -> StoreError {
    StoreError::WrongType(key.to_string())
}

fn sort_members(members: &mut [SortedSetMember]) {
    members.sort_by(|a, b| {
        a.score
            .total_cmp(&b.score)
            .then_with(|| a.member.cmp(&b.member))
    });
}

/// Resolve inclusive store-style indexes against a length
fn index_window(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { (start + len).max(0) } else { start };
    let stop = if stop < 0 { stop + len } else { stop.min(len - 1) };
    if start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}

fn parse_integer(key: &str, value: &str) -> StoreResult<i64> {
    value.parse::<i64>().map_err(|_| {
        StoreError::command(format!(
            "value of '{key}' is not an integer or out of range"
        ))
    })
}

/// In-memory [`KeyValueStore`]
///
/// ```rust
/// use redis_mcp_core::store::{KeyValueStore, MemoryStore};
///
/// # let rt = tokio::runtime::Runtime::new().unwrap();
/// # rt.block_on(async {
/// let store = MemoryStore::new();
/// store.set("greeting", "hello", None).await.unwrap();
/// assert_eq!(store.get("greeting").await.unwrap().as_deref(), Some("hello"));
/// # });
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a key from a captured record, applying its TTL
    pub async fn insert_record(&self, record: KeyRecord) {
        let mut state = self.state.lock().await;
        let expires_at = record
            .expiry()
            .map(|secs| Instant::now() + Duration::from_secs(secs));
        state.entries.insert(
            record.key,
            Entry {
                value: record.value.into(),
                expires_at,
            },
        );
    }

    /// Seed a key whose type the snapshot model does not support
    pub async fn insert_unsupported(&self, key: &str, type_name: &str) {
        let mut state = self.state.lock().await;
        state.entries.insert(
            key.to_string(),
            Entry {
                value: StoredValue::Unsupported(type_name.to_string()),
                expires_at: None,
            },
        );
    }

    /// Make `operation` fail with [`StoreError::Unavailable`], either for
    /// every call or only for calls touching `key`.
    ///
    /// Operation names are the trait method names (`"hgetall"`, `"flushdb"`);
    /// `hset` and `zrange` go through `hset_multiple` and `zrange_withscores`.
    pub async fn fail_on(&self, operation: &str, key: Option<&str>) {
        let mut state = self.state.lock().await;
        state.faults.push(Fault {
            operation: operation.to_string(),
            key: key.map(str::to_string),
        });
    }

    pub async fn clear_faults(&self) {
        self.state.lock().await.faults.clear();
    }

    /// Number of mutating calls that reached the data
    pub async fn write_count(&self) -> usize {
        self.state.lock().await.writes
    }

    pub async fn len(&self) -> usize {
        let mut state = self.state.lock().await;
        state.purge_expired();
        state.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn lock_for(
        &self,
        operation: &str,
        key: Option<&str>,
    ) -> StoreResult<tokio::sync::MutexGuard<'_, State>> {
        let mut state = self.state.lock().await;
        state.check_fault(operation, key)?;
        state.purge_expired();
        Ok(state)
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>> {
        let state = self.lock_for("keys", None).await?;
        let glob = GlobPattern::new(pattern).map_err(|e| StoreError::command(e.to_string()))?;
        let mut keys: Vec<String> = state
            .entries
            .keys()
            .filter(|key| glob.is_match(key))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn key_type(&self, key: &str) -> StoreResult<String> {
        let state = self.lock_for("key_type", Some(key)).await?;
        Ok(state
            .read(key)
            .map_or_else(|| "none".to_string(), |v| v.type_name().to_string()))
    }

    async fn ttl(&self, key: &str) -> StoreResult<i64> {
        let state = self.lock_for("ttl", Some(key)).await?;
        let Some(entry) = state.entries.get(key) else {
            return Ok(-2);
        };
        Ok(match entry.expires_at {
            None => -1,
            Some(at) => {
                let remaining = at.saturating_duration_since(Instant::now());
                ((remaining.as_millis() + 500) / 1000) as i64
            }
        })
    }

    async fn expire(&self, key: &str, seconds: u64) -> StoreResult<bool> {
        let mut state = self.lock_for("expire", Some(key)).await?;
        if !state.entries.contains_key(key) {
            return Ok(false);
        }
        state.writes += 1;
        if seconds == 0 {
            state.entries.remove(key);
        } else if let Some(entry) = state.entries.get_mut(key) {
            entry.expires_at = Some(Instant::now() + Duration::from_secs(seconds));
        }
        Ok(true)
    }

    async fn del(&self, keys: &[String]) -> StoreResult<i64> {
        let mut state = self.lock_for("del", keys.first().map(String::as_str)).await?;
        state.writes += 1;
        Ok(keys
            .iter()
            .filter(|key| state.entries.remove(key.as_str()).is_some())
            .count() as i64)
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let state = self.lock_for("get", Some(key)).await?;
        match state.read(key) {
            None => Ok(None),
            Some(StoredValue::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn set(&self, key: &str, value: &str, expire_seconds: Option<u64>) -> StoreResult<()> {
        let mut state = self.lock_for("set", Some(key)).await?;
        state.writes += 1;
        state.entries.insert(
            key.to_string(),
            Entry {
                value: StoredValue::String(value.to_string()),
                expires_at: expire_seconds.map(|secs| Instant::now() + Duration::from_secs(secs)),
            },
        );
        Ok(())
    }

    async fn incr_by(&self, key: &str, delta: i64) -> StoreResult<i64> {
        let mut state = self.lock_for("incr_by", Some(key)).await?;
        match state.write_slot(key, || StoredValue::String("0".to_string())) {
            StoredValue::String(current) => {
                let next = parse_integer(key, current)?
                    .checked_add(delta)
                    .ok_or_else(|| StoreError::command("increment or decrement would overflow"))?;
                *current = next.to_string();
                Ok(next)
            }
            _ => Err(wrong_type(key)),
        }
    }

    async fn decr_by(&self, key: &str, delta: i64) -> StoreResult<i64> {
        let negated = delta
            .checked_neg()
            .ok_or_else(|| StoreError::command("decrement is out of range"))?;
        self.incr_by(key, negated).await
    }

    async fn mset(&self, pairs: &[(String, String)]) -> StoreResult<()> {
        let mut state = self.lock_for("mset", None).await?;
        state.writes += 1;
        for (key, value) in pairs {
            state.entries.insert(
                key.clone(),
                Entry {
                    value: StoredValue::String(value.clone()),
                    expires_at: None,
                },
            );
        }
        Ok(())
    }

    async fn mget(&self, keys: &[String]) -> StoreResult<Vec<Option<String>>> {
        let state = self.lock_for("mget", None).await?;
        Ok(keys
            .iter()
            .map(|key| match state.read(key) {
                Some(StoredValue::String(s)) => Some(s.clone()),
                _ => None,
            })
            .collect())
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> StoreResult<i64> {
        self.hset_multiple(key, &[(field.to_string(), value.to_string())])
            .await
    }

    async fn hset_multiple(&self, key: &str, fields: &[(String, String)]) -> StoreResult<i64> {
        let mut state = self.lock_for("hset_multiple", Some(key)).await?;
        match state.write_slot(key, || StoredValue::Hash(BTreeMap::new())) {
            StoredValue::Hash(hash) => {
                let mut added = 0;
                for (field, value) in fields {
                    if hash.insert(field.clone(), value.clone()).is_none() {
                        added += 1;
                    }
                }
                Ok(added)
            }
            _ => Err(wrong_type(key)),
        }
    }

    async fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        let state = self.lock_for("hget", Some(key)).await?;
        match state.read(key) {
            None => Ok(None),
            Some(StoredValue::Hash(hash)) => Ok(hash.get(field).cloned()),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn hgetall(&self, key: &str) -> StoreResult<BTreeMap<String, String>> {
        let state = self.lock_for("hgetall", Some(key)).await?;
        match state.read(key) {
            None => Ok(BTreeMap::new()),
            Some(StoredValue::Hash(hash)) => Ok(hash.clone()),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn hdel(&self, key: &str, fields: &[String]) -> StoreResult<i64> {
        let mut state = self.lock_for("hdel", Some(key)).await?;
        let removed = match state.entries.get_mut(key).map(|entry| &mut entry.value) {
            None => return Ok(0),
            Some(StoredValue::Hash(hash)) => fields
                .iter()
                .filter(|field| hash.remove(field.as_str()).is_some())
                .count() as i64,
            Some(_) => return Err(wrong_type(key)),
        };
        state.writes += 1;
        state.drop_if_empty(key);
        Ok(removed)
    }

    async fn lpush(&self, key: &str, values: &[String]) -> StoreResult<i64> {
        let mut state = self.lock_for("lpush", Some(key)).await?;
        match state.write_slot(key, || StoredValue::List(VecDeque::new())) {
            StoredValue::List(list) => {
                for value in values {
                    list.push_front(value.clone());
                }
                Ok(list.len() as i64)
            }
            _ => Err(wrong_type(key)),
        }
    }

    async fn rpush(&self, key: &str, values: &[String]) -> StoreResult<i64> {
        let mut state = self.lock_for("rpush", Some(key)).await?;
        match state.write_slot(key, || StoredValue::List(VecDeque::new())) {
            StoredValue::List(list) => {
                list.extend(values.iter().cloned());
                Ok(list.len() as i64)
            }
            _ => Err(wrong_type(key)),
        }
    }

    async fn lpop(&self, key: &str, count: Option<usize>) -> StoreResult<Vec<String>> {
        let mut state = self.lock_for("lpop", Some(key)).await?;
        let popped = match state.entries.get_mut(key).map(|entry| &mut entry.value) {
            None => return Ok(Vec::new()),
            Some(StoredValue::List(list)) => {
                let n = count.unwrap_or(1).min(list.len());
                list.drain(..n).collect::<Vec<_>>()
            }
            Some(_) => return Err(wrong_type(key)),
        };
        state.writes += 1;
        state.drop_if_empty(key);
        Ok(popped)
    }

    async fn rpop(&self, key: &str, count: Option<usize>) -> StoreResult<Vec<String>> {
        let mut state = self.lock_for("rpop", Some(key)).await?;
        let popped = match state.entries.get_mut(key).map(|entry| &mut entry.value) {
            None => return Ok(Vec::new()),
            Some(StoredValue::List(list)) => {
                let n = count.unwrap_or(1);
                (0..n).map_while(|_| list.pop_back()).collect::<Vec<_>>()
            }
            Some(_) => return Err(wrong_type(key)),
        };
        state.writes += 1;
        state.drop_if_empty(key);
        Ok(popped)
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>> {
        let state = self.lock_for("lrange", Some(key)).await?;
        match state.read(key) {
            None => Ok(Vec::new()),
            Some(StoredValue::List(list)) => Ok(index_window(list.len(), start, stop)
                .map(|(from, to)| list.range(from..=to).cloned().collect())
                .unwrap_or_default()),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn sadd(&self, key: &str, members: &[String]) -> StoreResult<i64> {
        let mut state = self.lock_for("sadd", Some(key)).await?;
        match state.write_slot(key, || StoredValue::Set(BTreeSet::new())) {
            StoredValue::Set(set) => Ok(members
                .iter()
                .filter(|member| set.insert((*member).clone()))
                .count() as i64),
            _ => Err(wrong_type(key)),
        }
    }

    async fn srem(&self, key: &str, members: &[String]) -> StoreResult<i64> {
        let mut state = self.lock_for("srem", Some(key)).await?;
        let removed = match state.entries.get_mut(key).map(|entry| &mut entry.value) {
            None => return Ok(0),
            Some(StoredValue::Set(set)) => members
                .iter()
                .filter(|member| set.remove(member.as_str()))
                .count() as i64,
            Some(_) => return Err(wrong_type(key)),
        };
        state.writes += 1;
        state.drop_if_empty(key);
        Ok(removed)
    }

    async fn smembers(&self, key: &str) -> StoreResult<Vec<String>> {
        let state = self.lock_for("smembers", Some(key)).await?;
        match state.read(key) {
            None => Ok(Vec::new()),
            Some(StoredValue::Set(set)) => Ok(set.iter().cloned().collect()),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn zadd(&self, key: &str, members: &[SortedSetMember]) -> StoreResult<i64> {
        let mut state = self.lock_for("zadd", Some(key)).await?;
        if members.iter().any(|m| m.score.is_nan()) {
            return Err(StoreError::command("value is not a valid float"));
        }
        match state.write_slot(key, || StoredValue::SortedSet(Vec::new())) {
            StoredValue::SortedSet(zset) => {
                let mut added = 0;
                for incoming in members {
                    match zset.iter_mut().find(|m| m.member == incoming.member) {
                        Some(existing) => existing.score = incoming.score,
                        None => {
                            zset.push(incoming.clone());
                            added += 1;
                        }
                    }
                }
                sort_members(zset);
                Ok(added)
            }
            _ => Err(wrong_type(key)),
        }
    }

    async fn zrem(&self, key: &str, members: &[String]) -> StoreResult<i64> {
        let mut state = self.lock_for("zrem", Some(key)).await?;
        let removed = match state.entries.get_mut(key).map(|entry| &mut entry.value) {
            None => return Ok(0),
            Some(StoredValue::SortedSet(zset)) => {
                let before = zset.len();
                zset.retain(|m| !members.contains(&m.member));
                (before - zset.len()) as i64
            }
            Some(_) => return Err(wrong_type(key)),
        };
        state.writes += 1;
        state.drop_if_empty(key);
        Ok(removed)
    }

    async fn zrange(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>> {
        Ok(self
            .zrange_withscores(key, start, stop)
            .await?
            .into_iter()
            .map(|m| m.member)
            .collect())
    }

    async fn zrange_withscores(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> StoreResult<Vec<SortedSetMember>> {
        let state = self.lock_for("zrange_withscores", Some(key)).await?;
        match state.read(key) {
            None => Ok(Vec::new()),
            Some(StoredValue::SortedSet(zset)) => Ok(index_window(zset.len(), start, stop)
                .map(|(from, to)| zset[from..=to].to_vec())
                .unwrap_or_default()),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn flushdb(&self) -> StoreResult<()> {
        let mut state = self.lock_for("flushdb", None).await?;
        state.writes += 1;
        state.entries.clear();
        Ok(())
    }

    async fn flushall(&self) -> StoreResult<()> {
        let mut state = self.lock_for("flushall", None).await?;
        state.writes += 1;
        state.entries.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn test_strings_and_counters() {
        let store = MemoryStore::new();
        store.set("name", "ada", None).await.unwrap();
        assert_eq!(store.get("name").await.unwrap().as_deref(), Some("ada"));
        assert_eq!(store.get("missing").await.unwrap(), None);

        assert_eq!(store.incr_by("hits", 5).await.unwrap(), 5);
        assert_eq!(store.decr_by("hits", 2).await.unwrap(), 3);
        assert!(matches!(
            store.incr_by("name", 1).await,
            Err(StoreError::Command(_))
        ));
    }

    #[tokio::test]
    async fn test_wrong_type_is_reported() {
        let store = MemoryStore::new();
        store.rpush("queue", &strings(&["a"])).await.unwrap();
        assert_eq!(
            store.get("queue").await,
            Err(StoreError::WrongType("queue".to_string()))
        );
        assert!(store.hgetall("queue").await.is_err());
    }

    #[tokio::test]
    async fn test_keys_uses_glob_matching() {
        let store = MemoryStore::new();
        for key in ["user:1", "user:2", "session:1", "user.x"] {
            store.set(key, "v", None).await.unwrap();
        }
        assert_eq!(store.keys("user:*").await.unwrap(), strings(&["user:1", "user:2"]));
        assert_eq!(store.keys("user?x").await.unwrap(), strings(&["user.x"]));
        assert_eq!(store.keys("*").await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_keys_class_bang_is_literal() {
        let store = MemoryStore::new();
        for key in ["hello", "hallo", "h!llo"] {
            store.set(key, "v", None).await.unwrap();
        }
        assert_eq!(store.keys("h[!e]llo").await.unwrap(), strings(&["h!llo", "hello"]));
    }

    #[tokio::test]
    async fn test_zadd_rejects_nan_score() {
        let store = MemoryStore::new();
        let result = store
            .zadd("board", &[SortedSetMember::new("a", f64::NAN)])
            .await;
        assert!(result.is_err());
        assert_eq!(store.key_type("board").await.unwrap(), "none");
    }

    #[tokio::test]
    async fn test_list_push_pop_and_range() {
        let store = MemoryStore::new();
        store.rpush("l", &strings(&["b", "c"])).await.unwrap();
        store.lpush("l", &strings(&["a"])).await.unwrap();

        assert_eq!(store.lrange("l", 0, -1).await.unwrap(), strings(&["a", "b", "c"]));
        assert_eq!(store.lrange("l", -2, 10).await.unwrap(), strings(&["b", "c"]));
        assert!(store.lrange("l", 5, 9).await.unwrap().is_empty());

        assert!(store.lpop("l", Some(0)).await.unwrap().is_empty());
        assert!(store.rpop("l", Some(0)).await.unwrap().is_empty());
        assert_eq!(store.rpop("l", Some(2)).await.unwrap(), strings(&["c", "b"]));
        assert_eq!(store.lpop("l", None).await.unwrap(), strings(&["a"]));
        assert_eq!(store.key_type("l").await.unwrap(), "none");
    }

    #[tokio::test]
    async fn test_sorted_set_ordering_and_update() {
        let store = MemoryStore::new();
        store
            .zadd(
                "board",
                &[SortedSetMember::new("b", 2.0), SortedSetMember::new("a", 1.0)],
            )
            .await
            .unwrap();
        let added = store
            .zadd("board", &[SortedSetMember::new("a", 3.0)])
            .await
            .unwrap();
        assert_eq!(added, 0);
        assert_eq!(store.zrange("board", 0, -1).await.unwrap(), strings(&["b", "a"]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_and_expiry() {
        let store = MemoryStore::new();
        store.set("temp", "v", Some(10)).await.unwrap();
        store.set("keep", "v", None).await.unwrap();

        assert_eq!(store.ttl("temp").await.unwrap(), 10);
        assert_eq!(store.ttl("keep").await.unwrap(), -1);
        assert_eq!(store.ttl("missing").await.unwrap(), -2);

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(store.get("temp").await.unwrap(), None);
        assert!(!store.expire("temp", 5).await.unwrap());
    }

    #[tokio::test]
    async fn test_injected_faults() {
        let store = MemoryStore::new();
        store.set("a", "1", None).await.unwrap();
        store.set("b", "2", None).await.unwrap();
        store.fail_on("get", Some("a")).await;

        assert!(matches!(store.get("a").await, Err(StoreError::Unavailable(_))));
        assert_eq!(store.get("b").await.unwrap().as_deref(), Some("2"));

        store.clear_faults().await;
        assert!(store.get("a").await.is_ok());
    }

    #[tokio::test]
    async fn test_unsupported_type_and_write_count() {
        let store = MemoryStore::new();
        store.insert_unsupported("events", "stream").await;
        assert_eq!(store.key_type("events").await.unwrap(), "stream");
        assert_eq!(store.write_count().await, 0);

        store.sadd("tags", &strings(&["x", "y", "x"])).await.unwrap();
        assert_eq!(store.write_count().await, 1);
        assert_eq!(store.smembers("tags").await.unwrap(), strings(&["x", "y"]));
    }

    #[tokio::test]
    async fn test_delete_by_pattern() {
        let store = MemoryStore::new();
        for key in ["tmp:1", "tmp:2", "keep"] {
            store.set(key, "v", None).await.unwrap();
        }
        assert_eq!(store.delete_by_pattern("tmp:*").await.unwrap(), 2);
        assert_eq!(store.delete_by_pattern("tmp:*").await.unwrap(), 0);
        assert_eq!(store.keys("*").await.unwrap(), strings(&["keep"]));
    }
}
