/*!
Snapshot data model: key kinds, typed values and records.
*/

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// TTL value meaning "no expiry"
pub const NO_EXPIRY: i64 = -1;

/// The key types a snapshot can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeKind {
    String,
    Hash,
    List,
    Set,
    SortedSet,
}

impl TypeKind {
    /// All supported kinds, in a stable order
    pub const ALL: [TypeKind; 5] = [
        TypeKind::String,
        TypeKind::Hash,
        TypeKind::List,
        TypeKind::Set,
        TypeKind::SortedSet,
    ];

    /// Map a store-reported type name (`TYPE key`) to a supported kind.
    ///
    /// Returns `None` for anything else (`stream`, `none`, module types), which
    /// callers treat as "skip this key".
    pub fn from_store_name(name: &str) -> Option<Self> {
        match name {
            "string" => Some(TypeKind::String),
            "hash" => Some(TypeKind::Hash),
            "list" => Some(TypeKind::List),
            "set" => Some(TypeKind::Set),
            "zset" => Some(TypeKind::SortedSet),
            _ => None,
        }
    }

    /// The store's name for this kind, also used as the snapshot `type` tag
    pub fn store_name(self) -> &'static str {
        match self {
            TypeKind::String => "string",
            TypeKind::Hash => "hash",
            TypeKind::List => "list",
            TypeKind::Set => "set",
            TypeKind::SortedSet => "zset",
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.store_name())
    }
}

/// One member of a sorted set with its score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortedSetMember {
    pub member: String,
    pub score: f64,
}

impl SortedSetMember {
    pub fn new<S: Into<String>>(member: S, score: f64) -> Self {
        Self {
            member: member.into(),
            score,
        }
    }
}

/// A key's value, shaped by its kind
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    String(String),
    Hash(BTreeMap<String, String>),
    /// Order is significant and preserved exactly
    List(Vec<String>),
    Set(BTreeSet<String>),
    /// Members in the store's score order
    SortedSet(Vec<SortedSetMember>),
}

impl TypedValue {
    pub fn kind(&self) -> TypeKind {
        match self {
            TypedValue::String(_) => TypeKind::String,
            TypedValue::Hash(_) => TypeKind::Hash,
            TypedValue::List(_) => TypeKind::List,
            TypedValue::Set(_) => TypeKind::Set,
            TypedValue::SortedSet(_) => TypeKind::SortedSet,
        }
    }

    /// Number of elements (bytes for strings)
    pub fn len(&self) -> usize {
        match self {
            TypedValue::String(value) => value.len(),
            TypedValue::Hash(fields) => fields.len(),
            TypedValue::List(items) => items.len(),
            TypedValue::Set(members) => members.len(),
            TypedValue::SortedSet(members) => members.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One captured key: its value and remaining TTL
#[derive(Debug, Clone, PartialEq)]
pub struct KeyRecord {
    pub key: String,
    /// Remaining seconds; [`NO_EXPIRY`] when the key is persistent
    pub ttl: i64,
    pub value: TypedValue,
}

impl KeyRecord {
    /// Create a record; negative TTLs are normalized to [`NO_EXPIRY`]
    pub fn new<S: Into<String>>(key: S, ttl: i64, value: TypedValue) -> Self {
        Self {
            key: key.into(),
            ttl: normalize_ttl(ttl),
            value,
        }
    }

    /// Create a record without expiry
    pub fn persistent<S: Into<String>>(key: S, value: TypedValue) -> Self {
        Self::new(key, NO_EXPIRY, value)
    }

    pub fn kind(&self) -> TypeKind {
        self.value.kind()
    }

    /// Seconds to reapply with `EXPIRE`, if any
    pub fn expiry(&self) -> Option<u64> {
        if self.ttl > 0 {
            Some(self.ttl as u64)
        } else {
            None
        }
    }
}

/// Negative TTLs (-1 persistent, -2 missing) all mean "no expiry" in a snapshot
pub fn normalize_ttl(ttl: i64) -> i64 {
    if ttl < 0 {
        NO_EXPIRY
    } else {
        ttl
    }
}

/// A set of captured keys, unique by key name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub created_at: Option<DateTime<Utc>>,
    records: BTreeMap<String, KeyRecord>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty snapshot stamped with the current time
    pub fn now() -> Self {
        Self {
            created_at: Some(Utc::now()),
            records: BTreeMap::new(),
        }
    }

    /// Insert a record, replacing any previous record for the same key
    pub fn insert(&mut self, record: KeyRecord) -> Option<KeyRecord> {
        self.records.insert(record.key.clone(), record)
    }

    pub fn get(&self, key: &str) -> Option<&KeyRecord> {
        self.records.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in key order
    pub fn records(&self) -> impl Iterator<Item = &KeyRecord> {
        self.records.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    /// Count of records per kind
    pub fn kind_counts(&self) -> BTreeMap<TypeKind, usize> {
        let mut counts = BTreeMap::new();
        for record in self.records.values() {
            *counts.entry(record.kind()).or_insert(0) += 1;
        }
        counts
    }
}

impl FromIterator<KeyRecord> for Snapshot {
    fn from_iter<I: IntoIterator<Item = KeyRecord>>(iter: I) -> Self {
        let mut snapshot = Snapshot::new();
        for record in iter {
            snapshot.insert(record);
        }
        snapshot
    }
}

/// Inclusion and exclusion globs for one backup call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSet {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl PatternSet {
    pub fn new(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self { include, exclude }
    }

    /// Include only keys matching `pattern`
    pub fn include<S: Into<String>>(pattern: S) -> Self {
        Self {
            include: vec![pattern.into()],
            exclude: Vec::new(),
        }
    }

    /// Add an exclusion pattern
    pub fn excluding<S: Into<String>>(mut self, pattern: S) -> Self {
        self.exclude.push(pattern.into());
        self
    }
}

impl Default for PatternSet {
    fn default() -> Self {
        Self::include("*")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_kind_store_names() {
        for kind in TypeKind::ALL {
            assert_eq!(TypeKind::from_store_name(kind.store_name()), Some(kind));
        }
        assert_eq!(TypeKind::from_store_name("stream"), None);
        assert_eq!(TypeKind::from_store_name("none"), None);
        assert_eq!(TypeKind::SortedSet.to_string(), "zset");
    }

    #[test]
    fn test_record_ttl_normalization() {
        let record = KeyRecord::new("k", -2, TypedValue::String("v".into()));
        assert_eq!(record.ttl, NO_EXPIRY);
        assert_eq!(record.expiry(), None);

        let record = KeyRecord::new("k", 120, TypedValue::String("v".into()));
        assert_eq!(record.expiry(), Some(120));

        let record = KeyRecord::new("k", 0, TypedValue::String("v".into()));
        assert_eq!(record.expiry(), None);
    }

    #[test]
    fn test_value_kind_matches_variant() {
        let value = TypedValue::SortedSet(vec![SortedSetMember::new("a", 1.0)]);
        assert_eq!(value.kind(), TypeKind::SortedSet);
        assert_eq!(value.len(), 1);
        assert!(TypedValue::List(Vec::new()).is_empty());
    }

    #[test]
    fn test_snapshot_keys_are_unique() {
        let mut snapshot = Snapshot::new();
        snapshot.insert(KeyRecord::persistent("k", TypedValue::String("a".into())));
        let replaced = snapshot.insert(KeyRecord::persistent("k", TypedValue::String("b".into())));

        assert!(replaced.is_some());
        assert_eq!(snapshot.len(), 1);
        assert_eq!(
            snapshot.get("k").map(|r| &r.value),
            Some(&TypedValue::String("b".into()))
        );
    }

    #[test]
    fn test_kind_counts() {
        let snapshot: Snapshot = vec![
            KeyRecord::persistent("a", TypedValue::String("1".into())),
            KeyRecord::persistent("b", TypedValue::String("2".into())),
            KeyRecord::persistent("c", TypedValue::List(vec!["x".into()])),
        ]
        .into_iter()
        .collect();

        let counts = snapshot.kind_counts();
        assert_eq!(counts.get(&TypeKind::String), Some(&2));
        assert_eq!(counts.get(&TypeKind::List), Some(&1));
        assert_eq!(counts.get(&TypeKind::Hash), None);
    }

    #[test]
    fn test_default_pattern_set() {
        let patterns = PatternSet::default();
        assert_eq!(patterns.include, vec!["*".to_string()]);
        assert!(patterns.exclude.is_empty());

        let patterns = PatternSet::include("a:*").excluding("a:2");
        assert_eq!(patterns.exclude, vec!["a:2".to_string()]);
    }
}
