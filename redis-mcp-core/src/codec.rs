/*!
Snapshot codec: converts a [`Snapshot`] to and from its on-disk document.

The document is indented JSON:

```json
{
  "version": 1,
  "created_at": "2024-05-01T12:00:00Z",
  "keys": {
    "session:42": { "type": "string", "ttl": 120, "value": "token" },
    "board": { "type": "zset", "ttl": -1, "value": [ { "value": "ada", "score": 3.5 } ] }
  }
}
```

Documents written before the `version` envelope existed (a bare map of key
to record) are still accepted by [`SnapshotCodec::decode`].
*/

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::warn;

use crate::compression::{self, CompressionAdapter, GzipCompressor, NoCompression};
use crate::model::{KeyRecord, Snapshot, SortedSetMember, TypeKind, TypedValue, NO_EXPIRY};
use crate::{RedisMcpError, Result};

/// Current snapshot document version
pub const SNAPSHOT_FORMAT_VERSION: u64 = 1;

#[derive(Serialize)]
struct DocumentOut<'a> {
    version: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
    keys: BTreeMap<&'a str, RecordDocument>,
}

#[derive(Serialize, Deserialize)]
struct RecordDocument {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    ttl: Option<i64>,
    value: Value,
}

/// Sorted-set entry layout inside a document
#[derive(Serialize, Deserialize)]
struct ZsetEntry {
    value: String,
    #[serde(with = "score_format")]
    score: f64,
}

/// Scores are JSON numbers; infinities (valid store scores) become strings.
///
/// Older writers emitted `null` for a non-finite score, losing its sign. Such
/// a score decodes as NaN, which the store refuses, so only that key fails to
/// restore.
mod score_format {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(score: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if score.is_finite() {
            serializer.serialize_f64(*score)
        } else if score.is_nan() {
            serializer.serialize_str("nan")
        } else if score.is_sign_positive() {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ScoreRepr {
        Number(f64),
        Text(String),
        Unknown(()),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match ScoreRepr::deserialize(deserializer)? {
            ScoreRepr::Number(score) => Ok(score),
            ScoreRepr::Text(text) => text
                .trim()
                .parse::<f64>()
                .map_err(|_| serde::de::Error::custom(format!("invalid score '{text}'"))),
            ScoreRepr::Unknown(()) => Ok(f64::NAN),
        }
    }
}

/// Encodes and decodes snapshot documents
pub struct SnapshotCodec {
    compressor: Box<dyn CompressionAdapter>,
}

impl SnapshotCodec {
    /// Plain indented JSON
    pub fn new() -> Self {
        Self {
            compressor: Box::new(NoCompression::new()),
        }
    }

    /// Gzip-compressed JSON
    pub fn gzip() -> Self {
        Self {
            compressor: Box::new(GzipCompressor::new()),
        }
    }

    /// Codec matching a destination file name (`.gz` → gzip)
    pub fn for_path(path: &Path) -> Self {
        Self {
            compressor: compression::for_path(path),
        }
    }

    pub fn algorithm_name(&self) -> &str {
        self.compressor.algorithm_name()
    }

    /// Serialize a snapshot into document bytes
    ///
    /// # Errors
    /// * `RedisMcpError::Json` - serialization failure
    /// * `RedisMcpError::Compression` - compression failure
    pub fn encode(&self, snapshot: &Snapshot) -> Result<Vec<u8>> {
        let mut keys = BTreeMap::new();
        for record in snapshot.records() {
            keys.insert(record.key.as_str(), encode_record(record)?);
        }

        let document = DocumentOut {
            version: SNAPSHOT_FORMAT_VERSION,
            created_at: snapshot.created_at,
            keys,
        };

        let json = serde_json::to_vec_pretty(&document)?;
        self.compressor.compress(&json)
    }

    /// Parse document bytes into a snapshot
    ///
    /// Gzip input is detected and decompressed first. Records whose `type` is
    /// not one of the supported kinds are skipped. Any structural problem
    /// fails the whole decode; no partial snapshot is returned.
    ///
    /// # Errors
    /// * `RedisMcpError::Compression` - corrupt gzip stream
    /// * `RedisMcpError::Json` - input is not JSON
    /// * `RedisMcpError::InvalidFormat` - JSON that is not a snapshot document
    pub fn decode(&self, data: &[u8]) -> Result<Snapshot> {
        let plain;
        let bytes = if compression::is_gzip(data) {
            plain = GzipCompressor::new().decompress(data)?;
            &plain[..]
        } else {
            data
        };

        let root: Value = serde_json::from_slice(bytes)?;
        let Value::Object(mut root) = root else {
            return Err(RedisMcpError::invalid_format(
                "snapshot document must be a JSON object",
            ));
        };

        let (created_at, keys) = if is_versioned(&root) {
            let version = root.get("version").and_then(Value::as_u64).unwrap_or(0);
            if version > SNAPSHOT_FORMAT_VERSION {
                return Err(RedisMcpError::invalid_format(format!(
                    "unsupported snapshot version {version} (supported: {SNAPSHOT_FORMAT_VERSION})"
                )));
            }
            let created_at = match root.remove("created_at") {
                None | Some(Value::Null) => None,
                Some(value) => Some(serde_json::from_value::<DateTime<Utc>>(value).map_err(
                    |e| RedisMcpError::invalid_format(format!("invalid created_at: {e}")),
                )?),
            };
            let keys = match root.remove("keys") {
                Some(Value::Object(keys)) => keys,
                _ => Map::new(),
            };
            (created_at, keys)
        } else {
            (None, root)
        };

        let mut snapshot = Snapshot::new();
        snapshot.created_at = created_at;

        for (key, raw) in keys {
            if let Some(record) = decode_record(key, raw)? {
                snapshot.insert(record);
            }
        }

        Ok(snapshot)
    }
}

impl Default for SnapshotCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// A versioned document has an integer `version` and an object `keys`; a
/// legacy document's top-level values are all record objects.
fn is_versioned(root: &Map<String, Value>) -> bool {
    root.get("version").is_some_and(Value::is_u64) && root.get("keys").is_some_and(Value::is_object)
}

fn encode_record(record: &KeyRecord) -> Result<RecordDocument> {
    let value = match &record.value {
        TypedValue::String(value) => Value::String(value.clone()),
        TypedValue::Hash(fields) => serde_json::to_value(fields)?,
        TypedValue::List(items) => serde_json::to_value(items)?,
        TypedValue::Set(members) => serde_json::to_value(members)?,
        TypedValue::SortedSet(members) => {
            let entries: Vec<ZsetEntry> = members
                .iter()
                .map(|m| ZsetEntry {
                    value: m.member.clone(),
                    score: m.score,
                })
                .collect();
            serde_json::to_value(entries)?
        }
    };

    Ok(RecordDocument {
        kind: record.kind().store_name().to_string(),
        ttl: Some(record.ttl),
        value,
    })
}

fn decode_record(key: String, raw: Value) -> Result<Option<KeyRecord>> {
    let document: RecordDocument = serde_json::from_value(raw)
        .map_err(|e| RedisMcpError::invalid_format(format!("record '{key}': {e}")))?;

    let Some(kind) = TypeKind::from_store_name(&document.kind) else {
        warn!(key = %key, kind = %document.kind, "skipping record with unsupported type");
        return Ok(None);
    };

    let shape_error =
        |e: serde_json::Error| RedisMcpError::invalid_format(format!("record '{key}' ({kind}): {e}"));

    let value = match kind {
        TypeKind::String => {
            TypedValue::String(serde_json::from_value::<String>(document.value).map_err(shape_error)?)
        }
        TypeKind::Hash => TypedValue::Hash(
            serde_json::from_value::<BTreeMap<String, String>>(document.value)
                .map_err(shape_error)?,
        ),
        TypeKind::List => {
            TypedValue::List(serde_json::from_value::<Vec<String>>(document.value).map_err(shape_error)?)
        }
        TypeKind::Set => TypedValue::Set(
            serde_json::from_value::<BTreeSet<String>>(document.value).map_err(shape_error)?,
        ),
        TypeKind::SortedSet => {
            let entries =
                serde_json::from_value::<Vec<ZsetEntry>>(document.value).map_err(shape_error)?;
            TypedValue::SortedSet(
                entries
                    .into_iter()
                    .map(|e| SortedSetMember::new(e.value, e.score))
                    .collect(),
            )
        }
    };

    Ok(Some(KeyRecord::new(
        key,
        document.ttl.unwrap_or(NO_EXPIRY),
        value,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot() -> Snapshot {
        let mut snapshot = Snapshot::now();
        snapshot.insert(KeyRecord::new("greeting", 120, TypedValue::String("hello".into())));
        snapshot.insert(KeyRecord::persistent(
            "user:1",
            TypedValue::Hash(BTreeMap::from([
                ("name".to_string(), "ada".to_string()),
                ("lang".to_string(), "en".to_string()),
            ])),
        ));
        snapshot.insert(KeyRecord::persistent(
            "queue",
            TypedValue::List(vec!["z".into(), "x".into(), "y".into(), "x".into()]),
        ));
        snapshot.insert(KeyRecord::new(
            "tags",
            30,
            TypedValue::Set(BTreeSet::from(["b".to_string(), "a".to_string()])),
        ));
        snapshot.insert(KeyRecord::persistent(
            "board",
            TypedValue::SortedSet(vec![
                SortedSetMember::new("low", -1.25),
                SortedSetMember::new("third", 0.1 + 0.2),
                SortedSetMember::new("huge", 1.7976931348623157e308),
                SortedSetMember::new("top", f64::INFINITY),
            ]),
        ));
        snapshot
    }

    #[test]
    fn test_roundtrip_all_kinds() {
        let codec = SnapshotCodec::new();
        let snapshot = sample_snapshot();

        let bytes = codec.encode(&snapshot).unwrap();
        let decoded = codec.decode(&bytes).unwrap();

        assert_eq!(decoded, snapshot);
        assert_eq!(
            decoded.get("queue").map(|r| &r.value),
            Some(&TypedValue::List(vec![
                "z".into(),
                "x".into(),
                "y".into(),
                "x".into()
            ]))
        );
    }

    #[test]
    fn test_gzip_roundtrip_and_sniffing() {
        let snapshot = sample_snapshot();
        let bytes = SnapshotCodec::gzip().encode(&snapshot).unwrap();
        assert!(compression::is_gzip(&bytes));

        // The plain codec still reads gzip input
        let decoded = SnapshotCodec::new().decode(&bytes).unwrap();
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn test_document_layout() {
        let mut snapshot = Snapshot::new();
        snapshot.insert(KeyRecord::persistent(
            "board",
            TypedValue::SortedSet(vec![SortedSetMember::new("ada", 3.5)]),
        ));

        let bytes = SnapshotCodec::new().encode(&snapshot).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.contains('\n'), "document should be indented");

        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["keys"]["board"]["type"], "zset");
        assert_eq!(value["keys"]["board"]["ttl"], -1);
        assert_eq!(value["keys"]["board"]["value"][0]["value"], "ada");
        assert_eq!(value["keys"]["board"]["value"][0]["score"], 3.5);
    }

    #[test]
    fn test_decode_legacy_document() {
        let legacy = br#"{
            "name": { "type": "string", "ttl": -1, "value": "ada" },
            "scores": { "type": "zset", "ttl": 60, "value": [ { "value": "a", "score": 2 } ] },
            "missing-ttl": { "type": "list", "value": ["1", "2"] }
        }"#;

        let snapshot = SnapshotCodec::new().decode(legacy).unwrap();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.created_at, None);
        assert_eq!(snapshot.get("scores").unwrap().ttl, 60);
        assert_eq!(snapshot.get("missing-ttl").unwrap().ttl, NO_EXPIRY);
        assert_eq!(
            snapshot.get("scores").unwrap().value,
            TypedValue::SortedSet(vec![SortedSetMember::new("a", 2.0)])
        );
    }

    #[test]
    fn test_legacy_null_score_decodes_as_nan() {
        let legacy = br#"{
            "board": { "type": "zset", "ttl": -1,
                       "value": [ { "value": "a", "score": null }, { "value": "b", "score": 1 } ] }
        }"#;

        let snapshot = SnapshotCodec::new().decode(legacy).unwrap();
        let TypedValue::SortedSet(members) = &snapshot.get("board").unwrap().value else {
            panic!("expected sorted set");
        };
        assert!(members[0].score.is_nan());
        assert_eq!(members[1].score, 1.0);
    }

    #[test]
    fn test_unknown_type_is_skipped() {
        let document = br#"{
            "version": 1,
            "keys": {
                "events": { "type": "stream", "ttl": -1, "value": [] },
                "name": { "type": "string", "ttl": -1, "value": "ada" }
            }
        }"#;

        let snapshot = SnapshotCodec::new().decode(document).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert!(!snapshot.contains_key("events"));
    }

    #[test]
    fn test_negative_ttl_normalized() {
        let document = br#"{"version": 1, "keys": {"k": {"type": "string", "ttl": -2, "value": "v"}}}"#;
        let snapshot = SnapshotCodec::new().decode(document).unwrap();
        assert_eq!(snapshot.get("k").unwrap().ttl, NO_EXPIRY);
    }

    #[test]
    fn test_wrong_value_shape_fails_whole_decode() {
        let document = br#"{
            "version": 1,
            "keys": {
                "good": { "type": "string", "ttl": -1, "value": "ok" },
                "bad": { "type": "hash", "ttl": -1, "value": ["not", "a", "map"] }
            }
        }"#;

        let result = SnapshotCodec::new().decode(document);
        assert!(matches!(result, Err(RedisMcpError::InvalidFormat(_))));
    }

    #[test]
    fn test_truncated_and_non_object_input() {
        let codec = SnapshotCodec::new();
        let bytes = codec.encode(&sample_snapshot()).unwrap();

        let truncated = &bytes[..bytes.len() / 2];
        assert!(matches!(codec.decode(truncated), Err(RedisMcpError::Json(_))));
        assert!(matches!(
            codec.decode(b"[1, 2, 3]"),
            Err(RedisMcpError::InvalidFormat(_))
        ));
        assert!(matches!(
            codec.decode(br#"{"k": "not a record"}"#),
            Err(RedisMcpError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_future_version_rejected() {
        let document = br#"{"version": 99, "keys": {}}"#;
        let result = SnapshotCodec::new().decode(document);
        assert!(matches!(result, Err(RedisMcpError::InvalidFormat(_))));
    }

    #[test]
    fn test_for_path_uses_gzip_for_gz() {
        assert_eq!(SnapshotCodec::for_path(Path::new("a.json.gz")).algorithm_name(), "gzip");
        assert_eq!(SnapshotCodec::for_path(Path::new("a.json")).algorithm_name(), "none");
    }
}
