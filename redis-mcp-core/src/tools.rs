/*!
Tool catalog and dispatcher.

Each tool maps 1:1 onto a store client call (or a snapshot service call) and
answers with a single text content item holding the pretty-printed
[`OperationResult`]. Store failures are reported inside that result; only
protocol-level problems (unknown tool, bad arguments, no connection) surface
as [`ToolError`].
*/

use futures::future::BoxFuture;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{BackupOptions, ConnectionConfig, RestoreOptions};
use crate::model::SortedSetMember;
use crate::service::{OperationResult, SnapshotService};
use crate::store::{KeyValueStore, RedisStore, StoreResult};

/// JSON-RPC error codes used for tool failures
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
}

/// Protocol-level tool failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("Not connected to Redis. Please use connect_redis first.")]
    NotConnected,

    #[error("Tool execution failed: {0}")]
    Internal(String),
}

impl ToolError {
    /// JSON-RPC error code for this failure
    pub fn code(&self) -> i64 {
        match self {
            ToolError::UnknownTool(_) => error_codes::METHOD_NOT_FOUND,
            ToolError::InvalidArguments { .. } => error_codes::INVALID_PARAMS,
            ToolError::NotConnected => error_codes::INVALID_REQUEST,
            ToolError::Internal(_) => error_codes::INTERNAL_ERROR,
        }
    }
}

/// One entry of `tools/list`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

/// Text content item of a tool response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolContent {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

/// Result of `tools/call`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolResponse {
    pub content: Vec<ToolContent>,
}

impl ToolResponse {
    fn from_result<T: Serialize>(result: &OperationResult<T>) -> Result<Self, ToolError> {
        let text = serde_json::to_string_pretty(result)
            .map_err(|e| ToolError::Internal(format!("failed to encode result: {e}")))?;
        Ok(Self {
            content: vec![ToolContent { kind: "text", text }],
        })
    }

    /// The text of the first content item
    pub fn text(&self) -> &str {
        self.content.first().map_or("", |c| c.text.as_str())
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

fn tool(
    name: &'static str,
    description: &'static str,
    properties: Value,
    required: &[&str],
) -> ToolDefinition {
    let mut schema = Map::new();
    schema.insert("type".into(), json!("object"));
    schema.insert("properties".into(), properties);
    if !required.is_empty() {
        schema.insert("required".into(), json!(required));
    }
    ToolDefinition {
        name,
        description,
        input_schema: Value::Object(schema),
    }
}

fn string_prop(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

fn number_prop(description: &str) -> Value {
    json!({ "type": "number", "description": description })
}

fn one_or_many(item: &str, description: &str) -> Value {
    json!({
        "oneOf": [
            { "type": "string", "description": item },
            { "type": "array", "items": { "type": "string" }, "description": format!("{item} array") }
        ],
        "description": description
    })
}

fn build_catalog() -> Vec<ToolDefinition> {
    let member_schema = json!({
        "type": "object",
        "properties": {
            "member": string_prop("Member"),
            "score": number_prop("Score")
        },
        "required": ["member", "score"]
    });

    vec![
        // connection
        tool(
            "connect_redis",
            "Connect to a Redis server",
            json!({
                "host": string_prop("Redis server host"),
                "port": number_prop("Redis server port"),
                "username": string_prop("Username (optional)"),
                "password": string_prop("Password (optional)"),
                "db": number_prop("Database index (optional)"),
                "tls": { "type": "boolean", "description": "Use a TLS connection (optional)" }
            }),
            &["host", "port"],
        ),
        tool("disconnect_redis", "Disconnect from the Redis server", json!({}), &[]),
        // strings
        tool(
            "string_set",
            "Set a string value",
            json!({
                "key": string_prop("Key"),
                "value": string_prop("Value"),
                "expireSeconds": number_prop("Expiry in seconds (optional)")
            }),
            &["key", "value"],
        ),
        tool("string_get", "Get a string value", json!({ "key": string_prop("Key") }), &["key"]),
        tool(
            "string_incr",
            "Increment a numeric value",
            json!({
                "key": string_prop("Key"),
                "increment": number_prop("Increment (optional, defaults to 1)")
            }),
            &["key"],
        ),
        tool(
            "string_decr",
            "Decrement a numeric value",
            json!({
                "key": string_prop("Key"),
                "decrement": number_prop("Decrement (optional, defaults to 1)")
            }),
            &["key"],
        ),
        tool(
            "string_mset",
            "Set several string values",
            json!({
                "keyValues": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": { "key": string_prop("Key"), "value": string_prop("Value") },
                        "required": ["key", "value"]
                    },
                    "description": "Key/value pairs"
                }
            }),
            &["keyValues"],
        ),
        tool(
            "string_mget",
            "Get several string values",
            json!({
                "keys": { "type": "array", "items": { "type": "string" }, "description": "Keys" }
            }),
            &["keys"],
        ),
        // hashes
        tool(
            "hash_set",
            "Set a hash field",
            json!({
                "key": string_prop("Hash key"),
                "field": string_prop("Field"),
                "value": string_prop("Value")
            }),
            &["key", "field", "value"],
        ),
        tool(
            "hash_mset",
            "Set several hash fields",
            json!({
                "key": string_prop("Hash key"),
                "fieldValues": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": { "field": string_prop("Field"), "value": string_prop("Value") },
                        "required": ["field", "value"]
                    },
                    "description": "Field/value pairs"
                }
            }),
            &["key", "fieldValues"],
        ),
        tool(
            "hash_get",
            "Get a hash field",
            json!({ "key": string_prop("Hash key"), "field": string_prop("Field") }),
            &["key", "field"],
        ),
        tool(
            "hash_getall",
            "Get all fields of a hash",
            json!({ "key": string_prop("Hash key") }),
            &["key"],
        ),
        tool(
            "hash_del",
            "Delete hash fields",
            json!({
                "key": string_prop("Hash key"),
                "fields": one_or_many("Field", "Field or fields to delete")
            }),
            &["key", "fields"],
        ),
        // lists
        tool(
            "list_lpush",
            "Push values onto the head of a list",
            json!({
                "key": string_prop("List key"),
                "values": one_or_many("Value", "Value or values to push")
            }),
            &["key", "values"],
        ),
        tool(
            "list_rpush",
            "Push values onto the tail of a list",
            json!({
                "key": string_prop("List key"),
                "values": one_or_many("Value", "Value or values to push")
            }),
            &["key", "values"],
        ),
        tool(
            "list_lpop",
            "Pop values from the head of a list",
            json!({
                "key": string_prop("List key"),
                "count": number_prop("Number of values to pop (optional)")
            }),
            &["key"],
        ),
        tool(
            "list_rpop",
            "Pop values from the tail of a list",
            json!({
                "key": string_prop("List key"),
                "count": number_prop("Number of values to pop (optional)")
            }),
            &["key"],
        ),
        tool(
            "list_range",
            "Get a range of list elements",
            json!({
                "key": string_prop("List key"),
                "start": number_prop("Start index"),
                "stop": number_prop("Stop index (inclusive)")
            }),
            &["key", "start", "stop"],
        ),
        // sets
        tool(
            "set_add",
            "Add set members",
            json!({
                "key": string_prop("Set key"),
                "members": one_or_many("Member", "Member or members to add")
            }),
            &["key", "members"],
        ),
        tool(
            "set_remove",
            "Remove set members",
            json!({
                "key": string_prop("Set key"),
                "members": one_or_many("Member", "Member or members to remove")
            }),
            &["key", "members"],
        ),
        tool(
            "set_members",
            "Get all members of a set",
            json!({ "key": string_prop("Set key") }),
            &["key"],
        ),
        // sorted sets
        tool(
            "zset_add",
            "Add sorted set members",
            json!({
                "key": string_prop("Sorted set key"),
                "members": {
                    "oneOf": [
                        member_schema.clone(),
                        { "type": "array", "items": member_schema, "description": "Members" }
                    ],
                    "description": "Member or members to add"
                }
            }),
            &["key", "members"],
        ),
        tool(
            "zset_remove",
            "Remove sorted set members",
            json!({
                "key": string_prop("Sorted set key"),
                "members": one_or_many("Member", "Member or members to remove")
            }),
            &["key", "members"],
        ),
        tool(
            "zset_range",
            "Get a range of sorted set members",
            json!({
                "key": string_prop("Sorted set key"),
                "start": number_prop("Start index"),
                "stop": number_prop("Stop index (inclusive)"),
                "withScores": { "type": "boolean", "description": "Include scores (optional)" }
            }),
            &["key", "start", "stop"],
        ),
        // keys
        tool(
            "key_delete",
            "Delete keys",
            json!({ "keys": one_or_many("Key", "Key or keys to delete") }),
            &["keys"],
        ),
        tool(
            "key_expire",
            "Set a key's expiry",
            json!({ "key": string_prop("Key"), "seconds": number_prop("Expiry in seconds") }),
            &["key", "seconds"],
        ),
        tool(
            "key_ttl",
            "Get a key's remaining time to live",
            json!({ "key": string_prop("Key") }),
            &["key"],
        ),
        tool(
            "key_search",
            "Find keys matching a pattern",
            json!({ "pattern": string_prop("Glob pattern (supports * ? [])") }),
            &["pattern"],
        ),
        tool("key_type", "Get a key's type", json!({ "key": string_prop("Key") }), &["key"]),
        tool(
            "key_info",
            "Get a key's type and time to live",
            json!({ "key": string_prop("Key") }),
            &["key"],
        ),
        tool(
            "key_delete_pattern",
            "Delete all keys matching a pattern",
            json!({ "pattern": string_prop("Glob pattern (supports * ? [])") }),
            &["pattern"],
        ),
        tool("db_flush", "Remove every key from the current database", json!({}), &[]),
        // snapshots
        tool(
            "backup_create",
            "Create a backup of Redis data",
            json!({
                "filename": string_prop("Backup file name (optional)"),
                "path": string_prop("Backup directory (optional)"),
                "includePatterns": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Key patterns to include (optional, defaults to [\"*\"])"
                },
                "excludePatterns": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Key patterns to exclude (optional)"
                }
            }),
            &[],
        ),
        tool(
            "backup_restore",
            "Restore Redis data from a backup",
            json!({
                "filename": string_prop("Backup file name"),
                "path": string_prop("Backup directory (optional)"),
                "flushBeforeRestore": {
                    "type": "boolean",
                    "description": "Flush the database before restoring (optional, defaults to false)"
                }
            }),
            &["filename"],
        ),
    ]
}

static CATALOG: Lazy<Vec<ToolDefinition>> = Lazy::new(build_catalog);

/// Every tool this server exposes
pub fn catalog() -> &'static [ToolDefinition] {
    &CATALOG
}

pub fn find_tool(name: &str) -> Option<&'static ToolDefinition> {
    CATALOG.iter().find(|tool| tool.name == name)
}

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

/// A single value or an array of values
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }
}

#[derive(Deserialize)]
struct KeyArgs {
    key: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StringSetArgs {
    key: String,
    value: String,
    expire_seconds: Option<u64>,
}

#[derive(Deserialize)]
struct IncrArgs {
    key: String,
    increment: Option<i64>,
}

#[derive(Deserialize)]
struct DecrArgs {
    key: String,
    decrement: Option<i64>,
}

#[derive(Deserialize)]
struct KeyValue {
    key: String,
    value: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MsetArgs {
    key_values: Vec<KeyValue>,
}

#[derive(Deserialize)]
struct KeysArgs {
    keys: OneOrMany<String>,
}

#[derive(Deserialize)]
struct HashSetArgs {
    key: String,
    field: String,
    value: String,
}

#[derive(Deserialize)]
struct FieldValue {
    field: String,
    value: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HashMsetArgs {
    key: String,
    field_values: Vec<FieldValue>,
}

#[derive(Deserialize)]
struct HashGetArgs {
    key: String,
    field: String,
}

#[derive(Deserialize)]
struct HashDelArgs {
    key: String,
    fields: OneOrMany<String>,
}

#[derive(Deserialize)]
struct ValuesArgs {
    key: String,
    values: OneOrMany<String>,
}

#[derive(Deserialize)]
struct PopArgs {
    key: String,
    count: Option<usize>,
}

#[derive(Deserialize)]
struct RangeArgs {
    key: String,
    start: i64,
    stop: i64,
}

#[derive(Deserialize)]
struct MembersArgs {
    key: String,
    members: OneOrMany<String>,
}

#[derive(Deserialize)]
struct ZaddArgs {
    key: String,
    members: OneOrMany<SortedSetMember>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ZrangeArgs {
    key: String,
    start: i64,
    stop: i64,
    with_scores: Option<bool>,
}

#[derive(Deserialize)]
struct ExpireArgs {
    key: String,
    seconds: u64,
}

#[derive(Deserialize)]
struct PatternArgs {
    pattern: String,
}

fn parse_args<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, ToolError> {
    let arguments = match arguments {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

fn store_result<T: Serialize>(result: StoreResult<T>) -> OperationResult<Value> {
    match result {
        Ok(data) => match serde_json::to_value(data) {
            Ok(value) => OperationResult::ok(value),
            Err(e) => OperationResult::err(format!("Redis operation failed: {e}")),
        },
        Err(e) => OperationResult::from_store(Err(e)),
    }
}

/// Popped values: a single value (or null) unless more than one was requested
fn popped(result: StoreResult<Vec<String>>, count: Option<usize>) -> OperationResult<Value> {
    let many = count.is_some_and(|n| n > 1);
    store_result(result.map(|mut values| {
        if many {
            json!(values)
        } else {
            values.pop().map_or(Value::Null, Value::String)
        }
    }))
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Opens a store connection for `connect_redis`
pub type Connector = Arc<dyn Fn(ConnectionConfig) -> ConnectFuture + Send + Sync>;

pub type ConnectFuture = BoxFuture<'static, crate::Result<Arc<dyn KeyValueStore>>>;

/// Connector opening a [`RedisStore`]
pub fn redis_connector() -> Connector {
    Arc::new(|config: ConnectionConfig| -> ConnectFuture {
        Box::pin(async move {
            RedisStore::connect(&config)
                .await
                .map(|store| Arc::new(store) as Arc<dyn KeyValueStore>)
        })
    })
}

/// Connector handing out the same already-open store on every connect
pub fn shared_connector(store: Arc<dyn KeyValueStore>) -> Connector {
    Arc::new(move |_config: ConnectionConfig| -> ConnectFuture {
        Box::pin(futures::future::ready(Ok(store.clone())))
    })
}

/// Dispatches tool calls against the current connection
pub struct ToolRouter {
    store: Option<Arc<dyn KeyValueStore>>,
    connector: Connector,
}

impl Default for ToolRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRouter {
    /// Router that connects to Redis on `connect_redis`
    pub fn new() -> Self {
        Self::with_connector(redis_connector())
    }

    pub fn with_connector(connector: Connector) -> Self {
        Self {
            store: None,
            connector,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.store.is_some()
    }

    /// Open a connection, replacing any current one
    pub async fn connect(&mut self, config: ConnectionConfig) -> OperationResult<String> {
        let url = config.display_url();
        match (self.connector)(config).await {
            Ok(store) => {
                self.store = Some(store);
                info!(url = %url, "store connected");
                OperationResult::ok("Connected to Redis server".to_string())
            }
            Err(e) => {
                warn!(url = %url, error = %e, "store connection failed");
                OperationResult::err(format!("Failed to connect to Redis: {e}"))
            }
        }
    }

    pub fn disconnect(&mut self) -> OperationResult<String> {
        match self.store.take() {
            Some(_) => {
                info!("store disconnected");
                OperationResult::ok("Disconnected from Redis server".to_string())
            }
            None => OperationResult::err("Not connected to Redis"),
        }
    }

    /// Run one tool
    pub async fn call(&mut self, name: &str, arguments: Value) -> Result<ToolResponse, ToolError> {
        if find_tool(name).is_none() {
            return Err(ToolError::UnknownTool(name.to_string()));
        }
        debug!(tool = name, "tool call");

        match name {
            "connect_redis" => {
                let config: ConnectionConfig = parse_args(name, arguments)?;
                ToolResponse::from_result(&self.connect(config).await)
            }
            "disconnect_redis" => ToolResponse::from_result(&self.disconnect()),
            _ => {
                let store = self.store.clone().ok_or(ToolError::NotConnected)?;
                let result = dispatch(store, name, arguments).await?;
                ToolResponse::from_result(&result)
            }
        }
    }
}

async fn dispatch(
    store: Arc<dyn KeyValueStore>,
    name: &str,
    arguments: Value,
) -> Result<OperationResult<Value>, ToolError> {
    let result = match name {
        "string_set" => {
            let args: StringSetArgs = parse_args(name, arguments)?;
            let result = store.set(&args.key, &args.value, args.expire_seconds).await;
            store_result(result.map(|()| "OK"))
        }
        "string_get" => {
            let args: KeyArgs = parse_args(name, arguments)?;
            store_result(store.get(&args.key).await)
        }
        "string_incr" => {
            let args: IncrArgs = parse_args(name, arguments)?;
            store_result(store.incr_by(&args.key, args.increment.unwrap_or(1)).await)
        }
        "string_decr" => {
            let args: DecrArgs = parse_args(name, arguments)?;
            store_result(store.decr_by(&args.key, args.decrement.unwrap_or(1)).await)
        }
        "string_mset" => {
            let args: MsetArgs = parse_args(name, arguments)?;
            let pairs: Vec<(String, String)> = args
                .key_values
                .into_iter()
                .map(|kv| (kv.key, kv.value))
                .collect();
            store_result(store.mset(&pairs).await.map(|()| "OK"))
        }
        "string_mget" => {
            let args: KeysArgs = parse_args(name, arguments)?;
            store_result(store.mget(&args.keys.into_vec()).await)
        }
        "hash_set" => {
            let args: HashSetArgs = parse_args(name, arguments)?;
            store_result(store.hset(&args.key, &args.field, &args.value).await)
        }
        "hash_mset" => {
            let args: HashMsetArgs = parse_args(name, arguments)?;
            let fields: Vec<(String, String)> = args
                .field_values
                .into_iter()
                .map(|fv| (fv.field, fv.value))
                .collect();
            store_result(store.hset_multiple(&args.key, &fields).await)
        }
        "hash_get" => {
            let args: HashGetArgs = parse_args(name, arguments)?;
            store_result(store.hget(&args.key, &args.field).await)
        }
        "hash_getall" => {
            let args: KeyArgs = parse_args(name, arguments)?;
            store_result(store.hgetall(&args.key).await)
        }
        "hash_del" => {
            let args: HashDelArgs = parse_args(name, arguments)?;
            store_result(store.hdel(&args.key, &args.fields.into_vec()).await)
        }
        "list_lpush" => {
            let args: ValuesArgs = parse_args(name, arguments)?;
            store_result(store.lpush(&args.key, &args.values.into_vec()).await)
        }
        "list_rpush" => {
            let args: ValuesArgs = parse_args(name, arguments)?;
            store_result(store.rpush(&args.key, &args.values.into_vec()).await)
        }
        "list_lpop" => {
            let args: PopArgs = parse_args(name, arguments)?;
            popped(store.lpop(&args.key, args.count).await, args.count)
        }
        "list_rpop" => {
            let args: PopArgs = parse_args(name, arguments)?;
            popped(store.rpop(&args.key, args.count).await, args.count)
        }
        "list_range" => {
            let args: RangeArgs = parse_args(name, arguments)?;
            store_result(store.lrange(&args.key, args.start, args.stop).await)
        }
        "set_add" => {
            let args: MembersArgs = parse_args(name, arguments)?;
            store_result(store.sadd(&args.key, &args.members.into_vec()).await)
        }
        "set_remove" => {
            let args: MembersArgs = parse_args(name, arguments)?;
            store_result(store.srem(&args.key, &args.members.into_vec()).await)
        }
        "set_members" => {
            let args: KeyArgs = parse_args(name, arguments)?;
            store_result(store.smembers(&args.key).await)
        }
        "zset_add" => {
            let args: ZaddArgs = parse_args(name, arguments)?;
            store_result(store.zadd(&args.key, &args.members.into_vec()).await)
        }
        "zset_remove" => {
            let args: MembersArgs = parse_args(name, arguments)?;
            store_result(store.zrem(&args.key, &args.members.into_vec()).await)
        }
        "zset_range" => {
            let args: ZrangeArgs = parse_args(name, arguments)?;
            if args.with_scores.unwrap_or(false) {
                let result = store
                    .zrange_withscores(&args.key, args.start, args.stop)
                    .await
                    .map(|members| {
                        members
                            .into_iter()
                            .map(|m| json!({ "value": m.member, "score": m.score }))
                            .collect::<Vec<_>>()
                    });
                store_result(result)
            } else {
                store_result(store.zrange(&args.key, args.start, args.stop).await)
            }
        }
        "key_delete" => {
            let args: KeysArgs = parse_args(name, arguments)?;
            store_result(store.del(&args.keys.into_vec()).await)
        }
        "key_expire" => {
            let args: ExpireArgs = parse_args(name, arguments)?;
            store_result(store.expire(&args.key, args.seconds).await)
        }
        "key_ttl" => {
            let args: KeyArgs = parse_args(name, arguments)?;
            store_result(store.ttl(&args.key).await)
        }
        "key_search" => {
            let args: PatternArgs = parse_args(name, arguments)?;
            store_result(store.keys(&args.pattern).await)
        }
        "key_type" => {
            let args: KeyArgs = parse_args(name, arguments)?;
            store_result(store.key_type(&args.key).await)
        }
        "key_info" => {
            let args: KeyArgs = parse_args(name, arguments)?;
            store_result(store.key_info(&args.key).await)
        }
        "key_delete_pattern" => {
            let args: PatternArgs = parse_args(name, arguments)?;
            store_result(store.delete_by_pattern(&args.pattern).await)
        }
        "db_flush" => store_result(store.flushdb().await.map(|()| "OK")),
        "backup_create" => {
            let options: BackupOptions = parse_args(name, arguments)?;
            SnapshotService::new(store).backup(&options).await.map(Value::String)
        }
        "backup_restore" => {
            let options: RestoreOptions = parse_args(name, arguments)?;
            SnapshotService::new(store).restore(&options).await.map(Value::String)
        }
        other => return Err(ToolError::UnknownTool(other.to_string())),
    };
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn memory_connector(store: Arc<MemoryStore>) -> Connector {
        shared_connector(store)
    }

    async fn connected_router() -> (ToolRouter, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let mut router = ToolRouter::with_connector(memory_connector(store.clone()));
        router
            .call("connect_redis", json!({"host": "localhost", "port": 6379}))
            .await
            .unwrap();
        (router, store)
    }

    fn result_of(response: &ToolResponse) -> Value {
        serde_json::from_str(response.text()).unwrap()
    }

    #[test]
    fn test_catalog_is_complete_and_unique() {
        let names: HashSet<_> = catalog().iter().map(|t| t.name).collect();
        assert_eq!(names.len(), catalog().len());
        assert_eq!(catalog().len(), 34);
        for name in ["connect_redis", "zset_range", "backup_create", "backup_restore"] {
            assert!(names.contains(name), "missing {name}");
        }
        for tool in catalog() {
            assert_eq!(tool.input_schema["type"], "object");
        }
    }

    #[tokio::test]
    async fn test_unknown_tool_and_not_connected() {
        let mut router = ToolRouter::with_connector(memory_connector(Arc::new(MemoryStore::new())));

        let err = router.call("string_explode", json!({})).await.unwrap_err();
        assert_eq!(err.code(), error_codes::METHOD_NOT_FOUND);

        let err = router.call("string_get", json!({"key": "k"})).await.unwrap_err();
        assert_eq!(err, ToolError::NotConnected);
        assert_eq!(err.code(), error_codes::INVALID_REQUEST);
        assert_eq!(
            err.to_string(),
            "Not connected to Redis. Please use connect_redis first."
        );
    }

    #[tokio::test]
    async fn test_connect_and_disconnect() {
        let (mut router, _) = connected_router().await;
        assert!(router.is_connected());

        let response = router.call("disconnect_redis", json!({})).await.unwrap();
        assert_eq!(
            result_of(&response),
            json!({"success": true, "data": "Disconnected from Redis server"})
        );

        let response = router.call("disconnect_redis", Value::Null).await.unwrap();
        assert_eq!(
            result_of(&response),
            json!({"success": false, "error": "Not connected to Redis"})
        );
    }

    #[tokio::test]
    async fn test_string_tools() {
        let (mut router, _) = connected_router().await;

        let response = router
            .call("string_set", json!({"key": "counter", "value": "10"}))
            .await
            .unwrap();
        assert_eq!(result_of(&response), json!({"success": true, "data": "OK"}));

        let response = router
            .call("string_incr", json!({"key": "counter", "increment": 5}))
            .await
            .unwrap();
        assert_eq!(result_of(&response)["data"], 15);

        let response = router
            .call("string_get", json!({"key": "missing"}))
            .await
            .unwrap();
        assert_eq!(result_of(&response), json!({"success": true, "data": null}));

        let response = router
            .call("string_mget", json!({"keys": ["counter", "missing"]}))
            .await
            .unwrap();
        assert_eq!(result_of(&response)["data"], json!(["15", null]));
    }

    #[tokio::test]
    async fn test_one_or_many_arguments() {
        let (mut router, store) = connected_router().await;

        router
            .call("set_add", json!({"key": "tags", "members": "solo"}))
            .await
            .unwrap();
        router
            .call("set_add", json!({"key": "tags", "members": ["a", "b"]}))
            .await
            .unwrap();
        assert_eq!(store.smembers("tags").await.unwrap(), vec!["a", "b", "solo"]);

        router
            .call("zset_add", json!({"key": "board", "members": {"member": "ada", "score": 3}}))
            .await
            .unwrap();
        let response = router
            .call("zset_range", json!({"key": "board", "start": 0, "stop": -1, "withScores": true}))
            .await
            .unwrap();
        assert_eq!(
            result_of(&response)["data"],
            json!([{"value": "ada", "score": 3.0}])
        );
    }

    #[tokio::test]
    async fn test_pop_shapes() {
        let (mut router, _) = connected_router().await;
        router
            .call("list_rpush", json!({"key": "q", "values": ["a", "b", "c"]}))
            .await
            .unwrap();

        let single = router.call("list_lpop", json!({"key": "q"})).await.unwrap();
        assert_eq!(result_of(&single)["data"], "a");

        let many = router
            .call("list_lpop", json!({"key": "q", "count": 2}))
            .await
            .unwrap();
        assert_eq!(result_of(&many)["data"], json!(["b", "c"]));

        let empty = router.call("list_rpop", json!({"key": "q"})).await.unwrap();
        assert_eq!(result_of(&empty)["data"], Value::Null);
    }

    #[tokio::test]
    async fn test_store_errors_stay_inside_the_result() {
        let (mut router, store) = connected_router().await;
        store.fail_on("get", None).await;

        let response = router.call("string_get", json!({"key": "k"})).await.unwrap();
        let result = result_of(&response);
        assert_eq!(result["success"], false);
        assert!(result["error"]
            .as_str()
            .unwrap()
            .starts_with("Redis operation failed:"));
    }

    #[tokio::test]
    async fn test_invalid_arguments() {
        let (mut router, _) = connected_router().await;
        let err = router
            .call("list_range", json!({"key": "q", "start": "zero"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
        assert_eq!(err.code(), error_codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_key_info_and_delete_pattern() {
        let (mut router, store) = connected_router().await;
        store.set("tmp:1", "v", Some(60)).await.unwrap();
        store.set("tmp:2", "v", None).await.unwrap();

        let response = router.call("key_info", json!({"key": "tmp:2"})).await.unwrap();
        assert_eq!(
            result_of(&response)["data"],
            json!({"key": "tmp:2", "type": "string", "ttl": -1})
        );

        let response = router
            .call("key_delete_pattern", json!({"pattern": "tmp:*"}))
            .await
            .unwrap();
        assert_eq!(result_of(&response)["data"], 2);
    }

    #[tokio::test]
    async fn test_backup_tools_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().display().to_string();
        let (mut router, store) = connected_router().await;
        store.set("user:1", "ada", None).await.unwrap();

        let response = router
            .call("backup_create", json!({"filename": "b.json", "path": path}))
            .await
            .unwrap();
        assert_eq!(result_of(&response)["success"], true);

        router.call("db_flush", json!({})).await.unwrap();
        assert!(store.is_empty().await);

        let response = router
            .call("backup_restore", json!({"filename": "b.json", "path": path}))
            .await
            .unwrap();
        assert_eq!(result_of(&response)["success"], true);
        assert_eq!(store.get("user:1").await.unwrap().as_deref(), Some("ada"));
    }
}
