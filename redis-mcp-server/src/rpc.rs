/*!
Line-delimited JSON-RPC 2.0 over stdio.

One request per line on the input, one response per line on the output.
Requests without an `id` are notifications and get no response.
*/

use redis_mcp_core::tools::{catalog, error_codes};
use redis_mcp_core::ToolRouter;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::future::Future;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

pub const SERVER_NAME: &str = "redis-mcp";
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    fn new<S: Into<String>>(code: i64, message: S) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Response {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

impl Response {
    fn new(id: Value, outcome: Result<Value, RpcError>) -> Self {
        let (result, error) = match outcome {
            Ok(result) => (Some(result), None),
            Err(error) => (None, Some(error)),
        };
        Self {
            jsonrpc: "2.0",
            id,
            result,
            error,
        }
    }
}

/// Serves tool calls for one client session
pub struct RpcServer {
    router: ToolRouter,
}

impl RpcServer {
    pub fn new(router: ToolRouter) -> Self {
        Self { router }
    }

    /// Handle one input line; `None` for notifications
    pub async fn handle_line(&mut self, line: &str) -> Option<String> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "unparseable request");
                let error = RpcError::new(error_codes::PARSE_ERROR, format!("Parse error: {e}"));
                return encode(Response::new(Value::Null, Err(error)));
            }
        };

        let request: Request = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                let error =
                    RpcError::new(error_codes::INVALID_REQUEST, format!("Invalid request: {e}"));
                return encode(Response::new(Value::Null, Err(error)));
            }
        };

        let Some(id) = request.id else {
            debug!(method = %request.method, "notification ignored");
            return None;
        };

        let outcome = self.dispatch(&request.method, request.params).await;
        encode(Response::new(id, outcome))
    }

    async fn dispatch(&mut self, method: &str, params: Value) -> Result<Value, RpcError> {
        debug!(method, "request");
        match method {
            "initialize" => {
                let protocol_version = params
                    .get("protocolVersion")
                    .and_then(Value::as_str)
                    .unwrap_or(DEFAULT_PROTOCOL_VERSION)
                    .to_string();
                Ok(json!({
                    "protocolVersion": protocol_version,
                    "capabilities": { "tools": {} },
                    "serverInfo": {
                        "name": SERVER_NAME,
                        "version": env!("CARGO_PKG_VERSION")
                    }
                }))
            }
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": catalog() })),
            "tools/call" => {
                let params: CallParams = serde_json::from_value(params).map_err(|e| {
                    RpcError::new(error_codes::INVALID_PARAMS, format!("Invalid params: {e}"))
                })?;
                let response = self
                    .router
                    .call(&params.name, params.arguments)
                    .await
                    .map_err(|e| RpcError::new(e.code(), e.to_string()))?;
                serde_json::to_value(response)
                    .map_err(|e| RpcError::new(error_codes::INTERNAL_ERROR, e.to_string()))
            }
            other => Err(RpcError::new(
                error_codes::METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            )),
        }
    }

    /// Serve requests until the input closes or `shutdown` resolves
    pub async fn run<R, W, F>(&mut self, reader: R, mut writer: W, shutdown: F) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
        F: Future<Output = ()>,
    {
        let mut lines = reader.lines();
        tokio::pin!(shutdown);

        loop {
            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
            };
            let Some(line) = line else {
                debug!("input closed");
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            if let Some(response) = self.handle_line(&line).await {
                writer.write_all(response.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }

        if self.router.is_connected() {
            self.router.disconnect();
        }
        Ok(())
    }
}

fn encode(response: Response) -> Option<String> {
    match serde_json::to_string(&response) {
        Ok(line) => Some(line),
        Err(e) => {
            warn!(error = %e, "failed to encode response");
            None
        }
    }
}
