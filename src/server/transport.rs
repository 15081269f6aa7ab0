//! Line-delimited JSON-RPC 2.0 over a byte stream pair.
//!
//! One JSON object per line in both directions. The loop is single-threaded
//! by contract: a request is fully processed and its response written before
//! the next frame is read, which keeps approval prompts from interleaving.

use crate::server::Server;
use crate::tool::{ToolError, ToolResult};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

impl JsonRpcResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// Run the request loop until the input stream closes.
///
/// Reads tolerate trailing whitespace and a missing final newline. Requests
/// are served strictly in arrival order; notifications are read and ignored.
pub async fn serve<R, W>(server: &Server, reader: R, mut writer: W) -> crate::error::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(response) = handle_line(server, line).await {
            let mut out = response.into_bytes();
            out.push(b'\n');
            writer.write_all(&out).await?;
            writer.flush().await?;
        }
    }
    tracing::info!("input stream closed, shutting down");
    Ok(())
}

/// Process one frame; `None` means nothing goes back (notification).
pub async fn handle_line(server: &Server, line: &str) -> Option<String> {
    let request: JsonRpcRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(err) => {
            return respond(JsonRpcResponse::error(
                Value::Null,
                PARSE_ERROR,
                format!("parse error: {err}"),
            ));
        }
    };

    if request.jsonrpc != "2.0" {
        return request.id.map(|id| {
            JsonRpcResponse::error(id, INVALID_REQUEST, "unsupported JSON-RPC version")
        }).and_then(respond);
    }

    // Notifications carry no id and get no response.
    let Some(id) = request.id else {
        tracing::debug!(method = %request.method, "ignoring notification");
        return None;
    };

    let response = match request.method.as_str() {
        "initialize" => handle_initialize(server, id, &request.params).await,
        "tools/list" => handle_tools_list(server, id).await,
        "tools/call" => handle_tools_call(server, id, &request.params).await,
        "ping" => JsonRpcResponse::success(id, json!({})),
        other => JsonRpcResponse::error(
            id,
            METHOD_NOT_FOUND,
            format!("method not found: {other}"),
        ),
    };
    respond(response)
}

fn respond(response: JsonRpcResponse) -> Option<String> {
    match serde_json::to_string(&response) {
        Ok(text) => Some(text),
        Err(err) => {
            tracing::error!(%err, "failed to serialize response");
            serde_json::to_string(&JsonRpcResponse::error(
                Value::Null,
                INTERNAL_ERROR,
                "response serialization failed",
            ))
            .ok()
        }
    }
}

async fn handle_initialize(server: &Server, id: Value, params: &Value) -> JsonRpcResponse {
    let requested = params.get("protocolVersion").and_then(Value::as_str);
    if requested != Some(crate::PROTOCOL_VERSION) {
        return JsonRpcResponse::error(
            id,
            INVALID_PARAMS,
            format!(
                "unsupported protocol version {} (want {})",
                requested.unwrap_or("<missing>"),
                crate::PROTOCOL_VERSION
            ),
        );
    }

    let config = server.config().await;
    JsonRpcResponse::success(
        id,
        json!({
            "protocolVersion": crate::PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": config.server_name(),
                "version": env!("CARGO_PKG_VERSION"),
            },
        }),
    )
}

async fn handle_tools_list(server: &Server, id: Value) -> JsonRpcResponse {
    let tools: Vec<Value> = server
        .registry()
        .iter()
        .map(|tool| {
            json!({
                "name": tool.name(),
                "description": tool.description(),
                "inputSchema": crate::tool::to_input_schema(&tool.params()),
            })
        })
        .collect();
    JsonRpcResponse::success(id, json!({ "tools": tools }))
}

async fn handle_tools_call(server: &Server, id: Value, params: &Value) -> JsonRpcResponse {
    let Some(name) = params.get("name").and_then(Value::as_str) else {
        return JsonRpcResponse::error(id, INVALID_PARAMS, "missing tool name");
    };
    let arguments = match params.get("arguments") {
        None => serde_json::Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(_) => {
            return JsonRpcResponse::error(id, INVALID_PARAMS, "arguments must be an object");
        }
    };

    tracing::debug!(tool = name, "dispatching tools/call");
    match server.call_tool(name, &arguments).await {
        Ok(result) => JsonRpcResponse::success(id, tool_success(&result)),
        Err(err) => JsonRpcResponse::success(id, tool_failure(&err)),
    }
}

fn tool_success(result: &ToolResult) -> Value {
    let text = match result {
        ToolResult::Text(text) => text.clone(),
        ToolResult::Json(value) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
    };
    json!({
        "content": [{ "type": "text", "text": text }],
        "isError": false,
    })
}

/// Tool-level failures ride a *successful* JSON-RPC response with
/// `isError: true`; only framework-level failures become JSON-RPC errors.
fn tool_failure(err: &ToolError) -> Value {
    json!({
        "content": [{ "type": "text", "text": err.to_string() }],
        "isError": true,
    })
}
