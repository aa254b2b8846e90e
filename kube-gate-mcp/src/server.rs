// kube-gate-mcp/src/server.rs
// ============================================================================
// Module: MCP Server
// Description: JSON-RPC 2.0 server over stdio and HTTP transports.
// Purpose: Deliver tool invocations to the router and return results.
// Dependencies: axum, tokio, kube-gate-config
// ============================================================================

//! ## Overview
//! The server speaks JSON-RPC 2.0 over newline-delimited stdio or HTTP POST.
//! It handles `initialize`, `tools/list`, and `tools/call`; every tool call
//! routes through [`crate::tools::ToolRouter`]. Tool-level failures become a
//! successful JSON-RPC response whose single text block is prefixed
//! `Error: ` and flagged `isError`; only malformed envelopes produce
//! JSON-RPC errors. The forwarded-identity header is read on HTTP requests;
//! stdio requests are anonymous.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use kube_gate_config::Configuration;
use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use serde_json::Value;
use thiserror::Error;
use tokio::io::AsyncBufReadExt as _;
use tokio::io::AsyncWriteExt as _;
use tokio::io::BufReader;

use crate::catalog::tool_definitions;
use crate::identity::claims_from_headers;
use crate::tools::RequestContext;
use crate::tools::ToolRouter;

/// MCP protocol revision advertised during the handshake.
const PROTOCOL_VERSION: &str = "2025-06-18";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while serving transports.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Server configuration is not servable.
    #[error("invalid server configuration: {0}")]
    Config(String),
    /// The transport failed irrecoverably.
    #[error("transport failure: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: MCP Server
// ============================================================================

/// MCP server instance.
pub struct McpServer {
    config: Configuration,
    router: ToolRouter,
}

impl McpServer {
    /// Builds a server from configuration and a tool router.
    #[must_use]
    pub fn new(config: Configuration, router: ToolRouter) -> Self {
        Self {
            config,
            router,
        }
    }

    /// Serves requests on the configured transport until shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when the transport fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let state = Arc::new(ServerState {
            router: self.router,
            server_name: self.config.server.name.clone(),
            server_version: self.config.server.version.clone(),
            forwarded_header: self.config.middleware.jwt.validation.forwarded_header.clone(),
        });
        match self.config.server.transport.transport_type {
            kube_gate_config::TransportType::Stdio => serve_stdio(state).await,
            kube_gate_config::TransportType::Http => {
                serve_http(state, &self.config.server.transport.http.host).await
            }
        }
    }
}

/// Shared state for transport handlers.
struct ServerState {
    /// Tool router for request dispatch.
    router: ToolRouter,
    /// Server name advertised during the handshake.
    server_name: String,
    /// Server version advertised during the handshake.
    server_version: String,
    /// Header carrying the forwarded bearer token.
    forwarded_header: String,
}

// ============================================================================
// SECTION: Stdio Transport
// ============================================================================

/// Serves newline-delimited JSON-RPC over stdin/stdout.
async fn serve_stdio(state: Arc<ServerState>) -> Result<(), ServerError> {
    tracing::info!("starting stdio transport");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        let line = lines
            .next_line()
            .await
            .map_err(|err| ServerError::Transport(format!("stdin read failed: {err}")))?;
        let Some(line) = line else {
            return Ok(());
        };
        if line.trim().is_empty() {
            continue;
        }
        let context = RequestContext::anonymous();
        let Some(response) = handle_payload(&state, &context, line.as_bytes()).await else {
            continue;
        };
        let mut payload = serde_json::to_vec(&response.body)
            .map_err(|_| ServerError::Transport("response serialization failed".to_string()))?;
        payload.push(b'\n');
        stdout
            .write_all(&payload)
            .await
            .map_err(|err| ServerError::Transport(format!("stdout write failed: {err}")))?;
        stdout
            .flush()
            .await
            .map_err(|err| ServerError::Transport(format!("stdout flush failed: {err}")))?;
    }
}

// ============================================================================
// SECTION: HTTP Transport
// ============================================================================

/// Serves JSON-RPC over HTTP POST.
async fn serve_http(state: Arc<ServerState>, host: &str) -> Result<(), ServerError> {
    let addr: SocketAddr =
        host.parse().map_err(|_| ServerError::Config(format!("invalid bind address {host:?}")))?;
    let app = Router::new().route("/mcp", post(handle_http)).with_state(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| ServerError::Transport(format!("http bind failed: {err}")))?;
    tracing::info!(%addr, "starting http transport");
    axum::serve(listener, app)
        .await
        .map_err(|err| ServerError::Transport(format!("http server failed: {err}")))
}

/// Handles one HTTP JSON-RPC request.
async fn handle_http(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> (StatusCode, axum::Json<Value>) {
    let claims = claims_from_headers(&headers, &state.forwarded_header);
    let context = RequestContext::with_claims(claims);
    match handle_payload(&state, &context, &body).await {
        Some(response) => (response.status, axum::Json(response.body)),
        // A notification gets an empty acknowledgement body.
        None => (StatusCode::ACCEPTED, axum::Json(Value::Null)),
    }
}

// ============================================================================
// SECTION: JSON-RPC Handling
// ============================================================================

/// Incoming JSON-RPC request payload.
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    /// JSON-RPC protocol version.
    jsonrpc: String,
    /// Request identifier; absent for notifications.
    #[serde(default)]
    id: Option<Value>,
    /// Method name.
    method: String,
    /// Optional parameters payload.
    #[serde(default)]
    params: Option<Value>,
}

/// JSON-RPC response envelope.
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    /// JSON-RPC protocol version.
    jsonrpc: &'static str,
    /// Request identifier.
    id: Value,
    /// Successful result payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    /// Error payload when the request fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

/// JSON-RPC error payload.
#[derive(Debug, Serialize)]
struct JsonRpcError {
    /// Error code.
    code: i64,
    /// Human-readable error message.
    message: String,
}

/// Tool call parameters for `tools/call`.
#[derive(Debug, Deserialize)]
struct ToolCallParams {
    /// Tool name.
    name: String,
    /// Raw JSON arguments.
    #[serde(default)]
    arguments: Value,
}

/// Response with transport status and JSON-RPC body.
struct Response {
    status: StatusCode,
    body: Value,
}

/// Parses and dispatches one request; `None` for notifications.
async fn handle_payload(
    state: &ServerState,
    context: &RequestContext,
    payload: &[u8],
) -> Option<Response> {
    let request: JsonRpcRequest = match serde_json::from_slice(payload) {
        Ok(request) => request,
        Err(err) => {
            return Some(error_response(
                StatusCode::BAD_REQUEST,
                Value::Null,
                -32700,
                format!("parse error: {err}"),
            ));
        }
    };
    if request.jsonrpc != "2.0" {
        let id = request.id.unwrap_or(Value::Null);
        return Some(error_response(
            StatusCode::BAD_REQUEST,
            id,
            -32600,
            "invalid json-rpc version".to_string(),
        ));
    }
    if request.method.starts_with("notifications/") {
        return None;
    }
    let id = request.id.unwrap_or(Value::Null);
    let response = match request.method.as_str() {
        "initialize" => initialize_response(state, id),
        "tools/list" => tools_list_response(id),
        "tools/call" => tools_call_response(state, context, id, request.params).await,
        _ => error_response(
            StatusCode::BAD_REQUEST,
            id,
            -32601,
            "method not found".to_string(),
        ),
    };
    Some(response)
}

/// Builds the `initialize` handshake response.
fn initialize_response(state: &ServerState, id: Value) -> Response {
    result_response(
        id,
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {"tools": {}},
            "serverInfo": {
                "name": state.server_name,
                "version": state.server_version,
            },
        }),
    )
}

/// Builds the `tools/list` response from the catalog.
fn tools_list_response(id: Value) -> Response {
    match serde_json::to_value(tool_definitions()) {
        Ok(tools) => result_response(id, json!({"tools": tools})),
        Err(_) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            id,
            -32603,
            "catalog serialization failed".to_string(),
        ),
    }
}

/// Dispatches a `tools/call` request through the router.
async fn tools_call_response(
    state: &ServerState,
    context: &RequestContext,
    id: Value,
    params: Option<Value>,
) -> Response {
    let params = params.unwrap_or(Value::Null);
    let Ok(call) = serde_json::from_value::<ToolCallParams>(params) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            id,
            -32602,
            "invalid tool call parameters".to_string(),
        );
    };
    let result = state.router.handle_tool_call(context, &call.name, call.arguments).await;
    let (text, is_error) = match result {
        Ok(text) => (text, false),
        Err(err) => (format!("Error: {err}"), true),
    };
    result_response(
        id,
        json!({
            "content": [{"type": "text", "text": text}],
            "isError": is_error,
        }),
    )
}

/// Wraps a result payload in the JSON-RPC envelope.
fn result_response(id: Value, result: Value) -> Response {
    Response {
        status: StatusCode::OK,
        body: serde_json::to_value(JsonRpcResponse {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        })
        .unwrap_or(Value::Null),
    }
}

/// Wraps an error payload in the JSON-RPC envelope.
fn error_response(status: StatusCode, id: Value, code: i64, message: String) -> Response {
    Response {
        status,
        body: serde_json::to_value(JsonRpcResponse {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
            }),
        })
        .unwrap_or(Value::Null),
    }
}

#[cfg(test)]
mod tests;
