// toolgate-mcp/src/server.rs
// ============================================================================
// Module: MCP Server
// Description: JSON-RPC 2.0 tool server over HTTP and stdio transports.
// Purpose: Expose the discovered tool catalog to automated agents.
// Dependencies: axum, tokio, toolgate-core
// ============================================================================

//! ## Overview
//! The server speaks JSON-RPC 2.0 with the `initialize`, `ping`,
//! `tools/list`, and `tools/call` methods. Tool listings project each unary
//! method's input and output schemas on demand; streaming catalog entries
//! are omitted from listings and rejected on invocation. Caller headers
//! pass through the forwarding filter before becoming backend call
//! metadata. Inputs are untrusted: request bodies are size capped and
//! malformed envelopes receive JSON-RPC errors, never panics.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::routing::post;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use toolgate_config::GatewayConfig;
use toolgate_config::ServerTransport;
use toolgate_core::ErrorKind;
use toolgate_core::GatewayError;
use toolgate_core::SchemaProjector;
use toolgate_core::ServiceDiscoverer;
use toolgate_core::ServiceStats;

use crate::headers::HeaderFilter;

/// Protocol revision reported to initializing clients.
const PROTOCOL_VERSION: &str = "2024-11-05";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while building or running the server.
#[derive(Debug, Error)]
pub enum McpServerError {
    /// Configuration rejected during construction.
    #[error("config error: {0}")]
    Config(String),
    /// Backend connection or discovery failed during startup.
    #[error("startup error: {0}")]
    Startup(String),
    /// Serving transport failed.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: MCP Server
// ============================================================================

/// JSON-RPC tool server instance.
pub struct McpServer {
    /// Gateway configuration.
    config: GatewayConfig,
    /// Discoverer owning the backend connection and catalog.
    discoverer: Arc<ServiceDiscoverer>,
}

impl McpServer {
    /// Builds a server from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError::Config`] when the configuration is invalid.
    pub fn from_config(config: GatewayConfig) -> Result<Self, McpServerError> {
        config.validate().map_err(|err| McpServerError::Config(err.to_string()))?;
        let discoverer = Arc::new(ServiceDiscoverer::new(
            config.connection_config(),
            config.discovery_config(),
        ));
        Ok(Self {
            config,
            discoverer,
        })
    }

    /// Returns the discoverer backing this server.
    #[must_use]
    pub fn discoverer(&self) -> Arc<ServiceDiscoverer> {
        Arc::clone(&self.discoverer)
    }

    /// Connects, discovers, and serves on the configured transport.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when startup or the transport fails.
    pub async fn serve(self) -> Result<(), McpServerError> {
        self.discoverer
            .connect()
            .await
            .map_err(|err| McpServerError::Startup(err.to_string()))?;
        self.discoverer
            .discover()
            .await
            .map_err(|err| McpServerError::Startup(err.to_string()))?;
        let state = Arc::new(ServerState {
            discoverer: Arc::clone(&self.discoverer),
            header_filter: HeaderFilter::new(&self.config.server.forward_headers),
            max_body_bytes: self.config.server.max_body_bytes,
        });
        match self.config.server.transport {
            ServerTransport::Http => serve_http(&self.config.server.bind, state).await,
            ServerTransport::Stdio => serve_stdio(&state).await,
        }
    }
}

/// Shared state for transport handlers.
pub(crate) struct ServerState {
    /// Discoverer owning the catalog and backend channel.
    pub(crate) discoverer: Arc<ServiceDiscoverer>,
    /// Header forwarding filter.
    pub(crate) header_filter: HeaderFilter,
    /// Maximum accepted request body size.
    pub(crate) max_body_bytes: usize,
}

// ============================================================================
// SECTION: HTTP Transport
// ============================================================================

/// Serves JSON-RPC requests over HTTP.
async fn serve_http(bind: &str, state: Arc<ServerState>) -> Result<(), McpServerError> {
    let addr: SocketAddr =
        bind.parse().map_err(|_| McpServerError::Config("invalid bind address".to_string()))?;
    let limit = state.max_body_bytes;
    let app = Router::new()
        .route("/mcp", post(handle_rpc))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(limit))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|_| McpServerError::Transport("http bind failed".to_string()))?;
    tracing::info!(%addr, "serving json-rpc over http");
    axum::serve(listener, app)
        .await
        .map_err(|_| McpServerError::Transport("http server failed".to_string()))
}

/// Handles HTTP JSON-RPC requests.
///
/// JSON-RPC errors still ride HTTP 200; non-200 statuses are reserved for
/// transport-level conditions the envelope never reaches.
async fn handle_rpc(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    bytes: Bytes,
) -> impl IntoResponse {
    let forwarded = state.header_filter.filter(&headers);
    let response = dispatch_bytes(&state, &forwarded, &bytes).await;
    (StatusCode::OK, axum::Json(response))
}

/// Health payload reported on the HTTP surface.
#[derive(Debug, Serialize)]
struct HealthPayload {
    /// Coarse gateway status.
    status: &'static str,
    /// Discovery statistics.
    #[serde(flatten)]
    stats: ServiceStats,
}

/// Handles health requests with discovery statistics.
///
/// Health means the backend answers an active probe and discovery produced
/// at least one method; either condition failing reports 503.
async fn handle_health(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let stats = state.discoverer.stats().await;
    let probe = state.discoverer.health_probe().await;
    if let Err(error) = &probe {
        tracing::warn!(%error, "health probe failed");
    }
    let healthy = probe.is_ok() && stats.method_count > 0;
    let status = if healthy { "ok" } else { "degraded" };
    let code = if healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (
        code,
        axum::Json(HealthPayload {
            status,
            stats,
        }),
    )
}

// ============================================================================
// SECTION: Stdio Transport
// ============================================================================

/// Serves newline-delimited JSON-RPC over stdin/stdout.
async fn serve_stdio(state: &Arc<ServerState>) -> Result<(), McpServerError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    tracing::info!("serving json-rpc over stdio");
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|_| McpServerError::Transport("stdio read failed".to_string()))?
    {
        if line.trim().is_empty() {
            continue;
        }
        let response = if line.len() > state.max_body_bytes {
            oversized_response()
        } else {
            dispatch_bytes(state, &BTreeMap::new(), line.as_bytes()).await
        };
        let mut payload = serde_json::to_vec(&response)
            .map_err(|_| McpServerError::Transport("response serialization failed".to_string()))?;
        payload.push(b'\n');
        stdout
            .write_all(&payload)
            .await
            .map_err(|_| McpServerError::Transport("stdio write failed".to_string()))?;
        stdout
            .flush()
            .await
            .map_err(|_| McpServerError::Transport("stdio flush failed".to_string()))?;
    }
    Ok(())
}

// ============================================================================
// SECTION: JSON-RPC Envelope
// ============================================================================

/// Incoming JSON-RPC request payload.
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    /// JSON-RPC protocol version.
    jsonrpc: String,
    /// Request identifier.
    #[serde(default)]
    id: Value,
    /// Method name.
    method: String,
    /// Optional parameters payload.
    #[serde(default)]
    params: Option<Value>,
}

/// JSON-RPC response envelope.
#[derive(Debug, Serialize)]
pub(crate) struct JsonRpcResponse {
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
    /// Human-readable message with internals redacted.
    message: String,
    /// Structured error metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<JsonRpcErrorData>,
}

/// JSON-RPC error metadata payload.
#[derive(Debug, Serialize)]
struct JsonRpcErrorData {
    /// Normalized error kind label.
    kind: &'static str,
    /// Whether the request may be retried safely.
    retryable: bool,
}

/// Tool call parameters for `tools/call`.
#[derive(Debug, Deserialize)]
struct ToolCallParams {
    /// Tool identifier.
    name: String,
    /// JSON argument object; absent means empty.
    #[serde(default)]
    arguments: Option<Value>,
}

/// One listed tool with its projected schemas.
#[derive(Debug, Serialize)]
pub(crate) struct ToolDefinition {
    /// Tool identifier.
    name: String,
    /// Human-readable description.
    description: String,
    /// Projected input schema.
    #[serde(rename = "inputSchema")]
    input_schema: Value,
    /// Projected output schema.
    #[serde(rename = "outputSchema")]
    output_schema: Value,
}

/// Tool listing result payload.
#[derive(Debug, Serialize)]
struct ToolListResult {
    /// Listed tools in identifier order.
    tools: Vec<ToolDefinition>,
}

/// Tool call result payload.
#[derive(Debug, Serialize)]
struct ToolCallResult {
    /// Tool output content blocks.
    content: Vec<ToolContent>,
    /// Whether the call failed inside the backend boundary.
    #[serde(rename = "isError")]
    is_error: bool,
}

/// Tool output content blocks.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ToolContent {
    /// Text content carrying the response JSON.
    Text {
        /// Serialized response payload.
        text: String,
    },
}

// ============================================================================
// SECTION: Dispatch
// ============================================================================

/// Parses a request body and dispatches it.
///
/// Every outcome, including JSON-RPC errors, is an envelope response; the
/// transport always delivers it with a success status.
pub(crate) async fn dispatch_bytes(
    state: &ServerState,
    forwarded: &BTreeMap<String, String>,
    bytes: &[u8],
) -> JsonRpcResponse {
    let request: JsonRpcRequest = match serde_json::from_slice(bytes) {
        Ok(request) => request,
        Err(_) => {
            return error_response(Value::Null, -32700, "request is not valid json-rpc", None);
        }
    };
    if request.jsonrpc != "2.0" {
        return error_response(request.id, -32600, "invalid json-rpc version", None);
    }
    match request.method.as_str() {
        "initialize" => initialize_response(request.id),
        "ping" => result_response(request.id, Value::Object(serde_json::Map::new())),
        "tools/list" => handle_tools_list(state, request.id),
        "tools/call" => handle_tools_call(state, forwarded, request.id, request.params).await,
        _ => error_response(request.id, -32601, "method not found", None),
    }
}

/// Builds the `initialize` result payload.
fn initialize_response(id: Value) -> JsonRpcResponse {
    let result = serde_json::json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": { "tools": {} },
        "serverInfo": {
            "name": "toolgate",
            "version": env!("CARGO_PKG_VERSION"),
        },
    });
    result_response(id, result)
}

/// Handles `tools/list` by projecting every unary catalog entry.
fn handle_tools_list(state: &ServerState, id: Value) -> JsonRpcResponse {
    let catalog = state.discoverer.catalog();
    let projector = SchemaProjector::new(catalog.comments());
    let mut tools = Vec::new();
    for record in catalog.records() {
        if record.is_streaming() {
            continue;
        }
        let input_schema = match projector.project(&record.input) {
            Ok(schema) => schema,
            Err(error) => {
                tracing::warn!(tool = %record.tool_id, %error, "skipping tool with unprojectable input");
                continue;
            }
        };
        let output_schema = match projector.project(&record.output) {
            Ok(schema) => schema,
            Err(error) => {
                tracing::warn!(tool = %record.tool_id, %error, "skipping tool with unprojectable output");
                continue;
            }
        };
        tools.push(ToolDefinition {
            name: record.tool_id.clone(),
            description: record.description.clone(),
            input_schema,
            output_schema,
        });
    }
    match serde_json::to_value(ToolListResult {
        tools,
    }) {
        Ok(result) => result_response(id, result),
        Err(_) => error_response(id, -32603, "listing serialization failed", None),
    }
}

/// Handles `tools/call` by invoking through the discoverer.
async fn handle_tools_call(
    state: &ServerState,
    forwarded: &BTreeMap<String, String>,
    id: Value,
    params: Option<Value>,
) -> JsonRpcResponse {
    let params = params.unwrap_or(Value::Null);
    let Ok(call) = serde_json::from_value::<ToolCallParams>(params) else {
        return error_response(id, -32602, "invalid tool call params", None);
    };
    let arguments = call.arguments.unwrap_or(Value::Object(serde_json::Map::new()));
    if !arguments.is_object() {
        return error_response(id, -32602, "tool arguments must be an object", None);
    }
    let Ok(arguments_json) = serde_json::to_string(&arguments) else {
        return error_response(id, -32602, "tool arguments are not serializable", None);
    };
    match state.discoverer.invoke(&call.name, &arguments_json, forwarded, None).await {
        Ok(output) => {
            let result = ToolCallResult {
                content: vec![ToolContent::Text {
                    text: output,
                }],
                is_error: false,
            };
            match serde_json::to_value(result) {
                Ok(result) => result_response(id, result),
                Err(_) => error_response(id, -32603, "result serialization failed", None),
            }
        }
        Err(error) => tool_error_response(id, &error),
    }
}

/// Maps a gateway error onto the JSON-RPC surface.
///
/// Protocol-level failures (unknown tool, malformed arguments) become
/// JSON-RPC errors; execution failures surface as tool results flagged
/// `isError` so agents can read them as tool output.
fn tool_error_response(id: Value, error: &GatewayError) -> JsonRpcResponse {
    match error.kind() {
        ErrorKind::NotFound | ErrorKind::InvalidArgument => {
            error_response(id, -32602, &error.to_string(), Some(error))
        }
        _ => {
            let result = ToolCallResult {
                content: vec![ToolContent::Text {
                    text: format!("{}: {error}", error.kind().as_str()),
                }],
                is_error: true,
            };
            match serde_json::to_value(result) {
                Ok(result) => result_response(id, result),
                Err(_) => error_response(id, -32603, "result serialization failed", None),
            }
        }
    }
}

/// Builds a successful JSON-RPC response.
fn result_response(id: Value, result: Value) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0",
        id,
        result: Some(result),
        error: None,
    }
}

/// Builds a JSON-RPC error response.
fn error_response(
    id: Value,
    code: i64,
    message: &str,
    source: Option<&GatewayError>,
) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0",
        id,
        result: None,
        error: Some(JsonRpcError {
            code,
            message: message.to_string(),
            data: source.map(|error| JsonRpcErrorData {
                kind: error.kind().as_str(),
                retryable: error.retryable(),
            }),
        }),
    }
}

/// Builds the response for an oversized stdio line.
fn oversized_response() -> JsonRpcResponse {
    error_response(Value::Null, -32600, "request exceeds size limit", None)
}
