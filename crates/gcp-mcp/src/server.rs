// crates/gcp-mcp/src/server.rs
// ============================================================================
// Module: MCP Server
// Description: MCP server implementations for stdio and HTTP transports.
// Purpose: Expose GCP tools, resources, and prompts via JSON-RPC 2.0.
// Dependencies: gcp-mcp-core, gcp-mcp-config, axum, tokio
// ============================================================================

//! ## Overview
//! The MCP server speaks JSON-RPC 2.0 over stdio (`Content-Length` framing) or
//! HTTP (`POST /rpc`) and routes every call through
//! [`crate::tools::ToolRouter`]. Building the server resolves credentials and
//! creates the shared [`ClientContext`]; serving ends with a single
//! [`ClientContext::close_all`]. Request bodies are untrusted and bounded by
//! `server.max_body_bytes`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::post;
use gcp_mcp_config::AuditConfig;
use gcp_mcp_config::GcpMcpConfig;
use gcp_mcp_config::ServerTransport;
use gcp_mcp_core::AuditSink;
use gcp_mcp_core::ClientContext;
use gcp_mcp_core::CredentialBackend;
use gcp_mcp_core::CredentialResolver;
use gcp_mcp_core::FileAuditSink;
use gcp_mcp_core::GcpAuthBackend;
use gcp_mcp_core::HttpClientFactory;
use gcp_mcp_core::NoopAuditSink;
use gcp_mcp_core::StderrAuditSink;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::catalog::Catalog;
use crate::response;
use crate::tools::ToolError;
use crate::tools::ToolRouter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Protocol revision reported when the client does not request one.
const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name reported by `initialize`.
const SERVER_NAME: &str = "gcp-mcp";

// ============================================================================
// SECTION: MCP Server
// ============================================================================

/// MCP server instance.
pub struct McpServer {
    /// Server configuration.
    config: GcpMcpConfig,
    /// Router for request dispatch.
    router: ToolRouter,
}

impl McpServer {
    /// Builds a server from configuration, resolving credentials and the
    /// client context.
    ///
    /// Performs blocking network I/O; call it off the async executor.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when validation, credential resolution, or
    /// project resolution fails.
    pub fn from_config(config: GcpMcpConfig) -> Result<Self, McpServerError> {
        config.validate().map_err(|err| McpServerError::Config(err.to_string()))?;
        let audit = build_audit_sink(&config.audit)?;
        let backend: Arc<dyn CredentialBackend> =
            Arc::new(GcpAuthBackend::new().map_err(|err| McpServerError::Init(err.to_string()))?);
        let resolver = CredentialResolver::new(
            config.credential_settings(),
            Arc::clone(&backend),
            Arc::clone(&audit),
        );
        let credential = resolver.resolve().map_err(|err| McpServerError::Init(err.to_string()))?;
        let factory = Arc::new(HttpClientFactory::new(config.transport_settings()));
        let context = ClientContext::new(
            Arc::new(credential),
            &config.context_settings(),
            backend.as_ref(),
            factory,
            audit,
        )
        .map_err(|err| McpServerError::Init(err.to_string()))?;
        Ok(Self::with_context(config, Arc::new(context)))
    }

    /// Builds a server over an existing client context.
    #[must_use]
    pub fn with_context(config: GcpMcpConfig, context: Arc<ClientContext>) -> Self {
        let router = ToolRouter::new(context, Catalog::with_builtin_resources());
        Self {
            config,
            router,
        }
    }

    /// Returns the request router.
    #[must_use]
    pub const fn router(&self) -> &ToolRouter {
        &self.router
    }

    /// Serves requests on the configured transport until the input closes or
    /// Ctrl-C arrives, then closes all clients.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when the transport fails.
    pub async fn serve(self) -> Result<(), McpServerError> {
        let max_body_bytes = self.config.server.max_body_bytes;
        let result = match self.config.server.transport {
            ServerTransport::Stdio => {
                serve_stdio_until(
                    self.router.clone(),
                    std::io::stdin(),
                    std::io::stdout(),
                    max_body_bytes,
                    shutdown_signal(),
                )
                .await
            }
            ServerTransport::Http => serve_http(&self.config, self.router.clone()).await,
        };
        self.shutdown();
        result
    }

    /// Closes every constructed client. Later calls are no-ops.
    pub fn shutdown(&self) -> usize {
        let context = self.router.context();
        if context.is_closed() {
            return 0;
        }
        let closed = with_blocking(|| context.close_all());
        info!(closed, "mcp server shut down");
        closed
    }
}

/// Builds the audit sink selected by configuration.
///
/// # Errors
///
/// Returns [`McpServerError::Init`] when the audit file cannot be opened.
pub fn build_audit_sink(config: &AuditConfig) -> Result<Arc<dyn AuditSink>, McpServerError> {
    if !config.enabled {
        return Ok(Arc::new(NoopAuditSink));
    }
    match config.path.as_deref() {
        Some(path) => {
            let sink = FileAuditSink::new(Path::new(path))
                .map_err(|err| McpServerError::Init(format!("audit log {path}: {err}")))?;
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(StderrAuditSink)),
    }
}

// ============================================================================
// SECTION: Stdio Transport
// ============================================================================

/// Runs the stdio loop on a dedicated thread until the input closes or
/// `interrupt` resolves.
///
/// The thread is detached: a read parked on stdin must not hold up shutdown.
async fn serve_stdio_until<R, W>(
    router: ToolRouter,
    input: R,
    output: W,
    max_body_bytes: usize,
    interrupt: impl Future<Output = ()>,
) -> Result<(), McpServerError>
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    let (done_tx, done_rx) = tokio::sync::oneshot::channel();
    std::thread::Builder::new()
        .name("gcp-mcp-stdio".to_string())
        .spawn(move || {
            let _ = done_tx.send(serve_stdio(&router, input, output, max_body_bytes));
        })
        .map_err(|err| McpServerError::Transport(format!("stdio thread spawn failed: {err}")))?;
    tokio::select! {
        finished = done_rx => finished.unwrap_or_else(|_| {
            Err(McpServerError::Transport("stdio loop exited without a result".to_string()))
        }),
        () = interrupt => {
            info!("interrupt received; stopping stdio transport");
            Ok(())
        }
    }
}

/// Serves framed JSON-RPC requests until the input closes.
fn serve_stdio(
    router: &ToolRouter,
    input: impl Read,
    mut output: impl Write,
    max_body_bytes: usize,
) -> Result<(), McpServerError> {
    let mut reader = BufReader::new(input);
    info!("serving mcp over stdio");
    while let Some(bytes) = read_framed(&mut reader, max_body_bytes)? {
        let Some((_, response)) = parse_request(router, max_body_bytes, &bytes) else {
            continue;
        };
        let payload = serde_json::to_vec(&response)
            .map_err(|_| McpServerError::Transport("json-rpc serialization failed".to_string()))?;
        write_framed(&mut output, &payload)?;
    }
    info!("stdio input closed");
    Ok(())
}

// ============================================================================
// SECTION: HTTP Transport
// ============================================================================

/// Shared server state for HTTP handlers.
#[derive(Clone)]
struct ServerState {
    /// Router for request dispatch.
    router: ToolRouter,
    /// Maximum allowed request body size.
    max_body_bytes: usize,
}

/// Serves JSON-RPC requests over HTTP until interrupted.
async fn serve_http(config: &GcpMcpConfig, router: ToolRouter) -> Result<(), McpServerError> {
    let addr = config.server.bind_addr().map_err(|err| McpServerError::Config(err.to_string()))?;
    if !addr.ip().is_loopback() {
        warn!(%addr, "http transport bound to a non-loopback address");
    }
    let max_body_bytes = config.server.max_body_bytes;
    let state = Arc::new(ServerState {
        router,
        max_body_bytes,
    });
    let app = Router::new()
        .route("/rpc", post(handle_http))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| McpServerError::Transport(format!("http bind failed: {err}")))?;
    info!(%addr, "serving mcp over http");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| McpServerError::Transport(format!("http server failed: {err}")))
}

/// Resolves when the process receives Ctrl-C.
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        warn!("ctrl-c handler unavailable; server runs until killed");
        std::future::pending::<()>().await;
    }
}

/// Handles HTTP JSON-RPC requests.
async fn handle_http(State(state): State<Arc<ServerState>>, bytes: Bytes) -> Response {
    match parse_request(&state.router, state.max_body_bytes, &bytes) {
        Some((status, response)) => (status, axum::Json(response)).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

// ============================================================================
// SECTION: JSON-RPC Types
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

/// `tools/call` parameters.
#[derive(Debug, Deserialize)]
struct ToolCallParams {
    /// Tool name.
    name: String,
    /// Raw JSON arguments.
    #[serde(default)]
    arguments: Value,
}

/// `resources/read` parameters.
#[derive(Debug, Deserialize)]
struct ResourceReadParams {
    /// Resource URI.
    uri: String,
}

/// `prompts/get` parameters.
#[derive(Debug, Deserialize)]
struct PromptGetParams {
    /// Prompt name.
    name: String,
    /// Prompt arguments.
    #[serde(default)]
    arguments: Map<String, Value>,
}

/// Tool output content.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ToolContent {
    /// Text output carrying the serialized payload.
    Text {
        /// Serialized JSON payload.
        text: String,
    },
}

/// `tools/call` result.
#[derive(Debug, Serialize)]
struct ToolCallResult {
    /// Tool output content.
    content: Vec<ToolContent>,
    /// True when the payload reports an error.
    #[serde(rename = "isError")]
    is_error: bool,
}

// ============================================================================
// SECTION: JSON-RPC Handling
// ============================================================================

/// Parses and dispatches one request body; `None` means no reply is sent.
fn parse_request(
    router: &ToolRouter,
    max_body_bytes: usize,
    bytes: &[u8],
) -> Option<(StatusCode, JsonRpcResponse)> {
    if bytes.len() > max_body_bytes {
        return Some(rpc_error(
            StatusCode::PAYLOAD_TOO_LARGE,
            Value::Null,
            -32070,
            "request body too large".to_string(),
        ));
    }
    match serde_json::from_slice::<JsonRpcRequest>(bytes) {
        Ok(request) => handle_request(router, request),
        Err(_) => Some(rpc_error(
            StatusCode::BAD_REQUEST,
            Value::Null,
            -32700,
            "invalid json-rpc request".to_string(),
        )),
    }
}

/// Dispatches a JSON-RPC request to the router.
fn handle_request(
    router: &ToolRouter,
    request: JsonRpcRequest,
) -> Option<(StatusCode, JsonRpcResponse)> {
    let Some(id) = request.id else {
        debug!(method = %request.method, "notification received");
        return None;
    };
    if request.jsonrpc != "2.0" {
        return Some(rpc_error(
            StatusCode::BAD_REQUEST,
            id,
            -32600,
            "invalid json-rpc version".to_string(),
        ));
    }
    let params = request.params.unwrap_or(Value::Null);
    let outcome = match request.method.as_str() {
        "initialize" => Ok(initialize_result(&params)),
        "ping" => Ok(json!({})),
        "tools/list" => to_result(&json!({ "tools": router.list_tools() })),
        "tools/call" => call_tool(router, params),
        "resources/list" => to_result(&json!({ "resources": router.list_resources() })),
        "resources/read" => parse_params::<ResourceReadParams>(params).and_then(|params| {
            let contents = router.read_resource(&params.uri)?;
            to_result(&json!({ "contents": [contents] }))
        }),
        "prompts/list" => to_result(&json!({ "prompts": router.list_prompts() })),
        "prompts/get" => parse_params::<PromptGetParams>(params).and_then(|params| {
            let prompt = router.get_prompt(&params.name, &params.arguments)?;
            to_result(&prompt)
        }),
        method if method.starts_with("notifications/") => return None,
        _ => {
            return Some(rpc_error(
                StatusCode::BAD_REQUEST,
                id,
                -32601,
                "method not found".to_string(),
            ));
        }
    };
    Some(match outcome {
        Ok(result) => (
            StatusCode::OK,
            JsonRpcResponse {
                jsonrpc: "2.0",
                id,
                result: Some(result),
                error: None,
            },
        ),
        Err(err) => jsonrpc_error(id, err),
    })
}

/// Executes `tools/call` and wraps the payload as MCP content.
fn call_tool(router: &ToolRouter, params: Value) -> Result<Value, ToolError> {
    let call = parse_params::<ToolCallParams>(params)?;
    let payload = with_blocking(|| router.handle_tool_call(&call.name, &call.arguments))?;
    let text = serde_json::to_string(&payload).map_err(|_| ToolError::Serialization)?;
    to_result(&ToolCallResult {
        is_error: response::is_failure(&payload),
        content: vec![ToolContent::Text {
            text,
        }],
    })
}

/// Builds the `initialize` result, echoing the requested protocol version.
fn initialize_result(params: &Value) -> Value {
    let protocol_version = params
        .get("protocolVersion")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_PROTOCOL_VERSION);
    json!({
        "protocolVersion": protocol_version,
        "capabilities": {
            "tools": {},
            "resources": {},
            "prompts": {},
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        },
    })
}

/// Deserializes method parameters.
fn parse_params<T: for<'de> Deserialize<'de>>(params: Value) -> Result<T, ToolError> {
    serde_json::from_value(params).map_err(|err| ToolError::InvalidParams(err.to_string()))
}

/// Serializes a result payload.
fn to_result(value: &impl Serialize) -> Result<Value, ToolError> {
    serde_json::to_value(value).map_err(|_| ToolError::Serialization)
}

/// Runs blocking work, shifting off the async worker when a multi-threaded
/// runtime is active.
fn with_blocking<T>(work: impl FnOnce() -> T) -> T {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(work)
        }
        _ => work(),
    }
}

/// Builds a JSON-RPC error response.
fn rpc_error(
    status: StatusCode,
    id: Value,
    code: i64,
    message: String,
) -> (StatusCode, JsonRpcResponse) {
    (
        status,
        JsonRpcResponse {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
            }),
        },
    )
}

/// Builds a JSON-RPC error response for a routing failure.
fn jsonrpc_error(id: Value, error: ToolError) -> (StatusCode, JsonRpcResponse) {
    let (status, code) = match &error {
        ToolError::UnknownTool => (StatusCode::BAD_REQUEST, -32601),
        ToolError::UnknownPrompt(_) | ToolError::InvalidParams(_) => {
            (StatusCode::BAD_REQUEST, -32602)
        }
        ToolError::UnknownResource(_) => (StatusCode::OK, -32002),
        ToolError::Serialization => (StatusCode::OK, -32060),
    };
    rpc_error(status, id, code, response::redact(&error.to_string()))
}

// ============================================================================
// SECTION: Framing Helpers
// ============================================================================

/// Reads a framed stdio payload using MCP Content-Length headers.
///
/// Returns `Ok(None)` when the input closes before a new frame starts.
fn read_framed(
    reader: &mut BufReader<impl Read>,
    max_body_bytes: usize,
) -> Result<Option<Vec<u8>>, McpServerError> {
    let mut content_length: Option<usize> = None;
    let mut saw_header = false;
    let mut line = String::new();
    loop {
        line.clear();
        let bytes = reader
            .read_line(&mut line)
            .map_err(|_| McpServerError::Transport("stdio read failed".to_string()))?;
        if bytes == 0 {
            if saw_header {
                return Err(McpServerError::Transport("stdio closed mid-frame".to_string()));
            }
            return Ok(None);
        }
        if line.trim().is_empty() {
            if saw_header {
                break;
            }
            continue;
        }
        saw_header = true;
        let Some((name, value)) = line.split_once(':') else {
            return Err(McpServerError::Transport("malformed frame header".to_string()));
        };
        if name.trim().eq_ignore_ascii_case("content-length") {
            let parsed = value
                .trim()
                .parse::<usize>()
                .map_err(|_| McpServerError::Transport("invalid content length".to_string()))?;
            content_length = Some(parsed);
        }
    }
    let len = content_length
        .ok_or_else(|| McpServerError::Transport("missing content length".to_string()))?;
    if len > max_body_bytes {
        return Err(McpServerError::Transport("payload too large".to_string()));
    }
    let mut buf = vec![0u8; len];
    reader
        .read_exact(&mut buf)
        .map_err(|_| McpServerError::Transport("stdio read failed".to_string()))?;
    Ok(Some(buf))
}

/// Writes a framed stdio payload using MCP Content-Length headers.
fn write_framed(writer: &mut impl Write, payload: &[u8]) -> Result<(), McpServerError> {
    let header = format!("Content-Length: {}\r\n\r\n", payload.len());
    writer
        .write_all(header.as_bytes())
        .and_then(|()| writer.write_all(payload))
        .and_then(|()| writer.flush())
        .map_err(|_| McpServerError::Transport("stdio write failed".to_string()))
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// MCP server errors.
#[derive(Debug, thiserror::Error)]
pub enum McpServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================
