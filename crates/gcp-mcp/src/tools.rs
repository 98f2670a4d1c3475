// crates/gcp-mcp/src/tools.rs
// ============================================================================
// Module: Tool Router
// Description: Dispatch for MCP tools, resources, and prompts.
// Purpose: Route JSON-RPC calls onto the shared client context.
// Dependencies: gcp-mcp-core, serde, serde_json, tracing
// ============================================================================

//! ## Overview
//! [`ToolRouter`] owns an `Arc<ClientContext>` and the resource [`Catalog`].
//! Tool calls borrow service clients from the context per call and always
//! return a structured payload (see [`crate::response`]); GCP failures become
//! error payloads rather than JSON-RPC errors. Protocol-level problems such as
//! unknown names or malformed arguments surface as [`ToolError`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use gcp_mcp_core::ClientContext;
use gcp_mcp_core::ServiceKind;
use gcp_mcp_core::TransportError;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;
use tracing::debug;
use tracing::warn;

use crate::catalog::Catalog;
use crate::prompts;
use crate::prompts::PromptDefinition;
use crate::prompts::RenderedPrompt;
use crate::resources::ResourceContents;
use crate::resources::ResourceDefinition;
use crate::response;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Number of buckets sampled by `test_gcp_auth`.
const BUCKET_SAMPLE_SIZE: usize = 5;

// ============================================================================
// SECTION: Tool Names
// ============================================================================

/// Tools exposed by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    /// Lists a few buckets to prove the credential works.
    TestGcpAuth,
    /// Reports project, location, credential, and client state.
    GcpContext,
}

impl ToolName {
    /// Returns every tool in listing order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::TestGcpAuth, Self::GcpContext]
    }

    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TestGcpAuth => "test_gcp_auth",
            Self::GcpContext => "gcp_context",
        }
    }

    /// Parses a wire name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|tool| tool.as_str() == name)
    }

    /// Builds the listing entry.
    fn definition(self) -> ToolDefinition {
        let description = match self {
            Self::TestGcpAuth => "Test GCP authentication by listing up to five storage buckets",
            Self::GcpContext => {
                "Show the active project, location, credential state, and constructed clients"
            }
        };
        ToolDefinition {
            name: self.as_str(),
            description,
            input_schema: json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false,
            }),
        }
    }
}

/// Tool definition used by `tools/list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolDefinition {
    /// MCP tool name.
    pub name: &'static str,
    /// Tool description for clients.
    pub description: &'static str,
    /// JSON schema for tool input.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Router for tool, resource, and prompt requests.
#[derive(Clone)]
pub struct ToolRouter {
    /// Shared client context.
    context: Arc<ClientContext>,
    /// Registered resources.
    catalog: Arc<Catalog>,
}

impl ToolRouter {
    /// Creates a router over the given context and catalog.
    #[must_use]
    pub fn new(context: Arc<ClientContext>, catalog: Catalog) -> Self {
        Self {
            context,
            catalog: Arc::new(catalog),
        }
    }

    /// Returns the shared client context.
    #[must_use]
    pub const fn context(&self) -> &Arc<ClientContext> {
        &self.context
    }

    /// Lists available tools.
    #[must_use]
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        ToolName::all().iter().map(|tool| tool.definition()).collect()
    }

    /// Executes a tool call and returns its structured payload.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] when the tool is unknown or the arguments are not
    /// an object.
    pub fn handle_tool_call(&self, name: &str, arguments: &Value) -> Result<Value, ToolError> {
        let tool = ToolName::parse(name).ok_or(ToolError::UnknownTool)?;
        if !(arguments.is_null() || arguments.is_object()) {
            return Err(ToolError::InvalidParams("tool arguments must be an object".to_string()));
        }
        debug!(tool = tool.as_str(), "tool call");
        let payload = match tool {
            ToolName::TestGcpAuth => self.test_gcp_auth(),
            ToolName::GcpContext => self.gcp_context(),
        };
        if response::is_failure(&payload) {
            warn!(tool = tool.as_str(), "tool call returned error payload");
        }
        Ok(payload)
    }

    /// Lists registered resources.
    #[must_use]
    pub fn list_resources(&self) -> Vec<ResourceDefinition> {
        self.catalog.resources()
    }

    /// Reads a registered resource.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::UnknownResource`] for unregistered URIs.
    pub fn read_resource(&self, uri: &str) -> Result<ResourceContents, ToolError> {
        let resource =
            self.catalog.resource(uri).ok_or_else(|| ToolError::UnknownResource(uri.to_string()))?;
        resource.read(&self.context)
    }

    /// Lists registered prompts.
    #[must_use]
    pub fn list_prompts(&self) -> Vec<PromptDefinition> {
        prompts::list_prompts()
    }

    /// Renders a prompt.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] for unknown prompts or missing arguments.
    pub fn get_prompt(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> Result<RenderedPrompt, ToolError> {
        prompts::get_prompt(name, arguments)
    }

    /// Lists a sample of buckets in the active project.
    fn test_gcp_auth(&self) -> Value {
        let client = match self.context.get_client(ServiceKind::Storage) {
            Ok(client) => client,
            Err(err) => return response::gcp_failure(&err),
        };
        let project_id = self.context.project_id();
        let max_results = BUCKET_SAMPLE_SIZE.to_string();
        let query = [("project", project_id), ("maxResults", max_results.as_str())];
        match client.get_json("b", &query) {
            Ok(listing) => {
                let buckets: Vec<&str> = listing
                    .get("items")
                    .and_then(Value::as_array)
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(|item| item.get("name").and_then(Value::as_str))
                            .take(BUCKET_SAMPLE_SIZE)
                            .collect()
                    })
                    .unwrap_or_default();
                response::success(json!({
                    "message": format!("Authentication successful. Found {} buckets.", buckets.len()),
                    "project_id": project_id,
                    "buckets": buckets,
                }))
            }
            Err(err) => {
                response::failure(transport_kind_label(&err), &format!("Authentication failed: {err}"))
            }
        }
    }

    /// Reports the context state.
    fn gcp_context(&self) -> Value {
        let credential = self.context.credential();
        let clients: Vec<&str> =
            self.context.constructed_kinds().into_iter().map(ServiceKind::as_str).collect();
        response::success(json!({
            "project_id": self.context.project_id(),
            "location": self.context.location(),
            "credential": {
                "source": credential.origin().as_str(),
                "principal": credential.principal(),
                "valid": credential.is_valid(),
                "expires_at": credential.expires_at().and_then(response::rfc3339),
            },
            "clients": clients,
            "closed": self.context.is_closed(),
        }))
    }
}

/// Maps transport failures onto payload kinds.
const fn transport_kind_label(error: &TransportError) -> &'static str {
    match error {
        TransportError::Auth(_) => "authentication_error",
        TransportError::Closed => "client_initialization_error",
        TransportError::Http(_)
        | TransportError::Status {
            ..
        }
        | TransportError::Decode(_) => "transport_error",
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Tool routing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    /// Tool name not recognized.
    #[error("unknown tool")]
    UnknownTool,
    /// Resource URI not registered.
    #[error("unknown resource: {0}")]
    UnknownResource(String),
    /// Prompt name not registered.
    #[error("unknown prompt: {0}")]
    UnknownPrompt(String),
    /// Request parameters are malformed.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    /// Payload serialization failed.
    #[error("serialization failure")]
    Serialization,
}
