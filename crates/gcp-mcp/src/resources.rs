// crates/gcp-mcp/src/resources.rs
// ============================================================================
// Module: Resources
// Description: Resource definitions and readers exposed through `resources/*`.
// Purpose: Report project and per-service client state without network calls.
// Dependencies: gcp-mcp-core, serde, serde_json
// ============================================================================

//! ## Overview
//! A resource pairs its listing metadata with a [`ResourceSource`] that
//! decides how it is read. Reads only inspect the [`ClientContext`]; they never
//! construct clients.

// ============================================================================
// SECTION: Imports
// ============================================================================

use gcp_mcp_core::ClientContext;
use gcp_mcp_core::ServiceKind;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

use crate::tools::ToolError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// URI of the connectivity test resource.
pub const HELLO_URI: &str = "test://hello";
/// URI of the active project resource.
pub const PROJECT_URI: &str = "gcp://project";
/// URI prefix of per-service status resources.
pub const SERVICE_URI_PREFIX: &str = "gcp://services/";

/// Plain-text MIME type.
const TEXT_PLAIN: &str = "text/plain";
/// JSON MIME type.
const APPLICATION_JSON: &str = "application/json";

// ============================================================================
// SECTION: Types
// ============================================================================

/// How a resource is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceSource {
    /// Static greeting.
    Greeting,
    /// Active project and location.
    Project,
    /// Client state for one service kind.
    ServiceStatus(ServiceKind),
}

/// Resource listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceDefinition {
    /// Resource URI.
    pub uri: String,
    /// Short name.
    pub name: String,
    /// Description for clients.
    pub description: String,
    /// Content MIME type.
    #[serde(rename = "mimeType")]
    pub mime_type: &'static str,
    /// Reader for this resource.
    #[serde(skip)]
    pub source: ResourceSource,
}

impl ResourceDefinition {
    /// The `test://hello` resource.
    #[must_use]
    pub fn greeting() -> Self {
        Self {
            uri: HELLO_URI.to_string(),
            name: "hello".to_string(),
            description: "Connectivity check returning a fixed greeting".to_string(),
            mime_type: TEXT_PLAIN,
            source: ResourceSource::Greeting,
        }
    }

    /// The `gcp://project` resource.
    #[must_use]
    pub fn project() -> Self {
        Self {
            uri: PROJECT_URI.to_string(),
            name: "project".to_string(),
            description: "Active GCP project and default location".to_string(),
            mime_type: APPLICATION_JSON,
            source: ResourceSource::Project,
        }
    }

    /// The `gcp://services/{kind}` status resource.
    #[must_use]
    pub fn service_status(kind: ServiceKind) -> Self {
        let spec = kind.spec();
        Self {
            uri: format!("{SERVICE_URI_PREFIX}{}", kind.as_str()),
            name: format!("{} status", spec.display_name),
            description: format!("Client state for {}", spec.display_name),
            mime_type: APPLICATION_JSON,
            source: ResourceSource::ServiceStatus(kind),
        }
    }

    /// Reads the resource against the active context.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Serialization`] when JSON rendering fails.
    pub fn read(&self, context: &ClientContext) -> Result<ResourceContents, ToolError> {
        let text = match self.source {
            ResourceSource::Greeting => "Hello World".to_string(),
            ResourceSource::Project => render(&json!({
                "project_id": context.project_id(),
                "location": context.location(),
            }))?,
            ResourceSource::ServiceStatus(kind) => render(&service_status(context, kind))?,
        };
        Ok(ResourceContents {
            uri: self.uri.clone(),
            mime_type: self.mime_type,
            text,
        })
    }
}

/// Content returned by `resources/read`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceContents {
    /// Resource URI.
    pub uri: String,
    /// Content MIME type.
    #[serde(rename = "mimeType")]
    pub mime_type: &'static str,
    /// Text body.
    pub text: String,
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds the status document for one service kind.
fn service_status(context: &ClientContext, kind: ServiceKind) -> Value {
    let spec = kind.spec();
    json!({
        "kind": kind.as_str(),
        "display_name": spec.display_name,
        "endpoint": spec.endpoint,
        "binds_project": spec.binds_project,
        "constructed": context.constructed_kinds().contains(&kind),
        "context_closed": context.is_closed(),
    })
}

/// Serializes a JSON document for a text resource body.
fn render(value: &Value) -> Result<String, ToolError> {
    serde_json::to_string_pretty(value).map_err(|_| ToolError::Serialization)
}
