// crates/gcp-mcp/src/lib.rs
// ============================================================================
// Module: GCP MCP Server
// Description: MCP server exposing GCP tools, resources, and prompts.
// Purpose: Provide JSON-RPC adapters over the shared GCP client context.
// Dependencies: gcp-mcp-core, gcp-mcp-config, axum, tokio
// ============================================================================

//! ## Overview
//! GCP MCP serves the Model Context Protocol over stdio or HTTP. Tools borrow
//! service clients from one shared [`gcp_mcp_core::ClientContext`]; resources
//! come from the static [`catalog::SERVICE_REGISTRATIONS`] table; every tool
//! result is a structured payload with redacted error messages.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod catalog;
pub mod prompts;
pub mod resources;
pub mod response;
pub mod server;
pub mod tools;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use catalog::Catalog;
pub use catalog::SERVICE_REGISTRATIONS;
pub use catalog::ServiceRegistration;
pub use prompts::PromptDefinition;
pub use prompts::RenderedPrompt;
pub use resources::ResourceContents;
pub use resources::ResourceDefinition;
pub use resources::ResourceSource;
pub use server::McpServer;
pub use server::McpServerError;
pub use server::build_audit_sink;
pub use tools::ToolDefinition;
pub use tools::ToolError;
pub use tools::ToolName;
pub use tools::ToolRouter;
