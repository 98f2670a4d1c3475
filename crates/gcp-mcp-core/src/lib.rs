// crates/gcp-mcp-core/src/lib.rs
// ============================================================================
// Module: GCP MCP Core
// Description: Credential resolution and service client lifecycle for GCP.
// Purpose: Provide one credential and a per-kind client cache to handlers.
// Dependencies: gcp_auth, reqwest, serde, thiserror, tokio, tracing
// ============================================================================

//! ## Overview
//! This crate holds the engineering core of the GCP MCP server: the
//! [`CredentialResolver`], which picks authentication material in a fixed
//! priority order, and the [`ClientContext`], which lazily constructs and
//! caches one service client per [`ServiceKind`] and tears them down on
//! shutdown. Token exchange and transports sit behind traits so handlers and
//! tests can substitute deterministic implementations.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod backend;
pub mod credentials;
pub mod error;
pub mod registry;
pub mod service;
pub mod transport;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditAction;
pub use audit::AuditEvent;
pub use audit::AuditOutcome;
pub use audit::AuditSink;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use backend::GcpAuthBackend;
pub use credentials::AccessToken;
pub use credentials::AmbientCredential;
pub use credentials::BackendError;
pub use credentials::CLOUD_PLATFORM_SCOPE;
pub use credentials::Credential;
pub use credentials::CredentialBackend;
pub use credentials::CredentialResolver;
pub use credentials::CredentialSettings;
pub use credentials::CredentialSourceKind;
pub use credentials::InlineJsonPolicy;
pub use credentials::ServiceAccountKey;
pub use credentials::TokenSource;
pub use error::GcpError;
pub use registry::ClientBinding;
pub use registry::ClientContext;
pub use registry::ClientFactory;
pub use registry::ContextSettings;
pub use registry::DEFAULT_LOCATION;
pub use registry::ServiceClientHandle;
pub use registry::ServiceTransport;
pub use registry::resolve_location;
pub use registry::resolve_project_id;
pub use service::SERVICE_SPECS;
pub use service::ServiceKind;
pub use service::ServiceSpec;
pub use transport::HttpClientFactory;
pub use transport::TransportError;
pub use transport::TransportSettings;
