// crates/gcp-mcp-core/src/error.rs
// ============================================================================
// Module: Core Errors
// Description: Error taxonomy for credential resolution and client lifecycle.
// Purpose: Surface failing source/kind and cause to callers without panics.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`GcpError`] is the single error type returned by the credential resolver
//! and the client registry. Each variant names the failing credential source
//! or service kind together with the underlying cause. Handlers built on top
//! of the core convert these errors into structured failure payloads using
//! [`GcpError::kind_label`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::credentials::CredentialSourceKind;
use crate::service::ServiceKind;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by credential resolution and client management.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GcpError {
    /// Malformed credential material from a source that parses strictly.
    #[error("credential parse error ({origin}): {message}")]
    CredentialParse {
        /// Credential source that produced the malformed material.
        origin: CredentialSourceKind,
        /// Parse failure detail.
        message: String,
    },
    /// No source produced a usable credential, or refresh failed.
    #[error("authentication error: {0}")]
    Authentication(String),
    /// The project identifier could not be determined.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A service client failed to construct or was requested after shutdown.
    #[error("client initialization error ({kind}): {message}")]
    ClientInitialization {
        /// Service kind that failed.
        kind: ServiceKind,
        /// Failure detail.
        message: String,
    },
}

impl GcpError {
    /// Returns a stable label for structured error payloads.
    #[must_use]
    pub const fn kind_label(&self) -> &'static str {
        match self {
            Self::CredentialParse {
                ..
            } => "credential_parse_error",
            Self::Authentication(_) => "authentication_error",
            Self::Configuration(_) => "configuration_error",
            Self::ClientInitialization {
                ..
            } => "client_initialization_error",
        }
    }

    /// Builds a client initialization error for the given kind.
    pub(crate) fn client_init(kind: ServiceKind, message: impl Into<String>) -> Self {
        Self::ClientInitialization {
            kind,
            message: message.into(),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
