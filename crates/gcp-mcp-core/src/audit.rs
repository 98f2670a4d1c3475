// crates/gcp-mcp-core/src/audit.rs
// ============================================================================
// Module: Audit Logging
// Description: Structured audit records for credential and client lifecycle.
// Purpose: Emit best-effort JSON-line audit logs that never fail the caller.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Security-relevant actions (credential loads, client construction and
//! teardown) are described by [`AuditEvent`] and handed to an [`AuditSink`].
//! Sinks swallow their own I/O failures: audit output is never a correctness
//! dependency of the operation being audited.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// A credential source was attempted.
    CredentialLoad,
    /// A service client was constructed (or failed to construct).
    ClientInit,
    /// A service client transport was released.
    ClientClose,
}

/// Outcome of an audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    /// The action completed.
    Success,
    /// The source was present but skipped by policy.
    Skipped,
    /// The source was queried and yielded nothing.
    NotFound,
    /// The action failed.
    Failure,
}

/// Audit event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Audited action.
    pub action: AuditAction,
    /// Resource class the action applies to.
    pub resource: String,
    /// Action outcome.
    pub outcome: AuditOutcome,
    /// Free-form metadata (never contains secret material).
    pub details: BTreeMap<String, String>,
}

impl AuditEvent {
    /// Creates a new audit event with a consistent timestamp.
    #[must_use]
    pub fn new(action: AuditAction, resource: impl Into<String>, outcome: AuditOutcome) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event: "gcp_audit",
            timestamp_ms,
            action,
            resource: resource.into(),
            outcome,
            details: BTreeMap::new(),
        }
    }

    /// Returns a copy with an extra detail entry.
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for lifecycle events.
pub trait AuditSink: Send + Sync {
    /// Record an audit event. Implementations must not panic.
    fn record(&self, event: &AuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn record(&self, event: &AuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, event: &AuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &AuditEvent) {}
}

// ============================================================================
// SECTION: Tests
// ============================================================================
