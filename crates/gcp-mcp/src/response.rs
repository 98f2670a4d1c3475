// crates/gcp-mcp/src/response.rs
// ============================================================================
// Module: Response Payloads
// Description: Structured success/error payloads and message redaction.
// Purpose: Keep tool output uniform and free of credential material.
// Dependencies: gcp-mcp-core, regex, serde_json, time
// ============================================================================

//! ## Overview
//! Every tool result is either `{"status":"success","data":...}` or
//! `{"status":"error","kind":...,"message":...}`. Error messages pass through
//! [`redact`] before they are returned, so tokens, key material, and
//! card-like numbers never leave the process.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::LazyLock;
use std::time::SystemTime;

use gcp_mcp_core::GcpError;
use regex::Regex;
use serde_json::Value;
use serde_json::json;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Redaction
// ============================================================================

/// Replacement text for redacted spans.
pub const REDACTED: &str = "[REDACTED]";

/// Redaction rules applied in order: pattern and replacement template.
const REDACTION_RULES: [(&str, &str); 5] = [
    (r"(?s)-----BEGIN [A-Z ]*PRIVATE KEY-----.*?-----END [A-Z ]*PRIVATE KEY-----", REDACTED),
    (r"(?i)\bbearer\s+[A-Za-z0-9._~+/=-]+", "Bearer [REDACTED]"),
    (r"\bya29\.[A-Za-z0-9._-]+", REDACTED),
    (
        r#"(?i)\b([a-z_]*(?:token|key|secret|password)[a-z_]*)("?\s*[:=]\s*)("[^"]*"|'[^']*'|[^\s,;&]+)"#,
        "${1}${2}[REDACTED]",
    ),
    (r"\b\d{4}-\d{4}-\d{4}-\d{4}\b", REDACTED),
];

/// Compiled redaction rules.
static REDACTIONS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    REDACTION_RULES
        .iter()
        .filter_map(|(pattern, replacement)| {
            Regex::new(pattern).ok().map(|regex| (regex, *replacement))
        })
        .collect()
});

/// Removes credential material from a message.
#[must_use]
pub fn redact(message: &str) -> String {
    REDACTIONS.iter().fold(message.to_string(), |text, (regex, replacement)| {
        regex.replace_all(&text, *replacement).into_owned()
    })
}

// ============================================================================
// SECTION: Payloads
// ============================================================================

/// Builds a success payload.
#[must_use]
pub fn success(data: Value) -> Value {
    json!({
        "status": "success",
        "data": data,
    })
}

/// Builds an error payload with a redacted message.
#[must_use]
pub fn failure(kind: &str, message: &str) -> Value {
    json!({
        "status": "error",
        "kind": kind,
        "message": redact(message),
    })
}

/// Builds an error payload from a core error.
#[must_use]
pub fn gcp_failure(error: &GcpError) -> Value {
    failure(error.kind_label(), &error.to_string())
}

/// Returns true when `payload` is an error payload.
#[must_use]
pub fn is_failure(payload: &Value) -> bool {
    payload.get("status").and_then(Value::as_str) == Some("error")
}

/// Renders a timestamp as RFC 3339.
#[must_use]
pub fn rfc3339(at: SystemTime) -> Option<String> {
    OffsetDateTime::from(at).format(&Rfc3339).ok()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
