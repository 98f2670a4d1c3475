// crates/gcp-mcp-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic example printed by `gcp-mcp config example`.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example for `gcp-mcp.toml`. Credential values are supplied via
//! the environment; the example documents the variable names only.

/// Returns a canonical example `gcp-mcp.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[server]
transport = "stdio"
max_body_bytes = 1048576
# bind = "127.0.0.1:8787"
# allow_non_loopback = false

[gcp]
# Overridden by GCP_PROJECT_ID / GCP_LOCATION.
project_id = "my-project"
location = "us-central1"

[credentials]
# Overridden by GOOGLE_APPLICATION_CREDENTIALS or GCP_SERVICE_ACCOUNT_KEY_PATH.
# Inline keys are read from GCP_SERVICE_ACCOUNT_JSON only.
# key_file = "/etc/gcp-mcp/service-account.json"
inline_json_policy = "skip_invalid"

[clients]
request_timeout_ms = 30000
connect_timeout_ms = 10000
max_response_bytes = 8388608

[audit]
enabled = true
# path = "/var/log/gcp-mcp/audit.jsonl"

[logging]
level = "info"
"#,
    )
}
