//! Loading and environment overlay tests for gcp-mcp-config.
// crates/gcp-mcp-config/tests/config_loading.rs
// =============================================================================
// Module: Config Loading Tests
// Description: File parsing, path resolution, and environment precedence.
// Purpose: Ensure the environment overrides the file and secrets stay hidden.
// =============================================================================

#![allow(clippy::use_debug, reason = "Debug formatting is asserted on and used in failure messages.")]

use std::fs;
use std::path::PathBuf;

use gcp_mcp_config::ConfigError;
use gcp_mcp_config::EnvSource;
use gcp_mcp_config::GcpMcpConfig;
use gcp_mcp_config::ServerTransport;
use gcp_mcp_config::config_toml_example;
use gcp_mcp_core::InlineJsonPolicy;

mod common;

use common::TestResult;

/// Writes `contents` into a fresh temp dir and returns both.
fn write_config(contents: &str) -> Result<(tempfile::TempDir, PathBuf), String> {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("gcp-mcp.toml");
    fs::write(&path, contents).map_err(|err| err.to_string())?;
    Ok((dir, path))
}

#[test]
fn defaults_apply_without_file_or_env() -> TestResult {
    let config =
        GcpMcpConfig::load_with_env(None, &EnvSource::from_map(Vec::<(String, String)>::new()))
            .map_err(|err| err.to_string())?;
    if config.server.transport != ServerTransport::Stdio {
        return Err("default transport should be stdio".to_string());
    }
    if config.gcp.project_id.is_some() || config.credentials.key_file.is_some() {
        return Err("defaults should not set project or key file".to_string());
    }
    if config.credentials.inline_json_policy != InlineJsonPolicy::SkipInvalid {
        return Err("inline policy should default to skip_invalid".to_string());
    }
    if config.context_settings().location.is_some() {
        return Err("location should be resolved later, not defaulted in config".to_string());
    }
    Ok(())
}

#[test]
fn environment_overrides_file_values() -> TestResult {
    let (_dir, path) = write_config(
        r#"
[gcp]
project_id = "file-proj"
location = "europe-west1"

[credentials]
key_file = "/etc/file-key.json"
"#,
    )?;
    let env = EnvSource::from_map([
        ("GCP_PROJECT_ID", "env-proj"),
        ("GOOGLE_APPLICATION_CREDENTIALS", "/etc/env-key.json"),
        ("GCP_SERVICE_ACCOUNT_KEY_PATH", "/etc/alias-key.json"),
        ("GCP_SERVICE_ACCOUNT_JSON", "{\"type\":\"service_account\"}"),
    ]);
    let config = GcpMcpConfig::load_with_env(Some(&path), &env).map_err(|err| err.to_string())?;
    if config.gcp.project_id.as_deref() != Some("env-proj") {
        return Err(format!("project not overridden: {:?}", config.gcp.project_id));
    }
    if config.gcp.location.as_deref() != Some("europe-west1") {
        return Err("file location should survive when env is unset".to_string());
    }
    let settings = config.credential_settings();
    if settings.key_file != Some(PathBuf::from("/etc/env-key.json")) {
        return Err(format!("key file precedence wrong: {:?}", settings.key_file));
    }
    if settings.inline_json.is_none() {
        return Err("inline json should be loaded from env".to_string());
    }
    Ok(())
}

#[test]
fn key_path_alias_applies_when_standard_variable_unset() -> TestResult {
    let env = EnvSource::from_map([("GCP_SERVICE_ACCOUNT_KEY_PATH", "/keys/sa.json")]);
    let config = GcpMcpConfig::load_with_env(None, &env).map_err(|err| err.to_string())?;
    if config.credentials.key_file.as_deref() != Some("/keys/sa.json") {
        return Err("alias variable should set key file".to_string());
    }
    Ok(())
}

#[test]
fn empty_env_values_are_ignored() -> TestResult {
    let env = EnvSource::from_map([("GCP_PROJECT_ID", ""), ("GCP_LOCATION", "  ")]);
    let config = GcpMcpConfig::load_with_env(None, &env).map_err(|err| err.to_string())?;
    if config.gcp.project_id.is_some() || config.gcp.location.is_some() {
        return Err("blank env values must not override".to_string());
    }
    Ok(())
}

#[test]
fn config_path_env_variable_is_honored() -> TestResult {
    let (_dir, path) = write_config("[gcp]\nproject_id = \"from-env-path\"\n")?;
    let env = EnvSource::from_map([("GCP_MCP_CONFIG", path.display().to_string())]);
    let config = GcpMcpConfig::load_with_env(None, &env).map_err(|err| err.to_string())?;
    if config.gcp.project_id.as_deref() != Some("from-env-path") {
        return Err("GCP_MCP_CONFIG path not loaded".to_string());
    }
    Ok(())
}

#[test]
fn explicit_missing_file_fails_closed() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let result = GcpMcpConfig::load_with_env(
        Some(&dir.path().join("absent.toml")),
        &EnvSource::from_map(Vec::<(String, String)>::new()),
    );
    match result {
        Err(ConfigError::Io(_)) => Ok(()),
        other => Err(format!("expected io error, got {other:?}")),
    }
}

#[test]
fn inline_json_cannot_come_from_file() -> TestResult {
    let (_dir, path) = write_config("[credentials]\ninline_json = \"{}\"\n")?;
    let config = GcpMcpConfig::load_with_env(
        Some(&path),
        &EnvSource::from_map(Vec::<(String, String)>::new()),
    )
    .map_err(|err| err.to_string())?;
    if config.credentials.inline_json.is_some() {
        return Err("inline_json must be environment-only".to_string());
    }
    Ok(())
}

#[test]
fn debug_output_redacts_inline_json() -> TestResult {
    let env = EnvSource::from_map([("GCP_SERVICE_ACCOUNT_JSON", "{\"private_key\":\"SECRET\"}")]);
    let config = GcpMcpConfig::load_with_env(None, &env).map_err(|err| err.to_string())?;
    let rendered = format!("{config:?} {env:?}");
    if rendered.contains("SECRET") {
        return Err("debug output leaked inline json".to_string());
    }
    Ok(())
}

#[test]
fn strict_policy_parses_from_file() -> TestResult {
    let (_dir, path) = write_config("[credentials]\ninline_json_policy = \"strict\"\n")?;
    let config = GcpMcpConfig::from_file(&path).map_err(|err| err.to_string())?;
    if config.credential_settings().inline_json_policy != InlineJsonPolicy::Strict {
        return Err("strict policy not parsed".to_string());
    }
    Ok(())
}

#[test]
fn canonical_example_is_valid() -> TestResult {
    let (_dir, path) = write_config(&config_toml_example())?;
    let config = GcpMcpConfig::load_with_env(
        Some(&path),
        &EnvSource::from_map(Vec::<(String, String)>::new()),
    )
    .map_err(|err| err.to_string())?;
    if config.gcp.project_id.as_deref() != Some("my-project") {
        return Err("example project id changed".to_string());
    }
    let transport = config.transport_settings();
    if transport.request_timeout.as_millis() != 30_000 {
        return Err("example request timeout changed".to_string());
    }
    Ok(())
}

#[test]
fn unknown_toml_is_a_parse_error() -> TestResult {
    let (_dir, path) = write_config("[server\ntransport = ")?;
    common::assert_invalid(GcpMcpConfig::from_file(&path), "parse")
}
