// crates/gcp-mcp-config/src/config.rs
// ============================================================================
// Module: GCP MCP Configuration
// Description: Configuration loading, environment overlay, and validation.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: gcp-mcp-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is read from `gcp-mcp.toml`, overlaid with the standard GCP
//! environment variables, and validated. The environment always wins over the
//! file. Missing or invalid configuration fails closed.
//!
//! Path resolution order: explicit path, `GCP_MCP_CONFIG`, `./gcp-mcp.toml`
//! when present, then built-in defaults.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use gcp_mcp_core::ContextSettings;
use gcp_mcp_core::CredentialSettings;
use gcp_mcp_core::InlineJsonPolicy;
use gcp_mcp_core::TransportSettings;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::env::CONFIG_ENV_VAR;
use crate::env::EnvSource;
use crate::env::GCP_LOCATION;
use crate::env::GCP_PROJECT_ID;
use crate::env::GCP_SERVICE_ACCOUNT_JSON;
use crate::env::GCP_SERVICE_ACCOUNT_KEY_PATH;
use crate::env::GOOGLE_APPLICATION_CREDENTIALS;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "gcp-mcp.toml";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum accepted inline service-account JSON size.
pub(crate) const MAX_INLINE_JSON_BYTES: usize = 64 * 1024;
/// Default maximum JSON-RPC request body size.
pub(crate) const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
/// Upper bound for the JSON-RPC request body size.
pub(crate) const MAX_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;
/// Maximum project identifier length.
pub(crate) const MAX_PROJECT_ID_LENGTH: usize = 128;
/// Maximum location length.
pub(crate) const MAX_LOCATION_LENGTH: usize = 64;
/// Maximum user agent length.
pub(crate) const MAX_USER_AGENT_LENGTH: usize = 256;
/// Default request timeout in milliseconds.
pub(crate) const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
/// Default connect timeout in milliseconds.
pub(crate) const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;
/// Minimum request/connect timeout in milliseconds.
pub(crate) const MIN_TIMEOUT_MS: u64 = 100;
/// Maximum request timeout in milliseconds.
pub(crate) const MAX_REQUEST_TIMEOUT_MS: u64 = 300_000;
/// Maximum connect timeout in milliseconds.
pub(crate) const MAX_CONNECT_TIMEOUT_MS: u64 = 60_000;
/// Default maximum REST response size in bytes.
pub(crate) const DEFAULT_MAX_RESPONSE_BYTES: usize = 8 * 1024 * 1024;
/// Upper bound for the REST response size.
pub(crate) const MAX_MAX_RESPONSE_BYTES: usize = 64 * 1024 * 1024;
/// Accepted log levels.
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// GCP MCP server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GcpMcpConfig {
    /// MCP server transport configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Project and region overrides.
    #[serde(default)]
    pub gcp: GcpConfig,
    /// Credential source configuration.
    #[serde(default)]
    pub credentials: CredentialsConfig,
    /// Service client HTTP settings.
    #[serde(default)]
    pub clients: ClientsConfig,
    /// Audit log configuration.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Diagnostic logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GcpMcpConfig {
    /// Loads configuration using the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, &EnvSource::process())
    }

    /// Loads configuration with an explicit environment source.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load_with_env(path: Option<&Path>, env: &EnvSource) -> Result<Self, ConfigError> {
        let mut config = match resolve_path(path, env)? {
            Some(resolved) => Self::from_file(&resolved)?,
            None => Self::default(),
        };
        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a configuration file without overlay or validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        validate_path(path)?;
        let bytes = fs::read(path)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Applies environment overrides on top of file values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an environment value exceeds its limit.
    pub fn apply_env(&mut self, env: &EnvSource) -> Result<(), ConfigError> {
        let key_file =
            env.get(GOOGLE_APPLICATION_CREDENTIALS).or_else(|| env.get(GCP_SERVICE_ACCOUNT_KEY_PATH));
        if let Some(key_file) = key_file {
            self.credentials.key_file = Some(key_file);
        }
        if let Some(inline_json) = env.get(GCP_SERVICE_ACCOUNT_JSON) {
            if inline_json.len() > MAX_INLINE_JSON_BYTES {
                return Err(ConfigError::Invalid(format!(
                    "{GCP_SERVICE_ACCOUNT_JSON} exceeds {MAX_INLINE_JSON_BYTES} bytes"
                )));
            }
            self.credentials.inline_json = Some(inline_json);
        }
        if let Some(project_id) = env.get(GCP_PROJECT_ID) {
            self.gcp.project_id = Some(project_id.trim().to_string());
        }
        if let Some(location) = env.get(GCP_LOCATION) {
            self.gcp.location = Some(location.trim().to_string());
        }
        Ok(())
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.gcp.validate()?;
        self.credentials.validate()?;
        self.clients.validate()?;
        self.audit.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Returns credential resolver settings.
    #[must_use]
    pub fn credential_settings(&self) -> CredentialSettings {
        CredentialSettings {
            key_file: self.credentials.key_file.as_deref().map(PathBuf::from),
            inline_json: self.credentials.inline_json.clone(),
            inline_json_policy: self.credentials.inline_json_policy,
        }
    }

    /// Returns client registry overrides.
    #[must_use]
    pub fn context_settings(&self) -> ContextSettings {
        ContextSettings {
            project_id: self.gcp.project_id.clone(),
            location: self.gcp.location.clone(),
        }
    }

    /// Returns REST transport settings.
    #[must_use]
    pub fn transport_settings(&self) -> TransportSettings {
        TransportSettings {
            request_timeout: Duration::from_millis(self.clients.request_timeout_ms),
            connect_timeout: Duration::from_millis(self.clients.connect_timeout_ms),
            user_agent: self.clients.user_agent.clone(),
            max_response_bytes: self.clients.max_response_bytes,
        }
    }
}

/// MCP transport selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerTransport {
    /// JSON-RPC over stdin/stdout with `Content-Length` framing.
    #[default]
    Stdio,
    /// JSON-RPC over HTTP `POST /rpc`.
    Http,
}

impl ServerTransport {
    /// Returns the lowercase transport label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdio => "stdio",
            Self::Http => "http",
        }
    }
}

/// Server configuration for MCP transports.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Transport type for MCP.
    #[serde(default)]
    pub transport: ServerTransport,
    /// Bind address for the HTTP transport.
    #[serde(default)]
    pub bind: Option<String>,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Permit binding HTTP to a non-loopback address.
    #[serde(default)]
    pub allow_non_loopback: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: ServerTransport::Stdio,
            bind: None,
            max_body_bytes: default_max_body_bytes(),
            allow_non_loopback: false,
        }
    }
}

impl ServerConfig {
    /// Validates server transport configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_bytes == 0 || self.max_body_bytes > MAX_MAX_BODY_BYTES {
            return Err(ConfigError::Invalid(format!(
                "server.max_body_bytes must be between 1 and {MAX_MAX_BODY_BYTES}"
            )));
        }
        if self.transport == ServerTransport::Http {
            let addr = self.bind_addr()?;
            if !addr.ip().is_loopback() && !self.allow_non_loopback {
                return Err(ConfigError::Invalid(
                    "non-loopback bind disallowed without server.allow_non_loopback".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Parses the bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the address is missing or invalid.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let bind = self.bind.as_deref().unwrap_or_default().trim();
        if bind.is_empty() {
            return Err(ConfigError::Invalid("http transport requires bind address".to_string()));
        }
        bind.parse().map_err(|_| ConfigError::Invalid("invalid bind address".to_string()))
    }
}

/// Project and region overrides.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GcpConfig {
    /// Explicit project identifier.
    #[serde(default)]
    pub project_id: Option<String>,
    /// Explicit default region.
    #[serde(default)]
    pub location: Option<String>,
}

impl GcpConfig {
    /// Validates identifier shapes.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(project_id) = &self.project_id {
            validate_project_id(project_id)?;
        }
        if let Some(location) = &self.location {
            validate_location(location)?;
        }
        Ok(())
    }
}

/// Credential source configuration.
#[derive(Clone, Default, Deserialize)]
pub struct CredentialsConfig {
    /// Service-account key file path.
    #[serde(default)]
    pub key_file: Option<String>,
    /// Inline service-account JSON; environment only, never read from file.
    #[serde(skip)]
    pub inline_json: Option<String>,
    /// Handling of syntactically invalid inline JSON.
    #[serde(default)]
    pub inline_json_policy: InlineJsonPolicy,
}

impl CredentialsConfig {
    /// Validates credential paths.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(key_file) = &self.key_file {
            validate_path_string("credentials.key_file", key_file)?;
        }
        Ok(())
    }
}

impl fmt::Debug for CredentialsConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CredentialsConfig")
            .field("key_file", &self.key_file)
            .field("inline_json", &self.inline_json.as_ref().map(|_| "<redacted>"))
            .field("inline_json_policy", &self.inline_json_policy)
            .finish()
    }
}

/// Service client HTTP settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientsConfig {
    /// Total request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// User-Agent header for REST calls.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Maximum REST response size in bytes.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
}

impl Default for ClientsConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            user_agent: default_user_agent(),
            max_response_bytes: default_max_response_bytes(),
        }
    }
}

impl ClientsConfig {
    /// Validates timeout and size limits.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_TIMEOUT_MS ..= MAX_REQUEST_TIMEOUT_MS).contains(&self.request_timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "clients.request_timeout_ms must be between {MIN_TIMEOUT_MS} and \
                 {MAX_REQUEST_TIMEOUT_MS}"
            )));
        }
        if !(MIN_TIMEOUT_MS ..= MAX_CONNECT_TIMEOUT_MS).contains(&self.connect_timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "clients.connect_timeout_ms must be between {MIN_TIMEOUT_MS} and \
                 {MAX_CONNECT_TIMEOUT_MS}"
            )));
        }
        if self.connect_timeout_ms > self.request_timeout_ms {
            return Err(ConfigError::Invalid(
                "clients.connect_timeout_ms must not exceed clients.request_timeout_ms"
                    .to_string(),
            ));
        }
        let agent = self.user_agent.trim();
        if agent.is_empty() || agent.len() > MAX_USER_AGENT_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "clients.user_agent must be 1..={MAX_USER_AGENT_LENGTH} bytes"
            )));
        }
        if self.max_response_bytes == 0 || self.max_response_bytes > MAX_MAX_RESPONSE_BYTES {
            return Err(ConfigError::Invalid(format!(
                "clients.max_response_bytes must be between 1 and {MAX_MAX_RESPONSE_BYTES}"
            )));
        }
        Ok(())
    }
}

/// Audit log configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// Whether audit records are emitted.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Optional JSON-lines file; stderr when unset.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

impl AuditConfig {
    /// Validates the audit path.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("audit.path", path)?;
        }
        Ok(())
    }
}

/// Diagnostic logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LoggingConfig {
    /// Validates the log level.
    fn validate(&self) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&self.level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "logging.level must be one of {}",
                LOG_LEVELS.join(", ")
            )));
        }
        Ok(())
    }
}

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default request body limit.
const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Default request timeout.
const fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

/// Default connect timeout.
const fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

/// Default REST response limit.
const fn default_max_response_bytes() -> usize {
    DEFAULT_MAX_RESPONSE_BYTES
}

/// Default user agent.
fn default_user_agent() -> String {
    concat!("gcp-mcp/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Default log level.
fn default_log_level() -> String {
    "info".to_string()
}

/// Serde helper for `true` defaults.
const fn default_true() -> bool {
    true
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path; `None` means built-in defaults.
fn resolve_path(path: Option<&Path>, env: &EnvSource) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(path) = path {
        return Ok(Some(path.to_path_buf()));
    }
    if let Some(env_path) = env.get(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(Some(PathBuf::from(env_path)));
    }
    let default_path = PathBuf::from(DEFAULT_CONFIG_NAME);
    Ok(default_path.is_file().then_some(default_path))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates a project identifier (including legacy `domain:project` ids).
fn validate_project_id(value: &str) -> Result<(), ConfigError> {
    if value.is_empty() || value.len() > MAX_PROJECT_ID_LENGTH {
        return Err(ConfigError::Invalid(format!(
            "gcp.project_id must be 1..={MAX_PROJECT_ID_LENGTH} bytes"
        )));
    }
    let allowed = |ch: char| ch.is_ascii_lowercase() || ch.is_ascii_digit() || "-.:".contains(ch);
    if !value.chars().all(allowed) {
        return Err(ConfigError::Invalid(
            "gcp.project_id may only contain lowercase letters, digits, '-', '.', ':'".to_string(),
        ));
    }
    Ok(())
}

/// Validates a region or zone name.
fn validate_location(value: &str) -> Result<(), ConfigError> {
    if value.is_empty() || value.len() > MAX_LOCATION_LENGTH {
        return Err(ConfigError::Invalid(format!(
            "gcp.location must be 1..={MAX_LOCATION_LENGTH} bytes"
        )));
    }
    if !value.chars().all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-') {
        return Err(ConfigError::Invalid(
            "gcp.location may only contain lowercase letters, digits, '-'".to_string(),
        ));
    }
    Ok(())
}
