// crates/gcp-mcp-core/src/transport.rs
// ============================================================================
// Module: REST Transport
// Description: Authenticated blocking HTTP transport for Google REST APIs.
// Purpose: Production `ClientFactory` used by the client registry.
// Dependencies: reqwest, serde_json
// ============================================================================

//! ## Overview
//! [`HttpClientFactory`] builds one [`RestTransport`] per service kind. Each
//! transport owns a `reqwest` blocking client with bounded connect and request
//! timeouts, attaches a fresh bearer token on every request, and sends
//! `x-goog-user-project` when the kind binds a project.
//!
//! Responses are size-limited and must be JSON. Redirects are not followed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use serde_json::Value;
use thiserror::Error;

use crate::credentials::Credential;
use crate::registry::ClientBinding;
use crate::registry::ClientFactory;
use crate::registry::ServiceTransport;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by service transports.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The transport was closed.
    #[error("transport closed")]
    Closed,
    /// Client construction or request failure.
    #[error("http error: {0}")]
    Http(String),
    /// Non-success HTTP status.
    #[error("http status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        body: String,
    },
    /// Response was not valid JSON or exceeded the size limit.
    #[error("decode error: {0}")]
    Decode(String),
    /// Token acquisition failed.
    #[error("auth error: {0}")]
    Auth(String),
}

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Maximum characters of an error body kept in [`TransportError::Status`].
const MAX_ERROR_BODY_CHARS: usize = 512;

/// HTTP settings shared by every transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportSettings {
    /// Total request timeout.
    pub request_timeout: Duration,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// User-Agent header value.
    pub user_agent: String,
    /// Maximum response body size in bytes.
    pub max_response_bytes: usize,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: concat!("gcp-mcp/", env!("CARGO_PKG_VERSION")).to_string(),
            max_response_bytes: 8 * 1024 * 1024,
        }
    }
}

// ============================================================================
// SECTION: Factory
// ============================================================================

/// Factory producing `reqwest`-backed transports.
#[derive(Debug, Clone, Default)]
pub struct HttpClientFactory {
    /// Settings applied to each transport.
    settings: TransportSettings,
}

impl HttpClientFactory {
    /// Creates a factory.
    #[must_use]
    pub const fn new(settings: TransportSettings) -> Self {
        Self {
            settings,
        }
    }
}

impl ClientFactory for HttpClientFactory {
    fn build(&self, binding: &ClientBinding<'_>) -> Result<Box<dyn ServiceTransport>, TransportError> {
        let client = Client::builder()
            .timeout(self.settings.request_timeout)
            .connect_timeout(self.settings.connect_timeout)
            .user_agent(self.settings.user_agent.clone())
            .redirect(Policy::none())
            .build()
            .map_err(|err| TransportError::Http(format!("http client build failed: {err}")))?;
        Ok(Box::new(RestTransport {
            client: Mutex::new(Some(client)),
            endpoint: binding.endpoint,
            credential: Arc::clone(binding.credential),
            user_project: binding.project_id.map(ToString::to_string),
            max_response_bytes: self.settings.max_response_bytes,
        }))
    }
}

// ============================================================================
// SECTION: Transport
// ============================================================================

/// Authenticated REST transport for one service endpoint.
struct RestTransport {
    /// HTTP client; `None` once closed.
    client: Mutex<Option<Client>>,
    /// Base endpoint.
    endpoint: &'static str,
    /// Credential providing bearer tokens.
    credential: Arc<Credential>,
    /// Project billed for the request, when bound.
    user_project: Option<String>,
    /// Response size limit.
    max_response_bytes: usize,
}

impl ServiceTransport for RestTransport {
    fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, TransportError> {
        let client = self
            .client
            .lock()
            .map_err(|_| TransportError::Http("transport lock poisoned".to_string()))?
            .clone()
            .ok_or(TransportError::Closed)?;
        let token =
            self.credential.access_token().map_err(|err| TransportError::Auth(err.to_string()))?;
        let url = format!("{}/{}", self.endpoint, path.trim_start_matches('/'));
        let mut request = client.get(url).bearer_auth(token).query(query);
        if let Some(project) = &self.user_project {
            request = request.header("x-goog-user-project", project);
        }
        let mut response =
            request.send().map_err(|err| TransportError::Http(err.without_url().to_string()))?;
        let status = response.status();
        let body = read_limited(&mut response, self.max_response_bytes)?;
        if !status.is_success() {
            let text = String::from_utf8_lossy(&body);
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: text.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }
        if body.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&body).map_err(|err| TransportError::Decode(err.to_string()))
    }

    fn close(&self) {
        if let Ok(mut client) = self.client.lock() {
            client.take();
        }
    }
}

/// Reads the response body while enforcing a byte limit.
fn read_limited(
    response: &mut reqwest::blocking::Response,
    max_bytes: usize,
) -> Result<Vec<u8>, TransportError> {
    let max_bytes_u64 = u64::try_from(max_bytes)
        .map_err(|_| TransportError::Decode("response size limit exceeds u64".to_string()))?;
    if response.content_length().is_some_and(|expected| expected > max_bytes_u64) {
        return Err(TransportError::Decode("response exceeds size limit".to_string()));
    }
    let mut buf = Vec::new();
    response
        .take(max_bytes_u64.saturating_add(1))
        .read_to_end(&mut buf)
        .map_err(|err| TransportError::Http(format!("failed to read response: {err}")))?;
    if buf.len() > max_bytes {
        return Err(TransportError::Decode("response exceeds size limit".to_string()));
    }
    Ok(buf)
}
