// crates/gcp-mcp/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Scripted transports and credentials for router tests.
// Purpose: Drive tools and resources without network access.
// Dependencies: gcp-mcp, gcp-mcp-core, serde_json
// ============================================================================

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::SystemTime;

use gcp_mcp::Catalog;
use gcp_mcp::ToolRouter;
use gcp_mcp_core::AccessToken;
use gcp_mcp_core::AmbientCredential;
use gcp_mcp_core::BackendError;
use gcp_mcp_core::ClientBinding;
use gcp_mcp_core::ClientContext;
use gcp_mcp_core::ClientFactory;
use gcp_mcp_core::ContextSettings;
use gcp_mcp_core::Credential;
use gcp_mcp_core::CredentialBackend;
use gcp_mcp_core::CredentialSourceKind;
use gcp_mcp_core::NoopAuditSink;
use gcp_mcp_core::ServiceAccountKey;
use gcp_mcp_core::ServiceTransport;
use gcp_mcp_core::TokenSource;
use gcp_mcp_core::TransportError;
use serde_json::Value;
use serde_json::json;

/// Token source issuing hour-long tokens.
pub struct HourTokens;

impl TokenSource for HourTokens {
    fn fetch_token(&self, _scopes: &[&str]) -> Result<AccessToken, BackendError> {
        Ok(AccessToken::new("router-token", Some(SystemTime::now() + Duration::from_secs(3600))))
    }
}

/// Backend with no ambient credentials.
pub struct NoAmbient;

impl CredentialBackend for NoAmbient {
    fn service_account(&self, _key: &ServiceAccountKey) -> Result<Arc<dyn TokenSource>, BackendError> {
        Ok(Arc::new(HourTokens))
    }

    fn application_default(&self) -> Result<Option<AmbientCredential>, BackendError> {
        Ok(None)
    }
}

/// What the storage transport answers.
#[derive(Clone)]
pub enum StorageScript {
    /// Returns buckets with the given names.
    Buckets(Vec<String>),
    /// Fails every request.
    Fail(TransportError),
}

/// Transport replaying a storage script.
pub struct ScriptedTransport {
    /// Script to replay.
    script: StorageScript,
    /// Shared close counter.
    closes: Arc<AtomicUsize>,
    /// Queries seen, as `key=value` pairs.
    queries: Arc<Mutex<Vec<String>>>,
}

impl ServiceTransport for ScriptedTransport {
    fn get_json(&self, _path: &str, query: &[(&str, &str)]) -> Result<Value, TransportError> {
        self.queries
            .lock()
            .unwrap()
            .extend(query.iter().map(|(key, value)| format!("{key}={value}")));
        match &self.script {
            StorageScript::Buckets(names) => Ok(json!({
                "kind": "storage#buckets",
                "items": names.iter().map(|name| json!({"name": name})).collect::<Vec<_>>(),
            })),
            StorageScript::Fail(err) => Err(err.clone()),
        }
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Factory handing out scripted transports.
pub struct ScriptedFactory {
    /// Storage script.
    pub script: StorageScript,
    /// When set, every construction fails with this message.
    pub build_failure: Option<String>,
    /// Total closes across transports.
    pub closes: Arc<AtomicUsize>,
    /// Queries seen by any transport.
    pub queries: Arc<Mutex<Vec<String>>>,
}

impl ScriptedFactory {
    /// Factory whose storage client lists the given buckets.
    pub fn with_buckets(names: &[&str]) -> Self {
        Self {
            script: StorageScript::Buckets(names.iter().map(ToString::to_string).collect()),
            build_failure: None,
            closes: Arc::new(AtomicUsize::new(0)),
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Factory whose storage requests fail.
    pub fn failing_requests(error: TransportError) -> Self {
        Self {
            script: StorageScript::Fail(error),
            ..Self::with_buckets(&[])
        }
    }

    /// Total transport closes.
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl ClientFactory for ScriptedFactory {
    fn build(&self, _binding: &ClientBinding<'_>) -> Result<Box<dyn ServiceTransport>, TransportError> {
        if let Some(message) = &self.build_failure {
            return Err(TransportError::Http(message.clone()));
        }
        Ok(Box::new(ScriptedTransport {
            script: self.script.clone(),
            closes: Arc::clone(&self.closes),
            queries: Arc::clone(&self.queries),
        }))
    }
}

/// Builds a router over a scripted factory for project `router-proj`.
pub fn router_with(factory: Arc<ScriptedFactory>) -> ToolRouter {
    let credential = Arc::new(Credential::new(
        CredentialSourceKind::ServiceAccountFile,
        Some("svc@router-proj.iam.gserviceaccount.com".to_string()),
        Some("router-proj".to_string()),
        Arc::new(HourTokens),
    ));
    credential.ensure_valid().unwrap();
    let context = ClientContext::new(
        credential,
        &ContextSettings {
            project_id: None,
            location: Some("europe-west1".to_string()),
        },
        &NoAmbient,
        factory,
        Arc::new(NoopAuditSink),
    )
    .unwrap();
    ToolRouter::new(Arc::new(context), Catalog::with_builtin_resources())
}
