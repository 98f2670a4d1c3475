// crates/gcp-mcp-core/src/backend.rs
// ============================================================================
// Module: gcp_auth Credential Backend
// Description: Production token exchange and ambient discovery via gcp_auth.
// Purpose: Bridge the async gcp_auth providers into the synchronous resolver.
// Dependencies: gcp_auth, tokio
// ============================================================================

//! ## Overview
//! [`GcpAuthBackend`] implements [`CredentialBackend`] on top of `gcp_auth`.
//! Service-account keys are exchanged with `CustomServiceAccount`; ambient
//! discovery uses `gcp_auth::provider`, which covers the metadata server,
//! well-known application-default files, and the gcloud CLI.
//!
//! `gcp_auth` is async, while the resolver and registry are synchronous. Each
//! call blocks on a private runtime, or on the caller's multi-thread runtime
//! when one is active.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::sync::Arc;
use std::time::SystemTime;

use gcp_auth::CustomServiceAccount;
use gcp_auth::TokenProvider;
use tokio::runtime::Handle;
use tokio::runtime::Runtime;
use tokio::runtime::RuntimeFlavor;
use tracing::debug;

use crate::credentials::AccessToken;
use crate::credentials::AmbientCredential;
use crate::credentials::BackendError;
use crate::credentials::CredentialBackend;
use crate::credentials::ServiceAccountKey;
use crate::credentials::TokenSource;

// ============================================================================
// SECTION: Runtime Helpers
// ============================================================================

/// Blocks on a `gcp_auth` future using a compatible runtime.
fn block_on_with_runtime<F, T>(runtime: &Runtime, future: F) -> Result<T, BackendError>
where
    F: Future<Output = Result<T, BackendError>> + Send + 'static,
    T: Send + 'static,
{
    if let Ok(handle) = Handle::try_current() {
        if matches!(handle.runtime_flavor(), RuntimeFlavor::MultiThread) {
            return tokio::task::block_in_place(|| handle.block_on(future));
        }
        // Current-thread runtimes cannot be re-entered; run on a helper thread.
        let (tx, rx) = std::sync::mpsc::sync_channel(1);
        std::thread::spawn(move || {
            let result = Runtime::new()
                .map_err(|err| BackendError::Io(err.to_string()))
                .and_then(|runtime| runtime.block_on(future));
            let _ = tx.send(result);
        });
        return rx
            .recv()
            .unwrap_or_else(|_| Err(BackendError::Io("token thread join failed".to_string())));
    }
    runtime.block_on(future)
}

/// Runtime shared by the backend and the token sources it hands out.
struct SharedRuntime {
    /// Owned runtime; taken on drop.
    runtime: Option<Runtime>,
}

impl SharedRuntime {
    /// Returns the runtime or an error after shutdown.
    fn get(&self) -> Result<&Runtime, BackendError> {
        self.runtime.as_ref().ok_or_else(|| BackendError::Io("token runtime closed".to_string()))
    }
}

impl Drop for SharedRuntime {
    fn drop(&mut self) {
        // Dropping a runtime inside async context panics; hand it to a thread.
        if let Some(runtime) = self.runtime.take() {
            let _ = std::thread::spawn(move || drop(runtime));
        }
    }
}

// ============================================================================
// SECTION: Backend
// ============================================================================

/// Credential backend backed by `gcp_auth`.
pub struct GcpAuthBackend {
    /// Runtime driving the async providers.
    runtime: Arc<SharedRuntime>,
}

impl GcpAuthBackend {
    /// Creates a backend with its own runtime.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Io`] when the runtime cannot be created.
    pub fn new() -> Result<Self, BackendError> {
        let runtime = Runtime::new().map_err(|err| BackendError::Io(err.to_string()))?;
        Ok(Self {
            runtime: Arc::new(SharedRuntime {
                runtime: Some(runtime),
            }),
        })
    }

    /// Runs ambient discovery, returning the provider when one is found.
    fn discover(&self) -> Result<Arc<dyn TokenProvider>, BackendError> {
        block_on_with_runtime(self.runtime.get()?, async {
            gcp_auth::provider().await.map_err(|err| BackendError::Backend(err.to_string()))
        })
    }
}

impl CredentialBackend for GcpAuthBackend {
    fn service_account(&self, key: &ServiceAccountKey) -> Result<Arc<dyn TokenSource>, BackendError> {
        let account = CustomServiceAccount::from_json(key.raw_json())
            .map_err(|err| BackendError::Invalid(err.to_string()))?;
        Ok(Arc::new(GcpAuthTokenSource {
            provider: Arc::new(account),
            runtime: Arc::clone(&self.runtime),
        }))
    }

    fn application_default(&self) -> Result<Option<AmbientCredential>, BackendError> {
        let provider = match self.discover() {
            Ok(provider) => provider,
            Err(err) => {
                // gcp_auth reports "nothing found" as an error; treat it as absence.
                debug!(error = %err, "ambient credential discovery found nothing");
                return Ok(None);
            }
        };
        let project_id = self.project_for(&provider);
        Ok(Some(AmbientCredential {
            token_source: Arc::new(GcpAuthTokenSource {
                provider,
                runtime: Arc::clone(&self.runtime),
            }),
            project_id,
        }))
    }

    fn discover_project_id(&self) -> Result<Option<String>, BackendError> {
        match self.discover() {
            Ok(provider) => Ok(self.project_for(&provider)),
            Err(_) => Ok(None),
        }
    }
}

impl GcpAuthBackend {
    /// Asks a provider for its default project, ignoring lookup failures.
    fn project_for(&self, provider: &Arc<dyn TokenProvider>) -> Option<String> {
        let provider = Arc::clone(provider);
        let runtime = self.runtime.get().ok()?;
        block_on_with_runtime(runtime, async move {
            provider
                .project_id()
                .await
                .map(|project| project.to_string())
                .map_err(|err| BackendError::Backend(err.to_string()))
        })
        .ok()
        .filter(|project| !project.is_empty())
    }
}

// ============================================================================
// SECTION: Token Source
// ============================================================================

/// Token source wrapping one `gcp_auth` provider.
struct GcpAuthTokenSource {
    /// Provider performing the exchange.
    provider: Arc<dyn TokenProvider>,
    /// Runtime driving the provider.
    runtime: Arc<SharedRuntime>,
}

impl TokenSource for GcpAuthTokenSource {
    fn fetch_token(&self, scopes: &[&str]) -> Result<AccessToken, BackendError> {
        let provider = Arc::clone(&self.provider);
        let scopes: Vec<String> = scopes.iter().map(ToString::to_string).collect();
        block_on_with_runtime(self.runtime.get()?, async move {
            let scope_refs: Vec<&str> = scopes.iter().map(String::as_str).collect();
            let token = provider
                .token(&scope_refs)
                .await
                .map_err(|err| BackendError::Backend(err.to_string()))?;
            Ok(AccessToken::new(token.as_str(), Some(SystemTime::from(token.expires_at()))))
        })
    }
}
