// crates/gcp-mcp-core/src/registry.rs
// ============================================================================
// Module: Client Registry
// Description: Lazily constructed, per-kind cached service clients.
// Purpose: Single source of truth for project, location, and live clients.
// Dependencies: serde_json, tracing
// ============================================================================

//! ## Overview
//! [`ClientContext`] owns the active [`Credential`], the resolved project and
//! location, and at most one [`ServiceClientHandle`] per [`ServiceKind`].
//! Handles are built on first request through a [`ClientFactory`] and shared
//! with callers by `Arc`.
//!
//! Each kind has its own lock slot, so concurrent first use of one kind
//! builds exactly once while other kinds proceed independently. Failed
//! constructions are not cached. After [`ClientContext::close_all`] every
//! request fails with [`GcpError::ClientInitialization`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use serde_json::Value;
use tracing::info;
use tracing::warn;

use crate::audit::AuditAction;
use crate::audit::AuditEvent;
use crate::audit::AuditOutcome;
use crate::audit::AuditSink;
use crate::credentials::Credential;
use crate::credentials::CredentialBackend;
use crate::error::GcpError;
use crate::service::ServiceKind;
use crate::transport::TransportError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Region used when none is configured.
pub const DEFAULT_LOCATION: &str = "us-central1";

// ============================================================================
// SECTION: Transport Seam
// ============================================================================

/// Underlying transport of one service client.
pub trait ServiceTransport: Send + Sync {
    /// Issues an authenticated GET relative to the service endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the request fails or the transport is
    /// closed.
    fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, TransportError>;

    /// Releases transport resources. Called at most once per handle.
    fn close(&self);
}

/// Inputs bound into a service client at construction.
#[derive(Debug, Clone, Copy)]
pub struct ClientBinding<'a> {
    /// Kind being constructed.
    pub kind: ServiceKind,
    /// REST endpoint from the service table.
    pub endpoint: &'static str,
    /// Active credential.
    pub credential: &'a Arc<Credential>,
    /// Project identifier, bound only for kinds that require it.
    pub project_id: Option<&'a str>,
    /// Default region.
    pub location: &'a str,
}

/// Builds transports for service clients.
pub trait ClientFactory: Send + Sync {
    /// Constructs a transport for the binding.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when construction fails.
    fn build(&self, binding: &ClientBinding<'_>) -> Result<Box<dyn ServiceTransport>, TransportError>;
}

// ============================================================================
// SECTION: Client Handle
// ============================================================================

/// One constructed API client bound to a service kind.
pub struct ServiceClientHandle {
    /// Service kind.
    kind: ServiceKind,
    /// Project bound at construction, if the kind binds one.
    project_id: Option<String>,
    /// Underlying transport.
    transport: Box<dyn ServiceTransport>,
    /// Set once the transport has been closed.
    closed: AtomicBool,
}

impl ServiceClientHandle {
    /// Returns the service kind.
    #[must_use]
    pub const fn kind(&self) -> ServiceKind {
        self.kind
    }

    /// Returns the project bound at construction.
    #[must_use]
    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    /// Returns true once the handle has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Issues an authenticated GET through the transport.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] after close, or the transport error.
    pub fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        self.transport.get_json(path, query)
    }

    /// Closes the transport. Returns true only for the call that closed it.
    ///
    /// Only [`ClientContext::close_all`] closes handles; callers sharing a
    /// cached handle cannot retire it.
    pub(crate) fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.transport.close();
        true
    }
}

impl fmt::Debug for ServiceClientHandle {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ServiceClientHandle")
            .field("kind", &self.kind)
            .field("project_id", &self.project_id)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Resolution Helpers
// ============================================================================

/// Explicit overrides for the context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextSettings {
    /// Explicit project identifier.
    pub project_id: Option<String>,
    /// Explicit default region.
    pub location: Option<String>,
}

/// Resolves the project identifier.
///
/// Order: explicit value, the credential's embedded project, ambient
/// discovery.
///
/// # Errors
///
/// Returns [`GcpError::Configuration`] when no source yields a project.
pub fn resolve_project_id(
    explicit: Option<&str>,
    credential: &Credential,
    backend: &dyn CredentialBackend,
) -> Result<String, GcpError> {
    if let Some(project) = non_empty(explicit) {
        return Ok(project.to_string());
    }
    if let Some(project) = non_empty(credential.project_id()) {
        return Ok(project.to_string());
    }
    match backend.discover_project_id() {
        Ok(Some(project)) if !project.trim().is_empty() => Ok(project),
        Ok(_) => Err(GcpError::Configuration(
            "project id not configured and not discoverable; set GCP_PROJECT_ID".to_string(),
        )),
        Err(err) => Err(GcpError::Configuration(format!(
            "project id not configured and discovery failed: {err}"
        ))),
    }
}

/// Resolves the default region; never fails.
#[must_use]
pub fn resolve_location(explicit: Option<&str>) -> String {
    non_empty(explicit).unwrap_or(DEFAULT_LOCATION).to_string()
}

/// Returns the trimmed value when it is not blank.
fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

// ============================================================================
// SECTION: Client Context
// ============================================================================

/// Lock slot holding the cached handle for one kind.
type ClientSlot = Mutex<Option<Arc<ServiceClientHandle>>>;

/// Registry of service clients sharing one credential and project.
pub struct ClientContext {
    /// Active credential.
    credential: Arc<Credential>,
    /// Project identifier, fixed for the context lifetime.
    project_id: String,
    /// Default region.
    location: String,
    /// Transport factory.
    factory: Arc<dyn ClientFactory>,
    /// Audit sink for client lifecycle events.
    audit: Arc<dyn AuditSink>,
    /// One slot per service kind.
    slots: BTreeMap<ServiceKind, ClientSlot>,
    /// Set by `close_all`.
    closed: AtomicBool,
}

impl ClientContext {
    /// Builds a context, resolving project and location once.
    ///
    /// # Errors
    ///
    /// Returns [`GcpError::Configuration`] when the project cannot be resolved.
    pub fn new(
        credential: Arc<Credential>,
        settings: &ContextSettings,
        backend: &dyn CredentialBackend,
        factory: Arc<dyn ClientFactory>,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self, GcpError> {
        let project_id = resolve_project_id(settings.project_id.as_deref(), &credential, backend)?;
        let location = resolve_location(settings.location.as_deref());
        info!(project_id = %project_id, location = %location, "client context ready");
        let slots = ServiceKind::all().iter().map(|kind| (*kind, Mutex::new(None))).collect();
        Ok(Self {
            credential,
            project_id,
            location,
            factory,
            audit,
            slots,
            closed: AtomicBool::new(false),
        })
    }

    /// Returns the resolved project identifier.
    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Returns the resolved default region.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Returns the active credential.
    #[must_use]
    pub const fn credential(&self) -> &Arc<Credential> {
        &self.credential
    }

    /// Returns true after `close_all`.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Returns the cached handle for `kind`, constructing it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`GcpError::ClientInitialization`] when construction fails or
    /// the context is closed.
    pub fn get_client(&self, kind: ServiceKind) -> Result<Arc<ServiceClientHandle>, GcpError> {
        if self.is_closed() {
            return Err(GcpError::client_init(kind, "client context is closed"));
        }
        let slot = self
            .slots
            .get(&kind)
            .ok_or_else(|| GcpError::client_init(kind, "service kind not registered"))?;
        let mut cached =
            slot.lock().map_err(|_| GcpError::client_init(kind, "client slot lock poisoned"))?;
        // close_all may have run while this caller waited on the slot.
        if self.is_closed() {
            return Err(GcpError::client_init(kind, "client context is closed"));
        }
        if let Some(handle) = cached.as_ref() {
            return Ok(Arc::clone(handle));
        }
        let handle = Arc::new(self.construct(kind)?);
        *cached = Some(Arc::clone(&handle));
        Ok(handle)
    }

    /// Closes every constructed handle and empties the cache.
    ///
    /// Returns the number of handles closed by this call; later calls return 0.
    pub fn close_all(&self) -> usize {
        self.closed.store(true, Ordering::Release);
        let mut closed = 0;
        for (kind, slot) in &self.slots {
            let handle = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
            let Some(handle) = handle else {
                continue;
            };
            if handle.close() {
                closed += 1;
                self.audit.record(&AuditEvent::new(
                    AuditAction::ClientClose,
                    kind.as_str(),
                    AuditOutcome::Success,
                ));
            }
        }
        if closed > 0 {
            info!(closed, "service clients closed");
        }
        closed
    }

    /// Returns the kinds with a cached handle, in canonical order.
    #[must_use]
    pub fn constructed_kinds(&self) -> Vec<ServiceKind> {
        self.slots
            .iter()
            .filter(|(_, slot)| slot.lock().map(|cached| cached.is_some()).unwrap_or(false))
            .map(|(kind, _)| *kind)
            .collect()
    }

    /// Returns the number of cached handles.
    #[must_use]
    pub fn cached_count(&self) -> usize {
        self.constructed_kinds().len()
    }

    /// Constructs a handle for `kind`. Caller holds the kind's slot lock.
    fn construct(&self, kind: ServiceKind) -> Result<ServiceClientHandle, GcpError> {
        let spec = kind.spec();
        let project_id = spec.binds_project.then_some(self.project_id.as_str());
        let binding = ClientBinding {
            kind,
            endpoint: spec.endpoint,
            credential: &self.credential,
            project_id,
            location: &self.location,
        };
        match self.factory.build(&binding) {
            Ok(transport) => {
                info!(kind = %kind, "service client constructed");
                self.audit.record(
                    &AuditEvent::new(AuditAction::ClientInit, kind.as_str(), AuditOutcome::Success)
                        .with_detail("endpoint", spec.endpoint),
                );
                Ok(ServiceClientHandle {
                    kind,
                    project_id: project_id.map(ToString::to_string),
                    transport,
                    closed: AtomicBool::new(false),
                })
            }
            Err(err) => {
                warn!(kind = %kind, error = %err, "service client construction failed");
                self.audit.record(
                    &AuditEvent::new(AuditAction::ClientInit, kind.as_str(), AuditOutcome::Failure)
                        .with_detail("error", err.to_string()),
                );
                Err(GcpError::client_init(kind, err.to_string()))
            }
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::use_debug, reason = "Test-only assertions.")]

    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use serde_json::Value;
    use serde_json::json;

    use super::DEFAULT_LOCATION;
    use super::ServiceClientHandle;
    use super::ServiceTransport;
    use super::resolve_location;
    use crate::service::ServiceKind;
    use crate::transport::TransportError;

    struct CountingTransport(Arc<AtomicUsize>);

    impl ServiceTransport for CountingTransport {
        fn get_json(&self, _path: &str, _query: &[(&str, &str)]) -> Result<Value, TransportError> {
            Ok(json!({}))
        }

        fn close(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn handle(closes: &Arc<AtomicUsize>) -> ServiceClientHandle {
        ServiceClientHandle {
            kind: ServiceKind::ArtifactRegistry,
            project_id: Some("unit-proj".to_string()),
            transport: Box::new(CountingTransport(Arc::clone(closes))),
            closed: AtomicBool::new(false),
        }
    }

    #[test]
    fn handle_close_reports_first_close_only() {
        let closes = Arc::new(AtomicUsize::new(0));
        let handle = handle(&closes);
        assert!(handle.get_json("repos", &[]).is_ok());
        assert!(handle.close());
        assert!(!handle.close());
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert_eq!(handle.get_json("repos", &[]), Err(TransportError::Closed));
    }

    #[test]
    fn handle_debug_omits_transport() {
        let closes = Arc::new(AtomicUsize::new(0));
        let rendered = format!("{:?}", handle(&closes));
        assert!(rendered.contains("ArtifactRegistry"));
        assert!(rendered.contains("unit-proj"));
        assert!(rendered.contains("closed: false"));
        assert!(!rendered.contains("transport"));
    }

    #[test]
    fn location_defaults_when_blank() {
        assert_eq!(resolve_location(None), DEFAULT_LOCATION);
        assert_eq!(resolve_location(Some("  ")), DEFAULT_LOCATION);
        assert_eq!(resolve_location(Some("europe-west1")), "europe-west1");
    }
}
