// crates/gcp-mcp/src/catalog.rs
// ============================================================================
// Module: Service Catalog
// Description: Static service registration table and resource catalog.
// Purpose: Register per-service surfaces from a fixed table at startup.
// Dependencies: gcp-mcp-core
// ============================================================================

//! ## Overview
//! [`SERVICE_REGISTRATIONS`] lists every service kind alongside the function
//! that registers its surface into a [`Catalog`]. The server walks the table
//! once when it is built; nothing is discovered at runtime. Per-service tool
//! handlers attach here by swapping the row's `register` function.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use gcp_mcp_core::ServiceKind;

use crate::resources::ResourceDefinition;

// ============================================================================
// SECTION: Registration Table
// ============================================================================

/// One row of the service registration table.
#[derive(Debug, Clone, Copy)]
pub struct ServiceRegistration {
    /// Service kind the row registers.
    pub kind: ServiceKind,
    /// Registers the kind's surface into the catalog.
    pub register: fn(&mut Catalog, ServiceKind),
}

/// Service registration table, one row per [`ServiceKind`].
pub const SERVICE_REGISTRATIONS: [ServiceRegistration; 8] = [
    ServiceRegistration {
        kind: ServiceKind::Storage,
        register: register_status_resource,
    },
    ServiceRegistration {
        kind: ServiceKind::BigQuery,
        register: register_status_resource,
    },
    ServiceRegistration {
        kind: ServiceKind::Compute,
        register: register_status_resource,
    },
    ServiceRegistration {
        kind: ServiceKind::CloudRun,
        register: register_status_resource,
    },
    ServiceRegistration {
        kind: ServiceKind::CloudBuild,
        register: register_status_resource,
    },
    ServiceRegistration {
        kind: ServiceKind::Monitoring,
        register: register_status_resource,
    },
    ServiceRegistration {
        kind: ServiceKind::Logging,
        register: register_status_resource,
    },
    ServiceRegistration {
        kind: ServiceKind::ArtifactRegistry,
        register: register_status_resource,
    },
];

/// Registers the `gcp://services/{kind}` status resource.
fn register_status_resource(catalog: &mut Catalog, kind: ServiceKind) {
    catalog.register_resource(ResourceDefinition::service_status(kind));
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Resources exposed by the server, keyed by URI.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    /// Registered resources.
    resources: BTreeMap<String, ResourceDefinition>,
}

impl Catalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog with built-in resources and every table row applied.
    #[must_use]
    pub fn with_builtin_resources() -> Self {
        let mut catalog = Self::new();
        catalog.register_builtin_resources();
        catalog
    }

    /// Registers the fixed resources and walks [`SERVICE_REGISTRATIONS`].
    pub fn register_builtin_resources(&mut self) {
        self.register_resource(ResourceDefinition::greeting());
        self.register_resource(ResourceDefinition::project());
        for row in &SERVICE_REGISTRATIONS {
            (row.register)(self, row.kind);
        }
    }

    /// Registers a resource, replacing any previous entry with the same URI.
    pub fn register_resource(&mut self, resource: ResourceDefinition) {
        self.resources.insert(resource.uri.clone(), resource);
    }

    /// Lists resources ordered by URI.
    #[must_use]
    pub fn resources(&self) -> Vec<ResourceDefinition> {
        self.resources.values().cloned().collect()
    }

    /// Looks up a resource by URI.
    #[must_use]
    pub fn resource(&self, uri: &str) -> Option<&ResourceDefinition> {
        self.resources.get(uri)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
