// crates/gcp-mcp-core/src/service.rs
// ============================================================================
// Module: Service Kinds
// Description: Canonical identifiers and static metadata for GCP API families.
// Purpose: Single table describing how each service client is constructed.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every cloud API family the server can talk to is a [`ServiceKind`]. The
//! static [`SERVICE_SPECS`] table records the REST endpoint of each kind and
//! whether its construction protocol binds a project identifier. The client
//! registry consults this table instead of hard-coding per-client behavior.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Service Kind
// ============================================================================

/// Cloud API family targeted by a service client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    /// Cloud Storage (object storage).
    Storage,
    /// BigQuery.
    #[serde(rename = "bigquery")]
    BigQuery,
    /// Compute Engine.
    Compute,
    /// Cloud Run.
    #[serde(rename = "run")]
    CloudRun,
    /// Cloud Build.
    #[serde(rename = "cloudbuild")]
    CloudBuild,
    /// Cloud Monitoring.
    Monitoring,
    /// Cloud Logging (audit logs).
    Logging,
    /// Artifact Registry.
    #[serde(rename = "artifactregistry")]
    ArtifactRegistry,
}

impl ServiceKind {
    /// Returns the canonical string label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Storage => "storage",
            Self::BigQuery => "bigquery",
            Self::Compute => "compute",
            Self::CloudRun => "run",
            Self::CloudBuild => "cloudbuild",
            Self::Monitoring => "monitoring",
            Self::Logging => "logging",
            Self::ArtifactRegistry => "artifactregistry",
        }
    }

    /// Returns all service kinds in canonical order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Storage,
            Self::BigQuery,
            Self::Compute,
            Self::CloudRun,
            Self::CloudBuild,
            Self::Monitoring,
            Self::Logging,
            Self::ArtifactRegistry,
        ]
    }

    /// Parses a service kind from its canonical label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        Self::all().iter().copied().find(|kind| kind.as_str() == label)
    }

    /// Returns the static construction metadata for the kind.
    #[must_use]
    pub fn spec(self) -> &'static ServiceSpec {
        // SERVICE_SPECS is ordered to match `all()`.
        &SERVICE_SPECS[self.index()]
    }

    /// Position of the kind in [`SERVICE_SPECS`].
    const fn index(self) -> usize {
        match self {
            Self::Storage => 0,
            Self::BigQuery => 1,
            Self::Compute => 2,
            Self::CloudRun => 3,
            Self::CloudBuild => 4,
            Self::Monitoring => 5,
            Self::Logging => 6,
            Self::ArtifactRegistry => 7,
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Service Table
// ============================================================================

/// Construction metadata for one service kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceSpec {
    /// Service kind described by this row.
    pub kind: ServiceKind,
    /// Human-readable service name.
    pub display_name: &'static str,
    /// Base REST endpoint (no trailing slash).
    pub endpoint: &'static str,
    /// Whether client construction binds the resolved project identifier.
    pub binds_project: bool,
}

/// Static construction table, ordered to match [`ServiceKind::all`].
pub const SERVICE_SPECS: [ServiceSpec; 8] = [
    ServiceSpec {
        kind: ServiceKind::Storage,
        display_name: "Cloud Storage",
        endpoint: "https://storage.googleapis.com/storage/v1",
        binds_project: true,
    },
    ServiceSpec {
        kind: ServiceKind::BigQuery,
        display_name: "BigQuery",
        endpoint: "https://bigquery.googleapis.com/bigquery/v2",
        binds_project: true,
    },
    ServiceSpec {
        kind: ServiceKind::Compute,
        display_name: "Compute Engine",
        endpoint: "https://compute.googleapis.com/compute/v1",
        binds_project: false,
    },
    ServiceSpec {
        kind: ServiceKind::CloudRun,
        display_name: "Cloud Run",
        endpoint: "https://run.googleapis.com/v2",
        binds_project: false,
    },
    ServiceSpec {
        kind: ServiceKind::CloudBuild,
        display_name: "Cloud Build",
        endpoint: "https://cloudbuild.googleapis.com/v1",
        binds_project: false,
    },
    ServiceSpec {
        kind: ServiceKind::Monitoring,
        display_name: "Cloud Monitoring",
        endpoint: "https://monitoring.googleapis.com/v3",
        binds_project: false,
    },
    ServiceSpec {
        kind: ServiceKind::Logging,
        display_name: "Cloud Audit Logs",
        endpoint: "https://logging.googleapis.com/v2",
        binds_project: false,
    },
    ServiceSpec {
        kind: ServiceKind::ArtifactRegistry,
        display_name: "Artifact Registry",
        endpoint: "https://artifactregistry.googleapis.com/v1",
        binds_project: false,
    },
];

// ============================================================================
// SECTION: Tests
// ============================================================================
