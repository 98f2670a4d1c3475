// crates/gcp-mcp-config/src/env.rs
// ============================================================================
// Module: Environment Source
// Description: Process environment reads with a deterministic override map.
// Purpose: Let the config overlay be tested without mutating process state.
// Dependencies: std
// ============================================================================

//! ## Overview
//! [`EnvSource`] reads environment variables either from the process or from
//! an override map. When overrides are present the process environment is not
//! consulted at all. Empty values are treated as unset.

use std::collections::BTreeMap;
use std::env;
use std::fmt;

/// Config path override variable.
pub const CONFIG_ENV_VAR: &str = "GCP_MCP_CONFIG";
/// Standard service-account key file variable.
pub const GOOGLE_APPLICATION_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";
/// Alternate service-account key file variable.
pub const GCP_SERVICE_ACCOUNT_KEY_PATH: &str = "GCP_SERVICE_ACCOUNT_KEY_PATH";
/// Inline service-account JSON variable.
pub const GCP_SERVICE_ACCOUNT_JSON: &str = "GCP_SERVICE_ACCOUNT_JSON";
/// Project override variable.
pub const GCP_PROJECT_ID: &str = "GCP_PROJECT_ID";
/// Location override variable.
pub const GCP_LOCATION: &str = "GCP_LOCATION";

/// Source of environment variable values.
#[derive(Clone, Default)]
pub struct EnvSource {
    /// Optional override map used instead of the process environment.
    overrides: Option<BTreeMap<String, String>>,
}

impl EnvSource {
    /// Reads from the process environment.
    #[must_use]
    pub const fn process() -> Self {
        Self {
            overrides: None,
        }
    }

    /// Reads only from the given map.
    #[must_use]
    pub fn from_map<K, V>(values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            overrides: Some(values.into_iter().map(|(key, value)| (key.into(), value.into())).collect()),
        }
    }

    /// Returns the value of `key`, treating empty values as unset.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        let value = match &self.overrides {
            Some(overrides) => overrides.get(key).cloned(),
            None => env::var(key).ok(),
        };
        value.filter(|value| !value.trim().is_empty())
    }
}

impl fmt::Debug for EnvSource {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Values may hold key material; only keys are shown.
        let keys: Option<Vec<&String>> =
            self.overrides.as_ref().map(|overrides| overrides.keys().collect());
        formatter.debug_struct("EnvSource").field("override_keys", &keys).finish()
    }
}
