// crates/gcp-mcp-config/src/lib.rs
// ============================================================================
// Module: GCP MCP Config Library
// Description: Canonical config model, environment overlay, and validation.
// Purpose: Single source of truth for gcp-mcp.toml semantics.
// Dependencies: gcp-mcp-core, serde, toml
// ============================================================================

//! ## Overview
//! `gcp-mcp-config` defines the configuration model for the GCP MCP server.
//! It merges `gcp-mcp.toml` with the standard GCP environment variables,
//! validates fail-closed, and converts the result into the settings consumed
//! by the credential resolver, client registry, and REST transport.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod env;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use env::EnvSource;
pub use examples::config_toml_example;
