// crates/gcp-mcp-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Tests
// Description: Argument parsing and serve override tests.
// Purpose: Ensure the command surface parses as documented.
// Dependencies: clap, gcp-mcp-config
// ============================================================================

//! ## Overview
//! Parses representative command lines with `Cli::try_parse_from` and checks
//! that serve overrides land on the loaded config.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use clap::Parser;
use gcp_mcp_config::GcpMcpConfig;
use gcp_mcp_config::ServerTransport;

use super::AuthCommand;
use super::Cli;
use super::Commands;
use super::ConfigCommand;
use super::TransportArg;
use super::apply_serve_overrides;
use super::load_config;
use super::log_filter;

// ============================================================================
// SECTION: Parsing
// ============================================================================

#[test]
fn serve_accepts_transport_bind_and_config() {
    let cli = Cli::try_parse_from([
        "gcp-mcp",
        "serve",
        "--config",
        "/etc/gcp-mcp.toml",
        "--transport",
        "http",
        "--bind",
        "127.0.0.1:8787",
    ])
    .unwrap();
    let Commands::Serve(command) = cli.command else {
        panic!("expected serve");
    };
    assert_eq!(command.config, Some(PathBuf::from("/etc/gcp-mcp.toml")));
    assert_eq!(command.transport, Some(TransportArg::Http));
    assert_eq!(command.bind.as_deref(), Some("127.0.0.1:8787"));
    assert!(!command.allow_non_loopback);
}

#[test]
fn serve_rejects_unknown_transport() {
    assert!(Cli::try_parse_from(["gcp-mcp", "serve", "--transport", "sse"]).is_err());
}

#[test]
fn auth_check_and_config_commands_parse() {
    let cli = Cli::try_parse_from(["gcp-mcp", "auth", "check"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Auth {
            command: AuthCommand::Check(ref args),
        } if args.config.is_none()
    ));

    let cli = Cli::try_parse_from(["gcp-mcp", "config", "example"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Config {
            command: ConfigCommand::Example,
        }
    ));

    let cli = Cli::try_parse_from(["gcp-mcp", "config", "validate", "--config", "x.toml"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Config {
            command: ConfigCommand::Validate(_),
        }
    ));
}

#[test]
fn subcommand_is_required() {
    assert!(Cli::try_parse_from(["gcp-mcp"]).is_err());
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

#[test]
fn serve_overrides_replace_loaded_values() {
    let mut config = GcpMcpConfig::default();
    apply_serve_overrides(
        &mut config,
        Some(TransportArg::Http),
        Some("127.0.0.1:9000".to_string()),
        false,
    );
    assert_eq!(config.server.transport, ServerTransport::Http);
    assert_eq!(config.server.bind.as_deref(), Some("127.0.0.1:9000"));
    assert!(!config.server.allow_non_loopback);
    assert!(config.validate().is_ok());

    apply_serve_overrides(&mut config, None, None, true);
    assert_eq!(config.server.transport, ServerTransport::Http);
    assert!(config.server.allow_non_loopback);
}

#[test]
fn missing_explicit_config_fails_to_load() {
    let err = load_config(Some(PathBuf::from("/nonexistent/gcp-mcp/config.toml"))).unwrap_err();
    assert!(err.to_string().starts_with("config load failed"));
}

#[test]
fn configured_level_builds_filter() {
    assert!(log_filter("debug").is_ok());
}
