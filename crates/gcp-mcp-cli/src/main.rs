// crates/gcp-mcp-cli/src/main.rs
// ============================================================================
// Module: GCP MCP CLI Entry Point
// Description: Command dispatcher for the GCP MCP server and its utilities.
// Purpose: Serve MCP, check credentials, and print or validate configuration.
// Dependencies: clap, gcp-mcp, gcp-mcp-config, gcp-mcp-core, tokio, tracing-subscriber
// ============================================================================

//! ## Overview
//! The `gcp-mcp` binary loads `gcp-mcp.toml` (with environment overrides),
//! installs a stderr log subscriber, and runs one subcommand. Stdout is
//! reserved for MCP frames when serving over stdio, so diagnostics always go
//! to stderr.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use gcp_mcp::McpServer;
use gcp_mcp::build_audit_sink;
use gcp_mcp::response;
use gcp_mcp_config::GcpMcpConfig;
use gcp_mcp_config::ServerTransport;
use gcp_mcp_config::config_toml_example;
use gcp_mcp_core::CredentialBackend;
use gcp_mcp_core::CredentialResolver;
use gcp_mcp_core::GcpAuthBackend;
use gcp_mcp_core::GcpError;
use gcp_mcp_core::resolve_location;
use gcp_mcp_core::resolve_project_id;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "gcp-mcp", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the GCP MCP server.
    Serve(ServeCommand),
    /// Credential utilities.
    Auth {
        /// Selected auth subcommand.
        #[command(subcommand)]
        command: AuthCommand,
    },
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Configuration for the `serve` command.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Config file path (defaults to `GCP_MCP_CONFIG` or ./gcp-mcp.toml).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Transport override.
    #[arg(long, value_enum)]
    transport: Option<TransportArg>,
    /// HTTP bind address override.
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,
    /// Allow binding HTTP to a non-loopback address.
    #[arg(long, action = ArgAction::SetTrue)]
    allow_non_loopback: bool,
}

/// Transport selection for `serve`.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum TransportArg {
    /// Content-Length framed JSON-RPC over stdin/stdout.
    Stdio,
    /// JSON-RPC over HTTP `POST /rpc`.
    Http,
}

impl From<TransportArg> for ServerTransport {
    fn from(value: TransportArg) -> Self {
        match value {
            TransportArg::Stdio => Self::Stdio,
            TransportArg::Http => Self::Http,
        }
    }
}

/// Auth subcommands.
#[derive(Subcommand, Debug)]
enum AuthCommand {
    /// Resolve credentials and print a JSON summary.
    Check(ConfigPathArgs),
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print a canonical example configuration.
    Example,
    /// Validate the effective configuration.
    Validate(ConfigPathArgs),
}

/// Shared `--config` argument.
#[derive(Args, Debug)]
struct ConfigPathArgs {
    /// Config file path (defaults to `GCP_MCP_CONFIG` or ./gcp-mcp.toml).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Commands::Serve(command) => command_serve(command).await,
        Commands::Auth {
            command: AuthCommand::Check(args),
        } => command_auth_check(args).await,
        Commands::Config {
            command,
        } => command_config(command),
    }
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let mut config = load_config(command.config)?;
    apply_serve_overrides(&mut config, command.transport, command.bind, command.allow_non_loopback);
    init_logging(&config.logging.level)?;
    tracing::info!(transport = config.server.transport.as_str(), "starting gcp-mcp");

    let server = tokio::task::spawn_blocking(move || McpServer::from_config(config))
        .await
        .map_err(|err| CliError::new(format!("server init join failed: {err}")))?
        .map_err(|err| CliError::new(response::redact(&err.to_string())))?;
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Applies command-line overrides on top of the loaded config.
fn apply_serve_overrides(
    config: &mut GcpMcpConfig,
    transport: Option<TransportArg>,
    bind: Option<String>,
    allow_non_loopback: bool,
) {
    if let Some(transport) = transport {
        config.server.transport = transport.into();
    }
    if let Some(bind) = bind {
        config.server.bind = Some(bind);
    }
    if allow_non_loopback {
        config.server.allow_non_loopback = true;
    }
}

// ============================================================================
// SECTION: Auth Command
// ============================================================================

/// Executes `auth check`, printing a success or error payload.
async fn command_auth_check(args: ConfigPathArgs) -> CliResult<ExitCode> {
    let config = load_config(args.config)?;
    init_logging(&config.logging.level)?;
    let summary = tokio::task::spawn_blocking(move || check_credentials(&config))
        .await
        .map_err(|err| CliError::new(format!("auth check join failed: {err}")))??;
    let failed = response::is_failure(&summary);
    write_json(&summary)?;
    Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

/// Resolves the credential and project, returning a structured payload.
fn check_credentials(config: &GcpMcpConfig) -> CliResult<Value> {
    let audit = build_audit_sink(&config.audit).map_err(|err| CliError::new(err.to_string()))?;
    let backend: Arc<dyn CredentialBackend> = Arc::new(
        GcpAuthBackend::new()
            .map_err(|err| CliError::new(format!("credential backend init failed: {err}")))?,
    );
    let resolver = CredentialResolver::new(config.credential_settings(), Arc::clone(&backend), audit);
    let summary = resolver.resolve().and_then(|credential| {
        let project_id =
            resolve_project_id(config.gcp.project_id.as_deref(), &credential, backend.as_ref())?;
        Ok::<Value, GcpError>(json!({
            "source": credential.origin().as_str(),
            "principal": credential.principal(),
            "project_id": project_id,
            "location": resolve_location(config.gcp.location.as_deref()),
            "valid": credential.is_valid(),
            "expires_at": credential.expires_at().and_then(response::rfc3339),
        }))
    });
    Ok(match summary {
        Ok(data) => response::success(data),
        Err(err) => response::gcp_failure(&err),
    })
}

// ============================================================================
// SECTION: Config Command
// ============================================================================

/// Executes config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Example => {
            write_stdout(&config_toml_example())?;
        }
        ConfigCommand::Validate(args) => {
            load_config(args.config)?;
            write_stdout("config ok\n")?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads and validates configuration.
fn load_config(path: Option<PathBuf>) -> CliResult<GcpMcpConfig> {
    GcpMcpConfig::load(path.as_deref())
        .map_err(|err| CliError::new(format!("config load failed: {err}")))
}

/// Builds the log filter; `RUST_LOG` overrides the configured level.
fn log_filter(level: &str) -> CliResult<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|err| CliError::new(format!("invalid log filter: {err}")))
}

/// Installs the stderr log subscriber.
fn init_logging(level: &str) -> CliResult<()> {
    let filter = log_filter(level)?;
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()
        .map_err(|err| CliError::new(format!("logging init failed: {err}")))
}

/// Writes pretty JSON and a trailing newline to stdout.
fn write_json(value: &Value) -> CliResult<()> {
    let mut text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::new(format!("json render failed: {err}")))?;
    text.push('\n');
    write_stdout(&text)
}

/// Writes text to stdout.
fn write_stdout(text: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    stdout
        .write_all(text.as_bytes())
        .and_then(|()| stdout.flush())
        .map_err(|err| CliError::new(format!("stdout write failed: {err}")))
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let mut stderr = std::io::stderr();
    let _ = writeln!(&mut stderr, "gcp-mcp: {message}");
    ExitCode::FAILURE
}
