// crates/gcp-mcp/tests/tool_router.rs
// ============================================================================
// Module: Tool Router Tests
// Description: Tool payloads, resource reads, and shutdown through the router.
// Purpose: Ensure GCP failures surface as redacted structured payloads.
// Dependencies: gcp-mcp, gcp-mcp-core, gcp-mcp-config
// ============================================================================

//! ## Overview
//! Exercises [`ToolRouter`] and [`McpServer`] against scripted transports.

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

mod common;

use std::sync::Arc;

use common::ScriptedFactory;
use common::router_with;
use gcp_mcp::McpServer;
use gcp_mcp::ToolError;
use gcp_mcp::ToolRouter;
use gcp_mcp_config::GcpMcpConfig;
use gcp_mcp_core::ServiceKind;
use gcp_mcp_core::TransportError;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn call(router: &ToolRouter, name: &str) -> Value {
    router.handle_tool_call(name, &json!({})).unwrap()
}

fn read_json(router: &ToolRouter, uri: &str) -> Value {
    serde_json::from_str(&router.read_resource(uri).unwrap().text).unwrap()
}

// ============================================================================
// SECTION: test_gcp_auth
// ============================================================================

#[test]
fn auth_check_lists_at_most_five_buckets_for_the_project() {
    let factory = Arc::new(ScriptedFactory::with_buckets(&["a", "b", "c", "d", "e", "f", "g"]));
    let router = router_with(Arc::clone(&factory));

    let payload = call(&router, "test_gcp_auth");
    assert_eq!(payload["status"], "success");
    assert_eq!(payload["data"]["message"], "Authentication successful. Found 5 buckets.");
    assert_eq!(payload["data"]["buckets"], json!(["a", "b", "c", "d", "e"]));

    let queries = factory.queries.lock().unwrap().clone();
    assert!(queries.contains(&"project=router-proj".to_string()));
    assert!(queries.contains(&"maxResults=5".to_string()));
}

#[test]
fn auth_check_with_no_buckets_still_succeeds() {
    let router = router_with(Arc::new(ScriptedFactory::with_buckets(&[])));
    let payload = call(&router, "test_gcp_auth");
    assert_eq!(payload["data"]["message"], "Authentication successful. Found 0 buckets.");
}

#[test]
fn transport_failure_becomes_redacted_error_payload() {
    let factory = Arc::new(ScriptedFactory::failing_requests(TransportError::Auth(
        "refresh rejected: access_token=ya29.leaked-value".to_string(),
    )));
    let router = router_with(factory);

    let payload = call(&router, "test_gcp_auth");
    assert_eq!(payload["status"], "error");
    assert_eq!(payload["kind"], "authentication_error");
    let message = payload["message"].as_str().unwrap();
    assert!(message.starts_with("Authentication failed:"));
    assert!(!message.contains("leaked-value"));
}

#[test]
fn http_status_failure_is_transport_error() {
    let factory = Arc::new(ScriptedFactory::failing_requests(TransportError::Status {
        status: 403,
        body: "storage.buckets.list denied".to_string(),
    }));
    let payload = call(&router_with(factory), "test_gcp_auth");
    assert_eq!(payload["kind"], "transport_error");
    assert!(payload["message"].as_str().unwrap().contains("403"));
}

#[test]
fn construction_failure_becomes_client_initialization_payload() {
    let mut factory = ScriptedFactory::with_buckets(&["a"]);
    factory.build_failure = Some("tls setup failed".to_string());
    let router = router_with(Arc::new(factory));

    let payload = call(&router, "test_gcp_auth");
    assert_eq!(payload["status"], "error");
    assert_eq!(payload["kind"], "client_initialization_error");
    assert!(payload["message"].as_str().unwrap().contains("storage"));
    assert_eq!(router.context().cached_count(), 0);
}

// ============================================================================
// SECTION: gcp_context and Resources
// ============================================================================

#[test]
fn context_tool_reports_credential_and_constructed_clients() {
    let router = router_with(Arc::new(ScriptedFactory::with_buckets(&["a"])));
    let before = call(&router, "gcp_context");
    assert_eq!(before["data"]["project_id"], "router-proj");
    assert_eq!(before["data"]["location"], "europe-west1");
    assert_eq!(before["data"]["credential"]["source"], "service_account_file");
    assert_eq!(before["data"]["credential"]["valid"], true);
    assert!(before["data"]["credential"]["expires_at"].as_str().unwrap().ends_with('Z'));
    assert_eq!(before["data"]["clients"], json!([]));

    call(&router, "test_gcp_auth");
    let after = call(&router, "gcp_context");
    assert_eq!(after["data"]["clients"], json!(["storage"]));
}

#[test]
fn service_status_resource_tracks_construction() {
    let router = router_with(Arc::new(ScriptedFactory::with_buckets(&[])));
    let status = read_json(&router, "gcp://services/bigquery");
    assert_eq!(status["constructed"], false);
    assert_eq!(status["binds_project"], true);

    router.context().get_client(ServiceKind::BigQuery).unwrap();
    let status = read_json(&router, "gcp://services/bigquery");
    assert_eq!(status["constructed"], true);
    assert_eq!(status["endpoint"], "https://bigquery.googleapis.com/bigquery/v2");
}

#[test]
fn project_resource_reports_project_and_location() {
    let router = router_with(Arc::new(ScriptedFactory::with_buckets(&[])));
    let project = read_json(&router, "gcp://project");
    assert_eq!(project, json!({"project_id": "router-proj", "location": "europe-west1"}));
}

#[test]
fn unknown_names_are_routing_errors() {
    let router = router_with(Arc::new(ScriptedFactory::with_buckets(&[])));
    assert_eq!(router.handle_tool_call("nope", &Value::Null), Err(ToolError::UnknownTool));
    assert!(matches!(router.read_resource("gcp://services/dns"), Err(ToolError::UnknownResource(_))));
    assert_eq!(router.list_tools().len(), 2);
    assert_eq!(router.list_prompts().len(), 2);
}

// ============================================================================
// SECTION: Shutdown
// ============================================================================

#[test]
fn server_shutdown_closes_clients_once() {
    let factory = Arc::new(ScriptedFactory::with_buckets(&["a"]));
    let router = router_with(Arc::clone(&factory));
    let server = McpServer::with_context(GcpMcpConfig::default(), Arc::clone(router.context()));

    server.router().context().get_client(ServiceKind::Storage).unwrap();
    server.router().context().get_client(ServiceKind::Logging).unwrap();
    assert_eq!(server.shutdown(), 2);
    assert_eq!(server.shutdown(), 0);
    assert_eq!(factory.closes(), 2);

    let payload = call(server.router(), "test_gcp_auth");
    assert_eq!(payload["kind"], "client_initialization_error");
    let context = call(server.router(), "gcp_context");
    assert_eq!(context["data"]["closed"], true);
}
