// kube-gate-mcp/src/server/tests.rs
// ============================================================================
// Module: MCP Server Tests
// Description: JSON-RPC envelope handling for the MCP server.
// Purpose: Ensure protocol methods, notifications, and error shaping.
// Dependencies: kube-gate-clusters, kube-gate-core, tempfile
// ============================================================================

#![allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]

use std::path::Path;
use std::sync::Arc;

use kube_gate_clusters::ClientManager;
use kube_gate_config::ContextConfig;
use kube_gate_config::KubernetesConfig;
use kube_gate_core::Evaluator;
use kube_gate_core::MatchExpression;
use kube_gate_core::PermissionFragment;
use kube_gate_core::Policy;
use serde_json::json;
use serde_json::Value;

use crate::audit::NoopAuditSink;
use crate::server::handle_payload;
use crate::server::Response;
use crate::server::ServerState;
use crate::tools::RequestContext;
use crate::tools::ToolRouter;
use crate::tools::ToolRouterConfig;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn write_kubeconfig(path: &Path, context: &str, server: &str) {
    let content = format!(
        r"apiVersion: v1
kind: Config
current-context: {context}
clusters:
- name: {context}-cluster
  cluster:
    server: {server}
contexts:
- name: {context}
  context:
    cluster: {context}-cluster
    user: {context}-user
users:
- name: {context}-user
  user:
    token: fixture-token
"
    );
    std::fs::write(path, content).unwrap();
}

async fn server_state() -> (Arc<ServerState>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let dev = dir.path().join("dev.kubeconfig");
    write_kubeconfig(&dev, "dev", "http://127.0.0.1:19011");
    let config = KubernetesConfig {
        default_context: "dev".to_string(),
        contexts: vec![ContextConfig {
            name: "dev".to_string(),
            kubeconfig: dev.to_str().unwrap().to_string(),
            ..ContextConfig::default()
        }],
        contexts_dir: String::new(),
    };
    let clusters = Arc::new(ClientManager::new(&config).await.unwrap());
    let policy = Policy {
        name: "open".to_string(),
        description: String::new(),
        matcher: MatchExpression {
            expression: "true".to_string(),
        },
        allow: Some(PermissionFragment {
            tools: vec!["*".to_string()],
            contexts: vec!["*".to_string()],
            ..PermissionFragment::default()
        }),
        deny: None,
    };
    let router = ToolRouter::new(ToolRouterConfig {
        clusters,
        authz: Arc::new(Evaluator::new(vec![policy], true).unwrap()),
        identity_claim: "sub".to_string(),
        audit: Arc::new(NoopAuditSink),
    });
    let state = Arc::new(ServerState {
        router,
        server_name: "kube-gate".to_string(),
        server_version: "0.1.0".to_string(),
        forwarded_header: String::new(),
    });
    (state, dir)
}

async fn call(state: &ServerState, payload: Value) -> Option<Response> {
    let context = RequestContext::anonymous();
    handle_payload(state, &context, payload.to_string().as_bytes()).await
}

// ============================================================================
// SECTION: Protocol Methods
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn initialize_reports_server_info() {
    let (state, _dir) = server_state().await;
    let request = json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"});
    let response = call(&state, request).await.unwrap();
    let result = &response.body["result"];
    assert_eq!(result["serverInfo"]["name"], "kube-gate");
    assert_eq!(result["serverInfo"]["version"], "0.1.0");
    assert!(result["capabilities"]["tools"].is_object());
}

#[tokio::test(flavor = "multi_thread")]
async fn tools_list_returns_the_full_catalog() {
    let (state, _dir) = server_state().await;
    let request = json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"});
    let response = call(&state, request).await.unwrap();
    let tools = response.body["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), kube_gate_core::ToolName::all().len());
    assert!(tools.iter().any(|tool| tool["name"] == "get_resource"));
    assert!(tools.iter().all(|tool| tool["inputSchema"]["type"] == "object"));
}

#[tokio::test(flavor = "multi_thread")]
async fn tools_call_wraps_text_results() {
    let (state, _dir) = server_state().await;
    let request = json!({
        "jsonrpc": "2.0",
        "id": 3,
        "method": "tools/call",
        "params": {"name": "get_current_context", "arguments": {}},
    });
    let response = call(&state, request).await.unwrap();
    let result = &response.body["result"];
    assert_eq!(result["isError"], false);
    assert_eq!(result["content"][0]["type"], "text");
    assert!(result["content"][0]["text"].as_str().unwrap().contains("name: dev"));
}

#[tokio::test(flavor = "multi_thread")]
async fn tool_failures_become_flagged_error_text() {
    let (state, _dir) = server_state().await;
    let request = json!({
        "jsonrpc": "2.0",
        "id": 4,
        "method": "tools/call",
        "params": {"name": "unknown_tool", "arguments": {}},
    });
    let response = call(&state, request).await.unwrap();
    let result = &response.body["result"];
    assert_eq!(result["isError"], true);
    let text = result["content"][0]["text"].as_str().unwrap();
    assert!(text.starts_with("Error: "));
}

// ============================================================================
// SECTION: Envelope Errors
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn malformed_payloads_are_parse_errors() {
    let (state, _dir) = server_state().await;
    let context = RequestContext::anonymous();
    let response = handle_payload(&state, &context, b"not json").await.unwrap();
    assert_eq!(response.body["error"]["code"], -32700);
}

#[tokio::test(flavor = "multi_thread")]
async fn wrong_version_is_rejected() {
    let (state, _dir) = server_state().await;
    let request = json!({"jsonrpc": "1.0", "id": 5, "method": "tools/list"});
    let response = call(&state, request).await.unwrap();
    assert_eq!(response.body["error"]["code"], -32600);
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_methods_are_rejected() {
    let (state, _dir) = server_state().await;
    let request = json!({"jsonrpc": "2.0", "id": 6, "method": "resources/list"});
    let response = call(&state, request).await.unwrap();
    assert_eq!(response.body["error"]["code"], -32601);
}

#[tokio::test(flavor = "multi_thread")]
async fn notifications_get_no_response() {
    let (state, _dir) = server_state().await;
    let request = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});
    assert!(call(&state, request).await.is_none());
}
