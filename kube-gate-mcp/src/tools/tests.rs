// kube-gate-mcp/src/tools/tests.rs
// ============================================================================
// Module: Tool Router Tests
// Description: Dispatch pipeline tests that run without a live cluster.
// Purpose: Ensure routing, gating, and input validation fail closed.
// Dependencies: kube-gate-clusters, kube-gate-core, tempfile
// ============================================================================

#![allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]

use std::path::Path;
use std::sync::Arc;

use kube_gate_clusters::ClientManager;
use kube_gate_clusters::ClusterError;
use kube_gate_config::ContextConfig;
use kube_gate_config::KubernetesConfig;
use kube_gate_core::Evaluator;
use kube_gate_core::MatchExpression;
use kube_gate_core::PermissionFragment;
use kube_gate_core::Policy;
use serde_json::json;

use crate::audit::NoopAuditSink;
use crate::tools::RequestContext;
use crate::tools::ToolError;
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

fn permissive_evaluator() -> Arc<Evaluator> {
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
    Arc::new(Evaluator::new(vec![policy], true).unwrap())
}

fn closed_evaluator() -> Arc<Evaluator> {
    Arc::new(Evaluator::new(Vec::new(), true).unwrap())
}

async fn router_with(authz: Arc<Evaluator>) -> (ToolRouter, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let dev = dir.path().join("dev.kubeconfig");
    write_kubeconfig(&dev, "dev", "http://127.0.0.1:19001");
    let staging = dir.path().join("staging.kubeconfig");
    write_kubeconfig(&staging, "staging", "http://127.0.0.1:19002");

    let config = KubernetesConfig {
        default_context: "dev".to_string(),
        contexts: vec![
            ContextConfig {
                name: "dev".to_string(),
                kubeconfig: dev.to_str().unwrap().to_string(),
                description: "development".to_string(),
                denied_namespaces: vec!["kube-system".to_string()],
                ..ContextConfig::default()
            },
            ContextConfig {
                name: "staging".to_string(),
                kubeconfig: staging.to_str().unwrap().to_string(),
                ..ContextConfig::default()
            },
        ],
        contexts_dir: String::new(),
    };
    let clusters = Arc::new(ClientManager::new(&config).await.unwrap());
    let router = ToolRouter::new(ToolRouterConfig {
        clusters,
        authz,
        identity_claim: "sub".to_string(),
        audit: Arc::new(NoopAuditSink),
    });
    (router, dir)
}

// ============================================================================
// SECTION: Routing
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn unknown_tool_is_rejected() {
    let (router, _dir) = router_with(permissive_evaluator()).await;
    let error = router
        .handle_tool_call(&RequestContext::anonymous(), "not_a_tool", json!({}))
        .await
        .unwrap_err();
    assert!(matches!(error, ToolError::UnknownTool(name) if name == "not_a_tool"));
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_required_parameters_are_invalid() {
    let (router, _dir) = router_with(permissive_evaluator()).await;
    let error = router
        .handle_tool_call(&RequestContext::anonymous(), "get_resource", json!({"kind": "Pod"}))
        .await
        .unwrap_err();
    assert!(matches!(error, ToolError::InvalidParams(_)));
}

// ============================================================================
// SECTION: Authorization Gating
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn deny_by_default_names_tool_and_context() {
    let (router, _dir) = router_with(closed_evaluator()).await;
    let error = router
        .handle_tool_call(&RequestContext::anonymous(), "get_current_context", json!({}))
        .await
        .unwrap_err();
    match error {
        ToolError::AccessDenied {
            tool,
            context,
        } => {
            assert_eq!(tool, "get_current_context");
            assert_eq!(context, "");
        }
        other => panic!("expected access denied, got {other}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn namespace_deny_list_blocks_before_any_cluster_call() {
    let (router, _dir) = router_with(permissive_evaluator()).await;
    let payload = json!({
        "version": "v1",
        "kind": "Pod",
        "name": "web",
        "namespace": "kube-system",
    });
    let error = router
        .handle_tool_call(&RequestContext::anonymous(), "get_resource", payload)
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        ToolError::NamespaceDenied { namespace, context }
            if namespace == "kube-system" && context == "dev"
    ));
}

// ============================================================================
// SECTION: Input Validation
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn collection_delete_requires_a_selector() {
    let (router, _dir) = router_with(permissive_evaluator()).await;
    let payload = json!({"version": "v1", "kind": "Pod", "namespace": "default"});
    let error = router
        .handle_tool_call(&RequestContext::anonymous(), "delete_resources", payload)
        .await
        .unwrap_err();
    assert!(matches!(error, ToolError::InvalidParams(message) if message.contains("selector")));
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_patch_type_is_rejected() {
    let (router, _dir) = router_with(permissive_evaluator()).await;
    let payload = json!({
        "version": "v1",
        "kind": "ConfigMap",
        "name": "settings",
        "namespace": "default",
        "patch_type": "creative",
        "patch": "{}",
    });
    let error = router
        .handle_tool_call(&RequestContext::anonymous(), "patch_resource", payload)
        .await
        .unwrap_err();
    assert!(matches!(error, ToolError::InvalidParams(message) if message.contains("patch type")));
}

#[tokio::test(flavor = "multi_thread")]
async fn exec_requires_a_command() {
    let (router, _dir) = router_with(permissive_evaluator()).await;
    let payload = json!({"name": "web", "command": []});
    let error = router
        .handle_tool_call(&RequestContext::anonymous(), "exec_command", payload)
        .await
        .unwrap_err();
    assert!(matches!(error, ToolError::InvalidParams(message) if message.contains("command")));
}

#[tokio::test(flavor = "multi_thread")]
async fn undo_rollout_supports_only_deployments() {
    let (router, _dir) = router_with(permissive_evaluator()).await;
    let payload = json!({
        "version": "v1",
        "kind": "DaemonSet",
        "name": "agent",
        "namespace": "default",
    });
    let error = router
        .handle_tool_call(&RequestContext::anonymous(), "undo_rollout", payload)
        .await
        .unwrap_err();
    assert!(matches!(error, ToolError::InvalidParams(message) if message.contains("Deployment")));
}

// ============================================================================
// SECTION: Context Tools
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn context_tools_round_trip_without_cluster_access() {
    let (router, _dir) = router_with(permissive_evaluator()).await;
    let anonymous = RequestContext::anonymous();

    let current =
        router.handle_tool_call(&anonymous, "get_current_context", json!({})).await.unwrap();
    assert!(current.contains("name: dev"));
    assert!(current.contains("description: development"));

    let listed = router.handle_tool_call(&anonymous, "list_contexts", json!({})).await.unwrap();
    assert!(listed.contains("dev"));
    assert!(listed.contains("staging"));

    let switched = router
        .handle_tool_call(&anonymous, "switch_context", json!({"context_name": "staging"}))
        .await
        .unwrap();
    assert!(switched.contains("Switched context from dev to staging"));
    assert_eq!(router.clusters().active_context(), "staging");

    let error = router
        .handle_tool_call(&anonymous, "switch_context", json!({"context_name": "ghost"}))
        .await
        .unwrap_err();
    assert!(matches!(error, ToolError::Cluster(ClusterError::UnknownContext(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn list_contexts_supports_filter_expressions() {
    let (router, _dir) = router_with(permissive_evaluator()).await;
    let payload = json!({"filter_expressions": ["$[*].name"]});
    let output = router
        .handle_tool_call(&RequestContext::anonymous(), "list_contexts", payload)
        .await
        .unwrap();
    let names: Vec<String> = serde_yaml::from_str(&output).unwrap();
    assert_eq!(names, vec!["dev".to_string(), "staging".to_string()]);
}

// ============================================================================
// SECTION: Metrics Gating
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn absent_metrics_backend_yields_the_dedicated_error() {
    // The fixture clusters are unreachable, so the metrics probe records
    // absence at bundle build time.
    let (router, _dir) = router_with(permissive_evaluator()).await;
    let error = router
        .handle_tool_call(&RequestContext::anonymous(), "get_node_metrics", json!({}))
        .await
        .unwrap_err();
    assert!(matches!(error, ToolError::MetricsUnavailable(context) if context == "dev"));
}
