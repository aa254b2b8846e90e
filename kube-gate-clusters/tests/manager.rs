// kube-gate-clusters/tests/manager.rs
// ============================================================================
// Module: Client Manager Tests
// Description: Context loading, namespace gating, and hot reload.
// Purpose: Ensure registry invariants and debounced credential reload.
// Dependencies: kube-gate-clusters, tempfile
// ============================================================================

#![allow(clippy::unwrap_used, missing_docs, reason = "Test-only assertions are permitted.")]

use std::path::Path;
use std::time::Duration;

use kube_gate_clusters::ClientManager;
use kube_gate_clusters::ClusterError;
use kube_gate_config::ContextConfig;
use kube_gate_config::KubernetesConfig;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Writes a minimal kubeconfig declaring one context against `server`.
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

fn explicit_context(name: &str, kubeconfig: &str) -> ContextConfig {
    ContextConfig {
        name: name.to_string(),
        kubeconfig: kubeconfig.to_string(),
        ..ContextConfig::default()
    }
}

// ============================================================================
// SECTION: Loading
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn loads_explicit_and_directory_contexts() {
    let dir = tempfile::tempdir().unwrap();
    let explicit_path = dir.path().join("explicit.kubeconfig");
    write_kubeconfig(&explicit_path, "dev", "http://127.0.0.1:18081");

    let contexts_dir = tempfile::tempdir().unwrap();
    write_kubeconfig(&contexts_dir.path().join("prod.yaml"), "prod", "http://127.0.0.1:18082");
    write_kubeconfig(&contexts_dir.path().join("edge.yml"), "edge", "http://127.0.0.1:18083");
    // Unrecognized extensions are ignored.
    std::fs::write(contexts_dir.path().join("notes.txt"), "not a kubeconfig").unwrap();

    let config = KubernetesConfig {
        default_context: "dev".to_string(),
        contexts: vec![explicit_context("dev", explicit_path.to_str().unwrap())],
        contexts_dir: contexts_dir.path().to_str().unwrap().to_string(),
    };
    let manager = ClientManager::new(&config).await.unwrap();
    assert_eq!(manager.contexts(), vec!["dev".to_string(), "edge".to_string(), "prod".to_string()]);
    assert_eq!(manager.active_context(), "dev");
    assert!(manager.client_for("prod").is_ok());
    manager.shutdown();
}

#[tokio::test(flavor = "multi_thread")]
async fn duplicate_explicit_names_are_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dev.kubeconfig");
    write_kubeconfig(&path, "dev", "http://127.0.0.1:18084");
    let entry = explicit_context("dev", path.to_str().unwrap());

    let config = KubernetesConfig {
        default_context: "dev".to_string(),
        contexts: vec![entry.clone(), entry],
        contexts_dir: String::new(),
    };
    let error = ClientManager::new(&config).await.unwrap_err();
    assert!(matches!(error, ClusterError::Config(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn directory_collision_with_explicit_context_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let explicit_path = dir.path().join("explicit.kubeconfig");
    write_kubeconfig(&explicit_path, "dev", "http://127.0.0.1:18085");

    let contexts_dir = tempfile::tempdir().unwrap();
    write_kubeconfig(&contexts_dir.path().join("dev.yaml"), "dev", "http://127.0.0.1:18086");

    let config = KubernetesConfig {
        default_context: "dev".to_string(),
        contexts: vec![explicit_context("dev", explicit_path.to_str().unwrap())],
        contexts_dir: contexts_dir.path().to_str().unwrap().to_string(),
    };
    let error = ClientManager::new(&config).await.unwrap_err();
    assert!(matches!(error, ClusterError::Config(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn default_context_must_be_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dev.kubeconfig");
    write_kubeconfig(&path, "dev", "http://127.0.0.1:18087");

    let config = KubernetesConfig {
        default_context: "prod".to_string(),
        contexts: vec![explicit_context("dev", path.to_str().unwrap())],
        contexts_dir: String::new(),
    };
    let error = ClientManager::new(&config).await.unwrap_err();
    assert!(matches!(error, ClusterError::Config(_)));
}

// ============================================================================
// SECTION: Context Resolution
// ============================================================================

async fn single_context_manager(server: &str) -> (ClientManager, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dev.kubeconfig");
    write_kubeconfig(&path, "dev", server);
    let config = KubernetesConfig {
        default_context: "dev".to_string(),
        contexts: vec![ContextConfig {
            name: "dev".to_string(),
            kubeconfig: path.to_str().unwrap().to_string(),
            description: "development".to_string(),
            allowed_namespaces: vec!["team-a".to_string(), "team-b".to_string()],
            denied_namespaces: vec!["team-b".to_string(), "kube-system".to_string()],
            ..ContextConfig::default()
        }],
        contexts_dir: String::new(),
    };
    (ClientManager::new(&config).await.unwrap(), dir)
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_context_resolves_to_active() {
    let (manager, _dir) = single_context_manager("http://127.0.0.1:18088").await;
    assert!(manager.client_for("").is_ok());
    assert_eq!(manager.context_config("").unwrap().description, "development");
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_context_is_surfaced() {
    let (manager, _dir) = single_context_manager("http://127.0.0.1:18089").await;
    let error = manager.client_for("nope").unwrap_err();
    assert!(matches!(error, ClusterError::UnknownContext(name) if name == "nope"));
    let error = manager.set_active_context("nope").unwrap_err();
    assert!(matches!(error, ClusterError::UnknownContext(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn namespace_deny_list_wins() {
    let (manager, _dir) = single_context_manager("http://127.0.0.1:18090").await;
    assert!(manager.namespace_allowed("dev", "team-a"));
    // Denied even though it is also in the allow-list.
    assert!(!manager.namespace_allowed("dev", "team-b"));
    assert!(!manager.namespace_allowed("dev", "kube-system"));
    // Not in the non-empty allow-list.
    assert!(!manager.namespace_allowed("dev", "team-c"));
    // Unknown context is never allowed.
    assert!(!manager.namespace_allowed("ghost", "team-a"));
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_allow_list_admits_non_denied_namespaces() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dev.kubeconfig");
    write_kubeconfig(&path, "dev", "http://127.0.0.1:18091");
    let config = KubernetesConfig {
        default_context: "dev".to_string(),
        contexts: vec![ContextConfig {
            name: "dev".to_string(),
            kubeconfig: path.to_str().unwrap().to_string(),
            denied_namespaces: vec!["kube-system".to_string()],
            ..ContextConfig::default()
        }],
        contexts_dir: String::new(),
    };
    let manager = ClientManager::new(&config).await.unwrap();
    assert!(manager.namespace_allowed("dev", "anything"));
    assert!(!manager.namespace_allowed("dev", "kube-system"));
}

// ============================================================================
// SECTION: Hot Reload
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn debounced_reload_swaps_the_bundle() {
    let contexts_dir = tempfile::tempdir().unwrap();
    let credential = contexts_dir.path().join("prod.yaml");
    write_kubeconfig(&credential, "prod", "http://127.0.0.1:18092");

    let config = KubernetesConfig {
        default_context: "prod".to_string(),
        contexts: Vec::new(),
        contexts_dir: contexts_dir.path().to_str().unwrap().to_string(),
    };
    let manager = ClientManager::new(&config).await.unwrap();
    let before = manager.client_for("prod").unwrap();
    assert!(before.cluster_url().contains("18092"));

    // Atomic replace: write a sibling then rename over the tracked file.
    let staged = contexts_dir.path().join(".prod.yaml.tmp");
    write_kubeconfig(&staged, "prod", "http://127.0.0.1:18093");
    std::fs::rename(&staged, &credential).unwrap();

    // The reload window must never surface an error to readers.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let bundle = manager.client_for("prod").unwrap();
        if bundle.cluster_url().contains("18093") {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "reload did not land in time");
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    // The pre-reload handle still serves the old credentials.
    assert!(before.cluster_url().contains("18092"));
    manager.shutdown();
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_reload_keeps_the_previous_bundle() {
    let contexts_dir = tempfile::tempdir().unwrap();
    let credential = contexts_dir.path().join("prod.yaml");
    write_kubeconfig(&credential, "prod", "http://127.0.0.1:18094");

    let config = KubernetesConfig {
        default_context: "prod".to_string(),
        contexts: Vec::new(),
        contexts_dir: contexts_dir.path().to_str().unwrap().to_string(),
    };
    let manager = ClientManager::new(&config).await.unwrap();

    std::fs::write(&credential, "not: [valid").unwrap();
    tokio::time::sleep(Duration::from_millis(1200)).await;

    let bundle = manager.client_for("prod").unwrap();
    assert!(bundle.cluster_url().contains("18094"));
    manager.shutdown();
}
