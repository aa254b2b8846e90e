// kube-gate-config/tests/document.rs
// ============================================================================
// Module: Configuration Document Tests
// Description: Parsing, environment expansion, and validation.
// Purpose: Ensure the configuration loader is strict and fail-closed.
// Dependencies: kube-gate-config
// ============================================================================

#![allow(clippy::unwrap_used, missing_docs, reason = "Test-only assertions are permitted.")]

use std::io::Write as _;

use kube_gate_config::config::expand_env;
use kube_gate_config::ConfigError;
use kube_gate_config::Configuration;
use kube_gate_config::TransportType;

const FULL_DOCUMENT: &str = r#"
server:
  name: kube-gate
  version: 0.1.0
  transport:
    type: http
    http:
      host: 127.0.0.1:8080
middleware:
  access_logs:
    excluded_headers: [cookie]
    redacted_headers: [authorization]
  jwt:
    enabled: true
    validation:
      strategy: forwarded
      forwarded_header: X-Forwarded-Access-Token
oauth_authorization_server:
  enabled: false
oauth_protected_resource:
  enabled: false
kubernetes:
  default_context: dev
  contexts:
    - name: dev
      kubeconfig: /etc/kube-gate/dev.yaml
      description: development cluster
      allowed_namespaces: [team-a, team-b]
      denied_namespaces: [kube-system]
authorization:
  allow_anonymous: false
  identity_claim: sub
  policies:
    - name: developers
      description: full access for developers
      match:
        expression: payload.group == "dev"
      allow:
        tools: ["*"]
        contexts: ["*"]
        resources:
          - groups: ["apps"]
            kinds: ["Deployment"]
            namespaces: ["team-*"]
      deny:
        resources:
          - groups: [""]
            kinds: ["Secret"]
"#;

#[test]
fn parses_the_full_document() {
    let config = Configuration::parse(FULL_DOCUMENT).unwrap();
    assert_eq!(config.server.name, "kube-gate");
    assert_eq!(config.server.transport.transport_type, TransportType::Http);
    assert_eq!(config.server.transport.http.host, "127.0.0.1:8080");
    assert_eq!(config.middleware.jwt.validation.forwarded_header, "X-Forwarded-Access-Token");
    assert_eq!(config.kubernetes.default_context, "dev");
    assert_eq!(config.kubernetes.contexts.len(), 1);
    assert_eq!(config.kubernetes.contexts[0].denied_namespaces, vec!["kube-system".to_string()]);
    assert!(!config.authorization.allow_anonymous);
    assert_eq!(config.authorization.policies.len(), 1);
    let policy = &config.authorization.policies[0];
    assert_eq!(policy.name, "developers");
    let allow = policy.allow.as_ref().unwrap();
    assert_eq!(allow.resources[0].namespaces, vec!["team-*".to_string()]);
    let deny = policy.deny.as_ref().unwrap();
    assert_eq!(deny.resources[0].groups, vec![String::new()]);
}

#[test]
fn defaults_to_the_stdio_transport() {
    let config = Configuration::parse("server:\n  name: kube-gate\n").unwrap();
    assert_eq!(config.server.transport.transport_type, TransportType::Stdio);
}

#[test]
fn read_file_round_trips() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(FULL_DOCUMENT.as_bytes()).unwrap();
    let config = Configuration::read_file(file.path()).unwrap();
    assert_eq!(config.kubernetes.default_context, "dev");
}

// ============================================================================
// SECTION: Environment Expansion
// ============================================================================

#[test]
fn expands_both_reference_shapes() {
    std::env::set_var("KUBE_GATE_TEST_HOST", "0.0.0.0:9000");
    assert_eq!(expand_env("host: $KUBE_GATE_TEST_HOST"), "host: 0.0.0.0:9000");
    assert_eq!(expand_env("host: ${KUBE_GATE_TEST_HOST}!"), "host: 0.0.0.0:9000!");
}

#[test]
fn unset_variables_expand_to_empty() {
    std::env::remove_var("KUBE_GATE_TEST_MISSING");
    assert_eq!(expand_env("value: '$KUBE_GATE_TEST_MISSING'"), "value: ''");
}

#[test]
fn non_references_pass_through() {
    assert_eq!(expand_env("cost: $1"), "cost: $1");
    assert_eq!(expand_env("brace: ${not valid}"), "brace: ${not valid}");
    assert_eq!(expand_env("tail: $"), "tail: $");
}

// ============================================================================
// SECTION: Validation
// ============================================================================

fn assert_invalid(document: &str, needle: &str) {
    match Configuration::parse(document) {
        Err(ConfigError::Invalid(message)) => {
            assert!(message.contains(needle), "message {message:?} missing {needle:?}");
        }
        other => panic!("expected invalid config, got {other:?}"),
    }
}

#[test]
fn http_transport_requires_a_host() {
    assert_invalid("server:\n  transport:\n    type: http\n", "host");
}

#[test]
fn duplicate_context_names_are_rejected() {
    let document = r"
kubernetes:
  default_context: dev
  contexts:
    - name: dev
    - name: dev
";
    assert_invalid(document, "duplicate context name");
}

#[test]
fn default_context_must_be_configured() {
    let document = r"
kubernetes:
  default_context: prod
  contexts:
    - name: dev
";
    assert_invalid(document, "not a configured context");
}

#[test]
fn default_context_is_required_with_sources() {
    let document = r"
kubernetes:
  contexts:
    - name: dev
";
    assert_invalid(document, "default_context");
}

#[test]
fn directory_sources_defer_membership_to_load_time() {
    let document = r"
kubernetes:
  default_context: from-dir
  contexts_dir: /etc/kube-gate/contexts
";
    assert!(Configuration::parse(document).is_ok());
}

#[test]
fn policies_require_names_and_expressions() {
    let unnamed = r#"
authorization:
  policies:
    - name: ""
      match:
        expression: "true"
"#;
    assert_invalid(unnamed, "require a name");

    let blank = r#"
authorization:
  policies:
    - name: empty
      match:
        expression: "  "
"#;
    assert_invalid(blank, "match expression");

    let duplicated = r#"
authorization:
  policies:
    - name: twice
      match:
        expression: "true"
    - name: twice
      match:
        expression: "true"
"#;
    assert_invalid(duplicated, "duplicate policy name");
}

#[test]
fn resource_rules_reject_empty_version_kind_and_name_tokens() {
    for (field, fragment) in [
        ("versions", "allow"),
        ("kinds", "allow"),
        ("names", "deny"),
    ] {
        let document = format!(
            r#"
authorization:
  policies:
    - name: guarded
      match:
        expression: "true"
      {fragment}:
        resources:
          - {field}: [""]
"#
        );
        match Configuration::parse(&document) {
            Err(ConfigError::Invalid(message)) => {
                assert!(message.contains(field), "message {message:?} missing {field:?}");
            }
            other => panic!("expected invalid {field} token to be rejected, got {other:?}"),
        }
    }
}

#[test]
fn empty_group_and_namespace_tokens_remain_meaningful() {
    let document = r#"
authorization:
  policies:
    - name: core-cluster-scoped
      match:
        expression: "true"
      allow:
        resources:
          - groups: [""]
            namespaces: [""]
"#;
    assert!(Configuration::parse(document).is_ok());
}
