// kube-gate-core/tests/rules.rs
// ============================================================================
// Module: Resource Rule Matching Tests
// Description: Structural matching of resource rules against descriptors.
// Purpose: Ensure token lists, wildcard shapes, and scope tokens behave.
// Dependencies: kube-gate-core
// ============================================================================

#![allow(missing_docs, reason = "Test-only assertions are permitted.")]

use kube_gate_core::ResourceRef;
use kube_gate_core::ResourceRule;

fn deployment() -> ResourceRef {
    ResourceRef::new("apps", "v1", "Deployment", "web")
}

#[test]
fn empty_rule_matches_everything() {
    let rule = ResourceRule::default();
    assert!(rule.matches(&deployment(), "default"));
    assert!(rule.matches(&ResourceRef::default(), ""));
}

#[test]
fn every_non_empty_field_must_match() {
    let rule = ResourceRule {
        groups: vec!["apps".to_string()],
        kinds: vec!["Deployment".to_string()],
        ..ResourceRule::default()
    };
    assert!(rule.matches(&deployment(), "default"));

    let mismatched_kind = ResourceRef::new("apps", "v1", "StatefulSet", "web");
    assert!(!rule.matches(&mismatched_kind, "default"));
}

#[test]
fn empty_group_token_targets_the_core_group() {
    let rule = ResourceRule {
        groups: vec![String::new()],
        ..ResourceRule::default()
    };
    assert!(rule.matches(&ResourceRef::new("", "v1", "Pod", "web"), "default"));
    assert!(!rule.matches(&deployment(), "default"));
}

#[test]
fn empty_namespace_token_targets_cluster_scope() {
    let rule = ResourceRule {
        namespaces: vec![String::new()],
        ..ResourceRule::default()
    };
    assert!(rule.matches(&ResourceRef::new("", "v1", "Node", "a"), ""));
    assert!(!rule.matches(&ResourceRef::new("", "v1", "Pod", "a"), "default"));
}

#[test]
fn namespace_prefix_wildcard() {
    let rule = ResourceRule {
        namespaces: vec!["team-*".to_string()],
        ..ResourceRule::default()
    };
    assert!(rule.matches(&deployment(), "team-alpha"));
    assert!(rule.matches(&deployment(), "team-"));
    assert!(!rule.matches(&deployment(), "other"));
    assert!(!rule.matches(&deployment(), ""));
}

#[test]
fn namespace_suffix_and_middle_wildcards() {
    let suffix = ResourceRule {
        namespaces: vec!["*-prod".to_string()],
        ..ResourceRule::default()
    };
    assert!(suffix.matches(&deployment(), "payments-prod"));
    assert!(!suffix.matches(&deployment(), "payments-dev"));

    let middle = ResourceRule {
        namespaces: vec!["*infra*".to_string()],
        ..ResourceRule::default()
    };
    assert!(middle.matches(&deployment(), "core-infra-eu"));
    assert!(middle.matches(&deployment(), "infra"));
    assert!(!middle.matches(&deployment(), "apps"));
}

#[test]
fn name_wildcards_follow_the_same_shapes() {
    let rule = ResourceRule {
        names: vec!["web-*".to_string()],
        ..ResourceRule::default()
    };
    assert!(rule.matches(&ResourceRef::new("apps", "v1", "Deployment", "web-frontend"), "ns"));
    assert!(!rule.matches(&ResourceRef::new("apps", "v1", "Deployment", "api"), "ns"));
}

#[test]
fn validate_rejects_empty_version_kind_and_name_tokens() {
    let invalid = [
        ResourceRule {
            versions: vec![String::new()],
            ..ResourceRule::default()
        },
        ResourceRule {
            kinds: vec!["Pod".to_string(), String::new()],
            ..ResourceRule::default()
        },
        ResourceRule {
            names: vec![String::new()],
            ..ResourceRule::default()
        },
    ];
    for rule in invalid {
        assert!(rule.validate().is_err());
    }
}

#[test]
fn validate_accepts_empty_group_and_namespace_tokens() {
    let rule = ResourceRule {
        groups: vec![String::new()],
        namespaces: vec![String::new()],
        ..ResourceRule::default()
    };
    assert!(rule.validate().is_ok());

    assert!(ResourceRule::default().validate().is_ok());
}

#[test]
fn wildcard_token_matches_any_value() {
    let rule = ResourceRule {
        groups: vec!["*".to_string()],
        versions: vec!["*".to_string()],
        kinds: vec!["*".to_string()],
        namespaces: vec!["*".to_string()],
        names: vec!["*".to_string()],
    };
    assert!(rule.matches(&deployment(), "default"));
    assert!(rule.matches(&ResourceRef::default(), ""));
}
