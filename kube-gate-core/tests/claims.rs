// kube-gate-core/tests/claims.rs
// ============================================================================
// Module: Identity Claims Tests
// Description: Forwarded-token decoding and identity derivation.
// Purpose: Ensure payload-segment decoding is strict and fail-closed.
// Dependencies: kube-gate-core
// ============================================================================

#![allow(clippy::unwrap_used, missing_docs, reason = "Test-only assertions are permitted.")]

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use kube_gate_core::IdentityClaims;
use serde_json::json;

fn token_for(payload: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256"}"#);
    let body = URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload).unwrap());
    format!("{header}.{body}.signature")
}

#[test]
fn decodes_the_payload_segment() {
    let token = token_for(&json!({"sub": "alice", "admin": true}));
    let claims = IdentityClaims::from_forwarded_token(&token).unwrap();
    assert!(!claims.is_empty());
    assert_eq!(claims.get("sub"), Some(&json!("alice")));
    assert_eq!(claims.get("admin"), Some(&json!(true)));
}

#[test]
fn identity_uses_the_configured_claim() {
    let token = token_for(&json!({"sub": "alice", "email": "alice@example.com"}));
    let claims = IdentityClaims::from_forwarded_token(&token).unwrap();
    assert_eq!(claims.identity("email"), Some("alice@example.com"));
    assert_eq!(claims.identity("missing"), None);
    assert_eq!(claims.identity(""), None);
}

#[test]
fn identity_requires_a_string_claim() {
    let token = token_for(&json!({"sub": 42}));
    let claims = IdentityClaims::from_forwarded_token(&token).unwrap();
    assert_eq!(claims.identity("sub"), None);
}

#[test]
fn rejects_tokens_without_three_segments() {
    assert!(IdentityClaims::from_forwarded_token("one.two").is_none());
    assert!(IdentityClaims::from_forwarded_token("a.b.c.d").is_none());
    assert!(IdentityClaims::from_forwarded_token("").is_none());
}

#[test]
fn rejects_invalid_base64_and_non_object_payloads() {
    assert!(IdentityClaims::from_forwarded_token("h.!!!.s").is_none());
    let scalar = URL_SAFE_NO_PAD.encode(b"\"just-a-string\"");
    assert!(IdentityClaims::from_forwarded_token(&format!("h.{scalar}.s")).is_none());
}

#[test]
fn empty_claims_are_anonymous() {
    assert!(IdentityClaims::default().is_empty());
}
