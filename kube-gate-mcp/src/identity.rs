// kube-gate-mcp/src/identity.rs
// ============================================================================
// Module: Forwarded Identity
// Description: Identity claim extraction from transport headers.
// Purpose: Turn the forwarded bearer token into identity claims.
// Dependencies: axum, kube-gate-core
// ============================================================================

//! ## Overview
//! The configured forwarded-token header carries a three-segment bearer
//! token whose payload segment becomes the request's identity claims.
//! Signature validation is delegated upstream; anything that fails to decode
//! is treated as anonymous rather than rejected, so policy evaluation stays
//! the single gate.

use axum::http::HeaderMap;
use kube_gate_core::IdentityClaims;

/// Upper bound on the forwarded token header, matching proxy limits.
const MAX_FORWARDED_TOKEN_BYTES: usize = 16 * 1024;

/// Extracts identity claims from the forwarded-token header.
///
/// Returns the anonymous identity when the header name is not configured,
/// the header is absent or oversized, or the token does not decode.
#[must_use]
pub fn claims_from_headers(headers: &HeaderMap, header_name: &str) -> IdentityClaims {
    if header_name.is_empty() {
        return IdentityClaims::default();
    }
    let Some(value) = headers.get(header_name) else {
        return IdentityClaims::default();
    };
    if value.len() > MAX_FORWARDED_TOKEN_BYTES {
        return IdentityClaims::default();
    }
    let Ok(token) = value.to_str() else {
        return IdentityClaims::default();
    };
    IdentityClaims::from_forwarded_token(token).unwrap_or_default()
}
