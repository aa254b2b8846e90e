// kube-gate-core/src/claims.rs
// ============================================================================
// Module: Identity Claims
// Description: Dynamic identity claims and forwarded-token decoding.
// Purpose: Carry caller identity facts into policy evaluation.
// Dependencies: base64, serde_json
// ============================================================================

//! ## Overview
//! Identity claims are an unordered mapping from claim name to arbitrary
//! value, sourced from a bearer token forwarded by an upstream proxy. Only the
//! payload segment of the token is read here; signature verification belongs
//! to the proxy or a sibling middleware. An empty mapping is the anonymous
//! identity.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

/// Dynamic identity claims for a single request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityClaims {
    claims: Map<String, Value>,
}

impl IdentityClaims {
    /// Creates claims from a raw mapping.
    #[must_use]
    pub fn new(claims: Map<String, Value>) -> Self {
        Self {
            claims,
        }
    }

    /// Decodes claims from a forwarded bearer token.
    ///
    /// The token must have three dot-separated segments; the middle segment is
    /// decoded as URL-safe base64 without padding and parsed as a JSON object.
    /// Anything else yields `None`, which callers treat as anonymous.
    #[must_use]
    pub fn from_forwarded_token(token: &str) -> Option<Self> {
        let mut segments = token.split('.');
        let _header = segments.next()?;
        let payload = segments.next()?;
        let _signature = segments.next()?;
        if segments.next().is_some() {
            return None;
        }
        let bytes = URL_SAFE_NO_PAD.decode(payload.as_bytes()).ok()?;
        let value: Value = serde_json::from_slice(&bytes).ok()?;
        let Value::Object(claims) = value else {
            return None;
        };
        Some(Self {
            claims,
        })
    }

    /// Returns true when no claims are present (anonymous identity).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    /// Returns the raw value for a claim name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    /// Derives the display identity from the configured claim name.
    ///
    /// Returns `None` when the claim name is empty, absent, or not a string.
    #[must_use]
    pub fn identity(&self, claim: &str) -> Option<&str> {
        if claim.is_empty() {
            return None;
        }
        self.claims.get(claim).and_then(Value::as_str)
    }

    /// Returns the claims as a JSON value for predicate evaluation.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.claims.clone())
    }
}

impl From<Map<String, Value>> for IdentityClaims {
    fn from(claims: Map<String, Value>) -> Self {
        Self::new(claims)
    }
}
