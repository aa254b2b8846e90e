// kube-gate-mcp/src/audit.rs
// ============================================================================
// Module: Authorization Audit
// Description: Audit events for tool authorization decisions.
// Purpose: Record every allow and deny with enough context to reconstruct it.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every authorization decision emits one audit event. The default sink
//! writes JSON lines to stderr so deployments can ship them with the process
//! logs; tests use the no-op sink.

use serde::Serialize;

// ============================================================================
// SECTION: Events
// ============================================================================

/// Audit event for one authorization decision.
#[derive(Debug, Serialize)]
pub struct AuthzAuditEvent {
    /// Event identifier.
    event: &'static str,
    /// Decision outcome.
    decision: &'static str,
    /// Tool being invoked.
    tool: String,
    /// Target context name.
    context: String,
    /// Display identity derived from the configured claim, when present.
    identity: Option<String>,
}

impl AuthzAuditEvent {
    /// Builds an allow event.
    #[must_use]
    pub fn allowed(tool: &str, context: &str, identity: Option<&str>) -> Self {
        Self {
            event: "tool_authz",
            decision: "allow",
            tool: tool.to_string(),
            context: context.to_string(),
            identity: identity.map(str::to_string),
        }
    }

    /// Builds a deny event.
    #[must_use]
    pub fn denied(tool: &str, context: &str, identity: Option<&str>) -> Self {
        Self {
            event: "tool_authz",
            decision: "deny",
            tool: tool.to_string(),
            context: context.to_string(),
            identity: identity.map(str::to_string),
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Sink for authorization audit events.
pub trait AuditSink: Send + Sync {
    /// Records an audit event.
    fn record(&self, event: &AuthzAuditEvent);
}

/// Sink that writes JSON lines to stderr.
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn record(&self, event: &AuthzAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            eprintln!("{payload}");
        }
    }
}

/// No-op sink for tests.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &AuthzAuditEvent) {}
}
