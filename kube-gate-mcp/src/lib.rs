// kube-gate-mcp/src/lib.rs
// ============================================================================
// Module: Kube Gate MCP
// Description: MCP tool dispatcher and server for Kube Gate.
// Purpose: Expose cluster operations as policy-gated MCP tools.
// Dependencies: kube-gate-core, kube-gate-clusters, axum, tokio
// ============================================================================

//! ## Overview
//! This crate wires the authorization substrate to the cluster layer: every
//! tool invocation is identified, authorized, routed to the right context,
//! executed against the cluster, serialized to YAML, and post-processed by
//! the structural filter pipeline. Tool handlers are thin adapters; the
//! invariant per-call pipeline lives in [`tools::ToolRouter`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod catalog;
pub mod identity;
pub mod server;
pub mod tools;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditSink;
pub use audit::AuthzAuditEvent;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use catalog::tool_definitions;
pub use catalog::ToolDefinition;
pub use server::McpServer;
pub use server::ServerError;
pub use tools::RequestContext;
pub use tools::ToolError;
pub use tools::ToolRouter;
pub use tools::ToolRouterConfig;
