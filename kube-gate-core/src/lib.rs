// kube-gate-core/src/lib.rs
// ============================================================================
// Module: Kube Gate Core Library
// Description: Public API surface for the Kube Gate core.
// Purpose: Expose the authorization, identity, and filtering substrate.
// Dependencies: crate::{authz, claims, filter, resource, tooling}
// ============================================================================

//! ## Overview
//! Kube Gate core provides the authorization and multi-tenancy substrate for
//! the Kube Gate MCP bridge: compiled policy evaluation over CEL predicates,
//! identity claim handling, the virtual-resource model, and the structural
//! filter pipeline applied to serialized tool responses. It performs no I/O
//! and holds no cluster state; cluster access lives in `kube-gate-clusters`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod authz;
pub mod claims;
pub mod filter;
pub mod resource;
pub mod tooling;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use authz::AccessRequest;
pub use authz::AuthzError;
pub use authz::Decision;
pub use authz::Evaluator;
pub use authz::MatchExpression;
pub use authz::PermissionFragment;
pub use authz::Policy;
pub use authz::ResourceRule;
pub use claims::IdentityClaims;
pub use filter::FilterError;
pub use resource::ResourceRef;
pub use resource::VIRTUAL_GROUP;
pub use resource::VIRTUAL_KIND_API_DISCOVERY;
pub use resource::VIRTUAL_KIND_CLUSTER_INFO;
pub use resource::VIRTUAL_KIND_CONTEXT;
pub use tooling::ToolName;
