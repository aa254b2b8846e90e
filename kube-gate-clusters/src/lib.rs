// kube-gate-clusters/src/lib.rs
// ============================================================================
// Module: Kube Gate Cluster Library
// Description: Public API surface for multi-context client management.
// Purpose: Expose the client manager and per-context client bundles.
// Dependencies: crate::{bundle, manager, watch}
// ============================================================================

//! ## Overview
//! This crate owns one live cluster client bundle per logical context.
//! Contexts come from explicit configuration entries and from a watched
//! credential directory; credential changes are debounced and hot-reloaded
//! without interrupting in-flight requests. Namespace allow/deny lists are
//! enforced here, before any cluster call is made.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod bundle;
pub mod manager;
mod watch;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use bundle::ClusterClient;
pub use bundle::MetricsClient;
pub use manager::ClientManager;
pub use manager::ClusterError;
