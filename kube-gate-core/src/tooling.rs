// kube-gate-core/src/tooling.rs
// ============================================================================
// Module: Tooling Identifiers
// Description: Canonical MCP tool identifiers for Kube Gate.
// Purpose: Shared tool naming across the dispatcher, catalog, and policies.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Canonical tool identifiers used by the Kube Gate MCP bridge. These names
//! are part of the external contract surface and double as the tool tokens
//! referenced by authorization policies.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::resource::ResourceRef;
use crate::resource::VIRTUAL_KIND_API_DISCOVERY;
use crate::resource::VIRTUAL_KIND_CLUSTER_INFO;
use crate::resource::VIRTUAL_KIND_CONTEXT;

/// Canonical tool names for the Kube Gate MCP bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    /// Get a specific resource by name.
    GetResource,
    /// List resources with optional selectors.
    ListResources,
    /// Get a resource together with its related events.
    DescribeResource,
    /// Apply a manifest (create or update).
    ApplyManifest,
    /// Patch an existing resource.
    PatchResource,
    /// Delete a single resource.
    DeleteResource,
    /// Delete a collection of resources matching selectors.
    DeleteResources,
    /// Scale a workload by patching its replica count.
    ScaleResource,
    /// Report the rollout status of a workload.
    GetRolloutStatus,
    /// Restart a rollout via the restart annotation.
    RestartRollout,
    /// Revert a rollout to a previous revision.
    UndoRollout,
    /// Fetch container logs from a pod.
    GetLogs,
    /// Execute a non-interactive command in a container.
    ExecCommand,
    /// List API resources available in the cluster.
    ListApiResources,
    /// List API versions served by the cluster.
    ListApiVersions,
    /// Report basic cluster information.
    GetClusterInfo,
    /// List namespaces with their gating outcome.
    ListNamespaces,
    /// List cluster or namespace events.
    ListEvents,
    /// Report the active context.
    GetCurrentContext,
    /// List configured contexts.
    ListContexts,
    /// Switch the active context.
    SwitchContext,
    /// Check a verb against the cluster's own authorization.
    CheckPermission,
    /// Fetch CPU and memory usage for pods.
    GetPodMetrics,
    /// Fetch CPU and memory usage for nodes.
    GetNodeMetrics,
    /// Compare a manifest against the live object.
    DiffManifest,
}

impl ToolName {
    /// Returns the canonical string name for the tool.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GetResource => "get_resource",
            Self::ListResources => "list_resources",
            Self::DescribeResource => "describe_resource",
            Self::ApplyManifest => "apply_manifest",
            Self::PatchResource => "patch_resource",
            Self::DeleteResource => "delete_resource",
            Self::DeleteResources => "delete_resources",
            Self::ScaleResource => "scale_resource",
            Self::GetRolloutStatus => "get_rollout_status",
            Self::RestartRollout => "restart_rollout",
            Self::UndoRollout => "undo_rollout",
            Self::GetLogs => "get_logs",
            Self::ExecCommand => "exec_command",
            Self::ListApiResources => "list_api_resources",
            Self::ListApiVersions => "list_api_versions",
            Self::GetClusterInfo => "get_cluster_info",
            Self::ListNamespaces => "list_namespaces",
            Self::ListEvents => "list_events",
            Self::GetCurrentContext => "get_current_context",
            Self::ListContexts => "list_contexts",
            Self::SwitchContext => "switch_context",
            Self::CheckPermission => "check_permission",
            Self::GetPodMetrics => "get_pod_metrics",
            Self::GetNodeMetrics => "get_node_metrics",
            Self::DiffManifest => "diff_manifest",
        }
    }

    /// Returns all Kube Gate tool names in canonical order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::GetResource,
            Self::ListResources,
            Self::DescribeResource,
            Self::ApplyManifest,
            Self::PatchResource,
            Self::DeleteResource,
            Self::DeleteResources,
            Self::ScaleResource,
            Self::GetRolloutStatus,
            Self::RestartRollout,
            Self::UndoRollout,
            Self::GetLogs,
            Self::ExecCommand,
            Self::ListApiResources,
            Self::ListApiVersions,
            Self::GetClusterInfo,
            Self::ListNamespaces,
            Self::ListEvents,
            Self::GetCurrentContext,
            Self::ListContexts,
            Self::SwitchContext,
            Self::CheckPermission,
            Self::GetPodMetrics,
            Self::GetNodeMetrics,
            Self::DiffManifest,
        ]
    }

    /// Parses a tool name from its string representation.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|tool| tool.as_str() == name)
    }

    /// Returns the fixed virtual descriptor for tools that do not take a
    /// caller-supplied resource.
    ///
    /// Consulted only when the caller's descriptor is empty; a supplied real
    /// descriptor always wins.
    #[must_use]
    pub fn virtual_resource(self) -> Option<ResourceRef> {
        match self {
            Self::ListApiResources | Self::ListApiVersions => {
                Some(ResourceRef::virtual_kind(VIRTUAL_KIND_API_DISCOVERY))
            }
            Self::GetClusterInfo => Some(ResourceRef::virtual_kind(VIRTUAL_KIND_CLUSTER_INFO)),
            Self::GetCurrentContext | Self::ListContexts | Self::SwitchContext => {
                Some(ResourceRef::virtual_kind(VIRTUAL_KIND_CONTEXT))
            }
            _ => None,
        }
    }

    /// Returns true when the tool supports structural filter expressions on
    /// its serialized output.
    #[must_use]
    pub const fn supports_filters(self) -> bool {
        matches!(
            self,
            Self::GetResource
                | Self::ListResources
                | Self::DescribeResource
                | Self::ListApiResources
                | Self::ListApiVersions
                | Self::ListNamespaces
                | Self::ListEvents
                | Self::ListContexts
                | Self::GetPodMetrics
                | Self::GetNodeMetrics
        )
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
