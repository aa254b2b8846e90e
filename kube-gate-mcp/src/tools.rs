// kube-gate-mcp/src/tools.rs
// ============================================================================
// Module: Tool Router
// Description: Tool dispatch pipeline for the Kube Gate MCP server.
// Purpose: Authorize, route, execute, and post-process every tool call.
// Dependencies: kube-gate-core, kube-gate-clusters, kube
// ============================================================================

//! ## Overview
//! The tool router performs the invariant per-call pipeline: extract identity,
//! derive the resource descriptor, consult the policy evaluator, gate the
//! namespace, resolve the cluster bundle, invoke the Kubernetes operation,
//! serialize to YAML, and apply the structural filter pipeline. Tool handlers
//! live in the submodules and stay thin.
//!
//! ## Invariants
//! - No handler touches the cluster before authorization and namespace
//!   gating pass.
//! - Authorization failures name the tool and context.
//! - Handlers return text; the transport wraps it as an MCP result.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use kube::api::Api;
use kube::api::ApiResource;
use kube::api::DynamicObject;
use kube_gate_clusters::ClientManager;
use kube_gate_clusters::ClusterClient;
use kube_gate_clusters::ClusterError;
use kube_gate_core::filter;
use kube_gate_core::AccessRequest;
use kube_gate_core::Evaluator;
use kube_gate_core::FilterError;
use kube_gate_core::IdentityClaims;
use kube_gate_core::ResourceRef;
use kube_gate_core::ToolName;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::audit::AuditSink;
use crate::audit::AuthzAuditEvent;

mod cluster;
mod context;
mod diff;
mod logs_exec;
mod modify;
mod rbac_metrics;
mod read;
mod scale_rollout;

// ============================================================================
// SECTION: Request Context
// ============================================================================

/// Per-request context carried from the transport.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Identity claims decoded from the forwarded token; empty is anonymous.
    pub claims: IdentityClaims,
}

impl RequestContext {
    /// Builds an anonymous request context.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Builds a request context from decoded claims.
    #[must_use]
    pub fn with_claims(claims: IdentityClaims) -> Self {
        Self {
            claims,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while handling a tool call.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Tool name not recognized.
    #[error("unknown tool {0}")]
    UnknownTool(String),
    /// Tool payload failed to decode or is semantically invalid.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    /// The policy evaluator refused the request.
    #[error("access denied: not authorized to use tool {tool} on context {context}")]
    AccessDenied {
        /// Tool being invoked.
        tool: String,
        /// Target context name.
        context: String,
    },
    /// The namespace is outside the context's namespace policy.
    #[error("namespace {namespace} is not allowed in context {context}")]
    NamespaceDenied {
        /// Rejected namespace.
        namespace: String,
        /// Target context name.
        context: String,
    },
    /// Cluster layer failure, including unknown contexts.
    #[error(transparent)]
    Cluster(#[from] ClusterError),
    /// The context's cluster has no metrics backend.
    #[error("metrics backend is not available in context {0}")]
    MetricsUnavailable(String),
    /// Upstream cluster call failed; the message is surfaced verbatim.
    #[error("{0}")]
    Upstream(String),
    /// Structural filter pipeline failure.
    #[error(transparent)]
    Filter(#[from] FilterError),
    /// Response serialization failed.
    #[error("serialization failure: {0}")]
    Serialization(String),
}

// ============================================================================
// SECTION: Tool Router
// ============================================================================

/// Configuration inputs for building a tool router.
pub struct ToolRouterConfig {
    /// Cluster client manager.
    pub clusters: Arc<ClientManager>,
    /// Compiled policy evaluator.
    pub authz: Arc<Evaluator>,
    /// Claim name used to derive the audit identity.
    pub identity_claim: String,
    /// Audit sink for authorization decisions.
    pub audit: Arc<dyn AuditSink>,
}

/// Routes tool calls through the invariant dispatch pipeline.
#[derive(Clone)]
pub struct ToolRouter {
    /// Cluster client manager.
    clusters: Arc<ClientManager>,
    /// Compiled policy evaluator.
    authz: Arc<Evaluator>,
    /// Claim name used to derive the audit identity.
    identity_claim: String,
    /// Audit sink for authorization decisions.
    audit: Arc<dyn AuditSink>,
}

impl ToolRouter {
    /// Creates a new tool router.
    #[must_use]
    pub fn new(config: ToolRouterConfig) -> Self {
        Self {
            clusters: config.clusters,
            authz: config.authz,
            identity_claim: config.identity_claim,
            audit: config.audit,
        }
    }

    /// Returns the cluster client manager.
    #[must_use]
    pub fn clusters(&self) -> &ClientManager {
        &self.clusters
    }

    /// Handles a tool call by name with a JSON payload, returning the text
    /// block for the MCP result.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] when any stage of the pipeline fails.
    pub async fn handle_tool_call(
        &self,
        context: &RequestContext,
        name: &str,
        payload: Value,
    ) -> Result<String, ToolError> {
        let tool = ToolName::parse(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        match tool {
            ToolName::GetResource => self.handle_get_resource(context, payload).await,
            ToolName::ListResources => self.handle_list_resources(context, payload).await,
            ToolName::DescribeResource => self.handle_describe_resource(context, payload).await,
            ToolName::ApplyManifest => self.handle_apply_manifest(context, payload).await,
            ToolName::PatchResource => self.handle_patch_resource(context, payload).await,
            ToolName::DeleteResource => self.handle_delete_resource(context, payload).await,
            ToolName::DeleteResources => self.handle_delete_resources(context, payload).await,
            ToolName::ScaleResource => self.handle_scale_resource(context, payload).await,
            ToolName::GetRolloutStatus => self.handle_get_rollout_status(context, payload).await,
            ToolName::RestartRollout => self.handle_restart_rollout(context, payload).await,
            ToolName::UndoRollout => self.handle_undo_rollout(context, payload).await,
            ToolName::GetLogs => self.handle_get_logs(context, payload).await,
            ToolName::ExecCommand => self.handle_exec_command(context, payload).await,
            ToolName::ListApiResources => self.handle_list_api_resources(context, payload).await,
            ToolName::ListApiVersions => self.handle_list_api_versions(context, payload).await,
            ToolName::GetClusterInfo => self.handle_get_cluster_info(context, payload).await,
            ToolName::ListNamespaces => self.handle_list_namespaces(context, payload).await,
            ToolName::ListEvents => self.handle_list_events(context, payload).await,
            ToolName::GetCurrentContext => self.handle_get_current_context(context, payload),
            ToolName::ListContexts => self.handle_list_contexts(context, payload),
            ToolName::SwitchContext => self.handle_switch_context(context, payload),
            ToolName::CheckPermission => self.handle_check_permission(context, payload).await,
            ToolName::GetPodMetrics => self.handle_get_pod_metrics(context, payload).await,
            ToolName::GetNodeMetrics => self.handle_get_node_metrics(context, payload).await,
            ToolName::DiffManifest => self.handle_diff_manifest(context, payload).await,
        }
    }

    // ========================================================================
    // SECTION: Pipeline Stages
    // ========================================================================

    /// Resolves the target context, defaulting to the active context.
    fn context_param(&self, context: &str) -> String {
        if context.is_empty() {
            self.clusters.active_context()
        } else {
            context.to_string()
        }
    }

    /// Consults the policy evaluator and records the decision.
    fn authorize(
        &self,
        request: &RequestContext,
        tool: ToolName,
        context: &str,
        namespace: &str,
        resource: ResourceRef,
    ) -> Result<(), ToolError> {
        let access = AccessRequest {
            claims: &request.claims,
            tool: tool.as_str(),
            context,
            namespace,
            resource,
        };
        let identity = request.claims.identity(&self.identity_claim);
        if self.authz.decide(&access).is_allow() {
            self.audit.record(&AuthzAuditEvent::allowed(tool.as_str(), context, identity));
            Ok(())
        } else {
            self.audit.record(&AuthzAuditEvent::denied(tool.as_str(), context, identity));
            Err(ToolError::AccessDenied {
                tool: tool.as_str().to_string(),
                context: context.to_string(),
            })
        }
    }

    /// Rejects namespaces outside the context's namespace policy.
    fn ensure_namespace_allowed(&self, context: &str, namespace: &str) -> Result<(), ToolError> {
        if namespace.is_empty() || self.clusters.namespace_allowed(context, namespace) {
            Ok(())
        } else {
            Err(ToolError::NamespaceDenied {
                namespace: namespace.to_string(),
                context: context.to_string(),
            })
        }
    }

    /// Resolves the cluster bundle for the context.
    fn bundle(&self, context: &str) -> Result<Arc<ClusterClient>, ToolError> {
        Ok(self.clusters.client_for(context)?)
    }

    /// Applies the structural filter pipeline when the tool supports it.
    fn apply_filters(
        tool: ToolName,
        output: String,
        expressions: &[String],
    ) -> Result<String, ToolError> {
        if tool.supports_filters() && !expressions.is_empty() {
            Ok(filter::apply(&output, expressions)?)
        } else {
            Ok(output)
        }
    }
}

// ============================================================================
// SECTION: Shared Helpers
// ============================================================================

/// Decodes a JSON payload into a typed parameter struct.
fn decode<T: for<'de> Deserialize<'de>>(payload: Value) -> Result<T, ToolError> {
    serde_json::from_value(payload).map_err(|err| ToolError::InvalidParams(err.to_string()))
}

/// Serializes a response value to the canonical YAML text format.
fn to_yaml<T: Serialize>(value: &T) -> Result<String, ToolError> {
    serde_yaml::to_string(value).map_err(|err| ToolError::Serialization(err.to_string()))
}

/// Maps an upstream cluster error, surfacing its message verbatim.
fn upstream(err: kube::Error) -> ToolError {
    ToolError::Upstream(err.to_string())
}

/// Builds the descriptor for a dynamic API from group, version, and kind.
fn api_resource(group: &str, version: &str, kind: &str) -> ApiResource {
    let api_version =
        if group.is_empty() { version.to_string() } else { format!("{group}/{version}") };
    ApiResource {
        group: group.to_string(),
        version: version.to_string(),
        api_version,
        kind: kind.to_string(),
        plural: plural_for_kind(kind),
    }
}

/// Derives the lowercase plural resource name for a kind.
///
/// Discovery would be authoritative; this simplified mapping covers the
/// common kinds plus the irregular plurals that matter in practice.
fn plural_for_kind(kind: &str) -> String {
    let lower = kind.to_ascii_lowercase();
    match lower.as_str() {
        "ingress" => "ingresses".to_string(),
        "networkpolicy" => "networkpolicies".to_string(),
        "endpoints" => "endpoints".to_string(),
        _ => {
            if lower.ends_with('s') {
                lower
            } else {
                format!("{lower}s")
            }
        }
    }
}

/// Returns a dynamic API scoped to the namespace, or cluster-wide when the
/// namespace is empty.
fn dynamic_api(
    bundle: &ClusterClient,
    resource: &ApiResource,
    namespace: &str,
) -> Api<DynamicObject> {
    if namespace.is_empty() {
        Api::all_with(bundle.client(), resource)
    } else {
        Api::namespaced_with(bundle.client(), namespace, resource)
    }
}

#[cfg(test)]
mod tests;
