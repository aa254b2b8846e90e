// kube-gate-mcp/src/tools/cluster.rs
// ============================================================================
// Module: Cluster Tools
// Description: Handlers for discovery, cluster info, namespaces, and events.
// Purpose: Serve cluster-level views through the dispatch pipeline.
// Dependencies: kube, kube-gate-core
// ============================================================================

use k8s_openapi::api::core::v1::Event;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::api::core::v1::Node;
use kube::api::Api;
use kube::api::ListParams;
use kube::discovery::Discovery;
use kube::discovery::Scope;
use kube_gate_core::ResourceRef;
use kube_gate_core::ToolName;
use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use serde_json::Value;

use crate::tools::decode;
use crate::tools::read::list_params;
use crate::tools::to_yaml;
use crate::tools::upstream;
use crate::tools::RequestContext;
use crate::tools::ToolError;
use crate::tools::ToolRouter;

// ============================================================================
// SECTION: Parameters
// ============================================================================

#[derive(Debug, Deserialize)]
struct ListApiResourcesParams {
    #[serde(default)]
    context: String,
    #[serde(default)]
    api_group: String,
    #[serde(default)]
    namespaced: Option<bool>,
    #[serde(default)]
    filter_expressions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ContextOnlyParams {
    #[serde(default)]
    context: String,
    #[serde(default)]
    filter_expressions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ListNamespacesParams {
    #[serde(default)]
    context: String,
    #[serde(default)]
    label_selector: String,
    #[serde(default)]
    filter_expressions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ListEventsParams {
    #[serde(default)]
    context: String,
    #[serde(default)]
    namespace: String,
    #[serde(default)]
    field_selector: String,
    #[serde(default)]
    types: Vec<String>,
    #[serde(default)]
    filter_expressions: Vec<String>,
}

/// Flattened discovery entry for one API resource.
#[derive(Debug, Serialize)]
struct ApiResourceInfo {
    group: String,
    version: String,
    kind: String,
    name: String,
    namespaced: bool,
    verbs: Vec<String>,
}

/// Summary row for one namespace.
#[derive(Debug, Serialize)]
struct NamespaceInfo {
    name: String,
    status: String,
    age: String,
    allowed: bool,
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

impl ToolRouter {
    /// Lists API resources available in the cluster.
    pub(super) async fn handle_list_api_resources(
        &self,
        request: &RequestContext,
        payload: Value,
    ) -> Result<String, ToolError> {
        let tool = ToolName::ListApiResources;
        let params: ListApiResourcesParams = decode(payload)?;
        let context = self.context_param(&params.context);
        self.authorize(request, tool, &context, "", ResourceRef::default())?;
        let bundle = self.bundle(&context)?;

        let discovery = Discovery::new(bundle.client()).run().await.map_err(upstream)?;
        let mut resources = Vec::new();
        for group in discovery.groups() {
            if !params.api_group.is_empty() && group.name() != params.api_group {
                continue;
            }
            for version in group.versions() {
                for (resource, capabilities) in group.versioned_resources(version) {
                    let namespaced = matches!(capabilities.scope, Scope::Namespaced);
                    if params.namespaced.is_some_and(|wanted| wanted != namespaced) {
                        continue;
                    }
                    resources.push(ApiResourceInfo {
                        group: group.name().to_string(),
                        version: version.to_string(),
                        kind: resource.kind,
                        name: resource.plural,
                        namespaced,
                        verbs: capabilities.operations.clone(),
                    });
                }
            }
        }

        let output = to_yaml(&resources)?;
        Self::apply_filters(tool, output, &params.filter_expressions)
    }

    /// Lists API versions served by the cluster.
    pub(super) async fn handle_list_api_versions(
        &self,
        request: &RequestContext,
        payload: Value,
    ) -> Result<String, ToolError> {
        let tool = ToolName::ListApiVersions;
        let params: ContextOnlyParams = decode(payload)?;
        let context = self.context_param(&params.context);
        self.authorize(request, tool, &context, "", ResourceRef::default())?;
        let bundle = self.bundle(&context)?;

        let groups = bundle.client().list_api_groups().await.map_err(upstream)?;
        let output = to_yaml(&groups)?;
        Self::apply_filters(tool, output, &params.filter_expressions)
    }

    /// Reports basic cluster information.
    pub(super) async fn handle_get_cluster_info(
        &self,
        request: &RequestContext,
        payload: Value,
    ) -> Result<String, ToolError> {
        let tool = ToolName::GetClusterInfo;
        let params: ContextOnlyParams = decode(payload)?;
        let context = self.context_param(&params.context);
        self.authorize(request, tool, &context, "", ResourceRef::default())?;
        let bundle = self.bundle(&context)?;

        let version = bundle.client().apiserver_version().await.map_err(upstream)?;
        let nodes: Api<Node> = Api::all(bundle.client());
        let node_count =
            nodes.list(&ListParams::default()).await.map(|list| list.items.len()).unwrap_or(0);
        let namespaces: Api<Namespace> = Api::all(bundle.client());
        let namespace_count =
            namespaces.list(&ListParams::default()).await.map(|list| list.items.len()).unwrap_or(0);
        let description =
            self.clusters().context_config(&context).map(|entry| entry.description).unwrap_or_default();

        let info = json!({
            "context": context,
            "description": description,
            "server_version": version.git_version,
            "platform": version.platform,
            "node_count": node_count,
            "namespace_count": namespace_count,
            "host": bundle.cluster_url(),
        });
        to_yaml(&info)
    }

    /// Lists namespaces with their gating outcome.
    pub(super) async fn handle_list_namespaces(
        &self,
        request: &RequestContext,
        payload: Value,
    ) -> Result<String, ToolError> {
        let tool = ToolName::ListNamespaces;
        let params: ListNamespacesParams = decode(payload)?;
        let context = self.context_param(&params.context);
        self.authorize(
            request,
            tool,
            &context,
            "",
            ResourceRef::new("", "v1", "Namespace", ""),
        )?;
        let bundle = self.bundle(&context)?;

        let namespaces: Api<Namespace> = Api::all(bundle.client());
        let list = namespaces
            .list(&list_params(&params.label_selector, ""))
            .await
            .map_err(upstream)?;

        let now = k8s_openapi::chrono::Utc::now();
        let mut rows = Vec::with_capacity(list.items.len());
        for namespace in &list.items {
            let name = namespace.metadata.name.clone().unwrap_or_default();
            let status = namespace
                .status
                .as_ref()
                .and_then(|status| status.phase.clone())
                .unwrap_or_default();
            let age = namespace
                .metadata
                .creation_timestamp
                .as_ref()
                .map(|created| format_age((now - created.0).num_seconds()))
                .unwrap_or_default();
            let allowed = self.clusters().namespace_allowed(&context, &name);
            rows.push(NamespaceInfo {
                name,
                status,
                age,
                allowed,
            });
        }

        let output = to_yaml(&rows)?;
        Self::apply_filters(tool, output, &params.filter_expressions)
    }

    /// Lists cluster or namespace events, optionally filtered by type.
    pub(super) async fn handle_list_events(
        &self,
        request: &RequestContext,
        payload: Value,
    ) -> Result<String, ToolError> {
        let tool = ToolName::ListEvents;
        let params: ListEventsParams = decode(payload)?;
        let context = self.context_param(&params.context);
        self.authorize(
            request,
            tool,
            &context,
            &params.namespace,
            ResourceRef::new("", "v1", "Event", ""),
        )?;
        self.ensure_namespace_allowed(&context, &params.namespace)?;
        let bundle = self.bundle(&context)?;

        let events: Api<Event> = if params.namespace.is_empty() {
            Api::all(bundle.client())
        } else {
            Api::namespaced(bundle.client(), &params.namespace)
        };
        let mut list =
            events.list(&list_params("", &params.field_selector)).await.map_err(upstream)?;

        if !params.types.is_empty() {
            list.items.retain(|event| {
                event.type_.as_deref().is_some_and(|event_type| {
                    params.types.iter().any(|wanted| wanted.eq_ignore_ascii_case(event_type))
                })
            });
        }

        let output = to_yaml(&list)?;
        Self::apply_filters(tool, output, &params.filter_expressions)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Renders an age in the largest whole unit.
fn format_age(seconds: i64) -> String {
    let seconds = seconds.max(0);
    if seconds >= 86_400 {
        format!("{}d", seconds / 86_400)
    } else if seconds >= 3_600 {
        format!("{}h", seconds / 3_600)
    } else if seconds >= 60 {
        format!("{}m", seconds / 60)
    } else {
        format!("{seconds}s")
    }
}
