// kube-gate-mcp/src/tools/read.rs
// ============================================================================
// Module: Read Tools
// Description: Handlers for get, list, and describe operations.
// Purpose: Serve read-only resource access through the dispatch pipeline.
// Dependencies: kube, kube-gate-core
// ============================================================================

use k8s_openapi::api::core::v1::Event;
use kube::api::Api;
use kube::api::ListParams;
use kube_gate_core::ResourceRef;
use kube_gate_core::ToolName;
use serde::Deserialize;
use serde_json::Value;

use crate::tools::api_resource;
use crate::tools::decode;
use crate::tools::dynamic_api;
use crate::tools::to_yaml;
use crate::tools::upstream;
use crate::tools::RequestContext;
use crate::tools::ToolError;
use crate::tools::ToolRouter;

// ============================================================================
// SECTION: Parameters
// ============================================================================

#[derive(Debug, Deserialize)]
struct GetResourceParams {
    #[serde(default)]
    context: String,
    #[serde(default)]
    group: String,
    version: String,
    kind: String,
    name: String,
    #[serde(default)]
    namespace: String,
    #[serde(default)]
    filter_expressions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ListResourcesParams {
    #[serde(default)]
    context: String,
    #[serde(default)]
    group: String,
    version: String,
    kind: String,
    #[serde(default)]
    namespace: String,
    #[serde(default)]
    label_selector: String,
    #[serde(default)]
    field_selector: String,
    #[serde(default)]
    filter_expressions: Vec<String>,
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

impl ToolRouter {
    /// Gets a single resource by name.
    pub(super) async fn handle_get_resource(
        &self,
        request: &RequestContext,
        payload: Value,
    ) -> Result<String, ToolError> {
        let tool = ToolName::GetResource;
        let params: GetResourceParams = decode(payload)?;
        let context = self.context_param(&params.context);
        self.authorize(
            request,
            tool,
            &context,
            &params.namespace,
            ResourceRef::new(&params.group, &params.version, &params.kind, &params.name),
        )?;
        self.ensure_namespace_allowed(&context, &params.namespace)?;
        let bundle = self.bundle(&context)?;

        let resource = api_resource(&params.group, &params.version, &params.kind);
        let api = dynamic_api(&bundle, &resource, &params.namespace);
        let object = api.get(&params.name).await.map_err(upstream)?;

        let output = to_yaml(&object)?;
        Self::apply_filters(tool, output, &params.filter_expressions)
    }

    /// Lists resources with optional selectors.
    pub(super) async fn handle_list_resources(
        &self,
        request: &RequestContext,
        payload: Value,
    ) -> Result<String, ToolError> {
        let tool = ToolName::ListResources;
        let params: ListResourcesParams = decode(payload)?;
        let context = self.context_param(&params.context);
        self.authorize(
            request,
            tool,
            &context,
            &params.namespace,
            ResourceRef::new(&params.group, &params.version, &params.kind, ""),
        )?;
        self.ensure_namespace_allowed(&context, &params.namespace)?;
        let bundle = self.bundle(&context)?;

        let resource = api_resource(&params.group, &params.version, &params.kind);
        let api = dynamic_api(&bundle, &resource, &params.namespace);
        let list = api
            .list(&list_params(&params.label_selector, &params.field_selector))
            .await
            .map_err(upstream)?;

        let output = to_yaml(&list)?;
        Self::apply_filters(tool, output, &params.filter_expressions)
    }

    /// Gets a resource together with its related events.
    pub(super) async fn handle_describe_resource(
        &self,
        request: &RequestContext,
        payload: Value,
    ) -> Result<String, ToolError> {
        let tool = ToolName::DescribeResource;
        let params: GetResourceParams = decode(payload)?;
        let context = self.context_param(&params.context);
        self.authorize(
            request,
            tool,
            &context,
            &params.namespace,
            ResourceRef::new(&params.group, &params.version, &params.kind, &params.name),
        )?;
        self.ensure_namespace_allowed(&context, &params.namespace)?;
        let bundle = self.bundle(&context)?;

        let resource = api_resource(&params.group, &params.version, &params.kind);
        let api = dynamic_api(&bundle, &resource, &params.namespace);
        let object = api.get(&params.name).await.map_err(upstream)?;
        let mut output = to_yaml(&object)?;

        if !params.namespace.is_empty() {
            let events: Api<Event> = Api::namespaced(bundle.client(), &params.namespace);
            let selector =
                format!("involvedObject.name={},involvedObject.kind={}", params.name, params.kind);
            if let Ok(related) = events.list(&ListParams::default().fields(&selector)).await {
                if !related.items.is_empty() {
                    output.push_str("\n---\n# Related Events\n");
                    output.push_str(&to_yaml(&related)?);
                }
            }
        }

        Self::apply_filters(tool, output, &params.filter_expressions)
    }
}

/// Builds list parameters from optional selectors.
pub(super) fn list_params(label_selector: &str, field_selector: &str) -> ListParams {
    let mut params = ListParams::default();
    if !label_selector.is_empty() {
        params = params.labels(label_selector);
    }
    if !field_selector.is_empty() {
        params = params.fields(field_selector);
    }
    params
}
