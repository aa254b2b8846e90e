// kube-gate-mcp/src/tools/rbac_metrics.rs
// ============================================================================
// Module: RBAC and Metrics Tools
// Description: Handlers for permission checks and usage metrics.
// Purpose: Serve cluster-side authorization probes and metrics views.
// Dependencies: k8s-openapi, kube, kube-gate-core
// ============================================================================

use k8s_openapi::api::authorization::v1::ResourceAttributes;
use k8s_openapi::api::authorization::v1::SelfSubjectAccessReview;
use k8s_openapi::api::authorization::v1::SelfSubjectAccessReviewSpec;
use kube::api::Api;
use kube::api::PostParams;
use kube_gate_core::ResourceRef;
use kube_gate_core::ToolName;
use serde::Deserialize;
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
struct CheckPermissionParams {
    #[serde(default)]
    context: String,
    verb: String,
    #[serde(default)]
    group: String,
    resource: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    namespace: String,
}

#[derive(Debug, Deserialize)]
struct PodMetricsParams {
    #[serde(default)]
    context: String,
    #[serde(default)]
    namespace: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    label_selector: String,
    #[serde(default)]
    filter_expressions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct NodeMetricsParams {
    #[serde(default)]
    context: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    label_selector: String,
    #[serde(default)]
    filter_expressions: Vec<String>,
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

impl ToolRouter {
    /// Checks a verb against the cluster's own authorization.
    pub(super) async fn handle_check_permission(
        &self,
        request: &RequestContext,
        payload: Value,
    ) -> Result<String, ToolError> {
        let tool = ToolName::CheckPermission;
        let params: CheckPermissionParams = decode(payload)?;
        let context = self.context_param(&params.context);
        self.authorize(
            request,
            tool,
            &context,
            &params.namespace,
            ResourceRef::new(&params.group, "", &params.resource, &params.name),
        )?;
        let bundle = self.bundle(&context)?;

        let review = SelfSubjectAccessReview {
            spec: SelfSubjectAccessReviewSpec {
                resource_attributes: Some(ResourceAttributes {
                    verb: Some(params.verb.clone()),
                    group: (!params.group.is_empty()).then(|| params.group.clone()),
                    resource: Some(params.resource.clone()),
                    name: (!params.name.is_empty()).then(|| params.name.clone()),
                    namespace: (!params.namespace.is_empty()).then(|| params.namespace.clone()),
                    ..ResourceAttributes::default()
                }),
                ..SelfSubjectAccessReviewSpec::default()
            },
            ..SelfSubjectAccessReview::default()
        };
        let reviews: Api<SelfSubjectAccessReview> = Api::all(bundle.client());
        let created =
            reviews.create(&PostParams::default(), &review).await.map_err(upstream)?;

        let status = created.status.unwrap_or_default();
        let verdict = if status.allowed { "allowed" } else { "denied" };
        let mut output = format!("Permission check: {verdict}\n");
        output.push_str(&format!("  Verb:      {}\n", params.verb));
        output.push_str(&format!("  Group:     {}\n", params.group));
        output.push_str(&format!("  Resource:  {}\n", params.resource));
        if !params.name.is_empty() {
            output.push_str(&format!("  Name:      {}\n", params.name));
        }
        if !params.namespace.is_empty() {
            output.push_str(&format!("  Namespace: {}\n", params.namespace));
        }
        if let Some(reason) = status.reason.filter(|reason| !reason.is_empty()) {
            output.push_str(&format!("  Reason:    {reason}\n"));
        }
        Ok(output)
    }

    /// Fetches CPU and memory usage for pods.
    pub(super) async fn handle_get_pod_metrics(
        &self,
        request: &RequestContext,
        payload: Value,
    ) -> Result<String, ToolError> {
        let tool = ToolName::GetPodMetrics;
        let params: PodMetricsParams = decode(payload)?;
        let context = self.context_param(&params.context);
        self.authorize(
            request,
            tool,
            &context,
            &params.namespace,
            ResourceRef::new("", "", "PodMetrics", &params.name),
        )?;
        self.ensure_namespace_allowed(&context, &params.namespace)?;
        let bundle = self.bundle(&context)?;
        let metrics = bundle
            .metrics()
            .ok_or_else(|| ToolError::MetricsUnavailable(context.clone()))?;

        let output = if params.name.is_empty() {
            let api = metrics.pod_metrics(&params.namespace);
            let list = api
                .list(&list_params(&params.label_selector, ""))
                .await
                .map_err(upstream)?;
            to_yaml(&list)?
        } else {
            let namespace =
                if params.namespace.is_empty() { "default" } else { &params.namespace };
            let api = metrics.pod_metrics(namespace);
            let object = api.get(&params.name).await.map_err(upstream)?;
            to_yaml(&object)?
        };
        Self::apply_filters(tool, output, &params.filter_expressions)
    }

    /// Fetches CPU and memory usage for nodes.
    pub(super) async fn handle_get_node_metrics(
        &self,
        request: &RequestContext,
        payload: Value,
    ) -> Result<String, ToolError> {
        let tool = ToolName::GetNodeMetrics;
        let params: NodeMetricsParams = decode(payload)?;
        let context = self.context_param(&params.context);
        self.authorize(
            request,
            tool,
            &context,
            "",
            ResourceRef::new("", "", "NodeMetrics", &params.name),
        )?;
        let bundle = self.bundle(&context)?;
        let metrics = bundle
            .metrics()
            .ok_or_else(|| ToolError::MetricsUnavailable(context.clone()))?;

        let api = metrics.node_metrics();
        let output = if params.name.is_empty() {
            let list = api
                .list(&list_params(&params.label_selector, ""))
                .await
                .map_err(upstream)?;
            to_yaml(&list)?
        } else {
            let object = api.get(&params.name).await.map_err(upstream)?;
            to_yaml(&object)?
        };
        Self::apply_filters(tool, output, &params.filter_expressions)
    }
}
