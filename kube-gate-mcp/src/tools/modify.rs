// kube-gate-mcp/src/tools/modify.rs
// ============================================================================
// Module: Mutation Tools
// Description: Handlers for apply, patch, and delete operations.
// Purpose: Serve resource mutation through the dispatch pipeline.
// Dependencies: json-patch, kube, kube-gate-core
// ============================================================================

use kube::api::DeleteParams;
use kube::api::DynamicObject;
use kube::api::Patch;
use kube::api::PatchParams;
use kube::api::PostParams;
use kube::api::PropagationPolicy;
use kube_gate_core::ResourceRef;
use kube_gate_core::ToolName;
use serde::Deserialize;
use serde_json::Value;

use crate::tools::api_resource;
use crate::tools::decode;
use crate::tools::dynamic_api;
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
struct ApplyManifestParams {
    #[serde(default)]
    context: String,
    manifest: String,
    #[serde(default)]
    namespace: String,
}

#[derive(Debug, Deserialize)]
struct PatchResourceParams {
    #[serde(default)]
    context: String,
    #[serde(default)]
    group: String,
    version: String,
    kind: String,
    name: String,
    #[serde(default)]
    namespace: String,
    patch_type: String,
    patch: String,
}

#[derive(Debug, Deserialize)]
struct DeleteResourceParams {
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
    grace_period_seconds: Option<u32>,
    #[serde(default)]
    propagation_policy: String,
}

#[derive(Debug, Deserialize)]
struct DeleteResourcesParams {
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
    grace_period_seconds: Option<u32>,
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

impl ToolRouter {
    /// Applies a manifest, updating the object when it already exists.
    pub(super) async fn handle_apply_manifest(
        &self,
        request: &RequestContext,
        payload: Value,
    ) -> Result<String, ToolError> {
        let tool = ToolName::ApplyManifest;
        let params: ApplyManifestParams = decode(payload)?;
        let context = self.context_param(&params.context);

        let mut manifest: Value = serde_yaml::from_str(&params.manifest)
            .map_err(|err| ToolError::InvalidParams(format!("failed to parse manifest: {err}")))?;
        if !params.namespace.is_empty() {
            let root = manifest
                .as_object_mut()
                .ok_or_else(|| ToolError::InvalidParams("manifest must be a mapping".to_string()))?;
            let metadata = root
                .entry("metadata")
                .or_insert_with(|| Value::Object(serde_json::Map::new()));
            if let Some(metadata) = metadata.as_object_mut() {
                metadata.insert("namespace".to_string(), Value::String(params.namespace.clone()));
            }
        }
        let object: DynamicObject = serde_json::from_value(manifest)
            .map_err(|err| ToolError::InvalidParams(format!("failed to parse manifest: {err}")))?;
        let (group, version, kind) = manifest_gvk(&object)?;
        let name = object.metadata.name.clone().unwrap_or_default();
        let namespace = object.metadata.namespace.clone().unwrap_or_default();

        self.authorize(
            request,
            tool,
            &context,
            &namespace,
            ResourceRef::new(&group, &version, &kind, &name),
        )?;
        self.ensure_namespace_allowed(&context, &namespace)?;
        let bundle = self.bundle(&context)?;

        let resource = api_resource(&group, &version, &kind);
        let api = dynamic_api(&bundle, &resource, &namespace);
        let applied = match api.create(&PostParams::default(), &object).await {
            Ok(created) => created,
            Err(kube::Error::Api(response)) if response.reason == "AlreadyExists" => {
                api.replace(&name, &PostParams::default(), &object).await.map_err(upstream)?
            }
            Err(err) => return Err(upstream(err)),
        };

        let output = to_yaml(&applied)?;
        Ok(format!("Successfully applied {kind}/{name} in namespace {namespace}\n\n{output}"))
    }

    /// Patches an existing resource.
    pub(super) async fn handle_patch_resource(
        &self,
        request: &RequestContext,
        payload: Value,
    ) -> Result<String, ToolError> {
        let tool = ToolName::PatchResource;
        let params: PatchResourceParams = decode(payload)?;
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

        let patch_value: Value = serde_yaml::from_str(&params.patch)
            .map_err(|err| ToolError::InvalidParams(format!("failed to parse patch: {err}")))?;
        let patch = parse_patch(&params.patch_type, patch_value)?;

        let resource = api_resource(&params.group, &params.version, &params.kind);
        let api = dynamic_api(&bundle, &resource, &params.namespace);
        let patched =
            api.patch(&params.name, &PatchParams::default(), &patch).await.map_err(upstream)?;

        let output = to_yaml(&patched)?;
        Ok(format!("Successfully patched {}/{}\n\n{output}", params.kind, params.name))
    }

    /// Deletes a single resource.
    pub(super) async fn handle_delete_resource(
        &self,
        request: &RequestContext,
        payload: Value,
    ) -> Result<String, ToolError> {
        let tool = ToolName::DeleteResource;
        let params: DeleteResourceParams = decode(payload)?;
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

        let options =
            delete_params(params.grace_period_seconds, Some(params.propagation_policy.as_str()))?;
        let resource = api_resource(&params.group, &params.version, &params.kind);
        let api = dynamic_api(&bundle, &resource, &params.namespace);
        api.delete(&params.name, &options).await.map_err(upstream)?;

        Ok(format!(
            "Successfully deleted {}/{} in namespace {}",
            params.kind, params.name, params.namespace
        ))
    }

    /// Deletes a collection of resources matching selectors.
    ///
    /// At least one selector is required; an unselected collection delete is
    /// a fatal input error rather than a policy decision.
    pub(super) async fn handle_delete_resources(
        &self,
        request: &RequestContext,
        payload: Value,
    ) -> Result<String, ToolError> {
        let tool = ToolName::DeleteResources;
        let params: DeleteResourcesParams = decode(payload)?;
        if params.label_selector.is_empty() && params.field_selector.is_empty() {
            return Err(ToolError::InvalidParams(
                "at least one selector (label_selector or field_selector) is required".to_string(),
            ));
        }
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

        let options = delete_params(params.grace_period_seconds, None)?;
        let selectors = list_params(&params.label_selector, &params.field_selector);
        let resource = api_resource(&params.group, &params.version, &params.kind);
        let api = dynamic_api(&bundle, &resource, &params.namespace);
        api.delete_collection(&options, &selectors).await.map_err(upstream)?;

        Ok(format!(
            "Successfully deleted {} resources matching selector in namespace {}",
            params.kind, params.namespace
        ))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Extracts group, version, and kind from a parsed manifest.
fn manifest_gvk(object: &DynamicObject) -> Result<(String, String, String), ToolError> {
    let types = object
        .types
        .as_ref()
        .ok_or_else(|| ToolError::InvalidParams("manifest requires apiVersion and kind".to_string()))?;
    let (group, version) = match types.api_version.split_once('/') {
        Some((group, version)) => (group.to_string(), version.to_string()),
        None => (String::new(), types.api_version.clone()),
    };
    Ok((group, version, types.kind.clone()))
}

/// Parses the patch body for the requested patch type.
fn parse_patch(patch_type: &str, value: Value) -> Result<Patch<Value>, ToolError> {
    match patch_type.to_ascii_lowercase().as_str() {
        "strategic" => Ok(Patch::Strategic(value)),
        "merge" => Ok(Patch::Merge(value)),
        "json" => {
            let operations: json_patch::Patch = serde_json::from_value(value)
                .map_err(|err| ToolError::InvalidParams(format!("invalid json patch: {err}")))?;
            Ok(Patch::Json(operations))
        }
        other => Err(ToolError::InvalidParams(format!("invalid patch type: {other}"))),
    }
}

/// Builds delete options from the grace period and propagation policy.
fn delete_params(
    grace_period_seconds: Option<u32>,
    propagation_policy: Option<&str>,
) -> Result<DeleteParams, ToolError> {
    let mut options = DeleteParams::default();
    options.grace_period_seconds = grace_period_seconds;
    if let Some(policy) = propagation_policy {
        options.propagation_policy = match policy {
            "" => None,
            "Orphan" => Some(PropagationPolicy::Orphan),
            "Background" => Some(PropagationPolicy::Background),
            "Foreground" => Some(PropagationPolicy::Foreground),
            other => {
                return Err(ToolError::InvalidParams(format!(
                    "invalid propagation policy: {other}"
                )));
            }
        };
    }
    Ok(options)
}
