// kube-gate-mcp/src/tools/scale_rollout.rs
// ============================================================================
// Module: Scale and Rollout Tools
// Description: Handlers for scaling and rollout lifecycle operations.
// Purpose: Compose workload mutations out of structured patches.
// Dependencies: kube, kube-gate-core
// ============================================================================

use kube::api::Patch;
use kube::api::PatchParams;
use kube_gate_core::ResourceRef;
use kube_gate_core::ToolName;
use serde::Deserialize;
use serde_json::json;
use serde_json::Value;

use crate::tools::api_resource;
use crate::tools::decode;
use crate::tools::dynamic_api;
use crate::tools::upstream;
use crate::tools::RequestContext;
use crate::tools::ToolError;
use crate::tools::ToolRouter;

/// Annotation recording the revision of a workload's replica set.
const REVISION_ANNOTATION: &str = "deployment.kubernetes.io/revision";
/// Annotation stamped on the pod template to trigger a restart.
const RESTART_ANNOTATION: &str = "kubectl.kubernetes.io/restartedAt";

// ============================================================================
// SECTION: Parameters
// ============================================================================

#[derive(Debug, Deserialize)]
struct WorkloadParams {
    #[serde(default)]
    context: String,
    #[serde(default)]
    group: String,
    version: String,
    kind: String,
    name: String,
    #[serde(default)]
    namespace: String,
}

impl WorkloadParams {
    /// Workload tools default to the `apps` group when none is given.
    fn group(&self) -> &str {
        if self.group.is_empty() {
            "apps"
        } else {
            &self.group
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScaleResourceParams {
    #[serde(flatten)]
    workload: WorkloadParams,
    replicas: i32,
}

#[derive(Debug, Deserialize)]
struct UndoRolloutParams {
    #[serde(flatten)]
    workload: WorkloadParams,
    #[serde(default)]
    to_revision: i64,
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

impl ToolRouter {
    /// Scales a workload by patching `spec.replicas`.
    pub(super) async fn handle_scale_resource(
        &self,
        request: &RequestContext,
        payload: Value,
    ) -> Result<String, ToolError> {
        let tool = ToolName::ScaleResource;
        let params: ScaleResourceParams = decode(payload)?;
        let workload = &params.workload;
        let group = workload.group().to_string();
        let context = self.context_param(&workload.context);
        self.authorize(
            request,
            tool,
            &context,
            &workload.namespace,
            ResourceRef::new(&group, &workload.version, &workload.kind, &workload.name),
        )?;
        self.ensure_namespace_allowed(&context, &workload.namespace)?;
        let bundle = self.bundle(&context)?;

        let patch = json!({"spec": {"replicas": params.replicas}});
        let resource = api_resource(&group, &workload.version, &workload.kind);
        let api = dynamic_api(&bundle, &resource, &workload.namespace);
        let patched = api
            .patch(&workload.name, &PatchParams::default(), &Patch::Merge(patch))
            .await
            .map_err(upstream)?;

        let output = crate::tools::to_yaml(&patched)?;
        Ok(format!(
            "Successfully scaled {}/{} to {} replicas\n\n{output}",
            workload.kind, workload.name, params.replicas
        ))
    }

    /// Reports the rollout status of a workload as text.
    pub(super) async fn handle_get_rollout_status(
        &self,
        request: &RequestContext,
        payload: Value,
    ) -> Result<String, ToolError> {
        let tool = ToolName::GetRolloutStatus;
        let params: WorkloadParams = decode(payload)?;
        let group = params.group().to_string();
        let context = self.context_param(&params.context);
        self.authorize(
            request,
            tool,
            &context,
            &params.namespace,
            ResourceRef::new(&group, &params.version, &params.kind, &params.name),
        )?;
        self.ensure_namespace_allowed(&context, &params.namespace)?;
        let bundle = self.bundle(&context)?;

        let resource = api_resource(&group, &params.version, &params.kind);
        let api = dynamic_api(&bundle, &resource, &params.namespace);
        let object = api.get(&params.name).await.map_err(upstream)?;
        let value = serde_json::to_value(&object)
            .map_err(|err| ToolError::Serialization(err.to_string()))?;

        Ok(rollout_status_text(&params.kind, &params.name, &value))
    }

    /// Restarts a rollout by stamping the restart annotation.
    pub(super) async fn handle_restart_rollout(
        &self,
        request: &RequestContext,
        payload: Value,
    ) -> Result<String, ToolError> {
        let tool = ToolName::RestartRollout;
        let params: WorkloadParams = decode(payload)?;
        let group = params.group().to_string();
        let context = self.context_param(&params.context);
        self.authorize(
            request,
            tool,
            &context,
            &params.namespace,
            ResourceRef::new(&group, &params.version, &params.kind, &params.name),
        )?;
        self.ensure_namespace_allowed(&context, &params.namespace)?;
        let bundle = self.bundle(&context)?;

        let restarted_at = k8s_openapi::chrono::Utc::now().to_rfc3339();
        let patch = json!({
            "spec": {
                "template": {
                    "metadata": {
                        "annotations": {RESTART_ANNOTATION: restarted_at}
                    }
                }
            }
        });
        let resource = api_resource(&group, &params.version, &params.kind);
        let api = dynamic_api(&bundle, &resource, &params.namespace);
        api.patch(&params.name, &PatchParams::default(), &Patch::Merge(patch))
            .await
            .map_err(upstream)?;

        Ok(format!("Successfully triggered restart for {}/{}", params.kind, params.name))
    }

    /// Reverts a Deployment to a prior revision's pod template.
    ///
    /// Locates the owned replica set whose revision annotation matches the
    /// requested revision (or the first recorded candidate when none is
    /// given) and merge-patches its template onto the workload.
    pub(super) async fn handle_undo_rollout(
        &self,
        request: &RequestContext,
        payload: Value,
    ) -> Result<String, ToolError> {
        let tool = ToolName::UndoRollout;
        let params: UndoRolloutParams = decode(payload)?;
        let workload = &params.workload;
        let group = workload.group().to_string();
        let context = self.context_param(&workload.context);
        self.authorize(
            request,
            tool,
            &context,
            &workload.namespace,
            ResourceRef::new(&group, &workload.version, &workload.kind, &workload.name),
        )?;
        self.ensure_namespace_allowed(&context, &workload.namespace)?;
        let bundle = self.bundle(&context)?;

        if workload.kind != "Deployment" {
            return Err(ToolError::InvalidParams(
                "undo rollout is only supported for Deployments".to_string(),
            ));
        }

        let replica_sets = api_resource("apps", "v1", "ReplicaSet");
        let api = dynamic_api(&bundle, &replica_sets, &workload.namespace);
        let list = api.list(&kube::api::ListParams::default()).await.map_err(upstream)?;

        let mut template: Option<Value> = None;
        for item in &list.items {
            let value = serde_json::to_value(item)
                .map_err(|err| ToolError::Serialization(err.to_string()))?;
            if !owned_by(&value, &workload.name) {
                continue;
            }
            let Some(revision) = value
                .pointer("/metadata/annotations")
                .and_then(|annotations| annotations.get(REVISION_ANNOTATION))
                .and_then(Value::as_str)
            else {
                continue;
            };
            if params.to_revision > 0 {
                if revision == params.to_revision.to_string() {
                    template = value.pointer("/spec/template").cloned();
                    break;
                }
            } else if template.is_none() {
                template = value.pointer("/spec/template").cloned();
            }
        }

        let Some(template) = template else {
            return Err(ToolError::InvalidParams(
                "no suitable revision found for rollback".to_string(),
            ));
        };

        let patch = json!({"spec": {"template": template}});
        let workload_resource = api_resource(&group, &workload.version, &workload.kind);
        let api = dynamic_api(&bundle, &workload_resource, &workload.namespace);
        api.patch(&workload.name, &PatchParams::default(), &Patch::Merge(patch))
            .await
            .map_err(upstream)?;

        Ok(format!("Successfully rolled back {}/{}", workload.kind, workload.name))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns true when the object carries an owner reference to `owner`.
fn owned_by(value: &Value, owner: &str) -> bool {
    value
        .pointer("/metadata/ownerReferences")
        .and_then(Value::as_array)
        .is_some_and(|references| {
            references
                .iter()
                .any(|reference| reference.get("name").and_then(Value::as_str) == Some(owner))
        })
}

/// Renders the rollout status summary for a workload object.
fn rollout_status_text(kind: &str, name: &str, value: &Value) -> String {
    let int = |path: &str| value.pointer(path).and_then(Value::as_i64).unwrap_or(0);
    let desired = int("/spec/replicas");
    let ready = int("/status/readyReplicas");
    let updated = int("/status/updatedReplicas");
    let available = int("/status/availableReplicas");
    let generation = int("/metadata/generation");
    let observed = int("/status/observedGeneration");

    let mut text = format!(
        "Rollout Status for {kind}/{name}:\n  Desired:    {desired}\n  Ready:      {ready}\n  \
         Updated:    {updated}\n  Available:  {available}\n  Generation: {generation} (observed: \
         {observed})\n  Synced:     {}",
        generation == observed
    );

    if let Some(conditions) = value.pointer("/status/conditions").and_then(Value::as_array) {
        if !conditions.is_empty() {
            text.push_str("\n\nConditions:");
            for condition in conditions {
                let get =
                    |key: &str| condition.get(key).and_then(Value::as_str).unwrap_or_default();
                text.push_str(&format!(
                    "\n  - {}: {} ({})",
                    get("type"),
                    get("status"),
                    get("message")
                ));
            }
        }
    }
    text
}
