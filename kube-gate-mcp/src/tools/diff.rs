// kube-gate-mcp/src/tools/diff.rs
// ============================================================================
// Module: Diff Tool
// Description: Handler for manifest-versus-live structural comparison.
// Purpose: Report field-level drift without server-managed noise.
// Dependencies: kube, kube-gate-core
// ============================================================================

use kube::api::DynamicObject;
use kube_gate_core::ResourceRef;
use kube_gate_core::ToolName;
use serde::Deserialize;
use serde_json::Map;
use serde_json::Value;

use crate::tools::api_resource;
use crate::tools::decode;
use crate::tools::dynamic_api;
use crate::tools::to_yaml;
use crate::tools::upstream;
use crate::tools::RequestContext;
use crate::tools::ToolError;
use crate::tools::ToolRouter;

/// Server-managed paths omitted from the comparison.
const SKIPPED_PATHS: [&str; 7] = [
    "metadata.resourceVersion",
    "metadata.uid",
    "metadata.creationTimestamp",
    "metadata.generation",
    "metadata.managedFields",
    "metadata.selfLink",
    "status",
];

// ============================================================================
// SECTION: Parameters
// ============================================================================

#[derive(Debug, Deserialize)]
struct DiffManifestParams {
    #[serde(default)]
    context: String,
    manifest: String,
    #[serde(default)]
    namespace: String,
}

// ============================================================================
// SECTION: Handler
// ============================================================================

impl ToolRouter {
    /// Compares a manifest against the live object field by field.
    pub(super) async fn handle_diff_manifest(
        &self,
        request: &RequestContext,
        payload: Value,
    ) -> Result<String, ToolError> {
        let tool = ToolName::DiffManifest;
        let params: DiffManifestParams = decode(payload)?;
        let context = self.context_param(&params.context);

        let desired: Value = serde_yaml::from_str(&params.manifest)
            .map_err(|err| ToolError::InvalidParams(format!("failed to parse manifest: {err}")))?;
        let object: DynamicObject = serde_json::from_value(desired.clone())
            .map_err(|err| ToolError::InvalidParams(format!("failed to parse manifest: {err}")))?;
        let types = object.types.as_ref().ok_or_else(|| {
            ToolError::InvalidParams("manifest requires apiVersion and kind".to_string())
        })?;
        let (group, version) = match types.api_version.split_once('/') {
            Some((group, version)) => (group.to_string(), version.to_string()),
            None => (String::new(), types.api_version.clone()),
        };
        let kind = types.kind.clone();
        let name = object.metadata.name.clone().unwrap_or_default();
        let namespace = if params.namespace.is_empty() {
            object.metadata.namespace.clone().unwrap_or_default()
        } else {
            params.namespace.clone()
        };

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
        let live = match api.get(&name).await {
            Ok(live) => live,
            Err(kube::Error::Api(response)) if response.code == 404 => {
                return Ok(format!(
                    "Resource {kind}/{name} does not exist in namespace {namespace}\nThis \
                     manifest would CREATE a new resource."
                ));
            }
            Err(err) => return Err(upstream(err)),
        };

        let current = serde_json::to_value(&live)
            .map_err(|err| ToolError::Serialization(err.to_string()))?;
        let mut differences = Vec::new();
        if let (Some(current_map), Some(desired_map)) =
            (current.as_object(), desired.as_object())
        {
            compare_objects(current_map, desired_map, "", &mut differences);
        }

        if differences.is_empty() {
            return Ok(format!("No changes detected for {kind}/{name} in namespace {namespace}"));
        }

        let mut output = format!("Diff for {kind}/{name} in namespace {namespace}:\n\nChanges:\n");
        for difference in &differences {
            output.push_str(&format!("  {difference}\n"));
        }
        output.push_str("\n--- Current ---\n");
        output.push_str(&to_yaml(&current)?);
        output.push_str("\n--- Desired ---\n");
        output.push_str(&to_yaml(&desired)?);
        Ok(output)
    }
}

// ============================================================================
// SECTION: Comparison
// ============================================================================

/// Recursively compares two object maps, recording field-level differences.
fn compare_objects(
    current: &Map<String, Value>,
    desired: &Map<String, Value>,
    path: &str,
    differences: &mut Vec<String>,
) {
    for (key, desired_value) in desired {
        let field_path = join_path(path, key);
        if SKIPPED_PATHS.contains(&field_path.as_str()) {
            continue;
        }
        let Some(current_value) = current.get(key) else {
            differences.push(format!("+ {field_path}: {}", summarize(desired_value)));
            continue;
        };
        match (current_value, desired_value) {
            (Value::Object(current_map), Value::Object(desired_map)) => {
                compare_objects(current_map, desired_map, &field_path, differences);
            }
            (Value::Array(current_items), Value::Array(desired_items)) => {
                if current_items != desired_items {
                    differences.push(format!("~ {field_path}: array changed"));
                }
            }
            (Value::Object(_) | Value::Array(_), _) | (_, Value::Object(_) | Value::Array(_)) => {
                differences.push(format!("~ {field_path}: type changed"));
            }
            (current_value, desired_value) => {
                if current_value != desired_value {
                    differences.push(format!(
                        "~ {field_path}: {} -> {}",
                        summarize(current_value),
                        summarize(desired_value)
                    ));
                }
            }
        }
    }

    for (key, current_value) in current {
        let field_path = join_path(path, key);
        if SKIPPED_PATHS.contains(&field_path.as_str()) {
            continue;
        }
        if !desired.contains_key(key) {
            differences.push(format!("- {field_path}: {}", summarize(current_value)));
        }
    }
}

/// Joins a parent path and key with a dot.
fn join_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

/// Renders a compact, single-line summary of a value.
fn summarize(value: &Value) -> String {
    match value {
        Value::String(text) => {
            if text.len() > 50 {
                format!("{:?}...", &text[..50])
            } else {
                format!("{text:?}")
            }
        }
        Value::Object(map) => format!("{{...{} keys}}", map.len()),
        Value::Array(items) => format!("[...{} items]", items.len()),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::compare_objects;
    use super::summarize;

    fn diff(current: serde_json::Value, desired: serde_json::Value) -> Vec<String> {
        let mut differences = Vec::new();
        compare_objects(
            current.as_object().expect("current is an object"),
            desired.as_object().expect("desired is an object"),
            "",
            &mut differences,
        );
        differences
    }

    #[test]
    fn reports_changed_added_and_removed_fields() {
        let current = json!({"spec": {"replicas": 2, "paused": false}});
        let desired = json!({"spec": {"replicas": 3, "strategy": "RollingUpdate"}});
        let differences = diff(current, desired);
        assert!(differences.iter().any(|line| line.contains("~ spec.replicas: 2 -> 3")));
        assert!(differences.iter().any(|line| line.starts_with("+ spec.strategy")));
        assert!(differences.iter().any(|line| line.starts_with("- spec.paused")));
    }

    #[test]
    fn skips_server_managed_metadata_and_status() {
        let current = json!({
            "metadata": {"name": "web", "resourceVersion": "100", "uid": "a"},
            "status": {"readyReplicas": 2},
        });
        let desired = json!({
            "metadata": {"name": "web", "resourceVersion": "7"},
            "status": {"readyReplicas": 9},
        });
        assert!(diff(current, desired).is_empty());
    }

    #[test]
    fn equal_documents_produce_no_differences() {
        let document = json!({"spec": {"replicas": 1, "selector": {"app": "web"}}});
        assert!(diff(document.clone(), document).is_empty());
    }

    #[test]
    fn array_changes_are_reported_without_recursion() {
        let current = json!({"spec": {"ports": [80]}});
        let desired = json!({"spec": {"ports": [80, 443]}});
        let differences = diff(current, desired);
        assert_eq!(differences, vec!["~ spec.ports: array changed".to_string()]);
    }

    #[test]
    fn long_strings_are_truncated_in_summaries() {
        let long = "x".repeat(80);
        let summary = summarize(&serde_json::Value::String(long));
        assert!(summary.ends_with("..."));
    }
}
