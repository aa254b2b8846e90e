// kube-gate-mcp/src/catalog.rs
// ============================================================================
// Module: Tool Catalog
// Description: Tool definitions advertised by the MCP server.
// Purpose: Publish the fixed tool catalog with input schemas.
// Dependencies: kube-gate-core, serde_json
// ============================================================================

//! ## Overview
//! The catalog is the external contract surface of the bridge: one definition
//! per tool with a JSON schema describing its parameters. Schemas are
//! published for clients; parameter enforcement happens in the dispatcher
//! when payloads are decoded.

use kube_gate_core::ToolName;
use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use serde_json::Map;
use serde_json::Value;

// ============================================================================
// SECTION: Definition Type
// ============================================================================

/// Tool definition used by MCP tool listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// MCP tool name.
    pub name: String,
    /// Tool description for clients.
    pub description: String,
    /// JSON schema for tool input.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

// ============================================================================
// SECTION: Schema Helpers
// ============================================================================

fn string(description: &str) -> Value {
    json!({"type": "string", "description": description})
}

fn boolean(description: &str) -> Value {
    json!({"type": "boolean", "description": description})
}

fn integer(description: &str) -> Value {
    json!({"type": "integer", "description": description})
}

fn string_array(description: &str) -> Value {
    json!({"type": "array", "items": {"type": "string"}, "description": description})
}

fn filter_expressions() -> (&'static str, Value) {
    (
        "filter_expressions",
        string_array(
            "Ordered JSONPath expressions applied to the YAML output; each \
             expression consumes the previous result",
        ),
    )
}

fn context_param() -> (&'static str, Value) {
    ("context", string("Kubernetes context to use (defaults to the active context)"))
}

fn schema(properties: Vec<(&str, Value)>, required: &[&str]) -> Value {
    let mut map = Map::new();
    for (name, property) in properties {
        map.insert(name.to_string(), property);
    }
    json!({
        "type": "object",
        "properties": Value::Object(map),
        "required": required,
    })
}

fn definition(tool: ToolName, description: &str, input_schema: Value) -> ToolDefinition {
    ToolDefinition {
        name: tool.as_str().to_string(),
        description: description.to_string(),
        input_schema,
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Returns the full tool catalog in canonical order.
#[must_use]
pub fn tool_definitions() -> Vec<ToolDefinition> {
    ToolName::all().iter().map(|tool| define(*tool)).collect()
}

/// Builds the definition for a single tool.
#[allow(clippy::too_many_lines, reason = "One entry per tool in the catalog.")]
fn define(tool: ToolName) -> ToolDefinition {
    match tool {
        ToolName::GetResource => definition(
            tool,
            "Gets a specific Kubernetes resource by name",
            schema(
                vec![
                    context_param(),
                    ("group", string("API group (e.g. 'apps', 'batch'; empty for core)")),
                    ("version", string("API version (e.g. 'v1', 'v1beta1')")),
                    ("kind", string("Resource kind (e.g. 'Pod', 'Deployment')")),
                    ("name", string("Resource name")),
                    ("namespace", string("Namespace (omit for cluster-scoped resources)")),
                    filter_expressions(),
                ],
                &["version", "kind", "name"],
            ),
        ),
        ToolName::ListResources => definition(
            tool,
            "Lists Kubernetes resources with optional selectors",
            schema(
                vec![
                    context_param(),
                    ("group", string("API group")),
                    ("version", string("API version")),
                    ("kind", string("Resource kind")),
                    ("namespace", string("Namespace (empty for all namespaces)")),
                    ("label_selector", string("Label selector (e.g. 'app=nginx,env!=prod')")),
                    ("field_selector", string("Field selector (e.g. 'metadata.name=foo')")),
                    filter_expressions(),
                ],
                &["version", "kind"],
            ),
        ),
        ToolName::DescribeResource => definition(
            tool,
            "Gets detailed information about a resource including related events",
            schema(
                vec![
                    context_param(),
                    ("group", string("API group")),
                    ("version", string("API version")),
                    ("kind", string("Resource kind")),
                    ("name", string("Resource name")),
                    ("namespace", string("Namespace")),
                    filter_expressions(),
                ],
                &["version", "kind", "name"],
            ),
        ),
        ToolName::ApplyManifest => definition(
            tool,
            "Applies a YAML or JSON manifest (create or update)",
            schema(
                vec![
                    context_param(),
                    ("manifest", string("YAML or JSON manifest to apply")),
                    ("namespace", string("Namespace override (optional)")),
                ],
                &["manifest"],
            ),
        ),
        ToolName::PatchResource => definition(
            tool,
            "Patches an existing Kubernetes resource",
            schema(
                vec![
                    context_param(),
                    ("group", string("API group")),
                    ("version", string("API version")),
                    ("kind", string("Resource kind")),
                    ("name", string("Resource name")),
                    ("namespace", string("Namespace")),
                    ("patch_type", string("Patch type: 'strategic', 'merge', or 'json'")),
                    ("patch", string("Patch content (YAML or JSON)")),
                ],
                &["version", "kind", "name", "patch_type", "patch"],
            ),
        ),
        ToolName::DeleteResource => definition(
            tool,
            "Deletes a Kubernetes resource",
            schema(
                vec![
                    context_param(),
                    ("group", string("API group")),
                    ("version", string("API version")),
                    ("kind", string("Resource kind")),
                    ("name", string("Resource name")),
                    ("namespace", string("Namespace")),
                    ("grace_period_seconds", integer("Grace period in seconds")),
                    (
                        "propagation_policy",
                        string("Deletion propagation policy: 'Orphan', 'Background', 'Foreground'"),
                    ),
                ],
                &["version", "kind", "name"],
            ),
        ),
        ToolName::DeleteResources => definition(
            tool,
            "Deletes multiple Kubernetes resources matching selectors",
            schema(
                vec![
                    context_param(),
                    ("group", string("API group")),
                    ("version", string("API version")),
                    ("kind", string("Resource kind")),
                    ("namespace", string("Namespace")),
                    ("label_selector", string("Label selector")),
                    ("field_selector", string("Field selector")),
                    ("grace_period_seconds", integer("Grace period in seconds")),
                ],
                &["version", "kind"],
            ),
        ),
        ToolName::ScaleResource => definition(
            tool,
            "Scales a Deployment, ReplicaSet, or StatefulSet",
            schema(
                vec![
                    context_param(),
                    ("group", string("API group (default: apps)")),
                    ("version", string("API version")),
                    ("kind", string("Resource kind")),
                    ("name", string("Resource name")),
                    ("namespace", string("Namespace")),
                    ("replicas", integer("Desired number of replicas")),
                ],
                &["version", "kind", "name", "replicas"],
            ),
        ),
        ToolName::GetRolloutStatus => definition(
            tool,
            "Gets the status of a rollout",
            schema(
                vec![
                    context_param(),
                    ("group", string("API group (default: apps)")),
                    ("version", string("API version")),
                    ("kind", string("Resource kind (Deployment, DaemonSet, StatefulSet)")),
                    ("name", string("Resource name")),
                    ("namespace", string("Namespace")),
                ],
                &["version", "kind", "name"],
            ),
        ),
        ToolName::RestartRollout => definition(
            tool,
            "Restarts a rollout by updating the restart annotation",
            schema(
                vec![
                    context_param(),
                    ("group", string("API group (default: apps)")),
                    ("version", string("API version")),
                    ("kind", string("Resource kind (Deployment, DaemonSet, StatefulSet)")),
                    ("name", string("Resource name")),
                    ("namespace", string("Namespace")),
                ],
                &["version", "kind", "name"],
            ),
        ),
        ToolName::UndoRollout => definition(
            tool,
            "Reverts a rollout to a previous revision",
            schema(
                vec![
                    context_param(),
                    ("group", string("API group (default: apps)")),
                    ("version", string("API version")),
                    ("kind", string("Resource kind (only Deployment is supported)")),
                    ("name", string("Resource name")),
                    ("namespace", string("Namespace")),
                    ("to_revision", integer("Revision to roll back to (default: previous)")),
                ],
                &["version", "kind", "name"],
            ),
        ),
        ToolName::GetLogs => definition(
            tool,
            "Gets logs from a pod",
            schema(
                vec![
                    context_param(),
                    ("name", string("Pod name")),
                    ("namespace", string("Namespace (default: 'default')")),
                    ("container", string("Container name (required for multi-container pods)")),
                    ("previous", boolean("Read logs from the previous container instance")),
                    ("since_seconds", integer("Only return logs newer than this many seconds")),
                    ("tail_lines", integer("Number of lines from the end of the logs")),
                    ("timestamps", boolean("Include timestamps in the output")),
                ],
                &["name"],
            ),
        ),
        ToolName::ExecCommand => definition(
            tool,
            "Executes a non-interactive command in a container",
            schema(
                vec![
                    context_param(),
                    ("name", string("Pod name")),
                    ("namespace", string("Namespace (default: 'default')")),
                    ("container", string("Container name")),
                    ("command", string_array("Command to execute as an array of strings")),
                ],
                &["name", "command"],
            ),
        ),
        ToolName::ListApiResources => definition(
            tool,
            "Lists available API resources in the cluster",
            schema(
                vec![
                    context_param(),
                    ("api_group", string("Filter by API group")),
                    ("namespaced", boolean("Filter by namespaced resources")),
                    filter_expressions(),
                ],
                &[],
            ),
        ),
        ToolName::ListApiVersions => definition(
            tool,
            "Lists available API versions",
            schema(vec![context_param(), filter_expressions()], &[]),
        ),
        ToolName::GetClusterInfo => definition(
            tool,
            "Gets basic cluster information",
            schema(vec![context_param()], &[]),
        ),
        ToolName::ListNamespaces => definition(
            tool,
            "Lists namespaces with their access gating outcome",
            schema(
                vec![
                    context_param(),
                    ("label_selector", string("Label selector")),
                    filter_expressions(),
                ],
                &[],
            ),
        ),
        ToolName::ListEvents => definition(
            tool,
            "Lists cluster or namespace events",
            schema(
                vec![
                    context_param(),
                    ("namespace", string("Namespace (empty for all namespaces)")),
                    ("field_selector", string("Field selector (e.g. 'involvedObject.name=my-pod')")),
                    ("types", string_array("Event types to keep: 'Normal', 'Warning'")),
                    filter_expressions(),
                ],
                &[],
            ),
        ),
        ToolName::GetCurrentContext => definition(
            tool,
            "Gets the active Kubernetes context",
            schema(Vec::new(), &[]),
        ),
        ToolName::ListContexts => definition(
            tool,
            "Lists available Kubernetes contexts",
            schema(vec![filter_expressions()], &[]),
        ),
        ToolName::SwitchContext => definition(
            tool,
            "Switches the active Kubernetes context",
            schema(
                vec![("context_name", string("Name of the context to switch to"))],
                &["context_name"],
            ),
        ),
        ToolName::CheckPermission => definition(
            tool,
            "Checks whether an action is allowed (SelfSubjectAccessReview)",
            schema(
                vec![
                    context_param(),
                    ("verb", string("Verb to check: get, list, create, update, delete, ...")),
                    ("group", string("API group")),
                    ("resource", string("Resource type")),
                    ("name", string("Resource name (optional)")),
                    ("namespace", string("Namespace (optional)")),
                ],
                &["verb", "resource"],
            ),
        ),
        ToolName::GetPodMetrics => definition(
            tool,
            "Gets CPU and memory usage for pods (requires a metrics backend)",
            schema(
                vec![
                    context_param(),
                    ("namespace", string("Namespace (optional)")),
                    ("name", string("Pod name (optional; lists all when empty)")),
                    ("label_selector", string("Label selector")),
                    filter_expressions(),
                ],
                &[],
            ),
        ),
        ToolName::GetNodeMetrics => definition(
            tool,
            "Gets CPU and memory usage for nodes (requires a metrics backend)",
            schema(
                vec![
                    context_param(),
                    ("name", string("Node name (optional; lists all when empty)")),
                    ("label_selector", string("Label selector")),
                    filter_expressions(),
                ],
                &[],
            ),
        ),
        ToolName::DiffManifest => definition(
            tool,
            "Compares a manifest with the current cluster state",
            schema(
                vec![
                    context_param(),
                    ("manifest", string("YAML or JSON manifest to compare")),
                    ("namespace", string("Namespace override (optional)")),
                ],
                &["manifest"],
            ),
        ),
    }
}
