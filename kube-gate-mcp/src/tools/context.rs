// kube-gate-mcp/src/tools/context.rs
// ============================================================================
// Module: Context Tools
// Description: Handlers for context inspection and switching.
// Purpose: Expose the context registry without touching the cluster.
// Dependencies: kube-gate-clusters, kube-gate-core
// ============================================================================

use kube_gate_core::ResourceRef;
use kube_gate_core::ToolName;
use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use serde_json::Value;

use crate::tools::decode;
use crate::tools::to_yaml;
use crate::tools::RequestContext;
use crate::tools::ToolError;
use crate::tools::ToolRouter;

// ============================================================================
// SECTION: Parameters
// ============================================================================

#[derive(Debug, Deserialize)]
struct ListContextsParams {
    #[serde(default)]
    filter_expressions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SwitchContextParams {
    context_name: String,
}

/// Summary row for one context.
#[derive(Debug, Serialize)]
struct ContextInfo {
    name: String,
    description: String,
    current: bool,
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

impl ToolRouter {
    /// Reports the active context.
    pub(super) fn handle_get_current_context(
        &self,
        request: &RequestContext,
        _payload: Value,
    ) -> Result<String, ToolError> {
        self.authorize(request, ToolName::GetCurrentContext, "", "", ResourceRef::default())?;

        let active = self.clusters().active_context();
        let description = self
            .clusters()
            .context_config(&active)
            .map(|entry| entry.description)
            .unwrap_or_default();
        to_yaml(&json!({"name": active, "description": description}))
    }

    /// Lists all registered contexts.
    pub(super) fn handle_list_contexts(
        &self,
        request: &RequestContext,
        payload: Value,
    ) -> Result<String, ToolError> {
        let tool = ToolName::ListContexts;
        let params: ListContextsParams = decode(payload)?;
        self.authorize(request, tool, "", "", ResourceRef::default())?;

        let active = self.clusters().active_context();
        let rows: Vec<ContextInfo> = self
            .clusters()
            .contexts()
            .into_iter()
            .map(|name| {
                let description = self
                    .clusters()
                    .context_config(&name)
                    .map(|entry| entry.description)
                    .unwrap_or_default();
                ContextInfo {
                    current: name == active,
                    name,
                    description,
                }
            })
            .collect();

        let output = to_yaml(&rows)?;
        Self::apply_filters(tool, output, &params.filter_expressions)
    }

    /// Switches the active context.
    ///
    /// Authorization targets the destination context, so policies gate both
    /// the tool and the context being switched to.
    pub(super) fn handle_switch_context(
        &self,
        request: &RequestContext,
        payload: Value,
    ) -> Result<String, ToolError> {
        let params: SwitchContextParams = decode(payload)?;
        self.authorize(
            request,
            ToolName::SwitchContext,
            &params.context_name,
            "",
            ResourceRef::default(),
        )?;

        let previous = self.clusters().active_context();
        self.clusters().set_active_context(&params.context_name)?;
        let description = self
            .clusters()
            .context_config(&params.context_name)
            .map(|entry| entry.description)
            .unwrap_or_default();
        Ok(format!(
            "Switched context from {previous} to {}\nDescription: {description}",
            params.context_name
        ))
    }
}
