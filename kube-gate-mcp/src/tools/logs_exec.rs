// kube-gate-mcp/src/tools/logs_exec.rs
// ============================================================================
// Module: Logs and Exec Tools
// Description: Handlers for pod log retrieval and command execution.
// Purpose: Serve debug access with the exec wall-clock bound enforced.
// Dependencies: kube, tokio
// ============================================================================

use std::time::Duration;

use k8s_openapi::api::core::v1::Pod;
use kube::api::Api;
use kube::api::AttachParams;
use kube::api::LogParams;
use kube_gate_core::ResourceRef;
use kube_gate_core::ToolName;
use serde::Deserialize;
use serde_json::Value;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt as _;

use crate::tools::decode;
use crate::tools::upstream;
use crate::tools::RequestContext;
use crate::tools::ToolError;
use crate::tools::ToolRouter;

/// Wall-clock bound on a single exec invocation.
const EXEC_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// SECTION: Parameters
// ============================================================================

#[derive(Debug, Deserialize)]
struct GetLogsParams {
    #[serde(default)]
    context: String,
    name: String,
    #[serde(default)]
    namespace: String,
    #[serde(default)]
    container: String,
    #[serde(default)]
    previous: bool,
    #[serde(default)]
    since_seconds: Option<i64>,
    #[serde(default)]
    tail_lines: Option<i64>,
    #[serde(default)]
    timestamps: bool,
}

#[derive(Debug, Deserialize)]
struct ExecCommandParams {
    #[serde(default)]
    context: String,
    name: String,
    #[serde(default)]
    namespace: String,
    #[serde(default)]
    container: String,
    #[serde(default)]
    command: Vec<String>,
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

impl ToolRouter {
    /// Fetches container logs from a pod.
    pub(super) async fn handle_get_logs(
        &self,
        request: &RequestContext,
        payload: Value,
    ) -> Result<String, ToolError> {
        let tool = ToolName::GetLogs;
        let params: GetLogsParams = decode(payload)?;
        let namespace = default_namespace(&params.namespace);
        let context = self.context_param(&params.context);
        self.authorize(
            request,
            tool,
            &context,
            &namespace,
            ResourceRef::new("", "v1", "Pod", &params.name),
        )?;
        self.ensure_namespace_allowed(&context, &namespace)?;
        let bundle = self.bundle(&context)?;

        let options = LogParams {
            container: (!params.container.is_empty()).then(|| params.container.clone()),
            previous: params.previous,
            since_seconds: params.since_seconds.filter(|seconds| *seconds > 0),
            tail_lines: params.tail_lines.filter(|lines| *lines > 0),
            timestamps: params.timestamps,
            ..LogParams::default()
        };
        let pods: Api<Pod> = Api::namespaced(bundle.client(), &namespace);
        pods.logs(&params.name, &options).await.map_err(upstream)
    }

    /// Executes a non-interactive command in a container.
    ///
    /// A non-zero exit is a successful tool call whose payload describes the
    /// failure, so callers can distinguish command failure from transport
    /// failure. The 30-second deadline composes with the request's own
    /// cancellation.
    pub(super) async fn handle_exec_command(
        &self,
        request: &RequestContext,
        payload: Value,
    ) -> Result<String, ToolError> {
        let tool = ToolName::ExecCommand;
        let params: ExecCommandParams = decode(payload)?;
        if params.command.is_empty() {
            return Err(ToolError::InvalidParams("command is required".to_string()));
        }
        let namespace = default_namespace(&params.namespace);
        let context = self.context_param(&params.context);
        self.authorize(
            request,
            tool,
            &context,
            &namespace,
            ResourceRef::new("", "v1", "Pod", &params.name),
        )?;
        self.ensure_namespace_allowed(&context, &namespace)?;
        let bundle = self.bundle(&context)?;

        let mut attach = AttachParams::default().stdin(false).stdout(true).stderr(true).tty(false);
        if !params.container.is_empty() {
            attach = attach.container(params.container.clone());
        }

        let pods: Api<Pod> = Api::namespaced(bundle.client(), &namespace);
        let exec = async {
            let mut attached =
                pods.exec(&params.name, params.command.clone(), &attach).await.map_err(upstream)?;
            let stdout_stream = attached.stdout();
            let stderr_stream = attached.stderr();
            let (stdout, stderr) =
                tokio::join!(read_stream(stdout_stream), read_stream(stderr_stream));
            let status = match attached.take_status() {
                Some(status) => status.await,
                None => None,
            };
            let _ = attached.join().await;
            Ok::<_, ToolError>((stdout, stderr, status))
        };

        let Ok(result) = tokio::time::timeout(EXEC_TIMEOUT, exec).await else {
            return Ok(format!(
                "Command exited with error: deadline of {}s exceeded",
                EXEC_TIMEOUT.as_secs()
            ));
        };
        let (stdout, stderr, status) = result?;

        let mut output = stdout;
        if !stderr.is_empty() {
            output.push_str("\n--- stderr ---\n");
            output.push_str(&stderr);
        }

        let failed = status
            .as_ref()
            .and_then(|status| status.status.as_deref())
            .is_some_and(|outcome| outcome != "Success");
        if failed {
            let message = status
                .and_then(|status| status.message)
                .unwrap_or_else(|| "command failed".to_string());
            return Ok(format!("Command exited with error: {message}\n\nOutput:\n{output}"));
        }
        Ok(output)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Pod-scoped tools fall back to the `default` namespace.
fn default_namespace(namespace: &str) -> String {
    if namespace.is_empty() {
        "default".to_string()
    } else {
        namespace.to_string()
    }
}

/// Drains an attached stream to a string; absent streams read as empty.
async fn read_stream(stream: Option<impl AsyncRead + Unpin>) -> String {
    let Some(mut stream) = stream else {
        return String::new();
    };
    let mut buffer = Vec::new();
    if stream.read_to_end(&mut buffer).await.is_err() {
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
