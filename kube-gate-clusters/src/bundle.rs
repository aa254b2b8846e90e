// kube-gate-clusters/src/bundle.rs
// ============================================================================
// Module: Cluster Client Bundle
// Description: Per-context Kubernetes client construction.
// Purpose: Build typed, dynamic, and metrics access from one credential set.
// Dependencies: kube, kube-gate-config
// ============================================================================

//! ## Overview
//! A bundle is the live client material for one context: a `kube` client
//! serving both typed and dynamic access, the cluster URL for reporting, and
//! an optional metrics handle. Metrics availability is probed once at build
//! time by listing the `metrics.k8s.io` API group; a missing or unreachable
//! metrics backend is recorded as absent rather than failing the bundle.

// ============================================================================
// SECTION: Imports
// ============================================================================

use kube::api::Api;
use kube::api::ApiResource;
use kube::api::DynamicObject;
use kube::config::KubeConfigOptions;
use kube::config::Kubeconfig;
use kube::Client;
use kube::Config;
use kube_gate_config::ContextConfig;

use crate::manager::ClusterError;

/// API group served by the metrics backend.
const METRICS_GROUP: &str = "metrics.k8s.io";
/// API version served by the metrics backend.
const METRICS_VERSION: &str = "v1beta1";

// ============================================================================
// SECTION: Bundle
// ============================================================================

/// Live client material for one context.
#[derive(Clone)]
pub struct ClusterClient {
    client: Client,
    cluster_url: String,
    metrics: Option<MetricsClient>,
}

impl std::fmt::Debug for ClusterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterClient")
            .field("cluster_url", &self.cluster_url)
            .field("metrics", &self.metrics)
            .finish()
    }
}

impl ClusterClient {
    /// Builds a bundle from a context entry.
    ///
    /// A missing credential path with no sub-context selector signals
    /// in-cluster credentials.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError`] when credentials cannot be loaded or the
    /// client cannot be constructed. Metrics absence is not an error.
    pub async fn connect(entry: &ContextConfig) -> Result<Self, ClusterError> {
        let config = if entry.kubeconfig.is_empty() && entry.kubeconfig_context.is_empty() {
            Config::incluster().map_err(|err| ClusterError::Credentials {
                context: entry.name.clone(),
                message: err.to_string(),
            })?
        } else {
            let kubeconfig = Kubeconfig::read_from(&entry.kubeconfig).map_err(|err| {
                ClusterError::Credentials {
                    context: entry.name.clone(),
                    message: err.to_string(),
                }
            })?;
            let options = KubeConfigOptions {
                context: (!entry.kubeconfig_context.is_empty())
                    .then(|| entry.kubeconfig_context.clone()),
                ..KubeConfigOptions::default()
            };
            Config::from_custom_kubeconfig(kubeconfig, &options).await.map_err(|err| {
                ClusterError::Credentials {
                    context: entry.name.clone(),
                    message: err.to_string(),
                }
            })?
        };

        let cluster_url = config.cluster_url.to_string();
        let client = Client::try_from(config).map_err(|err| ClusterError::Client {
            context: entry.name.clone(),
            message: err.to_string(),
        })?;
        let metrics = probe_metrics(&entry.name, &client).await;
        Ok(Self {
            client,
            cluster_url,
            metrics,
        })
    }

    /// Returns a handle to the underlying client.
    #[must_use]
    pub fn client(&self) -> Client {
        self.client.clone()
    }

    /// Returns the cluster URL the bundle was built against.
    #[must_use]
    pub fn cluster_url(&self) -> &str {
        &self.cluster_url
    }

    /// Returns the metrics handle when the backend was present at build time.
    #[must_use]
    pub fn metrics(&self) -> Option<&MetricsClient> {
        self.metrics.as_ref()
    }
}

/// Probes the metrics API group; absence or failure yields `None`.
async fn probe_metrics(context: &str, client: &Client) -> Option<MetricsClient> {
    match client.list_api_groups().await {
        Ok(groups) => {
            if groups.groups.iter().any(|group| group.name == METRICS_GROUP) {
                Some(MetricsClient {
                    client: client.clone(),
                })
            } else {
                tracing::info!(context, "metrics backend not present; metrics tools disabled");
                None
            }
        }
        Err(err) => {
            tracing::warn!(
                context,
                error = %err,
                "metrics probe failed; metrics tools disabled"
            );
            None
        }
    }
}

// ============================================================================
// SECTION: Metrics
// ============================================================================

/// Dynamic access to the metrics backend.
#[derive(Clone)]
pub struct MetricsClient {
    client: Client,
}

impl std::fmt::Debug for MetricsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsClient").finish()
    }
}

impl MetricsClient {
    /// Returns the dynamic API for pod metrics.
    ///
    /// An empty namespace spans all namespaces.
    #[must_use]
    pub fn pod_metrics(&self, namespace: &str) -> Api<DynamicObject> {
        let resource = metrics_resource("PodMetrics", "pods");
        if namespace.is_empty() {
            Api::all_with(self.client.clone(), &resource)
        } else {
            Api::namespaced_with(self.client.clone(), namespace, &resource)
        }
    }

    /// Returns the dynamic API for node metrics.
    #[must_use]
    pub fn node_metrics(&self) -> Api<DynamicObject> {
        let resource = metrics_resource("NodeMetrics", "nodes");
        Api::all_with(self.client.clone(), &resource)
    }
}

/// Builds the API resource descriptor for a metrics kind.
fn metrics_resource(kind: &str, plural: &str) -> ApiResource {
    ApiResource {
        group: METRICS_GROUP.to_string(),
        version: METRICS_VERSION.to_string(),
        api_version: format!("{METRICS_GROUP}/{METRICS_VERSION}"),
        kind: kind.to_string(),
        plural: plural.to_string(),
    }
}
