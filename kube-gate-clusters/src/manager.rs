// kube-gate-clusters/src/manager.rs
// ============================================================================
// Module: Client Manager
// Description: Context registry, namespace gating, and active context.
// Purpose: Own one live cluster bundle per context with hot reload.
// Dependencies: kube, kube-gate-config, notify, parking_lot
// ============================================================================

//! ## Overview
//! The client manager loads contexts from explicit configuration entries and
//! from a watched credential directory, constructs one client bundle per
//! context, and resolves the active context for requests that omit one.
//! Reads hold a shared lock; registration, reload, and context switching hold
//! the exclusive lock. Bundles are constructed outside the lock so critical
//! sections never perform I/O.
//!
//! ## Invariants
//! - Context names are globally unique across sources; duplicates are fatal.
//! - The active context is always a member of the loaded set.
//! - Reload replaces a bundle atomically; in-flight requests holding the
//!   previous bundle continue against the old credentials.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use kube::config::Kubeconfig;
use kube_gate_config::ContextConfig;
use kube_gate_config::KubernetesConfig;
use notify::RecommendedWatcher;
use parking_lot::Mutex;
use parking_lot::RwLock;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::bundle::ClusterClient;
use crate::watch;

/// Credential file extensions recognized in the contexts directory.
const CREDENTIAL_EXTENSIONS: [&str; 2] = ["yaml", "yml"];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by the client manager.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Context registry configuration is invalid.
    #[error("invalid cluster configuration: {0}")]
    Config(String),
    /// Credentials for a context could not be loaded.
    #[error("failed to load credentials for context {context}: {message}")]
    Credentials {
        /// Context being loaded.
        context: String,
        /// Failure detail.
        message: String,
    },
    /// A client could not be constructed from loaded credentials.
    #[error("failed to build client for context {context}: {message}")]
    Client {
        /// Context being built.
        context: String,
        /// Failure detail.
        message: String,
    },
    /// The requested context is not registered.
    #[error("context {0} not found")]
    UnknownContext(String),
    /// The filesystem watcher could not be started.
    #[error("failed to start credential watcher: {0}")]
    Watch(String),
}

// ============================================================================
// SECTION: Shared State
// ============================================================================

/// Mutable registry shared between the manager and the reload task.
#[derive(Debug)]
pub(crate) struct ManagerState {
    /// Context configuration by name.
    pub(crate) contexts: BTreeMap<String, ContextConfig>,
    /// Live bundles by context name.
    pub(crate) clients: BTreeMap<String, Arc<ClusterClient>>,
    /// Credential path to the contexts it serves.
    pub(crate) file_contexts: BTreeMap<PathBuf, Vec<String>>,
    /// Name of the active context.
    pub(crate) active: String,
}

// ============================================================================
// SECTION: Client Manager
// ============================================================================

/// Manages cluster client bundles for all configured contexts.
#[derive(Debug)]
pub struct ClientManager {
    state: Arc<RwLock<ManagerState>>,
    watcher: Mutex<Option<RecommendedWatcher>>,
    reload_task: Mutex<Option<JoinHandle<()>>>,
}

impl ClientManager {
    /// Loads all contexts and starts credential watching.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError`] when any context fails to load, names
    /// collide, or the default context is not a member of the loaded set.
    pub async fn new(config: &KubernetesConfig) -> Result<Self, ClusterError> {
        let mut contexts: BTreeMap<String, ContextConfig> = BTreeMap::new();
        for entry in &config.contexts {
            if contexts.insert(entry.name.clone(), entry.clone()).is_some() {
                return Err(ClusterError::Config(format!(
                    "duplicate context name {:?} in explicit contexts",
                    entry.name
                )));
            }
        }
        if !config.contexts_dir.is_empty() {
            load_directory_contexts(&config.contexts_dir, &mut contexts)?;
        }

        let active = config.default_context.clone();
        if !contexts.contains_key(&active) {
            return Err(ClusterError::Config(format!(
                "default context {active:?} is not among the loaded contexts"
            )));
        }

        let mut clients = BTreeMap::new();
        let mut file_contexts: BTreeMap<PathBuf, Vec<String>> = BTreeMap::new();
        for (name, entry) in &contexts {
            let bundle = ClusterClient::connect(entry).await?;
            clients.insert(name.clone(), Arc::new(bundle));
            if !entry.kubeconfig.is_empty() {
                let path = absolute_path(Path::new(&entry.kubeconfig));
                file_contexts.entry(path).or_default().push(name.clone());
            }
        }

        let state = Arc::new(RwLock::new(ManagerState {
            contexts,
            clients,
            file_contexts,
            active,
        }));
        let (watcher, reload_task) = watch::spawn(Arc::clone(&state))?;
        Ok(Self {
            state,
            watcher: Mutex::new(watcher),
            reload_task: Mutex::new(Some(reload_task)),
        })
    }

    /// Returns the bundle for a context, defaulting to the active context
    /// when the name is empty.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::UnknownContext`] for unregistered names.
    pub fn client_for(&self, context: &str) -> Result<Arc<ClusterClient>, ClusterError> {
        let state = self.state.read();
        let name = if context.is_empty() { state.active.as_str() } else { context };
        state
            .clients
            .get(name)
            .cloned()
            .ok_or_else(|| ClusterError::UnknownContext(name.to_string()))
    }

    /// Returns the name of the active context.
    #[must_use]
    pub fn active_context(&self) -> String {
        self.state.read().active.clone()
    }

    /// Switches the active context.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::UnknownContext`] for unregistered names.
    pub fn set_active_context(&self, context: &str) -> Result<(), ClusterError> {
        let mut state = self.state.write();
        if !state.clients.contains_key(context) {
            return Err(ClusterError::UnknownContext(context.to_string()));
        }
        state.active = context.to_string();
        Ok(())
    }

    /// Returns all registered context names.
    #[must_use]
    pub fn contexts(&self) -> Vec<String> {
        self.state.read().clients.keys().cloned().collect()
    }

    /// Returns the configuration view for a context, defaulting to the
    /// active context when the name is empty.
    #[must_use]
    pub fn context_config(&self, context: &str) -> Option<ContextConfig> {
        let state = self.state.read();
        let name = if context.is_empty() { state.active.as_str() } else { context };
        state.contexts.get(name).cloned()
    }

    /// Returns whether a namespace is allowed in a context.
    ///
    /// The deny-list wins over the allow-list; an empty allow-list admits any
    /// non-denied namespace. Unknown contexts are never allowed.
    #[must_use]
    pub fn namespace_allowed(&self, context: &str, namespace: &str) -> bool {
        let Some(config) = self.context_config(context) else {
            return false;
        };
        if config.denied_namespaces.iter().any(|denied| denied == namespace) {
            return false;
        }
        if config.allowed_namespaces.is_empty() {
            return true;
        }
        config.allowed_namespaces.iter().any(|allowed| allowed == namespace)
    }

    /// Stops credential watching and the reload task.
    pub fn shutdown(&self) {
        if let Some(task) = self.reload_task.lock().take() {
            task.abort();
        }
        // Dropping the watcher stops event delivery.
        self.watcher.lock().take();
    }
}

impl Drop for ClientManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ============================================================================
// SECTION: Directory Loading
// ============================================================================

/// Loads one context per recognized credential file in the directory.
///
/// Each file contributes a context named by its declared current context;
/// collisions against already-loaded names are fatal.
fn load_directory_contexts(
    dir: &str,
    contexts: &mut BTreeMap<String, ContextConfig>,
) -> Result<(), ClusterError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|err| ClusterError::Config(format!("failed to read contexts_dir {dir:?}: {err}")))?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| CREDENTIAL_EXTENSIONS.contains(&ext))
        })
        .collect();
    paths.sort();

    for path in paths {
        let display = path.display().to_string();
        let kubeconfig = Kubeconfig::read_from(&path).map_err(|err| ClusterError::Credentials {
            context: display.clone(),
            message: err.to_string(),
        })?;
        let name = kubeconfig.current_context.unwrap_or_default();
        if name.is_empty() {
            return Err(ClusterError::Config(format!(
                "credential file {display} has no current context"
            )));
        }
        if let Some(existing) = contexts.get(&name) {
            return Err(ClusterError::Config(format!(
                "context name collision: {name:?} already defined (from {:?}), found again in {display}",
                existing.kubeconfig
            )));
        }
        contexts.insert(
            name.clone(),
            ContextConfig {
                name,
                kubeconfig: display,
                ..ContextConfig::default()
            },
        );
    }
    Ok(())
}

/// Normalizes a path against the working directory without touching the
/// filesystem, so watcher events compare against a stable key.
pub(crate) fn absolute_path(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
