// kube-gate-clusters/src/watch.rs
// ============================================================================
// Module: Credential Watching
// Description: Debounced credential reload on filesystem change.
// Purpose: Rebuild client bundles when credential files are rewritten.
// Dependencies: notify, tokio
// ============================================================================

//! ## Overview
//! The watcher observes the parent directories of every tracked credential
//! file; watching directories rather than files survives editors and
//! controllers that replace files via create-and-rename. Write and create
//! events are coalesced per path for a fixed debounce window, then every
//! context bound to a fired path is rebuilt outside the lock and swapped in
//! under the write lock. A failed rebuild keeps the previous bundle.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use notify::EventKind;
use notify::RecommendedWatcher;
use notify::RecursiveMode;
use notify::Watcher as _;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep_until;
use tokio::time::Instant;

use crate::bundle::ClusterClient;
use crate::manager::absolute_path;
use crate::manager::ClusterError;
use crate::manager::ManagerState;

/// Debounce window applied to credential change events.
const RELOAD_DEBOUNCE: Duration = Duration::from_millis(500);
/// Capacity of the watcher event channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

// ============================================================================
// SECTION: Watcher Setup
// ============================================================================

/// Starts the filesystem watcher and the debounced reload task.
///
/// Returns no watcher when there are no file-backed contexts to track.
pub(crate) fn spawn(
    state: Arc<RwLock<ManagerState>>,
) -> Result<(Option<RecommendedWatcher>, JoinHandle<()>), ClusterError> {
    let (tx, rx) = mpsc::channel::<PathBuf>(EVENT_CHANNEL_CAPACITY);

    let directories: BTreeSet<PathBuf> = {
        let state = state.read();
        state
            .file_contexts
            .keys()
            .filter_map(|path| path.parent().map(Path::to_path_buf))
            .collect()
    };

    let watcher = if directories.is_empty() {
        None
    } else {
        let mut watcher = notify::recommended_watcher(
            move |result: Result<notify::Event, notify::Error>| match result {
                Ok(event) => {
                    if matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                        for path in event.paths {
                            let _ = tx.try_send(absolute_path(&path));
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "credential watcher error");
                }
            },
        )
        .map_err(|err| ClusterError::Watch(err.to_string()))?;
        for directory in &directories {
            watcher
                .watch(directory, RecursiveMode::NonRecursive)
                .map_err(|err| ClusterError::Watch(err.to_string()))?;
        }
        Some(watcher)
    };

    let task = tokio::spawn(reload_loop(state, rx));
    Ok((watcher, task))
}

// ============================================================================
// SECTION: Debounced Reload
// ============================================================================

/// Drains watcher events, coalescing per path until the debounce fires.
async fn reload_loop(state: Arc<RwLock<ManagerState>>, mut rx: mpsc::Receiver<PathBuf>) {
    let mut pending: BTreeSet<PathBuf> = BTreeSet::new();
    let mut deadline: Option<Instant> = None;
    loop {
        let wait = async move {
            match deadline {
                Some(at) => sleep_until(at).await,
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            received = rx.recv() => {
                match received {
                    Some(path) => {
                        let tracked = state.read().file_contexts.contains_key(&path);
                        if tracked {
                            pending.insert(path);
                            deadline = Some(Instant::now() + RELOAD_DEBOUNCE);
                        }
                    }
                    None => return,
                }
            }
            () = wait => {
                deadline = None;
                let fired: Vec<PathBuf> = pending.iter().cloned().collect();
                pending.clear();
                for path in fired {
                    reload_path(&state, &path).await;
                }
            }
        }
    }
}

/// Rebuilds every context bound to a credential path.
///
/// Bundles are constructed outside the lock; only the map swap is guarded.
async fn reload_path(state: &Arc<RwLock<ManagerState>>, path: &Path) {
    let targets: Vec<(String, kube_gate_config::ContextConfig)> = {
        let state = state.read();
        let Some(names) = state.file_contexts.get(path) else {
            return;
        };
        names
            .iter()
            .filter_map(|name| {
                state.contexts.get(name).map(|entry| (name.clone(), entry.clone()))
            })
            .collect()
    };

    for (name, entry) in targets {
        tracing::info!(context = %name, path = %path.display(), "reloading cluster credentials");
        match ClusterClient::connect(&entry).await {
            Ok(bundle) => {
                state.write().clients.insert(name, Arc::new(bundle));
            }
            Err(err) => {
                tracing::warn!(
                    context = %name,
                    error = %err,
                    "credential reload failed; keeping previous client"
                );
            }
        }
    }
}
