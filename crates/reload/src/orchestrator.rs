//! The watch loop: batches filesystem events, classifies them, and
//! dispatches deduplicated actions to the lifecycle manager.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{error, info, warn};

use roost_core::RoostError;
use roost_host::BotLifecycleManager;

use crate::classify::{classify_batch, Action, BatchOutcome, ChangeEvent, ChangeKind};

/// Window after the first event of a tick during which further events are
/// folded into the same batch.
const BATCH_WINDOW: Duration = Duration::from_millis(150);

/// A framework-level change; the caller decides how to terminate.
#[derive(Debug)]
pub struct FatalChange {
    pub path: String,
}

pub struct ReloadOrchestrator {
    manager: Arc<BotLifecycleManager>,
    repo_root: PathBuf,
    live_reload: bool,
}

impl ReloadOrchestrator {
    pub fn new(manager: Arc<BotLifecycleManager>, repo_root: PathBuf, live_reload: bool) -> Self {
        Self {
            manager,
            repo_root,
            live_reload,
        }
    }

    /// Watch the repo root until a fatal change arrives. Returns `None`
    /// without subscribing when live reload is disabled.
    ///
    /// Dispatch is sequential and awaited, so the next batch is not even
    /// classified until every action of the current one has completed.
    pub async fn run(&self) -> Result<Option<FatalChange>, RoostError> {
        if !self.live_reload {
            info!("live reload disabled; change monitor not started");
            return Ok(None);
        }

        let mut rx = spawn_watcher(&self.repo_root)?;
        info!(root = %self.repo_root.display(), "started change monitor");

        loop {
            let Some(first) = rx.recv().await else {
                return Err(RoostError::Other("watch channel closed".to_string()));
            };

            // Fold the burst into one batch.
            let mut batch = vec![first];
            tokio::time::sleep(BATCH_WINDOW).await;
            while let Ok(event) = rx.try_recv() {
                batch.push(event);
            }

            match classify_batch(&batch) {
                BatchOutcome::Fatal { path } => {
                    error!(path = %path, "severe change detected; rebooting");
                    return Ok(Some(FatalChange { path }));
                }
                BatchOutcome::Actions(actions) => {
                    for action in actions {
                        self.dispatch(action).await;
                    }
                }
            }
        }
    }

    async fn dispatch(&self, action: Action) {
        match action {
            Action::RestartBot(name) => {
                if let Err(e) = self.manager.restart(&name).await {
                    error!(bot = %name, "restart failed: {e}");
                }
            }
            Action::ReloadExtension(id) => {
                self.manager.reload_extension(&id).await;
            }
        }
    }
}

/// Run the notify watcher on its own OS thread, forwarding events as
/// repo-relative [`ChangeEvent`]s into a tokio channel.
fn spawn_watcher(
    repo_root: &Path,
) -> Result<tokio::sync::mpsc::Receiver<ChangeEvent>, RoostError> {
    let (tx, rx) = tokio::sync::mpsc::channel::<ChangeEvent>(256);
    let root = repo_root.canonicalize()?;

    // Capture the runtime handle before spawning the OS thread, since
    // Handle::current() requires an active tokio context.
    let rt = tokio::runtime::Handle::current();

    let watch_root = root.clone();
    std::thread::spawn(move || {
        let mut watcher: RecommendedWatcher = match notify::recommended_watcher(
            move |res: Result<Event, notify::Error>| {
                let event = match res {
                    Ok(event) => event,
                    Err(e) => {
                        warn!("watch error: {e}");
                        return;
                    }
                };
                let kind = match event.kind {
                    // Reads and metadata churn carry no code change.
                    EventKind::Access(_) => return,
                    EventKind::Modify(_) => ChangeKind::Modified,
                    _ => ChangeKind::Other,
                };
                for path in event.paths {
                    let rel = path
                        .strip_prefix(&root)
                        .unwrap_or(&path)
                        .to_string_lossy()
                        .replace('\\', "/");
                    let tx = tx.clone();
                    rt.spawn(async move {
                        let _ = tx.send(ChangeEvent { path: rel, kind }).await;
                    });
                }
            },
        ) {
            Ok(w) => w,
            Err(e) => {
                error!("failed to create file watcher: {e}");
                return;
            }
        };

        if let Err(e) = watcher.watch(&watch_root, RecursiveMode::Recursive) {
            error!("failed to watch {}: {e}", watch_root.display());
            return;
        }

        // Keep the watcher alive.
        loop {
            std::thread::sleep(Duration::from_secs(60));
        }
    });

    Ok(rx)
}
