//! Start/stop/restart of named instances and extension reload sweeps.
//!
//! The manager is the sole mutator of the live registry. Callers (the
//! reload orchestrator, the startup path) serialize their own calls, so no
//! per-name lock is taken here.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use roost_core::{BotDescriptor, BotKind, Project, ProjectConfig, RoostError};

use crate::extension::{ExtensionId, ExtensionRegistry};
use crate::instance::{BotInstance, LargeBot, SmallBot};

/// Builds the right instance variant for a descriptor's declared kind.
/// Tests inject mocks through this seam.
pub trait InstanceFactory: Send + Sync {
    fn build(
        &self,
        project: Project,
        registry: Arc<ExtensionRegistry>,
    ) -> Arc<dyn BotInstance>;
}

pub struct DefaultInstanceFactory;

impl InstanceFactory for DefaultInstanceFactory {
    fn build(
        &self,
        project: Project,
        registry: Arc<ExtensionRegistry>,
    ) -> Arc<dyn BotInstance> {
        match project.bot.kind {
            BotKind::Small => Arc::new(SmallBot::new(project, registry)),
            BotKind::Large => Arc::new(LargeBot::new(project, registry)),
        }
    }
}

type Registry = Arc<Mutex<HashMap<String, Arc<dyn BotInstance>>>>;

pub struct BotLifecycleManager {
    repo_root: PathBuf,
    config: ProjectConfig,
    extensions: Arc<ExtensionRegistry>,
    bots: Registry,
    factory: Box<dyn InstanceFactory>,
}

impl BotLifecycleManager {
    pub fn new(config: ProjectConfig, extensions: Arc<ExtensionRegistry>) -> Self {
        Self::with_factory(config, extensions, Box::new(DefaultInstanceFactory))
    }

    pub fn with_factory(
        config: ProjectConfig,
        extensions: Arc<ExtensionRegistry>,
        factory: Box<dyn InstanceFactory>,
    ) -> Self {
        Self {
            repo_root: config.repo_root.clone(),
            config,
            extensions,
            bots: Arc::new(Mutex::new(HashMap::new())),
            factory,
        }
    }

    /// Names of currently registered instances.
    pub async fn live_names(&self) -> Vec<String> {
        self.bots.lock().await.keys().cloned().collect()
    }

    pub async fn instance(&self, name: &str) -> Option<Arc<dyn BotInstance>> {
        self.bots.lock().await.get(name).cloned()
    }

    /// Start every bot with a descriptor under `bots/`.
    pub async fn start_all(&self) -> Result<(), RoostError> {
        let bots_dir = self.repo_root.join("bots");
        let mut names: Vec<String> = walkdir::WalkDir::new(&bots_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
            .filter_map(|e| e.file_name().to_str().map(|s| s.to_string()))
            .collect();
        names.sort();

        for name in names {
            if let Err(e) = self.start(&name).await {
                error!(bot = %name, "start failed: {e}");
            }
        }
        Ok(())
    }

    /// Load the descriptor, construct the declared variant, register it,
    /// load its extensions, and spawn its run loop. A disabled bot is a
    /// logged no-op; a failed start leaves the registry without the entry.
    pub async fn start(&self, name: &str) -> Result<(), RoostError> {
        let descriptor = BotDescriptor::load(&self.repo_root, name)?;
        if !descriptor.enabled {
            info!(bot = %name, "skipping start: disabled");
            return Ok(());
        }

        let project = Project {
            name: name.to_string(),
            config: self.config.clone(),
            bot: descriptor.clone(),
        };
        let instance = self.factory.build(project, self.extensions.clone());
        self.bots
            .lock()
            .await
            .insert(name.to_string(), instance.clone());
        info!(bot = %name, kind = %descriptor.kind, "prepared for launch");

        // Every discovered shared unit the descriptor doesn't disable, then
        // the bot's own unit. One bad unit never blocks the rest.
        for id in self.extensions.shared_ids() {
            if descriptor.disabled_extensions.iter().any(|d| d == id.name()) {
                continue;
            }
            if let Err(e) = instance.load_extension(&id).await {
                warn!(bot = %name, extension = %id, "load failed: {e}");
            }
        }
        if descriptor.custom_extension {
            let id = ExtensionId::Custom(name.to_string());
            if let Err(e) = instance.load_extension(&id).await {
                warn!(bot = %name, extension = %id, "load failed: {e}");
            }
        }

        // The run loop suspends for the instance lifetime; it gets its own
        // task. A failed start is reported and the entry removed so a later
        // restart can retry.
        let bots = self.bots.clone();
        let task_name = name.to_string();
        tokio::spawn(async move {
            if let Err(e) = instance.start().await {
                error!(bot = %task_name, "instance failed: {e}");
                bots.lock().await.remove(&task_name);
            }
        });
        Ok(())
    }

    /// Stop-then-recreate. A name with no live instance starts fresh.
    pub async fn restart(&self, name: &str) -> Result<(), RoostError> {
        let existing = self.bots.lock().await.remove(name);
        match existing {
            None => self.start(name).await,
            Some(instance) => {
                info!(bot = %name, "restarting");
                instance.close().await;
                self.start(name).await
            }
        }
    }

    /// Hot-swap one unit across every live instance. Skips instances that
    /// disable the unit and custom units owned by someone else; per-instance
    /// failures are logged and never abort the sweep.
    pub async fn reload_extension(&self, id: &ExtensionId) {
        let instances: Vec<Arc<dyn BotInstance>> =
            self.bots.lock().await.values().cloned().collect();

        for instance in instances {
            let disabled = instance
                .descriptor()
                .disabled_extensions
                .iter()
                .any(|d| d == id.name());
            if disabled {
                continue;
            }

            if instance.extensions().contains(id) {
                if let Err(e) = instance.reload_extension(id).await {
                    warn!(bot = %instance.name(), extension = %id, "reload failed: {e}");
                }
                continue;
            }
            if let ExtensionId::Custom(owner) = id {
                if owner != instance.name() {
                    continue;
                }
            }
            if let Err(e) = instance.load_extension(id).await {
                warn!(bot = %instance.name(), extension = %id, "load failed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests;
