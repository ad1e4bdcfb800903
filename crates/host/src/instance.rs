//! Bot instances: the long-lived workers the lifecycle manager drives.

use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info, warn};

use roost_core::{BotDescriptor, Project, RoostError};

use crate::extension::{Extension, ExtensionContext, ExtensionId, ExtensionRegistry};

/// Consumed interface of one running instance. `start()` suspends for the
/// instance's entire lifetime; callers spawn it as its own task.
#[async_trait::async_trait]
pub trait BotInstance: Send + Sync {
    fn name(&self) -> &str;

    fn descriptor(&self) -> &BotDescriptor;

    /// Ids of currently loaded extensions.
    fn extensions(&self) -> Vec<ExtensionId>;

    /// Guilds the instance is confined to (empty = unrestricted).
    fn guild_scope(&self) -> &[u64];

    /// Run the instance until closed.
    async fn start(&self) -> Result<(), RoostError>;

    /// Gracefully stop the run loop.
    async fn close(&self);

    /// Construct and attach a fresh unit.
    async fn load_extension(&self, id: &ExtensionId) -> Result<(), RoostError>;

    /// Hot-swap an already-loaded unit in place.
    async fn reload_extension(&self, id: &ExtensionId) -> Result<(), RoostError>;
}

// ── Shared core ────────────────────────────────────────────────

const HEARTBEAT_SECS: u64 = 45;

/// State shared by both instance kinds: the loaded-extension map and the
/// shutdown signal for the run loop.
struct BotCore {
    project: Project,
    registry: Arc<ExtensionRegistry>,
    guild_scope: Vec<u64>,
    loaded: Mutex<IndexMap<ExtensionId, Box<dyn Extension>>>,
    shutdown: Notify,
}

impl BotCore {
    fn new(project: Project, registry: Arc<ExtensionRegistry>, guild_scope: Vec<u64>) -> Self {
        Self {
            project,
            registry,
            guild_scope,
            loaded: Mutex::new(IndexMap::new()),
            shutdown: Notify::new(),
        }
    }

    fn ctx(&self) -> ExtensionContext {
        ExtensionContext {
            bot: self.project.name.clone(),
        }
    }

    fn extensions(&self) -> Vec<ExtensionId> {
        // Manager calls never overlap for one instance, so this is only
        // contended by the instance's own run loop, which doesn't hold it.
        self.loaded
            .try_lock()
            .map(|l| l.keys().cloned().collect())
            .unwrap_or_default()
    }

    async fn run(&self, kind_label: &str) -> Result<(), RoostError> {
        let bot = &self.project.bot;
        if bot.token.is_empty() {
            return Err(RoostError::StartFailed {
                bot: self.project.name.clone(),
                reason: "empty gateway token".to_string(),
            });
        }

        info!(
            bot = %self.project.name,
            kind = kind_label,
            logstream = %bot.logstream,
            guilds = self.guild_scope.len(),
            "instance online"
        );

        let mut heartbeat =
            tokio::time::interval(std::time::Duration::from_secs(HEARTBEAT_SECS));
        heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown.notified() => break,
                _ = heartbeat.tick() => {
                    debug!(bot = %self.project.name, "heartbeat");
                }
            }
        }

        info!(bot = %self.project.name, "instance closed");
        Ok(())
    }

    async fn close(&self) {
        let ctx = self.ctx();
        let mut loaded = self.loaded.lock().await;
        for (_, ext) in loaded.iter_mut() {
            if let Err(e) = ext.unload(&ctx).await {
                warn!(bot = %ctx.bot, extension = %ext.id(), "unload on close failed: {e}");
            }
        }
        loaded.clear();
        drop(loaded);
        // notify_one stores a permit when nothing is parked on notified(),
        // so a close issued before the run loop's first poll still lands.
        self.shutdown.notify_one();
    }

    async fn load_extension(&self, id: &ExtensionId) -> Result<(), RoostError> {
        let mut loaded = self.loaded.lock().await;
        if loaded.contains_key(id) {
            return Err(RoostError::Other(format!(
                "extension {id} already loaded in '{}'",
                self.project.name
            )));
        }
        let mut ext = self.registry.construct(id)?;
        ext.load(&self.ctx()).await?;
        loaded.insert(id.clone(), ext);
        Ok(())
    }

    async fn reload_extension(&self, id: &ExtensionId) -> Result<(), RoostError> {
        let mut loaded = self.loaded.lock().await;
        let mut old = loaded
            .shift_remove(id)
            .ok_or_else(|| RoostError::ExtensionNotFound(id.to_string()))?;
        let ctx = self.ctx();
        old.unload(&ctx).await?;
        let mut fresh = self.registry.construct(id)?;
        fresh.load(&ctx).await?;
        loaded.insert(id.clone(), fresh);
        info!(bot = %ctx.bot, extension = %id, "hot-reloaded extension");
        Ok(())
    }
}

macro_rules! delegate_instance {
    ($ty:ty, $label:literal) => {
        #[async_trait::async_trait]
        impl BotInstance for $ty {
            fn name(&self) -> &str {
                &self.core.project.name
            }

            fn descriptor(&self) -> &BotDescriptor {
                &self.core.project.bot
            }

            fn extensions(&self) -> Vec<ExtensionId> {
                self.core.extensions()
            }

            fn guild_scope(&self) -> &[u64] {
                &self.core.guild_scope
            }

            async fn start(&self) -> Result<(), RoostError> {
                self.core.run($label).await
            }

            async fn close(&self) {
                self.core.close().await;
            }

            async fn load_extension(&self, id: &ExtensionId) -> Result<(), RoostError> {
                self.core.load_extension(id).await
            }

            async fn reload_extension(&self, id: &ExtensionId) -> Result<(), RoostError> {
                self.core.reload_extension(id).await
            }
        }
    };
}

/// Guild-scoped instance: serves its descriptor guilds plus the host's
/// shared base guilds.
pub struct SmallBot {
    core: BotCore,
}

impl SmallBot {
    pub fn new(project: Project, registry: Arc<ExtensionRegistry>) -> Self {
        let mut scope: Vec<u64> = project.bot.guilds.clone();
        scope.extend(&project.config.base_guilds);
        Self {
            core: BotCore::new(project, registry, scope),
        }
    }
}

delegate_instance!(SmallBot, "small");

/// Unrestricted instance; ignores the base-guild list.
pub struct LargeBot {
    core: BotCore,
}

impl LargeBot {
    pub fn new(project: Project, registry: Arc<ExtensionRegistry>) -> Self {
        Self {
            core: BotCore::new(project, registry, Vec::new()),
        }
    }
}

delegate_instance!(LargeBot, "large");
