//! Reloadable behavior units.
//!
//! Extensions are constructible units keyed by an explicit id rather than
//! dynamically loaded module paths: the registry knows how to build each
//! unit, instances hold the live ones, and a reload is unload + fresh
//! construction + load.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};

use roost_core::RoostError;

/// Identity of an extension, with ownership made explicit: shared units
/// live under `extensions/<name>/` and load into every instance that does
/// not disable them; custom units live under `bots/<owner>/` and only ever
/// load into their owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExtensionId {
    Shared(String),
    Custom(String),
}

impl ExtensionId {
    /// Bare name used in descriptor disabled lists.
    pub fn name(&self) -> &str {
        match self {
            ExtensionId::Shared(n) | ExtensionId::Custom(n) => n,
        }
    }
}

impl fmt::Display for ExtensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtensionId::Shared(n) => write!(f, "extensions.{n}"),
            ExtensionId::Custom(n) => write!(f, "bots.{n}"),
        }
    }
}

/// Instance-side context handed to extension hooks.
#[derive(Debug, Clone)]
pub struct ExtensionContext {
    /// Name of the instance the unit is being loaded into.
    pub bot: String,
}

/// A reloadable unit of behavior code.
#[async_trait::async_trait]
pub trait Extension: Send + Sync {
    fn id(&self) -> &ExtensionId;

    /// Attach to an instance. Re-reads whatever the unit needs from disk,
    /// so a fresh construction + load picks up source changes.
    async fn load(&mut self, ctx: &ExtensionContext) -> Result<(), RoostError>;

    /// Detach from an instance.
    async fn unload(&mut self, ctx: &ExtensionContext) -> Result<(), RoostError>;
}

type ExtensionFactory = Arc<dyn Fn() -> Box<dyn Extension> + Send + Sync>;

/// Knows how to construct every extension unit by id.
pub struct ExtensionRegistry {
    repo_root: PathBuf,
    shared: HashMap<String, ExtensionFactory>,
}

impl ExtensionRegistry {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            shared: HashMap::new(),
        }
    }

    /// Register one shared unit per subdirectory of `extensions/`.
    pub fn discover(repo_root: impl Into<PathBuf>) -> Self {
        let repo_root = repo_root.into();
        let mut registry = Self::new(repo_root.clone());

        let extensions_dir = repo_root.join("extensions");
        for entry in walkdir::WalkDir::new(&extensions_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
        {
            if let Some(name) = entry.file_name().to_str() {
                registry.register_dir(ExtensionId::Shared(name.to_string()), entry.path());
            }
        }

        debug!("discovered {} shared extension(s)", registry.shared.len());
        registry
    }

    fn register_dir(&mut self, id: ExtensionId, dir: &Path) {
        let dir = dir.to_path_buf();
        let name = id.name().to_string();
        let factory: ExtensionFactory = Arc::new(move || {
            Box::new(DirExtension::new(id.clone(), dir.clone())) as Box<dyn Extension>
        });
        self.shared.insert(name, factory);
    }

    /// Register a custom factory (tests, embedded units).
    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn() -> Box<dyn Extension> + Send + Sync + 'static,
    ) {
        self.shared.insert(name.into(), Arc::new(factory));
    }

    /// All shared ids, sorted for deterministic load order.
    pub fn shared_ids(&self) -> Vec<ExtensionId> {
        let mut names: Vec<&String> = self.shared.keys().collect();
        names.sort();
        names
            .into_iter()
            .map(|n| ExtensionId::Shared(n.clone()))
            .collect()
    }

    /// Construct a fresh unit for `id`. Custom units are built on demand
    /// from their owner's directory, so a bot's own extension never needs
    /// pre-registration.
    pub fn construct(&self, id: &ExtensionId) -> Result<Box<dyn Extension>, RoostError> {
        match id {
            ExtensionId::Shared(name) => self
                .shared
                .get(name)
                .map(|f| f())
                .ok_or_else(|| RoostError::ExtensionNotFound(id.to_string())),
            ExtensionId::Custom(owner) => {
                let dir = self.repo_root.join("bots").join(owner);
                if !dir.is_dir() {
                    return Err(RoostError::ExtensionNotFound(id.to_string()));
                }
                Ok(Box::new(DirExtension::new(id.clone(), dir)))
            }
        }
    }
}

// ── Directory-backed unit ──────────────────────────────────────

/// Optional `extension.toml` manifest inside a unit's directory.
#[derive(Debug, Clone, Default, Deserialize)]
struct Manifest {
    #[serde(default)]
    description: String,
}

/// Extension unit backed by a source directory. Loading re-reads the
/// manifest, so reload (fresh construction + load) observes edits.
struct DirExtension {
    id: ExtensionId,
    dir: PathBuf,
}

impl DirExtension {
    fn new(id: ExtensionId, dir: PathBuf) -> Self {
        Self { id, dir }
    }
}

#[async_trait::async_trait]
impl Extension for DirExtension {
    fn id(&self) -> &ExtensionId {
        &self.id
    }

    async fn load(&mut self, ctx: &ExtensionContext) -> Result<(), RoostError> {
        let manifest_path = self.dir.join("extension.toml");
        let manifest: Manifest = match tokio::fs::read_to_string(&manifest_path).await {
            Ok(raw) => toml::from_str(&raw).map_err(|source| RoostError::Toml {
                path: manifest_path,
                source,
            })?,
            Err(_) => Manifest::default(),
        };
        info!(
            bot = %ctx.bot,
            extension = %self.id,
            description = %manifest.description,
            "loaded extension"
        );
        Ok(())
    }

    async fn unload(&mut self, ctx: &ExtensionContext) -> Result<(), RoostError> {
        info!(bot = %ctx.bot, extension = %self.id, "unloaded extension");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_names() {
        assert_eq!(ExtensionId::Shared("fun".into()).to_string(), "extensions.fun");
        assert_eq!(ExtensionId::Custom("main".into()).to_string(), "bots.main");
    }

    #[test]
    fn test_discover_registers_subdirs() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("extensions/fun")).unwrap();
        std::fs::create_dir_all(tmp.path().join("extensions/admin")).unwrap();
        std::fs::write(tmp.path().join("extensions/readme.md"), "not a unit").unwrap();

        let registry = ExtensionRegistry::discover(tmp.path());
        assert_eq!(
            registry.shared_ids(),
            vec![
                ExtensionId::Shared("admin".into()),
                ExtensionId::Shared("fun".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_construct_custom_requires_owner_dir() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("bots/main")).unwrap();

        let registry = ExtensionRegistry::new(tmp.path());
        assert!(registry.construct(&ExtensionId::Custom("main".into())).is_ok());
        assert!(matches!(
            registry.construct(&ExtensionId::Custom("ghost".into())),
            Err(RoostError::ExtensionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_dir_extension_reads_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("extensions/fun");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("extension.toml"), "description = \"games\"").unwrap();

        let registry = ExtensionRegistry::discover(tmp.path());
        let mut ext = registry.construct(&ExtensionId::Shared("fun".into())).unwrap();
        let ctx = ExtensionContext { bot: "main".into() };
        ext.load(&ctx).await.unwrap();
        ext.unload(&ctx).await.unwrap();
    }
}
