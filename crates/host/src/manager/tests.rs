//! Unit tests for the lifecycle manager, driven through a mock instance.

use std::path::Path;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::Notify;

use roost_core::{BotDescriptor, Project, ProjectConfig};

use super::*;

fn test_config(repo_root: &Path) -> ProjectConfig {
    ProjectConfig {
        git_branch: "main".to_string(),
        github_secret: String::new(),
        base_version: [0, 0, 0],
        start_commit: String::new(),
        base_guilds: Vec::new(),
        live_reload: true,
        webhook_host: "127.0.0.1".to_string(),
        webhook_port: 0,
        repo_root: repo_root.to_path_buf(),
    }
}

fn write_descriptor(repo_root: &Path, name: &str, body: &str) {
    let dir = repo_root.join("bots").join(name);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("bot.toml"), body).unwrap();
}

const ENABLED_SMALL: &str = r#"
enabled = true
type = "small"
logstream = "test"
token = "t"
api_token = "a"
"#;

struct MockInstance {
    descriptor: BotDescriptor,
    name: String,
    loaded: StdMutex<Vec<ExtensionId>>,
    shutdown: Notify,
    events: Arc<StdMutex<Vec<String>>>,
}

#[async_trait::async_trait]
impl BotInstance for MockInstance {
    fn name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> &BotDescriptor {
        &self.descriptor
    }

    fn extensions(&self) -> Vec<ExtensionId> {
        self.loaded.lock().unwrap().clone()
    }

    fn guild_scope(&self) -> &[u64] {
        &self.descriptor.guilds
    }

    async fn start(&self) -> Result<(), RoostError> {
        self.events.lock().unwrap().push(format!("start:{}", self.name));
        self.shutdown.notified().await;
        Ok(())
    }

    async fn close(&self) {
        self.events.lock().unwrap().push(format!("close:{}", self.name));
        // Permit semantics: a close before start() is first polled still counts.
        self.shutdown.notify_one();
    }

    async fn load_extension(&self, id: &ExtensionId) -> Result<(), RoostError> {
        self.events
            .lock()
            .unwrap()
            .push(format!("load:{}:{}", self.name, id));
        self.loaded.lock().unwrap().push(id.clone());
        Ok(())
    }

    async fn reload_extension(&self, id: &ExtensionId) -> Result<(), RoostError> {
        self.events
            .lock()
            .unwrap()
            .push(format!("reload:{}:{}", self.name, id));
        Ok(())
    }
}

struct MockFactory {
    events: Arc<StdMutex<Vec<String>>>,
}

impl InstanceFactory for MockFactory {
    fn build(&self, project: Project, _registry: Arc<ExtensionRegistry>) -> Arc<dyn BotInstance> {
        Arc::new(MockInstance {
            name: project.name.clone(),
            descriptor: project.bot,
            loaded: StdMutex::new(Vec::new()),
            shutdown: Notify::new(),
            events: self.events.clone(),
        })
    }
}

fn make_manager(repo_root: &Path) -> (BotLifecycleManager, Arc<StdMutex<Vec<String>>>) {
    let events = Arc::new(StdMutex::new(Vec::new()));
    let registry = Arc::new(ExtensionRegistry::discover(repo_root));
    let manager = BotLifecycleManager::with_factory(
        test_config(repo_root),
        registry,
        Box::new(MockFactory {
            events: events.clone(),
        }),
    );
    (manager, events)
}

#[tokio::test]
async fn test_start_registers_and_loads_extensions() {
    let tmp = tempfile::tempdir().unwrap();
    write_descriptor(tmp.path(), "main", ENABLED_SMALL);
    std::fs::create_dir_all(tmp.path().join("extensions/fun")).unwrap();
    std::fs::create_dir_all(tmp.path().join("extensions/admin")).unwrap();

    let (manager, events) = make_manager(tmp.path());
    manager.start("main").await.unwrap();

    assert_eq!(manager.live_names().await, vec!["main".to_string()]);
    let events = events.lock().unwrap().clone();
    assert!(events.contains(&"load:main:extensions.admin".to_string()));
    assert!(events.contains(&"load:main:extensions.fun".to_string()));
}

#[tokio::test]
async fn test_start_skips_disabled_bot() {
    let tmp = tempfile::tempdir().unwrap();
    write_descriptor(
        tmp.path(),
        "off",
        &ENABLED_SMALL.replace("enabled = true", "enabled = false"),
    );

    let (manager, events) = make_manager(tmp.path());
    manager.start("off").await.unwrap();

    assert!(manager.live_names().await.is_empty());
    assert!(events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_start_skips_disabled_extensions_and_loads_custom() {
    let tmp = tempfile::tempdir().unwrap();
    let body = format!("{ENABLED_SMALL}disabled_extensions = [\"admin\"]\ncustom_extension = true\n");
    write_descriptor(tmp.path(), "main", &body);
    std::fs::create_dir_all(tmp.path().join("extensions/fun")).unwrap();
    std::fs::create_dir_all(tmp.path().join("extensions/admin")).unwrap();

    let (manager, events) = make_manager(tmp.path());
    manager.start("main").await.unwrap();

    let events = events.lock().unwrap().clone();
    assert!(events.contains(&"load:main:extensions.fun".to_string()));
    assert!(!events.iter().any(|e| e.contains("extensions.admin")));
    assert!(events.contains(&"load:main:bots.main".to_string()));
}

#[tokio::test]
async fn test_missing_descriptor_leaves_registry_untouched() {
    let tmp = tempfile::tempdir().unwrap();
    let (manager, _) = make_manager(tmp.path());

    assert!(manager.start("ghost").await.is_err());
    assert!(manager.live_names().await.is_empty());
}

#[tokio::test]
async fn test_restart_on_absent_name_behaves_as_start() {
    let tmp = tempfile::tempdir().unwrap();
    write_descriptor(tmp.path(), "main", ENABLED_SMALL);

    let (manager, events) = make_manager(tmp.path());
    manager.restart("main").await.unwrap();

    assert_eq!(manager.live_names().await, vec!["main".to_string()]);
    // No close event: nothing was live before.
    assert!(!events.lock().unwrap().iter().any(|e| e.starts_with("close:")));
}

#[tokio::test]
async fn test_restart_closes_then_recreates() {
    let tmp = tempfile::tempdir().unwrap();
    write_descriptor(tmp.path(), "main", ENABLED_SMALL);

    let (manager, events) = make_manager(tmp.path());
    manager.start("main").await.unwrap();
    let first = manager.instance("main").await.unwrap();

    manager.restart("main").await.unwrap();
    let second = manager.instance("main").await.unwrap();

    assert!(!Arc::ptr_eq(&first, &second), "restart must recreate");
    assert!(events.lock().unwrap().contains(&"close:main".to_string()));
}

#[tokio::test]
async fn test_reload_extension_reloads_loaded_loads_fresh() {
    let tmp = tempfile::tempdir().unwrap();
    write_descriptor(tmp.path(), "a", ENABLED_SMALL);
    write_descriptor(tmp.path(), "b", ENABLED_SMALL);
    std::fs::create_dir_all(tmp.path().join("extensions/fun")).unwrap();

    let (manager, events) = make_manager(tmp.path());
    manager.start("a").await.unwrap();
    manager.start("b").await.unwrap();
    events.lock().unwrap().clear();

    // Loaded in both: reloaded in place in both.
    manager
        .reload_extension(&ExtensionId::Shared("fun".into()))
        .await;
    let seen = events.lock().unwrap().clone();
    assert!(seen.contains(&"reload:a:extensions.fun".to_string()));
    assert!(seen.contains(&"reload:b:extensions.fun".to_string()));
}

#[tokio::test]
async fn test_reload_skips_disabled_and_foreign_custom() {
    let tmp = tempfile::tempdir().unwrap();
    write_descriptor(tmp.path(), "a", ENABLED_SMALL);
    write_descriptor(
        tmp.path(),
        "b",
        &format!("{ENABLED_SMALL}disabled_extensions = [\"fun\"]\n"),
    );
    std::fs::create_dir_all(tmp.path().join("extensions/fun")).unwrap();

    let (manager, events) = make_manager(tmp.path());
    manager.start("a").await.unwrap();
    manager.start("b").await.unwrap();
    events.lock().unwrap().clear();

    manager
        .reload_extension(&ExtensionId::Shared("fun".into()))
        .await;
    let seen = events.lock().unwrap().clone();
    assert!(seen.contains(&"reload:a:extensions.fun".to_string()));
    assert!(!seen.iter().any(|e| e.starts_with("reload:b") || e.starts_with("load:b")));

    // A custom unit owned by 'a' never loads into 'b'.
    events.lock().unwrap().clear();
    manager
        .reload_extension(&ExtensionId::Custom("a".into()))
        .await;
    let seen = events.lock().unwrap().clone();
    assert!(seen.contains(&"load:a:bots.a".to_string()));
    assert!(!seen.iter().any(|e| e.contains(":b:")));
}
