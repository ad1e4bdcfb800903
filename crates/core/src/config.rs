use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::RoostError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub config: ProjectConfig,
}

/// Shared host configuration, read from the `[config]` table of
/// `project.toml` and merged with each bot's own descriptor before
/// instance construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Branch the deployment tracks (used by the webhook sync and the
    /// version resolver).
    pub git_branch: String,
    /// Shared secret for webhook signature verification. Overridable via
    /// the `ROOST_GITHUB_SECRET` env var so it never has to live on disk.
    #[serde(default)]
    pub github_secret: String,
    /// Version the commit replay starts from (e.g. [1, 0, 0]).
    #[serde(default)]
    pub base_version: [u64; 3],
    /// Commit hash replay starts after (empty = full history).
    #[serde(default)]
    pub start_commit: String,
    /// Extra guilds small bots always join (emote servers, etc).
    #[serde(default)]
    pub base_guilds: Vec<u64>,
    /// Whether the change monitor watches the tree at all.
    #[serde(default = "default_true")]
    pub live_reload: bool,
    #[serde(default = "default_host")]
    pub webhook_host: String,
    #[serde(default = "default_port")]
    pub webhook_port: u16,
    /// Root of the deployment checkout; bots/, extensions/ and .git/ live
    /// under here.
    #[serde(default = "default_repo_root")]
    pub repo_root: PathBuf,
}

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    7364
}

fn default_repo_root() -> PathBuf {
    PathBuf::from(".")
}

impl Config {
    /// Read and parse `project.toml`, then apply env overrides
    /// (call `load_dotenv()` first).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RoostError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&raw).map_err(|source| RoostError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(secret) = env_opt("ROOST_GITHUB_SECRET") {
            config.config.github_secret = secret;
        }
        Ok(config)
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        let c = &self.config;
        tracing::info!("Config loaded:");
        tracing::info!("  branch:      {}", c.git_branch);
        tracing::info!("  repo_root:   {}", c.repo_root.display());
        tracing::info!("  webhook:     {}:{}", c.webhook_host, c.webhook_port);
        tracing::info!("  live_reload: {}", c.live_reload);
        tracing::info!(
            "  secret:      {}",
            if c.github_secret.is_empty() { "(unset)" } else { "********" }
        );
    }
}
