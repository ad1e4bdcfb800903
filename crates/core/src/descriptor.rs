//! Per-bot descriptor files (`bots/<name>/bot.toml`).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::ProjectConfig;
use crate::error::RoostError;

/// The two instance kinds a descriptor may declare. Any other value is a
/// parse error, never a silent default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BotKind {
    Small,
    Large,
}

impl std::fmt::Display for BotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BotKind::Small => write!(f, "small"),
            BotKind::Large => write!(f, "large"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotDescriptor {
    /// Whether the bot should be started at all.
    pub enabled: bool,
    /// Instance kind.
    #[serde(rename = "type")]
    pub kind: BotKind,
    /// Log stream id this instance reports under.
    pub logstream: String,
    /// Gateway auth token.
    pub token: String,
    /// Backing API token.
    pub api_token: String,
    /// Guilds the bot is limited to (unrestricted if empty).
    #[serde(default)]
    pub guilds: Vec<u64>,
    /// Shared extensions disabled for this instance, by bare name.
    #[serde(default)]
    pub disabled_extensions: Vec<String>,
    /// Whether `bots/<name>/` carries its own custom extension.
    #[serde(default)]
    pub custom_extension: bool,
}

impl BotDescriptor {
    /// Load `bots/<name>/bot.toml` from under the repo root.
    pub fn load(repo_root: impl AsRef<Path>, name: &str) -> Result<Self, RoostError> {
        let path = repo_root.as_ref().join("bots").join(name).join("bot.toml");
        let raw = std::fs::read_to_string(&path)
            .map_err(|_| RoostError::DescriptorNotFound(name.to_string()))?;
        toml::from_str(&raw).map_err(|source| RoostError::Toml { path, source })
    }
}

/// The merged view handed to an instance: the shared host config plus the
/// instance's own descriptor.
#[derive(Debug, Clone)]
pub struct Project {
    pub name: String,
    pub config: ProjectConfig,
    pub bot: BotDescriptor,
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIPTOR: &str = r#"
enabled = true
type = "large"
logstream = "main-bot"
token = "gw.token"
api_token = "api.token"
guilds = [123, 456]
disabled_extensions = ["admin"]
custom_extension = true
"#;

    #[test]
    fn test_parse_descriptor() {
        let d: BotDescriptor = toml::from_str(DESCRIPTOR).unwrap();
        assert!(d.enabled);
        assert_eq!(d.kind, BotKind::Large);
        assert_eq!(d.guilds, vec![123, 456]);
        assert_eq!(d.disabled_extensions, vec!["admin"]);
        assert!(d.custom_extension);
    }

    #[test]
    fn test_unknown_kind_is_hard_error() {
        let raw = DESCRIPTOR.replace("\"large\"", "\"medium\"");
        assert!(toml::from_str::<BotDescriptor>(&raw).is_err());
    }

    #[test]
    fn test_load_missing_descriptor() {
        let tmp = tempfile::tempdir().unwrap();
        let err = BotDescriptor::load(tmp.path(), "ghost").unwrap_err();
        assert!(matches!(err, RoostError::DescriptorNotFound(_)));
    }

    #[test]
    fn test_load_from_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("bots").join("main");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("bot.toml"), DESCRIPTOR).unwrap();

        let d = BotDescriptor::load(tmp.path(), "main").unwrap();
        assert_eq!(d.logstream, "main-bot");
    }
}
