use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RoostError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("bot descriptor not found: {0}")]
    DescriptorNotFound(String),

    #[error("no bot registered under '{0}'")]
    BotNotRegistered(String),

    #[error("extension not found: {0}")]
    ExtensionNotFound(String),

    #[error("bot '{bot}' failed to start: {reason}")]
    StartFailed { bot: String, reason: String },

    #[error("{0}")]
    Other(String),
}
