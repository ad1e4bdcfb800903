pub mod config;
pub mod descriptor;
pub mod error;

pub use config::{Config, ProjectConfig};
pub use descriptor::{BotDescriptor, BotKind, Project};
pub use error::RoostError;
