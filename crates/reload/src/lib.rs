pub mod classify;
pub mod orchestrator;

pub use classify::{classify, classify_batch, Action, BatchOutcome, ChangeEvent, ChangeKind, Scope};
pub use orchestrator::{FatalChange, ReloadOrchestrator};
