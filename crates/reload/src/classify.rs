//! Maps raw filesystem changes to the minimum safe remediation.
//!
//! Blast radius, most specific first: framework/core paths take the whole
//! process down (an external supervisor restarts it), a bot's descriptor
//! restarts that one bot, anything else under a bot or shared extension
//! directory hot-reloads that one unit.

use indexmap::IndexSet;

use roost_host::ExtensionId;

/// First path segments reserved for core framework code.
const FATAL_DIRS: &[&str] = &["client", "utils"];
/// Top-level files the process cannot outlive a change to.
const FATAL_FILES: &[&str] = &["main.py", "project.toml"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Modified,
    /// Create, delete, rename: structural changes the classifier cannot
    /// safely reason about.
    Other,
}

/// One watcher-reported change, path relative to the repo root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: String,
    pub kind: ChangeKind,
}

/// A dispatchable remediation. Deduplicated by equality within one batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    RestartBot(String),
    ReloadExtension(ExtensionId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Fatal,
    Act(Action),
    Ignore,
}

/// Strip watch-tool artifacts: everything before a `/./` marker, a plain
/// leading `./`, and backslash separators.
fn normalize(path: &str) -> String {
    let path = path.replace('\\', "/");
    let path = match path.rfind("/./") {
        Some(idx) => &path[idx + 3..],
        None => path.strip_prefix("./").unwrap_or(&path),
    };
    path.to_string()
}

pub fn classify(event: &ChangeEvent) -> Scope {
    if event.kind != ChangeKind::Modified {
        return Scope::Fatal;
    }

    let path = normalize(&event.path);
    let segments: Vec<&str> = path.split('/').collect();

    match segments.as_slice() {
        [first, ..] if FATAL_DIRS.contains(first) => Scope::Fatal,
        [only] if FATAL_FILES.contains(only) => Scope::Fatal,
        ["bots", name, "bot.toml"] => Scope::Act(Action::RestartBot(name.to_string())),
        ["bots", name, _, ..] => Scope::Act(Action::ReloadExtension(ExtensionId::Custom(
            name.to_string(),
        ))),
        ["extensions", name, _, ..] => Scope::Act(Action::ReloadExtension(ExtensionId::Shared(
            name.to_string(),
        ))),
        _ => Scope::Ignore,
    }
}

/// Result of classifying one watch tick's batch.
#[derive(Debug, PartialEq, Eq)]
pub enum BatchOutcome {
    /// A fatal event short-circuits the rest of the batch.
    Fatal { path: String },
    /// Deduplicated actions in first-seen order.
    Actions(IndexSet<Action>),
}

/// Classify a whole batch. Strictly per-batch: no memory of earlier ticks.
pub fn classify_batch<'a>(events: impl IntoIterator<Item = &'a ChangeEvent>) -> BatchOutcome {
    let mut actions = IndexSet::new();
    for event in events {
        match classify(event) {
            Scope::Fatal => {
                return BatchOutcome::Fatal {
                    path: event.path.clone(),
                }
            }
            Scope::Act(action) => {
                actions.insert(action);
            }
            Scope::Ignore => {}
        }
    }
    BatchOutcome::Actions(actions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn modified(path: &str) -> ChangeEvent {
        ChangeEvent {
            path: path.to_string(),
            kind: ChangeKind::Modified,
        }
    }

    #[test]
    fn test_extension_paths_reload_regardless_of_depth() {
        for path in ["extensions/fun/a.py", "extensions/fun/deep/nested/b.py"] {
            assert_eq!(
                classify(&modified(path)),
                Scope::Act(Action::ReloadExtension(ExtensionId::Shared("fun".into())))
            );
        }
    }

    #[test]
    fn test_bot_descriptor_restarts_other_bot_files_reload() {
        assert_eq!(
            classify(&modified("bots/main/bot.toml")),
            Scope::Act(Action::RestartBot("main".into()))
        );
        assert_eq!(
            classify(&modified("bots/main/commands.py")),
            Scope::Act(Action::ReloadExtension(ExtensionId::Custom("main".into())))
        );
    }

    #[test]
    fn test_core_paths_are_fatal() {
        for path in ["client/gateway.py", "utils/models.py", "main.py", "project.toml"] {
            assert_eq!(classify(&modified(path)), Scope::Fatal, "{path}");
        }
    }

    #[test]
    fn test_non_modify_is_fatal_regardless_of_path() {
        let event = ChangeEvent {
            path: "extensions/fun/a.py".to_string(),
            kind: ChangeKind::Other,
        };
        assert_eq!(classify(&event), Scope::Fatal);
    }

    #[test]
    fn test_watch_artifacts_are_stripped() {
        assert_eq!(
            classify(&modified("/srv/deploy/./bots/main/bot.toml")),
            Scope::Act(Action::RestartBot("main".into()))
        );
        assert_eq!(classify(&modified("./main.py")), Scope::Fatal);
    }

    #[test]
    fn test_everything_else_is_ignored() {
        for path in ["README.md", "bots/main", "extensions/fun", "data/cache.bin"] {
            assert_eq!(classify(&modified(path)), Scope::Ignore, "{path}");
        }
    }

    #[test]
    fn test_batch_dedupes_per_target() {
        let events = vec![
            modified("extensions/foo/a.py"),
            modified("extensions/foo/b.py"),
            modified("bots/main/bot.toml"),
            modified("bots/main/bot.toml"),
        ];
        let BatchOutcome::Actions(actions) = classify_batch(&events) else {
            panic!("batch should not be fatal");
        };
        assert_eq!(actions.len(), 2);
        assert_eq!(
            actions[0],
            Action::ReloadExtension(ExtensionId::Shared("foo".into()))
        );
        assert_eq!(actions[1], Action::RestartBot("main".into()));
    }

    #[test]
    fn test_fatal_short_circuits_batch() {
        let events = vec![
            modified("extensions/foo/a.py"),
            modified("utils/models.py"),
            modified("extensions/bar/b.py"),
        ];
        assert_eq!(
            classify_batch(&events),
            BatchOutcome::Fatal {
                path: "utils/models.py".to_string()
            }
        );
    }
}
