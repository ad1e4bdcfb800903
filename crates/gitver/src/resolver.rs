//! Composes the object reader and the log replayer into one version tuple.

use std::path::Path;

use serde::Serialize;

use crate::error::GitVerError;
use crate::{log, object};

/// Resolved deployment version. Computed fresh on every call, never cached.
#[derive(Debug, Clone, Serialize)]
pub struct Version {
    /// "MAJOR.MINOR.PATCH"
    pub semantic: String,
    /// Short (7-character) commit hash.
    pub commit: String,
    pub commit_full: String,
    /// Author timestamp of the branch head, unix seconds.
    pub timestamp: i64,
}

pub async fn resolve(
    repo_root: impl AsRef<Path>,
    branch: &str,
    start_commit: &str,
    start_version: [u64; 3],
) -> Result<Version, GitVerError> {
    let repo_root = repo_root.as_ref();
    let (commit_full, timestamp) = object::read_commit_timestamp(repo_root, branch).await?;
    let version = log::compute(repo_root, start_commit, start_version).await?;

    let resolved = Version {
        semantic: format!("{}.{}.{}", version[0], version[1], version[2]),
        commit: commit_full.chars().take(7).collect(),
        commit_full,
        timestamp,
    };
    tracing::debug!(
        semantic = %resolved.semantic,
        commit = %resolved.commit,
        timestamp = resolved.timestamp,
        "resolved deployment version"
    );
    Ok(resolved)
}
