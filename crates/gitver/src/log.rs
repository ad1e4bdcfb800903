//! Commit-log replay: turns the branch history plus hand-authored bump
//! directives into a deterministic semantic version.

use std::path::Path;

use tokio::process::Command;

use crate::error::GitVerError;

/// One history entry, oldest-to-newest order after [`read_commits`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub hash: String,
    pub message: String,
}

/// Enumerate the full history via `git log --pretty=oneline`, reversed to
/// chronological (oldest first) order for replay.
pub async fn read_commits(repo_root: impl AsRef<Path>) -> Result<Vec<CommitRecord>, GitVerError> {
    let output = Command::new("git")
        .args(["log", "--pretty=oneline"])
        .current_dir(repo_root.as_ref())
        .output()
        .await?;
    if !output.status.success() {
        return Err(GitVerError::GitLog(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut commits: Vec<CommitRecord> = stdout
        .lines()
        .filter_map(|line| {
            let (hash, message) = line.split_once(' ')?;
            Some(CommitRecord {
                hash: hash.to_string(),
                message: message.to_string(),
            })
        })
        .collect();
    commits.reverse();
    tracing::debug!(commits = commits.len(), "enumerated branch history");
    Ok(commits)
}

/// Replay commit messages onto `start_version`.
///
/// A non-empty `start_commit` discards every commit up to and including the
/// match; a start commit absent from the history is a hard error rather than
/// a silently inflated version. Messages bump by case-insensitive prefix:
/// "major" resets minor/patch, "minor" resets patch, and everything else is
/// a patch bump, so every surviving commit advances the version.
pub fn replay(
    commits: &[CommitRecord],
    start_commit: &str,
    start_version: [u64; 3],
) -> Result<[u64; 3], GitVerError> {
    let remaining = if start_commit.is_empty() {
        commits
    } else {
        let idx = commits
            .iter()
            .position(|c| c.hash == start_commit)
            .ok_or_else(|| GitVerError::StartCommitNotFound(start_commit.to_string()))?;
        &commits[idx + 1..]
    };

    let mut version = start_version;
    for commit in remaining {
        let message = commit.message.trim().to_lowercase();
        if message.starts_with("major") {
            version = [version[0] + 1, 0, 0];
        } else if message.starts_with("minor") {
            version = [version[0], version[1] + 1, 0];
        } else {
            version[2] += 1;
        }
    }
    Ok(version)
}

/// Full computation: enumerate, filter, replay.
pub async fn compute(
    repo_root: impl AsRef<Path>,
    start_commit: &str,
    start_version: [u64; 3],
) -> Result<[u64; 3], GitVerError> {
    let commits = read_commits(repo_root).await?;
    replay(&commits, start_commit, start_version)
}
