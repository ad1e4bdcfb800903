//! Repository sync run on an authenticated webhook delivery.

use std::path::PathBuf;

use tokio::process::Command;
use tracing::info;

use roost_core::RoostError;

#[async_trait::async_trait]
pub trait RepoSyncer: Send + Sync {
    /// Bring the checkout up to date with the tracked branch.
    async fn sync(&self) -> Result<(), RoostError>;
}

/// Fetch + hard reset to the tracked remote branch. The reset rewrites
/// watched files, so the change monitor picks up the update on its own.
pub struct GitSync {
    repo_root: PathBuf,
    branch: String,
}

impl GitSync {
    pub fn new(repo_root: PathBuf, branch: impl Into<String>) -> Self {
        Self {
            repo_root,
            branch: branch.into(),
        }
    }

    async fn git(&self, args: &[&str]) -> Result<(), RoostError> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_root)
            .output()
            .await?;
        if !output.status.success() {
            return Err(RoostError::Other(format!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl RepoSyncer for GitSync {
    async fn sync(&self) -> Result<(), RoostError> {
        info!(branch = %self.branch, "syncing repository");
        self.git(&["fetch"]).await?;
        self.git(&["reset", "--hard", &format!("origin/{}", self.branch)])
            .await?;
        Ok(())
    }
}
