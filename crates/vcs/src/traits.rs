use std::path::{Path, PathBuf};

use async_trait::async_trait;

use codeforge_core::{CodingTask, RepoAccessMode};

use crate::error::Result;

/// Outcome of publishing a workspace's changes to the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    pub commit_hash: String,
    pub branch: String,
    /// False when the commit landed locally but the push was refused.
    pub pushed: bool,
}

/// Trait for obtaining and publishing task workspaces.
///
/// The executor only sees this seam; the git-backed implementation lives
/// in [`crate::workspace::GitWorkspaceManager`] and tests substitute an
/// in-memory one.
#[async_trait]
pub trait WorkspaceProvider: Send + Sync {
    /// Prepare a local workspace for the task under the given access
    /// mode. Returns `None` for modes that need no local checkout.
    async fn prepare(&self, task: &CodingTask, mode: RepoAccessMode) -> Result<Option<PathBuf>>;

    /// Commit everything in the workspace on `branch` and push it.
    async fn publish_changes(
        &self,
        task: &CodingTask,
        workspace: &Path,
        branch: &str,
        message: &str,
    ) -> Result<CommitOutcome>;
}
