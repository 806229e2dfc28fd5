use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{info, warn};

use codeforge_core::{CodingTask, RepoAccessMode};

use crate::error::{Result, VcsError};
use crate::git;
use crate::traits::{CommitOutcome, WorkspaceProvider};

/// Git-backed workspace manager.
///
/// Clone-on-demand workspaces live under `<root>/<task_id>` and are
/// recreated from scratch for every attempt; persistent workspaces live
/// under `<root>/<owner>_<repo>` and are fetched before reuse.
pub struct GitWorkspaceManager {
    root: PathBuf,
    token: Option<String>,
}

impl GitWorkspaceManager {
    pub fn new(root: PathBuf) -> Self {
        Self { root, token: None }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Read the host token from `GITHUB_TOKEN` when present.
    pub fn from_env(root: PathBuf) -> Self {
        let token = std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty());
        Self { root, token }
    }

    fn task_workspace(&self, task: &CodingTask) -> PathBuf {
        self.root.join(&task.task_id)
    }

    fn persistent_workspace(&self, task: &CodingTask) -> PathBuf {
        self.root
            .join(task.repository.full_name().replace('/', "_"))
    }

    async fn clone_on_demand(&self, task: &CodingTask) -> Result<PathBuf> {
        let workspace = self.task_workspace(task);

        // A leftover directory from a crashed attempt must not poison
        // this one.
        if workspace.exists() {
            warn!(path = %workspace.display(), "Removing stale workspace");
            tokio::fs::remove_dir_all(&workspace).await?;
        }
        tokio::fs::create_dir_all(&self.root).await?;

        let url = task.repository.clone_url(self.token.as_deref());
        git::clone_shallow(&url, &task.base_branch, &workspace).await?;

        info!(
            repository = %task.repository,
            path = %workspace.display(),
            "Cloned repository for task"
        );
        Ok(workspace)
    }

    async fn reuse_persistent(&self, task: &CodingTask) -> Result<PathBuf> {
        let workspace = self.persistent_workspace(task);

        if !workspace.exists() {
            tokio::fs::create_dir_all(&self.root).await?;
            let url = task.repository.clone_url(self.token.as_deref());
            git::clone_shallow(&url, &task.base_branch, &workspace).await?;
            info!(
                repository = %task.repository,
                path = %workspace.display(),
                "Seeded persistent workspace"
            );
        } else {
            git::fetch_origin(&workspace).await?;
            info!(path = %workspace.display(), "Reusing persistent workspace");
        }

        Ok(workspace)
    }
}

#[async_trait]
impl WorkspaceProvider for GitWorkspaceManager {
    async fn prepare(&self, task: &CodingTask, mode: RepoAccessMode) -> Result<Option<PathBuf>> {
        match mode {
            RepoAccessMode::CloneOnDemand => Ok(Some(self.clone_on_demand(task).await?)),
            RepoAccessMode::PersistentWorkspace => Ok(Some(self.reuse_persistent(task).await?)),
            RepoAccessMode::GithubCli => Err(VcsError::UnsupportedMode(
                RepoAccessMode::GithubCli.as_str().to_string(),
            )),
        }
    }

    async fn publish_changes(
        &self,
        task: &CodingTask,
        workspace: &Path,
        branch: &str,
        message: &str,
    ) -> Result<CommitOutcome> {
        if !workspace.exists() {
            return Err(VcsError::WorkspaceNotFound(task.task_id.clone()));
        }

        git::checkout_branch(workspace, branch).await?;
        git::stage_all(workspace).await?;
        git::commit(workspace, message).await?;
        let commit_hash = git::head_commit(workspace).await?;

        let pushed = match git::push(workspace, branch).await {
            Ok(()) => true,
            Err(e) => {
                warn!(task_id = %task.task_id, error = %e, "git push failed");
                false
            }
        };

        info!(
            task_id = %task.task_id,
            branch = %branch,
            commit = %commit_hash,
            pushed = pushed,
            "Published workspace changes"
        );

        Ok(CommitOutcome {
            commit_hash,
            branch: branch.to_string(),
            pushed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeforge_core::RepoRef;

    fn manager() -> GitWorkspaceManager {
        GitWorkspaceManager::new(PathBuf::from("/tmp/forge-ws"))
    }

    fn sample_task() -> CodingTask {
        CodingTask::new("task-abc", "desc", RepoRef::new("acme", "widgets"))
    }

    #[test]
    fn test_task_workspace_path() {
        let path = manager().task_workspace(&sample_task());
        assert_eq!(path, PathBuf::from("/tmp/forge-ws/task-abc"));
    }

    #[test]
    fn test_persistent_workspace_path() {
        let path = manager().persistent_workspace(&sample_task());
        assert_eq!(path, PathBuf::from("/tmp/forge-ws/acme_widgets"));
    }

    #[tokio::test]
    async fn test_prepare_rejects_remote_mode() {
        let result = manager()
            .prepare(&sample_task(), RepoAccessMode::GithubCli)
            .await;
        assert!(matches!(result, Err(VcsError::UnsupportedMode(_))));
    }

    #[tokio::test]
    async fn test_publish_requires_existing_workspace() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope");

        let result = manager()
            .publish_changes(&sample_task(), &missing, "branch", "msg")
            .await;
        assert!(matches!(result, Err(VcsError::WorkspaceNotFound(_))));
    }
}
