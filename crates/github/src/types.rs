use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use codeforge_core::RepoRef;

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePrRequest {
    pub title: String,
    pub body: String,
    pub base: String,
    pub head: String,
    pub draft: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub head_branch: String,
    pub base_branch: String,
    pub html_url: String,
    pub created_at: DateTime<Utc>,
}

/// Operations the engine needs from the source-control host.
#[async_trait]
pub trait SourceHost: Send + Sync {
    /// SHA of the named branch's tip.
    async fn branch_sha(&self, repo: &RepoRef, branch: &str) -> Result<String>;

    /// Create a branch pointing at `sha`. An already-existing branch is
    /// not an error.
    async fn create_branch(&self, repo: &RepoRef, branch: &str, sha: &str) -> Result<()>;

    async fn create_pull_request(
        &self,
        repo: &RepoRef,
        request: CreatePrRequest,
    ) -> Result<PullRequest>;
}
