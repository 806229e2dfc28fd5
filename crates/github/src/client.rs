use async_trait::async_trait;
use octocrab::params::repos::Reference;
use octocrab::Octocrab;
use tracing::{debug, info};

use codeforge_core::RepoRef;

use crate::error::{GitHubError, Result};
use crate::types::{CreatePrRequest, PullRequest, SourceHost};

pub struct GitHubClient {
    octocrab: Octocrab,
}

impl GitHubClient {
    pub fn new(token: &str) -> Result<Self> {
        let octocrab = Octocrab::builder()
            .personal_token(token.to_string())
            .build()
            .map_err(|e| GitHubError::Config(e.to_string()))?;

        Ok(Self { octocrab })
    }

    pub fn from_env() -> Result<Self> {
        let token = std::env::var("GITHUB_TOKEN")
            .map_err(|_| GitHubError::Authentication("GITHUB_TOKEN not set".to_string()))?;
        Self::new(&token)
    }

    fn convert_pr(pr: octocrab::models::pulls::PullRequest) -> PullRequest {
        PullRequest {
            number: pr.number,
            title: pr.title.unwrap_or_default(),
            head_branch: pr.head.ref_field,
            base_branch: pr.base.ref_field,
            html_url: pr.html_url.map(|u| u.to_string()).unwrap_or_default(),
            created_at: pr.created_at.unwrap_or_default(),
        }
    }
}

#[async_trait]
impl SourceHost for GitHubClient {
    async fn branch_sha(&self, repo: &RepoRef, branch: &str) -> Result<String> {
        debug!("Resolving tip of {}#{}", repo.full_name(), branch);

        let reference = self
            .octocrab
            .repos(&repo.owner, &repo.name)
            .get_ref(&Reference::Branch(branch.to_string()))
            .await
            .map_err(|e| match &e {
                octocrab::Error::GitHub { source, .. } if source.message.contains("Not Found") => {
                    GitHubError::BranchNotFound(branch.to_string())
                }
                _ => GitHubError::from(e),
            })?;

        match reference.object {
            octocrab::models::repos::Object::Commit { sha, .. } => Ok(sha),
            octocrab::models::repos::Object::Tag { sha, .. } => Ok(sha),
            _ => Err(GitHubError::Api(format!(
                "unexpected ref object for branch {}",
                branch
            ))),
        }
    }

    async fn create_branch(&self, repo: &RepoRef, branch: &str, sha: &str) -> Result<()> {
        info!("Creating branch {} in {}", branch, repo.full_name());

        let result = self
            .octocrab
            .repos(&repo.owner, &repo.name)
            .create_ref(&Reference::Branch(branch.to_string()), sha)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let mapped = GitHubError::from(e);
                if let GitHubError::Api(msg) = &mapped {
                    if msg.contains("already exists") {
                        debug!("Branch {} already exists, reusing", branch);
                        return Ok(());
                    }
                }
                Err(mapped)
            }
        }
    }

    async fn create_pull_request(
        &self,
        repo: &RepoRef,
        request: CreatePrRequest,
    ) -> Result<PullRequest> {
        info!(
            "Creating PR: {} ({} -> {})",
            request.title, request.head, request.base
        );

        let pr = self
            .octocrab
            .pulls(&repo.owner, &repo.name)
            .create(&request.title, &request.head, &request.base)
            .body(&request.body)
            .draft(request.draft)
            .send()
            .await?;

        Ok(Self::convert_pr(pr))
    }
}
