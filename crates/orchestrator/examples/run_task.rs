//! Run a coding task through the engine with the mock agent.
//!
//! ```sh
//! cargo run -p orchestrator --example run_task
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use codeforge_core::{AgentKind, CodingResult, CodingTask, RepoRef};
use events::EventBus;
use github::{CreatePrRequest, PullRequest, SourceHost};
use orchestrator::{
    CodingEngine, EngineConfig, EngineDependencies, MemoryDecisionStore, Review, ReviewOracle,
};
use sandbox::testing::StubRuntime;
use vcs::GitWorkspaceManager;

/// Host stand-in so the demo runs without credentials.
struct DemoHost;

#[async_trait]
impl SourceHost for DemoHost {
    async fn branch_sha(&self, _repo: &RepoRef, _branch: &str) -> github::Result<String> {
        Ok("demo-sha".to_string())
    }

    async fn create_branch(&self, _repo: &RepoRef, _branch: &str, _sha: &str) -> github::Result<()> {
        Ok(())
    }

    async fn create_pull_request(
        &self,
        _repo: &RepoRef,
        request: CreatePrRequest,
    ) -> github::Result<PullRequest> {
        Ok(PullRequest {
            number: 1,
            title: request.title,
            head_branch: request.head,
            base_branch: request.base,
            html_url: "https://example.test/pr/1".to_string(),
            created_at: chrono::Utc::now(),
        })
    }
}

struct ApproveEverything;

#[async_trait]
impl ReviewOracle for ApproveEverything {
    async fn review(
        &self,
        _task: &CodingTask,
        _result: &CodingResult,
    ) -> orchestrator::Result<Review> {
        Ok(Review::approve("demo review: changes look fine"))
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let events = EventBus::new();
    let mut event_rx = events.subscribe();
    tokio::spawn(async move {
        while let Ok(envelope) = event_rx.recv().await {
            println!("event: {}", serde_json::to_string(&envelope.event).unwrap_or_default());
        }
    });

    let engine = CodingEngine::new(EngineDependencies {
        runtime: Arc::new(StubRuntime::new()),
        workspaces: Arc::new(GitWorkspaceManager::new(PathBuf::from(
            ".codeforge/workspaces",
        ))),
        host: Arc::new(DemoHost),
        assessment: None,
        review: Arc::new(ApproveEverything),
        decisions: Arc::new(MemoryDecisionStore::new()),
        events: Some(events),
        config: EngineConfig::default(),
        agent: AgentKind::Mock,
    });

    let task = CodingTask::new(
        "demo-0001",
        "Add an endpoint returning build metadata",
        RepoRef::new("acme", "widgets"),
    );

    let result = engine.execute(task).await;

    println!(
        "\nfinal result:\n{}",
        serde_json::to_string_pretty(&result).unwrap_or_default()
    );
}
