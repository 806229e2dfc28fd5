//! End-to-end workflow tests against stub collaborators.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use codeforge_core::{
    AgentKind, CodingResult, CodingTask, Complexity, RepoAccessMode, RepoRef, TaskStatus,
};
use events::{Event, EventBus};
use github::{CreatePrRequest, PullRequest, SourceHost};
use orchestrator::{
    CodingEngine, EngineConfig, EngineDependencies, MemoryDecisionStore, Review, ReviewOracle,
};
use sandbox::testing::StubRuntime;
use vcs::{CommitOutcome, WorkspaceProvider};

// ── Doubles ──

struct StubHost {
    branches: Mutex<Vec<String>>,
    prs: Mutex<Vec<CreatePrRequest>>,
}

impl StubHost {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            branches: Mutex::new(Vec::new()),
            prs: Mutex::new(Vec::new()),
        })
    }

    fn pr_count(&self) -> usize {
        self.prs.lock().unwrap().len()
    }

    fn created_branches(&self) -> Vec<String> {
        self.branches.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceHost for StubHost {
    async fn branch_sha(&self, _repo: &RepoRef, _branch: &str) -> github::Result<String> {
        Ok("0123abcd".to_string())
    }

    async fn create_branch(
        &self,
        _repo: &RepoRef,
        branch: &str,
        _sha: &str,
    ) -> github::Result<()> {
        self.branches.lock().unwrap().push(branch.to_string());
        Ok(())
    }

    async fn create_pull_request(
        &self,
        _repo: &RepoRef,
        request: CreatePrRequest,
    ) -> github::Result<PullRequest> {
        let number = 100 + self.prs.lock().unwrap().len() as u64 + 1;
        let head = request.head.clone();
        let base = request.base.clone();
        let title = request.title.clone();
        self.prs.lock().unwrap().push(request);
        Ok(PullRequest {
            number,
            title,
            head_branch: head,
            base_branch: base,
            html_url: format!("https://example.test/pr/{}", number),
            created_at: chrono::Utc::now(),
        })
    }
}

struct StubWorkspaces;

#[async_trait]
impl WorkspaceProvider for StubWorkspaces {
    async fn prepare(
        &self,
        task: &CodingTask,
        _mode: RepoAccessMode,
    ) -> vcs::Result<Option<PathBuf>> {
        Ok(Some(PathBuf::from("/tmp/stub-ws").join(&task.task_id)))
    }

    async fn publish_changes(
        &self,
        _task: &CodingTask,
        _workspace: &Path,
        branch: &str,
        _message: &str,
    ) -> vcs::Result<CommitOutcome> {
        Ok(CommitOutcome {
            commit_hash: "cafebabe1234".to_string(),
            branch: branch.to_string(),
            pushed: true,
        })
    }
}

struct ScriptedReview {
    responses: Mutex<VecDeque<Review>>,
    calls: AtomicUsize,
}

impl ScriptedReview {
    fn with(responses: Vec<Review>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReviewOracle for ScriptedReview {
    async fn review(
        &self,
        _task: &CodingTask,
        _result: &CodingResult,
    ) -> orchestrator::Result<Review> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Review::approve("default approval")))
    }
}

// ── Harness ──

struct Harness {
    engine: CodingEngine,
    runtime: Arc<StubRuntime>,
    host: Arc<StubHost>,
    reviews: Arc<ScriptedReview>,
    decisions: Arc<MemoryDecisionStore>,
    events: EventBus,
}

fn harness(runtime: StubRuntime, reviews: Vec<Review>, agent: AgentKind) -> Harness {
    let runtime = Arc::new(runtime);
    let host = StubHost::new();
    let reviews = ScriptedReview::with(reviews);
    let decisions = Arc::new(MemoryDecisionStore::new());
    let events = EventBus::new();

    let engine = CodingEngine::new(EngineDependencies {
        runtime: runtime.clone(),
        workspaces: Arc::new(StubWorkspaces),
        host: host.clone(),
        assessment: None,
        review: reviews.clone(),
        decisions: decisions.clone(),
        events: Some(events.clone()),
        config: EngineConfig::default(),
        agent,
    });

    Harness {
        engine,
        runtime,
        host,
        reviews,
        decisions,
        events,
    }
}

fn task(id: &str) -> CodingTask {
    CodingTask::new(id, "Refactor the retry logic", RepoRef::new("acme", "widgets"))
}

// ── Safety ──

#[tokio::test]
async fn unsafe_task_never_creates_a_container() {
    let h = harness(StubRuntime::new(), vec![], AgentKind::ClaudeCode);
    let task = CodingTask::new(
        "t-unsafe",
        "delete all user records from production",
        RepoRef::new("acme", "widgets"),
    );

    let result = h.engine.execute(task).await;

    assert_eq!(result.status, TaskStatus::Failed);
    assert!(result.errors[0].contains("risky"));
    assert_eq!(h.runtime.created_count(), 0);
    assert_eq!(h.engine.sandbox().active_count(), 0);
}

#[tokio::test]
async fn supervised_task_is_blocked() {
    let h = harness(StubRuntime::new(), vec![], AgentKind::ClaudeCode);
    let task = task("t-supervised")
        .with_autonomy(codeforge_core::AutonomyLevel::Supervised);

    let result = h.engine.execute(task).await;

    assert_eq!(result.status, TaskStatus::Failed);
    assert!(result.errors[0].contains("supervised"));
    assert_eq!(h.runtime.created_count(), 0);
}

// ── Happy path ──

#[tokio::test]
async fn approved_flow_creates_pr_and_cleans_up() {
    let runtime = StubRuntime::new().with_diff("M\tsrc/lib.rs\n");
    let h = harness(runtime, vec![Review::approve("clean change")], AgentKind::ClaudeCode);

    let result = h.engine.execute(task("t-approved")).await;

    assert_eq!(result.status, TaskStatus::Approved);
    assert!(result.quality_gate_passed);
    assert_eq!(result.retry_count, 0);
    assert_eq!(result.files_modified.len(), 1);
    assert_eq!(result.commit_hash.as_deref(), Some("cafebabe1234"));
    assert_eq!(result.pr_number, Some(101));
    assert!(result.container_id.is_some());
    assert!(result.completed_at.is_some());

    // container lifecycle: one created, one graceful removal, none leaked
    assert_eq!(h.runtime.created_count(), 1);
    assert_eq!(h.runtime.removed_count(), 1);
    assert_eq!(h.runtime.force_removed_count(), 0);
    assert_eq!(h.engine.sandbox().active_count(), 0);

    // audit record was written
    let records = h.decisions.records();
    assert_eq!(records.len(), 1);
    assert!(records[0].outcome.contains("approved"));
}

#[tokio::test]
async fn status_lookup_returns_finalized_result() {
    let runtime = StubRuntime::new().with_diff("M\tsrc/lib.rs\n");
    let h = harness(runtime, vec![Review::approve("ok")], AgentKind::ClaudeCode);

    h.engine.execute(task("t-status")).await;

    let stored = h.engine.status("t-status").unwrap();
    assert_eq!(stored.status, TaskStatus::Approved);
    assert!(h.engine.status("t-missing").is_none());
}

#[tokio::test]
async fn workflow_publishes_status_transitions() {
    let runtime = StubRuntime::new().with_diff("M\tsrc/lib.rs\n");
    let h = harness(runtime, vec![Review::approve("ok")], AgentKind::ClaudeCode);
    let mut rx = h.events.subscribe();

    h.engine.execute(task("t-events")).await;

    let mut transitions = Vec::new();
    while let Ok(envelope) = rx.try_recv() {
        if let Event::StatusChanged { to_status, .. } = envelope.event {
            transitions.push(to_status);
        }
    }
    assert_eq!(
        transitions,
        vec!["assessing", "executing", "quality_gate", "approved", "completed"]
    );
}

// ── Scenario C: retry budget exhaustion ──

#[tokio::test]
async fn gate_failures_exhaust_retry_budget() {
    let runtime = StubRuntime::new().with_diff("M\tsrc/lib.rs\n");
    let h = harness(
        runtime,
        vec![
            Review::request_changes("attempt 1 insufficient", vec![]),
            Review::request_changes("attempt 2 insufficient", vec![]),
            Review::request_changes("attempt 3 insufficient", vec![]),
        ],
        AgentKind::ClaudeCode,
    );

    let result = h.engine.execute(task("t-rejected").with_max_retries(2)).await;

    assert_eq!(result.status, TaskStatus::Rejected);
    assert_eq!(result.retry_count, 2);
    assert!(result.errors.last().unwrap().contains("after 2 retries"));
    assert_eq!(h.reviews.call_count(), 3);
    assert_eq!(h.runtime.created_count(), 3);
    assert_eq!(h.engine.sandbox().active_count(), 0);
}

#[tokio::test]
async fn retry_attempt_carries_gate_feedback() {
    let runtime = StubRuntime::new().with_diff("M\tsrc/lib.rs\n");
    let h = harness(
        runtime,
        vec![
            Review::request_changes("missing tests for edge cases", vec![]),
            Review::approve("fixed"),
        ],
        AgentKind::ClaudeCode,
    );

    let result = h.engine.execute(task("t-feedback")).await;

    assert_eq!(result.status, TaskStatus::Approved);
    assert_eq!(result.retry_count, 1);

    let specs = h.runtime.created_specs();
    assert_eq!(specs.len(), 2);
    let first_prompt = specs[0].command.join(" ");
    let retry_prompt = specs[1].command.join(" ");
    assert!(!first_prompt.contains("missing tests for edge cases"));
    assert!(retry_prompt.contains("missing tests for edge cases"));
}

// ── Scenario D: timeout ──

#[tokio::test]
async fn timeout_forces_cleanup_and_fails() {
    let runtime = StubRuntime::new().with_timeout();
    let h = harness(runtime, vec![], AgentKind::ClaudeCode);

    let result = h.engine.execute(task("t-timeout").with_timeout(300)).await;

    assert_eq!(result.status, TaskStatus::Failed);
    assert!(result.errors[0].contains("300"));
    assert!(result.errors[0].contains("timed out"));

    // timeouts never reach the gate and never consume retries
    assert_eq!(result.retry_count, 0);
    assert_eq!(h.reviews.call_count(), 0);

    // forced cleanup exactly once
    assert_eq!(h.runtime.force_removed_count(), 1);
    assert_eq!(h.runtime.removed_count(), 1);
    assert_eq!(h.engine.sandbox().active_count(), 0);
}

// ── Scenario E: zero files modified ──

#[tokio::test]
async fn zero_files_short_circuits_the_gate() {
    let runtime = StubRuntime::new(); // empty diff
    let h = harness(runtime, vec![], AgentKind::ClaudeCode);

    let result = h.engine.execute(task("t-nofiles").with_max_retries(0)).await;

    assert_eq!(result.status, TaskStatus::Rejected);
    assert_eq!(result.retry_count, 0);
    assert!(!result.quality_gate_passed);
    assert_eq!(
        result.quality_gate_feedback.as_deref(),
        Some("no files were modified")
    );
    // the review oracle was never consulted
    assert_eq!(h.reviews.call_count(), 0);
}

// ── Infrastructure failures ──

#[tokio::test]
async fn runtime_failure_is_terminal_without_retry() {
    let runtime = StubRuntime::new().with_create_error("docker daemon unreachable");
    let h = harness(runtime, vec![], AgentKind::ClaudeCode);

    let result = h.engine.execute(task("t-infra")).await;

    assert_eq!(result.status, TaskStatus::Failed);
    assert!(result.errors[0].contains("Container creation failed"));
    assert_eq!(h.reviews.call_count(), 0);
    assert_eq!(h.engine.sandbox().active_count(), 0);
}

// ── Remote (no-clone) strategy ──

#[tokio::test]
async fn trivial_task_runs_through_host_api() {
    let h = harness(StubRuntime::new(), vec![], AgentKind::ClaudeCode);
    let task = task("t-remote-0123456")
        .with_complexity(Complexity::Trivial)
        .with_estimated_files(1)
        .with_max_retries(0);

    let result = h.engine.execute(task).await;

    // no container is ever created on this path
    assert_eq!(h.runtime.created_count(), 0);
    // branch from base tip plus one draft PR
    assert_eq!(h.host.created_branches(), vec!["codeforge/t-remote-012".to_string()]);
    assert_eq!(h.host.pr_count(), 1);
    assert_eq!(result.pr_number, Some(101));

    // the host-side work produced no local file changes, so the gate
    // rejects once the (zero) retry budget is spent
    assert_eq!(result.status, TaskStatus::Rejected);
    assert_eq!(h.reviews.call_count(), 0);
}

// ── Mock agent ──

#[tokio::test]
async fn mock_agent_runs_without_any_runtime_calls() {
    let h = harness(StubRuntime::new(), vec![Review::approve("ok")], AgentKind::Mock);
    let task = CodingTask::new(
        "t-mock",
        "Add an endpoint for metrics",
        RepoRef::new("acme", "widgets"),
    );

    let result = h.engine.execute(task).await;

    assert_eq!(result.status, TaskStatus::Approved);
    assert_eq!(result.agent_used, AgentKind::Mock);
    assert_eq!(result.files_modified.len(), 1);
    assert_eq!(h.runtime.created_count(), 0);
}

// ── Resource accounting across many tasks ──

#[tokio::test]
async fn mixed_outcomes_leave_no_live_environments() {
    // success path, several tasks concurrently
    let ok = harness(
        StubRuntime::new().with_diff("M\ta.rs\n"),
        vec![
            Review::approve("a"),
            Review::approve("b"),
            Review::approve("c"),
            Review::approve("d"),
        ],
        AgentKind::ClaudeCode,
    );
    let tasks: Vec<_> = (0..4).map(|i| task(&format!("ok-{}", i))).collect();
    let results =
        futures::future::join_all(tasks.into_iter().map(|t| ok.engine.execute(t))).await;
    assert!(results.iter().all(|r| r.status == TaskStatus::Approved));
    assert_eq!(ok.engine.sandbox().active_count(), 0);

    // timeout path
    let timing_out = harness(StubRuntime::new().with_timeout(), vec![], AgentKind::ClaudeCode);
    timing_out.engine.execute(task("late-1")).await;
    timing_out.engine.execute(task("late-2")).await;
    assert_eq!(timing_out.engine.sandbox().active_count(), 0);

    // rejection path
    let rejecting = harness(
        StubRuntime::new().with_diff("M\ta.rs\n"),
        vec![
            Review::request_changes("no", vec![]),
            Review::request_changes("still no", vec![]),
        ],
        AgentKind::ClaudeCode,
    );
    rejecting
        .engine
        .execute(task("nope").with_max_retries(1))
        .await;
    assert_eq!(rejecting.engine.sandbox().active_count(), 0);
}

#[tokio::test]
async fn every_terminal_status_writes_an_audit_record() {
    let h = harness(StubRuntime::new().with_timeout(), vec![], AgentKind::ClaudeCode);
    h.engine.execute(task("t-audit-1")).await;

    let blocked = CodingTask::new(
        "t-audit-2",
        "wipe the staging database",
        RepoRef::new("acme", "widgets"),
    );
    h.engine.execute(blocked).await;

    let records = h.decisions.records();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.decision_type == "code_generation"));
}
