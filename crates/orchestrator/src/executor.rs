use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use codeforge_core::{AgentKind, CodingResult, CodingTask, RepoAccessMode, TaskStatus};
use events::{Event, EventBus, EventEnvelope};
use github::{CreatePrRequest, SourceHost};
use sandbox::{SandboxError, SandboxManager};
use vcs::WorkspaceProvider;

use crate::config::EngineConfig;
use crate::strategy::select_strategy;

/// Turns a task plus an agent command into a [`CodingResult`].
///
/// All failure modes are normalized into the result record rather than
/// propagated: the workflow inspects `result.status`. Containers created
/// here are cleaned up on every exit path; timeouts and runtime errors
/// force-remove.
pub struct SandboxExecutor {
    sandbox: Arc<SandboxManager>,
    workspaces: Arc<dyn WorkspaceProvider>,
    host: Arc<dyn SourceHost>,
    config: Arc<EngineConfig>,
    events: Option<EventBus>,
}

impl SandboxExecutor {
    pub fn new(
        sandbox: Arc<SandboxManager>,
        workspaces: Arc<dyn WorkspaceProvider>,
        host: Arc<dyn SourceHost>,
        config: Arc<EngineConfig>,
        events: Option<EventBus>,
    ) -> Self {
        Self {
            sandbox,
            workspaces,
            host,
            config,
            events,
        }
    }

    pub fn sandbox(&self) -> &SandboxManager {
        &self.sandbox
    }

    fn publish(&self, event: Event) {
        if let Some(bus) = &self.events {
            bus.publish(EventEnvelope::new(event));
        }
    }

    /// Run one execution attempt under the task's selected strategy.
    pub async fn run(&self, task: &CodingTask, kind: AgentKind, command: Vec<String>) -> CodingResult {
        let strategy = select_strategy(task);
        info!(
            task_id = %task.task_id,
            strategy = strategy.as_str(),
            "Selected repository access strategy"
        );

        match strategy {
            RepoAccessMode::GithubCli => self.execute_remote(task, kind).await,
            mode => self.execute_in_container(task, kind, mode, command).await,
        }
    }

    /// No-clone path: create a branch from the base tip and open a draft
    /// PR carrying the task description. Work happens asynchronously on
    /// the host side, so the attempt returns with status `Executing`.
    async fn execute_remote(&self, task: &CodingTask, kind: AgentKind) -> CodingResult {
        let started_at = Utc::now();
        let mut result = CodingResult::new(&task.task_id, kind);
        result.started_at = Some(started_at);

        let branch = self.config.branch_for(task);

        let outcome: github::Result<github::PullRequest> = async {
            let sha = self
                .host
                .branch_sha(&task.repository, &task.base_branch)
                .await?;
            self.host
                .create_branch(&task.repository, &branch, &sha)
                .await?;

            let request = CreatePrRequest {
                title: truncate(&task.description, 100),
                body: format!(
                    "Coding task: {}\n\nTask ID: {}",
                    task.description, task.task_id
                ),
                base: task.base_branch.clone(),
                head: branch.clone(),
                draft: true,
            };
            self.host
                .create_pull_request(&task.repository, request)
                .await
        }
        .await;

        match outcome {
            Ok(pr) => {
                info!(
                    task_id = %task.task_id,
                    pr_number = pr.number,
                    branch = %branch,
                    "Opened draft PR via host API"
                );
                result.pr_number = Some(pr.number);
                result.status = TaskStatus::Executing;
            }
            Err(e) => {
                error!(task_id = %task.task_id, error = %e, "Host API execution failed");
                result.status = TaskStatus::Failed;
                result.record_error(format!("Host API execution failed: {}", e));
            }
        }

        Self::stamp_completion(&mut result, started_at);
        result
    }

    async fn execute_in_container(
        &self,
        task: &CodingTask,
        kind: AgentKind,
        mode: RepoAccessMode,
        command: Vec<String>,
    ) -> CodingResult {
        let started_at = Utc::now();
        let mut result = CodingResult::new(&task.task_id, kind);
        result.started_at = Some(started_at);

        let workspace = match self.workspaces.prepare(task, mode).await {
            Ok(Some(path)) => path,
            Ok(None) => {
                result.status = TaskStatus::Failed;
                result.record_error("Workspace provider returned no path for a local strategy");
                Self::stamp_completion(&mut result, started_at);
                return result;
            }
            Err(e) => {
                error!(task_id = %task.task_id, error = %e, "Workspace preparation failed");
                result.status = TaskStatus::Failed;
                result.record_error(format!("Workspace preparation failed: {}", e));
                Self::stamp_completion(&mut result, started_at);
                return result;
            }
        };

        let mut env = vec![
            ("TASK_DESCRIPTION".to_string(), task.description.clone()),
            (
                "CLAUDE_DEFAULT_MODEL".to_string(),
                self.config.model_id.clone(),
            ),
        ];
        for key in ["ANTHROPIC_API_KEY", "GITHUB_TOKEN"] {
            if let Ok(value) = std::env::var(key) {
                if !value.is_empty() {
                    env.push((key.to_string(), value));
                }
            }
        }

        let container_id = match self
            .sandbox
            .create(
                &task.task_id,
                Some(&workspace),
                command,
                env,
                self.config.network_mode(),
            )
            .await
        {
            Ok(id) => id,
            Err(e) => {
                error!(task_id = %task.task_id, error = %e, "Container creation failed");
                result.status = TaskStatus::Failed;
                result.record_error(format!("Container creation failed: {}", e));
                Self::stamp_completion(&mut result, started_at);
                return result;
            }
        };

        result.container_id = Some(container_id.clone());
        self.publish(Event::ContainerCreated {
            task_id: task.task_id.clone(),
            container_id: container_id.clone(),
        });

        match self
            .sandbox
            .wait_for_completion(&container_id, task.timeout_seconds)
            .await
        {
            Ok(exit) => {
                if exit.exit_code != 0 {
                    let logs = self.sandbox.logs(&container_id).await.unwrap_or_default();
                    warn!(
                        task_id = %task.task_id,
                        exit_code = exit.exit_code,
                        log_tail = %tail(&logs, 500),
                        "Agent container exited nonzero"
                    );
                }

                result.files_modified = self.sandbox.file_changes(&container_id).await;
                info!(
                    task_id = %task.task_id,
                    files = result.files_modified.len(),
                    "Execution attempt finished"
                );

                if !result.files_modified.is_empty() {
                    let branch = self.config.branch_for(task);
                    let message = format!("[codeforge] {}", truncate(&task.description, 200));
                    match self
                        .workspaces
                        .publish_changes(task, &workspace, &branch, &message)
                        .await
                    {
                        Ok(outcome) => result.commit_hash = Some(outcome.commit_hash),
                        Err(e) => {
                            warn!(task_id = %task.task_id, error = %e, "Failed to commit produced changes");
                        }
                    }
                }

                self.cleanup(task, &container_id, false).await;
                result.status = TaskStatus::Executing;
            }
            Err(SandboxError::Timeout { seconds }) => {
                error!(task_id = %task.task_id, seconds = seconds, "Execution attempt timed out");
                self.cleanup(task, &container_id, true).await;
                result.status = TaskStatus::Failed;
                result.record_error(format!("Execution timed out after {} seconds", seconds));
            }
            Err(e) => {
                error!(task_id = %task.task_id, error = %e, "Container runtime error");
                self.cleanup(task, &container_id, true).await;
                result.status = TaskStatus::Failed;
                result.record_error(format!("Container runtime error: {}", e));
            }
        }

        Self::stamp_completion(&mut result, started_at);
        result
    }

    async fn cleanup(&self, task: &CodingTask, container_id: &str, force: bool) {
        match self.sandbox.cleanup(&task.task_id, force).await {
            Ok(_) => self.publish(Event::ContainerRemoved {
                task_id: task.task_id.clone(),
                container_id: container_id.to_string(),
                forced: force,
            }),
            Err(e) => {
                warn!(task_id = %task.task_id, error = %e, "Container cleanup failed");
            }
        }
    }

    fn stamp_completion(result: &mut CodingResult, started_at: chrono::DateTime<Utc>) {
        let completed_at = Utc::now();
        result.completed_at = Some(completed_at);
        result.execution_time_seconds =
            (completed_at - started_at).num_milliseconds() as f64 / 1000.0;
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", cut)
}

fn tail(text: &str, max_chars: usize) -> &str {
    let count = text.chars().count();
    if count <= max_chars {
        return text;
    }
    let skip = count - max_chars;
    match text.char_indices().nth(skip) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}
