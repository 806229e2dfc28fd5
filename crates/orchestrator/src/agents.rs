//! Agent implementations, one per executor tag.
//!
//! Each agent owns its CLI command construction; the container lifecycle
//! is shared through [`SandboxExecutor`]. [`MockAgent`] is the
//! first-class test double behind the same interface.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use codeforge_core::{
    AgentKind, AutonomyLevel, CodingResult, CodingTask, FileChange, FileStatus, TaskStatus,
};

use crate::executor::SandboxExecutor;
use crate::prompts::TaskPrompts;

/// One execution attempt. Failures are captured in the returned result's
/// status and errors, never panicked or propagated.
#[async_trait]
pub trait TaskAgent: Send + Sync {
    fn kind(&self) -> AgentKind;

    /// Execute the task; `feedback` carries the previous attempt's
    /// quality-gate feedback on retries.
    async fn execute(&self, task: &CodingTask, feedback: Option<&str>) -> CodingResult;
}

fn attempt_prompt(task: &CodingTask, feedback: Option<&str>) -> String {
    match feedback {
        Some(feedback) => TaskPrompts::retry_with_feedback(task, feedback),
        None => task.description.clone(),
    }
}

/// Claude Code CLI in a sandbox container.
pub struct ClaudeCodeAgent {
    executor: Arc<SandboxExecutor>,
}

impl ClaudeCodeAgent {
    pub fn new(executor: Arc<SandboxExecutor>) -> Self {
        Self { executor }
    }

    fn command(task: &CodingTask, prompt: &str) -> Vec<String> {
        let mut command = vec!["claude".to_string(), "--yes".to_string()];

        // Tool access scoped by autonomy level; fully autonomous runs
        // unrestricted.
        match task.autonomy_level {
            AutonomyLevel::Supervised => {
                command.push("--allowedTools".to_string());
                command.push("read,view".to_string());
            }
            AutonomyLevel::SemiAutonomous => {
                command.push("--allowedTools".to_string());
                command.push("read,view,write,bash,edit".to_string());
            }
            AutonomyLevel::FullyAutonomous => {}
        }

        command.push("--append-system-prompt".to_string());
        command.push(TaskPrompts::system().to_string());
        command.push("-p".to_string());
        command.push(prompt.to_string());
        command
    }
}

#[async_trait]
impl TaskAgent for ClaudeCodeAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::ClaudeCode
    }

    async fn execute(&self, task: &CodingTask, feedback: Option<&str>) -> CodingResult {
        let prompt = attempt_prompt(task, feedback);
        self.executor
            .run(task, self.kind(), Self::command(task, &prompt))
            .await
    }
}

/// Aider CLI in a sandbox container.
pub struct AiderAgent {
    executor: Arc<SandboxExecutor>,
    model_id: String,
}

impl AiderAgent {
    pub fn new(executor: Arc<SandboxExecutor>, model_id: impl Into<String>) -> Self {
        Self {
            executor,
            model_id: model_id.into(),
        }
    }

    fn command(&self, prompt: &str) -> Vec<String> {
        vec![
            "aider".to_string(),
            "--yes-always".to_string(),
            // commits are handled by the executor after diff capture
            "--no-auto-commits".to_string(),
            "--model".to_string(),
            self.model_id.clone(),
            "--message".to_string(),
            prompt.to_string(),
        ]
    }
}

#[async_trait]
impl TaskAgent for AiderAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Aider
    }

    async fn execute(&self, task: &CodingTask, feedback: Option<&str>) -> CodingResult {
        let prompt = attempt_prompt(task, feedback);
        self.executor
            .run(task, self.kind(), self.command(&prompt))
            .await
    }
}

/// Simulates code generation without a container runtime.
#[derive(Default)]
pub struct MockAgent;

#[async_trait]
impl TaskAgent for MockAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Mock
    }

    async fn execute(&self, task: &CodingTask, _feedback: Option<&str>) -> CodingResult {
        let started_at = Utc::now();
        let mut result = CodingResult::new(&task.task_id, self.kind());
        result.started_at = Some(started_at);

        if task.description.to_lowercase().contains("endpoint") {
            result.files_modified = vec![FileChange {
                path: "src/api/endpoints.rs".to_string(),
                status: FileStatus::Modified,
                additions: 15,
                deletions: 2,
                patch: String::new(),
            }];
        }

        result.status = TaskStatus::Executing;
        result.completed_at = Some(Utc::now());
        result
    }
}

/// Factory keyed on the executor tag. `Custom` has no dedicated
/// implementation and falls back to the mock.
pub fn agent_for(
    kind: AgentKind,
    executor: Arc<SandboxExecutor>,
    model_id: &str,
) -> Arc<dyn TaskAgent> {
    match kind {
        AgentKind::ClaudeCode => Arc::new(ClaudeCodeAgent::new(executor)),
        AgentKind::Aider => Arc::new(AiderAgent::new(executor, model_id)),
        AgentKind::Mock | AgentKind::Custom => Arc::new(MockAgent),
    }
}
