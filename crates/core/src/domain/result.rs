use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Workflow status of a coding task.
///
/// `Approved`, `Rejected` and `Failed` are terminal outcomes; every path
/// ends in `Completed` once the result has been finalized.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    Assessing,
    Executing,
    QualityGate,
    Approved,
    Rejected,
    Failed,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Assessing => "assessing",
            Self::Executing => "executing",
            Self::QualityGate => "quality_gate",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
            Self::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "assessing" => Some(Self::Assessing),
            "executing" => Some(Self::Executing),
            "quality_gate" => Some(Self::QualityGate),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "failed" => Some(Self::Failed),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    /// Terminal outcomes awaiting finalization.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected | Self::Failed)
    }
}

/// Executor implementation tag.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    #[default]
    ClaudeCode,
    Aider,
    Mock,
    Custom,
}

impl AgentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClaudeCode => "claude_code",
            Self::Aider => "aider",
            Self::Mock => "mock",
            Self::Custom => "custom",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Added,
    Modified,
    Removed,
    Renamed,
}

impl FileStatus {
    /// Map a `git diff --name-status` status letter.
    pub fn from_diff_code(code: char) -> Option<Self> {
        match code {
            'A' => Some(Self::Added),
            'M' => Some(Self::Modified),
            'D' => Some(Self::Removed),
            'R' => Some(Self::Renamed),
            _ => None,
        }
    }
}

/// A single file modification produced by an execution attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileChange {
    pub path: String,
    pub status: FileStatus,
    #[serde(default)]
    pub additions: u32,
    #[serde(default)]
    pub deletions: u32,
    #[serde(default)]
    pub patch: String,
}

impl FileChange {
    pub fn new(path: impl Into<String>, status: FileStatus) -> Self {
        Self {
            path: path.into(),
            status,
            additions: 0,
            deletions: 0,
            patch: String::new(),
        }
    }
}

/// Mutable result record, owned by the workflow instance for the task's
/// lifetime. Becomes immutable once the status reaches `Completed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodingResult {
    pub task_id: String,
    pub agent_used: AgentKind,
    pub status: TaskStatus,

    // Output
    #[serde(default)]
    pub files_modified: Vec<FileChange>,
    pub commit_hash: Option<String>,
    pub pr_number: Option<u64>,

    // Quality gate
    #[serde(default)]
    pub quality_gate_passed: bool,
    pub quality_gate_feedback: Option<String>,

    // Error handling; append-only
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub retry_count: u32,

    // Execution metadata
    #[serde(default)]
    pub execution_time_seconds: f64,
    pub container_id: Option<String>,

    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl CodingResult {
    pub fn new(task_id: impl Into<String>, agent_used: AgentKind) -> Self {
        Self {
            task_id: task_id.into(),
            agent_used,
            status: TaskStatus::Pending,
            files_modified: Vec::new(),
            commit_hash: None,
            pr_number: None,
            quality_gate_passed: false,
            quality_gate_feedback: None,
            errors: Vec::new(),
            retry_count: 0,
            execution_time_seconds: 0.0,
            container_id: None,
            started_at: None,
            completed_at: None,
        }
    }

    /// Append an error message. The list is append-only; earlier attempts'
    /// errors are never discarded.
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Carry forward retry bookkeeping from the previous attempt's result.
    ///
    /// The retry counter must survive across attempts or the bounded-retry
    /// guarantee is lost, and the error history is cumulative: a new
    /// attempt replaces `files_modified` but inherits prior errors.
    pub fn carry_attempt_history(&mut self, previous: &CodingResult) {
        self.retry_count = previous.retry_count;
        if !previous.errors.is_empty() {
            let mut errors = previous.errors.clone();
            errors.append(&mut self.errors);
            self.errors = errors;
        }
    }

    /// Convenience constructor for a terminal failure.
    pub fn failed(
        task_id: impl Into<String>,
        agent_used: AgentKind,
        message: impl Into<String>,
    ) -> Self {
        let mut result = Self::new(task_id, agent_used);
        result.status = TaskStatus::Failed;
        result.record_error(message);
        result
    }
}
