use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Task rejected by safety validation: {0}")]
    Validation(String),

    #[error("Assessment failed: {0}")]
    Assessment(String),

    #[error("Execution failed: {0}")]
    Execution(String),

    #[error("Execution timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Infrastructure error: {0}")]
    Infrastructure(String),

    #[error("Quality gate rejected the task after {retries} retries")]
    GateRejected { retries: u32 },

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Oracle error: {0}")]
    Oracle(String),

    #[error("Sandbox error: {0}")]
    Sandbox(#[from] sandbox::SandboxError),

    #[error("VCS error: {0}")]
    Vcs(#[from] vcs::VcsError),

    #[error("Source host error: {0}")]
    GitHub(#[from] github::GitHubError),
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
