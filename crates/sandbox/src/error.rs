use thiserror::Error;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("Container runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    #[error("Container command failed: {0}")]
    CommandFailed(String),

    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    #[error("Execution timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("An execution environment already exists for task: {0}")]
    EnvironmentExists(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SandboxError>;
