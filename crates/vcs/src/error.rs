use thiserror::Error;

#[derive(Debug, Error)]
pub enum VcsError {
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Workspace not found for task: {0}")]
    WorkspaceNotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Unsupported access mode for local workspaces: {0}")]
    UnsupportedMode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, VcsError>;
