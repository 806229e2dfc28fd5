use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Task id must not be empty")]
    EmptyTaskId,

    #[error("Task description must not be empty")]
    EmptyDescription,

    #[error("Validation error: {0}")]
    Validation(String),
}
