pub mod domain;
pub mod error;
pub mod safety;

pub use domain::result::{AgentKind, CodingResult, FileChange, FileStatus, TaskStatus};
pub use domain::task::{
    AutonomyLevel, CodingTask, Complexity, CostSensitivity, RepoAccessMode, RepoRef,
};
pub use error::CoreError;
pub use safety::{SafetyValidator, SafetyVerdict};
