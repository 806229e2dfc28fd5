use codeforge_core::TaskStatus;

use crate::error::{OrchestratorError, Result};

/// Explicit transition table for the task workflow.
///
/// `Failed` is reachable from every pre-terminal state (safety
/// rejection, assessment error, executor/timeout/infra failure, and the
/// catch-all around the quality gate); every terminal outcome ends in
/// `Completed` once the result is finalized.
pub struct WorkflowStateMachine;

impl WorkflowStateMachine {
    pub fn validate_transition(from: &TaskStatus, to: &TaskStatus) -> Result<()> {
        let allowed = Self::allowed_transitions(from);

        if allowed.contains(to) {
            Ok(())
        } else {
            Err(OrchestratorError::InvalidTransition {
                from: from.as_str().to_string(),
                to: to.as_str().to_string(),
            })
        }
    }

    fn allowed_transitions(from: &TaskStatus) -> Vec<TaskStatus> {
        match from {
            TaskStatus::Pending => vec![TaskStatus::Assessing, TaskStatus::Failed],
            TaskStatus::Assessing => vec![TaskStatus::Executing, TaskStatus::Failed],
            TaskStatus::Executing => vec![TaskStatus::QualityGate, TaskStatus::Failed],
            TaskStatus::QualityGate => vec![
                TaskStatus::Approved,
                TaskStatus::Executing,
                TaskStatus::Rejected,
                TaskStatus::Failed,
            ],
            TaskStatus::Approved => vec![TaskStatus::Completed],
            TaskStatus::Rejected => vec![TaskStatus::Completed],
            TaskStatus::Failed => vec![TaskStatus::Completed],
            TaskStatus::Completed => vec![],
        }
    }

    pub fn can_transition(from: &TaskStatus, to: &TaskStatus) -> bool {
        Self::validate_transition(from, to).is_ok()
    }
}
