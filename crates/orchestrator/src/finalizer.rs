use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use codeforge_core::{CodingResult, CodingTask, TaskStatus};
use events::{Event, EventBus, EventEnvelope};

use crate::audit::{DecisionRecord, DecisionStore};
use crate::config::EngineConfig;
use crate::quality_gate::{GateOutcome, PrOutcome, QualityGate};

/// Finalizes a terminal result: requests PR creation for approvals and
/// always writes an audit decision record.
pub struct ResultFinalizer {
    gate: Arc<QualityGate>,
    decisions: Arc<dyn DecisionStore>,
    events: Option<EventBus>,
    config: Arc<EngineConfig>,
}

impl ResultFinalizer {
    pub fn new(
        gate: Arc<QualityGate>,
        decisions: Arc<dyn DecisionStore>,
        events: Option<EventBus>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            gate,
            decisions,
            events,
            config,
        }
    }

    pub async fn finalize(
        &self,
        task: &CodingTask,
        result: &mut CodingResult,
        outcome: Option<&GateOutcome>,
    ) {
        if result.status == TaskStatus::Approved {
            if let Some(outcome) = outcome {
                let branch = self.config.branch_for(task);
                match self
                    .gate
                    .create_pr_if_approved(task, outcome, Some(&branch))
                    .await
                {
                    Ok(PrOutcome::Created { number, url }) => {
                        info!(
                            task_id = %task.task_id,
                            pr_number = number,
                            url = %url,
                            "Created pull request"
                        );
                        result.pr_number = Some(number);
                    }
                    Ok(PrOutcome::Skipped { reason }) => {
                        warn!(task_id = %task.task_id, reason = %reason, "PR creation skipped");
                    }
                    Err(e) => {
                        warn!(task_id = %task.task_id, error = %e, "Failed to create pull request");
                    }
                }
            }
        }

        result.completed_at = Some(Utc::now());

        // Audit write is fire-and-forget; a failing store never blocks
        // the workflow.
        let record = DecisionRecord {
            agent_name: result.agent_used.as_str().to_string(),
            decision_type: "code_generation".to_string(),
            reasoning: format!("Executed coding task {}", task.task_id),
            outcome: format!(
                "status={}, files={}",
                result.status.as_str(),
                result.files_modified.len()
            ),
            context: serde_json::json!({
                "task_id": task.task_id,
                "agent_used": result.agent_used.as_str(),
                "files_modified": result.files_modified.iter().map(|f| f.path.clone()).collect::<Vec<_>>(),
                "pr_number": result.pr_number,
                "retry_count": result.retry_count,
            }),
            recorded_at: Utc::now(),
        };
        if let Err(e) = self.decisions.append(record).await {
            warn!(task_id = %task.task_id, error = %e, "Failed to record audit decision");
        }

        if let Some(bus) = &self.events {
            bus.publish(EventEnvelope::new(Event::TaskFinalized {
                task_id: task.task_id.clone(),
                status: result.status.as_str().to_string(),
                pr_number: result.pr_number,
            }));
        }

        info!(
            task_id = %task.task_id,
            status = result.status.as_str(),
            files = result.files_modified.len(),
            pr_number = ?result.pr_number,
            retry_count = result.retry_count,
            "Task finalized"
        );
    }
}
