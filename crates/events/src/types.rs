use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope wrapping all events with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event: Event,
}

impl EventEnvelope {
    pub fn new(event: Event) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Lifecycle events emitted by the task workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A task entered the workflow.
    #[serde(rename = "task.received")]
    TaskReceived {
        task_id: String,
        complexity: String,
    },

    /// A task was rejected by the safety validator.
    #[serde(rename = "task.blocked")]
    TaskBlocked { task_id: String, reason: String },

    /// Workflow status transition.
    #[serde(rename = "task.status_changed")]
    StatusChanged {
        task_id: String,
        from_status: String,
        to_status: String,
    },

    /// An execution container was created for a task.
    #[serde(rename = "container.created")]
    ContainerCreated {
        task_id: String,
        container_id: String,
    },

    /// A task's container was cleaned up.
    #[serde(rename = "container.removed")]
    ContainerRemoved {
        task_id: String,
        container_id: String,
        forced: bool,
    },

    /// The quality gate evaluated an execution attempt.
    #[serde(rename = "gate.evaluated")]
    GateEvaluated {
        task_id: String,
        passed: bool,
        retry_count: u32,
    },

    /// The workflow reached its final state and the result was stored.
    #[serde(rename = "task.finalized")]
    TaskFinalized {
        task_id: String,
        status: String,
        pr_number: Option<u64>,
    },
}

impl Event {
    pub fn task_id(&self) -> &str {
        match self {
            Event::TaskReceived { task_id, .. } => task_id,
            Event::TaskBlocked { task_id, .. } => task_id,
            Event::StatusChanged { task_id, .. } => task_id,
            Event::ContainerCreated { task_id, .. } => task_id,
            Event::ContainerRemoved { task_id, .. } => task_id,
            Event::GateEvaluated { task_id, .. } => task_id,
            Event::TaskFinalized { task_id, .. } => task_id,
        }
    }
}
