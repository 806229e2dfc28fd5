//! Decision/audit store collaborator, interface only.
//!
//! Writes are fire-and-forget from the engine's perspective: failures
//! are logged by the caller and never block the workflow.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub agent_name: String,
    pub decision_type: String,
    pub reasoning: String,
    pub outcome: String,
    pub context: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

#[async_trait]
pub trait DecisionStore: Send + Sync {
    async fn append(&self, record: DecisionRecord) -> Result<()>;
}

/// In-memory decision store; the default implementation and the test
/// double.
#[derive(Default)]
pub struct MemoryDecisionStore {
    records: Mutex<Vec<DecisionRecord>>,
}

impl MemoryDecisionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<DecisionRecord> {
        self.records.lock().expect("decision log poisoned").clone()
    }
}

#[async_trait]
impl DecisionStore for MemoryDecisionStore {
    async fn append(&self, record: DecisionRecord) -> Result<()> {
        self.records
            .lock()
            .expect("decision log poisoned")
            .push(record);
        Ok(())
    }
}
