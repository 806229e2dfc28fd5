use std::sync::Arc;

use regex::Regex;
use tracing::{debug, warn};

use codeforge_core::CodingTask;

use crate::oracle::AssessmentOracle;

/// Produces an execution plan for a task.
///
/// Trivial and simple tasks never touch the oracle, keeping their cost
/// near zero. For everything else the oracle is consulted, and any
/// failure or malformed output falls back silently to the default plan:
/// the plan is opaque to the rest of the engine, which only needs some
/// plan string for logging.
pub struct ComplexityAssessor {
    oracle: Option<Arc<dyn AssessmentOracle>>,
}

impl ComplexityAssessor {
    pub fn new(oracle: Option<Arc<dyn AssessmentOracle>>) -> Self {
        Self { oracle }
    }

    pub async fn plan(&self, task: &CodingTask) -> String {
        if task.complexity.is_lightweight() {
            return Self::default_plan(task);
        }

        let Some(oracle) = &self.oracle else {
            return Self::default_plan(task);
        };

        match oracle.assess(task).await {
            Ok(raw) => match extract_steps(&raw) {
                Some(steps) if !steps.is_empty() => steps.join("\n"),
                _ => {
                    debug!(task_id = %task.task_id, "Assessment output had no usable steps");
                    Self::default_plan(task)
                }
            },
            Err(e) => {
                warn!(task_id = %task.task_id, error = %e, "Assessment oracle failed");
                Self::default_plan(task)
            }
        }
    }

    fn default_plan(task: &CodingTask) -> String {
        format!("Execute task directly: {}", task.description)
    }
}

/// Pull `implementation_steps` out of the first JSON object embedded in
/// the oracle's raw text.
fn extract_steps(raw: &str) -> Option<Vec<String>> {
    let re = Regex::new(r"(?s)\{.*\}").ok()?;
    let json = re.find(raw)?.as_str();
    let value: serde_json::Value = serde_json::from_str(json).ok()?;

    let steps = value.get("implementation_steps")?.as_array()?;
    Some(
        steps
            .iter()
            .filter_map(|s| s.as_str().map(|s| s.to_string()))
            .collect(),
    )
}
