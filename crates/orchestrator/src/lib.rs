//! Workflow orchestration for coding tasks.
//!
//! [`CodingEngine`] drives one task from PENDING to COMPLETED: safety
//! validation, complexity assessment, sandboxed execution under the
//! selected repository access strategy, the quality gate's bounded retry
//! loop, and finalization (PR creation plus an audit decision record).

pub mod agents;
pub mod assessor;
pub mod audit;
pub mod config;
pub mod error;
pub mod executor;
pub mod finalizer;
pub mod oracle;
pub mod prompts;
pub mod quality_gate;
pub mod state_machine;
pub mod store;
pub mod strategy;
pub mod workflow;

pub use agents::{agent_for, MockAgent, TaskAgent};
pub use assessor::ComplexityAssessor;
pub use audit::{DecisionRecord, DecisionStore, MemoryDecisionStore};
pub use config::EngineConfig;
pub use error::{OrchestratorError, Result};
pub use executor::SandboxExecutor;
pub use oracle::{AssessmentOracle, Review, ReviewOracle, ReviewVerdict};
pub use quality_gate::{GateDecision, GateOutcome, PrOutcome, QualityGate};
pub use state_machine::WorkflowStateMachine;
pub use store::ResultStore;
pub use strategy::select_strategy;
pub use workflow::{CodingEngine, EngineDependencies};
