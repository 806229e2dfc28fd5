use std::sync::Arc;

use tracing::{debug, error, info, warn};

use codeforge_core::{
    AgentKind, CodingResult, CodingTask, SafetyValidator, TaskStatus,
};
use events::{Event, EventBus, EventEnvelope};
use github::SourceHost;
use sandbox::{ContainerRuntime, SandboxManager};
use vcs::WorkspaceProvider;

use crate::agents::agent_for;
use crate::assessor::ComplexityAssessor;
use crate::audit::DecisionStore;
use crate::config::EngineConfig;
use crate::executor::SandboxExecutor;
use crate::finalizer::ResultFinalizer;
use crate::oracle::{AssessmentOracle, ReviewOracle};
use crate::quality_gate::{GateDecision, GateOutcome, QualityGate};
use crate::state_machine::WorkflowStateMachine;
use crate::store::ResultStore;

/// Everything the engine needs; external collaborators come in as trait
/// objects so tests can substitute doubles.
pub struct EngineDependencies {
    pub runtime: Arc<dyn ContainerRuntime>,
    pub workspaces: Arc<dyn WorkspaceProvider>,
    pub host: Arc<dyn SourceHost>,
    pub assessment: Option<Arc<dyn AssessmentOracle>>,
    pub review: Arc<dyn ReviewOracle>,
    pub decisions: Arc<dyn DecisionStore>,
    pub events: Option<EventBus>,
    pub config: EngineConfig,
    /// Executor tag selecting the agent implementation.
    pub agent: AgentKind,
}

/// The workflow orchestrator.
///
/// Each call to [`execute`](CodingEngine::execute) runs one task as an
/// independent workflow instance; instances share nothing mutable except
/// the environment table inside the sandbox manager (locked per task)
/// and the result store.
pub struct CodingEngine {
    validator: SafetyValidator,
    assessor: ComplexityAssessor,
    executor: Arc<SandboxExecutor>,
    sandbox: Arc<SandboxManager>,
    gate: Arc<QualityGate>,
    finalizer: ResultFinalizer,
    store: Arc<ResultStore>,
    events: Option<EventBus>,
    config: Arc<EngineConfig>,
    agent_kind: AgentKind,
}

impl CodingEngine {
    pub fn new(deps: EngineDependencies) -> Self {
        let config = Arc::new(deps.config);

        let validator = match &config.denylist {
            Some(denylist) => SafetyValidator::with_denylist(denylist.clone()),
            None => SafetyValidator::default(),
        };

        let sandbox = Arc::new(SandboxManager::new(deps.runtime, config.sandbox_config()));
        let executor = Arc::new(SandboxExecutor::new(
            Arc::clone(&sandbox),
            deps.workspaces,
            Arc::clone(&deps.host),
            Arc::clone(&config),
            deps.events.clone(),
        ));
        let gate = Arc::new(QualityGate::new(deps.review, deps.host));
        let finalizer = ResultFinalizer::new(
            Arc::clone(&gate),
            deps.decisions,
            deps.events.clone(),
            Arc::clone(&config),
        );

        Self {
            validator,
            assessor: ComplexityAssessor::new(deps.assessment),
            executor,
            sandbox,
            gate,
            finalizer,
            store: Arc::new(ResultStore::new()),
            events: deps.events,
            config,
            agent_kind: deps.agent,
        }
    }

    pub fn sandbox(&self) -> &SandboxManager {
        &self.sandbox
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn publish(&self, event: Event) {
        if let Some(bus) = &self.events {
            bus.publish(EventEnvelope::new(event));
        }
    }

    /// Transition the workflow state, publishing the change. A rejected
    /// transition is a bug in the engine itself; it is logged and the
    /// state forced so the workflow still terminates.
    fn advance(&self, task: &CodingTask, state: &mut TaskStatus, to: TaskStatus) {
        if let Err(e) = WorkflowStateMachine::validate_transition(state, &to) {
            error!(task_id = %task.task_id, error = %e, "State machine violation");
        }
        self.publish(Event::StatusChanged {
            task_id: task.task_id.clone(),
            from_status: state.as_str().to_string(),
            to_status: to.as_str().to_string(),
        });
        *state = to;
    }

    /// Run one coding task through the full workflow and return its
    /// finalized result. Never panics; every failure mode lands in the
    /// result's status and errors.
    pub async fn execute(&self, task: CodingTask) -> CodingResult {
        info!(
            task_id = %task.task_id,
            complexity = task.complexity.as_str(),
            autonomy = task.autonomy_level.as_str(),
            "Received coding task"
        );
        self.publish(Event::TaskReceived {
            task_id: task.task_id.clone(),
            complexity: task.complexity.as_str().to_string(),
        });

        let agent = agent_for(
            self.agent_kind,
            Arc::clone(&self.executor),
            &self.config.model_id,
        );
        let mut state = TaskStatus::Pending;

        // Safety gate: rejected tasks never allocate any resource.
        let verdict = self.validator.evaluate(&task);
        if !verdict.is_safe() {
            warn!(task_id = %task.task_id, reason = %verdict.reason, "Task blocked by safety validator");
            self.publish(Event::TaskBlocked {
                task_id: task.task_id.clone(),
                reason: verdict.reason.clone(),
            });
            let result = CodingResult::failed(&task.task_id, agent.kind(), verdict.reason);
            self.advance(&task, &mut state, TaskStatus::Failed);
            return self.complete(&task, &mut state, result, None).await;
        }

        self.advance(&task, &mut state, TaskStatus::Assessing);

        if let Err(e) = task.validate() {
            let result = CodingResult::failed(
                &task.task_id,
                agent.kind(),
                format!("Assessment failed: {}", e),
            );
            self.advance(&task, &mut state, TaskStatus::Failed);
            return self.complete(&task, &mut state, result, None).await;
        }

        let plan = self.assessor.plan(&task).await;
        debug!(
            task_id = %task.task_id,
            plan_preview = %plan.chars().take(200).collect::<String>(),
            "Execution plan ready"
        );

        self.advance(&task, &mut state, TaskStatus::Executing);

        // Bounded retry loop: each failed gate evaluation either consumes
        // one retry or terminates, so at most max_retries + 1 attempts run.
        let mut previous: Option<CodingResult> = None;
        let mut feedback: Option<String> = None;
        let mut attempt: u32 = 0;

        let (result, outcome) = loop {
            attempt += 1;
            debug!(task_id = %task.task_id, attempt = attempt, "Starting execution attempt");

            let mut result = agent.execute(&task, feedback.as_deref()).await;
            if let Some(prev) = previous.take() {
                result.carry_attempt_history(&prev);
            }

            // Executor-reported failure is terminal for the task and does
            // not reach the quality gate.
            if result.status == TaskStatus::Failed {
                error!(
                    task_id = %task.task_id,
                    errors = %result.errors.join("; "),
                    "Execution attempt failed"
                );
                self.advance(&task, &mut state, TaskStatus::Failed);
                break (result, None);
            }

            self.advance(&task, &mut state, TaskStatus::QualityGate);
            result.status = TaskStatus::QualityGate;

            let outcome = match self.gate.validate(&task, &result).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(task_id = %task.task_id, error = %e, "Quality gate errored");
                    result.status = TaskStatus::Failed;
                    result.record_error(format!("Quality gate error: {}", e));
                    self.advance(&task, &mut state, TaskStatus::Failed);
                    break (result, None);
                }
            };

            self.publish(Event::GateEvaluated {
                task_id: task.task_id.clone(),
                passed: outcome.passed,
                retry_count: result.retry_count,
            });

            match self.gate.decide(&task, &mut result, &outcome) {
                GateDecision::Approved => {
                    self.advance(&task, &mut state, TaskStatus::Approved);
                    break (result, Some(outcome));
                }
                GateDecision::Retry { feedback: gate_feedback } => {
                    self.advance(&task, &mut state, TaskStatus::Executing);
                    feedback = Some(gate_feedback);
                    previous = Some(result);
                }
                GateDecision::Rejected => {
                    self.advance(&task, &mut state, TaskStatus::Rejected);
                    break (result, Some(outcome));
                }
            }
        };

        self.complete(&task, &mut state, result, outcome.as_ref()).await
    }

    async fn complete(
        &self,
        task: &CodingTask,
        state: &mut TaskStatus,
        mut result: CodingResult,
        outcome: Option<&GateOutcome>,
    ) -> CodingResult {
        self.finalizer.finalize(task, &mut result, outcome).await;
        self.advance(task, state, TaskStatus::Completed);
        self.store.insert(result.clone());
        result
    }

    /// Look up the finalized result of a previously executed task.
    pub fn status(&self, task_id: &str) -> Option<CodingResult> {
        self.store.get(task_id)
    }

    /// Force-remove environments leaked by crashed workflow instances.
    pub async fn sweep_stale(&self) -> usize {
        self.sandbox
            .cleanup_stale(chrono::Duration::minutes(self.config.stale_after_minutes))
            .await
    }
}
