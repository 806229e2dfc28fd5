use std::sync::Arc;

use tracing::{info, warn};

use codeforge_core::{CodingResult, CodingTask, TaskStatus};
use github::{CreatePrRequest, SourceHost};

use crate::error::Result;
use crate::oracle::{ReviewOracle, ReviewVerdict};

/// Interpreted quality-gate result for one execution attempt.
#[derive(Debug, Clone)]
pub struct GateOutcome {
    pub passed: bool,
    pub verdict: ReviewVerdict,
    pub summary: String,
    pub feedback: Option<String>,
    pub issues: Vec<String>,
}

/// What the orchestrator should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Approved,
    Retry { feedback: String },
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrOutcome {
    Created { number: u64, url: String },
    Skipped { reason: String },
}

/// Submits produced changes to the review oracle and decides retry vs.
/// terminal outcome.
pub struct QualityGate {
    review: Arc<dyn ReviewOracle>,
    host: Arc<dyn SourceHost>,
}

impl QualityGate {
    pub fn new(review: Arc<dyn ReviewOracle>, host: Arc<dyn SourceHost>) -> Self {
        Self { review, host }
    }

    /// Evaluate an attempt. Zero modified files is an automatic fail
    /// without an oracle call; there is nothing to review.
    pub async fn validate(&self, task: &CodingTask, result: &CodingResult) -> Result<GateOutcome> {
        if result.files_modified.is_empty() {
            info!(task_id = %task.task_id, "No files modified, failing quality gate locally");
            return Ok(GateOutcome {
                passed: false,
                verdict: ReviewVerdict::RequestChanges,
                summary: "No files were modified".to_string(),
                feedback: Some("no files were modified".to_string()),
                issues: Vec::new(),
            });
        }

        let review = self.review.review(task, result).await?;

        let passed = review.verdict == ReviewVerdict::Approve && review.security_issues.is_empty();

        let mut feedback_parts = vec![review.summary.clone()];
        feedback_parts.extend(review.comments.iter().cloned());
        feedback_parts.extend(
            review
                .security_issues
                .iter()
                .map(|i| format!("security: {}", i)),
        );
        let feedback = feedback_parts
            .iter()
            .filter(|p| !p.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join("\n");

        let mut issues = review.comments;
        issues.extend(review.security_issues);

        Ok(GateOutcome {
            passed,
            verdict: review.verdict,
            summary: review.summary,
            feedback: if feedback.is_empty() {
                None
            } else {
                Some(feedback)
            },
            issues,
        })
    }

    /// Apply the gate outcome to the result and pick the next step.
    ///
    /// This is what bounds the workflow: each failed evaluation either
    /// consumes one retry or terminates, so at most `max_retries + 1`
    /// execution attempts ever run.
    pub fn decide(
        &self,
        task: &CodingTask,
        result: &mut CodingResult,
        outcome: &GateOutcome,
    ) -> GateDecision {
        result.quality_gate_passed = outcome.passed;
        result.quality_gate_feedback = outcome.feedback.clone();

        if outcome.passed {
            result.status = TaskStatus::Approved;
            info!(task_id = %task.task_id, "Quality gate passed");
            return GateDecision::Approved;
        }

        if result.retry_count < task.max_retries {
            result.retry_count += 1;
            result.status = TaskStatus::Executing;
            info!(
                task_id = %task.task_id,
                retry = result.retry_count,
                max_retries = task.max_retries,
                "Quality gate failed, scheduling retry"
            );
            return GateDecision::Retry {
                feedback: outcome
                    .feedback
                    .clone()
                    .unwrap_or_else(|| outcome.summary.clone()),
            };
        }

        result.status = TaskStatus::Rejected;
        result.record_error(format!(
            "Quality gate failed after {} retries",
            task.max_retries
        ));
        warn!(
            task_id = %task.task_id,
            retries = task.max_retries,
            "Quality gate rejected, retry budget exhausted"
        );
        GateDecision::Rejected
    }

    /// Open the real PR for an approved result.
    ///
    /// Defense in depth against out-of-order calls: no-ops with a reason
    /// when the gate did not pass or no branch name is available.
    pub async fn create_pr_if_approved(
        &self,
        task: &CodingTask,
        outcome: &GateOutcome,
        branch: Option<&str>,
    ) -> Result<PrOutcome> {
        if !outcome.passed {
            return Ok(PrOutcome::Skipped {
                reason: "quality gate did not pass".to_string(),
            });
        }

        let Some(branch) = task.branch_name.as_deref().or(branch) else {
            return Ok(PrOutcome::Skipped {
                reason: "no branch name available".to_string(),
            });
        };

        let title = if task.description.chars().count() > 100 {
            let cut: String = task.description.chars().take(97).collect();
            format!("{}...", cut)
        } else {
            task.description.clone()
        };

        let request = CreatePrRequest {
            title,
            body: format!(
                "{}\n\nTask ID: {}\nReview summary: {}",
                task.description, task.task_id, outcome.summary
            ),
            base: task.base_branch.clone(),
            head: branch.to_string(),
            draft: false,
        };

        let pr = self
            .host
            .create_pull_request(&task.repository, request)
            .await?;

        Ok(PrOutcome::Created {
            number: pr.number,
            url: pr.html_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use codeforge_core::{AgentKind, FileChange, FileStatus, RepoRef};
    use github::PullRequest;

    use crate::oracle::Review;

    struct ScriptedReview {
        responses: Mutex<VecDeque<Review>>,
        calls: AtomicUsize,
    }

    impl ScriptedReview {
        fn with(responses: Vec<Review>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ReviewOracle for ScriptedReview {
        async fn review(&self, _task: &CodingTask, _result: &CodingResult) -> Result<Review> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Review::approve("default")))
        }
    }

    struct NullHost;

    #[async_trait]
    impl SourceHost for NullHost {
        async fn branch_sha(&self, _repo: &RepoRef, _branch: &str) -> github::Result<String> {
            Ok("sha".to_string())
        }

        async fn create_branch(
            &self,
            _repo: &RepoRef,
            _branch: &str,
            _sha: &str,
        ) -> github::Result<()> {
            Ok(())
        }

        async fn create_pull_request(
            &self,
            _repo: &RepoRef,
            request: CreatePrRequest,
        ) -> github::Result<PullRequest> {
            Ok(PullRequest {
                number: 42,
                title: request.title,
                head_branch: request.head,
                base_branch: request.base,
                html_url: "https://example.test/pr/42".to_string(),
                created_at: chrono::Utc::now(),
            })
        }
    }

    fn task() -> CodingTask {
        CodingTask::new("t1", "Fix flaky retry logic", RepoRef::new("acme", "widgets"))
    }

    fn result_with_changes() -> CodingResult {
        let mut result = CodingResult::new("t1", AgentKind::ClaudeCode);
        result.files_modified = vec![FileChange::new("src/lib.rs", FileStatus::Modified)];
        result
    }

    #[tokio::test]
    async fn test_zero_files_short_circuits_without_oracle() {
        let oracle = ScriptedReview::with(vec![]);
        let gate = QualityGate::new(oracle.clone(), Arc::new(NullHost));

        let result = CodingResult::new("t1", AgentKind::ClaudeCode);
        let outcome = gate.validate(&task(), &result).await.unwrap();

        assert!(!outcome.passed);
        assert_eq!(outcome.verdict, ReviewVerdict::RequestChanges);
        assert_eq!(outcome.feedback.as_deref(), Some("no files were modified"));
        assert_eq!(oracle.call_count(), 0);
    }

    #[tokio::test]
    async fn test_approve_verdict_passes() {
        let oracle = ScriptedReview::with(vec![Review::approve("clean")]);
        let gate = QualityGate::new(oracle, Arc::new(NullHost));

        let outcome = gate.validate(&task(), &result_with_changes()).await.unwrap();
        assert!(outcome.passed);
    }

    #[tokio::test]
    async fn test_security_issues_fail_even_on_approve() {
        let mut review = Review::approve("mostly fine");
        review.security_issues = vec!["hardcoded token".to_string()];
        let oracle = ScriptedReview::with(vec![review]);
        let gate = QualityGate::new(oracle, Arc::new(NullHost));

        let outcome = gate.validate(&task(), &result_with_changes()).await.unwrap();
        assert!(!outcome.passed);
        assert!(outcome.feedback.unwrap().contains("security: hardcoded token"));
    }

    #[tokio::test]
    async fn test_decide_retry_then_reject() {
        let gate = QualityGate::new(ScriptedReview::with(vec![]), Arc::new(NullHost));
        let task = task().with_max_retries(1);
        let failing = GateOutcome {
            passed: false,
            verdict: ReviewVerdict::RequestChanges,
            summary: "needs work".to_string(),
            feedback: Some("needs work".to_string()),
            issues: Vec::new(),
        };

        let mut result = result_with_changes();
        assert_eq!(
            gate.decide(&task, &mut result, &failing),
            GateDecision::Retry {
                feedback: "needs work".to_string()
            }
        );
        assert_eq!(result.retry_count, 1);
        assert_eq!(result.status, TaskStatus::Executing);

        assert_eq!(gate.decide(&task, &mut result, &failing), GateDecision::Rejected);
        assert_eq!(result.retry_count, 1);
        assert_eq!(result.status, TaskStatus::Rejected);
        assert!(result
            .errors
            .last()
            .unwrap()
            .contains("after 1 retries"));
    }

    #[tokio::test]
    async fn test_decide_approved_sets_status() {
        let gate = QualityGate::new(ScriptedReview::with(vec![]), Arc::new(NullHost));
        let passing = GateOutcome {
            passed: true,
            verdict: ReviewVerdict::Approve,
            summary: "ship it".to_string(),
            feedback: None,
            issues: Vec::new(),
        };

        let mut result = result_with_changes();
        assert_eq!(gate.decide(&task(), &mut result, &passing), GateDecision::Approved);
        assert_eq!(result.status, TaskStatus::Approved);
        assert!(result.quality_gate_passed);
    }

    #[tokio::test]
    async fn test_create_pr_skips_when_gate_failed() {
        let gate = QualityGate::new(ScriptedReview::with(vec![]), Arc::new(NullHost));
        let failing = GateOutcome {
            passed: false,
            verdict: ReviewVerdict::RequestChanges,
            summary: String::new(),
            feedback: None,
            issues: Vec::new(),
        };

        let outcome = gate
            .create_pr_if_approved(&task(), &failing, Some("branch"))
            .await
            .unwrap();
        assert!(matches!(outcome, PrOutcome::Skipped { reason } if reason.contains("did not pass")));
    }

    #[tokio::test]
    async fn test_create_pr_skips_without_branch() {
        let gate = QualityGate::new(ScriptedReview::with(vec![]), Arc::new(NullHost));
        let passing = GateOutcome {
            passed: true,
            verdict: ReviewVerdict::Approve,
            summary: String::new(),
            feedback: None,
            issues: Vec::new(),
        };

        let outcome = gate
            .create_pr_if_approved(&task(), &passing, None)
            .await
            .unwrap();
        assert!(matches!(outcome, PrOutcome::Skipped { reason } if reason.contains("branch")));
    }

    #[tokio::test]
    async fn test_create_pr_for_approved_result() {
        let gate = QualityGate::new(ScriptedReview::with(vec![]), Arc::new(NullHost));
        let passing = GateOutcome {
            passed: true,
            verdict: ReviewVerdict::Approve,
            summary: "ok".to_string(),
            feedback: None,
            issues: Vec::new(),
        };

        let outcome = gate
            .create_pr_if_approved(&task(), &passing, Some("codeforge/t1"))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            PrOutcome::Created {
                number: 42,
                url: "https://example.test/pr/42".to_string()
            }
        );
    }
}
