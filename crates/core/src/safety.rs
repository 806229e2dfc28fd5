//! Pre-flight safety screening for coding tasks.
//!
//! The check is a coarse case-insensitive substring match against a
//! denylist of destructive-intent phrases. False positives are acceptable;
//! the phrase list is configuration, not a complete safety boundary.

use crate::domain::task::{AutonomyLevel, CodingTask};

const DEFAULT_DENYLIST: &[&str] = &[
    "delete all",
    "drop table",
    "remove all data",
    "format disk",
    "wipe",
    "destroy",
    "credentials",
    "passwords",
    "api keys",
];

/// Outcome of a safety check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyVerdict {
    pub safe: bool,
    pub reason: String,
}

impl SafetyVerdict {
    fn safe() -> Self {
        Self {
            safe: true,
            reason: "Safe".to_string(),
        }
    }

    fn blocked(reason: impl Into<String>) -> Self {
        Self {
            safe: false,
            reason: reason.into(),
        }
    }

    pub fn is_safe(&self) -> bool {
        self.safe
    }
}

#[derive(Debug, Clone)]
pub struct SafetyValidator {
    denylist: Vec<String>,
}

impl Default for SafetyValidator {
    fn default() -> Self {
        Self {
            denylist: DEFAULT_DENYLIST.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl SafetyValidator {
    pub fn with_denylist(denylist: Vec<String>) -> Self {
        Self {
            denylist: denylist.into_iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    pub fn denylist(&self) -> &[String] {
        &self.denylist
    }

    /// Check whether a task is safe to execute autonomously.
    ///
    /// Rejects descriptions containing a denylisted phrase and tasks at
    /// the `Supervised` autonomy level, which require a human-in-the-loop
    /// path this engine does not provide.
    pub fn evaluate(&self, task: &CodingTask) -> SafetyVerdict {
        let description = task.description.to_lowercase();
        for phrase in &self.denylist {
            if description.contains(phrase.as_str()) {
                return SafetyVerdict::blocked(format!(
                    "Task contains risky phrase: {}",
                    phrase
                ));
            }
        }

        if task.autonomy_level == AutonomyLevel::Supervised {
            return SafetyVerdict::blocked("Task requires supervised execution");
        }

        SafetyVerdict::safe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::RepoRef;

    fn task_with_description(description: &str) -> CodingTask {
        CodingTask::new("task-1", description, RepoRef::new("acme", "widgets"))
    }

    #[test]
    fn test_clean_task_is_safe() {
        let validator = SafetyValidator::default();
        let verdict = validator.evaluate(&task_with_description("Add pagination to the list API"));

        assert!(verdict.is_safe());
        assert_eq!(verdict.reason, "Safe");
    }

    #[test]
    fn test_denylisted_phrase_blocks() {
        let validator = SafetyValidator::default();
        let verdict =
            validator.evaluate(&task_with_description("Please DROP TABLE users and rebuild"));

        assert!(!verdict.is_safe());
        assert!(verdict.reason.contains("drop table"));
    }

    #[test]
    fn test_match_is_case_insensitive() {
        let validator = SafetyValidator::default();
        let verdict = validator.evaluate(&task_with_description("Wipe the cache directory"));

        assert!(!verdict.is_safe());
    }

    #[test]
    fn test_supervised_autonomy_blocks() {
        let validator = SafetyValidator::default();
        let task = task_with_description("Add a feature flag")
            .with_autonomy(AutonomyLevel::Supervised);

        let verdict = validator.evaluate(&task);
        assert!(!verdict.is_safe());
        assert!(verdict.reason.contains("supervised"));
    }

    #[test]
    fn test_custom_denylist() {
        let validator = SafetyValidator::with_denylist(vec!["Forbidden Thing".to_string()]);
        let verdict = validator.evaluate(&task_with_description("do the forbidden thing now"));

        assert!(!verdict.is_safe());
        // default phrases no longer apply
        let verdict = validator.evaluate(&task_with_description("wipe everything"));
        assert!(verdict.is_safe());
    }
}
