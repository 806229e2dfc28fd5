//! External oracle collaborators, interfaces only.
//!
//! The engine never interprets natural language itself: task assessment
//! and code review are delegated through these traits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use codeforge_core::{CodingResult, CodingTask};

use crate::error::Result;

/// Turns a task description into raw assessment text.
///
/// Output is free-form; the assessor extracts what it can and falls back
/// to a default plan otherwise, so implementations may fail freely.
#[async_trait]
pub trait AssessmentOracle: Send + Sync {
    async fn assess(&self, task: &CodingTask) -> Result<String>;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewVerdict {
    Approve,
    RequestChanges,
    Comment,
}

impl ReviewVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "APPROVE",
            Self::RequestChanges => "REQUEST_CHANGES",
            Self::Comment => "COMMENT",
        }
    }
}

/// Judgment returned by the review oracle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub verdict: ReviewVerdict,
    pub summary: String,
    #[serde(default)]
    pub comments: Vec<String>,
    #[serde(default)]
    pub security_issues: Vec<String>,
}

impl Review {
    pub fn approve(summary: impl Into<String>) -> Self {
        Self {
            verdict: ReviewVerdict::Approve,
            summary: summary.into(),
            comments: Vec::new(),
            security_issues: Vec::new(),
        }
    }

    pub fn request_changes(summary: impl Into<String>, comments: Vec<String>) -> Self {
        Self {
            verdict: ReviewVerdict::RequestChanges,
            summary: summary.into(),
            comments,
            security_issues: Vec::new(),
        }
    }
}

/// Judges produced changes; the quality gate interprets the verdict.
#[async_trait]
pub trait ReviewOracle: Send + Sync {
    async fn review(&self, task: &CodingTask, result: &CodingResult) -> Result<Review>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_serialization() {
        let json = serde_json::to_string(&ReviewVerdict::RequestChanges).unwrap();
        assert_eq!(json, "\"REQUEST_CHANGES\"");
        assert_eq!(ReviewVerdict::RequestChanges.as_str(), "REQUEST_CHANGES");
    }

    #[test]
    fn test_review_constructors() {
        let review = Review::approve("clean change");
        assert_eq!(review.verdict, ReviewVerdict::Approve);
        assert!(review.security_issues.is_empty());

        let review = Review::request_changes("issues", vec!["missing tests".to_string()]);
        assert_eq!(review.verdict, ReviewVerdict::RequestChanges);
        assert_eq!(review.comments.len(), 1);
    }
}
