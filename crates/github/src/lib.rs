//! Source-control host integration.
//!
//! The engine talks to the host through the [`SourceHost`] trait: branch
//! creation from a ref SHA, draft PR creation, and branch tip lookup.
//! [`GitHubClient`] is the octocrab-backed implementation.

pub mod client;
pub mod error;
pub mod types;

pub use client::GitHubClient;
pub use error::{GitHubError, Result};
pub use types::{CreatePrRequest, PullRequest, SourceHost};
