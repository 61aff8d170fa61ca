// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Issue-tracker contract.

mod github;

pub use github::GithubTracker;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeTracker;

use ao_core::config::ProjectConfig;
use ao_core::id::IssueId;
use async_trait::async_trait;
use thiserror::Error;

/// Errors from tracker operations
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("tracker command failed: {0}")]
    CommandFailed(String),
    #[error("tracker response was not understood: {0}")]
    BadResponse(String),
}

/// An issue as the core sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub id: IssueId,
    pub title: String,
    pub body: String,
    pub url: Option<String>,
}

/// Issue-tracker contract.
#[async_trait]
pub trait Tracker: Send + Sync {
    /// Registry name ("github", "linear", "jira", ...).
    fn name(&self) -> &str;

    async fn get_issue(
        &self,
        id: &IssueId,
        project: &ProjectConfig,
    ) -> Result<Option<Issue>, TrackerError>;

    fn issue_url(&self, id: &IssueId, project: &ProjectConfig) -> Option<String>;

    /// Suggested branch name for an issue; the session manager sanitizes it.
    fn branch_name(&self, id: &IssueId) -> String;

    /// Prompt text handed to a worker for an issue. Opaque to the core.
    fn generate_prompt(&self, id: &IssueId, project: &ProjectConfig) -> String;
}
