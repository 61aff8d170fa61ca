// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SCM contract: pull requests, CI checks, reviews, merges.
//!
//! Introspection failures are expected to degrade (`CiState::None`,
//! `ReviewDecision::None`) at the call sites in the engine; the adapter
//! itself reports errors honestly.

mod github;

pub use github::GhScm;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeScm;

use ao_core::session::{PrRef, Session};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from SCM operations
#[derive(Debug, Error)]
pub enum ScmError {
    #[error("scm command failed: {0}")]
    CommandFailed(String),
    #[error("scm response was not understood: {0}")]
    BadResponse(String),
    #[error("merge failed: {0}")]
    MergeFailed(String),
}

/// Status of one CI check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Passing,
    Failing,
    Pending,
}

/// One CI check run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiCheck {
    pub name: String,
    pub status: CheckStatus,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Overall CI state for a PR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CiState {
    Passing,
    Failing,
    Pending,
    /// No checks, or CI status could not be determined.
    #[default]
    None,
}

/// Aggregated CI counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CiSummary {
    pub total: usize,
    pub failed: usize,
    pub pending: usize,
    pub state: CiState,
}

/// Review decision for a PR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    ChangesRequested,
    ReviewRequired,
    #[default]
    None,
}

/// A human review comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewComment {
    pub author: String,
    pub body: String,
    pub path: Option<String>,
    pub resolved: bool,
}

/// Severity bucket for automated findings, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CommentSeverity {
    High,
    Medium,
    Low,
}

/// A bot/automation finding on a PR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutomatedComment {
    pub author: String,
    pub body: String,
    pub severity: CommentSeverity,
}

/// Merge-conflict state of a PR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mergeability {
    Mergeable,
    Conflicting,
    #[default]
    Unknown,
}

/// SCM provider contract.
#[async_trait]
pub trait Scm: Send + Sync {
    /// Registry name ("github", "gitlab", ...).
    fn name(&self) -> &str;

    /// Find the PR belonging to a session's branch, if one exists.
    async fn detect_pr(&self, session: &Session) -> Result<Option<PrRef>, ScmError>;

    async fn ci_checks(&self, pr: &PrRef) -> Result<Vec<CiCheck>, ScmError>;

    async fn ci_summary(&self, pr: &PrRef) -> Result<CiSummary, ScmError>;

    /// Human review comments, including resolved ones.
    async fn reviews(&self, pr: &PrRef) -> Result<Vec<ReviewComment>, ScmError>;

    async fn review_decision(&self, pr: &PrRef) -> Result<ReviewDecision, ScmError>;

    /// Unresolved review comments needing a response.
    async fn pending_comments(&self, pr: &PrRef) -> Result<Vec<ReviewComment>, ScmError>;

    /// Bot findings, sorted most severe first.
    async fn automated_comments(&self, pr: &PrRef) -> Result<Vec<AutomatedComment>, ScmError>;

    async fn mergeability(&self, pr: &PrRef) -> Result<Mergeability, ScmError>;

    /// Merge the PR. `method` is provider-specific ("squash", "rebase", ...).
    async fn merge_pr(&self, pr: &PrRef, method: Option<&str>) -> Result<(), ScmError>;
}

/// Fold a list of checks into a summary.
pub fn summarize_checks(checks: &[CiCheck]) -> CiSummary {
    if checks.is_empty() {
        return CiSummary::default();
    }
    let failed = checks
        .iter()
        .filter(|c| c.status == CheckStatus::Failing)
        .count();
    let pending = checks
        .iter()
        .filter(|c| c.status == CheckStatus::Pending)
        .count();
    let state = if failed > 0 {
        CiState::Failing
    } else if pending > 0 {
        CiState::Pending
    } else {
        CiState::Passing
    };
    CiSummary {
        total: checks.len(),
        failed,
        pending,
        state,
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
