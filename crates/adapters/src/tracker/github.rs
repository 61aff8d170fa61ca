// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! GitHub issue tracker over the `gh` CLI.

use super::{Issue, Tracker, TrackerError};
use ao_core::config::ProjectConfig;
use ao_core::id::IssueId;
use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;

/// GitHub issues adapter
#[derive(Clone, Default)]
pub struct GithubTracker;

impl GithubTracker {
    pub fn new() -> Self {
        Self
    }

    fn issue_number(id: &IssueId) -> &str {
        id.as_str().trim_start_matches('#')
    }
}

#[async_trait]
impl Tracker for GithubTracker {
    fn name(&self) -> &str {
        "github"
    }

    async fn get_issue(
        &self,
        id: &IssueId,
        project: &ProjectConfig,
    ) -> Result<Option<Issue>, TrackerError> {
        let Some(repo) = project.repo.as_deref() else {
            return Ok(None);
        };
        let number = Self::issue_number(id);

        let output = tokio::time::timeout(
            std::time::Duration::from_secs(30),
            Command::new("gh")
                .args([
                    "issue",
                    "view",
                    number,
                    "--repo",
                    repo,
                    "--json",
                    "title,body,url",
                ])
                .output(),
        )
        .await
        .map_err(|_| TrackerError::CommandFailed("gh issue view timed out".to_string()))?
        .map_err(|e| TrackerError::CommandFailed(e.to_string()))?;

        if !output.status.success() {
            return Ok(None);
        }

        let value: Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| TrackerError::BadResponse(e.to_string()))?;
        Ok(Some(Issue {
            id: id.clone(),
            title: value
                .get("title")
                .and_then(|t| t.as_str())
                .unwrap_or_default()
                .to_string(),
            body: value
                .get("body")
                .and_then(|b| b.as_str())
                .unwrap_or_default()
                .to_string(),
            url: value.get("url").and_then(|u| u.as_str()).map(String::from),
        }))
    }

    fn issue_url(&self, id: &IssueId, project: &ProjectConfig) -> Option<String> {
        let repo = project.repo.as_deref()?;
        Some(format!(
            "https://github.com/{}/issues/{}",
            repo,
            Self::issue_number(id)
        ))
    }

    fn branch_name(&self, id: &IssueId) -> String {
        format!("issue/{}", Self::issue_number(id))
    }

    fn generate_prompt(&self, id: &IssueId, project: &ProjectConfig) -> String {
        let reference = self
            .issue_url(id, project)
            .unwrap_or_else(|| id.to_string());
        format!(
            "Work the issue {} to completion. Read the issue, implement the fix or feature on \
             your branch, run the relevant tests, and open a pull request when the work is done.",
            reference
        )
    }
}

#[cfg(test)]
#[path = "github_tests.rs"]
mod tests;
