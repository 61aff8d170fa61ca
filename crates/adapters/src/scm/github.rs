// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! GitHub SCM adapter over the `gh` CLI.
//!
//! All reads go through `gh ... --json`; the JSON-to-contract mapping lives
//! in free functions so it stays testable without a network.

use super::{
    summarize_checks, AutomatedComment, CheckStatus, CiCheck, CiSummary, CommentSeverity,
    Mergeability, ReviewComment, ReviewDecision, Scm, ScmError,
};
use ao_core::session::{PrRef, Session};
use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;

/// Bot author suffixes treated as automation.
const BOT_SUFFIXES: [&str; 2] = ["[bot]", "-bot"];

/// Upper bound on any single `gh` invocation.
const COMMAND_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// GitHub adapter speaking through the `gh` CLI
#[derive(Clone, Default)]
pub struct GhScm;

impl GhScm {
    pub fn new() -> Self {
        Self
    }

    async fn gh(args: &[&str]) -> Result<Value, ScmError> {
        let output =
            tokio::time::timeout(COMMAND_TIMEOUT, Command::new("gh").args(args).output())
                .await
                .map_err(|_| ScmError::CommandFailed("gh command timed out".to_string()))?
                .map_err(|e| ScmError::CommandFailed(e.to_string()))?;
        if !output.status.success() {
            return Err(ScmError::CommandFailed(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }
        serde_json::from_slice(&output.stdout).map_err(|e| ScmError::BadResponse(e.to_string()))
    }

    fn repo_arg(pr: &PrRef) -> String {
        format!("{}/{}", pr.owner, pr.repo)
    }
}

/// Map a `gh pr view --json ...` object to a `PrRef`.
pub(crate) fn pr_from_json(value: &Value, owner: &str, repo: &str) -> Option<PrRef> {
    let number = value.get("number")?.as_u64()?;
    Some(PrRef {
        number,
        owner: owner.to_string(),
        repo: repo.to_string(),
        url: value.get("url")?.as_str()?.to_string(),
        title: value
            .get("title")
            .and_then(|t| t.as_str())
            .unwrap_or_default()
            .to_string(),
        state: value
            .get("state")
            .and_then(|s| s.as_str())
            .unwrap_or("OPEN")
            .to_lowercase(),
        is_draft: value
            .get("isDraft")
            .and_then(|d| d.as_bool())
            .unwrap_or(false),
    })
}

/// Map `gh pr checks`-style status contexts to CI checks.
pub(crate) fn checks_from_json(value: &Value) -> Vec<CiCheck> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let name = item
                .get("name")
                .or_else(|| item.get("context"))?
                .as_str()?
                .to_string();
            let raw_state = item
                .get("state")
                .or_else(|| item.get("conclusion"))
                .and_then(|s| s.as_str())
                .unwrap_or("PENDING");
            let status = match raw_state.to_ascii_uppercase().as_str() {
                "SUCCESS" | "NEUTRAL" | "SKIPPED" => CheckStatus::Passing,
                "FAILURE" | "ERROR" | "CANCELLED" | "TIMED_OUT" => CheckStatus::Failing,
                _ => CheckStatus::Pending,
            };
            Some(CiCheck {
                name,
                status,
                summary: item
                    .get("description")
                    .and_then(|d| d.as_str())
                    .map(String::from),
                url: item
                    .get("link")
                    .or_else(|| item.get("targetUrl"))
                    .and_then(|u| u.as_str())
                    .map(String::from),
            })
        })
        .collect()
}

pub(crate) fn decision_from_json(value: &Value) -> ReviewDecision {
    match value
        .get("reviewDecision")
        .and_then(|d| d.as_str())
        .unwrap_or("")
    {
        "APPROVED" => ReviewDecision::Approved,
        "CHANGES_REQUESTED" => ReviewDecision::ChangesRequested,
        "REVIEW_REQUIRED" => ReviewDecision::ReviewRequired,
        _ => ReviewDecision::None,
    }
}

pub(crate) fn mergeability_from_json(value: &Value) -> Mergeability {
    match value.get("mergeable").and_then(|m| m.as_str()).unwrap_or("") {
        "MERGEABLE" => Mergeability::Mergeable,
        "CONFLICTING" => Mergeability::Conflicting,
        _ => Mergeability::Unknown,
    }
}

fn is_bot_author(author: &str) -> bool {
    BOT_SUFFIXES.iter().any(|s| author.ends_with(s))
}

/// Severity heuristic over a bot finding's body text.
pub(crate) fn severity_of(body: &str) -> CommentSeverity {
    let lowered = body.to_lowercase();
    if lowered.contains("critical") || lowered.contains("security") || lowered.contains("high") {
        CommentSeverity::High
    } else if lowered.contains("medium") || lowered.contains("warning") {
        CommentSeverity::Medium
    } else {
        CommentSeverity::Low
    }
}

/// Split review-thread comments into human (by resolution) and bot findings.
pub(crate) fn comments_from_json(value: &Value) -> (Vec<ReviewComment>, Vec<AutomatedComment>) {
    let mut human = Vec::new();
    let mut bots = Vec::new();
    let Some(items) = value.as_array() else {
        return (human, bots);
    };

    for item in items {
        let author = item
            .get("author")
            .and_then(|a| a.get("login"))
            .and_then(|l| l.as_str())
            .unwrap_or("unknown")
            .to_string();
        let body = item
            .get("body")
            .and_then(|b| b.as_str())
            .unwrap_or_default()
            .to_string();
        if body.is_empty() {
            continue;
        }

        if is_bot_author(&author) {
            bots.push(AutomatedComment {
                severity: severity_of(&body),
                author,
                body,
            });
        } else {
            human.push(ReviewComment {
                author,
                body,
                path: item
                    .get("path")
                    .and_then(|p| p.as_str())
                    .map(String::from),
                resolved: item
                    .get("isResolved")
                    .and_then(|r| r.as_bool())
                    .unwrap_or(false),
            });
        }
    }

    bots.sort_by_key(|c| c.severity);
    (human, bots)
}

#[async_trait]
impl Scm for GhScm {
    fn name(&self) -> &str {
        "github"
    }

    async fn detect_pr(&self, session: &Session) -> Result<Option<PrRef>, ScmError> {
        let Some(branch) = session.branch.as_deref() else {
            return Ok(None);
        };
        let Some(workspace) = session.workspace_path.as_ref() else {
            return Ok(None);
        };

        let output = tokio::time::timeout(
            COMMAND_TIMEOUT,
            Command::new("gh")
                .current_dir(workspace)
                .args([
                    "pr",
                    "view",
                    branch,
                    "--json",
                    "number,url,title,state,isDraft,headRepository,headRepositoryOwner",
                ])
                .output(),
        )
        .await
        .map_err(|_| ScmError::CommandFailed("gh pr view timed out".to_string()))?
        .map_err(|e| ScmError::CommandFailed(e.to_string()))?;

        if !output.status.success() {
            // `gh pr view` on a branch without a PR exits nonzero
            return Ok(None);
        }
        let value: Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| ScmError::BadResponse(e.to_string()))?;
        let owner = value
            .get("headRepositoryOwner")
            .and_then(|o| o.get("login"))
            .and_then(|l| l.as_str())
            .unwrap_or_default();
        let repo = value
            .get("headRepository")
            .and_then(|r| r.get("name"))
            .and_then(|n| n.as_str())
            .unwrap_or_default();
        Ok(pr_from_json(&value, owner, repo))
    }

    async fn ci_checks(&self, pr: &PrRef) -> Result<Vec<CiCheck>, ScmError> {
        let number = pr.number.to_string();
        let value = Self::gh(&[
            "pr",
            "checks",
            &number,
            "--repo",
            &Self::repo_arg(pr),
            "--json",
            "name,state,description,link",
        ])
        .await?;
        Ok(checks_from_json(&value))
    }

    async fn ci_summary(&self, pr: &PrRef) -> Result<CiSummary, ScmError> {
        Ok(summarize_checks(&self.ci_checks(pr).await?))
    }

    async fn reviews(&self, pr: &PrRef) -> Result<Vec<ReviewComment>, ScmError> {
        let (human, _) = self.fetch_comments(pr).await?;
        Ok(human)
    }

    async fn review_decision(&self, pr: &PrRef) -> Result<ReviewDecision, ScmError> {
        let number = pr.number.to_string();
        let value = Self::gh(&[
            "pr",
            "view",
            &number,
            "--repo",
            &Self::repo_arg(pr),
            "--json",
            "reviewDecision",
        ])
        .await?;
        Ok(decision_from_json(&value))
    }

    async fn pending_comments(&self, pr: &PrRef) -> Result<Vec<ReviewComment>, ScmError> {
        let (human, _) = self.fetch_comments(pr).await?;
        Ok(human.into_iter().filter(|c| !c.resolved).collect())
    }

    async fn automated_comments(&self, pr: &PrRef) -> Result<Vec<AutomatedComment>, ScmError> {
        let (_, bots) = self.fetch_comments(pr).await?;
        Ok(bots)
    }

    async fn mergeability(&self, pr: &PrRef) -> Result<Mergeability, ScmError> {
        let number = pr.number.to_string();
        let value = Self::gh(&[
            "pr",
            "view",
            &number,
            "--repo",
            &Self::repo_arg(pr),
            "--json",
            "mergeable",
        ])
        .await?;
        Ok(mergeability_from_json(&value))
    }

    async fn merge_pr(&self, pr: &PrRef, method: Option<&str>) -> Result<(), ScmError> {
        let number = pr.number.to_string();
        let repo = Self::repo_arg(pr);
        let method_flag = match method.unwrap_or("squash") {
            "merge" => "--merge",
            "rebase" => "--rebase",
            _ => "--squash",
        };

        let output = tokio::time::timeout(
            COMMAND_TIMEOUT,
            Command::new("gh")
                .args(["pr", "merge", &number, "--repo", &repo, method_flag])
                .output(),
        )
        .await
        .map_err(|_| ScmError::CommandFailed("gh pr merge timed out".to_string()))?
        .map_err(|e| ScmError::CommandFailed(e.to_string()))?;
        if !output.status.success() {
            return Err(ScmError::MergeFailed(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }
        Ok(())
    }
}

impl GhScm {
    async fn fetch_comments(
        &self,
        pr: &PrRef,
    ) -> Result<(Vec<ReviewComment>, Vec<AutomatedComment>), ScmError> {
        let path = format!(
            "repos/{}/{}/pulls/{}/comments",
            pr.owner, pr.repo, pr.number
        );
        let value = Self::gh(&["api", &path]).await?;
        Ok(comments_from_json(&value))
    }
}

#[cfg(test)]
#[path = "github_tests.rs"]
mod tests;
