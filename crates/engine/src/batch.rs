// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Batch spawn over a plan's ready queue.
//!
//! Callers hand in issue/task ids; each is spawned at most once, subject to
//! existing live sessions, plan dependencies, and the concurrency cap. Every
//! skip carries a human-readable reason.

use crate::error::EngineError;
use crate::session_manager::{SessionManager, SpawnRequest};
use ao_core::clock::Clock;
use ao_core::graph::{TaskGraph, TaskState};
use ao_core::id::{IssueId, TaskId};
use ao_core::ready_queue::{ready_queue, SchedulerConfig};
use ao_core::session::SessionRole;
use std::collections::HashSet;

/// One skipped entry with its reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedTask {
    pub id: String,
    pub reason: String,
}

/// Result of a batch spawn.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Ids selected and spawned, in input order.
    pub selected: Vec<String>,
    pub skipped: Vec<SkippedTask>,
    /// Session ids created, parallel to `selected`.
    pub sessions: Vec<String>,
}

impl<C: Clock> SessionManager<C> {
    /// Spawn sessions for a batch of issue/task ids.
    ///
    /// With a plan graph, each id must name a plan task (by task id, falling
    /// back to issue id) whose dependencies are complete and which fits in
    /// the scheduler's available slots. Without a plan, only duplicate and
    /// live-session checks apply.
    pub async fn batch_spawn(
        &self,
        project_id: &str,
        requested: &[IssueId],
        plan: Option<&TaskGraph>,
        scheduler: &SchedulerConfig,
    ) -> Result<BatchOutcome, EngineError> {
        let mut outcome = BatchOutcome::default();
        let mut seen: HashSet<&str> = HashSet::new();

        // Issues already owned by a live session.
        let mut live_issues: HashSet<String> = HashSet::new();
        for session in self.list(Some(project_id)).await? {
            if session.status.is_terminal() {
                continue;
            }
            if let Some(issue) = &session.issue_id {
                live_issues.insert(issue.to_string());
            }
        }

        let mut slots = match plan {
            Some(graph) => {
                let queue = ready_queue(graph, scheduler)?;
                queue.available_slots
            }
            None => usize::MAX,
        };

        for id in requested {
            let id_str = id.as_str();
            if !seen.insert(id_str) {
                outcome.skipped.push(SkippedTask {
                    id: id_str.to_string(),
                    reason: "duplicate in this batch".to_string(),
                });
                continue;
            }

            // The task node, when a plan governs this batch.
            let task = match plan {
                Some(graph) => {
                    let task_id = TaskId::new(id_str);
                    let node = graph.get(&task_id).or_else(|| {
                        graph
                            .nodes()
                            .find(|n| n.issue_id.as_ref().is_some_and(|i| i == id))
                    });
                    match node {
                        Some(node) => Some(node.clone()),
                        None => {
                            outcome.skipped.push(SkippedTask {
                                id: id_str.to_string(),
                                reason: "not in the current plan".to_string(),
                            });
                            continue;
                        }
                    }
                }
                None => None,
            };

            let issue = task
                .as_ref()
                .and_then(|t| t.issue_id.clone())
                .unwrap_or_else(|| id.clone());

            if live_issues.contains(issue.as_str()) || live_issues.contains(id_str) {
                outcome.skipped.push(SkippedTask {
                    id: id_str.to_string(),
                    reason: "already has session".to_string(),
                });
                continue;
            }

            if let (Some(task), Some(graph)) = (&task, plan) {
                if task.state == TaskState::Complete {
                    outcome.skipped.push(SkippedTask {
                        id: id_str.to_string(),
                        reason: "task already complete".to_string(),
                    });
                    continue;
                }
                let incomplete: Vec<String> = task
                    .dependencies
                    .iter()
                    .filter(|dep| {
                        !matches!(graph.get(dep), Some(n) if n.state == TaskState::Complete)
                    })
                    .map(|dep| dep.to_string())
                    .collect();
                if !incomplete.is_empty() {
                    outcome.skipped.push(SkippedTask {
                        id: id_str.to_string(),
                        reason: format!(
                            "blocked by incomplete dependencies: {}",
                            incomplete.join(", ")
                        ),
                    });
                    continue;
                }
            }

            if slots == 0 {
                outcome.skipped.push(SkippedTask {
                    id: id_str.to_string(),
                    reason: "concurrency cap reached".to_string(),
                });
                continue;
            }

            let session = self
                .spawn(SpawnRequest {
                    project_id: project_id.to_string(),
                    issue_id: Some(issue.clone()),
                    agent: None,
                    prompt: None,
                    role: SessionRole::Worker,
                })
                .await?;

            slots = slots.saturating_sub(1);
            live_issues.insert(issue.to_string());
            outcome.selected.push(id_str.to_string());
            outcome.sessions.push(session.id.to_string());
        }

        tracing::info!(
            project_id,
            selected = outcome.selected.len(),
            skipped = outcome.skipped.len(),
            "batch spawn finished"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
