// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outcome transition records for the append-only metrics log.

use serde::{Deserialize, Serialize};

/// Statuses that end a task's lifecycle for metrics purposes.
///
/// Includes `terminated`, written by older builds; the session state machine
/// itself never emits it.
pub const TERMINAL_STATUSES: [&str; 6] =
    ["merged", "cleanup", "done", "terminated", "killed", "errored"];

/// Statuses counted as failure signals.
pub const FAILURE_STATUSES: [&str; 4] = ["ci_failed", "changes_requested", "stuck", "errored"];

pub fn is_terminal_status(status: &str) -> bool {
    TERMINAL_STATUSES.contains(&status)
}

pub fn is_failure_status(status: &str) -> bool {
    FAILURE_STATUSES.contains(&status)
}

/// One status transition, one JSON line in `outcome-transitions.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeTransition {
    pub session_id: String,
    pub project_id: String,
    pub task_id: String,
    pub plan_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_id: Option<String>,
    pub from_status: String,
    pub to_status: String,
    /// Epoch milliseconds.
    pub timestamp: u64,
}

#[cfg(test)]
#[path = "outcome_tests.rs"]
mod tests;
