// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only outcome metrics log and its derivations.
//!
//! One JSON object per line in `metrics/outcome-transitions.jsonl`. Readers
//! parse leniently — malformed lines (including a truncated final line from
//! a concurrent append) are skipped, never fatal.

use ao_core::outcome::{is_failure_status, is_terminal_status, OutcomeTransition};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from outcome log operations
#[derive(Debug, Error)]
pub enum OutcomeError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Input to `record_transition`; optional fields get defaults.
#[derive(Debug, Clone)]
pub struct TransitionRecord {
    pub session_id: String,
    pub project_id: String,
    pub from_status: String,
    pub to_status: String,
    pub task_id: Option<String>,
    pub plan_id: Option<String>,
    pub issue_id: Option<String>,
    pub timestamp: Option<u64>,
}

/// One project's append-only outcome log.
#[derive(Debug, Clone)]
pub struct OutcomeLog {
    path: PathBuf,
}

impl OutcomeLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append one transition. `taskId` defaults to the issue id, then the
    /// session id; `planId` defaults to `"default"`; `timestamp` to `now_ms`.
    pub fn record_transition(
        &self,
        record: TransitionRecord,
        now_ms: u64,
    ) -> Result<OutcomeTransition, OutcomeError> {
        let task_id = record
            .task_id
            .or_else(|| record.issue_id.clone())
            .unwrap_or_else(|| record.session_id.clone());

        let transition = OutcomeTransition {
            session_id: record.session_id,
            project_id: record.project_id,
            task_id,
            plan_id: record.plan_id.unwrap_or_else(|| "default".to_string()),
            issue_id: record.issue_id,
            from_status: record.from_status,
            to_status: record.to_status,
            timestamp: record.timestamp.unwrap_or(now_ms),
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut line = serde_json::to_string(&transition)?;
        line.push('\n');
        file.write_all(line.as_bytes())?;
        Ok(transition)
    }

    /// All well-formed records in the log, in file order.
    pub fn read_all(&self) -> Result<Vec<OutcomeTransition>, OutcomeError> {
        read_records(&self.path)
    }
}

fn read_records(path: &Path) -> Result<Vec<OutcomeTransition>, OutcomeError> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut records = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<OutcomeTransition>(trimmed) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::debug!(
                    path = %path.display(),
                    line = idx + 1,
                    error = %e,
                    "skipping malformed outcome line"
                );
            }
        }
    }
    Ok(records)
}

/// Filters applied before derivation.
#[derive(Debug, Clone, Default)]
pub struct OutcomeQuery {
    pub project_id: Option<String>,
    pub plan_id: Option<String>,
    pub task_id: Option<String>,
    pub since_ms: Option<u64>,
    pub until_ms: Option<u64>,
}

impl OutcomeQuery {
    fn matches(&self, record: &OutcomeTransition) -> bool {
        if let Some(p) = &self.project_id {
            if &record.project_id != p {
                return false;
            }
        }
        if let Some(p) = &self.plan_id {
            if &record.plan_id != p {
                return false;
            }
        }
        if let Some(t) = &self.task_id {
            if &record.task_id != t {
                return false;
            }
        }
        if let Some(since) = self.since_ms {
            if record.timestamp < since {
                return false;
            }
        }
        if let Some(until) = self.until_ms {
            if record.timestamp > until {
                return false;
            }
        }
        true
    }
}

/// Derived metrics for one task.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub task_id: String,
    pub plan_id: String,
    pub project_id: String,
    pub transitions: usize,
    /// `failure -> non-failure` transitions.
    pub retries: u32,
    /// `terminal -> non-terminal` transitions.
    pub reopen_count: u32,
    /// Transitions into a failure status.
    pub failure_signals: u32,
    pub started_at: Option<u64>,
    /// First transition into the terminal set.
    pub completed_at: Option<u64>,
    pub cycle_time_ms: Option<u64>,
    pub first_pass_success: bool,
}

/// Derived metrics for one plan.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    pub plan_id: String,
    pub task_count: usize,
    pub first_pass_rate: f64,
    pub average_retries: f64,
    pub average_cycle_time_ms: Option<f64>,
    pub reopen_rate: f64,
}

/// Full derivation over a set of records.
#[derive(Debug, Clone, Default)]
pub struct OutcomeSummary {
    pub tasks: Vec<TaskOutcome>,
    pub plans: Vec<PlanOutcome>,
    pub record_count: usize,
}

impl OutcomeSummary {
    /// Derive per-task and per-plan metrics from raw records.
    pub fn derive(mut records: Vec<OutcomeTransition>, query: &OutcomeQuery) -> Self {
        records.retain(|r| query.matches(r));
        records.sort_by_key(|r| r.timestamp);
        let record_count = records.len();

        // Group by (plan, task), preserving first-seen order via BTreeMap.
        let mut groups: BTreeMap<(String, String), Vec<&OutcomeTransition>> = BTreeMap::new();
        for record in &records {
            groups
                .entry((record.plan_id.clone(), record.task_id.clone()))
                .or_default()
                .push(record);
        }

        let mut tasks = Vec::new();
        for ((plan_id, task_id), group) in groups {
            let mut retries = 0u32;
            let mut reopen_count = 0u32;
            let mut failure_signals = 0u32;
            let mut completed_at = None;

            for record in &group {
                if is_failure_status(&record.to_status) {
                    failure_signals += 1;
                }
                if is_failure_status(&record.from_status) && !is_failure_status(&record.to_status)
                {
                    retries += 1;
                }
                if is_terminal_status(&record.from_status)
                    && !is_terminal_status(&record.to_status)
                {
                    reopen_count += 1;
                }
                if completed_at.is_none() && is_terminal_status(&record.to_status) {
                    completed_at = Some(record.timestamp);
                }
            }

            let started_at = group.first().map(|r| r.timestamp);
            let cycle_time_ms = match (started_at, completed_at) {
                (Some(start), Some(end)) if end >= start => Some(end - start),
                _ => None,
            };

            tasks.push(TaskOutcome {
                task_id,
                plan_id,
                project_id: group
                    .first()
                    .map(|r| r.project_id.clone())
                    .unwrap_or_default(),
                transitions: group.len(),
                retries,
                reopen_count,
                failure_signals,
                started_at,
                completed_at,
                cycle_time_ms,
                first_pass_success: completed_at.is_some()
                    && retries == 0
                    && reopen_count == 0
                    && failure_signals == 0,
            });
        }

        // Per-plan rollups.
        let mut by_plan: BTreeMap<String, Vec<&TaskOutcome>> = BTreeMap::new();
        for task in &tasks {
            by_plan.entry(task.plan_id.clone()).or_default().push(task);
        }

        let plans = by_plan
            .into_iter()
            .map(|(plan_id, plan_tasks)| {
                let task_count = plan_tasks.len();
                let n = task_count as f64;
                let first_pass =
                    plan_tasks.iter().filter(|t| t.first_pass_success).count() as f64;
                let total_retries: u32 = plan_tasks.iter().map(|t| t.retries).sum();
                let reopened = plan_tasks.iter().filter(|t| t.reopen_count > 0).count() as f64;

                let cycles: Vec<u64> =
                    plan_tasks.iter().filter_map(|t| t.cycle_time_ms).collect();
                let average_cycle_time_ms = if cycles.is_empty() {
                    None
                } else {
                    Some(cycles.iter().sum::<u64>() as f64 / cycles.len() as f64)
                };

                PlanOutcome {
                    plan_id,
                    task_count,
                    first_pass_rate: first_pass / n,
                    average_retries: f64::from(total_retries) / n,
                    average_cycle_time_ms,
                    reopen_rate: reopened / n,
                }
            })
            .collect();

        Self {
            tasks,
            plans,
            record_count,
        }
    }
}

/// One retrospective pattern with affected tasks.
#[derive(Debug, Clone)]
pub struct RetrospectiveFinding {
    pub pattern: String,
    pub severity: String,
    pub task_ids: Vec<String>,
    pub recommendation: String,
}

/// Group tasks into the four retrospective patterns.
pub fn generate_retrospective(summary: &OutcomeSummary) -> Vec<RetrospectiveFinding> {
    let mut findings = Vec::new();

    let churners: Vec<String> = summary
        .tasks
        .iter()
        .filter(|t| t.retries >= 2)
        .map(|t| t.task_id.clone())
        .collect();
    if !churners.is_empty() {
        findings.push(RetrospectiveFinding {
            pattern: "retry_churn".to_string(),
            severity: "high".to_string(),
            task_ids: churners,
            recommendation:
                "Tasks needed repeated remediation; tighten task scoping or improve the prompts \
                 sent on failure."
                    .to_string(),
        });
    }

    let reopened: Vec<String> = summary
        .tasks
        .iter()
        .filter(|t| t.reopen_count > 0)
        .map(|t| t.task_id.clone())
        .collect();
    if !reopened.is_empty() {
        findings.push(RetrospectiveFinding {
            pattern: "reopened_work".to_string(),
            severity: "medium".to_string(),
            task_ids: reopened,
            recommendation:
                "Work left a terminal state and came back; review completion criteria before \
                 closing out."
                    .to_string(),
        });
    }

    // Long cycle time: strictly above the 75th percentile of completed tasks.
    let mut cycles: Vec<u64> = summary.tasks.iter().filter_map(|t| t.cycle_time_ms).collect();
    if !cycles.is_empty() {
        cycles.sort_unstable();
        let idx = (cycles.len().saturating_sub(1)) * 3 / 4;
        let p75 = cycles[idx];
        let slow: Vec<String> = summary
            .tasks
            .iter()
            .filter(|t| t.cycle_time_ms.is_some_and(|c| c > p75))
            .map(|t| t.task_id.clone())
            .collect();
        if !slow.is_empty() {
            findings.push(RetrospectiveFinding {
                pattern: "long_cycle_time".to_string(),
                severity: "medium".to_string(),
                task_ids: slow,
                recommendation: format!(
                    "Cycle time exceeded the 75th percentile ({} ms); consider splitting these \
                     tasks or raising their priority earlier.",
                    p75
                ),
            });
        }
    }

    let incomplete: Vec<String> = summary
        .tasks
        .iter()
        .filter(|t| t.started_at.is_some() && t.completed_at.is_none())
        .map(|t| t.task_id.clone())
        .collect();
    if !incomplete.is_empty() {
        findings.push(RetrospectiveFinding {
            pattern: "incomplete_work".to_string(),
            severity: "low".to_string(),
            task_ids: incomplete,
            recommendation: "Tasks started but never reached a terminal status; check for \
                             abandoned sessions."
                .to_string(),
        });
    }

    findings
}

/// Scans every project's outcome log under the data root.
#[derive(Debug, Clone)]
pub struct OutcomeScanner {
    data_root: PathBuf,
}

impl OutcomeScanner {
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
        }
    }

    /// Summary over all project logs, filtered by `query`.
    pub fn summary(&self, query: &OutcomeQuery) -> Result<OutcomeSummary, OutcomeError> {
        let mut records = Vec::new();
        let entries = match std::fs::read_dir(&self.data_root) {
            Ok(e) => e,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(OutcomeSummary::default())
            }
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let log = entry.path().join("metrics/outcome-transitions.jsonl");
            records.extend(read_records(&log)?);
        }
        Ok(OutcomeSummary::derive(records, query))
    }
}

#[cfg(test)]
#[path = "outcome_tests.rs"]
mod tests;
