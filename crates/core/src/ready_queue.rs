// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic ready-queue computation over a task graph.
//!
//! Given the same graph state and config, `ready_queue` returns byte-identical
//! results: candidates sort by priority (desc), run count (asc, fairness),
//! ready-since (asc, never-ready last), then id.

use crate::graph::{GraphError, TaskGraph, TaskState};
use crate::id::TaskId;
use serde::{Deserialize, Serialize};

/// Scheduler configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerConfig {
    /// Maximum number of concurrently running tasks.
    pub concurrency_cap: u32,
    /// Priority assumed for nodes without an explicit one.
    #[serde(default)]
    pub default_priority: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency_cap: 1,
            default_priority: 0,
        }
    }
}

/// Result of a ready-queue computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyQueue {
    /// Task ids eligible to start now, at most `available_slots` of them.
    pub tasks: Vec<TaskId>,
    pub running_count: usize,
    pub available_slots: usize,
}

/// Compute the ready queue for `graph` under `config`.
///
/// Candidates are `pending`/`ready` tasks whose dependencies are all
/// complete; a dependency edge to a missing node is a hard error.
pub fn ready_queue(graph: &TaskGraph, config: &SchedulerConfig) -> Result<ReadyQueue, GraphError> {
    let running_count = graph
        .nodes()
        .filter(|n| n.state == TaskState::Running)
        .count();
    let available_slots = (config.concurrency_cap as usize).saturating_sub(running_count);

    if available_slots == 0 {
        return Ok(ReadyQueue {
            tasks: Vec::new(),
            running_count,
            available_slots,
        });
    }

    let mut candidates = Vec::new();
    for node in graph.nodes() {
        if !matches!(node.state, TaskState::Pending | TaskState::Ready) {
            continue;
        }
        let mut eligible = true;
        for dep in &node.dependencies {
            match graph.get(dep) {
                Some(dep_node) => {
                    if dep_node.state != TaskState::Complete {
                        eligible = false;
                        break;
                    }
                }
                None => {
                    return Err(GraphError::UnknownDependency {
                        task: node.id.clone(),
                        dependency: dep.clone(),
                    })
                }
            }
        }
        if eligible {
            candidates.push(node);
        }
    }

    candidates.sort_by(|a, b| {
        let pa = a.priority.unwrap_or(config.default_priority);
        let pb = b.priority.unwrap_or(config.default_priority);
        pb.cmp(&pa)
            .then_with(|| a.run_count.cmp(&b.run_count))
            .then_with(|| {
                // Never-ready tasks sort after everything with a timestamp.
                let ra = a.ready_since.unwrap_or(u64::MAX);
                let rb = b.ready_since.unwrap_or(u64::MAX);
                ra.cmp(&rb)
            })
            .then_with(|| a.id.cmp(&b.id))
    });

    candidates.truncate(available_slots);

    Ok(ReadyQueue {
        tasks: candidates.into_iter().map(|n| n.id.clone()).collect(),
        running_count,
        available_slots,
    })
}

#[cfg(test)]
#[path = "ready_queue_tests.rs"]
mod tests;
