// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan task graph: arena of nodes keyed by id, with derived dependent edges.
//!
//! Nodes live in an `IndexMap` so iteration follows insertion order and the
//! graph stays deterministic. `dependents` is derived from `dependencies`
//! during build and is never authoritative for equality.

use crate::error::ErrorKind;
use crate::id::{IssueId, TaskId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors from graph construction and task transitions
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("duplicate task id: {0}")]
    DuplicateTask(TaskId),
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
    #[error("task {task} depends on unknown task {dependency}")]
    UnknownDependency { task: TaskId, dependency: TaskId },
    #[error("dependency cycle: {}", format_cycle(.0))]
    Cycle(Vec<TaskId>),
    #[error("invalid task transition for {task}: {from} -> {to}")]
    InvalidTransition {
        task: TaskId,
        from: TaskState,
        to: TaskState,
    },
    #[error("task {task} cannot become ready: dependency {dependency} is not complete")]
    DependenciesIncomplete { task: TaskId, dependency: TaskId },
    #[error("snapshot puts {task} in {state} while dependency {dependency} is not complete")]
    SnapshotViolation {
        task: TaskId,
        state: TaskState,
        dependency: TaskId,
    },
    #[error("plan blob has no task list (expected `tasks`, `nodes`, or `graph.nodes`): {0}")]
    InvalidBlob(String),
}

impl GraphError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GraphError::DuplicateTask(_)
            | GraphError::Cycle(_)
            | GraphError::InvalidTransition { .. }
            | GraphError::DependenciesIncomplete { .. } => ErrorKind::Conflict,
            GraphError::TaskNotFound(_) => ErrorKind::NotFound,
            GraphError::UnknownDependency { .. } | GraphError::InvalidBlob(_) => {
                ErrorKind::InvalidInput
            }
            GraphError::SnapshotViolation { .. } => ErrorKind::ContractViolation,
        }
    }
}

fn format_cycle(path: &[TaskId]) -> String {
    path.iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// State of a task node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Pending,
    Ready,
    Running,
    Complete,
    Blocked,
    Paused,
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskState::Pending => "pending",
            TaskState::Ready => "ready",
            TaskState::Running => "running",
            TaskState::Complete => "complete",
            TaskState::Blocked => "blocked",
            TaskState::Paused => "paused",
        };
        write!(f, "{}", s)
    }
}

/// Raw task entry as found in a plan blob. Subtasks nest arbitrarily and are
/// flattened before graph construction.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInput {
    pub id: TaskId,
    #[serde(default)]
    pub issue_id: Option<IssueId>,
    #[serde(default)]
    pub dependencies: Vec<TaskId>,
    #[serde(default)]
    pub state: Option<TaskState>,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub run_count: Option<u64>,
    #[serde(default)]
    pub ready_since: Option<u64>,
    #[serde(default)]
    pub subtasks: Vec<TaskInput>,
}

impl TaskInput {
    pub fn new(id: impl Into<TaskId>) -> Self {
        Self {
            id: id.into(),
            issue_id: None,
            dependencies: Vec::new(),
            state: None,
            priority: None,
            run_count: None,
            ready_since: None,
            subtasks: Vec::new(),
        }
    }
}

/// A task node in the built graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanTaskNode {
    pub id: TaskId,
    pub issue_id: Option<IssueId>,
    pub dependencies: Vec<TaskId>,
    /// Derived reverse edges; rebuilt on every construction.
    pub dependents: Vec<TaskId>,
    pub state: TaskState,
    pub priority: Option<i64>,
    pub run_count: u64,
    /// Epoch ms when the task last became ready. `None` sorts last.
    pub ready_since: Option<u64>,
}

/// Directed acyclic graph of plan tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    nodes: IndexMap<TaskId, PlanTaskNode>,
}

impl TaskGraph {
    /// Build a graph from flattened-or-nested task inputs.
    ///
    /// Order of operations: flatten subtasks, insert in input order, link
    /// dependents, detect cycles, then sync blocked/ready states.
    pub fn build(inputs: Vec<TaskInput>, now_ms: u64) -> Result<Self, GraphError> {
        let mut flat = Vec::new();
        flatten_into(inputs, &mut flat);

        let mut nodes: IndexMap<TaskId, PlanTaskNode> = IndexMap::with_capacity(flat.len());
        for input in flat {
            if nodes.contains_key(&input.id) {
                return Err(GraphError::DuplicateTask(input.id));
            }
            nodes.insert(
                input.id.clone(),
                PlanTaskNode {
                    id: input.id,
                    issue_id: input.issue_id,
                    dependencies: input.dependencies,
                    dependents: Vec::new(),
                    state: input.state.unwrap_or(TaskState::Pending),
                    priority: input.priority,
                    run_count: input.run_count.unwrap_or(0),
                    ready_since: input.ready_since,
                },
            );
        }

        // Cross-link dependents; every dependency must name a known node.
        let ids: Vec<TaskId> = nodes.keys().cloned().collect();
        for id in &ids {
            let deps = nodes[id].dependencies.clone();
            for dep in deps {
                match nodes.get_mut(&dep) {
                    Some(dep_node) => dep_node.dependents.push(id.clone()),
                    None => {
                        return Err(GraphError::UnknownDependency {
                            task: id.clone(),
                            dependency: dep,
                        })
                    }
                }
            }
        }

        let mut graph = Self { nodes };
        if let Some(path) = graph.find_cycle() {
            return Err(GraphError::Cycle(path));
        }
        graph.sync_blocked_ready(now_ms);
        Ok(graph)
    }

    /// Build from a plan blob, accepting `tasks`, `nodes`, or `graph.nodes`.
    pub fn from_blob(blob: &serde_json::Value, now_ms: u64) -> Result<Self, GraphError> {
        let list = blob
            .get("tasks")
            .or_else(|| blob.get("nodes"))
            .or_else(|| blob.get("graph").and_then(|g| g.get("nodes")))
            .ok_or_else(|| GraphError::InvalidBlob(short_blob(blob)))?;
        let inputs: Vec<TaskInput> = serde_json::from_value(list.clone())
            .map_err(|e| GraphError::InvalidBlob(e.to_string()))?;
        Self::build(inputs, now_ms)
    }

    pub fn get(&self, id: &TaskId) -> Option<&PlanTaskNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &PlanTaskNode> {
        self.nodes.values()
    }

    /// Find a dependency cycle, if any. The returned path closes on itself:
    /// the first and last element are the same task.
    pub fn find_cycle(&self) -> Option<Vec<TaskId>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        let mut color: IndexMap<&TaskId, Color> =
            self.nodes.keys().map(|id| (id, Color::White)).collect();

        fn visit<'a>(
            graph: &'a TaskGraph,
            id: &'a TaskId,
            color: &mut IndexMap<&'a TaskId, Color>,
            stack: &mut Vec<TaskId>,
        ) -> Option<Vec<TaskId>> {
            color.insert(id, Color::Gray);
            stack.push(id.clone());

            if let Some(node) = graph.nodes.get(id) {
                for dep in &node.dependencies {
                    match color.get(dep).copied() {
                        Some(Color::Gray) => {
                            // Close the cycle at the first occurrence of `dep`.
                            let start = stack.iter().position(|t| t == dep).unwrap_or(0);
                            let mut path: Vec<TaskId> = stack[start..].to_vec();
                            path.push(dep.clone());
                            return Some(path);
                        }
                        Some(Color::White) => {
                            if let Some(path) = visit(graph, dep, color, stack) {
                                return Some(path);
                            }
                        }
                        _ => {}
                    }
                }
            }

            color.insert(id, Color::Black);
            stack.pop();
            None
        }

        let ids: Vec<&TaskId> = self.nodes.keys().collect();
        for id in ids {
            if color.get(id) == Some(&Color::White) {
                let mut stack = Vec::new();
                if let Some(path) = visit(self, id, &mut color, &mut stack) {
                    return Some(path);
                }
            }
        }
        None
    }

    /// Recompute blocked/ready for every node that is not running, complete,
    /// or explicitly paused. Stamps `ready_since` on newly-ready nodes.
    pub fn sync_blocked_ready(&mut self, now_ms: u64) {
        let ids: Vec<TaskId> = self.nodes.keys().cloned().collect();
        for id in ids {
            let state = self.nodes[&id].state;
            if matches!(
                state,
                TaskState::Complete | TaskState::Running | TaskState::Paused
            ) {
                continue;
            }
            let ready = self.dependencies_complete(&id);
            let node = &mut self.nodes[&id];
            if ready {
                if node.state != TaskState::Ready {
                    node.state = TaskState::Ready;
                    if node.ready_since.is_none() {
                        node.ready_since = Some(now_ms);
                    }
                }
            } else {
                node.state = TaskState::Blocked;
            }
        }
    }

    /// Whether every dependency of `id` is complete.
    fn dependencies_complete(&self, id: &TaskId) -> bool {
        self.nodes[id]
            .dependencies
            .iter()
            .all(|dep| matches!(self.nodes.get(dep), Some(n) if n.state == TaskState::Complete))
    }

    /// First incomplete dependency of `id`, for error reporting.
    fn first_incomplete_dependency(&self, id: &TaskId) -> Option<TaskId> {
        self.nodes[id]
            .dependencies
            .iter()
            .find(|dep| {
                !matches!(self.nodes.get(*dep), Some(n) if n.state == TaskState::Complete)
            })
            .cloned()
    }

    /// Apply one task transition. Only `blocked -> ready -> running ->
    /// complete` is permitted; completing a task returns the dependents that
    /// became ready as a result.
    pub fn transition(
        &mut self,
        id: &TaskId,
        to: TaskState,
        now_ms: u64,
    ) -> Result<Vec<TaskId>, GraphError> {
        let from = self
            .nodes
            .get(id)
            .ok_or_else(|| GraphError::TaskNotFound(id.clone()))?
            .state;

        match (from, to) {
            (TaskState::Blocked, TaskState::Ready) => {
                if let Some(dep) = self.first_incomplete_dependency(id) {
                    return Err(GraphError::DependenciesIncomplete {
                        task: id.clone(),
                        dependency: dep,
                    });
                }
                let node = &mut self.nodes[id];
                node.state = TaskState::Ready;
                if node.ready_since.is_none() {
                    node.ready_since = Some(now_ms);
                }
                Ok(Vec::new())
            }
            (TaskState::Ready, TaskState::Running) => {
                let node = &mut self.nodes[id];
                node.state = TaskState::Running;
                node.run_count += 1;
                Ok(Vec::new())
            }
            (TaskState::Running, TaskState::Complete) => {
                self.nodes[id].state = TaskState::Complete;

                // Fan-out unlock: dependents whose remaining deps are all
                // complete become ready now.
                let dependents = self.nodes[id].dependents.clone();
                let mut unlocked = Vec::new();
                for dep_id in dependents {
                    let state = match self.nodes.get(&dep_id) {
                        Some(n) => n.state,
                        None => continue,
                    };
                    if matches!(state, TaskState::Blocked | TaskState::Pending)
                        && self.dependencies_complete(&dep_id)
                    {
                        let node = &mut self.nodes[&dep_id];
                        node.state = TaskState::Ready;
                        if node.ready_since.is_none() {
                            node.ready_since = Some(now_ms);
                        }
                        unlocked.push(dep_id);
                    }
                }
                Ok(unlocked)
            }
            (from, to) => Err(GraphError::InvalidTransition {
                task: id.clone(),
                from,
                to,
            }),
        }
    }

    /// `blocked -> paused`; every other state is a no-op. Returns whether the
    /// task was paused.
    pub fn pause(&mut self, id: &TaskId) -> Result<bool, GraphError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| GraphError::TaskNotFound(id.clone()))?;
        if node.state == TaskState::Blocked {
            node.state = TaskState::Paused;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// From `paused`, recompute `ready` vs `pending` by dependency completion.
    pub fn resume(&mut self, id: &TaskId, now_ms: u64) -> Result<bool, GraphError> {
        let state = self
            .nodes
            .get(id)
            .ok_or_else(|| GraphError::TaskNotFound(id.clone()))?
            .state;
        if state != TaskState::Paused {
            return Ok(false);
        }
        if self.dependencies_complete(id) {
            let node = &mut self.nodes[id];
            node.state = TaskState::Ready;
            if node.ready_since.is_none() {
                node.ready_since = Some(now_ms);
            }
        } else {
            self.nodes[id].state = TaskState::Pending;
        }
        Ok(true)
    }

    /// Persisted view: id -> state, deterministically ordered.
    pub fn snapshot(&self) -> BTreeMap<TaskId, TaskState> {
        self.nodes
            .iter()
            .map(|(id, node)| (id.clone(), node.state))
            .collect()
    }

    /// Restore states from a snapshot. Ids unknown to this graph are skipped
    /// (the plan may have dropped them); a snapshot that puts a task in
    /// `running`/`complete` while a dependency is incomplete is refused
    /// before any state is mutated.
    pub fn apply_snapshot(
        &mut self,
        snapshot: &BTreeMap<TaskId, TaskState>,
        now_ms: u64,
    ) -> Result<(), GraphError> {
        // Stage the post-apply states, then validate against them.
        let staged: IndexMap<&TaskId, TaskState> = self
            .nodes
            .iter()
            .map(|(id, node)| (id, snapshot.get(id).copied().unwrap_or(node.state)))
            .collect();

        for (id, state) in &staged {
            if !matches!(state, TaskState::Running | TaskState::Complete) {
                continue;
            }
            for dep in &self.nodes[*id].dependencies {
                if staged.get(dep) != Some(&TaskState::Complete) {
                    return Err(GraphError::SnapshotViolation {
                        task: (*id).clone(),
                        state: *state,
                        dependency: dep.clone(),
                    });
                }
            }
        }

        let updates: Vec<(TaskId, TaskState)> = staged
            .into_iter()
            .map(|(id, state)| (id.clone(), state))
            .collect();
        for (id, state) in updates {
            self.nodes[&id].state = state;
        }
        self.sync_blocked_ready(now_ms);
        Ok(())
    }
}

fn flatten_into(inputs: Vec<TaskInput>, out: &mut Vec<TaskInput>) {
    for mut input in inputs {
        let subtasks = std::mem::take(&mut input.subtasks);
        out.push(input);
        flatten_into(subtasks, out);
    }
}

fn short_blob(blob: &serde_json::Value) -> String {
    let s = blob.to_string();
    if s.len() > 80 {
        format!("{}...", &s[..80])
    } else {
        s
    }
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
