// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared builders for other crates' tests. Compiled only for tests or with
//! the `test-support` feature.

use crate::config::{Defaults, OrchestratorConfig, ProjectConfig};
use crate::graph::TaskInput;
use crate::id::TaskId;
use std::collections::BTreeMap;
use std::path::Path;

/// A task input with dependencies, for graph tests.
pub fn task_input(id: &str, deps: &[&str]) -> TaskInput {
    let mut input = TaskInput::new(id);
    input.dependencies = deps.iter().map(|d| TaskId::new(*d)).collect();
    input
}

/// A minimal single-project config rooted at `project_path`.
pub fn config_with_project(
    config_path: &Path,
    project_id: &str,
    project_path: &Path,
) -> OrchestratorConfig {
    let mut projects = BTreeMap::new();
    projects.insert(
        project_id.to_string(),
        ProjectConfig {
            name: None,
            repo: None,
            path: project_path.to_path_buf(),
            default_branch: "main".to_string(),
            session_prefix: None,
            agent: None,
            runtime: None,
            tracker: None,
            scm: None,
            symlinks: Vec::new(),
            post_create: None,
            agent_config: None,
            reactions: BTreeMap::new(),
            verifier: None,
        },
    );

    OrchestratorConfig {
        config_path: config_path.to_path_buf(),
        port: None,
        ready_threshold_ms: Some(2_000),
        defaults: Defaults {
            runtime: "fake".to_string(),
            agent: "fake".to_string(),
            workspace: "fake".to_string(),
            notifiers: vec!["fake".to_string()],
            verifier: None,
        },
        projects,
        notifiers: BTreeMap::new(),
        notification_routing: Default::default(),
        reactions: BTreeMap::new(),
    }
}
