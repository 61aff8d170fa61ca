// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The validated configuration value the orchestrator is constructed from.
//!
//! Loading and validating the file is the host's job; the core only consumes
//! this shape. Reaction maps are keyed by event string and resolved through
//! `ReactionEvent::from_str`, so an unknown key surfaces as `InvalidInput`
//! at construction rather than being silently ignored.

use crate::reaction::{NotificationRouting, ReactionError, ReactionEvent, ReactionRule};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

/// Workspace-wide defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Defaults {
    pub runtime: String,
    pub agent: String,
    pub workspace: String,
    pub notifiers: Vec<String>,
    pub verifier: Option<VerifierConfig>,
}

/// Per-project verifier configuration. Presence enables the verifier gate.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifierConfig {
    #[serde(default)]
    pub agent: Option<String>,
    /// Prompt template handed to the verifier session; opaque to the core.
    #[serde(default)]
    pub prompt: Option<String>,
    /// Verification rounds before the gate gives up and escalates.
    #[serde(default)]
    pub max_rounds: Option<u32>,
}

/// One configured project.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub repo: Option<String>,
    pub path: PathBuf,
    #[serde(default = "default_branch")]
    pub default_branch: String,
    #[serde(default)]
    pub session_prefix: Option<String>,
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default)]
    pub runtime: Option<String>,
    #[serde(default)]
    pub tracker: Option<String>,
    #[serde(default)]
    pub scm: Option<String>,
    /// Paths symlinked into fresh workspaces (caches, env files).
    #[serde(default)]
    pub symlinks: Vec<String>,
    /// Command run inside a workspace after creation.
    #[serde(default)]
    pub post_create: Option<String>,
    /// Agent-plugin-specific settings, passed through opaquely.
    #[serde(default)]
    pub agent_config: Option<serde_json::Value>,
    #[serde(default)]
    pub reactions: BTreeMap<String, ReactionRule>,
    #[serde(default)]
    pub verifier: Option<VerifierConfig>,
}

fn default_branch() -> String {
    "main".to_string()
}

/// Named notifier instance configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct NotifierConfig {
    pub plugin: String,
    #[serde(flatten)]
    pub options: BTreeMap<String, serde_json::Value>,
}

/// The root configuration value.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorConfig {
    /// Path of the config file this value was loaded from; anchors the
    /// project hash.
    pub config_path: PathBuf,
    #[serde(default)]
    pub port: Option<u16>,
    /// Quiet-pane duration before an agent is considered ready for input.
    #[serde(default)]
    pub ready_threshold_ms: Option<u64>,
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub projects: BTreeMap<String, ProjectConfig>,
    #[serde(default)]
    pub notifiers: BTreeMap<String, NotifierConfig>,
    #[serde(default)]
    pub notification_routing: NotificationRouting,
    #[serde(default)]
    pub reactions: BTreeMap<String, ReactionRule>,
}

impl OrchestratorConfig {
    /// Check that every reaction key (global and per-project) names a known
    /// event.
    pub fn validate_reaction_events(&self) -> Result<(), ReactionError> {
        for key in self.reactions.keys() {
            ReactionEvent::from_str(key)?;
        }
        for project in self.projects.values() {
            for key in project.reactions.keys() {
                ReactionEvent::from_str(key)?;
            }
        }
        Ok(())
    }

    pub fn project(&self, project_id: &str) -> Option<&ProjectConfig> {
        self.projects.get(project_id)
    }

    /// Reaction rule for an event: project override, else global.
    pub fn reaction_for(&self, project_id: &str, event: ReactionEvent) -> Option<&ReactionRule> {
        let key = event.as_str();
        self.projects
            .get(project_id)
            .and_then(|p| p.reactions.get(key))
            .or_else(|| self.reactions.get(key))
    }

    /// Verifier configuration for a project: project override, else default.
    pub fn verifier_for(&self, project_id: &str) -> Option<&VerifierConfig> {
        self.projects
            .get(project_id)
            .and_then(|p| p.verifier.as_ref())
            .or(self.defaults.verifier.as_ref())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
