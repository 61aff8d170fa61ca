// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Slotted plugin registry.
//!
//! One map per slot, `name -> Arc<dyn Contract>`. The registry owns plugin
//! instances for the process; resolution order for a project is
//! project-specific override, then config default, then the hard-coded
//! default. Unknown names fail loud.

use crate::agent::Agent;
use crate::notify::Notifier;
use crate::runtime::Runtime;
use crate::scm::Scm;
use crate::terminal::Terminal;
use crate::tracker::Tracker;
use crate::workspace::WorkspaceAdapter;
use ao_core::config::OrchestratorConfig;
use ao_core::reaction::NotifyPriority;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Hard-coded slot defaults, used when neither project nor config says.
const DEFAULT_RUNTIME: &str = "tmux";
const DEFAULT_AGENT: &str = "claude";
const DEFAULT_WORKSPACE: &str = "worktree";
const DEFAULT_TRACKER: &str = "github";
const DEFAULT_SCM: &str = "github";
const DEFAULT_TERMINAL: &str = "noop";

/// Errors from registry operations
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown {slot} plugin: {name}")]
    UnknownPlugin { slot: &'static str, name: String },
    #[error("{slot} plugin already registered: {name}")]
    DuplicatePlugin { slot: &'static str, name: String },
}

/// Typed slot map over every plugin contract.
#[derive(Default)]
pub struct PluginRegistry {
    runtimes: HashMap<String, Arc<dyn Runtime>>,
    agents: HashMap<String, Arc<dyn Agent>>,
    workspaces: HashMap<String, Arc<dyn WorkspaceAdapter>>,
    trackers: HashMap<String, Arc<dyn Tracker>>,
    scms: HashMap<String, Arc<dyn Scm>>,
    notifiers: HashMap<String, Arc<dyn Notifier>>,
    terminals: HashMap<String, Arc<dyn Terminal>>,
}

macro_rules! slot_ops {
    ($slot:literal, $field:ident, $contract:ty, $register:ident, $get:ident, $list:ident) => {
        pub fn $register(
            &mut self,
            name: &str,
            instance: Arc<$contract>,
        ) -> Result<(), RegistryError> {
            if self.$field.contains_key(name) {
                return Err(RegistryError::DuplicatePlugin {
                    slot: $slot,
                    name: name.to_string(),
                });
            }
            self.$field.insert(name.to_string(), instance);
            Ok(())
        }

        pub fn $get(&self, name: &str) -> Result<Arc<$contract>, RegistryError> {
            self.$field
                .get(name)
                .cloned()
                .ok_or_else(|| RegistryError::UnknownPlugin {
                    slot: $slot,
                    name: name.to_string(),
                })
        }

        pub fn $list(&self) -> Vec<String> {
            let mut names: Vec<String> = self.$field.keys().cloned().collect();
            names.sort();
            names
        }
    };
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    slot_ops!("runtime", runtimes, dyn Runtime, register_runtime, runtime, list_runtimes);
    slot_ops!("agent", agents, dyn Agent, register_agent, agent, list_agents);
    slot_ops!(
        "workspace",
        workspaces,
        dyn WorkspaceAdapter,
        register_workspace,
        workspace,
        list_workspaces
    );
    slot_ops!("tracker", trackers, dyn Tracker, register_tracker, tracker, list_trackers);
    slot_ops!("scm", scms, dyn Scm, register_scm, scm, list_scms);
    slot_ops!(
        "notifier",
        notifiers,
        dyn Notifier,
        register_notifier,
        notifier,
        list_notifiers
    );
    slot_ops!(
        "terminal",
        terminals,
        dyn Terminal,
        register_terminal,
        terminal,
        list_terminals
    );

    /// Registry with every built-in plugin registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        // Registration into an empty registry cannot collide.
        let _ = registry.register_runtime("tmux", Arc::new(crate::runtime::TmuxRuntime::new()));
        let _ = registry.register_agent("claude", Arc::new(crate::agent::ClaudeAgent::new()));
        let _ = registry
            .register_workspace("worktree", Arc::new(crate::workspace::WorktreeWorkspace::new()));
        let _ = registry.register_tracker("github", Arc::new(crate::tracker::GithubTracker::new()));
        let _ = registry.register_scm("github", Arc::new(crate::scm::GhScm::new()));
        let _ = registry.register_notifier("desktop", Arc::new(crate::notify::DesktopNotifier::new()));
        let _ = registry.register_notifier("noop", Arc::new(crate::notify::NoopNotifier::new()));
        let _ = registry.register_terminal("noop", Arc::new(crate::terminal::NoopTerminal::new()));
        registry
    }

    /// Built-ins plus a validation pass over the names the config references.
    pub fn load_from_config(config: &OrchestratorConfig) -> Result<Self, RegistryError> {
        let registry = Self::with_builtins();

        for (project_id, project) in &config.projects {
            tracing::debug!(project_id, "resolving project plugins");
            registry.runtime_for_project(config, project_id)?;
            registry.agent_for_project(config, project_id)?;
            registry.workspace_for_project(config, project_id)?;
            if project.tracker.is_some() {
                registry.tracker_for_project(config, project_id)?;
            }
            if project.scm.is_some() {
                registry.scm_for_project(config, project_id)?;
            }
        }

        for notifier in config.notifiers.values() {
            registry.notifier(&notifier.plugin)?;
        }

        Ok(registry)
    }

    fn project_field<'a>(
        config: &'a OrchestratorConfig,
        project_id: &str,
        pick: fn(&'a ao_core::config::ProjectConfig) -> Option<&'a str>,
    ) -> Option<&'a str> {
        config.projects.get(project_id).and_then(pick)
    }

    /// project override -> config default -> hard-coded default
    pub fn runtime_for_project(
        &self,
        config: &OrchestratorConfig,
        project_id: &str,
    ) -> Result<Arc<dyn Runtime>, RegistryError> {
        let name = Self::project_field(config, project_id, |p| p.runtime.as_deref())
            .or(non_empty(&config.defaults.runtime))
            .unwrap_or(DEFAULT_RUNTIME);
        self.runtime(name)
    }

    pub fn agent_for_project(
        &self,
        config: &OrchestratorConfig,
        project_id: &str,
    ) -> Result<Arc<dyn Agent>, RegistryError> {
        let name = Self::project_field(config, project_id, |p| p.agent.as_deref())
            .or(non_empty(&config.defaults.agent))
            .unwrap_or(DEFAULT_AGENT);
        self.agent(name)
    }

    pub fn workspace_for_project(
        &self,
        config: &OrchestratorConfig,
        _project_id: &str,
    ) -> Result<Arc<dyn WorkspaceAdapter>, RegistryError> {
        // Workspace isolation is a fleet-wide choice; no per-project override.
        let name = non_empty(&config.defaults.workspace).unwrap_or(DEFAULT_WORKSPACE);
        self.workspace(name)
    }

    pub fn tracker_for_project(
        &self,
        config: &OrchestratorConfig,
        project_id: &str,
    ) -> Result<Arc<dyn Tracker>, RegistryError> {
        let name = Self::project_field(config, project_id, |p| p.tracker.as_deref())
            .unwrap_or(DEFAULT_TRACKER);
        self.tracker(name)
    }

    pub fn scm_for_project(
        &self,
        config: &OrchestratorConfig,
        project_id: &str,
    ) -> Result<Arc<dyn Scm>, RegistryError> {
        let name = Self::project_field(config, project_id, |p| p.scm.as_deref())
            .unwrap_or(DEFAULT_SCM);
        self.scm(name)
    }

    pub fn terminal_default(&self) -> Result<Arc<dyn Terminal>, RegistryError> {
        self.terminal(DEFAULT_TERMINAL)
    }

    /// Notifier instances for a priority, resolved through the routing table
    /// and the named notifier configs. Unknown plugin names fail loud;
    /// missing route entries resolve to no notifiers.
    pub fn notifiers_for_priority(
        &self,
        config: &OrchestratorConfig,
        priority: NotifyPriority,
    ) -> Result<Vec<Arc<dyn Notifier>>, RegistryError> {
        let mut resolved = Vec::new();
        for name in config.notification_routing.route(priority) {
            // A routed name is either a configured notifier or a plugin name.
            let plugin = config
                .notifiers
                .get(name)
                .map(|n| n.plugin.as_str())
                .unwrap_or(name.as_str());
            match self.notifier(plugin) {
                Ok(instance) => resolved.push(instance),
                Err(e) => {
                    // Routing tables list aspirational channels (sms, slack);
                    // skip unconfigured ones rather than failing the send.
                    tracing::debug!(name, error = %e, "notifier route entry not available");
                }
            }
        }
        Ok(resolved)
    }
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
