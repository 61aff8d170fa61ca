// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent contract: the AI coding tool launched inside a runtime.
//!
//! The agent plugin owns everything tool-specific — launch command, env,
//! pane-text heuristics — so swapping tools never touches the engine. The
//! engine captures runtime output and hands it in; agents never talk to the
//! runtime for observation.

mod claude;

pub use claude::ClaudeAgent;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeAgent;

use crate::runtime::{Runtime, RuntimeError};
use ao_core::session::{RuntimeHandle, Session};
use ao_core::status::Activity;
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Errors from agent operations
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
    #[error("workspace hook setup failed: {0}")]
    HookSetup(String),
}

/// Inputs the agent needs to compose its launch command and environment.
#[derive(Debug, Clone, Default)]
pub struct AgentLaunchConfig {
    /// Project-level `agentConfig`, opaque pass-through.
    pub agent_config: Option<serde_json::Value>,
    /// Quiet-pane duration before an agent counts as settled.
    pub ready_threshold_ms: Option<u64>,
}

/// Point-in-time activity classification with its onset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityDetection {
    pub activity: Activity,
    /// Epoch ms when the current activity began (last observed change).
    pub since_ms: u64,
    pub detail: Option<String>,
}

/// Agent tool contract.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Registry name of this agent ("claude", "aider", ...).
    fn name(&self) -> &str;

    /// Shell command the runtime should launch.
    fn launch_command(&self, config: &AgentLaunchConfig) -> String;

    /// Extra environment variables for the runtime session.
    fn environment(&self, config: &AgentLaunchConfig) -> Vec<(String, String)>;

    /// Classify captured pane text. Stateless; used by the send path.
    fn detect_activity(&self, capture: &str) -> Activity;

    /// Stateful classification for a session: tracks pane quiescence so the
    /// `ready`/`idle` split honors `ready_threshold_ms`. Returns `None` when
    /// the agent has nothing to add over raw runtime liveness.
    fn activity_state(
        &self,
        session: &Session,
        capture: &str,
        ready_threshold_ms: Option<u64>,
        now_ms: u64,
    ) -> Option<ActivityDetection>;

    /// Whether the agent process is still running under the handle.
    async fn is_process_running(
        &self,
        runtime: &dyn Runtime,
        handle: &RuntimeHandle,
    ) -> Result<bool, AgentError>;

    /// Agent-reported session info (model, token counts, ...), if any.
    fn session_info(&self, _session: &Session) -> Option<serde_json::Value> {
        None
    }

    /// Install agent-side hooks into a fresh workspace.
    async fn setup_workspace_hooks(
        &self,
        _workspace: &Path,
        _config: &AgentLaunchConfig,
    ) -> Result<(), AgentError> {
        Ok(())
    }
}
