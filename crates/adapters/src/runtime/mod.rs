// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime contract: the execution substrate behind which an agent runs.
//!
//! A handle must be pingable without side effects, and every implementation
//! must be safe for concurrent use.

mod tmux;

pub use tmux::TmuxRuntime;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeRuntime, RuntimeCall};

use ao_core::session::RuntimeHandle;
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from runtime operations
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime session not found: {0}")]
    NotFound(String),
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("command failed: {0}")]
    CommandFailed(String),
    #[error("operation not supported by this runtime: {0}")]
    Unsupported(&'static str),
}

/// Everything a runtime needs to start a session.
#[derive(Debug, Clone)]
pub struct SessionSpec {
    /// Host-unique runtime name (`<hash>-<prefix>-<n>` for multiplexers).
    pub name: String,
    pub cwd: PathBuf,
    /// Launch command, composed by the agent plugin.
    pub command: String,
    pub env: Vec<(String, String)>,
}

/// Execution substrate contract.
#[async_trait]
pub trait Runtime: Send + Sync + std::fmt::Debug {
    /// Registry name of this runtime ("tmux", "docker", ...).
    fn name(&self) -> &str;

    /// Start a session and return its handle.
    async fn create(&self, spec: &SessionSpec) -> Result<RuntimeHandle, RuntimeError>;

    /// Tear a session down. Destroying an already-dead session is not an
    /// error.
    async fn destroy(&self, handle: &RuntimeHandle) -> Result<(), RuntimeError>;

    /// Deliver a message to the session, including the trailing Enter.
    ///
    /// Implementations choose the transport: short single-line messages go
    /// as literal keys, long or multi-line ones through a paste buffer.
    async fn send_message(&self, handle: &RuntimeHandle, text: &str) -> Result<(), RuntimeError>;

    /// Clear any partially-typed input (control-U equivalent).
    async fn clear_input(&self, handle: &RuntimeHandle) -> Result<(), RuntimeError>;

    /// Capture the last `lines` lines of output.
    async fn get_output(&self, handle: &RuntimeHandle, lines: u32) -> Result<String, RuntimeError>;

    /// Whether the session is alive. Must be side-effect free.
    async fn is_alive(&self, handle: &RuntimeHandle) -> Result<bool, RuntimeError>;

    /// Whether a process matching `pattern` runs inside the session.
    async fn is_process_running(
        &self,
        _handle: &RuntimeHandle,
        _pattern: &str,
    ) -> Result<bool, RuntimeError> {
        Err(RuntimeError::Unsupported("is_process_running"))
    }

    /// Names of live sessions this runtime knows about. Used by spawn to
    /// avoid renaming over a live session the metadata lost track of.
    async fn list_sessions(&self) -> Result<Vec<String>, RuntimeError> {
        Ok(Vec::new())
    }

    /// Attach the user's terminal to the session, if supported.
    async fn attach(&self, _handle: &RuntimeHandle) -> Result<(), RuntimeError> {
        Err(RuntimeError::Unsupported("attach"))
    }
}
