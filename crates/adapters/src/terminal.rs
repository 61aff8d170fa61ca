// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal contract: attach a human terminal to a running session.

use ao_core::session::RuntimeHandle;
use async_trait::async_trait;
use thiserror::Error;

/// Errors from terminal operations
#[derive(Debug, Error)]
pub enum TerminalError {
    #[error("attach failed: {0}")]
    AttachFailed(String),
}

/// Terminal attachment contract.
#[async_trait]
pub trait Terminal: Send + Sync {
    /// Registry name ("tmux-attach", "web", ...).
    fn name(&self) -> &str;

    /// Open an interactive view onto the session.
    async fn open(&self, handle: &RuntimeHandle) -> Result<(), TerminalError>;
}

/// Headless default: attaching is a no-op.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopTerminal;

impl NoopTerminal {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Terminal for NoopTerminal {
    fn name(&self) -> &str {
        "noop"
    }

    async fn open(&self, handle: &RuntimeHandle) -> Result<(), TerminalError> {
        tracing::debug!(handle = %handle.id, "terminal attach suppressed (noop)");
        Ok(())
    }
}
