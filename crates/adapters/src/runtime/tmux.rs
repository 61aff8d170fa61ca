// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tmux runtime adapter.

use super::{Runtime, RuntimeError, SessionSpec};
use ao_core::session::RuntimeHandle;
use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;

/// Messages longer than this (or containing newlines) go through a paste
/// buffer instead of literal send-keys.
const LITERAL_SEND_MAX: usize = 200;

/// Settle delay between paste-buffer delivery and the Enter key.
const PASTE_SETTLE: Duration = Duration::from_millis(300);

/// Upper bound on any single tmux invocation.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Tmux-based runtime adapter
#[derive(Debug, Clone, Default)]
pub struct TmuxRuntime;

impl TmuxRuntime {
    pub fn new() -> Self {
        Self
    }

    async fn run(args: &[&str]) -> Result<std::process::Output, RuntimeError> {
        tokio::time::timeout(COMMAND_TIMEOUT, Command::new("tmux").args(args).output())
            .await
            .map_err(|_| RuntimeError::CommandFailed("tmux command timed out".to_string()))?
            .map_err(|e| RuntimeError::CommandFailed(e.to_string()))
    }
}

#[async_trait]
impl Runtime for TmuxRuntime {
    fn name(&self) -> &str {
        "tmux"
    }

    async fn create(&self, spec: &SessionSpec) -> Result<RuntimeHandle, RuntimeError> {
        // Precondition: cwd must exist
        if !spec.cwd.exists() {
            return Err(RuntimeError::SpawnFailed(format!(
                "working directory does not exist: {}",
                spec.cwd.display()
            )));
        }

        // A stale session under the same name belongs to a dead run
        let existing = Self::run(&["has-session", "-t", &spec.name]).await;
        if existing.map(|o| o.status.success()).unwrap_or(false) {
            tracing::warn!(session = %spec.name, "runtime session already exists, killing first");
            let _ = Self::run(&["kill-session", "-t", &spec.name]).await;
        }

        let mut cmd = Command::new("tmux");
        cmd.arg("new-session")
            .arg("-d")
            .arg("-s")
            .arg(&spec.name)
            .arg("-c")
            .arg(&spec.cwd);

        for (key, value) in &spec.env {
            cmd.arg("-e").arg(format!("{}={}", key, value));
        }

        cmd.arg(&spec.command);

        let output = tokio::time::timeout(COMMAND_TIMEOUT, cmd.output())
            .await
            .map_err(|_| RuntimeError::SpawnFailed("tmux new-session timed out".to_string()))?
            .map_err(|e| RuntimeError::SpawnFailed(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!(session = %spec.name, stderr = %stderr, "tmux spawn failed");
            return Err(RuntimeError::SpawnFailed(stderr.to_string()));
        }

        // Log stderr even on success - may contain useful warnings
        if !output.stderr.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(session = %spec.name, stderr = %stderr, "tmux spawn stderr (non-fatal)");
        }

        Ok(RuntimeHandle::new(spec.name.clone(), "tmux"))
    }

    async fn destroy(&self, handle: &RuntimeHandle) -> Result<(), RuntimeError> {
        // Session might already be dead, which is fine
        let _ = Self::run(&["kill-session", "-t", &handle.id]).await?;
        Ok(())
    }

    async fn send_message(&self, handle: &RuntimeHandle, text: &str) -> Result<(), RuntimeError> {
        if text.len() > LITERAL_SEND_MAX || text.contains('\n') {
            self.send_via_buffer(handle, text).await?;
        } else {
            self.send_literal(handle, text).await?;
        }
        self.send_enter(handle).await
    }

    async fn clear_input(&self, handle: &RuntimeHandle) -> Result<(), RuntimeError> {
        let output = Self::run(&["send-keys", "-t", &handle.id, "C-u"]).await?;
        if !output.status.success() {
            return Err(RuntimeError::NotFound(handle.id.clone()));
        }
        Ok(())
    }

    async fn get_output(&self, handle: &RuntimeHandle, lines: u32) -> Result<String, RuntimeError> {
        let start = format!("-{}", lines);
        let output =
            Self::run(&["capture-pane", "-t", &handle.id, "-p", "-S", &start]).await?;
        if !output.status.success() {
            return Err(RuntimeError::NotFound(handle.id.clone()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn is_alive(&self, handle: &RuntimeHandle) -> Result<bool, RuntimeError> {
        let output = Self::run(&["has-session", "-t", &handle.id]).await?;
        Ok(output.status.success())
    }

    async fn list_sessions(&self) -> Result<Vec<String>, RuntimeError> {
        let output = Self::run(&["list-sessions", "-F", "#{session_name}"]).await?;
        if !output.status.success() {
            // No server running means no sessions
            return Ok(Vec::new());
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(String::from)
            .collect())
    }

    async fn attach(&self, handle: &RuntimeHandle) -> Result<(), RuntimeError> {
        let output = Self::run(&["attach-session", "-t", &handle.id]).await?;
        if !output.status.success() {
            return Err(RuntimeError::NotFound(handle.id.clone()));
        }
        Ok(())
    }

    /// Whether a process matching `pattern` runs inside the session's pane.
    async fn is_process_running(
        &self,
        handle: &RuntimeHandle,
        pattern: &str,
    ) -> Result<bool, RuntimeError> {
        let output = Self::run(&["list-panes", "-t", &handle.id, "-F", "#{pane_pid}"]).await?;
        if !output.status.success() {
            return Err(RuntimeError::NotFound(handle.id.clone()));
        }

        let pane_pid = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if pane_pid.is_empty() {
            return Ok(false);
        }

        // The pane may exec the command directly (ps) or via a shell (pgrep).
        let (ps_output, pgrep_output) = tokio::try_join!(
            async {
                Command::new("ps")
                    .args(["-p", &pane_pid, "-o", "command="])
                    .output()
                    .await
                    .map_err(|e| RuntimeError::CommandFailed(e.to_string()))
            },
            async {
                Command::new("pgrep")
                    .args(["-P", &pane_pid, "-f", pattern])
                    .output()
                    .await
                    .map_err(|e| RuntimeError::CommandFailed(e.to_string()))
            },
        )?;

        if ps_output.status.success() {
            let cmd_line = String::from_utf8_lossy(&ps_output.stdout);
            if cmd_line.contains(pattern) {
                return Ok(true);
            }
        }

        Ok(pgrep_output.status.success())
    }
}

impl TmuxRuntime {
    async fn send_literal(&self, handle: &RuntimeHandle, text: &str) -> Result<(), RuntimeError> {
        // -l = literal mode (no key name interpretation)
        // -- = end of options (handles text starting with -)
        let output = Self::run(&["send-keys", "-t", &handle.id, "-l", "--", text]).await?;
        if !output.status.success() {
            return Err(RuntimeError::NotFound(handle.id.clone()));
        }
        Ok(())
    }

    /// Long/multi-line delivery through a uniquely-named buffer: write the
    /// text to a temp file, `load-buffer`, `paste-buffer -d`, then Enter
    /// after a settle delay so the pane has consumed the paste.
    async fn send_via_buffer(&self, handle: &RuntimeHandle, text: &str) -> Result<(), RuntimeError> {
        let buffer = format!("ao-{}", uuid::Uuid::new_v4());
        let dir = tempfile::tempdir().map_err(|e| RuntimeError::CommandFailed(e.to_string()))?;
        let file = dir.path().join("message");
        tokio::fs::write(&file, text)
            .await
            .map_err(|e| RuntimeError::CommandFailed(e.to_string()))?;

        let file_str = file.to_string_lossy().to_string();
        let output = Self::run(&["load-buffer", "-b", &buffer, &file_str]).await?;
        if !output.status.success() {
            return Err(RuntimeError::CommandFailed(format!(
                "load-buffer: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        // -d deletes the buffer after pasting
        let output =
            Self::run(&["paste-buffer", "-d", "-b", &buffer, "-t", &handle.id]).await?;
        if !output.status.success() {
            return Err(RuntimeError::NotFound(handle.id.clone()));
        }

        tokio::time::sleep(PASTE_SETTLE).await;
        Ok(())
    }

    async fn send_enter(&self, handle: &RuntimeHandle) -> Result<(), RuntimeError> {
        let output = Self::run(&["send-keys", "-t", &handle.id, "Enter"]).await?;
        if !output.status.success() {
            return Err(RuntimeError::NotFound(handle.id.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tmux_tests.rs"]
mod tests;
