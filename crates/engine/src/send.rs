// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session-send shaping: busy/idle detection, the wait loop, and the
//! user-visible delivery status.
//!
//! Delivery transport (literal keys vs paste buffer) belongs to the
//! runtime; this layer decides *when* to deliver and reports what happened.

use crate::error::EngineError;
use crate::session_manager::SessionManager;
use ao_core::clock::Clock;
use std::time::Duration;

/// Lines from the bottom searched for the busy marker.
const BUSY_WINDOW: usize = 3;

/// Lines from the bottom searched for an idle prompt.
const IDLE_WINDOW: usize = 5;

/// Poll cadence while waiting for a busy session to go idle.
const BUSY_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Capture size for busy/idle sampling.
const SEND_CAPTURE_LINES: u32 = 10;

/// Options for a send.
#[derive(Debug, Clone)]
pub struct SendOptions {
    /// Skip the busy-wait and deliver immediately.
    pub no_wait: bool,
    /// Give up waiting for idle after this long and deliver anyway.
    pub wait_timeout: Duration,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            no_wait: false,
            wait_timeout: Duration::from_secs(30),
        }
    }
}

/// What happened to the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    /// Delivered while the agent was mid-turn; it will process later.
    Processing,
    /// The agent queued the input behind its current turn.
    Queued,
    /// Delivered to an idle prompt.
    Sent,
}

impl SendStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SendStatus::Processing => "processing",
            SendStatus::Queued => "queued",
            SendStatus::Sent => "sent",
        }
    }
}

fn tail_lines(capture: &str, n: usize) -> Vec<&str> {
    capture
        .lines()
        .rev()
        .filter(|line| !line.trim().is_empty())
        .take(n)
        .collect()
}

/// Busy signal: `esc to interrupt` within the last few lines.
pub fn detect_busy(capture: &str) -> bool {
    tail_lines(capture, BUSY_WINDOW)
        .iter()
        .any(|line| line.contains("esc to interrupt"))
}

/// Idle signal: a prompt character at the end of the recent lines.
pub fn detect_idle_prompt(capture: &str) -> bool {
    tail_lines(capture, IDLE_WINDOW).iter().any(|line| {
        let trimmed = line.trim_end();
        trimmed.ends_with('\u{276f}') || trimmed.ends_with("> ") || trimmed == ">"
    })
}

/// Queued signal: input was accepted behind the current turn.
pub fn detect_queued(capture: &str) -> bool {
    capture.contains("Press up to edit queued messages")
}

impl<C: Clock> SessionManager<C> {
    /// Deliver a message to a session's runtime, honoring the busy/idle
    /// contract. Returns the user-visible delivery status.
    pub async fn send(
        &self,
        session_id: &str,
        message: &str,
        options: &SendOptions,
    ) -> Result<SendStatus, EngineError> {
        let session = self.get(session_id).await?;
        let handle = session
            .runtime_handle
            .clone()
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))?;
        let runtime = self.services.registry.runtime(&handle.runtime_name)?;

        if !runtime.is_alive(&handle).await? {
            return Err(EngineError::SessionNotFound(session_id.to_string()));
        }

        let mut capture = runtime.get_output(&handle, SEND_CAPTURE_LINES).await?;
        let mut was_busy = detect_busy(&capture);

        if was_busy && !options.no_wait {
            let polls = (options.wait_timeout.as_millis() / BUSY_POLL_INTERVAL.as_millis()).max(1);
            for _ in 0..polls {
                tokio::time::sleep(BUSY_POLL_INTERVAL).await;
                capture = runtime.get_output(&handle, SEND_CAPTURE_LINES).await?;
                if !detect_busy(&capture) && detect_idle_prompt(&capture) {
                    was_busy = false;
                    break;
                }
            }
        }

        runtime.clear_input(&handle).await?;
        runtime.send_message(&handle, message).await?;

        let status = if detect_queued(&capture) {
            SendStatus::Queued
        } else if was_busy {
            SendStatus::Processing
        } else {
            SendStatus::Sent
        };

        tracing::debug!(session_id, status = status.as_str(), "message delivered");
        Ok(status)
    }
}

#[cfg(test)]
#[path = "send_tests.rs"]
mod tests;
