// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Claude Code agent adapter.
//!
//! State detection works off captured pane text:
//! - `esc to interrupt` near the bottom means the agent is mid-turn
//! - a numbered option dialog means it is waiting on the human
//! - a bare prompt glyph means the turn is over; `ready` becomes `idle`
//!   once the pane has been quiet for `ready_threshold_ms`

use super::{ActivityDetection, Agent, AgentError, AgentLaunchConfig};
use crate::runtime::{Runtime, RuntimeError};
use ao_core::session::{RuntimeHandle, Session};
use ao_core::status::Activity;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Busy marker shown while Claude is generating.
const BUSY_MARKER: &str = "esc to interrupt";

/// Marker shown when input has been queued behind the current turn.
const QUEUED_MARKER: &str = "Press up to edit queued messages";

/// Lines from the bottom searched for the busy marker.
const BUSY_WINDOW: usize = 3;

/// Lines from the bottom searched for a prompt glyph.
const PROMPT_WINDOW: usize = 5;

/// Fallback quiet threshold when the config does not set one.
const DEFAULT_READY_THRESHOLD_MS: u64 = 5_000;

/// Extract the binary basename from a command string.
///
/// Handles absolute paths (`/usr/bin/claude` -> `claude`), relative paths
/// (`./claude` -> `claude`), and plain names. Falls back to `"claude"` for
/// empty strings.
pub fn extract_process_name(command: &str) -> String {
    command
        .split_whitespace()
        .next()
        .and_then(|first| first.rsplit('/').next())
        .filter(|name| !name.is_empty())
        .unwrap_or("claude")
        .to_string()
}

/// Whether the pane's tail shows the busy marker.
pub fn is_busy(capture: &str) -> bool {
    last_lines(capture, BUSY_WINDOW)
        .iter()
        .any(|line| line.contains(BUSY_MARKER))
}

/// Whether the pane's tail shows an idle input prompt.
pub fn is_idle_prompt(capture: &str) -> bool {
    last_lines(capture, PROMPT_WINDOW)
        .iter()
        .any(|line| {
            let trimmed = line.trim_end();
            trimmed.ends_with('\u{276f}') || trimmed.ends_with("> ") || trimmed == ">"
        })
}

/// Whether input has been queued behind the current turn.
pub fn is_queued(capture: &str) -> bool {
    capture.contains(QUEUED_MARKER)
}

fn last_lines(capture: &str, n: usize) -> Vec<&str> {
    let lines: Vec<&str> = capture
        .lines()
        .rev()
        .filter(|line| !line.trim().is_empty())
        .take(n)
        .collect();
    lines
}

/// A numbered selection dialog (permissions, trust, plan approval).
fn is_option_dialog(capture: &str) -> bool {
    last_lines(capture, PROMPT_WINDOW)
        .iter()
        .any(|line| line.trim_start().starts_with("\u{276f} 1."))
}

struct PaneTracker {
    fingerprint: u64,
    since_ms: u64,
}

/// Claude Code agent adapter
pub struct ClaudeAgent {
    /// Per-session pane fingerprints for quiescence tracking.
    panes: Mutex<HashMap<String, PaneTracker>>,
}

impl ClaudeAgent {
    pub fn new() -> Self {
        Self {
            panes: Mutex::new(HashMap::new()),
        }
    }

    fn command_from_config(config: &AgentLaunchConfig) -> String {
        let base = config
            .agent_config
            .as_ref()
            .and_then(|c| c.get("command"))
            .and_then(|c| c.as_str())
            .unwrap_or("claude");

        let args = config
            .agent_config
            .as_ref()
            .and_then(|c| c.get("args"))
            .and_then(|a| a.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default();

        if args.is_empty() {
            base.to_string()
        } else {
            format!("{} {}", base, args)
        }
    }

    /// Track pane quiescence: returns the epoch ms since the pane last
    /// changed for this session.
    fn quiet_since(&self, session_key: &str, capture: &str, now_ms: u64) -> u64 {
        let mut hasher = DefaultHasher::new();
        capture.hash(&mut hasher);
        let fingerprint = hasher.finish();

        let mut panes = self.panes.lock();
        match panes.get_mut(session_key) {
            Some(tracker) if tracker.fingerprint == fingerprint => tracker.since_ms,
            Some(tracker) => {
                tracker.fingerprint = fingerprint;
                tracker.since_ms = now_ms;
                now_ms
            }
            None => {
                panes.insert(
                    session_key.to_string(),
                    PaneTracker {
                        fingerprint,
                        since_ms: now_ms,
                    },
                );
                now_ms
            }
        }
    }
}

impl Default for ClaudeAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for ClaudeAgent {
    fn name(&self) -> &str {
        "claude"
    }

    fn launch_command(&self, config: &AgentLaunchConfig) -> String {
        Self::command_from_config(config)
    }

    fn environment(&self, config: &AgentLaunchConfig) -> Vec<(String, String)> {
        config
            .agent_config
            .as_ref()
            .and_then(|c| c.get("env"))
            .and_then(|e| e.as_object())
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn detect_activity(&self, capture: &str) -> Activity {
        if is_busy(capture) {
            return Activity::Active;
        }
        if is_option_dialog(capture) {
            return Activity::WaitingInput;
        }
        if is_idle_prompt(capture) {
            return Activity::Ready;
        }
        Activity::Active
    }

    fn activity_state(
        &self,
        session: &Session,
        capture: &str,
        ready_threshold_ms: Option<u64>,
        now_ms: u64,
    ) -> Option<ActivityDetection> {
        let since_ms = self.quiet_since(session.id.as_str(), capture, now_ms);
        let activity = match self.detect_activity(capture) {
            Activity::Ready => {
                let threshold = ready_threshold_ms.unwrap_or(DEFAULT_READY_THRESHOLD_MS);
                if now_ms.saturating_sub(since_ms) >= threshold {
                    Activity::Idle
                } else {
                    Activity::Ready
                }
            }
            other => other,
        };

        let detail = is_queued(capture).then(|| "queued input pending".to_string());
        Some(ActivityDetection {
            activity,
            since_ms,
            detail,
        })
    }

    async fn is_process_running(
        &self,
        runtime: &dyn Runtime,
        handle: &RuntimeHandle,
    ) -> Result<bool, AgentError> {
        match runtime.is_process_running(handle, "claude").await {
            Ok(running) => Ok(running),
            // Runtimes without process probing fall back to liveness.
            Err(RuntimeError::Unsupported(_)) => Ok(runtime.is_alive(handle).await?),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "claude_tests.rs"]
mod tests;
