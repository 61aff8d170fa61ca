// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reaction rules: configured responses to lifecycle events.
//!
//! A rule is either a notification (`auto=false` or `action=notify`) or an
//! automated remediation with a bounded retry budget. `escalateAfter` is a
//! duration string; retry budgets go in `retries` — an integer in
//! `escalateAfter` is rejected at deserialization so the two schemas cannot
//! be mixed.

use crate::error::ErrorKind;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors from reaction configuration
#[derive(Debug, Error)]
pub enum ReactionError {
    #[error("unknown reaction event: {0}")]
    UnknownEvent(String),
    #[error("invalid duration: {0}")]
    InvalidDuration(String),
}

impl ReactionError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidInput
    }
}

/// Parse a duration string like "30s", "5m", "1h" into a Duration
pub fn parse_duration(s: &str) -> Result<Duration, ReactionError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ReactionError::InvalidDuration("empty string".to_string()));
    }

    let (num_str, suffix) = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| (&s[..i], &s[i..]))
        .unwrap_or((s, ""));

    let num: u64 = num_str
        .parse()
        .map_err(|_| ReactionError::InvalidDuration(s.to_string()))?;

    let multiplier = match suffix.trim() {
        "ms" | "millis" | "milliseconds" => return Ok(Duration::from_millis(num)),
        "" | "s" | "sec" | "secs" | "seconds" => 1,
        "m" | "min" | "mins" | "minutes" => 60,
        "h" | "hr" | "hrs" | "hours" => 3600,
        "d" | "day" | "days" => 86400,
        other => {
            return Err(ReactionError::InvalidDuration(format!(
                "unknown suffix {:?} in {:?}",
                other, s
            )))
        }
    };

    Ok(Duration::from_secs(num * multiplier))
}

/// Lifecycle events a reaction can be configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReactionEvent {
    #[serde(rename = "ci-failed")]
    CiFailed,
    #[serde(rename = "changes-requested")]
    ChangesRequested,
    #[serde(rename = "bugbot-comments")]
    BugbotComments,
    #[serde(rename = "merge-conflicts")]
    MergeConflicts,
    #[serde(rename = "approved-and-green")]
    ApprovedAndGreen,
    #[serde(rename = "agent-stuck")]
    AgentStuck,
    #[serde(rename = "agent-needs-input")]
    AgentNeedsInput,
    #[serde(rename = "agent-exited")]
    AgentExited,
    #[serde(rename = "all-complete")]
    AllComplete,
    #[serde(rename = "agent-idle-no-pr")]
    AgentIdleNoPr,
}

impl ReactionEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionEvent::CiFailed => "ci-failed",
            ReactionEvent::ChangesRequested => "changes-requested",
            ReactionEvent::BugbotComments => "bugbot-comments",
            ReactionEvent::MergeConflicts => "merge-conflicts",
            ReactionEvent::ApprovedAndGreen => "approved-and-green",
            ReactionEvent::AgentStuck => "agent-stuck",
            ReactionEvent::AgentNeedsInput => "agent-needs-input",
            ReactionEvent::AgentExited => "agent-exited",
            ReactionEvent::AllComplete => "all-complete",
            ReactionEvent::AgentIdleNoPr => "agent-idle-no-pr",
        }
    }
}

impl fmt::Display for ReactionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ReactionEvent {
    type Err = ReactionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use ReactionEvent::*;
        Ok(match s {
            "ci-failed" => CiFailed,
            "changes-requested" => ChangesRequested,
            "bugbot-comments" => BugbotComments,
            "merge-conflicts" => MergeConflicts,
            "approved-and-green" => ApprovedAndGreen,
            "agent-stuck" => AgentStuck,
            "agent-needs-input" => AgentNeedsInput,
            "agent-exited" => AgentExited,
            "all-complete" => AllComplete,
            "agent-idle-no-pr" => AgentIdleNoPr,
            other => return Err(ReactionError::UnknownEvent(other.to_string())),
        })
    }
}

/// What an automated reaction does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReactionAction {
    #[serde(rename = "send-to-agent")]
    SendToAgent,
    #[serde(rename = "notify")]
    Notify,
    #[serde(rename = "auto-merge")]
    AutoMerge,
}

/// Notification priority, which selects the notifier route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyPriority {
    Urgent,
    Action,
    #[default]
    Warning,
    Info,
}

impl NotifyPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotifyPriority::Urgent => "urgent",
            NotifyPriority::Action => "action",
            NotifyPriority::Warning => "warning",
            NotifyPriority::Info => "info",
        }
    }
}

/// Priority -> notifier-name routing. Defaults match the built-in table and
/// are overridden wholesale per priority by config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationRouting {
    pub urgent: Vec<String>,
    pub action: Vec<String>,
    pub warning: Vec<String>,
    pub info: Vec<String>,
}

impl Default for NotificationRouting {
    fn default() -> Self {
        Self {
            urgent: vec!["desktop".into(), "slack".into(), "sms".into()],
            action: vec!["desktop".into(), "slack".into()],
            warning: vec!["slack".into()],
            info: vec!["slack".into()],
        }
    }
}

impl NotificationRouting {
    pub fn route(&self, priority: NotifyPriority) -> &[String] {
        match priority {
            NotifyPriority::Urgent => &self.urgent,
            NotifyPriority::Action => &self.action,
            NotifyPriority::Warning => &self.warning,
            NotifyPriority::Info => &self.info,
        }
    }
}

fn deserialize_duration_string<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => parse_duration(&s)
            .map(Some)
            .map_err(|e| D::Error::custom(e.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected a duration string (e.g. \"30m\"), got {}; use `retries` for a retry budget",
            other
        ))),
    }
}

/// One configured reaction rule.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReactionRule {
    /// Automated remediation (`true`) or notify-only (`false`).
    #[serde(default)]
    pub auto: bool,
    pub action: Option<ReactionAction>,
    /// Fallback message; also the whole payload when composition fails.
    pub message: Option<String>,
    pub priority: Option<NotifyPriority>,
    /// Retry budget before escalation.
    pub retries: Option<u32>,
    /// Wall-clock budget before escalation; duration strings only.
    #[serde(default, deserialize_with = "deserialize_duration_string")]
    pub escalate_after: Option<Duration>,
    /// Idle/ageing threshold for `agent-stuck` / `agent-idle-no-pr`.
    #[serde(default, deserialize_with = "deserialize_duration_string")]
    pub threshold: Option<Duration>,
}

/// Per-session escalation bookkeeping, persisted as a single metadata value.
///
/// Encoded as `<event>:<attempts>:<first_seen_ms>` so repeated polls can tell
/// whether the current event window already fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalationState {
    pub event: ReactionEvent,
    pub attempts: u32,
    pub first_seen_ms: u64,
}

impl EscalationState {
    pub fn new(event: ReactionEvent, now_ms: u64) -> Self {
        Self {
            event,
            attempts: 0,
            first_seen_ms: now_ms,
        }
    }

    pub fn encode(&self) -> String {
        format!("{}:{}:{}", self.event, self.attempts, self.first_seen_ms)
    }

    pub fn decode(s: &str) -> Option<Self> {
        let mut parts = s.splitn(3, ':');
        let event = parts.next()?.parse().ok()?;
        let attempts = parts.next()?.parse().ok()?;
        let first_seen_ms = parts.next()?.parse().ok()?;
        Some(Self {
            event,
            attempts,
            first_seen_ms,
        })
    }
}

#[cfg(test)]
#[path = "reaction_tests.rs"]
mod tests;
