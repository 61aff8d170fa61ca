// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session status state machine and activity classification.
//!
//! The status graph admits only the edges listed in `can_transition`; the
//! lifecycle manager persists at most one transition per poll, so an illegal
//! edge here means a bug upstream, not a race.

use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors from status transitions
#[derive(Debug, Error)]
pub enum StatusError {
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: SessionStatus, to: SessionStatus },
    #[error("unknown session status: {0}")]
    Unknown(String),
}

impl StatusError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StatusError::InvalidTransition { .. } => ErrorKind::Conflict,
            StatusError::Unknown(_) => ErrorKind::InvalidInput,
        }
    }
}

/// Lifecycle status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Spawning,
    Working,
    PrOpen,
    CiFailed,
    ReviewPending,
    ChangesRequested,
    Approved,
    Mergeable,
    Merged,
    Cleanup,
    Done,
    NeedsInput,
    Stuck,
    Errored,
    Killed,
    VerifierPending,
    VerifierFailed,
    PrReady,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Spawning => "spawning",
            SessionStatus::Working => "working",
            SessionStatus::PrOpen => "pr_open",
            SessionStatus::CiFailed => "ci_failed",
            SessionStatus::ReviewPending => "review_pending",
            SessionStatus::ChangesRequested => "changes_requested",
            SessionStatus::Approved => "approved",
            SessionStatus::Mergeable => "mergeable",
            SessionStatus::Merged => "merged",
            SessionStatus::Cleanup => "cleanup",
            SessionStatus::Done => "done",
            SessionStatus::NeedsInput => "needs_input",
            SessionStatus::Stuck => "stuck",
            SessionStatus::Errored => "errored",
            SessionStatus::Killed => "killed",
            SessionStatus::VerifierPending => "verifier_pending",
            SessionStatus::VerifierFailed => "verifier_failed",
            SessionStatus::PrReady => "pr_ready",
        }
    }

    /// Terminal statuses end the session's lifecycle; `cleanup` still has a
    /// pending `done` edge and is not terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Done | SessionStatus::Killed | SessionStatus::Errored
        )
    }

    /// Whether the given edge is in the status graph.
    pub fn can_transition(from: SessionStatus, to: SessionStatus) -> bool {
        use SessionStatus::*;

        if from == to {
            return false;
        }

        // Escape hatches: any state may error or be killed; any live state
        // may surface needs_input/stuck from agent observation.
        match to {
            Errored | Killed => return true,
            NeedsInput | Stuck if !from.is_terminal() => return true,
            _ => {}
        }

        matches!(
            (from, to),
            (Spawning, Working)
                | (Working, PrOpen)
                | (Working, VerifierPending)
                | (PrOpen, CiFailed)
                | (PrOpen, ReviewPending)
                | (PrOpen, ChangesRequested)
                | (PrOpen, Approved)
                | (PrOpen, Mergeable)
                | (CiFailed, PrOpen)
                | (CiFailed, ChangesRequested)
                | (ReviewPending, Approved)
                | (ReviewPending, ChangesRequested)
                | (ChangesRequested, PrOpen)
                | (ChangesRequested, CiFailed)
                | (Approved, Mergeable)
                | (Mergeable, Merged)
                | (Merged, Cleanup)
                | (Cleanup, Done)
                | (VerifierPending, VerifierFailed)
                | (VerifierPending, PrReady)
                | (VerifierFailed, Working)
                | (VerifierFailed, VerifierPending)
                | (PrReady, PrOpen)
                | (NeedsInput, Working)
                | (Stuck, Working)
        )
    }

    /// Validate an edge, returning `Conflict` on anything unlisted.
    pub fn transition(self, to: SessionStatus) -> Result<SessionStatus, StatusError> {
        if Self::can_transition(self, to) {
            Ok(to)
        } else {
            Err(StatusError::InvalidTransition { from: self, to })
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use SessionStatus::*;
        Ok(match s {
            "spawning" => Spawning,
            "working" => Working,
            "pr_open" => PrOpen,
            "ci_failed" => CiFailed,
            "review_pending" => ReviewPending,
            "changes_requested" => ChangesRequested,
            "approved" => Approved,
            "mergeable" => Mergeable,
            "merged" => Merged,
            "cleanup" => Cleanup,
            "done" => Done,
            "needs_input" => NeedsInput,
            "stuck" => Stuck,
            "errored" => Errored,
            "killed" => Killed,
            "verifier_pending" => VerifierPending,
            "verifier_failed" => VerifierFailed,
            "pr_ready" => PrReady,
            other => return Err(StatusError::Unknown(other.to_string())),
        })
    }
}

/// Agent-reported activity, overlaid on sessions by the list/check paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    Active,
    Ready,
    Idle,
    WaitingInput,
    Blocked,
    Exited,
}

impl Activity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Activity::Active => "active",
            Activity::Ready => "ready",
            Activity::Idle => "idle",
            Activity::WaitingInput => "waiting_input",
            Activity::Blocked => "blocked",
            Activity::Exited => "exited",
        }
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Activity {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "active" => Activity::Active,
            "ready" => Activity::Ready,
            "idle" => Activity::Idle,
            "waiting_input" => Activity::WaitingInput,
            "blocked" => Activity::Blocked,
            "exited" => Activity::Exited,
            other => return Err(StatusError::Unknown(other.to_string())),
        })
    }
}

/// Presentation bucket derived from status + activity. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttentionLevel {
    Urgent,
    Action,
    Warning,
    Ok,
    Done,
}

impl AttentionLevel {
    /// Derive the attention bucket a dashboard would sort by.
    pub fn derive(status: SessionStatus, activity: Option<Activity>) -> Self {
        use SessionStatus::*;
        match status {
            Errored | NeedsInput => AttentionLevel::Urgent,
            CiFailed | ChangesRequested | Stuck | VerifierFailed => AttentionLevel::Action,
            Done | Merged | Cleanup | Killed => AttentionLevel::Done,
            _ if activity == Some(Activity::Exited) => AttentionLevel::Warning,
            _ => AttentionLevel::Ok,
        }
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
