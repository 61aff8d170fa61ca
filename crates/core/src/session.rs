// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session entity and the handles it carries.
//!
//! `sessions/<sessionId>` on disk is the authoritative record; this struct is
//! the in-memory projection the session manager and lifecycle manager pass
//! around. Mutation goes through the metadata store, never by writing the
//! struct back wholesale from stale state.

use crate::id::{IssueId, ProjectId, SessionId};
use crate::status::{Activity, SessionStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

/// Role a session plays in the fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionRole {
    #[default]
    Worker,
    Orchestrator,
    Verifier,
}

impl SessionRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionRole::Worker => "worker",
            SessionRole::Orchestrator => "orchestrator",
            SessionRole::Verifier => "verifier",
        }
    }
}

impl FromStr for SessionRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "worker" => Ok(SessionRole::Worker),
            "orchestrator" => Ok(SessionRole::Orchestrator),
            "verifier" => Ok(SessionRole::Verifier),
            other => Err(format!("unknown session role: {}", other)),
        }
    }
}

/// Verdict written by a verifier session to its own metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifierVerdict {
    Passed,
    Failed,
}

impl VerifierVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerifierVerdict::Passed => "passed",
            VerifierVerdict::Failed => "failed",
        }
    }
}

impl FromStr for VerifierVerdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "passed" => Ok(VerifierVerdict::Passed),
            "failed" => Ok(VerifierVerdict::Failed),
            other => Err(format!("unknown verifier verdict: {}", other)),
        }
    }
}

/// Reference to a pull request as reported by the SCM plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrRef {
    pub number: u64,
    pub owner: String,
    pub repo: String,
    pub url: String,
    pub title: String,
    pub state: String,
    pub is_draft: bool,
}

/// Opaque token returned by a runtime plugin.
///
/// `id` must be globally unique on the host; filesystem-multiplexer runtimes
/// form it as `<hash>-<prefix>-<num>`, others are free-form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeHandle {
    pub id: String,
    pub runtime_name: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl RuntimeHandle {
    pub fn new(id: impl Into<String>, runtime_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            runtime_name: runtime_name.into(),
            data: serde_json::Value::Null,
        }
    }
}

/// One agent instance working one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    pub project_id: ProjectId,
    pub status: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity: Option<Activity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_id: Option<IssueId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr: Option<PrRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_handle: Option<RuntimeHandle>,
    /// Agent-reported info, opaque to the core.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_info: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity_at: Option<String>,
    #[serde(default)]
    pub role: SessionRole,
    /// Free-form metadata carried alongside the typed fields.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Session {
    /// A freshly spawned session, before the runtime reports anything.
    pub fn new(id: SessionId, project_id: ProjectId) -> Self {
        Self {
            id,
            project_id,
            status: SessionStatus::Spawning,
            activity: None,
            branch: None,
            issue_id: None,
            pr: None,
            workspace_path: None,
            runtime_handle: None,
            agent_info: None,
            created_at: None,
            last_activity_at: None,
            role: SessionRole::Worker,
            metadata: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
