// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key=value session metadata files.
//!
//! One file per session under `sessions/`, one `key=value` pair per line,
//! UTF-8, LF-terminated. Keys are written in a fixed order so diffs stay
//! stable. `reserve` uses exclusive-create and is the one synchronous
//! primitive the spawn path relies on to defeat find-next-id races.

use ao_core::id::{validate_session_id, IdError};
use ao_core::plan::PlanStatus;
use ao_core::session::{PrRef, RuntimeHandle, SessionRole, VerifierVerdict};
use ao_core::status::SessionStatus;
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Recognized keys, in write order. Unknown keys follow, sorted.
const KEY_ORDER: [&str; 31] = [
    "worktree",
    "branch",
    "status",
    "tmuxName",
    "issue",
    "pr",
    "summary",
    "project",
    "agent",
    "createdAt",
    "lastActivityAt",
    "runtimeHandle",
    "dashboardPort",
    "terminalWsPort",
    "directTerminalWsPort",
    "planId",
    "planVersion",
    "planStatus",
    "planPath",
    "evidenceSchemaVersion",
    "evidenceDir",
    "evidenceCommandLog",
    "evidenceTestsRun",
    "evidenceChangedPaths",
    "evidenceKnownRisks",
    "escalationState",
    "verifierVerdict",
    "verifierFeedback",
    "verifierFor",
    "verifierStatus",
    "role",
];

/// Errors from metadata operations
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error(transparent)]
    InvalidId(#[from] IdError),
    #[error("session not found: {0}")]
    NotFound(String),
    #[error("invalid value for {key}: {value:?} ({message})")]
    InvalidValue {
        key: &'static str,
        value: String,
        message: String,
    },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Typed projection of a session metadata file.
#[derive(Debug, Clone, Default)]
pub struct SessionMetadata {
    pub worktree: Option<PathBuf>,
    pub branch: Option<String>,
    pub status: Option<SessionStatus>,
    pub tmux_name: Option<String>,
    pub issue: Option<String>,
    pub pr: Option<PrRef>,
    pub summary: Option<String>,
    pub project: Option<String>,
    pub agent: Option<String>,
    pub created_at: Option<String>,
    pub last_activity_at: Option<String>,
    pub runtime_handle: Option<RuntimeHandle>,
    pub dashboard_port: Option<u16>,
    pub terminal_ws_port: Option<u16>,
    pub direct_terminal_ws_port: Option<u16>,
    pub plan_id: Option<String>,
    pub plan_version: Option<u32>,
    pub plan_status: Option<PlanStatus>,
    pub plan_path: Option<String>,
    pub evidence_schema_version: Option<String>,
    pub evidence_dir: Option<String>,
    pub evidence_command_log: Option<String>,
    pub evidence_tests_run: Option<String>,
    pub evidence_changed_paths: Option<String>,
    pub evidence_known_risks: Option<String>,
    pub escalation_state: Option<String>,
    pub verifier_verdict: Option<VerifierVerdict>,
    pub verifier_feedback: Option<String>,
    pub verifier_for: Option<String>,
    pub verifier_status: Option<VerifierVerdict>,
    pub role: SessionRole,
    /// Keys outside the recognized set, preserved verbatim.
    pub extra: BTreeMap<String, String>,
}

impl SessionMetadata {
    fn from_raw(raw: BTreeMap<String, String>) -> Result<Self, MetadataError> {
        let mut meta = SessionMetadata::default();

        for (key, value) in raw {
            match key.as_str() {
                "worktree" => meta.worktree = Some(PathBuf::from(value)),
                "branch" => meta.branch = Some(value),
                "status" => {
                    meta.status = Some(parse_field("status", &value, value.parse())?);
                }
                "tmuxName" => meta.tmux_name = Some(value),
                "issue" => meta.issue = Some(value),
                "pr" => {
                    meta.pr = Some(parse_field("pr", &value, serde_json::from_str(&value))?);
                }
                "summary" => meta.summary = Some(value),
                "project" => meta.project = Some(value),
                "agent" => meta.agent = Some(value),
                "createdAt" => meta.created_at = Some(value),
                "lastActivityAt" => meta.last_activity_at = Some(value),
                "runtimeHandle" => {
                    meta.runtime_handle = Some(parse_field(
                        "runtimeHandle",
                        &value,
                        serde_json::from_str(&value),
                    )?);
                }
                "dashboardPort" => {
                    meta.dashboard_port = Some(parse_field("dashboardPort", &value, value.parse())?);
                }
                "terminalWsPort" => {
                    meta.terminal_ws_port =
                        Some(parse_field("terminalWsPort", &value, value.parse())?);
                }
                "directTerminalWsPort" => {
                    meta.direct_terminal_ws_port =
                        Some(parse_field("directTerminalWsPort", &value, value.parse())?);
                }
                "planId" => meta.plan_id = Some(value),
                "planVersion" => {
                    meta.plan_version = Some(parse_field("planVersion", &value, value.parse())?);
                }
                "planStatus" => {
                    meta.plan_status = Some(parse_field("planStatus", &value, value.parse())?);
                }
                "planPath" => meta.plan_path = Some(value),
                "evidenceSchemaVersion" => meta.evidence_schema_version = Some(value),
                "evidenceDir" => meta.evidence_dir = Some(value),
                "evidenceCommandLog" => meta.evidence_command_log = Some(value),
                "evidenceTestsRun" => meta.evidence_tests_run = Some(value),
                "evidenceChangedPaths" => meta.evidence_changed_paths = Some(value),
                "evidenceKnownRisks" => meta.evidence_known_risks = Some(value),
                "escalationState" => meta.escalation_state = Some(value),
                "verifierVerdict" => {
                    meta.verifier_verdict =
                        Some(parse_field("verifierVerdict", &value, value.parse())?);
                }
                "verifierFeedback" => meta.verifier_feedback = Some(value),
                "verifierFor" => meta.verifier_for = Some(value),
                "verifierStatus" => {
                    meta.verifier_status =
                        Some(parse_field("verifierStatus", &value, value.parse())?);
                }
                "role" => {
                    meta.role = parse_field("role", &value, value.parse())?;
                }
                _ => {
                    meta.extra.insert(key, value);
                }
            }
        }

        Ok(meta)
    }
}

fn parse_field<T, E: std::fmt::Display>(
    key: &'static str,
    value: &str,
    result: Result<T, E>,
) -> Result<T, MetadataError> {
    result.map_err(|e| MetadataError::InvalidValue {
        key,
        value: value.to_string(),
        message: e.to_string(),
    })
}

/// Store over one project's `sessions/` directory.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    sessions_dir: PathBuf,
}

impl MetadataStore {
    pub fn new(sessions_dir: impl Into<PathBuf>) -> Self {
        Self {
            sessions_dir: sessions_dir.into(),
        }
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    fn file_for(&self, session_id: &str) -> Result<PathBuf, MetadataError> {
        validate_session_id(session_id)?;
        Ok(self.sessions_dir.join(session_id))
    }

    /// Atomically claim a session id. Returns `false` if it is already taken.
    ///
    /// Exclusive-create closes the TOCTOU window between "find next free id"
    /// and "create": of two concurrent reservations, exactly one succeeds.
    pub fn reserve(&self, session_id: &str) -> Result<bool, MetadataError> {
        let path = self.file_for(session_id)?;
        std::fs::create_dir_all(&self.sessions_dir)?;
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Overwrite the file with `values`. Empty values are omitted.
    pub fn write(
        &self,
        session_id: &str,
        values: &BTreeMap<String, String>,
    ) -> Result<(), MetadataError> {
        let path = self.file_for(session_id)?;
        std::fs::create_dir_all(&self.sessions_dir)?;

        let mut out = String::new();
        for key in KEY_ORDER {
            if let Some(value) = values.get(key) {
                if !value.is_empty() {
                    out.push_str(key);
                    out.push('=');
                    out.push_str(value);
                    out.push('\n');
                }
            }
        }
        // BTreeMap iteration keeps unknown keys sorted.
        for (key, value) in values {
            if !KEY_ORDER.contains(&key.as_str()) && !value.is_empty() {
                out.push_str(key);
                out.push('=');
                out.push_str(value);
                out.push('\n');
            }
        }

        let mut file = std::fs::File::create(&path)?;
        file.write_all(out.as_bytes())?;
        Ok(())
    }

    /// Read-merge-write. An empty-string value removes the key.
    pub fn update(
        &self,
        session_id: &str,
        updates: &BTreeMap<String, String>,
    ) -> Result<(), MetadataError> {
        let mut current = self.read_raw(session_id)?;
        for (key, value) in updates {
            if value.is_empty() {
                current.remove(key);
            } else {
                current.insert(key.clone(), value.clone());
            }
        }
        self.write(session_id, &current)
    }

    /// Raw key=value map. Comments (`#`) and blank lines are ignored; the
    /// first `=` splits key from value, so values may contain `=`.
    pub fn read_raw(&self, session_id: &str) -> Result<BTreeMap<String, String>, MetadataError> {
        let path = self.file_for(session_id)?;
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(MetadataError::NotFound(session_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(parse_metadata(&content))
    }

    /// Typed projection of a session's metadata.
    pub fn read(&self, session_id: &str) -> Result<SessionMetadata, MetadataError> {
        let raw = self.read_raw(session_id)?;
        SessionMetadata::from_raw(raw)
    }

    /// Whether a metadata file exists for the id.
    pub fn exists(&self, session_id: &str) -> Result<bool, MetadataError> {
        Ok(self.file_for(session_id)?.exists())
    }

    /// Delete a session's metadata, optionally archiving it first as
    /// `archive/<id>_<iso-timestamp>`.
    pub fn delete(&self, session_id: &str, archive: bool) -> Result<(), MetadataError> {
        let path = self.file_for(session_id)?;
        if !path.exists() {
            return Err(MetadataError::NotFound(session_id.to_string()));
        }
        if archive {
            let archive_dir = self.sessions_dir.join("archive");
            std::fs::create_dir_all(&archive_dir)?;
            let stamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ");
            let dest = archive_dir.join(format!("{}_{}", session_id, stamp));
            std::fs::copy(&path, &dest)?;
        }
        std::fs::remove_file(&path)?;
        Ok(())
    }

    /// Session ids present on disk, excluding the archive directory,
    /// dotfiles, and anything that fails the id pattern.
    pub fn list(&self) -> Result<Vec<String>, MetadataError> {
        let entries = match std::fs::read_dir(&self.sessions_dir) {
            Ok(e) => e,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with('.') || validate_session_id(name).is_err() {
                continue;
            }
            ids.push(name.to_string());
        }
        ids.sort();
        Ok(ids)
    }

    /// Latest archived metadata for an id, by lexicographic max (ISO
    /// timestamps sort correctly). The character after the `<id>_` separator
    /// must be a digit so `be-1` never matches `be-10`'s archives.
    pub fn read_archived_raw(
        &self,
        session_id: &str,
    ) -> Result<Option<BTreeMap<String, String>>, MetadataError> {
        validate_session_id(session_id)?;
        let archive_dir = self.sessions_dir.join("archive");
        let entries = match std::fs::read_dir(&archive_dir) {
            Ok(e) => e,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let prefix = format!("{}_", session_id);
        let mut latest: Option<String> = None;
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(rest) = name.strip_prefix(&prefix) else {
                continue;
            };
            if !rest.chars().next().is_some_and(|c| c.is_ascii_digit()) {
                continue;
            }
            if latest.as_deref().map_or(true, |cur| name > cur) {
                latest = Some(name.to_string());
            }
        }

        match latest {
            Some(name) => {
                let content = std::fs::read_to_string(archive_dir.join(name))?;
                Ok(Some(parse_metadata(&content)))
            }
            None => Ok(None),
        }
    }
}

fn parse_metadata(content: &str) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for line in content.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            map.insert(key.to_string(), value.to_string());
        }
    }
    map
}

#[cfg(test)]
#[path = "metadata_tests.rs"]
mod tests;
