// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project identity and on-disk layout.
//!
//! A project is namespaced by `<hash>-<projectId>` where the hash is the
//! first 12 hex digits of sha256 over the realpath of the directory holding
//! the config file. The `.origin` sentinel records which config created the
//! state directory and guards against hash collisions on reuse.

use ao_core::id::{validate_session_id, IdError, ProjectId};
use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Directory under `$HOME` that holds all orchestrator state.
pub const STATE_DIR_NAME: &str = ".agent-orchestrator";

/// Errors from path derivation and the origin guard
#[derive(Debug, Error)]
pub enum PathsError {
    #[error(transparent)]
    InvalidId(#[from] IdError),
    #[error("config path has no parent directory: {0}")]
    NoParent(PathBuf),
    #[error("home directory could not be determined")]
    NoHome,
    #[error("Hash collision detected: {dir} belongs to {recorded}, not {requested}")]
    OriginCollision {
        dir: PathBuf,
        recorded: String,
        requested: String,
    },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// First 12 hex digits of sha256 over the path string. Pure: equal inputs
/// give equal hashes across invocations.
pub fn hash_of(path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_os_str().as_encoded_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(12);
    for byte in digest.iter().take(6) {
        hex.push_str(&format!("{:02x}", byte));
    }
    hex
}

/// Hash of the realpath of the directory containing the config file.
pub fn config_hash(config_path: &Path) -> Result<String, PathsError> {
    let parent = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| PathsError::NoParent(config_path.to_path_buf()))?;
    let real = std::fs::canonicalize(parent)?;
    Ok(hash_of(&real))
}

/// `<prefix>-<n>` — the session id shape produced by spawn.
pub fn session_name(prefix: &str, n: u64) -> String {
    format!("{}-{}", prefix, n)
}

/// `<hash>-<prefix>-<n>` — globally unique runtime name for
/// filesystem-multiplexer runtimes.
pub fn tmux_name(hash: &str, prefix: &str, n: u64) -> String {
    format!("{}-{}-{}", hash, prefix, n)
}

/// Split a runtime name back into `(hash, prefix, n)`.
///
/// The hash is exactly 12 lowercase hex digits; the prefix may itself
/// contain hyphens, so the trailing integer is parsed from the last segment.
pub fn parse_tmux_name(name: &str) -> Option<(String, String, u64)> {
    let (hash, rest) = name.split_once('-')?;
    if hash.len() != 12 || !hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
    {
        return None;
    }
    let (prefix, num) = rest.rsplit_once('-')?;
    if prefix.is_empty() {
        return None;
    }
    let n = num.parse().ok()?;
    Some((hash.to_string(), prefix.to_string(), n))
}

/// Derive a short session prefix from a project id.
///
/// Fixed rules, applied in order:
/// 1. length <= 4: lowercase as-is
/// 2. mixed case with more than one uppercase letter: the uppercase letters,
///    lowercased
/// 3. contains `-` or `_`: first character of each segment
/// 4. otherwise: first three characters
pub fn derive_session_prefix(project_id: &str) -> String {
    if project_id.chars().count() <= 4 {
        return project_id.to_lowercase();
    }

    let uppercase: String = project_id.chars().filter(|c| c.is_uppercase()).collect();
    let has_lowercase = project_id.chars().any(|c| c.is_lowercase());
    if has_lowercase && uppercase.chars().count() > 1 {
        return uppercase.to_lowercase();
    }

    if project_id.contains('-') || project_id.contains('_') {
        return project_id
            .split(['-', '_'])
            .filter(|seg| !seg.is_empty())
            .filter_map(|seg| seg.chars().next())
            .collect::<String>()
            .to_lowercase();
    }

    project_id.chars().take(3).collect::<String>().to_lowercase()
}

/// All paths for one project's state directory.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    root: PathBuf,
    hash: String,
    project_id: ProjectId,
}

impl ProjectPaths {
    /// Derive paths from the data root, config path, and project id.
    pub fn new(
        data_root: impl Into<PathBuf>,
        config_path: &Path,
        project_id: ProjectId,
    ) -> Result<Self, PathsError> {
        validate_session_id(project_id.as_str())?;
        let hash = config_hash(config_path)?;
        Ok(Self {
            root: data_root.into(),
            hash,
            project_id,
        })
    }

    /// The default data root: `$HOME/.agent-orchestrator`.
    pub fn default_data_root() -> Result<PathBuf, PathsError> {
        dirs::home_dir()
            .map(|home| home.join(STATE_DIR_NAME))
            .ok_or(PathsError::NoHome)
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn project_id(&self) -> &ProjectId {
        &self.project_id
    }

    /// `<hash>-<projectId>` — the project's namespace.
    pub fn slug(&self) -> String {
        format!("{}-{}", self.hash, self.project_id)
    }

    /// `<root>/<hash>-<projectId>/`
    pub fn base_dir(&self) -> PathBuf {
        self.root.join(self.slug())
    }

    pub fn origin_file(&self) -> PathBuf {
        self.base_dir().join(".origin")
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.base_dir().join("sessions")
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.sessions_dir().join("archive")
    }

    pub fn plans_dir(&self) -> PathBuf {
        self.sessions_dir().join("plans")
    }

    pub fn worktrees_dir(&self) -> PathBuf {
        self.base_dir().join("worktrees")
    }

    pub fn metrics_dir(&self) -> PathBuf {
        self.base_dir().join("metrics")
    }

    pub fn outcome_log_file(&self) -> PathBuf {
        self.metrics_dir().join("outcome-transitions.jsonl")
    }

    /// Metadata file for a session. Rejects unsafe ids before touching paths.
    pub fn session_file(&self, session_id: &str) -> Result<PathBuf, PathsError> {
        validate_session_id(session_id)?;
        Ok(self.sessions_dir().join(session_id))
    }

    /// Workspace root for a session.
    pub fn worktree_dir(&self, session_id: &str) -> Result<PathBuf, PathsError> {
        validate_session_id(session_id)?;
        Ok(self.worktrees_dir().join(session_id))
    }

    /// Runtime name for session number `n` under `prefix`.
    pub fn tmux_name(&self, prefix: &str, n: u64) -> String {
        tmux_name(&self.hash, prefix, n)
    }

    /// Record (or verify) the config file that owns this state directory.
    ///
    /// First use writes the realpath of the config file into `.origin`;
    /// every later use must present the same path or the call fails before
    /// anything is written.
    pub fn validate_and_store_origin(&self, config_path: &Path) -> Result<(), PathsError> {
        let real = std::fs::canonicalize(config_path)?;
        let requested = real.to_string_lossy().to_string();
        let origin = self.origin_file();

        if origin.exists() {
            let recorded = std::fs::read_to_string(&origin)?.trim().to_string();
            if recorded != requested {
                return Err(PathsError::OriginCollision {
                    dir: self.base_dir(),
                    recorded,
                    requested,
                });
            }
            return Ok(());
        }

        std::fs::create_dir_all(self.base_dir())?;
        std::fs::write(&origin, format!("{}\n", requested))?;
        tracing::info!(dir = %self.base_dir().display(), origin = %requested, "project state directory initialized");
        Ok(())
    }
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
