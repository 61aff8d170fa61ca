// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace contract: an isolated code checkout owned by one session.

mod worktree;

pub use worktree::WorktreeWorkspace;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeWorkspace;

use ao_core::config::ProjectConfig;
use ao_core::id::SessionId;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from workspace operations
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("workspace create failed: {0}")]
    CreateFailed(String),
    #[error("workspace destroy failed: {0}")]
    DestroyFailed(String),
    #[error("workspace not found: {0}")]
    NotFound(String),
    #[error("post-create failed: {0}")]
    PostCreateFailed(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything needed to create or restore a workspace.
#[derive(Debug, Clone)]
pub struct WorkspaceSpec {
    pub session_id: SessionId,
    /// The project's source checkout.
    pub project_path: PathBuf,
    pub default_branch: String,
    /// Branch the session works on; `None` lets the adapter derive one.
    pub branch: Option<String>,
    /// Directory that holds per-session workspace roots.
    pub workspaces_root: PathBuf,
}

/// A created workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceInfo {
    pub path: PathBuf,
    pub branch: Option<String>,
}

/// Workspace isolation contract.
#[async_trait]
pub trait WorkspaceAdapter: Send + Sync {
    /// Registry name ("worktree", "clone", "volume", ...).
    fn name(&self) -> &str;

    /// Create an isolated workspace for the session.
    async fn create(&self, spec: &WorkspaceSpec) -> Result<WorkspaceInfo, WorkspaceError>;

    /// Remove a workspace. Safe to retry; a missing path is not an error.
    async fn destroy(&self, path: &Path) -> Result<(), WorkspaceError>;

    /// Workspace paths currently present under the root.
    async fn list(&self, workspaces_root: &Path) -> Result<Vec<PathBuf>, WorkspaceError>;

    async fn exists(&self, path: &Path) -> Result<bool, WorkspaceError>;

    /// Reattach to an existing workspace after a restart.
    async fn restore(&self, spec: &WorkspaceSpec, path: &Path)
        -> Result<WorkspaceInfo, WorkspaceError>;

    /// Project-configured setup after creation (symlinks, install step).
    async fn post_create(
        &self,
        _info: &WorkspaceInfo,
        _project: &ProjectConfig,
    ) -> Result<(), WorkspaceError> {
        Ok(())
    }
}
