// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git-worktree workspace adapter.
//!
//! One worktree per session under the project's `worktrees/<sessionId>/`
//! directory, on its own branch off the default branch. Destroy removes the
//! worktree registration and the branch.

use super::{WorkspaceAdapter, WorkspaceError, WorkspaceInfo, WorkspaceSpec};
use ao_core::config::ProjectConfig;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Upper bound on any single git invocation.
const COMMAND_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(60);

/// Git worktree workspace adapter
#[derive(Clone, Default)]
pub struct WorktreeWorkspace;

impl WorktreeWorkspace {
    pub fn new() -> Self {
        Self
    }

    async fn git(cwd: &Path, args: &[&str]) -> Result<std::process::Output, WorkspaceError> {
        tokio::time::timeout(
            COMMAND_TIMEOUT,
            Command::new("git").current_dir(cwd).args(args).output(),
        )
        .await
        .map_err(|_| WorkspaceError::CreateFailed("git command timed out".to_string()))?
        .map_err(|e| WorkspaceError::CreateFailed(e.to_string()))
    }

    fn branch_for(spec: &WorkspaceSpec) -> String {
        spec.branch
            .clone()
            .unwrap_or_else(|| format!("ao/{}", spec.session_id))
    }
}

#[async_trait]
impl WorkspaceAdapter for WorktreeWorkspace {
    fn name(&self) -> &str {
        "worktree"
    }

    async fn create(&self, spec: &WorkspaceSpec) -> Result<WorkspaceInfo, WorkspaceError> {
        let path = spec.workspaces_root.join(spec.session_id.as_str());
        if path.exists() {
            return Err(WorkspaceError::CreateFailed(format!(
                "workspace path already exists: {}",
                path.display()
            )));
        }
        std::fs::create_dir_all(&spec.workspaces_root)?;

        let branch = Self::branch_for(spec);
        let path_str = path.to_string_lossy().to_string();

        // -B reuses a leftover branch from a destroyed workspace
        let output = Self::git(
            &spec.project_path,
            &[
                "worktree",
                "add",
                "-B",
                &branch,
                &path_str,
                &spec.default_branch,
            ],
        )
        .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!(
                session_id = %spec.session_id,
                branch = %branch,
                stderr = %stderr,
                "git worktree add failed"
            );
            return Err(WorkspaceError::CreateFailed(stderr.to_string()));
        }

        tracing::info!(session_id = %spec.session_id, path = %path.display(), branch = %branch, "workspace created");
        Ok(WorkspaceInfo {
            path,
            branch: Some(branch),
        })
    }

    async fn destroy(&self, path: &Path) -> Result<(), WorkspaceError> {
        if !path.exists() {
            return Ok(());
        }

        let path_str = path.to_string_lossy().to_string();
        let output = Self::git(path, &["worktree", "remove", "--force", &path_str]).await?;
        if !output.status.success() {
            // The registration may be gone while the directory remains
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(path = %path.display(), stderr = %stderr, "git worktree remove failed, deleting directory");
            std::fs::remove_dir_all(path)?;
        }
        Ok(())
    }

    async fn list(&self, workspaces_root: &Path) -> Result<Vec<PathBuf>, WorkspaceError> {
        let entries = match std::fs::read_dir(workspaces_root) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                paths.push(entry.path());
            }
        }
        paths.sort();
        Ok(paths)
    }

    async fn exists(&self, path: &Path) -> Result<bool, WorkspaceError> {
        Ok(path.exists())
    }

    async fn restore(
        &self,
        spec: &WorkspaceSpec,
        path: &Path,
    ) -> Result<WorkspaceInfo, WorkspaceError> {
        if !path.exists() {
            return Err(WorkspaceError::NotFound(path.display().to_string()));
        }

        // Current branch of the existing worktree
        let output = Self::git(path, &["rev-parse", "--abbrev-ref", "HEAD"]).await?;
        let branch = if output.status.success() {
            Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            Some(Self::branch_for(spec))
        };

        Ok(WorkspaceInfo {
            path: path.to_path_buf(),
            branch,
        })
    }

    async fn post_create(
        &self,
        info: &WorkspaceInfo,
        project: &ProjectConfig,
    ) -> Result<(), WorkspaceError> {
        // Symlink shared paths (caches, env files) from the project checkout
        for rel in &project.symlinks {
            let target = project.path.join(rel);
            let link = info.path.join(rel);
            if !target.exists() || link.exists() {
                continue;
            }
            if let Some(parent) = link.parent() {
                std::fs::create_dir_all(parent)?;
            }
            #[cfg(unix)]
            std::os::unix::fs::symlink(&target, &link)?;
        }

        if let Some(command) = &project.post_create {
            let output = Command::new("sh")
                .arg("-c")
                .arg(command)
                .current_dir(&info.path)
                .output()
                .await
                .map_err(|e| WorkspaceError::PostCreateFailed(e.to_string()))?;
            if !output.status.success() {
                return Err(WorkspaceError::PostCreateFailed(
                    String::from_utf8_lossy(&output.stderr).to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "worktree_tests.rs"]
mod tests;
