// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake workspace adapter: plain directories, recorded destroys.

use super::{WorkspaceAdapter, WorkspaceError, WorkspaceInfo, WorkspaceSpec};
use ao_core::config::ProjectConfig;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Default)]
struct FakeWorkspaceState {
    destroyed: Vec<PathBuf>,
    post_created: Vec<PathBuf>,
    fail_create: bool,
}

/// Directory-backed workspace adapter for tests.
#[derive(Clone, Default)]
pub struct FakeWorkspace {
    state: Arc<Mutex<FakeWorkspaceState>>,
}

impl FakeWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn destroyed(&self) -> Vec<PathBuf> {
        self.state.lock().destroyed.clone()
    }

    pub fn post_created(&self) -> Vec<PathBuf> {
        self.state.lock().post_created.clone()
    }

    pub fn fail_next_create(&self) {
        self.state.lock().fail_create = true;
    }
}

#[async_trait]
impl WorkspaceAdapter for FakeWorkspace {
    fn name(&self) -> &str {
        "fake"
    }

    async fn create(&self, spec: &WorkspaceSpec) -> Result<WorkspaceInfo, WorkspaceError> {
        {
            let mut state = self.state.lock();
            if state.fail_create {
                state.fail_create = false;
                return Err(WorkspaceError::CreateFailed("scripted failure".to_string()));
            }
        }
        let path = spec.workspaces_root.join(spec.session_id.as_str());
        std::fs::create_dir_all(&path)?;
        Ok(WorkspaceInfo {
            path,
            branch: spec
                .branch
                .clone()
                .or_else(|| Some(format!("ao/{}", spec.session_id))),
        })
    }

    async fn destroy(&self, path: &Path) -> Result<(), WorkspaceError> {
        self.state.lock().destroyed.push(path.to_path_buf());
        if path.exists() {
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
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .map(|e| e.path())
            .collect();
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
        Ok(WorkspaceInfo {
            path: path.to_path_buf(),
            branch: spec.branch.clone(),
        })
    }

    async fn post_create(
        &self,
        info: &WorkspaceInfo,
        _project: &ProjectConfig,
    ) -> Result<(), WorkspaceError> {
        self.state.lock().post_created.push(info.path.clone());
        Ok(())
    }
}
