// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The service bundle the engine is constructed from.
//!
//! One of the few process-wide singletons: the validated config, the plugin
//! registry, and the data root. Per-project stores are derived on demand so
//! every path stays addressable from the config path alone.

use crate::error::EngineError;
use ao_adapters::registry::PluginRegistry;
use ao_core::config::{OrchestratorConfig, ProjectConfig};
use ao_core::id::ProjectId;
use ao_storage::{MetadataStore, OutcomeLog, PlanStore, ProjectPaths};
use std::path::PathBuf;
use std::sync::Arc;

/// Shared handles for everything the engine touches.
pub struct Services {
    pub config: OrchestratorConfig,
    pub registry: Arc<PluginRegistry>,
    pub data_root: PathBuf,
}

impl Services {
    pub fn new(
        config: OrchestratorConfig,
        registry: Arc<PluginRegistry>,
        data_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            config,
            registry,
            data_root: data_root.into(),
        }
    }

    pub fn project(&self, project_id: &str) -> Result<&ProjectConfig, EngineError> {
        self.config
            .project(project_id)
            .ok_or_else(|| EngineError::ProjectNotFound(project_id.to_string()))
    }

    pub fn paths(&self, project_id: &str) -> Result<ProjectPaths, EngineError> {
        self.project(project_id)?;
        Ok(ProjectPaths::new(
            self.data_root.clone(),
            &self.config.config_path,
            ProjectId::new(project_id),
        )?)
    }

    pub fn metadata(&self, project_id: &str) -> Result<MetadataStore, EngineError> {
        Ok(MetadataStore::new(self.paths(project_id)?.sessions_dir()))
    }

    pub fn plans(&self, project_id: &str) -> Result<PlanStore, EngineError> {
        let paths = self.paths(project_id)?;
        Ok(PlanStore::new(
            paths.sessions_dir(),
            MetadataStore::new(paths.sessions_dir()),
        ))
    }

    pub fn outcome_log(&self, project_id: &str) -> Result<OutcomeLog, EngineError> {
        Ok(OutcomeLog::new(self.paths(project_id)?.outcome_log_file()))
    }

    /// Project ids in deterministic order.
    pub fn project_ids(&self) -> Vec<String> {
        self.config.projects.keys().cloned().collect()
    }
}
