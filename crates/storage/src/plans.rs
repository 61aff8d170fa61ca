// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Versioned plan artifact store.
//!
//! Artifacts live at `sessions/plans/<sessionId>/<planId>.v<n>.json` and are
//! updated only through this store. Writing a new `(planId, planVersion)`
//! supersedes the session's previous current artifact; session metadata
//! always points at the current one.

use crate::metadata::{MetadataError, MetadataStore};
use ao_core::id::{validate_session_id, IdError};
use ao_core::plan::{PlanArtifact, PlanStatus};
use std::collections::BTreeMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Errors from plan artifact operations
#[derive(Debug, Error)]
pub enum PlanStoreError {
    #[error(transparent)]
    InvalidId(#[from] IdError),
    #[error("plan version must be a positive integer")]
    InvalidVersion,
    #[error("plan path escapes the project state directory: {0}")]
    InvalidPlanPath(String),
    #[error("session {0} has no current plan")]
    NoCurrentPlan(String),
    #[error("plan artifact not found: {0}")]
    ArtifactNotFound(String),
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error("plan artifact is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Input to `write_blob`.
#[derive(Debug, Clone)]
pub struct NewPlan {
    pub plan_id: String,
    pub plan_version: u32,
    /// Defaults to `draft` when the caller does not say otherwise.
    pub plan_status: PlanStatus,
    pub blob: serde_json::Value,
}

/// Store over one project's plan artifacts.
#[derive(Debug, Clone)]
pub struct PlanStore {
    sessions_dir: PathBuf,
    metadata: MetadataStore,
}

impl PlanStore {
    pub fn new(sessions_dir: impl Into<PathBuf>, metadata: MetadataStore) -> Self {
        Self {
            sessions_dir: sessions_dir.into(),
            metadata,
        }
    }

    /// Relative plan path for an id/version pair.
    fn plan_rel_path(session_id: &str, plan_id: &str, version: u32) -> String {
        format!("plans/{}/{}.v{}.json", session_id, plan_id, version)
    }

    /// Resolve a relative plan path, refusing anything that would escape the
    /// sessions directory. The id pattern already forbids traversal; this is
    /// the backstop for paths read back from metadata.
    fn resolve(&self, rel: &str) -> Result<PathBuf, PlanStoreError> {
        let rel_path = Path::new(rel);
        if rel_path.is_absolute()
            || rel_path
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(PlanStoreError::InvalidPlanPath(rel.to_string()));
        }
        let resolved = self.sessions_dir.join(rel_path);
        if !resolved.starts_with(&self.sessions_dir) {
            return Err(PlanStoreError::InvalidPlanPath(rel.to_string()));
        }
        Ok(resolved)
    }

    /// Write a plan blob for a session.
    ///
    /// Supersedes the previous current artifact when the new one differs by
    /// path, id, or version; preserves `createdAt` when overwriting the same
    /// artifact; patches the session metadata to point at the new plan.
    pub fn write_blob(
        &self,
        session_id: &str,
        plan: NewPlan,
        now_iso: &str,
    ) -> Result<PlanArtifact, PlanStoreError> {
        validate_session_id(session_id)?;
        validate_session_id(&plan.plan_id)?;
        if plan.plan_version == 0 {
            return Err(PlanStoreError::InvalidVersion);
        }

        let rel = Self::plan_rel_path(session_id, &plan.plan_id, plan.plan_version);
        let path = self.resolve(&rel)?;

        // Supersede the previous current artifact if it is a different one.
        let meta = self.metadata.read(session_id)?;
        if let Some(prev_rel) = meta.plan_path.as_deref() {
            let differs = prev_rel != rel
                || meta.plan_id.as_deref() != Some(plan.plan_id.as_str())
                || meta.plan_version != Some(plan.plan_version);
            if meta.plan_status != Some(PlanStatus::Superseded) && differs {
                self.supersede_artifact(prev_rel, now_iso)?;
            }
        }

        // Preserve createdAt across rewrites of the same artifact.
        let created_at = match self.read_artifact_at(&path) {
            Ok(existing) => existing.created_at,
            Err(PlanStoreError::ArtifactNotFound(_)) => now_iso.to_string(),
            Err(e) => return Err(e),
        };

        let artifact = PlanArtifact {
            plan_id: plan.plan_id.clone().into(),
            plan_version: plan.plan_version,
            plan_status: plan.plan_status,
            plan_path: rel.clone(),
            created_at,
            updated_at: now_iso.to_string(),
            blob: plan.blob,
        };
        self.write_artifact_at(&path, &artifact)?;

        let mut updates = BTreeMap::new();
        updates.insert("planId".to_string(), plan.plan_id);
        updates.insert("planVersion".to_string(), plan.plan_version.to_string());
        updates.insert(
            "planStatus".to_string(),
            plan.plan_status.as_str().to_string(),
        );
        updates.insert("planPath".to_string(), rel);
        self.metadata.update(session_id, &updates)?;

        tracing::info!(
            session_id,
            plan_id = %artifact.plan_id,
            plan_version = artifact.plan_version,
            "plan artifact written"
        );
        Ok(artifact)
    }

    /// The session's current artifact, resolved via metadata.
    pub fn read_blob(&self, session_id: &str) -> Result<PlanArtifact, PlanStoreError> {
        validate_session_id(session_id)?;
        let meta = self.metadata.read(session_id)?;
        let rel = meta
            .plan_path
            .ok_or_else(|| PlanStoreError::NoCurrentPlan(session_id.to_string()))?;
        let path = self.resolve(&rel)?;
        self.read_artifact_at(&path)
    }

    /// Set the current artifact's status, mirroring it into metadata.
    pub fn update_status(
        &self,
        session_id: &str,
        status: PlanStatus,
        now_iso: &str,
    ) -> Result<PlanArtifact, PlanStoreError> {
        validate_session_id(session_id)?;
        let meta = self.metadata.read(session_id)?;
        let rel = meta
            .plan_path
            .ok_or_else(|| PlanStoreError::NoCurrentPlan(session_id.to_string()))?;
        let path = self.resolve(&rel)?;

        let mut artifact = self.read_artifact_at(&path)?;
        artifact.plan_status = status;
        artifact.updated_at = now_iso.to_string();
        self.write_artifact_at(&path, &artifact)?;

        let mut updates = BTreeMap::new();
        updates.insert("planStatus".to_string(), status.as_str().to_string());
        self.metadata.update(session_id, &updates)?;
        Ok(artifact)
    }

    fn supersede_artifact(&self, rel: &str, now_iso: &str) -> Result<(), PlanStoreError> {
        let path = self.resolve(rel)?;
        let mut artifact = match self.read_artifact_at(&path) {
            Ok(a) => a,
            // A dangling pointer is not fatal; the new write repairs it.
            Err(PlanStoreError::ArtifactNotFound(_)) => {
                tracing::warn!(plan_path = rel, "previous plan artifact missing; skipping supersede");
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        if artifact.plan_status != PlanStatus::Superseded {
            artifact.plan_status = PlanStatus::Superseded;
            artifact.updated_at = now_iso.to_string();
            self.write_artifact_at(&path, &artifact)?;
        }
        Ok(())
    }

    fn read_artifact_at(&self, path: &Path) -> Result<PlanArtifact, PlanStoreError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(PlanStoreError::ArtifactNotFound(
                    path.display().to_string(),
                ))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    fn write_artifact_at(&self, path: &Path, artifact: &PlanArtifact) -> Result<(), PlanStoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut json = serde_json::to_string_pretty(artifact)?;
        json.push('\n');
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "plans_tests.rs"]
mod tests;
