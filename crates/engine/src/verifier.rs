// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Verifier gate: a secondary session that grades a worker's evidence.
//!
//! The verifier is a normal session with `role=verifier` and
//! `verifierFor=<workerId>`; it writes its verdict into its own metadata.
//! Re-verification after a failed verdict is gated on the evidence bundle
//! actually changing.

use crate::error::EngineError;
use crate::evidence::{evidence_fingerprint, load_evidence, stamp_evidence_metadata};
use crate::session_manager::{SessionManager, SpawnRequest};
use ao_core::clock::Clock;
use ao_core::session::{SessionRole, VerifierVerdict};
use std::collections::BTreeMap;
use std::path::Path;

/// Worker metadata key holding the evidence digest of the last verification.
const FINGERPRINT_KEY: &str = "evidenceFingerprint";

/// Result of polling a worker's verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum VerifierPoll {
    /// No verifier found or no verdict yet.
    Pending,
    Failed { feedback: Option<String> },
    Passed,
}

impl<C: Clock> SessionManager<C> {
    /// Whether the worker's evidence bundle is complete.
    pub(crate) fn worker_evidence_complete(&self, workspace: &Path, session_id: &str) -> bool {
        load_evidence(workspace, session_id).is_complete()
    }

    /// Spawn a verifier for a worker and record the evidence fingerprint the
    /// verdict will apply to. Returns `false` when no verifier is configured.
    pub(crate) async fn start_verification(
        &self,
        project_id: &str,
        worker_id: &str,
        workspace: &Path,
    ) -> Result<bool, EngineError> {
        let Some(verifier_config) = self.services.config.verifier_for(project_id) else {
            return Ok(false);
        };

        let prompt = verifier_config.prompt.clone().unwrap_or_else(|| {
            format!(
                "You are verifying another agent's completed work in {}. Read the evidence \
                 bundle under .ao/evidence/{}/, re-run the tests it claims, and record your \
                 verdict (passed or failed) with feedback.",
                workspace.display(),
                worker_id
            )
        });

        let verifier = self
            .spawn(SpawnRequest {
                project_id: project_id.to_string(),
                issue_id: None,
                agent: verifier_config.agent.clone(),
                prompt: Some(prompt),
                role: SessionRole::Verifier,
            })
            .await?;

        let store = self.services.metadata(project_id)?;
        let mut updates = BTreeMap::new();
        updates.insert("verifierFor".to_string(), worker_id.to_string());
        store.update(verifier.id.as_str(), &updates)?;

        stamp_evidence_metadata(&store, worker_id, workspace)?;
        let mut worker_updates = BTreeMap::new();
        if let Some(fingerprint) = evidence_fingerprint(workspace, worker_id) {
            worker_updates.insert(FINGERPRINT_KEY.to_string(), fingerprint);
        }
        store.update(worker_id, &worker_updates)?;

        tracing::info!(
            worker_id,
            verifier_id = %verifier.id,
            "verifier session spawned"
        );
        Ok(true)
    }

    /// Read the verdict of the worker's most recent verifier, if any.
    pub(crate) fn poll_verifier(
        &self,
        project_id: &str,
        worker_id: &str,
    ) -> Result<VerifierPoll, EngineError> {
        let store = self.services.metadata(project_id)?;

        // Latest verifier wins; list() is sorted so the last match is newest
        // under the shared prefix numbering.
        let mut verdict = VerifierPoll::Pending;
        for session_id in store.list()? {
            let Ok(meta) = store.read(&session_id) else {
                continue;
            };
            if meta.verifier_for.as_deref() != Some(worker_id) {
                continue;
            }
            verdict = match meta.verifier_verdict {
                None => VerifierPoll::Pending,
                Some(VerifierVerdict::Failed) => VerifierPoll::Failed {
                    feedback: meta.verifier_feedback.clone(),
                },
                Some(VerifierVerdict::Passed) => VerifierPoll::Passed,
            };
        }
        Ok(verdict)
    }

    /// Whether the worker's evidence differs from the last verified bundle.
    pub(crate) fn evidence_changed(
        &self,
        project_id: &str,
        worker_id: &str,
        workspace: &Path,
    ) -> Result<bool, EngineError> {
        let store = self.services.metadata(project_id)?;
        let meta = store.read(worker_id)?;
        let recorded = meta.extra.get(FINGERPRINT_KEY).cloned();
        let current = evidence_fingerprint(workspace, worker_id);
        Ok(match (recorded, current) {
            (Some(recorded), Some(current)) => recorded != current,
            (None, Some(_)) => true,
            _ => false,
        })
    }

    /// Stamp the worker's verifier outcome.
    pub(crate) fn stamp_verifier_status(
        &self,
        project_id: &str,
        worker_id: &str,
        verdict: VerifierVerdict,
    ) -> Result<(), EngineError> {
        let store = self.services.metadata(project_id)?;
        let mut updates = BTreeMap::new();
        updates.insert(
            "verifierStatus".to_string(),
            verdict.as_str().to_string(),
        );
        store.update(worker_id, &updates)?;
        Ok(())
    }

    /// Retire a verifier session once its verdict has been consumed.
    pub(crate) async fn retire_verifier(&self, project_id: &str, worker_id: &str) {
        let store = match self.services.metadata(project_id) {
            Ok(store) => store,
            Err(_) => return,
        };
        let Ok(ids) = store.list() else { return };
        for session_id in ids {
            let Ok(meta) = store.read(&session_id) else {
                continue;
            };
            if meta.verifier_for.as_deref() == Some(worker_id) && meta.verifier_verdict.is_some()
            {
                if let Err(e) = self.kill(&session_id).await {
                    tracing::warn!(session_id, error = %e, "verifier teardown failed");
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "verifier_tests.rs"]
mod tests;
