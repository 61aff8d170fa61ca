// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Evidence bundle access for the lifecycle manager.
//!
//! Workers write the four JSON files; this side only reads. The fingerprint
//! is a content digest over the files present, used to gate re-verification
//! after a failed verdict.

use ao_core::evidence::{EvidenceBundle, EVIDENCE_DIR, EVIDENCE_FILES, EVIDENCE_SCHEMA_VERSION};
use ao_storage::{MetadataError, MetadataStore};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// `<workspace>/.ao/evidence/<sessionId>/`
pub fn evidence_dir(workspace: &Path, session_id: &str) -> PathBuf {
    workspace.join(EVIDENCE_DIR).join(session_id)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let content = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "unparseable evidence file");
            None
        }
    }
}

/// Load whatever evidence the worker has produced so far.
pub fn load_evidence(workspace: &Path, session_id: &str) -> EvidenceBundle {
    let dir = evidence_dir(workspace, session_id);
    EvidenceBundle {
        command_log: read_json(&dir.join("command-log.json")),
        tests_run: read_json(&dir.join("tests-run.json")),
        changed_paths: read_json(&dir.join("changed-paths.json")),
        known_risks: read_json(&dir.join("known-risks.json")),
    }
}

/// Content digest over the evidence files present. `None` when no file
/// exists yet, so "no evidence" never equals any real bundle.
pub fn evidence_fingerprint(workspace: &Path, session_id: &str) -> Option<String> {
    let dir = evidence_dir(workspace, session_id);
    let mut hasher = Sha256::new();
    let mut any = false;

    for name in EVIDENCE_FILES {
        let path = dir.join(name);
        if let Ok(bytes) = std::fs::read(&path) {
            hasher.update(name.as_bytes());
            hasher.update((bytes.len() as u64).to_le_bytes());
            hasher.update(&bytes);
            any = true;
        }
    }

    if !any {
        return None;
    }
    let digest = hasher.finalize();
    Some(digest.iter().fold(String::new(), |mut acc, b| {
        acc.push_str(&format!("{:02x}", b));
        acc
    }))
}

/// Record the evidence paths on the session's metadata once discovered.
pub fn stamp_evidence_metadata(
    store: &MetadataStore,
    session_id: &str,
    workspace: &Path,
) -> Result<(), MetadataError> {
    let dir = evidence_dir(workspace, session_id);
    let mut updates = BTreeMap::new();
    updates.insert(
        "evidenceSchemaVersion".to_string(),
        EVIDENCE_SCHEMA_VERSION.to_string(),
    );
    updates.insert("evidenceDir".to_string(), dir.display().to_string());
    updates.insert(
        "evidenceCommandLog".to_string(),
        dir.join("command-log.json").display().to_string(),
    );
    updates.insert(
        "evidenceTestsRun".to_string(),
        dir.join("tests-run.json").display().to_string(),
    );
    updates.insert(
        "evidenceChangedPaths".to_string(),
        dir.join("changed-paths.json").display().to_string(),
    );
    updates.insert(
        "evidenceKnownRisks".to_string(),
        dir.join("known-risks.json").display().to_string(),
    );
    store.update(session_id, &updates)
}

#[cfg(test)]
#[path = "evidence_tests.rs"]
mod tests;
