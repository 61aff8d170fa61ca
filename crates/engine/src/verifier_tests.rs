// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::session_manager::SpawnRequest;
use crate::test_helpers::{harness, harness_with, TestHarness};
use ao_core::config::VerifierConfig;

fn with_verifier() -> TestHarness {
    harness_with(|config| {
        if let Some(project) = config.projects.get_mut("backend") {
            project.verifier = Some(VerifierConfig {
                agent: None,
                prompt: None,
                max_rounds: None,
            });
        }
    })
}

async fn spawn_worker(h: &TestHarness) -> String {
    h.manager()
        .spawn(SpawnRequest {
            project_id: "backend".to_string(),
            issue_id: None,
            agent: None,
            prompt: None,
            role: SessionRole::Worker,
        })
        .await
        .unwrap()
        .id
        .to_string()
}

fn workspace_of(h: &TestHarness, session_id: &str) -> std::path::PathBuf {
    h.services
        .metadata("backend")
        .unwrap()
        .read(session_id)
        .unwrap()
        .worktree
        .unwrap()
}

#[tokio::test]
async fn start_verification_without_config_is_false() {
    let h = harness();
    let manager = h.manager();
    let worker = spawn_worker(&h).await;
    let ws = workspace_of(&h, &worker);

    assert!(!manager
        .start_verification("backend", &worker, &ws)
        .await
        .unwrap());
}

#[tokio::test]
async fn start_verification_spawns_flagged_session_with_default_prompt() {
    let h = with_verifier();
    let manager = h.manager();
    let worker = spawn_worker(&h).await;
    let ws = workspace_of(&h, &worker);

    assert!(manager
        .start_verification("backend", &worker, &ws)
        .await
        .unwrap());

    let store = h.services.metadata("backend").unwrap();
    let verifier_id = store
        .list()
        .unwrap()
        .into_iter()
        .find(|id| id != &worker)
        .unwrap();
    let meta = store.read(&verifier_id).unwrap();
    assert_eq!(meta.role, SessionRole::Verifier);
    assert_eq!(meta.verifier_for.as_deref(), Some(worker.as_str()));

    // the default prompt names the evidence directory
    let handle = meta.runtime_handle.unwrap();
    let sent = h.runtime.sent_messages(&handle.id);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains(".ao/evidence"));
}

#[tokio::test]
async fn poll_verifier_reads_latest_verdict() {
    let h = with_verifier();
    let manager = h.manager();
    let worker = spawn_worker(&h).await;
    let ws = workspace_of(&h, &worker);

    assert_eq!(
        manager.poll_verifier("backend", &worker).unwrap(),
        VerifierPoll::Pending
    );

    manager
        .start_verification("backend", &worker, &ws)
        .await
        .unwrap();
    assert_eq!(
        manager.poll_verifier("backend", &worker).unwrap(),
        VerifierPoll::Pending
    );

    let store = h.services.metadata("backend").unwrap();
    let verifier_id = store
        .list()
        .unwrap()
        .into_iter()
        .find(|id| id != &worker)
        .unwrap();
    let mut updates = BTreeMap::new();
    updates.insert("verifierVerdict".to_string(), "failed".to_string());
    updates.insert("verifierFeedback".to_string(), "Tests are red.".to_string());
    store.update(&verifier_id, &updates).unwrap();

    assert_eq!(
        manager.poll_verifier("backend", &worker).unwrap(),
        VerifierPoll::Failed {
            feedback: Some("Tests are red.".to_string())
        }
    );
}

#[tokio::test]
async fn evidence_change_detection_tracks_the_fingerprint() {
    let h = with_verifier();
    let manager = h.manager();
    let worker = spawn_worker(&h).await;
    let ws = workspace_of(&h, &worker);

    let dir = ws.join(".ao/evidence").join(&worker);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("command-log.json"),
        r#"{"schemaVersion": "1", "complete": true, "entries": []}"#,
    )
    .unwrap();

    manager
        .start_verification("backend", &worker, &ws)
        .await
        .unwrap();
    assert!(!manager.evidence_changed("backend", &worker, &ws).unwrap());

    std::fs::write(
        dir.join("command-log.json"),
        r#"{"schemaVersion": "1", "complete": true, "entries": [{"command": "x"}]}"#,
    )
    .unwrap();
    assert!(manager.evidence_changed("backend", &worker, &ws).unwrap());
}

#[tokio::test]
async fn retire_verifier_only_removes_decided_sessions() {
    let h = with_verifier();
    let manager = h.manager();
    let worker = spawn_worker(&h).await;
    let ws = workspace_of(&h, &worker);

    manager
        .start_verification("backend", &worker, &ws)
        .await
        .unwrap();
    let store = h.services.metadata("backend").unwrap();
    let verifier_id = store
        .list()
        .unwrap()
        .into_iter()
        .find(|id| id != &worker)
        .unwrap();

    // undecided verifier survives
    manager.retire_verifier("backend", &worker).await;
    assert!(store.exists(&verifier_id).unwrap());

    let mut updates = BTreeMap::new();
    updates.insert("verifierVerdict".to_string(), "passed".to_string());
    store.update(&verifier_id, &updates).unwrap();
    manager.retire_verifier("backend", &worker).await;
    assert!(!store.exists(&verifier_id).unwrap());
}
