//! Verifier gate loop: verdicts, feedback, and evidence-gated re-entry.

use crate::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;

fn write_evidence(workspace: &Path, session_id: &str, marker: &str) {
    let dir = workspace.join(".ao/evidence").join(session_id);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("command-log.json"),
        format!(
            r#"{{"schemaVersion": "1", "complete": true, "entries": [{{"command": "{}", "exitCode": 0}}]}}"#,
            marker
        ),
    )
    .unwrap();
    for (file, key) in [
        ("tests-run.json", "tests"),
        ("changed-paths.json", "paths"),
        ("known-risks.json", "risks"),
    ] {
        std::fs::write(
            dir.join(file),
            format!(r#"{{"schemaVersion": "1", "complete": true, "{}": []}}"#, key),
        )
        .unwrap();
    }
}

fn verifier_of(fleet: &Fleet, worker_id: &str) -> Option<String> {
    let store = fleet.services.metadata("backend").unwrap();
    store.list().unwrap().into_iter().find(|id| {
        store
            .read_raw(id)
            .ok()
            .and_then(|raw| raw.get("verifierFor").cloned())
            .as_deref()
            == Some(worker_id)
    })
}

fn set_verdict(fleet: &Fleet, verifier_id: &str, verdict: &str, feedback: Option<&str>) {
    let store = fleet.services.metadata("backend").unwrap();
    let mut updates = BTreeMap::new();
    updates.insert("verifierVerdict".to_string(), verdict.to_string());
    if let Some(feedback) = feedback {
        updates.insert("verifierFeedback".to_string(), feedback.to_string());
    }
    store.update(verifier_id, &updates).unwrap();
}

#[tokio::test]
async fn failed_verdict_loops_back_and_passes_after_new_evidence() {
    let fleet = fleet_with(|config| {
        if let Some(project) = config.projects.get_mut("backend") {
            project.verifier = Some(
                serde_json::from_value(serde_json::json!({"prompt": "Grade the work."})).unwrap(),
            );
        }
    });
    let lifecycle = fleet.lifecycle();
    let (worker_id, worker_handle) = fleet.spawn_worker(Some("INT-9")).await;
    fleet.set_status(&worker_id, "working");

    let workspace = fleet
        .services
        .metadata("backend")
        .unwrap()
        .read(&worker_id)
        .unwrap()
        .worktree
        .unwrap();
    write_evidence(&workspace, &worker_id, "cargo test");

    // Complete evidence + configured verifier: worker enters verifier_pending
    lifecycle.check(&worker_id).await.unwrap();
    assert_eq!(fleet.status_of(&worker_id), "verifier_pending");
    let first_verifier = verifier_of(&fleet, &worker_id).unwrap();

    // No verdict yet: remains pending
    lifecycle.check(&worker_id).await.unwrap();
    assert_eq!(fleet.status_of(&worker_id), "verifier_pending");

    // Verifier fails the work with feedback
    set_verdict(&fleet, &first_verifier, "failed", Some("Fix X"));
    lifecycle.check(&worker_id).await.unwrap();
    assert_eq!(fleet.status_of(&worker_id), "verifier_failed");
    assert!(fleet
        .runtime
        .sent_messages(&worker_handle)
        .contains(&"Fix X".to_string()));
    let raw = fleet
        .services
        .metadata("backend")
        .unwrap()
        .read_raw(&worker_id)
        .unwrap();
    assert_eq!(raw.get("verifierStatus").map(String::as_str), Some("failed"));

    // Unchanged evidence: no re-verification
    lifecycle.check(&worker_id).await.unwrap();
    assert_eq!(fleet.status_of(&worker_id), "verifier_failed");

    // Worker revises its evidence: a fresh verifier round begins
    write_evidence(&workspace, &worker_id, "cargo test --all");
    lifecycle.check(&worker_id).await.unwrap();
    assert_eq!(fleet.status_of(&worker_id), "verifier_pending");

    // the first verifier was retired; the new round has no verdict yet
    let second_verifier = verifier_of(&fleet, &worker_id).unwrap();
    let raw = fleet
        .services
        .metadata("backend")
        .unwrap()
        .read_raw(&second_verifier)
        .unwrap();
    assert!(!raw.contains_key("verifierVerdict"));

    // The second verdict passes: worker is ready to open a PR
    set_verdict(&fleet, &second_verifier, "passed", None);
    lifecycle.check(&worker_id).await.unwrap();
    assert_eq!(fleet.status_of(&worker_id), "pr_ready");
    let raw = fleet
        .services
        .metadata("backend")
        .unwrap()
        .read_raw(&worker_id)
        .unwrap();
    assert_eq!(raw.get("verifierStatus").map(String::as_str), Some("passed"));
}

#[tokio::test]
async fn without_verifier_config_complete_evidence_is_ignored() {
    let fleet = fleet();
    let lifecycle = fleet.lifecycle();
    let (worker_id, _) = fleet.spawn_worker(None).await;
    fleet.set_status(&worker_id, "working");

    let workspace = fleet
        .services
        .metadata("backend")
        .unwrap()
        .read(&worker_id)
        .unwrap()
        .worktree
        .unwrap();
    write_evidence(&workspace, &worker_id, "cargo test");

    lifecycle.check(&worker_id).await.unwrap();
    assert_eq!(fleet.status_of(&worker_id), "working");
}
