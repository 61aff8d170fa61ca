// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::harness;
use ao_adapters::runtime::RuntimeCall;

fn spawn_request() -> SpawnRequest {
    SpawnRequest {
        project_id: "backend".to_string(),
        issue_id: Some(IssueId::new("INT-401")),
        agent: None,
        prompt: None,
        role: SessionRole::Worker,
    }
}

// ── Branch sanitization ──────────────────────────────────────────────────────

#[yare::parameterized(
    plain        = { "INT-401", "INT-401" },
    leading_hash = { "#123", "123" },
    spaces       = { "fix login bug", "fix-login-bug" },
    traversal    = { "../../etc", "etc" },
    dots         = { "a..b", "a.b" },
    trailing     = { "-wip-.", "wip" },
    slash        = { "feat/login", "feat/login" },
)]
fn branch_sanitization(input: &str, expected: &str) {
    assert_eq!(sanitize_branch(input), expected);
}

// ── Spawn ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn spawn_creates_workspace_runtime_and_metadata() {
    let h = harness();
    let session = h.manager().spawn(spawn_request()).await.unwrap();

    assert_eq!(session.id, "bac-1");
    assert_eq!(session.status, SessionStatus::Spawning);
    assert_eq!(session.branch.as_deref(), Some("INT-401"));
    assert_eq!(session.issue_id, Some(IssueId::new("INT-401")));
    assert!(session.workspace_path.is_some());

    let handle = session.runtime_handle.unwrap();
    assert_eq!(handle.runtime_name, "fake");
    // runtime name is <hash>-<prefix>-<n>
    let paths = h.services.paths("backend").unwrap();
    assert_eq!(handle.id, format!("{}-bac-1", paths.hash()));

    // workspace got post-create treatment
    assert_eq!(h.workspace.post_created().len(), 1);
}

#[tokio::test]
async fn spawn_env_carries_orchestrator_identifiers() {
    let h = harness();
    h.manager().spawn(spawn_request()).await.unwrap();

    let calls = h.runtime.calls();
    let Some(RuntimeCall::Create { command, env, .. }) = calls
        .iter()
        .find(|c| matches!(c, RuntimeCall::Create { .. }))
    else {
        panic!("expected a create call, got {:?}", calls);
    };
    assert_eq!(command, "fake-agent");

    let get = |key: &str| {
        env.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    };
    assert_eq!(get("AO_SESSION"), Some("bac-1"));
    assert_eq!(get("AO_PROJECT_ID"), Some("backend"));
    assert_eq!(get("BAC_SESSION"), Some("bac-1"));
    assert!(get("AO_DATA_DIR").unwrap().contains("state"));
    // agent-provided env merged in
    assert_eq!(get("FAKE_AGENT"), Some("1"));
}

#[tokio::test]
async fn spawn_numbers_sessions_sequentially() {
    let h = harness();
    let manager = h.manager();
    assert_eq!(manager.spawn(spawn_request()).await.unwrap().id, "bac-1");
    assert_eq!(manager.spawn(spawn_request()).await.unwrap().id, "bac-2");
}

#[tokio::test]
async fn spawn_skips_reserved_ids() {
    let h = harness();
    // Simulate a concurrent spawner that already took bac-1.
    h.services.metadata("backend").unwrap().reserve("bac-1").unwrap();

    let session = h.manager().spawn(spawn_request()).await.unwrap();
    assert_eq!(session.id, "bac-2");
}

#[tokio::test]
async fn spawn_sends_prompt_after_runtime_start() {
    let h = harness();
    let mut request = spawn_request();
    request.prompt = Some("Work the issue.".to_string());
    let session = h.manager().spawn(request).await.unwrap();

    let handle_id = session.runtime_handle.unwrap().id;
    assert_eq!(h.runtime.sent_messages(&handle_id), vec!["Work the issue."]);
}

#[tokio::test]
async fn spawn_failure_destroys_partial_artifacts() {
    let h = harness();
    h.runtime.fail_next_create();

    let err = h.manager().spawn(spawn_request()).await.unwrap_err();
    assert!(matches!(err, EngineError::Runtime(_)));

    // workspace destroyed, reservation released
    assert_eq!(h.workspace.destroyed().len(), 1);
    assert!(h
        .services
        .metadata("backend")
        .unwrap()
        .list()
        .unwrap()
        .is_empty());

    // and the next spawn reuses the number
    let session = h.manager().spawn(spawn_request()).await.unwrap();
    assert_eq!(session.id, "bac-1");
}

#[tokio::test]
async fn spawn_workspace_failure_releases_reservation() {
    let h = harness();
    h.workspace.fail_next_create();

    assert!(h.manager().spawn(spawn_request()).await.is_err());
    assert!(h
        .services
        .metadata("backend")
        .unwrap()
        .list()
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn spawn_unknown_project_is_not_found() {
    let h = harness();
    let mut request = spawn_request();
    request.project_id = "ghost".to_string();
    assert!(matches!(
        h.manager().spawn(request).await,
        Err(EngineError::ProjectNotFound(_))
    ));
}

#[tokio::test]
async fn orchestrator_uses_project_path_and_role() {
    let h = harness();
    let session = h
        .manager()
        .spawn_orchestrator("backend", "Coordinate the fleet.")
        .await
        .unwrap();

    assert_eq!(session.role, SessionRole::Orchestrator);
    let project_path = h.services.project("backend").unwrap().path.clone();
    assert_eq!(session.workspace_path.as_deref(), Some(project_path.as_path()));
    // no isolated workspace was created
    assert!(h.workspace.post_created().is_empty());
}

// ── Get / restore / list ─────────────────────────────────────────────────────

#[tokio::test]
async fn get_reads_fresh_metadata() {
    let h = harness();
    let manager = h.manager();
    let spawned = manager.spawn(spawn_request()).await.unwrap();

    let fetched = manager.get(spawned.id.as_str()).await.unwrap();
    assert_eq!(fetched.project_id, "backend");
    assert_eq!(fetched.branch, spawned.branch);
}

#[tokio::test]
async fn get_unknown_session_is_not_found() {
    let h = harness();
    assert!(matches!(
        h.manager().get("bac-9").await,
        Err(EngineError::SessionNotFound(_))
    ));
}

#[tokio::test]
async fn restore_requires_live_runtime() {
    let h = harness();
    let manager = h.manager();
    let session = manager.spawn(spawn_request()).await.unwrap();
    let handle_id = session.runtime_handle.as_ref().unwrap().id.clone();

    assert!(manager.restore(session.id.as_str()).await.is_ok());

    h.runtime.set_alive(&handle_id, false);
    assert!(matches!(
        manager.restore(session.id.as_str()).await,
        Err(EngineError::SessionNotFound(_))
    ));
}

#[tokio::test]
async fn list_marks_dead_nonterminal_sessions_exited() {
    let h = harness();
    let manager = h.manager();
    let session = manager.spawn(spawn_request()).await.unwrap();
    let handle_id = session.runtime_handle.as_ref().unwrap().id.clone();
    h.runtime.set_alive(&handle_id, false);

    let sessions = manager.list(Some("backend")).await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].activity, Some(Activity::Exited));
}

#[tokio::test]
async fn list_overlays_agent_activity() {
    let h = harness();
    let manager = h.manager();
    let session = manager.spawn(spawn_request()).await.unwrap();
    h.agent
        .set_activity(session.id.as_str(), Activity::Idle, 1_000);

    let sessions = manager.list(Some("backend")).await.unwrap();
    assert_eq!(sessions[0].activity, Some(Activity::Idle));
}

// ── Kill / cleanup ───────────────────────────────────────────────────────────

#[tokio::test]
async fn kill_archives_and_destroys() {
    let h = harness();
    let manager = h.manager();
    let session = manager.spawn(spawn_request()).await.unwrap();
    let session_id = session.id.to_string();

    manager.kill(&session_id).await.unwrap();

    let store = h.services.metadata("backend").unwrap();
    assert!(store.list().unwrap().is_empty());
    let archived = store.read_archived_raw(&session_id).unwrap().unwrap();
    assert_eq!(archived["status"], "killed");
    assert_eq!(h.workspace.destroyed().len(), 1);

    // transition was recorded
    let log = h.services.outcome_log("backend").unwrap();
    let records = log.read_all().unwrap();
    assert_eq!(records.last().unwrap().to_status, "killed");
}

#[tokio::test]
async fn cleanup_removes_only_dead_terminal_sessions() {
    let h = harness();
    let manager = h.manager();
    let live = manager.spawn(spawn_request()).await.unwrap();
    let dead = manager.spawn(spawn_request()).await.unwrap();

    // dead: terminal status + dead runtime
    let store = h.services.metadata("backend").unwrap();
    let mut updates = std::collections::BTreeMap::new();
    updates.insert("status".to_string(), "done".to_string());
    store.update(dead.id.as_str(), &updates).unwrap();
    h.runtime
        .set_alive(&dead.runtime_handle.as_ref().unwrap().id, false);

    let removed = manager.cleanup(Some("backend")).await.unwrap();
    assert_eq!(removed, vec![dead.id.to_string()]);
    assert_eq!(store.list().unwrap(), vec![live.id.to_string()]);
}
