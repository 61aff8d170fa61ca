// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::harness;
use ao_core::graph::TaskInput;

const NOW: u64 = 1_000_000;

fn cap(n: u32) -> SchedulerConfig {
    SchedulerConfig {
        concurrency_cap: n,
        default_priority: 0,
    }
}

fn issue(id: &str) -> IssueId {
    IssueId::new(id)
}

fn plan_v1() -> TaskGraph {
    // task-1 pending, task-2 depends on it
    let task_1 = TaskInput::new("task-1");
    let mut task_2 = TaskInput::new("task-2");
    task_2.dependencies = vec![TaskId::new("task-1")];
    task_2.issue_id = Some(issue("INT-2"));
    TaskGraph::build(vec![task_1, task_2], NOW).unwrap()
}

fn plan_v2() -> TaskGraph {
    // task-1 complete, task-2 unblocked
    let mut task_1 = TaskInput::new("task-1");
    task_1.state = Some(TaskState::Complete);
    let mut task_2 = TaskInput::new("task-2");
    task_2.dependencies = vec![TaskId::new("task-1")];
    task_2.issue_id = Some(issue("INT-2"));
    TaskGraph::build(vec![task_1, task_2], NOW).unwrap()
}

#[tokio::test]
async fn blocked_task_is_skipped_with_dependency_reason() {
    let h = harness();
    let outcome = h
        .manager()
        .batch_spawn("backend", &[issue("task-2")], Some(&plan_v1()), &cap(1))
        .await
        .unwrap();

    assert!(outcome.selected.is_empty());
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(
        outcome.skipped[0].reason,
        "blocked by incomplete dependencies: task-1"
    );
}

#[tokio::test]
async fn unblocked_plan_spawns_with_the_tasks_issue() {
    let h = harness();
    let manager = h.manager();
    let outcome = manager
        .batch_spawn("backend", &[issue("task-2")], Some(&plan_v2()), &cap(1))
        .await
        .unwrap();

    assert_eq!(outcome.selected, vec!["task-2"]);
    assert_eq!(outcome.sessions.len(), 1);

    // spawn used the task's issueId, not the task id
    let session = manager.get(&outcome.sessions[0]).await.unwrap();
    assert_eq!(session.issue_id, Some(issue("INT-2")));
}

#[tokio::test]
async fn duplicates_and_live_sessions_are_skipped() {
    let h = harness();
    let manager = h.manager();

    // existing live session for INT-401
    manager
        .spawn(crate::session_manager::SpawnRequest {
            project_id: "backend".to_string(),
            issue_id: Some(issue("INT-401")),
            agent: None,
            prompt: None,
            role: ao_core::SessionRole::Worker,
        })
        .await
        .unwrap();

    let outcome = manager
        .batch_spawn(
            "backend",
            &[issue("INT-401"), issue("INT-402"), issue("INT-402")],
            None,
            &cap(8),
        )
        .await
        .unwrap();

    assert_eq!(outcome.selected, vec!["INT-402"]);
    assert_eq!(outcome.sessions.len(), 1);
    assert_eq!(
        outcome.skipped,
        vec![
            SkippedTask {
                id: "INT-401".to_string(),
                reason: "already has session".to_string(),
            },
            SkippedTask {
                id: "INT-402".to_string(),
                reason: "duplicate in this batch".to_string(),
            },
        ]
    );
}

#[tokio::test]
async fn cap_limits_batch_selection() {
    let h = harness();
    let graph = TaskGraph::build(
        vec![
            TaskInput::new("a"),
            TaskInput::new("b"),
            TaskInput::new("c"),
        ],
        NOW,
    )
    .unwrap();

    let outcome = h
        .manager()
        .batch_spawn(
            "backend",
            &[issue("a"), issue("b"), issue("c")],
            Some(&graph),
            &cap(2),
        )
        .await
        .unwrap();

    assert_eq!(outcome.selected, vec!["a", "b"]);
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].reason, "concurrency cap reached");
}

#[tokio::test]
async fn unknown_plan_task_is_skipped() {
    let h = harness();
    let outcome = h
        .manager()
        .batch_spawn("backend", &[issue("ghost")], Some(&plan_v2()), &cap(4))
        .await
        .unwrap();
    assert_eq!(outcome.skipped[0].reason, "not in the current plan");
}

#[tokio::test]
async fn complete_task_is_skipped() {
    let h = harness();
    let outcome = h
        .manager()
        .batch_spawn("backend", &[issue("task-1")], Some(&plan_v2()), &cap(4))
        .await
        .unwrap();
    assert_eq!(outcome.skipped[0].reason, "task already complete");
}
