//! Plan gating: a blocked task never spawns; rewriting the plan unblocks it.

use crate::prelude::*;
use ao_core::graph::TaskGraph;
use ao_core::plan::PlanStatus;
use ao_core::ready_queue::SchedulerConfig;
use ao_core::IssueId;
use ao_storage::{NewPlan, PlanStore};
use std::collections::BTreeMap;

const NOW: u64 = 1_000_000;

fn plan_store(fleet: &Fleet) -> PlanStore {
    let paths = fleet.services.paths("backend").unwrap();
    let metadata = fleet.services.metadata("backend").unwrap();
    let store = PlanStore::new(paths.sessions_dir(), metadata.clone());

    // The planner session that owns the plan artifacts.
    let mut values = BTreeMap::new();
    values.insert("status".to_string(), "working".to_string());
    values.insert("role".to_string(), "orchestrator".to_string());
    metadata.write("planner", &values).unwrap();
    store
}

fn plan_blob(task_1_state: &str) -> serde_json::Value {
    serde_json::json!({
        "tasks": [
            {"id": "task-1", "state": task_1_state, "issueId": "INT-401"},
            {"id": "task-2", "dependencies": ["task-1"], "issueId": "INT-402"}
        ]
    })
}

#[tokio::test]
async fn blocked_plan_gates_spawn_until_rewritten() {
    let fleet = fleet();
    let manager = fleet.manager();
    let plans = plan_store(&fleet);
    let cap_one = SchedulerConfig {
        concurrency_cap: 1,
        default_priority: 0,
    };

    // Plan v1: task-2 blocked behind pending task-1.
    plans
        .write_blob(
            "planner",
            NewPlan {
                plan_id: "sprint".to_string(),
                plan_version: 1,
                plan_status: PlanStatus::Validated,
                blob: plan_blob("pending"),
            },
            "2026-01-05T10:00:00Z",
        )
        .unwrap();

    let artifact = plans.read_blob("planner").unwrap();
    let graph = TaskGraph::from_blob(&artifact.blob, NOW).unwrap();
    let outcome = manager
        .batch_spawn("backend", &[IssueId::new("task-2")], Some(&graph), &cap_one)
        .await
        .unwrap();

    assert!(outcome.selected.is_empty());
    assert_eq!(
        outcome.skipped[0].reason,
        "blocked by incomplete dependencies: task-1"
    );
    // nothing spawned: only the planner session exists
    let workers: Vec<_> = manager
        .list(Some("backend"))
        .await
        .unwrap()
        .into_iter()
        .filter(|s| s.issue_id.is_some())
        .collect();
    assert!(workers.is_empty());

    // Plan v2 marks task-1 complete; the same batch now spawns task-2.
    plans
        .write_blob(
            "planner",
            NewPlan {
                plan_id: "sprint".to_string(),
                plan_version: 2,
                plan_status: PlanStatus::Validated,
                blob: plan_blob("complete"),
            },
            "2026-01-05T11:00:00Z",
        )
        .unwrap();

    let artifact = plans.read_blob("planner").unwrap();
    assert_eq!(artifact.plan_version, 2);
    let graph = TaskGraph::from_blob(&artifact.blob, NOW).unwrap();

    let outcome = manager
        .batch_spawn("backend", &[IssueId::new("task-2")], Some(&graph), &cap_one)
        .await
        .unwrap();
    assert_eq!(outcome.selected, vec!["task-2"]);
    assert_eq!(outcome.sessions.len(), 1);

    // exactly one spawn, carrying the task's issue id
    let workers: Vec<_> = manager
        .list(Some("backend"))
        .await
        .unwrap()
        .into_iter()
        .filter(|s| s.issue_id.is_some())
        .collect();
    assert_eq!(workers.len(), 1);
    assert_eq!(workers[0].issue_id, Some(IssueId::new("INT-402")));
}

#[tokio::test]
async fn plan_rewrite_supersedes_the_previous_artifact() {
    let fleet = fleet();
    let plans = plan_store(&fleet);

    for version in [1, 2] {
        plans
            .write_blob(
                "planner",
                NewPlan {
                    plan_id: "sprint".to_string(),
                    plan_version: version,
                    plan_status: PlanStatus::Draft,
                    blob: plan_blob("pending"),
                },
                "2026-01-05T10:00:00Z",
            )
            .unwrap();
    }

    let sessions_dir = fleet.services.paths("backend").unwrap().sessions_dir();
    let v1: ao_core::PlanArtifact = serde_json::from_str(
        &std::fs::read_to_string(sessions_dir.join("plans/planner/sprint.v1.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(v1.plan_status, PlanStatus::Superseded);

    let current = plans.read_blob("planner").unwrap();
    assert_eq!(current.plan_version, 2);
    assert_ne!(current.plan_status, PlanStatus::Superseded);
}
