//! Batch spawn de-duplication: existing sessions and in-batch duplicates.

use crate::prelude::*;
use ao_core::ready_queue::SchedulerConfig;
use ao_core::IssueId;

#[tokio::test]
async fn duplicate_batch_produces_exactly_one_spawn() {
    let fleet = fleet();
    let manager = fleet.manager();

    // INT-401 already has a live session
    fleet.spawn_worker(Some("INT-401")).await;

    let outcome = manager
        .batch_spawn(
            "backend",
            &[
                IssueId::new("INT-401"),
                IssueId::new("INT-402"),
                IssueId::new("INT-402"),
            ],
            None,
            &SchedulerConfig {
                concurrency_cap: 8,
                default_priority: 0,
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.selected, vec!["INT-402"]);
    assert_eq!(outcome.skipped.len(), 2);
    assert_eq!(outcome.skipped[0].id, "INT-401");
    assert_eq!(outcome.skipped[0].reason, "already has session");
    assert_eq!(outcome.skipped[1].id, "INT-402");
    assert_eq!(outcome.skipped[1].reason, "duplicate in this batch");

    // net effect: exactly one new session
    assert_eq!(manager.list(Some("backend")).await.unwrap().len(), 2);
}

#[tokio::test]
async fn terminal_sessions_do_not_block_respawns() {
    let fleet = fleet();
    let manager = fleet.manager();

    let (session_id, _) = fleet.spawn_worker(Some("INT-401")).await;
    fleet.set_status(&session_id, "done");

    let outcome = manager
        .batch_spawn(
            "backend",
            &[IssueId::new("INT-401")],
            None,
            &SchedulerConfig {
                concurrency_cap: 1,
                default_priority: 0,
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome.selected, vec!["INT-401"]);
}
