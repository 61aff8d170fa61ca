//! CI-failure remediation: structured prompts, retry budget, escalation.

use crate::prelude::*;
use ao_adapters::scm::{CheckStatus, CiCheck};
use ao_adapters::ReviewComment;

fn failing(name: &str) -> CiCheck {
    CiCheck {
        name: name.to_string(),
        status: CheckStatus::Failing,
        summary: Some("failed".to_string()),
        url: None,
    }
}

fn unresolved(author: &str, body: &str) -> ReviewComment {
    ReviewComment {
        author: author.to_string(),
        body: body.to_string(),
        path: None,
        resolved: false,
    }
}

#[tokio::test]
async fn ci_failure_sends_structured_prompt_then_escalates() {
    let fleet = fleet_with(|config| {
        config.reactions.insert(
            "ci-failed".to_string(),
            serde_json::from_value(serde_json::json!({
                "auto": true, "action": "send-to-agent", "retries": 2
            }))
            .unwrap(),
        );
    });
    let lifecycle = fleet.lifecycle();
    let (session_id, handle) = fleet.spawn_worker(Some("INT-7")).await;
    fleet.set_status(&session_id, "pr_open");

    fleet.scm.set_pr(&session_id, fleet.pr(7));
    fleet
        .scm
        .set_checks(vec![failing("build"), failing("test"), failing("lint")]);
    fleet.scm.set_pending_comments(vec![
        unresolved("reviewer", "Please add a regression test."),
        unresolved("reviewer", "This unwrap can panic."),
    ]);

    // First check: transition + structured message
    lifecycle.check(&session_id).await.unwrap();
    assert_eq!(fleet.status_of(&session_id), "ci_failed");

    let sent = fleet.runtime.sent_messages(&handle);
    assert_eq!(sent.len(), 1);
    let message = &sent[0];
    assert!(message.contains("- build"));
    assert!(message.contains("- test"));
    assert!(message.contains("- lint"));
    assert!(message.contains("regression test"));
    assert!(message.chars().count() <= 2_400);

    // Second tick with CI still failing: attempts increments
    lifecycle.check(&session_id).await.unwrap();
    assert_eq!(fleet.runtime.sent_messages(&handle).len(), 2);

    // Third tick: retries=2 exhausted -> warning notification, no more sends
    lifecycle.check(&session_id).await.unwrap();
    assert_eq!(fleet.runtime.sent_messages(&handle).len(), 2);
    let notifications = fleet.notifier.events();
    assert_eq!(notifications.len(), 1);
    assert_eq!(
        notifications[0].priority,
        ao_core::reaction::NotifyPriority::Warning
    );

    // Further ticks stay quiet
    lifecycle.check(&session_id).await.unwrap();
    assert_eq!(fleet.runtime.sent_messages(&handle).len(), 2);
    assert_eq!(fleet.notifier.events().len(), 1);
}

#[tokio::test]
async fn check_caps_listed_failures_at_four() {
    let fleet = fleet_with(|config| {
        config.reactions.insert(
            "ci-failed".to_string(),
            serde_json::from_value(serde_json::json!({
                "auto": true, "action": "send-to-agent", "retries": 5
            }))
            .unwrap(),
        );
    });
    let lifecycle = fleet.lifecycle();
    let (session_id, handle) = fleet.spawn_worker(None).await;
    fleet.set_status(&session_id, "pr_open");
    fleet.scm.set_pr(&session_id, fleet.pr(8));
    fleet.scm.set_checks(
        (0..6)
            .map(|i| failing(&format!("check-{}", i)))
            .collect::<Vec<_>>(),
    );

    lifecycle.check(&session_id).await.unwrap();
    let message = &fleet.runtime.sent_messages(&handle)[0];
    assert_eq!(message.matches("- check-").count(), 4);
    assert!(message.contains("and 2 more"));
}
