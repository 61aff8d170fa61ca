//! Message delivery: busy/idle shaping and user-visible status.

use crate::prelude::*;
use ao_engine::{SendOptions, SendStatus};

#[tokio::test]
async fn short_message_to_idle_prompt_is_sent() {
    let fleet = fleet();
    let manager = fleet.manager();
    let (session_id, handle) = fleet.spawn_worker(None).await;
    fleet.runtime.set_output(&handle, "done\n\u{276f} ");

    let status = manager
        .send(&session_id, "x", &SendOptions::default())
        .await
        .unwrap();
    assert_eq!(status, SendStatus::Sent);
    assert_eq!(fleet.runtime.sent_messages(&handle), vec!["x"]);
}

#[tokio::test]
async fn long_message_is_delivered_whole() {
    let fleet = fleet();
    let manager = fleet.manager();
    let (session_id, handle) = fleet.spawn_worker(None).await;
    fleet.runtime.set_output(&handle, "\u{276f} ");

    // 250 chars: the runtime's transport decides literal vs paste buffer;
    // the contract here is that the payload arrives unmodified.
    let long = "x".repeat(250);
    let status = manager
        .send(&session_id, &long, &SendOptions::default())
        .await
        .unwrap();
    assert_eq!(status, SendStatus::Sent);
    assert_eq!(fleet.runtime.sent_messages(&handle), vec![long]);
}

#[tokio::test]
async fn busy_session_with_no_wait_reports_processing() {
    let fleet = fleet();
    let manager = fleet.manager();
    let (session_id, handle) = fleet.spawn_worker(None).await;
    fleet
        .runtime
        .set_output(&handle, "thinking (esc to interrupt)\n");

    let status = manager
        .send(
            &session_id,
            "interrupting thought",
            &SendOptions {
                no_wait: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(status, SendStatus::Processing);
}

#[tokio::test]
async fn queued_input_reports_queued() {
    let fleet = fleet();
    let manager = fleet.manager();
    let (session_id, handle) = fleet.spawn_worker(None).await;
    fleet
        .runtime
        .set_output(&handle, "\u{276f} Press up to edit queued messages");

    let status = manager
        .send(&session_id, "another", &SendOptions::default())
        .await
        .unwrap();
    assert_eq!(status, SendStatus::Queued);
}

#[tokio::test]
async fn dead_session_send_fails() {
    let fleet = fleet();
    let manager = fleet.manager();
    let (session_id, handle) = fleet.spawn_worker(None).await;
    fleet.runtime.set_alive(&handle, false);

    assert!(manager
        .send(&session_id, "x", &SendOptions::default())
        .await
        .is_err());
}
