//! Outcome log resilience: malformed lines never poison the summary.

use ao_storage::{OutcomeLog, OutcomeQuery, OutcomeScanner, TransitionRecord};
use std::io::Write;
use tempfile::TempDir;

fn record(session: &str, from: &str, to: &str, ts: u64) -> TransitionRecord {
    TransitionRecord {
        session_id: session.to_string(),
        project_id: "backend".to_string(),
        from_status: from.to_string(),
        to_status: to.to_string(),
        task_id: None,
        plan_id: None,
        issue_id: None,
        timestamp: Some(ts),
    }
}

#[test]
fn summary_includes_all_well_formed_records_around_a_corrupt_line() {
    let tmp = TempDir::new().unwrap();
    let log_path = tmp
        .path()
        .join("abc123-backend/metrics/outcome-transitions.jsonl");
    let log = OutcomeLog::new(&log_path);

    log.record_transition(record("be-1", "spawning", "working", 100), 100)
        .unwrap();

    // a torn line from an interrupted writer
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(&log_path)
        .unwrap();
    writeln!(file, "{{\"sessionId\": \"be-").unwrap();
    drop(file);

    log.record_transition(record("be-1", "working", "pr_open", 200), 200)
        .unwrap();
    log.record_transition(record("be-1", "pr_open", "merged", 300), 300)
        .unwrap();

    let summary = OutcomeScanner::new(tmp.path())
        .summary(&OutcomeQuery::default())
        .unwrap();
    assert_eq!(summary.record_count, 3);
    assert_eq!(summary.tasks.len(), 1);

    let task = &summary.tasks[0];
    assert_eq!(task.transitions, 3);
    assert_eq!(task.completed_at, Some(300));
    assert_eq!(task.cycle_time_ms, Some(200));
    assert!(task.first_pass_success);
}
