// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

const NOW: u64 = 1_700_000_000_000;

fn log(tmp: &TempDir) -> OutcomeLog {
    OutcomeLog::new(tmp.path().join("metrics/outcome-transitions.jsonl"))
}

fn record(session: &str, from: &str, to: &str) -> TransitionRecord {
    TransitionRecord {
        session_id: session.to_string(),
        project_id: "backend".to_string(),
        from_status: from.to_string(),
        to_status: to.to_string(),
        task_id: None,
        plan_id: None,
        issue_id: None,
        timestamp: None,
    }
}

// ── Recording ────────────────────────────────────────────────────────────────

#[test]
fn record_applies_defaults() {
    let tmp = TempDir::new().unwrap();
    let written = log(&tmp)
        .record_transition(record("be-1", "spawning", "working"), NOW)
        .unwrap();

    assert_eq!(written.task_id, "be-1");
    assert_eq!(written.plan_id, "default");
    assert_eq!(written.timestamp, NOW);
}

#[test]
fn record_prefers_issue_id_for_task_default() {
    let tmp = TempDir::new().unwrap();
    let mut input = record("be-1", "spawning", "working");
    input.issue_id = Some("INT-7".to_string());
    let written = log(&tmp).record_transition(input, NOW).unwrap();
    assert_eq!(written.task_id, "INT-7");
}

#[test]
fn records_append_in_order() {
    let tmp = TempDir::new().unwrap();
    let log = log(&tmp);
    log.record_transition(record("be-1", "spawning", "working"), NOW)
        .unwrap();
    log.record_transition(record("be-1", "working", "pr_open"), NOW + 1)
        .unwrap();

    let records = log.read_all().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].to_status, "pr_open");
}

#[test]
fn malformed_lines_are_skipped() {
    let tmp = TempDir::new().unwrap();
    let log = log(&tmp);
    log.record_transition(record("be-1", "spawning", "working"), NOW)
        .unwrap();

    // simulate a truncated concurrent append, then a good line
    use std::io::Write;
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(tmp.path().join("metrics/outcome-transitions.jsonl"))
        .unwrap();
    writeln!(file, "{{\"sessionId\": \"be-").unwrap();
    drop(file);
    log.record_transition(record("be-1", "working", "merged"), NOW + 5)
        .unwrap();

    let records = log.read_all().unwrap();
    assert_eq!(records.len(), 2);
}

#[test]
fn read_all_on_missing_file_is_empty() {
    let tmp = TempDir::new().unwrap();
    assert!(log(&tmp).read_all().unwrap().is_empty());
}

// ── Summary derivation ───────────────────────────────────────────────────────

fn transitions(task: &str, steps: &[(&str, &str, u64)]) -> Vec<ao_core::OutcomeTransition> {
    steps
        .iter()
        .map(|(from, to, ts)| ao_core::OutcomeTransition {
            session_id: "be-1".to_string(),
            project_id: "backend".to_string(),
            task_id: task.to_string(),
            plan_id: "default".to_string(),
            issue_id: None,
            from_status: from.to_string(),
            to_status: to.to_string(),
            timestamp: *ts,
        })
        .collect()
}

#[test]
fn clean_run_is_first_pass_success() {
    let records = transitions(
        "t1",
        &[
            ("spawning", "working", 100),
            ("working", "pr_open", 200),
            ("pr_open", "mergeable", 300),
            ("mergeable", "merged", 400),
        ],
    );
    let summary = OutcomeSummary::derive(records, &OutcomeQuery::default());

    assert_eq!(summary.tasks.len(), 1);
    let task = &summary.tasks[0];
    assert_eq!(task.transitions, 4);
    assert_eq!(task.retries, 0);
    assert_eq!(task.failure_signals, 0);
    assert_eq!(task.started_at, Some(100));
    assert_eq!(task.completed_at, Some(400));
    assert_eq!(task.cycle_time_ms, Some(300));
    assert!(task.first_pass_success);
}

#[test]
fn failure_recovery_counts_a_retry() {
    let records = transitions(
        "t1",
        &[
            ("working", "pr_open", 100),
            ("pr_open", "ci_failed", 200),
            ("ci_failed", "pr_open", 300),
            ("pr_open", "merged", 400),
        ],
    );
    let summary = OutcomeSummary::derive(records, &OutcomeQuery::default());
    let task = &summary.tasks[0];

    assert_eq!(task.retries, 1);
    assert_eq!(task.failure_signals, 1);
    assert!(!task.first_pass_success);
}

#[test]
fn reopen_is_terminal_to_nonterminal() {
    let records = transitions(
        "t1",
        &[
            ("working", "merged", 100),
            ("merged", "working", 200),
            ("working", "done", 300),
        ],
    );
    let summary = OutcomeSummary::derive(records, &OutcomeQuery::default());
    let task = &summary.tasks[0];

    assert_eq!(task.reopen_count, 1);
    // completion is the FIRST terminal arrival
    assert_eq!(task.completed_at, Some(100));
}

#[test]
fn derivation_sorts_by_timestamp() {
    let mut records = transitions(
        "t1",
        &[("working", "merged", 500), ("spawning", "working", 100)],
    );
    records.swap(0, 1);
    let summary = OutcomeSummary::derive(records, &OutcomeQuery::default());
    assert_eq!(summary.tasks[0].started_at, Some(100));
    assert_eq!(summary.tasks[0].cycle_time_ms, Some(400));
}

#[test]
fn plan_rollups_average_over_tasks() {
    let mut records = transitions(
        "clean",
        &[("spawning", "working", 0), ("working", "merged", 100)],
    );
    records.extend(transitions(
        "churn",
        &[
            ("working", "ci_failed", 0),
            ("ci_failed", "working", 50),
            ("working", "merged", 300),
        ],
    ));
    let summary = OutcomeSummary::derive(records, &OutcomeQuery::default());

    assert_eq!(summary.plans.len(), 1);
    let plan = &summary.plans[0];
    assert_eq!(plan.task_count, 2);
    assert!((plan.first_pass_rate - 0.5).abs() < 1e-9);
    assert!((plan.average_retries - 0.5).abs() < 1e-9);
    assert!((plan.reopen_rate - 0.0).abs() < 1e-9);
    assert_eq!(plan.average_cycle_time_ms, Some(200.0));
}

#[test]
fn query_filters_by_plan_and_time() {
    let mut records = transitions("t1", &[("working", "merged", 100)]);
    let mut other = transitions("t2", &[("working", "merged", 900)]);
    for r in &mut other {
        r.plan_id = "other".to_string();
    }
    records.extend(other);

    let query = OutcomeQuery {
        plan_id: Some("other".to_string()),
        ..Default::default()
    };
    let summary = OutcomeSummary::derive(records.clone(), &query);
    assert_eq!(summary.tasks.len(), 1);
    assert_eq!(summary.tasks[0].task_id, "t2");

    let query = OutcomeQuery {
        until_ms: Some(200),
        ..Default::default()
    };
    let summary = OutcomeSummary::derive(records, &query);
    assert_eq!(summary.tasks.len(), 1);
    assert_eq!(summary.tasks[0].task_id, "t1");
}

// ── Retrospective ────────────────────────────────────────────────────────────

#[test]
fn retrospective_groups_patterns() {
    let mut records = Vec::new();
    // retry churn: two failure->recovery cycles
    records.extend(transitions(
        "churny",
        &[
            ("working", "ci_failed", 0),
            ("ci_failed", "working", 10),
            ("working", "stuck", 20),
            ("stuck", "working", 30),
            ("working", "merged", 40),
        ],
    ));
    // incomplete: never terminal
    records.extend(transitions("hanging", &[("spawning", "working", 0)]));
    // reopened
    records.extend(transitions(
        "boomerang",
        &[("working", "done", 0), ("done", "working", 10)],
    ));

    let summary = OutcomeSummary::derive(records, &OutcomeQuery::default());
    let findings = generate_retrospective(&summary);
    let patterns: Vec<&str> = findings.iter().map(|f| f.pattern.as_str()).collect();

    assert!(patterns.contains(&"retry_churn"));
    assert!(patterns.contains(&"reopened_work"));
    assert!(patterns.contains(&"incomplete_work"));

    let churn = findings.iter().find(|f| f.pattern == "retry_churn").unwrap();
    assert_eq!(churn.task_ids, vec!["churny"]);
    assert_eq!(churn.severity, "high");
}

#[test]
fn retrospective_flags_tasks_above_p75_cycle_time() {
    let mut records = Vec::new();
    for (task, end) in [("a", 100), ("b", 110), ("c", 120), ("slowpoke", 10_000)] {
        records.extend(transitions(
            task,
            &[("spawning", "working", 0), ("working", "merged", end)],
        ));
    }
    let summary = OutcomeSummary::derive(records, &OutcomeQuery::default());
    let findings = generate_retrospective(&summary);

    let slow = findings
        .iter()
        .find(|f| f.pattern == "long_cycle_time")
        .unwrap();
    assert_eq!(slow.task_ids, vec!["slowpoke"]);
}

#[test]
fn empty_summary_has_no_findings() {
    let summary = OutcomeSummary::derive(Vec::new(), &OutcomeQuery::default());
    assert!(generate_retrospective(&summary).is_empty());
}

// ── Scanner ──────────────────────────────────────────────────────────────────

#[test]
fn scanner_aggregates_across_projects() {
    let tmp = TempDir::new().unwrap();
    for (slug, session) in [("aaaa-backend", "be-1"), ("bbbb-frontend", "fe-1")] {
        let log = OutcomeLog::new(
            tmp.path()
                .join(slug)
                .join("metrics/outcome-transitions.jsonl"),
        );
        log.record_transition(record(session, "spawning", "working"), NOW)
            .unwrap();
    }

    let summary = OutcomeScanner::new(tmp.path())
        .summary(&OutcomeQuery::default())
        .unwrap();
    assert_eq!(summary.record_count, 2);
}

#[test]
fn scanner_on_missing_root_is_empty() {
    let summary = OutcomeScanner::new("/nonexistent/ao-root")
        .summary(&OutcomeQuery::default())
        .unwrap();
    assert_eq!(summary.record_count, 0);
}
