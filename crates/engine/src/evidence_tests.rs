// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

fn write_full_bundle(workspace: &Path, session_id: &str) {
    let dir = evidence_dir(workspace, session_id);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("command-log.json"),
        r#"{"schemaVersion": "1", "complete": true, "entries": [{"command": "cargo test", "exitCode": 0}]}"#,
    )
    .unwrap();
    std::fs::write(
        dir.join("tests-run.json"),
        r#"{"schemaVersion": "1", "complete": true, "tests": [{"command": "cargo test", "status": "passed"}]}"#,
    )
    .unwrap();
    std::fs::write(
        dir.join("changed-paths.json"),
        r#"{"schemaVersion": "1", "complete": true, "paths": ["src/lib.rs"]}"#,
    )
    .unwrap();
    std::fs::write(
        dir.join("known-risks.json"),
        r#"{"schemaVersion": "1", "complete": true, "risks": []}"#,
    )
    .unwrap();
}

#[test]
fn load_full_bundle_is_complete() {
    let tmp = TempDir::new().unwrap();
    write_full_bundle(tmp.path(), "be-1");

    let bundle = load_evidence(tmp.path(), "be-1");
    assert!(bundle.is_complete());
    assert_eq!(bundle.tests_run.unwrap().tests.len(), 1);
}

#[test]
fn missing_dir_loads_empty_bundle() {
    let tmp = TempDir::new().unwrap();
    let bundle = load_evidence(tmp.path(), "be-1");
    assert!(!bundle.is_complete());
    assert!(bundle.command_log.is_none());
}

#[test]
fn unparseable_file_is_treated_as_missing() {
    let tmp = TempDir::new().unwrap();
    write_full_bundle(tmp.path(), "be-1");
    std::fs::write(
        evidence_dir(tmp.path(), "be-1").join("command-log.json"),
        "{not json",
    )
    .unwrap();

    let bundle = load_evidence(tmp.path(), "be-1");
    assert!(bundle.command_log.is_none());
    assert!(!bundle.is_complete());
}

#[test]
fn fingerprint_is_none_without_files() {
    let tmp = TempDir::new().unwrap();
    assert!(evidence_fingerprint(tmp.path(), "be-1").is_none());
}

#[test]
fn fingerprint_is_stable_and_changes_with_content() {
    let tmp = TempDir::new().unwrap();
    write_full_bundle(tmp.path(), "be-1");

    let first = evidence_fingerprint(tmp.path(), "be-1").unwrap();
    let second = evidence_fingerprint(tmp.path(), "be-1").unwrap();
    assert_eq!(first, second);

    std::fs::write(
        evidence_dir(tmp.path(), "be-1").join("command-log.json"),
        r#"{"schemaVersion": "1", "complete": true, "entries": [{"command": "cargo test", "exitCode": 1}]}"#,
    )
    .unwrap();
    let third = evidence_fingerprint(tmp.path(), "be-1").unwrap();
    assert_ne!(first, third);
}

#[test]
fn stamp_records_all_paths() {
    let tmp = TempDir::new().unwrap();
    let store = MetadataStore::new(tmp.path().join("sessions"));
    let mut values = BTreeMap::new();
    values.insert("status".to_string(), "working".to_string());
    store.write("be-1", &values).unwrap();

    stamp_evidence_metadata(&store, "be-1", &tmp.path().join("wt")).unwrap();

    let meta = store.read("be-1").unwrap();
    assert_eq!(meta.evidence_schema_version.as_deref(), Some("1"));
    assert!(meta.evidence_dir.unwrap().ends_with(".ao/evidence/be-1"));
    assert!(meta
        .evidence_command_log
        .unwrap()
        .ends_with("command-log.json"));
    assert!(meta.evidence_known_risks.is_some());
}
