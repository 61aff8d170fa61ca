// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker evidence contract.
//!
//! A completing worker writes four JSON files under
//! `<workspace>/.ao/evidence/<sessionId>/`; the lifecycle manager gates
//! verification on their presence and re-verification on their change.

use serde::{Deserialize, Serialize};

/// Current evidence schema version.
pub const EVIDENCE_SCHEMA_VERSION: &str = "1";

/// Evidence directory relative to the workspace root.
pub const EVIDENCE_DIR: &str = ".ao/evidence";

/// Well-known evidence file names, in canonical order.
pub const EVIDENCE_FILES: [&str; 4] = [
    "command-log.json",
    "tests-run.json",
    "changed-paths.json",
    "known-risks.json",
];

/// One executed command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandLogEntry {
    pub command: String,
    #[serde(default)]
    pub exit_code: Option<i32>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// `command-log.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandLog {
    pub schema_version: String,
    #[serde(default)]
    pub complete: bool,
    #[serde(default)]
    pub entries: Vec<CommandLogEntry>,
}

/// Result of one test command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRun {
    pub command: String,
    pub status: TestStatus,
}

/// `tests-run.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestsRun {
    pub schema_version: String,
    #[serde(default)]
    pub complete: bool,
    #[serde(default)]
    pub tests: Vec<TestRun>,
}

/// `changed-paths.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangedPaths {
    pub schema_version: String,
    #[serde(default)]
    pub complete: bool,
    #[serde(default)]
    pub paths: Vec<String>,
}

/// `known-risks.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnownRisks {
    pub schema_version: String,
    #[serde(default)]
    pub complete: bool,
    #[serde(default)]
    pub risks: Vec<serde_json::Value>,
}

/// The four evidence files, parsed. Missing files are `None`.
#[derive(Debug, Clone, Default)]
pub struct EvidenceBundle {
    pub command_log: Option<CommandLog>,
    pub tests_run: Option<TestsRun>,
    pub changed_paths: Option<ChangedPaths>,
    pub known_risks: Option<KnownRisks>,
}

impl EvidenceBundle {
    /// A bundle is complete when all four files exist and the command log
    /// declares itself complete.
    pub fn is_complete(&self) -> bool {
        matches!(&self.command_log, Some(log) if log.complete)
            && self.tests_run.is_some()
            && self.changed_paths.is_some()
            && self.known_risks.is_some()
    }
}

#[cfg(test)]
#[path = "evidence_tests.rs"]
mod tests;
