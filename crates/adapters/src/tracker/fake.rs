// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake tracker with scripted issues.

use super::{Issue, Tracker, TrackerError};
use ao_core::config::ProjectConfig;
use ao_core::id::IssueId;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Scriptable tracker for tests.
#[derive(Clone, Default)]
pub struct FakeTracker {
    issues: Arc<Mutex<HashMap<String, Issue>>>,
}

impl FakeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_issue(&self, id: &str, title: &str) {
        self.issues.lock().insert(
            id.to_string(),
            Issue {
                id: IssueId::new(id),
                title: title.to_string(),
                body: String::new(),
                url: None,
            },
        );
    }
}

#[async_trait]
impl Tracker for FakeTracker {
    fn name(&self) -> &str {
        "fake"
    }

    async fn get_issue(
        &self,
        id: &IssueId,
        _project: &ProjectConfig,
    ) -> Result<Option<Issue>, TrackerError> {
        Ok(self.issues.lock().get(id.as_str()).cloned())
    }

    fn issue_url(&self, id: &IssueId, _project: &ProjectConfig) -> Option<String> {
        Some(format!("https://tracker.test/{}", id))
    }

    fn branch_name(&self, id: &IssueId) -> String {
        format!("issue/{}", id.as_str().trim_start_matches('#'))
    }

    fn generate_prompt(&self, id: &IssueId, _project: &ProjectConfig) -> String {
        format!("Work issue {} to completion.", id)
    }
}
