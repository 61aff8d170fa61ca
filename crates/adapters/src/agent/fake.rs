// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake agent for tests: scripted activity per session.

use super::{ActivityDetection, Agent, AgentError, AgentLaunchConfig};
use crate::runtime::Runtime;
use ao_core::session::{RuntimeHandle, Session};
use ao_core::status::Activity;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct FakeAgentState {
    activity: HashMap<String, ActivityDetection>,
    process_running: HashMap<String, bool>,
}

/// Scriptable agent for engine tests.
#[derive(Clone, Default)]
pub struct FakeAgent {
    state: Arc<Mutex<FakeAgentState>>,
}

impl FakeAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_activity(&self, session_id: &str, activity: Activity, since_ms: u64) {
        self.state.lock().activity.insert(
            session_id.to_string(),
            ActivityDetection {
                activity,
                since_ms,
                detail: None,
            },
        );
    }

    pub fn clear_activity(&self, session_id: &str) {
        self.state.lock().activity.remove(session_id);
    }

    pub fn set_process_running(&self, handle_id: &str, running: bool) {
        self.state
            .lock()
            .process_running
            .insert(handle_id.to_string(), running);
    }
}

#[async_trait]
impl Agent for FakeAgent {
    fn name(&self) -> &str {
        "fake"
    }

    fn launch_command(&self, _config: &AgentLaunchConfig) -> String {
        "fake-agent".to_string()
    }

    fn environment(&self, _config: &AgentLaunchConfig) -> Vec<(String, String)> {
        vec![("FAKE_AGENT".to_string(), "1".to_string())]
    }

    fn detect_activity(&self, capture: &str) -> Activity {
        if capture.contains("esc to interrupt") {
            Activity::Active
        } else if capture.trim_end().ends_with('\u{276f}') {
            Activity::Ready
        } else {
            Activity::Active
        }
    }

    fn activity_state(
        &self,
        session: &Session,
        _capture: &str,
        _ready_threshold_ms: Option<u64>,
        _now_ms: u64,
    ) -> Option<ActivityDetection> {
        self.state.lock().activity.get(session.id.as_str()).cloned()
    }

    async fn is_process_running(
        &self,
        runtime: &dyn Runtime,
        handle: &RuntimeHandle,
    ) -> Result<bool, AgentError> {
        if let Some(running) = self.state.lock().process_running.get(&handle.id) {
            return Ok(*running);
        }
        Ok(runtime.is_alive(handle).await?)
    }
}
