// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake runtime for tests: records calls, scripts output and liveness.

use super::{Runtime, RuntimeError, SessionSpec};
use ao_core::session::RuntimeHandle;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// One recorded call against the fake.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeCall {
    Create {
        name: String,
        command: String,
        env: Vec<(String, String)>,
    },
    Destroy { id: String },
    SendMessage { id: String, text: String },
    ClearInput { id: String },
    GetOutput { id: String },
    IsAlive { id: String },
}

#[derive(Debug, Default)]
struct FakeState {
    calls: Vec<RuntimeCall>,
    alive: HashMap<String, bool>,
    output: HashMap<String, String>,
    fail_create: bool,
    fail_send: bool,
}

/// In-memory runtime that records interactions.
#[derive(Debug, Clone, Default)]
pub struct FakeRuntime {
    state: Arc<Mutex<FakeState>>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.state.lock().calls.clone()
    }

    pub fn sent_messages(&self, id: &str) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                RuntimeCall::SendMessage { id: cid, text } if cid == id => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Script the captured pane text for a session.
    pub fn set_output(&self, id: &str, output: &str) {
        self.state
            .lock()
            .output
            .insert(id.to_string(), output.to_string());
    }

    pub fn set_alive(&self, id: &str, alive: bool) {
        self.state.lock().alive.insert(id.to_string(), alive);
    }

    pub fn fail_next_create(&self) {
        self.state.lock().fail_create = true;
    }

    pub fn fail_sends(&self, fail: bool) {
        self.state.lock().fail_send = fail;
    }
}

#[async_trait]
impl Runtime for FakeRuntime {
    fn name(&self) -> &str {
        "fake"
    }

    async fn create(&self, spec: &SessionSpec) -> Result<RuntimeHandle, RuntimeError> {
        let mut state = self.state.lock();
        state.calls.push(RuntimeCall::Create {
            name: spec.name.clone(),
            command: spec.command.clone(),
            env: spec.env.clone(),
        });
        if state.fail_create {
            state.fail_create = false;
            return Err(RuntimeError::SpawnFailed("scripted failure".to_string()));
        }
        state.alive.insert(spec.name.clone(), true);
        Ok(RuntimeHandle::new(spec.name.clone(), "fake"))
    }

    async fn destroy(&self, handle: &RuntimeHandle) -> Result<(), RuntimeError> {
        let mut state = self.state.lock();
        state.calls.push(RuntimeCall::Destroy {
            id: handle.id.clone(),
        });
        state.alive.insert(handle.id.clone(), false);
        Ok(())
    }

    async fn send_message(&self, handle: &RuntimeHandle, text: &str) -> Result<(), RuntimeError> {
        let mut state = self.state.lock();
        state.calls.push(RuntimeCall::SendMessage {
            id: handle.id.clone(),
            text: text.to_string(),
        });
        if state.fail_send {
            return Err(RuntimeError::CommandFailed("scripted failure".to_string()));
        }
        Ok(())
    }

    async fn clear_input(&self, handle: &RuntimeHandle) -> Result<(), RuntimeError> {
        self.state.lock().calls.push(RuntimeCall::ClearInput {
            id: handle.id.clone(),
        });
        Ok(())
    }

    async fn get_output(&self, handle: &RuntimeHandle, _lines: u32) -> Result<String, RuntimeError> {
        let mut state = self.state.lock();
        state.calls.push(RuntimeCall::GetOutput {
            id: handle.id.clone(),
        });
        Ok(state.output.get(&handle.id).cloned().unwrap_or_default())
    }

    async fn is_alive(&self, handle: &RuntimeHandle) -> Result<bool, RuntimeError> {
        let mut state = self.state.lock();
        state.calls.push(RuntimeCall::IsAlive {
            id: handle.id.clone(),
        });
        Ok(state.alive.get(&handle.id).copied().unwrap_or(false))
    }

    async fn is_process_running(
        &self,
        handle: &RuntimeHandle,
        _pattern: &str,
    ) -> Result<bool, RuntimeError> {
        Ok(self.state.lock().alive.get(&handle.id).copied().unwrap_or(false))
    }

    async fn list_sessions(&self) -> Result<Vec<String>, RuntimeError> {
        let state = self.state.lock();
        let mut names: Vec<String> = state
            .alive
            .iter()
            .filter(|(_, alive)| **alive)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
