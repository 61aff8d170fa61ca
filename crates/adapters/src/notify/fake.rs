// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake notifier that records delivered events.

use super::{Notifier, NotifyError, NotifyEvent};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

/// Recording notifier for tests.
#[derive(Clone, Default)]
pub struct FakeNotifier {
    name: String,
    events: Arc<Mutex<Vec<NotifyEvent>>>,
    fail: Arc<Mutex<bool>>,
}

impl FakeNotifier {
    pub fn new() -> Self {
        Self::named("fake")
    }

    /// A fake registered under a specific notifier name ("slack", "sms").
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            events: Arc::new(Mutex::new(Vec::new())),
            fail: Arc::new(Mutex::new(false)),
        }
    }

    pub fn events(&self) -> Vec<NotifyEvent> {
        self.events.lock().clone()
    }

    pub fn fail_sends(&self, fail: bool) {
        *self.fail.lock() = fail;
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn notify(&self, event: &NotifyEvent) -> Result<(), NotifyError> {
        if *self.fail.lock() {
            return Err(NotifyError::SendFailed("scripted failure".to_string()));
        }
        self.events.lock().push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
