// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op notifier for headless and CI environments.

use super::{Notifier, NotifyError, NotifyEvent};
use async_trait::async_trait;

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNotifier;

impl NoopNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for NoopNotifier {
    fn name(&self) -> &str {
        "noop"
    }

    async fn notify(&self, event: &NotifyEvent) -> Result<(), NotifyError> {
        tracing::debug!(title = %event.title, priority = event.priority.as_str(), "notification suppressed (noop)");
        Ok(())
    }
}
