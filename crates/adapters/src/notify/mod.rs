// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification adapters

mod desktop;
mod noop;

pub use desktop::DesktopNotifier;
pub use noop::NoopNotifier;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeNotifier;

use ao_core::id::{ProjectId, SessionId};
use ao_core::reaction::NotifyPriority;
use async_trait::async_trait;
use thiserror::Error;

/// Errors from notify operations
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// One notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyEvent {
    pub title: String,
    pub message: String,
    pub priority: NotifyPriority,
    pub session_id: Option<SessionId>,
    pub project_id: Option<ProjectId>,
}

/// An actionable button on notifiers that support them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyAction {
    pub label: String,
    pub command: String,
}

/// Notifier contract. Delivery is best-effort; the engine never blocks
/// lifecycle progression on it.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Registry name ("desktop", "slack", "sms", ...).
    fn name(&self) -> &str;

    async fn notify(&self, event: &NotifyEvent) -> Result<(), NotifyError>;

    /// Notify with action buttons; defaults to a plain notification.
    async fn notify_with_actions(
        &self,
        event: &NotifyEvent,
        _actions: &[NotifyAction],
    ) -> Result<(), NotifyError> {
        self.notify(event).await
    }
}
