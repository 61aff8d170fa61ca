// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ao-adapters: plugin contracts and the built-in implementations.
//!
//! Every external dependency of the engine — runtime, agent, workspace,
//! tracker, SCM, notifier, terminal — sits behind a typed async contract.
//! The engine depends only on the traits; the registry owns instance
//! lifetime for the process.

pub mod agent;
pub mod notify;
pub mod registry;
pub mod runtime;
pub mod scm;
pub mod terminal;
pub mod tracker;
pub mod workspace;

pub use agent::{Agent, AgentError, AgentLaunchConfig, ActivityDetection, ClaudeAgent};
pub use notify::{DesktopNotifier, Notifier, NoopNotifier, NotifyAction, NotifyError, NotifyEvent};
pub use registry::{PluginRegistry, RegistryError};
pub use runtime::{Runtime, RuntimeError, SessionSpec, TmuxRuntime};
pub use scm::{
    AutomatedComment, CheckStatus, CiCheck, CiState, CiSummary, CommentSeverity, GhScm,
    Mergeability, ReviewComment, ReviewDecision, Scm, ScmError,
};
pub use terminal::{NoopTerminal, Terminal, TerminalError};
pub use tracker::{GithubTracker, Issue, Tracker, TrackerError};
pub use workspace::{
    WorkspaceAdapter, WorkspaceError, WorkspaceInfo, WorkspaceSpec, WorktreeWorkspace,
};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use agent::FakeAgent;
#[cfg(any(test, feature = "test-support"))]
pub use notify::FakeNotifier;
#[cfg(any(test, feature = "test-support"))]
pub use runtime::{FakeRuntime, RuntimeCall};
#[cfg(any(test, feature = "test-support"))]
pub use scm::FakeScm;
#[cfg(any(test, feature = "test-support"))]
pub use tracker::FakeTracker;
#[cfg(any(test, feature = "test-support"))]
pub use workspace::FakeWorkspace;
