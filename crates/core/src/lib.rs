// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ao-core: Domain model for the Agent Orchestrator
//!
//! Pure types and logic only — no filesystem, no subprocesses. The storage,
//! adapter, and engine crates build on the entities defined here.

pub mod clock;
pub mod config;
pub mod error;
pub mod evidence;
pub mod graph;
pub mod id;
pub mod outcome;
pub mod plan;
pub mod reaction;
pub mod ready_queue;
pub mod session;
pub mod status;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{
    Defaults, NotifierConfig, OrchestratorConfig, ProjectConfig, VerifierConfig,
};
pub use error::ErrorKind;
pub use evidence::{
    ChangedPaths, CommandLog, CommandLogEntry, EvidenceBundle, KnownRisks, TestRun, TestStatus,
    TestsRun, EVIDENCE_SCHEMA_VERSION,
};
pub use graph::{GraphError, PlanTaskNode, TaskGraph, TaskInput, TaskState};
pub use id::{validate_session_id, IdError, IssueId, PlanId, ProjectId, SessionId, TaskId};
pub use outcome::{is_failure_status, is_terminal_status, OutcomeTransition};
pub use plan::{PlanArtifact, PlanError, PlanStatus};
pub use reaction::{
    parse_duration, EscalationState, NotificationRouting, NotifyPriority, ReactionAction,
    ReactionEvent, ReactionRule,
};
pub use ready_queue::{ready_queue, ReadyQueue, SchedulerConfig};
pub use session::{PrRef, RuntimeHandle, Session, SessionRole, VerifierVerdict};
pub use status::{Activity, AttentionLevel, SessionStatus, StatusError};
