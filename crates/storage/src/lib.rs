// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ao-storage: the hash-partitioned filesystem data model.
//!
//! Everything a project persists lives under
//! `$HOME/.agent-orchestrator/<hash>-<projectId>/` and is addressable from
//! the config path alone: session metadata, plan artifacts, archives, and
//! the append-only outcome log.

mod metadata;
mod outcome;
mod paths;
mod plans;

pub use metadata::{MetadataError, MetadataStore, SessionMetadata};
pub use outcome::{
    generate_retrospective, OutcomeError, OutcomeLog, OutcomeQuery, OutcomeScanner,
    OutcomeSummary, PlanOutcome, RetrospectiveFinding, TaskOutcome, TransitionRecord,
};
pub use paths::{
    config_hash, derive_session_prefix, hash_of, parse_tmux_name, session_name, tmux_name,
    PathsError, ProjectPaths, STATE_DIR_NAME,
};
pub use plans::{NewPlan, PlanStoreError, PlanStore};
