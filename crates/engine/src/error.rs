// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error type, folding store and plugin failures into the shared
//! taxonomy.

use ao_adapters::agent::AgentError;
use ao_adapters::notify::NotifyError;
use ao_adapters::registry::RegistryError;
use ao_adapters::runtime::RuntimeError;
use ao_adapters::scm::ScmError;
use ao_adapters::tracker::TrackerError;
use ao_adapters::workspace::WorkspaceError;
use ao_core::error::ErrorKind;
use ao_core::graph::GraphError;
use ao_core::id::IdError;
use ao_core::reaction::ReactionError;
use ao_core::status::StatusError;
use ao_storage::{MetadataError, OutcomeError, PathsError, PlanStoreError};
use thiserror::Error;

/// Errors surfaced by engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("session not found: {0}")]
    SessionNotFound(String),
    #[error("project not found: {0}")]
    ProjectNotFound(String),
    #[error("session has no runtime handle: {0}")]
    NoRuntimeHandle(String),
    #[error("could not reserve a session id under prefix {prefix} after {attempts} attempts")]
    ReservationExhausted { prefix: String, attempts: u32 },
    #[error(transparent)]
    InvalidId(#[from] IdError),
    #[error(transparent)]
    Status(#[from] StatusError),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Reaction(#[from] ReactionError),
    #[error(transparent)]
    Paths(#[from] PathsError),
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error(transparent)]
    PlanStore(#[from] PlanStoreError),
    #[error(transparent)]
    Outcome(#[from] OutcomeError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("runtime plugin failed: {0}")]
    Runtime(#[from] RuntimeError),
    #[error("agent plugin failed: {0}")]
    Agent(#[from] AgentError),
    #[error("workspace plugin failed: {0}")]
    Workspace(#[from] WorkspaceError),
    #[error("scm plugin failed: {0}")]
    Scm(#[from] ScmError),
    #[error("tracker plugin failed: {0}")]
    Tracker(#[from] TrackerError),
    #[error("notifier plugin failed: {0}")]
    Notify(#[from] NotifyError),
}

impl EngineError {
    /// The coarse taxonomy bucket, for `kind: cause` user-facing lines.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::SessionNotFound(_) | EngineError::ProjectNotFound(_) => {
                ErrorKind::NotFound
            }
            EngineError::NoRuntimeHandle(_) => ErrorKind::ContractViolation,
            EngineError::ReservationExhausted { .. } => ErrorKind::Conflict,
            EngineError::InvalidId(_) | EngineError::Reaction(_) => ErrorKind::InvalidInput,
            EngineError::Status(e) => e.kind(),
            EngineError::Graph(e) => e.kind(),
            EngineError::Paths(e) => match e {
                PathsError::OriginCollision { .. } => ErrorKind::Conflict,
                PathsError::InvalidId(_) => ErrorKind::InvalidInput,
                _ => ErrorKind::IoFailure,
            },
            EngineError::Metadata(e) => match e {
                MetadataError::InvalidId(_) => ErrorKind::InvalidInput,
                MetadataError::NotFound(_) => ErrorKind::NotFound,
                MetadataError::InvalidValue { .. } => ErrorKind::ContractViolation,
                MetadataError::Io(_) => ErrorKind::IoFailure,
            },
            EngineError::PlanStore(e) => match e {
                PlanStoreError::InvalidId(_)
                | PlanStoreError::InvalidVersion
                | PlanStoreError::InvalidPlanPath(_) => ErrorKind::InvalidInput,
                PlanStoreError::NoCurrentPlan(_) | PlanStoreError::ArtifactNotFound(_) => {
                    ErrorKind::NotFound
                }
                _ => ErrorKind::IoFailure,
            },
            EngineError::Outcome(_) => ErrorKind::IoFailure,
            EngineError::Registry(_) => ErrorKind::NotFound,
            EngineError::Runtime(_)
            | EngineError::Agent(_)
            | EngineError::Workspace(_)
            | EngineError::Scm(_)
            | EngineError::Tracker(_)
            | EngineError::Notify(_) => ErrorKind::PluginFailure,
        }
    }
}
