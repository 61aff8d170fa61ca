// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Versioned plan artifacts.
//!
//! At most one artifact per session is non-superseded at a time; the plan
//! store enforces that by superseding the previous current artifact whenever
//! a new `(planId, planVersion)` is written.

use crate::error::ErrorKind;
use crate::id::PlanId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors from plan artifact validation
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("unknown plan status: {0}")]
    UnknownStatus(String),
    #[error("plan version must be a positive integer, got {0}")]
    InvalidVersion(u32),
}

impl PlanError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidInput
    }
}

/// Status of a plan artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    #[default]
    Draft,
    Validated,
    Superseded,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Draft => "draft",
            PlanStatus::Validated => "validated",
            PlanStatus::Superseded => "superseded",
        }
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PlanStatus {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PlanStatus::Draft),
            "validated" => Ok(PlanStatus::Validated),
            "superseded" => Ok(PlanStatus::Superseded),
            other => Err(PlanError::UnknownStatus(other.to_string())),
        }
    }
}

/// A versioned plan blob with its bookkeeping fields.
///
/// Identity key is `(sessionId, planId, planVersion)`; the session id is
/// implied by the artifact's location on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanArtifact {
    pub plan_id: PlanId,
    pub plan_version: u32,
    pub plan_status: PlanStatus,
    /// Path relative to the project state directory.
    pub plan_path: String,
    pub created_at: String,
    pub updated_at: String,
    /// Opaque plan content; the graph layer knows how to read `tasks`.
    pub blob: serde_json::Value,
}

impl PlanArtifact {
    /// Validate the version field (zero is reserved/invalid).
    pub fn validate_version(version: u32) -> Result<(), PlanError> {
        if version == 0 {
            return Err(PlanError::InvalidVersion(version));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod tests;
