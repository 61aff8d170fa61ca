// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error classification shared across the workspace.
//!
//! Each crate keeps its own `thiserror` enums; this kind is the coarse bucket
//! surfaced to users (`kind: cause` one-liners) and used by callers that only
//! care about the propagation policy, not the concrete failure.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad id, bad path, bad version, unknown reaction event.
    InvalidInput,
    /// Unknown session/plan/project/plugin.
    NotFound,
    /// Duplicate reservation, origin collision, rejected transition, cycle.
    Conflict,
    /// A plugin (runtime/agent/workspace/scm/notifier) returned an error.
    PluginFailure,
    /// Filesystem or subprocess failure.
    IoFailure,
    /// Persisted state violates an invariant.
    ContractViolation,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::InvalidInput => "invalid input",
            ErrorKind::NotFound => "not found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::PluginFailure => "plugin failure",
            ErrorKind::IoFailure => "io failure",
            ErrorKind::ContractViolation => "contract violation",
        };
        write!(f, "{}", s)
    }
}
