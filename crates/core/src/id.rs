// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier newtypes and the session-id safety gate.
//!
//! Session identifiers become path components under the project state
//! directory, so anything outside `[A-Za-z0-9_-]+` is rejected *before* a
//! path is formed.

use thiserror::Error;

/// Errors from identifier validation
#[derive(Debug, Error)]
pub enum IdError {
    #[error("invalid identifier {0:?}: must match [A-Za-z0-9_-]+")]
    Invalid(String),
}

/// Define a newtype ID wrapper around `String`.
///
/// Generates `new()`, `as_str()`, `short()`, `Display`, `From<String>`,
/// `From<&str>`, `PartialEq<str>`, `PartialEq<&str>`, and `Borrow<str>`
/// implementations.
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns a string slice truncated to at most `n` characters.
            pub fn short(&self, n: usize) -> &str {
                if self.0.len() <= n {
                    &self.0
                } else {
                    &self.0[..n]
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id! {
    /// Identifier for a session (one agent instance working one task).
    ///
    /// Formed as `<prefix>-<n>` by the session manager; always validated
    /// against the filesystem-safe pattern before use.
    pub struct SessionId;
}

define_id! {
    /// Identifier for a configured project.
    pub struct ProjectId;
}

define_id! {
    /// Identifier for a task node within a plan.
    pub struct TaskId;
}

define_id! {
    /// Identifier for a plan artifact (versioned separately).
    pub struct PlanId;
}

define_id! {
    /// Issue-tracker identifier, opaque to the core.
    pub struct IssueId;
}

/// Check that an identifier is filesystem-safe: `[A-Za-z0-9_-]+`.
///
/// Every path-producing function calls this first; the filesystem is never
/// touched for an id that fails.
pub fn validate_session_id(id: &str) -> Result<(), IdError> {
    if id.is_empty()
        || !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(IdError::Invalid(id.to_string()));
    }
    Ok(())
}

impl SessionId {
    /// Construct a validated session id.
    pub fn parse(id: impl Into<String>) -> Result<Self, IdError> {
        let id = id.into();
        validate_session_id(&id)?;
        Ok(Self(id))
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
