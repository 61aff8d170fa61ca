// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake SCM: fully scripted PR state for engine tests.

use super::{
    summarize_checks, AutomatedComment, CiCheck, CiSummary, Mergeability, ReviewComment,
    ReviewDecision, Scm, ScmError,
};
use ao_core::session::{PrRef, Session};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct FakeScmState {
    prs: HashMap<String, PrRef>,
    checks: Vec<CiCheck>,
    decision: ReviewDecision,
    pending: Vec<ReviewComment>,
    automated: Vec<AutomatedComment>,
    mergeability: Mergeability,
    merged: Vec<u64>,
    fail_merge: bool,
    fail_reads: bool,
}

/// Scriptable SCM for tests.
#[derive(Clone, Default)]
pub struct FakeScm {
    state: Arc<Mutex<FakeScmState>>,
}

impl FakeScm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a PR for a session id.
    pub fn set_pr(&self, session_id: &str, pr: PrRef) {
        self.state.lock().prs.insert(session_id.to_string(), pr);
    }

    pub fn set_checks(&self, checks: Vec<CiCheck>) {
        self.state.lock().checks = checks;
    }

    pub fn set_decision(&self, decision: ReviewDecision) {
        self.state.lock().decision = decision;
    }

    pub fn set_pending_comments(&self, comments: Vec<ReviewComment>) {
        self.state.lock().pending = comments;
    }

    pub fn set_automated_comments(&self, comments: Vec<AutomatedComment>) {
        self.state.lock().automated = comments;
    }

    pub fn set_mergeability(&self, mergeability: Mergeability) {
        self.state.lock().mergeability = mergeability;
    }

    pub fn fail_merges(&self, fail: bool) {
        self.state.lock().fail_merge = fail;
    }

    /// Make every read operation error, for degradation tests.
    pub fn fail_reads(&self, fail: bool) {
        self.state.lock().fail_reads = fail;
    }

    pub fn merged_prs(&self) -> Vec<u64> {
        self.state.lock().merged.clone()
    }

    fn check_reads(&self) -> Result<(), ScmError> {
        if self.state.lock().fail_reads {
            return Err(ScmError::CommandFailed("scripted read failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Scm for FakeScm {
    fn name(&self) -> &str {
        "fake"
    }

    async fn detect_pr(&self, session: &Session) -> Result<Option<PrRef>, ScmError> {
        self.check_reads()?;
        Ok(self.state.lock().prs.get(session.id.as_str()).cloned())
    }

    async fn ci_checks(&self, _pr: &PrRef) -> Result<Vec<CiCheck>, ScmError> {
        self.check_reads()?;
        Ok(self.state.lock().checks.clone())
    }

    async fn ci_summary(&self, pr: &PrRef) -> Result<CiSummary, ScmError> {
        Ok(summarize_checks(&self.ci_checks(pr).await?))
    }

    async fn reviews(&self, _pr: &PrRef) -> Result<Vec<ReviewComment>, ScmError> {
        self.check_reads()?;
        Ok(self.state.lock().pending.clone())
    }

    async fn review_decision(&self, _pr: &PrRef) -> Result<ReviewDecision, ScmError> {
        self.check_reads()?;
        Ok(self.state.lock().decision)
    }

    async fn pending_comments(&self, _pr: &PrRef) -> Result<Vec<ReviewComment>, ScmError> {
        self.check_reads()?;
        Ok(self.state.lock().pending.clone())
    }

    async fn automated_comments(&self, _pr: &PrRef) -> Result<Vec<AutomatedComment>, ScmError> {
        self.check_reads()?;
        Ok(self.state.lock().automated.clone())
    }

    async fn mergeability(&self, _pr: &PrRef) -> Result<Mergeability, ScmError> {
        self.check_reads()?;
        Ok(self.state.lock().mergeability)
    }

    async fn merge_pr(&self, pr: &PrRef, _method: Option<&str>) -> Result<(), ScmError> {
        let mut state = self.state.lock();
        if state.fail_merge {
            return Err(ScmError::MergeFailed("scripted merge failure".to_string()));
        }
        state.merged.push(pr.number);
        Ok(())
    }
}
