// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle manager: the polling loop that advances sessions.
//!
//! `check` is one advancement step. Observations happen in a fixed order
//! (metadata, runtime, agent, SCM) and at most one status transition is
//! persisted per call; everything else a check learns is expressed as
//! reaction events. SCM and agent introspection failures degrade to "no
//! signal" rather than failing the poll.

use crate::error::EngineError;
use crate::services::Services;
use crate::session_manager::{session_from_metadata, SessionManager, CAPTURE_LINES};
use crate::send::SendOptions;
use crate::verifier::VerifierPoll;
use ao_adapters::scm::{CiState, Mergeability, ReviewDecision};
use ao_core::clock::Clock;
use ao_core::reaction::ReactionEvent;
use ao_core::session::{PrRef, SessionRole, VerifierVerdict};
use ao_core::status::{Activity, SessionStatus};
use ao_storage::TransitionRecord;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Idle duration before `agent-stuck` fires when the rule sets no threshold.
const DEFAULT_STUCK_THRESHOLD: Duration = Duration::from_secs(10 * 60);

/// Working-without-PR duration before `agent-idle-no-pr` fires by default.
const DEFAULT_IDLE_NO_PR_THRESHOLD: Duration = Duration::from_secs(30 * 60);

/// Lifecycle loop configuration.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    pub tick_interval: Duration,
    /// Bounded fan-out for per-session polls within a tick.
    pub max_parallel_polls: usize,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(5),
            max_parallel_polls: 4,
        }
    }
}

/// What one `check` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub from: SessionStatus,
    pub to: Option<SessionStatus>,
    pub events: Vec<ReactionEvent>,
}

impl CheckOutcome {
    fn unchanged(from: SessionStatus) -> Self {
        Self {
            from,
            to: None,
            events: Vec::new(),
        }
    }
}

/// Lifecycle manager over the session manager.
pub struct LifecycleManager<C: Clock> {
    manager: Arc<SessionManager<C>>,
    clock: C,
    config: LifecycleConfig,
    /// Epoch ms when each session was first observed in its current status.
    status_since: Mutex<HashMap<String, u64>>,
    /// Projects whose all-complete notification already fired.
    all_complete_fired: Mutex<HashSet<String>>,
}

impl<C: Clock + 'static> LifecycleManager<C> {
    pub fn new(manager: Arc<SessionManager<C>>, clock: C, config: LifecycleConfig) -> Self {
        Self {
            manager,
            clock,
            config,
            status_since: Mutex::new(HashMap::new()),
            all_complete_fired: Mutex::new(HashSet::new()),
        }
    }

    fn services(&self) -> &Arc<Services> {
        self.manager.services()
    }

    /// One advancement step for a session. Idempotent when nothing changed.
    pub async fn check(&self, session_id: &str) -> Result<CheckOutcome, EngineError> {
        // Observation 1: metadata (authoritative status).
        let (project_id, meta) = self.manager.locate(session_id)?;
        let from = meta.status.unwrap_or(SessionStatus::Spawning);
        if from.is_terminal() {
            return Ok(CheckOutcome::unchanged(from));
        }
        let session = session_from_metadata(&project_id, session_id, meta.clone());
        let now_ms = self.clock.epoch_ms();
        let status_since = {
            let mut map = self.status_since.lock();
            *map.entry(session_id.to_string()).or_insert(now_ms)
        };

        // Observation 2: runtime liveness and recent output.
        let handle = session.runtime_handle.clone();
        let (alive, capture) = match &handle {
            Some(handle) => match self.services().registry.runtime(&handle.runtime_name) {
                Ok(runtime) => {
                    let alive = runtime.is_alive(handle).await.unwrap_or(false);
                    let capture = if alive {
                        runtime
                            .get_output(handle, CAPTURE_LINES)
                            .await
                            .unwrap_or_default()
                    } else {
                        String::new()
                    };
                    (alive, capture)
                }
                Err(_) => (false, String::new()),
            },
            None => (false, String::new()),
        };

        // Observation 3: agent-reported activity.
        let detection = if alive {
            self.services()
                .registry
                .agent_for_project(&self.services().config, &project_id)
                .ok()
                .and_then(|agent| {
                    agent.activity_state(
                        &session,
                        &capture,
                        self.services().config.ready_threshold_ms,
                        now_ms,
                    )
                })
        } else {
            None
        };

        let mut events: Vec<ReactionEvent> = Vec::new();
        let mut next: Option<SessionStatus> = None;
        let mut pr: Option<PrRef> = session.pr.clone();
        let mut feedback_to_send: Option<String> = None;

        if !alive {
            events.push(ReactionEvent::AgentExited);
            next = Some(SessionStatus::Errored);
        } else {
            match from {
                SessionStatus::Spawning => {
                    next = Some(SessionStatus::Working);
                }

                SessionStatus::Working => {
                    let workspace = session.workspace_path.clone();

                    // Verifier gate first: complete evidence + configured
                    // verifier wins over PR detection.
                    let verifier_ready = workspace
                        .as_deref()
                        .map(|ws| {
                            session.role == SessionRole::Worker
                                && self.services().config.verifier_for(&project_id).is_some()
                                && self.manager.worker_evidence_complete(ws, session_id)
                        })
                        .unwrap_or(false);

                    if verifier_ready {
                        if let Some(ws) = workspace.as_deref() {
                            if self
                                .manager
                                .start_verification(&project_id, session_id, ws)
                                .await?
                            {
                                next = Some(SessionStatus::VerifierPending);
                            }
                        }
                    } else if let Some(detected) = self.detect_pr(&project_id, &session).await {
                        pr = Some(detected);
                        next = Some(SessionStatus::PrOpen);
                    } else if let Some(detection) = &detection {
                        match detection.activity {
                            Activity::WaitingInput | Activity::Blocked => {
                                events.push(ReactionEvent::AgentNeedsInput);
                                next = Some(SessionStatus::NeedsInput);
                            }
                            Activity::Idle => {
                                let threshold = self
                                    .rule_threshold(&project_id, ReactionEvent::AgentStuck)
                                    .unwrap_or(DEFAULT_STUCK_THRESHOLD);
                                let idle_ms = now_ms.saturating_sub(detection.since_ms);
                                if idle_ms > threshold.as_millis() as u64 {
                                    events.push(ReactionEvent::AgentStuck);
                                    next = Some(SessionStatus::Stuck);
                                }
                            }
                            _ => {}
                        }

                        if next.is_none() {
                            let threshold = self
                                .rule_threshold(&project_id, ReactionEvent::AgentIdleNoPr)
                                .unwrap_or(DEFAULT_IDLE_NO_PR_THRESHOLD);
                            if now_ms.saturating_sub(status_since) > threshold.as_millis() as u64
                            {
                                events.push(ReactionEvent::AgentIdleNoPr);
                            }
                        }
                    }
                }

                SessionStatus::NeedsInput | SessionStatus::Stuck => {
                    if let Some(detection) = &detection {
                        if matches!(detection.activity, Activity::Active | Activity::Ready) {
                            next = Some(SessionStatus::Working);
                        }
                    }
                }

                SessionStatus::VerifierPending => {
                    match self.manager.poll_verifier(&project_id, session_id)? {
                        VerifierPoll::Pending => {}
                        VerifierPoll::Failed { feedback } => {
                            self.manager.stamp_verifier_status(
                                &project_id,
                                session_id,
                                VerifierVerdict::Failed,
                            )?;
                            feedback_to_send = feedback;
                            next = Some(SessionStatus::VerifierFailed);
                        }
                        VerifierPoll::Passed => {
                            self.manager.stamp_verifier_status(
                                &project_id,
                                session_id,
                                VerifierVerdict::Passed,
                            )?;
                            next = Some(SessionStatus::PrReady);
                        }
                    }
                }

                SessionStatus::VerifierFailed => {
                    if let Some(ws) = session.workspace_path.as_deref() {
                        if self.manager.evidence_changed(&project_id, session_id, ws)?
                            && self
                                .manager
                                .start_verification(&project_id, session_id, ws)
                                .await?
                        {
                            next = Some(SessionStatus::VerifierPending);
                        }
                    }
                }

                SessionStatus::PrReady => {
                    if let Some(detected) = self.detect_pr(&project_id, &session).await {
                        pr = Some(detected);
                        next = Some(SessionStatus::PrOpen);
                    }
                }

                SessionStatus::Merged => {
                    // Workspace teardown happens on the way into cleanup.
                    if session.role != SessionRole::Orchestrator {
                        if let Some(ws) = session.workspace_path.as_deref() {
                            if let Ok(workspace) = self
                                .services()
                                .registry
                                .workspace_for_project(&self.services().config, &project_id)
                            {
                                let _ = workspace.destroy(ws).await;
                            }
                        }
                    }
                    next = Some(SessionStatus::Cleanup);
                }

                SessionStatus::Cleanup => {
                    next = Some(SessionStatus::Done);
                }

                status if is_pr_status(status) => {
                    // Observation 4: SCM signals.
                    if pr.is_none() {
                        pr = self.detect_pr(&project_id, &session).await;
                    }
                    if let Some(pr_ref) = &pr {
                        let (ci, decision, mergeability, has_findings) =
                            self.observe_scm(&project_id, pr_ref).await;
                        let (step_next, step_events) =
                            pr_family_step(status, ci, decision, mergeability, has_findings);
                        next = step_next;
                        events.extend(step_events);
                    }
                }

                _ => {}
            }
        }

        // Persist the single transition, if any.
        let store = self.services().metadata(&project_id)?;
        if let Some(to) = next {
            from.transition(to)?;

            let mut updates = BTreeMap::new();
            updates.insert("status".to_string(), to.as_str().to_string());
            updates.insert("lastActivityAt".to_string(), iso_of(now_ms));
            if let Some(pr_ref) = &pr {
                if meta.pr.is_none() {
                    if let Ok(json) = serde_json::to_string(pr_ref) {
                        updates.insert("pr".to_string(), json);
                    }
                }
            }
            store.update(session_id, &updates)?;

            self.services().outcome_log(&project_id)?.record_transition(
                TransitionRecord {
                    session_id: session_id.to_string(),
                    project_id: project_id.clone(),
                    from_status: from.as_str().to_string(),
                    to_status: to.as_str().to_string(),
                    task_id: None,
                    plan_id: meta.plan_id.clone(),
                    issue_id: meta.issue.clone(),
                    timestamp: Some(now_ms),
                },
                now_ms,
            )?;

            self.status_since
                .lock()
                .insert(session_id.to_string(), now_ms);
            tracing::info!(session_id, from = from.as_str(), to = to.as_str(), "status advanced");
        }

        // Verifier feedback goes to the worker after its state is persisted.
        if let Some(feedback) = feedback_to_send {
            let options = SendOptions {
                no_wait: true,
                ..Default::default()
            };
            if let Err(e) = self.manager.send(session_id, &feedback, &options).await {
                tracing::warn!(session_id, error = %e, "verifier feedback delivery failed");
            }
            self.manager.retire_verifier(&project_id, session_id).await;
        } else if next == Some(SessionStatus::PrReady) {
            self.manager.retire_verifier(&project_id, session_id).await;
        }

        // Reaction dispatch; failures are swallowed inside `react`.
        let effective = next.unwrap_or(from);
        let mut applied = next;
        for event in &events {
            if let Some(follow) = self
                .manager
                .react(session_id, &project_id, *event, pr.as_ref(), effective)
                .await
            {
                // Only auto-merge produces a follow-up; apply it as the one
                // transition of this check when none happened yet.
                if applied.is_none() && from.transition(follow).is_ok() {
                    let mut updates = BTreeMap::new();
                    updates.insert("status".to_string(), follow.as_str().to_string());
                    updates.insert("lastActivityAt".to_string(), iso_of(now_ms));
                    store.update(session_id, &updates)?;
                    self.services().outcome_log(&project_id)?.record_transition(
                        TransitionRecord {
                            session_id: session_id.to_string(),
                            project_id: project_id.clone(),
                            from_status: from.as_str().to_string(),
                            to_status: follow.as_str().to_string(),
                            task_id: None,
                            plan_id: meta.plan_id.clone(),
                            issue_id: meta.issue.clone(),
                            timestamp: Some(now_ms),
                        },
                        now_ms,
                    )?;
                    self.status_since
                        .lock()
                        .insert(session_id.to_string(), now_ms);
                    applied = Some(follow);
                }
            }
        }

        Ok(CheckOutcome {
            from,
            to: applied,
            events,
        })
    }

    /// Poll every session once, with bounded parallelism.
    pub async fn tick(self: &Arc<Self>) -> usize {
        let sessions = match self.manager.list(None).await {
            Ok(sessions) => sessions,
            Err(e) => {
                tracing::warn!(error = %e, "session listing failed; skipping tick");
                return 0;
            }
        };
        let count = sessions.len();

        let semaphore = Arc::new(Semaphore::new(self.config.max_parallel_polls.max(1)));
        let mut polls = JoinSet::new();
        for session in sessions {
            let this = Arc::clone(self);
            let semaphore = Arc::clone(&semaphore);
            let session_id = session.id.to_string();
            polls.spawn(async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return;
                };
                if let Err(e) = this.check(&session_id).await {
                    tracing::warn!(session_id, error = %e, "check failed");
                }
            });
        }
        while polls.join_next().await.is_some() {}

        self.fire_all_complete().await;
        count
    }

    /// Drive ticks until the shutdown signal flips. In-flight polls drain
    /// before the loop exits.
    pub async fn run(self: Arc<Self>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.config.tick_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick().await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("lifecycle loop shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Fire `all-complete` once per project when every session is terminal.
    async fn fire_all_complete(&self) {
        for project_id in self.services().project_ids() {
            if self.all_complete_fired.lock().contains(&project_id) {
                continue;
            }
            let Ok(sessions) = self.manager.list(Some(&project_id)).await else {
                continue;
            };
            if sessions.is_empty() || !sessions.iter().all(|s| s.status.is_terminal()) {
                continue;
            }
            self.all_complete_fired.lock().insert(project_id.clone());

            let rule = self
                .services()
                .config
                .reaction_for(&project_id, ReactionEvent::AllComplete);
            let priority = rule
                .and_then(|r| r.priority)
                .unwrap_or(ao_core::reaction::NotifyPriority::Info);
            let message = rule
                .and_then(|r| r.message.clone())
                .unwrap_or_else(|| "All sessions for the project have finished.".to_string());
            self.manager
                .notify(
                    priority,
                    &format!("all-complete: {}", project_id),
                    &message,
                    None,
                    &project_id,
                )
                .await;
        }
    }

    async fn detect_pr(
        &self,
        project_id: &str,
        session: &ao_core::session::Session,
    ) -> Option<PrRef> {
        let scm = self
            .services()
            .registry
            .scm_for_project(&self.services().config, project_id)
            .ok()?;
        scm.detect_pr(session).await.unwrap_or(None)
    }

    /// CI, review, mergeability, and bot findings for a PR; each signal
    /// degrades independently.
    async fn observe_scm(
        &self,
        project_id: &str,
        pr: &PrRef,
    ) -> (CiState, ReviewDecision, Mergeability, bool) {
        let Ok(scm) = self
            .services()
            .registry
            .scm_for_project(&self.services().config, project_id)
        else {
            return (
                CiState::None,
                ReviewDecision::None,
                Mergeability::Unknown,
                false,
            );
        };

        let ci = scm
            .ci_summary(pr)
            .await
            .map(|s| s.state)
            .unwrap_or(CiState::None);
        let decision = scm
            .review_decision(pr)
            .await
            .unwrap_or(ReviewDecision::None);
        let mergeability = scm
            .mergeability(pr)
            .await
            .unwrap_or(Mergeability::Unknown);
        let has_findings = scm
            .automated_comments(pr)
            .await
            .map(|f| !f.is_empty())
            .unwrap_or(false);
        (ci, decision, mergeability, has_findings)
    }

    fn rule_threshold(&self, project_id: &str, event: ReactionEvent) -> Option<Duration> {
        self.services()
            .config
            .reaction_for(project_id, event)
            .and_then(|rule| rule.threshold)
    }
}

fn is_pr_status(status: SessionStatus) -> bool {
    matches!(
        status,
        SessionStatus::PrOpen
            | SessionStatus::CiFailed
            | SessionStatus::ReviewPending
            | SessionStatus::ChangesRequested
            | SessionStatus::Approved
            | SessionStatus::Mergeable
    )
}

/// Pure decision step for the PR-status family: at most one transition plus
/// the events the observations imply.
fn pr_family_step(
    status: SessionStatus,
    ci: CiState,
    decision: ReviewDecision,
    mergeability: Mergeability,
    has_bot_findings: bool,
) -> (Option<SessionStatus>, Vec<ReactionEvent>) {
    use SessionStatus::*;

    let mut events = Vec::new();
    let mut next = None;

    if mergeability == Mergeability::Conflicting {
        events.push(ReactionEvent::MergeConflicts);
    }
    if has_bot_findings {
        events.push(ReactionEvent::BugbotComments);
    }

    if ci == CiState::Failing {
        events.push(ReactionEvent::CiFailed);
        if matches!(status, PrOpen | ChangesRequested) {
            next = Some(CiFailed);
        }
    } else if decision == ReviewDecision::ChangesRequested {
        events.push(ReactionEvent::ChangesRequested);
        if matches!(status, PrOpen | ReviewPending | CiFailed) {
            next = Some(ChangesRequested);
        }
    } else if status == CiFailed {
        // CI recovered and no changes requested.
        next = Some(PrOpen);
    } else if status == ChangesRequested {
        // Review concerns resolved.
        next = Some(PrOpen);
    } else if decision == ReviewDecision::Approved {
        match status {
            PrOpen | ReviewPending => next = Some(Approved),
            Approved if mergeability == Mergeability::Mergeable => next = Some(Mergeable),
            Mergeable => events.push(ReactionEvent::ApprovedAndGreen),
            _ => {}
        }
    } else if status == PrOpen && decision == ReviewDecision::ReviewRequired && ci != CiState::Pending {
        next = Some(ReviewPending);
    }

    (next, events)
}

fn iso_of(epoch_ms: u64) -> String {
    chrono::DateTime::from_timestamp_millis(epoch_ms as i64)
        .unwrap_or_default()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
