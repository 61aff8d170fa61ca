// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reaction engine: configured responses to detected lifecycle events.
//!
//! Dispatch never returns an error — a failed reaction leaves the session
//! where it is until the next tick. The only way a reaction influences
//! status is the returned follow-up transition (auto-merge), which the
//! caller applies under its one-transition-per-check rule.

use crate::error::EngineError;
use crate::message::build_reaction_message;
use crate::send::SendOptions;
use crate::session_manager::SessionManager;
use ao_core::clock::Clock;
use ao_core::id::{ProjectId, SessionId};
use ao_core::reaction::{
    EscalationState, NotifyPriority, ReactionAction, ReactionEvent, ReactionRule,
};
use ao_core::session::PrRef;
use ao_core::status::SessionStatus;
use std::collections::BTreeMap;

/// Retry budget when a send-to-agent rule does not set one.
const DEFAULT_RETRIES: u32 = 2;

/// Fallback message per event, used when the rule has none.
fn default_message(event: ReactionEvent) -> &'static str {
    match event {
        ReactionEvent::CiFailed => "CI is failing on your pull request. Investigate and fix it.",
        ReactionEvent::ChangesRequested => {
            "A reviewer requested changes. Address the comments and push an update."
        }
        ReactionEvent::BugbotComments => {
            "Automated review found issues on your pull request. Triage and fix them."
        }
        ReactionEvent::MergeConflicts => {
            "Your branch has merge conflicts. Rebase onto the default branch and resolve them."
        }
        ReactionEvent::ApprovedAndGreen => "Pull request approved with green CI.",
        ReactionEvent::AgentStuck => "You appear idle. Continue with the task.",
        ReactionEvent::AgentNeedsInput => "Session is waiting for input.",
        ReactionEvent::AgentExited => "Agent process exited.",
        ReactionEvent::AllComplete => "All sessions for the project have finished.",
        ReactionEvent::AgentIdleNoPr => {
            "You have been working for a while without opening a pull request. Wrap up and open one."
        }
    }
}

impl<C: Clock> SessionManager<C> {
    /// Send a notification through every notifier routed for `priority`.
    /// Best-effort: one notifier failing never stops the others.
    pub(crate) async fn notify(
        &self,
        priority: NotifyPriority,
        title: &str,
        message: &str,
        session_id: Option<&str>,
        project_id: &str,
    ) {
        let notifiers = match self
            .services
            .registry
            .notifiers_for_priority(&self.services.config, priority)
        {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(error = %e, "notifier resolution failed");
                return;
            }
        };

        let event = ao_adapters::notify::NotifyEvent {
            title: title.to_string(),
            message: message.to_string(),
            priority,
            session_id: session_id.map(SessionId::new),
            project_id: Some(ProjectId::new(project_id)),
        };
        for notifier in notifiers {
            if let Err(e) = notifier.notify(&event).await {
                tracing::warn!(notifier = notifier.name(), error = %e, "notifier failed");
            }
        }
    }

    /// React to one detected event for a session.
    ///
    /// Returns a follow-up status the caller may apply (only `auto-merge`
    /// produces one). Errors are swallowed here by contract.
    pub(crate) async fn react(
        &self,
        session_id: &str,
        project_id: &str,
        event: ReactionEvent,
        pr: Option<&PrRef>,
        current_status: SessionStatus,
    ) -> Option<SessionStatus> {
        let Some(rule) = self.services.config.reaction_for(project_id, event) else {
            return None;
        };
        let rule = rule.clone();

        match self
            .apply_rule(session_id, project_id, event, &rule, pr, current_status)
            .await
        {
            Ok(next) => next,
            Err(e) => {
                tracing::warn!(
                    session_id,
                    event = event.as_str(),
                    error = %e,
                    "reaction failed; session left as-is"
                );
                None
            }
        }
    }

    async fn apply_rule(
        &self,
        session_id: &str,
        project_id: &str,
        event: ReactionEvent,
        rule: &ReactionRule,
        pr: Option<&PrRef>,
        current_status: SessionStatus,
    ) -> Result<Option<SessionStatus>, EngineError> {
        let configured = rule
            .message
            .clone()
            .unwrap_or_else(|| default_message(event).to_string());
        let priority = rule.priority.unwrap_or_default();

        if !rule.auto {
            self.notify(
                priority,
                &format!("{}: {}", event, session_id),
                &configured,
                Some(session_id),
                project_id,
            )
            .await;
            return Ok(None);
        }

        match rule.action.unwrap_or(ReactionAction::SendToAgent) {
            ReactionAction::Notify => {
                self.notify(
                    priority,
                    &format!("{}: {}", event, session_id),
                    &configured,
                    Some(session_id),
                    project_id,
                )
                .await;
                Ok(None)
            }

            ReactionAction::AutoMerge => {
                if current_status != SessionStatus::Mergeable {
                    return Ok(None);
                }
                let Some(pr) = pr else { return Ok(None) };
                let scm = self
                    .services
                    .registry
                    .scm_for_project(&self.services.config, project_id)?;
                scm.merge_pr(pr, None).await?;
                tracing::info!(session_id, pr = pr.number, "auto-merged pull request");
                Ok(Some(SessionStatus::Merged))
            }

            ReactionAction::SendToAgent => {
                let store = self.services.metadata(project_id)?;
                let meta = store.read(session_id)?;
                let now_ms = self.clock.epoch_ms();

                let mut state = meta
                    .escalation_state
                    .as_deref()
                    .and_then(EscalationState::decode)
                    .filter(|s| s.event == event)
                    .unwrap_or_else(|| EscalationState::new(event, now_ms));

                let retries = rule.retries.unwrap_or(DEFAULT_RETRIES);
                if state.attempts > retries {
                    // Already escalated for this window.
                    return Ok(None);
                }

                let elapsed_ms = now_ms.saturating_sub(state.first_seen_ms);
                let over_time = rule
                    .escalate_after
                    .is_some_and(|limit| elapsed_ms > limit.as_millis() as u64);

                if state.attempts >= retries || over_time {
                    tracing::warn!(
                        session_id,
                        event = event.as_str(),
                        attempts = state.attempts,
                        "auto-remediation exhausted; escalating"
                    );
                    self.notify(
                        NotifyPriority::Warning,
                        &format!("escalation: {} on {}", event, session_id),
                        &format!(
                            "Automated remediation did not resolve `{}` after {} attempts.",
                            event, state.attempts
                        ),
                        Some(session_id),
                        project_id,
                    )
                    .await;
                    state.attempts = retries + 1;
                    self.persist_escalation(&store, session_id, &state)?;
                    return Ok(None);
                }

                let attempt = state.attempts + 1;
                let message = match pr {
                    Some(pr) => {
                        let scm = self
                            .services
                            .registry
                            .scm_for_project(&self.services.config, project_id)?;
                        let runtime_pair = match &meta.runtime_handle {
                            Some(handle) => self
                                .services
                                .registry
                                .runtime(&handle.runtime_name)
                                .ok()
                                .map(|r| (r, handle.clone())),
                            None => None,
                        };
                        match &runtime_pair {
                            Some((runtime, handle)) => {
                                build_reaction_message(
                                    scm.as_ref(),
                                    Some((runtime.as_ref(), handle)),
                                    pr,
                                    event,
                                    &configured,
                                    attempt,
                                )
                                .await
                            }
                            None => {
                                build_reaction_message(
                                    scm.as_ref(),
                                    None,
                                    pr,
                                    event,
                                    &configured,
                                    attempt,
                                )
                                .await
                            }
                        }
                    }
                    None => configured.clone(),
                };

                let options = SendOptions {
                    no_wait: true,
                    ..Default::default()
                };
                self.send(session_id, &message, &options).await?;
                state.attempts = attempt;
                self.persist_escalation(&store, session_id, &state)?;
                tracing::info!(
                    session_id,
                    event = event.as_str(),
                    attempt,
                    "auto-remediation sent"
                );
                Ok(None)
            }
        }
    }

    fn persist_escalation(
        &self,
        store: &ao_storage::MetadataStore,
        session_id: &str,
        state: &EscalationState,
    ) -> Result<(), EngineError> {
        let mut updates = BTreeMap::new();
        updates.insert("escalationState".to_string(), state.encode());
        store.update(session_id, &updates)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "reactions_tests.rs"]
mod tests;
