// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session manager: spawn, restore, list, get, kill, cleanup.
//!
//! Spawn is the one place sessions come into existence (adapters never spawn
//! on their own). The id reservation is exclusive-create; everything created
//! after it is torn down again if a later step fails, so a failed spawn
//! leaves no orphans.

use crate::error::EngineError;
use crate::services::Services;
use ao_adapters::agent::AgentLaunchConfig;
use ao_adapters::runtime::SessionSpec;
use ao_adapters::workspace::WorkspaceSpec;
use ao_core::clock::Clock;
use ao_core::id::{IssueId, ProjectId, SessionId};
use ao_core::session::{RuntimeHandle, Session, SessionRole};
use ao_core::status::{Activity, SessionStatus};
use ao_storage::{parse_tmux_name, session_name, MetadataStore, SessionMetadata, TransitionRecord};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Bounded retry for the reserve loop; closes the listing/creation race.
const MAX_RESERVE_ATTEMPTS: u32 = 10;

/// Warm-up before the initial prompt is sent to a fresh runtime.
const DEFAULT_PROMPT_DELAY: Duration = Duration::from_millis(1_500);

/// Output lines captured for liveness/activity enrichment.
pub(crate) const CAPTURE_LINES: u32 = 80;

/// Inputs to `spawn`.
#[derive(Debug, Clone, Default)]
pub struct SpawnRequest {
    pub project_id: String,
    pub issue_id: Option<IssueId>,
    /// Agent plugin override; defaults resolve through the registry.
    pub agent: Option<String>,
    /// Initial prompt, constructed externally. Opaque here.
    pub prompt: Option<String>,
    pub role: SessionRole,
}

/// Session manager over the service bundle.
pub struct SessionManager<C: Clock> {
    pub(crate) services: Arc<Services>,
    pub(crate) clock: C,
    prompt_delay: Duration,
}

impl<C: Clock> SessionManager<C> {
    pub fn new(services: Arc<Services>, clock: C) -> Self {
        Self {
            services,
            clock,
            prompt_delay: DEFAULT_PROMPT_DELAY,
        }
    }

    /// Override the prompt warm-up delay (tests use zero).
    pub fn with_prompt_delay(mut self, delay: Duration) -> Self {
        self.prompt_delay = delay;
        self
    }

    pub fn services(&self) -> &Arc<Services> {
        &self.services
    }

    fn now_iso(&self) -> String {
        chrono::DateTime::from_timestamp_millis(self.clock.epoch_ms() as i64)
            .unwrap_or_default()
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string()
    }

    /// Spawn a worker session for a project.
    pub async fn spawn(&self, request: SpawnRequest) -> Result<Session, EngineError> {
        let project_id = request.project_id.clone();
        let project = self.services.project(&project_id)?.clone();
        let paths = self.services.paths(&project_id)?;
        paths.validate_and_store_origin(&self.services.config.config_path)?;
        let store = self.services.metadata(&project_id)?;

        let prefix = project
            .session_prefix
            .clone()
            .unwrap_or_else(|| ao_storage::derive_session_prefix(&project_id));

        let runtime = self
            .services
            .registry
            .runtime_for_project(&self.services.config, &project_id)?;
        // Agent override swaps only the agent slot, never the runtime.
        let agent = match &request.agent {
            Some(name) => self.services.registry.agent(name)?,
            None => self
                .services
                .registry
                .agent_for_project(&self.services.config, &project_id)?,
        };
        let workspace_adapter = self
            .services
            .registry
            .workspace_for_project(&self.services.config, &project_id)?;

        // Find the next free number: metadata ids and live runtime names both
        // count, then exclusive-create settles races.
        let mut n = {
            let id_prefix = format!("{}-", prefix);
            let mut max_n = 0u64;
            for id in store.list()? {
                if let Some(rest) = id.strip_prefix(&id_prefix) {
                    if let Ok(num) = rest.parse::<u64>() {
                        max_n = max_n.max(num);
                    }
                }
            }
            for name in runtime.list_sessions().await.unwrap_or_default() {
                if let Some((hash, name_prefix, num)) = parse_tmux_name(&name) {
                    if hash == paths.hash() && name_prefix == prefix {
                        max_n = max_n.max(num);
                    }
                }
            }
            max_n + 1
        };

        let session_id = {
            let mut reserved = None;
            for _ in 0..MAX_RESERVE_ATTEMPTS {
                let candidate = session_name(&prefix, n);
                if store.reserve(&candidate)? {
                    reserved = Some(candidate);
                    break;
                }
                n += 1;
            }
            reserved.ok_or(EngineError::ReservationExhausted {
                prefix: prefix.clone(),
                attempts: MAX_RESERVE_ATTEMPTS,
            })?
        };

        tracing::info!(project_id, session_id, "spawning session");

        let branch = match &request.issue_id {
            Some(issue) => sanitize_branch(issue.as_str()),
            None => format!("ao/{}", session_id),
        };

        let launch_config = AgentLaunchConfig {
            agent_config: project.agent_config.clone(),
            ready_threshold_ms: self.services.config.ready_threshold_ms,
        };

        // Orchestrators work in the project checkout itself.
        let (workspace_path, workspace_branch, owns_workspace) =
            if request.role == SessionRole::Orchestrator {
                (project.path.clone(), None, false)
            } else {
                let spec = WorkspaceSpec {
                    session_id: SessionId::new(&session_id),
                    project_path: project.path.clone(),
                    default_branch: project.default_branch.clone(),
                    branch: Some(branch.clone()),
                    workspaces_root: paths.worktrees_dir(),
                };
                let info = match workspace_adapter.create(&spec).await {
                    Ok(info) => info,
                    Err(e) => {
                        let _ = store.delete(&session_id, false);
                        return Err(e.into());
                    }
                };
                if let Err(e) = workspace_adapter.post_create(&info, &project).await {
                    let _ = workspace_adapter.destroy(&info.path).await;
                    let _ = store.delete(&session_id, false);
                    return Err(e.into());
                }
                if let Err(e) = agent
                    .setup_workspace_hooks(&info.path, &launch_config)
                    .await
                {
                    let _ = workspace_adapter.destroy(&info.path).await;
                    let _ = store.delete(&session_id, false);
                    return Err(e.into());
                }
                (info.path, info.branch, true)
            };

        // Environment: orchestrator identifiers plus agent-provided vars.
        let mut env = vec![
            ("AO_SESSION".to_string(), session_id.clone()),
            ("AO_PROJECT_ID".to_string(), project_id.clone()),
            (
                "AO_DATA_DIR".to_string(),
                paths.base_dir().display().to_string(),
            ),
            (
                format!("{}_SESSION", prefix.to_uppercase()),
                session_id.clone(),
            ),
        ];
        env.extend(agent.environment(&launch_config));

        let runtime_name = paths.tmux_name(&prefix, n);
        let spec = SessionSpec {
            name: runtime_name.clone(),
            cwd: workspace_path.clone(),
            command: agent.launch_command(&launch_config),
            env,
        };

        let handle = match runtime.create(&spec).await {
            Ok(handle) => handle,
            Err(e) => {
                if owns_workspace {
                    let _ = workspace_adapter.destroy(&workspace_path).await;
                }
                let _ = store.delete(&session_id, false);
                return Err(e.into());
            }
        };

        let write_result = self.write_initial_metadata(
            &store,
            &session_id,
            &project_id,
            &request,
            &workspace_path,
            workspace_branch.as_deref().unwrap_or(&branch),
            &handle,
            &runtime_name,
        );
        if let Err(e) = write_result {
            // Failure after runtime creation must destroy the runtime.
            let _ = runtime.destroy(&handle).await;
            if owns_workspace {
                let _ = workspace_adapter.destroy(&workspace_path).await;
            }
            let _ = store.delete(&session_id, false);
            return Err(e);
        }

        if let Some(prompt) = &request.prompt {
            if !self.prompt_delay.is_zero() {
                tokio::time::sleep(self.prompt_delay).await;
            }
            if let Err(e) = runtime.send_message(&handle, prompt).await {
                tracing::warn!(session_id, error = %e, "initial prompt delivery failed");
            }
        }

        self.get(&session_id).await
    }

    /// Spawn the project's orchestrator session: the project path is the
    /// workspace and the session is flagged `role=orchestrator`.
    pub async fn spawn_orchestrator(
        &self,
        project_id: &str,
        system_prompt: &str,
    ) -> Result<Session, EngineError> {
        self.spawn(SpawnRequest {
            project_id: project_id.to_string(),
            issue_id: None,
            agent: None,
            prompt: Some(system_prompt.to_string()),
            role: SessionRole::Orchestrator,
        })
        .await
    }

    #[allow(clippy::too_many_arguments)]
    fn write_initial_metadata(
        &self,
        store: &MetadataStore,
        session_id: &str,
        project_id: &str,
        request: &SpawnRequest,
        workspace_path: &std::path::Path,
        branch: &str,
        handle: &RuntimeHandle,
        runtime_name: &str,
    ) -> Result<(), EngineError> {
        let mut values = BTreeMap::new();
        values.insert(
            "worktree".to_string(),
            workspace_path.display().to_string(),
        );
        values.insert("branch".to_string(), branch.to_string());
        values.insert(
            "status".to_string(),
            SessionStatus::Spawning.as_str().to_string(),
        );
        values.insert("project".to_string(), project_id.to_string());
        if let Some(issue) = &request.issue_id {
            values.insert("issue".to_string(), issue.to_string());
        }
        if let Some(agent) = &request.agent {
            values.insert("agent".to_string(), agent.clone());
        }
        values.insert(
            "runtimeHandle".to_string(),
            serde_json::to_string(handle).map_err(|e| {
                EngineError::Metadata(ao_storage::MetadataError::Io(std::io::Error::other(e)))
            })?,
        );
        values.insert("tmuxName".to_string(), runtime_name.to_string());
        values.insert("createdAt".to_string(), self.now_iso());
        if request.role != SessionRole::Worker {
            values.insert("role".to_string(), request.role.as_str().to_string());
        }
        store.write(session_id, &values)?;
        Ok(())
    }

    /// Find the project that owns a session id.
    pub(crate) fn locate(
        &self,
        session_id: &str,
    ) -> Result<(String, SessionMetadata), EngineError> {
        for project_id in self.services.project_ids() {
            let store = self.services.metadata(&project_id)?;
            if store.exists(session_id)? {
                return Ok((project_id, store.read(session_id)?));
            }
        }
        Err(EngineError::SessionNotFound(session_id.to_string()))
    }

    /// Fresh read of one session from its metadata file.
    pub async fn get(&self, session_id: &str) -> Result<Session, EngineError> {
        let (project_id, meta) = self.locate(session_id)?;
        Ok(session_from_metadata(&project_id, session_id, meta))
    }

    /// Rebuild a session's runtime handle from metadata.
    pub async fn restore(&self, session_id: &str) -> Result<Session, EngineError> {
        let session = self.get(session_id).await?;
        let handle = session
            .runtime_handle
            .as_ref()
            .ok_or_else(|| EngineError::NoRuntimeHandle(session_id.to_string()))?;

        let runtime = self.services.registry.runtime(&handle.runtime_name)?;
        if !runtime.is_alive(handle).await? {
            return Err(EngineError::SessionNotFound(session_id.to_string()));
        }

        if let Some(workspace_path) = session.workspace_path.as_ref() {
            let workspace = self
                .services
                .registry
                .workspace_for_project(&self.services.config, session.project_id.as_str())?;
            if !workspace.exists(workspace_path).await? {
                tracing::warn!(session_id, "workspace missing on restore");
            }
        }
        Ok(session)
    }

    /// Sessions across one or all projects, enriched with runtime liveness
    /// and agent-reported activity. Introspection failures degrade to null.
    pub async fn list(&self, project_id: Option<&str>) -> Result<Vec<Session>, EngineError> {
        let project_ids = match project_id {
            Some(id) => {
                self.services.project(id)?;
                vec![id.to_string()]
            }
            None => self.services.project_ids(),
        };

        let mut sessions = Vec::new();
        for project_id in project_ids {
            let store = self.services.metadata(&project_id)?;
            for session_id in store.list()? {
                let meta = match store.read(&session_id) {
                    Ok(meta) => meta,
                    Err(e) => {
                        tracing::warn!(session_id, error = %e, "unreadable session metadata");
                        continue;
                    }
                };
                let mut session = session_from_metadata(&project_id, &session_id, meta);
                self.enrich(&mut session).await;
                sessions.push(session);
            }
        }
        Ok(sessions)
    }

    /// Overlay liveness + activity onto a session. Never fails.
    pub(crate) async fn enrich(&self, session: &mut Session) {
        let Some(handle) = session.runtime_handle.clone() else {
            return;
        };
        let Ok(runtime) = self.services.registry.runtime(&handle.runtime_name) else {
            return;
        };

        let alive = runtime.is_alive(&handle).await.unwrap_or(false);
        if !alive {
            if !session.status.is_terminal() {
                session.activity = Some(Activity::Exited);
            }
            return;
        }

        let Ok(agent) = self
            .services
            .registry
            .agent_for_project(&self.services.config, session.project_id.as_str())
        else {
            return;
        };
        let capture = runtime
            .get_output(&handle, CAPTURE_LINES)
            .await
            .unwrap_or_default();
        if let Some(detection) = agent.activity_state(
            session,
            &capture,
            self.services.config.ready_threshold_ms,
            self.clock.epoch_ms(),
        ) {
            session.activity = Some(detection.activity);
        }
        session.agent_info = agent.session_info(session);
    }

    /// Terminate the runtime, destroy the workspace (orchestrators keep the
    /// project checkout), record the transition, and archive the metadata.
    pub async fn kill(&self, session_id: &str) -> Result<(), EngineError> {
        let (project_id, meta) = self.locate(session_id)?;
        let store = self.services.metadata(&project_id)?;

        if let Some(handle) = &meta.runtime_handle {
            if let Ok(runtime) = self.services.registry.runtime(&handle.runtime_name) {
                if let Err(e) = runtime.destroy(handle).await {
                    tracing::warn!(session_id, error = %e, "runtime destroy failed during kill");
                }
            }
        }

        if meta.role != SessionRole::Orchestrator {
            if let Some(worktree) = &meta.worktree {
                let workspace = self
                    .services
                    .registry
                    .workspace_for_project(&self.services.config, &project_id)?;
                if let Err(e) = workspace.destroy(worktree).await {
                    tracing::warn!(session_id, error = %e, "workspace destroy failed during kill");
                }
            }
        }

        let from = meta
            .status
            .map(|s| s.as_str().to_string())
            .unwrap_or_else(|| "spawning".to_string());
        self.services.outcome_log(&project_id)?.record_transition(
            TransitionRecord {
                session_id: session_id.to_string(),
                project_id: project_id.clone(),
                from_status: from,
                to_status: SessionStatus::Killed.as_str().to_string(),
                task_id: None,
                plan_id: meta.plan_id.clone(),
                issue_id: meta.issue.clone(),
                timestamp: None,
            },
            self.clock.epoch_ms(),
        )?;

        let mut updates = BTreeMap::new();
        updates.insert(
            "status".to_string(),
            SessionStatus::Killed.as_str().to_string(),
        );
        store.update(session_id, &updates)?;
        store.delete(session_id, true)?;
        tracing::info!(session_id, project_id, "session killed");
        Ok(())
    }

    /// Remove sessions whose runtime is dead and whose status is terminal.
    /// Returns the ids removed.
    pub async fn cleanup(&self, project_id: Option<&str>) -> Result<Vec<String>, EngineError> {
        let sessions = self.list(project_id).await?;
        let mut removed = Vec::new();

        for session in sessions {
            if !session.status.is_terminal() {
                continue;
            }
            let alive = match &session.runtime_handle {
                Some(handle) => match self.services.registry.runtime(&handle.runtime_name) {
                    Ok(runtime) => runtime.is_alive(handle).await.unwrap_or(false),
                    Err(_) => false,
                },
                None => false,
            };
            if alive {
                continue;
            }

            let project_id = session.project_id.as_str();
            if session.role != SessionRole::Orchestrator {
                if let Some(worktree) = &session.workspace_path {
                    let workspace = self
                        .services
                        .registry
                        .workspace_for_project(&self.services.config, project_id)?;
                    let _ = workspace.destroy(worktree).await;
                }
            }
            self.services
                .metadata(project_id)?
                .delete(session.id.as_str(), true)?;
            removed.push(session.id.to_string());
        }

        if !removed.is_empty() {
            tracing::info!(count = removed.len(), "cleaned up dead sessions");
        }
        Ok(removed)
    }
}

/// Sanitize an issue id into a branch name: strip a leading `#`, replace
/// anything outside `[A-Za-z0-9_./-]` with `-`, collapse `..` to `.`, and
/// trim leading/trailing `.`/`-`.
pub fn sanitize_branch(issue_id: &str) -> String {
    let stripped = issue_id.strip_prefix('#').unwrap_or(issue_id);
    let mut out: String = stripped
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '/' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect();
    while out.contains("..") {
        out = out.replace("..", ".");
    }
    out.trim_matches(|c| c == '.' || c == '-').to_string()
}

/// Project a metadata file into the session entity.
pub(crate) fn session_from_metadata(
    project_id: &str,
    session_id: &str,
    meta: SessionMetadata,
) -> Session {
    let mut session = Session::new(SessionId::new(session_id), ProjectId::new(project_id));
    session.status = meta.status.unwrap_or(SessionStatus::Spawning);
    session.branch = meta.branch;
    session.issue_id = meta.issue.map(IssueId::new);
    session.pr = meta.pr;
    session.workspace_path = meta.worktree;
    session.runtime_handle = meta.runtime_handle;
    session.created_at = meta.created_at;
    session.last_activity_at = meta.last_activity_at;
    session.role = meta.role;
    session.metadata = meta.extra;
    session
}

#[cfg(test)]
#[path = "session_manager_tests.rs"]
mod tests;
