//! Shared fleet harness for behavioral specifications.
//!
//! One project ("backend") over a temp data root, every plugin slot wired to
//! a fake, clocks controllable from the test.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use ao_adapters::registry::PluginRegistry;
use ao_adapters::{FakeAgent, FakeNotifier, FakeRuntime, FakeScm, FakeTracker, FakeWorkspace};
use ao_core::clock::FakeClock;
use ao_core::config::OrchestratorConfig;
use ao_core::reaction::NotificationRouting;
use ao_core::session::{PrRef, SessionRole};
use ao_core::test_support::config_with_project;
use ao_engine::{LifecycleConfig, LifecycleManager, Services, SessionManager, SpawnRequest};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub struct Fleet {
    pub tmp: TempDir,
    pub services: Arc<Services>,
    pub runtime: FakeRuntime,
    pub agent: FakeAgent,
    pub workspace: FakeWorkspace,
    pub scm: FakeScm,
    pub tracker: FakeTracker,
    pub notifier: FakeNotifier,
    pub clock: FakeClock,
}

impl Fleet {
    pub fn manager(&self) -> Arc<SessionManager<FakeClock>> {
        Arc::new(
            SessionManager::new(Arc::clone(&self.services), self.clock.clone())
                .with_prompt_delay(Duration::ZERO),
        )
    }

    pub fn lifecycle(&self) -> Arc<LifecycleManager<FakeClock>> {
        Arc::new(LifecycleManager::new(
            self.manager(),
            self.clock.clone(),
            LifecycleConfig::default(),
        ))
    }

    pub async fn spawn_worker(&self, issue: Option<&str>) -> (String, String) {
        let session = self
            .manager()
            .spawn(SpawnRequest {
                project_id: "backend".to_string(),
                issue_id: issue.map(ao_core::IssueId::new),
                agent: None,
                prompt: None,
                role: SessionRole::Worker,
            })
            .await
            .unwrap();
        let handle = session.runtime_handle.as_ref().unwrap().id.clone();
        (session.id.to_string(), handle)
    }

    pub fn set_status(&self, session_id: &str, status: &str) {
        let store = self.services.metadata("backend").unwrap();
        let mut updates = BTreeMap::new();
        updates.insert("status".to_string(), status.to_string());
        store.update(session_id, &updates).unwrap();
    }

    pub fn status_of(&self, session_id: &str) -> String {
        self.services
            .metadata("backend")
            .unwrap()
            .read_raw(session_id)
            .unwrap()
            .get("status")
            .cloned()
            .unwrap_or_default()
    }

    pub fn pr(&self, number: u64) -> PrRef {
        PrRef {
            number,
            owner: "acme".to_string(),
            repo: "api".to_string(),
            url: format!("https://example.test/acme/api/pull/{}", number),
            title: "Change".to_string(),
            state: "open".to_string(),
            is_draft: false,
        }
    }
}

pub fn fleet() -> Fleet {
    fleet_with(|_| {})
}

pub fn fleet_with(customize: impl FnOnce(&mut OrchestratorConfig)) -> Fleet {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("config.json");
    std::fs::write(&config_path, "{}").unwrap();
    let project_path = tmp.path().join("project");
    std::fs::create_dir_all(&project_path).unwrap();

    let mut config = config_with_project(&config_path, "backend", &project_path);
    config.notification_routing = NotificationRouting {
        urgent: vec!["fake".into()],
        action: vec!["fake".into()],
        warning: vec!["fake".into()],
        info: vec!["fake".into()],
    };
    if let Some(project) = config.projects.get_mut("backend") {
        project.scm = Some("fake".to_string());
        project.tracker = Some("fake".to_string());
    }
    customize(&mut config);

    let runtime = FakeRuntime::new();
    let agent = FakeAgent::new();
    let workspace = FakeWorkspace::new();
    let scm = FakeScm::new();
    let tracker = FakeTracker::new();
    let notifier = FakeNotifier::named("fake");

    let mut registry = PluginRegistry::new();
    registry
        .register_runtime("fake", Arc::new(runtime.clone()))
        .unwrap();
    registry
        .register_agent("fake", Arc::new(agent.clone()))
        .unwrap();
    registry
        .register_workspace("fake", Arc::new(workspace.clone()))
        .unwrap();
    registry.register_scm("fake", Arc::new(scm.clone())).unwrap();
    registry
        .register_tracker("fake", Arc::new(tracker.clone()))
        .unwrap();
    registry
        .register_notifier("fake", Arc::new(notifier.clone()))
        .unwrap();

    let services = Arc::new(Services::new(
        config,
        Arc::new(registry),
        tmp.path().join("state"),
    ));

    Fleet {
        tmp,
        services,
        runtime,
        agent,
        workspace,
        scm,
        tracker,
        notifier,
        clock: FakeClock::new(),
    }
}
