// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests: a service bundle wired to fakes over a
//! temp directory.

use crate::services::Services;
use crate::session_manager::SessionManager;
use ao_adapters::registry::PluginRegistry;
use ao_adapters::{FakeAgent, FakeNotifier, FakeRuntime, FakeScm, FakeTracker, FakeWorkspace};
use ao_core::clock::FakeClock;
use ao_core::reaction::NotificationRouting;
use ao_core::test_support::config_with_project;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub struct TestHarness {
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

impl TestHarness {
    pub fn manager(&self) -> SessionManager<FakeClock> {
        SessionManager::new(Arc::clone(&self.services), self.clock.clone())
            .with_prompt_delay(Duration::ZERO)
    }
}

pub fn harness() -> TestHarness {
    harness_with(|_| {})
}

pub fn harness_with(
    customize: impl FnOnce(&mut ao_core::config::OrchestratorConfig),
) -> TestHarness {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("config.json");
    std::fs::write(&config_path, "{}").unwrap();
    let project_path = tmp.path().join("project");
    std::fs::create_dir_all(&project_path).unwrap();

    let mut config = config_with_project(&config_path, "backend", &project_path);
    // Route every priority to the single fake notifier.
    config.notification_routing = NotificationRouting {
        urgent: vec!["fake".into()],
        action: vec!["fake".into()],
        warning: vec!["fake".into()],
        info: vec!["fake".into()],
    };

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

    // Project-level slots resolve to the fakes.
    if let Some(project) = config.projects.get_mut("backend") {
        project.scm = Some("fake".to_string());
        project.tracker = Some("fake".to_string());
    }
    customize(&mut config);

    let services = Arc::new(Services::new(
        config,
        Arc::new(registry),
        tmp.path().join("state"),
    ));

    TestHarness {
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
