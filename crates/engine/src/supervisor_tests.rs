// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::event_bus::EventBus;
use crate::resource_monitor::ResourceMonitor;
use orc_adapters::{ExitStatus, FakeProcessAdapter, FakeResourceSampler, FakeVcsAdapter};
use orc_core::{FakeClock, SequentialIdGen};
use std::time::Duration;
use tempfile::tempdir;

type TestSupervisor = WorkerSupervisor<FakeVcsAdapter, FakeProcessAdapter, FakeResourceSampler, SequentialIdGen>;

fn test_config(dir: &std::path::Path) -> OrchestratorConfig {
    let mut config = OrchestratorConfig::test_default(dir);
    config.max_active_workers = 2;
    config.termination_grace_period = Duration::from_millis(50);
    config.worker_wall_clock_limit = Duration::from_secs(3600);
    config
}

fn build(dir: &std::path::Path) -> (Arc<TestSupervisor>, Arc<Registry>, FakeProcessAdapter, FakeVcsAdapter) {
    let config = test_config(dir);
    let store = orc_storage::RegistryStore::new(config.registry_path());
    let clock: Arc<dyn Clock> = Arc::new(FakeClock::new(0));
    let events = EventBus::new();
    let registry = Arc::new(
        Registry::load(store, events.clone(), Arc::clone(&clock), 1000, 1000).unwrap(),
    );
    let vcs = FakeVcsAdapter::new();
    let process = FakeProcessAdapter::new();
    let sampler = FakeResourceSampler::new();
    let (monitor, _breach_rx) = ResourceMonitor::spawn(sampler, Arc::clone(&clock), &config);
    let supervisor = WorkerSupervisor::new(
        Arc::clone(&registry),
        events,
        vcs.clone(),
        process.clone(),
        monitor,
        clock,
        SequentialIdGen::new("w"),
        config,
    );
    (supervisor, registry, process, vcs)
}

fn request(project: &std::path::Path) -> SpawnRequest {
    SpawnRequest::new(project.to_path_buf(), "Reviewer Agent", "main")
}

#[tokio::test]
async fn spawn_creates_worktree_and_registers_active_worker() {
    let dir = tempdir().unwrap();
    let (supervisor, registry, process, vcs) = build(dir.path());

    let id = supervisor.spawn(request(dir.path())).await.unwrap();

    let worker = registry.get(&id).unwrap();
    assert_eq!(worker.status, WorkerStatus::Active);
    assert!(worker.pid.is_some());
    assert_eq!(vcs.calls().len(), 1);
    assert_eq!(process.calls().len(), 1);
}

#[tokio::test]
async fn spawn_uses_default_branch_when_unspecified() {
    let dir = tempdir().unwrap();
    let (supervisor, registry, _process, _vcs) = build(dir.path());

    let id = supervisor.spawn(request(dir.path())).await.unwrap();
    let worker = registry.get(&id).unwrap();
    assert!(worker.branch.starts_with("agent/reviewer-agent-"));
}

#[tokio::test]
async fn spawn_rejects_past_capacity() {
    let dir = tempdir().unwrap();
    let (supervisor, _registry, _process, _vcs) = build(dir.path());

    supervisor.spawn(request(dir.path())).await.unwrap();
    supervisor.spawn(request(dir.path())).await.unwrap();
    let err = supervisor.spawn(request(dir.path())).await.unwrap_err();
    assert!(matches!(err, OrcError::CapacityExceeded(_)));
}

#[tokio::test]
async fn spawn_vcs_failure_does_not_register_worker() {
    let dir = tempdir().unwrap();
    let (supervisor, registry, _process, vcs) = build(dir.path());
    vcs.fail_next_create();

    let err = supervisor.spawn(request(dir.path())).await.unwrap_err();
    assert!(matches!(err, OrcError::VcsFailure(_)));
    assert_eq!(registry.count(), 0);
}

#[tokio::test]
async fn spawn_process_failure_marks_worker_failed_and_removes_worktree() {
    let dir = tempdir().unwrap();
    let (supervisor, registry, process, vcs) = build(dir.path());
    process.fail_next_spawn();

    let err = supervisor.spawn(request(dir.path())).await.unwrap_err();
    assert!(matches!(err, OrcError::SpawnFailure(_)));
    // The worker was registered active before the process spawn attempt, so
    // it is left behind in `failed` status for inspection rather than erased.
    assert_eq!(registry.count(), 1);
    let worker = registry.by_status(WorkerStatus::Failed);
    assert_eq!(worker.len(), 1);
    assert_eq!(vcs.calls().len(), 2); // create, then remove on failure
}

#[tokio::test]
async fn worker_exit_transitions_registry_to_completed() {
    let dir = tempdir().unwrap();
    let (supervisor, registry, process, _vcs) = build(dir.path());

    let id = supervisor.spawn(request(dir.path())).await.unwrap();
    process
        .finish_tracked(
            id.as_str(),
            ExitStatus {
                code: Some(0),
                signal: None,
            },
        )
        .await;

    tokio::time::sleep(Duration::from_millis(20)).await;
    let worker = registry.get(&id).unwrap();
    assert_eq!(worker.status, WorkerStatus::Completed);
}

#[tokio::test]
async fn worker_exit_with_nonzero_code_transitions_to_failed() {
    let dir = tempdir().unwrap();
    let (supervisor, registry, process, _vcs) = build(dir.path());

    let id = supervisor.spawn(request(dir.path())).await.unwrap();
    process
        .finish_tracked(
            id.as_str(),
            ExitStatus {
                code: Some(1),
                signal: None,
            },
        )
        .await;

    tokio::time::sleep(Duration::from_millis(20)).await;
    let worker = registry.get(&id).unwrap();
    assert_eq!(worker.status, WorkerStatus::Failed);
}

#[tokio::test]
async fn terminate_signals_gracefully_and_removes_worktree() {
    let dir = tempdir().unwrap();
    let (supervisor, registry, process, vcs) = build(dir.path());
    let id = supervisor.spawn(request(dir.path())).await.unwrap();

    let supervisor_clone = Arc::clone(&supervisor);
    let id_clone = id.clone();
    let terminate_task = tokio::spawn(async move {
        supervisor_clone
            .terminate(&id_clone, TerminationReason::UserInitiated)
            .await
    });

    // Simulate the child exiting promptly in response to the graceful signal.
    tokio::time::sleep(Duration::from_millis(10)).await;
    process
        .finish_tracked(
            id.as_str(),
            ExitStatus {
                code: Some(0),
                signal: None,
            },
        )
        .await;

    terminate_task.await.unwrap().unwrap();

    let calls = process.calls();
    assert!(calls
        .iter()
        .any(|c| matches!(c, orc_adapters::ProcessCall::SignalGraceful { .. })));
    assert!(vcs
        .calls()
        .iter()
        .any(|c| matches!(c, orc_adapters::VcsCall::RemoveWorktree { .. })));
    let worker = registry.get(&id).unwrap();
    assert_eq!(worker.termination_reason, Some(TerminationReason::UserInitiated));
}

#[tokio::test]
async fn terminate_unknown_worker_returns_not_found() {
    let dir = tempdir().unwrap();
    let (supervisor, _registry, _process, _vcs) = build(dir.path());
    let err = supervisor
        .terminate(&WorkerId::new("ghost"), TerminationReason::Shutdown)
        .await
        .unwrap_err();
    assert!(matches!(err, OrcError::NotFound(_)));
}

#[tokio::test]
async fn terminate_already_terminal_worker_is_a_no_op() {
    let dir = tempdir().unwrap();
    let (supervisor, registry, process, _vcs) = build(dir.path());
    let id = supervisor.spawn(request(dir.path())).await.unwrap();
    process
        .finish_tracked(
            id.as_str(),
            ExitStatus {
                code: Some(0),
                signal: None,
            },
        )
        .await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(registry.get(&id).unwrap().status, WorkerStatus::Completed);

    supervisor
        .terminate(&id, TerminationReason::UserInitiated)
        .await
        .unwrap();
    assert_eq!(registry.get(&id).unwrap().status, WorkerStatus::Completed);
}

#[tokio::test]
async fn send_forwards_payload_to_process_adapter() {
    let dir = tempdir().unwrap();
    let (supervisor, _registry, process, _vcs) = build(dir.path());
    let id = supervisor.spawn(request(dir.path())).await.unwrap();

    supervisor.send(&id, "hello").await.unwrap();

    assert!(process
        .calls()
        .iter()
        .any(|c| matches!(c, orc_adapters::ProcessCall::Send { payload, .. } if payload == "hello")));
}

#[tokio::test]
async fn logs_buffers_stdout_and_stderr_with_offset_paging() {
    let dir = tempdir().unwrap();
    let (supervisor, _registry, process, _vcs) = build(dir.path());
    let id = supervisor.spawn(request(dir.path())).await.unwrap();

    process.push_output(id.as_str(), orc_adapters::OutputLine::Stdout("line1".to_string())).await;
    process.push_output(id.as_str(), orc_adapters::OutputLine::Stderr("line2".to_string())).await;
    process.push_output(id.as_str(), orc_adapters::OutputLine::Stdout("line3".to_string())).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    let all = supervisor.logs(&id, 0, 10);
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].data, "line1");
    assert_eq!(all[1].stream, LogStream::Stderr);

    let paged = supervisor.logs(&id, 1, 1);
    assert_eq!(paged.len(), 1);
    assert_eq!(paged[0].data, "line2");
}
