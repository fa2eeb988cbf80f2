// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn request() -> SpawnRequest {
    SpawnRequest::new("/repo", "Fix Bug #42", "main")
}

#[test]
fn new_worker_starts_pending() {
    let id = WorkerId::new("wkr-1");
    let w = Worker::new(
        id.clone(),
        &request(),
        "agent/fix-bug-42-abc".into(),
        PathBuf::from("/repo/.orch/worktrees/wkr-1"),
        1_000,
    );
    assert_eq!(w.status, WorkerStatus::Pending);
    assert_eq!(w.id, id);
    assert!(w.pid.is_none());
}

#[test]
fn mark_active_sets_pid_and_started_at() {
    let mut w = Worker::new(
        WorkerId::new("wkr-1"),
        &request(),
        "agent/fix-bug-42-abc".into(),
        PathBuf::from("/repo/.orch/worktrees/wkr-1"),
        1_000,
    );
    w.mark_active(4242, 1_500);
    assert_eq!(w.status, WorkerStatus::Active);
    assert_eq!(w.pid, Some(4242));
    assert_eq!(w.started_at_ms, Some(1_500));
}

#[test]
fn mark_completed_clears_pid() {
    let mut w = Worker::new(
        WorkerId::new("wkr-1"),
        &request(),
        "b".into(),
        PathBuf::from("/x"),
        0,
    );
    w.mark_active(1, 0);
    w.mark_completed(10);
    assert_eq!(w.status, WorkerStatus::Completed);
    assert!(w.pid.is_none());
    assert_eq!(w.completed_at_ms, Some(10));
}

#[test]
fn mark_failed_records_error() {
    let mut w = Worker::new(
        WorkerId::new("wkr-1"),
        &request(),
        "b".into(),
        PathBuf::from("/x"),
        0,
    );
    w.mark_failed("exit code 1", 10);
    assert_eq!(w.status, WorkerStatus::Failed);
    assert_eq!(w.error.as_deref(), Some("exit code 1"));
}

#[test]
fn terminating_carries_reason() {
    let mut w = Worker::new(
        WorkerId::new("wkr-1"),
        &request(),
        "b".into(),
        PathBuf::from("/x"),
        0,
    );
    w.mark_terminating(TerminationReason::MemoryLimit);
    assert_eq!(w.status, WorkerStatus::Terminating);
    assert_eq!(w.termination_reason, Some(TerminationReason::MemoryLimit));
}

#[test]
fn slug_collapses_non_alnum_runs() {
    assert_eq!(Worker::slug("Fix Bug #42"), "fix-bug-42");
    assert_eq!(Worker::slug("  leading"), "leading");
    assert_eq!(Worker::slug("trailing!!"), "trailing");
}

#[test]
fn default_branch_uses_slug_and_short_id() {
    let id = WorkerId::new("wkr-0123456789abcdef");
    let branch = Worker::default_branch("Refactor Auth", &id);
    assert!(branch.starts_with("agent/refactor-auth-"));
}

#[test]
fn status_is_terminal() {
    assert!(WorkerStatus::Completed.is_terminal());
    assert!(WorkerStatus::Failed.is_terminal());
    assert!(!WorkerStatus::Active.is_terminal());
    assert!(!WorkerStatus::Terminating.is_terminal());
}

#[test]
fn display_matches_wire_shape() {
    assert_eq!(WorkerStatus::Active.to_string(), "active");
    assert_eq!(TerminationReason::MemoryLimit.to_string(), "memory_limit");
}
