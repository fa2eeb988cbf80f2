// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker identifier, status lifecycle, and the orchestrated-unit-of-work record.
//!
//! A Worker is an opaque child process operating inside its own working copy
//! (a VCS worktree). The Registry owns [`Worker`] records; the Supervisor owns
//! the OS process handle.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

crate::define_id! {
    /// Unique identifier for a worker instance.
    pub struct WorkerId;
}

/// Status lifecycle: `pending -> active -> {completed | failed | terminating -> (completed|failed)}`.
///
/// Transitions are monotone except `terminating`, which precedes completion
/// or failure rather than being itself terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Pending,
    Active,
    Terminating,
    Completed,
    Failed,
}

impl WorkerStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkerStatus::Completed | WorkerStatus::Failed)
    }
}

impl fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerStatus::Pending => write!(f, "pending"),
            WorkerStatus::Active => write!(f, "active"),
            WorkerStatus::Terminating => write!(f, "terminating"),
            WorkerStatus::Completed => write!(f, "completed"),
            WorkerStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Closed set of termination reasons (§9 Open Questions: the spec's source
/// permits a freeform string too, but this implementation resolves the
/// ambiguity in favor of a closed, type-checked set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    UserInitiated,
    Timeout,
    MemoryLimit,
    Shutdown,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::UserInitiated => write!(f, "user_initiated"),
            TerminationReason::Timeout => write!(f, "timeout"),
            TerminationReason::MemoryLimit => write!(f, "memory_limit"),
            TerminationReason::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// Caller-supplied parameters for spawning a new worker (§4.B Spawn contract).
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub project: PathBuf,
    pub name: String,
    pub kind: String,
    pub base_revision: String,
    pub branch: Option<String>,
    pub task: Option<String>,
    pub command: Option<String>,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub metadata: HashMap<String, String>,
}

impl SpawnRequest {
    pub fn new(
        project: impl Into<PathBuf>,
        name: impl Into<String>,
        base_revision: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            name: name.into(),
            kind: "generic".to_string(),
            base_revision: base_revision.into(),
            branch: None,
            task: None,
            command: None,
            args: Vec::new(),
            env: HashMap::new(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }

    pub fn with_command(mut self, command: impl Into<String>, args: Vec<String>) -> Self {
        self.command = Some(command.into());
        self.args = args;
        self
    }
}

/// An orchestrated unit of work: a child process inside its own working copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    pub id: WorkerId,
    pub name: String,
    pub kind: String,
    pub status: WorkerStatus,
    pub project: PathBuf,
    pub base_revision: String,
    pub branch: String,
    pub worktree_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination_reason: Option<TerminationReason>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Worker {
    pub fn new(
        id: WorkerId,
        request: &SpawnRequest,
        branch: String,
        worktree_path: PathBuf,
        created_at_ms: u64,
    ) -> Self {
        Self {
            id,
            name: request.name.clone(),
            kind: request.kind.clone(),
            status: WorkerStatus::Pending,
            project: request.project.clone(),
            base_revision: request.base_revision.clone(),
            branch,
            worktree_path,
            task: request.task.clone(),
            pid: None,
            created_at_ms,
            started_at_ms: None,
            completed_at_ms: None,
            error: None,
            termination_reason: None,
            metadata: request.metadata.clone(),
        }
    }

    pub fn mark_active(&mut self, pid: u32, now_ms: u64) {
        self.status = WorkerStatus::Active;
        self.pid = Some(pid);
        self.started_at_ms = Some(now_ms);
    }

    pub fn mark_terminating(&mut self, reason: TerminationReason) {
        self.status = WorkerStatus::Terminating;
        self.termination_reason = Some(reason);
    }

    pub fn mark_completed(&mut self, now_ms: u64) {
        self.status = WorkerStatus::Completed;
        self.completed_at_ms = Some(now_ms);
        self.pid = None;
    }

    pub fn mark_failed(&mut self, error: impl Into<String>, now_ms: u64) {
        self.status = WorkerStatus::Failed;
        self.error = Some(error.into());
        self.completed_at_ms = Some(now_ms);
        self.pid = None;
    }

    /// Slug a worker name into the default branch suffix: lowercase,
    /// non-alphanumeric runs collapsed to a single `-`.
    pub fn slug(name: &str) -> String {
        let mut out = String::with_capacity(name.len());
        let mut last_was_sep = false;
        for ch in name.chars() {
            if ch.is_ascii_alphanumeric() {
                out.push(ch.to_ascii_lowercase());
                last_was_sep = false;
            } else if !last_was_sep && !out.is_empty() {
                out.push('-');
                last_was_sep = true;
            }
        }
        while out.ends_with('-') {
            out.pop();
        }
        out
    }

    /// Default branch name: `agent/<slug(name)>-<short-id>`.
    pub fn default_branch(name: &str, id: &WorkerId) -> String {
        format!("agent/{}-{}", Self::slug(name), id.short(8))
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
