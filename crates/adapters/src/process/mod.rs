// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process supervision: spawning, signaling, and messaging worker children.

mod native;

pub use native::NativeProcessAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeProcessAdapter, ProcessCall};

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from process operations.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("process not found: {0}")]
    NotFound(String),
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("stdin closed")]
    NoStdin,
    #[error("send failed: {0}")]
    SendFailed(String),
    #[error("signal failed: {0}")]
    SignalFailed(String),
}

/// Caller-supplied parameters for spawning a worker's process.
#[derive(Debug, Clone)]
pub struct ProcessSpawnConfig {
    pub worker_id: String,
    pub command: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: HashMap<String, String>,
}

/// A line emitted on a child's stdout or stderr.
#[derive(Debug, Clone)]
pub enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// How a child exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl ExitStatus {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Adapter for spawning, messaging, and terminating worker child processes.
///
/// Mirrors the teacher's agent-session adapter contract: `spawn` returns a
/// handle immediately, output is streamed on a channel, and exit is reported
/// once via the same channel rather than polled.
#[async_trait]
pub trait ProcessAdapter: Clone + Send + Sync + 'static {
    /// Spawn a child process with piped stdio. `output_tx` receives every
    /// stdout/stderr line until the child exits, at which point `exit_tx`
    /// receives the terminal [`ExitStatus`] exactly once.
    async fn spawn(
        &self,
        config: ProcessSpawnConfig,
        output_tx: mpsc::Sender<OutputLine>,
        exit_tx: mpsc::Sender<ExitStatus>,
    ) -> Result<u32, ProcessError>;

    /// Write `payload` followed by a newline to the child's stdin.
    async fn send(&self, worker_id: &str, payload: &str) -> Result<(), ProcessError>;

    /// Send SIGTERM (or platform equivalent); does not wait for exit.
    async fn signal_graceful(&self, worker_id: &str) -> Result<(), ProcessError>;

    /// Send SIGKILL (or platform equivalent); does not wait for exit.
    async fn signal_forceful(&self, worker_id: &str) -> Result<(), ProcessError>;

    /// True if the process is still tracked (has not reported exit).
    async fn is_alive(&self, worker_id: &str) -> bool;
}

pub(crate) fn child_env(
    base: impl Iterator<Item = (String, String)>,
    overlay: &HashMap<String, String>,
    worker_id: &str,
    worktree: &Path,
) -> HashMap<String, String> {
    let mut env: HashMap<String, String> = base.collect();
    env.extend(overlay.clone());
    env.insert("AGENT_ID".to_string(), worker_id.to_string());
    env.insert(
        "AGENT_WORKTREE".to_string(),
        worktree.display().to_string(),
    );
    env.insert("AGENT_ISOLATED".to_string(), "1".to_string());
    env.insert("ORC_PRODUCTION".to_string(), "1".to_string());

    let path = env.get("PATH").cloned().unwrap_or_default();
    env.insert(
        "PATH".to_string(),
        format!("{}:{}", worktree.display(), path),
    );
    env
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
