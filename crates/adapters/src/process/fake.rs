// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake process adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ExitStatus, OutputLine, ProcessAdapter, ProcessError, ProcessSpawnConfig};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub enum ProcessCall {
    Spawn { worker_id: String, command: String },
    Send { worker_id: String, payload: String },
    SignalGraceful { worker_id: String },
    SignalForceful { worker_id: String },
}

struct FakeProcessState {
    alive: HashMap<String, u32>,
    exit_txs: HashMap<String, mpsc::Sender<ExitStatus>>,
    output_txs: HashMap<String, mpsc::Sender<OutputLine>>,
    calls: Vec<ProcessCall>,
    fail_spawn: bool,
}

/// Fake process adapter for testing: tracks calls and lets tests drive
/// exit/output directly via the channels passed to `spawn`.
#[derive(Clone)]
pub struct FakeProcessAdapter {
    inner: Arc<Mutex<FakeProcessState>>,
    next_pid: Arc<AtomicU32>,
}

impl Default for FakeProcessAdapter {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeProcessState {
                alive: HashMap::new(),
                exit_txs: HashMap::new(),
                output_txs: HashMap::new(),
                calls: Vec::new(),
                fail_spawn: false,
            })),
            next_pid: Arc::new(AtomicU32::new(1000)),
        }
    }
}

impl FakeProcessAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ProcessCall> {
        self.inner.lock().calls.clone()
    }

    pub fn fail_next_spawn(&self) {
        self.inner.lock().fail_spawn = true;
    }

    /// Simulate the child exiting, as the real adapter's wait task would.
    pub async fn finish(&self, worker_id: &str, exit: ExitStatus, exit_tx: &mpsc::Sender<ExitStatus>) {
        self.inner.lock().alive.remove(worker_id);
        let _ = exit_tx.send(exit).await;
    }

    /// Simulate the child exiting using the sender captured at `spawn` time,
    /// for callers (like the Supervisor) that don't hold their own handle to
    /// the channel passed into `spawn`.
    pub async fn finish_tracked(&self, worker_id: &str, exit: ExitStatus) {
        let tx = {
            let mut inner = self.inner.lock();
            inner.alive.remove(worker_id);
            inner.exit_txs.get(worker_id).cloned()
        };
        if let Some(tx) = tx {
            let _ = tx.send(exit).await;
        }
    }

    /// Push a line of output using the channel captured at `spawn` time, as
    /// the real adapter would from the child's stdout/stderr pipes.
    pub async fn push_output(&self, worker_id: &str, line: OutputLine) {
        let tx = self.inner.lock().output_txs.get(worker_id).cloned();
        if let Some(tx) = tx {
            let _ = tx.send(line).await;
        }
    }
}

#[async_trait]
impl ProcessAdapter for FakeProcessAdapter {
    async fn spawn(
        &self,
        config: ProcessSpawnConfig,
        output_tx: mpsc::Sender<OutputLine>,
        exit_tx: mpsc::Sender<ExitStatus>,
    ) -> Result<u32, ProcessError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ProcessCall::Spawn {
            worker_id: config.worker_id.clone(),
            command: config.command.clone(),
        });
        if inner.fail_spawn {
            inner.fail_spawn = false;
            return Err(ProcessError::SpawnFailed("fake failure".to_string()));
        }
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        inner.exit_txs.insert(config.worker_id.clone(), exit_tx);
        inner.output_txs.insert(config.worker_id.clone(), output_tx);
        inner.alive.insert(config.worker_id, pid);
        Ok(pid)
    }

    async fn send(&self, worker_id: &str, payload: &str) -> Result<(), ProcessError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ProcessCall::Send {
            worker_id: worker_id.to_string(),
            payload: payload.to_string(),
        });
        if !inner.alive.contains_key(worker_id) {
            return Err(ProcessError::NotFound(worker_id.to_string()));
        }
        Ok(())
    }

    async fn signal_graceful(&self, worker_id: &str) -> Result<(), ProcessError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ProcessCall::SignalGraceful {
            worker_id: worker_id.to_string(),
        });
        if !inner.alive.contains_key(worker_id) {
            return Err(ProcessError::NotFound(worker_id.to_string()));
        }
        Ok(())
    }

    async fn signal_forceful(&self, worker_id: &str) -> Result<(), ProcessError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ProcessCall::SignalForceful {
            worker_id: worker_id.to_string(),
        });
        if !inner.alive.contains_key(worker_id) {
            return Err(ProcessError::NotFound(worker_id.to_string()));
        }
        Ok(())
    }

    async fn is_alive(&self, worker_id: &str) -> bool {
        self.inner.lock().alive.contains_key(worker_id)
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
