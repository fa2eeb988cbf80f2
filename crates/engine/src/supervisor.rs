// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker Supervisor (§4.B): the isolation engine. Reserves a capacity slot,
//! creates an isolated working copy, spawns the child process inside it, and
//! owns the process handle for the worker's lifetime.

use crate::config::OrchestratorConfig;
use crate::event_bus::EventBus;
use crate::registry::{Registry, WorkerPatch};
use crate::resource_monitor::ResourceMonitor;
use orc_adapters::{
    ExitStatus, OutputLine, ProcessAdapter, ProcessSpawnConfig, ResourceSampler, VcsAdapter,
};
use orc_core::{
    Clock, Event, IdGen, OrcError, SpawnRequest, TerminationReason, Worker, WorkerId, WorkerStatus,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;

const DEFAULT_COMMAND: &str = "agent";
const WORKTREE_DIR_NAME: &str = ".worktrees";
const OUTPUT_CHANNEL_CAPACITY: usize = 256;
const TERMINATE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// One buffered stdio line (§4.B log buffer).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LogLine {
    pub stream: LogStream,
    pub data: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStream {
    Stdout,
    Stderr,
}

/// Supervises the full lifecycle of worker processes: spawn, messaging,
/// and graceful-then-forceful termination.
pub struct WorkerSupervisor<V, P, R, I>
where
    V: VcsAdapter,
    P: ProcessAdapter,
    R: ResourceSampler,
    I: IdGen,
{
    registry: Arc<Registry>,
    events: EventBus,
    vcs: V,
    process: P,
    monitor: Arc<ResourceMonitor<R>>,
    clock: Arc<dyn Clock>,
    id_gen: I,
    config: OrchestratorConfig,
    timers: AsyncMutex<std::collections::HashMap<WorkerId, JoinHandle<()>>>,
    logs: Mutex<std::collections::HashMap<WorkerId, VecDeque<LogLine>>>,
}

impl<V, P, R, I> WorkerSupervisor<V, P, R, I>
where
    V: VcsAdapter,
    P: ProcessAdapter,
    R: ResourceSampler,
    I: IdGen,
{
    pub fn new(
        registry: Arc<Registry>,
        events: EventBus,
        vcs: V,
        process: P,
        monitor: Arc<ResourceMonitor<R>>,
        clock: Arc<dyn Clock>,
        id_gen: I,
        config: OrchestratorConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry,
            events,
            vcs,
            process,
            monitor,
            clock,
            id_gen,
            config,
            timers: AsyncMutex::new(std::collections::HashMap::new()),
            logs: Mutex::new(std::collections::HashMap::new()),
        })
    }

    /// Reserve a capacity slot, create the working copy, and launch the
    /// child process inside it (§4.B Spawn contract).
    pub async fn spawn(self: &Arc<Self>, request: SpawnRequest) -> Result<WorkerId, OrcError> {
        let active = self
            .registry
            .snapshot()
            .values()
            .filter(|w| !w.status.is_terminal())
            .count() as u64;
        if active >= self.config.max_active_workers {
            return Err(OrcError::CapacityExceeded(format!(
                "max active workers ({}) reached",
                self.config.max_active_workers
            )));
        }

        let id = WorkerId::new(self.id_gen.next());
        let branch = request
            .branch
            .clone()
            .unwrap_or_else(|| Worker::default_branch(&request.name, &id));
        let worktree_path = request.project.join(WORKTREE_DIR_NAME).join(id.as_str());

        self.events.publish(Event::WorkerSpawning {
            id: id.clone(),
            name: request.name.clone(),
            worktree_path: worktree_path.clone(),
        });

        if let Err(e) = self
            .vcs
            .create_worktree(&request.project, &worktree_path, &branch, &request.base_revision)
            .await
        {
            self.events.publish(Event::WorkerSpawnFailed {
                id: Some(id.clone()),
                error: e.to_string(),
            });
            return Err(OrcError::VcsFailure(e.to_string()));
        }

        let now = self.clock.epoch_ms();
        let mut worker = Worker::new(id.clone(), &request, branch, worktree_path.clone(), now);
        worker.status = WorkerStatus::Active;
        worker.started_at_ms = Some(now);
        self.registry.register(worker);

        let spawn_config = ProcessSpawnConfig {
            worker_id: id.as_str().to_string(),
            command: request.command.clone().unwrap_or_else(|| DEFAULT_COMMAND.to_string()),
            args: request.args.clone(),
            cwd: worktree_path.clone(),
            env: request.env.clone(),
        };

        let (output_tx, output_rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
        let (exit_tx, exit_rx) = mpsc::channel(1);

        match self.process.spawn(spawn_config, output_tx, exit_tx).await {
            Ok(pid) => {
                self.registry.update(
                    &id,
                    WorkerPatch {
                        pid: Some(pid),
                        ..Default::default()
                    },
                );
                self.monitor.track(id.clone(), pid);
                self.spawn_output_watcher(id.clone(), output_rx);
                self.spawn_exit_watcher(id.clone(), exit_rx);
                self.arm_wall_clock_timer(id.clone()).await;
                self.events.publish(Event::WorkerSpawned {
                    id: id.clone(),
                    pid,
                    worktree_path,
                });
                Ok(id)
            }
            Err(e) => {
                let now = self.clock.epoch_ms();
                self.registry.update(
                    &id,
                    WorkerPatch {
                        status: Some(WorkerStatus::Failed),
                        completed_at_ms: Some(now),
                        error: Some(e.to_string()),
                        ..Default::default()
                    },
                );
                let _ = self.vcs.remove_worktree(&request.project, &worktree_path).await;
                self.events.publish(Event::WorkerSpawnFailed {
                    id: Some(id.clone()),
                    error: e.to_string(),
                });
                Err(OrcError::SpawnFailure(e.to_string()))
            }
        }
    }

    /// Write a message payload to the worker's stdin.
    pub async fn send(&self, id: &WorkerId, payload: &str) -> Result<(), OrcError> {
        self.process
            .send(id.as_str(), payload)
            .await
            .map_err(|e| OrcError::DeliveryFailure(e.to_string()))
    }

    /// Terminate a worker: signal gracefully, escalate to forceful after the
    /// configured grace period, then remove its working copy (§4.B
    /// Termination procedure). Idempotent on an already-terminal worker.
    pub async fn terminate(self: &Arc<Self>, id: &WorkerId, reason: TerminationReason) -> Result<(), OrcError> {
        let Some(worker) = self.registry.get(id) else {
            return Err(OrcError::NotFound(format!("worker {id} not found")));
        };
        if worker.status.is_terminal() {
            return Ok(());
        }

        if let Some(handle) = self.timers.lock().await.remove(id) {
            handle.abort();
        }

        self.registry.update(
            id,
            WorkerPatch {
                status: Some(WorkerStatus::Terminating),
                termination_reason: Some(reason),
                ..Default::default()
            },
        );
        self.events.publish(Event::WorkerTerminating {
            id: id.clone(),
            reason,
        });

        if let Err(e) = self.process.signal_graceful(id.as_str()).await {
            tracing::warn!(worker_id = %id, error = %e, "graceful signal failed");
        }
        self.wait_or_escalate(id).await;

        self.monitor.untrack(id);
        if let Err(e) = self.vcs.remove_worktree(&worker.project, &worker.worktree_path).await {
            tracing::warn!(worker_id = %id, error = %e, "worktree removal failed");
        }
        Ok(())
    }

    async fn wait_or_escalate(&self, id: &WorkerId) {
        let mut waited = Duration::ZERO;
        while waited < self.config.termination_grace_period {
            if !self.process.is_alive(id.as_str()).await {
                return;
            }
            tokio::time::sleep(TERMINATE_POLL_INTERVAL).await;
            waited += TERMINATE_POLL_INTERVAL;
        }

        if !self.process.is_alive(id.as_str()).await {
            return;
        }
        if let Err(e) = self.process.signal_forceful(id.as_str()).await {
            tracing::warn!(worker_id = %id, error = %e, "forceful signal failed");
        }
        for _ in 0..20 {
            if !self.process.is_alive(id.as_str()).await {
                return;
            }
            tokio::time::sleep(TERMINATE_POLL_INTERVAL).await;
        }
    }

    async fn arm_wall_clock_timer(self: &Arc<Self>, id: WorkerId) {
        let this = Arc::clone(self);
        let limit = self.config.worker_wall_clock_limit;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(limit).await;
            if let Some(worker) = this.registry.get(&id) {
                if !worker.status.is_terminal() {
                    let _ = this.terminate(&id, TerminationReason::Timeout).await;
                }
            }
        });
        self.timers.lock().await.insert(id, handle);
    }

    fn spawn_output_watcher(self: &Arc<Self>, id: WorkerId, mut output_rx: mpsc::Receiver<OutputLine>) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(line) = output_rx.recv().await {
                let (event, log_line) = match line {
                    OutputLine::Stdout(data) => (
                        Event::WorkerStdout { id: id.clone(), data: data.clone() },
                        LogLine { stream: LogStream::Stdout, data },
                    ),
                    OutputLine::Stderr(data) => (
                        Event::WorkerStderr { id: id.clone(), data: data.clone() },
                        LogLine { stream: LogStream::Stderr, data },
                    ),
                };
                this.push_log(&id, log_line);
                this.events.publish(event);
            }
        });
    }

    fn push_log(&self, id: &WorkerId, line: LogLine) {
        let mut logs = self.logs.lock();
        let buffer = logs.entry(id.clone()).or_default();
        buffer.push_back(line);
        while buffer.len() > self.config.log_buffer_capacity {
            buffer.pop_front();
        }
    }

    /// Buffered stdio for `id`, paged by `offset`/`count` (§6 log paging).
    pub fn logs(&self, id: &WorkerId, offset: usize, count: usize) -> Vec<LogLine> {
        let logs = self.logs.lock();
        let Some(buffer) = logs.get(id) else {
            return Vec::new();
        };
        buffer.iter().skip(offset).take(count).cloned().collect()
    }

    fn spawn_exit_watcher(self: &Arc<Self>, id: WorkerId, mut exit_rx: mpsc::Receiver<ExitStatus>) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let Some(exit) = exit_rx.recv().await else {
                return;
            };

            if let Some(handle) = this.timers.lock().await.remove(&id) {
                handle.abort();
            }
            this.monitor.untrack(&id);

            let now = this.clock.epoch_ms();
            if exit.success() {
                this.registry.update(
                    &id,
                    WorkerPatch {
                        status: Some(WorkerStatus::Completed),
                        completed_at_ms: Some(now),
                        ..Default::default()
                    },
                );
            } else {
                let error = format!("exit code={:?} signal={:?}", exit.code, exit.signal);
                this.registry.update(
                    &id,
                    WorkerPatch {
                        status: Some(WorkerStatus::Failed),
                        completed_at_ms: Some(now),
                        error: Some(error),
                        ..Default::default()
                    },
                );
            }
            this.events.publish(Event::WorkerExit {
                id,
                exit_code: exit.code,
                exit_signal: exit.signal,
            });
        });
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
