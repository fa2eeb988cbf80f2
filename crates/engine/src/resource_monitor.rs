// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource Monitor (§4.C): samples memory and CPU for every live worker
//! process at a fixed cadence, keeps a rolling window, and reports a breach
//! when resident memory exceeds the configured ceiling.

use crate::config::OrchestratorConfig;
use orc_adapters::{ResourceSampler, Sample, SampleError};
use orc_core::{Clock, WorkerId};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::mpsc;

struct Tracked {
    pid: u32,
    started_at_ms: u64,
    samples: VecDeque<Sample>,
}

/// Per-worker statistics derived from the rolling sample window.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WorkerStats {
    pub current_memory_bytes: u64,
    pub peak_memory_bytes: u64,
    /// CPU ticks accumulated between the two most recent samples.
    pub current_cpu_ticks_delta: u64,
    /// Average per-sample CPU tick delta across the window.
    pub avg_cpu_ticks_delta: u64,
    pub uptime_ms: u64,
}

/// Samples every tracked worker on a fixed cadence and reports memory-limit
/// breaches on an unbounded channel for the Supervisor to act on.
pub struct ResourceMonitor<R: ResourceSampler> {
    sampler: R,
    clock: Arc<dyn Clock>,
    sample_window: usize,
    memory_limit_bytes: u64,
    tracked: Mutex<HashMap<WorkerId, Tracked>>,
    breach_tx: mpsc::UnboundedSender<WorkerId>,
}

impl<R: ResourceSampler> ResourceMonitor<R> {
    /// Construct the monitor and spawn its sampling loop. Returns the monitor
    /// handle plus the receiving end of the memory-breach channel.
    pub fn spawn(
        sampler: R,
        clock: Arc<dyn Clock>,
        config: &OrchestratorConfig,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<WorkerId>) {
        let (breach_tx, breach_rx) = mpsc::unbounded_channel();
        let monitor = Arc::new(Self {
            sampler,
            clock,
            sample_window: config.monitor_sample_window,
            memory_limit_bytes: config.memory_limit_bytes,
            tracked: Mutex::new(HashMap::new()),
            breach_tx,
        });

        let handle = Arc::clone(&monitor);
        let interval = config.monitor_sample_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                handle.tick().await;
            }
        });

        (monitor, breach_rx)
    }

    pub fn track(&self, id: WorkerId, pid: u32) {
        let now = self.clock.epoch_ms();
        self.tracked.lock().insert(
            id,
            Tracked {
                pid,
                started_at_ms: now,
                samples: VecDeque::with_capacity(self.sample_window),
            },
        );
    }

    pub fn untrack(&self, id: &WorkerId) {
        self.tracked.lock().remove(id);
    }

    pub fn stats(&self, id: &WorkerId) -> Option<WorkerStats> {
        let tracked = self.tracked.lock();
        let entry = tracked.get(id)?;
        let current = *entry.samples.back()?;
        let peak = entry
            .samples
            .iter()
            .map(|s| s.resident_bytes)
            .max()
            .unwrap_or(current.resident_bytes);
        let deltas: Vec<u64> = entry
            .samples
            .iter()
            .zip(entry.samples.iter().skip(1))
            .map(|(a, b)| b.cpu_ticks.saturating_sub(a.cpu_ticks))
            .collect();
        let current_delta = deltas.last().copied().unwrap_or(0);
        let avg_delta = if deltas.is_empty() {
            0
        } else {
            deltas.iter().sum::<u64>() / deltas.len() as u64
        };
        Some(WorkerStats {
            current_memory_bytes: current.resident_bytes,
            peak_memory_bytes: peak,
            current_cpu_ticks_delta: current_delta,
            avg_cpu_ticks_delta: avg_delta,
            uptime_ms: self.clock.epoch_ms().saturating_sub(entry.started_at_ms),
        })
    }

    async fn tick(&self) {
        let pids: Vec<(WorkerId, u32)> = self
            .tracked
            .lock()
            .iter()
            .map(|(id, t)| (id.clone(), t.pid))
            .collect();

        for (id, pid) in pids {
            match self.sampler.sample(pid).await {
                Ok(sample) => {
                    let breached = {
                        let mut tracked = self.tracked.lock();
                        let Some(entry) = tracked.get_mut(&id) else {
                            continue;
                        };
                        if entry.samples.len() >= self.sample_window {
                            entry.samples.pop_front();
                        }
                        entry.samples.push_back(sample);
                        sample.resident_bytes > self.memory_limit_bytes
                    };
                    if breached {
                        let _ = self.breach_tx.send(id);
                    }
                }
                Err(SampleError::NotFound(_)) => {
                    // The process exited between samples; the exit watcher
                    // owns cleanup of the worker record.
                    self.tracked.lock().remove(&id);
                }
                Err(e) => {
                    tracing::warn!(worker_id = %id, error = %e, "resource sample failed");
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "resource_monitor_tests.rs"]
mod tests;
