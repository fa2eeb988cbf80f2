// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry actor (§4.A): the authoritative worker -> [`Worker`] map, mirrored
//! best-effort to disk via [`orc_storage::RegistryStore`].
//!
//! Writes are serialized behind a single-writer lock ([`parking_lot::Mutex`]);
//! every mutation sets a dirty flag and fires off a background persistence
//! task rather than blocking the caller on disk I/O. In-memory state is
//! always authoritative — a failed or slow persist never fails the
//! triggering operation (§4.A Failure).

use crate::event_bus::EventBus;
use orc_core::{Clock, Event, TerminationReason, Worker, WorkerId, WorkerStatus};
use orc_storage::RegistryStore;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type SharedStore = Arc<RegistryStore>;

struct Inner {
    workers: HashMap<WorkerId, Worker>,
}

/// A non-status field patch applied by [`Registry::update`].
#[derive(Debug, Clone, Default)]
pub struct WorkerPatch {
    pub status: Option<WorkerStatus>,
    pub pid: Option<u32>,
    pub started_at_ms: Option<u64>,
    pub completed_at_ms: Option<u64>,
    pub error: Option<String>,
    pub termination_reason: Option<TerminationReason>,
}

/// The Registry actor: owns the canonical worker map and mirrors it to disk.
pub struct Registry {
    inner: Arc<Mutex<Inner>>,
    store: SharedStore,
    events: EventBus,
    clock: Arc<dyn Clock>,
    dirty: Arc<AtomicBool>,
    prune_ceiling: usize,
    prune_age_ms: u64,
}

impl Registry {
    /// Load the registry mirror from disk (an empty map on a missing or
    /// corrupt file) and construct the actor around it.
    pub fn load(
        store: RegistryStore,
        events: EventBus,
        clock: Arc<dyn Clock>,
        prune_ceiling: usize,
        prune_age_ms: u64,
    ) -> Result<Self, orc_storage::AtomicIoError> {
        let workers = store.load()?;
        Ok(Self {
            inner: Arc::new(Mutex::new(Inner { workers })),
            store: Arc::new(store),
            events,
            clock,
            dirty: Arc::new(AtomicBool::new(false)),
            prune_ceiling,
            prune_age_ms,
        })
    }

    /// Insert or replace a worker record. Replacing with a different status
    /// also emits a status-transition event in addition to the insert event.
    pub fn register(&self, worker: Worker) {
        let id = worker.id.clone();
        let transition = {
            let mut inner = self.inner.lock();
            let previous_status = inner.workers.get(&id).map(|w| w.status);
            inner.workers.insert(id.clone(), worker.clone());
            previous_status.filter(|old| *old != worker.status)
        };

        self.mark_dirty();
        self.events.publish(Event::WorkerRegistered { id: id.clone() });
        if let Some(old_status) = transition {
            self.events.publish(Event::WorkerStatusChanged {
                id,
                old_status,
                new_status: worker.status,
            });
        }
        self.maybe_prune();
    }

    /// Merge a patch into an existing record. Returns `false` if the id is
    /// unknown. Rejects non-positive timestamps by leaving them unset.
    pub fn update(&self, id: &WorkerId, patch: WorkerPatch) -> bool {
        let transition = {
            let mut inner = self.inner.lock();
            let Some(worker) = inner.workers.get_mut(id) else {
                return false;
            };
            let old_status = worker.status;
            if let Some(status) = patch.status {
                worker.status = status;
            }
            if let Some(pid) = patch.pid {
                worker.pid = Some(pid);
            }
            if let Some(ts) = patch.started_at_ms.filter(|ts| *ts > 0) {
                worker.started_at_ms = Some(ts);
            }
            if let Some(ts) = patch.completed_at_ms.filter(|ts| *ts > 0) {
                worker.completed_at_ms = Some(ts);
            }
            if let Some(error) = patch.error {
                worker.error = Some(error);
            }
            if let Some(reason) = patch.termination_reason {
                worker.termination_reason = Some(reason);
            }
            (old_status != worker.status).then_some((old_status, worker.status))
        };

        self.mark_dirty();
        self.events.publish(Event::WorkerUpdated { id: id.clone() });
        if let Some((old_status, new_status)) = transition {
            self.events.publish(Event::WorkerStatusChanged {
                id: id.clone(),
                old_status,
                new_status,
            });
        }
        true
    }

    /// Remove a worker record. Returns `false` if the id was unknown.
    pub fn unregister(&self, id: &WorkerId) -> bool {
        let removed = self.inner.lock().workers.remove(id).is_some();
        if removed {
            self.mark_dirty();
            self.events.publish(Event::WorkerUnregistered { id: id.clone() });
        }
        removed
    }

    pub fn get(&self, id: &WorkerId) -> Option<Worker> {
        self.inner.lock().workers.get(id).cloned()
    }

    pub fn count(&self) -> usize {
        self.inner.lock().workers.len()
    }

    pub fn by_status(&self, status: WorkerStatus) -> Vec<Worker> {
        self.inner
            .lock()
            .workers
            .values()
            .filter(|w| w.status == status)
            .cloned()
            .collect()
    }

    pub fn by_branch(&self, branch: &str) -> Vec<Worker> {
        self.inner
            .lock()
            .workers
            .values()
            .filter(|w| w.branch == branch)
            .cloned()
            .collect()
    }

    /// Workers whose worktree path starts with `prefix`, so nested paths
    /// (a subdirectory checked out inside another worker's tree) match too.
    pub fn by_worktree_prefix(&self, prefix: &std::path::Path) -> Vec<Worker> {
        self.inner
            .lock()
            .workers
            .values()
            .filter(|w| w.worktree_path.starts_with(prefix))
            .cloned()
            .collect()
    }

    pub fn by_project(&self, project: &std::path::Path) -> Vec<Worker> {
        self.inner
            .lock()
            .workers
            .values()
            .filter(|w| w.project == project)
            .cloned()
            .collect()
    }

    /// Snapshot the whole map, e.g. for the Message Bus's broadcast helper.
    pub fn snapshot(&self) -> HashMap<WorkerId, Worker> {
        self.inner.lock().workers.clone()
    }

    /// Persist the current state synchronously. Errors are logged, never
    /// propagated, per §4.A's best-effort durability contract.
    pub fn persist_now(&self) {
        let snapshot = self.inner.lock().workers.clone();
        if let Err(e) = self.store.save(&snapshot) {
            tracing::warn!(error = %e, "registry persistence failed");
        } else {
            self.dirty.store(false, Ordering::SeqCst);
        }
    }

    /// Flag the map dirty and fire a background persist. Spawning requires a
    /// live Tokio runtime, which every production caller (and `#[tokio::test]`)
    /// provides; outside one this degrades to a synchronous save.
    fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::SeqCst);
        let inner = Arc::clone(&self.inner);
        let store = Arc::clone(&self.store);
        let dirty = Arc::clone(&self.dirty);
        let persist = move || {
            let snapshot = inner.lock().workers.clone();
            if let Err(e) = store.save(&snapshot) {
                tracing::warn!(error = %e, "registry persistence failed");
            } else {
                dirty.store(false, Ordering::SeqCst);
            }
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(persist);
            }
            Err(_) => persist(),
        }
    }

    /// Drop terminal records older than the configured age once the map
    /// reaches the prune ceiling (§4.A automatic pruning).
    fn maybe_prune(&self) {
        let mut inner = self.inner.lock();
        if inner.workers.len() < self.prune_ceiling {
            return;
        }
        let now_ms = self.clock.epoch_ms();
        let cutoff = now_ms.saturating_sub(self.prune_age_ms);
        inner.workers.retain(|_, w| {
            if !w.status.is_terminal() {
                return true;
            }
            let completed_at = w.completed_at_ms.unwrap_or(now_ms);
            completed_at > cutoff
        });
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
