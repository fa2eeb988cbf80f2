// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordinator (§4.E): host-local Barrier and Election primitives, plus the
//! pure-function task Partitioner.

use crate::event_bus::EventBus;
use orc_core::{
    Barrier, BarrierId, BarrierOutcome, Clock, Election, ElectionId, ElectionResult, Event, IdGen,
    OrcError, PartitionDescriptor, PartitionId, PartitionStrategy,
};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

struct BarrierEntry {
    barrier: Barrier,
    notify: Arc<Notify>,
}

struct ElectionEntry {
    election: Election,
    notify: Arc<Notify>,
}

/// Host-local coordination: barriers, elections, and task partitioning.
pub struct Coordinator<I: IdGen> {
    events: EventBus,
    clock: Arc<dyn Clock>,
    id_gen: I,
    barriers: Mutex<HashMap<BarrierId, BarrierEntry>>,
    elections: Mutex<HashMap<ElectionId, ElectionEntry>>,
}

impl<I: IdGen> Coordinator<I> {
    pub fn new(events: EventBus, clock: Arc<dyn Clock>, id_gen: I) -> Arc<Self> {
        Arc::new(Self {
            events,
            clock,
            id_gen,
            barriers: Mutex::new(HashMap::new()),
            elections: Mutex::new(HashMap::new()),
        })
    }

    /// Create a barrier over `expected` participants. Resolves when every
    /// expected participant has signaled, or on `timeout`.
    ///
    /// The barrier's id is server-generated so in-process callers (tests,
    /// the engine's own actors) never have to invent one. Cross-connection
    /// callers going through the daemon wire protocol use
    /// [`Self::create_named_barrier`] instead, since the id must be known to
    /// every participant before any of them can signal it.
    pub async fn create_barrier(&self, expected: BTreeSet<String>, timeout: Duration) -> BarrierOutcome {
        let id = BarrierId::new(self.id_gen.next());
        self.create_named_barrier(id, expected, timeout).await
    }

    /// Create a barrier under a caller-chosen id, exactly as `expected`
    /// participant names are caller-chosen by convention. Lets a
    /// coordinating script hand the same id to every participant (e.g. via
    /// each worker's spawn task/env) before any of them connects to signal
    /// it — the blocking `create_barrier` call cannot hand the id back in
    /// time for that, since the id was previously only known after the call
    /// returns. Replaces any barrier already registered under `id`.
    pub async fn create_named_barrier(
        &self,
        id: BarrierId,
        expected: BTreeSet<String>,
        timeout: Duration,
    ) -> BarrierOutcome {
        let now = self.clock.epoch_ms();
        let deadline_ms = now + timeout.as_millis() as u64;
        let barrier = Barrier::new(id.clone(), expected, now, deadline_ms);
        let notify = Arc::new(Notify::new());
        self.barriers.lock().insert(
            id.clone(),
            BarrierEntry {
                barrier,
                notify: Arc::clone(&notify),
            },
        );

        let sleep = tokio::time::sleep(timeout);
        tokio::pin!(sleep);
        loop {
            if let Some(outcome) = self.barrier_outcome(&id) {
                return outcome;
            }
            tokio::select! {
                _ = &mut sleep => {
                    return self.expire_barrier(&id);
                }
                _ = notify.notified() => {}
            }
        }
    }

    fn barrier_outcome(&self, id: &BarrierId) -> Option<BarrierOutcome> {
        self.barriers.lock().get(id).and_then(|e| e.barrier.outcome)
    }

    fn expire_barrier(&self, id: &BarrierId) -> BarrierOutcome {
        let participants = {
            let mut barriers = self.barriers.lock();
            let Some(entry) = barriers.get_mut(id) else {
                return BarrierOutcome::Timeout;
            };
            if let Some(outcome) = entry.barrier.outcome {
                return outcome;
            }
            entry.barrier.expire();
            entry.barrier.arrived.iter().cloned().collect::<Vec<_>>()
        };
        self.events.publish(Event::BarrierTimeout {
            id: id.clone(),
            participants,
        });
        BarrierOutcome::Timeout
    }

    /// Record `worker`'s arrival at `id`. Idempotent. Returns whether this
    /// call completed the barrier.
    pub fn signal_barrier(&self, id: &BarrierId, worker: &str) -> Result<bool, OrcError> {
        let (completed, participants) = {
            let mut barriers = self.barriers.lock();
            let entry = barriers
                .get_mut(id)
                .ok_or_else(|| OrcError::NotFound(format!("barrier {id} not found")))?;
            let completed = entry.barrier.signal(worker);
            (completed, entry.barrier.arrived.iter().cloned().collect::<Vec<_>>())
        };

        self.events.publish(Event::BarrierSignal {
            id: id.clone(),
            participants: participants.clone(),
        });

        if completed {
            self.events.publish(Event::BarrierComplete {
                id: id.clone(),
                participants,
            });
            if let Some(entry) = self.barriers.lock().get(id) {
                entry.notify.notify_waiters();
            }
        }

        Ok(completed)
    }

    /// Conduct an election over `candidates`. Resolves early once every
    /// candidate has voted, otherwise on `timeout`.
    ///
    /// See [`Self::create_barrier`]/[`Self::create_named_election`] for why
    /// there are two entry points.
    pub async fn conduct_election(&self, candidates: BTreeSet<String>, timeout: Duration) -> ElectionResult {
        let id = ElectionId::new(self.id_gen.next());
        self.create_named_election(id, candidates, timeout).await
    }

    /// Conduct an election under a caller-chosen id so every candidate can
    /// be told the id up front, the same way [`Self::create_named_barrier`]
    /// works for barriers. Replaces any election already registered under
    /// `id`.
    pub async fn create_named_election(
        &self,
        id: ElectionId,
        candidates: BTreeSet<String>,
        timeout: Duration,
    ) -> ElectionResult {
        let now = self.clock.epoch_ms();
        let deadline_ms = now + timeout.as_millis() as u64;
        let election = Election::new(id.clone(), candidates, now, deadline_ms);
        let notify = Arc::new(Notify::new());
        self.elections.lock().insert(
            id.clone(),
            ElectionEntry {
                election,
                notify: Arc::clone(&notify),
            },
        );
        self.events.publish(Event::ElectionInProgress { id: id.clone() });

        let sleep = tokio::time::sleep(timeout);
        tokio::pin!(sleep);
        loop {
            if let Some(result) = self.election_result(&id) {
                return result;
            }
            tokio::select! {
                _ = &mut sleep => {
                    return self.resolve_election_on_timeout(&id);
                }
                _ = notify.notified() => {}
            }
        }
    }

    fn election_result(&self, id: &ElectionId) -> Option<ElectionResult> {
        self.elections.lock().get(id).and_then(|e| e.election.result.clone())
    }

    fn resolve_election_on_timeout(&self, id: &ElectionId) -> ElectionResult {
        let mut elections = self.elections.lock();
        let Some(entry) = elections.get_mut(id) else {
            return ElectionResult {
                winner: String::new(),
                votes: HashMap::new(),
            };
        };
        if let Some(result) = entry.election.result.clone() {
            return result;
        }
        let result = entry.election.resolve().clone();
        drop(elections);
        self.events.publish(Event::ElectionTimeout { id: id.clone() });
        result
    }

    /// Record one vote. A voter who already voted is rejected. When every
    /// candidate has voted, resolves the election immediately.
    pub fn cast_vote(&self, id: &ElectionId, voter: &str, candidate: &str) -> Result<bool, OrcError> {
        let (resolved, result) = {
            let mut elections = self.elections.lock();
            let entry = elections
                .get_mut(id)
                .ok_or_else(|| OrcError::NotFound(format!("election {id} not found")))?;
            entry
                .election
                .cast_vote(voter, candidate)
                .map_err(OrcError::Conflict)?;
            let candidates = entry.election.candidates.clone();
            if entry.election.all_voted(&candidates) {
                (true, Some(entry.election.resolve().clone()))
            } else {
                (false, None)
            }
        };

        if let Some(result) = result {
            self.events.publish(Event::ElectionCompleted {
                id: id.clone(),
                winner: result.winner,
            });
            if let Some(entry) = self.elections.lock().get(id) {
                entry.notify.notify_waiters();
            }
        }

        Ok(resolved)
    }

    /// Split `task` into `agent_count` partition descriptors (§4.E
    /// Partitioner). `partition_key_field` names the task field hash
    /// partitioning reads; when absent (or the strategy is `round-robin`)
    /// assignment falls back to a stable cyclic order.
    pub fn partition_task(
        &self,
        task: &serde_json::Value,
        agent_count: usize,
        strategy: PartitionStrategy,
        partition_key_field: &str,
    ) -> Vec<PartitionDescriptor> {
        if agent_count == 0 {
            return Vec::new();
        }

        let hash_offset = match strategy {
            PartitionStrategy::RoundRobin => 0,
            PartitionStrategy::Hash => task
                .get(partition_key_field)
                .and_then(|v| v.as_str())
                .map(|key| hash_str(key) as usize % agent_count)
                .unwrap_or(0),
        };

        (0..agent_count)
            .map(|partition_index| {
                let agent_index = (partition_index + hash_offset) % agent_count;
                let mut shard = task.clone();
                if let Some(obj) = shard.as_object_mut() {
                    obj.insert("partitionIndex".to_string(), serde_json::json!(partition_index));
                    obj.insert("totalPartitions".to_string(), serde_json::json!(agent_count));
                }
                PartitionDescriptor {
                    partition_id: PartitionId::new(self.id_gen.next()),
                    agent_index,
                    partition_index,
                    total_partitions: agent_count,
                    task: shard,
                }
            })
            .collect()
    }
}

fn hash_str(s: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    s.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
