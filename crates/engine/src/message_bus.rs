// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message Bus (§4.D): durable, priority-ordered delivery between workers
//! (or orchestrator -> worker), with bounded per-queue capacity and bounded
//! retry with exponential backoff.

use crate::config::OrchestratorConfig;
use crate::event_bus::EventBus;
use crate::registry::Registry;
use orc_adapters::{DeliveryOutcome, DeliverySubscriber};
use orc_core::{Clock, Event, IdGen, Message, MessageId, MessageStatus, OrcError, Priority, WorkerId};
use orc_storage::MessageStore;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Notify;

/// Queue occupancy broken down for reporting (§4.D queue reporting).
#[derive(Debug, Clone, Default)]
pub struct QueueStats {
    pub total: usize,
    pub by_status: HashMap<MessageStatus, usize>,
    pub by_kind: HashMap<String, usize>,
}

type QueueKey = (String, WorkerId);

/// The Message Bus: one priority queue per (worktree, target) pair, drained
/// by a single background loop that attempts delivery and retries with
/// exponential backoff before giving up.
pub struct MessageBus<D, I>
where
    D: DeliverySubscriber,
    I: IdGen,
{
    store: Arc<MessageStore>,
    events: EventBus,
    registry: Arc<Registry>,
    clock: Arc<dyn Clock>,
    delivery: D,
    id_gen: I,
    capacity: usize,
    max_retries: u32,
    queues: Mutex<HashMap<QueueKey, VecDeque<Message>>>,
    notify: Notify,
}

impl<D, I> MessageBus<D, I>
where
    D: DeliverySubscriber,
    I: IdGen,
{
    /// Rehydrate pending/retrying messages from disk and start the drain
    /// loop.
    pub fn spawn(
        store: MessageStore,
        events: EventBus,
        registry: Arc<Registry>,
        clock: Arc<dyn Clock>,
        delivery: D,
        id_gen: I,
        config: &OrchestratorConfig,
    ) -> Arc<Self> {
        let mut queues: HashMap<QueueKey, VecDeque<Message>> = HashMap::new();
        let mut rehydrated = store.load_all().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "message rehydration failed, starting with empty queues");
            Vec::new()
        });
        rehydrated.sort_by_key(|m| m.created_at_ms);
        for message in rehydrated {
            let key = message.queue_key();
            insert_sorted(queues.entry(key).or_default(), message);
        }

        let bus = Arc::new(Self {
            store: Arc::new(store),
            events,
            registry,
            clock,
            delivery,
            id_gen,
            capacity: config.message_queue_capacity,
            max_retries: config.message_max_retries,
            queues: Mutex::new(queues),
            notify: Notify::new(),
        });

        let handle = Arc::clone(&bus);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_millis(200));
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = handle.notify.notified() => {}
                }
                handle.drain_once().await;
            }
        });

        bus
    }

    /// Enqueue a message bound for a single target.
    #[allow(clippy::too_many_arguments)]
    pub fn send(
        &self,
        kind: impl Into<String>,
        source: Option<WorkerId>,
        target: WorkerId,
        worktree: Option<String>,
        payload: serde_json::Value,
        priority: Priority,
    ) -> Result<MessageId, OrcError> {
        let id = MessageId::new(self.id_gen.next());
        let now = self.clock.epoch_ms();
        let message = Message::new(id.clone(), kind, source, target, worktree, payload, priority, now);
        self.enqueue(message)?;
        Ok(id)
    }

    /// Enqueue one message per live, non-excluded worker (§4.D broadcast).
    #[allow(clippy::too_many_arguments)]
    pub fn broadcast(
        &self,
        kind: impl Into<String>,
        source: Option<WorkerId>,
        worktree: Option<String>,
        payload: serde_json::Value,
        priority: Priority,
        exclude: &[WorkerId],
    ) -> Result<Vec<MessageId>, OrcError> {
        let kind = kind.into();
        let targets: Vec<WorkerId> = self
            .registry
            .snapshot()
            .into_values()
            .filter(|w| !w.status.is_terminal())
            .map(|w| w.id)
            .filter(|id| !exclude.contains(id))
            .collect();

        let mut ids = Vec::with_capacity(targets.len());
        for target in targets {
            ids.push(self.send(
                kind.clone(),
                source.clone(),
                target,
                worktree.clone(),
                payload.clone(),
                priority,
            )?);
        }
        Ok(ids)
    }

    fn enqueue(&self, message: Message) -> Result<(), OrcError> {
        let key = message.queue_key();
        {
            let mut queues = self.queues.lock();
            let queue = queues.entry(key).or_default();
            if queue.len() >= self.capacity {
                return Err(OrcError::CapacityExceeded(format!(
                    "message queue for {} is at capacity ({})",
                    message.target, self.capacity
                )));
            }
            if let Err(e) = self.store.save(&message) {
                tracing::warn!(error = %e, "message persistence failed");
            }
            self.events.publish(Event::MessageQueued {
                message: message.clone(),
            });
            insert_sorted(queue, message);
        }
        self.notify.notify_one();
        Ok(())
    }

    /// One pass over every queue: attempt delivery of each head message.
    /// Returns whether any queue had a message to act on.
    async fn drain_once(self: &Arc<Self>) -> bool {
        let keys: Vec<QueueKey> = self.queues.lock().keys().cloned().collect();
        let mut progressed = false;

        for key in keys {
            let head = {
                let mut queues = self.queues.lock();
                let Some(queue) = queues.get_mut(&key) else {
                    continue;
                };
                queue.pop_front()
            };
            let Some(mut message) = head else {
                continue;
            };
            progressed = true;

            self.events.publish(Event::MessageDelivering {
                message: message.clone(),
            });

            match self.delivery.deliver(&message).await {
                DeliveryOutcome::Accepted => {
                    let now = self.clock.epoch_ms();
                    message.mark_delivered(now);
                    self.persist_or_warn(&message);
                    if let Err(e) = self.store.remove(&message.id) {
                        tracing::warn!(error = %e, "message removal failed");
                    }
                    self.events.publish(Event::MessageDelivered { message });
                }
                DeliveryOutcome::Rejected(reason) => {
                    if message.retry_count + 1 >= self.max_retries {
                        let now = self.clock.epoch_ms();
                        message.mark_failed(reason, now);
                        self.persist_or_warn(&message);
                        if let Err(e) = self.store.remove(&message.id) {
                            tracing::warn!(error = %e, "message removal failed");
                        }
                        self.events.publish(Event::MessageFailed { message });
                    } else {
                        message.mark_retrying();
                        self.persist_or_warn(&message);
                        self.schedule_retry(message);
                    }
                }
            }
        }

        progressed
    }

    fn schedule_retry(self: &Arc<Self>, message: Message) {
        let backoff = std::time::Duration::from_millis(message.backoff_ms());
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(backoff).await;
            let mut message = message;
            message.mark_pending_again();
            this.persist_or_warn(&message);
            let key = message.queue_key();
            {
                let mut queues = this.queues.lock();
                insert_sorted(queues.entry(key).or_default(), message);
            }
            this.notify.notify_one();
        });
    }

    fn persist_or_warn(&self, message: &Message) {
        if let Err(e) = self.store.save(message) {
            tracing::warn!(error = %e, message_id = %message.id, "message persistence failed");
        }
    }

    /// Occupancy across every queue.
    pub fn queue_stats(&self) -> QueueStats {
        let mut stats = QueueStats::default();
        for queue in self.queues.lock().values() {
            for message in queue {
                stats.total += 1;
                *stats.by_status.entry(message.status).or_insert(0) += 1;
                *stats.by_kind.entry(message.kind.clone()).or_insert(0) += 1;
            }
        }
        stats
    }

    /// Occupancy across queues addressed to a single worker.
    pub fn queue_stats_for(&self, target: &WorkerId) -> QueueStats {
        let mut stats = QueueStats::default();
        for (key, queue) in self.queues.lock().iter() {
            if &key.1 != target {
                continue;
            }
            for message in queue {
                stats.total += 1;
                *stats.by_status.entry(message.status).or_insert(0) += 1;
                *stats.by_kind.entry(message.kind.clone()).or_insert(0) += 1;
            }
        }
        stats
    }
}

fn insert_sorted(queue: &mut VecDeque<Message>, message: Message) {
    let position = queue
        .iter()
        .position(|existing| existing.priority > message.priority)
        .unwrap_or(queue.len());
    queue.insert(position, message);
}

#[cfg(test)]
#[path = "message_bus_tests.rs"]
mod tests;
