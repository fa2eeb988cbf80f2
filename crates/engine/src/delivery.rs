// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The production [`DeliverySubscriber`]: forwards Message Bus deliveries to
//! the Worker Supervisor's child-process stream.

use crate::supervisor::WorkerSupervisor;
use async_trait::async_trait;
use orc_adapters::{DeliveryOutcome, DeliverySubscriber, ProcessAdapter, ResourceSampler, VcsAdapter};
use orc_core::{IdGen, Message};
use std::sync::Arc;

/// Delivers a message by serializing its payload and writing it to the
/// target worker's stdin via the supervisor. A delivery is accepted if the
/// stream accepts the write; anything else is reported as a rejection so the
/// Message Bus can retry or fail it per the usual backoff schedule.
pub struct SupervisorDelivery<V, P, R, I>
where
    V: VcsAdapter,
    P: ProcessAdapter,
    R: ResourceSampler,
    I: IdGen,
{
    supervisor: Arc<WorkerSupervisor<V, P, R, I>>,
}

impl<V, P, R, I> SupervisorDelivery<V, P, R, I>
where
    V: VcsAdapter,
    P: ProcessAdapter,
    R: ResourceSampler,
    I: IdGen,
{
    pub fn new(supervisor: Arc<WorkerSupervisor<V, P, R, I>>) -> Self {
        Self { supervisor }
    }
}

impl<V, P, R, I> Clone for SupervisorDelivery<V, P, R, I>
where
    V: VcsAdapter,
    P: ProcessAdapter,
    R: ResourceSampler,
    I: IdGen,
{
    fn clone(&self) -> Self {
        Self {
            supervisor: Arc::clone(&self.supervisor),
        }
    }
}

#[async_trait]
impl<V, P, R, I> DeliverySubscriber for SupervisorDelivery<V, P, R, I>
where
    V: VcsAdapter,
    P: ProcessAdapter,
    R: ResourceSampler,
    I: IdGen,
{
    async fn deliver(&self, message: &Message) -> DeliveryOutcome {
        let payload = match serde_json::to_string(&message.payload) {
            Ok(payload) => payload,
            Err(e) => return DeliveryOutcome::Rejected(format!("payload encoding failed: {e}")),
        };
        match self.supervisor.send(&message.target, &payload).await {
            Ok(()) => DeliveryOutcome::Accepted,
            Err(e) => DeliveryOutcome::Rejected(e.to_string()),
        }
    }
}

#[cfg(test)]
#[path = "delivery_tests.rs"]
mod tests;
