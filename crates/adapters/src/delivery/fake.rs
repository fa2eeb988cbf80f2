// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake delivery subscriber for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{DeliveryOutcome, DeliverySubscriber};
use async_trait::async_trait;
use orc_core::{Message, MessageId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct DeliveryCall {
    pub message_id: MessageId,
}

struct FakeDeliveryState {
    calls: Vec<DeliveryCall>,
    outcomes: HashMap<MessageId, DeliveryOutcome>,
    default_outcome: DeliveryOutcome,
}

/// Fake delivery subscriber: returns a per-message outcome if seeded via
/// [`FakeDeliverySubscriber::set_outcome`], otherwise a configurable default
/// (accepted, unless overridden).
#[derive(Clone)]
pub struct FakeDeliverySubscriber {
    inner: Arc<Mutex<FakeDeliveryState>>,
}

impl Default for FakeDeliverySubscriber {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeDeliveryState {
                calls: Vec::new(),
                outcomes: HashMap::new(),
                default_outcome: DeliveryOutcome::Accepted,
            })),
        }
    }
}

impl FakeDeliverySubscriber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<DeliveryCall> {
        self.inner.lock().calls.clone()
    }

    pub fn set_outcome(&self, id: MessageId, outcome: DeliveryOutcome) {
        self.inner.lock().outcomes.insert(id, outcome);
    }

    pub fn set_default_outcome(&self, outcome: DeliveryOutcome) {
        self.inner.lock().default_outcome = outcome;
    }
}

#[async_trait]
impl DeliverySubscriber for FakeDeliverySubscriber {
    async fn deliver(&self, message: &Message) -> DeliveryOutcome {
        let mut inner = self.inner.lock();
        inner.calls.push(DeliveryCall {
            message_id: message.id.clone(),
        });
        inner
            .outcomes
            .get(&message.id)
            .cloned()
            .unwrap_or_else(|| inner.default_outcome.clone())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
