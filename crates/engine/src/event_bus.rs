// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local Event Bus: every engine component publishes [`Event`]s here; the
//! Transport Surface and the Coordinator's barrier/election primitives
//! subscribe to observe them.

use orc_core::Event;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 1024;

/// A single `tokio::sync::broadcast` channel shared by every component.
///
/// Cloning an [`EventBus`] shares the same underlying channel; publishing
/// from a lagging subscriber's perspective may drop the oldest events, which
/// is acceptable here since persisted state (Registry, Message Bus,
/// Consolidation store) remains the source of truth.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn publish(&self, event: Event) {
        // No receivers is a normal state (e.g. no one subscribed yet); the
        // send error just means the event reached zero subscribers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "event_bus_tests.rs"]
mod tests;
