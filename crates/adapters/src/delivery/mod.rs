// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pluggable message delivery: the Message Bus publishes a `send`, and a
//! subscriber reports whether the target accepted it.

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{DeliveryCall, FakeDeliverySubscriber};

use async_trait::async_trait;
use orc_core::Message;

/// Outcome of a single delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The target accepted the write; the bus may still later receive an
    /// out-of-band `mark_failed` if delivery is asynchronous.
    Accepted,
    Rejected(String),
}

/// Receives `send` notifications from the Message Bus drain loop.
///
/// The default production subscriber forwards to the Worker Supervisor's
/// `send`; tests substitute [`FakeDeliverySubscriber`] to control outcomes
/// deterministically.
#[async_trait]
pub trait DeliverySubscriber: Clone + Send + Sync + 'static {
    async fn deliver(&self, message: &Message) -> DeliveryOutcome;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
