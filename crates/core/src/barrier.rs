// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Barrier synchronization over a known, host-local worker set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

crate::define_id! {
    /// Unique identifier for a barrier instance.
    pub struct BarrierId;
}

/// Outcome of a barrier once it resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarrierOutcome {
    Complete,
    Timeout,
}

impl fmt::Display for BarrierOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BarrierOutcome::Complete => write!(f, "complete"),
            BarrierOutcome::Timeout => write!(f, "timeout"),
        }
    }
}

/// A barrier over a known participant set: `expected`, `arrived` (monotone,
/// idempotent signaling), a deadline, and a resolver fired exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Barrier {
    pub id: BarrierId,
    pub expected: BTreeSet<String>,
    pub arrived: BTreeSet<String>,
    pub created_at_ms: u64,
    pub deadline_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<BarrierOutcome>,
}

impl Barrier {
    pub fn new(id: BarrierId, expected: BTreeSet<String>, created_at_ms: u64, deadline_ms: u64) -> Self {
        Self {
            id,
            expected,
            arrived: BTreeSet::new(),
            created_at_ms,
            deadline_ms,
            outcome: None,
        }
    }

    /// Record a participant's arrival. Idempotent: signaling twice leaves
    /// `arrived` unchanged. Returns `true` if this signal completed the
    /// barrier.
    pub fn signal(&mut self, worker: &str) -> bool {
        if self.outcome.is_some() {
            return false;
        }
        self.arrived.insert(worker.to_string());
        if self.is_satisfied() {
            self.outcome = Some(BarrierOutcome::Complete);
            true
        } else {
            false
        }
    }

    pub fn is_satisfied(&self) -> bool {
        self.expected.is_subset(&self.arrived)
    }

    /// Expire the barrier as a timeout if it has not already resolved.
    pub fn expire(&mut self) {
        if self.outcome.is_none() {
            self.outcome = Some(BarrierOutcome::Timeout);
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.outcome.is_some()
    }
}

#[cfg(test)]
#[path = "barrier_tests.rs"]
mod tests;
