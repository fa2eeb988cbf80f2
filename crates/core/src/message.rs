// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable per-worker messages, priority, and delivery status.

use crate::worker::WorkerId;
use serde::{Deserialize, Serialize};
use std::fmt;

crate::define_id! {
    /// Unique identifier for a message instance.
    pub struct MessageId;
}

/// Bounded capacity of a single (worker, worktree) queue (§5).
pub const QUEUE_CAPACITY: usize = 1000;

/// Maximum delivery attempts before a message is marked `failed` (§5).
pub const MAX_RETRIES: u32 = 3;

/// Base retry backoff in milliseconds; doubles per attempt (§4.D).
pub const RETRY_BASE_MS: u64 = 1000;

/// Delivery priority, lowest value delivered first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical = 0,
    High = 1,
    Normal = 2,
    Low = 3,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Critical => write!(f, "critical"),
            Priority::High => write!(f, "high"),
            Priority::Normal => write!(f, "normal"),
            Priority::Low => write!(f, "low"),
        }
    }
}

/// Delivery status of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Pending,
    Delivered,
    Failed,
    Retrying,
}

impl MessageStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MessageStatus::Delivered | MessageStatus::Failed)
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageStatus::Pending => write!(f, "pending"),
            MessageStatus::Delivered => write!(f, "delivered"),
            MessageStatus::Failed => write!(f, "failed"),
            MessageStatus::Retrying => write!(f, "retrying"),
        }
    }
}

/// A durable, at-least-once message between workers (or orchestrator <-> worker).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<WorkerId>,
    pub target: WorkerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worktree: Option<String>,
    pub payload: serde_json::Value,
    pub priority: Priority,
    pub status: MessageStatus,
    #[serde(default)]
    pub retry_count: u32,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Message {
    /// Construct a new pending message. The id is generated by the caller
    /// (via `IdGen`) so that message creation remains a pure function of its
    /// arguments plus that id.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: MessageId,
        kind: impl Into<String>,
        source: Option<WorkerId>,
        target: WorkerId,
        worktree: Option<String>,
        payload: serde_json::Value,
        priority: Priority,
        created_at_ms: u64,
    ) -> Self {
        Self {
            id,
            kind: kind.into(),
            source,
            target,
            worktree,
            payload,
            priority,
            status: MessageStatus::Pending,
            retry_count: 0,
            created_at_ms,
            delivered_at_ms: None,
            failed_at_ms: None,
            error: None,
            timeout_ms: None,
            metadata: None,
        }
    }

    /// The queue key this message belongs in: `(worktree-or-"default", target)`.
    pub fn queue_key(&self) -> (String, WorkerId) {
        (
            self.worktree.clone().unwrap_or_else(|| "default".to_string()),
            self.target.clone(),
        )
    }

    pub fn mark_delivered(&mut self, now_ms: u64) {
        self.status = MessageStatus::Delivered;
        self.delivered_at_ms = Some(now_ms);
    }

    pub fn mark_retrying(&mut self) {
        self.retry_count += 1;
        self.status = MessageStatus::Retrying;
    }

    pub fn mark_pending_again(&mut self) {
        self.status = MessageStatus::Pending;
    }

    pub fn mark_failed(&mut self, error: impl Into<String>, now_ms: u64) {
        self.status = MessageStatus::Failed;
        self.error = Some(error.into());
        self.failed_at_ms = Some(now_ms);
    }

    /// Backoff before the next retry attempt: `1000ms * 2^retry_count`.
    pub fn backoff_ms(&self) -> u64 {
        RETRY_BASE_MS.saturating_mul(1u64 << self.retry_count.min(16))
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
