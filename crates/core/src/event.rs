// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed events published on the local Event Bus and streamed to subscribers.
//!
//! Serializes with `{"type": "worker:spawned", ...fields}` shape. Unknown
//! type tags deserialize to `Custom` for forward compatibility.

use crate::barrier::BarrierId;
use crate::consolidation::ConsolidationId;
use crate::election::ElectionId;
use crate::message::{Message, Priority};
use crate::worker::{TerminationReason, WorkerId, WorkerStatus};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "worker:registered")]
    WorkerRegistered { id: WorkerId },

    #[serde(rename = "worker:updated")]
    WorkerUpdated { id: WorkerId },

    #[serde(rename = "worker:unregistered")]
    WorkerUnregistered { id: WorkerId },

    #[serde(rename = "worker:spawning")]
    WorkerSpawning {
        id: WorkerId,
        name: String,
        worktree_path: PathBuf,
    },

    #[serde(rename = "worker:spawned")]
    WorkerSpawned {
        id: WorkerId,
        pid: u32,
        worktree_path: PathBuf,
    },

    #[serde(rename = "worker:spawn_failed")]
    WorkerSpawnFailed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<WorkerId>,
        error: String,
    },

    #[serde(rename = "worker:status_changed")]
    WorkerStatusChanged {
        id: WorkerId,
        old_status: WorkerStatus,
        new_status: WorkerStatus,
    },

    #[serde(rename = "worker:exit")]
    WorkerExit {
        id: WorkerId,
        exit_code: Option<i32>,
        exit_signal: Option<i32>,
    },

    #[serde(rename = "worker:stdout")]
    WorkerStdout { id: WorkerId, data: String },

    #[serde(rename = "worker:stderr")]
    WorkerStderr { id: WorkerId, data: String },

    #[serde(rename = "worker:terminating")]
    WorkerTerminating {
        id: WorkerId,
        reason: TerminationReason,
    },

    #[serde(rename = "worker:error")]
    WorkerError { id: WorkerId, error: String },

    #[serde(rename = "message:queued")]
    MessageQueued { message: Message },

    #[serde(rename = "message:delivering")]
    MessageDelivering { message: Message },

    #[serde(rename = "message:delivered")]
    MessageDelivered { message: Message },

    #[serde(rename = "message:failed")]
    MessageFailed { message: Message },

    #[serde(rename = "barrier:signal")]
    BarrierSignal {
        id: BarrierId,
        participants: Vec<String>,
    },

    #[serde(rename = "barrier:complete")]
    BarrierComplete {
        id: BarrierId,
        participants: Vec<String>,
    },

    #[serde(rename = "barrier:timeout")]
    BarrierTimeout {
        id: BarrierId,
        participants: Vec<String>,
    },

    #[serde(rename = "election:in_progress")]
    ElectionInProgress { id: ElectionId },

    #[serde(rename = "election:completed")]
    ElectionCompleted { id: ElectionId, winner: String },

    #[serde(rename = "election:timeout")]
    ElectionTimeout { id: ElectionId },

    #[serde(rename = "consolidation:analyzing")]
    ConsolidationAnalyzing { id: ConsolidationId },

    #[serde(rename = "consolidation:analyzed")]
    ConsolidationAnalyzed {
        id: ConsolidationId,
        total_files: usize,
        conflicting: usize,
    },

    #[serde(rename = "consolidation:ready")]
    ConsolidationReady { id: ConsolidationId },

    #[serde(rename = "consolidation:completed")]
    ConsolidationCompleted {
        id: ConsolidationId,
        merged: usize,
        failed: usize,
    },

    #[serde(rename = "consolidation:failed")]
    ConsolidationFailed { id: ConsolidationId, error: String },

    #[serde(rename = "system:shutdown")]
    Shutdown,

    /// Catch-all for unknown event types (extensibility).
    #[serde(other, skip_serializing)]
    Custom,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::WorkerRegistered { .. } => "worker:registered",
            Event::WorkerUpdated { .. } => "worker:updated",
            Event::WorkerUnregistered { .. } => "worker:unregistered",
            Event::WorkerSpawning { .. } => "worker:spawning",
            Event::WorkerSpawned { .. } => "worker:spawned",
            Event::WorkerSpawnFailed { .. } => "worker:spawn_failed",
            Event::WorkerStatusChanged { .. } => "worker:status_changed",
            Event::WorkerExit { .. } => "worker:exit",
            Event::WorkerStdout { .. } => "worker:stdout",
            Event::WorkerStderr { .. } => "worker:stderr",
            Event::WorkerTerminating { .. } => "worker:terminating",
            Event::WorkerError { .. } => "worker:error",
            Event::MessageQueued { .. } => "message:queued",
            Event::MessageDelivering { .. } => "message:delivering",
            Event::MessageDelivered { .. } => "message:delivered",
            Event::MessageFailed { .. } => "message:failed",
            Event::BarrierSignal { .. } => "barrier:signal",
            Event::BarrierComplete { .. } => "barrier:complete",
            Event::BarrierTimeout { .. } => "barrier:timeout",
            Event::ElectionInProgress { .. } => "election:in_progress",
            Event::ElectionCompleted { .. } => "election:completed",
            Event::ElectionTimeout { .. } => "election:timeout",
            Event::ConsolidationAnalyzing { .. } => "consolidation:analyzing",
            Event::ConsolidationAnalyzed { .. } => "consolidation:analyzed",
            Event::ConsolidationReady { .. } => "consolidation:ready",
            Event::ConsolidationCompleted { .. } => "consolidation:completed",
            Event::ConsolidationFailed { .. } => "consolidation:failed",
            Event::Shutdown => "system:shutdown",
            Event::Custom => "custom",
        }
    }

    /// Message priority events fan out under a single topic so subscribers
    /// don't need five separate filters.
    pub fn message_priority(&self) -> Option<Priority> {
        match self {
            Event::MessageQueued { message }
            | Event::MessageDelivering { message }
            | Event::MessageDelivered { message }
            | Event::MessageFailed { message } => Some(message.priority),
            _ => None,
        }
    }

    pub fn log_summary(&self) -> String {
        let t = self.name();
        match self {
            Event::WorkerRegistered { id }
            | Event::WorkerUpdated { id }
            | Event::WorkerUnregistered { id } => format!("{t} id={id}"),
            Event::WorkerSpawning { id, name, .. } => format!("{t} id={id} name={name}"),
            Event::WorkerSpawned { id, pid, .. } => format!("{t} id={id} pid={pid}"),
            Event::WorkerSpawnFailed { id, error } => match id {
                Some(id) => format!("{t} id={id} error={error}"),
                None => format!("{t} error={error}"),
            },
            Event::WorkerStatusChanged {
                id,
                old_status,
                new_status,
            } => format!("{t} id={id} {old_status}->{new_status}"),
            Event::WorkerExit { id, exit_code, .. } => format!("{t} id={id} exit={exit_code:?}"),
            Event::WorkerStdout { id, .. } | Event::WorkerStderr { id, .. } => format!("{t} id={id}"),
            Event::WorkerTerminating { id, reason } => format!("{t} id={id} reason={reason}"),
            Event::WorkerError { id, error } => format!("{t} id={id} error={error}"),
            Event::MessageQueued { message }
            | Event::MessageDelivering { message }
            | Event::MessageFailed { message }
            | Event::MessageDelivered { message } => {
                format!("{t} id={} target={}", message.id, message.target)
            }
            Event::BarrierSignal { id, .. }
            | Event::BarrierComplete { id, .. }
            | Event::BarrierTimeout { id, .. } => format!("{t} id={id}"),
            Event::ElectionInProgress { id } | Event::ElectionTimeout { id } => {
                format!("{t} id={id}")
            }
            Event::ElectionCompleted { id, winner } => format!("{t} id={id} winner={winner}"),
            Event::ConsolidationAnalyzing { id } | Event::ConsolidationReady { id } => {
                format!("{t} id={id}")
            }
            Event::ConsolidationAnalyzed {
                id,
                total_files,
                conflicting,
            } => format!("{t} id={id} files={total_files} conflicting={conflicting}"),
            Event::ConsolidationCompleted { id, merged, failed } => {
                format!("{t} id={id} merged={merged} failed={failed}")
            }
            Event::ConsolidationFailed { id, error } => format!("{t} id={id} error={error}"),
            Event::Shutdown | Event::Custom => t.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
