// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC protocol between `orc` and `orcd` (§6 External Interfaces).
//!
//! Wire framing (length-prefix + JSON) lives in [`crate::protocol_wire`];
//! this module carries only the request/response domain vocabulary.

use orc_adapters::{ExportOutcome, FileDiff, WorktreeInfo};
use orc_core::{
    BarrierOutcome, Consolidation, ConsolidationId, ElectionResult, Event, MergePlan, MergeResult,
    PartitionDescriptor, PartitionStrategy, Resolution, WireErrorCode, Worker, WorkerId,
    WorkerStatus,
};
use orc_engine::{LogLine, WorkerStats};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Request from `orc` to `orcd`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// Health check.
    Ping,

    /// Switch this connection into push mode: every subsequent frame from
    /// the daemon is an [`Event`] until the peer disconnects (§6.1).
    /// An empty `topics` list subscribes to everything.
    Subscribe { topics: Vec<String> },

    /// Read-only lookup.
    Query { query: Query },

    /// Spawn 1-10 workers from one template (§6 Spawn).
    SpawnWorkers {
        project: PathBuf,
        name: String,
        kind: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task: Option<String>,
        base_revision: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        branch: Option<String>,
        #[serde(default = "one")]
        count: u32,
    },

    /// Terminate a worker by id. Idempotent.
    TerminateWorker { id: WorkerId },

    /// Create and analyze a consolidation over the given participants.
    CreateConsolidation {
        project: PathBuf,
        base_revision: String,
        participants: Vec<ParticipantSpec>,
    },

    /// Apply resolutions to an analyzed consolidation, producing a merge plan.
    ResolveConsolidation {
        id: ConsolidationId,
        resolutions: Vec<Resolution>,
    },

    /// Apply a consolidation's merge plan onto a fresh checkout.
    ExportConsolidation {
        id: ConsolidationId,
        scratch_path: PathBuf,
        commit_message: String,
    },

    /// Delete a consolidation record.
    DeleteConsolidation { id: ConsolidationId },

    /// Create a barrier and block until every participant signals or the
    /// timeout elapses. `id` is chosen by the caller (e.g. a coordinating
    /// script) and must be known to every participant before they connect
    /// to signal it — the daemon cannot hand a server-generated id back in
    /// time for that, since this call does not return until the barrier
    /// resolves.
    CreateBarrier {
        id: String,
        expected: Vec<String>,
        timeout_ms: u64,
    },

    /// Record a participant's arrival at a barrier.
    SignalBarrier { id: String, worker: String },

    /// Start an election and block until every candidate votes or the
    /// timeout elapses. `id` is caller-chosen for the same reason as
    /// `CreateBarrier::id`.
    StartElection {
        id: String,
        candidates: Vec<String>,
        timeout_ms: u64,
    },

    /// Cast one vote in an in-progress election.
    CastVote {
        id: String,
        voter: String,
        candidate: String,
    },

    /// Split a task into per-agent partitions.
    PartitionTask {
        task: serde_json::Value,
        agent_count: usize,
        strategy: PartitionStrategy,
        #[serde(default)]
        partition_key_field: String,
    },

    /// Request daemon shutdown.
    Shutdown,
}

fn one() -> u32 {
    1
}

/// A worker's contribution to a consolidation (§4.F Participant).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParticipantSpec {
    pub worker: WorkerId,
    pub worktree: PathBuf,
    pub branch: String,
}

/// Read-only queries (§6 request/response operations).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Query {
    ListWorkers {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<WorkerStatus>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        project: Option<PathBuf>,
    },
    GetWorker {
        id: WorkerId,
    },
    GetWorkerLogs {
        id: WorkerId,
        #[serde(default)]
        offset: usize,
        #[serde(default = "default_log_count")]
        count: usize,
    },
    GetWorkerStats {
        id: WorkerId,
    },
    ListWorktrees {
        project: PathBuf,
    },
    GetWorktreeDiff {
        worktree: PathBuf,
        base_revision: String,
    },
    GetConsolidation {
        id: ConsolidationId,
    },
    ListConsolidations,
}

fn default_log_count() -> usize {
    200
}

/// Response from `orcd` to `orc`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    Pong,
    Subscribed,

    Workers { workers: Vec<Worker> },
    Worker { worker: Worker },
    WorkerLogs { lines: Vec<LogLine> },
    WorkerStats { stats: WorkerStats },
    Worktrees { worktrees: Vec<WorktreeInfo> },
    WorktreeDiff { files: Vec<FileDiff> },

    WorkersSpawned { ids: Vec<WorkerId> },
    WorkerTerminated,

    Consolidation { consolidation: Consolidation },
    Consolidations { consolidations: Vec<Consolidation> },
    ConsolidationCreated { id: ConsolidationId },
    MergePlan { plan: MergePlan },
    MergeResult { result: MergeResult },
    ConsolidationDeleted,

    Barrier { outcome: BarrierOutcome },
    BarrierSignaled { completed: bool },
    Election { result: ElectionResult },
    VoteCast { resolved: bool },
    Partitions { partitions: Vec<PartitionDescriptor> },

    Event { event: Event },

    ShuttingDown,

    Error { code: WireErrorCode, message: String },
}

impl Response {
    pub fn error(code: WireErrorCode, message: impl Into<String>) -> Self {
        Response::Error {
            code,
            message: message.into(),
        }
    }
}

impl From<orc_core::OrcError> for Response {
    fn from(err: orc_core::OrcError) -> Self {
        Response::Error {
            code: err.wire_code(),
            message: err.to_string(),
        }
    }
}

impl From<ExportOutcome> for MergeResult {
    fn from(outcome: ExportOutcome) -> Self {
        MergeResult {
            merged: Vec::new(),
            failed: outcome.failed,
            commit_id: Some(outcome.commit_id),
        }
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
