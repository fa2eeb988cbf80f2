// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client for CLI commands

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::client_lifecycle::log_connection_error;
use crate::daemon_process::{
    cleanup_stale_socket, daemon_dir, daemon_socket, probe_socket, read_startup_error,
    start_daemon_background, stop_daemon_sync, wrap_with_startup_error,
};

use orc_adapters::{FileDiff, WorktreeInfo};
use orc_core::{
    BarrierOutcome, Consolidation, ConsolidationId, ElectionResult, MergePlan, MergeResult,
    PartitionDescriptor, PartitionStrategy, Resolution, Worker, WorkerId, WorkerStatus,
};
use orc_daemon::{
    decode, encode, read_message, write_message, ParticipantSpec, ProtocolError, Query, Request,
    Response,
};
use orc_engine::{LogLine, WorkerStats};
use thiserror::Error;
use tokio::net::UnixStream;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Timeout for IPC requests (ping, query, action, shutdown)
pub fn timeout_ipc() -> Duration {
    parse_duration_ms("ORC_TIMEOUT_IPC_MS").unwrap_or(Duration::from_secs(5))
}

/// Timeout for waiting for daemon to start
pub fn timeout_connect() -> Duration {
    parse_duration_ms("ORC_TIMEOUT_CONNECT_MS").unwrap_or(Duration::from_secs(5))
}

/// Timeout for waiting for process to exit
pub fn timeout_exit() -> Duration {
    parse_duration_ms("ORC_TIMEOUT_EXIT_MS").unwrap_or(Duration::from_secs(2))
}

/// Polling interval for connection retries
pub fn poll_interval() -> Duration {
    parse_duration_ms("ORC_CONNECT_POLL_MS").unwrap_or(Duration::from_millis(50))
}

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Daemon not running")]
    DaemonNotRunning,

    #[error("Failed to start daemon: {0}")]
    DaemonStartFailed(String),

    #[error("Connection timeout waiting for daemon to start")]
    DaemonStartTimeout,

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Unexpected response from daemon")]
    UnexpectedResponse,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not determine config directory")]
    NoConfigDir,
}

/// Daemon client
pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    /// For action commands - auto-start with version check, max 1 restart per process
    ///
    /// Action commands mutate state and are user-initiated (spawn, terminate,
    /// resolve, export, etc.). They should auto-start the daemon but limit
    /// restarts to prevent infinite loops.
    pub fn for_action() -> Result<Self, ClientError> {
        Self::connect_or_start_once()
    }

    /// For query commands - connect only, no restart
    ///
    /// Query commands read state (list, show, logs, stats). If the daemon is
    /// the wrong version there's nothing useful to query anyway.
    pub fn for_query() -> Result<Self, ClientError> {
        Self::connect()
    }

    /// For signal commands - connect only, no restart
    ///
    /// Signal commands are operational and often agent-initiated (barrier
    /// signal, cast vote). Restarting the daemon would lose in-flight
    /// coordination state, causing failures. Semantic alias for
    /// `for_query()` to document intent.
    pub fn for_signal() -> Result<Self, ClientError> {
        Self::connect()
    }

    fn connect_or_start_once() -> Result<Self, ClientError> {
        static RESTARTED: AtomicBool = AtomicBool::new(false);

        if RESTARTED.load(Ordering::SeqCst) {
            return Self::connect();
        }

        let config_dir = daemon_dir()?;
        let version_path = config_dir.join("orchestrator.version");
        if let Ok(daemon_version) = std::fs::read_to_string(&version_path) {
            let cli_version = concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_GIT_HASH"));
            if daemon_version.trim() != cli_version {
                RESTARTED.store(true, Ordering::SeqCst);
                eprintln!(
                    "warn: daemon version {} does not match cli version {}, restarting daemon",
                    daemon_version.trim(),
                    cli_version
                );
                stop_daemon_sync();
            }
        }

        match Self::connect() {
            Ok(client) => {
                if probe_socket(&client.socket_path) {
                    Ok(client)
                } else {
                    cleanup_stale_socket()?;
                    let child = start_daemon_background()?;
                    Self::connect_with_retry(timeout_connect(), child)
                }
            }
            Err(ClientError::DaemonNotRunning) => {
                let child = start_daemon_background()?;
                Self::connect_with_retry(timeout_connect(), child)
            }
            Err(e) => Err(wrap_with_startup_error(e)),
        }
    }

    /// Connect to existing daemon (no auto-start)
    pub fn connect() -> Result<Self, ClientError> {
        let socket_path = daemon_socket()?;

        if !socket_path.exists() {
            let err = ClientError::DaemonNotRunning;
            log_connection_error(&err);
            return Err(err);
        }

        Ok(Self { socket_path })
    }

    fn connect_with_retry(
        timeout: Duration,
        mut child: std::process::Child,
    ) -> Result<Self, ClientError> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            match child.try_wait() {
                Ok(Some(status)) => {
                    let poll_start = Instant::now();
                    while poll_start.elapsed() < timeout_exit() {
                        if let Some(err) = read_startup_error() {
                            return Err(ClientError::DaemonStartFailed(err));
                        }
                        std::thread::sleep(poll_interval());
                    }
                    return Err(ClientError::DaemonStartFailed(format!(
                        "exited with {}",
                        status
                    )));
                }
                Ok(None) => {}
                Err(_) => {}
            }

            match Self::connect() {
                Ok(client) => return Ok(client),
                Err(ClientError::DaemonNotRunning) => {
                    std::thread::sleep(poll_interval());
                }
                Err(e) => return Err(wrap_with_startup_error(e)),
            }
        }

        Err(wrap_with_startup_error(ClientError::DaemonStartTimeout))
    }

    async fn send_with_timeout(
        &self,
        request: &Request,
        read_timeout: Duration,
        write_timeout: Duration,
    ) -> Result<Response, ClientError> {
        let stream = UnixStream::connect(&self.socket_path).await?;
        let (mut reader, mut writer) = stream.into_split();

        let data = encode(request)?;
        tokio::time::timeout(write_timeout, write_message(&mut writer, &data))
            .await
            .map_err(|_| ProtocolError::Timeout)??;

        let response_bytes = tokio::time::timeout(read_timeout, read_message(&mut reader))
            .await
            .map_err(|_| ProtocolError::Timeout)??;

        Ok(decode(&response_bytes)?)
    }

    /// Send a request and receive a response
    pub async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        match self
            .send_with_timeout(request, timeout_ipc(), timeout_ipc())
            .await
        {
            Ok(response) => Ok(response),
            Err(e) => {
                log_connection_error(&e);
                Err(e)
            }
        }
    }

    fn reject<T>(resp: Response) -> Result<T, ClientError> {
        match resp {
            Response::Error { code, message } => Err(ClientError::Rejected(format!("{code:?}: {message}"))),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub async fn ping(&self) -> Result<(), ClientError> {
        match self.send(&Request::Ping).await? {
            Response::Pong => Ok(()),
            other => Self::reject(other),
        }
    }

    /// Request daemon shutdown.
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        match self.send(&Request::Shutdown).await? {
            Response::ShuttingDown => Ok(()),
            other => Self::reject(other),
        }
    }

    // --- Workers ---

    pub async fn list_workers(
        &self,
        status: Option<WorkerStatus>,
        project: Option<PathBuf>,
    ) -> Result<Vec<Worker>, ClientError> {
        let request = Request::Query {
            query: Query::ListWorkers { status, project },
        };
        match self.send(&request).await? {
            Response::Workers { workers } => Ok(workers),
            other => Self::reject(other),
        }
    }

    pub async fn get_worker(&self, id: &WorkerId) -> Result<Worker, ClientError> {
        let request = Request::Query {
            query: Query::GetWorker { id: id.clone() },
        };
        match self.send(&request).await? {
            Response::Worker { worker } => Ok(worker),
            other => Self::reject(other),
        }
    }

    pub async fn get_worker_logs(
        &self,
        id: &WorkerId,
        offset: usize,
        count: usize,
    ) -> Result<Vec<LogLine>, ClientError> {
        let request = Request::Query {
            query: Query::GetWorkerLogs { id: id.clone(), offset, count },
        };
        match self.send(&request).await? {
            Response::WorkerLogs { lines } => Ok(lines),
            other => Self::reject(other),
        }
    }

    pub async fn get_worker_stats(&self, id: &WorkerId) -> Result<WorkerStats, ClientError> {
        let request = Request::Query {
            query: Query::GetWorkerStats { id: id.clone() },
        };
        match self.send(&request).await? {
            Response::WorkerStats { stats } => Ok(stats),
            other => Self::reject(other),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn spawn_workers(
        &self,
        project: PathBuf,
        name: String,
        kind: String,
        task: Option<String>,
        base_revision: String,
        branch: Option<String>,
        count: u32,
    ) -> Result<Vec<WorkerId>, ClientError> {
        let request = Request::SpawnWorkers {
            project,
            name,
            kind,
            task,
            base_revision,
            branch,
            count,
        };
        match self.send(&request).await? {
            Response::WorkersSpawned { ids } => Ok(ids),
            other => Self::reject(other),
        }
    }

    pub async fn terminate_worker(&self, id: &WorkerId) -> Result<(), ClientError> {
        let request = Request::TerminateWorker { id: id.clone() };
        match self.send(&request).await? {
            Response::WorkerTerminated => Ok(()),
            other => Self::reject(other),
        }
    }

    // --- Worktrees ---

    pub async fn list_worktrees(&self, project: PathBuf) -> Result<Vec<WorktreeInfo>, ClientError> {
        let request = Request::Query {
            query: Query::ListWorktrees { project },
        };
        match self.send(&request).await? {
            Response::Worktrees { worktrees } => Ok(worktrees),
            other => Self::reject(other),
        }
    }

    pub async fn get_worktree_diff(
        &self,
        worktree: PathBuf,
        base_revision: String,
    ) -> Result<Vec<FileDiff>, ClientError> {
        let request = Request::Query {
            query: Query::GetWorktreeDiff { worktree, base_revision },
        };
        match self.send(&request).await? {
            Response::WorktreeDiff { files } => Ok(files),
            other => Self::reject(other),
        }
    }

    // --- Consolidations ---

    pub async fn create_consolidation(
        &self,
        project: PathBuf,
        base_revision: String,
        participants: Vec<ParticipantSpec>,
    ) -> Result<ConsolidationId, ClientError> {
        let request = Request::CreateConsolidation { project, base_revision, participants };
        match self.send(&request).await? {
            Response::ConsolidationCreated { id } => Ok(id),
            other => Self::reject(other),
        }
    }

    pub async fn resolve_consolidation(
        &self,
        id: &ConsolidationId,
        resolutions: Vec<Resolution>,
    ) -> Result<MergePlan, ClientError> {
        let request = Request::ResolveConsolidation { id: id.clone(), resolutions };
        match self.send(&request).await? {
            Response::MergePlan { plan } => Ok(plan),
            other => Self::reject(other),
        }
    }

    pub async fn export_consolidation(
        &self,
        id: &ConsolidationId,
        scratch_path: PathBuf,
        commit_message: String,
    ) -> Result<MergeResult, ClientError> {
        let request = Request::ExportConsolidation { id: id.clone(), scratch_path, commit_message };
        match self.send(&request).await? {
            Response::MergeResult { result } => Ok(result),
            other => Self::reject(other),
        }
    }

    pub async fn delete_consolidation(&self, id: &ConsolidationId) -> Result<(), ClientError> {
        let request = Request::DeleteConsolidation { id: id.clone() };
        match self.send(&request).await? {
            Response::ConsolidationDeleted => Ok(()),
            other => Self::reject(other),
        }
    }

    pub async fn get_consolidation(&self, id: &ConsolidationId) -> Result<Consolidation, ClientError> {
        let request = Request::Query {
            query: Query::GetConsolidation { id: id.clone() },
        };
        match self.send(&request).await? {
            Response::Consolidation { consolidation } => Ok(consolidation),
            other => Self::reject(other),
        }
    }

    pub async fn list_consolidations(&self) -> Result<Vec<Consolidation>, ClientError> {
        let request = Request::Query { query: Query::ListConsolidations };
        match self.send(&request).await? {
            Response::Consolidations { consolidations } => Ok(consolidations),
            other => Self::reject(other),
        }
    }

    // --- Barriers & elections ---

    pub async fn create_barrier(
        &self,
        id: String,
        expected: Vec<String>,
        timeout_ms: u64,
    ) -> Result<BarrierOutcome, ClientError> {
        let request = Request::CreateBarrier { id, expected, timeout_ms };
        match self.send(&request).await? {
            Response::Barrier { outcome } => Ok(outcome),
            other => Self::reject(other),
        }
    }

    pub async fn signal_barrier(&self, id: String, worker: String) -> Result<bool, ClientError> {
        let request = Request::SignalBarrier { id, worker };
        match self.send(&request).await? {
            Response::BarrierSignaled { completed } => Ok(completed),
            other => Self::reject(other),
        }
    }

    pub async fn start_election(
        &self,
        id: String,
        candidates: Vec<String>,
        timeout_ms: u64,
    ) -> Result<ElectionResult, ClientError> {
        let request = Request::StartElection { id, candidates, timeout_ms };
        match self.send(&request).await? {
            Response::Election { result } => Ok(result),
            other => Self::reject(other),
        }
    }

    pub async fn cast_vote(&self, id: String, voter: String, candidate: String) -> Result<bool, ClientError> {
        let request = Request::CastVote { id, voter, candidate };
        match self.send(&request).await? {
            Response::VoteCast { resolved } => Ok(resolved),
            other => Self::reject(other),
        }
    }

    // --- Partitioning ---

    pub async fn partition_task(
        &self,
        task: serde_json::Value,
        agent_count: usize,
        strategy: PartitionStrategy,
        partition_key_field: String,
    ) -> Result<Vec<PartitionDescriptor>, ClientError> {
        let request = Request::PartitionTask { task, agent_count, strategy, partition_key_field };
        match self.send(&request).await? {
            Response::Partitions { partitions } => Ok(partitions),
            other => Self::reject(other),
        }
    }

    // --- Event stream ---

    /// Switch this connection into push mode and return a stream of events
    /// filtered by `topics` (empty = everything). Consumes the client.
    pub async fn subscribe(&self, topics: Vec<String>) -> Result<EventStream, ClientError> {
        let stream = UnixStream::connect(&self.socket_path).await?;
        let (mut reader, mut writer) = stream.into_split();

        let data = encode(&Request::Subscribe { topics })?;
        tokio::time::timeout(timeout_ipc(), write_message(&mut writer, &data))
            .await
            .map_err(|_| ProtocolError::Timeout)??;

        let ack = tokio::time::timeout(timeout_ipc(), read_message(&mut reader))
            .await
            .map_err(|_| ProtocolError::Timeout)??;
        match decode(&ack)? {
            Response::Subscribed => Ok(EventStream { reader }),
            other => Self::reject(other),
        }
    }

    #[cfg(test)]
    pub(crate) fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

/// A connection switched into push mode via [`DaemonClient::subscribe`].
pub struct EventStream {
    reader: tokio::net::unix::OwnedReadHalf,
}

impl EventStream {
    /// Read the next event frame. Returns `None` when the daemon closes the
    /// connection.
    pub async fn next_event(&mut self) -> Result<Option<orc_core::Event>, ClientError> {
        match read_message(&mut self.reader).await {
            Ok(bytes) => match decode(&bytes)? {
                Response::Event { event } => Ok(Some(event)),
                _ => Err(ClientError::UnexpectedResponse),
            },
            Err(ProtocolError::ConnectionClosed) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
