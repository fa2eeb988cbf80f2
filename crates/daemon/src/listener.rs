// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener Task: accepts connections on the Unix socket, dispatches each
//! [`Request`] to the relevant engine actor, and writes back a [`Response`]
//! (§6 External Interfaces). A connection that sends `Request::Subscribe`
//! switches into push mode for its remaining lifetime.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use orc_adapters::VcsAdapter;
use orc_core::{BarrierId, ElectionId, SpawnRequest, TerminationReason};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Notify;
use tracing::{error, warn};

use crate::lifecycle::DaemonState;
use crate::protocol::{ParticipantSpec, Query, Request, Response};
use crate::protocol_wire::{self, DEFAULT_TIMEOUT};

/// Drives the accept loop, handing each connection its own task.
pub struct Listener {
    socket: UnixListener,
    daemon: Arc<DaemonState>,
    shutdown: Arc<Notify>,
}

impl Listener {
    pub fn new(socket: UnixListener, daemon: Arc<DaemonState>, shutdown: Arc<Notify>) -> Self {
        Self {
            socket,
            daemon,
            shutdown,
        }
    }

    pub async fn run(self) {
        loop {
            match self.socket.accept().await {
                Ok((stream, _addr)) => {
                    let daemon = Arc::clone(&self.daemon);
                    let shutdown = Arc::clone(&self.shutdown);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, daemon, shutdown).await {
                            warn!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "accept failed");
                }
            }
        }
    }
}

async fn handle_connection(
    mut stream: UnixStream,
    daemon: Arc<DaemonState>,
    shutdown: Arc<Notify>,
) -> Result<(), protocol_wire::ProtocolError> {
    loop {
        let request = match protocol_wire::read_request(&mut stream, DEFAULT_TIMEOUT).await {
            Ok(r) => r,
            Err(protocol_wire::ProtocolError::ConnectionClosed) => return Ok(()),
            Err(e) => return Err(e),
        };

        if matches!(request, Request::Subscribe { .. }) {
            let topics = match request {
                Request::Subscribe { topics } => topics,
                _ => unreachable!(),
            };
            protocol_wire::write_response(&mut stream, &Response::Subscribed, DEFAULT_TIMEOUT).await?;
            return stream_events(&mut stream, &daemon, topics).await;
        }

        if matches!(request, Request::Shutdown) {
            protocol_wire::write_response(&mut stream, &Response::ShuttingDown, DEFAULT_TIMEOUT).await?;
            shutdown.notify_one();
            return Ok(());
        }

        let response = dispatch(&daemon, request).await;
        protocol_wire::write_response(&mut stream, &response, DEFAULT_TIMEOUT).await?;
    }
}

async fn stream_events(
    stream: &mut UnixStream,
    daemon: &DaemonState,
    topics: Vec<String>,
) -> Result<(), protocol_wire::ProtocolError> {
    let mut events = daemon.events.subscribe();
    loop {
        match events.recv().await {
            Ok(event) => {
                if !topics.is_empty() && !topics.iter().any(|t| event.name().starts_with(t.as_str())) {
                    continue;
                }
                let response = Response::Event { event };
                protocol_wire::write_response(stream, &response, DEFAULT_TIMEOUT).await?;
            }
            Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "subscriber lagged behind event bus");
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => return Ok(()),
        }
    }
}

async fn dispatch(daemon: &DaemonState, request: Request) -> Response {
    match request {
        Request::Ping => Response::Pong,
        Request::Subscribe { .. } | Request::Shutdown => unreachable!("handled by caller"),

        Request::Query { query } => dispatch_query(daemon, query).await,

        Request::SpawnWorkers {
            project,
            name,
            kind,
            task,
            base_revision,
            branch,
            count,
        } => spawn_workers(daemon, project, name, kind, task, base_revision, branch, count).await,

        Request::TerminateWorker { id } => {
            match daemon.supervisor.terminate(&id, TerminationReason::UserInitiated).await {
                Ok(()) => Response::WorkerTerminated,
                Err(e) => e.into(),
            }
        }

        Request::CreateConsolidation {
            project,
            base_revision,
            participants,
        } => {
            let participants = participants
                .into_iter()
                .map(|p: ParticipantSpec| orc_engine::Participant {
                    worker: p.worker,
                    worktree: p.worktree,
                    branch: p.branch,
                })
                .collect();
            match daemon.consolidator.analyze(project, base_revision, participants).await {
                Ok(id) => Response::ConsolidationCreated { id },
                Err(e) => e.into(),
            }
        }

        Request::ResolveConsolidation { id, resolutions } => {
            match daemon.consolidator.resolve(&id, resolutions) {
                Ok(plan) => Response::MergePlan { plan },
                Err(e) => e.into(),
            }
        }

        Request::ExportConsolidation {
            id,
            scratch_path,
            commit_message,
        } => {
            let registry = Arc::clone(&daemon.registry);
            let result = daemon
                .consolidator
                .export(&id, &scratch_path, &commit_message, |worker_id| {
                    registry.get(worker_id).map(|w| w.worktree_path)
                })
                .await;
            match result {
                Ok(result) => Response::MergeResult { result },
                Err(e) => e.into(),
            }
        }

        Request::DeleteConsolidation { id } => match daemon.consolidator.delete(&id) {
            Ok(()) => Response::ConsolidationDeleted,
            Err(e) => e.into(),
        },

        Request::CreateBarrier { id, expected, timeout_ms } => {
            let outcome = daemon
                .coordinator
                .create_named_barrier(
                    BarrierId::new(id),
                    expected.into_iter().collect::<BTreeSet<_>>(),
                    Duration::from_millis(timeout_ms),
                )
                .await;
            Response::Barrier { outcome }
        }

        Request::SignalBarrier { id, worker } => {
            match daemon.coordinator.signal_barrier(&BarrierId::new(id), &worker) {
                Ok(completed) => Response::BarrierSignaled { completed },
                Err(e) => e.into(),
            }
        }

        Request::StartElection { id, candidates, timeout_ms } => {
            let result = daemon
                .coordinator
                .create_named_election(
                    ElectionId::new(id),
                    candidates.into_iter().collect::<BTreeSet<_>>(),
                    Duration::from_millis(timeout_ms),
                )
                .await;
            Response::Election { result }
        }

        Request::CastVote { id, voter, candidate } => {
            match daemon.coordinator.cast_vote(&ElectionId::new(id), &voter, &candidate) {
                Ok(resolved) => Response::VoteCast { resolved },
                Err(e) => e.into(),
            }
        }

        Request::PartitionTask {
            task,
            agent_count,
            strategy,
            partition_key_field,
        } => {
            let partitions = daemon.coordinator.partition_task(&task, agent_count, strategy, &partition_key_field);
            Response::Partitions { partitions }
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn spawn_workers(
    daemon: &DaemonState,
    project: std::path::PathBuf,
    name: String,
    kind: String,
    task: Option<String>,
    base_revision: String,
    branch: Option<String>,
    count: u32,
) -> Response {
    if !(1..=10).contains(&count) {
        return orc_core::OrcError::Validation(format!(
            "worker count must be between 1 and 10, got {count}"
        ))
        .into();
    }
    let mut ids = Vec::with_capacity(count as usize);
    for i in 0..count {
        let worker_name = if count == 1 { name.clone() } else { format!("{name}-{i}") };
        let mut request = SpawnRequest::new(project.clone(), worker_name, base_revision.clone());
        request.kind = kind.clone();
        if let Some(task) = &task {
            request = request.with_task(task.clone());
        }
        if let Some(branch) = &branch {
            request = request.with_branch(branch.clone());
        }
        match daemon.supervisor.spawn(request).await {
            Ok(id) => ids.push(id),
            Err(e) => return e.into(),
        }
    }
    Response::WorkersSpawned { ids }
}

async fn dispatch_query(daemon: &DaemonState, query: Query) -> Response {
    match query {
        Query::ListWorkers { status, project } => {
            let mut workers: Vec<_> = daemon.registry.snapshot().into_values().collect();
            if let Some(status) = status {
                workers.retain(|w| w.status == status);
            }
            if let Some(project) = project {
                workers.retain(|w| w.project == project);
            }
            workers.sort_by(|a, b| a.created_at_ms.cmp(&b.created_at_ms));
            Response::Workers { workers }
        }

        Query::GetWorker { id } => match daemon.registry.get(&id) {
            Some(worker) => Response::Worker { worker },
            None => Response::error(orc_core::WireErrorCode::NotFound, format!("worker {id} not found")),
        },

        Query::GetWorkerLogs { id, offset, count } => Response::WorkerLogs {
            lines: daemon.supervisor.logs(&id, offset, count),
        },

        Query::GetWorkerStats { id } => match daemon.monitor.stats(&id) {
            Some(stats) => Response::WorkerStats { stats },
            None => Response::error(orc_core::WireErrorCode::NotFound, format!("no stats for worker {id}")),
        },

        Query::ListWorktrees { project } => match daemon.vcs.list_worktrees(&project).await {
            Ok(worktrees) => {
                let owned: BTreeSet<String> = daemon
                    .registry
                    .by_project(&project)
                    .into_iter()
                    .map(|w| w.worktree_path.display().to_string())
                    .collect();
                let worktrees = worktrees
                    .into_iter()
                    .filter(|w| owned.contains(&w.path.display().to_string()))
                    .collect();
                Response::Worktrees { worktrees }
            }
            Err(e) => Response::error(orc_core::WireErrorCode::VcsUnavailable, e.to_string()),
        },

        Query::GetWorktreeDiff { worktree, base_revision } => {
            match daemon.vcs.diff(&worktree, &base_revision).await {
                Ok(files) => Response::WorktreeDiff { files },
                Err(e) => Response::error(orc_core::WireErrorCode::VcsUnavailable, e.to_string()),
            }
        }

        Query::GetConsolidation { id } => match daemon.consolidator.get(&id) {
            Ok(consolidation) => Response::Consolidation { consolidation },
            Err(e) => e.into(),
        },

        Query::ListConsolidations => match daemon.consolidator.list() {
            Ok(consolidations) => Response::Consolidations { consolidations },
            Err(e) => e.into(),
        },
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
