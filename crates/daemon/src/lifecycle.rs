// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, recovery.
//!
//! Unlike a WAL/snapshot system, every engine component here persists
//! continuously to its own store (Registry, Message Bus, Consolidation
//! store), so startup only needs to load those stores and wire the six
//! §4 actors together; there is no event log to replay.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use fs2::FileExt;
use orc_adapters::{GitVcsAdapter, NativeProcessAdapter, ProcFsSampler};
use orc_core::{SystemClock, TerminationReason, UuidIdGen};
use orc_engine::{
    Consolidator, Coordinator, EventBus, MessageBus, OrchestratorConfig, Registry, ResourceMonitor,
    SupervisorDelivery, WorkerSupervisor,
};
use orc_storage::{ConsolidationStore, MessageStore, RegistryStore};
use thiserror::Error;
use tokio::net::UnixListener;
use tracing::{info, warn};

pub type Supervisor = WorkerSupervisor<GitVcsAdapter, NativeProcessAdapter, ProcFsSampler, UuidIdGen>;
pub type Delivery = SupervisorDelivery<GitVcsAdapter, NativeProcessAdapter, ProcFsSampler, UuidIdGen>;
pub type Bus = MessageBus<Delivery, UuidIdGen>;
pub type Coord = Coordinator<UuidIdGen>;
pub type Consol = Consolidator<GitVcsAdapter, UuidIdGen>;

/// Daemon configuration: where state, socket, and lock files live.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root config directory (e.g. `~/.config/orchestrator`).
    pub config_dir: PathBuf,
    /// Path to the Unix domain socket (§6.1).
    pub socket_path: PathBuf,
    /// Path to the lock/PID file.
    pub lock_path: PathBuf,
    /// Path to the version file.
    pub version_path: PathBuf,
    /// Path to the daemon log file.
    pub log_path: PathBuf,
}

impl Config {
    /// Load configuration for the user-level daemon.
    ///
    /// Uses `ORC_CONFIG_DIR`, else `$XDG_CONFIG_HOME/orchestrator`, else
    /// `~/.config/orchestrator`. One daemon serves every project for a user.
    pub fn load() -> Result<Self, LifecycleError> {
        let config_dir = crate::env::config_dir()?;
        Ok(Self {
            socket_path: config_dir.join("orchestrator.sock"),
            lock_path: config_dir.join("orchestrator.pid"),
            version_path: config_dir.join("orchestrator.version"),
            log_path: config_dir.join("orchestrator.log"),
            config_dir,
        })
    }
}

/// Daemon state during operation: the six §4 actors wired together.
pub struct DaemonState {
    pub config: Config,
    #[allow(dead_code)]
    lock_file: File,
    pub registry: Arc<Registry>,
    pub supervisor: Arc<Supervisor>,
    pub monitor: Arc<ResourceMonitor<ProcFsSampler>>,
    pub bus: Arc<Bus>,
    pub coordinator: Arc<Coord>,
    pub consolidator: Arc<Consol>,
    pub vcs: GitVcsAdapter,
    pub events: EventBus,
    pub start_time: Instant,
}

/// Result of daemon startup.
pub struct StartupResult {
    pub daemon: DaemonState,
    pub listener: UnixListener,
}

/// Lifecycle errors.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("storage error: {0}")]
    Storage(#[from] orc_storage::AtomicIoError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon: acquire the lock, load every store, wire the engine,
/// and bind the socket.
pub async fn startup(config: Config) -> Result<StartupResult, LifecycleError> {
    match startup_inner(config.clone()).await {
        Ok(result) => Ok(result),
        Err(e) => {
            // Don't clean up if we failed to acquire the lock - those files
            // belong to the already-running daemon.
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(&config);
            }
            Err(e)
        }
    }
}

async fn startup_inner(config: Config) -> Result<StartupResult, LifecycleError> {
    std::fs::create_dir_all(&config.config_dir)?;

    // Acquire the lock first to prevent startup races; avoid truncating
    // before the lock is held so we never wipe a running daemon's PID.
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    use std::io::Write;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    std::fs::write(&config.version_path, orc_daemon_version())?;

    let orc_config = OrchestratorConfig::from_env(config.config_dir.clone());
    let events = EventBus::new();
    let clock = Arc::new(SystemClock);

    let registry = Arc::new(Registry::load(
        RegistryStore::new(orc_config.registry_path()),
        events.clone(),
        Arc::clone(&clock) as Arc<dyn orc_core::Clock>,
        orc_config.registry_prune_ceiling,
        orc_config.registry_prune_age.as_millis() as u64,
    )?);

    let (monitor, mut breach_rx) =
        ResourceMonitor::spawn(ProcFsSampler::default(), Arc::clone(&clock) as Arc<dyn orc_core::Clock>, &orc_config);

    let supervisor = WorkerSupervisor::new(
        Arc::clone(&registry),
        events.clone(),
        GitVcsAdapter::default(),
        NativeProcessAdapter::default(),
        Arc::clone(&monitor),
        Arc::clone(&clock) as Arc<dyn orc_core::Clock>,
        UuidIdGen,
        orc_config.clone(),
    );

    // Memory-limit breaches terminate their worker (§4.C).
    let breach_supervisor = Arc::clone(&supervisor);
    tokio::spawn(async move {
        while let Some(id) = breach_rx.recv().await {
            warn!(worker_id = %id, "memory limit breached, terminating");
            if let Err(e) = breach_supervisor.terminate(&id, TerminationReason::MemoryLimit).await {
                warn!(worker_id = %id, error = %e, "termination after memory breach failed");
            }
        }
    });

    let delivery = SupervisorDelivery::new(Arc::clone(&supervisor));
    let bus = MessageBus::spawn(
        MessageStore::new(orc_config.messages_dir()),
        events.clone(),
        Arc::clone(&registry),
        Arc::clone(&clock) as Arc<dyn orc_core::Clock>,
        delivery,
        UuidIdGen,
        &orc_config,
    );

    let coordinator = Coordinator::new(events.clone(), Arc::clone(&clock) as Arc<dyn orc_core::Clock>, UuidIdGen);
    let vcs = GitVcsAdapter::default();
    let consolidator = Consolidator::new(
        ConsolidationStore::new(orc_config.consolidations_path()),
        events.clone(),
        vcs.clone(),
        Arc::clone(&clock) as Arc<dyn orc_core::Clock>,
        UuidIdGen,
    );

    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    info!(config_dir = %config.config_dir.display(), "orchestrator daemon started");

    Ok(StartupResult {
        daemon: DaemonState {
            config,
            lock_file,
            registry,
            supervisor,
            monitor,
            bus,
            coordinator,
            consolidator,
            vcs,
            events,
            start_time: Instant::now(),
        },
        listener,
    })
}

fn orc_daemon_version() -> &'static str {
    crate::protocol_wire::PROTOCOL_VERSION
}

fn cleanup_on_failure(config: &Config) {
    let _ = std::fs::remove_file(&config.socket_path);
    let _ = std::fs::remove_file(&config.lock_path);
    let _ = std::fs::remove_file(&config.version_path);
}

impl DaemonState {
    /// Shut the daemon down gracefully (§5 Cancellation & timeouts): terminate
    /// every non-terminal worker with reason `shutdown`, flush the registry,
    /// then remove the daemon's own bookkeeping files.
    pub async fn shutdown(&self) -> Result<(), LifecycleError> {
        info!("shutting down daemon");

        for worker in self.registry.snapshot().into_values() {
            if worker.status.is_terminal() {
                continue;
            }
            if let Err(e) = self.supervisor.terminate(&worker.id, TerminationReason::Shutdown).await {
                warn!(worker_id = %worker.id, error = %e, "failed to terminate worker during shutdown");
            }
        }
        self.registry.persist_now();

        if self.config.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.socket_path) {
                warn!(error = %e, "failed to remove socket file");
            }
        }
        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!(error = %e, "failed to remove pid file");
            }
        }
        if self.config.version_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.version_path) {
                warn!(error = %e, "failed to remove version file");
            }
        }
        info!("daemon shutdown complete");
        Ok(())
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
