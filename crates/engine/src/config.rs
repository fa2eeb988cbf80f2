// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator-wide tunables (§4.B/§4.C/§6 concurrency caps), overridable by
//! `ORC_*` environment variables so a deployment can tune caps without a
//! rebuild.

use std::path::PathBuf;
use std::time::Duration;

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_path(key: &str, default: PathBuf) -> PathBuf {
    std::env::var(key).map(PathBuf::from).unwrap_or(default)
}

/// Tunables shared by every engine component.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Per-project configuration directory holding registry.json,
    /// messages/, and consolidations.json.
    pub config_dir: PathBuf,
    /// Host-wide maximum number of simultaneously active workers.
    pub max_active_workers: u64,
    /// Default wall-clock limit for a worker before it is terminated.
    pub worker_wall_clock_limit: Duration,
    /// Grace period between SIGTERM and SIGKILL during termination.
    pub termination_grace_period: Duration,
    /// Resource Monitor sampling cadence.
    pub monitor_sample_interval: Duration,
    /// Resource Monitor rolling sample window size.
    pub monitor_sample_window: usize,
    /// Resident memory ceiling that triggers `terminate(id, memory_limit)`.
    pub memory_limit_bytes: u64,
    /// Per-queue message capacity.
    pub message_queue_capacity: usize,
    /// Maximum delivery retries before a message is marked failed.
    pub message_max_retries: u32,
    /// Registry size ceiling that triggers pruning of old terminal records.
    pub registry_prune_ceiling: usize,
    /// Age after which a terminal registry record becomes prunable.
    pub registry_prune_age: Duration,
    /// Per-worker buffered stdio lines retained for log paging.
    pub log_buffer_capacity: usize,
}

impl OrchestratorConfig {
    /// Production defaults, overridable by `ORC_*` environment variables.
    pub fn from_env(config_dir: impl Into<PathBuf>) -> Self {
        let default = Self::with_config_dir(config_dir.into());
        Self {
            config_dir: env_path("ORC_CONFIG_DIR", default.config_dir),
            max_active_workers: env_u64("ORC_MAX_ACTIVE_WORKERS", default.max_active_workers),
            worker_wall_clock_limit: Duration::from_secs(env_u64(
                "ORC_WORKER_WALL_CLOCK_SECS",
                default.worker_wall_clock_limit.as_secs(),
            )),
            termination_grace_period: Duration::from_secs(env_u64(
                "ORC_TERMINATION_GRACE_SECS",
                default.termination_grace_period.as_secs(),
            )),
            monitor_sample_interval: Duration::from_secs(env_u64(
                "ORC_MONITOR_SAMPLE_INTERVAL_SECS",
                default.monitor_sample_interval.as_secs(),
            )),
            monitor_sample_window: env_u64(
                "ORC_MONITOR_SAMPLE_WINDOW",
                default.monitor_sample_window as u64,
            ) as usize,
            memory_limit_bytes: env_u64("ORC_MEMORY_LIMIT_BYTES", default.memory_limit_bytes),
            message_queue_capacity: env_u64(
                "ORC_MESSAGE_QUEUE_CAPACITY",
                default.message_queue_capacity as u64,
            ) as usize,
            message_max_retries: env_u64(
                "ORC_MESSAGE_MAX_RETRIES",
                default.message_max_retries as u64,
            ) as u32,
            registry_prune_ceiling: env_u64(
                "ORC_REGISTRY_PRUNE_CEILING",
                default.registry_prune_ceiling as u64,
            ) as usize,
            registry_prune_age: Duration::from_secs(env_u64(
                "ORC_REGISTRY_PRUNE_AGE_SECS",
                default.registry_prune_age.as_secs(),
            )),
            log_buffer_capacity: env_u64("ORC_LOG_BUFFER_CAPACITY", default.log_buffer_capacity as u64)
                as usize,
        }
    }

    fn with_config_dir(config_dir: PathBuf) -> Self {
        Self {
            config_dir,
            max_active_workers: 10,
            worker_wall_clock_limit: Duration::from_secs(30 * 60),
            termination_grace_period: Duration::from_secs(10),
            monitor_sample_interval: Duration::from_secs(5),
            monitor_sample_window: 60,
            memory_limit_bytes: 512 * 1024 * 1024,
            message_queue_capacity: 1000,
            message_max_retries: 3,
            registry_prune_ceiling: 1000,
            registry_prune_age: Duration::from_secs(24 * 60 * 60),
            log_buffer_capacity: 2000,
        }
    }

    /// Fast-clock defaults for tests: a tmp config dir, same caps.
    pub fn test_default(config_dir: impl Into<PathBuf>) -> Self {
        Self::with_config_dir(config_dir.into())
    }

    pub fn registry_path(&self) -> PathBuf {
        self.config_dir.join("registry.json")
    }

    pub fn messages_dir(&self) -> PathBuf {
        self.config_dir.join("messages")
    }

    pub fn consolidations_path(&self) -> PathBuf {
        self.config_dir.join("consolidations.json")
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
