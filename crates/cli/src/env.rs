// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the CLI crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::client::ClientError;

// --- Duration helper (private) ---

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

// --- Config directory ---

/// Resolve config directory: `ORC_CONFIG_DIR` > `$XDG_CONFIG_HOME/orchestrator`
/// > `~/.config/orchestrator`. Mirrors `orc-daemon`'s own resolution so the
/// CLI always finds the socket/lock/version files the daemon it talks to wrote.
pub fn config_dir() -> Result<PathBuf, ClientError> {
    if let Ok(dir) = std::env::var("ORC_CONFIG_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(xdg).join("orchestrator"));
    }
    let home = std::env::var("HOME").map_err(|_| ClientError::NoConfigDir)?;
    Ok(PathBuf::from(home).join(".config/orchestrator"))
}

/// Read `ORC_CONFIG_DIR` raw (for diagnostic logging).
pub fn config_dir_raw() -> Option<String> {
    std::env::var("ORC_CONFIG_DIR").ok()
}

// --- Color ---

pub fn no_color() -> bool {
    std::env::var("NO_COLOR").is_ok_and(|v| v == "1")
}

pub fn force_color() -> bool {
    std::env::var("COLOR").is_ok_and(|v| v == "1")
}

// --- Daemon binary ---

pub fn daemon_binary() -> Option<String> {
    std::env::var("ORC_DAEMON_BINARY").ok()
}

pub fn cargo_manifest_dir() -> Option<String> {
    std::env::var("CARGO_MANIFEST_DIR").ok()
}

// --- Timeouts ---

pub fn timeout_ipc_ms() -> Option<Duration> {
    parse_duration_ms("ORC_TIMEOUT_IPC_MS")
}
pub fn timeout_connect_ms() -> Option<Duration> {
    parse_duration_ms("ORC_TIMEOUT_CONNECT_MS")
}
pub fn timeout_exit_ms() -> Option<Duration> {
    parse_duration_ms("ORC_TIMEOUT_EXIT_MS")
}
pub fn connect_poll_ms() -> Option<Duration> {
    parse_duration_ms("ORC_CONNECT_POLL_MS")
}
pub fn wait_poll_ms() -> Option<Duration> {
    parse_duration_ms("ORC_WAIT_POLL_MS")
}
pub fn run_wait_ms() -> Option<Duration> {
    parse_duration_ms("ORC_RUN_WAIT_MS")
}
