// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;
use std::time::Duration;

fn config(worker_id: &str, command: &str, args: &[&str]) -> ProcessSpawnConfig {
    ProcessSpawnConfig {
        worker_id: worker_id.to_string(),
        command: command.to_string(),
        args: args.iter().map(|s| s.to_string()).collect(),
        cwd: std::env::temp_dir(),
        env: HashMap::new(),
    }
}

#[tokio::test]
async fn spawn_streams_stdout_and_reports_exit() {
    let adapter = NativeProcessAdapter::new();
    let (out_tx, mut out_rx) = mpsc::channel(16);
    let (exit_tx, mut exit_rx) = mpsc::channel(1);

    let pid = adapter
        .spawn(
            config("w1", "sh", &["-c", "echo hello"]),
            out_tx,
            exit_tx,
        )
        .await
        .expect("spawn should succeed");
    assert!(pid > 0);

    let line = tokio::time::timeout(Duration::from_secs(5), out_rx.recv())
        .await
        .expect("should receive output before timeout")
        .expect("channel should not close early");
    assert!(matches!(line, OutputLine::Stdout(s) if s == "hello"));

    let exit = tokio::time::timeout(Duration::from_secs(5), exit_rx.recv())
        .await
        .expect("should receive exit before timeout")
        .expect("exit channel should not close early");
    assert!(exit.success());
}

#[tokio::test]
async fn send_fails_for_unknown_worker() {
    let adapter = NativeProcessAdapter::new();
    let result = adapter.send("missing", "payload").await;
    assert!(matches!(result, Err(ProcessError::NotFound(_))));
}

#[tokio::test]
async fn signal_fails_for_unknown_worker() {
    let adapter = NativeProcessAdapter::new();
    let result = adapter.signal_graceful("missing").await;
    assert!(matches!(result, Err(ProcessError::NotFound(_))));
}

#[tokio::test]
async fn is_alive_reflects_tracked_children() {
    let adapter = NativeProcessAdapter::new();
    let (out_tx, _out_rx) = mpsc::channel(16);
    let (exit_tx, mut exit_rx) = mpsc::channel(1);

    adapter
        .spawn(config("w2", "sh", &["-c", "sleep 0"]), out_tx, exit_tx)
        .await
        .expect("spawn should succeed");

    let _ = tokio::time::timeout(Duration::from_secs(5), exit_rx.recv()).await;
    assert!(!adapter.is_alive("w2").await);
}
