// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OS-process-backed [`ProcessAdapter`].

use super::{child_env, ExitStatus, OutputLine, ProcessAdapter, ProcessError, ProcessSpawnConfig};
use async_trait::async_trait;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;

struct TrackedChild {
    pid: u32,
    stdin: Option<ChildStdin>,
}

/// Spawns real child processes via [`tokio::process::Command`].
#[derive(Clone, Default)]
pub struct NativeProcessAdapter {
    children: Arc<Mutex<HashMap<String, TrackedChild>>>,
}

impl NativeProcessAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProcessAdapter for NativeProcessAdapter {
    async fn spawn(
        &self,
        config: ProcessSpawnConfig,
        output_tx: mpsc::Sender<OutputLine>,
        exit_tx: mpsc::Sender<ExitStatus>,
    ) -> Result<u32, ProcessError> {
        let env = child_env(
            std::env::vars(),
            &config.env,
            &config.worker_id,
            &config.cwd,
        );

        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .current_dir(&config.cwd)
            .env_clear()
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child: Child = cmd
            .spawn()
            .map_err(|e| ProcessError::SpawnFailed(e.to_string()))?;

        let pid = child
            .id()
            .ok_or_else(|| ProcessError::SpawnFailed("child exited immediately".to_string()))?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        self.children.lock().insert(
            config.worker_id.clone(),
            TrackedChild { pid, stdin },
        );

        if let Some(stdout) = stdout {
            let tx = output_tx.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if tx.send(OutputLine::Stdout(line)).await.is_err() {
                        break;
                    }
                }
            });
        }

        if let Some(stderr) = stderr {
            let tx = output_tx.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if tx.send(OutputLine::Stderr(line)).await.is_err() {
                        break;
                    }
                }
            });
        }

        let children = self.children.clone();
        let worker_id = config.worker_id.clone();
        tokio::spawn(async move {
            let status = child.wait().await;
            children.lock().remove(&worker_id);
            let exit = match status {
                Ok(status) => ExitStatus {
                    code: status.code(),
                    #[cfg(unix)]
                    signal: {
                        use std::os::unix::process::ExitStatusExt;
                        status.signal()
                    },
                    #[cfg(not(unix))]
                    signal: None,
                },
                Err(_) => ExitStatus {
                    code: None,
                    signal: None,
                },
            };
            let _ = exit_tx.send(exit).await;
        });

        Ok(pid)
    }

    async fn send(&self, worker_id: &str, payload: &str) -> Result<(), ProcessError> {
        let stdin = {
            let mut children = self.children.lock();
            let entry = children
                .get_mut(worker_id)
                .ok_or_else(|| ProcessError::NotFound(worker_id.to_string()))?;
            entry.stdin.take()
        };
        let Some(mut stdin) = stdin else {
            return Err(ProcessError::NoStdin);
        };

        let mut line = payload.to_string();
        line.push('\n');
        let result = stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| ProcessError::SendFailed(e.to_string()));

        if let Some(entry) = self.children.lock().get_mut(worker_id) {
            entry.stdin = Some(stdin);
        }
        result
    }

    async fn signal_graceful(&self, worker_id: &str) -> Result<(), ProcessError> {
        self.send_signal(worker_id, Signal::SIGTERM)
    }

    async fn signal_forceful(&self, worker_id: &str) -> Result<(), ProcessError> {
        self.send_signal(worker_id, Signal::SIGKILL)
    }

    async fn is_alive(&self, worker_id: &str) -> bool {
        self.children.lock().contains_key(worker_id)
    }
}

impl NativeProcessAdapter {
    fn send_signal(&self, worker_id: &str, sig: Signal) -> Result<(), ProcessError> {
        let pid = {
            let children = self.children.lock();
            children
                .get(worker_id)
                .map(|c| c.pid)
                .ok_or_else(|| ProcessError::NotFound(worker_id.to_string()))?
        };
        signal::kill(Pid::from_raw(pid as i32), sig)
            .map_err(|e| ProcessError::SignalFailed(e.to_string()))
    }
}

#[cfg(test)]
#[path = "native_tests.rs"]
mod tests;
