//! Test helpers for behavioral specifications.
//!
//! Provides a high-level DSL for testing `orc` CLI behavior end to end
//! against a real `orcd` daemon.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

// Aggressive timeouts for fast tests.
//
// IMPORTANT:
//   Do NOT change these.
//   File a performance bug instead.
const ORC_TIMEOUT_CONNECT_MS: &str = "2000";
const ORC_TIMEOUT_EXIT_MS: &str = "500";
const ORC_TIMEOUT_IPC_MS: &str = "2000";
const ORC_CONNECT_POLL_MS: &str = "5";

// Spec polling timeouts
pub const SPEC_POLL_INTERVAL_MS: u64 = 10;
pub const SPEC_WAIT_MAX_MS: u64 = 2000;

/// Returns the path to a binary, checking llvm-cov target directory first.
/// This works with both standard builds and llvm-cov coverage runs. Falls
/// back to resolving relative to the test binary itself when
/// `CARGO_MANIFEST_DIR` is stale.
fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let llvm_cov_path = manifest_dir.join("target/llvm-cov-target/debug").join(name);
    if llvm_cov_path.exists() {
        return llvm_cov_path;
    }

    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

/// Returns the path to the `orc` binary.
fn orc_binary() -> PathBuf {
    binary_path("orc")
}

/// Returns the path to the `orcd` daemon binary.
pub fn orcd_binary() -> PathBuf {
    binary_path("orcd")
}

/// Returns a Command configured to run the `orc` binary.
pub fn orc_cmd() -> Command {
    Command::new(orc_binary())
}

/// Create a CLI builder for `orc` commands.
pub fn cli() -> CliBuilder {
    CliBuilder::new()
}

/// High-level CLI builder for fluent test assertions.
pub struct CliBuilder {
    args: Vec<String>,
    dir: Option<PathBuf>,
    envs: Vec<(String, String)>,
}

impl CliBuilder {
    fn new() -> Self {
        Self {
            args: Vec::new(),
            dir: None,
            envs: vec![
                (
                    "ORC_DAEMON_BINARY".into(),
                    orcd_binary().to_string_lossy().into(),
                ),
                ("ORC_TIMEOUT_CONNECT_MS".into(), ORC_TIMEOUT_CONNECT_MS.into()),
                ("ORC_TIMEOUT_EXIT_MS".into(), ORC_TIMEOUT_EXIT_MS.into()),
                ("ORC_TIMEOUT_IPC_MS".into(), ORC_TIMEOUT_IPC_MS.into()),
                ("ORC_CONNECT_POLL_MS".into(), ORC_CONNECT_POLL_MS.into()),
            ],
        }
    }

    /// Add CLI arguments.
    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    /// Set working directory.
    pub fn pwd(mut self, path: impl Into<PathBuf>) -> Self {
        self.dir = Some(path.into());
        self
    }

    /// Set environment variable.
    pub fn env(mut self, key: &str, value: impl AsRef<Path>) -> Self {
        self.envs.push((
            key.to_string(),
            value.as_ref().to_string_lossy().to_string(),
        ));
        self
    }

    /// Build the command without running it.
    pub fn command(self) -> Command {
        let mut cmd = orc_cmd();
        cmd.args(&self.args);

        if let Some(dir) = self.dir {
            cmd.current_dir(dir);
        }

        for (key, value) in self.envs {
            cmd.env(key, value);
        }

        cmd
    }

    /// Run and expect success (exit code 0).
    pub fn passes(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("command should run");
        assert!(
            output.status.success(),
            "expected command to pass, got exit code {:?}\nstdout: {}\nstderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }

    /// Run and expect failure (non-zero exit code).
    pub fn fails(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("command should run");
        assert!(
            !output.status.success(),
            "expected command to fail, but it passed\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }

    /// Run and return whatever happened, without asserting on exit status.
    pub fn run(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("command should run");
        RunAssert { output }
    }
}

/// Result of a CLI run for chaining assertions.
pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    /// Get stdout as string.
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    /// Get stderr as string.
    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    /// Parse stdout as JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.stdout())
            .unwrap_or_else(|e| panic!("stdout is not valid JSON: {e}\nstdout: {}", self.stdout()))
    }

    /// Assert stdout equals expected exactly (with diff on failure).
    pub fn stdout_eq(self, expected: &str) -> Self {
        let stdout = self.stdout();
        similar_asserts::assert_eq!(stdout, expected);
        self
    }

    /// Assert stdout contains substring.
    pub fn stdout_has(self, expected: &str) -> Self {
        let stdout = self.stdout();
        assert!(
            stdout.contains(expected),
            "stdout does not contain '{}'\nstdout: {}",
            expected,
            stdout
        );
        self
    }

    /// Assert stderr contains substring.
    pub fn stderr_has(self, expected: &str) -> Self {
        let stderr = self.stderr();
        assert!(
            stderr.contains(expected),
            "stderr does not contain '{}'\nstderr: {}",
            expected,
            stderr
        );
        self
    }
}

// =============================================================================
// Polling
// =============================================================================

/// Poll a condition until it returns true or timeout is reached.
/// Uses aggressive polling for fast tests.
pub fn wait_for<F>(timeout_ms: u64, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_millis(timeout_ms);
    let poll_interval = std::time::Duration::from_millis(SPEC_POLL_INTERVAL_MS);

    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(poll_interval);
    }
    false
}

// =============================================================================
// Project
// =============================================================================

/// Temporary test project directory with helper methods.
///
/// Each project gets its own isolated `ORC_CONFIG_DIR` so daemons spawned
/// by different tests never share a socket, lock, or log file.
pub struct Project {
    dir: tempfile::TempDir,
    config_dir: tempfile::TempDir,
}

impl Project {
    /// Create an empty project.
    pub fn empty() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            config_dir: tempfile::tempdir().unwrap(),
        }
    }

    /// Get the project path.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Initialize a git repository with a default identity, an initial
    /// commit, and a `master` branch.
    pub fn git_init(&self) {
        for args in [
            vec!["init", "-b", "master"],
            vec!["config", "user.email", "worker@example.com"],
            vec!["config", "user.name", "Test Worker"],
        ] {
            Command::new("git")
                .args(&args)
                .current_dir(self.path())
                .stdout(std::process::Stdio::null())
                .stderr(std::process::Stdio::null())
                .status()
                .expect("git config should work");
        }
        self.file("README.md", "seed\n");
        self.commit_all("initial commit");
    }

    /// Write a file at the given path (parent directories created
    /// automatically).
    pub fn file(&self, path: impl AsRef<Path>, content: &str) {
        let full_path = self.dir.path().join(path.as_ref());
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full_path, content).unwrap();
    }

    /// Write an executable file that acts as the worker entrypoint. Every
    /// spawned worker's worktree carries the project's tracked files on
    /// `PATH`, so a script committed here as `agent` is what the
    /// supervisor actually executes.
    pub fn agent_script(&self, content: &str) {
        self.file("agent", content);
        let path = self.dir.path().join("agent");
        set_executable(&path);
    }

    pub fn commit_all(&self, message: &str) {
        Command::new("git")
            .args(["add", "-A"])
            .current_dir(self.path())
            .status()
            .expect("git add should work");
        Command::new("git")
            .args(["commit", "-m", message])
            .current_dir(self.path())
            .stdout(std::process::Stdio::null())
            .status()
            .expect("git commit should work");
    }

    /// Get the isolated config directory path.
    pub fn config_path(&self) -> &Path {
        self.config_dir.path()
    }

    /// Run an `orc` command in this project's context.
    pub fn orc(&self) -> CliBuilder {
        cli().env("ORC_CONFIG_DIR", self.config_path())
    }

    /// Read the daemon log file contents (for debugging test failures).
    pub fn daemon_log(&self) -> String {
        let log_path = self.config_path().join("orchestrator.log");
        std::fs::read_to_string(&log_path).unwrap_or_else(|_| "(no daemon log)".to_string())
    }
}

impl Drop for Project {
    fn drop(&mut self) {
        let mut cmd = self.orc().args(&["daemon", "stop", "--kill"]).command();
        cmd.stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null());
        let _ = cmd.status();
    }
}

#[cfg(unix)]
fn set_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms).unwrap();
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) {}
