// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Version-control adapters: working-copy (worktree) lifecycle and diffing.

mod git;

pub use git::GitVcsAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeVcsAdapter, VcsCall};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from VCS operations.
#[derive(Debug, Error)]
pub enum VcsError {
    #[error("worktree creation failed: {0}")]
    CreateFailed(String),
    #[error("worktree removal failed: {0}")]
    RemoveFailed(String),
    #[error("diff failed: {0}")]
    DiffFailed(String),
    #[error("commit failed: {0}")]
    CommitFailed(String),
    #[error("not a worktree: {0}")]
    NotFound(String),
}

/// A single hunk in a unified diff against a known base revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffHunk {
    pub start_line: u32,
    pub line_count: u32,
    pub added: u32,
    pub removed: u32,
}

/// Per-file diff against the base revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDiff {
    pub path: PathBuf,
    pub deleted: bool,
    pub added: bool,
    pub hunks: Vec<DiffHunk>,
    pub content: Option<String>,
}

/// A worktree owned by a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorktreeInfo {
    pub path: PathBuf,
    pub branch: String,
}

/// Result of applying a merge plan: the commit produced, plus any path that
/// failed to apply (§4.F Export continues past per-file failures).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportOutcome {
    pub commit_id: String,
    pub failed: Vec<(PathBuf, String)>,
}

/// Adapter for creating and tearing down isolated working copies, and for
/// computing diffs/exporting a merge plan onto a fresh checkout.
///
/// Implementations must serialize index-mutating calls (create, remove,
/// commit) per project so concurrent Supervisor/Consolidator calls don't
/// race the VCS index.
#[async_trait]
pub trait VcsAdapter: Clone + Send + Sync + 'static {
    /// Create a new working copy at `path` on `branch`, starting from
    /// `base_revision`. Creates `branch` if it does not already exist.
    async fn create_worktree(
        &self,
        project: &Path,
        path: &Path,
        branch: &str,
        base_revision: &str,
    ) -> Result<(), VcsError>;

    /// Remove a previously created working copy.
    async fn remove_worktree(&self, project: &Path, path: &Path) -> Result<(), VcsError>;

    /// List worktrees currently registered against `project`.
    async fn list_worktrees(&self, project: &Path) -> Result<Vec<WorktreeInfo>, VcsError>;

    /// Unified diff of `worktree` against `base_revision`.
    async fn diff(
        &self,
        worktree: &Path,
        base_revision: &str,
    ) -> Result<Vec<FileDiff>, VcsError>;

    /// Check out `base_revision` into a fresh scratch worktree at `path`,
    /// apply `files` (path -> (source worktree, optional manual content)),
    /// commit with `message`, and return the new commit id. A single file
    /// failing to apply is recorded in [`ExportOutcome::failed`] rather than
    /// aborting the whole export; the call only returns `Err` when no file
    /// could be applied at all.
    async fn export(
        &self,
        project: &Path,
        path: &Path,
        base_revision: &str,
        files: &[(PathBuf, PathBuf, Option<String>)],
        message: &str,
    ) -> Result<ExportOutcome, VcsError>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
