// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake VCS adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ExportOutcome, FileDiff, VcsAdapter, VcsError, WorktreeInfo};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum VcsCall {
    CreateWorktree {
        path: PathBuf,
        branch: String,
        base_revision: String,
    },
    RemoveWorktree {
        path: PathBuf,
    },
    Diff {
        worktree: PathBuf,
        base_revision: String,
    },
    Export {
        path: PathBuf,
        message: String,
    },
}

struct FakeVcsState {
    worktrees: HashMap<PathBuf, WorktreeInfo>,
    diffs: HashMap<PathBuf, Vec<FileDiff>>,
    calls: Vec<VcsCall>,
    fail_create: bool,
    export_commit_id: String,
    export_failures: Vec<PathBuf>,
}

/// Fake VCS adapter for testing. Diffs are pre-seeded via [`FakeVcsAdapter::set_diff`].
#[derive(Clone)]
pub struct FakeVcsAdapter {
    inner: Arc<Mutex<FakeVcsState>>,
}

impl Default for FakeVcsAdapter {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeVcsState {
                worktrees: HashMap::new(),
                diffs: HashMap::new(),
                calls: Vec::new(),
                fail_create: false,
                export_commit_id: "fake-commit-0".to_string(),
                export_failures: Vec::new(),
            })),
        }
    }
}

impl FakeVcsAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<VcsCall> {
        self.inner.lock().calls.clone()
    }

    pub fn set_diff(&self, worktree: &Path, diff: Vec<FileDiff>) {
        self.inner.lock().diffs.insert(worktree.to_path_buf(), diff);
    }

    pub fn fail_next_create(&self) {
        self.inner.lock().fail_create = true;
    }

    pub fn set_export_commit_id(&self, id: impl Into<String>) {
        self.inner.lock().export_commit_id = id.into();
    }

    /// Make `export` report `path` as a per-file failure on its next call.
    pub fn fail_export_path(&self, path: &Path) {
        self.inner.lock().export_failures.push(path.to_path_buf());
    }
}

#[async_trait]
impl VcsAdapter for FakeVcsAdapter {
    async fn create_worktree(
        &self,
        _project: &Path,
        path: &Path,
        branch: &str,
        base_revision: &str,
    ) -> Result<(), VcsError> {
        let mut inner = self.inner.lock();
        inner.calls.push(VcsCall::CreateWorktree {
            path: path.to_path_buf(),
            branch: branch.to_string(),
            base_revision: base_revision.to_string(),
        });
        if inner.fail_create {
            inner.fail_create = false;
            return Err(VcsError::CreateFailed("fake failure".to_string()));
        }
        inner.worktrees.insert(
            path.to_path_buf(),
            WorktreeInfo {
                path: path.to_path_buf(),
                branch: branch.to_string(),
            },
        );
        Ok(())
    }

    async fn remove_worktree(&self, _project: &Path, path: &Path) -> Result<(), VcsError> {
        let mut inner = self.inner.lock();
        inner.calls.push(VcsCall::RemoveWorktree {
            path: path.to_path_buf(),
        });
        inner.worktrees.remove(path);
        Ok(())
    }

    async fn list_worktrees(&self, _project: &Path) -> Result<Vec<WorktreeInfo>, VcsError> {
        Ok(self.inner.lock().worktrees.values().cloned().collect())
    }

    async fn diff(&self, worktree: &Path, base_revision: &str) -> Result<Vec<FileDiff>, VcsError> {
        let mut inner = self.inner.lock();
        inner.calls.push(VcsCall::Diff {
            worktree: worktree.to_path_buf(),
            base_revision: base_revision.to_string(),
        });
        Ok(inner.diffs.get(worktree).cloned().unwrap_or_default())
    }

    async fn export(
        &self,
        _project: &Path,
        path: &Path,
        _base_revision: &str,
        files: &[(PathBuf, PathBuf, Option<String>)],
        message: &str,
    ) -> Result<ExportOutcome, VcsError> {
        let mut inner = self.inner.lock();
        inner.calls.push(VcsCall::Export {
            path: path.to_path_buf(),
            message: message.to_string(),
        });
        let failed: Vec<(PathBuf, String)> = files
            .iter()
            .filter(|(rel_path, ..)| inner.export_failures.contains(rel_path))
            .map(|(rel_path, ..)| (rel_path.clone(), "fake export failure".to_string()))
            .collect();
        inner.export_failures.clear();
        Ok(ExportOutcome {
            commit_id: inner.export_commit_id.clone(),
            failed,
        })
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
