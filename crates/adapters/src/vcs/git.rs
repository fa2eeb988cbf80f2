// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git-backed VCS adapter: worktrees as isolated working copies.

use super::{DiffHunk, ExportOutcome, FileDiff, VcsAdapter, VcsError, WorktreeInfo};
use crate::subprocess::{run_with_timeout, GIT_WORKTREE_TIMEOUT};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::Command;

/// Git CLI-backed [`VcsAdapter`].
///
/// Serializes all index-mutating operations (worktree add/remove, commit)
/// per project path so concurrent callers don't race the repository's
/// `.git/index` or its worktree administrative files.
#[derive(Clone, Default)]
pub struct GitVcsAdapter {
    locks: Arc<Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>>,
}

impl GitVcsAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    fn project_lock(&self, project: &Path) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .entry(project.to_path_buf())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

#[async_trait]
impl VcsAdapter for GitVcsAdapter {
    async fn create_worktree(
        &self,
        project: &Path,
        path: &Path,
        branch: &str,
        base_revision: &str,
    ) -> Result<(), VcsError> {
        let lock = self.project_lock(project);
        let _guard = lock.lock().await;

        let branch_exists = Command::new("git")
            .args(["-C"])
            .arg(project)
            .args(["rev-parse", "--verify", "--quiet", branch])
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false);

        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(project).arg("worktree").arg("add");
        if branch_exists {
            cmd.arg(path).arg(branch);
        } else {
            cmd.args(["-b", branch]).arg(path).arg(base_revision);
        }

        let output = run_with_timeout(cmd, GIT_WORKTREE_TIMEOUT, "git worktree add")
            .await
            .map_err(VcsError::CreateFailed)?;

        if !output.status.success() {
            return Err(VcsError::CreateFailed(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }
        Ok(())
    }

    async fn remove_worktree(&self, project: &Path, path: &Path) -> Result<(), VcsError> {
        let lock = self.project_lock(project);
        let _guard = lock.lock().await;

        let mut cmd = Command::new("git");
        cmd.arg("-C")
            .arg(project)
            .args(["worktree", "remove", "--force"])
            .arg(path);

        let output = run_with_timeout(cmd, GIT_WORKTREE_TIMEOUT, "git worktree remove")
            .await
            .map_err(VcsError::RemoveFailed)?;

        if !output.status.success() {
            tracing::warn!(
                path = %path.display(),
                stderr = %String::from_utf8_lossy(&output.stderr),
                "worktree remove failed (may already be gone)"
            );
        }

        let mut prune = Command::new("git");
        prune.arg("-C").arg(project).args(["worktree", "prune"]);
        let _ = run_with_timeout(prune, GIT_WORKTREE_TIMEOUT, "git worktree prune").await;

        Ok(())
    }

    async fn list_worktrees(&self, project: &Path) -> Result<Vec<WorktreeInfo>, VcsError> {
        let mut cmd = Command::new("git");
        cmd.arg("-C")
            .arg(project)
            .args(["worktree", "list", "--porcelain"]);

        let output = run_with_timeout(cmd, GIT_WORKTREE_TIMEOUT, "git worktree list")
            .await
            .map_err(VcsError::DiffFailed)?;

        if !output.status.success() {
            return Err(VcsError::DiffFailed(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }

        Ok(parse_worktree_list(&String::from_utf8_lossy(
            &output.stdout,
        )))
    }

    async fn diff(&self, worktree: &Path, base_revision: &str) -> Result<Vec<FileDiff>, VcsError> {
        let mut cmd = Command::new("git");
        cmd.arg("-C")
            .arg(worktree)
            .args(["diff", "--unified=0", "--no-color"])
            .arg(base_revision);

        let output = run_with_timeout(cmd, GIT_WORKTREE_TIMEOUT, "git diff")
            .await
            .map_err(VcsError::DiffFailed)?;

        if !output.status.success() {
            return Err(VcsError::DiffFailed(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }

        let mut files = parse_unified_diff(&String::from_utf8_lossy(&output.stdout));
        for file in &mut files {
            if !file.deleted {
                file.content = std::fs::read_to_string(worktree.join(&file.path)).ok();
            }
        }
        Ok(files)
    }

    async fn export(
        &self,
        project: &Path,
        path: &Path,
        base_revision: &str,
        files: &[(PathBuf, PathBuf, Option<String>)],
        message: &str,
    ) -> Result<ExportOutcome, VcsError> {
        let lock = self.project_lock(project);
        let _guard = lock.lock().await;

        self.create_worktree(project, path, "orc-export-scratch", base_revision)
            .await
            .or_else(|_| Ok::<(), VcsError>(()))?;

        let mut failed: Vec<(PathBuf, String)> = Vec::new();
        for (rel_path, source_worktree, manual_content) in files {
            if let Err(e) = apply_one_file(path, rel_path, source_worktree, manual_content.as_deref()) {
                failed.push((rel_path.clone(), e));
            }
        }

        if failed.len() == files.len() && !files.is_empty() {
            return Err(VcsError::CommitFailed(
                "every file in the merge plan failed to apply".to_string(),
            ));
        }

        let mut add_cmd = Command::new("git");
        add_cmd.arg("-C").arg(path).args(["add", "-A"]);
        let add_output = run_with_timeout(add_cmd, GIT_WORKTREE_TIMEOUT, "git add")
            .await
            .map_err(VcsError::CommitFailed)?;
        if !add_output.status.success() {
            return Err(VcsError::CommitFailed(
                String::from_utf8_lossy(&add_output.stderr).to_string(),
            ));
        }

        let mut commit_cmd = Command::new("git");
        commit_cmd
            .arg("-C")
            .arg(path)
            .args(["commit", "-m"])
            .arg(message);
        let commit_output = run_with_timeout(commit_cmd, GIT_WORKTREE_TIMEOUT, "git commit")
            .await
            .map_err(VcsError::CommitFailed)?;
        if !commit_output.status.success() {
            return Err(VcsError::CommitFailed(
                String::from_utf8_lossy(&commit_output.stderr).to_string(),
            ));
        }

        let mut rev_parse = Command::new("git");
        rev_parse.arg("-C").arg(path).args(["rev-parse", "HEAD"]);
        let rev_output = run_with_timeout(rev_parse, GIT_WORKTREE_TIMEOUT, "git rev-parse")
            .await
            .map_err(VcsError::CommitFailed)?;
        if !rev_output.status.success() {
            return Err(VcsError::CommitFailed(
                String::from_utf8_lossy(&rev_output.stderr).to_string(),
            ));
        }

        Ok(ExportOutcome {
            commit_id: String::from_utf8_lossy(&rev_output.stdout).trim().to_string(),
            failed,
        })
    }
}

fn apply_one_file(
    scratch: &Path,
    rel_path: &Path,
    source_worktree: &Path,
    manual_content: Option<&str>,
) -> Result<(), String> {
    let dest = scratch.join(rel_path);
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }
    match manual_content {
        Some(content) => std::fs::write(&dest, content).map_err(|e| e.to_string()),
        None => {
            let src = source_worktree.join(rel_path);
            std::fs::copy(&src, &dest).map(|_| ()).map_err(|e| e.to_string())
        }
    }
}

fn parse_worktree_list(raw: &str) -> Vec<WorktreeInfo> {
    let mut out = Vec::new();
    let mut path: Option<PathBuf> = None;
    let mut branch: Option<String> = None;

    for line in raw.lines() {
        if let Some(p) = line.strip_prefix("worktree ") {
            if let (Some(p0), Some(b0)) = (path.take(), branch.take()) {
                out.push(WorktreeInfo { path: p0, branch: b0 });
            }
            path = Some(PathBuf::from(p));
        } else if let Some(b) = line.strip_prefix("branch ") {
            branch = Some(
                b.strip_prefix("refs/heads/")
                    .unwrap_or(b)
                    .to_string(),
            );
        } else if line.is_empty() {
            if let (Some(p0), Some(b0)) = (path.take(), branch.take()) {
                out.push(WorktreeInfo { path: p0, branch: b0 });
            }
        }
    }
    if let (Some(p0), Some(b0)) = (path, branch) {
        out.push(WorktreeInfo { path: p0, branch: b0 });
    }
    out
}

/// Parses a `git diff --unified=0` stream into per-file hunks.
///
/// Sufficient for Consolidator conflict detection (line ranges, add/remove
/// counts); does not reconstruct full hunk bodies.
fn parse_unified_diff(raw: &str) -> Vec<FileDiff> {
    let mut files = Vec::new();
    let mut current: Option<FileDiff> = None;

    for line in raw.lines() {
        if let Some(rest) = line.strip_prefix("diff --git ") {
            if let Some(f) = current.take() {
                files.push(f);
            }
            let path = rest
                .split(" b/")
                .nth(1)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(rest));
            current = Some(FileDiff {
                path,
                deleted: false,
                added: false,
                hunks: Vec::new(),
                content: None,
            });
        } else if line.starts_with("deleted file mode") {
            if let Some(f) = current.as_mut() {
                f.deleted = true;
            }
        } else if line.starts_with("new file mode") {
            if let Some(f) = current.as_mut() {
                f.added = true;
            }
        } else if let Some(rest) = line.strip_prefix("@@ ") {
            if let Some(f) = current.as_mut() {
                if let Some(hunk) = parse_hunk_header(rest) {
                    f.hunks.push(hunk);
                }
            }
        }
    }
    if let Some(f) = current.take() {
        files.push(f);
    }
    files
}

fn parse_hunk_header(rest: &str) -> Option<DiffHunk> {
    // rest looks like "-12,3 +14,5 @@ ..."
    let new_part = rest.split(" @@").next()?;
    let plus = new_part.split_whitespace().find(|s| s.starts_with('+'))?;
    let spec = plus.trim_start_matches('+');
    let mut parts = spec.splitn(2, ',');
    let start_line: u32 = parts.next()?.parse().ok()?;
    let line_count: u32 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(1);

    let minus = new_part.split_whitespace().find(|s| s.starts_with('-'))?;
    let minus_spec = minus.trim_start_matches('-');
    let mut minus_parts = minus_spec.splitn(2, ',');
    let _old_start: u32 = minus_parts.next()?.parse().ok()?;
    let removed: u32 = minus_parts.next().and_then(|s| s.parse().ok()).unwrap_or(1);

    Some(DiffHunk {
        start_line,
        line_count,
        added: line_count,
        removed,
    })
}

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;
