// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn fake_adapter_tracks_worktree_lifecycle() {
    let vcs = FakeVcsAdapter::new();
    let project = PathBuf::from("/repo");
    let wt = PathBuf::from("/repo/.orch/worktrees/w1");

    vcs.create_worktree(&project, &wt, "agent/w1", "main")
        .await
        .expect("create should succeed");
    assert_eq!(vcs.list_worktrees(&project).await.unwrap().len(), 1);

    vcs.remove_worktree(&project, &wt).await.unwrap();
    assert_eq!(vcs.list_worktrees(&project).await.unwrap().len(), 0);
}

#[tokio::test]
async fn fake_adapter_can_be_made_to_fail_create() {
    let vcs = FakeVcsAdapter::new();
    vcs.fail_next_create();
    let result = vcs
        .create_worktree(
            Path::new("/repo"),
            Path::new("/repo/wt"),
            "agent/x",
            "main",
        )
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn fake_adapter_returns_seeded_diff() {
    let vcs = FakeVcsAdapter::new();
    let wt = PathBuf::from("/repo/wt");
    vcs.set_diff(
        &wt,
        vec![FileDiff {
            path: PathBuf::from("a.rs"),
            deleted: false,
            added: false,
            hunks: vec![DiffHunk {
                start_line: 1,
                line_count: 2,
                added: 2,
                removed: 0,
            }],
            content: None,
        }],
    );
    let diffs = vcs.diff(&wt, "main").await.unwrap();
    assert_eq!(diffs.len(), 1);
    assert_eq!(diffs[0].path, PathBuf::from("a.rs"));
}
