//! Capacity breach: the 11th concurrently active worker is rejected and no
//! new worktree is created for it.

use crate::prelude::*;

#[test]
fn eleventh_spawn_is_rejected_with_capacity_exceeded() {
    let project = Project::empty();
    project.git_init();
    project.agent_script("#!/bin/sh\nsleep 30\n");
    project.commit_all("add agent");

    for i in 0..10 {
        project
            .orc()
            .args(&[
                "worker",
                "spawn",
                &project.path().display().to_string(),
                &format!("w{i}"),
                "--base-revision",
                "master",
            ])
            .passes();
    }

    let before = project
        .orc()
        .args(&["worktree", "list", &project.path().display().to_string(), "-o", "json"])
        .passes()
        .json()
        .as_array()
        .unwrap()
        .len();
    assert_eq!(before, 10);

    let rejected = project
        .orc()
        .args(&[
            "worker",
            "spawn",
            &project.path().display().to_string(),
            "overflow",
            "--base-revision",
            "master",
        ])
        .fails();
    assert!(
        rejected.stderr().contains("capacity"),
        "expected a capacity_exceeded rejection, got: {}",
        rejected.stderr()
    );

    let after = project
        .orc()
        .args(&["worktree", "list", &project.path().display().to_string(), "-o", "json"])
        .passes()
        .json()
        .as_array()
        .unwrap()
        .len();
    assert_eq!(after, 10, "rejected spawn should not create a worktree");
}
