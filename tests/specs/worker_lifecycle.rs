//! Single spawn through natural completion: a worker whose process exits 0
//! should move pending -> active -> completed and leave a retrievable diff.

use crate::prelude::*;

#[test]
fn spawn_runs_to_completion_and_diff_is_retrievable() {
    let project = Project::empty();
    project.git_init();
    project.agent_script("#!/bin/sh\necho 'hello' > output.txt\nsleep 1\nexit 0\n");
    project.commit_all("add agent");

    let ids = project
        .orc()
        .args(&["worker", "spawn", &project.path().display().to_string(), "w1", "--base-revision", "master"])
        .passes()
        .json();
    let id = ids[0].as_str().unwrap().to_string();

    let completed = wait_for(5_000, || {
        let worker = project
            .orc()
            .args(&["worker", "show", &id, "-o", "json"])
            .passes()
            .json();
        worker["status"] == "completed"
    });
    assert!(completed, "worker did not complete\n{}", project.daemon_log());

    let worker = project
        .orc()
        .args(&["worker", "show", &id, "-o", "json"])
        .passes()
        .json();
    let worktree_path = worker["worktree_path"].as_str().unwrap().to_string();

    let files = project
        .orc()
        .args(&["worktree", "diff", &worktree_path, "--base-revision", "master"])
        .passes()
        .json();
    let paths: Vec<&str> = files
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["path"].as_str().unwrap())
        .collect();
    assert!(paths.contains(&"output.txt"), "expected output.txt in diff, got {paths:?}");
}
