//! Memory kill: a worker whose process exceeds the configured memory
//! ceiling is terminated by the Resource Monitor within a few seconds.

use crate::prelude::*;

#[test]
fn worker_exceeding_memory_limit_is_terminated() {
    let project = Project::empty();
    project.git_init();
    project.agent_script(
        "#!/bin/sh\npython3 -c 'b = bytearray(120 * 1024 * 1024); import time; time.sleep(20)'\n",
    );
    project.commit_all("add agent");

    let ids = project
        .orc()
        .env("ORC_MEMORY_LIMIT_BYTES", "50000000")
        .env("ORC_MONITOR_SAMPLE_INTERVAL_SECS", "1")
        .args(&["worker", "spawn", &project.path().display().to_string(), "hog", "--base-revision", "master"])
        .passes()
        .json();
    let id = ids[0].as_str().unwrap().to_string();

    let failed = wait_for(5_000, || {
        let worker = project
            .orc()
            .args(&["worker", "show", &id, "-o", "json"])
            .passes()
            .json();
        worker["status"] == "failed" || worker["status"] == "terminating"
    });
    assert!(failed, "worker was not terminated for exceeding memory limit\n{}", project.daemon_log());

    let worker = project
        .orc()
        .args(&["worker", "show", &id, "-o", "json"])
        .passes()
        .json();
    assert_eq!(
        worker["termination_reason"], "memory_limit",
        "expected termination_reason memory_limit, got {worker}"
    );
}
