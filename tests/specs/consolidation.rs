//! Battle-royale consolidation: five workers each touch the same lines of
//! the same file. Analysis should surface a same-line conflict for every
//! pair, and resolving them all onto one worker's copy should export a
//! single clean merge commit.

use crate::prelude::*;
use std::process::Command;
use std::process::Stdio;

const WORKER_COUNT: usize = 5;

#[test]
fn five_way_collision_resolves_to_one_workers_copy_and_exports() {
    let project = Project::empty();
    project.git_init();
    project.agent_script("#!/bin/sh\nsleep 30\n");
    project.commit_all("add agent");

    let mut worker_ids = Vec::new();
    for i in 0..WORKER_COUNT {
        let ids = project
            .orc()
            .args(&[
                "worker",
                "spawn",
                &project.path().display().to_string(),
                &format!("w{i}"),
                "--base-revision",
                "master",
            ])
            .passes()
            .json();
        worker_ids.push(ids[0].as_str().unwrap().to_string());
    }

    let mut participants = Vec::new();
    for (i, id) in worker_ids.iter().enumerate() {
        let worker = project
            .orc()
            .args(&["worker", "show", id, "-o", "json"])
            .passes()
            .json();
        let worktree = worker["worktree_path"].as_str().unwrap().to_string();
        let branch = worker["branch"].as_str().unwrap().to_string();

        git(&worktree, &["checkout", &branch]);
        std::fs::write(
            std::path::Path::new(&worktree).join("shared.txt"),
            format!("line one\nworker {i} was here\nworker {i} again\nline four\n"),
        )
        .unwrap();
        git(&worktree, &["add", "-A"]);
        git(&worktree, &["commit", "-m", &format!("w{i} edit")]);

        participants.push(format!("{id}:{worktree}:{branch}"));
    }

    let mut create_args = vec![
        "consolidation".to_string(),
        "create".to_string(),
        project.path().display().to_string(),
        "--base-revision".to_string(),
        "master".to_string(),
    ];
    for p in &participants {
        create_args.push("--participant".to_string());
        create_args.push(p.clone());
    }
    let create_args: Vec<&str> = create_args.iter().map(|s| s.as_str()).collect();
    let consolidation_id = project
        .orc()
        .args(&create_args)
        .args(&["-o", "json"])
        .passes()
        .json()
        .as_str()
        .unwrap()
        .to_string();

    let shown = project
        .orc()
        .args(&["consolidation", "show", &consolidation_id, "-o", "json"])
        .passes()
        .json();
    assert_eq!(shown["status"], "analyzed", "expected analyzed, got {shown}");
    let conflicts = shown["preview"]["conflicts"].as_array().unwrap();
    assert_eq!(conflicts.len(), 10, "expected one conflict per worker pair, got {conflicts:?}");
    assert!(
        conflicts.iter().all(|c| c["kind"] == "same-line"),
        "expected every conflict to be same-line, got {conflicts:?}"
    );

    let first_worker = &worker_ids[0];
    let resolve_arg = format!("shared.txt:keep-ours:{first_worker}");
    let plan = project
        .orc()
        .args(&["consolidation", "resolve", &consolidation_id, "--resolve", &resolve_arg])
        .args(&["-o", "json"])
        .passes()
        .json();
    let files = plan["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["path"], "shared.txt");
    assert_eq!(
        files[0]["source_worker"], *first_worker,
        "merge plan should point at the first worker's copy"
    );

    let scratch = tempfile::tempdir().unwrap();
    let result = project
        .orc()
        .args(&[
            "consolidation",
            "export",
            &consolidation_id,
            &scratch.path().display().to_string(),
        ])
        .args(&["-o", "json"])
        .passes()
        .json();
    let merged = result["merged"].as_array().unwrap();
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0], "shared.txt");
    assert!(result["failed"].as_array().unwrap().is_empty());
    assert!(result["commit_id"].is_string(), "expected a commit id, got {result}");
}

fn git(dir: &str, args: &[&str]) {
    let status = Command::new("git")
        .args(args)
        .current_dir(dir)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .expect("git should run");
    assert!(status.success(), "git {args:?} failed in {dir}");
}
