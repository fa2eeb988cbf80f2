// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{rotate_log_if_needed, MAX_LOG_SIZE};
use std::io::Write;

fn write_bytes(path: &std::path::Path, size: u64) {
    let mut f = std::fs::File::create(path).unwrap();
    let buf = vec![b'x'; size as usize];
    f.write_all(&buf).unwrap();
}

#[test]
fn rotate_skips_small_file() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("orchestrator.log");
    write_bytes(&log, 1024);

    rotate_log_if_needed(&log);

    assert!(log.exists(), "small log should not be rotated");
    assert!(!dir.path().join("orchestrator.log.1").exists());
}

#[test]
fn rotate_moves_large_file() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("orchestrator.log");
    write_bytes(&log, MAX_LOG_SIZE + 1);

    rotate_log_if_needed(&log);

    assert!(!log.exists(), "original should be renamed");
    assert!(dir.path().join("orchestrator.log.1").exists());
}

#[test]
fn rotate_shifts_existing_rotations() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("orchestrator.log");

    write_bytes(&dir.path().join("orchestrator.log.1"), 100);
    write_bytes(&dir.path().join("orchestrator.log.2"), 200);

    write_bytes(&log, MAX_LOG_SIZE + 1);

    rotate_log_if_needed(&log);

    assert!(!log.exists());
    assert!(dir.path().join("orchestrator.log.1").exists());
    assert!(dir.path().join("orchestrator.log.2").exists());
    assert!(dir.path().join("orchestrator.log.3").exists());

    assert_eq!(
        std::fs::metadata(dir.path().join("orchestrator.log.3")).unwrap().len(),
        200
    );
}

#[test]
fn rotate_drops_oldest_when_full() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("orchestrator.log");

    write_bytes(&dir.path().join("orchestrator.log.1"), 100);
    write_bytes(&dir.path().join("orchestrator.log.2"), 200);
    write_bytes(&dir.path().join("orchestrator.log.3"), 300);

    write_bytes(&log, MAX_LOG_SIZE + 1);

    rotate_log_if_needed(&log);

    assert!(!log.exists());
    assert!(dir.path().join("orchestrator.log.1").exists());
    assert!(dir.path().join("orchestrator.log.2").exists());
    assert!(dir.path().join("orchestrator.log.3").exists());

    assert_eq!(
        std::fs::metadata(dir.path().join("orchestrator.log.3")).unwrap().len(),
        200
    );
}

#[test]
fn rotate_noop_when_file_missing() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("orchestrator.log");

    rotate_log_if_needed(&log);
}
