// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn read_last_lines_returns_full_file_when_under_limit() {
    let dir = std::env::temp_dir().join(format!("orc-cli-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("short.log");
    std::fs::write(&path, "one\ntwo\nthree").unwrap();

    let content = read_last_lines(&path, 10).unwrap();
    assert_eq!(content, "one\ntwo\nthree");

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn read_last_lines_truncates_to_tail() {
    let dir = std::env::temp_dir().join(format!("orc-cli-test-tail-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("long.log");
    std::fs::write(&path, "a\nb\nc\nd\ne").unwrap();

    let content = read_last_lines(&path, 2).unwrap();
    assert_eq!(content, "d\ne");

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn is_connection_refused_matches_daemon_not_running() {
    assert!(is_connection_refused(&crate::client::ClientError::DaemonNotRunning));
}

#[test]
fn is_connection_refused_matches_io_connection_refused() {
    let io = std::io::Error::from(std::io::ErrorKind::ConnectionRefused);
    assert!(is_connection_refused(&crate::client::ClientError::Io(io)));
}

#[test]
fn is_connection_refused_rejects_other_io_errors() {
    let io = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
    assert!(!is_connection_refused(&crate::client::ClientError::Io(io)));
}
