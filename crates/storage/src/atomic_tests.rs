// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;
use std::io::Write as _;
use tempfile::tempdir;

#[test]
fn write_then_read_round_trips() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.json");

    let mut value = HashMap::new();
    value.insert("a".to_string(), 1u32);
    value.insert("b".to_string(), 2u32);

    write_json(&path, &value).unwrap();
    let loaded: HashMap<String, u32> = read_json(&path).unwrap().unwrap();
    assert_eq!(loaded, value);
}

#[test]
fn read_missing_file_returns_none() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing.json");
    let loaded: Option<HashMap<String, u32>> = read_json(&path).unwrap();
    assert!(loaded.is_none());
}

#[test]
fn write_leaves_no_tmp_file_behind() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.json");
    write_json(&path, &vec![1, 2, 3]).unwrap();
    assert!(path.exists());
    assert!(!path.with_extension("tmp").exists());
}

#[test]
fn read_corrupt_file_moves_aside_and_returns_none() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.json");
    let mut f = File::create(&path).unwrap();
    f.write_all(b"not json").unwrap();
    drop(f);

    let loaded: Option<Vec<u32>> = read_json(&path).unwrap();
    assert!(loaded.is_none());
    assert!(!path.exists());
    assert!(path.with_extension("bak").exists());
}

#[test]
fn creates_parent_directory_if_missing() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("store.json");
    write_json(&path, &42u32).unwrap();
    assert!(path.exists());
}
