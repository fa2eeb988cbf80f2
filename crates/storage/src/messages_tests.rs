// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use orc_core::{Priority, WorkerId};
use tempfile::tempdir;

fn sample(id: &str) -> Message {
    Message::new(
        MessageId::new(id),
        "task.assign",
        None,
        WorkerId::new("w1"),
        None,
        serde_json::json!({"step": 1}),
        Priority::Normal,
        0,
    )
}

#[test]
fn save_then_load_all_round_trips() {
    let dir = tempdir().unwrap();
    let store = MessageStore::new(dir.path());

    store.save(&sample("m1")).unwrap();
    store.save(&sample("m2")).unwrap();

    let loaded = store.load_all().unwrap();
    assert_eq!(loaded.len(), 2);
}

#[test]
fn remove_deletes_durable_file() {
    let dir = tempdir().unwrap();
    let store = MessageStore::new(dir.path());
    let message = sample("m1");
    store.save(&message).unwrap();
    assert!(store.file_path(&message.id).exists());

    store.remove(&message.id).unwrap();
    assert!(!store.file_path(&message.id).exists());
}

#[test]
fn remove_of_missing_file_is_not_an_error() {
    let dir = tempdir().unwrap();
    let store = MessageStore::new(dir.path());
    store.remove(&MessageId::new("ghost")).unwrap();
}

#[test]
fn load_all_on_missing_directory_returns_empty() {
    let dir = tempdir().unwrap();
    let store = MessageStore::new(dir.path().join("does-not-exist"));
    assert!(store.load_all().unwrap().is_empty());
}

#[test]
fn load_all_skips_corrupt_files() {
    let dir = tempdir().unwrap();
    let store = MessageStore::new(dir.path());
    store.save(&sample("good")).unwrap();
    std::fs::write(dir.path().join("bad.json"), "not json").unwrap();

    let loaded = store.load_all().unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].id, MessageId::new("good"));
}
