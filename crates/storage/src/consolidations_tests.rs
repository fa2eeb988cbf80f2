// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use orc_core::WorkerId;
use std::path::PathBuf;
use tempfile::tempdir;

fn sample(id: &str) -> Consolidation {
    Consolidation::new(
        ConsolidationId::new(id),
        PathBuf::from("/proj"),
        "master".to_string(),
        vec![WorkerId::new("w1"), WorkerId::new("w2")],
        0,
    )
}

#[test]
fn upsert_then_load_round_trips() {
    let dir = tempdir().unwrap();
    let store = ConsolidationStore::new(dir.path().join("consolidations.json"));

    store.upsert(sample("c1")).unwrap();
    let all = store.load_all().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, ConsolidationId::new("c1"));
}

#[test]
fn upsert_replaces_existing_record_by_id() {
    let dir = tempdir().unwrap();
    let store = ConsolidationStore::new(dir.path().join("consolidations.json"));

    store.upsert(sample("c1")).unwrap();
    let mut updated = sample("c1");
    updated.set_status(orc_core::ConsolidationStatus::Analyzing);
    store.upsert(updated).unwrap();

    let all = store.load_all().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].status, orc_core::ConsolidationStatus::Analyzing);
}

#[test]
fn get_finds_by_id() {
    let dir = tempdir().unwrap();
    let store = ConsolidationStore::new(dir.path().join("consolidations.json"));
    store.upsert(sample("c1")).unwrap();
    store.upsert(sample("c2")).unwrap();

    let found = store.get(&ConsolidationId::new("c2")).unwrap();
    assert!(found.is_some());
    assert!(store.get(&ConsolidationId::new("missing")).unwrap().is_none());
}

#[test]
fn load_all_on_missing_file_returns_empty() {
    let dir = tempdir().unwrap();
    let store = ConsolidationStore::new(dir.path().join("consolidations.json"));
    assert!(store.load_all().unwrap().is_empty());
}

#[test]
fn second_load_within_ttl_reflects_cache_not_external_disk_changes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("consolidations.json");
    let store = ConsolidationStore::new(&path);

    store.upsert(sample("c1")).unwrap();

    // Simulate an external process writing a different file directly.
    std::fs::write(&path, "[]").unwrap();

    // Within the TTL window, the cache still reports the prior value.
    let all = store.load_all().unwrap();
    assert_eq!(all.len(), 1);
}
