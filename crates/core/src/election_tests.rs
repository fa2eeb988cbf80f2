// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn candidates(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn plurality_wins() {
    let mut e = Election::new(ElectionId::new("e1"), candidates(&["a", "b"]), 0, 1000);
    e.cast_vote("v1", "a").unwrap();
    e.cast_vote("v2", "a").unwrap();
    e.cast_vote("v3", "b").unwrap();
    let result = e.resolve();
    assert_eq!(result.winner, "a");
}

#[test]
fn ties_break_on_lexicographically_smallest_candidate() {
    let mut e = Election::new(ElectionId::new("e1"), candidates(&["zeta", "alpha"]), 0, 1000);
    e.cast_vote("v1", "zeta").unwrap();
    e.cast_vote("v2", "alpha").unwrap();
    let result = e.resolve();
    assert_eq!(result.winner, "alpha");
}

#[test]
fn revoting_is_rejected() {
    let mut e = Election::new(ElectionId::new("e1"), candidates(&["a", "b"]), 0, 1000);
    e.cast_vote("v1", "a").unwrap();
    let err = e.cast_vote("v1", "b").unwrap_err();
    assert!(err.contains("already voted"));
    assert_eq!(e.votes.get("v1").map(|s| s.as_str()), Some("a"));
}

#[test]
fn unknown_candidate_rejected() {
    let mut e = Election::new(ElectionId::new("e1"), candidates(&["a"]), 0, 1000);
    assert!(e.cast_vote("v1", "ghost").is_err());
}

#[test]
fn all_voted_detects_early_resolution_point() {
    let mut e = Election::new(ElectionId::new("e1"), candidates(&["a", "b"]), 0, 1000);
    let voters = candidates(&["v1", "v2"]);
    assert!(!e.all_voted(&voters));
    e.cast_vote("v1", "a").unwrap();
    e.cast_vote("v2", "b").unwrap();
    assert!(e.all_voted(&voters));
}

#[test]
fn no_votes_resolves_to_deterministic_winner() {
    let mut e = Election::new(ElectionId::new("e1"), candidates(&["zeta", "alpha"]), 0, 1000);
    let result = e.resolve();
    assert_eq!(result.winner, "alpha");
}

#[test]
fn vote_after_resolution_rejected() {
    let mut e = Election::new(ElectionId::new("e1"), candidates(&["a"]), 0, 1000);
    e.resolve();
    assert!(e.cast_vote("v1", "a").is_err());
}
