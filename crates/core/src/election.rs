// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Leader election by vote over a known candidate set.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

crate::define_id! {
    /// Unique identifier for an election instance.
    pub struct ElectionId;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionResult {
    pub winner: String,
    pub votes: HashMap<String, u32>,
}

/// An election: a fixed candidate set, one vote per voter (no revoting), and
/// a deadline. Resolves to the candidate with the most votes, ties broken by
/// lexicographically smallest candidate id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Election {
    pub id: ElectionId,
    pub candidates: BTreeSet<String>,
    pub votes: HashMap<String, String>,
    pub created_at_ms: u64,
    pub deadline_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ElectionResult>,
}

impl Election {
    pub fn new(id: ElectionId, candidates: BTreeSet<String>, created_at_ms: u64, deadline_ms: u64) -> Self {
        Self {
            id,
            candidates,
            votes: HashMap::new(),
            created_at_ms,
            deadline_ms,
            result: None,
        }
    }

    /// Record one vote per voter. A voter who already voted is rejected
    /// (later votes do not overwrite earlier ones).
    pub fn cast_vote(&mut self, voter: &str, candidate: &str) -> Result<(), String> {
        if self.result.is_some() {
            return Err("election already resolved".to_string());
        }
        if !self.candidates.contains(candidate) {
            return Err(format!("unknown candidate: {candidate}"));
        }
        if self.votes.contains_key(voter) {
            return Err(format!("{voter} already voted"));
        }
        self.votes.insert(voter.to_string(), candidate.to_string());
        Ok(())
    }

    /// All known voters have cast a vote: allows early resolution.
    pub fn all_voted(&self, voters: &BTreeSet<String>) -> bool {
        voters.iter().all(|v| self.votes.contains_key(v))
    }

    /// Tally and resolve. Ties broken by lexicographically smallest candidate id.
    pub fn resolve(&mut self) -> &ElectionResult {
        let mut tally: HashMap<String, u32> = HashMap::new();
        for candidate in &self.candidates {
            tally.insert(candidate.clone(), 0);
        }
        for candidate in self.votes.values() {
            *tally.entry(candidate.clone()).or_insert(0) += 1;
        }
        let winner = tally
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(id, _)| id.clone())
            .unwrap_or_default();
        self.result = Some(ElectionResult { winner, votes: tally });
        match &self.result {
            Some(result) => result,
            None => unreachable!("result was just assigned"),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.result.is_some()
    }
}

impl fmt::Display for ElectionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "winner={}", self.winner)
    }
}

#[cfg(test)]
#[path = "election_tests.rs"]
mod tests;
