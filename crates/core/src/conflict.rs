// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Conflict detection data model (§4.F Consolidator, §3 Conflict Record).

use crate::worker::WorkerId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Classification of a conflict between two workers' changes to the same path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictKind {
    SameLine,
    DeleteModify,
    ImportConflict,
    ExportConflict,
    Structural,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::SameLine => write!(f, "same-line"),
            ConflictKind::DeleteModify => write!(f, "delete-modify"),
            ConflictKind::ImportConflict => write!(f, "import-conflict"),
            ConflictKind::ExportConflict => write!(f, "export-conflict"),
            ConflictKind::Structural => write!(f, "structural"),
        }
    }
}

/// A contiguous region of added or removed lines in a unified diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hunk {
    pub start_line: u32,
    pub line_count: u32,
}

impl Hunk {
    pub fn end_line(&self) -> u32 {
        self.start_line + self.line_count
    }

    /// Whether this hunk's line range overlaps another's.
    pub fn overlaps(&self, other: &Hunk) -> bool {
        self.start_line < other.end_line() && other.start_line < self.end_line()
    }

    /// The overlapping range with `other`, if any.
    pub fn overlap(&self, other: &Hunk) -> Option<(u32, u32)> {
        if !self.overlaps(other) {
            return None;
        }
        let start = self.start_line.max(other.start_line);
        let end = self.end_line().min(other.end_line());
        Some((start, end))
    }
}

/// A detected conflict between exactly two participants over one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictRecord {
    pub path: PathBuf,
    pub kind: ConflictKind,
    pub worker_a: WorkerId,
    pub worker_b: WorkerId,
    pub hunk_a: Hunk,
    pub hunk_b: Hunk,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlap_start: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlap_end: Option<u32>,
}

#[cfg(test)]
#[path = "conflict_tests.rs"]
mod tests;
