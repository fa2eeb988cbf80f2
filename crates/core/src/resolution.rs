// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Conflict resolution actions and the derived merge plan (§4.F Resolve).

use crate::worker::WorkerId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// The action chosen for one conflicting (or clean) path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionAction {
    Merge,
    Reject,
    KeepOurs,
    KeepTheirs,
    Voting,
    Union,
    Manual,
}

impl fmt::Display for ResolutionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionAction::Merge => write!(f, "merge"),
            ResolutionAction::Reject => write!(f, "reject"),
            ResolutionAction::KeepOurs => write!(f, "keep-ours"),
            ResolutionAction::KeepTheirs => write!(f, "keep-theirs"),
            ResolutionAction::Voting => write!(f, "voting"),
            ResolutionAction::Union => write!(f, "union"),
            ResolutionAction::Manual => write!(f, "manual"),
        }
    }
}

/// A caller-supplied resolution for a single path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub path: PathBuf,
    pub action: ResolutionAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chosen_worker: Option<WorkerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_content: Option<String>,
}

/// One file to apply during export: which worker's copy of the path to use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedFile {
    pub path: PathBuf,
    pub source_worker: WorkerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_content: Option<String>,
}

/// The deterministic, ordered list of files to apply during export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergePlan {
    pub files: Vec<PlannedFile>,
    pub rejected: Vec<PathBuf>,
}

#[cfg(test)]
#[path = "resolution_tests.rs"]
mod tests;
