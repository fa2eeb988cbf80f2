// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy shared by every subsystem.
//!
//! Internal components raise [`OrcError`] variants. The Transport Surface
//! maps each to one of the six wire codes in [`WireErrorCode`]; other
//! components never see wire codes directly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine-readable error code carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireErrorCode {
    BadRequest,
    NotFound,
    Conflict,
    CapacityExceeded,
    Internal,
    VcsUnavailable,
}

impl fmt::Display for WireErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireErrorCode::BadRequest => write!(f, "bad_request"),
            WireErrorCode::NotFound => write!(f, "not_found"),
            WireErrorCode::Conflict => write!(f, "conflict"),
            WireErrorCode::CapacityExceeded => write!(f, "capacity_exceeded"),
            WireErrorCode::Internal => write!(f, "internal"),
            WireErrorCode::VcsUnavailable => write!(f, "vcs_unavailable"),
        }
    }
}

/// Internal error taxonomy (§7). Not all variants are surfaced to callers —
/// see [`OrcError::is_surfaced`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum OrcError {
    #[error("validation: {0}")]
    Validation(String),

    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("vcs failure: {0}")]
    VcsFailure(String),

    #[error("spawn failure: {0}")]
    SpawnFailure(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("resource limit: {0}")]
    ResourceLimit(String),

    #[error("delivery failure: {0}")]
    DeliveryFailure(String),

    #[error("consolidation conflict: {0}")]
    ConsolidationConflict(String),

    #[error("merge failure: {0}")]
    MergeFailure(String),

    #[error("persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl OrcError {
    /// Whether this error is surfaced directly to the caller of the
    /// operation that raised it (validation/capacity/vcs/spawn/merge), as
    /// opposed to being handled internally and only observable via events
    /// (timeout, resource_limit, delivery retries).
    pub fn is_surfaced(&self) -> bool {
        matches!(
            self,
            OrcError::Validation(_)
                | OrcError::CapacityExceeded(_)
                | OrcError::NotFound(_)
                | OrcError::Conflict(_)
                | OrcError::VcsFailure(_)
                | OrcError::SpawnFailure(_)
                | OrcError::MergeFailure(_)
        )
    }

    /// Map to the wire-level error class (§6).
    pub fn wire_code(&self) -> WireErrorCode {
        match self {
            OrcError::Validation(_) => WireErrorCode::BadRequest,
            OrcError::NotFound(_) => WireErrorCode::NotFound,
            OrcError::Conflict(_) | OrcError::ConsolidationConflict(_) => WireErrorCode::Conflict,
            OrcError::CapacityExceeded(_) => WireErrorCode::CapacityExceeded,
            OrcError::VcsFailure(_) => WireErrorCode::VcsUnavailable,
            OrcError::SpawnFailure(_)
            | OrcError::Timeout(_)
            | OrcError::ResourceLimit(_)
            | OrcError::DeliveryFailure(_)
            | OrcError::MergeFailure(_)
            | OrcError::PersistenceFailure(_)
            | OrcError::Internal(_) => WireErrorCode::Internal,
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
