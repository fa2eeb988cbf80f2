// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Consolidation: merging the divergent work of several workers into one
//! integrated revision.

use crate::conflict::ConflictRecord;
use crate::resolution::MergePlan;
use crate::worker::WorkerId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

crate::define_id! {
    /// Unique identifier for a consolidation instance.
    pub struct ConsolidationId;
}

/// Monotone status: `pending < analyzing < analyzed < ready < completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsolidationStatus {
    Pending,
    Analyzing,
    Analyzed,
    Ready,
    Completed,
}

impl fmt::Display for ConsolidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsolidationStatus::Pending => write!(f, "pending"),
            ConsolidationStatus::Analyzing => write!(f, "analyzing"),
            ConsolidationStatus::Analyzed => write!(f, "analyzed"),
            ConsolidationStatus::Ready => write!(f, "ready"),
            ConsolidationStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Per-dimension quality subscores plus the weighted total, all in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    pub consistency: f64,
    pub test_coverage: f64,
    pub code_quality: f64,
    pub efficiency: f64,
    pub total: f64,
}

impl QualityScore {
    /// Combine per-dimension scores with the weights from §4.F:
    /// 0.30 consistency + 0.25 testCoverage + 0.30 codeQuality + 0.15 efficiency.
    pub fn new(consistency: f64, test_coverage: f64, code_quality: f64, efficiency: f64) -> Self {
        let total = 0.30 * consistency + 0.25 * test_coverage + 0.30 * code_quality + 0.15 * efficiency;
        Self {
            consistency,
            test_coverage,
            code_quality,
            efficiency,
            total,
        }
    }
}

/// Per-file metrics feeding the quality score (§4.F Analyze).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetrics {
    pub line_count: usize,
    pub avg_line_length: f64,
    pub max_line_length: usize,
    pub complexity: usize,
    pub has_comments: bool,
    pub is_test_file: bool,
    pub test_line_ratio: f64,
    pub net_change: i64,
}

/// One file entry in the merge preview: which worker produced it, and its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileQuality {
    pub path: PathBuf,
    pub worker: WorkerId,
    pub score: QualityScore,
    pub metrics: FileMetrics,
    /// The worker's full content for this path, kept so that a `union`
    /// resolution can synthesize a real merge instead of a placeholder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Aggregate preview of what consolidation would produce before resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergePreview {
    pub total_files: usize,
    pub auto_mergeable: usize,
    pub conflicting: usize,
    pub files: Vec<FileQuality>,
    pub conflicts: Vec<ConflictRecord>,
}

/// Outcome of an export: which paths merged, which failed and why, and the
/// resulting commit if any file succeeded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeResult {
    pub merged: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_id: Option<String>,
}

impl MergeResult {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// The orchestrated merging of multiple workers' results into one target branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consolidation {
    pub id: ConsolidationId,
    pub project: PathBuf,
    pub base_revision: String,
    pub participants: Vec<WorkerId>,
    pub default_strategy: String,
    pub status: ConsolidationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<MergePreview>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<MergePlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<MergeResult>,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
}

impl Consolidation {
    pub fn new(
        id: ConsolidationId,
        project: PathBuf,
        base_revision: String,
        participants: Vec<WorkerId>,
        created_at_ms: u64,
    ) -> Self {
        Self {
            id,
            project,
            base_revision,
            participants,
            default_strategy: "auto".to_string(),
            status: ConsolidationStatus::Pending,
            preview: None,
            plan: None,
            result: None,
            created_at_ms,
            completed_at_ms: None,
        }
    }

    /// Advance the status. Callers must ensure monotonicity; this just stamps.
    pub fn set_status(&mut self, status: ConsolidationStatus) {
        self.status = status;
    }
}

#[cfg(test)]
#[path = "consolidation_tests.rs"]
mod tests;
