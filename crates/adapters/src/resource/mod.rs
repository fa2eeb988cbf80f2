// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource sampling: per-process memory and CPU for the Resource Monitor.

mod linux;

pub use linux::ProcFsSampler;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeResourceSampler;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from resource sampling.
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("process not found: pid {0}")]
    NotFound(u32),
    #[error("read failed: {0}")]
    ReadFailed(String),
    #[error("parse failed: {0}")]
    ParseFailed(String),
}

/// A single point-in-time sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub resident_bytes: u64,
    /// Cumulative process CPU time in clock ticks at the time of sampling;
    /// callers derive a rate by differencing consecutive samples.
    pub cpu_ticks: u64,
}

/// Samples memory (resident) and CPU for a single OS process.
///
/// Implementations are platform-abstracted; on Unix this reads
/// `/proc/<pid>/stat` and `/proc/<pid>/statm`.
#[async_trait]
pub trait ResourceSampler: Clone + Send + Sync + 'static {
    async fn sample(&self, pid: u32) -> Result<Sample, SampleError>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
