// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/proc`-backed resource sampler (Unix only).

use super::{ResourceSampler, Sample, SampleError};
use async_trait::async_trait;

/// Page size assumed for `statm` resident-page conversion. `sysconf` reports
/// 4096 on every Linux architecture this orchestrator targets.
const PAGE_SIZE_BYTES: u64 = 4096;

/// Reads `/proc/<pid>/stat` and `/proc/<pid>/statm` for memory and CPU.
#[derive(Clone, Copy, Default)]
pub struct ProcFsSampler;

impl ProcFsSampler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ResourceSampler for ProcFsSampler {
    async fn sample(&self, pid: u32) -> Result<Sample, SampleError> {
        let statm_path = format!("/proc/{pid}/statm");
        let stat_path = format!("/proc/{pid}/stat");

        let statm = tokio::fs::read_to_string(&statm_path)
            .await
            .map_err(|_| SampleError::NotFound(pid))?;
        let stat = tokio::fs::read_to_string(&stat_path)
            .await
            .map_err(|_| SampleError::NotFound(pid))?;

        let resident_pages: u64 = statm
            .split_whitespace()
            .nth(1)
            .ok_or_else(|| SampleError::ParseFailed("statm missing resident field".to_string()))?
            .parse()
            .map_err(|_| SampleError::ParseFailed("statm resident field not numeric".to_string()))?;

        let cpu_ticks = parse_cpu_ticks(&stat)?;

        Ok(Sample {
            resident_bytes: resident_pages.saturating_mul(PAGE_SIZE_BYTES),
            cpu_ticks,
        })
    }
}

/// `/proc/<pid>/stat` fields are space-separated, but field 2 (`comm`) is the
/// executable name in parens and may itself contain spaces/parens, so split
/// on the closing paren rather than whitespace for the fields that follow.
fn parse_cpu_ticks(stat: &str) -> Result<u64, SampleError> {
    let after_comm = stat
        .rsplit_once(')')
        .map(|(_, rest)| rest)
        .ok_or_else(|| SampleError::ParseFailed("stat missing comm field".to_string()))?;

    let fields: Vec<&str> = after_comm.split_whitespace().collect();
    // Fields after `)`: state(0) ppid(1) ... utime(11) stime(12) in the
    // standard /proc/pid/stat layout (1-indexed fields 14 and 15 overall).
    let utime: u64 = fields
        .get(11)
        .ok_or_else(|| SampleError::ParseFailed("stat missing utime".to_string()))?
        .parse()
        .map_err(|_| SampleError::ParseFailed("stat utime not numeric".to_string()))?;
    let stime: u64 = fields
        .get(12)
        .ok_or_else(|| SampleError::ParseFailed("stat missing stime".to_string()))?
        .parse()
        .map_err(|_| SampleError::ParseFailed("stat stime not numeric".to_string()))?;

    Ok(utime + stime)
}

#[cfg(test)]
#[path = "linux_tests.rs"]
mod tests;
