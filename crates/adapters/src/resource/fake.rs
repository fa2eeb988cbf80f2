// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake resource sampler for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ResourceSampler, Sample, SampleError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Fake resource sampler: tests seed a sequence of samples per pid and drain
/// them one at a time, simulating time passing between monitor ticks.
#[derive(Clone, Default)]
pub struct FakeResourceSampler {
    queued: Arc<Mutex<HashMap<u32, Vec<Sample>>>>,
}

impl FakeResourceSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_sample(&self, pid: u32, sample: Sample) {
        self.queued.lock().entry(pid).or_default().push(sample);
    }

    pub fn remove(&self, pid: u32) {
        self.queued.lock().remove(&pid);
    }
}

#[async_trait]
impl ResourceSampler for FakeResourceSampler {
    async fn sample(&self, pid: u32) -> Result<Sample, SampleError> {
        let mut queued = self.queued.lock();
        let samples = queued.get_mut(&pid).ok_or(SampleError::NotFound(pid))?;
        if samples.is_empty() {
            return Err(SampleError::NotFound(pid));
        }
        if samples.len() == 1 {
            Ok(samples[0])
        } else {
            Ok(samples.remove(0))
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
