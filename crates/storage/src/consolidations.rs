// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Consolidation persistence: a single JSON file (array of [`Consolidation`]
//! records) under the same configuration directory as the Registry, written
//! with the same atomic-rename discipline. Reads are served from an
//! in-memory cache with a 5-second TTL so repeated reads during a busy
//! consolidation don't each pay for a disk round trip.

use crate::atomic::{self, AtomicIoError};
use orc_core::{Consolidation, ConsolidationId};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// How long a cached read is considered fresh before the next read forces a
/// reload from disk (§4.F Persistence).
pub const CACHE_TTL: Duration = Duration::from_secs(5);

struct Cache {
    entries: Vec<Consolidation>,
    loaded_at: Option<Instant>,
}

pub struct ConsolidationStore {
    path: PathBuf,
    cache: Mutex<Cache>,
}

impl ConsolidationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(Cache {
                entries: Vec::new(),
                loaded_at: None,
            }),
        }
    }

    /// Read all consolidations, either from the TTL cache or, if the cache is
    /// stale or empty, from disk.
    pub fn load_all(&self) -> Result<Vec<Consolidation>, AtomicIoError> {
        let mut cache = self.cache.lock();
        let fresh = cache
            .loaded_at
            .is_some_and(|loaded_at| loaded_at.elapsed() < CACHE_TTL);
        if !fresh {
            let entries: Vec<Consolidation> = atomic::read_json(&self.path)?.unwrap_or_default();
            cache.entries = entries;
            cache.loaded_at = Some(Instant::now());
        }
        Ok(cache.entries.clone())
    }

    /// Look up a single consolidation, served from the same TTL cache.
    pub fn get(&self, id: &ConsolidationId) -> Result<Option<Consolidation>, AtomicIoError> {
        Ok(self.load_all()?.into_iter().find(|c| &c.id == id))
    }

    /// Upsert a consolidation record and persist the whole array atomically,
    /// refreshing the cache in the same step.
    pub fn upsert(&self, consolidation: Consolidation) -> Result<(), AtomicIoError> {
        let mut cache = self.cache.lock();
        let fresh = cache
            .loaded_at
            .is_some_and(|loaded_at| loaded_at.elapsed() < CACHE_TTL);
        if !fresh {
            cache.entries = atomic::read_json(&self.path)?.unwrap_or_default();
        }

        match cache.entries.iter_mut().find(|c| c.id == consolidation.id) {
            Some(existing) => *existing = consolidation,
            None => cache.entries.push(consolidation),
        }
        atomic::write_json(&self.path, &cache.entries)?;
        cache.loaded_at = Some(Instant::now());
        Ok(())
    }

    /// Remove a consolidation record and persist the remaining array
    /// atomically. Returns whether a record was actually removed.
    pub fn delete(&self, id: &ConsolidationId) -> Result<bool, AtomicIoError> {
        let mut cache = self.cache.lock();
        let fresh = cache
            .loaded_at
            .is_some_and(|loaded_at| loaded_at.elapsed() < CACHE_TTL);
        if !fresh {
            cache.entries = atomic::read_json(&self.path)?.unwrap_or_default();
        }

        let before = cache.entries.len();
        cache.entries.retain(|c| &c.id != id);
        let removed = cache.entries.len() != before;
        if removed {
            atomic::write_json(&self.path, &cache.entries)?;
        }
        cache.loaded_at = Some(Instant::now());
        Ok(removed)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
#[path = "consolidations_tests.rs"]
mod tests;
