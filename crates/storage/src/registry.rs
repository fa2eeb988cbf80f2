// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry persistence: a single JSON file mirroring the in-memory
//! worker map, written with the atomic-rename discipline in [`crate::atomic`].

use crate::atomic::{self, AtomicIoError};
use orc_core::{Worker, WorkerId};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Loads and saves the Registry mirror file (a JSON array of [`Worker`]
/// records) at a fixed path under the per-project configuration directory.
///
/// This type performs no locking of its own; the Registry actor is the
/// single writer and is responsible for serializing calls to [`Self::save`].
pub struct RegistryStore {
    path: PathBuf,
}

impl RegistryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the registry mirror. A missing or corrupt file yields an empty
    /// map rather than an error, per the Registry's best-effort durability.
    pub fn load(&self) -> Result<HashMap<WorkerId, Worker>, AtomicIoError> {
        let workers: Option<Vec<Worker>> = atomic::read_json(&self.path)?;
        Ok(workers
            .unwrap_or_default()
            .into_iter()
            .map(|w| (w.id.clone(), w))
            .collect())
    }

    /// Persist the registry mirror atomically.
    pub fn save(&self, workers: &HashMap<WorkerId, Worker>) -> Result<(), AtomicIoError> {
        let mut ordered: Vec<&Worker> = workers.values().collect();
        ordered.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        atomic::write_json(&self.path, &ordered)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
