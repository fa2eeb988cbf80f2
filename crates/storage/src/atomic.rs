// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic JSON file persistence: write to a temporary file in the same
//! directory, sync it, then rename over the target. A crash between the
//! write and the rename leaves the previous file (or no file) intact, never
//! a half-written one.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum AtomicIoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialize `value` and write it atomically to `path`.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), AtomicIoError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("tmp");
    {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Load and deserialize `path`, returning `Ok(None)` if it does not exist.
///
/// A corrupt file is moved aside to `path.bak` and treated as absent, so the
/// caller can reset to an empty in-memory state without crashing.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, AtomicIoError> {
    if !path.exists() {
        return Ok(None);
    }

    let file = File::open(path)?;
    let reader = BufReader::new(file);
    match serde_json::from_reader(reader) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            let bak_path = path.with_extension("bak");
            warn!(
                error = %e,
                path = %path.display(),
                bak = %bak_path.display(),
                "corrupt JSON store, moving aside and starting fresh",
            );
            fs::rename(path, &bak_path)?;
            Ok(None)
        }
    }
}

#[cfg(test)]
#[path = "atomic_tests.rs"]
mod tests;
