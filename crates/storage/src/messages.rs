// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message Bus persistence: one JSON file per non-terminal message under a
//! directory, keyed by message id. Terminal messages (delivered or failed)
//! have their file removed as part of the terminal transition.

use crate::atomic::{self, AtomicIoError};
use orc_core::{Message, MessageId};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub struct MessageStore {
    dir: PathBuf,
}

impl MessageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file_path(&self, id: &MessageId) -> PathBuf {
        self.dir.join(format!("{}.json", id.as_str()))
    }

    /// Persist a message's current state. Callers are expected to call this
    /// only while the message is non-terminal; use [`Self::remove`] once it
    /// reaches `delivered` or `failed`.
    pub fn save(&self, message: &Message) -> Result<(), AtomicIoError> {
        atomic::write_json(&self.file_path(&message.id), message)
    }

    /// Delete a message's durable file. Idempotent: removing an already
    /// absent file is not an error.
    pub fn remove(&self, id: &MessageId) -> Result<(), AtomicIoError> {
        match fs::remove_file(self.file_path(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Rehydrate every non-terminal message on disk, for startup recovery.
    ///
    /// Any file that fails to parse is logged and skipped rather than
    /// aborting the whole rehydration pass.
    pub fn load_all(&self) -> Result<Vec<Message>, AtomicIoError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut messages = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match atomic::read_json::<Message>(&path) {
                Ok(Some(message)) => messages.push(message),
                Ok(None) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "failed to rehydrate message"),
            }
        }
        Ok(messages)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
#[path = "messages_tests.rs"]
mod tests;
