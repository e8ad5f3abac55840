// Copyright (c) The testblame Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Writing logic for execution journals.

use super::format::JournalEntry;
use crate::errors::JournalWriteError;
use camino::{Utf8Path, Utf8PathBuf};
use std::{
    fs::{File, OpenOptions},
    io::Write,
};

/// Writes an execution journal to disk, one fsynced record at a time.
///
/// A `JournalWriter` is the single logical writer for its file. Concurrent
/// producers must serialize their appends externally; the
/// [`ExecutionRecorder`](crate::recorder::ExecutionRecorder) does so with a
/// mutex.
#[derive(Debug)]
pub struct JournalWriter {
    path: Utf8PathBuf,
    file: File,
    entries_written: u64,
}

impl JournalWriter {
    /// Creates a new journal at `path`, truncating any existing file.
    ///
    /// Parent directories are created if they don't exist.
    pub fn create(path: impl Into<Utf8PathBuf>) -> Result<Self, JournalWriteError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| JournalWriteError::Create {
                path: path.clone(),
                error,
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&path)
            .map_err(|error| JournalWriteError::Create {
                path: path.clone(),
                error,
            })?;

        Ok(Self {
            path,
            file,
            entries_written: 0,
        })
    }

    /// Appends one entry and flushes it to stable storage.
    ///
    /// The entry is durable once this returns: the write is followed by a
    /// data sync, so the record survives the process dying immediately
    /// afterwards. That crash-right-after-a-start is the scenario the journal
    /// exists for, which is why the sync cannot be deferred or batched.
    pub fn append(&mut self, entry: &JournalEntry) -> Result<(), JournalWriteError> {
        let mut record =
            serde_json::to_vec(entry).map_err(|error| JournalWriteError::Serialize { error })?;
        record.push(b'\n');

        self.file
            .write_all(&record)
            .map_err(|error| JournalWriteError::Write {
                path: self.path.clone(),
                error,
            })?;
        self.file
            .sync_data()
            .map_err(|error| JournalWriteError::Sync {
                path: self.path.clone(),
                error,
            })?;

        self.entries_written += 1;
        Ok(())
    }

    /// Returns the path this journal is being written to.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Returns the number of entries appended so far.
    pub fn entries_written(&self) -> u64 {
        self.entries_written
    }

    /// Finishes writing and closes the journal file.
    ///
    /// Returns the number of entries written. Dropping the writer without
    /// calling this is safe -- every append was already synced -- but an
    /// explicit finish surfaces any final sync error.
    pub fn finish(self) -> Result<u64, JournalWriteError> {
        self.file
            .sync_all()
            .map_err(|error| JournalWriteError::Sync {
                path: self.path.clone(),
                error,
            })?;
        Ok(self.entries_written)
    }
}
