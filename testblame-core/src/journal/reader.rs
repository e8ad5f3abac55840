// Copyright (c) The testblame Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reading logic for execution journals.

use super::format::JournalEntry;
use crate::errors::JournalReadError;
use camino::Utf8Path;
use std::{
    fs::File,
    io::{BufRead, BufReader},
};
use tracing::warn;

/// Reads all well-formed entries from the journal at `path`.
///
/// A journal written by a process that died mid-append commonly ends in a
/// truncated record. The format is self-delimiting (one record per line), so
/// recovery is structural rather than best-effort: the malformed tail is
/// discarded with a warning and every complete record before it is returned.
///
/// An error is returned only when the journal is unreadable from the very
/// first record: the file cannot be opened or read at all, or the leading
/// record is not in the journal format.
pub fn read_journal(path: &Utf8Path) -> Result<Vec<JournalEntry>, JournalReadError> {
    let file = File::open(path).map_err(|error| JournalReadError::Open {
        path: path.to_owned(),
        error,
    })?;
    let mut reader = BufReader::new(file);

    let mut entries = Vec::new();
    let mut record = Vec::new();
    loop {
        record.clear();
        let read = match reader.read_until(b'\n', &mut record) {
            Ok(read) => read,
            Err(error) => {
                if entries.is_empty() {
                    return Err(JournalReadError::Read {
                        path: path.to_owned(),
                        error,
                    });
                }
                warn!(
                    "I/O error reading execution journal at `{path}` after {} entries, \
                     treating the rest as lost: {error}",
                    entries.len(),
                );
                break;
            }
        };
        if read == 0 {
            break;
        }
        if record.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        // A record missing its trailing newline can still parse: the crash
        // hit between the record bytes and the frame byte, and the data is
        // intact.
        match serde_json::from_slice(&record) {
            Ok(entry) => entries.push(entry),
            Err(error) => {
                if entries.is_empty() {
                    return Err(JournalReadError::UnrecognizedFormat {
                        path: path.to_owned(),
                        error,
                    });
                }
                warn!(
                    "discarding truncated record at the end of execution journal \
                     `{path}` ({} entries read): {error}",
                    entries.len(),
                );
                break;
            }
        }
    }

    Ok(entries)
}
