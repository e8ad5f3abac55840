// Copyright (c) The testblame Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! On-disk format for the execution journal.

use crate::test_case::TestCaseRef;
use chrono::{DateTime, FixedOffset, Local};
use serde::{Deserialize, Serialize};

/// The file extension used for execution journal files.
pub const JOURNAL_FILE_EXTENSION: &str = "jsonl";

/// The kind of event a journal entry records.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum JournalEventKind {
    /// The test case started executing.
    Started,

    /// The test case finished executing.
    Completed,
}

/// One record in an execution journal.
///
/// Entries are meaningful only as an ordered sequence: every `Completed`
/// entry has a matching earlier `Started` entry with the same identity, while
/// a `Started` entry with no later match marks a test that never finished --
/// the crash candidates. Insertion order is the only ordering guarantee; the
/// timestamp is a diagnostic aid and is never used for ordering.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct JournalEntry {
    /// The time at which the entry was recorded, including the offset from
    /// UTC.
    pub timestamp: DateTime<FixedOffset>,

    /// The kind of event this entry records.
    pub kind: JournalEventKind,

    /// The test case the event applies to.
    pub test_case: TestCaseRef,
}

impl JournalEntry {
    /// Creates a `Started` entry for `test_case`, stamped with the current
    /// time.
    pub fn started(test_case: TestCaseRef) -> Self {
        Self::new(JournalEventKind::Started, test_case)
    }

    /// Creates a `Completed` entry for `test_case`, stamped with the current
    /// time.
    pub fn completed(test_case: TestCaseRef) -> Self {
        Self::new(JournalEventKind::Completed, test_case)
    }

    fn new(kind: JournalEventKind, test_case: TestCaseRef) -> Self {
        Self {
            timestamp: Local::now().fixed_offset(),
            kind,
            test_case,
        }
    }
}
