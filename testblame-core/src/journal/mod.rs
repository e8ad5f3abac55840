// Copyright (c) The testblame Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The crash-tolerant execution journal.
//!
//! The journal is an append-only record of which test cases a host started
//! and finished, in the order the events physically occurred. It exists for
//! exactly one scenario: the host process dies mid-run, and the journal on
//! disk is the last surviving evidence of what it was doing.
//!
//! Two properties follow from that scenario:
//!
//! - Every append is flushed to stable storage before the call returns
//!   ([`JournalWriter::append`]). Write amplification is acceptable at
//!   test-case granularity.
//! - The format is self-delimiting (JSON Lines, one complete record per
//!   line), so a file truncated mid-append recovers structurally:
//!   [`read_journal`] discards the malformed tail and returns everything
//!   before it.

mod format;
mod reader;
mod writer;

pub use format::{JOURNAL_FILE_EXTENSION, JournalEntry, JournalEventKind};
pub use reader::read_journal;
pub use writer::JournalWriter;
