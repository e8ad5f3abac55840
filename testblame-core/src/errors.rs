// Copyright (c) The testblame Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by testblame.

use crate::test_case::TestOutcome;
use camino::Utf8PathBuf;
use thiserror::Error;

/// An error that occurred while writing to an execution journal.
///
/// Journal writes are the run's crash evidence: a run whose journal cannot be
/// persisted is not meaningfully diagnosable, so these errors are surfaced to
/// the caller rather than swallowed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum JournalWriteError {
    /// The journal file could not be created.
    #[error("failed to create execution journal at `{path}`")]
    Create {
        /// The path the journal was being created at.
        path: Utf8PathBuf,

        /// The error that occurred.
        #[source]
        error: std::io::Error,
    },

    /// A journal entry could not be serialized.
    #[error("failed to serialize execution journal entry")]
    Serialize {
        /// The underlying error.
        #[source]
        error: serde_json::Error,
    },

    /// A journal entry could not be written out.
    #[error("failed to write to execution journal at `{path}`")]
    Write {
        /// The path to the journal.
        path: Utf8PathBuf,

        /// The error that occurred.
        #[source]
        error: std::io::Error,
    },

    /// The journal could not be flushed to stable storage.
    #[error("failed to sync execution journal at `{path}` to disk")]
    Sync {
        /// The path to the journal.
        path: Utf8PathBuf,

        /// The error that occurred.
        #[source]
        error: std::io::Error,
    },
}

/// An error that occurred while reading an execution journal.
///
/// A journal that is merely truncated mid-record does *not* produce an error:
/// the malformed tail is discarded and the well-formed prefix is returned.
/// These errors mean the journal was unreadable from the very first record.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum JournalReadError {
    /// The journal file could not be opened.
    #[error("failed to open execution journal at `{path}`")]
    Open {
        /// The path to the journal.
        path: Utf8PathBuf,

        /// The error that occurred.
        #[source]
        error: std::io::Error,
    },

    /// An I/O error occurred before any entry could be read.
    #[error("failed to read execution journal at `{path}`")]
    Read {
        /// The path to the journal.
        path: Utf8PathBuf,

        /// The error that occurred.
        #[source]
        error: std::io::Error,
    },

    /// The leading record was malformed: the file is not an execution
    /// journal, or is corrupt from the start.
    #[error("execution journal at `{path}` is not in a recognized format")]
    UnrecognizedFormat {
        /// The path to the journal.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: serde_json::Error,
    },
}

/// An error that occurred while resolving the crash dump tool location.
///
/// This is a configuration failure: it is reported once per capture attempt
/// and never aborts the test run itself.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum DumpToolResolveError {
    /// The environment variable pointing at the dump tool is not set.
    #[error("environment variable `{var}` is not set; cannot locate the crash dump tool")]
    EnvVarNotSet {
        /// The name of the environment variable.
        var: &'static str,
    },

    /// The environment variable pointing at the dump tool is not valid
    /// Unicode.
    #[error("environment variable `{var}` is not valid Unicode")]
    EnvVarInvalid {
        /// The name of the environment variable.
        var: &'static str,
    },

    /// The dump tool executable does not exist at the resolved location.
    #[error("crash dump tool not found at `{path}`")]
    ToolNotFound {
        /// The path the tool was expected at.
        path: Utf8PathBuf,
    },
}

/// Error returned while parsing a [`TestOutcome`] value from a string.
#[derive(Clone, Debug, Error)]
#[error(
    "unrecognized test outcome: {input}\n(known values: {})",
    TestOutcome::variants().join(", "),
)]
pub struct TestOutcomeParseError {
    input: String,
}

impl TestOutcomeParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}
