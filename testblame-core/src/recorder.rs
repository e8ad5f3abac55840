// Copyright (c) The testblame Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recording logic for in-flight test runs.
//!
//! The [`ExecutionRecorder`] receives start/end/result notifications from
//! test adapters, keeps the crash-tolerant execution journal current, and
//! forwards deduplicated events to the run's results cache and optional
//! observer.
//!
//! Adapters are expected to send, per test case: start, then end, then
//! result. Adapters that misbehave (end and result racing, results with no
//! end, duplicate ends) are tolerated; the recorder guarantees at most one
//! terminal notification per test case identity regardless of interleaving.

use crate::{
    attachment::AttachmentSet,
    errors::JournalWriteError,
    journal::{JournalEntry, JournalWriter},
    test_case::{TestCaseId, TestCaseRef, TestCaseResult, TestOutcome},
};
use camino::Utf8PathBuf;
use std::{
    collections::HashSet,
    sync::Mutex,
};
use tracing::debug;

/// The results cache for a run.
///
/// The recorder treats this as a write-only sink: notifications are pushed in
/// and never read back. Buffering and eventual publication of results is the
/// sink's concern, not the recorder's.
pub trait TestRunSink: Send + Sync {
    /// Called when a test case starts executing.
    fn on_test_started(&self, test_case: &TestCaseRef);

    /// Called when a new result is available for a test case.
    fn on_new_test_result(&self, result: &TestCaseResult);

    /// Called when a test case finishes executing.
    fn on_test_completion(&self, test_case: &TestCaseRef);
}

/// An observer for test case events during a run.
///
/// Observers are optional: a recorder without one skips event dispatch
/// entirely. The terminal notification
/// ([`send_test_case_end`](Self::send_test_case_end)) is sent at most once
/// per test case identity, however the recorder's inputs interleave.
pub trait TestCaseEvents: Send + Sync {
    /// A test case started executing.
    fn send_test_case_start(&self, test_case: &TestCaseRef);

    /// A test case finished executing. Sent at most once per identity.
    fn send_test_case_end(&self, test_case: &TestCaseRef, outcome: TestOutcome);

    /// A result is available for a test case.
    fn send_test_result(&self, result: &TestCaseResult);
}

/// Records test execution for a single run.
///
/// One recorder serves all of a host's adapter worker threads concurrently;
/// every method takes `&self`. The journal is the recorder's exclusive
/// property for the duration of the run -- nothing else writes to it, and
/// readers only run after the recorder has been dropped or
/// [`finish`](Self::finish)ed.
pub struct ExecutionRecorder {
    sink: Box<dyn TestRunSink>,
    events: Option<Box<dyn TestCaseEvents>>,
    /// Appends must form a single logical writer stream; the mutex serializes
    /// them across worker threads.
    journal: Mutex<JournalWriter>,
    /// Identities a terminal notification has already been sent for.
    end_sent: Mutex<HashSet<TestCaseId>>,
    attachment_sets: Mutex<Vec<AttachmentSet>>,
}

impl ExecutionRecorder {
    /// Creates a recorder writing to `journal`, forwarding to `sink` and, if
    /// present, `events`.
    pub fn new(
        journal: JournalWriter,
        sink: Box<dyn TestRunSink>,
        events: Option<Box<dyn TestCaseEvents>>,
    ) -> Self {
        Self {
            sink,
            events,
            journal: Mutex::new(journal),
            end_sent: Mutex::new(HashSet::new()),
            attachment_sets: Mutex::new(Vec::new()),
        }
    }

    /// Records that `test_case` has started executing.
    ///
    /// The `Started` journal entry is durable before anything else observes
    /// the start: a crash immediately after this call is exactly the scenario
    /// the journal must survive. A journal failure is surfaced to the caller
    /// and nothing is forwarded -- a run whose crash evidence cannot be
    /// persisted should fail loudly, not limp on.
    pub fn record_start(&self, test_case: &TestCaseRef) -> Result<(), JournalWriteError> {
        debug!("recording start of test: {}", test_case.name);
        self.append_entry(JournalEntry::started(test_case.clone()))?;

        self.sink.on_test_started(test_case);

        if let Some(events) = &self.events {
            // A restarted identity (retries reuse test case ids) gets a fresh
            // slate: drop any stale end marker so this attempt can emit its
            // own terminal notification.
            self.end_sent
                .lock()
                .expect("end-status lock poisoned")
                .remove(&test_case.id);
            events.send_test_case_start(test_case);
        }
        Ok(())
    }

    /// Records a result for a test case.
    ///
    /// If the terminal notification for the identity hasn't been sent yet --
    /// an adapter sent a result without an end event -- one is synthesized
    /// from the result's outcome before the result itself is forwarded. The
    /// result always reaches the sink, observer or not.
    pub fn record_result(&self, result: &TestCaseResult) {
        debug!("recording result for test: {}", result.test_case.name);
        if let Some(events) = &self.events {
            self.send_test_case_end(&result.test_case, result.outcome);
            events.send_test_result(result);
        }

        self.sink.on_new_test_result(result);
    }

    /// Records that `test_case` has finished executing.
    ///
    /// Appends a `Completed` journal entry and sends the terminal
    /// notification unless one was already sent for this identity.
    pub fn record_end(
        &self,
        test_case: &TestCaseRef,
        outcome: TestOutcome,
    ) -> Result<(), JournalWriteError> {
        debug!("recording end of test: {}", test_case.name);
        self.append_entry(JournalEntry::completed(test_case.clone()))?;

        self.sink.on_test_completion(test_case);
        self.send_test_case_end(test_case, outcome);
        Ok(())
    }

    /// Accumulates run-level attachments for later collection.
    pub fn record_attachments(&self, sets: Vec<AttachmentSet>) {
        self.attachment_sets
            .lock()
            .expect("attachment lock poisoned")
            .extend(sets);
    }

    /// Returns the attachments accumulated so far.
    pub fn attachments(&self) -> Vec<AttachmentSet> {
        self.attachment_sets
            .lock()
            .expect("attachment lock poisoned")
            .clone()
    }

    /// Returns the path of the journal this recorder writes to.
    pub fn journal_path(&self) -> Utf8PathBuf {
        self.journal
            .lock()
            .expect("journal lock poisoned")
            .path()
            .to_owned()
    }

    /// Closes the journal, returning the number of entries written.
    pub fn finish(self) -> Result<u64, JournalWriteError> {
        self.journal
            .into_inner()
            .expect("journal lock poisoned")
            .finish()
    }

    fn append_entry(&self, entry: JournalEntry) -> Result<(), JournalWriteError> {
        self.journal
            .lock()
            .expect("journal lock poisoned")
            .append(&entry)
    }

    /// Sends the terminal notification for `test_case` if it hasn't been sent
    /// already.
    fn send_test_case_end(&self, test_case: &TestCaseRef, outcome: TestOutcome) {
        if let Some(events) = &self.events {
            // Check-and-insert under a single lock acquisition: two racing
            // ends must not both observe "not yet sent". The critical section
            // covers exactly this operation so unrelated test cases aren't
            // serialized.
            let newly_inserted = self
                .end_sent
                .lock()
                .expect("end-status lock poisoned")
                .insert(test_case.id);
            if newly_inserted {
                events.send_test_case_end(test_case, outcome);
            }
        }
    }
}

impl std::fmt::Debug for ExecutionRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionRecorder")
            .field("journal", &self.journal)
            .field("has_events", &self.events.is_some())
            .finish_non_exhaustive()
    }
}
