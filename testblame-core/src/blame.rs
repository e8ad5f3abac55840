// Copyright (c) The testblame Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-mortem attribution for aborted test runs.
//!
//! Once a run has fully stopped, the [`BlameReporter`] inspects its
//! attachments. For an aborted run it reads each execution journal among the
//! evidence and names the test(s) presumed active when the host died: per
//! source, the last test started but never completed. Runs that finish
//! normally produce no output at all.
//!
//! The reporter runs strictly after the journal's writer has been closed, so
//! reads need no coordination; journals from independent sources are
//! independent files.

use crate::{
    attachment::AttachmentSet,
    dump::DUMP_FILE_EXTENSION,
    helpers::plural,
    journal::{JOURNAL_FILE_EXTENSION, JournalEntry, JournalEventKind, read_journal},
    test_case::{TestCaseId, TestCaseRef},
};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use std::{
    collections::HashSet,
    io::{self, Write},
};
use tracing::{debug, warn};

/// Name identifying attachment sets that carry crash-attribution evidence.
pub const EVIDENCE_ATTACHMENT_NAME: &str = "testblame";

/// A run-completion notification delivered to the reporter.
#[derive(Clone, Debug)]
pub struct RunCompleteEvent {
    /// True if the run was aborted rather than running to completion.
    pub aborted: bool,

    /// The attachment sets collected over the run.
    pub attachment_sets: Vec<AttachmentSet>,
}

/// The attribution produced for one aborted run.
///
/// Built fresh per run and not persisted; the journal files themselves remain
/// the durable evidence.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AttributionReport {
    /// Tests presumed active at the moment of failure: one per source that
    /// left an unmatched start behind, in journal order.
    pub faulty_tests: Vec<TestCaseRef>,

    /// Dump files associated with the aborted host(s).
    pub dump_files: Vec<Utf8PathBuf>,
}

/// Where the reporter is in its per-run lifecycle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ReporterState {
    Idle,
    Collecting,
    Reporting,
}

/// Produces post-mortem diagnostics for aborted test runs.
///
/// Drive it with [`on_run_start`](Self::on_run_start) when a run begins and
/// [`on_run_complete`](Self::on_run_complete) when it ends. The reporter
/// degrades gracefully: unreadable or empty evidence shrinks the report, and
/// an aborted run with no identifiable faulty test emits nothing.
#[derive(Debug)]
pub struct BlameReporter<W> {
    output: W,
    state: ReporterState,
}

impl BlameReporter<io::Stderr> {
    /// Creates a reporter writing to the standard diagnostic stream.
    pub fn to_stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: io::Write> BlameReporter<W> {
    /// Creates a reporter writing to `output`.
    pub fn new(output: W) -> Self {
        Self {
            output,
            state: ReporterState::Idle,
        }
    }

    /// Consumes the reporter, returning the underlying output stream.
    pub fn into_inner(self) -> W {
        self.output
    }

    /// Notes that a run has started collecting evidence.
    pub fn on_run_start(&mut self) {
        if self.state != ReporterState::Idle {
            debug!("run started while the reporter was {:?}", self.state);
        }
        self.state = ReporterState::Collecting;
    }

    /// Handles run completion.
    ///
    /// For aborted runs, reads the journal evidence among the attachments and
    /// writes the attribution report to the diagnostic stream. Returns the
    /// report, which is empty for runs that weren't aborted.
    pub fn on_run_complete(&mut self, event: &RunCompleteEvent) -> io::Result<AttributionReport> {
        if self.state != ReporterState::Collecting {
            // The evidence is still worth reporting; note the misuse and
            // carry on.
            debug!("run completed while the reporter was {:?}", self.state);
        }
        self.state = ReporterState::Reporting;

        let report = if event.aborted {
            let report = build_report(event);
            self.write_report(&report)?;
            report
        } else {
            AttributionReport::default()
        };

        self.state = ReporterState::Idle;
        Ok(report)
    }

    fn write_report(&mut self, report: &AttributionReport) -> io::Result<()> {
        if report.faulty_tests.is_empty() {
            return Ok(());
        }

        let count = report.faulty_tests.len();
        writeln!(self.output)?;
        writeln!(
            self.output,
            "The active test run was aborted. The following {} {} presumed to have been \
             running at the time of failure:",
            plural::tests_str(count),
            plural::were_plural_if(count != 1),
        )?;
        for test_case in &report.faulty_tests {
            writeln!(self.output, "  {} ({})", test_case.name, test_case.source)?;
        }

        if !report.dump_files.is_empty() {
            writeln!(
                self.output,
                "Collected {}:",
                plural::crash_dumps_str(report.dump_files.len()),
            )?;
            for dump_file in &report.dump_files {
                writeln!(self.output, "  {dump_file}")?;
            }
        }

        self.output.flush()
    }
}

/// Builds the attribution for one aborted run from its attachments.
fn build_report(event: &RunCompleteEvent) -> AttributionReport {
    let mut report = AttributionReport::default();

    for set in &event.attachment_sets {
        if set.name == EVIDENCE_ATTACHMENT_NAME {
            match set.last_with_extension(JOURNAL_FILE_EXTENSION) {
                Some(journal) => match read_journal(&journal.path) {
                    Ok(entries) => report.faulty_tests.extend(faulty_tests(&entries)),
                    Err(error) => {
                        // Unreadable evidence narrows the report, it doesn't
                        // fail the post-mortem.
                        warn!("could not read execution journal `{}`: {error}", journal.path);
                    }
                },
                None => {
                    debug!("evidence attachment set `{}` has no journal file", set.name);
                }
            }
        }

        for attachment in &set.attachments {
            if attachment.path.extension() == Some(DUMP_FILE_EXTENSION) {
                report.dump_files.push(attachment.path.clone());
            }
        }
    }

    report
}

/// Applies the faulty-test heuristic to one journal's entries.
///
/// Per distinct source, the last test the source started without a later
/// matching completion is presumed to be the one active at crash time.
/// Sources contribute independently and in the order they first appear in
/// the journal.
pub fn faulty_tests(entries: &[JournalEntry]) -> Vec<TestCaseRef> {
    let mut by_source: IndexMap<&Utf8Path, Vec<&JournalEntry>> = IndexMap::new();
    for entry in entries {
        by_source
            .entry(entry.test_case.source.as_path())
            .or_default()
            .push(entry);
    }

    let mut faulty = Vec::new();
    for entries in by_source.values() {
        let mut completed: HashSet<TestCaseId> = HashSet::new();
        // Scan backwards: the first unmatched start from the end is the last
        // test this source was still running.
        for entry in entries.iter().rev() {
            match entry.kind {
                JournalEventKind::Completed => {
                    completed.insert(entry.test_case.id);
                }
                JournalEventKind::Started => {
                    if !completed.contains(&entry.test_case.id) {
                        faulty.push(entry.test_case.clone());
                        break;
                    }
                }
            }
        }
    }
    faulty
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        attachment::Attachment,
        journal::JournalWriter,
        test_case::TestCaseRef,
    };
    use camino::Utf8Path;
    use pretty_assertions::assert_eq;

    fn test_case(name: &str, source: &str) -> TestCaseRef {
        TestCaseRef::new(
            TestCaseId::new_random(),
            name,
            source,
            "executor://testblame/native",
        )
    }

    fn names(tests: &[TestCaseRef]) -> Vec<&str> {
        tests.iter().map(|test| test.name.as_str()).collect()
    }

    #[test]
    fn test_unmatched_start_is_faulty() {
        let a = test_case("suite::a", "/work/tests/host");
        let b = test_case("suite::b", "/work/tests/host");
        let entries = vec![
            JournalEntry::started(a.clone()),
            JournalEntry::started(b.clone()),
            JournalEntry::completed(a),
        ];

        assert_eq!(names(&faulty_tests(&entries)), vec!["suite::b"]);
    }

    #[test]
    fn test_all_completed_means_no_faulty_test() {
        let a = test_case("suite::a", "/work/tests/host");
        let entries = vec![
            JournalEntry::started(a.clone()),
            JournalEntry::completed(a),
        ];

        assert!(faulty_tests(&entries).is_empty());
        assert!(faulty_tests(&[]).is_empty());
    }

    #[test]
    fn test_sources_contribute_independently() {
        let one = test_case("one::slow", "/work/tests/host-one");
        let two_done = test_case("two::done", "/work/tests/host-two");
        let two_hung = test_case("two::hung", "/work/tests/host-two");
        let entries = vec![
            JournalEntry::started(one.clone()),
            JournalEntry::started(two_done.clone()),
            JournalEntry::completed(two_done),
            JournalEntry::started(two_hung.clone()),
        ];

        assert_eq!(names(&faulty_tests(&entries)), vec!["one::slow", "two::hung"]);
    }

    #[test]
    fn test_interleaved_completion_after_restart() {
        // started(A), completed(A), started(A): the final start is unmatched.
        let a = test_case("suite::retried", "/work/tests/host");
        let entries = vec![
            JournalEntry::started(a.clone()),
            JournalEntry::completed(a.clone()),
            JournalEntry::started(a.clone()),
        ];

        assert_eq!(names(&faulty_tests(&entries)), vec!["suite::retried"]);
    }

    fn evidence_set(journal_path: &Utf8Path) -> AttachmentSet {
        let mut set = AttachmentSet::new(EVIDENCE_ATTACHMENT_NAME);
        set.push(Attachment::new(journal_path, "execution journal"));
        set
    }

    #[test]
    fn test_aborted_run_reports_faulty_test() {
        let temp_dir = camino_tempfile::tempdir().expect("tempdir should be created");
        let journal_path = temp_dir.path().join("journal.jsonl");
        let mut writer = JournalWriter::create(&journal_path).expect("journal should be created");
        let done = test_case("suite::done", "/work/tests/host");
        let hung = test_case("suite::hung", "/work/tests/host");
        writer
            .append(&JournalEntry::started(done.clone()))
            .expect("append should succeed");
        writer
            .append(&JournalEntry::completed(done))
            .expect("append should succeed");
        writer
            .append(&JournalEntry::started(hung))
            .expect("append should succeed");
        writer.finish().expect("finish should succeed");

        let mut reporter = BlameReporter::new(Vec::new());
        reporter.on_run_start();
        let report = reporter
            .on_run_complete(&RunCompleteEvent {
                aborted: true,
                attachment_sets: vec![evidence_set(&journal_path)],
            })
            .expect("reporting should succeed");

        assert_eq!(names(&report.faulty_tests), vec!["suite::hung"]);
        let output = String::from_utf8(reporter.into_inner()).expect("report should be UTF-8");
        assert!(
            output.contains("The active test run was aborted"),
            "missing banner: {output}"
        );
        assert!(output.contains("suite::hung"), "missing test name: {output}");
    }

    #[test]
    fn test_completed_run_reports_nothing() {
        let mut reporter = BlameReporter::new(Vec::new());
        reporter.on_run_start();
        let report = reporter
            .on_run_complete(&RunCompleteEvent {
                aborted: false,
                attachment_sets: vec![],
            })
            .expect("reporting should succeed");

        assert_eq!(report, AttributionReport::default());
        assert!(reporter.into_inner().is_empty());
    }

    #[test]
    fn test_aborted_run_with_empty_journal_emits_nothing() {
        let temp_dir = camino_tempfile::tempdir().expect("tempdir should be created");
        let journal_path = temp_dir.path().join("journal.jsonl");
        JournalWriter::create(&journal_path)
            .expect("journal should be created")
            .finish()
            .expect("finish should succeed");

        let mut reporter = BlameReporter::new(Vec::new());
        reporter.on_run_start();
        let report = reporter
            .on_run_complete(&RunCompleteEvent {
                aborted: true,
                attachment_sets: vec![evidence_set(&journal_path)],
            })
            .expect("reporting should succeed");

        assert!(report.faulty_tests.is_empty());
        assert!(reporter.into_inner().is_empty());
    }

    #[test]
    fn test_aborted_run_with_unreadable_journal_emits_nothing() {
        let mut reporter = BlameReporter::new(Vec::new());
        reporter.on_run_start();
        let report = reporter
            .on_run_complete(&RunCompleteEvent {
                aborted: true,
                attachment_sets: vec![evidence_set(Utf8Path::new(
                    "/nonexistent/journal.jsonl",
                ))],
            })
            .expect("reporting should succeed");

        assert!(report.faulty_tests.is_empty());
        assert!(reporter.into_inner().is_empty());
    }

    #[test]
    fn test_dump_files_are_cross_referenced() {
        let temp_dir = camino_tempfile::tempdir().expect("tempdir should be created");
        let journal_path = temp_dir.path().join("journal.jsonl");
        let mut writer = JournalWriter::create(&journal_path).expect("journal should be created");
        writer
            .append(&JournalEntry::started(test_case(
                "suite::hung",
                "/work/tests/host",
            )))
            .expect("append should succeed");
        writer.finish().expect("finish should succeed");

        let mut dumps = AttachmentSet::new("crash-dumps");
        dumps.push(Attachment::new("/results/dumps/host_4242_tok.dmp", "crash dump"));

        let mut reporter = BlameReporter::new(Vec::new());
        reporter.on_run_start();
        let report = reporter
            .on_run_complete(&RunCompleteEvent {
                aborted: true,
                attachment_sets: vec![evidence_set(&journal_path), dumps],
            })
            .expect("reporting should succeed");

        assert_eq!(
            report.dump_files,
            vec![Utf8PathBuf::from("/results/dumps/host_4242_tok.dmp")],
        );
        let output = String::from_utf8(reporter.into_inner()).expect("report should be UTF-8");
        assert!(
            output.contains("host_4242_tok.dmp"),
            "missing dump path: {output}"
        );
    }
}
