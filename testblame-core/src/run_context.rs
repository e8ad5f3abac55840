// Copyright (c) The testblame Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-run artifact tracking.

use crate::{
    attachment::{Attachment, AttachmentSet},
    dump::DumpResult,
};
use camino::Utf8PathBuf;
use std::sync::Mutex;

/// The name of the attachment set a [`RunContext`] drains into.
pub const CRASH_DUMPS_ATTACHMENT_NAME: &str = "crash-dumps";

/// Artifacts collected over the lifetime of one test run.
///
/// Owned by the run orchestrator and scoped to a single run, so concurrent
/// runs never observe each other's dump files. Capture tasks report resolved
/// dumps here as they finish; at run completion the context is drained into
/// an attachment set for the attribution reporter.
#[derive(Debug, Default)]
pub struct RunContext {
    dump_files: Mutex<Vec<Utf8PathBuf>>,
}

impl RunContext {
    /// Creates an empty context for a new run.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a resolved dump file.
    pub fn add_dump_file(&self, path: Utf8PathBuf) {
        self.dump_files
            .lock()
            .expect("dump-file lock poisoned")
            .push(path);
    }

    /// Records the outcome of a finished capture, keeping the dump file if
    /// one was produced.
    pub fn add_dump_result(&self, result: &DumpResult) {
        if let Some(dump_file) = &result.dump_file {
            self.add_dump_file(dump_file.clone());
        }
    }

    /// Returns the dump files recorded so far, in arrival order.
    pub fn dump_files(&self) -> Vec<Utf8PathBuf> {
        self.dump_files
            .lock()
            .expect("dump-file lock poisoned")
            .clone()
    }

    /// Drains the context into an attachment set for run completion.
    ///
    /// Returns `None` when no dump was collected.
    pub fn into_attachment_set(self) -> Option<AttachmentSet> {
        let dump_files = self
            .dump_files
            .into_inner()
            .expect("dump-file lock poisoned");
        if dump_files.is_empty() {
            return None;
        }

        let mut set = AttachmentSet::new(CRASH_DUMPS_ATTACHMENT_NAME);
        for path in dump_files {
            set.push(Attachment::new(path, "crash dump"));
        }
        Some(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_drains_into_attachment_set() {
        let context = RunContext::new();
        context.add_dump_file("/results/dumps/host_1.dmp".into());
        context.add_dump_result(&DumpResult {
            dump_file: Some("/results/dumps/host_2.dmp".into()),
            succeeded: true,
        });
        // Failed captures contribute nothing.
        context.add_dump_result(&DumpResult {
            dump_file: None,
            succeeded: false,
        });

        let set = context
            .into_attachment_set()
            .expect("dumps were collected");
        assert_eq!(set.name, CRASH_DUMPS_ATTACHMENT_NAME);
        let paths: Vec<_> = set
            .attachments
            .iter()
            .map(|attachment| attachment.path.as_str())
            .collect();
        assert_eq!(
            paths,
            vec!["/results/dumps/host_1.dmp", "/results/dumps/host_2.dmp"],
        );
    }

    #[test]
    fn test_empty_context_yields_no_attachment_set() {
        assert_eq!(RunContext::new().into_attachment_set(), None);
    }
}
