// Copyright (c) The testblame Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Run-level attachments handed from collectors to the run orchestrator.
//!
//! Attachments are how evidence survives the boundary between a run and its
//! post-mortem: journals and crash dumps are attached during the run and
//! resolved by the [`blame`](crate::blame) reporter afterwards.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// A single file attached to a test run.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Attachment {
    /// The path to the attached file.
    pub path: Utf8PathBuf,

    /// A short human-readable description of the attachment.
    pub description: String,
}

impl Attachment {
    /// Creates a new `Attachment`.
    pub fn new(path: impl Into<Utf8PathBuf>, description: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            description: description.into(),
        }
    }
}

/// A named set of attachments contributed by one collaborator.
///
/// The name identifies the producer; consumers filter on it to find the sets
/// they know how to interpret.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct AttachmentSet {
    /// The name identifying which collaborator produced this set.
    pub name: String,

    /// The attachments in this set, in the order they were added.
    pub attachments: Vec<Attachment>,
}

impl AttachmentSet {
    /// Creates an empty `AttachmentSet` with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attachments: Vec::new(),
        }
    }

    /// Adds an attachment to the set.
    pub fn push(&mut self, attachment: Attachment) {
        self.attachments.push(attachment);
    }

    /// Returns the last attachment whose path carries the given extension.
    pub fn last_with_extension(&self, extension: &str) -> Option<&Attachment> {
        self.attachments
            .iter()
            .rev()
            .find(|attachment| attachment.path.extension() == Some(extension))
    }
}
