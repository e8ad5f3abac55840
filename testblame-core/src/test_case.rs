// Copyright (c) The testblame Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test case identity, reference and outcome types.

use crate::errors::TestOutcomeParseError;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Uniquely identifies one test case within a run.
///
/// This is the primary key for deduplicating start/end notifications: two
/// notifications carrying the same `TestCaseId` refer to the same test case,
/// whatever their display names say.
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(transparent)]
pub struct TestCaseId(Uuid);

impl TestCaseId {
    /// Creates a new `TestCaseId` from the given UUID.
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Creates a new random `TestCaseId`.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for TestCaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A reference to a single test case within a run.
///
/// Immutable once created. The [`id`](Self::id) is the identity used for
/// deduplication; the remaining fields describe where the test came from and
/// how to display it.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TestCaseRef {
    /// The identity of the test case.
    pub id: TestCaseId,

    /// The fully qualified name of the test case.
    pub name: String,

    /// The source (test binary or container) the test case belongs to.
    pub source: Utf8PathBuf,

    /// The URI of the adapter that executes this test case.
    pub adapter_uri: String,
}

impl TestCaseRef {
    /// Creates a new `TestCaseRef`.
    pub fn new(
        id: TestCaseId,
        name: impl Into<String>,
        source: impl Into<Utf8PathBuf>,
        adapter_uri: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            source: source.into(),
            adapter_uri: adapter_uri.into(),
        }
    }
}

/// The outcome of a test case, attached to result notifications.
///
/// Outcomes travel with results and are independent of journal state: a
/// journal can contain an unmatched start for a test that nevertheless has a
/// cached result, and vice versa.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestOutcome {
    /// The test passed.
    Passed,

    /// The test failed.
    Failed,

    /// The test was skipped.
    Skipped,

    /// The test was not found by its adapter.
    NotFound,
}

impl TestOutcome {
    /// Returns string representations of all known variants.
    pub fn variants() -> [&'static str; 4] {
        ["passed", "failed", "skipped", "not-found"]
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => write!(f, "passed"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
            Self::NotFound => write!(f, "not-found"),
        }
    }
}

impl FromStr for TestOutcome {
    type Err = TestOutcomeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "passed" => Ok(Self::Passed),
            "failed" => Ok(Self::Failed),
            "skipped" => Ok(Self::Skipped),
            "not-found" => Ok(Self::NotFound),
            other => Err(TestOutcomeParseError::new(other)),
        }
    }
}

/// A result notification for a single test case.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TestCaseResult {
    /// The test case this result belongs to.
    pub test_case: TestCaseRef,

    /// The outcome of the test case.
    pub outcome: TestOutcome,
}

impl TestCaseResult {
    /// Creates a new `TestCaseResult`.
    pub fn new(test_case: TestCaseRef, outcome: TestOutcome) -> Self {
        Self { test_case, outcome }
    }
}
