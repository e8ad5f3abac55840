// Copyright (c) The testblame Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core crash-attribution logic for testblame.
//!
//! testblame answers one question about a test run that died: *which test was
//! executing at the moment of failure?* Four cooperating pieces:
//!
//! - [`journal`] -- an append-only, crash-tolerant record of test start/end
//!   events, durable up to the last fsynced record.
//! - [`recorder`] -- receives start/end/result notifications from test
//!   adapters during a run, keeps the journal current, and forwards
//!   deduplicated events to the run's results cache and observers.
//! - [`dump`] -- launches and supervises an external memory-dump tool against
//!   a test host process, best-effort and detached from test execution.
//! - [`blame`] -- after an aborted run, reads the surviving evidence and names
//!   the test(s) presumed active when each host went down.

pub mod attachment;
pub mod blame;
pub mod dump;
pub mod errors;
mod helpers;
pub mod journal;
pub mod recorder;
pub mod run_context;
pub mod test_case;
