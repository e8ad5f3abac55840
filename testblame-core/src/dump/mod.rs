// Copyright (c) The testblame Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Crash dump capture for test host processes.
//!
//! The [`DumpSupervisor`] launches an external memory-dump tool (procdump)
//! against a running test host and resolves the file it produces once the
//! tool exits. Capture is best-effort diagnostic tooling: every failure mode
//! short of a caller bug resolves to a "no dump produced" [`DumpResult`]
//! rather than an error, and the test run is never aborted on the
//! supervisor's account.

mod supervisor;
mod tool;

pub use supervisor::{DUMP_FILE_EXTENSION, DumpRequest, DumpResult, DumpSupervisor};
pub use tool::{DumpToolLocation, PROCDUMP_EXECUTABLE, PROCDUMP_PATH_ENV};
