// Copyright (c) The testblame Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Launching and supervising crash dump captures.

use super::tool::DumpToolLocation;
use crate::errors::DumpToolResolveError;
use camino::{Utf8Path, Utf8PathBuf};
use std::{io, process::Stdio, time::SystemTime};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

/// The file extension procdump gives the dumps it writes.
pub const DUMP_FILE_EXTENSION: &str = "dmp";

/// Supervises crash dump captures against test host processes.
///
/// Captures run as detached child processes, independent of and concurrent
/// with test execution. Several captures may be in flight at once when
/// multiple hosts run in parallel; each capture's token keeps its output file
/// names from colliding with any other capture's.
#[derive(Clone, Debug)]
pub struct DumpSupervisor {
    /// A pre-resolved tool location, or `None` to resolve from the
    /// environment on each capture attempt.
    tool: Option<DumpToolLocation>,
}

impl DumpSupervisor {
    /// Creates a supervisor that resolves the dump tool from the environment
    /// on each capture attempt.
    pub fn from_environment() -> Self {
        Self { tool: None }
    }

    /// Creates a supervisor that launches the given dump tool.
    pub fn new(tool: DumpToolLocation) -> Self {
        Self { tool: Some(tool) }
    }

    /// Launches a dump capture against the process with `pid`.
    ///
    /// The output file name is composed from `process_name`, `pid` and
    /// `token`, so captures with distinct tokens can share `output_dir`
    /// safely. The tool is spawned detached and this returns immediately;
    /// await the returned request to learn the outcome.
    ///
    /// An unresolvable tool location is a configuration error, surfaced per
    /// capture attempt. A launch failure (tool missing, spawn denied) is
    /// instead folded into the request and surfaces as a failed
    /// [`DumpResult`]: capture is diagnostic tooling and must not take the
    /// run down with it.
    pub fn start_capture(
        &self,
        pid: u32,
        process_name: &str,
        token: &str,
        output_dir: &Utf8Path,
    ) -> Result<DumpRequest, DumpToolResolveError> {
        let tool = match &self.tool {
            Some(tool) => tool.clone(),
            None => DumpToolLocation::resolve()?,
        };

        let file_stem = format!("{process_name}_{pid}_{token}");
        let dump_file_name = format!("{file_stem}.{DUMP_FILE_EXTENSION}");

        let child = match spawn_tool(&tool, pid, &dump_file_name, output_dir) {
            Ok(child) => {
                debug!(
                    "capturing crash dump of pid {pid} into `{output_dir}/{dump_file_name}`"
                );
                Some(child)
            }
            Err(error) => {
                warn!("failed to launch crash dump tool for pid {pid}: {error}");
                None
            }
        };

        Ok(DumpRequest {
            pid,
            file_stem,
            output_dir: output_dir.to_owned(),
            child,
        })
    }
}

fn spawn_tool(
    tool: &DumpToolLocation,
    pid: u32,
    dump_file_name: &str,
    output_dir: &Utf8Path,
) -> io::Result<Child> {
    std::fs::create_dir_all(output_dir)?;

    let mut command = Command::new(tool.executable());
    command
        .args(["-accepteula", "-t", "-ma"])
        .arg(pid.to_string())
        .arg(dump_file_name)
        .current_dir(output_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        // If the caller cancels the wait, the tool keeps running: killing it
        // mid-capture leaves a corrupt dump and gains nothing.
        .kill_on_drop(false);
    command.spawn()
}

/// An in-flight crash dump capture.
///
/// Created by [`DumpSupervisor::start_capture`]; lives until
/// [`wait`](Self::wait) resolves it or the capture is abandoned.
#[derive(Debug)]
pub struct DumpRequest {
    pid: u32,
    file_stem: String,
    output_dir: Utf8PathBuf,
    child: Option<Child>,
}

impl DumpRequest {
    /// Returns the stem that dump files for this capture are named with.
    pub fn file_stem(&self) -> &str {
        &self.file_stem
    }

    /// Waits for the dump tool to exit, then resolves the dump file it
    /// produced.
    ///
    /// Blocks its own task only, with no supervisor-imposed timeout: if the
    /// tool never exits, this never resolves. A caller needing bounded
    /// latency should wrap the wait in its own timeout and drop the request
    /// on expiry; the tool is left running either way.
    ///
    /// Every failure mode (launch failed, wait failed, no file produced)
    /// resolves to a failed [`DumpResult`] -- a missing dump is a diagnostic
    /// gap, not a run failure.
    pub async fn wait(mut self) -> DumpResult {
        let Some(child) = self.child.as_mut() else {
            return DumpResult::failed();
        };

        match child.wait().await {
            Ok(status) => {
                if !status.success() {
                    debug!("crash dump tool for pid {} exited with {status}", self.pid);
                }
            }
            Err(error) => {
                warn!(
                    "failed to wait for crash dump tool for pid {}: {error}",
                    self.pid
                );
                return DumpResult::failed();
            }
        }

        match self.resolve_dump_file() {
            Some(dump_file) => DumpResult {
                dump_file: Some(dump_file),
                succeeded: true,
            },
            None => {
                debug!(
                    "no dump file matching `{}` found in `{}`",
                    self.file_stem, self.output_dir
                );
                DumpResult::failed()
            }
        }
    }

    /// Finds the dump file for this capture in the output directory.
    ///
    /// Stale files from retried captures can leave several matches; the most
    /// recently modified one wins, with equal timestamps broken by name so
    /// the pick stays deterministic.
    fn resolve_dump_file(&self) -> Option<Utf8PathBuf> {
        let entries = match self.output_dir.read_dir_utf8() {
            Ok(entries) => entries,
            Err(error) => {
                warn!(
                    "failed to read dump output directory `{}`: {error}",
                    self.output_dir
                );
                return None;
            }
        };

        let mut candidates: Vec<(SystemTime, Utf8PathBuf)> = Vec::new();
        for entry in entries {
            let Ok(entry) = entry else { continue };
            if !entry.file_name().starts_with(&self.file_stem) {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|metadata| metadata.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            candidates.push((modified, entry.into_path()));
        }

        if candidates.len() > 1 {
            warn!(
                "{} dump files match `{}` in `{}`; picking the most recent",
                candidates.len(),
                self.file_stem,
                self.output_dir,
            );
        }
        candidates.sort();
        candidates.pop().map(|(_, path)| path)
    }
}

/// The outcome of a crash dump capture.
///
/// Produced exactly once per [`DumpRequest`], after the dump tool exits.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DumpResult {
    /// The resolved dump file, if one was produced.
    pub dump_file: Option<Utf8PathBuf>,

    /// Whether the capture produced a usable dump.
    pub succeeded: bool,
}

impl DumpResult {
    fn failed() -> Self {
        Self {
            dump_file: None,
            succeeded: false,
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use camino::Utf8Path;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    /// Writes a fake procdump that writes its output-file argument, and
    /// returns a supervisor using it.
    ///
    /// Invocation shape matches the real tool: `-accepteula -t -ma <pid>
    /// <file>`, so the output file is `$5`.
    fn fake_tool_supervisor(dir: &Utf8Path, script_body: &str) -> DumpSupervisor {
        use std::os::unix::fs::PermissionsExt;

        let tool_path = dir.join("procdump");
        std::fs::write(&tool_path, format!("#!/bin/sh\n{script_body}\n"))
            .expect("fake tool should be written");
        std::fs::set_permissions(&tool_path, std::fs::Permissions::from_mode(0o755))
            .expect("fake tool should be executable");
        DumpSupervisor::new(DumpToolLocation::from_path(tool_path))
    }

    #[tokio::test]
    async fn test_capture_produces_dump() {
        let temp_dir = camino_tempfile::tempdir().expect("tempdir should be created");
        let supervisor = fake_tool_supervisor(temp_dir.path(), r#"printf 'MDMP' > "$5""#);
        let output_dir = temp_dir.path().join("dumps");

        let request = supervisor
            .start_capture(4242, "testhost", "tok-a", &output_dir)
            .expect("tool location is pre-resolved");
        assert_eq!(request.file_stem(), "testhost_4242_tok-a");

        let result = request.wait().await;
        assert!(result.succeeded);
        assert_eq!(
            result.dump_file,
            Some(output_dir.join("testhost_4242_tok-a.dmp"))
        );
    }

    #[tokio::test]
    async fn test_concurrent_captures_do_not_collide() {
        let temp_dir = camino_tempfile::tempdir().expect("tempdir should be created");
        let supervisor = fake_tool_supervisor(temp_dir.path(), r#"printf 'MDMP' > "$5""#);
        let output_dir = temp_dir.path().join("dumps");

        let first = supervisor
            .start_capture(100, "testhost", "tok-1", &output_dir)
            .expect("tool location is pre-resolved");
        let second = supervisor
            .start_capture(100, "testhost", "tok-2", &output_dir)
            .expect("tool location is pre-resolved");

        let (first, second) = tokio::join!(first.wait(), second.wait());
        let first_file = first.dump_file.expect("first capture should produce a dump");
        let second_file = second
            .dump_file
            .expect("second capture should produce a dump");
        assert_ne!(first_file, second_file);
    }

    #[tokio::test]
    async fn test_launch_failure_is_a_failed_result() {
        let supervisor =
            DumpSupervisor::new(DumpToolLocation::from_path("/nonexistent/procdump"));
        let temp_dir = camino_tempfile::tempdir().expect("tempdir should be created");

        let request = supervisor
            .start_capture(4242, "testhost", "tok-a", temp_dir.path())
            .expect("tool location is pre-resolved");
        let result = request.wait().await;
        assert_eq!(result, DumpResult::failed());
    }

    #[tokio::test]
    async fn test_no_file_produced_is_a_failed_result() {
        let temp_dir = camino_tempfile::tempdir().expect("tempdir should be created");
        let supervisor = fake_tool_supervisor(temp_dir.path(), "exit 0");
        let output_dir = temp_dir.path().join("dumps");

        let request = supervisor
            .start_capture(4242, "testhost", "tok-a", &output_dir)
            .expect("tool location is pre-resolved");
        let result = request.wait().await;
        assert!(!result.succeeded);
        assert_eq!(result.dump_file, None);
    }

    #[tokio::test]
    async fn test_multiple_matches_resolve_to_most_recent() {
        let temp_dir = camino_tempfile::tempdir().expect("tempdir should be created");
        // The tool exits without writing; both candidates are pre-staged
        // stale files with different modification times.
        let supervisor = fake_tool_supervisor(temp_dir.path(), "exit 0");
        let output_dir = temp_dir.path().join("dumps");
        std::fs::create_dir_all(&output_dir).expect("output dir should be created");

        let older = output_dir.join("testhost_4242_tok-a.dmp");
        std::fs::write(&older, b"MDMP-old").expect("older dump should be written");
        tokio::time::sleep(Duration::from_millis(50)).await;
        let newer = output_dir.join("testhost_4242_tok-a(1).dmp");
        std::fs::write(&newer, b"MDMP-new").expect("newer dump should be written");

        let request = supervisor
            .start_capture(4242, "testhost", "tok-a", &output_dir)
            .expect("tool location is pre-resolved");
        let result = request.wait().await;
        assert!(result.succeeded);
        assert_eq!(result.dump_file, Some(newer));
    }
}
