// Copyright (c) The testblame Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Locating the external crash dump tool.

use crate::errors::DumpToolResolveError;
use camino::{Utf8Path, Utf8PathBuf};

/// The environment variable naming the directory that contains the procdump
/// executable.
pub const PROCDUMP_PATH_ENV: &str = "PROCDUMP_PATH";

cfg_if::cfg_if! {
    if #[cfg(all(windows, target_arch = "x86"))] {
        /// The procdump executable name for this platform and architecture.
        pub const PROCDUMP_EXECUTABLE: &str = "procdump.exe";
    } else if #[cfg(windows)] {
        /// The procdump executable name for this platform and architecture.
        pub const PROCDUMP_EXECUTABLE: &str = "procdump64.exe";
    } else {
        /// The procdump executable name for this platform and architecture.
        pub const PROCDUMP_EXECUTABLE: &str = "procdump";
    }
}

/// The resolved location of the crash dump tool executable.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DumpToolLocation {
    executable: Utf8PathBuf,
}

impl DumpToolLocation {
    /// Resolves the dump tool from the [`PROCDUMP_PATH_ENV`] environment
    /// variable.
    ///
    /// The variable names the directory containing procdump; the executable
    /// name within it is selected for the current platform and processor
    /// architecture. Resolution failures are configuration errors: callers
    /// report them per capture attempt and carry on without a dump.
    pub fn resolve() -> Result<Self, DumpToolResolveError> {
        match std::env::var(PROCDUMP_PATH_ENV) {
            Ok(dir) => Self::in_directory(Utf8PathBuf::from(dir)),
            Err(std::env::VarError::NotPresent) => Err(DumpToolResolveError::EnvVarNotSet {
                var: PROCDUMP_PATH_ENV,
            }),
            Err(std::env::VarError::NotUnicode(_)) => Err(DumpToolResolveError::EnvVarInvalid {
                var: PROCDUMP_PATH_ENV,
            }),
        }
    }

    /// Resolves the platform-appropriate executable inside `dir`.
    pub fn in_directory(dir: impl Into<Utf8PathBuf>) -> Result<Self, DumpToolResolveError> {
        let executable = dir.into().join(PROCDUMP_EXECUTABLE);
        if !executable.is_file() {
            return Err(DumpToolResolveError::ToolNotFound { path: executable });
        }
        Ok(Self { executable })
    }

    /// Uses `executable` directly, with no existence check.
    ///
    /// Intended for explicit configuration and tests.
    pub fn from_path(executable: impl Into<Utf8PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Returns the path to the dump tool executable.
    pub fn executable(&self) -> &Utf8Path {
        &self.executable
    }
}
