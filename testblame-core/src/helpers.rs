// Copyright (c) The testblame Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! General support code for testblame-core.

/// Utilities for pluralizing report wording based on count.
pub(crate) mod plural {
    /// Returns "were" if `plural` is true, otherwise "was".
    pub(crate) fn were_plural_if(plural: bool) -> &'static str {
        if plural { "were" } else { "was" }
    }

    /// Returns "test" if `count` is 1, otherwise "tests".
    pub(crate) fn tests_str(count: usize) -> &'static str {
        if count == 1 { "test" } else { "tests" }
    }

    /// Returns "crash dump" if `count` is 1, otherwise "crash dumps".
    pub(crate) fn crash_dumps_str(count: usize) -> &'static str {
        if count == 1 { "crash dump" } else { "crash dumps" }
    }
}
