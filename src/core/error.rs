// This module defines error types for the Archer instrumentation core using the
// thiserror crate for idiomatic Rust error handling. InstrumentError covers the
// fatal failure taxonomy: malformed region/task nesting at the representation
// level, parallel markers in blocks unreachable from the function entry, and
// pass-state violations (a compilation unit driven out of its strict
// NotStarted -> Analyzed -> HbBuilt -> Instrumented -> Done sequence). Each
// variant carries the function name and source line needed to surface the
// failure on the host compiler's diagnostic channel. Recoverable conditions
// (unmatched synchronization, unknown constructs) are NOT errors; they are
// reported through the diagnostics sink and degrade instrumentation coverage
// instead of aborting the unit.

//! Error types for the instrumentation pipeline.
//!
//! Using thiserror for more idiomatic error handling.

use thiserror::Error;

/// Fatal errors that abort the pass for one compilation unit.
#[derive(Error, Debug)]
pub enum InstrumentError {
    #[error("malformed parallel nesting in '{function}' at line {line}: {reason}")]
    MalformedNesting {
        function: String,
        line: u32,
        reason: String,
    },

    #[error("parallel marker in unreachable block of '{function}' at line {line}")]
    MarkerUnreachable {
        function: String,
        line: u32,
    },

    #[error("region opened in '{function}' at line {line} is never closed")]
    RegionNotClosed {
        function: String,
        line: u32,
    },

    #[error("invalid pass state: expected {expected}, unit is {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },
}

/// Result type alias for instrumentation operations.
pub type InstrumentResult<T> = Result<T, InstrumentError>;
