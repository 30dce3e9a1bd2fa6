// This module defines the recoverable diagnostics emitted by the analysis and
// instrumentation passes. Unlike InstrumentError (fatal, aborts the unit), a
// Diagnostic records a condition the pipeline survives by degrading coverage:
// unmatched lock acquire/release pairs, tasks that are never awaited, barriers
// that are not a total synchronization cut, calls to constructs outside the
// marker catalog, and attempts to re-instrument an already instrumented module.
// Each diagnostic names the function and source line it refers to; the detail
// string (lock or task identity, callee name) is interned in the session arena.

//! Recoverable diagnostics.
//!
//! These never abort compilation; they mark synchronization constructs whose
//! instrumentation is skipped, or coverage the pipeline could not provide.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A lock acquire with no matching release on some path.
    UnmatchedAcquire,
    /// A lock release with no matching acquire.
    UnmatchedRelease,
    /// A lock acquired again while already held.
    DoubleAcquire,
    /// A `task.wait` naming a task that was never spawned in scope.
    UnmatchedWait,
    /// A spawned task with no `task.wait` anywhere in its parent region.
    TaskNeverAwaited,
    /// A barrier whose block does not dominate its region's exits; it is not
    /// treated as a synchronization cut.
    BarrierNotTotal,
    /// A call inside a parallel region to something outside the marker and
    /// hook catalogs; left opaque and uninstrumented.
    UnknownConstruct,
    /// A happens-before annotation that does not fit the packed tag layout;
    /// the hook is dropped rather than emitted with a colliding tag.
    TagOverflow,
    /// The module already carries instrumentation; the pipeline refused to run.
    AlreadyInstrumented,
}

impl DiagnosticKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            DiagnosticKind::UnmatchedAcquire => "unmatched lock acquire",
            DiagnosticKind::UnmatchedRelease => "unmatched lock release",
            DiagnosticKind::DoubleAcquire => "lock acquired while already held",
            DiagnosticKind::UnmatchedWait => "wait on unknown task",
            DiagnosticKind::TaskNeverAwaited => "task never awaited",
            DiagnosticKind::BarrierNotTotal => "barrier is not a total cut",
            DiagnosticKind::UnknownConstruct => "unknown construct",
            DiagnosticKind::TagOverflow => "happens-before tag overflow",
            DiagnosticKind::AlreadyInstrumented => "module already instrumented",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Diagnostic<'arena> {
    pub kind: DiagnosticKind,
    /// Function the diagnostic refers to; empty for module-level diagnostics.
    pub function: &'arena str,
    /// 1-based source line, 0 for module-level diagnostics.
    pub line: u32,
    /// Identity involved (lock or task symbol, callee name), if any.
    pub detail: &'arena str,
}

impl fmt::Display for Diagnostic<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "warning: {}", self.kind.as_str())?;
        if !self.detail.is_empty() {
            write!(f, " '{}'", self.detail)?;
        }
        if !self.function.is_empty() {
            write!(f, " in '{}'", self.function)?;
        }
        if self.line != 0 {
            write!(f, " at line {}", self.line)?;
        }
        Ok(())
    }
}
