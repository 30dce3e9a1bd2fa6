// This module provides arena-based session management for one compilation unit
// using the bumpalo crate. InstrSession owns the arena, the per-unit pass state
// machine, the recoverable-diagnostics sink, interned strings, and statistics
// gathered while the pipeline runs. All strings referenced by diagnostics are
// allocated in the arena and share the session lifetime, which keeps the
// analysis results free of owned-string churn. The state machine enforces the
// one-pass-per-unit invariant: NotStarted -> Analyzed -> HbBuilt ->
// Instrumented -> Done, strictly sequential and non-reentrant, so a unit can
// never be instrumented twice through the same session. SessionStats tracks
// regions, synchronization events, memory accesses, confined accesses, inserted
// hooks and diagnostics for the CLI report and for tests.

//! Arena-based per-unit session management.

use bumpalo::Bump;
use hashbrown::HashMap;
use std::cell::{Cell, RefCell};
use std::fmt;

use super::diagnostics::{Diagnostic, DiagnosticKind};
use super::error::{InstrumentError, InstrumentResult};
use crate::region::RegionModel;

/// Pipeline state of one compilation unit. Transitions are strictly
/// sequential; see [`InstrSession::advance_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    NotStarted,
    Analyzed,
    HbBuilt,
    Instrumented,
    Done,
}

impl UnitState {
    pub const fn as_str(self) -> &'static str {
        match self {
            UnitState::NotStarted => "not-started",
            UnitState::Analyzed => "analyzed",
            UnitState::HbBuilt => "hb-built",
            UnitState::Instrumented => "instrumented",
            UnitState::Done => "done",
        }
    }

    const fn next(self) -> Option<UnitState> {
        match self {
            UnitState::NotStarted => Some(UnitState::Analyzed),
            UnitState::Analyzed => Some(UnitState::HbBuilt),
            UnitState::HbBuilt => Some(UnitState::Instrumented),
            UnitState::Instrumented => Some(UnitState::Done),
            UnitState::Done => None,
        }
    }
}

/// Statistics gathered over one unit.
#[derive(Debug, Default, Clone, Copy)]
pub struct SessionStats {
    pub functions_analyzed: usize,
    pub regions_found: usize,
    pub sync_events: usize,
    pub memory_accesses: usize,
    pub confined_accesses: usize,
    pub skipped_events: usize,
    pub hooks_inserted: usize,
    pub diagnostics: usize,
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "functions analyzed:  {}", self.functions_analyzed)?;
        writeln!(f, "parallel regions:    {}", self.regions_found)?;
        writeln!(f, "sync events:         {}", self.sync_events)?;
        writeln!(f, "memory accesses:     {}", self.memory_accesses)?;
        writeln!(f, "  confined (no hook): {}", self.confined_accesses)?;
        writeln!(f, "skipped events:      {}", self.skipped_events)?;
        writeln!(f, "hooks inserted:      {}", self.hooks_inserted)?;
        write!(f, "diagnostics:         {}", self.diagnostics)
    }
}

/// Per-compilation-unit session.
///
/// Owns the arena and everything the passes share across stages. Discarded
/// after the unit finishes; no state persists across units.
pub struct InstrSession<'arena> {
    arena: &'arena Bump,
    state: Cell<UnitState>,
    stats: RefCell<SessionStats>,
    diagnostics: RefCell<Vec<Diagnostic<'arena>>>,
    interned: RefCell<HashMap<String, &'arena str>>,
    /// Region models built by the analysis pass, consumed by the inserter.
    models: RefCell<Vec<RegionModel>>,
    /// Set when the pipeline refused the unit (already instrumented).
    refused: Cell<bool>,
}

impl<'arena> InstrSession<'arena> {
    pub fn new(arena: &'arena Bump) -> Self {
        Self {
            arena,
            state: Cell::new(UnitState::NotStarted),
            stats: RefCell::new(SessionStats::default()),
            diagnostics: RefCell::new(Vec::new()),
            interned: RefCell::new(HashMap::new()),
            models: RefCell::new(Vec::new()),
            refused: Cell::new(false),
        }
    }

    pub fn arena(&self) -> &'arena Bump {
        self.arena
    }

    pub fn state(&self) -> UnitState {
        self.state.get()
    }

    /// Advance the unit state machine by one step.
    ///
    /// The caller names the state it believes the unit is in; a mismatch is a
    /// fatal [`InstrumentError::InvalidState`], which is what makes the
    /// pipeline non-reentrant per unit.
    pub fn advance_state(&self, expected: UnitState) -> InstrumentResult<UnitState> {
        let actual = self.state.get();
        if actual != expected {
            return Err(InstrumentError::InvalidState {
                expected: expected.as_str(),
                actual: actual.as_str(),
            });
        }
        let next = expected.next().ok_or(InstrumentError::InvalidState {
            expected: "a non-final state",
            actual: actual.as_str(),
        })?;
        self.state.set(next);
        Ok(next)
    }

    /// Intern a string in the arena.
    pub fn intern_str(&self, s: &str) -> &'arena str {
        let mut interned = self.interned.borrow_mut();
        if let Some(&existing) = interned.get(s) {
            return existing;
        }
        let stored = self.arena.alloc_str(s);
        interned.insert(s.to_string(), stored);
        stored
    }

    /// Record a recoverable diagnostic.
    pub fn diag(&self, kind: DiagnosticKind, function: &str, line: u32, detail: &str) {
        let diagnostic = Diagnostic {
            kind,
            function: self.intern_str(function),
            line,
            detail: self.intern_str(detail),
        };
        log::warn!("{diagnostic}");
        self.diagnostics.borrow_mut().push(diagnostic);
        self.stats.borrow_mut().diagnostics += 1;
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic<'arena>> {
        self.diagnostics.borrow().clone()
    }

    pub fn has_diagnostic(&self, kind: DiagnosticKind) -> bool {
        self.diagnostics.borrow().iter().any(|d| d.kind == kind)
    }

    pub fn stats(&self) -> SessionStats {
        *self.stats.borrow()
    }

    pub fn update_stats(&self, f: impl FnOnce(&mut SessionStats)) {
        f(&mut self.stats.borrow_mut());
    }

    /// Hand the analysis pass's region models to the inserter.
    pub fn set_models(&self, models: Vec<RegionModel>) {
        *self.models.borrow_mut() = models;
    }

    pub fn models(&self) -> Vec<RegionModel> {
        self.models.borrow().clone()
    }

    pub fn mark_refused(&self) {
        self.refused.set(true);
    }

    pub fn refused(&self) -> bool {
        self.refused.get()
    }
}
