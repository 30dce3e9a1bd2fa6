// This module serves as the central hub for the instrumentation core's shared
// infrastructure: per-unit session management (arena allocation, the strict
// unit state machine, statistics), the fatal error taxonomy, and the
// recoverable diagnostics sink. The passes themselves (analyzer, happens-before
// builder, inserter, orchestrator) live at the crate top level and all lean on
// this module for error propagation and reporting.

//! Core infrastructure shared by every pass stage.
//!
//! # Key components
//!
//! ## Session management ([`session`])
//! - Arena-based allocation using `bumpalo`
//! - The `NotStarted -> Analyzed -> HbBuilt -> Instrumented -> Done` unit
//!   state machine
//! - Per-unit statistics
//!
//! ## Errors ([`error`])
//! - Fatal [`InstrumentError`] taxonomy: structural nesting errors abort the
//!   unit and propagate to the host compiler
//!
//! ## Diagnostics ([`diagnostics`])
//! - Recoverable conditions that degrade instrumentation coverage without
//!   aborting compilation

pub mod diagnostics;
pub mod error;
pub mod session;

pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use error::{InstrumentError, InstrumentResult};
pub use session::{InstrSession, SessionStats, UnitState};
