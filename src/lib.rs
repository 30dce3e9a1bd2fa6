//! Archer instrumentation core.
//!
//! A compile-time pass pipeline that prepares fork-join/task-parallel programs
//! for dynamic race detection: it finds parallel regions and synchronization
//! constructs in the program representation, builds a static happens-before
//! model over them, and inserts calls to the external runtime's hooks at every
//! synchronization event and every memory access that is not provably confined
//! to a single task.
//!
//! # Primary usage
//!
//! ```
//! use archer::ir::Module;
//! use archer::core::InstrSession;
//! use archer::pass::InstrumentationPass;
//! use bumpalo::Bump;
//!
//! let mut module = Module::parse(
//!     "f(%x) {\nentry:\n    par.enter\n    store %x, %x\n    par.exit\n    ret\n}\n",
//! )
//! .unwrap();
//!
//! let arena = Bump::new();
//! let session = InstrSession::new(&arena);
//! let mut pass = InstrumentationPass::new();
//! pass.run_unit(&session, &mut module).unwrap();
//! assert!(module.instrumented);
//! ```
//!
//! # Architecture
//!
//! - [`ir`] - the parallel IR (PIR): textual format, parser, marker catalog
//! - [`region`] - region model: region tree, sync events, accesses, the
//!   happens-before partial order
//! - [`analyzer`] - synchronization analyzer (stage 1; read-only)
//! - [`hb`] - happens-before builder (stage 2; annotates the model)
//! - [`instrument`] - hook inserter (stage 3; rewrites the module)
//! - [`pass`] - orchestrator, unit state machine, registration surface
//! - [`runtime`] - the outbound hook contract shared with the race-detection
//!   runtime
//! - [`core`] - session, errors, diagnostics

pub mod analyzer;
pub mod core;
pub mod hb;
pub mod instrument;
pub mod ir;
pub mod pass;
pub mod region;
pub mod runtime;

// Re-export the types most callers need.
pub use core::{
    Diagnostic, DiagnosticKind, InstrSession, InstrumentError, InstrumentResult, SessionStats,
    UnitState,
};
pub use pass::{
    initialize_archer_passes, register_archer_passes, InstrumentationPass, ModulePass,
    PassPipeline, PassRegistry, UnitOutcome,
};
pub use region::{HbAnnotation, RegionModel};
