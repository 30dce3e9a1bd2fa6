// This module defines the pass orchestration layer. Two module passes make up
// the pipeline: ArcherAnalysisPass (synchronization analysis plus the
// happens-before build; never mutates the module) and ArcherInsertionPass
// (splices the hook calls and sets the idempotence witness). The orchestrator
// drives them through the strict per-unit state machine held by the session,
// so a unit is analyzed, annotated and instrumented exactly once; a module
// that already carries instrumentation is refused with a diagnostic instead of
// being double-instrumented. Recoverable diagnostics aggregate on the session
// and never abort the unit; fatal structural errors propagate as
// InstrumentError and leave the module unmutated (analysis runs over every
// function before the first rewrite). The registration surface at the bottom
// mirrors process-wide pass installation: PassRegistry with idempotent
// install, PassPipeline appending passes in the documented order
// (analysis-equivalent before inserter-equivalent).

//! Pass orchestration, unit state machine, and the registration surface.

use log::{debug, info};

use crate::analyzer::analyze_function;
use crate::core::{DiagnosticKind, InstrSession, InstrumentResult, UnitState};
use crate::hb::build_happens_before;
use crate::instrument::instrument_function;
use crate::ir::{FuncIdx, Module};
use crate::region::RegionModel;
use crate::runtime;

/// A pass run once over a whole compilation unit.
pub trait ModulePass {
    fn name(&self) -> &'static str;
    fn run(&mut self, session: &InstrSession<'_>, module: &mut Module) -> InstrumentResult<()>;
}

/// Outcome of one unit through the full pipeline.
#[derive(Debug, Clone)]
pub enum UnitOutcome {
    /// The unit was instrumented; the per-function region models are returned
    /// for inspection.
    Instrumented { models: Vec<RegionModel>, hooks: usize },
    /// The unit already carried instrumentation and was refused.
    Refused,
}

/// Synchronization analysis + happens-before build. Mutates only the session.
#[derive(Default)]
pub struct ArcherAnalysisPass;

impl ArcherAnalysisPass {
    pub fn new() -> Self {
        Self
    }
}

impl ModulePass for ArcherAnalysisPass {
    fn name(&self) -> &'static str {
        "archer-analysis"
    }

    fn run(&mut self, session: &InstrSession<'_>, module: &mut Module) -> InstrumentResult<()> {
        if already_instrumented(module) {
            session.diag(DiagnosticKind::AlreadyInstrumented, "", 0, "");
            session.mark_refused();
            return Ok(());
        }

        debug!(
            "analyzing unit against marker catalog v{}",
            crate::ir::MARKER_CATALOG_VERSION
        );
        let mut models = Vec::new();
        for func in definitions(module) {
            models.push(analyze_function(module, session, func)?);
        }
        session.advance_state(UnitState::NotStarted)?;

        for model in &mut models {
            build_happens_before(model);
        }
        session.advance_state(UnitState::Analyzed)?;

        debug!("analysis complete: {} function(s)", models.len());
        session.set_models(models);
        Ok(())
    }
}

/// Hook insertion. Consumes the models the analysis pass left on the session.
#[derive(Default)]
pub struct ArcherInsertionPass;

impl ArcherInsertionPass {
    pub fn new() -> Self {
        Self
    }
}

impl ModulePass for ArcherInsertionPass {
    fn name(&self) -> &'static str {
        "archer-insert"
    }

    fn run(&mut self, session: &InstrSession<'_>, module: &mut Module) -> InstrumentResult<()> {
        if session.refused() {
            return Ok(());
        }
        // Validate the unit state before touching the module: a misassembled
        // pipeline (stray or lone insertion pass) must fail without rewriting
        // anything.
        session.advance_state(UnitState::HbBuilt)?;
        let models = session.models();
        for model in &models {
            instrument_function(module, session, model);
        }
        module.instrumented = true;
        session.advance_state(UnitState::Instrumented)?;
        info!(
            "unit instrumented: {} hook(s) across {} function(s)",
            session.stats().hooks_inserted,
            models.len()
        );
        Ok(())
    }
}

/// Full pipeline driver: analysis then insertion, once per unit.
#[derive(Default)]
pub struct InstrumentationPass {
    analysis: ArcherAnalysisPass,
    insertion: ArcherInsertionPass,
}

impl InstrumentationPass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run_unit(
        &mut self,
        session: &InstrSession<'_>,
        module: &mut Module,
    ) -> InstrumentResult<UnitOutcome> {
        self.analysis.run(session, module)?;
        self.insertion.run(session, module)?;
        if session.refused() {
            return Ok(UnitOutcome::Refused);
        }
        Ok(UnitOutcome::Instrumented {
            models: session.models(),
            hooks: session.stats().hooks_inserted,
        })
    }
}

fn definitions(module: &Module) -> Vec<FuncIdx> {
    (0..module.functions.len() as FuncIdx)
        .filter(|&f| !module.functions[f as usize].declaration)
        .collect()
}

/// Idempotence witness: the module flag, backed up by the presence of hook
/// declarations in case the flag was lost to serialization.
fn already_instrumented(module: &Module) -> bool {
    module.instrumented
        || module
            .functions
            .iter()
            .any(|f| f.declaration && runtime::is_hook(&f.name))
}

// -------- registration surface ---------

/// Process-wide pass registry with idempotent installation.
#[derive(Default)]
pub struct PassRegistry {
    installed: Vec<&'static str>,
}

impl PassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a pass name; returns false if it was already installed.
    pub fn install(&mut self, name: &'static str) -> bool {
        if self.installed.contains(&name) {
            return false;
        }
        self.installed.push(name);
        true
    }

    pub fn is_installed(&self, name: &str) -> bool {
        self.installed.iter().any(|&n| n == name)
    }
}

/// A user-assembled sequence of module passes.
#[derive(Default)]
pub struct PassPipeline {
    passes: Vec<Box<dyn ModulePass>>,
}

impl PassPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pass; order is defined relative to other `add_pass` calls.
    pub fn add_pass<P: ModulePass + 'static>(&mut self, pass: P) {
        self.passes.push(Box::new(pass));
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    pub fn run(
        &mut self,
        session: &InstrSession<'_>,
        module: &mut Module,
    ) -> InstrumentResult<()> {
        for pass in self.passes.iter_mut() {
            debug!("running pass '{}'", pass.name());
            pass.run(session, module)?;
        }
        Ok(())
    }
}

/// Install the Archer passes into a registry. Idempotent.
pub fn initialize_archer_passes(registry: &mut PassRegistry) {
    registry.install("archer-analysis");
    registry.install("archer-insert");
}

/// Append the Archer passes to a pipeline in the required order: analysis
/// before insertion.
pub fn register_archer_passes(pipeline: &mut PassPipeline) {
    pipeline.add_pass(ArcherAnalysisPass::new());
    pipeline.add_pass(ArcherInsertionPass::new());
}
