// This module implements the instrumentation inserter, the final stage of the
// pipeline. It rewrites the module in place: declares the runtime hook
// functions once, then splices one call instruction per non-skipped
// synchronization event and per non-confined memory access into the
// instruction streams, each carrying the event-kind code, the source location,
// the packed happens-before tag, and the lock or task identity where one
// exists. Control flow and data flow of the original program are untouched;
// the representation only grows by the inserted calls. Accesses in regions
// that carry recoverable diagnostics are instrumented conservatively: only an
// explicit confinement proof removes a hook. An annotation that does not fit
// the packed tag layout drops its hook with a TagOverflow diagnostic instead
// of emitting a wrapped, possibly colliding tag. Functions are rewritten one
// at a time, so an interrupt between functions leaves a structurally valid,
// partially instrumented module.

//! Instrumentation inserter: splices runtime hook calls into the module.

use hashbrown::HashMap;
use log::{debug, trace};

use crate::core::{DiagnosticKind, InstrSession};
use crate::ir::{Inst, InstIdx, Module, Opcode, Operand};
use crate::region::{AccessKind, RegionModel, SyncKind};
use crate::runtime;

/// Where a hook lands relative to its instruction.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Placement {
    Before,
    After,
}

fn placement_for(kind: SyncKind) -> Placement {
    match kind {
        // Scope-opening events are observed inside the scope they open.
        SyncKind::RegionEnter | SyncKind::LockAcquire => Placement::After,
        // The spawn hook must execute on the parent side of the lexical task
        // body, which starts right after the marker.
        SyncKind::TaskSpawn => Placement::Before,
        SyncKind::RegionExit
        | SyncKind::TaskWait
        | SyncKind::Barrier
        | SyncKind::LockRelease => Placement::Before,
    }
}

/// Rewrite one function per its region model. Returns the number of hooks
/// inserted.
pub fn instrument_function(
    module: &mut Module,
    session: &InstrSession<'_>,
    model: &RegionModel,
) -> usize {
    let mut before: HashMap<InstIdx, InstIdx> = HashMap::new();
    let mut after: HashMap<InstIdx, InstIdx> = HashMap::new();
    let func_name = module.functions[model.func as usize].name.clone();

    for event in &model.events {
        if event.skip {
            trace!(
                "skipping {} at line {} (diagnosed)",
                event.kind.as_str(),
                event.line
            );
            continue;
        }
        let annot = event
            .annot
            .expect("happens-before builder ran before the inserter");
        let Some(tag) = runtime::encode_tag(annot) else {
            session.diag(DiagnosticKind::TagOverflow, &func_name, event.line, "");
            continue;
        };
        let hook = runtime::hook_for_event(event.kind);
        module.declare_function(hook);
        let callee = module.intern_sym(hook);
        let mut operands = vec![
            Operand::Sym(callee),
            Operand::Imm(runtime::event_kind_code(event.kind)),
            Operand::Imm(event.line as i64),
            Operand::Imm(tag),
        ];
        if let Some(ident) = event.ident {
            operands.push(Operand::Sym(ident));
        }
        let hook_inst = module.push_inst(Inst {
            op: Opcode::Call,
            name: String::new(),
            operands,
            line: event.line,
        });
        match placement_for(event.kind) {
            Placement::Before => before.insert(event.inst, hook_inst),
            Placement::After => after.insert(event.inst, hook_inst),
        };
    }

    for access in &model.accesses {
        if access.confined {
            trace!("no hook for confined access at line {}", access.line);
            continue;
        }
        let annot = access
            .annot
            .expect("happens-before builder ran before the inserter");
        let Some(tag) = runtime::encode_tag(annot) else {
            session.diag(DiagnosticKind::TagOverflow, &func_name, access.line, "");
            continue;
        };
        let hook = match access.kind {
            AccessKind::Read => runtime::HOOK_READ,
            AccessKind::Write => runtime::HOOK_WRITE,
        };
        module.declare_function(hook);
        let callee = module.intern_sym(hook);
        let hook_inst = module.push_inst(Inst {
            op: Opcode::Call,
            name: String::new(),
            operands: vec![
                Operand::Sym(callee),
                Operand::Value(access.addr),
                Operand::Imm(access.line as i64),
                Operand::Imm(tag),
            ],
            line: access.line,
        });
        before.insert(access.inst, hook_inst);
    }

    let inserted = before.len() + after.len();

    // Splice the hooks into each block's instruction stream.
    let block_list = module.functions[model.func as usize].blocks.clone();
    for block_idx in block_list {
        let old = std::mem::take(&mut module.blocks[block_idx as usize].insts);
        let mut new = Vec::with_capacity(old.len());
        for inst in old {
            if let Some(&hook) = before.get(&inst) {
                new.push(hook);
            }
            new.push(inst);
            if let Some(&hook) = after.get(&inst) {
                new.push(hook);
            }
        }
        module.blocks[block_idx as usize].insts = new;
    }

    session.update_stats(|s| s.hooks_inserted += inserted);
    debug!(
        "instrumented '{}': {} hook(s)",
        module.functions[model.func as usize].name,
        inserted
    );
    inserted
}
