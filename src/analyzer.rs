// This module implements the synchronization analyzer, the first stage of the
// instrumentation pipeline. It walks one function's blocks in reverse
// post-order, maintaining a region stack driven by the parallel-marker opcodes,
// and produces the RegionModel: the region tree, every synchronization event
// attributed to its innermost enclosing region, and every memory access that
// may need a hook. Well-nestedness is checked as a dataflow property: the
// region stack entering a block must be identical along every incoming edge,
// and a mismatch is a fatal structural error. The analyzer also computes block
// dominance (to decide whether a barrier is a total synchronization cut), runs
// a per-lock forward dataflow to pair acquires with releases on all paths, and
// performs a simple escape check to prove task-confined allocations. The
// analyzer never mutates the program representation; exit normalization is
// model-level only.

//! Synchronization analyzer: classifies parallel constructs into the region
//! model.
//!
//! Recoverable findings (unmatched pairs, non-total barriers, unknown
//! constructs) become diagnostics on the session and mark the affected events
//! as skipped; structural violations abort the function with a fatal error.

use hashbrown::{HashMap, HashSet};
use log::{debug, trace};

use crate::core::{DiagnosticKind, InstrSession, InstrumentError, InstrumentResult};
use crate::ir::{BlockIdx, FuncIdx, InstIdx, Module, Opcode, Operand, SymIdx};
use crate::region::{
    AccessKind, MemoryAccess, RegionIdx, RegionKind, RegionModel, SyncEvent, SyncKind, ROOT_REGION,
};

/// Analyze one function definition into a [`RegionModel`].
pub fn analyze_function(
    module: &Module,
    session: &InstrSession<'_>,
    func: FuncIdx,
) -> InstrumentResult<RegionModel> {
    let mut analysis = FuncAnalysis::new(module, session, func);
    analysis.run()?;
    Ok(analysis.model)
}

struct FuncAnalysis<'m, 's, 'arena> {
    module: &'m Module,
    session: &'s InstrSession<'arena>,
    func: FuncIdx,
    name: &'m str,

    rpo: Vec<BlockIdx>,
    rpo_pos: HashMap<BlockIdx, usize>,
    preds: HashMap<BlockIdx, Vec<BlockIdx>>,
    idom: HashMap<BlockIdx, BlockIdx>,
    inst_block: HashMap<InstIdx, BlockIdx>,

    model: RegionModel,
    /// Region stack at entry of each processed block.
    stack_in: HashMap<BlockIdx, Vec<RegionIdx>>,
    stack_out: HashMap<BlockIdx, Vec<RegionIdx>>,
    /// Innermost region of every walked instruction.
    inst_region: HashMap<InstIdx, RegionIdx>,
    /// Allocas seen inside regions, candidates for confinement.
    allocas: Vec<InstIdx>,
    /// Task identity -> task region, for wait matching.
    tasks: HashMap<SymIdx, RegionIdx>,
}

impl<'m, 's, 'arena> FuncAnalysis<'m, 's, 'arena> {
    fn new(module: &'m Module, session: &'s InstrSession<'arena>, func: FuncIdx) -> Self {
        Self {
            module,
            session,
            func,
            name: &module.functions[func as usize].name,
            rpo: Vec::new(),
            rpo_pos: HashMap::new(),
            preds: HashMap::new(),
            idom: HashMap::new(),
            inst_block: HashMap::new(),
            model: RegionModel::new(func),
            stack_in: HashMap::new(),
            stack_out: HashMap::new(),
            inst_region: HashMap::new(),
            allocas: Vec::new(),
            tasks: HashMap::new(),
        }
    }

    fn run(&mut self) -> InstrumentResult<()> {
        debug!("analyzing function '{}'", self.name);
        self.build_rpo();
        self.check_unreachable_markers()?;
        self.build_dominators();
        self.walk_blocks()?;
        self.check_exits()?;
        self.classify_barriers();
        self.pair_locks();
        self.flag_unawaited_tasks();
        self.mark_confined_accesses();
        self.record_stats();
        Ok(())
    }

    // -------- block order and dominance ---------

    fn build_rpo(&mut self) {
        let func = &self.module.functions[self.func as usize];
        let Some(&entry) = func.blocks.first() else { return };
        let mut post = Vec::new();
        let mut stack = vec![(entry, false)];
        let mut visited = HashSet::new();
        while let Some((block, processed)) = stack.pop() {
            if processed {
                post.push(block);
                continue;
            }
            if !visited.insert(block) {
                continue;
            }
            stack.push((block, true));
            for succ in self.module.block_succs(block) {
                stack.push((succ, false));
            }
        }
        post.reverse();
        self.rpo = post;
        for (idx, &b) in self.rpo.iter().enumerate() {
            self.rpo_pos.insert(b, idx);
        }
        for &b in &self.rpo {
            for succ in self.module.block_succs(b) {
                self.preds.entry(succ).or_default().push(b);
            }
            for &inst in &self.module.block(b).insts {
                self.inst_block.insert(inst, b);
            }
        }
    }

    /// A parallel marker in a block the entry cannot reach is a structural
    /// error: the frontend guarantees markers live on reachable paths.
    fn check_unreachable_markers(&self) -> InstrumentResult<()> {
        let func = &self.module.functions[self.func as usize];
        for &block in &func.blocks {
            if self.rpo_pos.contains_key(&block) {
                continue;
            }
            for &inst in &self.module.block(block).insts {
                let inst = self.module.inst(inst);
                if inst.op.info().is_marker {
                    return Err(InstrumentError::MarkerUnreachable {
                        function: self.name.to_string(),
                        line: inst.line,
                    });
                }
            }
        }
        Ok(())
    }

    /// Iterative immediate-dominator computation over the RPO order.
    fn build_dominators(&mut self) {
        let Some(&entry) = self.rpo.first() else { return };
        self.idom.insert(entry, entry);
        let mut changed = true;
        while changed {
            changed = false;
            for &block in self.rpo.iter().skip(1) {
                let preds = match self.preds.get(&block) {
                    Some(p) => p,
                    None => continue,
                };
                let mut new_idom: Option<BlockIdx> = None;
                for &p in preds {
                    if !self.idom.contains_key(&p) {
                        continue;
                    }
                    new_idom = Some(match new_idom {
                        None => p,
                        Some(cur) => self.intersect(cur, p),
                    });
                }
                if let Some(new_idom) = new_idom {
                    if self.idom.get(&block) != Some(&new_idom) {
                        self.idom.insert(block, new_idom);
                        changed = true;
                    }
                }
            }
        }
    }

    fn intersect(&self, a: BlockIdx, b: BlockIdx) -> BlockIdx {
        let mut x = a;
        let mut y = b;
        while x != y {
            while self.rpo_pos[&x] > self.rpo_pos[&y] {
                x = self.idom[&x];
            }
            while self.rpo_pos[&y] > self.rpo_pos[&x] {
                y = self.idom[&y];
            }
        }
        x
    }

    fn dominates(&self, a: BlockIdx, b: BlockIdx) -> bool {
        let mut cur = b;
        loop {
            if cur == a {
                return true;
            }
            let next = match self.idom.get(&cur) {
                Some(&i) => i,
                None => return false,
            };
            if next == cur {
                return false;
            }
            cur = next;
        }
    }

    // -------- structural walk ---------

    fn walk_blocks(&mut self) -> InstrumentResult<()> {
        let Some(&entry) = self.rpo.first() else { return Ok(()) };
        self.stack_in.insert(entry, vec![ROOT_REGION]);

        for i in 0..self.rpo.len() {
            let block = self.rpo[i];
            let mut stack = self
                .stack_in
                .get(&block)
                .cloned()
                .unwrap_or_else(|| vec![ROOT_REGION]);
            for j in 0..self.module.block(block).insts.len() {
                let inst_idx = self.module.block(block).insts[j];
                self.walk_inst(inst_idx, &mut stack)?;
            }
            self.stack_out.insert(block, stack.clone());
            for succ in self.module.block_succs(block) {
                match self.stack_in.get(&succ) {
                    Some(existing) if *existing != stack => {
                        let line = self.block_line(succ);
                        return Err(InstrumentError::MalformedNesting {
                            function: self.name.to_string(),
                            line,
                            reason: format!(
                                "region nesting differs across edges into block '{}'",
                                self.module.block(succ).name
                            ),
                        });
                    }
                    Some(_) => {}
                    None => {
                        self.stack_in.insert(succ, stack.clone());
                    }
                }
            }
        }
        Ok(())
    }

    fn block_line(&self, block: BlockIdx) -> u32 {
        self.module
            .block(block)
            .insts
            .first()
            .map(|&i| self.module.inst(i).line)
            .unwrap_or(0)
    }

    fn walk_inst(&mut self, inst_idx: InstIdx, stack: &mut Vec<RegionIdx>) -> InstrumentResult<()> {
        let inst = self.module.inst(inst_idx);
        let top = *stack.last().expect("region stack never empty");
        self.inst_region.insert(inst_idx, top);
        trace!(
            "walk {} (line {}) in region {}",
            inst.op.info().mnemonic,
            inst.line,
            top
        );

        match inst.op {
            Opcode::ParEnter => {
                let ev = self.model.add_event(SyncEvent {
                    kind: SyncKind::RegionEnter,
                    region: top,
                    inst: inst_idx,
                    line: inst.line,
                    ident: None,
                    skip: false,
                    total_cut: false,
                    annot: None,
                });
                let region = self
                    .model
                    .add_region(RegionKind::Parallel, top, inst_idx, None);
                self.model.regions[region as usize].enter_event = Some(ev);
                stack.push(region);
            }
            Opcode::ParExit => {
                let top_kind = self.model.region(top).kind;
                if top_kind != RegionKind::Parallel {
                    return Err(self.nesting_error(inst.line, "par.exit outside a parallel region"));
                }
                stack.pop();
                let parent = *stack.last().expect("parallel region has a parent");
                let ev = self.model.add_event(SyncEvent {
                    kind: SyncKind::RegionExit,
                    region: parent,
                    inst: inst_idx,
                    line: inst.line,
                    ident: None,
                    skip: false,
                    total_cut: false,
                    annot: None,
                });
                let region = &mut self.model.regions[top as usize];
                region.exits.push(inst_idx);
                region.close_events.push(ev);
            }
            Opcode::TaskSpawn => {
                let ident = inst_sym(inst.operands.as_slice());
                if let Some(sym) = ident {
                    if self.tasks.contains_key(&sym) {
                        return Err(self.nesting_error(
                            inst.line,
                            &format!("duplicate task identity '@{}'", self.module.sym_name(sym)),
                        ));
                    }
                }
                let ev = self.model.add_event(SyncEvent {
                    kind: SyncKind::TaskSpawn,
                    region: top,
                    inst: inst_idx,
                    line: inst.line,
                    ident,
                    skip: false,
                    total_cut: false,
                    annot: None,
                });
                let region = self.model.add_region(RegionKind::Task, top, inst_idx, ident);
                self.model.regions[region as usize].enter_event = Some(ev);
                if let Some(sym) = ident {
                    self.tasks.insert(sym, region);
                }
                stack.push(region);
            }
            Opcode::TaskExit => {
                let ident = inst_sym(inst.operands.as_slice());
                let rec = self.model.region(top);
                if rec.kind != RegionKind::Task || rec.ident != ident {
                    return Err(self.nesting_error(
                        inst.line,
                        "task.exit does not match the innermost open task",
                    ));
                }
                self.model.add_event(SyncEvent {
                    kind: SyncKind::RegionExit,
                    region: top,
                    inst: inst_idx,
                    line: inst.line,
                    ident,
                    skip: false,
                    total_cut: false,
                    annot: None,
                });
                self.model.regions[top as usize].exits.push(inst_idx);
                stack.pop();
            }
            Opcode::TaskWait => {
                let ident = inst_sym(inst.operands.as_slice());
                let task = ident.and_then(|sym| self.tasks.get(&sym).copied());
                let matched = task.is_some_and(|t| self.model.region(t).parent == Some(top));
                let skip = !matched;
                if skip {
                    let detail = ident
                        .map(|s| self.module.sym_name(s).to_string())
                        .unwrap_or_default();
                    self.session
                        .diag(DiagnosticKind::UnmatchedWait, self.name, inst.line, &detail);
                }
                let ev = self.model.add_event(SyncEvent {
                    kind: SyncKind::TaskWait,
                    region: top,
                    inst: inst_idx,
                    line: inst.line,
                    ident,
                    skip,
                    total_cut: false,
                    annot: None,
                });
                if matched {
                    let task = task.expect("matched wait has a task");
                    self.model.regions[task as usize].close_events.push(ev);
                }
            }
            Opcode::Barrier => {
                self.model.add_event(SyncEvent {
                    kind: SyncKind::Barrier,
                    region: top,
                    inst: inst_idx,
                    line: inst.line,
                    ident: None,
                    skip: false,
                    total_cut: false,
                    annot: None,
                });
            }
            Opcode::LockAcquire | Opcode::LockRelease => {
                let kind = if inst.op == Opcode::LockAcquire {
                    SyncKind::LockAcquire
                } else {
                    SyncKind::LockRelease
                };
                self.model.add_event(SyncEvent {
                    kind,
                    region: top,
                    inst: inst_idx,
                    line: inst.line,
                    ident: inst_sym(inst.operands.as_slice()),
                    skip: false,
                    total_cut: false,
                    annot: None,
                });
            }
            Opcode::Load | Opcode::Store => {
                if top != ROOT_REGION {
                    let addr = match inst.operands.first() {
                        Some(Operand::Value(v)) => *v,
                        _ => return Ok(()),
                    };
                    let kind = if inst.op == Opcode::Load {
                        AccessKind::Read
                    } else {
                        AccessKind::Write
                    };
                    self.model.add_access(MemoryAccess {
                        kind,
                        region: top,
                        inst: inst_idx,
                        line: inst.line,
                        addr,
                        confined: false,
                        annot: None,
                    });
                }
            }
            Opcode::Alloca => {
                if top != ROOT_REGION {
                    self.allocas.push(inst_idx);
                }
            }
            Opcode::Call => {
                if top != ROOT_REGION {
                    let callee = inst_sym(inst.operands.as_slice());
                    let detail = callee
                        .map(|s| self.module.sym_name(s).to_string())
                        .unwrap_or_default();
                    self.session.diag(
                        DiagnosticKind::UnknownConstruct,
                        self.name,
                        inst.line,
                        &detail,
                    );
                }
            }
            Opcode::Ret | Opcode::Terminate => {
                // Early exit: every open region funnels through this point.
                for &open in stack.iter().skip(1) {
                    self.model.regions[open as usize].exits.push(inst_idx);
                }
            }
            Opcode::Arg | Opcode::Any | Opcode::Add | Opcode::Sub | Opcode::Br | Opcode::CondBr => {}
        }
        Ok(())
    }

    fn nesting_error(&self, line: u32, reason: &str) -> InstrumentError {
        InstrumentError::MalformedNesting {
            function: self.name.to_string(),
            line,
            reason: reason.to_string(),
        }
    }

    // -------- post-walk checks ---------

    /// Every non-root region must have at least one normalized exit.
    fn check_exits(&self) -> InstrumentResult<()> {
        for region in self.model.regions.iter().skip(1) {
            if region.exits.is_empty() {
                let line = region
                    .entry
                    .map(|i| self.module.inst(i).line)
                    .unwrap_or(0);
                return Err(InstrumentError::RegionNotClosed {
                    function: self.name.to_string(),
                    line,
                });
            }
        }
        Ok(())
    }

    /// A barrier is a total synchronization cut only if its block dominates
    /// every exit block of its region.
    fn classify_barriers(&mut self) {
        let mut updates = Vec::new();
        for (idx, event) in self.model.events.iter().enumerate() {
            if event.kind != SyncKind::Barrier {
                continue;
            }
            let Some(&barrier_block) = self.inst_block.get(&event.inst) else {
                continue;
            };
            let exit_blocks: Vec<BlockIdx> = if event.region == ROOT_REGION {
                self.rpo
                    .iter()
                    .copied()
                    .filter(|&b| {
                        self.module
                            .block(b)
                            .insts
                            .last()
                            .is_some_and(|&i| {
                                matches!(self.module.inst(i).op, Opcode::Ret | Opcode::Terminate)
                            })
                    })
                    .collect()
            } else {
                self.model
                    .region(event.region)
                    .exits
                    .iter()
                    .filter_map(|i| self.inst_block.get(i).copied())
                    .collect()
            };
            let total = !exit_blocks.is_empty()
                && exit_blocks.iter().all(|&x| self.dominates(barrier_block, x));
            updates.push((idx, total, event.line));
        }
        for (idx, total, line) in updates {
            self.model.events[idx].total_cut = total;
            if !total {
                self.session
                    .diag(DiagnosticKind::BarrierNotTotal, self.name, line, "");
            }
        }
    }

    /// Forward dataflow pairing lock acquires with releases.
    ///
    /// The held-lock map flows along edges; the meet is agreement on both the
    /// lock and its acquiring event. Disagreement means the acquire is
    /// path-conditional and the pair is diagnosed instead of instrumented.
    fn pair_locks(&mut self) {
        type Held = HashMap<SymIdx, crate::region::EventIdx>;

        // Map instruction -> lock event index for the transfer function.
        let mut lock_events: HashMap<InstIdx, (u32, SyncKind, Option<SymIdx>)> = HashMap::new();
        for (idx, event) in self.model.events.iter().enumerate() {
            if matches!(event.kind, SyncKind::LockAcquire | SyncKind::LockRelease) {
                lock_events.insert(event.inst, (idx as u32, event.kind, event.ident));
            }
        }
        if lock_events.is_empty() {
            return;
        }

        // Fixpoint over block entry states. No diagnostics yet.
        let mut state_in: HashMap<BlockIdx, Held> = HashMap::new();
        let mut unbalanced: HashSet<u32> = HashSet::new();
        if let Some(&entry) = self.rpo.first() {
            state_in.insert(entry, Held::new());
        }
        let mut changed = true;
        while changed {
            changed = false;
            for &block in &self.rpo {
                let mut held = match state_in.get(&block) {
                    Some(h) => h.clone(),
                    None => continue,
                };
                for &inst in &self.module.block(block).insts {
                    let Some(&(ev, kind, ident)) = lock_events.get(&inst) else {
                        continue;
                    };
                    let Some(sym) = ident else { continue };
                    match kind {
                        SyncKind::LockAcquire => {
                            held.insert(sym, ev);
                        }
                        SyncKind::LockRelease => {
                            held.remove(&sym);
                        }
                        _ => unreachable!(),
                    }
                }
                for succ in self.module.block_succs(block) {
                    match state_in.get_mut(&succ) {
                        None => {
                            state_in.insert(succ, held.clone());
                            changed = true;
                        }
                        Some(existing) => {
                            // Meet: keep only agreeing entries; disagreements
                            // mark the involved acquires unbalanced.
                            let mut disagreements = Vec::new();
                            for (&sym, &ev) in existing.iter() {
                                if held.get(&sym) != Some(&ev) {
                                    disagreements.push((sym, ev));
                                }
                            }
                            for (&sym, &ev) in held.iter() {
                                if existing.get(&sym) != Some(&ev) {
                                    disagreements.push((sym, ev));
                                }
                            }
                            for (sym, ev) in disagreements {
                                if existing.remove(&sym).is_some() {
                                    changed = true;
                                }
                                unbalanced.insert(ev);
                            }
                        }
                    }
                }
            }
        }

        // Diagnostic pass: replay the stable states once.
        let mut skipped: HashSet<u32> = HashSet::new();
        let mut matched_releases: HashMap<u32, Vec<u32>> = HashMap::new();
        let mut reported: HashSet<u32> = HashSet::new();
        for &block in &self.rpo {
            let mut held = match state_in.get(&block) {
                Some(h) => h.clone(),
                None => continue,
            };
            for &inst in &self.module.block(block).insts {
                let op = self.module.inst(inst).op;
                if let Some(&(ev, kind, ident)) = lock_events.get(&inst) {
                    let Some(sym) = ident else { continue };
                    let lock_name = self.module.sym_name(sym).to_string();
                    let line = self.model.events[ev as usize].line;
                    match kind {
                        SyncKind::LockAcquire => {
                            if held.contains_key(&sym) {
                                self.session.diag(
                                    DiagnosticKind::DoubleAcquire,
                                    self.name,
                                    line,
                                    &lock_name,
                                );
                                skipped.insert(ev);
                            } else {
                                held.insert(sym, ev);
                            }
                        }
                        SyncKind::LockRelease => match held.remove(&sym) {
                            Some(acq) => {
                                matched_releases.entry(acq).or_default().push(ev);
                            }
                            None => {
                                self.session.diag(
                                    DiagnosticKind::UnmatchedRelease,
                                    self.name,
                                    line,
                                    &lock_name,
                                );
                                skipped.insert(ev);
                            }
                        },
                        _ => unreachable!(),
                    }
                } else if matches!(
                    op,
                    Opcode::Ret | Opcode::Terminate | Opcode::ParExit | Opcode::TaskExit
                ) {
                    // Region exits are checkpoints too: a lock acquired inside
                    // the closing region and still held would be released on a
                    // different logical thread.
                    let boundary = match op {
                        Opcode::ParExit | Opcode::TaskExit => {
                            self.inst_region.get(&inst).copied().unwrap_or(ROOT_REGION)
                        }
                        _ => ROOT_REGION,
                    };
                    for (&sym, &acq) in held.iter() {
                        let acq_region = self.model.events[acq as usize].region;
                        if !self.model.is_ancestor(boundary, acq_region) {
                            continue;
                        }
                        if !reported.insert(acq) {
                            continue;
                        }
                        let lock_name = self.module.sym_name(sym).to_string();
                        let line = self.model.events[acq as usize].line;
                        self.session.diag(
                            DiagnosticKind::UnmatchedAcquire,
                            self.name,
                            line,
                            &lock_name,
                        );
                        unbalanced.insert(acq);
                    }
                }
            }
        }

        // Path-conditional acquires found during the meet.
        for &acq in &unbalanced {
            if skipped.insert(acq) {
                let event = &self.model.events[acq as usize];
                if !self.session.diagnostics().iter().any(|d| {
                    d.line == event.line
                        && matches!(
                            d.kind,
                            DiagnosticKind::UnmatchedAcquire | DiagnosticKind::DoubleAcquire
                        )
                }) {
                    let lock_name = event
                        .ident
                        .map(|s| self.module.sym_name(s).to_string())
                        .unwrap_or_default();
                    self.session.diag(
                        DiagnosticKind::UnmatchedAcquire,
                        self.name,
                        event.line,
                        &lock_name,
                    );
                }
            }
        }
        // An unbalanced acquire drags its matched releases along: the pair is
        // skipped as a unit.
        for &acq in skipped.clone().iter() {
            if let Some(rels) = matched_releases.get(&acq) {
                skipped.extend(rels.iter().copied());
            }
        }
        for ev in skipped {
            self.model.events[ev as usize].skip = true;
        }
    }

    fn flag_unawaited_tasks(&mut self) {
        let mut diags = Vec::new();
        for region in self.model.regions.iter().skip(1) {
            if region.kind == RegionKind::Task && region.close_events.is_empty() {
                let line = region
                    .entry
                    .map(|i| self.module.inst(i).line)
                    .unwrap_or(0);
                let detail = region
                    .ident
                    .map(|s| self.module.sym_name(s).to_string())
                    .unwrap_or_default();
                diags.push((line, detail));
            }
        }
        for (line, detail) in diags {
            self.session
                .diag(DiagnosticKind::TaskNeverAwaited, self.name, line, &detail);
        }
    }

    /// An alloca inside a task whose address is used only as the pointer
    /// operand of loads and stores within that task's subtree is confined:
    /// its accesses need no hooks.
    fn mark_confined_accesses(&mut self) {
        let func = &self.module.functions[self.func as usize];
        for &alloca in &self.allocas {
            let Some(&home) = self.inst_region.get(&alloca) else { continue };
            if self.model.region(home).kind != RegionKind::Task {
                continue;
            }
            let mut confined = true;
            'uses: for &block in &func.blocks {
                for &inst_idx in &self.module.block(block).insts {
                    let inst = self.module.inst(inst_idx);
                    for (slot, operand) in inst.operands.iter().enumerate() {
                        if *operand != Operand::Value(alloca) {
                            continue;
                        }
                        let addr_position =
                            matches!(inst.op, Opcode::Load | Opcode::Store) && slot == 0;
                        let in_subtree = self
                            .inst_region
                            .get(&inst_idx)
                            .is_some_and(|&r| self.model.is_ancestor(home, r));
                        if !addr_position || !in_subtree {
                            confined = false;
                            break 'uses;
                        }
                    }
                }
            }
            if confined {
                for access in &mut self.model.accesses {
                    if access.addr == alloca {
                        access.confined = true;
                    }
                }
                trace!(
                    "alloca at line {} confined to task region {}",
                    self.module.inst(alloca).line,
                    home
                );
            }
        }
    }

    fn record_stats(&self) {
        let regions = self.model.parallel_region_count();
        let events = self.model.events.len();
        let accesses = self.model.accesses.len();
        let confined = self.model.accesses.iter().filter(|a| a.confined).count();
        let skipped = self.model.events.iter().filter(|e| e.skip).count();
        self.session.update_stats(|s| {
            s.functions_analyzed += 1;
            s.regions_found += regions;
            s.sync_events += events;
            s.memory_accesses += accesses;
            s.confined_accesses += confined;
            s.skipped_events += skipped;
        });
        debug!(
            "'{}': {} region(s), {} event(s), {} access(es) ({} confined)",
            self.name, regions, events, accesses, confined
        );
    }
}

fn inst_sym(operands: &[Operand]) -> Option<SymIdx> {
    operands.iter().find_map(|op| match op {
        Operand::Sym(s) => Some(*s),
        _ => None,
    })
}
