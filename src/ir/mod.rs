// This module defines the parallel IR (PIR) that the Archer passes analyze and
// rewrite. PIR is a small block-structured SSA-ish representation with a
// human-readable textual format, storing functions, blocks and instructions in
// flat index vectors. Besides ordinary computation ops (add, load, store, call,
// branches) the opcode set contains the versioned parallel-marker catalog the
// frontend lowers structured parallelism into: par.enter/par.exit for parallel
// regions, task.spawn/task.exit/task.wait for lexically delimited tasks,
// barrier, and lock.acquire/lock.release. Each instruction records the source
// line it was parsed from, which becomes the program-location argument of every
// diagnostic and runtime hook call. The module also carries the `instrumented`
// flag that serves as the idempotence witness for the whole pipeline.

//! Parallel IR (PIR) data structures and textual format.
//!
//! The representation is deliberately minimal: enough structure to express
//! fork-join parallelism, tasks, barriers and locks, so the instrumentation
//! passes can be written and tested without a host compiler. The format:
//!
//! ```text
//! ; comments start with a semicolon
//! func(%a) {
//! entry:
//!     %p = alloca $8
//!     par.enter
//!     task.spawn @t1
//!     store %p, %a
//!     task.exit @t1
//!     task.wait @t1
//!     par.exit
//!     ret
//! }
//! extern helper
//! ```
//!
//! Operand sigils: `%` values, `^` blocks, `$` integer immediates, `@` symbols
//! (task identities, lock identities, call targets).

pub mod parser;

/// Index of an instruction in [`Module::insts`].
pub type InstIdx = u32;
/// Index of a block in [`Module::blocks`].
pub type BlockIdx = u32;
/// Index of a function in [`Module::functions`].
pub type FuncIdx = u32;
/// Index of an interned symbol in [`Module::symbols`].
pub type SymIdx = u32;

/// Version of the parallel-marker catalog below. The frontend lowering and
/// this crate must agree on it; bump on any change to the marker set.
pub const MARKER_CATALOG_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub functions: Vec<Function>,
    pub blocks: Vec<Block>,
    pub insts: Vec<Inst>,
    pub symbols: Vec<String>,
    /// Set once the instrumentation inserter has run over this module.
    pub instrumented: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub declaration: bool,
    pub params: Vec<InstIdx>,
    pub blocks: Vec<BlockIdx>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub name: String,
    pub insts: Vec<InstIdx>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Inst {
    pub op: Opcode,
    /// Result name without the `%` sigil; empty for instructions with no result.
    pub name: String,
    pub operands: Vec<Operand>,
    /// 1-based source line this instruction was parsed from (0 if synthesized).
    pub line: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Value(InstIdx),
    Block(BlockIdx),
    Imm(i64),
    Sym(SymIdx),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // Ordinary computation.
    Arg,
    Any,
    Add,
    Sub,
    Alloca,
    Load,
    Store,
    Call,
    // Control flow.
    Br,
    CondBr,
    Ret,
    Terminate,
    // Parallel-marker catalog (versioned frontend contract).
    ParEnter,
    ParExit,
    TaskSpawn,
    TaskExit,
    TaskWait,
    Barrier,
    LockAcquire,
    LockRelease,
}

/// Operand count used by variadic opcodes.
pub const VARIADIC: u32 = !0;

#[derive(Debug, Clone, Copy)]
pub struct OpInfo {
    pub mnemonic: &'static str,
    pub has_result: bool,
    pub is_terminator: bool,
    /// Number of `%` value operands, or [`VARIADIC`].
    pub val_ops: u32,
    /// Number of `^` block operands.
    pub succ_ops: u32,
    /// Number of `$` immediate operands.
    pub imm_ops: u32,
    /// Number of `@` symbol operands.
    pub sym_ops: u32,
    /// Whether this opcode belongs to the parallel-marker catalog.
    pub is_marker: bool,
}

impl Opcode {
    pub const fn info(self) -> OpInfo {
        use Opcode::*;
        const fn op(
            mnemonic: &'static str,
            has_result: bool,
            is_terminator: bool,
            val_ops: u32,
            succ_ops: u32,
            imm_ops: u32,
            sym_ops: u32,
            is_marker: bool,
        ) -> OpInfo {
            OpInfo { mnemonic, has_result, is_terminator, val_ops, succ_ops, imm_ops, sym_ops, is_marker }
        }
        match self {
            Arg => op("arg", true, false, 0, 0, 0, 0, false),
            Any => op("any", true, false, VARIADIC, 0, 0, 0, false),
            Add => op("add", true, false, 2, 0, 0, 0, false),
            Sub => op("sub", true, false, 2, 0, 0, 0, false),
            Alloca => op("alloca", true, false, 0, 0, 1, 0, false),
            Load => op("load", true, false, 1, 0, 0, 0, false),
            Store => op("store", false, false, 2, 0, 0, 0, false),
            // Calls take their callee symbol first; runtime hook calls append a
            // second symbol for the lock or task identity.
            Call => op("call", true, false, VARIADIC, 0, VARIADIC, VARIADIC, false),
            Br => op("br", false, true, 0, 1, 0, 0, false),
            CondBr => op("condbr", false, true, 1, 2, 0, 0, false),
            Ret => op("ret", false, true, VARIADIC, 0, 0, 0, false),
            Terminate => op("terminate", false, true, 0, 0, 0, 0, false),
            ParEnter => op("par.enter", false, false, 0, 0, 0, 0, true),
            ParExit => op("par.exit", false, false, 0, 0, 0, 0, true),
            TaskSpawn => op("task.spawn", false, false, 0, 0, 0, 1, true),
            TaskExit => op("task.exit", false, false, 0, 0, 0, 1, true),
            TaskWait => op("task.wait", false, false, 0, 0, 0, 1, true),
            Barrier => op("barrier", false, false, 0, 0, 0, 0, true),
            LockAcquire => op("lock.acquire", false, false, 0, 0, 0, 1, true),
            LockRelease => op("lock.release", false, false, 0, 0, 0, 1, true),
        }
    }

    pub fn from_mnemonic(s: &str) -> Option<Self> {
        use Opcode::*;
        match s {
            "any" => Some(Any),
            "add" => Some(Add),
            "sub" => Some(Sub),
            "alloca" => Some(Alloca),
            "load" => Some(Load),
            "store" => Some(Store),
            "call" => Some(Call),
            "br" => Some(Br),
            "condbr" => Some(CondBr),
            "ret" => Some(Ret),
            "terminate" => Some(Terminate),
            "par.enter" => Some(ParEnter),
            "par.exit" => Some(ParExit),
            "task.spawn" => Some(TaskSpawn),
            "task.exit" => Some(TaskExit),
            "task.wait" => Some(TaskWait),
            "barrier" => Some(Barrier),
            "lock.acquire" => Some(LockAcquire),
            "lock.release" => Some(LockRelease),
            _ => None,
        }
    }
}

impl Module {
    pub fn new() -> Self {
        Self {
            functions: Vec::new(),
            blocks: Vec::new(),
            insts: Vec::new(),
            symbols: Vec::new(),
            instrumented: false,
        }
    }

    pub fn parse(text: &str) -> Result<Self, parser::ParseError> {
        parser::parse_module(text)
    }

    pub fn inst(&self, idx: InstIdx) -> &Inst {
        &self.insts[idx as usize]
    }

    pub fn block(&self, idx: BlockIdx) -> &Block {
        &self.blocks[idx as usize]
    }

    pub fn sym_name(&self, idx: SymIdx) -> &str {
        &self.symbols[idx as usize]
    }

    /// Look up an interned symbol by name.
    pub fn sym(&self, name: &str) -> Option<SymIdx> {
        self.symbols.iter().position(|s| s == name).map(|i| i as SymIdx)
    }

    /// Intern a symbol, returning its index.
    pub fn intern_sym(&mut self, name: &str) -> SymIdx {
        if let Some(idx) = self.sym(name) {
            return idx;
        }
        self.symbols.push(name.to_string());
        (self.symbols.len() - 1) as SymIdx
    }

    pub fn func_by_name(&self, name: &str) -> Option<FuncIdx> {
        self.functions.iter().position(|f| f.name == name).map(|i| i as FuncIdx)
    }

    /// Add an external declaration if not already present.
    pub fn declare_function(&mut self, name: &str) -> FuncIdx {
        if let Some(idx) = self.func_by_name(name) {
            return idx;
        }
        self.functions.push(Function {
            name: name.to_string(),
            declaration: true,
            params: Vec::new(),
            blocks: Vec::new(),
        });
        (self.functions.len() - 1) as FuncIdx
    }

    /// Append an instruction to the pool without attaching it to a block.
    pub fn push_inst(&mut self, inst: Inst) -> InstIdx {
        self.insts.push(inst);
        (self.insts.len() - 1) as InstIdx
    }

    /// Successor blocks of a block, read off its terminator's block operands.
    pub fn block_succs(&self, block: BlockIdx) -> Vec<BlockIdx> {
        let b = self.block(block);
        let Some(&last) = b.insts.last() else { return Vec::new() };
        let inst = self.inst(last);
        if !inst.op.info().is_terminator {
            return Vec::new();
        }
        inst.operands
            .iter()
            .filter_map(|op| match op {
                Operand::Block(idx) => Some(*idx),
                _ => None,
            })
            .collect()
    }

    /// The entry block of a function definition.
    pub fn entry_block(&self, func: FuncIdx) -> Option<BlockIdx> {
        self.functions[func as usize].blocks.first().copied()
    }

    /// Render the module in its textual format.
    pub fn print(&self) -> String {
        let mut out = String::new();
        for func in &self.functions {
            if func.declaration {
                out.push_str(&format!("extern {}\n", func.name));
                continue;
            }
            let params: Vec<String> = func
                .params
                .iter()
                .map(|&p| format!("%{}", self.inst(p).name))
                .collect();
            out.push_str(&format!("{}({}) {{\n", func.name, params.join(", ")));
            for &block_idx in &func.blocks {
                let block = self.block(block_idx);
                out.push_str(&format!("{}:\n", block.name));
                for &inst_idx in &block.insts {
                    out.push_str("    ");
                    out.push_str(&self.print_inst(inst_idx));
                    out.push('\n');
                }
            }
            out.push_str("}\n");
        }
        out
    }

    fn print_inst(&self, idx: InstIdx) -> String {
        let inst = self.inst(idx);
        let info = inst.op.info();
        let mut s = String::new();
        if info.has_result && !inst.name.is_empty() {
            s.push_str(&format!("%{} = ", inst.name));
        }
        s.push_str(info.mnemonic);
        let ops: Vec<String> = inst
            .operands
            .iter()
            .map(|op| match op {
                Operand::Value(v) => format!("%{}", self.inst(*v).name),
                Operand::Block(b) => format!("^{}", self.block(*b).name),
                Operand::Imm(i) => format!("${i}"),
                Operand::Sym(sy) => format!("@{}", self.sym_name(*sy)),
            })
            .collect();
        if !ops.is_empty() {
            s.push(' ');
            s.push_str(&ops.join(", "));
        }
        s
    }
}

impl Default for Module {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.print())
    }
}
