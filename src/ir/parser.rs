//! PIR textual format parser.
//!
//! Hand-rolled cursor parser over the byte stream. Forward references to
//! values and blocks are recorded as fixups and resolved when the enclosing
//! function is complete.

use super::*;
use hashbrown::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub line: u32,
    pub message: String,
}

pub fn parse_module(text: &str) -> Result<Module, ParseError> {
    Parser::new(text).parse()
}

/// Placeholder operand index patched by fixup resolution.
const UNRESOLVED: u32 = u32::MAX;

struct Fixup<'a> {
    name: &'a str,
    inst: InstIdx,
    slot: usize,
    line: u32,
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
    line: u32,
    module: Module,

    // Per-function maps, cleared between functions.
    values: HashMap<&'a str, InstIdx>,
    blocks: HashMap<&'a str, (BlockIdx, bool)>,
    value_fixups: Vec<Fixup<'a>>,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            line: 1,
            module: Module::new(),
            values: HashMap::new(),
            blocks: HashMap::new(),
            value_fixups: Vec::new(),
        }
    }

    fn parse(mut self) -> Result<Module, ParseError> {
        self.skip_whitespace(true);
        while !self.is_eof() {
            self.parse_top_level()?;
            self.skip_whitespace(true);
        }
        Ok(self.module)
    }

    fn err(&self, message: impl Into<String>) -> ParseError {
        ParseError { line: self.line, message: message.into() }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    fn advance(&mut self) {
        if let Some(b) = self.peek() {
            if b == b'\n' {
                self.line += 1;
            }
            self.pos += 1;
        }
    }

    fn skip_whitespace(&mut self, skip_newlines: bool) {
        while let Some(b) = self.peek() {
            if b == b';' {
                while let Some(c) = self.peek() {
                    if c == b'\n' {
                        break;
                    }
                    self.advance();
                }
            } else if b == b'\n' {
                if !skip_newlines {
                    break;
                }
                self.advance();
            } else if b.is_ascii_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn expect(&mut self, b: u8) -> Result<(), ParseError> {
        if self.peek() == Some(b) {
            self.advance();
            Ok(())
        } else {
            Err(self.err(format!("expected '{}'", b as char)))
        }
    }

    fn parse_ident(&mut self) -> Result<&'a str, ParseError> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || b == b'_' || b == b'.' {
                self.advance();
            } else {
                break;
            }
        }
        if start == self.pos {
            return Err(self.err("expected identifier"));
        }
        Ok(&self.text[start..self.pos])
    }

    fn parse_int(&mut self) -> Result<i64, ParseError> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.advance();
        }
        while let Some(b) = self.peek() {
            if b.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }
        self.text[start..self.pos]
            .parse()
            .map_err(|_| self.err("expected integer"))
    }

    fn parse_top_level(&mut self) -> Result<(), ParseError> {
        let ident = self.parse_ident()?;
        if ident == "extern" {
            self.skip_whitespace(false);
            let name = self.parse_ident()?;
            self.module.declare_function(name);
            return Ok(());
        }
        self.parse_function(ident)
    }

    fn parse_function(&mut self, name: &'a str) -> Result<(), ParseError> {
        if self.module.func_by_name(name).is_some() {
            return Err(self.err(format!("duplicate function '{name}'")));
        }
        self.values.clear();
        self.blocks.clear();
        self.value_fixups.clear();

        self.skip_whitespace(false);
        self.expect(b'(')?;
        let mut params = Vec::new();
        loop {
            self.skip_whitespace(false);
            match self.peek() {
                Some(b')') => {
                    self.advance();
                    break;
                }
                Some(b'%') => {
                    self.advance();
                    let pname = self.parse_ident()?;
                    let idx = self.module.push_inst(Inst {
                        op: Opcode::Arg,
                        name: pname.to_string(),
                        operands: Vec::new(),
                        line: self.line,
                    });
                    if self.values.insert(pname, idx).is_some() {
                        return Err(self.err(format!("duplicate parameter '%{pname}'")));
                    }
                    params.push(idx);
                    self.skip_whitespace(false);
                    if self.peek() == Some(b',') {
                        self.advance();
                    }
                }
                _ => return Err(self.err("expected parameter or ')'")),
            }
        }
        self.skip_whitespace(false);
        self.expect(b'{')?;

        let func_idx = self.module.functions.len() as FuncIdx;
        self.module.functions.push(Function {
            name: name.to_string(),
            declaration: false,
            params,
            blocks: Vec::new(),
        });

        let mut current_block: Option<BlockIdx> = None;
        loop {
            self.skip_whitespace(true);
            match self.peek() {
                None => return Err(self.err("unexpected end of input in function body")),
                Some(b'}') => {
                    self.advance();
                    break;
                }
                Some(b'%') => {
                    let block = current_block
                        .ok_or_else(|| self.err("instruction before first block label"))?;
                    self.parse_inst(block)?;
                }
                _ => {
                    let ident = self.parse_ident()?;
                    if self.peek() == Some(b':') {
                        self.advance();
                        let idx = self.get_or_create_block(ident);
                        if self.blocks[ident].1 {
                            return Err(self.err(format!("duplicate block label '{ident}'")));
                        }
                        self.blocks.insert(ident, (idx, true));
                        self.module.functions[func_idx as usize].blocks.push(idx);
                        current_block = Some(idx);
                    } else {
                        let block = current_block
                            .ok_or_else(|| self.err("instruction before first block label"))?;
                        self.parse_inst_with_mnemonic(block, ident, "")?;
                    }
                }
            }
        }

        self.finish_function(func_idx)
    }

    fn get_or_create_block(&mut self, name: &'a str) -> BlockIdx {
        if let Some(&(idx, _)) = self.blocks.get(name) {
            return idx;
        }
        let idx = self.module.blocks.len() as BlockIdx;
        self.module.blocks.push(Block { name: name.to_string(), insts: Vec::new() });
        self.blocks.insert(name, (idx, false));
        idx
    }

    fn parse_inst(&mut self, block: BlockIdx) -> Result<(), ParseError> {
        self.expect(b'%')?;
        let result = self.parse_ident()?;
        self.skip_whitespace(false);
        self.expect(b'=')?;
        self.skip_whitespace(false);
        let mnemonic = self.parse_ident()?;
        self.parse_inst_with_mnemonic(block, mnemonic, result)
    }

    fn parse_inst_with_mnemonic(
        &mut self,
        block: BlockIdx,
        mnemonic: &'a str,
        result: &'a str,
    ) -> Result<(), ParseError> {
        let line = self.line;
        let op = Opcode::from_mnemonic(mnemonic)
            .ok_or_else(|| self.err(format!("unknown mnemonic '{mnemonic}'")))?;
        let info = op.info();
        if !info.has_result && !result.is_empty() {
            return Err(self.err(format!("'{mnemonic}' produces no result")));
        }

        let inst_idx = self.module.insts.len() as InstIdx;
        let mut operands = Vec::new();
        loop {
            self.skip_spaces();
            match self.peek() {
                None | Some(b'\n') | Some(b';') | Some(b'}') => break,
                Some(b'%') => {
                    self.advance();
                    let vname = self.parse_ident()?;
                    if let Some(&idx) = self.values.get(vname) {
                        operands.push(Operand::Value(idx));
                    } else {
                        self.value_fixups.push(Fixup {
                            name: vname,
                            inst: inst_idx,
                            slot: operands.len(),
                            line,
                        });
                        operands.push(Operand::Value(UNRESOLVED));
                    }
                }
                Some(b'^') => {
                    self.advance();
                    let bname = self.parse_ident()?;
                    let idx = self.get_or_create_block(bname);
                    operands.push(Operand::Block(idx));
                }
                Some(b'$') => {
                    self.advance();
                    operands.push(Operand::Imm(self.parse_int()?));
                }
                Some(b'@') => {
                    self.advance();
                    let sname = self.parse_ident()?;
                    let idx = self.module.intern_sym(sname);
                    operands.push(Operand::Sym(idx));
                }
                _ => return Err(self.err("expected operand")),
            }
            self.skip_spaces();
            if self.peek() == Some(b',') {
                self.advance();
            } else {
                break;
            }
        }

        self.check_operands(op, &operands, mnemonic)?;

        let idx = self.module.push_inst(Inst {
            op,
            name: result.to_string(),
            operands,
            line,
        });
        debug_assert_eq!(idx, inst_idx);
        self.module.blocks[block as usize].insts.push(idx);
        if info.has_result && !result.is_empty() {
            if self.values.insert(result, idx).is_some() {
                return Err(self.err(format!("redefinition of '%{result}'")));
            }
        }
        Ok(())
    }

    fn skip_spaces(&mut self) {
        while let Some(b) = self.peek() {
            if b == b' ' || b == b'\t' || b == b'\r' {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn check_operands(&self, op: Opcode, operands: &[Operand], mnemonic: &str) -> Result<(), ParseError> {
        let info = op.info();
        let mut vals = 0u32;
        let mut succs = 0u32;
        let mut imms = 0u32;
        let mut syms = 0u32;
        for operand in operands {
            match operand {
                Operand::Value(_) => vals += 1,
                Operand::Block(_) => succs += 1,
                Operand::Imm(_) => imms += 1,
                Operand::Sym(_) => syms += 1,
            }
        }
        let check = |want: u32, got: u32, what: &str| -> Result<(), ParseError> {
            if want != VARIADIC && want != got {
                Err(self.err(format!(
                    "'{mnemonic}' expects {want} {what} operand(s), got {got}"
                )))
            } else {
                Ok(())
            }
        };
        check(info.val_ops, vals, "value")?;
        check(info.succ_ops, succs, "block")?;
        check(info.imm_ops, imms, "immediate")?;
        check(info.sym_ops, syms, "symbol")?;
        if op == Opcode::Call && !matches!(operands.first(), Some(Operand::Sym(_))) {
            return Err(self.err("'call' expects its callee symbol first"));
        }
        Ok(())
    }

    fn finish_function(&mut self, func_idx: FuncIdx) -> Result<(), ParseError> {
        // Resolve forward value references.
        for fixup in self.value_fixups.drain(..) {
            let Some(&idx) = self.values.get(fixup.name) else {
                return Err(ParseError {
                    line: fixup.line,
                    message: format!("unknown value '%{}'", fixup.name),
                });
            };
            self.module.insts[fixup.inst as usize].operands[fixup.slot] = Operand::Value(idx);
        }

        // Every referenced block must have been defined by a label.
        for (name, &(_, defined)) in &self.blocks {
            if !defined {
                return Err(self.err(format!("undefined block '^{name}'")));
            }
        }

        // Each block must be terminated.
        let func = &self.module.functions[func_idx as usize];
        if func.blocks.is_empty() {
            return Err(self.err(format!("function '{}' has no blocks", func.name)));
        }
        for &block_idx in &func.blocks {
            let block = self.module.block(block_idx);
            let terminated = block
                .insts
                .last()
                .is_some_and(|&i| self.module.inst(i).op.info().is_terminator);
            if !terminated {
                return Err(self.err(format!("block '{}' has no terminator", block.name)));
            }
        }
        Ok(())
    }
}
