//! `while`, `do`/`while`, `for` and `foreach`.
//!
//! Loop blocks collect the jumps that leave them (`break`, a false
//! condition, an exhausted `foreach`) as fixups and patch them to the
//! instruction after the loop on exit. `continue` jumps back to the block's
//! `first_instr`, except in `do` and `for` loops where the re-test point is
//! only known after the body and the jumps go through the post-continue
//! list.

use aerscript_parser::{Keyword, TokenKind};

use crate::block::{BlockData, BlockId, BlockKind};
use crate::bytecode::{Opcode, Operand};
use crate::codegen::{CodeGen, Result};
use crate::expr::{ExprFlags, TreeCheck};
use crate::program::ForeachDesc;

impl CodeGen<'_, '_> {
    /// ```text
    /// while (cond) body       L0: cond; JMPZ Lx; body; JMP L0; Lx:
    /// ```
    pub(crate) fn compile_while(&mut self) -> Result<()> {
        let line = self.line();
        self.stream.advance();
        if !self.stream.check(TokenKind::LPAREN) {
            self.error(line, "Expected '(' after 'while' keyword")?;
            self.synchronize();
            return Ok(());
        }
        let first = self.emitter.len();
        let block = self.blocks.enter(BlockKind::LOOP, first, BlockData::None);
        let Some((open, close)) = self.paren_group().filter(|(o, c)| c > &(o + 1)) else {
            self.error(line, "Expected expression after 'while' keyword")?;
            self.exit_block(block);
            self.synchronize();
            return Ok(());
        };
        self.compile_condition(open + 1, close, "")?;
        self.stream.set_pos(close + 1);

        let jmpz = self.emitter.emit_jump(Opcode::Jmpz, 0);
        self.blocks.record_fixup(block, Opcode::Jmpz, jmpz);
        self.compile_block()?;
        self.emitter.emit(Opcode::Jmp, 0, first, Operand::None);
        self.exit_block(block);
        Ok(())
    }

    /// ```text
    /// do body while (cond);   L0: body; Lc: cond; JMPNZ L0; Lx:
    /// ```
    pub(crate) fn compile_do_while(&mut self) -> Result<()> {
        let line = self.line();
        self.stream.advance();
        let first = self.emitter.len();
        let block = self.blocks.enter_post_continue(BlockKind::LOOP, first);
        self.compile_block()?;

        if !self.stream.peek().is_some_and(|t| t.is_keyword(Keyword::While)) {
            self.error(line, "Missing 'while' statement after 'do' block")?;
            self.exit_block(block);
            self.synchronize();
            return Ok(());
        }
        self.stream.advance();
        if !self.stream.check(TokenKind::LPAREN) {
            self.error(line, "Expected '(' after 'while' keyword")?;
            self.exit_block(block);
            self.synchronize();
            return Ok(());
        }
        let Some((open, close)) = self.paren_group().filter(|(o, c)| c > &(o + 1)) else {
            self.error(line, "Expected expression after 'while' keyword")?;
            self.exit_block(block);
            self.synchronize();
            return Ok(());
        };

        let retest = self.emitter.len();
        self.blocks
            .fix_post_continue(block, retest, self.emitter.code_mut());
        self.compile_condition(open + 1, close, "")?;
        self.stream.set_pos(close + 1);
        self.emitter.emit(Opcode::Jmpnz, 0, first, Operand::None);
        self.exit_block(block);
        Ok(())
    }

    /// ```text
    /// for (init; cond; post) body
    ///     init; POP
    /// L0: cond; JMPZ Lx
    ///     body
    /// Lc: post; POP
    ///     JMP L0
    /// Lx:
    /// ```
    pub(crate) fn compile_for(&mut self) -> Result<()> {
        let line = self.line();
        self.stream.advance();
        if !self.stream.check(TokenKind::LPAREN) {
            self.error(line, "Expected '(' after 'for' keyword")?;
            self.synchronize();
            return Ok(());
        }
        let Some((open, close)) = self.paren_group().filter(|(o, c)| c > &(o + 1)) else {
            self.error(line, "for: Invalid expression")?;
            let resume = self.paren_group().map_or(self.stream.end(), |(_, c)| c + 1);
            self.stream.set_pos(resume);
            self.skip_declaration();
            return Ok(());
        };

        let cond_start = self.with_span(open + 1, close, |cg| {
            if cg.stream.peek().is_some_and(|t| t.is_typedef()) {
                cg.compile_var()?;
            } else {
                cg.compile_expr_popped(ExprFlags::empty())?;
            }
            if !cg.stream.eat(TokenKind::SEMI) {
                cg.error(line, "for: Expected ';' after initialization expressions")?;
                return Ok(None);
            }
            Ok(Some(cg.stream.pos()))
        })?;
        let Some(cond_start) = cond_start else {
            self.stream.set_pos(close + 1);
            self.skip_declaration();
            return Ok(());
        };

        let first = self.emitter.len();
        let block = self.blocks.enter_post_continue(BlockKind::LOOP, first);
        let post_start = self.with_span(cond_start, close, |cg| {
            let status = cg.compile_expr(ExprFlags::empty(), None)?;
            if !status.is_empty() {
                let jmpz = cg.emitter.emit_jump(Opcode::Jmpz, 0);
                cg.blocks.record_fixup(block, Opcode::Jmpz, jmpz);
            }
            if !cg.stream.eat(TokenKind::SEMI) {
                cg.error(line, "for: Expected ';' after conditionals expressions")?;
            }
            Ok(cg.stream.pos())
        })?;

        self.stream.set_pos(close + 1);
        self.compile_block()?;

        let retest = self.emitter.len();
        self.blocks
            .fix_post_continue(block, retest, self.emitter.code_mut());
        self.with_span(post_start, close, |cg| {
            cg.skip_semis();
            cg.compile_expr_popped(ExprFlags::empty())?;
            if !cg.stream.is_eof() {
                cg.error(line, "for: Expected ')' after post-expressions")?;
            }
            Ok(())
        })?;
        self.emitter.emit(Opcode::Jmp, 0, first, Operand::None);
        self.exit_block(block);
        Ok(())
    }

    /// ```text
    /// foreach ($src as $k => $v) body
    ///     src; FOREACH_INIT Lx
    /// L0: FOREACH_STEP Lx
    ///     body
    ///     JMP L0
    /// Lx:
    /// ```
    pub(crate) fn compile_foreach(&mut self) -> Result<()> {
        let line = self.line();
        self.stream.advance();
        if !self.stream.check(TokenKind::LPAREN) {
            self.error(line, "foreach: Expected '('")?;
            self.synchronize();
            return Ok(());
        }
        let block = self
            .blocks
            .enter(BlockKind::LOOP, self.emitter.len(), BlockData::None);
        let Some((open, close)) = self.paren_group().filter(|(o, c)| c > &(o + 1)) else {
            self.error(line, "foreach: Missing expression")?;
            return self.abandon_foreach(block, None);
        };

        let as_idx = (open + 1..close).find(|&i| self.token(i).is_some_and(|t| t.is_keyword(Keyword::As)));
        let Some(as_idx) = as_idx.filter(|&i| i > open + 1) else {
            self.error(line, "foreach: Missing array/object expression")?;
            return self.abandon_foreach(block, Some(close));
        };
        self.compile_condition(open + 1, as_idx, "foreach: ")?;
        if as_idx + 1 >= close {
            self.error(line, "foreach: Missing $key => $value pair")?;
            return self.abandon_foreach(block, Some(close));
        }

        let arrow = (as_idx + 1..close).find(|&i| self.token(i).is_some_and(|t| t.is(TokenKind::ARRAY_OP)));
        let mut key = None;
        let mut value_start = as_idx + 1;
        if let Some(arrow) = arrow {
            if arrow == as_idx + 1 {
                self.error(line, "foreach: Missing $key")?;
                return self.abandon_foreach(block, Some(close));
            }
            let Some(name) = self.foreach_binding(as_idx + 1, arrow)? else {
                return self.abandon_foreach(block, Some(close));
            };
            key = Some(name);
            value_start = arrow + 1;
        }
        let by_ref = self.token(value_start).is_some_and(|t| t.is(TokenKind::AMPER));
        if by_ref {
            value_start += 1;
        }
        if value_start >= close {
            self.error(line, "foreach: Missing $value")?;
            return self.abandon_foreach(block, Some(close));
        }
        let Some(value) = self.foreach_binding(value_start, close)? else {
            return self.abandon_foreach(block, Some(close));
        };

        let id = self.program.add_foreach(ForeachDesc { key, value, by_ref });
        let init = self
            .emitter
            .emit(Opcode::ForeachInit, 0, 0, Operand::Foreach(id));
        self.blocks.record_fixup(block, Opcode::ForeachInit, init);
        let first = self.emitter.len();
        self.blocks.get_mut(block).first_instr = first;
        let step = self
            .emitter
            .emit(Opcode::ForeachStep, 0, 0, Operand::Foreach(id));
        self.blocks.record_fixup(block, Opcode::ForeachStep, step);

        self.stream.set_pos(close + 1);
        self.compile_block()?;
        self.emitter.emit(Opcode::Jmp, 0, first, Operand::None);
        self.exit_block(block);
        Ok(())
    }

    /// Compile a `foreach` key or value in `[from, to)` and return the
    /// variable name it names. The load it compiles to is discarded.
    fn foreach_binding(&mut self, from: usize, to: usize) -> Result<Option<String>> {
        let line = self.token(from).map_or_else(|| self.line(), |t| t.line);
        let before = self.emitter.len();
        let errors = self.reporter.error_count();
        self.with_span(from, to, |cg| {
            cg.compile_expr(ExprFlags::empty(), Some(TreeCheck::ForeachTarget))
        })?;

        let mut name = None;
        if self.emitter.len() == before + 1 {
            if let Some(instr) = self.emitter.pop() {
                if let (Opcode::Load, Operand::Name(n)) = (instr.op, instr.p3) {
                    name = Some(n);
                }
            }
        }
        while self.emitter.len() > before {
            self.emitter.pop();
        }
        if name.is_none() && self.reporter.error_count() == errors {
            self.error(line, "foreach: Expecting a variable name")?;
        }
        Ok(name)
    }

    /// Drop a malformed `foreach`: leave its block and skip its body.
    fn abandon_foreach(&mut self, block: BlockId, close: Option<usize>) -> Result<()> {
        self.exit_block(block);
        match close {
            Some(close) => {
                self.stream.set_pos(close + 1);
                self.skip_declaration();
            }
            None => self.synchronize(),
        }
        Ok(())
    }

    /// An expression whose value is popped.
    fn compile_expr_popped(&mut self, flags: ExprFlags) -> Result<()> {
        let status = self.compile_expr(flags, None)?;
        if !status.is_empty() {
            self.emitter.emit(Opcode::Pop, 1, 0, Operand::None);
        }
        Ok(())
    }
}
