use aerscript_parser::TokenKind;

use crate::block::BlockKind;
use crate::bytecode::{Opcode, Operand};
use crate::codegen::{CodeGen, Result};
use crate::expr::ExprFlags;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopJump {
    Break,
    Continue,
}

impl LoopJump {
    fn keyword(self) -> &'static str {
        match self {
            LoopJump::Break => "break",
            LoopJump::Continue => "continue",
        }
    }
}

impl CodeGen<'_, '_> {
    /// `break [n];`
    pub(crate) fn compile_break(&mut self) -> Result<()> {
        self.compile_loop_jump(LoopJump::Break)
    }

    /// `continue [n];` A `switch` counts as a loop; continuing it leaves it.
    pub(crate) fn compile_continue(&mut self) -> Result<()> {
        self.compile_loop_jump(LoopJump::Continue)
    }

    fn compile_loop_jump(&mut self, jump: LoopJump) -> Result<()> {
        let line = self.line();
        self.stream.advance();
        let mut level = 0;
        if let Some(tok) = self.stream.peek().filter(|t| t.is(TokenKind::NUM)) {
            self.stream.advance();
            level = tok.text.parse::<u32>().unwrap_or(0);
        }

        let Some(target) = self.blocks.find_enclosing(BlockKind::LOOP, level) else {
            return self.error_recover(
                line,
                format!(
                    "A '{}' statement may only be used within a loop or switch",
                    jump.keyword()
                ),
            );
        };
        let block = self.blocks.get(target);
        let leaves = jump == LoopJump::Break || block.kind.contains(BlockKind::SWITCH);
        if leaves {
            let jmp = self.emitter.emit_jump(Opcode::Jmp, 0);
            self.blocks.record_fixup(target, Opcode::Jmp, jmp);
        } else if block.has_post_continue() {
            let jmp = self.emitter.emit_jump(Opcode::Jmp, 0);
            self.blocks.record_post_continue(target, jmp);
        } else {
            let first = block.first_instr;
            self.emitter.emit(Opcode::Jmp, 0, first, Operand::None);
        }

        if !self.stream.check(TokenKind::SEMI) && !self.stream.is_eof() {
            self.warning(
                line,
                format!("Expected semi-colon ';' after '{}' statement", jump.keyword()),
            )?;
            self.recover();
        }
        Ok(())
    }

    /// `return [expr];` leaves the current function with the value, or with
    /// `null` when there is none.
    pub(crate) fn compile_return(&mut self) -> Result<()> {
        self.stream.advance();
        let status = self.compile_optional_operand()?;
        self.emitter
            .emit(Opcode::Done, i32::from(!status), 0, Operand::None);
        Ok(())
    }

    /// `exit [expr];` stops the program.
    pub(crate) fn compile_exit(&mut self) -> Result<()> {
        self.stream.advance();
        let status = self.compile_optional_operand()?;
        self.emitter
            .emit(Opcode::Halt, i32::from(!status), 0, Operand::None);
        Ok(())
    }

    /// Returns true when no operand was compiled.
    fn compile_optional_operand(&mut self) -> Result<bool> {
        if self.stream.check(TokenKind::SEMI) || self.stream.is_eof() {
            return Ok(true);
        }
        Ok(self.compile_expr(ExprFlags::empty(), None)?.is_empty())
    }
}
