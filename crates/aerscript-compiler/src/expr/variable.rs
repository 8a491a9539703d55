use aerscript_parser::TokenKind;

use crate::bytecode::{Opcode, Operand};
use crate::codegen::{CodeGen, Result};
use crate::expr::ExprFlags;

impl CodeGen<'_, '_> {
    /// `$name`, `${expr}` and variable variables (`$$name`).
    ///
    /// A computed name is left on the stack and loaded by a `LOAD` without a
    /// name operand; each extra `$` adds one more such load.
    pub(crate) fn compile_variable(&mut self, flags: ExprFlags) -> Result<()> {
        let line = self.line();
        let readonly = i32::from(flags.contains(ExprFlags::RDONLY_LOAD));
        let mut dollars = 0usize;
        while self.stream.eat(TokenKind::DOLLAR) {
            dollars += 1;
        }
        let Some(tok) = self.stream.peek() else {
            return self.error(line, "Invalid variable name");
        };
        self.emitter.set_line(tok.line);
        if tok.is(TokenKind::ID | TokenKind::KEYWORD) {
            self.stream.bump();
            self.emitter
                .emit(Opcode::Load, readonly, 0, Operand::Name(tok.text.into()));
        } else if tok.is(TokenKind::OCB) {
            let start = self.stream.pos() + 1;
            let end = self.stream.end().saturating_sub(1);
            if start >= end {
                return self.error(line, "Invalid variable name");
            }
            let status = self.with_span(start, end, |cg| cg.compile_window_expr(ExprFlags::empty()))?;
            if status.is_empty() {
                return self.error(line, "Missing variable name");
            }
            self.stream.skip_to_end();
            self.emitter.emit(Opcode::Load, readonly, 0, Operand::None);
        } else {
            return self.error(line, "Invalid variable name");
        }
        for _ in 1..dollars {
            self.emitter.emit(Opcode::Load, readonly, 0, Operand::None);
        }
        Ok(())
    }
}
