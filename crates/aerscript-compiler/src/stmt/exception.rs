//! `try`/`catch` and `throw`.
//!
//! The protected body of a `try` is compiled inline between
//! `LOAD_EXCEPTION` and `POP_EXCEPTION`. Each `catch` body compiles into a
//! container of its own, recorded with its class and variable in the
//! exception descriptor both instructions refer to.

use aerscript_parser::{Keyword, TokenKind};

use crate::block::{BlockData, BlockKind};
use crate::bytecode::{Opcode, Operand};
use crate::codegen::{CodeGen, Result};
use crate::expr::{ExprFlags, TreeCheck};
use crate::program::{CatchDesc, ExceptionDesc};

impl CodeGen<'_, '_> {
    pub(crate) fn compile_try(&mut self) -> Result<()> {
        let line = self.line();
        let block = self
            .blocks
            .enter(BlockKind::EXCEPTION, self.emitter.len(), BlockData::None);
        let id = self.program.add_exception(ExceptionDesc::default());
        let load = self
            .emitter
            .emit(Opcode::LoadException, 0, 0, Operand::Exception(id));
        self.blocks.record_fixup(block, Opcode::LoadException, load);
        self.stream.advance();
        self.compile_block()?;
        let here = self.emitter.len();
        self.blocks
            .fix_jumps(block, None, here, self.emitter.code_mut());
        self.emitter
            .emit(Opcode::PopException, 0, 0, Operand::Exception(id));
        self.blocks.leave();

        if !self.stream.peek().is_some_and(|t| t.is_keyword(Keyword::Catch)) {
            let text = self.stream.peek().map_or("EOF", |t| t.text);
            return self.error(
                line,
                format!("Try: Unexpected token '{text}',expecting 'catch' block"),
            );
        }
        while self.stream.peek().is_some_and(|t| t.is_keyword(Keyword::Catch)) {
            self.stream.advance();
            if let Some(catch) = self.compile_catch()? {
                if let Some(desc) = self.program.exceptions.get_mut(id as usize) {
                    desc.catches.push(catch);
                }
            }
        }
        Ok(())
    }

    /// `( ClassName $var ) body`
    fn compile_catch(&mut self) -> Result<Option<CatchDesc>> {
        let line = self.line();
        let class = match (self.stream.peek(), self.stream.peek_nth(1)) {
            (Some(paren), Some(name)) if paren.is(TokenKind::LPAREN) && name.is(TokenKind::ID) => {
                name.text
            }
            (paren, name) => {
                let bad = match paren {
                    Some(p) if p.is(TokenKind::LPAREN) => name,
                    other => other,
                };
                let text = bad.map_or("EOF", |t| t.text);
                self.error(
                    line,
                    format!("Catch: Unexpected token '{text}',excpecting class name"),
                )?;
                self.skip_declaration();
                return Ok(None);
            }
        };
        self.stream.advance();
        self.stream.advance();

        let var = match (self.stream.peek(), self.stream.peek_nth(1)) {
            (Some(dollar), Some(name))
                if dollar.is(TokenKind::DOLLAR) && name.is(TokenKind::ID | TokenKind::KEYWORD) =>
            {
                name.text
            }
            (tok, _) => {
                let text = tok.map_or("EOF", |t| t.text);
                self.error(
                    line,
                    format!("Catch: Unexpected token '{text}',expecting variable name"),
                )?;
                self.skip_declaration();
                return Ok(None);
            }
        };
        self.stream.advance();
        self.stream.advance();
        if !self.stream.eat(TokenKind::RPAREN) {
            let text = self.stream.peek().map_or("EOF", |t| t.text);
            self.error(
                line,
                format!("Catch: Unexpected token '{text}',expecting right parenthesis ')'"),
            )?;
            self.skip_declaration();
            return Ok(None);
        }

        // The catch body lives in its own container, so loop jumps may not
        // leave it.
        self.blocks
            .enter(BlockKind::EXCEPTION | BlockKind::PROTECTED, 0, BlockData::None);
        let (code, result) = self.with_container(|cg| {
            cg.compile_block()?;
            let block = cg.blocks.current();
            let here = cg.emitter.len();
            cg.blocks
                .fix_jumps(block, None, here, cg.emitter.code_mut());
            cg.emitter.emit(Opcode::Done, 0, 0, Operand::None);
            Ok(())
        });
        self.blocks.leave();
        result?;
        Ok(Some(CatchDesc {
            class: class.to_owned(),
            var: var.to_owned(),
            code,
        }))
    }

    /// `throw expr;` jumps to the end of the nearest `try` body or function
    /// once the exception is raised.
    pub(crate) fn compile_throw(&mut self) -> Result<()> {
        let line = self.line();
        self.stream.advance();
        let status = self.compile_expr(ExprFlags::empty(), Some(TreeCheck::Throwable))?;
        if status.is_empty() {
            return self.error(line, "throw: Expecting an exception class instance");
        }
        let target = self
            .blocks
            .find_nearest(BlockKind::EXCEPTION | BlockKind::FUNC);
        let throw = self.emitter.emit_op(Opcode::Throw);
        self.blocks.record_fixup(target, Opcode::Throw, throw);
        Ok(())
    }
}
