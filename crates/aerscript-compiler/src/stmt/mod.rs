//! Statement compilation.
//!
//! [`CodeGen::compile_statement`] looks at the token at the cursor and hands
//! the statement to the compiler of its construct: a block, a keyword
//! statement, a declaration, raw text of an embedded document, or, failing
//! all of those, an expression whose value is discarded.
//!
//! Every construct compiler leaves the cursor after its statement. Errors
//! inside a statement are reported and the cursor is resynchronized, so the
//! statements that follow still compile.

mod conditional;
mod declarations;
mod exception;
mod jump;
mod loops;

use aerscript_parser::{ExprOp, Keyword, TokenKind};

use crate::block::{BlockData, BlockId, BlockKind};
use crate::bytecode::{Opcode, Operand};
use crate::class::ClassFlags;
use crate::codegen::{CodeGen, Result};
use crate::expr::{ExprFlags, ExprStatus};

/// Declarations accepted at global scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Declaration {
    Class(ClassFlags),
    Interface,
    Function,
    Namespace,
    Using,
}

impl<'src> CodeGen<'src, '_> {
    /// Compile statements until the window is exhausted.
    pub(crate) fn compile_statements(&mut self) -> Result<()> {
        while !self.stream.is_eof() {
            self.compile_statement()?;
        }
        Ok(())
    }

    /// Compile one statement at the cursor, then skip trailing `;`.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub(crate) fn compile_statement(&mut self) -> Result<()> {
        let Some(tok) = self.stream.peek() else {
            return Ok(());
        };
        let start = self.stream.pos();
        self.emitter.set_line(tok.line);

        if tok.is(TokenKind::RAW) {
            self.compile_raw()?;
        } else if tok.is(TokenKind::OCB) {
            self.compile_block()?;
        } else if let Some(decl) = self.declaration_at_cursor() {
            self.compile_declaration(decl)?;
        } else if let Some(kw) = tok.keyword() {
            self.compile_keyword_statement(kw)?;
        } else {
            self.compile_expr_statement()?;
        }
        self.skip_semis();

        if self.stream.pos() == start && !self.stream.is_eof() {
            self.error(tok.line, format!("Syntax error: Unexpected token '{}'", tok.text))?;
            self.stream.advance();
        }
        Ok(())
    }

    /// `{ statements }` or a single statement.
    pub(crate) fn compile_block(&mut self) -> Result<()> {
        if self.stream.check(TokenKind::OCB) {
            let line = self.line();
            self.blocks
                .enter(BlockKind::STD, self.emitter.len(), BlockData::None);
            self.stream.advance();
            loop {
                let Some(tok) = self.stream.peek() else {
                    self.error(line, "Missing closing braces '}'")?;
                    break;
                };
                if tok.is(TokenKind::CCB) {
                    self.stream.advance();
                    break;
                }
                self.compile_statement()?;
            }
            self.blocks.leave();
        } else {
            self.compile_statement()?;
        }
        self.skip_semis();
        Ok(())
    }

    /// Compile only declarations until the window is exhausted.
    pub(crate) fn compile_global_scope(&mut self) -> Result<()> {
        while let Some(tok) = self.stream.peek() {
            self.emitter.set_line(tok.line);
            match self.declaration_at_cursor() {
                Some(decl) => self.compile_declaration(decl)?,
                None => {
                    let message = match tok.keyword() {
                        Some(_) => format!("Syntax error: Unexpected keyword '{}'", tok.text),
                        None => format!("Syntax error: Unexpected token '{}'", tok.text),
                    };
                    self.error(tok.line, message)?;
                    self.skip_declaration();
                    self.stream.eat(TokenKind::SEMI);
                }
            }
            self.skip_semis();
        }
        Ok(())
    }

    /// Raw text of an embedded document is sent to the output consumer.
    fn compile_raw(&mut self) -> Result<()> {
        if let Some(tok) = self.stream.bump() {
            let idx = self.program.constants.add_string(tok.text);
            self.emitter.emit_loadc(idx);
            self.emitter.emit_op(Opcode::Consume);
        }
        Ok(())
    }

    /// An expression whose value is discarded.
    fn compile_expr_statement(&mut self) -> Result<()> {
        let status = self.compile_expr(ExprFlags::empty(), None)?;
        if !status.is_empty() {
            self.emitter.emit(Opcode::Pop, 1, 0, Operand::None);
        }
        Ok(())
    }

    /// Index of the `function` keyword when the cursor is at
    /// `[type [[]]] function`.
    fn function_keyword(&self) -> Option<usize> {
        let mut n = 0;
        if self.stream.peek()?.is_typedef() {
            n = 1;
            let suffix = self.stream.peek_nth(1).is_some_and(|t| t.is(TokenKind::OSB))
                && self.stream.peek_nth(2).is_some_and(|t| t.is(TokenKind::CSB));
            if suffix {
                n = 3;
            }
        }
        self.stream
            .peek_nth(n)
            .is_some_and(|t| t.is_keyword(Keyword::Function))
            .then_some(n)
    }

    fn declaration_at_cursor(&self) -> Option<Declaration> {
        let tok = self.stream.peek()?;
        let next = self.stream.peek_nth(1);
        let next_is = |kind: TokenKind| next.is_some_and(|t| t.is(kind));
        let next_is_class = next.is_some_and(|t| t.is_keyword(Keyword::Class));
        match tok.keyword() {
            Some(Keyword::Class) => Some(Declaration::Class(ClassFlags::empty())),
            Some(Keyword::Virtual) if next_is_class => Some(Declaration::Class(ClassFlags::VIRTUAL)),
            Some(Keyword::Final) if next_is_class => Some(Declaration::Class(ClassFlags::FINAL)),
            Some(Keyword::Interface) => Some(Declaration::Interface),
            Some(Keyword::Namespace) if next_is(TokenKind::ID | TokenKind::NSSEP | TokenKind::OCB) => {
                Some(Declaration::Namespace)
            }
            Some(Keyword::Using) if next_is(TokenKind::ID | TokenKind::NSSEP) => Some(Declaration::Using),
            _ => {
                // A named function; `function (` starts a closure expression.
                let n = self.function_keyword()?;
                let after = self.stream.peek_nth(n + 1)?;
                after
                    .is(TokenKind::ID | TokenKind::AMPER)
                    .then_some(Declaration::Function)
            }
        }
    }

    fn compile_declaration(&mut self, decl: Declaration) -> Result<()> {
        match decl {
            Declaration::Class(flags) => {
                if !flags.is_empty() {
                    // `virtual` / `final`
                    self.stream.advance();
                }
                self.compile_class(flags)
            }
            Declaration::Interface => self.compile_interface(),
            Declaration::Function => self.compile_function_decl(),
            Declaration::Namespace => self.compile_namespace(),
            Declaration::Using => self.compile_using(),
        }
    }

    fn compile_keyword_statement(&mut self, kw: Keyword) -> Result<()> {
        match kw {
            Keyword::If => self.compile_if(),
            Keyword::While => self.compile_while(),
            Keyword::Do => self.compile_do_while(),
            Keyword::For => self.compile_for(),
            Keyword::Foreach => self.compile_foreach(),
            Keyword::Switch => self.compile_switch(),
            Keyword::Try => self.compile_try(),
            Keyword::Throw => self.compile_throw(),
            Keyword::Break => self.compile_break(),
            Keyword::Continue => self.compile_continue(),
            Keyword::Return => self.compile_return(),
            Keyword::Exit => self.compile_exit(),
            Keyword::Const => self.compile_const(),
            Keyword::Static => {
                let scope_access = self
                    .stream
                    .peek_nth(1)
                    .is_some_and(|t| t.op() == Some(ExprOp::DoubleColon));
                if scope_access {
                    self.compile_expr_statement()
                } else {
                    self.compile_var()
                }
            }
            Keyword::Function => self.compile_expr_statement(),
            kw if kw.is_typedef() => {
                if self.function_keyword().is_some() {
                    self.compile_expr_statement()
                } else {
                    self.compile_var()
                }
            }
            Keyword::Array | Keyword::List | Keyword::SelfKw | Keyword::Parent => {
                self.compile_expr_statement()
            }
            kw if kw.is_lang_construct() => self.compile_expr_statement(),
            _ => {
                let line = self.line();
                let text = self.stream.peek().map_or("", |t| t.text);
                self.error_recover(line, format!("Syntax error: Unexpected keyword '{text}'"))
            }
        }
    }

    /// Skip to the next `;` or `{`, leaving it unconsumed.
    pub(crate) fn synchronize(&mut self) {
        self.stream.skip_until(TokenKind::SEMI | TokenKind::OCB);
    }

    /// Point every jump still pending on `block` at the next instruction,
    /// then leave it. `block` must be the current block.
    pub(crate) fn exit_block(&mut self, block: BlockId) {
        debug_assert_eq!(block, self.blocks.current());
        let here = self.emitter.len();
        self.blocks
            .fix_jumps(block, None, here, self.emitter.code_mut());
        self.blocks
            .fix_post_continue(block, here, self.emitter.code_mut());
        self.blocks.leave();
    }

    /// The `(` at the cursor and its matching `)`, or `None` when the group
    /// is not closed inside the window.
    pub(crate) fn paren_group(&self) -> Option<(usize, usize)> {
        let open = self.stream.pos();
        let close = self
            .stream
            .delimit_nested(open + 1, TokenKind::LPAREN, TokenKind::RPAREN);
        (close < self.stream.end()).then_some((open, close))
    }

    /// Compile `[from, to)` as one expression. Each token the expression
    /// leaves over is reported as unexpected, with `prefix` in front.
    pub(crate) fn compile_condition(
        &mut self,
        from: usize,
        to: usize,
        prefix: &str,
    ) -> Result<ExprStatus> {
        self.with_span(from, to, |cg| {
            let status = cg.compile_expr(ExprFlags::empty(), None)?;
            while let Some(tok) = cg.stream.bump() {
                cg.error(tok.line, format!("{prefix}Unexpected token '{}'", tok.text))?;
            }
            Ok(status)
        })
    }
}
