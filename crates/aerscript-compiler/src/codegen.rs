//! Code generator state shared by every construct compiler.
//!
//! [`CodeGen`] threads the token stream, the active instruction container,
//! the block arena, the program under construction and the diagnostic
//! reporter through the expression, statement, function and class
//! compilers, each of which lives in its own module as an `impl CodeGen`
//! block.
//!
//! Temporary state changes are scoped: [`CodeGen::with_span`] narrows the
//! token window, [`CodeGen::with_container`] swaps the active container and
//! [`CodeGen::with_stream`] installs a different token buffer. All three put
//! the previous state back before returning, whatever the closure returned,
//! so an abort unwinding through them never leaves the generator pointed at
//! a half-built container or a foreign token buffer.

use aerscript_core::{Abort, LexError};
use aerscript_parser::{Token, TokenKind, TokenStream};

use crate::block::{BlockData, BlockKind, BlockStack};
use crate::bytecode::InstrList;
use crate::config::CompilerConfig;
use crate::emit::Emitter;
use crate::func::StaticVar;
use crate::program::Program;
use crate::reporter::Reporter;

pub(crate) type Result<T> = std::result::Result<T, Abort>;

pub(crate) struct CodeGen<'src, 's> {
    pub(crate) config: CompilerConfig,
    pub(crate) reporter: Reporter<'s>,
    pub(crate) program: Program,
    pub(crate) emitter: Emitter,
    pub(crate) blocks: BlockStack,
    pub(crate) stream: TokenStream<'src>,
    /// One frame per function body being compiled; `static` declarations
    /// land in the innermost frame.
    pub(crate) statics: Vec<Vec<StaticVar>>,
    closure_counter: u32,
    namespace_noticed: bool,
}

impl<'src, 's> CodeGen<'src, 's> {
    pub(crate) fn new(
        config: CompilerConfig,
        reporter: Reporter<'s>,
        program: Program,
        stream: TokenStream<'src>,
    ) -> Self {
        Self {
            config,
            reporter,
            program,
            emitter: Emitter::new(),
            blocks: BlockStack::new(),
            stream,
            statics: Vec::new(),
            closure_counter: 0,
            namespace_noticed: false,
        }
    }

    // =========================================
    // Diagnostics
    // =========================================

    #[inline]
    pub(crate) fn error(&mut self, line: u32, message: impl Into<String>) -> Result<()> {
        self.reporter.error(line, message)
    }

    #[inline]
    pub(crate) fn warning(&mut self, line: u32, message: impl Into<String>) -> Result<()> {
        self.reporter.warning(line, message)
    }

    #[inline]
    pub(crate) fn notice(&mut self, line: u32, message: impl Into<String>) -> Result<()> {
        self.reporter.notice(line, message)
    }

    /// Report the disabled-namespace notice, once per compilation.
    pub(crate) fn namespace_notice(&mut self, line: u32) -> Result<()> {
        if self.namespace_noticed {
            return Ok(());
        }
        self.namespace_noticed = true;
        self.notice(
            line,
            "Namespace support is disabled in the current release of the AerScript engine",
        )
    }

    /// Report tokenization problems as errors.
    pub(crate) fn report_lex_errors(&mut self, errors: Vec<LexError>) -> Result<()> {
        for err in errors {
            self.error(err.span().line, err.to_string())?;
        }
        Ok(())
    }

    /// Skip the rest of an erroneous statement, stopping on its `;`.
    pub(crate) fn recover(&mut self) {
        self.stream.skip_until(TokenKind::SEMI);
    }

    /// Report an error and resynchronize on the next `;`.
    pub(crate) fn error_recover(&mut self, line: u32, message: impl Into<String>) -> Result<()> {
        self.error(line, message)?;
        self.recover();
        Ok(())
    }

    // =========================================
    // Token helpers
    // =========================================

    #[inline]
    pub(crate) fn line(&self) -> u32 {
        self.stream.line()
    }

    #[inline]
    pub(crate) fn token(&self, idx: usize) -> Option<Token<'src>> {
        self.stream.get(idx)
    }

    /// Skip any `;` at the cursor.
    pub(crate) fn skip_semis(&mut self) {
        while self.stream.eat(TokenKind::SEMI) {}
    }

    // =========================================
    // Scoped state
    // =========================================

    /// Run `f` with the token window set to `[start, end)`, then restore the
    /// previous cursor and window.
    pub(crate) fn with_span<R>(
        &mut self,
        start: usize,
        end: usize,
        f: impl FnOnce(&mut Self) -> Result<R>,
    ) -> Result<R> {
        let saved_pos = self.stream.pos();
        let saved_end = self.stream.set_end(end);
        self.stream.set_pos(start);
        let result = f(self);
        self.stream.set_end(saved_end);
        self.stream.set_pos(saved_pos);
        result
    }

    /// Run `f` with a fresh instruction container active and hand back the
    /// code it emitted alongside its result.
    pub(crate) fn with_container<R>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<R>,
    ) -> (InstrList, Result<R>) {
        let saved = self.emitter.swap(InstrList::new());
        let result = f(self);
        let code = self.emitter.swap(saved);
        (code, result)
    }

    /// Run `f` over a different token buffer.
    pub(crate) fn with_stream<R>(
        &mut self,
        stream: TokenStream<'src>,
        f: impl FnOnce(&mut Self) -> Result<R>,
    ) -> Result<R> {
        let saved = std::mem::replace(&mut self.stream, stream);
        let result = f(self);
        self.stream = saved;
        result
    }

    // =========================================
    // Context queries
    // =========================================

    /// Name of the nearest enclosing class.
    pub(crate) fn current_class(&self) -> Option<String> {
        match self.blocks.nearest_data(BlockKind::CLASS) {
            Some(BlockData::Class(name)) => Some(name.clone()),
            _ => None,
        }
    }

    /// Name and owning class of the nearest enclosing function.
    pub(crate) fn current_function(&self) -> Option<(String, Option<String>)> {
        match self.blocks.nearest_data(BlockKind::FUNC) {
            Some(BlockData::Function { name, class }) => Some((name.clone(), class.clone())),
            _ => None,
        }
    }

    /// A name for the next anonymous function.
    pub(crate) fn next_closure_name(&mut self) -> String {
        loop {
            let name = format!("{{closure_{}}}", self.closure_counter);
            self.closure_counter += 1;
            if self.program.function(&name).is_none() {
                return name;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aerscript_core::Diagnostic;
    use aerscript_parser::lexer::tokenize;

    use crate::bytecode::Opcode;

    fn with_gen(src: &str, f: impl FnOnce(&mut CodeGen<'_, '_>)) -> Vec<Diagnostic> {
        let mut sink: Vec<Diagnostic> = Vec::new();
        {
            let reporter = Reporter::new(&mut sink, None, 15);
            let stream = TokenStream::new(tokenize(src, 1).0);
            let mut cg = CodeGen::new(CompilerConfig::default(), reporter, Program::default(), stream);
            f(&mut cg);
        }
        sink
    }

    #[test]
    fn with_span_restores_window() {
        with_gen("a b c d", |cg| {
            cg.stream.set_pos(1);
            let seen = cg
                .with_span(2, 3, |cg| {
                    let tok = cg.stream.bump().map(|t| t.text);
                    assert!(cg.stream.is_eof());
                    Ok(tok)
                })
                .unwrap();
            assert_eq!(seen, Some("c"));
            assert_eq!(cg.stream.pos(), 1);
            assert_eq!(cg.stream.end(), 4);
        });
    }

    #[test]
    fn with_container_restores_on_abort() {
        with_gen("", |cg| {
            cg.emitter.emit_op(Opcode::Noop);
            let (code, result) = cg.with_container(|cg| {
                cg.emitter.emit_op(Opcode::Done);
                Err::<(), _>(Abort::internal("stop"))
            });
            assert!(result.is_err());
            assert_eq!(code.len(), 1);
            assert_eq!(cg.emitter.len(), 1);
            assert_eq!(cg.emitter.peek().unwrap().op, Opcode::Noop);
        });
    }

    #[test]
    fn error_recover_stops_on_semicolon() {
        let sink = with_gen("1 2 3 ; 4", |cg| {
            cg.error_recover(1, "bad").unwrap();
            assert!(cg.stream.check(TokenKind::SEMI));
        });
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn namespace_notice_once() {
        let sink = with_gen("", |cg| {
            cg.namespace_notice(1).unwrap();
            cg.namespace_notice(2).unwrap();
        });
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn closure_names_are_unique() {
        with_gen("", |cg| {
            let a = cg.next_closure_name();
            let b = cg.next_closure_name();
            assert_eq!(a, "{closure_0}");
            assert_ne!(a, b);
        });
    }
}
