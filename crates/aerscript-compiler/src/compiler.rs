//! The public compilation entry point.

use aerscript_core::{CompileError, DiagnosticSink, LexError};
use aerscript_parser::TokenStream;
use aerscript_parser::lexer::{tokenize, tokenize_embedded};
use tracing::debug;

use crate::block::BlockKind;
use crate::bytecode::{ConstantPool, Opcode, Operand};
use crate::codegen::{CodeGen, Result};
use crate::config::{CompileMode, CompilerConfig};
use crate::expr::ExprFlags;
use crate::program::Program;
use crate::reporter::Reporter;

/// Compiles source texts into [`Program`]s.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    config: CompilerConfig,
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut CompilerConfig {
        &mut self.config
    }

    /// Compile `source`, streaming diagnostics into `sink`.
    ///
    /// Errors in the script do not fail the call: they are reported and the
    /// resulting [`Compilation`] carries the counts. Only an abort (the error
    /// limit being exceeded) is returned as an `Err`.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compile(
        &mut self,
        source: &str,
        sink: &mut dyn DiagnosticSink,
    ) -> std::result::Result<Compilation, CompileError> {
        let (tokens, lex_errors) = if self.config.embedded {
            tokenize_embedded(source)
        } else {
            tokenize(source, 1)
        };
        debug!(
            file = self.config.file_label(),
            mode = ?self.config.mode,
            tokens = tokens.len(),
            "compiling"
        );

        let reporter = Reporter::new(sink, self.config.file_name.clone(), self.config.error_limit);
        let program = Program::new(ConstantPool::with_threshold(
            self.config.literal_cache_threshold,
        ));
        let mut cg = CodeGen::new(self.config.clone(), reporter, program, TokenStream::new(tokens));
        if let Err(abort) = cg.compile_unit(lex_errors) {
            debug!(%abort, "compilation aborted");
            return Err(abort.into());
        }

        let (errors, warnings, notices) = (
            cg.reporter.error_count(),
            cg.reporter.warning_count(),
            cg.reporter.notice_count(),
        );
        let main = cg.emitter.finish();
        let mut program = cg.program;
        program.main = main;
        let compilation = Compilation {
            program,
            errors,
            warnings,
            notices,
        };
        debug!(
            errors = compilation.errors,
            warnings = compilation.warnings,
            instructions = compilation.program.main.len(),
            "compiled"
        );
        Ok(compilation)
    }
}

impl CodeGen<'_, '_> {
    fn compile_unit(&mut self, lex_errors: Vec<LexError>) -> Result<()> {
        self.report_lex_errors(lex_errors)?;
        match self.config.mode {
            CompileMode::Script => self.compile_statements()?,
            CompileMode::Declarations => self.compile_global_scope()?,
            CompileMode::Expression => {
                let status = self.compile_expr(ExprFlags::empty(), None)?;
                self.skip_semis();
                if let Some(tok) = self.stream.peek() {
                    self.error(tok.line, format!("Syntax error: Unexpected token '{}'", tok.text))?;
                }
                self.emitter
                    .emit(Opcode::Done, i32::from(!status.is_empty()), 1, Operand::None);
                return Ok(());
            }
        }

        // A `throw` outside any `try` leaves the program.
        let root = self.blocks.current();
        debug_assert!(self.blocks.get(root).kind.contains(BlockKind::GLOBAL));
        let end = self.emitter.len();
        self.blocks
            .fix_jumps(root, Some(Opcode::Throw), end, self.emitter.code_mut());
        self.emitter.emit(Opcode::Done, 0, 0, Operand::None);
        Ok(())
    }
}

/// The outcome of one [`Compiler::compile`] call.
#[derive(Debug, Clone)]
pub struct Compilation {
    program: Program,
    errors: u32,
    warnings: u32,
    notices: u32,
}

impl Compilation {
    pub fn error_count(&self) -> u32 {
        self.errors
    }

    pub fn warning_count(&self) -> u32 {
        self.warnings
    }

    pub fn notice_count(&self) -> u32 {
        self.notices
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    /// The program, even when errors were reported.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// The program, provided compilation reported no errors.
    pub fn into_program(self) -> std::result::Result<Program, CompileError> {
        if self.errors > 0 {
            return Err(CompileError::Failed {
                errors: self.errors,
            });
        }
        Ok(self.program)
    }
}

#[cfg(test)]
mod tests {
    use aerscript_core::{Abort, Diagnostic, Severity};

    use super::*;
    use crate::bytecode::Constant;

    fn compile(config: CompilerConfig, src: &str) -> (Compilation, Vec<Diagnostic>) {
        let mut sink: Vec<Diagnostic> = Vec::new();
        let compilation = Compiler::new(config).compile(src, &mut sink).unwrap();
        (compilation, sink)
    }

    fn ops(program: &Program) -> Vec<Opcode> {
        program.main.iter().map(|i| i.op).collect()
    }

    #[test]
    fn script_ends_with_done() {
        let (compilation, diagnostics) = compile(CompilerConfig::default(), "$a = 1;");
        assert!(diagnostics.is_empty());
        let program = compilation.into_program().unwrap();
        assert_eq!(
            ops(&program),
            vec![Opcode::Loadc, Opcode::Store, Opcode::Pop, Opcode::Done]
        );
    }

    #[test]
    fn uncaught_throw_jumps_to_the_end() {
        let (compilation, _) = compile(CompilerConfig::default(), "throw new E(); $a = 1;");
        let program = compilation.program();
        let throw = program.main.iter().find(|i| i.op == Opcode::Throw).unwrap();
        assert_eq!(throw.p2, program.main.len() - 1);
    }

    #[test]
    fn expression_mode() {
        let config = CompilerConfig::new().with_mode(CompileMode::Expression);
        let (compilation, diagnostics) = compile(config.clone(), "1 + 2");
        assert!(diagnostics.is_empty());
        let program = compilation.into_program().unwrap();
        let done = program.main.peek().unwrap();
        assert_eq!((done.op, done.p1, done.p2), (Opcode::Done, 1, 1));

        let (compilation, diagnostics) = compile(config, "1 + 2; 3");
        assert_eq!(compilation.error_count(), 1);
        assert_eq!(diagnostics[0].message, "Syntax error: Unexpected token '3'");
    }

    #[test]
    fn declarations_mode() {
        let config = CompilerConfig::new().with_mode(CompileMode::Declarations);
        let (compilation, diagnostics) = compile(config, "function f() {} $a = 1; class C {}");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "Syntax error: Unexpected token '$'");
        let program = compilation.program();
        assert!(program.function("f").is_some());
        assert!(program.class("C").is_some());
        assert!(compilation.into_program().is_err());
    }

    #[test]
    fn embedded_raw_text_is_consumed() {
        let config = CompilerConfig::new().with_embedded(true);
        let (compilation, diagnostics) = compile(config, "Hi <?aer $a = 1 ?>!");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let program = compilation.into_program().unwrap();
        assert_eq!(
            ops(&program),
            vec![
                Opcode::Loadc,
                Opcode::Consume,
                Opcode::Loadc,
                Opcode::Store,
                Opcode::Pop,
                Opcode::Loadc,
                Opcode::Consume,
                Opcode::Done,
            ]
        );
        let idx = program.main.get(0).unwrap().p2;
        assert_eq!(program.constants.get(idx), Some(&Constant::String("Hi ".into())));
    }

    #[test]
    fn literal_cache_threshold_reaches_the_pool() {
        let src = "$a = 'hello world'; $b = 'hello world';";
        let slots = |threshold: usize| {
            let config = CompilerConfig::new().with_literal_cache_threshold(threshold);
            let (compilation, diagnostics) = compile(config, src);
            assert!(diagnostics.is_empty());
            let loads: Vec<u32> = compilation
                .program()
                .main
                .iter()
                .filter(|i| i.op == Opcode::Loadc)
                .map(|i| i.p2)
                .collect();
            assert_eq!(loads.len(), 2);
            (loads[0], loads[1])
        };

        let (a, b) = slots(64);
        assert_eq!(a, b);
        let (a, b) = slots(4);
        assert_ne!(a, b);
    }

    #[test]
    fn lex_errors_are_reported() {
        let (compilation, diagnostics) = compile(CompilerConfig::default(), "$a = 'open");
        assert!(compilation.has_errors());
        assert_eq!(diagnostics[0].severity, Severity::Error);
    }

    #[test]
    fn error_limit_aborts() {
        let mut sink: Vec<Diagnostic> = Vec::new();
        let config = CompilerConfig::new().with_error_limit(1);
        let result = Compiler::new(config).compile("break; break; break;", &mut sink);
        assert_eq!(
            result.unwrap_err(),
            CompileError::Aborted(Abort::ErrorLimit { limit: 1 })
        );
        assert!(sink.last().unwrap().message.contains("Error count limit reached"));
    }

    #[test]
    fn file_name_is_attached() {
        let config = CompilerConfig::new().with_file_name("t.aer");
        let (_, diagnostics) = compile(config, "continue;");
        assert_eq!(
            diagnostics[0].to_string(),
            "t.aer:1: error: A 'continue' statement may only be used within a loop or switch"
        );
    }
}
