//! AerScript
//!
//! Front end for the AerScript language: source text in, bytecode
//! [`Program`] out. The work is split across three crates re-exported here:
//!
//! - [`core`]: spans, errors and the diagnostics model
//! - [`parser`]: the lexer, the token stream and the expression-tree builder
//! - [`compiler`]: the code generator and the compiled program
//!
//! ```
//! use aerscript::prelude::*;
//!
//! let mut diagnostics = Diagnostics::new();
//! let program = compile_source("$total = 2 * 21;", &mut diagnostics).unwrap();
//! assert!(diagnostics.is_empty());
//! assert!(program.disassemble().contains("STORE"));
//! ```

pub mod logging;

pub use aerscript_compiler as compiler;
pub use aerscript_core as core;
pub use aerscript_parser as parser;

pub use aerscript_compiler::{
    CompileMode, Compilation, Compiler, CompilerConfig, Instruction, Opcode, Operand, Program,
};
pub use aerscript_core::{CompileError, Diagnostic, DiagnosticSink, Diagnostics, Severity};

/// Compile a script with the default configuration.
///
/// Fails when the compilation aborts or reports any error; the diagnostics
/// land in `sink` either way.
pub fn compile_source(
    source: &str,
    sink: &mut dyn DiagnosticSink,
) -> Result<Program, CompileError> {
    Compiler::new(CompilerConfig::default())
        .compile(source, sink)?
        .into_program()
}

pub mod prelude {
    pub use crate::compile_source;
    pub use aerscript_compiler::{
        ClassDesc, CompileMode, Compilation, Compiler, CompilerConfig, FunctionDesc, InstrList,
        Instruction, Opcode, Operand, Program,
    };
    pub use aerscript_core::{
        CompileError, Diagnostic, DiagnosticSink, Diagnostics, Severity, SinkFn,
    };
}
