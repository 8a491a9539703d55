//! AerScript Compiler
//!
//! A single-pass compiler from AerScript source to stack-machine bytecode.
//! There is no separate syntax tree for statements: the code generator walks
//! the token stream directly and only builds a tree per expression.
//!
//! ## Modules
//!
//! - [`bytecode`]: Opcodes, instructions and the constant pool
//! - [`block`]: The lexical block stack and its jump fixups
//! - [`emit`]: Instruction emitter over the active container
//! - [`program`]: The compiled program and its descriptor tables
//! - [`func`] / [`class`]: Function and class descriptors
//! - [`config`]: Compiler configuration
//! - [`reporter`]: Diagnostic reporting with the error limit
//!
//! The construct compilers (expressions, statements, functions, classes)
//! are private `impl` blocks on the shared code generator.
//!
//! ```
//! use aerscript_compiler::{Compiler, CompilerConfig};
//! use aerscript_core::Diagnostic;
//!
//! let mut diagnostics: Vec<Diagnostic> = Vec::new();
//! let mut compiler = Compiler::new(CompilerConfig::default());
//! let compilation = compiler.compile("$a = 1 + 2;", &mut diagnostics).unwrap();
//! assert_eq!(compilation.error_count(), 0);
//! let program = compilation.into_program().unwrap();
//! assert!(!program.main.is_empty());
//! ```

pub mod block;
pub mod bytecode;
pub mod class;
mod class_compiler;
mod codegen;
mod compiler;
pub mod config;
pub mod emit;
mod expr;
pub mod func;
mod function_compiler;
pub mod program;
pub mod reporter;
mod stmt;

pub use bytecode::{Constant, ConstantPool, InstrList, Instruction, Opcode, Operand};
pub use class::{ClassAttr, ClassDesc, ClassFlags, ClassLink, ClassMethod, MemberFlags, Visibility};
pub use compiler::{Compilation, Compiler};
pub use config::{CompileMode, CompilerConfig};
pub use func::{DataType, FuncArg, FuncFlags, FunctionDesc, Signature, TypeSpec};
pub use program::{ExceptionDesc, ForeachDesc, Program, SwitchDesc};

// Re-export the error types from core for convenience
pub use aerscript_core::{CompileError, Diagnostic, DiagnosticSink, Severity};
