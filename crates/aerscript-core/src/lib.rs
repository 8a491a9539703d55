//! Shared types for the AerScript front end.
//!
//! Source locations, the error taxonomy, and the diagnostics model used by
//! both the parser and the compiler crates.

pub mod diagnostics;
pub mod error;
pub mod span;

pub use diagnostics::{Diagnostic, DiagnosticSink, Diagnostics, Severity, SinkFn};
pub use error::{Abort, CompileError, LexError, ParseError};
pub use span::Span;
