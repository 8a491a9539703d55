//! Unified error types for AerScript.
//!
//! ```text
//! LexError      - tokenization problems, collected and reported as diagnostics
//! ParseError    - expression-tree builder failures, reported as diagnostics
//! Abort         - fatal conditions that unwind the whole compilation
//! CompileError  - the result surfaced to embedders
//! ```
//!
//! Only [`Abort`] short-circuits the code generator. Every other problem is
//! turned into a [`Diagnostic`](crate::Diagnostic) and compilation resumes at
//! the next statement.

use thiserror::Error;

use crate::Span;

// ============================================================================
// Lexer Errors
// ============================================================================

/// Errors that occur during tokenization.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    /// An unexpected character was encountered.
    #[error("unexpected character '{ch}'")]
    UnexpectedChar { ch: char, span: Span },

    /// A string literal was not properly terminated.
    #[error("unterminated string literal")]
    UnterminatedString { span: Span },

    /// A block comment was not properly terminated.
    #[error("unterminated block comment")]
    UnterminatedComment { span: Span },

    /// A numeric literal could not be parsed.
    #[error("invalid number literal: {detail}")]
    InvalidNumber { span: Span, detail: String },
}

impl LexError {
    /// Get the span where this error occurred.
    pub fn span(&self) -> Span {
        match self {
            LexError::UnexpectedChar { span, .. } => *span,
            LexError::UnterminatedString { span } => *span,
            LexError::UnterminatedComment { span } => *span,
            LexError::InvalidNumber { span, .. } => *span,
        }
    }
}

// ============================================================================
// Parse Errors
// ============================================================================

/// An expression could not be turned into a tree.
///
/// The message is already phrased for the script author.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub line: u32,
}

impl ParseError {
    pub fn new(line: u32, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }

    pub fn line(&self) -> u32 {
        self.line
    }
}

// ============================================================================
// Abort
// ============================================================================

/// A fatal condition: compilation stops immediately and nothing is installed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Abort {
    /// Too many errors were reported.
    #[error("error count limit ({limit}) reached, compilation aborted")]
    ErrorLimit { limit: u32 },

    /// The compiler reached a state it cannot continue from.
    #[error("internal compiler error: {message}")]
    Internal { message: String },
}

impl Abort {
    pub fn internal(message: impl Into<String>) -> Self {
        Abort::Internal {
            message: message.into(),
        }
    }
}

// ============================================================================
// Compile Errors
// ============================================================================

/// Errors surfaced by the public compilation entry points.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// Compilation was aborted; no program was produced.
    #[error(transparent)]
    Aborted(#[from] Abort),

    /// Compilation finished but reported errors, so the program is not runnable.
    #[error("compilation failed with {errors} error(s)")]
    Failed { errors: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lex_error_span() {
        let span = Span::new(4, 2, 1);
        let err = LexError::UnexpectedChar { ch: '@', span };
        assert_eq!(err.span(), span);
        assert_eq!(err.to_string(), "unexpected character '@'");
    }

    #[test]
    fn abort_display() {
        let err = Abort::ErrorLimit { limit: 15 };
        assert_eq!(
            err.to_string(),
            "error count limit (15) reached, compilation aborted"
        );
    }

    #[test]
    fn compile_error_from_abort() {
        let err: CompileError = Abort::internal("boom").into();
        assert!(matches!(err, CompileError::Aborted(Abort::Internal { .. })));
        assert_eq!(err.to_string(), "internal compiler error: boom");
    }

    #[test]
    fn parse_error_keeps_line() {
        let err = ParseError::new(12, "Syntax error");
        assert_eq!(err.line(), 12);
        assert_eq!(err.to_string(), "Syntax error");
    }
}
