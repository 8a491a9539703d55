//! Compile-time diagnostics.
//!
//! The code generator never buffers its messages: each [`Diagnostic`] is
//! handed to a [`DiagnosticSink`] the moment it is produced. [`Diagnostics`]
//! is the stock sink that simply collects them.

use std::collections::VecDeque;
use std::fmt;

/// A single diagnostic message produced while compiling a script.
///
/// ```text
/// test.aer:10: error: A 'break' statement may only be used within a loop or switch
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// The severity level of this diagnostic.
    pub severity: Severity,
    /// The diagnostic message text.
    pub message: String,
    /// The source file name, if the compiler was given one.
    pub file: Option<String>,
    /// The line number where this diagnostic occurred (1-based).
    pub line: u32,
}

impl Diagnostic {
    pub fn new(severity: Severity, line: u32, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            file: None,
            line,
        }
    }

    /// Attach a file name.
    pub fn with_file(mut self, file: Option<&str>) -> Self {
        self.file = file.map(str::to_owned);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// The severity level of a diagnostic.
///
/// Only [`Severity::Error`] counts toward the abort threshold; the others
/// never change the emitted code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    /// A malformed construct or a semantic violation.
    Error,
    /// Suspicious but compilable code, such as a missing optional `;`.
    Warning,
    /// Informational, e.g. a disabled feature was skipped.
    Notice,
    /// Use of a construct scheduled for removal.
    Deprecated,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Notice => "notice",
            Severity::Deprecated => "deprecated",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives diagnostics as they are produced.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Adapts a closure into a sink, for embedders that stream messages elsewhere.
pub struct SinkFn<F>(pub F);

impl<F: FnMut(Diagnostic)> DiagnosticSink for SinkFn<F> {
    fn report(&mut self, diagnostic: Diagnostic) {
        (self.0)(diagnostic)
    }
}

/// A collection of diagnostics from one or more compilations.
///
/// ```
/// use aerscript_core::{Diagnostic, DiagnosticSink, Diagnostics, Severity};
///
/// let mut diagnostics = Diagnostics::new();
/// diagnostics.report(Diagnostic::new(Severity::Warning, 3, "Expected ';'"));
/// assert!(!diagnostics.has_errors());
/// assert_eq!(diagnostics.warning_count(), 1);
/// ```
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    diagnostics: VecDeque<Diagnostic>,
    has_errors: bool,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        if diagnostic.is_error() {
            self.has_errors = true;
        }
        self.diagnostics.push_back(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn clear(&mut self) {
        self.diagnostics.clear();
        self.has_errors = false;
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.of(Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.of(Severity::Warning)
    }

    /// Diagnostics of one severity, in the order they were reported.
    pub fn of(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(move |d| d.severity == severity)
    }

    pub fn count(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn notice_count(&self) -> usize {
        self.of(Severity::Notice).count()
    }

    /// Write every diagnostic, one per line.
    pub fn emit<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for diagnostic in &self.diagnostics {
            writeln!(writer, "{}", diagnostic)?;
        }
        Ok(())
    }
}

impl DiagnosticSink for Diagnostics {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.add_diagnostic(diagnostic);
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(file) = &self.file {
            write!(
                f,
                "{}:{}: {}: {}",
                file, self.line, self.severity, self.message
            )
        } else {
            write!(f, "{}: {}: {}", self.line, self.severity, self.message)
        }
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for diagnostic in &self.diagnostics {
            writeln!(f, "{}", diagnostic)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_display_with_file() {
        let d = Diagnostic::new(Severity::Error, 7, "Invalid class name").with_file(Some("a.aer"));
        assert_eq!(d.to_string(), "a.aer:7: error: Invalid class name");
    }

    #[test]
    fn diagnostic_display_without_file() {
        let d = Diagnostic::new(Severity::Notice, 2, "skipped");
        assert_eq!(d.to_string(), "2: notice: skipped");
    }

    #[test]
    fn collection_counts() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.report(Diagnostic::new(Severity::Error, 1, "a"));
        diagnostics.report(Diagnostic::new(Severity::Warning, 2, "b"));
        diagnostics.report(Diagnostic::new(Severity::Warning, 3, "c"));
        diagnostics.report(Diagnostic::new(Severity::Notice, 4, "d"));

        assert!(diagnostics.has_errors());
        assert_eq!(diagnostics.count(), 4);
        assert_eq!(diagnostics.error_count(), 1);
        assert_eq!(diagnostics.warning_count(), 2);
        assert_eq!(diagnostics.notice_count(), 1);
    }

    #[test]
    fn clear_resets_error_flag() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.report(Diagnostic::new(Severity::Error, 1, "a"));
        diagnostics.clear();
        assert!(diagnostics.is_empty());
        assert!(!diagnostics.has_errors());
    }

    #[test]
    fn closure_sink() {
        let mut lines = Vec::new();
        {
            let mut sink = SinkFn(|d: Diagnostic| lines.push(d.line));
            sink.report(Diagnostic::new(Severity::Warning, 9, "x"));
        }
        assert_eq!(lines, vec![9]);
    }

    #[test]
    fn emit_writes_lines() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.report(Diagnostic::new(Severity::Error, 1, "first"));
        diagnostics.report(Diagnostic::new(Severity::Error, 2, "second"));

        let mut out = Vec::new();
        diagnostics.emit(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "1: error: first\n2: error: second\n"
        );
    }
}
