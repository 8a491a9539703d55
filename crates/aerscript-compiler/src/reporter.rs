//! Diagnostic reporting with the error-limit abort.

use aerscript_core::{Abort, Diagnostic, DiagnosticSink, Severity};
use tracing::{debug, error, info, warn};

/// Streams diagnostics to the caller's sink and counts them.
///
/// Every [`Severity::Error`] bumps the error counter; once it exceeds the
/// limit, [`report`](Self::report) returns [`Abort::ErrorLimit`] and the
/// code generator unwinds.
pub struct Reporter<'s> {
    sink: &'s mut dyn DiagnosticSink,
    file: Option<String>,
    limit: u32,
    errors: u32,
    warnings: u32,
    notices: u32,
}

impl<'s> Reporter<'s> {
    pub fn new(sink: &'s mut dyn DiagnosticSink, file: Option<String>, limit: u32) -> Self {
        Self {
            sink,
            file,
            limit,
            errors: 0,
            warnings: 0,
            notices: 0,
        }
    }

    pub fn report(
        &mut self,
        severity: Severity,
        line: u32,
        message: impl Into<String>,
    ) -> Result<(), Abort> {
        let diagnostic =
            Diagnostic::new(severity, line, message).with_file(self.file.as_deref());
        self.mirror(&diagnostic);
        self.sink.report(diagnostic);

        match severity {
            Severity::Error => {
                self.errors += 1;
                if self.errors > self.limit {
                    let fatal = Diagnostic::new(
                        Severity::Error,
                        line,
                        format!(
                            "{} Error count limit reached, the AerScript engine is aborting compilation",
                            self.errors
                        ),
                    )
                    .with_file(self.file.as_deref());
                    self.mirror(&fatal);
                    self.sink.report(fatal);
                    return Err(Abort::ErrorLimit { limit: self.limit });
                }
            }
            Severity::Warning => self.warnings += 1,
            Severity::Notice | Severity::Deprecated => self.notices += 1,
        }
        Ok(())
    }

    #[inline]
    pub fn error(&mut self, line: u32, message: impl Into<String>) -> Result<(), Abort> {
        self.report(Severity::Error, line, message)
    }

    #[inline]
    pub fn warning(&mut self, line: u32, message: impl Into<String>) -> Result<(), Abort> {
        self.report(Severity::Warning, line, message)
    }

    #[inline]
    pub fn notice(&mut self, line: u32, message: impl Into<String>) -> Result<(), Abort> {
        self.report(Severity::Notice, line, message)
    }

    fn mirror(&self, diagnostic: &Diagnostic) {
        let file = self.file.as_deref().unwrap_or("[MEMORY]");
        let line = diagnostic.line;
        let message = diagnostic.message.as_str();
        match diagnostic.severity {
            Severity::Error => error!(file = file, line = line, "{}", message),
            Severity::Warning => warn!(file = file, line = line, "{}", message),
            Severity::Notice => info!(file = file, line = line, "{}", message),
            Severity::Deprecated => debug!(file = file, line = line, "{}", message),
        }
    }

    pub fn error_count(&self) -> u32 {
        self.errors
    }

    pub fn warning_count(&self) -> u32 {
        self.warnings
    }

    pub fn notice_count(&self) -> u32 {
        self.notices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_severity() {
        let mut sink: Vec<Diagnostic> = Vec::new();
        let mut reporter = Reporter::new(&mut sink, Some("t.aer".into()), 15);
        reporter.warning(1, "careful").unwrap();
        reporter.error(2, "broken").unwrap();
        reporter.notice(3, "fyi").unwrap();
        assert_eq!(reporter.error_count(), 1);
        assert_eq!(reporter.warning_count(), 1);
        assert_eq!(reporter.notice_count(), 1);
        drop(reporter);
        assert_eq!(sink.len(), 3);
        assert_eq!(sink[1].to_string(), "t.aer:2: error: broken");
    }

    #[test]
    fn aborts_once_limit_is_exceeded() {
        let mut sink: Vec<Diagnostic> = Vec::new();
        let mut reporter = Reporter::new(&mut sink, None, 2);
        assert!(reporter.error(1, "one").is_ok());
        assert!(reporter.error(1, "two").is_ok());
        assert_eq!(
            reporter.error(1, "three"),
            Err(Abort::ErrorLimit { limit: 2 })
        );
        drop(reporter);
        assert!(sink.last().unwrap().message.contains("Error count limit reached"));
    }

    #[test]
    fn warnings_never_abort() {
        let mut sink: Vec<Diagnostic> = Vec::new();
        let mut reporter = Reporter::new(&mut sink, None, 0);
        for _ in 0..5 {
            assert!(reporter.warning(1, "w").is_ok());
        }
    }
}
