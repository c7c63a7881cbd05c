//! The error-reporting sink
//!
//! The flattening stage never formats or prints diagnostics itself; it hands
//! them to an `ErrorReporter`. A successful report returns an `ErrorReported`
//! token, which is the only way to build the error half of a compile result.

use crate::{Diagnostic, DiagnosticBuilder, DiagnosticSeverity, Diagnostics, SourceSpan};
use log::trace;

/// Proof that at least one error has been handed to the reporter.
///
/// Cannot be constructed outside this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorReported(());

/// Collects errors and warnings for one compilation
#[derive(Debug, Default)]
pub struct ErrorReporter {
    diagnostics: Diagnostics,
    error_count: usize,
    warnings_as_errors: bool,
    /// 0 means unlimited
    max_errors: usize,
    suppressed: bool,
}

/// Marker for "were any errors reported since this point?"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    num_errors: usize,
}

impl Checkpoint {
    pub fn no_new_errors(&self, reporter: &ErrorReporter) -> bool {
        reporter.error_count == self.num_errors
    }

    pub fn new_error_count(&self, reporter: &ErrorReporter) -> usize {
        reporter.error_count - self.num_errors
    }
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_warnings_as_errors(mut self, enabled: bool) -> Self {
        self.warnings_as_errors = enabled;
        self
    }

    pub fn with_max_errors(mut self, max_errors: usize) -> Self {
        self.max_errors = max_errors;
        self
    }

    /// Report an error with an optional location
    pub fn report_error(
        &mut self,
        span: Option<SourceSpan>,
        message: impl Into<String>,
    ) -> ErrorReported {
        self.report_error_diagnostic(DiagnosticBuilder::error(message, span).build())
    }

    /// Report a fully built diagnostic as an error
    pub fn report_error_diagnostic(&mut self, mut diagnostic: Diagnostic) -> ErrorReported {
        diagnostic.severity = DiagnosticSeverity::Error;
        if self.suppressed {
            trace!("suppressed error: {}", diagnostic.message);
            return ErrorReported(());
        }

        self.error_count += 1;
        if self.max_errors == 0 || self.error_count <= self.max_errors {
            self.diagnostics.push(diagnostic);
        }
        ErrorReported(())
    }

    /// Report a warning with an optional location.
    ///
    /// Returns `Some` when the warning was promoted to an error.
    pub fn report_warning(
        &mut self,
        span: Option<SourceSpan>,
        message: impl Into<String>,
    ) -> Option<ErrorReported> {
        self.report_warning_diagnostic(DiagnosticBuilder::warning(message, span).build())
    }

    pub fn report_warning_diagnostic(&mut self, diagnostic: Diagnostic) -> Option<ErrorReported> {
        if self.warnings_as_errors {
            return Some(self.report_error_diagnostic(diagnostic));
        }
        if !self.suppressed {
            self.diagnostics.push(diagnostic);
        }
        None
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            num_errors: self.error_count,
        }
    }

    /// Toggle suppression; returns the previous setting so callers can restore it.
    ///
    /// While suppressed, reports are dropped but still yield `ErrorReported`.
    pub fn set_suppressed(&mut self, suppressed: bool) -> bool {
        std::mem::replace(&mut self.suppressed, suppressed)
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.errors()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.warnings()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_tracks_new_errors() {
        let mut reporter = ErrorReporter::new();
        let checkpoint = reporter.checkpoint();
        assert!(checkpoint.no_new_errors(&reporter));

        assert!(reporter.report_warning(None, "just a warning").is_none());
        assert!(checkpoint.no_new_errors(&reporter));

        reporter.report_error(None, "boom");
        assert!(!checkpoint.no_new_errors(&reporter));
        assert_eq!(checkpoint.new_error_count(&reporter), 1);
    }

    #[test]
    fn test_warnings_as_errors() {
        let mut reporter = ErrorReporter::new().with_warnings_as_errors(true);
        assert!(reporter.report_warning(None, "promoted").is_some());
        assert_eq!(reporter.error_count(), 1);
        assert_eq!(reporter.errors().next().unwrap().message, "promoted");
    }

    #[test]
    fn test_suppressed_reports_are_dropped() {
        let mut reporter = ErrorReporter::new();
        let previous = reporter.set_suppressed(true);
        assert!(!previous);
        reporter.report_error(None, "hidden");
        reporter.set_suppressed(previous);

        assert!(!reporter.has_errors());
        assert!(reporter.diagnostics().is_empty());
    }

    #[test]
    fn test_max_errors_caps_recorded_diagnostics() {
        let mut reporter = ErrorReporter::new().with_max_errors(2);
        for i in 0..5 {
            reporter.report_error(None, format!("error {}", i));
        }
        assert_eq!(reporter.error_count(), 5);
        assert_eq!(reporter.errors().count(), 2);
    }
}
