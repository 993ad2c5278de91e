//! Findings produced by detectors.

use codevet_types::ValidationResult;

use crate::diagnostic::Diagnostic;

/// How a finding lands in the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Blocking: goes to `errors` and makes the result invalid.
    Error,
    /// Advisory: goes to `warnings`.
    Warning,
    /// Goes to the suggestion list.
    Suggestion,
}

/// A single detector finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub severity: Severity,
    pub diagnostic: Diagnostic,
    /// Include the source window when flattening to text.
    pub show_context: bool,
}

impl Finding {
    pub fn error(diagnostic: Diagnostic) -> Self {
        Self {
            severity: Severity::Error,
            diagnostic,
            show_context: false,
        }
    }

    pub fn warning(diagnostic: Diagnostic) -> Self {
        Self {
            severity: Severity::Warning,
            diagnostic,
            show_context: false,
        }
    }

    pub fn suggestion(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Suggestion,
            diagnostic: Diagnostic::new(text),
            show_context: false,
        }
    }

    /// Flatten with the source window included.
    pub fn with_shown_context(mut self) -> Self {
        self.show_context = true;
        self
    }

    pub fn text(&self) -> String {
        self.diagnostic.format(self.show_context)
    }

    /// Append this finding to `result` under its severity.
    pub fn record(self, result: &mut ValidationResult) {
        let text = self.text();
        match self.severity {
            Severity::Error => match self.diagnostic.context {
                Some(context) => result.add_error_with_context(text, context),
                None => result.add_error(text, None),
            },
            Severity::Warning => result.add_warning(text),
            Severity::Suggestion => result.add_suggestion(text),
        }
    }
}
