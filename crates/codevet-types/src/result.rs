//! ValidationResult: the verdict of one validation pass.
//!
//! The record is append-only while a pass runs. `is_valid` is derived: it
//! starts out true and flips to false the moment the first error lands, and
//! nothing can flip it back.

use serde::Serialize;

use crate::DiagnosticContext;

/// Outcome of `validate_syntax` or `validate_logic`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    is_valid: bool,
    errors: Vec<String>,
    warnings: Vec<String>,
    /// Lines of recorded errors, in the order the errors were added.
    /// Shorter than `errors` when some errors have no known line.
    line_numbers: Vec<usize>,
    suggestions: Vec<String>,
    /// Rich positional context for errors that have one.
    contexts: Vec<DiagnosticContext>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationResult {
    /// An empty, valid result.
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            line_numbers: Vec::new(),
            suggestions: Vec::new(),
            contexts: Vec::new(),
        }
    }

    /// True iff no error has been recorded.
    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn line_numbers(&self) -> &[usize] {
        &self.line_numbers
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn contexts(&self) -> &[DiagnosticContext] {
        &self.contexts
    }

    /// Record a blocking diagnostic. Marks the result invalid.
    pub fn add_error(&mut self, error: impl Into<String>, line_number: Option<usize>) {
        self.errors.push(error.into());
        if let Some(line) = line_number {
            self.line_numbers.push(line);
        }
        self.is_valid = false;
    }

    /// Record a blocking diagnostic together with its positional context.
    pub fn add_error_with_context(&mut self, error: impl Into<String>, context: DiagnosticContext) {
        self.add_error(error, Some(context.line_number));
        self.contexts.push(context);
    }

    /// Record an advisory diagnostic. Never affects validity.
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Record an improvement suggestion. Never affects validity.
    pub fn add_suggestion(&mut self, suggestion: impl Into<String>) {
        self.suggestions.push(suggestion.into());
    }

    /// Serialize to a JSON value for callers that ship results over a wire.
    pub fn to_json(&self) -> serde_json::Value {
        // Serialization of plain strings and integers cannot fail.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
