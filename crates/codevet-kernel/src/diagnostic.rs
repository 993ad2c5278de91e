//! Caller-facing diagnostics.
//!
//! Detectors build a [`Diagnostic`] (message, optional position, fix-it
//! suggestions) and flatten it into the plain string a `ValidationResult`
//! carries. The same value can also be rendered as an inline report with
//! `ariadne` when a caller wants to show the offending code.

use std::fmt::Write as _;

use ariadne::{Config, IndexType, Label, Report, ReportKind, Source};
use codevet_types::DiagnosticContext;

/// One error or warning with its fix-it hints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub context: Option<DiagnosticContext>,
    pub suggestions: Vec<String>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: DiagnosticContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.add_suggestion(suggestion);
        self
    }

    /// Add a suggestion unless an identical one is already present.
    pub fn add_suggestion(&mut self, suggestion: impl Into<String>) {
        let suggestion = suggestion.into();
        if !self.suggestions.contains(&suggestion) {
            self.suggestions.push(suggestion);
        }
    }

    pub fn line(&self) -> Option<usize> {
        self.context.as_ref().map(|ctx| ctx.line_number)
    }

    /// Flatten to a single string.
    ///
    /// With `include_context`, the position and the surrounding source
    /// window are included, the offending line marked with `>`.
    pub fn format(&self, include_context: bool) -> String {
        let mut out = self.message.clone();

        if let (true, Some(ctx)) = (include_context, &self.context) {
            match ctx.column_number {
                Some(col) => {
                    let _ = write!(out, "\n  at line {}, column {}", ctx.line_number, col);
                }
                None => {
                    let _ = write!(out, "\n  at line {}", ctx.line_number);
                }
            }
            for (number, text) in ctx.numbered_lines() {
                let marker = if number == ctx.line_number { '>' } else { ' ' };
                let _ = write!(out, "\n  {} {:>4} | {}", marker, number, text);
            }
        }

        if !self.suggestions.is_empty() {
            out.push_str("\n  Suggestions:");
            for suggestion in &self.suggestions {
                let _ = write!(out, "\n    - {}", suggestion);
            }
        }

        out
    }

    /// Draw an inline report against `source`, without colour.
    ///
    /// Falls back to [`format`](Self::format) when the diagnostic has no
    /// position inside `source`.
    pub fn render(&self, source: &str) -> String {
        let Some(span) = self.span_in(source) else {
            return self.format(true);
        };

        let label_message = self
            .suggestions
            .first()
            .cloned()
            .unwrap_or_else(|| "here".to_string());

        let mut report = Report::build(ReportKind::Error, span.clone())
            .with_config(
                Config::default()
                    .with_color(false)
                    .with_index_type(IndexType::Byte),
            )
            .with_message(&self.message)
            .with_label(Label::new(span).with_message(label_message));
        for note in self.suggestions.iter().skip(1) {
            report = report.with_note(note);
        }

        let mut buf = Vec::new();
        if report.finish().write(Source::from(source), &mut buf).is_err() {
            return self.format(true);
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    // Byte range from the context column to the end of its line.
    fn span_in(&self, source: &str) -> Option<std::ops::Range<usize>> {
        let ctx = self.context.as_ref()?;
        let line_start = source
            .split_inclusive('\n')
            .take(ctx.line_number.checked_sub(1)?)
            .map(str::len)
            .sum::<usize>();
        let line = source.get(line_start..)?.lines().next()?;
        if line.is_empty() {
            return None;
        }
        let column = ctx.column_number.unwrap_or(1).max(1);
        let start = line
            .char_indices()
            .nth(column - 1)
            .or_else(|| line.char_indices().last())
            .map_or(0, |(i, _)| i);
        Some(line_start + start..line_start + line.len())
    }
}

impl From<Diagnostic> for String {
    fn from(diagnostic: Diagnostic) -> Self {
        diagnostic.format(false)
    }
}
