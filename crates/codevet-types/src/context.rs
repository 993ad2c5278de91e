//! Positional context attached to a diagnostic.
//!
//! Purely presentational: the validator fills it in so a caller can draw an
//! inline error view, but nothing in the validation pipeline branches on it.

use serde::{Deserialize, Serialize};

/// Where a diagnostic points in the candidate source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticContext {
    /// 1-based line number.
    pub line_number: usize,
    /// 1-based column, when known.
    pub column_number: Option<usize>,
    /// The offending source line, if the line exists.
    pub code_snippet: Option<String>,
    /// A window of lines around the offending one (inclusive).
    pub surrounding_lines: Vec<String>,
    /// Line number of the first entry in `surrounding_lines`.
    pub first_surrounding_line: usize,
}

impl DiagnosticContext {
    /// Lines shown before and after the offending line by default.
    pub const DEFAULT_WINDOW: usize = 2;

    /// Build a context for `line` (1-based) of `source`.
    ///
    /// Out-of-range lines produce a context with no snippet and an empty
    /// window rather than an error.
    pub fn from_source(source: &str, line: usize, column: Option<usize>, window: usize) -> Self {
        let lines: Vec<&str> = source.lines().collect();
        let code_snippet = line
            .checked_sub(1)
            .and_then(|idx| lines.get(idx))
            .map(|s| s.to_string());

        let (first, surrounding_lines) = if line == 0 || line > lines.len() {
            (line, Vec::new())
        } else {
            let start = line.saturating_sub(1).saturating_sub(window);
            let end = (line + window).min(lines.len());
            (
                start + 1,
                lines[start..end].iter().map(|s| s.to_string()).collect(),
            )
        };

        Self {
            line_number: line,
            column_number: column,
            code_snippet,
            surrounding_lines,
            first_surrounding_line: first,
        }
    }

    /// Iterate the surrounding window as `(line_number, text)` pairs.
    pub fn numbered_lines(&self) -> impl Iterator<Item = (usize, &str)> {
        self.surrounding_lines
            .iter()
            .enumerate()
            .map(move |(i, s)| (self.first_surrounding_line + i, s.as_str()))
    }
}
