//! Indentation consistency against the configured indent size.
//!
//! Works on logical lines, so continuation lines inside brackets or
//! triple-quoted strings and trailing comments never confuse it.

use crate::diagnostic::Diagnostic;
use crate::validator::detector::{DetectError, Detector, Subject};
use crate::validator::issue::Finding;

pub struct IndentationCheck;

impl Detector for IndentationCheck {
    fn name(&self) -> &'static str {
        "indentation"
    }

    fn detect(&self, subject: &Subject<'_>) -> Result<Vec<Finding>, DetectError> {
        let size = subject.config.indent_size;
        let mut findings = Vec::new();
        let mut stack = vec![0usize];

        for logical in &subject.tree.logical_lines {
            let indent = logical.indent.chars().count();
            let line = logical.line;

            if logical.indent.contains('\t') && logical.indent.contains(' ') {
                findings.push(Finding::error(
                    Diagnostic::new("Mixed tabs and spaces in indentation")
                        .with_context(subject.context(line))
                        .with_suggestion("Use only spaces for indentation (PEP 8 recommendation)")
                        .with_suggestion("Configure your editor to convert tabs to spaces"),
                ));
            }

            if let Some(finding) = check_level(subject, &mut stack, indent, line) {
                findings.push(finding);
            }
            if logical.opens_block {
                stack.push(indent + size);
            }
        }

        Ok(findings)
    }
}

// Match `indent` against the stack of expected levels. A dedent always
// pops the levels it closes, so stale deeper levels never match later.
fn check_level(
    subject: &Subject<'_>,
    stack: &mut Vec<usize>,
    indent: usize,
    line: usize,
) -> Option<Finding> {
    let size = subject.config.indent_size;
    let top = stack.last().copied().unwrap_or(0);
    if indent == top {
        return None;
    }
    if indent > top {
        return Some(Finding::error(
            Diagnostic::new("Unexpected indentation level")
                .with_context(subject.context(line))
                .with_suggestion("Ensure proper nesting of code blocks")
                .with_suggestion("Check for missing or extra colons"),
        ));
    }
    while stack.last().is_some_and(|&level| indent < level) {
        stack.pop();
    }
    if stack.last() == Some(&indent) {
        return None;
    }
    Some(Finding::error(
        Diagnostic::new("Inconsistent indentation")
            .with_context(subject.context(line))
            .with_suggestion(format!("Use {size} spaces per indentation level"))
            .with_suggestion("Check that dedent aligns with a previous indentation level"),
    ))
}
