//! The syntax pass.
//!
//! Parse failure is fatal and reported alone. Once a tree exists the
//! detectors below run in order, each adding what it finds:
//!
//! 1. indentation consistency
//! 2. undefined names (`check_undefined_vars`)
//! 3. import hygiene (`check_imports`)
//! 4. common issues (`strict` and `normal` only)
//! 5. unsafe operations (unless `allow_unsafe_operations`)
//! 6. character-level rescan

mod imports;
mod indentation;
mod patterns;
mod tokens;
mod undefined;

pub use imports::ImportHygiene;
pub use indentation::IndentationCheck;
pub use patterns::{CommonIssues, UnsafeOperations};
pub use tokens::TokenScan;
pub use undefined::UndefinedNames;

use codevet_types::DiagnosticContext;

use super::detector::Detector;
use super::issue::Finding;
use crate::diagnostic::Diagnostic;
use crate::tree::SyntaxFailure;

/// The syntax-pass detectors, in run order.
pub fn detectors() -> Vec<Box<dyn Detector>> {
    vec![
        Box::new(IndentationCheck),
        Box::new(UndefinedNames),
        Box::new(ImportHygiene),
        Box::new(CommonIssues),
        Box::new(UnsafeOperations),
        Box::new(TokenScan),
    ]
}

/// The single error reported for source that does not parse.
pub fn failure_finding(source: &str, failure: &SyntaxFailure, window: usize) -> Finding {
    let context = DiagnosticContext::from_source(source, failure.line, Some(failure.column), window);
    let mut diag =
        Diagnostic::new(format!("Syntax error: {}", failure.message)).with_context(context);

    let msg = failure.message.to_lowercase();
    if is_structural(&msg) {
        diag.add_suggestion(suggest_fix(source, failure.line));
    }
    if msg.contains("unexpected indent") || msg.contains("unindent does not match") {
        diag.add_suggestion("Check indentation consistency");
        diag.add_suggestion("Ensure all blocks are properly aligned");
    }
    if msg.contains("expected an indented block") {
        diag.add_suggestion("Add indented code after the colon (:)");
        diag.add_suggestion("Use 'pass' if the block should be empty");
    }

    Finding::error(diag).with_shown_context()
}

// Messages where a look at the offending line can guess the fix.
fn is_structural(msg: &str) -> bool {
    ["invalid syntax", "never closed", "unmatched", "does not match opening", "unterminated"]
        .iter()
        .any(|needle| msg.contains(needle))
}

const BLOCK_KEYWORDS: &[&str] = &["if", "elif", "else", "for", "while", "def", "class", "try", "except", "with"];

fn suggest_fix(source: &str, line: usize) -> &'static str {
    let Some(text) = line.checked_sub(1).and_then(|idx| source.lines().nth(idx)) else {
        return "Check for missing colons, parentheses, or quotes";
    };

    let code = text.split('#').next().unwrap_or(text);
    let starts_block = code
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .any(|word| BLOCK_KEYWORDS.contains(&word));
    let unbalanced = |open: char, close: char| {
        code.matches(open).count() != code.matches(close).count()
    };

    if starts_block && !code.contains(':') {
        "Missing colon (:) at end of statement"
    } else if unbalanced('(', ')') {
        "Mismatched parentheses"
    } else if unbalanced('[', ']') {
        "Mismatched square brackets"
    } else if unbalanced('{', '}') {
        "Mismatched curly braces"
    } else if code.matches('"').count() % 2 != 0 || code.matches('\'').count() % 2 != 0 {
        "Unclosed string literal"
    } else {
        "Check for missing colons, parentheses, or quotes"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::build_tree;

    fn failure(source: &str) -> Finding {
        let failure = build_tree(source).unwrap_err();
        failure_finding(source, &failure, 2)
    }

    #[test]
    fn missing_colon() {
        let finding = failure("def greet(name)\n    print(name)\n");
        assert!(finding.diagnostic.message.starts_with("Syntax error: "));
        assert_eq!(finding.diagnostic.suggestions, ["Missing colon (:) at end of statement"]);
        assert_eq!(finding.diagnostic.line(), Some(1));
    }

    #[test]
    fn unclosed_paren() {
        let finding = failure("total = (1 + 2\n");
        assert_eq!(finding.diagnostic.suggestions, ["Mismatched parentheses"]);
    }

    #[test]
    fn unclosed_bracket() {
        let finding = failure("items = [1, 2\n");
        assert_eq!(finding.diagnostic.suggestions, ["Mismatched square brackets"]);
    }

    #[test]
    fn unterminated_string() {
        let finding = failure("name = 'bob\n");
        assert_eq!(finding.diagnostic.suggestions, ["Unclosed string literal"]);
    }

    #[test]
    fn unexpected_indent() {
        let finding = failure("x = 1\n    y = 2\n");
        assert_eq!(
            finding.diagnostic.suggestions,
            ["Check indentation consistency", "Ensure all blocks are properly aligned"]
        );
    }

    #[test]
    fn empty_block() {
        let finding = failure("if x:\nprint(x)\n");
        assert_eq!(
            finding.diagnostic.suggestions,
            [
                "Add indented code after the colon (:)",
                "Use 'pass' if the block should be empty"
            ]
        );
    }

    #[test]
    fn text_shows_context() {
        let text = failure("x = = 1\n").text();
        assert!(text.starts_with("Syntax error: invalid syntax"));
        assert!(text.contains("x = = 1"));
        assert!(text.contains("Check for missing colons, parentheses, or quotes"));
    }

    #[test]
    fn detector_order() {
        let names: Vec<_> = detectors().iter().map(|d| d.name()).collect();
        assert_eq!(
            names,
            [
                "indentation",
                "undefined-names",
                "imports",
                "common-issues",
                "unsafe-operations",
                "tokenization"
            ]
        );
    }
}
