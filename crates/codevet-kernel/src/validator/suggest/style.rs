//! Naming conventions and spacing.

use std::sync::LazyLock;

use regex::Regex;

use crate::ast::{walk, StmtKind};
use crate::validator::detector::{DetectError, Detector, Subject};
use crate::validator::issue::Finding;

static CRAMPED_OPERATOR: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"\w[+\-*/=<>]\w"));

pub struct StyleConventions;

impl Detector for StyleConventions {
    fn name(&self) -> &'static str {
        "style"
    }

    fn detect(&self, subject: &Subject<'_>) -> Result<Vec<Finding>, DetectError> {
        let cramped = CRAMPED_OPERATOR.as_ref().map_err(|e| DetectError::from(e.clone()))?;

        // (line, message); sorted by line at the end so naming and spacing
        // hints interleave in source order.
        let mut found: Vec<(usize, String)> = Vec::new();

        for stmt in walk::all_stmts(&subject.tree.module.body) {
            let line = subject.line_of(stmt.span.start);
            match &stmt.kind {
                StmtKind::FunctionDef(def) if def.name != "__init__" && !is_snake_case(&def.name) => {
                    found.push((
                        line,
                        format!("Function '{}' should use lowercase_with_underscores", def.name),
                    ));
                }
                StmtKind::ClassDef(def) if !is_cap_words(&def.name) => {
                    found.push((line, format!("Class '{}' should use CapWords convention", def.name)));
                }
                _ => {}
            }
        }

        for (idx, text) in subject.source.lines().enumerate() {
            let line = idx + 1;
            if text.contains(',') && !comma_followed_by_space(text) {
                found.push((line, format!("Line {line}: Add space after comma")));
            }
            if cramped.is_match(text) {
                found.push((line, format!("Line {line}: Add spaces around operators")));
            }
        }

        found.sort_by_key(|(line, _)| *line);
        Ok(found.into_iter().map(|(_, text)| Finding::suggestion(text)).collect())
    }
}

fn is_snake_case(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn is_cap_words(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_uppercase()) && chars.all(|c| c.is_ascii_alphanumeric())
}

fn comma_followed_by_space(text: &str) -> bool {
    text.match_indices(',')
        .any(|(idx, _)| text[idx + 1..].starts_with(char::is_whitespace))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidatorConfig;
    use crate::tree::build_tree;

    fn check(source: &str) -> Vec<String> {
        let tree = build_tree(source).unwrap();
        let config = ValidatorConfig::default();
        let subject = Subject::new(source, &tree, &config);
        StyleConventions
            .detect(&subject)
            .unwrap()
            .iter()
            .map(Finding::text)
            .collect()
    }

    #[test]
    fn naming_conventions() {
        let source = "class my_thing:\n    def DoWork(self):\n        return 1\n\n    def __init__(self):\n        pass\n";
        assert_eq!(
            check(source),
            [
                "Class 'my_thing' should use CapWords convention",
                "Function 'DoWork' should use lowercase_with_underscores",
            ]
        );
    }

    #[test]
    fn spacing_hints_carry_line_numbers() {
        let source = "total = 1\nitems = [1,2]\nx=y\n";
        assert_eq!(
            check(source),
            ["Line 2: Add space after comma", "Line 3: Add spaces around operators"]
        );
    }

    #[test]
    fn clean_code_has_no_hints() {
        assert!(check("def add_two(a, b):\n    return a + b\n").is_empty());
    }

    #[rstest::rstest]
    #[case("snake_case", true)]
    #[case("_private", true)]
    #[case("with2digits", true)]
    #[case("camelCase", false)]
    #[case("Upper", false)]
    fn snake_case(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_snake_case(name), expected);
    }
}
