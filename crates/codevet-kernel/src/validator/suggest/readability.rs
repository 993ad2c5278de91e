//! Docstrings, dense expressions and unnamed constants.

use std::sync::LazyLock;

use regex::Regex;

use crate::ast::{walk, ExprKind, Stmt, StmtKind};
use crate::validator::detector::{DetectError, Detector, Subject};
use crate::validator::issue::Finding;

/// Functions shorter than this many statements don't need a docstring.
const UNDOCUMENTED_FUNCTION_LIMIT: usize = 5;

/// More operands than this in one `and`/`or` chain is hard to read.
const BOOL_CHAIN_LIMIT: usize = 3;

static MAGIC_NUMBER: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"\b\d{2,}\b"));

static NAMED_CONSTANT: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*\w+\s*=\s*\d+"));

pub struct Readability;

impl Detector for Readability {
    fn name(&self) -> &'static str {
        "readability"
    }

    fn detect(&self, subject: &Subject<'_>) -> Result<Vec<Finding>, DetectError> {
        let magic = MAGIC_NUMBER.as_ref().map_err(|e| DetectError::from(e.clone()))?;
        let constant = NAMED_CONSTANT.as_ref().map_err(|e| DetectError::from(e.clone()))?;
        let body = &subject.tree.module.body;
        let mut findings = Vec::new();

        for stmt in walk::all_stmts(body) {
            match &stmt.kind {
                StmtKind::FunctionDef(def)
                    if !has_docstring(&def.body) && def.body.len() > UNDOCUMENTED_FUNCTION_LIMIT =>
                {
                    findings.push(Finding::suggestion(format!(
                        "Function '{}' is missing a docstring",
                        def.name
                    )));
                }
                StmtKind::ClassDef(def) if !has_docstring(&def.body) => {
                    findings.push(Finding::suggestion(format!(
                        "Class '{}' is missing a docstring",
                        def.name
                    )));
                }
                _ => {}
            }
        }

        for expr in walk::all_exprs(body) {
            match &expr.kind {
                ExprKind::BoolOp { values, .. } if values.len() > BOOL_CHAIN_LIMIT => {
                    findings.push(Finding::suggestion(
                        "Consider breaking down complex boolean expressions",
                    ));
                }
                ExprKind::Lambda { .. } => {
                    findings.push(Finding::suggestion(
                        "Consider using a named function instead of lambda for clarity",
                    ));
                }
                _ => {}
            }
        }

        if magic.is_match(subject.source) && !constant.is_match(subject.source) {
            findings.push(Finding::suggestion("Consider defining constants for magic numbers"));
        }

        Ok(findings)
    }
}

fn has_docstring(body: &[Stmt]) -> bool {
    match body.first().map(|stmt| &stmt.kind) {
        Some(StmtKind::Expr(expr)) => {
            matches!(&expr.kind, ExprKind::Str(lit) if !lit.is_bytes && !lit.is_fstring)
        }
        _ => false,
    }
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
        Readability
            .detect(&subject)
            .unwrap()
            .iter()
            .map(Finding::text)
            .collect()
    }

    #[test]
    fn long_function_without_docstring() {
        let source = "def busy():\n    a = 1\n    b = 2\n    c = 3\n    d = 4\n    e = 5\n    return a\n";
        assert_eq!(check(source), ["Function 'busy' is missing a docstring"]);
    }

    #[test]
    fn short_functions_and_documented_classes() {
        let source = "class Point:\n    \"\"\"A point.\"\"\"\n\n    def norm(self):\n        return 0\n";
        assert!(check(source).is_empty());
    }

    #[test]
    fn class_without_docstring() {
        assert_eq!(
            check("class Empty:\n    pass\n"),
            ["Class 'Empty' is missing a docstring"]
        );
    }

    #[test]
    fn dense_expressions() {
        let source = "ok = a and b and c and d\nkey = lambda item: item\n";
        assert_eq!(
            check(source),
            [
                "Consider breaking down complex boolean expressions",
                "Consider using a named function instead of lambda for clarity",
            ]
        );
    }

    #[test]
    fn magic_numbers() {
        assert_eq!(
            check("print(total * 365)\n"),
            ["Consider defining constants for magic numbers"]
        );
        assert!(check("DAYS = 365\nprint(total * DAYS)\n").is_empty());
    }
}
