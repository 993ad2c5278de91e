//! Common Python pitfalls with well-known replacements.

use std::sync::LazyLock;

use regex::Regex;

use crate::ast::{walk, ExprKind, StmtKind};
use crate::validator::detector::{DetectError, Detector, Subject};
use crate::validator::issue::Finding;

static TYPE_EQUALITY: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"type\([^)]+\)\s*==\s*"));

static NONE_EQUALITY: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"==\s*None|!=\s*None"));

pub struct BestPractices;

impl Detector for BestPractices {
    fn name(&self) -> &'static str {
        "best-practices"
    }

    fn detect(&self, subject: &Subject<'_>) -> Result<Vec<Finding>, DetectError> {
        let type_eq = TYPE_EQUALITY.as_ref().map_err(|e| DetectError::from(e.clone()))?;
        let none_eq = NONE_EQUALITY.as_ref().map_err(|e| DetectError::from(e.clone()))?;
        let source = subject.source;
        let mut findings = Vec::new();

        for stmt in walk::all_stmts(&subject.tree.module.body) {
            let StmtKind::FunctionDef(def) = &stmt.kind else {
                continue;
            };
            let mutable_defaults = def
                .params
                .iter()
                .filter_map(|param| param.default.as_ref())
                .filter(|default| {
                    matches!(default.kind, ExprKind::List(_) | ExprKind::Dict(_) | ExprKind::Set(_))
                });
            for _ in mutable_defaults {
                findings.push(Finding::suggestion(format!(
                    "Function '{}' has mutable default argument",
                    def.name
                )));
            }
        }

        if type_eq.is_match(source) {
            findings.push(Finding::suggestion(
                "Use isinstance() instead of type() == for type checking",
            ));
        }
        if source.contains("open(") && !source.contains("with") {
            findings.push(Finding::suggestion("Use 'with' statement for file operations"));
        }
        if none_eq.is_match(source) {
            findings.push(Finding::suggestion(
                "Use 'is None' or 'is not None' instead of == None",
            ));
        }

        Ok(findings)
    }
}
