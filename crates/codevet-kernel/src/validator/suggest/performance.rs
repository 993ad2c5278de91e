//! Idioms that are slower than they need to be.

use std::sync::LazyLock;

use regex::Regex;

use crate::ast::walk::{self, Visitor};
use crate::ast::{Expr, ExprKind, Stmt, StmtKind};
use crate::validator::detector::{DetectError, Detector, Subject};
use crate::validator::issue::Finding;

static STRING_CONCAT_IN_LOOP: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r#"for.*:\s*\n.*\+=\s*["']"#));

pub struct PerformanceIdioms;

impl Detector for PerformanceIdioms {
    fn name(&self) -> &'static str {
        "performance"
    }

    fn detect(&self, subject: &Subject<'_>) -> Result<Vec<Finding>, DetectError> {
        let concat = STRING_CONCAT_IN_LOOP
            .as_ref()
            .map_err(|e| DetectError::from(e.clone()))?;

        let mut checker = LoopChecker::default();
        walk::walk_module(&mut checker, &subject.tree.module);

        let mut findings = Vec::new();
        for _ in 0..checker.range_len {
            findings.push(Finding::suggestion("Use enumerate() instead of range(len())"));
        }
        for (list, count) in &checker.appends {
            if *count >= 2 {
                findings.push(Finding::suggestion(format!(
                    "Consider using list comprehension instead of repeated append() for '{list}'"
                )));
            }
        }
        if concat.is_match(subject.source) {
            findings.push(Finding::suggestion("Use join() for string concatenation in loops"));
        }
        Ok(findings)
    }
}

#[derive(Default)]
struct LoopChecker {
    loop_depth: usize,
    range_len: usize,
    /// `name.append(...)` calls inside loops, per receiver, first-seen order.
    appends: Vec<(String, usize)>,
}

impl LoopChecker {
    fn count_append(&mut self, list: &str) {
        match self.appends.iter_mut().find(|(name, _)| name == list) {
            Some((_, count)) => *count += 1,
            None => self.appends.push((list.to_string(), 1)),
        }
    }
}

fn is_range_len(iter: &Expr) -> bool {
    let ExprKind::Call { func, args, .. } = &iter.kind else {
        return false;
    };
    if func.as_name() != Some("range") {
        return false;
    }
    match args.first().map(|arg| &arg.kind) {
        Some(ExprKind::Call { func, .. }) => func.as_name() == Some("len"),
        _ => false,
    }
}

impl<'a> Visitor<'a> for LoopChecker {
    fn visit_stmt(&mut self, stmt: &'a Stmt) {
        match &stmt.kind {
            StmtKind::For { iter, .. } | StmtKind::While { test: iter, .. } => {
                if matches!(stmt.kind, StmtKind::For { .. }) && is_range_len(iter) {
                    self.range_len += 1;
                }
                self.loop_depth += 1;
                walk::walk_stmt(self, stmt);
                self.loop_depth -= 1;
            }
            _ => walk::walk_stmt(self, stmt),
        }
    }

    fn visit_expr(&mut self, expr: &'a Expr) {
        if let ExprKind::Call { func, .. } = &expr.kind {
            if let ExprKind::Attribute { value, attr } = &func.kind {
                if attr == "append" && self.loop_depth > 0 {
                    if let Some(list) = value.as_name() {
                        self.count_append(list);
                    }
                }
            }
        }
        walk::walk_expr(self, expr);
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
        PerformanceIdioms
            .detect(&subject)
            .unwrap()
            .iter()
            .map(Finding::text)
            .collect()
    }

    #[test]
    fn range_len() {
        let source = "for i in range(len(items)):\n    print(items[i])\n";
        assert_eq!(check(source), ["Use enumerate() instead of range(len())"]);
    }

    #[test]
    fn repeated_append_in_loops() {
        let source = "\
out = []
for x in xs:
    out.append(x)
while more():
    out.append(0)
seen.append(1)
";
        assert_eq!(
            check(source),
            ["Consider using list comprehension instead of repeated append() for 'out'"]
        );
    }

    #[test]
    fn single_append_is_fine() {
        assert!(check("for x in xs:\n    out.append(x)\n").is_empty());
    }

    #[test]
    fn string_concat_in_loop() {
        let source = "for word in words:\n    text += ' '\n";
        assert_eq!(check(source), ["Use join() for string concatenation in loops"]);
    }
}
