//! `while True` loops with no way out.

use crate::ast::{walk, Stmt, StmtKind};
use crate::diagnostic::Diagnostic;
use crate::validator::detector::{DetectError, Detector, Subject};
use crate::validator::issue::Finding;

pub struct InfiniteLoops;

impl Detector for InfiniteLoops {
    fn name(&self) -> &'static str {
        "infinite-loops"
    }

    fn detect(&self, subject: &Subject<'_>) -> Result<Vec<Finding>, DetectError> {
        let mut findings = Vec::new();
        for stmt in walk::all_stmts(&subject.tree.module.body) {
            let StmtKind::While { test, body, .. } = &stmt.kind else {
                continue;
            };
            if !test.is_always_true() || has_exit(body, true) {
                continue;
            }
            let line = subject.line_of(stmt.span.start);
            findings.push(Finding::warning(
                Diagnostic::new(format!(
                    "Potential infinite loop detected: while True without break statement (line {line})"
                ))
                .with_context(subject.context(line)),
            ));
        }
        Ok(findings)
    }
}

/// Whether `block` can leave the loop it belongs to.
///
/// `own_loop` is false inside a nested loop, where `break` only ends the
/// inner one. `return` and `raise` leave every loop.
fn has_exit(block: &[Stmt], own_loop: bool) -> bool {
    block.iter().any(|stmt| match &stmt.kind {
        StmtKind::Break => own_loop,
        StmtKind::Return(_) | StmtKind::Raise { .. } => true,
        StmtKind::FunctionDef(_) | StmtKind::ClassDef(_) => false,
        StmtKind::While { body, orelse, .. } | StmtKind::For { body, orelse, .. } => {
            has_exit(body, false) || has_exit(orelse, own_loop)
        }
        _ => stmt.blocks().into_iter().any(|nested| has_exit(nested, own_loop)),
    })
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
        InfiniteLoops
            .detect(&subject)
            .unwrap()
            .into_iter()
            .map(|f| f.diagnostic.message)
            .collect()
    }

    #[test]
    fn while_true_pass() {
        assert_eq!(
            check("while True: pass\n"),
            ["Potential infinite loop detected: while True without break statement (line 1)"]
        );
    }

    #[test]
    fn while_one_counts_as_true() {
        assert_eq!(check("x = 0\nwhile 1:\n    x += 1\n").len(), 1);
    }

    #[test]
    fn conditional_break_is_an_exit() {
        assert!(check("while True:\n    if done():\n        break\n").is_empty());
    }

    #[test]
    fn return_and_raise_are_exits() {
        assert!(check("def f():\n    while True:\n        return 1\n").is_empty());
        assert!(check("while True:\n    raise StopIteration\n").is_empty());
    }

    #[test]
    fn break_in_inner_loop_does_not_count() {
        let source = "while True:\n    for x in items:\n        break\n";
        assert_eq!(check(source).len(), 1);
    }

    #[test]
    fn ordinary_condition_is_fine() {
        assert!(check("while n > 0:\n    n -= 1\n").is_empty());
    }

    #[test]
    fn nested_function_break_is_ignored() {
        let source = "while True:\n    def cb():\n        return 1\n    cb()\n";
        assert_eq!(check(source).len(), 1);
    }
}
