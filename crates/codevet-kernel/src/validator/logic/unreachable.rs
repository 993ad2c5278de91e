//! Statements that follow a `return`, `raise`, `break` or `continue` in
//! the same block of a function body.

use crate::ast::{walk, Stmt, StmtKind};
use crate::diagnostic::Diagnostic;
use crate::validator::detector::{DetectError, Detector, Subject};
use crate::validator::issue::Finding;

pub struct UnreachableCode;

impl Detector for UnreachableCode {
    fn name(&self) -> &'static str {
        "unreachable-code"
    }

    fn detect(&self, subject: &Subject<'_>) -> Result<Vec<Finding>, DetectError> {
        let mut findings = Vec::new();
        for stmt in walk::all_stmts(&subject.tree.module.body) {
            if let StmtKind::FunctionDef(def) = &stmt.kind {
                scan_block(subject, &def.name, &def.body, &mut findings);
            }
        }
        Ok(findings)
    }
}

fn scan_block(subject: &Subject<'_>, func: &str, block: &[Stmt], findings: &mut Vec<Finding>) {
    let mut terminal: Option<&'static str> = None;
    for stmt in block {
        if let Some(keyword) = terminal {
            let line = subject.line_of(stmt.span.start);
            findings.push(Finding::warning(
                Diagnostic::new(format!(
                    "Unreachable code detected: statement after {keyword} in '{func}' (line {line})"
                ))
                .with_context(subject.context(line)),
            ));
            continue;
        }

        // Nested definitions get their own pass from `detect`.
        if !matches!(stmt.kind, StmtKind::FunctionDef(_) | StmtKind::ClassDef(_)) {
            for nested in stmt.blocks() {
                scan_block(subject, func, nested, findings);
            }
        }

        if stmt.is_terminal() {
            terminal = Some(stmt.keyword());
        }
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
        UnreachableCode
            .detect(&subject)
            .unwrap()
            .into_iter()
            .map(|f| f.diagnostic.message)
            .collect()
    }

    #[test]
    fn statement_after_return() {
        let source = "def f(x, y):\n    return x\n    print(y)\n";
        assert_eq!(
            check(source),
            ["Unreachable code detected: statement after return in 'f' (line 3)"]
        );
    }

    #[test]
    fn every_following_statement_is_reported() {
        let source = "def f():\n    raise ValueError()\n    a = 1\n    b = 2\n";
        assert_eq!(check(source).len(), 2);
    }

    #[test]
    fn nested_blocks_are_scanned_independently() {
        let source = "\
def f(items):
    for item in items:
        if item:
            continue
            print(item)
    try:
        return 1
    except ValueError:
        return 2
    return 3
";
        assert_eq!(
            check(source),
            ["Unreachable code detected: statement after continue in 'f' (line 5)"]
        );
    }

    #[test]
    fn return_inside_branch_does_not_end_outer_block() {
        let source = "def f(x):\n    if x:\n        return 1\n    return 2\n";
        assert!(check(source).is_empty());
    }

    #[test]
    fn methods_and_nested_functions() {
        let source = "\
class A:
    def m(self):
        def inner():
            return 1
            inner_dead = 1
        return inner
        outer_dead = 2
";
        assert_eq!(
            check(source),
            [
                "Unreachable code detected: statement after return in 'm' (line 7)",
                "Unreachable code detected: statement after return in 'inner' (line 5)",
            ]
        );
    }

    #[test]
    fn module_level_is_ignored() {
        assert!(check("raise SystemExit\nprint('never')\n").is_empty());
    }
}
