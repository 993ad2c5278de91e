//! Names assigned but never read. Strict level only.
//!
//! Flat like the undefined-name check: a read anywhere counts for every
//! assignment of that name. Parameters, loop variables and names starting
//! with `_` are never reported.

use std::collections::HashSet;

use crate::ast::walk::{self, Visitor};
use crate::ast::{Expr, ExprKind, Stmt, StmtKind};
use crate::config::ValidatorConfig;
use crate::diagnostic::Diagnostic;
use crate::validator::detector::{DetectError, Detector, Subject};
use crate::validator::issue::Finding;
use crate::validator::names::NameTable;

pub struct UnusedBindings;

impl Detector for UnusedBindings {
    fn name(&self) -> &'static str {
        "unused-bindings"
    }

    fn enabled(&self, config: &ValidatorConfig) -> bool {
        config.validation_level.is_strict()
    }

    fn detect(&self, subject: &Subject<'_>) -> Result<Vec<Finding>, DetectError> {
        let mut tracker = Tracker::default();
        walk::walk_module(&mut tracker, &subject.tree.module);

        Ok(tracker
            .assigned
            .into_iter()
            .filter(|(name, _)| !tracker.read.contains(name))
            .filter(|(name, _)| !NameTable::is_intentionally_unused(name))
            .map(|(name, offset)| {
                let line = subject.line_of(offset);
                Finding::warning(
                    Diagnostic::new(format!("Unused variable: {name}"))
                        .with_context(subject.context(line)),
                )
            })
            .collect())
    }
}

#[derive(Default)]
struct Tracker {
    /// First assignment of each name, in source order.
    assigned: Vec<(String, usize)>,
    assigned_names: HashSet<String>,
    read: HashSet<String>,
}

impl Tracker {
    fn assign(&mut self, target: &Expr) {
        match &target.kind {
            ExprKind::Name(name) => {
                if self.assigned_names.insert(name.clone()) {
                    self.assigned.push((name.clone(), target.span.start));
                }
            }
            ExprKind::Tuple(elts) | ExprKind::List(elts) => {
                for elt in elts {
                    self.assign(elt);
                }
            }
            ExprKind::Starred(inner) => self.assign(inner),
            _ => {}
        }
    }
}

impl<'a> Visitor<'a> for Tracker {
    fn visit_stmt(&mut self, stmt: &'a Stmt) {
        match &stmt.kind {
            StmtKind::Assign { targets, .. } => {
                for target in targets {
                    self.assign(target);
                }
            }
            StmtKind::AnnAssign {
                target,
                value: Some(_),
                ..
            } => self.assign(target),
            StmtKind::AugAssign { target, .. } => {
                if let Some(name) = target.as_name() {
                    self.read.insert(name.to_string());
                }
            }
            _ => {}
        }
        walk::walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &'a Expr) {
        match &expr.kind {
            ExprKind::Name(name) => {
                self.read.insert(name.clone());
            }
            ExprKind::Str(lit) => {
                self.read.extend(lit.holes.iter().cloned());
            }
            ExprKind::NamedExpr { target, .. } => self.assign(target),
            _ => {}
        }
        walk::walk_expr(self, expr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::build_tree;
    use codevet_types::ValidationLevel;

    fn unused(source: &str) -> Vec<String> {
        let tree = build_tree(source).unwrap();
        let config = ValidatorConfig::default();
        let subject = Subject::new(source, &tree, &config);
        UnusedBindings
            .detect(&subject)
            .unwrap()
            .into_iter()
            .map(|f| f.diagnostic.message)
            .collect()
    }

    #[test]
    fn assigned_and_never_read() {
        let source = "def f(a, b):\n    total = a + b\n    scratch = 0\n    return total\n";
        assert_eq!(unused(source), ["Unused variable: scratch"]);
    }

    #[test]
    fn parameters_are_always_used() {
        assert!(unused("def f(unused_param):\n    return 1\n").is_empty());
    }

    #[test]
    fn underscore_names_are_skipped() {
        assert!(unused("_ignored = compute()\n__all__ = ['x']\n").is_empty());
    }

    #[test]
    fn tuple_unpacking_reports_each_name_in_order() {
        assert_eq!(
            unused("first, *rest = load()\n"),
            ["Unused variable: first", "Unused variable: rest"]
        );
    }

    #[test]
    fn reads_via_augmented_assignment_and_fstrings() {
        assert!(unused("count = 0\ncount += 1\n").is_empty());
        assert!(unused("name = 'x'\nprint(f'hello {name}')\n").is_empty());
    }

    #[test]
    fn loop_variables_are_not_reported() {
        assert!(unused("for i in range(3):\n    print('tick')\n").is_empty());
    }

    #[test]
    fn strict_only() {
        let normal = ValidatorConfig::default().with_level(ValidationLevel::Normal);
        assert!(!UnusedBindings.enabled(&normal));
        assert!(UnusedBindings.enabled(&ValidatorConfig::default()));
    }
}
