//! Functions annotated to return a value that never return one.

use crate::ast::walk::{self, Visitor};
use crate::ast::{Constant, Expr, ExprKind, FunctionDef, Stmt, StmtKind};
use crate::diagnostic::Diagnostic;
use crate::validator::detector::{DetectError, Detector, Subject};
use crate::validator::issue::Finding;

pub struct MissingReturns;

impl Detector for MissingReturns {
    fn name(&self) -> &'static str {
        "missing-returns"
    }

    fn detect(&self, subject: &Subject<'_>) -> Result<Vec<Finding>, DetectError> {
        let mut findings = Vec::new();
        for stmt in walk::all_stmts(&subject.tree.module.body) {
            let StmtKind::FunctionDef(def) = &stmt.kind else {
                continue;
            };
            if def.name == "__init__" || !declares_value(def) || is_stub(&def.body) {
                continue;
            }
            if returns_value(&def.body) || yields(&def.body) {
                continue;
            }
            let line = subject.line_of(stmt.span.start);
            findings.push(Finding::warning(
                Diagnostic::new(format!(
                    "Function '{}' may be missing return statement",
                    def.name
                ))
                .with_context(subject.context(line)),
            ));
        }
        Ok(findings)
    }
}

// `-> None`, `-> NoReturn` and `-> Never` promise no value.
fn declares_value(def: &FunctionDef) -> bool {
    let Some(returns) = &def.returns else {
        return false;
    };
    match &returns.kind {
        ExprKind::Constant(Constant::None) => false,
        _ => !matches!(
            returns.dotted_name().as_deref(),
            Some("NoReturn" | "Never" | "typing.NoReturn" | "typing.Never")
        ),
    }
}

// A body of only a docstring and/or `...` is an interface stub.
fn is_stub(body: &[Stmt]) -> bool {
    body.iter().all(|stmt| match &stmt.kind {
        StmtKind::Expr(expr) => matches!(
            expr.kind,
            ExprKind::Constant(Constant::Ellipsis) | ExprKind::Str(_)
        ),
        _ => false,
    })
}

// Searches nested blocks but not nested definitions.
fn returns_value(body: &[Stmt]) -> bool {
    body.iter().any(|stmt| match &stmt.kind {
        StmtKind::Return(Some(_)) => true,
        StmtKind::FunctionDef(_) | StmtKind::ClassDef(_) => false,
        _ => stmt.blocks().into_iter().any(returns_value),
    })
}

// A `yield` in the body itself makes a generator; nested definitions don't.
fn yields(body: &[Stmt]) -> bool {
    struct Yields(bool);

    impl<'a> Visitor<'a> for Yields {
        fn visit_stmt(&mut self, stmt: &'a Stmt) {
            if !matches!(stmt.kind, StmtKind::FunctionDef(_) | StmtKind::ClassDef(_)) {
                walk::walk_stmt(self, stmt);
            }
        }

        fn visit_expr(&mut self, expr: &'a Expr) {
            if matches!(expr.kind, ExprKind::Yield(_) | ExprKind::YieldFrom(_)) {
                self.0 = true;
            }
            walk::walk_expr(self, expr);
        }
    }

    let mut finder = Yields(false);
    walk::walk_body(&mut finder, body);
    finder.0
}
