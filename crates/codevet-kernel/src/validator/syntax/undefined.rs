//! Names read before anything binds them.
//!
//! One forward walk over a flat [`NameTable`]. Module-level imports and
//! `def`/`class` names are bound up front, and function bodies are walked
//! after the code that encloses them, since a body only runs once called.
//! Annotations and `type` alias values are never checked (they are often
//! forward references), nor are class names and values inside `case`
//! patterns; a pattern only binds its captures.

use std::collections::{HashSet, VecDeque};

use crate::ast::walk::{self, Visitor};
use crate::ast::{ExceptHandler, Expr, ExprKind, FunctionDef, Param, Stmt, StmtKind, TypeParam};
use crate::config::ValidatorConfig;
use crate::diagnostic::Diagnostic;
use crate::validator::detector::{DetectError, Detector, Subject};
use crate::validator::issue::Finding;
use crate::validator::names::{typo_candidates, NameTable};

pub struct UndefinedNames;

impl Detector for UndefinedNames {
    fn name(&self) -> &'static str {
        "undefined-names"
    }

    fn enabled(&self, config: &ValidatorConfig) -> bool {
        config.check_undefined_vars
    }

    fn detect(&self, subject: &Subject<'_>) -> Result<Vec<Finding>, DetectError> {
        let mut checker = Checker::default();
        let body = &subject.tree.module.body;

        for stmt in body {
            checker.hoist(stmt);
        }
        walk::walk_body(&mut checker, body);
        while let Some(def) = checker.deferred.pop_front() {
            walk::walk_body(&mut checker, &def.body);
        }

        Ok(checker
            .undefined
            .into_iter()
            .map(|(name, offset)| {
                let line = subject.line_of(offset);
                let mut diag = Diagnostic::new(format!("Undefined name '{name}'"))
                    .with_context(subject.context(line))
                    .with_suggestion(format!("Define '{name}' before using it"))
                    .with_suggestion(format!("Import '{name}' if it's from another module"));
                for candidate in typo_candidates(&name) {
                    diag.add_suggestion(format!(
                        "Did you mean '{candidate}' instead of '{name}'?"
                    ));
                }
                Finding::error(diag)
            })
            .collect())
    }
}

#[derive(Default)]
struct Checker<'a> {
    names: NameTable,
    deferred: VecDeque<&'a FunctionDef>,
    /// (name, byte offset) in first-seen order.
    undefined: Vec<(String, usize)>,
    reported: HashSet<String>,
    in_pattern: bool,
}

impl<'a> Checker<'a> {
    fn hoist(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Import(_) | StmtKind::ImportFrom { .. } => self.bind_imports(stmt),
            StmtKind::FunctionDef(def) => self.names.bind(def.name.as_str()),
            StmtKind::ClassDef(def) => self.names.bind(def.name.as_str()),
            _ => {}
        }
    }

    fn bind_imports(&mut self, stmt: &Stmt) {
        let aliases = match &stmt.kind {
            StmtKind::Import(aliases) => aliases,
            StmtKind::ImportFrom { names, .. } => names,
            _ => return,
        };
        for alias in aliases.iter().filter(|a| a.name != "*") {
            self.names.bind(alias.bound_name());
        }
    }

    fn bind_target(&mut self, target: &Expr) {
        match &target.kind {
            ExprKind::Name(name) => self.names.bind(name.as_str()),
            ExprKind::Tuple(elts) | ExprKind::List(elts) => {
                for elt in elts {
                    self.bind_target(elt);
                }
            }
            ExprKind::Starred(inner) => self.bind_target(inner),
            _ => {}
        }
    }

    fn bind_type_params(&mut self, params: &[TypeParam]) {
        for param in params {
            self.names.bind(param.name.as_str());
        }
    }

    fn load(&mut self, name: &str, offset: usize) {
        if self.names.is_bound(name) || self.reported.contains(name) {
            return;
        }
        self.reported.insert(name.to_string());
        self.undefined.push((name.to_string(), offset));
    }
}

impl<'a> Visitor<'a> for Checker<'a> {
    fn visit_stmt(&mut self, stmt: &'a Stmt) {
        match &stmt.kind {
            StmtKind::Import(_) | StmtKind::ImportFrom { .. } => self.bind_imports(stmt),
            StmtKind::Global(names) | StmtKind::Nonlocal(names) => {
                for name in names {
                    self.names.bind(name.as_str());
                }
            }
            StmtKind::FunctionDef(def) => {
                for decorator in &def.decorators {
                    self.visit_expr(decorator);
                }
                for default in def.params.iter().filter_map(|p| p.default.as_ref()) {
                    self.visit_expr(default);
                }
                self.names.bind(def.name.as_str());
                self.bind_type_params(&def.type_params);
                for param in &def.params {
                    self.names.bind(param.name.as_str());
                }
                self.deferred.push_back(def);
            }
            StmtKind::ClassDef(def) => {
                for decorator in &def.decorators {
                    self.visit_expr(decorator);
                }
                self.bind_type_params(&def.type_params);
                for base in &def.bases {
                    self.visit_expr(base);
                }
                for keyword in &def.keywords {
                    self.visit_expr(&keyword.value);
                }
                self.names.bind(def.name.as_str());
                walk::walk_body(self, &def.body);
            }
            StmtKind::TypeAlias {
                name, type_params, ..
            } => {
                self.bind_type_params(type_params);
                self.bind_target(name);
            }
            StmtKind::AnnAssign { target, value, .. } => {
                if let Some(value) = value {
                    self.visit_expr(value);
                }
                self.visit_target(target);
            }
            _ => walk::walk_stmt(self, stmt),
        }
    }

    fn visit_expr(&mut self, expr: &'a Expr) {
        match &expr.kind {
            ExprKind::Name(_) if self.in_pattern => {}
            ExprKind::Name(name) => self.load(name, expr.span.start),
            ExprKind::Lambda { params, body } => {
                for default in params.iter().filter_map(|p| p.default.as_ref()) {
                    self.visit_expr(default);
                }
                for param in params {
                    self.names.bind(param.name.as_str());
                }
                self.visit_expr(body);
            }
            _ => walk::walk_expr(self, expr),
        }
    }

    fn visit_target(&mut self, target: &'a Expr) {
        self.bind_target(target);
        walk::walk_target(self, target);
    }

    fn visit_pattern(&mut self, pattern: &'a Expr) {
        let outer = std::mem::replace(&mut self.in_pattern, true);
        walk::walk_pattern(self, pattern);
        self.in_pattern = outer;
    }

    fn visit_param(&mut self, param: &'a Param) {
        self.names.bind(param.name.as_str());
    }

    fn visit_except_handler(&mut self, handler: &'a ExceptHandler) {
        if let Some(typ) = &handler.typ {
            self.visit_expr(typ);
        }
        if let Some(name) = &handler.name {
            self.names.bind(name.as_str());
        }
        walk::walk_body(self, &handler.body);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::build_tree;

    fn undefined(source: &str) -> Vec<String> {
        let tree = build_tree(source).unwrap();
        let config = ValidatorConfig::default();
        let subject = Subject::new(source, &tree, &config);
        UndefinedNames
            .detect(&subject)
            .unwrap()
            .into_iter()
            .map(|f| f.diagnostic.message)
            .collect()
    }

    #[test]
    fn reports_unbound_read() {
        assert_eq!(undefined("print(total)\n"), ["Undefined name 'total'"]);
    }

    #[test]
    fn assignment_before_use_is_fine() {
        assert!(undefined("total = 0\nprint(total)\n").is_empty());
    }

    #[test]
    fn read_before_assignment_is_reported() {
        assert_eq!(undefined("print(x)\nx = 1\n"), ["Undefined name 'x'"]);
    }

    #[test]
    fn functions_may_call_later_definitions() {
        let source = "def main():\n    return helper(2)\n\ndef helper(n):\n    return n * 2\n";
        assert!(undefined(source).is_empty());
    }

    #[test]
    fn imports_are_hoisted() {
        assert!(undefined("def f():\n    return os.getcwd()\n\nimport os\n").is_empty());
        assert!(undefined("from os import path as p\nprint(p)\n").is_empty());
        assert!(undefined("import os.path\nprint(os)\n").is_empty());
    }

    #[test]
    fn binding_forms() {
        let source = "\
for i, (a, *rest) in pairs():
    print(i, a, rest)
with open('f') as fh:
    fh.read()
try:
    pass
except ValueError as err:
    print(err)
squares = [n * n for n in range(3) if n]
if (m := 3) > 2:
    print(m)
f = lambda q, r=1: q + r
";
        assert_eq!(undefined(source), ["Undefined name 'pairs'"]);
    }

    #[test]
    fn case_patterns_bind_captures() {
        let source = "\
def handle(event):
    match event:
        case Click(x=px, y=py) if px > 0:
            return px + py
        case [first, *others]:
            return first, others
        case Key(code) | Scroll(code) as raw:
            return code, raw
        case _:
            return fallback
";
        assert_eq!(undefined(source), ["Undefined name 'fallback'"]);
    }

    #[test]
    fn type_parameters_are_bound() {
        let source = "\
def first[T](items: list[T]) -> T:
    seen: list[T] = []
    return items[0]

class Box[T]:
    pass

type Pair[K, V] = tuple[K, V]
print(Pair, Box, first)
";
        assert!(undefined(source).is_empty());
    }

    #[test]
    fn annotations_are_not_checked() {
        assert!(undefined("def f(x: Widget) -> Gadget:\n    return x\n").is_empty());
        assert!(undefined("value: Thing = 1\nprint(value)\n").is_empty());
    }

    #[test]
    fn each_name_reported_once() {
        assert_eq!(undefined("print(y)\nprint(y)\n").len(), 1);
    }

    #[test]
    fn typo_hint() {
        let tree = build_tree("pront(1)\n").unwrap();
        let config = ValidatorConfig::default();
        let subject = Subject::new("pront(1)\n", &tree, &config);
        let findings = UndefinedNames.detect(&subject).unwrap();
        assert!(findings[0]
            .diagnostic
            .suggestions
            .contains(&"Did you mean 'print' instead of 'pront'?".to_string()));
    }

    #[test]
    fn disabled_by_config() {
        let config = ValidatorConfig::default().with_check_undefined_vars(false);
        assert!(!UndefinedNames.enabled(&config));
    }
}
