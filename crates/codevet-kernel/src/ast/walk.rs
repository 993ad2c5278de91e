//! Read-only AST traversal.
//!
//! [`Visitor`] has one hook per node family; each default calls the matching
//! `walk_*` function, which visits children in Python evaluation order
//! (an assignment's value before its targets, a comprehension's iterable
//! before its target). Detectors override the hooks they care about and
//! call the `walk_*` function to keep descending.
//!
//! Targets are visited through [`Visitor::visit_target`] rather than
//! [`Visitor::visit_expr`], so a visitor can tell stores from loads without
//! the tree carrying a context flag.

use super::types::*;

pub trait Visitor<'a> {
    fn visit_stmt(&mut self, stmt: &'a Stmt) {
        walk_stmt(self, stmt);
    }

    /// An expression evaluated for its value.
    fn visit_expr(&mut self, expr: &'a Expr) {
        walk_expr(self, expr);
    }

    /// An expression being assigned to (or deleted).
    fn visit_target(&mut self, target: &'a Expr) {
        walk_target(self, target);
    }

    fn visit_param(&mut self, param: &'a Param) {
        walk_param(self, param);
    }

    fn visit_except_handler(&mut self, handler: &'a ExceptHandler) {
        walk_except_handler(self, handler);
    }

    /// A `case` pattern: capture names go to [`Visitor::visit_target`],
    /// compared values to [`Visitor::visit_expr`].
    fn visit_pattern(&mut self, pattern: &'a Expr) {
        walk_pattern(self, pattern);
    }
}

pub fn walk_module<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, module: &'a Module) {
    walk_body(visitor, &module.body);
}

pub fn walk_body<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, body: &'a [Stmt]) {
    for stmt in body {
        visitor.visit_stmt(stmt);
    }
}

pub fn walk_stmt<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, stmt: &'a Stmt) {
    match &stmt.kind {
        StmtKind::Expr(expr) => visitor.visit_expr(expr),
        StmtKind::Assign { targets, value } => {
            visitor.visit_expr(value);
            for target in targets {
                visitor.visit_target(target);
            }
        }
        StmtKind::AugAssign { target, value, .. } => {
            visitor.visit_expr(value);
            visitor.visit_target(target);
        }
        StmtKind::AnnAssign {
            target,
            annotation,
            value,
        } => {
            visitor.visit_expr(annotation);
            if let Some(value) = value {
                visitor.visit_expr(value);
            }
            visitor.visit_target(target);
        }
        StmtKind::Pass
        | StmtKind::Break
        | StmtKind::Continue
        | StmtKind::Global(_)
        | StmtKind::Nonlocal(_)
        | StmtKind::Import(_)
        | StmtKind::ImportFrom { .. } => {}
        StmtKind::Return(value) => {
            if let Some(value) = value {
                visitor.visit_expr(value);
            }
        }
        StmtKind::Raise { exc, cause } => {
            if let Some(exc) = exc {
                visitor.visit_expr(exc);
            }
            if let Some(cause) = cause {
                visitor.visit_expr(cause);
            }
        }
        StmtKind::Delete(targets) => {
            for target in targets {
                visitor.visit_target(target);
            }
        }
        StmtKind::Assert { test, msg } => {
            visitor.visit_expr(test);
            if let Some(msg) = msg {
                visitor.visit_expr(msg);
            }
        }
        StmtKind::If { test, body, orelse } | StmtKind::While { test, body, orelse } => {
            visitor.visit_expr(test);
            walk_body(visitor, body);
            walk_body(visitor, orelse);
        }
        StmtKind::For {
            target,
            iter,
            body,
            orelse,
            ..
        } => {
            visitor.visit_expr(iter);
            visitor.visit_target(target);
            walk_body(visitor, body);
            walk_body(visitor, orelse);
        }
        StmtKind::Try {
            body,
            handlers,
            orelse,
            finalbody,
        } => {
            walk_body(visitor, body);
            for handler in handlers {
                visitor.visit_except_handler(handler);
            }
            walk_body(visitor, orelse);
            walk_body(visitor, finalbody);
        }
        StmtKind::With { items, body, .. } => {
            for item in items {
                visitor.visit_expr(&item.context);
                if let Some(vars) = &item.vars {
                    visitor.visit_target(vars);
                }
            }
            walk_body(visitor, body);
        }
        StmtKind::Match { subject, cases } => {
            visitor.visit_expr(subject);
            for case in cases {
                visitor.visit_pattern(&case.pattern);
                if let Some(binding) = &case.binding {
                    visitor.visit_target(binding);
                }
                if let Some(guard) = &case.guard {
                    visitor.visit_expr(guard);
                }
                walk_body(visitor, &case.body);
            }
        }
        StmtKind::TypeAlias {
            name,
            type_params,
            value,
        } => {
            walk_type_params(visitor, type_params);
            visitor.visit_expr(value);
            visitor.visit_target(name);
        }
        StmtKind::FunctionDef(def) => {
            walk_function_header(visitor, def);
            walk_body(visitor, &def.body);
        }
        StmtKind::ClassDef(def) => {
            for decorator in &def.decorators {
                visitor.visit_expr(decorator);
            }
            walk_type_params(visitor, &def.type_params);
            for base in &def.bases {
                visitor.visit_expr(base);
            }
            for keyword in &def.keywords {
                visitor.visit_expr(&keyword.value);
            }
            walk_body(visitor, &def.body);
        }
    }
}

/// Decorators, parameters and the return annotation of a `def`.
pub fn walk_function_header<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, def: &'a FunctionDef) {
    for decorator in &def.decorators {
        visitor.visit_expr(decorator);
    }
    walk_type_params(visitor, &def.type_params);
    for param in &def.params {
        visitor.visit_param(param);
    }
    if let Some(returns) = &def.returns {
        visitor.visit_expr(returns);
    }
}

pub fn walk_type_params<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, params: &'a [TypeParam]) {
    for bound in params.iter().filter_map(|p| p.bound.as_ref()) {
        visitor.visit_expr(bound);
    }
}

pub fn walk_param<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, param: &'a Param) {
    if let Some(annotation) = &param.annotation {
        visitor.visit_expr(annotation);
    }
    if let Some(default) = &param.default {
        visitor.visit_expr(default);
    }
}

pub fn walk_except_handler<'a, V: Visitor<'a> + ?Sized>(
    visitor: &mut V,
    handler: &'a ExceptHandler,
) {
    if let Some(typ) = &handler.typ {
        visitor.visit_expr(typ);
    }
    walk_body(visitor, &handler.body);
}

/// Visit the parts of a target that are read: `a[i] = v` reads `a` and `i`.
pub fn walk_target<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, target: &'a Expr) {
    match &target.kind {
        ExprKind::Name(_) => {}
        ExprKind::Tuple(elts) | ExprKind::List(elts) => {
            for elt in elts {
                visitor.visit_target(elt);
            }
        }
        ExprKind::Starred(inner) => visitor.visit_target(inner),
        ExprKind::Attribute { value, .. } => visitor.visit_expr(value),
        ExprKind::Subscript { value, index } => {
            visitor.visit_expr(value);
            visitor.visit_expr(index);
        }
        _ => visitor.visit_expr(target),
    }
}

/// Split a `case` pattern into captures and compared values.
///
/// `Point(x=0, y=py) | [py, *_]` reads `Point` and `0`, and captures
/// `py` and `_`.
pub fn walk_pattern<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, pattern: &'a Expr) {
    match &pattern.kind {
        ExprKind::Name(_) => visitor.visit_target(pattern),
        ExprKind::Starred(inner) => visitor.visit_pattern(inner),
        ExprKind::BinOp {
            left,
            op: BinOp::BitOr,
            right,
        } => {
            visitor.visit_pattern(left);
            visitor.visit_pattern(right);
        }
        ExprKind::Tuple(elts) | ExprKind::List(elts) => {
            for elt in elts {
                visitor.visit_pattern(elt);
            }
        }
        ExprKind::Call {
            func,
            args,
            keywords,
        } => {
            visitor.visit_expr(func);
            for arg in args {
                visitor.visit_pattern(arg);
            }
            for keyword in keywords {
                visitor.visit_pattern(&keyword.value);
            }
        }
        ExprKind::Dict(items) => {
            for (key, value) in items {
                if let Some(key) = key {
                    visitor.visit_expr(key);
                }
                visitor.visit_pattern(value);
            }
        }
        _ => visitor.visit_expr(pattern),
    }
}

fn walk_generators<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, generators: &'a [Comprehension]) {
    for generator in generators {
        visitor.visit_expr(&generator.iter);
        visitor.visit_target(&generator.target);
        for cond in &generator.ifs {
            visitor.visit_expr(cond);
        }
    }
}

pub fn walk_expr<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, expr: &'a Expr) {
    match &expr.kind {
        ExprKind::Name(_) | ExprKind::Constant(_) | ExprKind::Str(_) => {}
        ExprKind::BoolOp { values, .. } => {
            for value in values {
                visitor.visit_expr(value);
            }
        }
        ExprKind::BinOp { left, right, .. } => {
            visitor.visit_expr(left);
            visitor.visit_expr(right);
        }
        ExprKind::UnaryOp { operand, .. } => visitor.visit_expr(operand),
        ExprKind::Compare {
            left, comparators, ..
        } => {
            visitor.visit_expr(left);
            for comparator in comparators {
                visitor.visit_expr(comparator);
            }
        }
        ExprKind::Lambda { params, body } => {
            for param in params {
                visitor.visit_param(param);
            }
            visitor.visit_expr(body);
        }
        ExprKind::IfExp { test, body, orelse } => {
            visitor.visit_expr(test);
            visitor.visit_expr(body);
            visitor.visit_expr(orelse);
        }
        ExprKind::NamedExpr { target, value } => {
            visitor.visit_expr(value);
            visitor.visit_target(target);
        }
        ExprKind::Call {
            func,
            args,
            keywords,
        } => {
            visitor.visit_expr(func);
            for arg in args {
                visitor.visit_expr(arg);
            }
            for keyword in keywords {
                visitor.visit_expr(&keyword.value);
            }
        }
        ExprKind::Attribute { value, .. } => visitor.visit_expr(value),
        ExprKind::Subscript { value, index } => {
            visitor.visit_expr(value);
            visitor.visit_expr(index);
        }
        ExprKind::Slice { lower, upper, step } => {
            for part in [lower, upper, step].into_iter().flatten() {
                visitor.visit_expr(part);
            }
        }
        ExprKind::Starred(inner) | ExprKind::Await(inner) | ExprKind::YieldFrom(inner) => {
            visitor.visit_expr(inner)
        }
        ExprKind::Yield(value) => {
            if let Some(value) = value {
                visitor.visit_expr(value);
            }
        }
        ExprKind::List(elts) | ExprKind::Tuple(elts) | ExprKind::Set(elts) => {
            for elt in elts {
                visitor.visit_expr(elt);
            }
        }
        ExprKind::Dict(items) => {
            for (key, value) in items {
                if let Some(key) = key {
                    visitor.visit_expr(key);
                }
                visitor.visit_expr(value);
            }
        }
        ExprKind::ListComp { elt, generators }
        | ExprKind::SetComp { elt, generators }
        | ExprKind::GeneratorExp { elt, generators } => {
            walk_generators(visitor, generators);
            visitor.visit_expr(elt);
        }
        ExprKind::DictComp {
            key,
            value,
            generators,
        } => {
            walk_generators(visitor, generators);
            visitor.visit_expr(key);
            visitor.visit_expr(value);
        }
    }
}

/// Every statement in `body`, depth-first, including nested definitions.
pub fn all_stmts(body: &[Stmt]) -> Vec<&Stmt> {
    let mut out = Vec::new();
    collect_stmts(body, &mut out);
    out
}

fn collect_stmts<'a>(body: &'a [Stmt], out: &mut Vec<&'a Stmt>) {
    for stmt in body {
        out.push(stmt);
        for block in stmt.blocks() {
            collect_stmts(block, out);
        }
    }
}

/// Every expression reachable from `body`, in visit order.
pub fn all_exprs(body: &[Stmt]) -> Vec<&Expr> {
    struct Collect<'a> {
        out: Vec<&'a Expr>,
    }

    impl<'a> Visitor<'a> for Collect<'a> {
        fn visit_expr(&mut self, expr: &'a Expr) {
            self.out.push(expr);
            walk_expr(self, expr);
        }
    }

    let mut collect = Collect { out: Vec::new() };
    walk_body(&mut collect, body);
    collect.out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    struct Names {
        loads: Vec<String>,
        stores: Vec<String>,
    }

    impl<'a> Visitor<'a> for Names {
        fn visit_expr(&mut self, expr: &'a Expr) {
            if let Some(name) = expr.as_name() {
                self.loads.push(name.to_string());
            }
            walk_expr(self, expr);
        }

        fn visit_target(&mut self, target: &'a Expr) {
            if let Some(name) = target.as_name() {
                self.stores.push(name.to_string());
            }
            walk_target(self, target);
        }
    }

    fn names(source: &str) -> Names {
        let module = parse(source).unwrap();
        let mut names = Names {
            loads: Vec::new(),
            stores: Vec::new(),
        };
        walk_module(&mut names, &module);
        names
    }

    #[test]
    fn value_is_visited_before_target() {
        let n = names("x = y\n");
        assert_eq!(n.loads, vec!["y"]);
        assert_eq!(n.stores, vec!["x"]);
    }

    #[test]
    fn subscript_target_reads_its_parts() {
        let n = names("a[i] = v\n");
        assert_eq!(n.loads, vec!["v", "a", "i"]);
        assert!(n.stores.is_empty());
    }

    #[test]
    fn comprehension_binds_target_before_element() {
        let n = names("[x * 2 for x in items if x]\n");
        assert_eq!(n.stores, vec!["x"]);
        assert_eq!(n.loads, vec!["items", "x", "x"]);
    }

    #[test]
    fn all_stmts_descends_into_blocks() {
        let module = parse("def f():\n    if x:\n        return 1\n    return 2\n").unwrap();
        let kinds: Vec<_> = all_stmts(&module.body).iter().map(|s| s.keyword()).collect();
        assert_eq!(kinds, vec!["def", "if", "return", "return"]);
    }

    #[test]
    fn case_patterns_split_captures_from_values() {
        let source = "\
match command:
    case Point(x=0, y=py) | [py, *rest] if py > limit:
        pass
    case {'kind': Kind.TEXT, **extra} as whole:
        pass
";
        let n = names(source);
        assert_eq!(n.loads, vec!["command", "Point", "py", "limit", "Kind"]);
        assert_eq!(n.stores, vec!["py", "py", "rest", "extra", "whole"]);
    }
}
