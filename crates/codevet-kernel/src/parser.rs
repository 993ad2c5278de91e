//! Parser for candidate Python code.
//!
//! Transforms the layout-resolved token stream from the lexer into an AST.
//! Uses chumsky parser combinators. Expressions follow Python's precedence
//! chain from `lambda` and the conditional expression down through boolean
//! operators, comparisons, bitwise and arithmetic operators to primaries
//! and atoms.
//!
//! Errors are reported with CPython's vocabulary (`invalid syntax`,
//! `unexpected indent`, `expected an indented block`, `cannot assign to …`)
//! because downstream suggestion heuristics key off those phrases.

use std::ops::Range;

use chumsky::{input::ValueInput, prelude::*};

use crate::ast::walk::{self, Visitor};
use crate::ast::{
    Alias, BinOp, BoolOp, CmpOp, ClassDef, Comprehension, Constant, ExceptHandler, Expr, ExprKind,
    FunctionDef, Keyword, MatchCase, Module, Param, ParamKind, Stmt, StmtKind, StrLit, TypeParam,
    UnaryOp, WithItem,
};
use crate::lexer::{self, Spanned, Token, TokenStream};

/// Span type used throughout the parser.
pub type Span = SimpleSpan;

type Extra<'tokens> = extra::Err<Rich<'tokens, Token, Span>>;

/// Parse error with location and a Python-style message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub span: Range<usize>,
    pub message: String,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {:?}", self.message, self.span)
    }
}

impl std::error::Error for ParseError {}

/// Parse Python source into a Module AST.
pub fn parse(source: &str) -> Result<Module, Vec<ParseError>> {
    let stream = lexer::tokenize(source).map_err(|errs| {
        errs.into_iter()
            .map(|e| ParseError {
                span: e.span,
                message: e.message,
            })
            .collect::<Vec<_>>()
    })?;
    parse_tokens(&stream, source.len())
}

/// Parse an already tokenized stream. `source_len` positions end-of-input.
pub fn parse_tokens(stream: &TokenStream, source_len: usize) -> Result<Module, Vec<ParseError>> {
    let tokens: Vec<(Token, Span)> = stream
        .tokens
        .iter()
        .map(|spanned| (spanned.token.clone(), (spanned.span.start..spanned.span.end).into()))
        .collect();

    let end_span: Span = (source_len..source_len).into();

    let parser = module_parser();
    let result = parser.parse(tokens.as_slice().map(end_span, |(t, s)| (t, s)));

    let module = result.into_result().map_err(|errs| {
        errs.into_iter()
            .map(|e| ParseError {
                span: e.span().start..e.span().end,
                message: describe_error(&stream.tokens, &e),
            })
            .collect::<Vec<_>>()
    })?;

    check_targets(&module).map_err(|e| vec![e])?;
    Ok(module)
}

/// Map a chumsky error onto CPython's wording.
fn describe_error(tokens: &[Spanned], error: &Rich<'_, Token, Span>) -> String {
    let found = error.found();
    if matches!(found, Some(Token::Indent)) {
        return "unexpected indent".to_string();
    }

    let at = error.span().start;
    let index = found
        .and_then(|tok| {
            tokens
                .iter()
                .position(|s| s.span.start == at && &s.token == tok)
        })
        .unwrap_or(tokens.len());

    if let [.., colon, newline] = &tokens[..index] {
        if colon.token == Token::Colon && newline.token == Token::Newline {
            return "expected an indented block".to_string();
        }
    }

    "invalid syntax".to_string()
}

fn to_range(span: Span) -> Range<usize> {
    span.start..span.end
}

// ═══════════════════════════════════════════════════════════════════════════
// Target validation
// ═══════════════════════════════════════════════════════════════════════════

struct TargetCheck {
    error: Option<ParseError>,
}

impl TargetCheck {
    fn fail(&mut self, span: &Range<usize>, message: String) {
        if self.error.is_none() {
            self.error = Some(ParseError {
                span: span.clone(),
                message,
            });
        }
    }
}

impl<'a> Visitor<'a> for TargetCheck {
    fn visit_stmt(&mut self, stmt: &'a Stmt) {
        match &stmt.kind {
            StmtKind::AugAssign { target, .. } if !is_single_target(target) => self.fail(
                &target.span,
                format!(
                    "'{}' is an illegal expression for augmented assignment",
                    target.describe()
                ),
            ),
            StmtKind::AnnAssign { target, .. } if !is_single_target(target) => self.fail(
                &target.span,
                "only single target (not tuple) can be annotated".to_string(),
            ),
            _ => {}
        }
        walk::walk_stmt(self, stmt);
    }

    fn visit_target(&mut self, target: &'a Expr) {
        let assignable = matches!(
            target.kind,
            ExprKind::Name(_)
                | ExprKind::Attribute { .. }
                | ExprKind::Subscript { .. }
                | ExprKind::Tuple(_)
                | ExprKind::List(_)
                | ExprKind::Starred(_)
        );
        if !assignable {
            self.fail(&target.span, format!("cannot assign to {}", target.describe()));
        }
        walk::walk_target(self, target);
    }
}

fn is_single_target(target: &Expr) -> bool {
    matches!(
        target.kind,
        ExprKind::Name(_) | ExprKind::Attribute { .. } | ExprKind::Subscript { .. }
    )
}

/// Reject assignments to literals, calls and operator expressions.
fn check_targets(module: &Module) -> Result<(), ParseError> {
    let mut check = TargetCheck { error: None };
    walk::walk_module(&mut check, module);
    match check.error {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Node helpers
// ═══════════════════════════════════════════════════════════════════════════

fn binop(left: Expr, op: BinOp, right: Expr) -> Expr {
    let span = left.span.start..right.span.end;
    Expr::new(
        ExprKind::BinOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
        span,
    )
}

fn starred(star: Span, inner: Expr) -> Expr {
    let span = star.start..inner.span.end;
    Expr::new(ExprKind::Starred(Box::new(inner)), span)
}

/// `x` stays `x`; `x,` and `x, y` become tuples.
fn collapse_tuple(mut items: Vec<Expr>, trailing_comma: bool, span: Range<usize>) -> Expr {
    if items.len() == 1 && !trailing_comma {
        if let Some(only) = items.pop() {
            return only;
        }
    }
    Expr::new(ExprKind::Tuple(items), span)
}

/// Fold `a and b and c` into one flat BoolOp.
fn bool_chain(left: Expr, op: BoolOp, right: Expr) -> Expr {
    let span = left.span.start..right.span.end;
    let values = match left.kind {
        ExprKind::BoolOp {
            op: left_op,
            mut values,
        } if left_op == op => {
            values.push(right);
            values
        }
        kind => vec![Expr::new(kind, left.span), right],
    };
    Expr::new(ExprKind::BoolOp { op, values }, span)
}

const FSTRING_KEYWORDS: &[&str] = &[
    "True", "False", "None", "not", "lambda", "await", "yield", "if", "else", "for", "in",
];

fn string_literal(parts: Vec<String>) -> StrLit {
    let mut is_bytes = false;
    let mut is_fstring = false;
    let mut holes = Vec::new();

    for part in &parts {
        let prefix: String = part
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect::<String>()
            .to_ascii_lowercase();
        if prefix.contains('b') {
            is_bytes = true;
        }
        if prefix.contains('f') {
            is_fstring = true;
            holes.extend(fstring_holes(&part[prefix.len()..]));
        }
    }

    StrLit {
        parts,
        is_bytes,
        is_fstring,
        holes,
    }
}

/// Leading identifier of every `{…}` replacement field; `{{` is a literal brace.
fn fstring_holes(body: &str) -> Vec<String> {
    let mut holes = Vec::new();
    let mut chars = body.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '{' {
            continue;
        }
        if chars.peek() == Some(&'{') {
            chars.next();
            continue;
        }
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let mut name = String::new();
        while let Some(&c) = chars.peek() {
            if c == '_' || c.is_alphanumeric() {
                name.push(c);
                chars.next();
            } else {
                break;
            }
        }
        let starts_like_name = name.chars().next().is_some_and(|c| c == '_' || c.is_alphabetic());
        if starts_like_name && !FSTRING_KEYWORDS.contains(&name.as_str()) {
            holes.push(name);
        }
    }

    holes
}

#[derive(Clone)]
enum ParamItem {
    Slash,
    Star,
    Param(Param),
}

/// Assign positional-only / keyword-only kinds from the `/` and `*` markers.
fn resolve_param_kinds(items: Vec<ParamItem>) -> Vec<Param> {
    let slash = items.iter().position(|item| matches!(item, ParamItem::Slash));
    let mut keyword_only = false;
    let mut params = Vec::new();

    for (index, item) in items.into_iter().enumerate() {
        match item {
            ParamItem::Slash => {}
            ParamItem::Star => keyword_only = true,
            ParamItem::Param(mut param) => {
                match param.kind {
                    ParamKind::VarArgs => keyword_only = true,
                    ParamKind::KwArgs => {}
                    _ if slash.is_some_and(|s| index < s) => {
                        param.kind = ParamKind::PositionalOnly
                    }
                    _ if keyword_only => param.kind = ParamKind::KeywordOnly,
                    _ => {}
                }
                params.push(param);
            }
        }
    }

    params
}

enum Arg {
    Positional(Expr),
    Keyword(Keyword),
}

fn split_args(args: Vec<Arg>) -> (Vec<Expr>, Vec<Keyword>) {
    let mut positional = Vec::new();
    let mut keywords = Vec::new();
    for arg in args {
        match arg {
            Arg::Positional(expr) => positional.push(expr),
            Arg::Keyword(keyword) => keywords.push(keyword),
        }
    }
    (positional, keywords)
}

enum Trailer {
    Attr(String),
    Call(Vec<Expr>, Vec<Keyword>),
    Index(Expr),
}

/// What follows the first element inside a bracket pair.
#[derive(Clone)]
enum ElementTail {
    Comprehension(Vec<Comprehension>),
    More(Vec<Expr>),
    Nothing,
}

#[derive(Clone)]
enum AssignTail {
    Annotated(Expr, Option<Expr>),
    Augmented(BinOp, Expr),
    Chained(Vec<Expr>),
    Nothing,
}

// ═══════════════════════════════════════════════════════════════════════════
// Parser Combinators - generic over input type
// ═══════════════════════════════════════════════════════════════════════════

/// Top-level module parser.
fn module_parser<'tokens, I>() -> impl Parser<'tokens, I, Module, Extra<'tokens>>
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    statement_parser()
        .repeated()
        .collect::<Vec<Vec<Stmt>>>()
        .then_ignore(end())
        .map(|lines| Module {
            body: lines.into_iter().flatten().collect(),
        })
}

/// One logical line: a compound statement, or `;`-separated simple ones.
fn statement_parser<'tokens, I>() -> impl Parser<'tokens, I, Vec<Stmt>, Extra<'tokens>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    let expr = expr_parser();
    let operand = operand_parser(expr.clone());

    recursive(move |stmt| {
        let simple = simple_statements_parser(expr.clone(), operand.clone());

        let block = choice((
            just(Token::Newline)
                .ignore_then(just(Token::Indent))
                .ignore_then(stmt.repeated().at_least(1).collect::<Vec<Vec<Stmt>>>())
                .then_ignore(just(Token::Dedent))
                .map(|lines| lines.into_iter().flatten().collect::<Vec<_>>()),
            simple.clone(),
        ))
        .labelled("block")
        .boxed();

        let suite = just(Token::Colon).ignore_then(block).boxed();

        choice((
            compound_parser(expr.clone(), operand.clone(), suite).map(|stmt| vec![stmt]),
            simple,
        ))
        .boxed()
    })
}

/// Identifier token.
fn ident_parser<'tokens, I>() -> impl Parser<'tokens, I, String, Extra<'tokens>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    select! {
        Token::Ident(name) => name,
    }
    .labelled("identifier")
}

/// An identifier that is a keyword only in one position, like `match`.
fn soft_keyword<'tokens, I>(word: &'static str) -> impl Parser<'tokens, I, (), Extra<'tokens>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    select! {
        Token::Ident(name) if name == word => (),
    }
    .labelled(word)
}

/// An identifier as a `Name` expression.
fn name_expr_parser<'tokens, I>() -> impl Parser<'tokens, I, Expr, Extra<'tokens>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    ident_parser().map_with(|name, e| Expr::new(ExprKind::Name(name), to_range(e.span())))
}

/// `[T, U: bound, *Ts, **P]` after a def, class or type alias name.
fn type_params_parser<'tokens, I, E>(expr: E) -> impl Parser<'tokens, I, Vec<TypeParam>, Extra<'tokens>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
    E: Parser<'tokens, I, Expr, Extra<'tokens>> + Clone + 'tokens,
{
    choice((just(Token::DoubleStar), just(Token::Star)))
        .or_not()
        .ignore_then(ident_parser())
        .then(just(Token::Colon).ignore_then(expr.clone()).or_not())
        .then_ignore(just(Token::Eq).ignore_then(expr).or_not())
        .map_with(|(name, bound), e| TypeParam {
            name,
            bound,
            span: to_range(e.span()),
        })
        .separated_by(just(Token::Comma))
        .at_least(1)
        .allow_trailing()
        .collect::<Vec<_>>()
        .delimited_by(just(Token::LBracket), just(Token::RBracket))
        .labelled("type parameters")
        .boxed()
}

/// `*operand` or a full expression.
fn star_item_parser<'tokens, I, E, O>(
    expr: E,
    operand: O,
) -> impl Parser<'tokens, I, Expr, Extra<'tokens>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
    E: Parser<'tokens, I, Expr, Extra<'tokens>> + Clone + 'tokens,
    O: Parser<'tokens, I, Expr, Extra<'tokens>> + Clone + 'tokens,
{
    choice((
        just(Token::Star)
            .map_with(|_, e| e.span())
            .then(operand)
            .map(|(star, inner)| starred(star, inner)),
        expr,
    ))
    .boxed()
}

/// Comma-separated items; one item without a trailing comma stays bare.
fn expr_list_parser<'tokens, I, P>(item: P) -> impl Parser<'tokens, I, Expr, Extra<'tokens>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
    P: Parser<'tokens, I, Expr, Extra<'tokens>> + Clone + 'tokens,
{
    item.separated_by(just(Token::Comma))
        .at_least(1)
        .collect::<Vec<_>>()
        .then(just(Token::Comma).or_not())
        .map_with(|(items, trailing), e| collapse_tuple(items, trailing.is_some(), to_range(e.span())))
        .boxed()
}

/// Assignment targets for `for` headers and comprehensions.
fn target_list_parser<'tokens, I, O>(operand: O) -> impl Parser<'tokens, I, Expr, Extra<'tokens>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
    O: Parser<'tokens, I, Expr, Extra<'tokens>> + Clone + 'tokens,
{
    let target = choice((
        just(Token::Star)
            .map_with(|_, e| e.span())
            .then(operand.clone())
            .map(|(star, inner)| starred(star, inner)),
        operand,
    ));
    expr_list_parser(target)
}

/// `yield`, `yield a, b`, `yield from it`.
fn yield_parser<'tokens, I, E, O>(expr: E, operand: O) -> impl Parser<'tokens, I, Expr, Extra<'tokens>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
    E: Parser<'tokens, I, Expr, Extra<'tokens>> + Clone + 'tokens,
    O: Parser<'tokens, I, Expr, Extra<'tokens>> + Clone + 'tokens,
{
    let values = expr_list_parser(star_item_parser(expr.clone(), operand));

    just(Token::Yield)
        .ignore_then(choice((
            just(Token::From)
                .ignore_then(expr)
                .map(|value| ExprKind::YieldFrom(Box::new(value))),
            values.or_not().map(|value| ExprKind::Yield(value.map(Box::new))),
        )))
        .map_with(|kind, e| Expr::new(kind, to_range(e.span())))
        .labelled("yield expression")
        .boxed()
}

/// One or more `[async] for target in iter [if cond]*` clauses.
fn comprehension_parser<'tokens, I, E, O>(
    expr: E,
    operand: O,
) -> impl Parser<'tokens, I, Vec<Comprehension>, Extra<'tokens>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
    E: Parser<'tokens, I, Expr, Extra<'tokens>> + Clone + 'tokens,
    O: Parser<'tokens, I, Expr, Extra<'tokens>> + Clone + 'tokens,
{
    just(Token::Async)
        .or_not()
        .then_ignore(just(Token::For))
        .then(target_list_parser(operand))
        .then_ignore(just(Token::In))
        .then(expr.clone())
        .then(just(Token::If).ignore_then(expr).repeated().collect::<Vec<_>>())
        .map(|(((is_async, target), iter), ifs)| Comprehension {
            target,
            iter,
            ifs,
            is_async: is_async.is_some(),
        })
        .repeated()
        .at_least(1)
        .collect::<Vec<_>>()
        .labelled("comprehension")
        .boxed()
}

/// Parenthesized call arguments: positional, `*args`, `name=value`, `**kwargs`.
///
/// A positional argument may carry comprehension clauses, making it a bare
/// generator expression as in `sum(x for x in xs)`.
fn call_args_parser<'tokens, I, E, O>(
    expr: E,
    operand: O,
) -> impl Parser<'tokens, I, (Vec<Expr>, Vec<Keyword>), Extra<'tokens>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
    E: Parser<'tokens, I, Expr, Extra<'tokens>> + Clone + 'tokens,
    O: Parser<'tokens, I, Expr, Extra<'tokens>> + Clone + 'tokens,
{
    let comprehension = comprehension_parser(expr.clone(), operand);

    let arg = choice((
        just(Token::DoubleStar)
            .ignore_then(expr.clone())
            .map(|value| Arg::Keyword(Keyword { arg: None, value })),
        just(Token::Star)
            .map_with(|_, e| e.span())
            .then(expr.clone())
            .map(|(star, inner)| Arg::Positional(starred(star, inner))),
        ident_parser()
            .then_ignore(just(Token::Eq))
            .then(expr.clone())
            .map(|(name, value)| {
                Arg::Keyword(Keyword {
                    arg: Some(name),
                    value,
                })
            }),
        expr.then(comprehension.or_not())
            .map_with(|(elt, generators), e| match generators {
                Some(generators) => Arg::Positional(Expr::new(
                    ExprKind::GeneratorExp {
                        elt: Box::new(elt),
                        generators,
                    },
                    to_range(e.span()),
                )),
                None => Arg::Positional(elt),
            }),
    ));

    arg.separated_by(just(Token::Comma))
        .allow_trailing()
        .collect::<Vec<_>>()
        .delimited_by(just(Token::LParen), just(Token::RParen))
        .map(split_args)
        .labelled("arguments")
        .boxed()
}

/// Parameter list of a `def` (with annotations) or a `lambda` (without).
fn params_parser<'tokens, I, E>(
    expr: E,
    annotations: bool,
) -> impl Parser<'tokens, I, Vec<Param>, Extra<'tokens>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
    E: Parser<'tokens, I, Expr, Extra<'tokens>> + Clone + 'tokens,
{
    let annotation = if annotations {
        just(Token::Colon).ignore_then(expr.clone()).or_not().boxed()
    } else {
        empty().to(None::<Expr>).boxed()
    };

    let param = |kind: ParamKind| {
        move |(name, annotation): (String, Option<Expr>), span: Span| Param {
            name,
            kind,
            annotation,
            default: None,
            span: to_range(span),
        }
    };

    let item = choice((
        just(Token::Slash).to(ParamItem::Slash),
        just(Token::DoubleStar)
            .ignore_then(ident_parser())
            .then(annotation.clone())
            .map_with(move |p, e| ParamItem::Param(param(ParamKind::KwArgs)(p, e.span()))),
        just(Token::Star)
            .ignore_then(ident_parser().then(annotation.clone()).or_not())
            .map_with(move |p, e| match p {
                Some(p) => ParamItem::Param(param(ParamKind::VarArgs)(p, e.span())),
                None => ParamItem::Star,
            }),
        ident_parser()
            .then(annotation)
            .then(just(Token::Eq).ignore_then(expr).or_not())
            .map_with(move |(p, default), e| {
                let mut param = param(ParamKind::Normal)(p, e.span());
                param.default = default;
                ParamItem::Param(param)
            }),
    ));

    item.separated_by(just(Token::Comma))
        .allow_trailing()
        .collect::<Vec<_>>()
        .map(resolve_param_kinds)
        .labelled("parameters")
        .boxed()
}

/// Left-associative binary operator level.
fn binary_level<'tokens, I, P, O>(operand: P, op: O) -> impl Parser<'tokens, I, Expr, Extra<'tokens>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
    P: Parser<'tokens, I, Expr, Extra<'tokens>> + Clone + 'tokens,
    O: Parser<'tokens, I, BinOp, Extra<'tokens>> + Clone + 'tokens,
{
    operand
        .clone()
        .foldl(op.then(operand).repeated(), |left, (op, right)| binop(left, op, right))
        .boxed()
}

/// Full expression: walrus, lambda, conditional expression and below.
fn expr_parser<'tokens, I>() -> impl Parser<'tokens, I, Expr, Extra<'tokens>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    recursive(|expr| {
        let operand = operand_parser(expr.clone());

        let cmp_op = choice((
            just(Token::Not).then(just(Token::In)).to(CmpOp::NotIn),
            just(Token::Is).then(just(Token::Not)).to(CmpOp::IsNot),
            select! {
                Token::EqEq => CmpOp::Eq,
                Token::NotEq => CmpOp::NotEq,
                Token::Lt => CmpOp::Lt,
                Token::LtEq => CmpOp::LtE,
                Token::Gt => CmpOp::Gt,
                Token::GtEq => CmpOp::GtE,
                Token::Is => CmpOp::Is,
                Token::In => CmpOp::In,
            },
        ));

        // comparison: operand { cmp_op operand }
        let comparison = operand
            .clone()
            .then(cmp_op.then(operand).repeated().collect::<Vec<_>>())
            .map(|(left, rest)| {
                if rest.is_empty() {
                    return left;
                }
                let end = rest.last().map_or(left.span.end, |(_, right)| right.span.end);
                let span = left.span.start..end;
                let (ops, comparators) = rest.into_iter().unzip();
                Expr::new(
                    ExprKind::Compare {
                        left: Box::new(left),
                        ops,
                        comparators,
                    },
                    span,
                )
            })
            .boxed();

        // not_test: { "not" } comparison
        let not_test = just(Token::Not)
            .map_with(|_, e| e.span())
            .repeated()
            .foldr(comparison, |not: Span, operand: Expr| {
                let span = not.start..operand.span.end;
                Expr::new(
                    ExprKind::UnaryOp {
                        op: UnaryOp::Not,
                        operand: Box::new(operand),
                    },
                    span,
                )
            })
            .boxed();

        let and_test = not_test
            .clone()
            .foldl(just(Token::And).ignore_then(not_test).repeated(), |left, right| {
                bool_chain(left, BoolOp::And, right)
            })
            .boxed();

        let or_test = and_test
            .clone()
            .foldl(just(Token::Or).ignore_then(and_test).repeated(), |left, right| {
                bool_chain(left, BoolOp::Or, right)
            })
            .boxed();

        // ternary: or_test [ "if" or_test "else" expr ]
        let ternary = or_test
            .clone()
            .then(
                just(Token::If)
                    .ignore_then(or_test)
                    .then_ignore(just(Token::Else))
                    .then(expr.clone())
                    .or_not(),
            )
            .map(|(body, tail)| match tail {
                Some((test, orelse)) => {
                    let span = body.span.start..orelse.span.end;
                    Expr::new(
                        ExprKind::IfExp {
                            test: Box::new(test),
                            body: Box::new(body),
                            orelse: Box::new(orelse),
                        },
                        span,
                    )
                }
                None => body,
            })
            .boxed();

        let lambda = just(Token::Lambda)
            .ignore_then(params_parser(expr.clone(), false))
            .then_ignore(just(Token::Colon))
            .then(expr.clone())
            .map_with(|(params, body), e| {
                Expr::new(
                    ExprKind::Lambda {
                        params,
                        body: Box::new(body),
                    },
                    to_range(e.span()),
                )
            });

        let walrus = ident_parser()
            .map_with(|name, e| Expr::new(ExprKind::Name(name), to_range(e.span())))
            .then_ignore(just(Token::ColonEq))
            .then(expr)
            .map_with(|(target, value), e| {
                Expr::new(
                    ExprKind::NamedExpr {
                        target: Box::new(target),
                        value: Box::new(value),
                    },
                    to_range(e.span()),
                )
            });

        choice((walrus, lambda, ternary))
            .labelled("expression")
            .boxed()
    })
}

/// Bitwise-or level and everything below it: the operand of comparisons.
///
/// Also serves as the grammar for assignment targets in `for` headers,
/// where a full expression would swallow the `in`.
fn operand_parser<'tokens, I, E>(expr: E) -> impl Parser<'tokens, I, Expr, Extra<'tokens>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
    E: Parser<'tokens, I, Expr, Extra<'tokens>> + Clone + 'tokens,
{
    recursive(move |operand| {
        let star_item = star_item_parser(expr.clone(), operand.clone());
        let comprehension = comprehension_parser(expr.clone(), operand.clone());
        let yield_expr = yield_parser(expr.clone(), operand.clone());

        // What may follow the first element of a (…), […] or {…} display.
        let element_tail = choice((
            comprehension.clone().map(ElementTail::Comprehension),
            just(Token::Comma)
                .ignore_then(
                    star_item
                        .clone()
                        .separated_by(just(Token::Comma))
                        .allow_trailing()
                        .collect::<Vec<_>>(),
                )
                .map(ElementTail::More),
            empty().to(ElementTail::Nothing),
        ))
        .boxed();

        let name = ident_parser().map_with(|name, e| Expr::new(ExprKind::Name(name), to_range(e.span())));

        let constant = select! {
            Token::Number(n) => Constant::Number(n),
            Token::True => Constant::Bool(true),
            Token::False => Constant::Bool(false),
            Token::NoneLit => Constant::None,
            Token::Ellipsis => Constant::Ellipsis,
        }
        .map_with(|c, e| Expr::new(ExprKind::Constant(c), to_range(e.span())));

        let strings = select! {
            Token::Str(s) => s,
        }
        .repeated()
        .at_least(1)
        .collect::<Vec<_>>()
        .map_with(|parts, e| Expr::new(ExprKind::Str(string_literal(parts)), to_range(e.span())));

        // ( … ): empty tuple, yield, generator expression, tuple, or grouping.
        let paren = choice((
            yield_expr.map(Some),
            star_item
                .clone()
                .then(element_tail.clone())
                .map_with(|(first, tail), e| {
                    let span = to_range(e.span());
                    match tail {
                        ElementTail::Comprehension(generators) => Expr::new(
                            ExprKind::GeneratorExp {
                                elt: Box::new(first),
                                generators,
                            },
                            span,
                        ),
                        ElementTail::More(rest) => {
                            let mut items = vec![first];
                            items.extend(rest);
                            Expr::new(ExprKind::Tuple(items), span)
                        }
                        ElementTail::Nothing => first,
                    }
                })
                .map(Some),
            empty().to(None),
        ))
        .delimited_by(just(Token::LParen), just(Token::RParen))
        .map_with(|inner, e| match inner {
            Some(expr) if !matches!(expr.kind, ExprKind::Tuple(_) | ExprKind::GeneratorExp { .. }) => {
                expr
            }
            Some(expr) => Expr::new(expr.kind, to_range(e.span())),
            None => Expr::new(ExprKind::Tuple(Vec::new()), to_range(e.span())),
        });

        let list = star_item
            .clone()
            .then(element_tail.clone())
            .or_not()
            .delimited_by(just(Token::LBracket), just(Token::RBracket))
            .map_with(|inner, e| {
                let kind = match inner {
                    None => ExprKind::List(Vec::new()),
                    Some((first, ElementTail::Comprehension(generators))) => ExprKind::ListComp {
                        elt: Box::new(first),
                        generators,
                    },
                    Some((first, ElementTail::More(rest))) => {
                        let mut items = vec![first];
                        items.extend(rest);
                        ExprKind::List(items)
                    }
                    Some((first, ElementTail::Nothing)) => ExprKind::List(vec![first]),
                };
                Expr::new(kind, to_range(e.span()))
            });

        // { … }: dict / set displays and comprehensions.
        let dict_item = choice((
            just(Token::DoubleStar)
                .ignore_then(operand.clone())
                .map(|value| (None, value)),
            expr.clone()
                .then_ignore(just(Token::Colon))
                .then(expr.clone())
                .map(|(key, value)| (Some(key), value)),
        ));
        let dict_rest = just(Token::Comma)
            .ignore_then(
                dict_item
                    .separated_by(just(Token::Comma))
                    .allow_trailing()
                    .collect::<Vec<_>>(),
            )
            .or_not()
            .map(Option::unwrap_or_default)
            .boxed();

        let brace_body = choice((
            just(Token::DoubleStar)
                .ignore_then(operand.clone())
                .then(dict_rest.clone())
                .map(|(value, rest)| {
                    let mut items = vec![(None, value)];
                    items.extend(rest);
                    ExprKind::Dict(items)
                }),
            expr.clone()
                .then_ignore(just(Token::Colon))
                .then(expr.clone())
                .then(choice((
                    comprehension.clone().map(Ok),
                    dict_rest.map(Err),
                )))
                .map(|((key, value), tail)| match tail {
                    Ok(generators) => ExprKind::DictComp {
                        key: Box::new(key),
                        value: Box::new(value),
                        generators,
                    },
                    Err(rest) => {
                        let mut items = vec![(Some(key), value)];
                        items.extend(rest);
                        ExprKind::Dict(items)
                    }
                }),
            star_item.clone().then(element_tail).map(|(first, tail)| match tail {
                ElementTail::Comprehension(generators) => ExprKind::SetComp {
                    elt: Box::new(first),
                    generators,
                },
                ElementTail::More(rest) => {
                    let mut items = vec![first];
                    items.extend(rest);
                    ExprKind::Set(items)
                }
                ElementTail::Nothing => ExprKind::Set(vec![first]),
            }),
            empty().to(ExprKind::Dict(Vec::new())),
        ))
        .boxed();

        let braces = brace_body
            .delimited_by(just(Token::LBrace), just(Token::RBrace))
            .map_with(|kind, e| Expr::new(kind, to_range(e.span())));

        let atom = choice((name, constant, strings, paren, list, braces))
            .labelled("atom")
            .boxed();

        // Subscripts: `a[i]`, `a[lo:hi:step]`, `a[i, j]`.
        let slice_tail = just(Token::Colon)
            .ignore_then(expr.clone().or_not())
            .then(just(Token::Colon).ignore_then(expr.clone().or_not()).or_not())
            .boxed();
        let make_slice = |lower: Option<Expr>, (upper, step): (Option<Expr>, Option<Option<Expr>>), span: Span| {
            Expr::new(
                ExprKind::Slice {
                    lower: lower.map(Box::new),
                    upper: upper.map(Box::new),
                    step: step.flatten().map(Box::new),
                },
                to_range(span),
            )
        };
        let subscript_item = choice((
            expr.clone()
                .then(slice_tail.clone().or_not())
                .map_with(move |(lower, tail), e| match tail {
                    Some(tail) => make_slice(Some(lower), tail, e.span()),
                    None => lower,
                }),
            slice_tail.map_with(move |tail, e| make_slice(None, tail, e.span())),
            just(Token::Star)
                .map_with(|_, e| e.span())
                .then(operand.clone())
                .map(|(star, inner)| starred(star, inner)),
        ));
        let subscript = expr_list_parser(subscript_item)
            .delimited_by(just(Token::LBracket), just(Token::RBracket));

        let trailer = choice((
            just(Token::Dot).ignore_then(ident_parser()).map(Trailer::Attr),
            call_args_parser(expr.clone(), operand.clone())
                .map(|(args, keywords)| Trailer::Call(args, keywords)),
            subscript.map(Trailer::Index),
        ))
        .map_with(|trailer, e| (trailer, e.span()));

        let primary = atom
            .foldl(trailer.repeated(), |value, (trailer, end): (Trailer, Span)| {
                let span = value.span.start..end.end;
                let kind = match trailer {
                    Trailer::Attr(attr) => ExprKind::Attribute {
                        value: Box::new(value),
                        attr,
                    },
                    Trailer::Call(args, keywords) => ExprKind::Call {
                        func: Box::new(value),
                        args,
                        keywords,
                    },
                    Trailer::Index(index) => ExprKind::Subscript {
                        value: Box::new(value),
                        index: Box::new(index),
                    },
                };
                Expr::new(kind, span)
            })
            .boxed();

        let await_primary = just(Token::Await)
            .map_with(|_, e| e.span())
            .or_not()
            .then(primary)
            .map(|(awaited, value)| match awaited {
                Some(keyword) => {
                    let span = keyword.start..value.span.end;
                    Expr::new(ExprKind::Await(Box::new(value)), span)
                }
                None => value,
            })
            .boxed();

        // factor: ("+" | "-" | "~") factor | await_primary [ "**" factor ]
        let factor = recursive(move |factor| {
            let power = await_primary
                .then(just(Token::DoubleStar).ignore_then(factor.clone()).or_not())
                .map(|(base, exponent)| match exponent {
                    Some(exponent) => binop(base, BinOp::Pow, exponent),
                    None => base,
                });

            let unary = select! {
                Token::Minus => UnaryOp::USub,
                Token::Plus => UnaryOp::UAdd,
                Token::Tilde => UnaryOp::Invert,
            }
            .map_with(|op, e| (op, e.span()))
            .then(factor)
            .map(|((op, start), operand): ((UnaryOp, Span), Expr)| {
                let span = start.start..operand.span.end;
                Expr::new(
                    ExprKind::UnaryOp {
                        op,
                        operand: Box::new(operand),
                    },
                    span,
                )
            });

            choice((unary, power)).boxed()
        });

        let term = binary_level(
            factor,
            select! {
                Token::Star => BinOp::Mult,
                Token::Slash => BinOp::Div,
                Token::DoubleSlash => BinOp::FloorDiv,
                Token::Percent => BinOp::Mod,
                Token::At => BinOp::MatMult,
            },
        );
        let arith = binary_level(
            term,
            select! {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
            },
        );
        let shift = binary_level(
            arith,
            select! {
                Token::LShift => BinOp::LShift,
                Token::RShift => BinOp::RShift,
            },
        );
        let bit_and = binary_level(shift, just(Token::Amp).to(BinOp::BitAnd));
        let bit_xor = binary_level(bit_and, just(Token::Caret).to(BinOp::BitXor));
        binary_level(bit_xor, just(Token::Pipe).to(BinOp::BitOr))
    })
    .boxed()
}

/// Simple statements on one logical line, separated by `;`.
fn simple_statements_parser<'tokens, I, E, O>(
    expr: E,
    operand: O,
) -> impl Parser<'tokens, I, Vec<Stmt>, Extra<'tokens>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
    E: Parser<'tokens, I, Expr, Extra<'tokens>> + Clone + 'tokens,
    O: Parser<'tokens, I, Expr, Extra<'tokens>> + Clone + 'tokens,
{
    let star_item = star_item_parser(expr.clone(), operand.clone());
    let expr_list = expr_list_parser(star_item.clone());
    let yield_expr = yield_parser(expr.clone(), operand.clone());
    let rhs = choice((yield_expr.clone(), expr_list.clone())).boxed();

    let dotted = ident_parser()
        .separated_by(just(Token::Dot))
        .at_least(1)
        .collect::<Vec<_>>()
        .map(|parts| parts.join("."))
        .boxed();

    let import = just(Token::Import)
        .ignore_then(
            dotted
                .clone()
                .then(just(Token::As).ignore_then(ident_parser()).or_not())
                .map(|(name, asname)| Alias { name, asname })
                .separated_by(just(Token::Comma))
                .at_least(1)
                .collect::<Vec<_>>(),
        )
        .map(StmtKind::Import);

    let plain_alias = ident_parser()
        .then(just(Token::As).ignore_then(ident_parser()).or_not())
        .map(|(name, asname)| Alias { name, asname });
    let from_names = choice((
        just(Token::Star).to(vec![Alias {
            name: "*".to_string(),
            asname: None,
        }]),
        plain_alias
            .clone()
            .separated_by(just(Token::Comma))
            .at_least(1)
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::LParen), just(Token::RParen)),
        plain_alias
            .separated_by(just(Token::Comma))
            .at_least(1)
            .collect::<Vec<_>>(),
    ));
    let relative_level = choice((just(Token::Dot).to(1usize), just(Token::Ellipsis).to(3usize)))
        .repeated()
        .collect::<Vec<_>>()
        .map(|dots| dots.into_iter().sum::<usize>());
    let from_import = just(Token::From)
        .ignore_then(relative_level)
        .then(dotted.or_not())
        .filter(|(level, module)| *level > 0 || module.is_some())
        .then_ignore(just(Token::Import))
        .then(from_names)
        .map(|((level, module), names)| StmtKind::ImportFrom {
            module,
            level,
            names,
        });

    let return_stmt = just(Token::Return)
        .ignore_then(expr_list.clone().or_not())
        .map(StmtKind::Return);

    let raise_stmt = just(Token::Raise)
        .ignore_then(
            expr.clone()
                .then(just(Token::From).ignore_then(expr.clone()).or_not())
                .or_not(),
        )
        .map(|raised| match raised {
            Some((exc, cause)) => StmtKind::Raise {
                exc: Some(exc),
                cause,
            },
            None => StmtKind::Raise {
                exc: None,
                cause: None,
            },
        });

    let del_stmt = just(Token::Del)
        .ignore_then(
            star_item
                .separated_by(just(Token::Comma))
                .at_least(1)
                .allow_trailing()
                .collect::<Vec<_>>(),
        )
        .map(StmtKind::Delete);

    let assert_stmt = just(Token::Assert)
        .ignore_then(expr.clone())
        .then(just(Token::Comma).ignore_then(expr.clone()).or_not())
        .map(|(test, msg)| StmtKind::Assert { test, msg });

    let names = ident_parser()
        .separated_by(just(Token::Comma))
        .at_least(1)
        .collect::<Vec<_>>()
        .boxed();
    let global_stmt = just(Token::Global)
        .ignore_then(names.clone())
        .map(StmtKind::Global);
    let nonlocal_stmt = just(Token::Nonlocal)
        .ignore_then(names)
        .map(StmtKind::Nonlocal);

    let type_alias = soft_keyword("type")
        .ignore_then(name_expr_parser())
        .then(type_params_parser(expr.clone()).or_not())
        .then_ignore(just(Token::Eq))
        .then(expr.clone())
        .map(|((name, type_params), value)| StmtKind::TypeAlias {
            name,
            type_params: type_params.unwrap_or_default(),
            value,
        });

    let aug_op = select! {
        Token::PlusEq => BinOp::Add,
        Token::MinusEq => BinOp::Sub,
        Token::StarEq => BinOp::Mult,
        Token::SlashEq => BinOp::Div,
        Token::DoubleSlashEq => BinOp::FloorDiv,
        Token::PercentEq => BinOp::Mod,
        Token::DoubleStarEq => BinOp::Pow,
        Token::AtEq => BinOp::MatMult,
        Token::AmpEq => BinOp::BitAnd,
        Token::PipeEq => BinOp::BitOr,
        Token::CaretEq => BinOp::BitXor,
        Token::LShiftEq => BinOp::LShift,
        Token::RShiftEq => BinOp::RShift,
    };

    // expression statement / assignment / augmented / annotated
    let expr_stmt = expr_list
        .then(choice((
            just(Token::Colon)
                .ignore_then(expr.clone())
                .then(just(Token::Eq).ignore_then(rhs.clone()).or_not())
                .map(|(annotation, value)| AssignTail::Annotated(annotation, value)),
            aug_op
                .then(rhs.clone())
                .map(|(op, value)| AssignTail::Augmented(op, value)),
            just(Token::Eq)
                .ignore_then(rhs)
                .repeated()
                .at_least(1)
                .collect::<Vec<_>>()
                .map(AssignTail::Chained),
            empty().to(AssignTail::Nothing),
        )))
        .map(|(first, tail)| match tail {
            AssignTail::Annotated(annotation, value) => StmtKind::AnnAssign {
                target: first,
                annotation,
                value,
            },
            AssignTail::Augmented(op, value) => StmtKind::AugAssign {
                target: first,
                op,
                value,
            },
            AssignTail::Chained(mut values) => match values.pop() {
                Some(value) => {
                    let mut targets = vec![first];
                    targets.extend(values);
                    StmtKind::Assign { targets, value }
                }
                None => StmtKind::Expr(first),
            },
            AssignTail::Nothing => StmtKind::Expr(first),
        });

    let small = choice((
        just(Token::Pass).to(StmtKind::Pass),
        just(Token::Break).to(StmtKind::Break),
        just(Token::Continue).to(StmtKind::Continue),
        return_stmt,
        raise_stmt,
        del_stmt,
        assert_stmt,
        global_stmt,
        nonlocal_stmt,
        import,
        from_import,
        yield_expr.map(StmtKind::Expr),
        type_alias,
        expr_stmt,
    ))
    .map_with(|kind, e| Stmt {
        kind,
        span: to_range(e.span()),
    })
    .labelled("statement")
    .boxed();

    small
        .separated_by(just(Token::Semi))
        .at_least(1)
        .allow_trailing()
        .collect::<Vec<_>>()
        .then_ignore(just(Token::Newline))
        .boxed()
}

/// Compound statements: if / while / for / try / with / match / def / class.
fn compound_parser<'tokens, I, E, O, S>(
    expr: E,
    operand: O,
    suite: S,
) -> impl Parser<'tokens, I, Stmt, Extra<'tokens>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
    E: Parser<'tokens, I, Expr, Extra<'tokens>> + Clone + 'tokens,
    O: Parser<'tokens, I, Expr, Extra<'tokens>> + Clone + 'tokens,
    S: Parser<'tokens, I, Vec<Stmt>, Extra<'tokens>> + Clone + 'tokens,
{
    let else_suite = just(Token::Else).ignore_then(suite.clone()).or_not().boxed();

    let if_stmt = just(Token::If)
        .ignore_then(expr.clone())
        .then(suite.clone())
        .then(
            just(Token::Elif)
                .map_with(|_, e| e.span())
                .then(expr.clone())
                .then(suite.clone())
                .repeated()
                .collect::<Vec<_>>(),
        )
        .then(else_suite.clone())
        .map(|(((test, body), elifs), orelse)| {
            // elif chains nest as `if` statements in the else branch
            let mut orelse = orelse.unwrap_or_default();
            for ((keyword, test), body) in elifs.into_iter().rev() {
                let end = orelse
                    .last()
                    .or(body.last())
                    .map_or(keyword.end, |stmt| stmt.span.end);
                orelse = vec![Stmt {
                    kind: StmtKind::If { test, body, orelse },
                    span: keyword.start..end,
                }];
            }
            StmtKind::If { test, body, orelse }
        })
        .labelled("if statement");

    let while_stmt = just(Token::While)
        .ignore_then(expr.clone())
        .then(suite.clone())
        .then(else_suite.clone())
        .map(|((test, body), orelse)| StmtKind::While {
            test,
            body,
            orelse: orelse.unwrap_or_default(),
        })
        .labelled("while loop");

    let for_stmt = just(Token::Async)
        .or_not()
        .then_ignore(just(Token::For))
        .then(target_list_parser(operand.clone()))
        .then_ignore(just(Token::In))
        .then(expr_list_parser(star_item_parser(expr.clone(), operand.clone())))
        .then(suite.clone())
        .then(else_suite.clone())
        .map(|((((is_async, target), iter), body), orelse)| StmtKind::For {
            target,
            iter,
            body,
            orelse: orelse.unwrap_or_default(),
            is_async: is_async.is_some(),
        })
        .labelled("for loop");

    let handler = just(Token::Except)
        .ignore_then(just(Token::Star).or_not())
        .then(
            expr.clone()
                .then(just(Token::As).ignore_then(ident_parser()).or_not())
                .or_not(),
        )
        .then(suite.clone())
        .map_with(|((star, header), body), e| {
            let (typ, name) = match header {
                Some((typ, name)) => (Some(typ), name),
                None => (None, None),
            };
            ExceptHandler {
                typ,
                is_star: star.is_some(),
                name,
                body,
                span: to_range(e.span()),
            }
        });
    let finally = just(Token::Finally).ignore_then(suite.clone()).boxed();
    let try_stmt = just(Token::Try)
        .ignore_then(suite.clone())
        .then(choice((
            handler
                .repeated()
                .at_least(1)
                .collect::<Vec<_>>()
                .then(else_suite)
                .then(finally.clone().or_not())
                .map(|((handlers, orelse), finalbody)| {
                    (
                        handlers,
                        orelse.unwrap_or_default(),
                        finalbody.unwrap_or_default(),
                    )
                }),
            finally.map(|finalbody| (Vec::new(), Vec::new(), finalbody)),
        )))
        .map(|(body, (handlers, orelse, finalbody))| StmtKind::Try {
            body,
            handlers,
            orelse,
            finalbody,
        })
        .labelled("try statement");

    let with_item = expr
        .clone()
        .then(just(Token::As).ignore_then(operand.clone()).or_not())
        .map(|(context, vars)| WithItem { context, vars });
    // `with (a as f, b as g):` unless the parentheses only group the first
    // context expression, as in `with (a) as f:`.
    let parenthesized_items = with_item
        .clone()
        .separated_by(just(Token::Comma))
        .at_least(1)
        .allow_trailing()
        .collect::<Vec<_>>()
        .delimited_by(just(Token::LParen), just(Token::RParen))
        .then_ignore(just(Token::Colon).rewind());
    let with_stmt = just(Token::Async)
        .or_not()
        .then_ignore(just(Token::With))
        .then(choice((
            parenthesized_items,
            with_item
                .separated_by(just(Token::Comma))
                .at_least(1)
                .collect::<Vec<_>>(),
        )))
        .then(suite.clone())
        .map(|((is_async, items), body)| StmtKind::With {
            items,
            body,
            is_async: is_async.is_some(),
        })
        .labelled("with statement");

    let case_clause = soft_keyword("case")
        .ignore_then(target_list_parser(operand.clone()))
        .then(just(Token::As).ignore_then(name_expr_parser()).or_not())
        .then(just(Token::If).ignore_then(expr.clone()).or_not())
        .then(suite.clone())
        .map_with(|(((pattern, binding), guard), body), e| MatchCase {
            pattern,
            binding,
            guard,
            body,
            span: to_range(e.span()),
        });
    let match_stmt = soft_keyword("match")
        .ignore_then(expr_list_parser(star_item_parser(expr.clone(), operand.clone())))
        .then_ignore(just(Token::Colon))
        .then_ignore(just(Token::Newline))
        .then_ignore(just(Token::Indent))
        .then(case_clause.repeated().at_least(1).collect::<Vec<_>>())
        .then_ignore(just(Token::Dedent))
        .map(|(subject, cases)| StmtKind::Match { subject, cases })
        .labelled("match statement");

    let function_def = just(Token::Async)
        .or_not()
        .then_ignore(just(Token::Def))
        .then(ident_parser())
        .then(type_params_parser(expr.clone()).or_not())
        .then(
            params_parser(expr.clone(), true)
                .delimited_by(just(Token::LParen), just(Token::RParen)),
        )
        .then(just(Token::Arrow).ignore_then(expr.clone()).or_not())
        .then(suite.clone())
        .map(|(((((is_async, name), type_params), params), returns), body)| {
            StmtKind::FunctionDef(Box::new(FunctionDef {
                name,
                type_params: type_params.unwrap_or_default(),
                params,
                returns,
                body,
                decorators: Vec::new(),
                is_async: is_async.is_some(),
            }))
        })
        .labelled("function definition");

    let class_def = just(Token::Class)
        .ignore_then(ident_parser())
        .then(type_params_parser(expr.clone()).or_not())
        .then(call_args_parser(expr.clone(), operand).or_not())
        .then(suite)
        .map(|(((name, type_params), args), body)| {
            let (bases, keywords) = args.unwrap_or_default();
            StmtKind::ClassDef(Box::new(ClassDef {
                name,
                type_params: type_params.unwrap_or_default(),
                bases,
                keywords,
                body,
                decorators: Vec::new(),
            }))
        })
        .labelled("class definition");

    let decorated = just(Token::At)
        .ignore_then(expr)
        .then_ignore(just(Token::Newline))
        .repeated()
        .collect::<Vec<_>>()
        .then(choice((function_def, class_def)))
        .map(|(decorators, mut kind)| {
            match &mut kind {
                StmtKind::FunctionDef(def) => def.decorators = decorators,
                StmtKind::ClassDef(def) => def.decorators = decorators,
                _ => {}
            }
            kind
        });

    choice((if_stmt, while_stmt, try_stmt, for_stmt, with_stmt, match_stmt, decorated))
        .map_with(|kind, e| Stmt {
            kind,
            span: to_range(e.span()),
        })
        .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> Module {
        match parse(source) {
            Ok(module) => module,
            Err(errs) => panic!("failed to parse {:?}: {:?}", source, errs),
        }
    }

    fn parse_err(source: &str) -> String {
        parse(source).unwrap_err().remove(0).message
    }

    fn only_expr(source: &str) -> Expr {
        let mut module = parse_ok(source);
        match module.body.remove(0).kind {
            StmtKind::Expr(expr) => expr,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn empty_source_is_empty_module() {
        assert!(parse_ok("").body.is_empty());
        assert!(parse_ok("\n\n# only a comment\n").body.is_empty());
    }

    #[test]
    fn assignment_forms() {
        let module = parse_ok("a = b = 1\nx += 2\ny: int = 3\nz: str\np, *q = items\n");
        let kinds: Vec<_> = module.body.iter().map(|s| s.keyword()).collect();
        assert_eq!(
            kinds,
            vec!["assignment", "augmented assignment", "assignment", "assignment", "assignment"]
        );
        match &module.body[0].kind {
            StmtKind::Assign { targets, .. } => assert_eq!(targets.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
        match &module.body[4].kind {
            StmtKind::Assign { targets, .. } => {
                assert!(matches!(targets[0].kind, ExprKind::Tuple(ref items) if items.len() == 2))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn precedence_and_chaining() {
        let expr = only_expr("1 + 2 * 3\n");
        match expr.kind {
            ExprKind::BinOp { op, right, .. } => {
                assert_eq!(op, BinOp::Add);
                assert!(matches!(right.kind, ExprKind::BinOp { op: BinOp::Mult, .. }));
            }
            other => panic!("unexpected {:?}", other),
        }

        let expr = only_expr("a and b and c or d\n");
        match expr.kind {
            ExprKind::BoolOp { op, values } => {
                assert_eq!(op, BoolOp::Or);
                assert!(matches!(&values[0].kind, ExprKind::BoolOp { values, .. } if values.len() == 3));
            }
            other => panic!("unexpected {:?}", other),
        }

        let expr = only_expr("0 < x <= 10 is not None\n");
        match expr.kind {
            ExprKind::Compare { ops, .. } => {
                assert_eq!(ops, vec![CmpOp::Lt, CmpOp::LtE, CmpOp::IsNot])
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unary_binds_looser_than_power() {
        let expr = only_expr("-2 ** 2\n");
        assert!(matches!(expr.kind, ExprKind::UnaryOp { op: UnaryOp::USub, .. }));
        let expr = only_expr("not x in y\n");
        assert!(matches!(expr.kind, ExprKind::UnaryOp { op: UnaryOp::Not, .. }));
    }

    #[test]
    fn calls_attributes_and_subscripts() {
        let expr = only_expr("os.path.join(a, *rest, sep='/', **kw)[1:2]\n");
        let ExprKind::Subscript { value, index } = expr.kind else {
            panic!("expected subscript");
        };
        assert!(matches!(index.kind, ExprKind::Slice { .. }));
        let ExprKind::Call { func, args, keywords } = value.kind else {
            panic!("expected call");
        };
        assert_eq!(func.dotted_name().as_deref(), Some("os.path.join"));
        assert_eq!(args.len(), 2);
        assert_eq!(keywords.len(), 2);
        assert_eq!(keywords[0].arg.as_deref(), Some("sep"));
        assert!(keywords[1].arg.is_none());
    }

    #[test]
    fn displays_and_comprehensions() {
        assert!(matches!(only_expr("()\n").kind, ExprKind::Tuple(ref v) if v.is_empty()));
        assert!(matches!(only_expr("(1,)\n").kind, ExprKind::Tuple(ref v) if v.len() == 1));
        assert!(matches!(only_expr("(1)\n").kind, ExprKind::Constant(_)));
        assert!(matches!(only_expr("[x for x in y if x]\n").kind, ExprKind::ListComp { .. }));
        assert!(matches!(only_expr("{k: v for k, v in d.items()}\n").kind, ExprKind::DictComp { .. }));
        assert!(matches!(only_expr("{a for a in b}\n").kind, ExprKind::SetComp { .. }));
        assert!(matches!(only_expr("{1, 2}\n").kind, ExprKind::Set(_)));
        assert!(matches!(only_expr("{}\n").kind, ExprKind::Dict(ref v) if v.is_empty()));
        assert!(matches!(only_expr("{'a': 1, **rest}\n").kind, ExprKind::Dict(ref v) if v.len() == 2));
        assert!(matches!(only_expr("sum(x for x in y)\n").kind, ExprKind::Call { ref args, .. } if matches!(args[0].kind, ExprKind::GeneratorExp { .. })));
    }

    #[test]
    fn lambda_ternary_and_walrus() {
        assert!(matches!(only_expr("lambda x, y=1: x + y\n").kind, ExprKind::Lambda { ref params, .. } if params.len() == 2));
        assert!(matches!(only_expr("a if c else b\n").kind, ExprKind::IfExp { .. }));
        assert!(matches!(only_expr("(n := len(a))\n").kind, ExprKind::NamedExpr { .. }));
    }

    #[test]
    fn strings_and_fstrings() {
        let ExprKind::Str(lit) = only_expr("'a' f\"{name!r} {{x}} {obj.attr:>{width}}\"\n").kind else {
            panic!("expected string");
        };
        assert_eq!(lit.parts.len(), 2);
        assert!(lit.is_fstring);
        assert_eq!(lit.holes, vec!["name", "obj", "width"]);
    }

    #[test]
    fn compound_statements() {
        let source = "\
@decorator
async def f(a, /, b: int = 1, *args, c, **kw) -> int:
    if a:
        return 1
    elif b:
        pass
    else:
        raise ValueError('x') from None
    for i, j in pairs:
        continue
    else:
        pass
    while True:
        break
    try:
        x = 1
    except (KeyError, IndexError) as err:
        pass
    except Exception:
        pass
    finally:
        pass
    with open(p) as fh, lock:
        pass
    return 0

class A(Base, metaclass=Meta):
    x = 1
";
        let module = parse_ok(source);
        assert_eq!(module.body.len(), 2);
        let StmtKind::FunctionDef(def) = &module.body[0].kind else {
            panic!("expected def");
        };
        assert!(def.is_async);
        assert_eq!(def.decorators.len(), 1);
        let kinds: Vec<_> = def.params.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ParamKind::PositionalOnly,
                ParamKind::Normal,
                ParamKind::VarArgs,
                ParamKind::KeywordOnly,
                ParamKind::KwArgs,
            ]
        );
        let StmtKind::If { orelse, .. } = &def.body[0].kind else {
            panic!("expected if");
        };
        assert!(matches!(orelse[0].kind, StmtKind::If { .. }));
        let StmtKind::ClassDef(class) = &module.body[1].kind else {
            panic!("expected class");
        };
        assert_eq!(class.bases.len(), 1);
        assert_eq!(class.keywords.len(), 1);
    }

    #[test]
    fn match_statement() {
        let source = "\
match command.split():
    case [\"go\", direction] if direction:
        move(direction)
    case Point(x=0) | None as p:
        pass
    case {\"id\": 1, **rest}:
        pass
    case _:
        pass
";
        let module = parse_ok(source);
        assert_eq!(module.body[0].keyword(), "match");
        let StmtKind::Match { subject, cases } = &module.body[0].kind else {
            panic!("expected match");
        };
        assert!(matches!(subject.kind, ExprKind::Call { .. }));
        assert_eq!(cases.len(), 4);
        assert!(cases[0].guard.is_some());
        assert!(matches!(cases[0].pattern.kind, ExprKind::List(ref items) if items.len() == 2));
        assert!(matches!(cases[1].pattern.kind, ExprKind::BinOp { op: BinOp::BitOr, .. }));
        assert_eq!(cases[1].binding.as_ref().and_then(Expr::as_name), Some("p"));
        assert!(matches!(cases[2].pattern.kind, ExprKind::Dict(ref items) if items.len() == 2));
        assert_eq!(cases[3].pattern.as_name(), Some("_"));
        assert_eq!(module.body[0].blocks().len(), 4);
    }

    #[test]
    fn soft_keywords_stay_names() {
        let module = parse_ok("match = re.match(p, s)\nmatch(x)\nprint(match.group(0))\ntype = 1\ntype(x)\n");
        let kinds: Vec<_> = module.body.iter().map(|s| s.keyword()).collect();
        assert_eq!(
            kinds,
            vec!["assignment", "expression", "expression", "assignment", "expression"]
        );
    }

    #[test]
    fn exception_groups_and_parenthesized_with() {
        let source = "\
try:
    run()
except* ValueError as group:
    pass
with (open(a) as src, open(b) as dst,):
    pass
with (lock) as held:
    pass
";
        let module = parse_ok(source);
        let StmtKind::Try { handlers, .. } = &module.body[0].kind else {
            panic!("expected try");
        };
        assert!(handlers[0].is_star);
        assert_eq!(handlers[0].name.as_deref(), Some("group"));

        let StmtKind::With { items, .. } = &module.body[1].kind else {
            panic!("expected with");
        };
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|item| item.vars.is_some()));

        let StmtKind::With { items, .. } = &module.body[2].kind else {
            panic!("expected with");
        };
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].vars.as_ref().and_then(Expr::as_name), Some("held"));
    }

    #[test]
    fn type_parameters_and_aliases() {
        let source = "\
def first[T: Hashable, *Ts, **P](x: T) -> T:
    return x

class Box[T](Base[T]):
    pass

type Grid[N] = list[list[N]]
";
        let module = parse_ok(source);
        let StmtKind::FunctionDef(def) = &module.body[0].kind else {
            panic!("expected def");
        };
        let names: Vec<_> = def.type_params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["T", "Ts", "P"]);
        assert!(def.type_params[0].bound.is_some());
        assert_eq!(def.params.len(), 1);

        let StmtKind::ClassDef(class) = &module.body[1].kind else {
            panic!("expected class");
        };
        assert_eq!(class.type_params.len(), 1);
        assert_eq!(class.bases.len(), 1);

        assert_eq!(module.body[2].keyword(), "type");
        let StmtKind::TypeAlias { name, type_params, .. } = &module.body[2].kind else {
            panic!("expected type alias");
        };
        assert_eq!(name.as_name(), Some("Grid"));
        assert_eq!(type_params.len(), 1);
    }

    #[test]
    fn imports() {
        let module = parse_ok("import os.path as p, sys\nfrom . import a\nfrom ..pkg.mod import (b as c, d,)\nfrom m import *\n");
        match &module.body[0].kind {
            StmtKind::Import(aliases) => {
                assert_eq!(aliases[0].name, "os.path");
                assert_eq!(aliases[0].bound_name(), "p");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(&module.body[1].kind, StmtKind::ImportFrom { level: 1, module: None, .. }));
        assert!(matches!(&module.body[2].kind, StmtKind::ImportFrom { level: 2, names, .. } if names.len() == 2));
        assert!(matches!(&module.body[3].kind, StmtKind::ImportFrom { names, .. } if names[0].name == "*"));
    }

    #[test]
    fn simple_statements_share_a_line() {
        let module = parse_ok("x = 1; y = 2;\nif x: print(x); print(y)\n");
        assert_eq!(module.body.len(), 3);
        let StmtKind::If { body, .. } = &module.body[2].kind else {
            panic!("expected if");
        };
        assert_eq!(body.len(), 2);
    }

    #[test]
    fn statement_spans_start_at_their_line() {
        let source = "x = 1\n\ndef f():\n    return x\n";
        let module = parse_ok(source);
        assert_eq!(&source[module.body[0].span.clone()], "x = 1");
        assert_eq!(module.body[1].span.start, source.find("def").unwrap());
    }

    #[test]
    fn error_vocabulary() {
        assert_eq!(parse_err("x = 1\n    y = 2\n"), "unexpected indent");
        assert_eq!(parse_err("if x:\nprint(1)\n"), "expected an indented block");
        assert_eq!(parse_err("def f():\n"), "expected an indented block");
        assert_eq!(parse_err("if x\n    pass\n"), "invalid syntax");
        assert_eq!(parse_err("print 'hello'\n"), "invalid syntax");
    }

    #[test]
    fn invalid_targets() {
        assert_eq!(parse_err("f() = 1\n"), "cannot assign to function call");
        assert_eq!(parse_err("1 = x\n"), "cannot assign to literal");
        assert_eq!(parse_err("for a + b in c:\n    pass\n"), "cannot assign to expression");
        assert_eq!(
            parse_err("a, b += 1\n"),
            "'tuple' is an illegal expression for augmented assignment"
        );
    }

    #[test]
    fn lexer_errors_pass_through() {
        assert_eq!(parse_err("print(1\n"), "'(' was never closed");
    }
}
