//! Lexer for candidate Python source.
//!
//! Tokenization happens in two steps:
//!
//! 1. **logos** scans physical tokens. Whitespace, comments and backslash
//!    line continuations are skipped; newlines survive as `Newline`.
//! 2. A **layout pass** turns physical lines into logical lines. Newlines
//!    inside brackets and on blank lines are dropped, and changes in leading
//!    whitespace become `Indent` / `Dedent` tokens so the parser can treat
//!    blocks like braces.
//!
//! The layout pass also records one [`LogicalLine`] per logical line, which
//! the indentation check walks instead of re-reading raw text (so
//! continuation lines and string bodies are never mistaken for code).

use std::fmt;

use logos::Logos;

use crate::span::{LineIndex, Span};

/// Python token.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\x0c]+")]
#[logos(skip(r"#[^\r\n]*", allow_greedy = true))]
#[logos(skip r"\\\r?\n")]
#[logos(skip "\u{FEFF}")]
pub enum Token {
    // === Keywords ===
    #[token("False")]
    False,
    #[token("None")]
    NoneLit,
    #[token("True")]
    True,
    #[token("and")]
    And,
    #[token("as")]
    As,
    #[token("assert")]
    Assert,
    #[token("async")]
    Async,
    #[token("await")]
    Await,
    #[token("break")]
    Break,
    #[token("class")]
    Class,
    #[token("continue")]
    Continue,
    #[token("def")]
    Def,
    #[token("del")]
    Del,
    #[token("elif")]
    Elif,
    #[token("else")]
    Else,
    #[token("except")]
    Except,
    #[token("finally")]
    Finally,
    #[token("for")]
    For,
    #[token("from")]
    From,
    #[token("global")]
    Global,
    #[token("if")]
    If,
    #[token("import")]
    Import,
    #[token("in")]
    In,
    #[token("is")]
    Is,
    #[token("lambda")]
    Lambda,
    #[token("nonlocal")]
    Nonlocal,
    #[token("not")]
    Not,
    #[token("or")]
    Or,
    #[token("pass")]
    Pass,
    #[token("raise")]
    Raise,
    #[token("return")]
    Return,
    #[token("try")]
    Try,
    #[token("while")]
    While,
    #[token("with")]
    With,
    #[token("yield")]
    Yield,

    // === Delimiters ===
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(";")]
    Semi,
    #[token(".")]
    Dot,
    #[token("...")]
    Ellipsis,
    #[token("->")]
    Arrow,
    #[token(":=")]
    ColonEq,
    #[token("@")]
    At,
    #[token("=")]
    Eq,

    // === Operators ===
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("//")]
    DoubleSlash,
    #[token("%")]
    Percent,
    #[token("**")]
    DoubleStar,
    #[token("<<")]
    LShift,
    #[token(">>")]
    RShift,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,

    // === Augmented assignment ===
    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token("*=")]
    StarEq,
    #[token("/=")]
    SlashEq,
    #[token("//=")]
    DoubleSlashEq,
    #[token("%=")]
    PercentEq,
    #[token("**=")]
    DoubleStarEq,
    #[token("@=")]
    AtEq,
    #[token("&=")]
    AmpEq,
    #[token("|=")]
    PipeEq,
    #[token("^=")]
    CaretEq,
    #[token("<<=")]
    LShiftEq,
    #[token(">>=")]
    RShiftEq,

    // === Literals ===
    /// Numeric literal, kept as written (underscores, prefixes, suffixes).
    #[regex(r"[0-9][0-9_]*(\.[0-9_]*)?([eE][+-]?[0-9_]+)?[jJ]?", |lex| lex.slice().to_string())]
    #[regex(r"\.[0-9][0-9_]*([eE][+-]?[0-9_]+)?[jJ]?", |lex| lex.slice().to_string())]
    #[regex(r"0[xX][0-9a-fA-F_]+", |lex| lex.slice().to_string())]
    #[regex(r"0[oO][0-7_]+", |lex| lex.slice().to_string())]
    #[regex(r"0[bB][01_]+", |lex| lex.slice().to_string())]
    Number(String),

    /// String or bytes literal including prefix and quotes.
    #[regex(r#"([rRbBuUfF][rRbBuUfF]?)?"([^"\\\r\n]|\\(.|\r?\n))*""#, |lex| lex.slice().to_string())]
    #[regex(r#"([rRbBuUfF][rRbBuUfF]?)?'([^'\\\r\n]|\\(.|\r?\n))*'"#, |lex| lex.slice().to_string())]
    #[regex(r#"([rRbBuUfF][rRbBuUfF]?)?"""([^"\\]|\\(.|\n)|"([^"\\]|\\(.|\n))|""([^"\\]|\\(.|\n)))*""""#, |lex| lex.slice().to_string())]
    #[regex(r#"([rRbBuUfF][rRbBuUfF]?)?'''([^'\\]|\\(.|\n)|'([^'\\]|\\(.|\n))|''([^'\\]|\\(.|\n)))*'''"#, |lex| lex.slice().to_string())]
    Str(String),

    /// Identifier (keywords take priority).
    #[regex(r"[_\p{XID_Start}][\p{XID_Continue}]*", |lex| lex.slice().to_string())]
    Ident(String),

    /// End of a logical line.
    #[regex(r"\r?\n")]
    Newline,

    // === Layout (synthesized by the layout pass, never scanned) ===
    Indent,
    Dedent,
}

impl Token {
    /// True for the tokens that open a bracket pair.
    fn opening_bracket(&self) -> Option<char> {
        match self {
            Token::LParen => Some('('),
            Token::LBracket => Some('['),
            Token::LBrace => Some('{'),
            _ => None,
        }
    }

    fn closing_bracket(&self) -> Option<char> {
        match self {
            Token::RParen => Some(')'),
            Token::RBracket => Some(']'),
            Token::RBrace => Some('}'),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Token::False => "False",
            Token::NoneLit => "None",
            Token::True => "True",
            Token::And => "and",
            Token::As => "as",
            Token::Assert => "assert",
            Token::Async => "async",
            Token::Await => "await",
            Token::Break => "break",
            Token::Class => "class",
            Token::Continue => "continue",
            Token::Def => "def",
            Token::Del => "del",
            Token::Elif => "elif",
            Token::Else => "else",
            Token::Except => "except",
            Token::Finally => "finally",
            Token::For => "for",
            Token::From => "from",
            Token::Global => "global",
            Token::If => "if",
            Token::Import => "import",
            Token::In => "in",
            Token::Is => "is",
            Token::Lambda => "lambda",
            Token::Nonlocal => "nonlocal",
            Token::Not => "not",
            Token::Or => "or",
            Token::Pass => "pass",
            Token::Raise => "raise",
            Token::Return => "return",
            Token::Try => "try",
            Token::While => "while",
            Token::With => "with",
            Token::Yield => "yield",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::Comma => ",",
            Token::Colon => ":",
            Token::Semi => ";",
            Token::Dot => ".",
            Token::Ellipsis => "...",
            Token::Arrow => "->",
            Token::ColonEq => ":=",
            Token::At => "@",
            Token::Eq => "=",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::DoubleSlash => "//",
            Token::Percent => "%",
            Token::DoubleStar => "**",
            Token::LShift => "<<",
            Token::RShift => ">>",
            Token::Amp => "&",
            Token::Pipe => "|",
            Token::Caret => "^",
            Token::Tilde => "~",
            Token::Lt => "<",
            Token::Gt => ">",
            Token::LtEq => "<=",
            Token::GtEq => ">=",
            Token::EqEq => "==",
            Token::NotEq => "!=",
            Token::PlusEq => "+=",
            Token::MinusEq => "-=",
            Token::StarEq => "*=",
            Token::SlashEq => "/=",
            Token::DoubleSlashEq => "//=",
            Token::PercentEq => "%=",
            Token::DoubleStarEq => "**=",
            Token::AtEq => "@=",
            Token::AmpEq => "&=",
            Token::PipeEq => "|=",
            Token::CaretEq => "^=",
            Token::LShiftEq => "<<=",
            Token::RShiftEq => ">>=",
            Token::Number(n) => return write!(f, "{}", n),
            Token::Str(s) => return write!(f, "{}", s),
            Token::Ident(name) => return write!(f, "{}", name),
            Token::Newline => "NEWLINE",
            Token::Indent => "INDENT",
            Token::Dedent => "DEDENT",
        };
        write!(f, "{}", text)
    }
}

/// A token with its byte span in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub span: Span,
}

/// A lexing failure with a Python-style message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub span: Span,
    pub message: String,
}

/// One logical line as seen by the layout pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
    /// 1-based physical line where the logical line starts.
    pub line: usize,
    /// Leading whitespace exactly as written.
    pub indent: String,
    /// True when the last token of the line is `:` (a block follows).
    pub opens_block: bool,
}

/// Output of [`tokenize`]: the layout-resolved token stream plus line info.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenStream {
    pub tokens: Vec<Spanned>,
    pub logical_lines: Vec<LogicalLine>,
}

/// Tokenize Python source into a layout-resolved token stream.
///
/// Returns every scan error found; layout errors (bad dedent, bracket
/// mismatch) stop the pass at the first one.
pub fn tokenize(source: &str) -> Result<TokenStream, Vec<LexError>> {
    let lines = LineIndex::new(source);
    let mut raw = Vec::new();
    let mut errors = Vec::new();

    let mut lexer = Token::lexer(source);
    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => raw.push(Spanned { token, span }),
            Err(()) => errors.push(classify_scan_error(source, &lines, span)),
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    layout(source, &lines, raw).map_err(|e| vec![e])
}

/// Turn a logos failure into a message close to what CPython reports.
fn classify_scan_error(source: &str, lines: &LineIndex, span: Span) -> LexError {
    let slice = source.get(span.clone()).unwrap_or_default();
    let unprefixed = slice.trim_start_matches(['r', 'R', 'b', 'B', 'u', 'U', 'f', 'F']);
    let line = lines.line(span.start);
    // An unterminated `"""` scans as an empty `""` followed by a bad `"`.
    let before = source.get(span.start.saturating_sub(2)..span.start).unwrap_or_default();
    let split_triple = (before == "\"\"" && unprefixed.starts_with('"'))
        || (before == "''" && unprefixed.starts_with('\''));

    let message = if split_triple
        || unprefixed.starts_with("\"\"\"")
        || unprefixed.starts_with("'''")
    {
        format!("unterminated triple-quoted string literal (detected at line {})", line)
    } else if unprefixed.starts_with('"') || unprefixed.starts_with('\'') {
        format!("unterminated string literal (detected at line {})", line)
    } else {
        match slice.chars().next() {
            Some(c) if c.is_control() => {
                format!("invalid non-printable character U+{:04X}", c as u32)
            }
            Some(c) if c.is_ascii() => "invalid syntax".to_string(),
            Some(c) => format!("invalid character '{}' (U+{:04X})", c, c as u32),
            None => "invalid syntax".to_string(),
        }
    };

    LexError { span, message }
}

/// Leading whitespace of the physical line containing `offset`, plus its
/// width with tabs advancing to the next multiple of 8.
fn leading_whitespace(source: &str, offset: usize) -> (String, usize) {
    let line_start = source[..offset].rfind('\n').map_or(0, |i| i + 1);
    let text = &source[line_start..offset];
    let mut width = 0;
    for ch in text.chars() {
        match ch {
            ' ' => width += 1,
            '\t' => width = (width / 8 + 1) * 8,
            '\x0c' => width = 0,
            _ => {}
        }
    }
    let indent: String = text.chars().filter(|c| matches!(c, ' ' | '\t')).collect();
    (indent, width)
}

fn layout(source: &str, lines: &LineIndex, raw: Vec<Spanned>) -> Result<TokenStream, LexError> {
    let mut tokens: Vec<Spanned> = Vec::with_capacity(raw.len() + 8);
    let mut logical_lines: Vec<LogicalLine> = Vec::new();
    let mut indents: Vec<usize> = vec![0];
    let mut brackets: Vec<(char, Span)> = Vec::new();
    let mut at_line_start = true;

    for Spanned { token, span } in raw {
        if token == Token::Newline {
            if at_line_start || !brackets.is_empty() {
                continue;
            }
            close_logical_line(&tokens, &mut logical_lines);
            tokens.push(Spanned { token, span });
            at_line_start = true;
            continue;
        }

        if at_line_start {
            let (indent, width) = leading_whitespace(source, span.start);
            let here = span.start..span.start;
            let top = indents.last().copied().unwrap_or(0);

            if width > top {
                indents.push(width);
                tokens.push(Spanned {
                    token: Token::Indent,
                    span: here,
                });
            } else if width < top {
                while indents.last().is_some_and(|&level| level > width) {
                    indents.pop();
                    tokens.push(Spanned {
                        token: Token::Dedent,
                        span: here.clone(),
                    });
                }
                if indents.last().copied().unwrap_or(0) != width {
                    return Err(LexError {
                        span,
                        message: "unindent does not match any outer indentation level".to_string(),
                    });
                }
            }

            logical_lines.push(LogicalLine {
                line: lines.line(span.start),
                indent,
                opens_block: false,
            });
            at_line_start = false;
        }

        if let Some(open) = token.opening_bracket() {
            brackets.push((open, span.clone()));
        } else if let Some(close) = token.closing_bracket() {
            match brackets.pop() {
                None => {
                    return Err(LexError {
                        span,
                        message: format!("unmatched '{}'", close),
                    });
                }
                Some((open, _)) if !brackets_pair(open, close) => {
                    return Err(LexError {
                        span,
                        message: format!(
                            "closing parenthesis '{}' does not match opening parenthesis '{}'",
                            close, open
                        ),
                    });
                }
                Some(_) => {}
            }
        }

        tokens.push(Spanned { token, span });
    }

    if let Some((open, span)) = brackets.pop() {
        return Err(LexError {
            span,
            message: format!("'{}' was never closed", open),
        });
    }

    let end = source.len()..source.len();
    if !at_line_start {
        close_logical_line(&tokens, &mut logical_lines);
        tokens.push(Spanned {
            token: Token::Newline,
            span: end.clone(),
        });
    }
    while indents.len() > 1 {
        indents.pop();
        tokens.push(Spanned {
            token: Token::Dedent,
            span: end.clone(),
        });
    }

    Ok(TokenStream {
        tokens,
        logical_lines,
    })
}

fn close_logical_line(tokens: &[Spanned], logical_lines: &mut [LogicalLine]) {
    if let Some(current) = logical_lines.last_mut() {
        current.opens_block = matches!(tokens.last(), Some(Spanned { token: Token::Colon, .. }));
    }
}

fn brackets_pair(open: char, close: char) -> bool {
    matches!((open, close), ('(', ')') | ('[', ']') | ('{', '}'))
}
