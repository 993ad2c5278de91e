//! Tree builder: source text in, syntax tree or positioned failure out.
//!
//! A validation pass asks for the tree several times (the syntax pass, the
//! logic pass and the suggestion engine each need it), so [`TreeBuilder`]
//! memoizes outcomes by content hash. Failures are cached too: re-parsing
//! broken input is as expensive as parsing good input.

use std::fmt;
use std::sync::Arc;

use crate::ast::Module;
use crate::cache::{BoundedCache, CacheStats, ContentHash};
use crate::lexer::{self, LogicalLine};
use crate::parser::{self, ParseError};
use crate::span::LineIndex;

/// Why the source could not be turned into a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxFailure {
    pub message: String,
    /// 1-based line.
    pub line: usize,
    /// 1-based column, in characters.
    pub column: usize,
}

impl fmt::Display for SyntaxFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (line {}, column {})", self.message, self.line, self.column)
    }
}

impl std::error::Error for SyntaxFailure {}

/// A successfully parsed module plus the layout facts detectors need.
#[derive(Debug, Clone)]
pub struct Tree {
    pub module: Module,
    pub lines: LineIndex,
    pub logical_lines: Vec<LogicalLine>,
}

impl Tree {
    /// 1-based line of a byte offset.
    pub fn line_of(&self, offset: usize) -> usize {
        self.lines.line(offset)
    }
}

pub type ParseOutcome = Result<Tree, SyntaxFailure>;

/// Parse `source` without caching.
pub fn build_tree(source: &str) -> ParseOutcome {
    let lines = LineIndex::new(source);

    let stream = lexer::tokenize(source).map_err(|errs| {
        let first = errs.into_iter().next();
        failure(source, &lines, first.map(|e| ParseError {
            span: e.span,
            message: e.message,
        }))
    })?;

    let module = parser::parse_tokens(&stream, source.len())
        .map_err(|errs| failure(source, &lines, errs.into_iter().next()))?;

    Ok(Tree {
        module,
        lines,
        logical_lines: stream.logical_lines,
    })
}

fn failure(source: &str, lines: &LineIndex, error: Option<ParseError>) -> SyntaxFailure {
    let Some(error) = error else {
        return SyntaxFailure {
            message: "invalid syntax".to_string(),
            line: 1,
            column: 1,
        };
    };
    // Errors at end of input point at the last line that has content.
    let offset = error.span.start.min(source.trim_end().len());
    let (line, column) = lines.position(source, offset);
    SyntaxFailure {
        message: error.message,
        line,
        column,
    }
}

/// Memoizing front end to [`build_tree`].
#[derive(Debug)]
pub struct TreeBuilder {
    cache: BoundedCache<ContentHash, Arc<ParseOutcome>>,
}

impl TreeBuilder {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: BoundedCache::new(capacity),
        }
    }

    /// Parse `source`, reusing an earlier outcome for identical text.
    pub fn parse(&self, source: &str) -> Arc<ParseOutcome> {
        self.cache
            .get_or_insert_with(ContentHash::of(source), || {
                tracing::debug!(bytes = source.len(), "parsing");
                Arc::new(build_tree(source))
            })
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear(&self) {
        self.cache.clear();
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new(crate::cache::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_tree_with_layout() {
        let tree = build_tree("def f(x):\n    return x\n").unwrap();
        assert_eq!(tree.module.body.len(), 1);
        assert_eq!(tree.logical_lines.len(), 2);
        assert!(tree.logical_lines[0].opens_block);
    }

    #[test]
    fn failure_carries_position() {
        let failure = build_tree("x = 1\ny = (2 +\n").unwrap_err();
        assert_eq!(failure.message, "'(' was never closed");
        assert_eq!((failure.line, failure.column), (2, 5));
    }

    #[test]
    fn end_of_input_errors_point_at_last_content_line() {
        let failure = build_tree("def f():\n\n\n").unwrap_err();
        assert_eq!(failure.message, "expected an indented block");
        assert_eq!(failure.line, 1);
    }

    #[test]
    fn unexpected_indent_position() {
        let failure = build_tree("x = 1\n    y = 2\n").unwrap_err();
        assert_eq!(failure.message, "unexpected indent");
        assert_eq!(failure.line, 2);
    }

    #[test]
    fn display_includes_position() {
        let failure = SyntaxFailure {
            message: "invalid syntax".into(),
            line: 3,
            column: 7,
        };
        assert_eq!(failure.to_string(), "invalid syntax (line 3, column 7)");
    }

    #[test]
    fn builder_parses_each_text_once() {
        let builder = TreeBuilder::new(8);
        let first = builder.parse("x = 1\n");
        let second = builder.parse("x = 1\n");
        assert!(Arc::ptr_eq(&first, &second));
        let broken = builder.parse("x = (\n");
        assert!(broken.is_err());
        let stats = builder.stats();
        assert_eq!((stats.hits, stats.misses, stats.len), (1, 2, 2));
    }

    #[test]
    fn builder_clear_forces_reparse() {
        let builder = TreeBuilder::new(8);
        let first = builder.parse("x = 1\n");
        builder.clear();
        let second = builder.parse("x = 1\n");
        assert!(!Arc::ptr_eq(&first, &second));
    }
}
