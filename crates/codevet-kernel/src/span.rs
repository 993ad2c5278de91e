//! Byte spans and line lookup.

use std::ops::Range;

/// Byte range into the source text.
pub type Span = Range<usize>;

/// Maps byte offsets to 1-based line and column numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    /// Byte offset at which each line starts. Always begins with 0.
    starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self {
            starts,
            len: source.len(),
        }
    }

    /// 1-based line containing `offset`. Offsets past the end map to the last line.
    pub fn line(&self, offset: usize) -> usize {
        let offset = offset.min(self.len);
        match self.starts.binary_search(&offset) {
            Ok(idx) => idx + 1,
            Err(idx) => idx,
        }
    }

    /// 1-based (line, column) for `offset`; the column counts characters.
    pub fn position(&self, source: &str, offset: usize) -> (usize, usize) {
        let line = self.line(offset);
        let start = self.starts[line - 1];
        let end = offset.min(source.len()).max(start);
        let column = source
            .get(start..end)
            .map(|s| s.chars().count())
            .unwrap_or(0);
        (line, column + 1)
    }

    /// Number of lines in the source.
    pub fn line_count(&self) -> usize {
        self.starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_one_based() {
        let src = "a\nbc\n\nd";
        let idx = LineIndex::new(src);
        assert_eq!(idx.line(0), 1);
        assert_eq!(idx.line(1), 1); // the newline belongs to line 1
        assert_eq!(idx.line(2), 2);
        assert_eq!(idx.line(5), 3);
        assert_eq!(idx.line(6), 4);
        assert_eq!(idx.line(99), 4);
        assert_eq!(idx.line_count(), 4);
    }

    #[test]
    fn columns_count_chars() {
        let src = "x = 'é'\ny = 1";
        let idx = LineIndex::new(src);
        assert_eq!(idx.position(src, 0), (1, 1));
        assert_eq!(idx.position(src, 4), (1, 5));
        let y = src.find('y').unwrap();
        assert_eq!(idx.position(src, y), (2, 1));
    }
}
