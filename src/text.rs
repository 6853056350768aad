//! Raw text utilities shared by the preprocessor and the lexer.
//!
//! All input is pushed through [`normalize_line_endings`] before any
//! column-sensitive processing. COBOL fixed format assigns meaning to
//! absolute columns, so a stray `\r` shifting content by one byte corrupts
//! the indicator area; normalizing first keeps every later byte offset
//! honest. [`LineIndex`] turns byte offsets back into line/column pairs for
//! diagnostics.

/// Normalize line endings to `\n`.
///
/// Converts `\r\n` and bare `\r` to `\n`; already-clean text is returned
/// unchanged (single allocation either way).
pub fn normalize_line_endings(text: &str) -> String {
    if !text.as_bytes().contains(&b'\r') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\r' {
            out.push('\n');
            if i + 1 < bytes.len() && bytes[i + 1] == b'\n' {
                i += 1;
            }
        } else {
            out.push(bytes[i] as char);
        }
        i += 1;
    }

    out
}

/// Byte offsets of every line start in a normalized text.
///
/// Built in one scan; lookups are a binary search. The text must use `\n`
/// as its only terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    offsets: Vec<u32>,
}

impl LineIndex {
    /// Build an index over normalized text.
    pub fn new(text: &str) -> Self {
        let mut offsets = vec![0];
        for (i, byte) in text.as_bytes().iter().enumerate() {
            if *byte == b'\n' {
                offsets.push((i + 1) as u32);
            }
        }
        Self { offsets }
    }

    /// Number of lines (a trailing `\n` opens one more, possibly empty, line).
    pub fn line_count(&self) -> usize {
        self.offsets.len()
    }

    /// Byte offset where the given 0-indexed line starts.
    pub fn line_start(&self, line: usize) -> Option<u32> {
        self.offsets.get(line).copied()
    }

    /// Convert a byte offset to a 0-indexed `(line, column)` pair.
    pub fn line_col_0(&self, offset: u32) -> (u32, u32) {
        let line = match self.offsets.binary_search(&offset) {
            Ok(exact) => exact,
            Err(insert) => insert.saturating_sub(1),
        };
        (line as u32, offset - self.offsets[line])
    }

    /// Convert a byte offset to a 1-indexed `(line, column)` pair.
    pub fn line_col_1(&self, offset: u32) -> (u32, u32) {
        let (line, col) = self.line_col_0(offset);
        (line + 1, col + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_passthrough() {
        assert_eq!(normalize_line_endings("a\nb"), "a\nb");
    }

    #[test]
    fn normalize_crlf_and_cr() {
        assert_eq!(normalize_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn line_index_starts() {
        let idx = LineIndex::new("one\ntwo\nthree");
        assert_eq!(idx.line_count(), 3);
        assert_eq!(idx.line_start(0), Some(0));
        assert_eq!(idx.line_start(1), Some(4));
        assert_eq!(idx.line_start(2), Some(8));
        assert_eq!(idx.line_start(3), None);
    }

    #[test]
    fn line_col_round_trip() {
        let idx = LineIndex::new("one\ntwo\nthree");
        assert_eq!(idx.line_col_1(0), (1, 1));
        assert_eq!(idx.line_col_1(4), (2, 1));
        assert_eq!(idx.line_col_1(6), (2, 3));
        assert_eq!(idx.line_col_1(8), (3, 1));
    }

    #[test]
    fn line_col_exact_boundary() {
        let idx = LineIndex::new("ab\ncd");
        // The `\n` itself still belongs to line 0.
        assert_eq!(idx.line_col_0(2), (0, 2));
        assert_eq!(idx.line_col_0(3), (1, 0));
    }
}
