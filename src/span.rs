//! Source location tracking.
//!
//! Every token, parse-tree context, and ASG node carries a [`Span`] locating
//! it in the text it was produced from. Spans are byte ranges paired with a
//! [`FileId`] so positions from the main source and from expanded copybooks
//! stay distinguishable. [`Location`] is the resolved, user-facing form
//! (file name, 1-indexed line and column) used in diagnostics.

use serde::{Deserialize, Serialize};

/// Identifier for a source text registered with a program.
///
/// The main input file is id 0; copybooks pulled in during preprocessing get
/// successive ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FileId(pub u32);

impl FileId {
    /// The id of the main source file.
    pub const MAIN: FileId = FileId(0);
}

/// A contiguous byte range in a source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    /// The source file the range belongs to.
    pub file: FileId,
    /// Byte offset of the first byte (0-indexed).
    pub start: u32,
    /// Byte offset one past the last byte.
    pub end: u32,
}

impl Span {
    /// Create a span.
    pub fn new(file: FileId, start: u32, end: u32) -> Self {
        Self { file, start, end }
    }

    /// Create a span in the main source file.
    pub fn main(start: u32, end: u32) -> Self {
        Self::new(FileId::MAIN, start, end)
    }

    /// An empty span at a position.
    pub fn point(file: FileId, pos: u32) -> Self {
        Self::new(file, pos, pos)
    }

    /// A placeholder span for synthesized elements.
    pub fn dummy() -> Self {
        Self::default()
    }

    /// Length of the span in bytes.
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    /// Whether the span covers no bytes.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Smallest span covering both `self` and `other`.
    pub fn extend(self, other: Span) -> Self {
        debug_assert_eq!(self.file, other.file, "cannot extend span across files");
        Self {
            file: self.file,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// A resolved source position for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// File name or path as given to the preprocessor.
    pub file_name: String,
    /// 1-indexed line number.
    pub line: u32,
    /// 1-indexed column number.
    pub column: u32,
}

impl Location {
    /// Create a location.
    pub fn new(file_name: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file_name: file_name.into(),
            line,
            column,
        }
    }

    /// A location with no file attached (synthesized input).
    pub fn unknown() -> Self {
        Self::new("<source>", 0, 0)
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file_name, self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_extend_covers_both() {
        let a = Span::main(4, 10);
        let b = Span::main(8, 20);
        let joined = a.extend(b);
        assert_eq!(joined.start, 4);
        assert_eq!(joined.end, 20);
    }

    #[test]
    fn span_point_is_empty() {
        let p = Span::point(FileId(3), 7);
        assert!(p.is_empty());
        assert_eq!(p.len(), 0);
    }

    #[test]
    fn location_display() {
        let loc = Location::new("PAYROLL.cbl", 12, 8);
        assert_eq!(loc.to_string(), "PAYROLL.cbl:12:8");
    }
}
