//! Source text ownership and location mapping
//!
//! A `SourceBuffer` owns the text of one CMake file and a precomputed
//! index of line-start offsets, so byte offsets can be mapped to
//! `(line, column)` pairs in O(log lines).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A position in a source file.
///
/// `line` and `column` are 1-based; `offset` is the 0-based byte offset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: usize, column: usize, offset: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            offset,
        }
    }

    /// A location is valid iff it names a file and both coordinates are 1-based.
    pub fn is_valid(&self) -> bool {
        !self.file.is_empty() && self.line >= 1 && self.column >= 1
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// A span between two locations in the same file, `start <= end`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRange {
    pub start: SourceLocation,
    pub end: SourceLocation,
}

impl SourceRange {
    pub fn new(start: SourceLocation, end: SourceLocation) -> Self {
        Self { start, end }
    }

    /// Range covering a single location.
    pub fn at(location: SourceLocation) -> Self {
        Self {
            start: location.clone(),
            end: location,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.start.is_valid() && self.end.is_valid()
    }

    /// Whether `loc` falls inside this range (inclusive on both ends).
    pub fn contains(&self, loc: &SourceLocation) -> bool {
        if self.start.file != loc.file || self.start.file != self.end.file {
            return false;
        }
        let after_start = self.start.line < loc.line
            || (self.start.line == loc.line && self.start.column <= loc.column);
        let before_end =
            self.end.line > loc.line || (self.end.line == loc.line && self.end.column >= loc.column);
        after_start && before_end
    }
}

impl fmt::Display for SourceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// Owns the content of one input file plus its line index.
#[derive(Debug, Clone)]
pub struct SourceBuffer {
    content: String,
    filename: String,
    line_starts: Vec<usize>,
}

impl SourceBuffer {
    pub fn new(content: impl Into<String>, filename: impl Into<String>) -> Self {
        let content = content.into();
        let mut line_starts = vec![0];
        for (i, byte) in content.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self {
            content,
            filename: filename.into(),
            line_starts,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Map a byte offset to a full location. Out-of-range offsets are
    /// clamped to the end of the content.
    pub fn location_at(&self, offset: usize) -> SourceLocation {
        let (line, column) = self.line_column_at(offset);
        SourceLocation::new(self.filename.clone(), line, column, offset.min(self.content.len()))
    }

    /// Map a byte offset to 1-based `(line, column)` by binary search over
    /// the line-start index.
    pub fn line_column_at(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.content.len());
        let line_idx = self.line_starts.partition_point(|&start| start <= offset) - 1;
        (line_idx + 1, offset - self.line_starts[line_idx] + 1)
    }

    /// Number of lines, counting a trailing partial line.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Content of the 1-based line `n`, without the newline and without a
    /// trailing `\r`. Returns an empty slice for out-of-range lines.
    pub fn line_content(&self, n: usize) -> &str {
        if n == 0 || n > self.line_starts.len() {
            return "";
        }
        let start = self.line_starts[n - 1];
        let mut end = match self.line_starts.get(n) {
            Some(&next) => next - 1,
            None => self.content.len(),
        };
        if end > start && self.content.as_bytes()[end - 1] == b'\r' {
            end -= 1;
        }
        &self.content[start..end]
    }

    /// Byte-range slice, clamped to the content bounds.
    pub fn slice(&self, start: usize, end: usize) -> &str {
        let start = start.min(self.content.len());
        let end = end.clamp(start, self.content.len());
        &self.content[start..end]
    }

    /// Byte at `offset`, or NUL past the end.
    pub fn at(&self, offset: usize) -> u8 {
        self.content.as_bytes().get(offset).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_at_maps_lines_and_columns() {
        let buf = SourceBuffer::new("abc\ndef\nghi", "t.cmake");
        assert_eq!(buf.line_column_at(0), (1, 1));
        assert_eq!(buf.line_column_at(2), (1, 3));
        assert_eq!(buf.line_column_at(4), (2, 1));
        assert_eq!(buf.line_column_at(8), (3, 1));
        assert_eq!(buf.line_column_at(10), (3, 3));
    }

    #[test]
    fn test_location_at_clamps_past_end() {
        let buf = SourceBuffer::new("ab", "t.cmake");
        let loc = buf.location_at(100);
        assert_eq!(loc.offset, 2);
        assert_eq!((loc.line, loc.column), (1, 3));
    }

    #[test]
    fn test_line_content_trims_carriage_return() {
        let buf = SourceBuffer::new("one\r\ntwo\r\nthree", "t.cmake");
        assert_eq!(buf.line_content(1), "one");
        assert_eq!(buf.line_content(2), "two");
        assert_eq!(buf.line_content(3), "three");
        assert_eq!(buf.line_content(4), "");
    }

    #[test]
    fn test_empty_buffer() {
        let buf = SourceBuffer::new("", "t.cmake");
        assert_eq!(buf.line_count(), 1);
        assert_eq!(buf.line_column_at(0), (1, 1));
        assert_eq!(buf.line_content(1), "");
    }

    #[test]
    fn test_location_validity() {
        assert!(SourceLocation::new("f.cmake", 1, 1, 0).is_valid());
        assert!(!SourceLocation::new("", 1, 1, 0).is_valid());
        assert!(!SourceLocation::new("f.cmake", 0, 1, 0).is_valid());
    }

    #[test]
    fn test_range_contains() {
        let range = SourceRange::new(
            SourceLocation::new("f", 2, 5, 0),
            SourceLocation::new("f", 4, 3, 0),
        );
        assert!(range.contains(&SourceLocation::new("f", 3, 1, 0)));
        assert!(range.contains(&SourceLocation::new("f", 2, 5, 0)));
        assert!(!range.contains(&SourceLocation::new("f", 2, 4, 0)));
        assert!(!range.contains(&SourceLocation::new("f", 4, 4, 0)));
        assert!(!range.contains(&SourceLocation::new("g", 3, 1, 0)));
    }
}
