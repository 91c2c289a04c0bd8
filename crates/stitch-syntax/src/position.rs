//! Source positions and ranges.
//!
//! All coordinates are zero-based. `column` counts bytes within the line and
//! `index` is the absolute byte offset into the source the tree was built
//! from, matching Tree-sitter's conventions.

use std::fmt;

use serde::Serialize;

/// A position within a source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Pos {
    /// Zero-based line number.
    pub line: usize,
    /// Zero-based byte column within the line.
    pub column: usize,
    /// Zero-based absolute byte offset.
    pub index: usize,
}

impl Pos {
    /// Creates a position.
    #[must_use]
    pub const fn new(line: usize, column: usize, index: usize) -> Self {
        Self {
            line,
            column,
            index,
        }
    }

    pub(crate) const fn from_point(point: tree_sitter::Point, index: usize) -> Self {
        Self {
            line: point.row,
            column: point.column,
            index,
        }
    }

    /// Returns one-based line and column numbers for display.
    #[must_use]
    pub fn one_based(&self) -> (u32, u32) {
        // Line/column numbers will realistically never exceed u32::MAX.
        let line = u32::try_from(self.line.saturating_add(1)).unwrap_or(u32::MAX);
        let column = u32::try_from(self.column.saturating_add(1)).unwrap_or(u32::MAX);
        (line, column)
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}@{}", self.line, self.column, self.index)
    }
}

/// A half-open range between two positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Range {
    /// Inclusive start.
    pub start: Pos,
    /// Exclusive end.
    pub end: Pos,
}

impl Range {
    /// Creates a range.
    #[must_use]
    pub const fn new(start: Pos, end: Pos) -> Self {
        Self { start, end }
    }

    /// Returns the byte offsets covered by the range.
    #[must_use]
    pub const fn byte_range(&self) -> std::ops::Range<usize> {
        self.start.index..self.end.index
    }

    /// Returns whether `other` lies entirely within this range.
    #[must_use]
    pub const fn contains(&self, other: &Self) -> bool {
        self.start.index <= other.start.index && other.end.index <= self.end.index
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}
