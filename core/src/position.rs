use std::fmt;

use serde::{Deserialize, Serialize};

/// Zero-based location in a document.
///
/// `column` is a UTF-8 byte offset into the line. Hosts that speak UTF-16
/// (LSP clients) convert at their boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    pub const fn start() -> Self {
        Self { line: 0, column: 0 }
    }

    pub(crate) fn shifted(self, delta: i64) -> Self {
        Self {
            line: shift_line(self.line, delta),
            column: self.column,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

/// Half-open range `[start, end)`; `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }

    pub const fn point(pos: Position) -> Self {
        Self { start: pos, end: pos }
    }

    /// Range covering `len` bytes of `line` starting at `column`.
    pub fn on_line(line: u32, column: u32, len: usize) -> Self {
        Self {
            start: Position::new(line, column),
            end: Position::new(line, column.saturating_add(len as u32)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.start <= pos && pos < self.end
    }

    /// True if any line in `[first, last]` falls within this range's lines.
    pub fn touches_lines(&self, first: u32, last: u32) -> bool {
        self.start.line <= last && self.end.line >= first
    }

    pub(crate) fn shifted(self, delta: i64) -> Self {
        Self {
            start: self.start.shifted(delta),
            end: self.end.shifted(delta),
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start.line == self.end.line {
            write!(f, "{}-{}", self.start, self.end.column + 1)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

fn shift_line(line: u32, delta: i64) -> u32 {
    (i64::from(line) + delta).clamp(0, i64::from(u32::MAX)) as u32
}

/// Position of byte `offset` in `text`.
pub fn offset_to_position(text: &str, offset: usize) -> Position {
    let offset = offset.min(text.len());
    let before = &text[..floor_char_boundary(text, offset)];
    let line = before.matches('\n').count() as u32;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    Position::new(line, (before.len() - line_start) as u32)
}

/// Translate `rel`, a position relative to a text starting at `base`, into
/// document coordinates.
pub(crate) fn relative_to(base: Position, rel: Position) -> Position {
    if rel.line == 0 {
        Position::new(base.line, base.column + rel.column)
    } else {
        Position::new(base.line + rel.line, rel.column)
    }
}

fn floor_char_boundary(text: &str, mut offset: usize) -> usize {
    while offset > 0 && !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}
