use tracing::trace;

use super::{PatternKeyword, PatternNode};
use crate::config::PatternLimits;
use crate::position::{Position, Range};
use crate::scan::{BracketKind, StringState, bracket_delta, extract_between, is_ident_byte};

/// First keyword construct at or after byte `from`: a construct keyword as a
/// whole word, outside literals and comments, followed (ignoring spaces) by
/// `(`. A field or variable that happens to be called `not` never matches.
pub fn find_keyword(line: &str, from: usize) -> Option<(usize, PatternKeyword)> {
    let bytes = line.as_bytes();
    let mut state = StringState::default();
    let mut i = 0usize;
    while i < bytes.len() {
        let b = bytes[i];
        if !state.feed(b) {
            i += 1;
            continue;
        }
        if b == b'/' && bytes.get(i + 1) == Some(&b'/') {
            return None;
        }
        if is_ident_byte(b) && (i == 0 || !is_ident_byte(bytes[i - 1])) {
            let mut j = i;
            while j < bytes.len() && is_ident_byte(bytes[j]) {
                j += 1;
            }
            if i >= from
                && let Some(keyword) = PatternKeyword::from_word(&line[i..j])
                && opens_paren(bytes, j)
            {
                return Some((i, keyword));
            }
            i = j;
            continue;
        }
        i += 1;
    }
    None
}

fn opens_paren(bytes: &[u8], mut i: usize) -> bool {
    while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
        i += 1;
    }
    bytes.get(i) == Some(&b'(')
}

struct Scan {
    close: Option<Position>,
    last: Position,
    brackets: Vec<Range>,
}

#[derive(Default)]
struct Budget {
    nested: usize,
}

/// Detects keyword constructs and reads them forward line by line until their
/// brackets balance or a cap is hit.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternDetector {
    limits: PatternLimits,
}

impl PatternDetector {
    pub fn new(limits: PatternLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> PatternLimits {
        self.limits
    }

    /// Detect the construct whose keyword starts at `start` (leading
    /// whitespace allowed). Returns `None` when no construct starts there.
    pub fn detect(&self, text: &str, start: Position) -> Option<PatternNode> {
        let lines: Vec<&str> = text.split('\n').collect();
        self.detect_in_lines(&lines, start)
    }

    pub fn detect_in_lines(&self, lines: &[&str], start: Position) -> Option<PatternNode> {
        let mut budget = Budget::default();
        self.detect_at(lines, start, 1, &mut budget)
    }

    fn detect_at(&self, lines: &[&str], start: Position, level: usize, budget: &mut Budget) -> Option<PatternNode> {
        let line_idx = start.line as usize;
        let line = *lines.get(line_idx)?;
        let bytes = line.as_bytes();
        let mut col = (start.column as usize).min(bytes.len());
        while col < bytes.len() && bytes[col].is_ascii_whitespace() {
            col += 1;
        }
        let (kw_col, keyword) = find_keyword(line, col).filter(|(c, _)| *c == col)?;
        let kw_end = kw_col + keyword.as_str().len();
        let paren_col = kw_end + bytes[kw_end..].iter().take_while(|b| **b == b' ' || **b == b'\t').count();

        let scan = self.scan_construct(lines, line_idx, paren_col);
        let content_start = Position::new(start.line, paren_col as u32 + 1);
        let content_end = scan.close.unwrap_or(scan.last);
        let content = extract_between(lines, content_start, content_end);

        let mut children = Vec::new();
        let mut exceeded = false;
        let mut saw_keyword = false;

        if content.len() > self.limits.max_content_len {
            trace!(%keyword, len = content.len(), "pattern content over limit, not expanding");
            exceeded = true;
        } else {
            let mut cursor = content_start;
            while cursor < content_end {
                let l = cursor.line as usize;
                let Some(text) = lines.get(l) else { break };
                let line_end = if cursor.line == content_end.line {
                    content_end.column as usize
                } else {
                    text.len()
                };
                let hit = find_keyword(text, cursor.column as usize).filter(|(c, _)| *c < line_end);
                let Some((c, kw)) = hit else {
                    cursor = Position::new(cursor.line + 1, 0);
                    continue;
                };
                saw_keyword = true;
                if level >= self.limits.max_depth || budget.nested >= self.limits.max_nested {
                    trace!(%keyword, level, nested = budget.nested, "pattern complexity cap reached");
                    exceeded = true;
                    break;
                }
                budget.nested += 1;
                match self.detect_at(lines, Position::new(cursor.line, c as u32), level + 1, budget) {
                    Some(child) => {
                        cursor = child.range.end;
                        children.push(child);
                    }
                    None => cursor = Position::new(cursor.line, (c + kw.as_str().len()) as u32),
                }
            }
        }

        let kw_start = Position::new(start.line, kw_col as u32);
        let end = match scan.close {
            Some(close) => Position::new(close.line, close.column + 1),
            None => scan.last,
        };
        let multiline = end.line > start.line || bracket_delta(&line[kw_col..]) != 0 || saw_keyword;

        Some(PatternNode::new(
            keyword,
            Range::new(kw_start, end),
            content,
            content_start,
            scan.close.is_some(),
            multiline,
            exceeded,
            children,
            scan.brackets,
        ))
    }

    fn scan_construct(&self, lines: &[&str], first: usize, paren_col: usize) -> Scan {
        let last_line = (first + self.limits.max_lines.max(1)).min(lines.len());
        let mut depth = 0usize;
        let mut stack: Vec<Position> = Vec::new();
        let mut brackets = Vec::new();

        for (l, text) in lines.iter().enumerate().take(last_line).skip(first) {
            let bytes = text.as_bytes();
            let mut state = StringState::default();
            let mut i = if l == first { paren_col } else { 0 };
            while i < bytes.len() {
                let b = bytes[i];
                if !state.feed(b) {
                    i += 1;
                    continue;
                }
                if b == b'/' && bytes.get(i + 1) == Some(&b'/') {
                    break;
                }
                let here = Position::new(l as u32, i as u32);
                if BracketKind::open_of(b).is_some() {
                    depth += 1;
                    stack.push(here);
                } else if BracketKind::close_of(b).is_some() {
                    if let Some(open) = stack.pop() {
                        brackets.push(Range::new(open, Position::new(here.line, here.column + 1)));
                    }
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        brackets.sort();
                        return Scan {
                            close: Some(here),
                            last: here,
                            brackets,
                        };
                    }
                }
                i += 1;
            }
        }

        let last_idx = last_line.saturating_sub(1).max(first);
        let last_len = lines.get(last_idx).map(|l| l.len()).unwrap_or(0);
        brackets.sort();
        Scan {
            close: None,
            last: Position::new(last_idx as u32, last_len as u32),
            brackets,
        }
    }
}
