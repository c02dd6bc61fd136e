use serde::{Deserialize, Serialize};

use crate::position::{Position, Range};
use crate::scan::{BracketKind, StringState};

#[cfg(test)]
mod bracket_test;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BracketPos {
    pub position: Position,
    pub kind: BracketKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BracketPair {
    pub open: Position,
    pub close: Position,
    pub kind: BracketKind,
}

impl BracketPair {
    /// Range from the opening bracket through the closing one, inclusive.
    pub fn range(&self) -> Range {
        Range::new(self.open, Position::new(self.close.line, self.close.column + 1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BracketIssueKind {
    /// An opening bracket that is never closed.
    Unclosed,
    /// A closing bracket with no (or the wrong kind of) opener.
    Unexpected,
}

/// A bracket problem worth reporting. Brackets that only lost their pairing
/// because an enclosing group never closed are not reported individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketIssue {
    pub bracket: BracketPos,
    pub kind: BracketIssueKind,
}

impl BracketIssue {
    pub fn message(&self) -> String {
        match self.kind {
            BracketIssueKind::Unclosed => format!("Unclosed '{}'", self.bracket.kind.open_char()),
            BracketIssueKind::Unexpected => format!("Unmatched '{}'", self.bracket.kind.close_char()),
        }
    }

    pub fn range(&self) -> Range {
        Range::on_line(self.bracket.position.line, self.bracket.position.column, 1)
    }
}

/// Bracket positions of a document and how they pair up.
///
/// Every recorded bracket ends up in exactly one of `pairs`,
/// `unmatched_open` or `unmatched_close`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketTable {
    pub opens: Vec<BracketPos>,
    pub closes: Vec<BracketPos>,
    pub pairs: Vec<BracketPair>,
    pub unmatched_open: Vec<BracketPos>,
    pub unmatched_close: Vec<BracketPos>,
    pub issues: Vec<BracketIssue>,
}

impl BracketTable {
    pub fn is_balanced(&self) -> bool {
        self.unmatched_open.is_empty() && self.unmatched_close.is_empty()
    }

    /// The pair whose open or close bracket sits at `pos`.
    pub fn pair_at(&self, pos: Position) -> Option<&BracketPair> {
        self.pairs.iter().find(|p| p.open == pos || p.close == pos)
    }

    pub fn len(&self) -> usize {
        self.opens.len() + self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Mark {
    bracket: BracketPos,
    open: bool,
}

/// Brackets recorded for one line, and the block-comment state around it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct LineMarks {
    marks: Vec<Mark>,
    starts_in_comment: bool,
    ends_in_comment: bool,
}

/// Line-granular bracket scanner.
///
/// Positions are stored per line so an edit only re-scans the lines it
/// touched; `rebuild_matched_pairs` recomputes the pairing afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BracketTracker {
    lines: Vec<LineMarks>,
    table: BracketTable,
}

impl BracketTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_text(text: &str) -> Self {
        let mut tracker = Self::new();
        for (idx, line) in text.split('\n').enumerate() {
            tracker.track_line(idx as u32, line);
        }
        tracker.rebuild_matched_pairs();
        tracker
    }

    /// Record the brackets of one line, replacing anything previously recorded
    /// for it. Lines are expected in order, since a `/*` left open on one line
    /// carries into the next. Call `rebuild_matched_pairs` once all lines are in.
    pub fn track_line(&mut self, line_idx: u32, content: &str) {
        let idx = line_idx as usize;
        if self.lines.len() <= idx {
            self.lines.resize_with(idx + 1, LineMarks::default);
        }
        self.rescan(idx, content);
    }

    /// Replace tracked lines `[start, old_end)` with `lines[start..new_end]`,
    /// where `lines` is the whole edited text. Untouched lines after the edit
    /// are renumbered, and re-scanned only while the edit changed whether they
    /// start inside a block comment.
    pub fn splice_lines(&mut self, lines: &[&str], start: usize, old_end: usize, new_end: usize) {
        let start = start.min(self.lines.len());
        let old_end = old_end.clamp(start, self.lines.len());
        let new_end = new_end.clamp(start, lines.len());
        let delta = (new_end - start) as i64 - (old_end - start) as i64;

        self.lines.splice(
            start..old_end,
            std::iter::repeat_with(LineMarks::default).take(new_end - start),
        );
        if delta != 0 {
            for line in self.lines.iter_mut().skip(new_end) {
                for mark in line.marks.iter_mut() {
                    mark.bracket.position = mark.bracket.position.shifted(delta);
                }
            }
        }

        for (idx, line) in lines.iter().enumerate().take(new_end).skip(start) {
            self.rescan(idx, line);
        }
        let mut idx = new_end;
        while idx < self.lines.len().min(lines.len()) && self.lines[idx].starts_in_comment != self.entry_state(idx) {
            self.rescan(idx, lines[idx]);
            idx += 1;
        }
        self.rebuild_matched_pairs();
    }

    fn entry_state(&self, idx: usize) -> bool {
        idx > 0 && self.lines[idx - 1].ends_in_comment
    }

    fn rescan(&mut self, idx: usize, content: &str) {
        let starts_in_comment = self.entry_state(idx);
        let (marks, ends_in_comment) = scan_line(idx as u32, content, starts_in_comment);
        self.lines[idx] = LineMarks {
            marks,
            starts_in_comment,
            ends_in_comment,
        };
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Re-derive pairs and unmatched sets from every recorded position using
    /// stack discipline. Pairs formed inside a group that never closes are
    /// dissolved back into the unmatched sets.
    pub fn rebuild_matched_pairs(&mut self) {
        let mut marks: Vec<Mark> = self.lines.iter().flat_map(|l| l.marks.iter().copied()).collect();
        marks.sort_by_key(|m| m.bracket.position);

        let mut opens = Vec::new();
        let mut closes = Vec::new();
        let mut stack: Vec<BracketPos> = Vec::new();
        let mut pairs: Vec<BracketPair> = Vec::new();
        let mut unmatched_close = Vec::new();
        let mut issues = Vec::new();

        for Mark { bracket, open } in marks {
            if open {
                opens.push(bracket);
                stack.push(bracket);
                continue;
            }
            closes.push(bracket);
            match stack.last() {
                Some(top) if top.kind == bracket.kind => {
                    pairs.push(BracketPair {
                        open: top.position,
                        close: bracket.position,
                        kind: bracket.kind,
                    });
                    stack.pop();
                }
                _ => {
                    unmatched_close.push(bracket);
                    issues.push(BracketIssue {
                        bracket,
                        kind: BracketIssueKind::Unexpected,
                    });
                }
            }
        }

        for open in &stack {
            issues.push(BracketIssue {
                bracket: *open,
                kind: BracketIssueKind::Unclosed,
            });
        }
        let mut unmatched_open = stack.clone();

        // Everything pushed after the outermost unclosed bracket sits inside it.
        if let Some(outermost) = stack.first() {
            let boundary = outermost.position;
            let (kept, dissolved): (Vec<BracketPair>, Vec<BracketPair>) =
                pairs.into_iter().partition(|p| p.open < boundary);
            pairs = kept;
            for p in dissolved {
                unmatched_open.push(BracketPos {
                    position: p.open,
                    kind: p.kind,
                });
                unmatched_close.push(BracketPos {
                    position: p.close,
                    kind: p.kind,
                });
            }
        }

        pairs.sort_by_key(|p| p.open);
        unmatched_open.sort();
        unmatched_close.sort();
        issues.sort_by_key(|i| i.bracket.position);

        self.table = BracketTable {
            opens,
            closes,
            pairs,
            unmatched_open,
            unmatched_close,
            issues,
        };
    }

    pub fn table(&self) -> &BracketTable {
        &self.table
    }

    pub fn into_table(self) -> BracketTable {
        self.table
    }
}

/// Brackets of one line and whether a `/* ... */` comment is still open at
/// its end.
fn scan_line(line_idx: u32, content: &str, mut in_comment: bool) -> (Vec<Mark>, bool) {
    let mut out = Vec::new();
    if !in_comment && content.trim_start().starts_with('#') {
        return (out, false);
    }
    let bytes = content.as_bytes();
    let mut state = StringState::default();
    let mut i = 0usize;
    while i < bytes.len() {
        if in_comment {
            match content[i..].find("*/") {
                Some(end) => {
                    i += end + 2;
                    in_comment = false;
                    continue;
                }
                None => break,
            }
        }
        let b = bytes[i];
        if !state.feed(b) {
            i += 1;
            continue;
        }
        if b == b'/' {
            match bytes.get(i + 1) {
                Some(b'/') => break,
                Some(b'*') => {
                    in_comment = true;
                    i += 2;
                    continue;
                }
                _ => {}
            }
        }
        let position = Position::new(line_idx, i as u32);
        if let Some(kind) = BracketKind::open_of(b) {
            out.push(Mark {
                bracket: BracketPos { position, kind },
                open: true,
            });
        } else if let Some(kind) = BracketKind::close_of(b) {
            out.push(Mark {
                bracket: BracketPos { position, kind },
                open: false,
            });
        }
        i += 1;
    }
    (out, in_comment)
}
