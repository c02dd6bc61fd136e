use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{ParseError, ParseOutcome, ParseResult, Parser, ParserState};
use crate::ast::{ShiftLines, SyntaxTree};
use crate::position::Range;

/// Lines of context reparsed on each side of an edit.
const MARGIN: usize = 3;

/// One change as editors report it: `range` refers to the document as it
/// was before this change was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    pub range: Range,
    pub text: String,
}

impl TextEdit {
    pub fn new(range: Range, text: impl Into<String>) -> Self {
        Self {
            range,
            text: text.into(),
        }
    }
}

/// The line span a batch of edits touched.
///
/// Lines `start_line..=old_end_line` of the old text became
/// `start_line..=new_end_line` of the new text; every later line moved by
/// `new_end_line - old_end_line`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditHull {
    pub start_line: u32,
    pub old_end_line: u32,
    pub new_end_line: u32,
}

impl EditHull {
    pub fn from_edit(edit: &TextEdit) -> Self {
        let start = edit.range.start.line;
        Self {
            start_line: start,
            old_end_line: edit.range.end.line,
            new_end_line: start + edit.text.matches('\n').count() as u32,
        }
    }

    /// Fold edits applied one after another into a single hull over the
    /// text before the first of them.
    pub fn from_edits(edits: &[TextEdit]) -> Option<Self> {
        edits.iter().map(Self::from_edit).reduce(Self::followed_by)
    }

    /// Combine with `next`, whose lines are in the coordinates produced by `self`.
    pub fn followed_by(self, next: EditHull) -> Self {
        let delta = self.line_delta();
        let next_delta = next.line_delta();
        let new_end = (i64::from(self.new_end_line) + next_delta).max(i64::from(next.new_end_line));
        let old_end = i64::from(self.old_end_line).max(i64::from(next.old_end_line) - delta);
        Self {
            start_line: self.start_line.min(next.start_line),
            old_end_line: old_end.max(0) as u32,
            new_end_line: new_end.max(0) as u32,
        }
    }

    pub fn line_delta(&self) -> i64 {
        i64::from(self.new_end_line) - i64::from(self.old_end_line)
    }
}

/// Old-text line window `[lo, hi]` to reparse for `hull`: the hull plus a
/// margin, grown over every pattern span and item it touches, over an
/// unterminated item just before it, and out to the neighbouring items.
fn reparse_window(tree: &SyntaxTree, hull: EditHull, old_last: usize) -> (usize, usize) {
    let mut lo = (hull.start_line as usize).saturating_sub(MARGIN);
    let mut hi = (hull.old_end_line as usize + MARGIN).min(old_last);

    let patterns: Vec<Range> = tree.patterns().map(|p| p.range).collect();
    let items = tree.item_spans();
    loop {
        let before = (lo, hi);
        for range in patterns.iter().chain(items.iter().map(|(r, _)| r)) {
            if range.touches_lines(lo as u32, hi as u32) {
                lo = lo.min(range.start.line as usize);
                hi = hi.max(range.end.line as usize);
            }
        }
        // an unterminated item reads until the next item starts
        if let Some((range, false)) = items.iter().rev().find(|(r, _)| (r.end.line as usize) < lo) {
            lo = range.start.line as usize;
        }
        if (lo, hi) == before {
            break;
        }
    }

    let lo = items
        .iter()
        .filter(|(r, _)| (r.end.line as usize) < lo)
        .map(|(r, _)| r.end.line as usize + 1)
        .max()
        .unwrap_or(0);
    let hi = items
        .iter()
        .filter(|(r, _)| (r.start.line as usize) > hi)
        .map(|(r, _)| r.start.line as usize - 1)
        .min()
        .unwrap_or(old_last);
    (lo, hi.min(old_last))
}

/// Items of `old` before the window, then `window`, then the items of `old`
/// after the window moved by `delta` lines.
fn keep<T: Clone + ShiftLines>(
    old: &[T],
    window: Vec<T>,
    range: impl Fn(&T) -> Range,
    lo: usize,
    hi: usize,
    delta: i64,
) -> Vec<T> {
    let mut out: Vec<T> = old
        .iter()
        .filter(|item| (range(item).start.line as usize) < lo)
        .cloned()
        .collect();
    out.extend(window);
    out.extend(old.iter().filter(|item| (range(item).start.line as usize) > hi).cloned().map(|mut item| {
        item.shift_lines(delta);
        item
    }));
    out
}

impl Parser {
    /// Reparse only the window around `hull` and splice it into a copy of
    /// `previous`. `None` means the splice cannot be proven equal to a full
    /// parse and the caller must reparse everything.
    pub(super) fn splice(
        &self,
        previous: &ParseResult,
        lines: &[&str],
        hull: EditHull,
    ) -> anyhow::Result<Option<ParseResult>> {
        let delta = hull.line_delta();
        if previous.line_count == 0
            || previous.line_count as i64 + delta != lines.len() as i64
            || hull.old_end_line as usize >= previous.line_count
        {
            debug!(
                previous_lines = previous.line_count,
                lines = lines.len(),
                ?hull,
                "edit does not line up with previous parse, reparsing fully"
            );
            return Ok(None);
        }

        let old_last = previous.line_count - 1;
        let (lo, hi) = reparse_window(&previous.tree, hull, old_last);
        if let Some(package) = &previous.tree.package
            && (lo..=hi).contains(&(package.range.start.line as usize))
        {
            // a shadowed later package may take over
            return Ok(None);
        }

        let hi_new = (hi as i64 + delta).max(lo as i64 - 1);
        let mut state = ParserState::new(lines, lo, (hi_new + 1) as usize, self.options);
        state.parse_items()?;
        if state.open_comment || state.capped {
            debug!(lo, hi, "window parse cannot be spliced, reparsing fully");
            return Ok(None);
        }
        trace!(lo, hi, hi_new, "splicing reparsed window");

        let old = &previous.tree;
        let window = state.tree;
        let tree = SyntaxTree {
            package: old
                .package
                .clone()
                .filter(|p| (p.range.start.line as usize) < lo)
                .or(window.package)
                .or_else(|| {
                    old.package.clone().filter(|p| (p.range.start.line as usize) > hi).map(|mut p| {
                        p.shift_lines(delta);
                        p
                    })
                }),
            imports: keep(&old.imports, window.imports, |i| i.range, lo, hi, delta),
            globals: keep(&old.globals, window.globals, |g| g.range, lo, hi, delta),
            functions: keep(&old.functions, window.functions, |f| f.range, lo, hi, delta),
            rules: keep(&old.rules, window.rules, |r| r.range, lo, hi, delta),
            queries: keep(&old.queries, window.queries, |q| q.range, lo, hi, delta),
            declarations: keep(&old.declarations, window.declarations, |d| d.range, lo, hi, delta),
        };

        let mut errors: Vec<ParseError> = previous
            .errors
            .iter()
            .filter(|e| (e.range.start.line as usize) < lo)
            .cloned()
            .collect();
        errors.extend(state.errors);
        errors.extend(
            previous
                .errors
                .iter()
                .filter(|e| (e.range.start.line as usize) > hi)
                .cloned()
                .map(|mut e| {
                    e.shift_lines(delta);
                    e
                }),
        );
        if errors.len() > self.options.max_errors {
            return Ok(None);
        }

        let mut brackets = previous.brackets.clone();
        let start = hull.start_line as usize;
        let new_end = hull.new_end_line as usize;
        brackets.splice_lines(lines, start, hull.old_end_line as usize + 1, new_end + 1);

        Ok(Some(ParseResult {
            tree,
            errors,
            brackets,
            outcome: ParseOutcome::Complete,
            line_count: lines.len(),
            max_errors: self.options.max_errors,
        }))
    }
}
