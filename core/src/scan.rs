//! Byte-level lexical helpers shared by the bracket tracker, the pattern
//! detector and the parser. Everything here is string-literal aware: bytes
//! inside `"..."` or `'...'` (with `\` escapes) never count as code.

use serde::{Deserialize, Serialize};

use crate::position::Position;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct StringState {
    quote: Option<u8>,
    escaped: bool,
}

impl StringState {
    /// Feed one byte. Returns `true` when the byte is code, i.e. neither inside
    /// a literal nor one of its delimiting quotes.
    pub(crate) fn feed(&mut self, b: u8) -> bool {
        if let Some(q) = self.quote {
            if self.escaped {
                self.escaped = false;
            } else if b == b'\\' {
                self.escaped = true;
            } else if b == q {
                self.quote = None;
            }
            return false;
        }
        if b == b'"' || b == b'\'' {
            self.quote = Some(b);
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BracketKind {
    Paren,
    Brace,
    Square,
}

impl BracketKind {
    pub(crate) fn open_of(b: u8) -> Option<BracketKind> {
        match b {
            b'(' => Some(BracketKind::Paren),
            b'{' => Some(BracketKind::Brace),
            b'[' => Some(BracketKind::Square),
            _ => None,
        }
    }

    pub(crate) fn close_of(b: u8) -> Option<BracketKind> {
        match b {
            b')' => Some(BracketKind::Paren),
            b'}' => Some(BracketKind::Brace),
            b']' => Some(BracketKind::Square),
            _ => None,
        }
    }

    pub fn open_char(self) -> char {
        match self {
            BracketKind::Paren => '(',
            BracketKind::Brace => '{',
            BracketKind::Square => '[',
        }
    }

    pub fn close_char(self) -> char {
        match self {
            BracketKind::Paren => ')',
            BracketKind::Brace => '}',
            BracketKind::Square => ']',
        }
    }
}

pub(crate) fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// Byte index where a `//` line comment starts, ignoring `//` inside literals.
pub(crate) fn comment_start(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    let mut state = StringState::default();
    let mut i = 0;
    while i < bytes.len() {
        if state.feed(bytes[i]) && bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'/') {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// The line with any trailing `//` comment removed.
pub(crate) fn strip_comment(line: &str) -> &str {
    match comment_start(line) {
        Some(i) => &line[..i],
        None => line,
    }
}

/// Net bracket depth change of `text`, counting only code bytes.
pub(crate) fn bracket_delta(text: &str) -> i64 {
    let mut state = StringState::default();
    let mut depth = 0i64;
    for &b in text.as_bytes() {
        if !state.feed(b) {
            continue;
        }
        if BracketKind::open_of(b).is_some() {
            depth += 1;
        } else if BracketKind::close_of(b).is_some() {
            depth -= 1;
        }
    }
    depth
}

/// Whether `bytes[start..start+len]` is delimited by non-identifier bytes.
pub(crate) fn is_word_at(bytes: &[u8], start: usize, len: usize) -> bool {
    let before_ok = start == 0 || !is_ident_byte(bytes[start - 1]);
    let after_ok = bytes.get(start + len).is_none_or(|b| !is_ident_byte(*b));
    before_ok && after_ok
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connective {
    And,
    Or,
}

/// One piece of a top-level `and`/`or` split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Segment<'a> {
    /// Connective that joined this segment to the previous one.
    pub(crate) connective: Option<Connective>,
    /// Byte offset of `text` within the split input (before trimming).
    pub(crate) offset: usize,
    pub(crate) text: &'a str,
}

/// Split on `and`/`or`/`&&`/`||` occurring at bracket depth zero and outside
/// literals. Left to right, no precedence: `a or b and c` yields three
/// segments. Empty segments are dropped.
pub(crate) fn split_connectives(text: &str) -> Vec<Segment<'_>> {
    let bytes = text.as_bytes();
    let mut state = StringState::default();
    let mut depth = 0i64;
    let mut out = Vec::new();
    let mut seg_start = 0usize;
    let mut pending: Option<Connective> = None;
    let mut i = 0usize;

    while i < bytes.len() {
        let b = bytes[i];
        if !state.feed(b) {
            i += 1;
            continue;
        }
        if BracketKind::open_of(b).is_some() {
            depth += 1;
        } else if BracketKind::close_of(b).is_some() {
            depth -= 1;
        } else if depth == 0 {
            let hit = if bytes[i..].starts_with(b"&&") {
                Some((Connective::And, 2))
            } else if bytes[i..].starts_with(b"||") {
                Some((Connective::Or, 2))
            } else if bytes[i..].starts_with(b"and") && is_word_at(bytes, i, 3) {
                Some((Connective::And, 3))
            } else if bytes[i..].starts_with(b"or") && is_word_at(bytes, i, 2) {
                Some((Connective::Or, 2))
            } else {
                None
            };
            if let Some((conn, len)) = hit {
                push_segment(&mut out, text, seg_start, i, pending);
                pending = Some(conn);
                i += len;
                seg_start = i;
                continue;
            }
        }
        i += 1;
    }
    push_segment(&mut out, text, seg_start, bytes.len(), pending);
    out
}

fn push_segment<'a>(out: &mut Vec<Segment<'a>>, text: &'a str, start: usize, end: usize, conn: Option<Connective>) {
    let raw = &text[start..end];
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return;
    }
    let lead = raw.len() - raw.trim_start().len();
    out.push(Segment {
        connective: if out.is_empty() { None } else { conn },
        offset: start + lead,
        text: trimmed,
    });
}

/// Split on commas at bracket depth zero, outside literals. Pieces are
/// returned trimmed with their byte offset; empty pieces are dropped.
pub(crate) fn split_commas(text: &str) -> Vec<(usize, &str)> {
    let bytes = text.as_bytes();
    let mut state = StringState::default();
    let mut depth = 0i64;
    let mut out = Vec::new();
    let mut start = 0usize;
    for (i, &b) in bytes.iter().enumerate() {
        if !state.feed(b) {
            continue;
        }
        if BracketKind::open_of(b).is_some() {
            depth += 1;
        } else if BracketKind::close_of(b).is_some() {
            depth -= 1;
        } else if b == b',' && depth == 0 {
            push_piece(&mut out, text, start, i);
            start = i + 1;
        }
    }
    push_piece(&mut out, text, start, bytes.len());
    out
}

fn push_piece<'a>(out: &mut Vec<(usize, &'a str)>, text: &'a str, start: usize, end: usize) {
    let raw = &text[start..end];
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        out.push((start + raw.len() - raw.trim_start().len(), trimmed));
    }
}

/// Byte index of the bracket closing the one opened at `open_idx`, if it
/// closes within `text`.
pub(crate) fn matching_close(text: &str, open_idx: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut state = StringState::default();
    let mut depth = 0i64;
    for (i, &b) in bytes.iter().enumerate().skip(open_idx) {
        if !state.feed(b) {
            continue;
        }
        if BracketKind::open_of(b).is_some() {
            depth += 1;
        } else if BracketKind::close_of(b).is_some() {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Every `$identifier` token outside literals and `//` comments, with its
/// byte offset.
pub(crate) fn dollar_identifiers(text: &str) -> Vec<(usize, &str)> {
    let bytes = text.as_bytes();
    let mut state = StringState::default();
    let mut out = Vec::new();
    let mut i = 0usize;
    while i < bytes.len() {
        let b = bytes[i];
        if !state.feed(b) {
            i += 1;
            continue;
        }
        if b == b'/' && bytes.get(i + 1) == Some(&b'/') {
            while i < bytes.len() && bytes[i] != b'\n' {
                i += 1;
            }
            continue;
        }
        if b == b'$' && (i == 0 || !is_ident_byte(bytes[i - 1])) {
            let mut j = i + 1;
            while j < bytes.len() && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'_') {
                j += 1;
            }
            if j > i + 1 && !bytes[i + 1].is_ascii_digit() {
                out.push((i, &text[i..j]));
            }
            i = j;
            continue;
        }
        i += 1;
    }
    out
}

/// Text from `from` up to (not including) `to`, lines joined with `\n`.
/// Columns past a line's end are clamped.
pub(crate) fn extract_between(lines: &[&str], from: Position, to: Position) -> String {
    if to <= from {
        return String::new();
    }
    let (fl, tl) = (from.line as usize, to.line as usize);
    let slice = |l: usize, a: usize, b: usize| -> &str {
        let text = lines.get(l).copied().unwrap_or("");
        let b = b.min(text.len());
        text.get(a.min(b)..b).unwrap_or("")
    };
    if fl == tl {
        return slice(fl, from.column as usize, to.column as usize).to_string();
    }
    let mut out = String::new();
    out.push_str(slice(fl, from.column as usize, usize::MAX));
    for l in fl + 1..tl {
        out.push('\n');
        out.push_str(slice(l, 0, usize::MAX));
    }
    out.push('\n');
    out.push_str(slice(tl, 0, to.column as usize));
    out
}
