use anyhow::{Result, anyhow};

use super::ParserState;
use crate::ast::Parameter;
use crate::position::{Position, Range};
use crate::scan::{StringState, is_ident_byte, split_commas, strip_comment};

pub(super) const TOP_LEVEL_KEYWORDS: [&str; 7] = ["package", "import", "global", "function", "rule", "query", "declare"];

/// Leading keyword-ish word of a trimmed line.
pub(super) fn first_word(trimmed: &str) -> &str {
    trimmed
        .split(|c: char| c.is_whitespace() || matches!(c, '(' | ';' | '"' | '{'))
        .next()
        .unwrap_or("")
}

pub(super) fn is_top_level(trimmed: &str) -> bool {
    TOP_LEVEL_KEYWORDS.contains(&first_word(trimmed))
}

pub(super) fn is_line_comment(trimmed: &str) -> bool {
    trimmed.starts_with("//") || trimmed.starts_with('#')
}

/// `trimmed` starts with `word` as a whole word.
pub(super) fn starts_with_word(trimmed: &str, word: &str) -> bool {
    trimmed.starts_with(word) && trimmed.as_bytes().get(word.len()).is_none_or(|b| !is_ident_byte(*b))
}

/// Code part of a line: trailing `//` comment removed, trailing whitespace trimmed.
pub(super) fn code(line: &str) -> &str {
    strip_comment(line).trim_end()
}

pub(super) fn indent(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// First occurrence of `needle` outside string literals.
pub(super) fn find_code_byte(text: &str, needle: u8) -> Option<usize> {
    let mut state = StringState::default();
    text.bytes().position(|b| state.feed(b) && b == needle)
}

/// Byte index of the quote closing a literal that opens at `text[0]`.
pub(super) fn closing_quote(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let quote = *bytes.first()?;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(1) {
        if escaped {
            escaped = false;
        } else if b == b'\\' {
            escaped = true;
        } else if b == quote {
            return Some(i);
        }
    }
    None
}

/// `Type name, Type2 name2` parameter lists.
pub(super) fn parse_parameters(text: &str) -> Vec<Parameter> {
    split_commas(text)
        .into_iter()
        .filter_map(|(_, piece)| {
            let mut tokens: Vec<&str> = piece.split_whitespace().collect();
            let name = tokens.pop()?.to_string();
            let type_name = (!tokens.is_empty()).then(|| tokens.join(" "));
            Some(Parameter { type_name, name })
        })
        .collect()
}

pub(super) fn strip_semicolon(text: &str) -> &str {
    text.trim().trim_end_matches(';').trim_end()
}

impl<'a> ParserState<'a> {
    pub(super) fn line(&self, idx: usize) -> Result<&'a str> {
        self.lines
            .get(idx)
            .copied()
            .ok_or_else(|| anyhow!("line {idx} is outside the document ({} lines)", self.lines.len()))
    }

    /// End of the code on line `idx`.
    pub(super) fn line_end(&self, idx: usize) -> Result<Position> {
        Ok(Position::new(idx as u32, code(self.line(idx)?).len() as u32))
    }

    /// Range of `len` bytes of line `idx` from `col`.
    pub(super) fn span(&self, idx: usize, col: usize, len: usize) -> Range {
        Range::on_line(idx as u32, col as u32, len)
    }

    /// Skip a `/* ... */` comment starting on line `idx`; returns the next
    /// line to parse. An unterminated comment swallows the rest of the window.
    pub(super) fn skip_block_comment(&mut self, idx: usize) -> Result<usize> {
        let first = self.line(idx)?;
        let open = first.find("/*").unwrap_or(0);
        if first[open + 2..].contains("*/") {
            return Ok(idx + 1);
        }
        for l in idx + 1..self.end {
            if self.line(l)?.contains("*/") {
                return Ok(l + 1);
            }
        }
        self.open_comment = true;
        Ok(self.end)
    }

    /// Last line before `until` that has code on it, not earlier than `from`.
    pub(super) fn last_code_line(&self, from: usize, until: usize) -> Result<usize> {
        let mut last = from;
        for l in from..until.min(self.lines.len()) {
            let t = code(self.line(l)?).trim();
            if !t.is_empty() && !is_line_comment(t) {
                last = l;
            }
        }
        Ok(last)
    }
}
