use anyhow::Result;

use super::{ParseError, ParserState};
use super::helpers::{code, find_code_byte, indent, is_line_comment, is_top_level, starts_with_word};
use crate::ast::{Condition, ConditionKind, FieldConstraint};
use crate::pattern::{PatternKeyword, PatternNode, find_keyword};
use crate::position::{Position, Range, offset_to_position, relative_to};
use crate::scan::{Connective, bracket_delta, is_ident_byte, matching_close, split_commas, split_connectives, strip_comment};

/// Where a section of a rule, query or declaration stopped. The line named
/// by the variant has not been consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Boundary {
    When(usize),
    Then(usize),
    End(usize),
    TopLevel(usize),
    Eof,
}

impl Boundary {
    pub(super) fn line(self) -> Option<usize> {
        match self {
            Boundary::When(l) | Boundary::Then(l) | Boundary::End(l) | Boundary::TopLevel(l) => Some(l),
            Boundary::Eof => None,
        }
    }
}

// Longest operators first so `>=` wins over `>` and `not in` over `in`.
const OPERATORS: [&str; 22] = [
    "==",
    "!=",
    ">=",
    "<=",
    ">",
    "<",
    "not matches",
    "matches",
    "not contains",
    "contains",
    "not memberOf",
    "memberOf",
    "not soundslike",
    "soundslike",
    "not in",
    "in",
    "str",
    "after",
    "before",
    "during",
    "includes",
    "overlaps",
];

fn is_end_line(t: &str) -> bool {
    t == "end"
}

fn end_of(text: &str, start: Position) -> Position {
    relative_to(start, offset_to_position(text, text.len()))
}

fn kind_of(keyword: PatternKeyword) -> ConditionKind {
    match keyword {
        PatternKeyword::Exists => ConditionKind::Exists,
        PatternKeyword::Not => ConditionKind::Not,
        PatternKeyword::Eval => ConditionKind::Eval,
        PatternKeyword::Forall => ConditionKind::Forall,
        PatternKeyword::Collect => ConditionKind::Collect,
        PatternKeyword::Accumulate => ConditionKind::Accumulate,
    }
}

fn strip_comments_multiline(text: &str) -> String {
    text.split('\n').map(strip_comment).collect::<Vec<_>>().join("\n")
}

fn bare(kind: ConditionKind, content: &str, range: Range) -> Condition {
    Condition {
        kind,
        content: content.to_string(),
        variable: None,
        fact_type: None,
        constraints: Vec::new(),
        source: None,
        children: Vec::new(),
        pattern: None,
        range,
        too_deep: false,
    }
}

impl<'a> ParserState<'a> {
    /// Parse condition lines from `(start_line, start_col)` until `then`
    /// (when `allow_then`), `end`, a top-level keyword or the window end.
    pub(super) fn parse_condition_lines(
        &mut self,
        start_line: usize,
        start_col: usize,
        allow_then: bool,
    ) -> Result<(Vec<Condition>, Boundary)> {
        let mut conditions = Vec::new();
        let mut l = start_line;
        let mut col = start_col;
        while l < self.end {
            let line = self.line(l)?;
            let seg = line.get(col..).unwrap_or("");
            let raw = seg.trim();
            let t = code(seg).trim();
            if t.is_empty() || is_line_comment(raw) {
                l += 1;
                col = 0;
                continue;
            }
            if raw.starts_with("/*") {
                l = self.skip_block_comment(l)?;
                col = 0;
                continue;
            }
            if is_end_line(t) {
                return Ok((conditions, Boundary::End(l)));
            }
            if allow_then && starts_with_word(t, "then") {
                return Ok((conditions, Boundary::Then(l)));
            }
            if is_top_level(t) {
                return Ok((conditions, Boundary::TopLevel(l)));
            }
            let (condition, next) = self.parse_condition(l, col + indent(seg))?;
            conditions.push(condition);
            l = next;
            col = 0;
        }
        Ok((conditions, Boundary::Eof))
    }

    /// One condition starting at `(l, col)`. Reads further lines while its
    /// brackets stay open. Returns the condition and the next line to parse.
    fn parse_condition(&mut self, l: usize, col: usize) -> Result<(Condition, usize)> {
        let first = code(self.line(l)?);
        let first = first.get(col..).unwrap_or("");
        let mut depth = bracket_delta(first);
        let mut last = l;
        while depth > 0 && last + 1 < self.end && last + 1 - l < self.options.pattern.max_lines {
            let next = code(self.line(last + 1)?);
            let t = next.trim();
            if is_end_line(t) || starts_with_word(t, "then") || is_top_level(t) {
                break;
            }
            last += 1;
            depth += bracket_delta(next);
        }

        let mut text = first.to_string();
        for k in l + 1..=last {
            text.push('\n');
            text.push_str(code(self.line(k)?));
        }
        let condition = self.build_condition(&text, Position::new(l as u32, col as u32), 0)?;
        Ok((condition, last + 1))
    }

    /// Build a condition from comment-free `text` whose first byte sits at
    /// `base`. Top-level `and`/`or` fold left to right. `depth` counts the
    /// groups and constructs already entered.
    fn build_condition(&mut self, text: &str, base: Position, depth: usize) -> Result<Condition> {
        let at = |off: usize| relative_to(base, offset_to_position(text, off));
        let segments = split_connectives(text);
        if segments.len() <= 1 {
            let lead = text.len() - text.trim_start().len();
            return self.build_simple(text.trim(), at(lead), depth);
        }

        let first_off = segments[0].offset;
        let mut acc = self.build_simple(segments[0].text, at(first_off), depth)?;
        let mut open: Option<ConditionKind> = None;
        for seg in segments.iter().skip(1) {
            let child = self.build_simple(seg.text, at(seg.offset), depth)?;
            let kind = match seg.connective {
                Some(Connective::Or) => ConditionKind::Or,
                _ => ConditionKind::And,
            };
            let end_off = seg.offset + seg.text.len();
            let range = Range::new(at(first_off), at(end_off));
            let content = text[first_off..end_off].to_string();
            if open == Some(kind) {
                acc.children.push(child);
                acc.range = range;
                acc.content = content;
            } else {
                let mut compound = bare(kind, &content, range);
                compound.children = vec![acc, child];
                acc = compound;
                open = Some(kind);
            }
        }
        Ok(acc)
    }

    fn build_simple(&mut self, text: &str, start: Position, depth: usize) -> Result<Condition> {
        let range = Range::new(start, end_of(text, start));
        if text.is_empty() {
            return Ok(bare(ConditionKind::Pattern, text, range));
        }

        let max_depth = self.options.pattern.max_depth;
        if depth >= max_depth {
            self.error(ParseError::warning(
                format!("Condition is nested more than {max_depth} levels deep; its inner part is not analysed"),
                range,
            ));
            return Ok(Condition {
                too_deep: true,
                ..bare(ConditionKind::Pattern, text, range)
            });
        }

        // explicit grouping
        if text.starts_with('(') && matching_close(text, 0) == Some(text.len() - 1) {
            return self.build_condition(
                &text[1..text.len() - 1],
                Position::new(start.line, start.column + 1),
                depth + 1,
            );
        }

        if let Some((0, keyword)) = find_keyword(text, 0)
            && let Some(node) = self.detector.detect_in_lines(self.lines, start)
        {
            return self.construct_condition(keyword, text, range, node, depth);
        }

        for (word, kind) in [("not", ConditionKind::Not), ("exists", ConditionKind::Exists)] {
            if !starts_with_word(text, word) {
                continue;
            }
            let rest = &text[word.len()..];
            let inner = rest.trim_start();
            if inner.is_empty() || inner.starts_with('(') {
                continue;
            }
            let off = text.len() - inner.len();
            let child = self.build_simple(inner, relative_to(start, offset_to_position(text, off)), depth + 1)?;
            let mut condition = bare(kind, text, range);
            condition.children.push(child);
            return Ok(condition);
        }

        if let Some((c, keyword @ (PatternKeyword::Accumulate | PatternKeyword::Collect))) = find_keyword(text, 0) {
            let head = text[..c].trim_end();
            if let Some(pattern_head) = head.strip_suffix("from")
                && pattern_head.as_bytes().last().is_none_or(|b| !is_ident_byte(*b))
            {
                let (variable, fact_type, constraints) = parse_pattern_head(pattern_head.trim());
                let node = self
                    .detector
                    .detect_in_lines(self.lines, relative_to(start, offset_to_position(text, c)));
                return Ok(Condition {
                    variable,
                    fact_type,
                    constraints,
                    source: Some(text[c..].to_string()),
                    pattern: node,
                    ..bare(kind_of(keyword), text, range)
                });
            }
        }

        let (variable, fact_type, constraints) = parse_pattern_head(text);
        let source = find_code_byte(text, b'(')
            .and_then(|p| matching_close(text, p))
            .map(|close| text[close + 1..].trim())
            .or_else(|| Some(text))
            .and_then(|rest| from_source(rest));
        Ok(Condition {
            variable,
            fact_type,
            constraints,
            source,
            ..bare(ConditionKind::Pattern, text, range)
        })
    }

    fn construct_condition(
        &mut self,
        keyword: PatternKeyword,
        text: &str,
        range: Range,
        node: PatternNode,
        depth: usize,
    ) -> Result<Condition> {
        let kind = kind_of(keyword);
        let mut condition = bare(kind, text, range);
        if matches!(kind, ConditionKind::Not | ConditionKind::Exists) && node.complete && !node.complexity_exceeded {
            let inner = strip_comments_multiline(&node.content);
            if !inner.trim().is_empty() {
                let child = self.build_condition(&inner, node.content_start, depth + 1)?;
                condition.children.push(child);
            }
        }
        condition.pattern = Some(node);
        Ok(condition)
    }
}

fn from_source(rest: &str) -> Option<String> {
    let idx = rest
        .match_indices("from")
        .map(|(i, _)| i)
        .find(|i| crate::scan::is_word_at(rest.as_bytes(), *i, 4))?;
    let source = rest[idx + 4..].trim();
    (!source.is_empty()).then(|| source.to_string())
}

/// `[$var :] Type( constraints )`, everything optional.
fn parse_pattern_head(text: &str) -> (Option<String>, Option<String>, Vec<FieldConstraint>) {
    let paren = find_code_byte(text, b'(');
    let head = &text[..paren.unwrap_or(text.len())];
    let head = match from_word_index(head) {
        Some(i) => &head[..i],
        None => head,
    };
    let (variable, type_part) = match head.find(':') {
        Some(i) => (Some(head[..i].trim().to_string()), &head[i + 1..]),
        None => (None, head),
    };
    let fact = type_part.trim();
    let fact_type = (!fact.is_empty()).then(|| fact.to_string());

    let constraints = match paren {
        Some(p) => {
            let close = matching_close(text, p).unwrap_or(text.len());
            split_commas(&text[p + 1..close.max(p + 1)])
                .into_iter()
                .map(|(_, piece)| parse_constraint(piece))
                .collect()
        }
        None => Vec::new(),
    };
    (variable, fact_type, constraints)
}

fn from_word_index(text: &str) -> Option<usize> {
    text.match_indices("from")
        .map(|(i, _)| i)
        .find(|i| crate::scan::is_word_at(text.as_bytes(), *i, 4))
}

fn parse_constraint(piece: &str) -> FieldConstraint {
    let bytes = piece.as_bytes();
    let ident_len = bytes.iter().take_while(|b| is_ident_byte(**b)).count();
    let after_ident = piece[ident_len..].trim_start();
    let (binding, rest) = if ident_len > 0 && after_ident.starts_with(':') && !after_ident.starts_with("::") {
        (Some(piece[..ident_len].to_string()), after_ident[1..].trim_start())
    } else {
        (None, piece)
    };

    let field_len = rest
        .bytes()
        .take_while(|b| is_ident_byte(*b) || *b == b'.' || *b == b'#')
        .count();
    if field_len == 0 {
        return FieldConstraint {
            binding,
            field: rest.to_string(),
            operator: None,
            value: None,
            text: piece.to_string(),
        };
    }
    let field = &rest[..field_len];
    let tail = rest[field_len..].trim_start();
    let operator = OPERATORS.iter().copied().find(|op| {
        tail.starts_with(op)
            && (!op.as_bytes()[0].is_ascii_alphabetic()
                || tail.as_bytes().get(op.len()).is_none_or(|b| !is_ident_byte(*b)))
    });
    let value = operator
        .map(|op| tail[op.len()..].trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string);
    FieldConstraint {
        binding,
        field: field.to_string(),
        operator: operator.map(str::to_string),
        value,
        text: piece.to_string(),
    }
}
