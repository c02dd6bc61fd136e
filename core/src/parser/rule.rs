use anyhow::{Result, bail};

use super::conditions::Boundary;
use super::helpers::{closing_quote, code, indent, is_line_comment, is_top_level, starts_with_word};
use super::{ParseError, ParserState};
use crate::ast::{ActionBlock, Attribute, AttributeValue, ConditionBlock, Rule};
use crate::diagnostic::Category;
use crate::position::{Position, Range};
use crate::scan::{extract_between, is_word_at};

const KNOWN_ATTRIBUTES: [&str; 15] = [
    "salience",
    "no-loop",
    "lock-on-active",
    "agenda-group",
    "activation-group",
    "auto-focus",
    "ruleflow-group",
    "dialect",
    "date-effective",
    "date-expires",
    "enabled",
    "duration",
    "timer",
    "calendars",
    "refract",
];

/// Name, its byte column, and the `extends` target of a rule header.
/// `after` is the column right after the `rule` keyword.
fn split_header(header: &str, after: usize) -> (String, usize, Option<String>) {
    let rest = header.get(after..).unwrap_or("");
    let name_col = after + (rest.len() - rest.trim_start().len());
    let rest = rest.trim();

    if rest.starts_with('"') {
        return match closing_quote(rest) {
            Some(q) => (rest[..=q].to_string(), name_col, extends_of(rest[q + 1..].trim())),
            None => (rest.to_string(), name_col, None),
        };
    }
    let extends = rest
        .match_indices("extends")
        .map(|(i, _)| i)
        .find(|i| *i > 0 && is_word_at(rest.as_bytes(), *i, "extends".len()));
    match extends {
        Some(i) => (rest[..i].trim_end().to_string(), name_col, extends_of(&rest[i..])),
        None => (rest.to_string(), name_col, None),
    }
}

fn extends_of(tail: &str) -> Option<String> {
    if !starts_with_word(tail, "extends") {
        return None;
    }
    let parent = tail["extends".len()..].trim();
    (!parent.is_empty()).then(|| parent.to_string())
}

/// Coerce an attribute value from its lexical form.
pub(crate) fn coerce_value(raw: &str) -> Option<AttributeValue> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let value = match raw {
        "true" => AttributeValue::Bool(true),
        "false" => AttributeValue::Bool(false),
        _ if (raw.starts_with('"') || raw.starts_with('\'')) && closing_quote(raw) == Some(raw.len() - 1) => {
            AttributeValue::String(raw[1..raw.len() - 1].to_string())
        }
        _ => {
            if let Ok(n) = raw.parse::<i64>() {
                AttributeValue::Integer(n)
            } else if looks_numeric(raw)
                && let Ok(n) = raw.parse::<f64>()
            {
                AttributeValue::Float(n)
            } else {
                AttributeValue::Raw(raw.to_string())
            }
        }
    };
    Some(value)
}

fn looks_numeric(raw: &str) -> bool {
    let digits = raw.trim_start_matches(['-', '+']);
    digits.as_bytes().first().is_some_and(|b| b.is_ascii_digit())
}

impl<'a> ParserState<'a> {
    /// `rule name [extends Parent]`, attributes, `when`, `then`, `end`.
    /// A missing `end` is reported and the rule closes at the next
    /// top-level keyword or the end of the window.
    pub(super) fn parse_rule(&mut self, idx: usize, col: usize) -> Result<()> {
        let header = code(self.line(idx)?);
        let after = (col + "rule".len()).min(header.len());
        let (name, name_col, parent) = split_header(header, after);
        let name_range = self.span(idx, name_col, name.len());

        let mut attributes = Vec::new();
        let mut l = idx + 1;
        let mut stop = loop {
            if l >= self.end {
                break Boundary::Eof;
            }
            let line = self.line(l)?;
            let raw = line.trim();
            let t = code(line).trim();
            if t.is_empty() || is_line_comment(raw) {
                l += 1;
                continue;
            }
            if raw.starts_with("/*") {
                l = self.skip_block_comment(l)?;
                continue;
            }
            if t == "end" {
                break Boundary::End(l);
            }
            if is_top_level(t) {
                break Boundary::TopLevel(l);
            }
            if starts_with_word(t, "when") {
                break Boundary::When(l);
            }
            if starts_with_word(t, "then") {
                break Boundary::Then(l);
            }
            if let Some(attribute) = self.parse_attribute(l)? {
                attributes.push(attribute);
            }
            l += 1;
        };

        let mut when = None;
        if let Boundary::When(wl) = stop {
            let wcol = indent(self.line(wl)?);
            let keyword_end = Position::new(wl as u32, (wcol + "when".len()) as u32);
            let (conditions, next) = self.parse_condition_lines(wl, wcol + "when".len(), true)?;
            let end = conditions.last().map(|c| c.range.end).unwrap_or(keyword_end);
            when = Some(ConditionBlock {
                conditions,
                range: Range::new(Position::new(wl as u32, wcol as u32), end),
            });
            stop = next;
        }

        let mut then = None;
        if let Boundary::Then(tl) = stop {
            let (action, next) = self.parse_action(tl)?;
            then = Some(action);
            stop = next;
        }

        let start = Position::new(idx as u32, col as u32);
        let (end, has_end) = match stop {
            Boundary::When(l) | Boundary::Then(l) => bail!("rule section out of order at line {}", l + 1),
            other => self.close_section(idx, other)?,
        };

        if !has_end {
            let shown = if name.is_empty() { "<unnamed>" } else { name.as_str() };
            self.error(
                ParseError::new(
                    format!("Rule {shown} is missing its closing 'end'"),
                    Range::new(start, name_range.end.max(Position::new(idx as u32, after as u32))),
                )
                .with_category(Category::MissingEnd),
            );
        }

        self.tree.rules.push(Rule {
            name,
            name_range,
            parent,
            attributes,
            when,
            then,
            has_end,
            range: Range::new(start, end),
        });
        Ok(())
    }

    fn parse_attribute(&mut self, l: usize) -> Result<Option<Attribute>> {
        let line = self.line(l)?;
        let col = indent(line);
        let t = code(line).trim();
        let name_len = t
            .bytes()
            .take_while(|b| b.is_ascii_alphanumeric() || *b == b'-' || *b == b'_')
            .count();
        let name = &t[..name_len];
        let rest = &t[name_len..];
        let known = KNOWN_ATTRIBUTES.contains(&name);
        let separated = rest.is_empty() || rest.starts_with(char::is_whitespace) || (known && rest.starts_with('('));

        if name.is_empty() || !separated {
            self.error(ParseError::new(
                format!("Unexpected '{t}' in rule header; expected an attribute, 'when' or 'then'"),
                self.span(l, col, t.len()),
            ));
            return Ok(None);
        }
        if !known {
            self.error(ParseError::warning(
                format!("Unknown rule attribute '{name}'"),
                self.span(l, col, name_len),
            ));
        }
        Ok(Some(Attribute {
            name: name.to_string(),
            value: coerce_value(rest),
            range: self.span(l, col, t.len()),
        }))
    }

    /// Consequence after `then` (same line included) up to `end`, a
    /// top-level keyword or the window end. Kept verbatim.
    fn parse_action(&mut self, tl: usize) -> Result<(ActionBlock, Boundary)> {
        let tcol = indent(self.line(tl)?);
        let content_start = Position::new(tl as u32, (tcol + "then".len()) as u32);

        let mut l = tl + 1;
        let stop = loop {
            if l >= self.end {
                break Boundary::Eof;
            }
            let t = code(self.line(l)?).trim();
            if t == "end" {
                break Boundary::End(l);
            }
            if is_top_level(t) {
                break Boundary::TopLevel(l);
            }
            l += 1;
        };

        // content runs through the end of the line before the boundary
        let last = l - 1;
        let content_end = Position::new(last as u32, self.line(last)?.len() as u32).max(content_start);
        let content = extract_between(self.lines, content_start, content_end);
        let range_end = if last == tl {
            content_end
        } else {
            self.line_end(self.last_code_line(tl, l)?)?.max(content_start)
        };
        Ok((
            ActionBlock {
                content,
                range: Range::new(content_start, range_end),
            },
            stop,
        ))
    }
}
