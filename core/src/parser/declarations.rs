use anyhow::Result;

use super::conditions::Boundary;
use super::helpers::{
    closing_quote, code, find_code_byte, indent, is_line_comment, is_top_level, parse_parameters, starts_with_word,
    strip_semicolon,
};
use super::{ParseError, ParserState};
use crate::ast::{
    FieldDecl, FunctionDecl, GlobalDecl, ImportDecl, ImportKind, PackageDecl, Query, TypeDeclaration,
};
use crate::diagnostic::Category;
use crate::position::{Position, Range};
use crate::scan::{StringState, extract_between, matching_close, strip_comment};

impl<'a> ParserState<'a> {
    /// Text after `keyword` on line `idx` and the column where it starts.
    fn after_keyword(&self, idx: usize, col: usize, keyword: &str) -> Result<(&'a str, usize)> {
        let text = code(self.line(idx)?);
        let from = (col + keyword.len()).min(text.len());
        let rest = &text[from..];
        let lead = rest.len() - rest.trim_start().len();
        Ok((rest.trim(), from + lead))
    }

    fn item_range(&self, idx: usize, col: usize) -> Result<Range> {
        Ok(Range::new(Position::new(idx as u32, col as u32), self.line_end(idx)?))
    }

    pub(super) fn parse_package(&mut self, idx: usize, col: usize) -> Result<()> {
        let (rest, _) = self.after_keyword(idx, col, "package")?;
        let name = strip_semicolon(rest);
        let range = self.item_range(idx, col)?;
        self.cursor = idx + 1;
        if name.is_empty() {
            self.error(ParseError::new("Expected a package name after 'package'", range));
            return Ok(());
        }
        // the first declaration wins; later ones are ignored
        if self.tree.package.is_none() {
            self.tree.package = Some(PackageDecl {
                name: name.to_string(),
                range,
            });
        }
        Ok(())
    }

    pub(super) fn parse_import(&mut self, idx: usize, col: usize) -> Result<()> {
        let (rest, _) = self.after_keyword(idx, col, "import")?;
        let (kind, path) = if starts_with_word(rest, "function") {
            (ImportKind::Function, &rest["function".len()..])
        } else if starts_with_word(rest, "static") {
            (ImportKind::Static, &rest["static".len()..])
        } else {
            (ImportKind::Type, rest)
        };
        let path = strip_semicolon(path);
        let range = self.item_range(idx, col)?;
        self.cursor = idx + 1;
        if path.is_empty() {
            self.error(ParseError::new("Expected an import path after 'import'", range));
            return Ok(());
        }
        self.tree.imports.push(ImportDecl {
            path: path.to_string(),
            kind,
            range,
        });
        Ok(())
    }

    pub(super) fn parse_global(&mut self, idx: usize, col: usize) -> Result<()> {
        let (rest, _) = self.after_keyword(idx, col, "global")?;
        let mut tokens: Vec<&str> = strip_semicolon(rest).split_whitespace().collect();
        let range = self.item_range(idx, col)?;
        self.cursor = idx + 1;
        if tokens.len() < 2 {
            self.error(ParseError::new("Expected 'global <Type> <identifier>'", range));
            return Ok(());
        }
        let name = tokens.pop().unwrap_or_default().to_string();
        self.tree.globals.push(GlobalDecl {
            type_name: tokens.join(" "),
            name,
            range,
        });
        Ok(())
    }

    /// `function RetType name(params) { body }`; the body is read until its
    /// braces balance.
    pub(super) fn parse_function(&mut self, idx: usize, col: usize) -> Result<()> {
        let keyword = self.span(idx, col, "function".len());
        let Some((open_line, open_col, header)) = self.function_header(idx, col)? else {
            self.error(ParseError::new("Expected '{' to open the function body", keyword));
            self.cursor = idx + 1;
            return Ok(());
        };

        let (signature, parameters) = match find_code_byte(&header, b'(') {
            Some(p) => {
                let close = matching_close(&header, p).unwrap_or(header.len());
                (header[..p].to_string(), parse_parameters(&header[p + 1..close.max(p + 1)]))
            }
            None => {
                self.error(ParseError::new("Expected a parameter list in function declaration", keyword));
                (header.clone(), Vec::new())
            }
        };
        let mut tokens: Vec<&str> = signature.split_whitespace().collect();
        let name = tokens.pop().unwrap_or_default().to_string();
        if name.is_empty() {
            self.error(ParseError::new("Expected a function name", keyword));
        }
        let return_type = (!tokens.is_empty()).then(|| tokens.join(" "));

        let mut depth = 0i64;
        let mut close: Option<Position> = None;
        let mut last = open_line;
        'scan: for l in open_line..self.end {
            let line = self.line(l)?;
            if l > open_line && is_top_level(line.trim()) {
                break;
            }
            last = l;
            let text = strip_comment(line);
            let from = if l == open_line { open_col } else { 0 };
            let mut state = StringState::default();
            for (i, b) in text.bytes().enumerate().skip(from) {
                if !state.feed(b) {
                    continue;
                }
                match b {
                    b'{' => depth += 1,
                    b'}' => {
                        depth -= 1;
                        if depth == 0 {
                            close = Some(Position::new(l as u32, i as u32));
                            break 'scan;
                        }
                    }
                    _ => {}
                }
            }
        }

        let body_start = Position::new(open_line as u32, open_col as u32 + 1);
        let (body_end, end) = match close {
            Some(c) => (c, Position::new(c.line, c.column + 1)),
            None => {
                self.error(ParseError::new(
                    format!("Function {name} has an unterminated body; expected '}}'"),
                    keyword,
                ));
                let end = self.line_end(self.last_code_line(idx, last + 1)?)?;
                (end, end)
            }
        };
        self.tree.functions.push(FunctionDecl {
            return_type,
            name,
            parameters,
            body: extract_between(self.lines, body_start, body_end),
            has_end: close.is_some(),
            range: Range::new(Position::new(idx as u32, col as u32), end),
        });
        self.cursor = last + 1;
        Ok(())
    }

    /// Signature text between `function` and `{`, with the brace position.
    fn function_header(&self, idx: usize, col: usize) -> Result<Option<(usize, usize, String)>> {
        let mut header = String::new();
        for l in idx..self.end {
            let line = self.line(l)?;
            if l > idx && is_top_level(line.trim()) {
                break;
            }
            let text = strip_comment(line);
            let from = if l == idx { (col + "function".len()).min(text.len()) } else { 0 };
            let seg = &text[from..];
            if let Some(b) = find_code_byte(seg, b'{') {
                header.push_str(&seg[..b]);
                return Ok(Some((l, from + b, header)));
            }
            header.push_str(seg);
            header.push(' ');
        }
        Ok(None)
    }

    /// `query name(params)` followed by conditions up to `end`.
    pub(super) fn parse_query(&mut self, idx: usize, col: usize) -> Result<()> {
        let (rest, rest_col) = self.after_keyword(idx, col, "query")?;
        let name_len = if rest.starts_with('"') {
            closing_quote(rest).map(|q| q + 1).unwrap_or(rest.len())
        } else {
            rest.find(|c: char| c.is_whitespace() || c == '(').unwrap_or(rest.len())
        };
        let name = rest[..name_len].to_string();
        let name_range = self.span(idx, rest_col, name_len);
        let keyword = self.span(idx, col, "query".len());
        if name.is_empty() {
            self.error(ParseError::new("Expected a query name after 'query'", keyword));
        }
        let tail = &rest[name_len..];
        let parameters = match find_code_byte(tail, b'(') {
            Some(p) => {
                let close = matching_close(tail, p).unwrap_or(tail.len());
                parse_parameters(&tail[p + 1..close.max(p + 1)])
            }
            None => Vec::new(),
        };

        let (conditions, stop) = self.parse_condition_lines(idx + 1, 0, false)?;
        let (end, has_end) = self.close_section(idx, stop)?;
        if !has_end {
            self.error(
                ParseError::new(format!("Query {name} is missing its closing 'end'"), keyword)
                    .with_category(Category::MissingEnd),
            );
        }
        self.tree.queries.push(Query {
            name,
            name_range,
            parameters,
            conditions,
            has_end,
            range: Range::new(Position::new(idx as u32, col as u32), end),
        });
        Ok(())
    }

    /// `declare Name [extends Parent]`, annotations and `field : Type` lines up to `end`.
    pub(super) fn parse_declare(&mut self, idx: usize, col: usize) -> Result<()> {
        let (rest, _) = self.after_keyword(idx, col, "declare")?;
        let keyword = self.span(idx, col, "declare".len());
        let mut words = rest.split_whitespace();
        let name = words.next().unwrap_or_default().to_string();
        let parent = match (words.next(), words.next()) {
            (Some("extends"), Some(p)) => Some(p.to_string()),
            _ => None,
        };
        if name.is_empty() {
            self.error(ParseError::new("Expected a type name after 'declare'", keyword));
        }

        let mut annotations = Vec::new();
        let mut fields = Vec::new();
        let mut l = idx + 1;
        let stop = loop {
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
            let fcol = indent(line);
            if t.starts_with('@') {
                annotations.push(t.to_string());
            } else if let Some((field, ty)) = t.split_once(':')
                && !field.trim().is_empty()
                && !ty.trim().is_empty()
            {
                let type_name = ty.split_whitespace().next().unwrap_or_default().to_string();
                fields.push(FieldDecl {
                    name: field.trim().to_string(),
                    type_name,
                    range: self.span(l, fcol, t.len()),
                });
            } else {
                self.error(ParseError::warning(
                    format!("Expected 'name : Type' in declaration of {name}"),
                    self.span(l, fcol, t.len()),
                ));
            }
            l += 1;
        };

        let (end, has_end) = self.close_section(idx, stop)?;
        if !has_end {
            self.error(
                ParseError::new(format!("Declaration {name} is missing its closing 'end'"), keyword)
                    .with_category(Category::MissingEnd),
            );
        }
        self.tree.declarations.push(TypeDeclaration {
            name,
            parent,
            annotations,
            fields,
            has_end,
            range: Range::new(Position::new(idx as u32, col as u32), end),
        });
        Ok(())
    }

    /// Advance past a section that stopped at `stop` and report where the
    /// item ends and whether it was properly closed.
    pub(super) fn close_section(&mut self, idx: usize, stop: Boundary) -> Result<(Position, bool)> {
        match stop {
            Boundary::End(el) => {
                let ecol = indent(self.line(el)?);
                self.cursor = el + 1;
                Ok((Position::new(el as u32, (ecol + "end".len()) as u32), true))
            }
            other => {
                let until = other.line().unwrap_or(self.end);
                self.cursor = until;
                Ok((self.line_end(self.last_code_line(idx, until)?)?, false))
            }
        }
    }
}
