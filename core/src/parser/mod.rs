use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use serde::Serialize;
use tracing::{debug, warn};

use crate::ast::SyntaxTree;
use crate::bracket::BracketTracker;
use crate::config::ParserOptions;
use crate::diagnostic::{Category, Diagnostic, Severity};
use crate::pattern::PatternDetector;
use crate::position::{Position, Range};

mod conditions;
mod declarations;
mod helpers;
mod incremental;
mod program;
mod rule;

#[cfg(test)]
mod parser_test;
#[cfg(test)]
mod rule_test;

pub use incremental::{EditHull, TextEdit};

/// A structural problem found while parsing. Never raised; always collected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseError {
    pub message: String,
    pub range: Range,
    pub severity: Severity,
    pub category: Category,
}

impl ParseError {
    pub fn new(message: impl Into<String>, range: Range) -> Self {
        Self {
            message: message.into(),
            range,
            severity: Severity::Error,
            category: Category::ParseError,
        }
    }

    pub fn warning(message: impl Into<String>, range: Range) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::new(message, range)
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::new(self.range, self.severity, self.category, self.message.clone())
    }

    pub(crate) fn shift_lines(&mut self, delta: i64) {
        self.range = self.range.shifted(delta);
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.range)
    }
}

impl std::error::Error for ParseError {}

/// How a parse ended, beyond its tree and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParseOutcome {
    #[default]
    Complete,
    /// More errors were found than the configured cap; the rest were dropped.
    ErrorCapReached,
    /// The document exceeded the size limit and was not parsed.
    TooLarge,
    /// An internal failure was caught; the tree is empty.
    Critical,
}

/// Everything one parse produces. Owns its tree outright.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseResult {
    pub tree: SyntaxTree,
    pub errors: Vec<ParseError>,
    #[serde(skip)]
    pub brackets: BracketTracker,
    pub outcome: ParseOutcome,
    pub line_count: usize,
    #[serde(skip)]
    max_errors: usize,
}

impl ParseResult {
    fn fallback(error: ParseError, outcome: ParseOutcome, line_count: usize, max_errors: usize) -> Self {
        Self {
            tree: SyntaxTree::default(),
            errors: vec![error],
            brackets: BracketTracker::new(),
            outcome,
            line_count,
            max_errors,
        }
    }

    /// Parser errors plus bracket issues, in document order, bounded by the
    /// error cap.
    pub fn all_errors(&self) -> Vec<ParseError> {
        let mut all = self.errors.clone();
        all.extend(self.brackets.table().issues.iter().map(|issue| {
            ParseError::new(issue.message(), issue.range()).with_category(Category::BracketMismatch)
        }));
        all.sort_by_key(|e| e.range.start);
        all.truncate(self.max_errors.max(1));
        all
    }

    pub fn syntax_diagnostics(&self) -> Vec<Diagnostic> {
        self.all_errors().iter().map(ParseError::to_diagnostic).collect()
    }

    pub fn has_errors(&self) -> bool {
        self.errors.iter().any(|e| e.severity == Severity::Error) || !self.brackets.table().issues.is_empty()
    }
}

/// Line-oriented DRL parser. Holds only configuration; every parse builds
/// its own [`ParserState`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Parser {
    options: ParserOptions,
}

impl Parser {
    pub fn new(options: ParserOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> ParserOptions {
        self.options
    }

    /// Parse a whole document. Never panics and never fails: internal
    /// failures come back as an empty tree with one critical error.
    pub fn parse(&self, text: &str) -> ParseResult {
        if text.len() > self.options.max_file_size {
            debug!(len = text.len(), limit = self.options.max_file_size, "document over size limit, not parsing");
            return ParseResult::fallback(
                ParseError::warning(
                    format!(
                        "File is too large to analyze ({} bytes, limit {} bytes)",
                        text.len(),
                        self.options.max_file_size
                    ),
                    Range::point(Position::start()),
                )
                .with_category(Category::FileSize),
                ParseOutcome::TooLarge,
                0,
                self.options.max_errors,
            );
        }
        self.guarded(text, |lines| self.parse_full(text, lines))
    }

    /// Reparse after `edits`, reusing `previous` (the result for the text
    /// before the edits) where possible. The result always equals
    /// `self.parse(text)`.
    pub fn parse_incremental(&self, previous: &ParseResult, text: &str, edits: &[TextEdit]) -> ParseResult {
        let Some(hull) = EditHull::from_edits(edits) else {
            return self.parse(text);
        };
        if text.len() > self.options.max_file_size || previous.outcome != ParseOutcome::Complete {
            return self.parse(text);
        }
        self.guarded(text, |lines| match self.splice(previous, lines, hull)? {
            Some(result) => Ok(result),
            None => self.parse_full(text, lines),
        })
    }

    fn guarded<F>(&self, text: &str, run: F) -> ParseResult
    where
        F: FnOnce(&[&str]) -> anyhow::Result<ParseResult>,
    {
        let lines: Vec<&str> = text.split('\n').collect();
        let line_count = lines.len();
        let outcome = catch_unwind(AssertUnwindSafe(|| run(&lines)));
        let failure = match outcome {
            Ok(Ok(result)) => return result,
            Ok(Err(err)) => format!("{err:#}"),
            Err(panic) => panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string()),
        };
        warn!(error = %failure, "parser failed, returning empty tree");
        ParseResult::fallback(
            ParseError::new("Internal parser error; analysis results are unavailable", Range::point(Position::start()))
                .with_category(Category::Critical),
            ParseOutcome::Critical,
            line_count,
            self.options.max_errors,
        )
    }

    fn parse_full(&self, text: &str, lines: &[&str]) -> anyhow::Result<ParseResult> {
        let mut state = ParserState::new(lines, 0, lines.len(), self.options);
        state.parse_items()?;
        let outcome = if state.capped {
            ParseOutcome::ErrorCapReached
        } else {
            ParseOutcome::Complete
        };
        Ok(ParseResult {
            tree: state.tree,
            errors: state.errors,
            brackets: BracketTracker::from_text(text),
            outcome,
            line_count: lines.len(),
            max_errors: self.options.max_errors,
        })
    }
}

/// Parse with default options.
pub fn parse(text: &str) -> ParseResult {
    Parser::default().parse(text)
}

/// Mutable state of one parse over the line window `[cursor, end)`.
///
/// `lines` is always the whole document so multi-line constructs can be
/// read past the window; items themselves never start outside it.
pub(crate) struct ParserState<'a> {
    pub(crate) lines: &'a [&'a str],
    pub(crate) cursor: usize,
    pub(crate) end: usize,
    pub(crate) tree: SyntaxTree,
    pub(crate) errors: Vec<ParseError>,
    pub(crate) capped: bool,
    /// Set when the window ended inside a `/* ... */` comment.
    pub(crate) open_comment: bool,
    pub(crate) detector: PatternDetector,
    pub(crate) options: ParserOptions,
}

impl<'a> ParserState<'a> {
    pub(crate) fn new(lines: &'a [&'a str], start: usize, end: usize, options: ParserOptions) -> Self {
        Self {
            lines,
            cursor: start,
            end: end.min(lines.len()),
            tree: SyntaxTree::default(),
            errors: Vec::new(),
            capped: false,
            open_comment: false,
            detector: PatternDetector::new(options.pattern),
            options,
        }
    }

    pub(crate) fn error(&mut self, error: ParseError) {
        if self.errors.len() < self.options.max_errors {
            self.errors.push(error);
        } else {
            self.capped = true;
        }
    }
}
