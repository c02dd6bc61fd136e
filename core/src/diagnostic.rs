use std::fmt;

use serde::{Deserialize, Serialize};

use crate::position::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Information,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Information => "info",
        };
        f.write_str(s)
    }
}

/// The three validation passes that make up one validation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationCategory {
    Syntax,
    Semantic,
    BestPractice,
}

impl ValidationCategory {
    pub const ALL: [ValidationCategory; 3] = [
        ValidationCategory::Syntax,
        ValidationCategory::Semantic,
        ValidationCategory::BestPractice,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            ValidationCategory::Syntax => 0,
            ValidationCategory::Semantic => 1,
            ValidationCategory::BestPractice => 2,
        }
    }
}

/// Stable tag naming the check that produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    ParseError,
    MissingEnd,
    BracketMismatch,
    Critical,
    FileSize,
    DuplicateName,
    RuleName,
    Structure,
    UndefinedVariable,
    BestPractice,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::ParseError => "parse-error",
            Category::MissingEnd => "missing-end",
            Category::BracketMismatch => "bracket-mismatch",
            Category::Critical => "critical",
            Category::FileSize => "file-size",
            Category::DuplicateName => "duplicate-name",
            Category::RuleName => "rule-name",
            Category::Structure => "structure",
            Category::UndefinedVariable => "undefined-variable",
            Category::BestPractice => "best-practice",
        }
    }

    pub fn validation_category(self) -> ValidationCategory {
        match self {
            Category::ParseError
            | Category::MissingEnd
            | Category::BracketMismatch
            | Category::Critical
            | Category::FileSize => ValidationCategory::Syntax,
            Category::DuplicateName | Category::RuleName | Category::Structure | Category::UndefinedVariable => {
                ValidationCategory::Semantic
            }
            Category::BestPractice => ValidationCategory::BestPractice,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Diagnostic {
    pub range: Range,
    pub message: String,
    pub severity: Severity,
    pub category: Category,
    /// Secondary location, e.g. the first definition of a duplicated name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related: Option<Range>,
}

impl Diagnostic {
    pub fn new(range: Range, severity: Severity, category: Category, message: impl Into<String>) -> Self {
        Self {
            range,
            message: message.into(),
            severity,
            category,
            related: None,
        }
    }

    pub fn error(range: Range, category: Category, message: impl Into<String>) -> Self {
        Self::new(range, Severity::Error, category, message)
    }

    pub fn warning(range: Range, category: Category, message: impl Into<String>) -> Self {
        Self::new(range, Severity::Warning, category, message)
    }

    pub fn information(range: Range, category: Category, message: impl Into<String>) -> Self {
        Self::new(range, Severity::Information, category, message)
    }

    pub fn with_related(mut self, related: Range) -> Self {
        self.related = Some(related);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} [{}] at {}",
            self.severity, self.message, self.category, self.range.start
        )
    }
}
