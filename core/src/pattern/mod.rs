use std::fmt;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::position::{Position, Range, offset_to_position, relative_to};
use crate::scan::{Connective, split_connectives};

mod detector;

pub use detector::{PatternDetector, find_keyword};

/// Keywords that introduce a bracketed, possibly multi-line construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKeyword {
    Exists,
    Not,
    Eval,
    Forall,
    Collect,
    Accumulate,
}

impl PatternKeyword {
    pub const ALL: [PatternKeyword; 6] = [
        PatternKeyword::Exists,
        PatternKeyword::Not,
        PatternKeyword::Eval,
        PatternKeyword::Forall,
        PatternKeyword::Collect,
        PatternKeyword::Accumulate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PatternKeyword::Exists => "exists",
            PatternKeyword::Not => "not",
            PatternKeyword::Eval => "eval",
            PatternKeyword::Forall => "forall",
            PatternKeyword::Collect => "collect",
            PatternKeyword::Accumulate => "accumulate",
        }
    }

    pub fn from_word(word: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == word)
    }
}

impl fmt::Display for PatternKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A piece of pattern content between top-level `and`/`or` connectives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InnerCondition {
    pub connective: Option<Connective>,
    pub text: String,
    pub range: Range,
}

/// Metadata for one keyword construct and the constructs nested in it.
///
/// The tree is strictly owned: children live inside their parent and
/// nothing points back up.
#[derive(Debug, Clone, Serialize)]
pub struct PatternNode {
    pub keyword: PatternKeyword,
    /// From the keyword through the closing bracket (or the last line read
    /// when the construct never closes).
    pub range: Range,
    /// Text between the construct's outer brackets.
    pub content: String,
    pub content_start: Position,
    pub complete: bool,
    pub multiline: bool,
    /// `1 + max(child depth)`; never larger than the configured depth cap.
    pub depth: usize,
    /// Set when a cap stopped this node (or a descendant) from being expanded.
    pub complexity_exceeded: bool,
    pub children: Vec<PatternNode>,
    /// Ranges of the bracket pairs inside the construct, outer pair included.
    pub brackets: Vec<Range>,
    #[serde(skip)]
    inner: OnceCell<Vec<InnerCondition>>,
}

impl PartialEq for PatternNode {
    fn eq(&self, other: &Self) -> bool {
        self.keyword == other.keyword
            && self.range == other.range
            && self.content == other.content
            && self.content_start == other.content_start
            && self.complete == other.complete
            && self.multiline == other.multiline
            && self.depth == other.depth
            && self.complexity_exceeded == other.complexity_exceeded
            && self.children == other.children
            && self.brackets == other.brackets
    }
}

impl Eq for PatternNode {}

impl PatternNode {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        keyword: PatternKeyword,
        range: Range,
        content: String,
        content_start: Position,
        complete: bool,
        multiline: bool,
        complexity_exceeded: bool,
        children: Vec<PatternNode>,
        brackets: Vec<Range>,
    ) -> Self {
        let depth = 1 + children.iter().map(|c| c.depth).max().unwrap_or(0);
        let complexity_exceeded = complexity_exceeded || children.iter().any(|c| c.complexity_exceeded);
        Self {
            keyword,
            range,
            content,
            content_start,
            complete,
            multiline,
            depth,
            complexity_exceeded,
            children,
            brackets,
            inner: OnceCell::new(),
        }
    }

    /// Non-construct content split on top-level `and`/`or`, computed on first use.
    pub fn inner_conditions(&self) -> &[InnerCondition] {
        self.inner.get_or_init(|| {
            split_connectives(&self.content)
                .into_iter()
                .filter(|seg| !matches!(find_keyword(seg.text, 0), Some((0, _))))
                .map(|seg| {
                    let start = relative_to(self.content_start, offset_to_position(&self.content, seg.offset));
                    let end = relative_to(
                        self.content_start,
                        offset_to_position(&self.content, seg.offset + seg.text.len()),
                    );
                    InnerCondition {
                        connective: seg.connective,
                        text: seg.text.to_string(),
                        range: Range::new(start, end),
                    }
                })
                .collect()
        })
    }

    /// This node and all descendants, pre-order.
    pub fn iter(&self) -> impl Iterator<Item = &PatternNode> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }

    pub fn total_patterns(&self) -> usize {
        self.iter().count()
    }

    pub(crate) fn shift_lines(&mut self, delta: i64) {
        self.range = self.range.shifted(delta);
        self.content_start = self.content_start.shifted(delta);
        for r in &mut self.brackets {
            *r = r.shifted(delta);
        }
        for child in &mut self.children {
            child.shift_lines(delta);
        }
        self.inner = OnceCell::new();
    }
}
