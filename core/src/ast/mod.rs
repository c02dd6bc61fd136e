use std::fmt;

use serde::Serialize;

use crate::pattern::PatternNode;
use crate::position::Range;

mod shift;

pub(crate) use shift::ShiftLines;

/// Root of a parsed DRL document. Owns every node below it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyntaxTree {
    pub package: Option<PackageDecl>,
    pub imports: Vec<ImportDecl>,
    pub globals: Vec<GlobalDecl>,
    pub functions: Vec<FunctionDecl>,
    pub rules: Vec<Rule>,
    pub queries: Vec<Query>,
    pub declarations: Vec<TypeDeclaration>,
}

impl SyntaxTree {
    pub fn is_empty(&self) -> bool {
        self.package.is_none()
            && self.imports.is_empty()
            && self.globals.is_empty()
            && self.functions.is_empty()
            && self.rules.is_empty()
            && self.queries.is_empty()
            && self.declarations.is_empty()
    }

    /// Top-level multi-line constructs of every rule and query, in document order.
    pub fn patterns(&self) -> impl Iterator<Item = &PatternNode> {
        let from_rules = self
            .rules
            .iter()
            .filter_map(|r| r.when.as_ref())
            .flat_map(|w| w.conditions.iter());
        let from_queries = self.queries.iter().flat_map(|q| q.conditions.iter());
        from_rules.chain(from_queries).flat_map(|c| c.patterns())
    }

    /// Range of every top-level item, sorted by start, paired with whether
    /// the item was properly terminated.
    pub(crate) fn item_spans(&self) -> Vec<(Range, bool)> {
        let mut out: Vec<(Range, bool)> = Vec::new();
        out.extend(self.package.iter().map(|p| (p.range, true)));
        out.extend(self.imports.iter().map(|i| (i.range, true)));
        out.extend(self.globals.iter().map(|g| (g.range, true)));
        out.extend(self.functions.iter().map(|f| (f.range, f.has_end)));
        out.extend(self.rules.iter().map(|r| (r.range, r.has_end)));
        out.extend(self.queries.iter().map(|q| (q.range, q.has_end)));
        out.extend(self.declarations.iter().map(|d| (d.range, d.has_end)));
        out.sort_by_key(|(range, _)| *range);
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageDecl {
    pub name: String,
    pub range: Range,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    Type,
    Function,
    Static,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportDecl {
    pub path: String,
    pub kind: ImportKind,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalDecl {
    pub type_name: String,
    pub name: String,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub type_name: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDecl {
    pub return_type: Option<String>,
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub body: String,
    /// False when the body's closing brace was never found.
    pub has_end: bool,
    pub range: Range,
}

/// Attribute value, coerced from its lexical form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Raw(String),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Bool(b) => write!(f, "{b}"),
            AttributeValue::Integer(n) => write!(f, "{n}"),
            AttributeValue::Float(n) => write!(f, "{n}"),
            AttributeValue::String(s) => write!(f, "\"{s}\""),
            AttributeValue::Raw(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    pub name: String,
    pub value: Option<AttributeValue>,
    pub range: Range,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionKind {
    Pattern,
    Exists,
    Not,
    Eval,
    Forall,
    Collect,
    Accumulate,
    And,
    Or,
}

/// `[binding :] field [operator value]` inside a pattern's parentheses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldConstraint {
    pub binding: Option<String>,
    pub field: String,
    pub operator: Option<String>,
    pub value: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Condition {
    pub kind: ConditionKind,
    /// Raw source text of the whole condition (may span lines).
    pub content: String,
    pub variable: Option<String>,
    pub fact_type: Option<String>,
    pub constraints: Vec<FieldConstraint>,
    /// Expression after `from`, if any.
    pub source: Option<String>,
    /// Operands of `and`/`or`, or the pattern wrapped by a bare `not`/`exists`.
    pub children: Vec<Condition>,
    pub pattern: Option<PatternNode>,
    pub range: Range,
    /// Nested past the depth limit; `content` was not analysed.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub too_deep: bool,
}

impl Condition {
    /// Top-level constructs attached to this condition or its operands.
    pub fn patterns(&self) -> Vec<&PatternNode> {
        let mut out: Vec<&PatternNode> = self.pattern.iter().collect();
        for child in &self.children {
            out.extend(child.patterns());
        }
        out
    }

    /// This condition and all operand conditions, pre-order.
    pub fn walk(&self) -> Vec<&Condition> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.walk());
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionBlock {
    pub conditions: Vec<Condition>,
    pub range: Range,
}

/// Consequence code; kept opaque.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionBlock {
    pub content: String,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rule {
    /// Name as written, quotes included.
    pub name: String,
    pub name_range: Range,
    pub parent: Option<String>,
    pub attributes: Vec<Attribute>,
    pub when: Option<ConditionBlock>,
    pub then: Option<ActionBlock>,
    pub has_end: bool,
    pub range: Range,
}

impl Rule {
    pub fn unquoted_name(&self) -> &str {
        unquote(&self.name)
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Query {
    pub name: String,
    pub name_range: Range,
    pub parameters: Vec<Parameter>,
    pub conditions: Vec<Condition>,
    pub has_end: bool,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDecl {
    pub name: String,
    pub type_name: String,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeDeclaration {
    pub name: String,
    pub parent: Option<String>,
    pub annotations: Vec<String>,
    pub fields: Vec<FieldDecl>,
    pub has_end: bool,
    pub range: Range,
}

/// A name is quoted iff it starts and ends with `"` and is at least two bytes long.
pub fn is_quoted(name: &str) -> bool {
    name.len() >= 2 && name.starts_with('"') && name.ends_with('"')
}

pub fn unquote(name: &str) -> &str {
    if is_quoted(name) { &name[1..name.len() - 1] } else { name }
}
