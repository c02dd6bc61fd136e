use std::mem::size_of;

use crate::ast::{Condition, Rule, SyntaxTree};
use crate::bracket::{BracketPair, BracketPos, BracketTable};
use crate::diagnostic::Diagnostic;
use crate::parser::{ParseError, ParseResult};
use crate::pattern::PatternNode;
use crate::position::Range;

/// Approximate heap footprint in bytes, from node and string counts.
/// Only used to order and bound cache eviction.
pub trait EstimateSize {
    fn estimated_size(&self) -> usize;
}

impl<T: EstimateSize> EstimateSize for Vec<T> {
    fn estimated_size(&self) -> usize {
        size_of::<Self>() + self.iter().map(EstimateSize::estimated_size).sum::<usize>()
    }
}

impl EstimateSize for PatternNode {
    fn estimated_size(&self) -> usize {
        size_of::<Self>()
            + self.content.len()
            + self.brackets.len() * size_of::<Range>()
            + self.children.estimated_size()
    }
}

impl EstimateSize for Condition {
    fn estimated_size(&self) -> usize {
        let constraints: usize = self
            .constraints
            .iter()
            .map(|c| c.text.len() + c.field.len() + c.value.as_ref().map_or(0, String::len))
            .sum();
        size_of::<Self>()
            + self.content.len()
            + self.variable.as_ref().map_or(0, String::len)
            + self.fact_type.as_ref().map_or(0, String::len)
            + self.source.as_ref().map_or(0, String::len)
            + constraints
            + self.children.estimated_size()
            + self.pattern.as_ref().map_or(0, EstimateSize::estimated_size)
    }
}

impl EstimateSize for Rule {
    fn estimated_size(&self) -> usize {
        let attributes: usize = self.attributes.iter().map(|a| 64 + a.name.len()).sum();
        size_of::<Self>()
            + self.name.len()
            + attributes
            + self.when.as_ref().map_or(0, |w| w.conditions.estimated_size())
            + self.then.as_ref().map_or(0, |t| t.content.len())
    }
}

impl EstimateSize for SyntaxTree {
    fn estimated_size(&self) -> usize {
        let imports: usize = self.imports.iter().map(|i| 48 + i.path.len()).sum();
        let globals: usize = self.globals.iter().map(|g| 64 + g.type_name.len() + g.name.len()).sum();
        let functions: usize = self.functions.iter().map(|f| 96 + f.name.len() + f.body.len()).sum();
        let queries: usize = self
            .queries
            .iter()
            .map(|q| 96 + q.name.len() + q.conditions.estimated_size())
            .sum();
        let declarations: usize = self
            .declarations
            .iter()
            .map(|d| 96 + d.name.len() + d.fields.len() * 64 + d.annotations.iter().map(String::len).sum::<usize>())
            .sum();
        size_of::<Self>()
            + self.package.as_ref().map_or(0, |p| 48 + p.name.len())
            + imports
            + globals
            + functions
            + self.rules.estimated_size()
            + queries
            + declarations
    }
}

impl EstimateSize for ParseError {
    fn estimated_size(&self) -> usize {
        size_of::<Self>() + self.message.len()
    }
}

impl EstimateSize for Diagnostic {
    fn estimated_size(&self) -> usize {
        size_of::<Self>() + self.message.len()
    }
}

impl EstimateSize for BracketTable {
    fn estimated_size(&self) -> usize {
        let positions = self.opens.len() + self.closes.len() + self.unmatched_open.len() + self.unmatched_close.len();
        size_of::<Self>() + positions * size_of::<BracketPos>() + self.pairs.len() * size_of::<BracketPair>()
            + self.issues.len() * 32
    }
}

impl EstimateSize for ParseResult {
    fn estimated_size(&self) -> usize {
        size_of::<Self>()
            + self.tree.estimated_size()
            + self.errors.estimated_size()
            + self.brackets.table().estimated_size() * 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_size_grows_with_content() {
        let small = parse("rule \"a\"\nwhen\n    Person()\nthen\nend");
        let large = parse(&"rule \"a\"\nwhen\n    exists(Person(age > 18))\nthen\n    x();\nend\n".repeat(20));
        assert!(small.estimated_size() > 0);
        assert!(large.estimated_size() > small.estimated_size() * 10);
    }
}
