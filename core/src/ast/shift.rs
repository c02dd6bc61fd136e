use super::*;

/// Move a node down (or up) by whole lines. Columns never change.
pub(crate) trait ShiftLines {
    fn shift_lines(&mut self, delta: i64);
}

impl ShiftLines for Range {
    fn shift_lines(&mut self, delta: i64) {
        *self = self.shifted(delta);
    }
}

impl<T: ShiftLines> ShiftLines for Vec<T> {
    fn shift_lines(&mut self, delta: i64) {
        for item in self {
            item.shift_lines(delta);
        }
    }
}

impl<T: ShiftLines> ShiftLines for Option<T> {
    fn shift_lines(&mut self, delta: i64) {
        if let Some(item) = self {
            item.shift_lines(delta);
        }
    }
}

impl ShiftLines for PatternNode {
    fn shift_lines(&mut self, delta: i64) {
        PatternNode::shift_lines(self, delta);
    }
}

macro_rules! shift_range_only {
    ($($ty:ty),* $(,)?) => {
        $(impl ShiftLines for $ty {
            fn shift_lines(&mut self, delta: i64) {
                self.range.shift_lines(delta);
            }
        })*
    };
}

shift_range_only!(PackageDecl, ImportDecl, GlobalDecl, FunctionDecl, Attribute, ActionBlock, FieldDecl);

impl ShiftLines for Condition {
    fn shift_lines(&mut self, delta: i64) {
        self.range.shift_lines(delta);
        self.pattern.shift_lines(delta);
        self.children.shift_lines(delta);
    }
}

impl ShiftLines for ConditionBlock {
    fn shift_lines(&mut self, delta: i64) {
        self.range.shift_lines(delta);
        self.conditions.shift_lines(delta);
    }
}

impl ShiftLines for Rule {
    fn shift_lines(&mut self, delta: i64) {
        self.range.shift_lines(delta);
        self.name_range.shift_lines(delta);
        self.attributes.shift_lines(delta);
        self.when.shift_lines(delta);
        self.then.shift_lines(delta);
    }
}

impl ShiftLines for Query {
    fn shift_lines(&mut self, delta: i64) {
        self.range.shift_lines(delta);
        self.name_range.shift_lines(delta);
        self.conditions.shift_lines(delta);
    }
}

impl ShiftLines for TypeDeclaration {
    fn shift_lines(&mut self, delta: i64) {
        self.range.shift_lines(delta);
        self.fields.shift_lines(delta);
    }
}
