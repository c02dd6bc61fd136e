use crate::ast::{Condition, ConditionKind, Rule, SyntaxTree};
use crate::diagnostic::{Category, Diagnostic};
use crate::position::{Range, offset_to_position, relative_to};
use crate::scan::{dollar_identifiers, is_ident_byte};
use crate::util::FastHashSet;

fn display_name(rule: &Rule) -> &str {
    if rule.name.is_empty() { "<unnamed>" } else { rule.name.as_str() }
}

/// Where to report a problem with the rule as a whole.
fn anchor(rule: &Rule) -> Range {
    if rule.name.is_empty() {
        Range::on_line(rule.range.start.line, rule.range.start.column, "rule".len())
    } else {
        rule.name_range
    }
}

fn conditions(rule: &Rule) -> impl Iterator<Item = &Condition> {
    rule.when
        .iter()
        .flat_map(|w| w.conditions.iter())
        .flat_map(|c| c.walk())
}

pub(super) fn check_structure(tree: &SyntaxTree, out: &mut Vec<Diagnostic>) {
    for rule in &tree.rules {
        let name = display_name(rule);
        let at = anchor(rule);
        if rule.name.is_empty() {
            out.push(Diagnostic::error(at, Category::Structure, "Rule is missing a name"));
        }
        match (&rule.when, &rule.then) {
            (None, None) => out.push(Diagnostic::error(
                at,
                Category::Structure,
                format!("Rule {name} has neither a 'when' nor a 'then' section"),
            )),
            (when, then) => {
                if let Some(when) = when
                    && when.conditions.is_empty()
                {
                    out.push(Diagnostic::warning(
                        when.range,
                        Category::Structure,
                        format!("Rule {name} has an empty 'when' section"),
                    ));
                }
                if let Some(then) = then
                    && then.content.trim().is_empty()
                {
                    out.push(Diagnostic::warning(
                        then.range,
                        Category::Structure,
                        format!("Rule {name} has an empty 'then' section"),
                    ));
                }
            }
        }

        for condition in conditions(rule) {
            check_condition(condition, out);
        }
    }
    for query in &tree.queries {
        for condition in query.conditions.iter().flat_map(|c| c.walk()) {
            check_condition(condition, out);
        }
    }
}

fn check_condition(condition: &Condition, out: &mut Vec<Diagnostic>) {
    match condition.kind {
        ConditionKind::Pattern if condition.too_deep => {}
        ConditionKind::Pattern => {
            if condition.fact_type.is_none() {
                out.push(Diagnostic::error(
                    condition.range,
                    Category::Structure,
                    format!("Pattern '{}' is missing a fact type", condition.content.trim()),
                ));
            }
            if let Some(var) = &condition.variable
                && var.starts_with('$')
                && !is_variable_name(var)
            {
                out.push(Diagnostic::error(
                    condition.range,
                    Category::Structure,
                    format!("Malformed variable binding '{var}'; expected '$name'"),
                ));
            }
        }
        ConditionKind::Eval => {
            let empty = condition.pattern.as_ref().is_none_or(|p| p.content.trim().is_empty());
            if empty {
                out.push(Diagnostic::error(condition.range, Category::Structure, "Empty eval expression"));
            }
        }
        _ => {}
    }
}

fn is_variable_name(var: &str) -> bool {
    let rest = &var.as_bytes()[1..];
    rest.first().is_some_and(|b| b.is_ascii_alphabetic() || *b == b'_') && rest.iter().all(|b| is_ident_byte(*b) && *b != b'$')
}

/// `$name :` binds `$name`; `::` does not.
fn is_binding(rest: &str) -> bool {
    let rest = rest.trim_start();
    rest.starts_with(':') && !rest.starts_with("::")
}

fn bound_variables(rule: &Rule) -> FastHashSet<&str> {
    let mut bound = FastHashSet::default();
    for condition in rule.when.iter().flat_map(|w| w.conditions.iter()) {
        let text = condition.content.as_str();
        bound.extend(
            dollar_identifiers(text)
                .into_iter()
                .filter(|(offset, name)| is_binding(&text[offset + name.len()..]))
                .map(|(_, name)| name),
        );
        for c in condition.walk() {
            if let Some(var) = &c.variable {
                bound.insert(var.as_str());
            }
            bound.extend(c.constraints.iter().filter_map(|k| k.binding.as_deref()));
        }
    }
    bound
}

/// Every `$variable` used in a consequence must be bound by its conditions.
pub(super) fn check_variables(tree: &SyntaxTree, out: &mut Vec<Diagnostic>) {
    for rule in &tree.rules {
        let Some(then) = &rule.then else {
            continue;
        };
        let bound = bound_variables(rule);
        let mut reported = FastHashSet::default();
        for (offset, token) in dollar_identifiers(&then.content) {
            if bound.contains(token) || !reported.insert(token) {
                continue;
            }
            let start = relative_to(then.range.start, offset_to_position(&then.content, offset));
            out.push(Diagnostic::error(
                Range::on_line(start.line, start.column, token.len()),
                Category::UndefinedVariable,
                format!("Variable '{token}' is not bound in the conditions of rule {}", display_name(rule)),
            ));
        }
    }
}
