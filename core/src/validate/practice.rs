use crate::ast::{AttributeValue, Rule, SyntaxTree};
use crate::diagnostic::{Category, Diagnostic};
use crate::scan::is_word_at;

const FACT_CHANGES: [&str; 4] = ["insert", "insertLogical", "update", "modify"];

fn contains_word(text: &str, word: &str) -> bool {
    text.match_indices(word)
        .any(|(i, _)| is_word_at(text.as_bytes(), i, word.len()))
}

/// Calls like `update(` or `modify (`.
fn calls(text: &str, name: &str) -> bool {
    text.match_indices(name).any(|(i, _)| {
        is_word_at(text.as_bytes(), i, name.len()) && text[i + name.len()..].trim_start().starts_with('(')
    })
}

/// Present and not explicitly `false`.
fn enabled(rule: &Rule, attribute: &str) -> bool {
    rule.attribute(attribute)
        .is_some_and(|a| a.value != Some(AttributeValue::Bool(false)))
}

pub(super) fn check_salience(tree: &SyntaxTree, out: &mut Vec<Diagnostic>) {
    let count = tree.rules.len();
    if count < 2 {
        return;
    }
    for rule in tree.rules.iter().filter(|r| !r.has_attribute("salience")) {
        out.push(Diagnostic::information(
            rule.name_range,
            Category::BestPractice,
            format!(
                "Rule {} has no salience; firing order among the {count} rules in this file is unspecified",
                rule.name
            ),
        ));
    }
}

pub(super) fn check_no_loop(tree: &SyntaxTree, out: &mut Vec<Diagnostic>) {
    for rule in &tree.rules {
        let Some(then) = &rule.then else {
            continue;
        };
        if enabled(rule, "no-loop") || enabled(rule, "lock-on-active") {
            continue;
        }
        if let Some(call) = FACT_CHANGES.iter().find(|c| calls(&then.content, c)) {
            out.push(Diagnostic::warning(
                rule.name_range,
                Category::BestPractice,
                format!("Rule {} calls {call}() without 'no-loop'; it may re-activate itself", rule.name),
            ));
        }
    }
}

pub(super) fn check_unused_globals(tree: &SyntaxTree, out: &mut Vec<Diagnostic>) {
    if tree.globals.is_empty() {
        return;
    }
    let mut bodies: Vec<&str> = Vec::new();
    for rule in &tree.rules {
        bodies.extend(rule.when.iter().flat_map(|w| w.conditions.iter()).map(|c| c.content.as_str()));
        bodies.extend(rule.then.iter().map(|t| t.content.as_str()));
    }
    bodies.extend(tree.functions.iter().map(|f| f.body.as_str()));
    bodies.extend(tree.queries.iter().flat_map(|q| q.conditions.iter()).map(|c| c.content.as_str()));

    for global in &tree.globals {
        if !bodies.iter().any(|b| contains_word(b, &global.name)) {
            out.push(Diagnostic::warning(
                global.range,
                Category::BestPractice,
                format!("Global '{}' is never used", global.name),
            ));
        }
    }
}
