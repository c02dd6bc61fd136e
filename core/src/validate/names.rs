use crate::ast::{SyntaxTree, is_quoted};
use crate::diagnostic::{Category, Diagnostic};
use crate::position::Range;
use crate::util::{FastHashMap, fast_hash_map_new};

const MAX_RULE_NAME_LEN: usize = 100;

/// Flag every repeat of a name in `items`; the first definition wins.
fn flag_repeats<'t>(
    kind: &str,
    items: impl Iterator<Item = (&'t str, Range)>,
    out: &mut Vec<Diagnostic>,
) {
    let mut first: FastHashMap<&str, Range> = fast_hash_map_new();
    for (name, range) in items {
        if name.is_empty() {
            continue;
        }
        match first.get(name) {
            Some(original) => out.push(
                Diagnostic::error(
                    range,
                    Category::DuplicateName,
                    format!(
                        "Duplicate {kind} name '{name}'; first defined on line {}",
                        original.start.line + 1
                    ),
                )
                .with_related(*original),
            ),
            None => {
                first.insert(name, range);
            }
        }
    }
}

pub(super) fn check_duplicates(tree: &SyntaxTree, out: &mut Vec<Diagnostic>) {
    flag_repeats(
        "rule",
        tree.rules.iter().map(|r| (r.unquoted_name(), r.name_range)),
        out,
    );
    flag_repeats(
        "function",
        tree.functions
            .iter()
            .map(|f| (f.name.as_str(), Range::on_line(f.range.start.line, f.range.start.column, "function".len()))),
        out,
    );
    flag_repeats("global", tree.globals.iter().map(|g| (g.name.as_str(), g.range)), out);
}

fn has_unescaped_quote(inner: &str) -> bool {
    let mut escaped = false;
    for b in inner.bytes() {
        match b {
            _ if escaped => escaped = false,
            b'\\' => escaped = true,
            b'"' => return true,
            _ => {}
        }
    }
    false
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

pub(super) fn check_rule_names(tree: &SyntaxTree, out: &mut Vec<Diagnostic>) {
    for rule in &tree.rules {
        let name = rule.name.as_str();
        let range = rule.name_range;
        if name.is_empty() {
            continue;
        }

        if is_quoted(name) {
            let inner = &name[1..name.len() - 1];
            if inner.trim().is_empty() {
                out.push(Diagnostic::error(range, Category::RuleName, "Rule name cannot be empty"));
            } else if has_unescaped_quote(inner) {
                out.push(Diagnostic::error(
                    range,
                    Category::RuleName,
                    "Rule name contains an unescaped '\"'; escape it as '\\\"'",
                ));
            } else if inner.chars().count() > MAX_RULE_NAME_LEN {
                out.push(Diagnostic::information(
                    range,
                    Category::RuleName,
                    format!("Rule name is longer than {MAX_RULE_NAME_LEN} characters"),
                ));
            }
            continue;
        }

        if name.starts_with('"') {
            out.push(Diagnostic::error(
                range,
                Category::RuleName,
                "Rule name has no closing '\"'",
            ));
        } else if name.contains(|c: char| c.is_whitespace() || c == '-' || c == '.') {
            out.push(Diagnostic::warning(
                range,
                Category::RuleName,
                format!("Rule name '{name}' contains spaces or special characters; enclose it in double quotes"),
            ));
        } else if !is_identifier(name) {
            out.push(Diagnostic::error(
                range,
                Category::RuleName,
                format!("Rule name '{name}' is not a valid identifier; enclose it in double quotes"),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescaped_quote() {
        assert!(!has_unescaped_quote(r#"say \"hi\""#));
        assert!(has_unescaped_quote(r#"say "hi"#));
    }

    #[test]
    fn test_identifier_charset() {
        assert!(is_identifier("validName_1"));
        assert!(is_identifier("$rule"));
        assert!(!is_identifier("1st"));
        assert!(!is_identifier("a+b"));
    }
}
