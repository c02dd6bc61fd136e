#[cfg(test)]
mod tests {
    use crate::ast::{AttributeValue, ConditionKind, ImportKind};
    use crate::config::ParserOptions;
    use crate::diagnostic::{Category, Severity};
    use crate::parser::{ParseOutcome, ParseResult, Parser, parse};
    use crate::position::{Position, Range};

    const SAMPLE: &str = r#"package com.example.rules;

import com.example.model.Person;
import function com.example.Util.log;

global java.util.List results;

function String greet(String name) {
    return "Hello " + name;
}

declare Address
    @role(fact)
    street : String
    city : String
end

query "adults"(int minAge)
    $p : Person(age >= minAge)
end

rule "Adult check"
    salience 10
    no-loop
when
    $p : Person(age > 18)
then
    results.add($p);
end
"#;

    #[test]
    fn test_parse_complete_document() {
        let result = parse(SAMPLE);
        assert_eq!(result.outcome, ParseOutcome::Complete);
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert!(result.brackets.table().is_balanced());

        let tree = &result.tree;
        assert_eq!(tree.package.as_ref().map(|p| p.name.as_str()), Some("com.example.rules"));
        assert_eq!(tree.imports.len(), 2);
        assert_eq!(tree.imports[0].path, "com.example.model.Person");
        assert_eq!(tree.imports[1].kind, ImportKind::Function);
        assert_eq!(tree.globals[0].type_name, "java.util.List");
        assert_eq!(tree.globals[0].name, "results");

        let function = &tree.functions[0];
        assert_eq!(function.name, "greet");
        assert_eq!(function.return_type.as_deref(), Some("String"));
        assert_eq!(function.parameters.len(), 1);
        assert!(function.body.contains("return \"Hello \" + name;"));
        assert!(function.has_end);
        assert_eq!(function.range.end, Position::new(9, 1));

        let declaration = &tree.declarations[0];
        assert_eq!(declaration.name, "Address");
        assert_eq!(declaration.annotations, vec!["@role(fact)"]);
        assert_eq!(declaration.fields.len(), 2);
        assert_eq!(declaration.fields[1].type_name, "String");

        let query = &tree.queries[0];
        assert_eq!(query.name, "\"adults\"");
        assert_eq!(query.parameters[0].name, "minAge");
        assert_eq!(query.conditions[0].fact_type.as_deref(), Some("Person"));

        let rule = &tree.rules[0];
        assert_eq!(rule.name, "\"Adult check\"");
        assert_eq!(rule.unquoted_name(), "Adult check");
        assert_eq!(rule.attributes.len(), 2);
        assert_eq!(rule.attributes[0].value, Some(AttributeValue::Integer(10)));
        assert_eq!(rule.attributes[1].value, None);
        assert!(rule.has_end);
        assert_eq!(rule.range, Range::new(Position::new(21, 0), Position::new(28, 3)));

        let when = rule.when.as_ref().expect("when block");
        assert_eq!(when.conditions.len(), 1);
        assert_eq!(when.conditions[0].variable.as_deref(), Some("$p"));
        let then = rule.then.as_ref().expect("then block");
        assert_eq!(then.content.trim(), "results.add($p);");
        assert_eq!(then.range.start, Position::new(26, 4));
    }

    #[test]
    fn test_parse_is_deterministic() {
        assert_eq!(parse(SAMPLE), parse(SAMPLE));
    }

    #[test]
    fn test_missing_end_recovers_at_next_rule() {
        let text = "rule \"A\"\nwhen\n    Person()\nthen\n    x();\nrule \"B\"\nwhen\nthen\nend";
        let result = parse(text);
        assert_eq!(result.tree.rules.len(), 2);
        let a = &result.tree.rules[0];
        assert!(!a.has_end);
        assert_eq!(a.range.end, Position::new(4, 8));
        assert!(result.tree.rules[1].has_end);

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].category, Category::MissingEnd);
        assert_eq!(result.errors[0].range.start, Position::new(0, 0));
    }

    #[test]
    fn test_error_count_is_capped() {
        let text: Vec<String> = (0..150).map(|i| format!("rule r{i}")).collect();
        let result = parse(&text.join("\n"));
        assert_eq!(result.tree.rules.len(), 150);
        assert_eq!(result.errors.len(), ParserOptions::default().max_errors);
        assert_eq!(result.outcome, ParseOutcome::ErrorCapReached);
        assert!(result.all_errors().len() <= ParserOptions::default().max_errors);
    }

    #[test]
    fn test_comments_are_skipped() {
        let text = "/* rule \"Hidden\"\nend */\n# rule \"AlsoHidden\"\n// rule \"Nope\"\nrule \"Visible\"\nend";
        let result = parse(text);
        assert_eq!(result.tree.rules.len(), 1);
        assert_eq!(result.tree.rules[0].name, "\"Visible\"");
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_unrecognized_lines_are_skipped() {
        let result = parse("this is not drl\n;;;\nrule \"R\"\nend");
        assert_eq!(result.tree.rules.len(), 1);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_oversized_document_is_not_parsed() {
        let parser = Parser::new(ParserOptions {
            max_file_size: 10,
            ..ParserOptions::default()
        });
        let result = parser.parse("rule \"Too long\"\nend");
        assert_eq!(result.outcome, ParseOutcome::TooLarge);
        assert!(result.tree.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].category, Category::FileSize);
        assert_eq!(result.errors[0].severity, Severity::Warning);
    }

    #[test]
    fn test_internal_failures_become_critical_error() {
        let parser = Parser::default();
        let failed = parser.guarded("rule x", |_| anyhow::bail!("boom"));
        let panicked = parser.guarded("rule x", |_| panic!("boom"));
        for result in [failed, panicked] {
            assert_eq!(result.outcome, ParseOutcome::Critical);
            assert!(result.tree.is_empty());
            assert_eq!(result.errors.len(), 1);
            assert_eq!(result.errors[0].category, Category::Critical);
            assert_eq!(result.errors[0].range.start, Position::start());
        }
    }

    #[test]
    fn test_bracket_issues_join_parse_errors() {
        let result = parse("rule \"a\"\nwhen\n  Person(\nthen\nend");
        assert!(result.errors.is_empty());
        let all = result.all_errors();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].category, Category::BracketMismatch);
        assert_eq!(all[0].message, "Unclosed '('");
        assert_eq!(all[0].range.start, Position::new(2, 8));
        assert!(result.has_errors());
    }

    #[test]
    fn test_bracket_table_of_multiline_construct() {
        let table = parse("exists(\n  Person(age > 18)\n)").brackets.into_table();
        assert_eq!(table.pairs.len(), 2);
        assert!(table.unmatched_open.is_empty() && table.unmatched_close.is_empty());

        let table = parse("exists(\n  Person(age > 18)").brackets.into_table();
        assert_eq!(table.pairs.len(), 0);
        assert_eq!(table.unmatched_open.len(), 2);
    }

    #[test]
    fn test_deeply_nested_construct_is_capped() {
        let nested = format!("{}Person(){}", "not(".repeat(25), ")".repeat(25));
        let text = format!("rule \"Deep\"\nwhen\n    {nested}\nthen\nend");
        let result: ParseResult = parse(&text);
        assert_eq!(result.outcome, ParseOutcome::Complete);
        let condition = &result.tree.rules[0].when.as_ref().unwrap().conditions[0];
        assert_eq!(condition.kind, ConditionKind::Not);
        let pattern = condition.pattern.as_ref().expect("pattern metadata");
        assert_eq!(pattern.depth, 20);
        assert!(pattern.complexity_exceeded);
    }

    #[test]
    fn test_commented_out_code_has_no_bracket_errors() {
        let text = "/*\n  legacy rule (disabled\n*/\nrule \"a\"\nwhen\n    Person()\nthen\n    log(1);\nend\n";
        let result = parse(text);
        assert!(result.syntax_diagnostics().is_empty());
        assert_eq!(result.tree.rules.len(), 1);
    }

    #[test]
    fn test_deep_grouping_is_bounded() {
        let nested = format!("{}Person(){}", "(".repeat(5000), ")".repeat(5000));
        let text = format!("rule \"Deep\"\nwhen\n    {nested}\nthen\n    log(1);\nend");
        let result = parse(&text);
        assert_eq!(result.outcome, ParseOutcome::Complete);
        let condition = &result.tree.rules[0].when.as_ref().unwrap().conditions[0];
        assert!(condition.too_deep);
        assert_eq!(condition.kind, ConditionKind::Pattern);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].severity, Severity::Warning);
        assert!(result.errors[0].message.contains("nested more than 20 levels"));
        assert!(!result.has_errors());

        let chained = format!("{}Order(){}", "(Person() and ".repeat(40), ")".repeat(40));
        let text = format!("rule \"Chain\"\nwhen\n    {chained}\nthen\n    log(1);\nend");
        let result = parse(&text);
        assert_eq!(result.outcome, ParseOutcome::Complete);
        assert!(
            result
                .errors
                .iter()
                .any(|e| e.severity == Severity::Warning && e.message.contains("nested more than"))
        );
        let condition = &result.tree.rules[0].when.as_ref().unwrap().conditions[0];
        assert_eq!(condition.kind, ConditionKind::And);
    }
}
