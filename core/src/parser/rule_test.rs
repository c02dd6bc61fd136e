#[cfg(test)]
mod tests {
    use crate::ast::{AttributeValue, ConditionKind, Rule};
    use crate::diagnostic::Severity;
    use crate::parser::parse;
    use crate::parser::rule::coerce_value;
    use crate::position::{Position, Range};

    fn only_rule(text: &str) -> Rule {
        let mut result = parse(text);
        assert_eq!(result.tree.rules.len(), 1, "{:?}", result.tree.rules);
        result.tree.rules.remove(0)
    }

    #[test]
    fn test_header_forms() {
        let rule = only_rule("rule \"My Rule\" extends \"Base\"\nend");
        assert_eq!(rule.name, "\"My Rule\"");
        assert_eq!(rule.parent.as_deref(), Some("\"Base\""));
        assert_eq!(rule.name_range, Range::new(Position::new(0, 5), Position::new(0, 14)));

        let rule = only_rule("rule My Rule Name\nend");
        assert_eq!(rule.name, "My Rule Name");

        let rule = only_rule("rule Child extends Parent // note\nend");
        assert_eq!(rule.name, "Child");
        assert_eq!(rule.parent.as_deref(), Some("Parent"));

        let rule = only_rule("rule\nend");
        assert_eq!(rule.name, "");
        assert!(rule.has_end);
    }

    #[test]
    fn test_attributes_are_coerced() {
        let text = "rule \"attrs\"
    salience -5
    no-loop true
    agenda-group \"group-a\"
    duration 1.5
    timer (int: 30s)
    enabled
    foo bar
when
then
end";
        let result = parse(text);
        let rule = &result.tree.rules[0];
        let values: Vec<Option<AttributeValue>> = rule.attributes.iter().map(|a| a.value.clone()).collect();
        assert_eq!(
            values,
            vec![
                Some(AttributeValue::Integer(-5)),
                Some(AttributeValue::Bool(true)),
                Some(AttributeValue::String("group-a".into())),
                Some(AttributeValue::Float(1.5)),
                Some(AttributeValue::Raw("(int: 30s)".into())),
                None,
                Some(AttributeValue::Raw("bar".into())),
            ]
        );
        assert!(rule.has_attribute("no-loop"));

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].severity, Severity::Warning);
        assert_eq!(result.errors[0].message, "Unknown rule attribute 'foo'");
        assert_eq!(result.errors[0].range, Range::on_line(7, 4, 3));
    }

    #[test]
    fn test_condition_before_when_is_an_error() {
        let result = parse("rule \"no when\"\n    Person(age > 1)\nthen\nend");
        assert!(result.tree.rules[0].attributes.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].severity, Severity::Error);
        assert!(result.errors[0].message.starts_with("Unexpected 'Person(age > 1)'"));
    }

    #[test]
    fn test_coerce_value_edge_cases() {
        assert_eq!(coerce_value(""), None);
        assert_eq!(coerce_value("'single'"), Some(AttributeValue::String("single".into())));
        assert_eq!(coerce_value("NaN"), Some(AttributeValue::Raw("NaN".into())));
        assert_eq!(coerce_value("\"open"), Some(AttributeValue::Raw("\"open".into())));
    }

    #[test]
    fn test_condition_kinds() {
        let text = r#"rule "conditions"
when
    $p : Person(age > 18, $n : name)
    not Cat()
    exists(Order(total > 100))
    Person() or Cat(name == "Tom")
    $total : Number() from accumulate(Order($v : value), sum($v))
    $i : Item() from $order.items
    eval($p.getAge() > 0)
then
end"#;
        let rule = only_rule(text);
        let conditions = &rule.when.as_ref().unwrap().conditions;
        assert_eq!(conditions.len(), 7);

        let pattern = &conditions[0];
        assert_eq!(pattern.kind, ConditionKind::Pattern);
        assert_eq!(pattern.variable.as_deref(), Some("$p"));
        assert_eq!(pattern.fact_type.as_deref(), Some("Person"));
        assert_eq!(pattern.constraints.len(), 2);
        assert_eq!(pattern.constraints[1].binding.as_deref(), Some("$n"));
        assert_eq!(pattern.range.start, Position::new(2, 4));

        let not = &conditions[1];
        assert_eq!(not.kind, ConditionKind::Not);
        assert!(not.pattern.is_none());
        assert_eq!(not.children[0].fact_type.as_deref(), Some("Cat"));
        assert_eq!(not.children[0].range.start, Position::new(3, 8));

        let exists = &conditions[2];
        assert_eq!(exists.kind, ConditionKind::Exists);
        assert!(exists.pattern.is_some());
        assert_eq!(exists.children[0].fact_type.as_deref(), Some("Order"));

        let or = &conditions[3];
        assert_eq!(or.kind, ConditionKind::Or);
        assert_eq!(or.children.len(), 2);
        assert_eq!(or.children[1].fact_type.as_deref(), Some("Cat"));
        assert_eq!(or.children[1].range.start, Position::new(5, 16));

        let accumulate = &conditions[4];
        assert_eq!(accumulate.kind, ConditionKind::Accumulate);
        assert_eq!(accumulate.variable.as_deref(), Some("$total"));
        assert_eq!(accumulate.fact_type.as_deref(), Some("Number"));
        assert!(accumulate.pattern.as_ref().is_some_and(|p| p.complete));

        let from = &conditions[5];
        assert_eq!(from.kind, ConditionKind::Pattern);
        assert_eq!(from.source.as_deref(), Some("$order.items"));

        let eval = &conditions[6];
        assert_eq!(eval.kind, ConditionKind::Eval);
        assert_eq!(eval.pattern.as_ref().unwrap().content, "$p.getAge() > 0");
    }

    #[test]
    fn test_and_or_fold_left_to_right() {
        let rule = only_rule("rule \"r\"\nwhen\n    A() or B() and C()\nthen\nend");
        let condition = &rule.when.as_ref().unwrap().conditions[0];
        assert_eq!(condition.kind, ConditionKind::And);
        assert_eq!(condition.children[0].kind, ConditionKind::Or);
        assert_eq!(condition.children[1].fact_type.as_deref(), Some("C"));
    }

    #[test]
    fn test_simple_pattern_continues_until_balanced() {
        let text = "rule \"multi\"\nwhen\n    $p : Person(\n        age > 18,\n        name == \"x\"\n    )\nthen\nend";
        let rule = only_rule(text);
        let conditions = &rule.when.as_ref().unwrap().conditions;
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].constraints.len(), 2);
        assert_eq!(conditions[0].range, Range::new(Position::new(2, 4), Position::new(5, 5)));
    }

    #[test]
    fn test_multiline_construct_children() {
        let text = "rule \"nested\"
when
    not(
        Person(age > 18) and
        exists(Cat())
    )
then
end";
        let rule = only_rule(text);
        let condition = &rule.when.as_ref().unwrap().conditions[0];
        assert_eq!(condition.kind, ConditionKind::Not);

        let pattern = condition.pattern.as_ref().unwrap();
        assert!(pattern.multiline);
        assert_eq!(pattern.children.len(), 1);

        let inner = &condition.children[0];
        assert_eq!(inner.kind, ConditionKind::And);
        assert_eq!(inner.children[0].range.start, Position::new(3, 8));
        assert_eq!(inner.children[1].kind, ConditionKind::Exists);
    }

    #[test]
    fn test_sections_sharing_keyword_lines() {
        let rule = only_rule("rule \"inline\"\nwhen Person()\nthen update(x);\nend");
        let when = rule.when.as_ref().unwrap();
        assert_eq!(when.conditions[0].fact_type.as_deref(), Some("Person"));
        assert_eq!(when.conditions[0].range.start, Position::new(1, 5));
        let then = rule.then.as_ref().unwrap();
        assert_eq!(then.content.trim(), "update(x);");
    }
}
