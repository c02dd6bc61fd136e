use std::sync::Arc;
use std::time::Duration;

use drl_core::pattern::PatternKeyword;
use drl_core::{Category, DrlEngine, Position, Range, Settings, TextEdit, parse};

const ADULT: &str = r#"package com.example;

rule "Adult"
when
    $p : Person(age > 18)
then
    log($p, $missing);
end
"#;

const ORDERS: &str = r#"rule "Orders"
when
    exists(
        Order(total > 100)
    )
then
    log("ok");
end
"#;

#[test]
fn test_unchanged_snapshot_is_a_cache_hit() {
    let engine = DrlEngine::default();
    let first = engine.analyze("file:///adult.drl", 1, ADULT);
    assert!(!first.from_cache);
    assert_eq!(first.diagnostics.len(), 1);
    assert_eq!(first.diagnostics[0].category, Category::UndefinedVariable);

    let second = engine.analyze("file:///adult.drl", 1, ADULT);
    assert!(second.from_cache);
    assert!(Arc::ptr_eq(&first.diagnostics, &second.diagnostics));
    assert_eq!(first.diagnostics, second.diagnostics);
    assert_eq!(engine.stats().parses.hits, 1);
}

#[test]
fn test_new_version_is_reanalysed() {
    let engine = DrlEngine::default();
    engine.analyze("doc", 1, ADULT);
    let fixed = ADULT.replace("log($p, $missing);", "log($p);");
    let analysis = engine.analyze("doc", 2, &fixed);
    assert!(!analysis.from_cache);
    assert!(analysis.diagnostics.is_empty(), "{:?}", analysis.diagnostics);
    // the stale snapshot was replaced, not kept alongside
    assert_eq!(engine.stats().parses.entries, 1);
}

#[test]
fn test_edited_snapshot_matches_full_parse() {
    let engine = DrlEngine::default();
    engine.analyze("doc", 1, ADULT);

    let edit = TextEdit::new(Range::new(Position::new(4, 22), Position::new(4, 24)), "21");
    let edited = ADULT.replace("age > 18", "age > 21");
    let analysis = engine.analyze_edited("doc", 1, 2, &edited, &[edit.clone()]);
    assert_eq!(*analysis.parse, parse(&edited));
    assert!(analysis.parse.tree.rules[0].when.as_ref().unwrap().conditions[0].content.contains("21"));
    assert_eq!(analysis.diagnostics.len(), 1);

    // unknown base version: full parse, same answer
    let other = DrlEngine::default();
    let analysis = other.analyze_edited("doc", 7, 8, &edited, &[edit]);
    assert_eq!(*analysis.parse, parse(&edited));
}

#[test]
fn test_caching_can_be_disabled() {
    let engine = DrlEngine::new(Settings {
        enable_caching: false,
        ..Settings::default()
    });
    engine.analyze("doc", 1, ADULT);
    let again = engine.analyze("doc", 1, ADULT);
    assert!(!again.from_cache);
    assert_eq!(engine.stats().parses.entries, 0);
    assert_eq!(engine.pattern_metadata("doc", 1, ORDERS).len(), 1);
}

#[test]
fn test_close_document_drops_entries() {
    let engine = DrlEngine::default();
    engine.analyze("a", 1, ADULT);
    engine.analyze("b", 1, ORDERS);
    engine.close_document("a");
    let stats = engine.stats();
    assert_eq!(stats.parses.entries, 1);
    assert_eq!(stats.diagnostics.entries, 1);
}

#[test]
fn test_pattern_metadata_and_brackets() {
    let engine = DrlEngine::default();
    let patterns = engine.pattern_metadata("doc", 3, ORDERS);
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].keyword, PatternKeyword::Exists);
    assert!(patterns[0].multiline);
    assert!(patterns[0].complete);

    let again = engine.pattern_metadata("doc", 3, ORDERS);
    assert!(Arc::ptr_eq(&patterns, &again));
    assert_eq!(engine.stats().patterns.hits, 1);

    let brackets = engine.bracket_table("doc", 3, ORDERS);
    assert!(brackets.is_balanced());
    assert_eq!(brackets.pairs.len(), 3);
}

#[test]
fn test_settings_update_invalidates_results() {
    let engine = DrlEngine::default();
    let text = format!("{ADULT}\nrule Second Rule\nwhen\nthen\nend\n");
    let before = engine.analyze("doc", 1, &text);
    assert!(before.diagnostics.len() > 1);

    engine.update_settings(Settings {
        max_number_of_problems: 1,
        ..Settings::default()
    });
    let after = engine.analyze("doc", 1, &text);
    assert!(!after.from_cache);
    assert_eq!(after.diagnostics.len(), 1);
    assert_eq!(engine.settings().max_number_of_problems, 1);
}

#[test]
fn test_duplicate_rule_reported_once() {
    let engine = DrlEngine::default();
    let text = "rule \"Dup\"\nwhen\n    A()\nthen\n    x();\nend\n\nrule \"Dup\"\nwhen\n    B()\nthen\n    y();\nend\n";
    let diagnostics = engine.provide_diagnostics("doc", 1, text);
    let duplicates: Vec<_> = diagnostics.iter().filter(|d| d.category == Category::DuplicateName).collect();
    assert_eq!(duplicates.len(), 1);
    assert_eq!(duplicates[0].range.start.line, 7);
    assert!(duplicates[0].message.contains("line 1"));
}

#[tokio::test(start_paused = true)]
async fn test_sweeper_drops_idle_documents() {
    let engine = DrlEngine::new(Settings {
        gc_interval: 1_000,
        cache_ttl: 500,
        ..Settings::default()
    });
    engine.analyze("doc", 1, ADULT);
    let _sweeper = engine.start_sweeper();

    tokio::time::sleep(Duration::from_millis(1_100)).await;
    let stats = engine.stats();
    assert_eq!(stats.parses.entries, 0);
    assert_eq!(stats.diagnostics.entries, 0);
}

#[tokio::test(start_paused = true)]
async fn test_debounced_reanalysis_runs_once() {
    let engine = Arc::new(DrlEngine::default());
    let debouncer = engine.debouncer();
    for version in 1..=5 {
        let engine = Arc::clone(&engine);
        debouncer.schedule("doc", move || async move {
            engine.analyze("doc", version, ADULT);
        });
    }
    tokio::time::sleep(Duration::from_millis(400)).await;
    let stats = engine.stats();
    assert_eq!(stats.parses.misses, 1);
    assert_eq!(engine.caches().parses.latest("doc").map(|(v, _)| v), Some(5));
}
