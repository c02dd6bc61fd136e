use criterion::{Criterion, criterion_group, criterion_main};
use drl_core::{DrlEngine, Parser, Position, Range, TextEdit};
use std::hint::black_box;

// Each rule mixes a simple pattern with a multi-line construct.
fn make_document(rules: usize) -> String {
    let mut out = String::from("package com.example.bench;\n\nimport com.example.Person;\n\nglobal java.util.List results;\n\n");
    for i in 0..rules {
        out.push_str(&format!(
            "rule \"Rule {i}\"\n    salience {i}\n    no-loop\nwhen\n    $p : Person(age > {i}, name != \"x\")\n    exists(\n        Order(owner == $p,\n              total > 100)\n    )\nthen\n    results.add($p);\n    update($p);\nend\n\n"
        ));
    }
    out
}

fn parse_bench(c: &mut Criterion) {
    let text = make_document(100);
    let parser = Parser::default();

    c.bench_function("parse_full_100_rules", |b| {
        b.iter(|| black_box(parser.parse(black_box(&text))))
    });

    // change one constraint in the middle of the file
    let previous = parser.parse(&text);
    let line = 50 * 14 + 6 + 4;
    let edit = TextEdit::new(Range::new(Position::new(line, 22), Position::new(line, 24)), "99");
    let edited = {
        let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
        lines[line as usize].replace_range(22..24, "99");
        lines.join("\n")
    };
    c.bench_function("parse_incremental_one_line", |b| {
        b.iter(|| black_box(parser.parse_incremental(&previous, black_box(&edited), std::slice::from_ref(&edit))))
    });

    let engine = DrlEngine::default();
    engine.analyze("bench", 1, &text);
    c.bench_function("engine_cached_analysis", |b| {
        b.iter(|| black_box(engine.analyze("bench", 1, black_box(&text))))
    });
}

criterion_group!(benches, parse_bench);
criterion_main!(benches);
