//! Semantic validation of a parsed document.
//!
//! Diagnostics come from three passes (syntax, semantic, best-practice).
//! A [`ValidationCycle`] records which passes already ran so that one call to
//! [`Validator::provide_diagnostics`] runs each of them at most once.

use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::{trace, warn};

use crate::ast::SyntaxTree;
use crate::config::Settings;
use crate::diagnostic::{Diagnostic, ValidationCategory};
use crate::parser::ParseResult;
use crate::util::FastHashSet;

mod names;
mod practice;
mod structure;


type Check = fn(&SyntaxTree, &mut Vec<Diagnostic>);

const SEMANTIC_CHECKS: [(&str, Check); 4] = [
    ("duplicate-names", names::check_duplicates),
    ("rule-names", names::check_rule_names),
    ("structure", structure::check_structure),
    ("variables", structure::check_variables),
];

const BEST_PRACTICE_CHECKS: [(&str, Check); 3] = [
    ("salience", practice::check_salience),
    ("no-loop", practice::check_no_loop),
    ("unused-globals", practice::check_unused_globals),
];

/// Completion flags for the passes of one validation cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationCycle {
    completed: [bool; 3],
}

impl ValidationCycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.completed = [false; 3];
    }

    pub fn is_complete(&self, category: ValidationCategory) -> bool {
        self.completed[category.index()]
    }

    /// Run `pass` unless `category` already ran in this cycle.
    pub fn run<F>(&mut self, category: ValidationCategory, pass: F) -> Option<Vec<Diagnostic>>
    where
        F: FnOnce() -> Vec<Diagnostic>,
    {
        let slot = &mut self.completed[category.index()];
        if *slot {
            trace!(?category, "validation pass already ran in this cycle");
            return None;
        }
        *slot = true;
        Some(pass())
    }
}

/// Produces the diagnostics of a document snapshot.
#[derive(Debug, Default)]
pub struct Validator {
    cycle: ValidationCycle,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cycle(&self) -> &ValidationCycle {
        &self.cycle
    }

    /// One full validation cycle: syntax, semantic and best-practice
    /// diagnostics (each only when enabled), truncated to
    /// `settings.max_number_of_problems` after every pass has run.
    pub fn provide_diagnostics(&mut self, result: &ParseResult, settings: &Settings) -> Vec<Diagnostic> {
        self.cycle.reset();
        let passes = [
            (ValidationCategory::Syntax, settings.enable_syntax_validation),
            (ValidationCategory::Semantic, settings.enable_semantic_validation),
            (ValidationCategory::BestPractice, settings.enable_best_practice_warnings),
        ];

        let mut out = Vec::new();
        for (category, enabled) in passes {
            if !enabled {
                continue;
            }
            let found = self.cycle.run(category, || match category {
                ValidationCategory::Syntax => result.syntax_diagnostics(),
                ValidationCategory::Semantic => validate(&result.tree),
                ValidationCategory::BestPractice => best_practices(&result.tree),
            });
            out.extend(found.unwrap_or_default());
        }
        out.truncate(settings.max_number_of_problems);
        out
    }
}

/// Semantic diagnostics of `tree` in document order, without repeats.
pub fn validate(tree: &SyntaxTree) -> Vec<Diagnostic> {
    let mut out = run_checks(tree, &SEMANTIC_CHECKS);
    let mut seen = FastHashSet::default();
    out.retain(|d| seen.insert((d.range, d.message.clone(), d.category)));
    out
}

/// Informational and warning-level advice; never errors.
pub fn best_practices(tree: &SyntaxTree) -> Vec<Diagnostic> {
    run_checks(tree, &BEST_PRACTICE_CHECKS)
}

fn run_checks(tree: &SyntaxTree, checks: &[(&str, Check)]) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for (name, check) in checks {
        let mut found = Vec::new();
        match catch_unwind(AssertUnwindSafe(|| check(tree, &mut found))) {
            Ok(()) => out.extend(found),
            Err(_) => warn!(check = *name, "validation check failed, skipping it"),
        }
    }
    out.sort_by_key(|d| d.range.start);
    out
}
