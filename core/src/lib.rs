//! Parsing, validation and incremental analysis for the Drools rule language.

pub mod ast;
pub mod bracket;
pub mod cache;
pub mod config;
pub mod diagnostic;
pub mod parser;
pub mod pattern;
pub mod position;
pub mod util;
pub mod validate;

// Edit -> cache -> parse -> validate cycle
pub mod engine;

mod scan;

#[cfg(test)]
mod position_test;

pub use config::Settings;
pub use diagnostic::{Category, Diagnostic, Severity, ValidationCategory};
pub use engine::{Analysis, DrlEngine};
pub use parser::{ParseError, ParseOutcome, ParseResult, Parser, TextEdit, parse};
pub use position::{Position, Range};
pub use scan::{BracketKind, Connective};
