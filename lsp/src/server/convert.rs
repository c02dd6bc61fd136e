use drl_core::{Diagnostic, Severity};
use ropey::Rope;
use tower_lsp::lsp_types::{
    self, DiagnosticRelatedInformation, DiagnosticSeverity, Location, NumberOrString, Url,
};

use super::text::to_lsp_range;

pub(crate) const SOURCE: &str = "drl";

fn severity(severity: Severity) -> DiagnosticSeverity {
    match severity {
        Severity::Error => DiagnosticSeverity::ERROR,
        Severity::Warning => DiagnosticSeverity::WARNING,
        Severity::Information => DiagnosticSeverity::INFORMATION,
    }
}

pub(crate) fn to_lsp_diagnostic(uri: &Url, text: &Rope, diagnostic: &Diagnostic) -> lsp_types::Diagnostic {
    let related_information = diagnostic.related.map(|related| {
        vec![DiagnosticRelatedInformation {
            location: Location::new(uri.clone(), to_lsp_range(text, related)),
            message: "first defined here".to_string(),
        }]
    });
    lsp_types::Diagnostic {
        range: to_lsp_range(text, diagnostic.range),
        severity: Some(severity(diagnostic.severity)),
        code: Some(NumberOrString::String(diagnostic.category.as_str().to_string())),
        source: Some(SOURCE.to_string()),
        message: diagnostic.message.clone(),
        related_information,
        ..Default::default()
    }
}
