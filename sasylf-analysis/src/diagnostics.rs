//! Conversion of checker reports into LSP diagnostics plus the quickfix records
//! that back their code actions.

use std::collections::HashMap;

use lsp_types::{Diagnostic, DiagnosticSeverity, NumberOrString, Range};

use crate::ast::{QuickfixEntry, Severity};
use crate::quickfix::{ErrorType, QuickfixRecord};
use crate::utils::from_one_based;

pub const DIAGNOSTIC_SOURCE: &str = "sasylf";

/// Diagnostics of one checker run and the quickfix records keyed by diagnostic code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckedDocument {
    pub diagnostics: Vec<Diagnostic>,
    pub quickfixes: HashMap<i32, QuickfixRecord>,
}

impl CheckedDocument {
    /// Record behind a diagnostic previously published from this run.
    pub fn record_for(&self, diagnostic: &Diagnostic) -> Option<&QuickfixRecord> {
        match diagnostic.code.as_ref()? {
            NumberOrString::Number(code) => self.quickfixes.get(code),
            NumberOrString::String(code) => self.quickfixes.get(&code.parse().ok()?),
        }
    }
}

/// Builds diagnostics from the first `max_problems` checker entries.
///
/// Informational entries are dropped but still consume their index, so a
/// diagnostic's code is always the entry's position in the checker output.
pub fn collect_diagnostics(entries: &[QuickfixEntry], max_problems: usize) -> CheckedDocument {
    let mut checked = CheckedDocument::default();
    for (index, entry) in entries.iter().enumerate().take(max_problems) {
        let severity = match entry.severity {
            Severity::Info => continue,
            Severity::Warning => DiagnosticSeverity::WARNING,
            Severity::Error => DiagnosticSeverity::ERROR,
        };
        let code = index as i32;
        let range = entry_range(entry);
        if entry.severity == Severity::Error {
            if let (Some(error_type), Some(error_info)) = (&entry.error_type, &entry.error_info) {
                checked.quickfixes.insert(
                    code,
                    QuickfixRecord {
                        error_type: ErrorType::from(error_type.as_str()),
                        error_info: error_info.clone(),
                        range,
                    },
                );
            }
        }
        checked.diagnostics.push(Diagnostic {
            range,
            severity: Some(severity),
            code: Some(NumberOrString::Number(code)),
            source: Some(DIAGNOSTIC_SOURCE.to_string()),
            message: entry.error_message.clone(),
            ..Default::default()
        });
    }
    checked
}

pub fn entry_range(entry: &QuickfixEntry) -> Range {
    Range::new(
        from_one_based(entry.begin_line, entry.begin_column),
        from_one_based(entry.end_line, entry.end_column),
    )
}
