// LSP-specific features (process invocation, file materialization)
pub mod checker;
pub mod module_sources;

// Re-export analysis features from sasylf-analysis
pub use sasylf_analysis::{diagnostics, document_symbols, go_to_definition, quickfix};
