//! Document analysis for SASyLF proof files
//!
//! This crate turns the JSON emitted by the SASyLF checker into editor-facing
//! data: diagnostics, quickfix edits, an outline, and definition targets.
//!
//! # Architecture
//!
//! - `ast`: typed model of the checker output (both the current and the legacy shape)
//! - `command`: the checker command line shared by the server and the proof editor
//! - `utils`: line lookup, UTF-16 position conversion, identifier extraction
//! - `diagnostics`: checker entries to diagnostics plus quickfix records
//! - `quickfix`: edit synthesis for each checker error type
//! - `document_symbols`: outline of modules, syntax, theorems and judgments
//! - `go_to_definition`: theorem and rule lookup, including `Module.name`
//!
//! # Design Principles
//!
//! - **Stateless**: every function works on borrowed text and AST values
//! - **Protocol-light**: only `lsp-types` value types, no transport or client
//! - **Checker-agnostic**: nothing here spawns the checker
//!
//! # Usage
//!
//! ```rust,ignore
//! use sasylf_analysis::ast::CheckerOutput;
//! use sasylf_analysis::diagnostics::collect_diagnostics;
//! use sasylf_analysis::quickfix::{synthesize, FormatSettings};
//!
//! let output = CheckerOutput::from_json(&stdout)?;
//! let checked = collect_diagnostics(&output.quickfixes, 1000);
//! for record in checked.quickfixes.values() {
//!     let proposals = synthesize(&text, record, Some(&output.ast), &FormatSettings::default());
//! }
//! ```

// Core model
pub mod ast;
pub mod command;
pub mod error;
pub mod utils;

// Analysis features
pub mod diagnostics;
pub mod document_symbols;
pub mod go_to_definition;
pub mod quickfix;

// Test support (available in tests and as dev-dependency)
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use error::{AnalysisError, Result};
