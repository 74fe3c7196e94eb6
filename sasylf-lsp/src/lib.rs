//! Language Server Protocol (LSP) implementation for SASyLF
//!
//! This crate wraps the SASyLF proof checker in a language server. The checker stays an
//! external program: every edit runs it over the document text and its JSON report is
//! turned into diagnostics, quickfix code actions, an outline and definition lookups.
//!
//! Design Decision: tower-lsp
//!
//! The server is built on tower-lsp, which handles JSON-RPC framing, capability
//! negotiation and request routing. Handlers take `&self`, so per-document state lives
//! behind `tokio::sync::RwLock`.
//!
//! Feature Set
//!
//! 1. Diagnostics (textDocument/publishDiagnostics):
//!     - One checker run per open/change, results published with the document version
//!     - Info entries are dropped; the diagnostic code is the entry index in the report
//! 2. Code Actions (textDocument/codeAction):
//!     - Quickfixes synthesized from the checker's error type and fix payload
//!     - Line terminator and indentation pulled from the client (`files.eol`,
//!       `editor.tabSize`) with server configuration as fallback
//! 3. Document Symbols (textDocument/documentSymbol):
//!     - Modules, syntax declarations with clauses, sugars, theorems, judgments with rules
//! 4. Go to Definition (textDocument/definition):
//!     - Theorems and in-file rules, `Module.name` qualified lookups
//!     - Library modules are materialized on disk and returned as `temporary:` URIs
//! 5. Custom methods:
//!     - `custom/getAST` returns the AST of the most recently validated document
//!     - `custom/validateTextDocument` re-runs the checker for a URI
//!
//! Architecture
//!
//! LSP Layer (tower-lsp):
//!     - Handles JSON-RPC communication
//!     - Protocol handshaking and capability negotiation
//!
//! Server Layer (this crate):
//!     - Implements LanguageServer trait
//!     - Owns document text, the cached AST and quickfix records per document
//!     - Invokes the checker through the `Checker` trait so tests can substitute it
//!
//! Feature Layer (sasylf-analysis):
//!     - Stateless conversions over the checker output
//!     - All logic and dense unit tests
//!
//! Error Handling and Robustness
//!
//! 1. No Panics:
//!     - No `unwrap()` or `expect()` in production code paths.
//! 2. Graceful Degradation:
//!     - A failed checker run or unreadable report is logged and the previous results
//!       stay in place; nothing is published for that run.
//!     - Requests for unknown documents answer `None`.
//! 3. Property-Based Testing:
//!     - `proptest` feeds random documents and positions through the handlers.
//!
//! Usage
//!
//! Library:
//! ```rust,ignore
//! use sasylf_lsp::SasylfLanguageServer;
//! use tower_lsp::{LspService, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let stdin = tokio::io::stdin();
//!     let stdout = tokio::io::stdout();
//!
//!     let (service, socket) = LspService::new(SasylfLanguageServer::new);
//!     Server::new(stdin, stdout, socket).serve(service).await;
//! }
//! ```
//!
//! Binary:
//! ```text
//! $ sasylf-lsp --checker "java -jar SASyLF.jar"
//! Starts the language server on stdin/stdout; logs go to stderr.
//!
//! $ sasylf-lsp check proofs/nat.slf
//! Runs the checker once and prints the diagnostics as JSON.
//! ```

pub mod config;
pub mod features;
pub mod server;

pub use config::{CheckerConfig, SasylfConfiguration};
pub use server::SasylfLanguageServer;
