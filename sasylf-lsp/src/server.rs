//! Main language server implementation

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sasylf_analysis::ast::{CheckerOutput, CompilationUnit};
use sasylf_analysis::utils::word_at;
use serde_json::Value;
use tokio::sync::RwLock;
use tower_lsp::async_trait;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::{
    CodeAction, CodeActionKind, CodeActionOrCommand, CodeActionParams,
    CodeActionProviderCapability, CodeActionResponse, ConfigurationItem, Diagnostic,
    DidChangeConfigurationParams, DidChangeTextDocumentParams, DidCloseTextDocumentParams,
    DidOpenTextDocumentParams, DocumentSymbol, DocumentSymbolParams, DocumentSymbolResponse,
    GotoDefinitionParams, GotoDefinitionResponse, InitializeParams, InitializeResult,
    InitializedParams, Location, MessageType, OneOf, ServerCapabilities, ServerInfo,
    TextDocumentItem, TextDocumentSyncCapability, TextDocumentSyncKind, TextEdit, Url,
    WorkspaceEdit,
};
use tower_lsp::Client;
use tracing::{debug, info, warn};

use crate::config::{normalize_eol, SasylfConfiguration};
use crate::features::checker::{Checker, ProcessChecker};
use crate::features::diagnostics::{collect_diagnostics, CheckedDocument, DIAGNOSTIC_SOURCE};
use crate::features::document_symbols::{collect_document_symbols, SasylfDocumentSymbol};
use crate::features::go_to_definition::resolve_definition;
use crate::features::module_sources::ModuleSources;
use crate::features::quickfix::{synthesize, FormatSettings, QuickfixProposal};

pub const GET_AST_METHOD: &str = "custom/getAST";
pub const VALIDATE_METHOD: &str = "custom/validateTextDocument";

#[async_trait]
pub trait LspClient: Send + Sync + Clone + 'static {
    async fn publish_diagnostics(&self, uri: Url, diags: Vec<Diagnostic>, version: Option<i32>);
    async fn show_message(&self, typ: MessageType, message: String);
    /// `workspace/configuration` pull; `None` when the client cannot answer.
    async fn configuration(&self, items: Vec<ConfigurationItem>) -> Option<Vec<Value>>;
}

#[async_trait]
impl LspClient for Client {
    async fn publish_diagnostics(&self, uri: Url, diags: Vec<Diagnostic>, version: Option<i32>) {
        self.publish_diagnostics(uri, diags, version).await;
    }

    async fn show_message(&self, typ: MessageType, message: String) {
        self.show_message(typ, message).await;
    }

    async fn configuration(&self, items: Vec<ConfigurationItem>) -> Option<Vec<Value>> {
        self.configuration(items).await.ok()
    }
}

/// Result of the last successful checker run over a document.
#[derive(Debug)]
pub struct DocumentAnalysis {
    pub unit: CompilationUnit,
    pub checked: CheckedDocument,
}

#[derive(Clone)]
struct DocumentEntry {
    text: Arc<String>,
    version: Option<i32>,
    analysis: Option<Arc<DocumentAnalysis>>,
}

#[derive(Default)]
struct DocumentStore {
    entries: RwLock<HashMap<Url, DocumentEntry>>,
}

impl DocumentStore {
    /// Replaces the text, keeping the previous analysis until a new one lands.
    async fn upsert(&self, uri: Url, text: String, version: Option<i32>) {
        let mut entries = self.entries.write().await;
        let analysis = entries.get(&uri).and_then(|entry| entry.analysis.clone());
        entries.insert(
            uri,
            DocumentEntry {
                text: Arc::new(text),
                version,
                analysis,
            },
        );
    }

    async fn store_analysis(&self, uri: &Url, analysis: Arc<DocumentAnalysis>) -> bool {
        match self.entries.write().await.get_mut(uri) {
            Some(entry) => {
                entry.analysis = Some(analysis);
                true
            }
            None => false,
        }
    }

    async fn get(&self, uri: &Url) -> Option<DocumentEntry> {
        self.entries.read().await.get(uri).cloned()
    }

    async fn remove(&self, uri: &Url) {
        self.entries.write().await.remove(uri);
    }

    async fn uris(&self) -> Vec<Url> {
        self.entries.read().await.keys().cloned().collect()
    }
}

pub struct SasylfLanguageServer<C = Client, K = ProcessChecker> {
    client: C,
    documents: DocumentStore,
    checker: Arc<K>,
    config: RwLock<SasylfConfiguration>,
    module_sources: ModuleSources,
    last_validated: RwLock<Option<Url>>,
    checker_failure_reported: AtomicBool,
}

impl SasylfLanguageServer<Client, ProcessChecker> {
    pub fn new(client: Client) -> Self {
        Self::with_checker(client, Arc::new(ProcessChecker::new()))
    }
}

impl<C, K> SasylfLanguageServer<C, K>
where
    C: LspClient,
    K: Checker,
{
    pub fn with_checker(client: C, checker: Arc<K>) -> Self {
        Self {
            client,
            documents: DocumentStore::default(),
            checker,
            config: RwLock::new(SasylfConfiguration::default()),
            module_sources: ModuleSources::default(),
            last_validated: RwLock::new(None),
            checker_failure_reported: AtomicBool::new(false),
        }
    }

    pub fn with_configuration(mut self, config: SasylfConfiguration) -> Self {
        self.config = RwLock::new(config);
        self
    }

    pub fn with_module_sources(mut self, module_sources: ModuleSources) -> Self {
        self.module_sources = module_sources;
        self
    }

    /// `custom/getAST`: the AST of the most recently validated document.
    pub async fn get_ast(&self) -> Result<Option<CompilationUnit>> {
        let Some(uri) = self.last_validated.read().await.clone() else {
            return Ok(None);
        };
        Ok(self
            .documents
            .get(&uri)
            .await
            .and_then(|entry| entry.analysis)
            .map(|analysis| analysis.unit.clone()))
    }

    /// `custom/validateTextDocument`: re-runs the checker for an open document.
    pub async fn validate_text_document(&self, uri: Url) {
        self.validate(&uri).await;
    }

    async fn update_and_validate(&self, uri: Url, text: String, version: Option<i32>) {
        self.documents.upsert(uri.clone(), text, version).await;
        self.validate(&uri).await;
    }

    /// Runs the checker and replaces the document's AST and quickfix records before
    /// publishing. Any failure leaves the previous results in place.
    async fn validate(&self, uri: &Url) {
        let Some(entry) = self.documents.get(uri).await else {
            debug!(%uri, "validation requested for a document that is not open");
            return;
        };
        let config = self.config.read().await.clone();

        debug!(%uri, checker = %config.checker.display(), "running checker");
        let stdout = match self.checker.check(&config.checker, &entry.text) {
            Ok(stdout) => stdout,
            Err(err) => {
                warn!(%uri, error = %err, "checker failed, keeping previous results");
                if !self.checker_failure_reported.swap(true, Ordering::SeqCst) {
                    self.client
                        .show_message(MessageType::ERROR, err.to_string())
                        .await;
                }
                return;
            }
        };
        self.checker_failure_reported.store(false, Ordering::SeqCst);

        let output = match CheckerOutput::from_json(&stdout) {
            Ok(output) => output,
            Err(err) => {
                warn!(%uri, error = %err, "discarding checker output");
                return;
            }
        };

        let checked = collect_diagnostics(&output.quickfixes, config.max_number_of_problems);
        let diagnostics = checked.diagnostics.clone();
        debug!(%uri, diagnostics = diagnostics.len(), "checker run complete");
        let analysis = Arc::new(DocumentAnalysis {
            unit: output.ast,
            checked,
        });
        if !self.documents.store_analysis(uri, analysis).await {
            return;
        }
        *self.last_validated.write().await = Some(uri.clone());
        self.client
            .publish_diagnostics(uri.clone(), diagnostics, entry.version)
            .await;
    }

    /// Editor line terminator and indentation for inserted text. Client settings win,
    /// then server configuration, then what the document itself uses.
    async fn format_settings(&self, uri: &Url, text: &str) -> FormatSettings {
        let config = self.config.read().await.clone();
        let items = ["files.eol", "editor.tabSize"]
            .into_iter()
            .map(|section| ConfigurationItem {
                scope_uri: Some(uri.clone()),
                section: Some(section.to_string()),
            })
            .collect();
        let values = self.client.configuration(items).await.unwrap_or_default();

        let eol = values
            .first()
            .and_then(Value::as_str)
            .and_then(normalize_eol)
            .or(config.eol)
            .unwrap_or_else(|| detect_eol(text).to_string());
        let indent_size = values
            .get(1)
            .and_then(Value::as_u64)
            .map(|size| size.min(u32::MAX as u64) as u32)
            .unwrap_or(config.indent_size);
        FormatSettings { eol, indent_size }
    }
}

fn detect_eol(text: &str) -> &'static str {
    if text.contains("\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}

#[allow(deprecated)]
fn to_document_symbol(symbol: &SasylfDocumentSymbol) -> DocumentSymbol {
    DocumentSymbol {
        name: symbol.name.clone(),
        detail: symbol.detail.clone(),
        kind: symbol.kind,
        deprecated: None,
        range: symbol.range,
        selection_range: symbol.selection_range,
        children: if symbol.children.is_empty() {
            None
        } else {
            Some(symbol.children.iter().map(to_document_symbol).collect())
        },
        tags: None,
    }
}

fn to_code_action(uri: &Url, diagnostic: &Diagnostic, proposal: QuickfixProposal) -> CodeAction {
    let edits = proposal
        .edits
        .into_iter()
        .map(|edit| TextEdit {
            range: edit.range,
            new_text: edit.new_text,
        })
        .collect();
    CodeAction {
        title: proposal.title,
        kind: Some(CodeActionKind::QUICKFIX),
        diagnostics: Some(vec![diagnostic.clone()]),
        edit: Some(WorkspaceEdit {
            changes: Some(HashMap::from([(uri.clone(), edits)])),
            ..Default::default()
        }),
        command: None,
        is_preferred: None,
        disabled: None,
        data: None,
    }
}

#[async_trait]
impl<C, K> tower_lsp::LanguageServer for SasylfLanguageServer<C, K>
where
    C: LspClient,
    K: Checker,
{
    async fn initialize(&self, _: InitializeParams) -> Result<InitializeResult> {
        let capabilities = ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
            document_symbol_provider: Some(OneOf::Left(true)),
            definition_provider: Some(OneOf::Left(true)),
            code_action_provider: Some(CodeActionProviderCapability::Simple(true)),
            ..ServerCapabilities::default()
        };

        Ok(InitializeResult {
            capabilities,
            server_info: Some(ServerInfo {
                name: "sasylf-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        let checker = self.config.read().await.checker.display();
        info!(%checker, "sasylf-lsp initialized");
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let TextDocumentItem {
            uri, text, version, ..
        } = params.text_document;
        self.update_and_validate(uri, text, Some(version)).await;
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        self.config.write().await.apply(&params.settings);

        // Re-check all documents with new settings
        for uri in self.documents.uris().await {
            self.validate(&uri).await;
        }
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let version = params.text_document.version;
        if let Some(change) = params.content_changes.into_iter().last() {
            self.update_and_validate(params.text_document.uri, change.text, Some(version))
                .await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        self.documents.remove(&uri).await;
        let mut last = self.last_validated.write().await;
        if last.as_ref() == Some(&uri) {
            *last = None;
        }
    }

    async fn document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> Result<Option<DocumentSymbolResponse>> {
        let analysis = self
            .documents
            .get(&params.text_document.uri)
            .await
            .and_then(|entry| entry.analysis);
        if let Some(analysis) = analysis {
            let symbols = collect_document_symbols(&analysis.unit);
            let converted: Vec<DocumentSymbol> = symbols.iter().map(to_document_symbol).collect();
            Ok(Some(DocumentSymbolResponse::Nested(converted)))
        } else {
            Ok(None)
        }
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        let Some(entry) = self.documents.get(&uri).await else {
            return Ok(None);
        };
        let Some(analysis) = entry.analysis.as_deref() else {
            return Ok(None);
        };
        let Some(word) = word_at(&entry.text, position) else {
            return Ok(None);
        };
        let Some(target) = resolve_definition(&analysis.unit, &word) else {
            return Ok(None);
        };

        let target_uri = match target.module {
            None => uri,
            Some(module) => match self.module_sources.locate(module, &uri) {
                Ok(Some(module_uri)) => module_uri,
                Ok(None) => return Ok(None),
                Err(err) => {
                    warn!(
                        module = %module.short_name(),
                        error = %err,
                        "cannot materialize module source"
                    );
                    return Ok(None);
                }
            },
        };
        Ok(Some(GotoDefinitionResponse::Scalar(Location {
            uri: target_uri,
            range: target.range,
        })))
    }

    async fn code_action(&self, params: CodeActionParams) -> Result<Option<CodeActionResponse>> {
        let uri = params.text_document.uri;
        let Some(entry) = self.documents.get(&uri).await else {
            return Ok(None);
        };
        let Some(analysis) = entry.analysis.as_deref() else {
            return Ok(None);
        };
        let diagnostics: Vec<Diagnostic> = params
            .context
            .diagnostics
            .into_iter()
            .filter(|diagnostic| diagnostic.source.as_deref() == Some(DIAGNOSTIC_SOURCE))
            .collect();
        if diagnostics.is_empty() {
            return Ok(None);
        }

        let settings = self.format_settings(&uri, &entry.text).await;
        let mut actions = Vec::new();
        for diagnostic in &diagnostics {
            let Some(record) = analysis.checked.record_for(diagnostic) else {
                continue;
            };
            for proposal in synthesize(&entry.text, record, Some(&analysis.unit), &settings) {
                actions.push(CodeActionOrCommand::CodeAction(to_code_action(
                    &uri, diagnostic, proposal,
                )));
            }
        }

        if actions.is_empty() {
            Ok(None)
        } else {
            Ok(Some(actions))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckerConfig;
    use crate::features::checker::{CheckerError, CheckerResult};
    use crate::features::module_sources::{ModuleSources, TEMPORARY_SCHEME};
    use sasylf_analysis::test_support::{sample_output_json, sample_source};
    use serde_json::json;
    use std::io;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use tempfile::tempdir;
    use tower_lsp::lsp_types::{
        CodeActionContext, DiagnosticSeverity, NumberOrString, Position, Range, SymbolKind,
        TextDocumentContentChangeEvent, TextDocumentIdentifier, TextDocumentPositionParams,
        VersionedTextDocumentIdentifier,
    };
    use tower_lsp::LanguageServer;

    type Published = Arc<Mutex<Vec<(Url, Vec<Diagnostic>, Option<i32>)>>>;

    #[derive(Clone, Default)]
    struct NoopClient {
        published: Published,
        messages: Arc<Mutex<Vec<String>>>,
        settings: Option<Vec<Value>>,
    }

    #[async_trait]
    impl LspClient for NoopClient {
        async fn publish_diagnostics(
            &self,
            uri: Url,
            diags: Vec<Diagnostic>,
            version: Option<i32>,
        ) {
            self.published.lock().unwrap().push((uri, diags, version));
        }

        async fn show_message(&self, _: MessageType, message: String) {
            self.messages.lock().unwrap().push(message);
        }

        async fn configuration(&self, _: Vec<ConfigurationItem>) -> Option<Vec<Value>> {
            self.settings.clone()
        }
    }

    struct MockChecker {
        calls: AtomicUsize,
        last_command: Mutex<Option<String>>,
        stdout: Mutex<Option<String>>,
    }

    impl MockChecker {
        fn answering(stdout: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                last_command: Mutex::new(None),
                stdout: Mutex::new(Some(stdout.to_string())),
            }
        }

        fn set_stdout(&self, stdout: Option<&str>) {
            *self.stdout.lock().unwrap() = stdout.map(str::to_string);
        }
    }

    impl Checker for MockChecker {
        fn check(&self, config: &CheckerConfig, _: &str) -> CheckerResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_command.lock().unwrap() = Some(config.display());
            self.stdout
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| CheckerError::Spawn {
                    command: config.display(),
                    source: io::Error::new(io::ErrorKind::NotFound, "missing"),
                })
        }
    }

    fn sample_uri() -> Url {
        Url::parse("file:///proofs/nat.slf").unwrap()
    }

    fn server_with(
        client: NoopClient,
        checker: Arc<MockChecker>,
    ) -> SasylfLanguageServer<NoopClient, MockChecker> {
        SasylfLanguageServer::with_checker(client, checker)
    }

    async fn open_sample_document(server: &SasylfLanguageServer<NoopClient, MockChecker>) {
        server
            .did_open(DidOpenTextDocumentParams {
                text_document: TextDocumentItem {
                    uri: sample_uri(),
                    language_id: "sasylf".into(),
                    version: 1,
                    text: sample_source().to_string(),
                },
            })
            .await;
    }

    fn published_for(client: &NoopClient) -> Vec<Diagnostic> {
        client
            .published
            .lock()
            .unwrap()
            .last()
            .map(|(_, diags, _)| diags.clone())
            .unwrap_or_default()
    }

    async fn request_actions(
        server: &SasylfLanguageServer<NoopClient, MockChecker>,
        diagnostics: Vec<Diagnostic>,
    ) -> Option<CodeActionResponse> {
        server
            .code_action(CodeActionParams {
                text_document: TextDocumentIdentifier { uri: sample_uri() },
                range: Range::default(),
                context: CodeActionContext {
                    diagnostics,
                    only: None,
                    trigger_kind: None,
                },
                work_done_progress_params: Default::default(),
                partial_result_params: Default::default(),
            })
            .await
            .unwrap()
    }

    fn definition_params(position: Position) -> GotoDefinitionParams {
        GotoDefinitionParams {
            text_document_position_params: TextDocumentPositionParams {
                text_document: TextDocumentIdentifier { uri: sample_uri() },
                position,
            },
            work_done_progress_params: Default::default(),
            partial_result_params: Default::default(),
        }
    }

    #[tokio::test]
    async fn did_open_publishes_checker_diagnostics() {
        let client = NoopClient::default();
        let checker = Arc::new(MockChecker::answering(sample_output_json()));
        let server = server_with(client.clone(), checker.clone());
        open_sample_document(&server).await;

        assert_eq!(checker.calls.load(Ordering::SeqCst), 1);
        let published = client.published.lock().unwrap().clone();
        assert_eq!(published.len(), 1);
        let (uri, diagnostics, version) = &published[0];
        assert_eq!(uri, &sample_uri());
        assert_eq!(*version, Some(1));
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].severity, Some(DiagnosticSeverity::WARNING));
        assert_eq!(diagnostics[1].code, Some(NumberOrString::Number(1)));
        assert_eq!(
            diagnostics[1].range,
            Range::new(Position::new(25, 0), Position::new(25, 5))
        );
    }

    #[tokio::test]
    async fn code_action_offers_checker_quickfix() {
        let client = NoopClient::default();
        let checker = Arc::new(MockChecker::answering(sample_output_json()));
        let server = server_with(client.clone(), checker);
        open_sample_document(&server).await;

        let diagnostics = published_for(&client);
        let actions = request_actions(&server, diagnostics).await.unwrap();
        assert_eq!(actions.len(), 1);
        let CodeActionOrCommand::CodeAction(action) = &actions[0] else {
            panic!("expected a code action");
        };
        assert_eq!(action.title, "replace 'lemma' with 'theorem'");
        assert_eq!(action.kind, Some(CodeActionKind::QUICKFIX));
        let edits = &action.edit.as_ref().unwrap().changes.as_ref().unwrap()[&sample_uri()];
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].new_text, "theorem");
        assert_eq!(
            edits[0].range,
            Range::new(Position::new(25, 0), Position::new(25, 5))
        );
    }

    #[tokio::test]
    async fn code_action_ignores_foreign_and_unknown_diagnostics() {
        let client = NoopClient::default();
        let checker = Arc::new(MockChecker::answering(sample_output_json()));
        let server = server_with(client.clone(), checker);
        open_sample_document(&server).await;

        let mut foreign = published_for(&client)[1].clone();
        foreign.source = Some("other".into());
        let mut stale = published_for(&client)[1].clone();
        stale.code = Some(NumberOrString::Number(42));
        assert!(request_actions(&server, vec![foreign]).await.is_none());
        assert!(request_actions(&server, vec![stale]).await.is_none());
    }

    #[tokio::test]
    async fn code_action_returns_none_without_document_entry() {
        let checker = Arc::new(MockChecker::answering(sample_output_json()));
        let server = server_with(NoopClient::default(), checker);
        let diagnostic = Diagnostic {
            source: Some(DIAGNOSTIC_SOURCE.into()),
            code: Some(NumberOrString::Number(0)),
            ..Default::default()
        };
        assert!(request_actions(&server, vec![diagnostic]).await.is_none());
    }

    #[tokio::test]
    async fn code_action_uses_client_line_endings() {
        let client = NoopClient {
            settings: Some(vec![json!("\r\n"), json!(2)]),
            ..Default::default()
        };
        let output = json!({
            "quickfixes": [{
                "severity": "error", "error_type": "ASSUMED_ASSUMES", "error_info": "assumes Gamma",
                "error_message": "assumes should be on the judgment",
                "begin_line": 22, "begin_column": 9, "end_line": 22, "end_column": 19
            }],
            "ast": {}
        });
        let checker = Arc::new(MockChecker::answering(&output.to_string()));
        let server = server_with(client.clone(), checker);
        open_sample_document(&server).await;

        let actions = request_actions(&server, published_for(&client)).await.unwrap();
        let CodeActionOrCommand::CodeAction(action) = &actions[0] else {
            panic!("expected a code action");
        };
        let edits = &action.edit.as_ref().unwrap().changes.as_ref().unwrap()[&sample_uri()];
        assert_eq!(edits[0].new_text, "  assumes Gamma\r\n");
        assert_eq!(edits[0].range.start, Position::new(22, 0));
    }

    #[tokio::test]
    async fn checker_failure_keeps_previous_results() {
        let client = NoopClient::default();
        let checker = Arc::new(MockChecker::answering(sample_output_json()));
        let server = server_with(client.clone(), checker.clone());
        open_sample_document(&server).await;

        checker.set_stdout(None);
        server.validate_text_document(sample_uri()).await;
        server.validate_text_document(sample_uri()).await;
        assert_eq!(client.published.lock().unwrap().len(), 1);
        assert_eq!(client.messages.lock().unwrap().len(), 1);

        checker.set_stdout(Some("Exception in thread \"main\""));
        server.validate_text_document(sample_uri()).await;
        assert_eq!(client.published.lock().unwrap().len(), 1);

        let ast = server.get_ast().await.unwrap().unwrap();
        assert_eq!(ast.name, "Nat");
    }

    #[tokio::test]
    async fn configuration_change_revalidates_with_new_limits() {
        let client = NoopClient::default();
        let checker = Arc::new(MockChecker::answering(sample_output_json()));
        let server = server_with(client.clone(), checker.clone());
        open_sample_document(&server).await;

        server
            .did_change_configuration(DidChangeConfigurationParams {
                settings: json!({"sasylf": {"maxNumberOfProblems": 1, "checkerCommand": "sasylf"}}),
            })
            .await;

        assert_eq!(checker.calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            checker.last_command.lock().unwrap().as_deref(),
            Some("sasylf")
        );
        assert_eq!(published_for(&client).len(), 1);
    }

    #[tokio::test]
    async fn did_change_uses_latest_text_and_version() {
        let client = NoopClient::default();
        let checker = Arc::new(MockChecker::answering(sample_output_json()));
        let server = server_with(client.clone(), checker.clone());
        open_sample_document(&server).await;

        server
            .did_change(DidChangeTextDocumentParams {
                text_document: VersionedTextDocumentIdentifier {
                    uri: sample_uri(),
                    version: 7,
                },
                content_changes: vec![TextDocumentContentChangeEvent {
                    range: None,
                    range_length: None,
                    text: "module Nat\n".into(),
                }],
            })
            .await;

        assert_eq!(checker.calls.load(Ordering::SeqCst), 2);
        let published = client.published.lock().unwrap();
        assert_eq!(published.last().unwrap().2, Some(7));
    }

    #[tokio::test]
    async fn document_symbols_come_from_cached_ast() {
        let checker = Arc::new(MockChecker::answering(sample_output_json()));
        let server = server_with(NoopClient::default(), checker);
        open_sample_document(&server).await;

        let response = server
            .document_symbol(DocumentSymbolParams {
                text_document: TextDocumentIdentifier { uri: sample_uri() },
                work_done_progress_params: Default::default(),
                partial_result_params: Default::default(),
            })
            .await
            .unwrap()
            .unwrap();

        match response {
            DocumentSymbolResponse::Nested(symbols) => {
                assert_eq!(symbols[0].kind, SymbolKind::MODULE);
                let plus = symbols.iter().find(|symbol| symbol.name == "plus").unwrap();
                assert_eq!(plus.children.as_ref().map(Vec::len), Some(2));
            }
            _ => panic!("unexpected symbol response"),
        }
    }

    #[tokio::test]
    async fn document_symbols_return_none_when_document_missing() {
        let checker = Arc::new(MockChecker::answering(sample_output_json()));
        let server = server_with(NoopClient::default(), checker);
        let result = server
            .document_symbol(DocumentSymbolParams {
                text_document: TextDocumentIdentifier { uri: sample_uri() },
                work_done_progress_params: Default::default(),
                partial_result_params: Default::default(),
            })
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn goto_definition_resolves_local_theorem() {
        let checker = Arc::new(MockChecker::answering(sample_output_json()));
        let server = server_with(NoopClient::default(), checker);
        open_sample_document(&server).await;

        let response = server
            .goto_definition(definition_params(Position::new(21, 12)))
            .await
            .unwrap();
        let Some(GotoDefinitionResponse::Scalar(location)) = response else {
            panic!("expected a single location");
        };
        assert_eq!(location.uri, sample_uri());
        assert_eq!(location.range.start, Position::new(21, 8));
    }

    #[tokio::test]
    async fn goto_definition_materializes_module_source() {
        let dir = tempdir().unwrap();
        let checker = Arc::new(MockChecker::answering(sample_output_json()));
        let server = server_with(NoopClient::default(), checker)
            .with_module_sources(ModuleSources::new(dir.path()));
        open_sample_document(&server).await;

        let response = server
            .goto_definition(definition_params(Position::new(30, 21)))
            .await
            .unwrap();
        let Some(GotoDefinitionResponse::Scalar(location)) = response else {
            panic!("expected a single location");
        };
        assert_eq!(location.uri.scheme(), TEMPORARY_SCHEME);
        assert_eq!(
            location.range,
            Range::new(Position::new(6, 11), Position::new(6, 13))
        );
        assert!(dir.path().join("org/sasylf/util/Equality.slf").exists());
    }

    #[tokio::test]
    async fn goto_definition_returns_none_for_unknown_words() {
        let checker = Arc::new(MockChecker::answering(sample_output_json()));
        let server = server_with(NoopClient::default(), checker);
        open_sample_document(&server).await;
        let response = server
            .goto_definition(definition_params(Position::new(3, 0)))
            .await
            .unwrap();
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn get_ast_tracks_last_validated_document() {
        let checker = Arc::new(MockChecker::answering(sample_output_json()));
        let server = server_with(NoopClient::default(), checker);
        assert!(server.get_ast().await.unwrap().is_none());

        open_sample_document(&server).await;
        let ast = server.get_ast().await.unwrap().unwrap();
        assert_eq!(ast.theorems.len(), 3);

        server
            .did_close(DidCloseTextDocumentParams {
                text_document: TextDocumentIdentifier { uri: sample_uri() },
            })
            .await;
        assert!(server.get_ast().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn validate_notification_ignores_closed_documents() {
        let checker = Arc::new(MockChecker::answering(sample_output_json()));
        let server = server_with(NoopClient::default(), checker.clone());
        server.validate_text_document(sample_uri()).await;
        assert_eq!(checker.calls.load(Ordering::SeqCst), 0);
    }
}
