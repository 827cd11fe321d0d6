//! LSP server trait implementation.
//!
//! This module contains the `impl LanguageServer for Backend` block, which
//! handles all LSP protocol messages (initialize, didOpen, didChange,
//! didClose, completion, documentSymbol, workspaceSymbol) by delegating to
//! the [`crate::service::PhpIntelligenceService`] façade.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

use crate::service::PhpIntelligenceService;
use crate::symbol::{Symbol, SymbolKind};
use crate::Backend;

use tower_lsp::lsp_types::SymbolKind as LspSymbolKind;

/// How often the background ticker drives the diagnostics coordinator's
/// clock forward. Small relative to the default 1000ms debounce window so
/// a quiescent edit is noticed promptly without re-scanning on every poll.
const DIAGNOSTICS_TICK_INTERVAL: Duration = Duration::from_millis(50);

fn to_lsp_symbol_kind(kind: SymbolKind) -> LspSymbolKind {
    match kind {
        SymbolKind::Namespace => LspSymbolKind::NAMESPACE,
        SymbolKind::Class => LspSymbolKind::CLASS,
        SymbolKind::Interface => LspSymbolKind::INTERFACE,
        SymbolKind::Trait => LspSymbolKind::INTERFACE,
        SymbolKind::Constant => LspSymbolKind::CONSTANT,
        SymbolKind::Function => LspSymbolKind::FUNCTION,
        SymbolKind::Method => LspSymbolKind::METHOD,
        SymbolKind::Property => LspSymbolKind::FIELD,
        SymbolKind::ClassConstant => LspSymbolKind::CONSTANT,
        SymbolKind::Parameter => LspSymbolKind::VARIABLE,
        SymbolKind::Variable => LspSymbolKind::VARIABLE,
    }
}

fn to_document_symbol(sym: &Symbol, content: &str) -> DocumentSymbol {
    let range = Range {
        start: crate::util::byte_offset_to_position(content, sym.span.start),
        end: crate::util::byte_offset_to_position(content, sym.span.end),
    };
    #[allow(deprecated)]
    DocumentSymbol {
        name: sym.short_name().to_string(),
        detail: if sym.type_expr.is_empty() { None } else { Some(sym.type_expr.to_string()) },
        kind: to_lsp_symbol_kind(sym.kind),
        tags: None,
        deprecated: None,
        range,
        selection_range: range,
        children: if sym.children.is_empty() {
            None
        } else {
            Some(sym.children.iter().map(|c| to_document_symbol(c, content)).collect())
        },
    }
}

fn to_lsp_diagnostic(d: &crate::diagnostics::Diagnostic) -> Diagnostic {
    Diagnostic {
        range: Range { start: d.range.0, end: d.range.1 },
        severity: Some(DiagnosticSeverity::ERROR),
        source: Some(d.source.to_string()),
        message: d.message.clone(),
        ..Diagnostic::default()
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let workspace_root = params.root_uri.as_ref().and_then(|uri| uri.to_file_path().ok());

        {
            let mut svc = self.service.lock().unwrap();
            svc.config = crate::ServiceConfig::resolve(params.initialization_options.as_ref(), workspace_root.as_deref());
            if let Some(root) = workspace_root {
                svc.set_workspace_root(root);
            }
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                completion_provider: Some(CompletionOptions {
                    resolve_provider: Some(false),
                    trigger_characters: Some(vec!["$".to_string(), ">".to_string(), ":".to_string()]),
                    all_commit_characters: None,
                    work_done_progress_options: WorkDoneProgressOptions { work_done_progress: None },
                }),
                text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
                document_symbol_provider: Some(OneOf::Left(true)),
                workspace_symbol_provider: Some(OneOf::Left(true)),
                ..ServerCapabilities::default()
            },
            server_info: Some(ServerInfo { name: self.name.clone(), version: Some(self.version.clone()) }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        let mapping_count = self.service.lock().unwrap().psr4_mappings.len();
        self.log(
            MessageType::INFO,
            format!("php-intelligence-service initialized! Loaded {} PSR-4 mapping(s)", mapping_count),
        )
        .await;

        // Diagnostics publishing is driven by two background tasks rather
        // than from request handlers: a ticker that advances the
        // coordinator's clock off the real wall clock (so its debounce
        // window can actually elapse), and a forwarder that relays
        // whatever the coordinator decides is due out to the client. Both
        // are spawned once, here, rather than per-edit.
        if let Some(rx) = self.diagnostics_rx.lock().unwrap().take() {
            if let Some(client) = self.client.clone() {
                tokio::spawn(forward_diagnostics(rx, client));
            }
        }
        tokio::spawn(tick_diagnostics_loop(Arc::clone(&self.service)));
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        let uri = doc.uri.to_string();

        let result = {
            let mut svc = self.service.lock().unwrap();
            svc.open_document(&uri, doc.language_id.as_str(), doc.version, doc.text)
        };

        match result {
            Ok(n) => self.log(MessageType::INFO, format!("Opened file: {} ({} symbol(s))", uri, n)).await,
            Err(err) => self.log(MessageType::WARNING, format!("Opened file: {} ({})", uri, err)).await,
        }
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri.to_string();

        if let Some(change) = params.content_changes.into_iter().next() {
            let mut svc = self.service.lock().unwrap();
            svc.edit_document(&uri, params.text_document.version, &[crate::document::TextChange::Full(change.text)]);
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri.to_string();
        self.service.lock().unwrap().close_document(&uri);
        self.log(MessageType::INFO, format!("Closed file: {}", uri)).await;
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri.to_string();
        let position = params.text_document_position.position;

        let items = self.service.lock().unwrap().completions(&uri, position);
        if items.is_empty() {
            Ok(None)
        } else {
            Ok(Some(CompletionResponse::Array(items)))
        }
    }

    async fn document_symbol(&self, params: DocumentSymbolParams) -> Result<Option<DocumentSymbolResponse>> {
        let uri = params.text_document.uri.to_string();
        let svc = self.service.lock().unwrap();
        let Some(content) = svc.document_text(&uri) else { return Ok(None) };
        let symbols: Vec<DocumentSymbol> = svc.document_symbols(&uri).into_iter().map(|s| to_document_symbol(s, content)).collect();
        drop(svc);

        if symbols.is_empty() {
            Ok(None)
        } else {
            Ok(Some(DocumentSymbolResponse::Nested(symbols)))
        }
    }

    async fn symbol(&self, params: WorkspaceSymbolParams) -> Result<Option<Vec<SymbolInformation>>> {
        let svc = self.service.lock().unwrap();
        let results: Vec<SymbolInformation> = svc
            .workspace_symbols(&params.query)
            .into_iter()
            .filter_map(|sym| {
                let content = svc.document_text(&sym.uri)?;
                let range = Range {
                    start: crate::util::byte_offset_to_position(content, sym.span.start),
                    end: crate::util::byte_offset_to_position(content, sym.span.end),
                };
                let uri = Url::parse(&sym.uri).ok()?;
                #[allow(deprecated)]
                Some(SymbolInformation {
                    name: sym.short_name().to_string(),
                    kind: to_lsp_symbol_kind(sym.kind),
                    tags: None,
                    deprecated: None,
                    location: Location { uri, range },
                    container_name: sym.parent.clone(),
                })
            })
            .collect();
        Ok(Some(results))
    }
}

/// Advance the diagnostics coordinator's clock off the real wall clock,
/// once per `DIAGNOSTICS_TICK_INTERVAL`, for as long as the server runs.
/// Firing only happens inside `tick_diagnostics` itself, once a URI's own
/// quiescence deadline (set by `on_document_changed` on each edit) has
/// actually passed — ticking more often than the debounce window just
/// means the fire is noticed sooner, it never forces one early.
async fn tick_diagnostics_loop(service: Arc<Mutex<PhpIntelligenceService>>) {
    let mut interval = tokio::time::interval(DIAGNOSTICS_TICK_INTERVAL);
    loop {
        interval.tick().await;
        service.lock().unwrap().tick_diagnostics(Instant::now());
    }
}

/// Relay every `(uri, diagnostics)` pair the coordinator publishes (via its
/// `on_diagnostics_end` subscription feeding this channel) out to the
/// client, for as long as the sending half — held by the service's
/// `Debounce` closure — stays alive.
async fn forward_diagnostics(mut rx: tokio::sync::mpsc::UnboundedReceiver<(String, Vec<crate::diagnostics::Diagnostic>)>, client: Client) {
    while let Some((uri, diags)) = rx.recv().await {
        if let Ok(parsed_uri) = Url::parse(&uri) {
            let lsp_diags: Vec<Diagnostic> = diags.iter().map(to_lsp_diagnostic).collect();
            client.publish_diagnostics(parsed_uri, lsp_diags, None).await;
        }
    }
}
