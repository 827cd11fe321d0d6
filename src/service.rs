//! The service façade (spec §6 "External Interfaces").
//!
//! Owns every core component and wires them together; `server.rs` is a
//! thin `tower_lsp::LanguageServer` adapter over this type. The façade
//! itself never touches `tower_lsp` — it speaks plain Rust types plus the
//! handful of `lsp_types` shapes (`Position`, `CompletionItem`) the teacher
//! already threads through its own completion builder.

use std::path::PathBuf;
use std::time::Instant;

use tower_lsp::lsp_types::{CompletionItem, CompletionItemKind};

use crate::config::ServiceConfig;
use crate::diagnostics::{Diagnostic, DiagnosticsCoordinator};
use crate::document::{DocumentRegistry, TextChange};
use crate::error::CoreError;
use crate::name_resolver::NameResolver;
use crate::symbol::{ModifierMask, Symbol, SymbolKind, TypeSet};
use crate::symbol_store::{KindMask, SymbolStore};
use crate::traversal;
use crate::type_resolver::{self, ResolveCtx};
use crate::variable_table::VariableTable;
use crate::variable_visitor::VariableTypeVisitor;
use crate::{composer, cst, extract, util};

/// A single completion candidate, kind-agnostic until rendered into an LSP
/// `CompletionItem` by [`PhpIntelligenceService::completions`].
struct Candidate<'a> {
    symbol: &'a Symbol,
}

pub struct PhpIntelligenceService {
    pub config: ServiceConfig,
    pub workspace_root: Option<PathBuf>,
    pub psr4_mappings: Vec<composer::Psr4Mapping>,
    documents: DocumentRegistry,
    symbols: SymbolStore,
    diagnostics: DiagnosticsCoordinator,
}

impl PhpIntelligenceService {
    pub fn new(config: ServiceConfig) -> Self {
        let diagnostics = DiagnosticsCoordinator::new(
            std::time::Duration::from_millis(config.diagnostics_debounce_ms),
            config.max_diagnostics,
        );
        PhpIntelligenceService {
            config,
            workspace_root: None,
            psr4_mappings: Vec::new(),
            documents: DocumentRegistry::new(),
            symbols: SymbolStore::new(),
            diagnostics,
        }
    }

    /// Load PSR-4 mappings from `composer.json` at `root`, storing `root`
    /// as the workspace root for later class-path resolution (spec §10
    /// composer autoload support).
    pub fn set_workspace_root(&mut self, root: PathBuf) {
        self.psr4_mappings = composer::parse_composer_json(&root);
        self.workspace_root = Some(root);
    }

    // ── Documents ────────────────────────────────────────────────────

    pub fn open_document(&mut self, uri: &str, _language_id: &str, version: i32, text: String) -> Result<usize, CoreError> {
        self.documents.open(uri, text, version)?;
        self.diagnostics.register_document(uri);
        self.diagnostics.on_document_changed(uri);
        Ok(self.discover(uri))
    }

    pub fn close_document(&mut self, uri: &str) -> usize {
        self.documents.close(uri);
        self.diagnostics.unregister_document(uri);
        self.forget(uri)
    }

    pub fn edit_document(&mut self, uri: &str, version: i32, changes: &[TextChange]) {
        self.documents.edit(uri, version, changes);
        self.diagnostics.on_document_changed(uri);
        self.forget(uri);
        self.discover(uri);
    }

    /// Re-extract and re-index every symbol declared in `uri`'s current
    /// parse tree, returning the count ingested (spec §6 `discover`).
    pub fn discover(&mut self, uri: &str) -> usize {
        let Some(doc) = self.documents.peek(uri) else { return 0 };
        let symbols = extract::extract_symbols(&doc.root, uri);
        let count = symbols.len();
        for symbol in symbols {
            self.symbols.add(symbol);
        }
        count
    }

    /// Remove every symbol declared by `uri` (spec §6 `forget`).
    pub fn forget(&mut self, uri: &str) -> usize {
        self.symbols.remove(uri)
    }

    /// Drive the diagnostics coordinator's debounce timers forward;
    /// called on a timer tick by the transport layer (spec §4.J).
    pub fn tick_diagnostics(&mut self, now: Instant) {
        self.diagnostics.tick(now, &self.documents);
    }

    pub fn on_diagnostics_start(&mut self, handler: impl FnMut(&String) + Send + 'static) {
        self.diagnostics.on_start.subscribe(handler);
    }

    pub fn on_diagnostics_end(&mut self, handler: impl FnMut(&(String, Vec<Diagnostic>)) + Send + 'static) {
        self.diagnostics.on_end.subscribe(handler);
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn document_symbols(&self, uri: &str) -> Vec<&Symbol> {
        self.symbols.symbols_for_document(uri)
    }

    /// The current text of an open document, if any.
    pub fn document_text(&self, uri: &str) -> Option<&str> {
        self.documents.peek(uri).map(|d| d.text.as_str())
    }

    /// The diagnostics last published for `uri` (spec §4.J).
    pub fn cached_diagnostics(&self, uri: &str) -> &[Diagnostic] {
        self.diagnostics.cached(uri)
    }

    pub fn workspace_symbols(&self, query: &str) -> Vec<&Symbol> {
        self.symbols.match_prefix(query, KindMask::ALL)
    }

    pub fn number_documents_open(&self) -> usize {
        self.documents.count()
    }

    pub fn number_documents_known(&self) -> usize {
        self.documents.count()
    }

    pub fn number_symbols_known(&self) -> usize {
        self.symbols.total_symbols()
    }

    /// Build the name resolver + variable table live at `position` by
    /// replaying the document from its root and halting at that offset
    /// (spec §4.I "Halt-at-offset").
    fn live_state_at(&self, uri: &str, position: tower_lsp::lsp_types::Position) -> Option<(NameResolver, VariableTable, u32)> {
        let doc = self.documents.peek(uri)?;
        let offset = util::position_to_byte_offset(&doc.text, position);
        let mut names = NameResolver::new();
        let mut vars = VariableTable::new();
        {
            let mut visitor = VariableTypeVisitor::new(&mut names, &mut vars, &self.symbols);
            visitor.target_offset = Some(offset);
            traversal::traverse(&doc.root, &mut visitor);
        }
        Some((names, vars, offset))
    }

    /// Completion items at `uri`/`position`, capped at
    /// `config.max_completions` (spec §6 `completions`).
    pub fn completions(&mut self, uri: &str, position: tower_lsp::lsp_types::Position) -> Vec<CompletionItem> {
        let Some((names, vars, offset)) = self.live_state_at(uri, position) else { return Vec::new() };
        let Some(doc) = self.documents.peek(uri) else { return Vec::new() };

        let deepest = traversal::filter(&doc.root, |n| n.span.contains(offset)).into_iter().last();
        let ctx = ResolveCtx { names: &names, store: &self.symbols, vars: &vars };

        let mut symbols: Vec<&Symbol> = Vec::new();

        match deepest.map(|n| &n.kind) {
            Some(cst::NodeKind::PropertyAccess { .. }) | Some(cst::NodeKind::MethodCall { .. }) => {
                if let Some(base) = deepest.and_then(|n| n.children.first()) {
                    let base_type = type_resolver::resolve_expression_type(base, &ctx);
                    for atom in base_type.atoms() {
                        let class_fqn = atom.trim_start_matches('\\');
                        symbols.extend(self.symbols.lookup_members(
                            class_fqn,
                            None,
                            KindMask::of(&[SymbolKind::Method, SymbolKind::Property]),
                            ModifierMask::NONE,
                            ModifierMask::STATIC,
                        ));
                    }
                }
            }
            Some(cst::NodeKind::ScopedCall { .. })
            | Some(cst::NodeKind::ScopedPropertyAccess { .. })
            | Some(cst::NodeKind::ScopedConstantAccess { .. }) => {
                if let Some(container) = deepest.and_then(|n| n.children.first()) {
                    if let cst::NodeKind::QualifiedName { text } = &container.kind {
                        let class_fqn = type_resolver::resolve_class_designator(text, &names);
                        symbols.extend(self.symbols.lookup_members(
                            &class_fqn,
                            None,
                            KindMask::of(&[SymbolKind::Method, SymbolKind::Property, SymbolKind::ClassConstant]),
                            ModifierMask::STATIC,
                            ModifierMask::NONE,
                        ));
                    }
                }
            }
            _ => {
                let prefix = deepest
                    .map(|n| match &n.kind {
                        cst::NodeKind::QualifiedName { text } => text.clone(),
                        cst::NodeKind::SimpleVariable { name } => name.clone(),
                        _ => String::new(),
                    })
                    .unwrap_or_default();
                symbols.extend(self.symbols.match_prefix(&prefix, KindMask::of(&[SymbolKind::Class, SymbolKind::Interface, SymbolKind::Function])));
            }
        }

        let mut items: Vec<CompletionItem> = symbols
            .into_iter()
            .map(|sym| Candidate { symbol: sym })
            .map(Self::build_completion_item)
            .collect();
        items.truncate(self.config.max_completions);
        items
    }

    fn build_completion_item(candidate: Candidate) -> CompletionItem {
        let sym = candidate.symbol;
        let kind = match sym.kind {
            SymbolKind::Method => CompletionItemKind::METHOD,
            SymbolKind::Property => CompletionItemKind::FIELD,
            SymbolKind::ClassConstant | SymbolKind::Constant => CompletionItemKind::CONSTANT,
            SymbolKind::Function => CompletionItemKind::FUNCTION,
            SymbolKind::Class => CompletionItemKind::CLASS,
            SymbolKind::Interface => CompletionItemKind::INTERFACE,
            SymbolKind::Trait | SymbolKind::Namespace | SymbolKind::Parameter | SymbolKind::Variable => CompletionItemKind::TEXT,
        };
        let label = sym.short_name().to_string();
        CompletionItem {
            label: label.clone(),
            kind: Some(kind),
            detail: if sym.type_expr.is_empty() { None } else { Some(sym.type_expr.to_string()) },
            documentation: sym.documentation.clone().map(tower_lsp::lsp_types::Documentation::String),
            insert_text: Some(label.clone()),
            filter_text: Some(label),
            ..CompletionItem::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> PhpIntelligenceService {
        PhpIntelligenceService::new(ServiceConfig::default())
    }

    #[test]
    fn open_document_indexes_declared_symbols() {
        let mut svc = service();
        let count = svc.open_document("a.php", "php", 1, "<?php class Widget { public function name(): string {} }".to_string()).unwrap();
        assert_eq!(count, 1);
        assert_eq!(svc.number_symbols_known(), 1);
        assert_eq!(svc.document_symbols("a.php").len(), 1);
    }

    #[test]
    fn close_document_forgets_its_symbols() {
        let mut svc = service();
        svc.open_document("a.php", "php", 1, "<?php class Widget {}".to_string()).unwrap();
        let removed = svc.close_document("a.php");
        assert_eq!(removed, 1);
        assert_eq!(svc.number_symbols_known(), 0);
    }

    #[test]
    fn edit_document_reindexes_under_new_name() {
        let mut svc = service();
        svc.open_document("a.php", "php", 1, "<?php class Foo {}".to_string()).unwrap();
        svc.edit_document("a.php", 2, &[crate::document::TextChange::Full("<?php class Bar {}".to_string())]);
        assert!(svc.symbols.find("Bar", KindMask::ALL).is_some());
        assert!(svc.symbols.find("Foo", KindMask::ALL).is_none());
    }

    #[test]
    fn workspace_symbols_matches_by_prefix() {
        let mut svc = service();
        svc.open_document("a.php", "php", 1, "<?php class FooBar {} class Baz {}".to_string()).unwrap();
        let results = svc.workspace_symbols("Foo");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].fqn, "FooBar");
    }

    #[test]
    fn property_completion_lists_class_members() {
        let mut svc = service();
        svc.open_document(
            "a.php",
            "php",
            1,
            "<?php class Widget { public int $id; public function name(): string {} } $w = new Widget(); $w->".to_string(),
        )
        .unwrap();
        let text = svc.documents.peek("a.php").unwrap().text.clone();
        // one byte before EOF: spans are half-open `[start, end)` and the
        // EOF token is zero-width at `text.len()`, so the trailing `->`
        // node's span never contains `text.len()` itself.
        let offset = (text.len() as u32).saturating_sub(1);
        let pos = util::byte_offset_to_position(&text, offset);
        let items = svc.completions("a.php", pos);
        let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
        assert!(labels.contains(&"id") || labels.contains(&"name"));
    }

    #[test]
    fn completions_are_capped_at_configured_max() {
        let mut cfg = ServiceConfig::default();
        cfg.max_completions = 1;
        let mut svc = PhpIntelligenceService::new(cfg);
        let src = "<?php class Widget { public int $a; public int $b; public int $c; } $w = new Widget(); $w->";
        svc.open_document("a.php", "php", 1, src.to_string()).unwrap();
        let text = svc.documents.peek("a.php").unwrap().text.clone();
        let pos = util::byte_offset_to_position(&text, (text.len() as u32).saturating_sub(1));
        let items = svc.completions("a.php", pos);
        assert!(items.len() <= 1);
    }
}
