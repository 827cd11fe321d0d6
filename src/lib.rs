//! A PHP language intelligence service: expression/variable type
//! resolution, symbol indexing and name resolution, and incremental
//! document tracking, exposed over the Language Server Protocol.
//!
//! This crate is organised into the following modules:
//!
//! - [`cst`]: the hand-rolled PHP lexer/parser and concrete syntax tree
//! - [`traversal`]: the generic pre/postorder visitor engine over [`cst::Node`]
//! - [`symbol`] / [`symbol_store`]: the symbol data model and workspace-wide index
//! - [`name_resolver`]: namespace/`use`-aware name resolution
//! - [`variable_table`] / [`variable_visitor`]: per-scope variable typing
//! - [`type_resolver`]: expression type inference
//! - [`document`]: the parsed-document registry
//! - [`diagnostics`]: debounced diagnostics publication
//! - [`extract`]: builds indexable symbols from a parsed document
//! - [`composer`]: Composer PSR-4 autoload parsing and class-to-file resolution
//! - [`config`]: service configuration
//! - [`service`]: the transport-agnostic service façade
//! - [`server`]: the LSP `LanguageServer` trait implementation
//! - [`util`]: position/offset conversion and name helpers

use std::sync::{Arc, Mutex};

use tower_lsp::Client;

use diagnostics::Diagnostic;

// ─── Module declarations ────────────────────────────────────────────────────

pub mod binary_search;
pub mod composer;
pub mod config;
pub mod cst;
pub mod diagnostics;
pub mod docblock;
pub mod document;
pub mod error;
pub mod event;
pub mod extract;
pub mod name_resolver;
mod server;
pub mod service;
pub mod stubs;
pub mod symbol;
pub mod symbol_store;
pub mod traversal;
pub mod type_resolver;
pub mod util;
pub mod variable_table;
pub mod variable_visitor;

pub use config::ServiceConfig;
pub use service::PhpIntelligenceService;

// ─── Backend ────────────────────────────────────────────────────────────────

/// The LSP backend: owns the (transport-agnostic) [`PhpIntelligenceService`]
/// behind a single lock and the optional `Client` handle used to publish
/// diagnostics and log messages back to the editor.
///
/// A single `std::sync::Mutex` guards the whole service rather than one
/// lock per component — requests are short-lived CPU-bound tree walks, not
/// I/O, so lock contention is not a concern, and one lock keeps `discover`/
/// `forget`/diagnostics updates from ever observing each other mid-update.
/// The service is behind an `Arc` so the background diagnostics ticker
/// spawned in `server.rs`'s `initialized` can hold its own clone independent
/// of any single request's `&self` borrow.
pub struct Backend {
    pub(crate) name: String,
    pub(crate) version: String,
    pub(crate) client: Option<Client>,
    pub(crate) service: Arc<Mutex<PhpIntelligenceService>>,
    /// The receiving end of the channel fed by the service's
    /// `on_diagnostics_end` subscription, handed to a spawned forwarding
    /// task the first time `initialized` runs. `None` once taken.
    pub(crate) diagnostics_rx: Mutex<Option<tokio::sync::mpsc::UnboundedReceiver<(String, Vec<Diagnostic>)>>>,
}

impl Backend {
    fn wire(mut service: PhpIntelligenceService) -> (Arc<Mutex<PhpIntelligenceService>>, Mutex<Option<tokio::sync::mpsc::UnboundedReceiver<(String, Vec<Diagnostic>)>>>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        service.on_diagnostics_end(move |(uri, diags)| {
            let _ = tx.send((uri.clone(), diags.clone()));
        });
        (Arc::new(Mutex::new(service)), Mutex::new(Some(rx)))
    }

    /// Create a new `Backend` connected to an LSP client.
    pub fn new(client: Client) -> Self {
        let (service, diagnostics_rx) = Self::wire(PhpIntelligenceService::new(ServiceConfig::default()));
        Self {
            name: "php-intelligence-service".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            client: Some(client),
            service,
            diagnostics_rx,
        }
    }

    /// Create a `Backend` without an LSP client (for unit / integration tests).
    pub fn new_test() -> Self {
        let (service, diagnostics_rx) = Self::wire(PhpIntelligenceService::new(ServiceConfig::default()));
        Self {
            name: "php-intelligence-service".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            client: None,
            service,
            diagnostics_rx,
        }
    }

    /// Create a `Backend` for tests with a specific workspace root and PSR-4
    /// mappings pre-configured, bypassing `composer.json` discovery.
    pub fn new_test_with_workspace(
        workspace_root: std::path::PathBuf,
        psr4_mappings: Vec<composer::Psr4Mapping>,
    ) -> Self {
        let mut service = PhpIntelligenceService::new(ServiceConfig::default());
        service.workspace_root = Some(workspace_root);
        service.psr4_mappings = psr4_mappings;
        let (service, diagnostics_rx) = Self::wire(service);
        Self {
            name: "php-intelligence-service".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            client: None,
            service,
            diagnostics_rx,
        }
    }

    /// Log a message to the connected client, if any; falls back to
    /// `tracing` when running without a client (tests, headless use).
    pub(crate) async fn log(&self, level: tower_lsp::lsp_types::MessageType, message: impl std::fmt::Display) {
        if let Some(client) = &self.client {
            client.log_message(level, message).await;
        } else {
            tracing::info!("{}", message);
        }
    }
}
