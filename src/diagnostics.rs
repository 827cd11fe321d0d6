//! Component J: the debounced diagnostics coordinator (spec §4.J).
//!
//! Built from component B's [`Debounce`] primitive: this module supplies
//! the policy (what to do when a URI's quiescence window elapses), not
//! the timer mechanics.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tower_lsp::lsp_types::Position;

use crate::document::{DocumentRegistry, ParsedDocument};
use crate::event::{Debounce, Event};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub range: (Position, Position),
    pub severity: Severity,
    pub source: &'static str,
    pub message: String,
}

/// Per-URI debounced diagnostics, with a cached per-document list so a
/// change in one document never triggers a re-scan of another (spec
/// §4.J). The published payload on each fire is the concatenation of
/// every open document's cached diagnostics, truncated to `max_items`.
pub struct DiagnosticsCoordinator {
    wait: Duration,
    max_items: usize,
    debouncers: HashMap<String, Debounce<()>>,
    cache: HashMap<String, Vec<Diagnostic>>,
    pub on_start: Event<String>,
    pub on_end: Event<(String, Vec<Diagnostic>)>,
}

impl DiagnosticsCoordinator {
    pub fn new(wait: Duration, max_items: usize) -> Self {
        DiagnosticsCoordinator {
            wait,
            max_items,
            debouncers: HashMap::new(),
            cache: HashMap::new(),
            on_start: Event::new(),
            on_end: Event::new(),
        }
    }

    pub fn register_document(&mut self, uri: &str) {
        let wait = self.wait;
        self.debouncers.entry(uri.to_string()).or_insert_with(|| Debounce::new(|_: &()| {}, wait));
    }

    pub fn unregister_document(&mut self, uri: &str) {
        self.debouncers.remove(uri);
        self.cache.remove(uri);
    }

    /// Record a change to `uri`, (re)starting its quiescence window.
    pub fn on_document_changed(&mut self, uri: &str) {
        if let Some(d) = self.debouncers.get_mut(uri) {
            d.handle(());
        }
    }

    pub fn set_wait(&mut self, wait: Duration) {
        self.wait = wait;
        for d in self.debouncers.values_mut() {
            d.set_wait(wait);
        }
    }

    /// Fire every debouncer whose quiescence window has elapsed by `now`,
    /// recomputing and publishing diagnostics for each.
    pub fn tick(&mut self, now: Instant, registry: &DocumentRegistry) {
        let due: Vec<String> = self
            .debouncers
            .iter()
            .filter(|(_, d)| d.is_due(now))
            .map(|(uri, _)| uri.clone())
            .collect();
        for uri in due {
            if let Some(d) = self.debouncers.get_mut(&uri) {
                d.clear();
            }
            self.publish(&uri, registry);
        }
    }

    fn publish(&mut self, uri: &str, registry: &DocumentRegistry) {
        self.on_start.trigger(&uri.to_string());
        let diags = registry.peek(uri).map(Self::diagnostics_for).unwrap_or_default();
        self.cache.insert(uri.to_string(), diags);

        // Aggregate in the registry's own MRU order (most-recently-touched
        // document first), not registration order, so truncation at
        // `max_items` drops the least-recently-touched documents' diagnostics
        // first, not whichever were opened last.
        let mut aggregate = Vec::new();
        for u in registry.mru_order() {
            if let Some(list) = self.cache.get(u) {
                aggregate.extend(list.iter().cloned());
            }
            if aggregate.len() >= self.max_items {
                break;
            }
        }
        aggregate.truncate(self.max_items);
        self.on_end.trigger(&(uri.to_string(), aggregate));
    }

    fn diagnostics_for(doc: &ParsedDocument) -> Vec<Diagnostic> {
        doc.errors
            .iter()
            .map(|e| Diagnostic {
                range: (
                    crate::util::byte_offset_to_position(&doc.text, e.span.start),
                    crate::util::byte_offset_to_position(&doc.text, e.span.end),
                ),
                severity: Severity::Error,
                source: "intelephense",
                message: e.message.clone(),
            })
            .collect()
    }

    pub fn cached(&self, uri: &str) -> &[Diagnostic] {
        self.cache.get(uri).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_period_defers_publish() {
        let mut coord = DiagnosticsCoordinator::new(Duration::from_millis(1000), 100);
        coord.register_document("a.php");
        coord.on_document_changed("a.php");
        let registry = DocumentRegistry::new();
        coord.tick(Instant::now(), &registry);
        assert!(coord.cached("a.php").is_empty());
    }

    #[test]
    fn elapsed_window_publishes_cached_diagnostics() {
        let mut coord = DiagnosticsCoordinator::new(Duration::from_millis(10), 100);
        coord.register_document("a.php");
        let mut registry = DocumentRegistry::new();
        registry.open("a.php", "<?php $x = ".to_string(), 1).unwrap();
        coord.on_document_changed("a.php");
        let later = Instant::now() + Duration::from_millis(50);
        coord.tick(later, &registry);
        assert!(!coord.cached("a.php").is_empty());
        assert_eq!(coord.cached("a.php")[0].source, "intelephense");
    }

    #[test]
    fn aggregate_truncates_to_max_items() {
        use std::sync::{Arc, Mutex};

        let mut coord = DiagnosticsCoordinator::new(Duration::from_millis(1), 1);
        let published: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
        let published_handle = published.clone();
        coord.on_end.subscribe(move |pair: &(String, Vec<Diagnostic>)| published_handle.lock().unwrap().push(pair.1.len()));

        coord.register_document("a.php");
        coord.register_document("b.php");
        let mut registry = DocumentRegistry::new();
        registry.open("a.php", "<?php $x = ".to_string(), 1).unwrap();
        registry.open("b.php", "<?php $y = ".to_string(), 1).unwrap();
        coord.on_document_changed("a.php");
        coord.on_document_changed("b.php");
        let later = Instant::now() + Duration::from_millis(20);
        coord.tick(later, &registry);

        assert!(published.lock().unwrap().iter().all(|&len| len <= 1));
    }

    #[test]
    fn unregister_drops_cache() {
        let mut coord = DiagnosticsCoordinator::new(Duration::from_millis(1000), 100);
        coord.register_document("a.php");
        coord.on_document_changed("a.php");
        coord.unregister_document("a.php");
        assert!(coord.cached("a.php").is_empty());
    }
}
