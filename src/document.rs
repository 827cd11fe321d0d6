//! Component D: the parsed document registry (spec §4.D).

use crate::cst::{self, Node, ParseError};
use crate::event::Event;

/// A single text-document edit: either a full-content replace or a
/// byte-range replace.
#[derive(Debug, Clone)]
pub enum TextChange {
    Full(String),
    Range { start: u32, end: u32, text: String },
}

/// {URI, current text, parse tree, change event source} — spec §3
/// "ParsedDocument". Lifetime: created by `open`, mutated in place by
/// `edit` (reparse + fire change event), destroyed by `close`.
pub struct ParsedDocument {
    pub uri: String,
    pub text: String,
    pub version: i32,
    pub root: Node,
    pub errors: Vec<ParseError>,
    pub on_change: Event<ChangeEvent>,
}

#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub uri: String,
    pub version: i32,
}

impl ParsedDocument {
    fn reparse(&mut self) {
        let tree = cst::parse(&self.text);
        self.root = tree.root;
        self.errors = tree.errors;
    }
}

/// Applies changes in order to `text`, returning the new content.
fn apply_changes(mut text: String, changes: &[TextChange]) -> String {
    for change in changes {
        match change {
            TextChange::Full(new_text) => text = new_text.clone(),
            TextChange::Range { start, end, text: patch } => {
                let start = (*start as usize).min(text.len());
                let end = (*end as usize).min(text.len()).max(start);
                text.replace_range(start..end, patch);
            }
        }
    }
    text
}

/// Maps URI → parsed document; maintains MRU ordering so the diagnostics
/// coordinator can process the most recently touched document first (spec
/// §4.D). Any lookup that locates a document promotes it to the front,
/// specified directly as a move-to-front on hit rather than the
/// pop-and-re-push traversal spec §9 notes as the source's approach.
#[derive(Default)]
pub struct DocumentRegistry {
    /// Most-recently-used first.
    order: Vec<String>,
    docs: std::collections::HashMap<String, ParsedDocument>,
}

impl DocumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, uri: &str, text: String, version: i32) -> Result<(), crate::error::CoreError> {
        if self.docs.contains_key(uri) {
            return Err(crate::error::CoreError::DuplicateKey(uri.to_string()));
        }
        let tree = cst::parse(&text);
        let doc = ParsedDocument {
            uri: uri.to_string(),
            text,
            version,
            root: tree.root,
            errors: tree.errors,
            on_change: Event::new(),
        };
        self.docs.insert(uri.to_string(), doc);
        self.order.insert(0, uri.to_string());
        Ok(())
    }

    pub fn close(&mut self, uri: &str) {
        self.docs.remove(uri);
        self.order.retain(|u| u != uri);
    }

    /// Apply `changes` in order, reparse, and fire the change event.
    pub fn edit(&mut self, uri: &str, version: i32, changes: &[TextChange]) {
        self.promote(uri);
        if let Some(doc) = self.docs.get_mut(uri) {
            doc.text = apply_changes(std::mem::take(&mut doc.text), changes);
            doc.version = version;
            doc.reparse();
            doc.on_change.trigger(&ChangeEvent { uri: uri.to_string(), version });
        }
    }

    /// Move `uri` to the front of the MRU order, if present.
    fn promote(&mut self, uri: &str) {
        if let Some(pos) = self.order.iter().position(|u| u == uri) {
            if pos != 0 {
                let entry = self.order.remove(pos);
                self.order.insert(0, entry);
            }
        }
    }

    pub fn get(&mut self, uri: &str) -> Option<&ParsedDocument> {
        if self.docs.contains_key(uri) {
            self.promote(uri);
        }
        self.docs.get(uri)
    }

    pub fn get_mut(&mut self, uri: &str) -> Option<&mut ParsedDocument> {
        if self.docs.contains_key(uri) {
            self.promote(uri);
        }
        self.docs.get_mut(uri)
    }

    pub fn peek(&self, uri: &str) -> Option<&ParsedDocument> {
        self.docs.get(uri)
    }

    pub fn is_open(&self, uri: &str) -> bool {
        self.docs.contains_key(uri)
    }

    pub fn count(&self) -> usize {
        self.docs.len()
    }

    /// URIs in MRU order, most-recently-touched first (spec §4.D, used by
    /// the diagnostics coordinator).
    pub fn mru_order(&self) -> &[String] {
        &self.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_open_is_rejected() {
        let mut reg = DocumentRegistry::new();
        reg.open("a.php", "<?php".to_string(), 1).unwrap();
        let err = reg.open("a.php", "<?php".to_string(), 1).unwrap_err();
        assert!(matches!(err, crate::error::CoreError::DuplicateKey(_)));
    }

    #[test]
    fn edit_reparses_and_fires_change() {
        let mut reg = DocumentRegistry::new();
        reg.open("a.php", "<?php $x = 1;".to_string(), 1).unwrap();
        reg.edit(
            "a.php",
            2,
            &[TextChange::Full("<?php $x = 2; $y = 3;".to_string())],
        );
        let doc = reg.peek("a.php").unwrap();
        assert_eq!(doc.text, "<?php $x = 2; $y = 3;");
        assert_eq!(doc.version, 2);
    }

    #[test]
    fn lookup_promotes_to_front() {
        let mut reg = DocumentRegistry::new();
        reg.open("a.php", String::new(), 1).unwrap();
        reg.open("b.php", String::new(), 1).unwrap();
        assert_eq!(reg.mru_order(), &["b.php".to_string(), "a.php".to_string()]);
        reg.get("a.php");
        assert_eq!(reg.mru_order(), &["a.php".to_string(), "b.php".to_string()]);
    }

    #[test]
    fn close_removes_from_registry_and_order() {
        let mut reg = DocumentRegistry::new();
        reg.open("a.php", String::new(), 1).unwrap();
        reg.close("a.php");
        assert!(!reg.is_open("a.php"));
        assert!(reg.mru_order().is_empty());
    }
}
