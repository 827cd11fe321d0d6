//! Component F: the workspace-wide indexed symbol store (spec §4.F).

use std::collections::HashMap;

use crate::symbol::{ModifierMask, Symbol, SymbolKind};
use crate::util::short_name;

/// A case-insensitive prefix trie substitute: for this crate's scale (an
/// editor's open workspace, not a registry of millions of symbols) a
/// sorted `Vec` with a binary-searched prefix range is simpler to reason
/// about than a real trie and just as fast in practice; [`crate::binary_search`]
/// supplies the rank query.
#[derive(Default)]
struct NameIndex {
    /// (lowercased short name, fqn), kept sorted by the lowercased name.
    entries: Vec<(String, String)>,
}

impl NameIndex {
    fn insert(&mut self, short_name: &str, fqn: &str) {
        let key = short_name.to_ascii_lowercase();
        let pos = self.entries.partition_point(|(k, _)| k.as_str() < key.as_str());
        self.entries.insert(pos, (key, fqn.to_string()));
    }

    fn remove_all(&mut self, fqn: &str) {
        self.entries.retain(|(_, f)| f != fqn);
    }

    fn prefix_match(&self, prefix: &str) -> Vec<&str> {
        let needle = prefix.to_ascii_lowercase();
        let lo = crate::binary_search::rank(self.entries.len(), |i| self.entries[i].0.as_str().cmp(needle.as_str())).rank;
        let mut out = Vec::new();
        for (key, fqn) in &self.entries[lo..] {
            if !key.starts_with(&needle) {
                break;
            }
            out.push(fqn.as_str());
        }
        out
    }
}

/// The workspace-wide store of declared PHP symbols.
#[derive(Default)]
pub struct SymbolStore {
    by_fqn: HashMap<String, Symbol>,
    by_uri: HashMap<String, Vec<String>>,
    name_index: NameIndex,
    /// Re-entrancy guard (spec §5: queries during mutation are disallowed,
    /// fail fast rather than return stale data).
    mutating: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindMask(pub u16);

impl KindMask {
    pub const ALL: KindMask = KindMask(0xFFFF);

    pub fn of(kinds: &[SymbolKind]) -> KindMask {
        let mut mask = 0u16;
        for k in kinds {
            mask |= 1 << (*k as u16);
        }
        KindMask(mask)
    }

    pub fn matches(self, kind: SymbolKind) -> bool {
        self.0 & (1 << (kind as u16)) != 0
    }
}

impl SymbolStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn assert_not_mutating(&self) {
        if self.mutating {
            panic!("SymbolStore: re-entrant query during mutation (InternalInvariantViolation)");
        }
    }

    /// Index every symbol in `tree` (and its descendants), recursively.
    /// Class-like symbols are expected to already carry their directly
    /// declared children; inherited/trait-imported members are computed
    /// lazily by [`Self::lookup_members`], not stored redundantly here.
    ///
    /// Every descendant's FQN — not just the root's — is recorded against
    /// `uri` so [`Self::remove`] can purge the `name_index` entry
    /// `index_recursive` inserted for each nested method/property/constant,
    /// not only the top-level declaration.
    pub fn add(&mut self, tree: Symbol) {
        self.mutating = true;
        let uri = tree.uri.clone();
        let mut fqns = Vec::new();
        self.index_recursive(&tree, &mut fqns);
        self.by_uri.entry(uri).or_default().extend(fqns);
        self.by_fqn.insert(tree.fqn.clone(), tree);
        self.mutating = false;
    }

    fn index_recursive(&mut self, sym: &Symbol, fqns: &mut Vec<String>) {
        self.name_index.insert(sym.short_name(), &sym.fqn);
        fqns.push(sym.fqn.clone());
        for child in &sym.children {
            self.index_recursive(child, fqns);
        }
    }

    /// Remove every symbol declared by `uri` from every index.
    pub fn remove(&mut self, uri: &str) -> usize {
        self.mutating = true;
        let fqns = self.by_uri.remove(uri).unwrap_or_default();
        let count = fqns.len();
        for fqn in &fqns {
            self.name_index.remove_all(fqn);
            self.by_fqn.remove(fqn);
        }
        self.mutating = false;
        count
    }

    pub fn find(&self, fqn: &str, kind_mask: KindMask) -> Option<&Symbol> {
        self.assert_not_mutating();
        let normalized = crate::util::strip_leading_separator(fqn);
        self.by_fqn.get(normalized).filter(|s| kind_mask.matches(s.kind))
    }

    /// Case-insensitive short-name prefix match, for completions /
    /// workspace-symbol queries, ranked by name length then FQN
    /// lexicographically (spec §6 `workspaceSymbols`).
    pub fn match_prefix(&self, prefix: &str, kind_mask: KindMask) -> Vec<&Symbol> {
        self.assert_not_mutating();
        let mut out: Vec<&Symbol> = self
            .name_index
            .prefix_match(prefix)
            .into_iter()
            .filter_map(|fqn| self.by_fqn.get(fqn))
            .filter(|s| kind_mask.matches(s.kind))
            .collect();
        out.sort_by(|a, b| a.fqn.len().cmp(&b.fqn.len()).then_with(|| a.fqn.cmp(&b.fqn)));
        out
    }

    pub fn symbols_for_document(&self, uri: &str) -> Vec<&Symbol> {
        self.assert_not_mutating();
        self.by_uri
            .get(uri)
            .map(|fqns| fqns.iter().filter_map(|f| self.by_fqn.get(f)).collect())
            .unwrap_or_default()
    }

    pub fn document_count(&self, uri: &str) -> usize {
        self.by_uri.get(uri).map(Vec::len).unwrap_or(0)
    }

    pub fn total_symbols(&self) -> usize {
        self.by_fqn.len()
    }

    /// Walk `container`'s inheritance/trait closure in MRO-style order:
    /// the container itself, then each trait in declaration order, then
    /// the parent chain recursively, then each implemented interface
    /// (spec §4.F). Cycles in `extends`/`implements`/`use` are detected by
    /// tracking visited FQNs and terminated rather than looped (spec §9).
    ///
    /// When `member_name` is given the walk stops at the first match
    /// (non-static dispatch semantics); otherwise every matching member is
    /// collected.
    pub fn lookup_members(
        &self,
        container_fqn: &str,
        member_name: Option<&str>,
        kind_mask: KindMask,
        required: ModifierMask,
        forbidden: ModifierMask,
    ) -> Vec<&Symbol> {
        self.assert_not_mutating();
        let mut visited = std::collections::HashSet::new();
        let mut out = Vec::new();
        self.walk_mro(container_fqn, member_name, kind_mask, required, forbidden, &mut visited, &mut out);
        out
    }

    fn walk_mro<'a>(
        &'a self,
        container_fqn: &str,
        member_name: Option<&str>,
        kind_mask: KindMask,
        required: ModifierMask,
        forbidden: ModifierMask,
        visited: &mut std::collections::HashSet<String>,
        out: &mut Vec<&'a Symbol>,
    ) {
        let container_fqn = crate::util::strip_leading_separator(container_fqn);
        if !visited.insert(container_fqn.to_string()) {
            return; // cycle detected — terminate this branch
        }
        let Some(container) = self.by_fqn.get(container_fqn) else { return };

        // 1. the container itself
        for member in &container.children {
            if !kind_mask.matches(member.kind) || !member.modifiers.satisfies(required, forbidden) {
                continue;
            }
            if let Some(name) = member_name {
                if short_name(&member.fqn) != name {
                    continue;
                }
                out.push(member);
                if !required.contains(ModifierMask::STATIC) {
                    return; // first match wins for instance dispatch
                }
            } else {
                out.push(member);
            }
        }

        // 2. traits used, in declaration order (last-wins on name clash is
        // the caller's concern when `member_name` narrows the search, since
        // a later `use` naturally appears later in `implements` here).
        for trait_fqn in &container.implements {
            if let Some(sym) = self.by_fqn.get(crate::util::strip_leading_separator(trait_fqn)) {
                if sym.kind == SymbolKind::Trait {
                    self.walk_mro(trait_fqn, member_name, kind_mask, required, forbidden, visited, out);
                    if member_name.is_some() && !out.is_empty() && !required.contains(ModifierMask::STATIC) {
                        return;
                    }
                }
            }
        }

        // 3. parent chain, recursively
        if let Some(parent) = &container.parent {
            self.walk_mro(parent, member_name, kind_mask, required, forbidden, visited, out);
            if member_name.is_some() && !out.is_empty() && !required.contains(ModifierMask::STATIC) {
                return;
            }
        }

        // 4. implemented interfaces
        for iface_fqn in &container.implements {
            if let Some(sym) = self.by_fqn.get(crate::util::strip_leading_separator(iface_fqn)) {
                if sym.kind == SymbolKind::Interface {
                    self.walk_mro(iface_fqn, member_name, kind_mask, required, forbidden, visited, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cst::Span;

    fn method(name: &str, ty: &str, modifiers: ModifierMask, uri: &str) -> Symbol {
        Symbol {
            kind: SymbolKind::Method,
            fqn: format!("#{}", name),
            modifiers,
            type_expr: crate::symbol::TypeSet::single(ty),
            documentation: None,
            uri: uri.to_string(),
            span: Span::default(),
            children: Vec::new(),
            parent: None,
            implements: Vec::new(),
        }
    }

    fn class(fqn: &str, parent: Option<&str>, children: Vec<Symbol>, uri: &str) -> Symbol {
        Symbol {
            kind: SymbolKind::Class,
            fqn: fqn.to_string(),
            modifiers: ModifierMask::NONE,
            type_expr: crate::symbol::TypeSet::empty(),
            documentation: None,
            uri: uri.to_string(),
            span: Span::default(),
            children,
            parent: parent.map(str::to_string),
            implements: Vec::new(),
        }
    }

    #[test]
    fn inherited_method_lookup() {
        let mut store = SymbolStore::new();
        store.add(class(
            "A",
            None,
            vec![method("m", "int", ModifierMask::PUBLIC, "a.php")],
            "a.php",
        ));
        store.add(class("B", Some("A"), vec![], "b.php"));

        let results = store.lookup_members("B", Some("m"), KindMask::of(&[SymbolKind::Method]), ModifierMask::PUBLIC, ModifierMask::STATIC);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].uri, "a.php");
        assert_eq!(results[0].type_expr.to_string(), "int");
    }

    #[test]
    fn removal_is_complete() {
        let mut store = SymbolStore::new();
        store.add(class("A", None, vec![method("m", "int", ModifierMask::PUBLIC, "a.php")], "a.php"));
        assert_eq!(store.remove("a.php"), 1);
        assert!(store.find("A", KindMask::ALL).is_none());
        assert!(store.match_prefix("A", KindMask::ALL).is_empty());
    }

    #[test]
    fn removal_purges_nested_member_name_index_entries_too() {
        // Re-discovering the same file repeatedly (what `edit_document`
        // does on every keystroke) must not leave a growing number of
        // stale `name_index` entries behind for a class's own methods.
        let mut store = SymbolStore::new();
        for _ in 0..3 {
            store.add(class("A", None, vec![method("m", "int", ModifierMask::PUBLIC, "a.php")], "a.php"));
            store.remove("a.php");
        }
        assert_eq!(store.name_index.entries.len(), 0);
    }

    #[test]
    fn prefix_match_ranks_by_length_then_lex() {
        let mut store = SymbolStore::new();
        store.add(class("Foo", None, vec![], "a.php"));
        store.add(class("FooBar", None, vec![], "a.php"));
        store.add(class("Baz", None, vec![], "a.php"));
        let results = store.match_prefix("Fo", KindMask::ALL);
        let fqns: Vec<&str> = results.iter().map(|s| s.fqn.as_str()).collect();
        assert_eq!(fqns, vec!["Foo", "FooBar"]);
    }

    #[test]
    fn cyclic_inheritance_terminates() {
        let mut store = SymbolStore::new();
        store.add(class("A", Some("B"), vec![], "a.php"));
        store.add(class("B", Some("A"), vec![], "b.php"));
        let results = store.lookup_members("A", Some("missing"), KindMask::ALL, ModifierMask::NONE, ModifierMask::NONE);
        assert!(results.is_empty());
    }
}
