//! The symbol data model (spec §3): declared PHP identifiers, modifier
//! bitsets, and the `|`-separated type-string representation used
//! everywhere in the resolver.

use std::fmt;

/// The kind of a declared PHP identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Namespace,
    Class,
    Interface,
    Trait,
    Constant,
    Function,
    Method,
    Property,
    ClassConstant,
    Parameter,
    Variable,
}

/// A bitset over PHP access/storage modifiers.
///
/// Kept as a hand-rolled `u16` newtype rather than pulling in `bitflags` —
/// the set of flags is small and fixed, and plain `const`s read just as
/// clearly at the call sites that build and query masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct ModifierMask(pub u16);

impl ModifierMask {
    pub const NONE: ModifierMask = ModifierMask(0);
    pub const PUBLIC: ModifierMask = ModifierMask(1 << 0);
    pub const PROTECTED: ModifierMask = ModifierMask(1 << 1);
    pub const PRIVATE: ModifierMask = ModifierMask(1 << 2);
    pub const STATIC: ModifierMask = ModifierMask(1 << 3);
    pub const ABSTRACT: ModifierMask = ModifierMask(1 << 4);
    pub const FINAL: ModifierMask = ModifierMask(1 << 5);
    pub const MAGIC: ModifierMask = ModifierMask(1 << 6);
    pub const READONLY: ModifierMask = ModifierMask(1 << 7);

    pub fn contains(self, other: ModifierMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: ModifierMask) -> bool {
        other.0 == 0 || (self.0 & other.0) != 0
    }

    pub fn with(self, other: ModifierMask) -> ModifierMask {
        ModifierMask(self.0 | other.0)
    }

    /// `required` must all be present, none of `forbidden` may be present.
    pub fn satisfies(self, required: ModifierMask, forbidden: ModifierMask) -> bool {
        self.contains(required) && self.0 & forbidden.0 == 0
    }
}

impl std::ops::BitOr for ModifierMask {
    type Output = ModifierMask;
    fn bitor(self, rhs: ModifierMask) -> ModifierMask {
        self.with(rhs)
    }
}

/// A `|`-separated set of type atoms (spec §3 "Type string").
///
/// Atoms are deduplicated; order is insertion order, never re-sorted — the
/// spec is explicit that callers must not depend on canonical ordering, but
/// nothing forbids depending on stability, so a `BTreeSet` (which would
/// reorder alphabetically) is the wrong tool here.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TypeSet(Vec<String>);

impl TypeSet {
    pub fn empty() -> Self {
        TypeSet(Vec::new())
    }

    pub fn single(atom: impl Into<String>) -> Self {
        let mut t = TypeSet::empty();
        t.insert(atom.into());
        t
    }

    /// Parse a `|`-separated type string into an atom set.
    pub fn parse(s: &str) -> Self {
        let mut t = TypeSet::empty();
        for atom in s.split('|') {
            let atom = atom.trim();
            if !atom.is_empty() {
                t.insert(atom.to_string());
            }
        }
        t
    }

    pub fn insert(&mut self, atom: String) {
        if !self.0.iter().any(|a| a == &atom) {
            self.0.push(atom);
        }
    }

    pub fn union(&mut self, other: &TypeSet) {
        for atom in &other.0 {
            self.insert(atom.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn atoms(&self) -> &[String] {
        &self.0
    }

    /// True when every atom ends in `[]`.
    pub fn is_array_of(&self) -> Option<TypeSet> {
        if self.0.is_empty() {
            return None;
        }
        let mut elems = TypeSet::empty();
        for atom in &self.0 {
            let stripped = atom.strip_suffix("[]")?;
            elems.insert(stripped.to_string());
        }
        Some(elems)
    }

    pub fn array_of(inner: &TypeSet) -> TypeSet {
        let mut out = TypeSet::empty();
        if inner.is_empty() {
            out.insert("mixed[]".to_string());
        }
        for atom in inner.atoms() {
            out.insert(format!("{}[]", atom));
        }
        out
    }
}

impl fmt::Display for TypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("|"))
    }
}

impl From<TypeSet> for String {
    fn from(t: TypeSet) -> String {
        t.to_string()
    }
}

/// A declared PHP identifier (spec §3 "Symbol").
#[derive(Debug, Clone)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub fqn: String,
    pub modifiers: ModifierMask,
    pub type_expr: TypeSet,
    pub documentation: Option<String>,
    pub uri: String,
    pub span: crate::cst::Span,
    pub children: Vec<Symbol>,
    /// For class-like symbols: the parent class FQN.
    pub parent: Option<String>,
    /// For class-like symbols: implemented interface / used trait FQNs.
    pub implements: Vec<String>,
}

impl Symbol {
    pub fn short_name(&self) -> &str {
        crate::util::short_name(&self.fqn)
    }

    pub fn is_class_like(&self) -> bool {
        matches!(
            self.kind,
            SymbolKind::Class | SymbolKind::Interface | SymbolKind::Trait
        )
    }
}
