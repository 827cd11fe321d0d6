//! Component G: the scoped, branch-aware variable-to-type table (spec §4.G).

use std::collections::HashMap;

use crate::symbol::TypeSet;

type Branch = HashMap<String, TypeSet>;

struct Scope {
    branches: Vec<Branch>,
}

impl Scope {
    fn new() -> Self {
        Scope { branches: vec![Branch::new()] }
    }

    fn active(&mut self) -> &mut Branch {
        self.branches.last_mut().expect("scope always has an active branch")
    }

    fn active_ref(&self) -> &Branch {
        self.branches.last().expect("scope always has an active branch")
    }
}

/// A stack of scopes, each holding a stack of branch sets, per spec §3
/// "VariableTable". Reads never fail: an unbound name yields the
/// empty-atom-set type string (spec §4.G).
pub struct VariableTable {
    scopes: Vec<Scope>,
}

impl Default for VariableTable {
    fn default() -> Self {
        VariableTable { scopes: vec![Scope::new()] }
    }
}

impl VariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn top(&mut self) -> &mut Scope {
        self.scopes.last_mut().expect("scope stack underflow: no active scope")
    }

    /// Union `type_` into the active branch's entry for `name`.
    pub fn set_type(&mut self, name: &str, type_: &TypeSet) {
        let entry = self.top().active().entry(name.to_string()).or_insert_with(TypeSet::empty);
        entry.union(type_);
    }

    /// `setType` for each name, e.g. list destructuring of a single RHS.
    pub fn set_type_many(&mut self, names: &[String], type_: &TypeSet) {
        for name in names {
            self.set_type(name, type_);
        }
    }

    /// Push a fresh scope. Names in `carry` have their *current* resolved
    /// type copied into the new scope's initial branch (closure `use`
    /// clauses, `$this` carried into a method body).
    pub fn push_scope(&mut self, carry: &[&str]) {
        let carried: Vec<(String, TypeSet)> = carry
            .iter()
            .map(|name| (name.to_string(), self.get_type(name, None)))
            .collect();
        let mut scope = Scope::new();
        for (name, ty) in carried {
            if !ty.is_empty() {
                scope.active().insert(name, ty);
            }
        }
        self.scopes.push(scope);
    }

    pub fn pop_scope(&mut self) {
        if self.scopes.len() <= 1 {
            // InternalInvariantViolation per spec §7: never underflow past
            // the outermost scope. We clamp rather than panic so a single
            // malformed document can't take down the whole service.
            return;
        }
        self.scopes.pop();
    }

    /// Push a fresh empty branch onto the active scope (entering an
    /// `if`/`switch` arm).
    pub fn push_branch(&mut self) {
        self.top().branches.push(Branch::new());
    }

    /// Discard the top branch of the active scope.
    pub fn pop_branch(&mut self) {
        let scope = self.top();
        if scope.branches.len() > 1 {
            scope.branches.pop();
        }
    }

    /// Consolidate every branch of the active scope into one, by per-name
    /// union of atom sets — PHP's "after an if/else both arms contribute"
    /// join (spec §4.G, tested by spec §8 "VariableTable join").
    pub fn prune_branches(&mut self) {
        let scope = self.top();
        if scope.branches.len() <= 1 {
            return;
        }
        let mut merged = Branch::new();
        for branch in scope.branches.drain(..) {
            for (name, ty) in branch {
                merged.entry(name).or_insert_with(TypeSet::empty).union(&ty);
            }
        }
        scope.branches.push(merged);
    }

    /// Read from the active branch. `$this`/`static` substitute
    /// `class_name` when given and the bound type names one of those atoms.
    pub fn get_type(&self, name: &str, class_name: Option<&str>) -> TypeSet {
        let scope = self.scopes.last().expect("scope stack underflow: no active scope");
        let raw = scope.active_ref().get(name).cloned().unwrap_or_else(TypeSet::empty);
        if let Some(class) = class_name {
            if name == "$this" || name == "static" {
                return TypeSet::single(class.to_string());
            }
        }
        raw
    }

    pub fn scope_depth(&self) -> usize {
        self.scopes.len()
    }
}
