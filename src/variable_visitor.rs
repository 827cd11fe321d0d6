//! Component I: the variable type visitor (spec §4.I).
//!
//! A single pass over a document's tree that keeps the variable table and
//! name resolver in step with control flow. Name resolution and variable
//! typing are interleaved in one visitor rather than split across a true
//! [`crate::traversal::MultiVisitor`] pair — both need a live, mutable
//! `NameResolver` at the same instant (parameter types depend on the
//! current class context), and `MultiVisitor` can only hand out shared
//! borrows to its members during a shared traversal.
//!
//! Branching constructs (`if`, `switch`, `try`) recurse through
//! [`crate::traversal::traverse`] themselves from inside a single
//! `preorder` call, rather than letting the engine auto-descend, so each
//! arm's statements run inside its own pushed branch before the construct
//! joins.

use crate::cst::{Node, NodeKind, UseKind};
use crate::name_resolver::NameResolver;
use crate::symbol::TypeSet;
use crate::symbol_store::SymbolStore;
use crate::traversal::{self, Visitor};
use crate::type_resolver::{self, ResolveCtx};
use crate::variable_table::VariableTable;

pub struct VariableTypeVisitor<'a> {
    pub names: &'a mut NameResolver,
    pub vars: &'a mut VariableTable,
    pub store: &'a SymbolStore,
    /// When set, traversal halts as soon as it reaches the deepest node
    /// whose span contains this byte offset — the variable table is then
    /// the live state at that point (spec §4.I "Halt-at-offset").
    pub target_offset: Option<u32>,
    halted: bool,
}

impl<'a> VariableTypeVisitor<'a> {
    pub fn new(names: &'a mut NameResolver, vars: &'a mut VariableTable, store: &'a SymbolStore) -> Self {
        VariableTypeVisitor { names, vars, store, target_offset: None, halted: false }
    }

    fn ctx(&self) -> ResolveCtx<'_> {
        ResolveCtx { names: &*self.names, store: self.store, vars: &*self.vars }
    }

    fn resolve(&self, node: &Node) -> TypeSet {
        type_resolver::resolve_expression_type(node, &self.ctx())
    }

    fn bind_parameters(&mut self, params: &Node) {
        for p in &params.children {
            if let NodeKind::Parameter { name, type_hint, doc_type, .. } = &p.kind {
                let ty = type_hint.as_deref().or(doc_type.as_deref()).map(TypeSet::parse).unwrap_or_default();
                if !ty.is_empty() {
                    self.vars.set_type(name, &ty);
                }
            }
        }
    }

    fn apply_instanceof_narrowing(&mut self, cond: &Node) {
        if let NodeKind::InstanceOf { class_name } = &cond.kind {
            if let Some(target) = cond.children.first() {
                if let NodeKind::SimpleVariable { name } = &target.kind {
                    let fqn = type_resolver::resolve_class_designator(class_name, self.names);
                    if !fqn.is_empty() {
                        self.vars.set_type(name, &TypeSet::single(format!("\\{}", fqn)));
                    }
                }
            }
        }
    }

    fn handle_if(&mut self, node: &Node) {
        let cond = &node.children[0];
        let then_body = &node.children[1];
        self.vars.push_branch();
        self.apply_instanceof_narrowing(cond);
        traversal::traverse(then_body, self);
        for clause in &node.children[2..] {
            match &clause.kind {
                NodeKind::ElseIfClause => {
                    let c_cond = &clause.children[0];
                    let c_body = &clause.children[1];
                    self.vars.push_branch();
                    self.apply_instanceof_narrowing(c_cond);
                    traversal::traverse(c_body, self);
                }
                NodeKind::ElseClause => {
                    self.vars.push_branch();
                    traversal::traverse(&clause.children[0], self);
                }
                _ => {}
            }
        }
        self.vars.prune_branches();
    }

    fn handle_switch(&mut self, node: &Node) {
        for case in &node.children[1..] {
            if let NodeKind::CaseClause = case.kind {
                self.vars.push_branch();
                for stmt in &case.children {
                    traversal::traverse(stmt, self);
                }
            }
        }
        self.vars.prune_branches();
    }

    fn handle_try(&mut self, node: &Node) {
        self.vars.push_branch();
        traversal::traverse(&node.children[0], self);
        let mut finally_body = None;
        for clause in &node.children[1..] {
            match &clause.kind {
                NodeKind::CatchClause { types, variable } => {
                    self.vars.push_branch();
                    if let Some(var) = variable {
                        let mut union = TypeSet::empty();
                        for ty in types {
                            let fqn = self.names.resolve_qualified_name(ty, UseKind::Class);
                            union.insert(format!("\\{}", fqn));
                        }
                        self.vars.set_type(var, &union);
                    }
                    traversal::traverse(&clause.children[0], self);
                }
                NodeKind::Block => finally_body = Some(clause),
                _ => {}
            }
        }
        self.vars.prune_branches();
        if let Some(finally) = finally_body {
            traversal::traverse(finally, self);
        }
    }

    fn handle_foreach(&mut self, node: &Node, key_var: &Option<String>, value_var: &Option<String>) {
        let iterable_type = self.resolve(&node.children[0]);
        let element = iterable_type.is_array_of().unwrap_or_else(TypeSet::empty);
        if let Some(v) = value_var {
            self.vars.set_type(v, &element);
        }
        if let Some(k) = key_var {
            self.vars.set_type(k, &TypeSet::parse("int|string"));
        }
        traversal::traverse(&node.children[1], self);
    }
}

impl<'a> Visitor<Node> for VariableTypeVisitor<'a> {
    fn preorder(&mut self, node: &Node, _spine: &[&Node]) -> bool {
        match &node.kind {
            NodeKind::NamespaceDefinition { name } => {
                self.names.set_namespace(name.clone().unwrap_or_default());
            }

            NodeKind::NamespaceUseClause { kind, fqn, alias } => {
                let alias = alias.clone().unwrap_or_else(|| crate::util::short_name(fqn).to_string());
                self.names.add_use(*kind, fqn.clone(), alias);
            }

            NodeKind::ClassLike { name, extends, .. } => {
                let fqn = self.names.resolve_not_found_class_name(name);
                let parent = extends.first().map(|e| self.names.resolve_qualified_name(e, UseKind::Class));
                self.names.push_class_context(fqn.clone(), parent);
                self.vars.push_scope(&[]);
                self.vars.set_type("$this", &TypeSet::single(format!("\\{}", fqn)));
            }

            NodeKind::MethodDeclaration { modifiers, .. } => {
                let carry: Vec<&str> = if modifiers.contains(crate::symbol::ModifierMask::STATIC) { vec![] } else { vec!["$this"] };
                self.vars.push_scope(&carry);
                if let Some(params) = node.children.first() {
                    self.bind_parameters(params);
                }
            }

            NodeKind::FunctionDeclaration { .. } => {
                self.vars.push_scope(&[]);
                if let Some(params) = node.children.first() {
                    self.bind_parameters(params);
                }
            }

            NodeKind::AnonymousFunction { uses } => {
                let carry: Vec<&str> = uses.iter().map(String::as_str).collect();
                self.vars.push_scope(&carry);
                if let Some(params) = node.children.first() {
                    self.bind_parameters(params);
                }
            }

            NodeKind::Assignment => {
                if let [lhs, rhs] = node.children.as_slice() {
                    let ty = self.resolve(rhs);
                    if let NodeKind::SimpleVariable { name } = &lhs.kind {
                        self.vars.set_type(name, &ty);
                    }
                }
                return false;
            }

            NodeKind::ListAssignment { targets } => {
                if let Some(rhs) = node.children.first() {
                    let rhs_type = self.resolve(rhs);
                    let element = rhs_type.is_array_of().unwrap_or_else(|| TypeSet::single("mixed"));
                    self.vars.set_type_many(targets, &element);
                }
                return false;
            }

            NodeKind::IfStatement => {
                self.handle_if(node);
                return false;
            }

            NodeKind::SwitchStatement => {
                self.handle_switch(node);
                return false;
            }

            NodeKind::TryStatement => {
                self.handle_try(node);
                return false;
            }

            NodeKind::ForeachStatement { key_var, value_var } => {
                self.handle_foreach(node, key_var, value_var);
                return false;
            }

            // A `@var` tag on the statement's doc comment overrides the
            // assignment's own inferred type (spec §8 "Foreach element").
            // Bind it directly and skip descent — we've already applied
            // the binding this node exists to produce.
            NodeKind::ExpressionStatement { doc_var_type: Some(doc_type) } => {
                if let Some(Node { kind: NodeKind::Assignment, children, .. }) = node.children.first() {
                    if let Some(NodeKind::SimpleVariable { name }) = children.first().map(|c| &c.kind) {
                        self.vars.set_type(name, &TypeSet::parse(doc_type));
                        return false;
                    }
                }
            }

            // `ExpressionStatement`/`ReturnStatement` otherwise carry their
            // expression as a direct child (e.g. an `Assignment`) that
            // still needs visiting to apply its binding — fall through to
            // the default descend-and-check-offset behavior below.
            _ => {}
        }

        if let Some(offset) = self.target_offset {
            let is_deepest = node.span.contains(offset) && !node.children().iter().any(|c| c.span.contains(offset));
            if is_deepest {
                self.halted = true;
            }
        }
        true
    }

    fn postorder(&mut self, node: &Node, _spine: &[&Node]) {
        match &node.kind {
            NodeKind::ClassLike { .. } => {
                self.vars.pop_scope();
                self.names.pop_class_context();
            }
            NodeKind::MethodDeclaration { .. } | NodeKind::FunctionDeclaration { .. } | NodeKind::AnonymousFunction { .. } => {
                self.vars.pop_scope();
            }
            _ => {}
        }
    }

    fn halt(&self) -> bool {
        self.halted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cst;
    use crate::symbol_store::SymbolStore;

    fn run(src: &str) -> (NameResolver, VariableTable) {
        let tree = cst::parse(src);
        let mut names = NameResolver::new();
        let mut vars = VariableTable::new();
        let store = SymbolStore::new();
        {
            let mut visitor = VariableTypeVisitor::new(&mut names, &mut vars, &store);
            traversal::traverse(&tree.root, &mut visitor);
        }
        (names, vars)
    }

    #[test]
    fn assignment_binds_literal_type() {
        let (_, vars) = run("<?php $x = 1;");
        assert_eq!(vars.get_type("$x", None).to_string(), "int");
    }

    #[test]
    fn if_else_join_unions_branch_types() {
        let (_, vars) = run("<?php if ($c) { $x = 1; } else { $x = 'a'; }");
        let ty = vars.get_type("$x", None);
        assert_eq!(ty.atoms(), &["int".to_string(), "string".to_string()]);
    }

    #[test]
    fn catch_clause_binds_union_of_types() {
        let (_, vars) = run("<?php try { } catch (FooError|BarError $e) { }");
        let ty = vars.get_type("$e", None);
        assert_eq!(ty.atoms(), &["\\FooError".to_string(), "\\BarError".to_string()]);
    }

    #[test]
    fn foreach_binds_value_to_doc_annotated_array_element_type() {
        let (_, vars) = run("<?php /** @var int[] $xs */ $xs = []; foreach ($xs as $v) { }");
        assert_eq!(vars.get_type("$v", None).to_string(), "int");
    }

    #[test]
    fn list_assignment_falls_back_to_mixed_for_unknown_element_type() {
        let (_, vars) = run("<?php list($a, $b) = $xs;");
        assert_eq!(vars.get_type("$a", None), TypeSet::single("mixed"));
        assert_eq!(vars.get_type("$b", None), TypeSet::single("mixed"));
    }
}
