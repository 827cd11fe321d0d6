//! Symbol extraction: walks a parsed document's tree and builds the
//! [`Symbol`] trees the symbol store indexes (spec §6 "index symbols" on
//! `openDocument`/`discover`).
//!
//! This is tree-shaped, not linear, so it's a direct recursive walk rather
//! than a [`crate::traversal::Visitor`] — the same reasoning the variable
//! type visitor documents for branch constructs applies here to class
//! bodies nested inside namespace blocks.

use crate::cst::{ClassLikeKind, Node, NodeKind, UseKind};
use crate::name_resolver::NameResolver;
use crate::symbol::{ModifierMask, Symbol, SymbolKind, TypeSet};

/// Extract every top-level declaration in `root` into a flat list of root
/// symbols (classes/interfaces/traits, free functions, global constants),
/// each carrying their FQN resolved against the document's own namespace
/// and `use` declarations.
pub fn extract_symbols(root: &Node, uri: &str) -> Vec<Symbol> {
    let mut names = NameResolver::new();
    let mut out = Vec::new();
    walk_program(root, &mut names, uri, &mut out);
    out
}

fn walk_program(node: &Node, names: &mut NameResolver, uri: &str, out: &mut Vec<Symbol>) {
    for child in &node.children {
        match &child.kind {
            NodeKind::NamespaceDefinition { name } => {
                names.set_namespace(name.clone().unwrap_or_default());
                walk_program(child, names, uri, out);
            }
            NodeKind::Block => walk_program(child, names, uri, out),
            NodeKind::NamespaceUseDeclaration => {
                for use_clause in &child.children {
                    if let NodeKind::NamespaceUseClause { kind, fqn, alias } = &use_clause.kind {
                        let alias = alias.clone().unwrap_or_else(|| crate::util::short_name(fqn).to_string());
                        names.add_use(*kind, fqn.clone(), alias);
                    }
                }
            }
            NodeKind::ClassLike { kind, name, extends, implements } => {
                out.push(extract_class_like(child, *kind, name, extends, implements, names, uri));
            }
            NodeKind::FunctionDeclaration { name, return_type, doc_return_type } => {
                out.push(extract_function(name, return_type, doc_return_type, child.span, names, uri));
            }
            NodeKind::ConstDeclaration { name, type_hint } => {
                out.push(Symbol {
                    kind: SymbolKind::Constant,
                    fqn: names.resolve_not_found_class_name(name),
                    modifiers: ModifierMask::NONE,
                    type_expr: type_hint.as_deref().map(TypeSet::parse).unwrap_or_default(),
                    documentation: None,
                    uri: uri.to_string(),
                    span: child.span,
                    children: Vec::new(),
                    parent: None,
                    implements: Vec::new(),
                });
            }
            _ => {}
        }
    }
}

fn extract_class_like(
    node: &Node,
    kind: ClassLikeKind,
    name: &str,
    extends: &[String],
    implements: &[String],
    names: &mut NameResolver,
    uri: &str,
) -> Symbol {
    let fqn = names.resolve_not_found_class_name(name);
    let parent = extends.first().map(|e| names.resolve_qualified_name(e, UseKind::Class));
    let mut all_implements: Vec<String> = implements.iter().map(|i| names.resolve_qualified_name(i, UseKind::Class)).collect();

    names.push_class_context(fqn.clone(), parent.clone());
    let mut children = Vec::new();
    if let Some(body) = node.children.first() {
        extract_class_body(body, names, uri, &mut all_implements, &mut children);
    }
    names.pop_class_context();

    Symbol {
        kind: match kind {
            ClassLikeKind::Class | ClassLikeKind::Enum => SymbolKind::Class,
            ClassLikeKind::Interface => SymbolKind::Interface,
            ClassLikeKind::Trait => SymbolKind::Trait,
        },
        fqn,
        modifiers: ModifierMask::NONE,
        type_expr: TypeSet::empty(),
        documentation: None,
        uri: uri.to_string(),
        span: node.span,
        children,
        parent,
        implements: all_implements,
    }
}

/// Recurse through `body`'s members, flattening the nested `ClassBody` the
/// parser emits for multi-name `const`/property declarations (`public
/// $a, $b;`). `implements` accumulates trait names used via `use T;`
/// clauses, since the inheritance walk (spec §4.F) treats them uniformly
/// with interfaces.
fn extract_class_body(
    body: &Node,
    names: &NameResolver,
    uri: &str,
    implements: &mut Vec<String>,
    out: &mut Vec<Symbol>,
) {
    for member in &body.children {
        match &member.kind {
            NodeKind::ClassBody => extract_class_body(member, names, uri, implements, out),

            NodeKind::TraitUseClause { names: trait_names } => {
                for t in trait_names {
                    implements.push(names.resolve_qualified_name(t, UseKind::Class));
                }
            }

            NodeKind::MethodDeclaration { name, modifiers, return_type, doc_return_type } => {
                let type_expr = return_type.as_deref().or(doc_return_type.as_deref()).map(TypeSet::parse).unwrap_or_default();
                out.push(Symbol {
                    kind: SymbolKind::Method,
                    fqn: format!("{}::{}", names.class_name(), name),
                    modifiers: *modifiers,
                    type_expr,
                    documentation: None,
                    uri: uri.to_string(),
                    span: member.span,
                    children: Vec::new(),
                    parent: None,
                    implements: Vec::new(),
                });
            }

            NodeKind::PropertyDeclaration { name, modifiers, type_hint } => {
                out.push(Symbol {
                    kind: SymbolKind::Property,
                    fqn: format!("{}::{}", names.class_name(), name.trim_start_matches('$')),
                    modifiers: *modifiers,
                    type_expr: type_hint.as_deref().map(TypeSet::parse).unwrap_or_default(),
                    documentation: None,
                    uri: uri.to_string(),
                    span: member.span,
                    children: Vec::new(),
                    parent: None,
                    implements: Vec::new(),
                });
            }

            NodeKind::ConstDeclaration { name, type_hint } => {
                out.push(Symbol {
                    kind: SymbolKind::ClassConstant,
                    fqn: format!("{}::{}", names.class_name(), name),
                    modifiers: ModifierMask::STATIC.with(ModifierMask::PUBLIC),
                    type_expr: type_hint.as_deref().map(TypeSet::parse).unwrap_or_default(),
                    documentation: None,
                    uri: uri.to_string(),
                    span: member.span,
                    children: Vec::new(),
                    parent: None,
                    implements: Vec::new(),
                });
            }

            _ => {}
        }
    }
}

fn extract_function(
    name: &str,
    return_type: &Option<String>,
    doc_return_type: &Option<String>,
    span: crate::cst::Span,
    names: &NameResolver,
    uri: &str,
) -> Symbol {
    let type_expr = return_type.as_deref().or(doc_return_type.as_deref()).map(TypeSet::parse).unwrap_or_default();
    Symbol {
        kind: SymbolKind::Function,
        fqn: names.resolve_not_found_class_name(name),
        modifiers: ModifierMask::NONE,
        type_expr,
        documentation: None,
        uri: uri.to_string(),
        span,
        children: Vec::new(),
        parent: None,
        implements: Vec::new(),
    }
}
