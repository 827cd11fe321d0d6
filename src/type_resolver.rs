//! Component H: the expression type resolver (spec §4.H).
//!
//! A pure function from expression node to type string, given the ambient
//! name resolver, symbol store, and variable table. It is a tagged-union
//! match over [`crate::cst::NodeKind`] (spec §9 "Dynamic dispatch over AST
//! nodes" — reimplemented here as exhaustive matching rather than a
//! runtime node-kind tag).

use crate::cst::{LiteralKind, Node, NodeKind, UseKind};
use crate::name_resolver::NameResolver;
use crate::symbol::{ModifierMask, SymbolKind, TypeSet};
use crate::symbol_store::{KindMask, SymbolStore};
use crate::variable_table::VariableTable;

pub struct ResolveCtx<'a> {
    pub names: &'a NameResolver,
    pub store: &'a SymbolStore,
    pub vars: &'a VariableTable,
}

/// Resolve the type of `node`, per the dispatch table in spec §4.H.
pub fn resolve_expression_type(node: &Node, ctx: &ResolveCtx) -> TypeSet {
    match &node.kind {
        NodeKind::Literal { kind, .. } => literal_type(*kind),

        NodeKind::SimpleVariable { name } => {
            if name == "$this" {
                let class = ctx.names.class_name();
                if class.is_empty() { TypeSet::empty() } else { TypeSet::single(format!("\\{}", class)) }
            } else {
                ctx.vars.get_type(name, non_empty(ctx.names.class_name()).as_deref())
            }
        }

        NodeKind::ObjectCreation { class_name } => {
            let fqn = resolve_class_designator(class_name, ctx.names);
            if fqn.is_empty() { TypeSet::empty() } else { TypeSet::single(format!("\\{}", fqn)) }
        }

        NodeKind::ScopedConstantAccess { name } => {
            let container = node.children.first();
            let class_fqn = container.and_then(|c| designator_of(c)).map(|d| resolve_class_designator(&d, ctx.names));
            let Some(class_fqn) = class_fqn else { return TypeSet::empty() };
            let members = ctx.store.lookup_members(
                &class_fqn,
                Some(name),
                KindMask::of(&[SymbolKind::ClassConstant]),
                ModifierMask::STATIC,
                ModifierMask::NONE,
            );
            substitute_self_static(merge_types(&members.into_iter().cloned().collect::<Vec<_>>()), &class_fqn)
        }

        NodeKind::ScopedPropertyAccess { name } => {
            let container = node.children.first();
            let class_fqn = container.and_then(|c| designator_of(c)).map(|d| resolve_class_designator(&d, ctx.names));
            let Some(class_fqn) = class_fqn else { return TypeSet::empty() };
            let members = ctx.store.lookup_members(
                &class_fqn,
                Some(name.trim_start_matches('$')),
                KindMask::of(&[SymbolKind::Property]),
                ModifierMask::STATIC,
                ModifierMask::NONE,
            );
            substitute_self_static(merge_types(&members.into_iter().cloned().collect::<Vec<_>>()), &class_fqn)
        }

        NodeKind::PropertyAccess { name } => {
            let Some(base) = node.children.first() else { return TypeSet::empty() };
            let base_type = resolve_expression_type(base, ctx);
            let mut result = TypeSet::empty();
            for atom in base_type.atoms() {
                let class_fqn = atom.trim_start_matches('\\');
                let members = ctx.store.lookup_members(
                    class_fqn,
                    Some(name),
                    KindMask::of(&[SymbolKind::Property]),
                    ModifierMask::NONE,
                    ModifierMask::STATIC,
                );
                result.union(&substitute_self_static(merge_types(&members.into_iter().cloned().collect::<Vec<_>>()), class_fqn));
            }
            result
        }

        NodeKind::MethodCall { name } => {
            let Some(base) = node.children.first() else { return TypeSet::empty() };
            let base_type = resolve_expression_type(base, ctx);
            let mut result = TypeSet::empty();
            for atom in base_type.atoms() {
                let class_fqn = atom.trim_start_matches('\\');
                let members = ctx.store.lookup_members(
                    class_fqn,
                    Some(name),
                    KindMask::of(&[SymbolKind::Method]),
                    ModifierMask::NONE,
                    ModifierMask::NONE,
                );
                result.union(&substitute_self_static(merge_types(&members.into_iter().cloned().collect::<Vec<_>>()), class_fqn));
            }
            result
        }

        NodeKind::ScopedCall { name } => {
            let container = node.children.first();
            let class_fqn = container.and_then(|c| designator_of(c)).map(|d| resolve_class_designator(&d, ctx.names));
            let Some(class_fqn) = class_fqn else { return TypeSet::empty() };
            let members = ctx.store.lookup_members(
                &class_fqn,
                Some(name),
                KindMask::of(&[SymbolKind::Method]),
                ModifierMask::NONE,
                ModifierMask::NONE,
            );
            substitute_self_static(merge_types(&members.into_iter().cloned().collect::<Vec<_>>()), &class_fqn)
        }

        NodeKind::FunctionCall { name } => {
            if let Some(known) = crate::stubs::known_function_return_type(name) {
                return TypeSet::parse(known);
            }
            let fqn = ctx.names.resolve_qualified_name(name, UseKind::Function);
            if let Some(sym) = ctx.store.find(&fqn, KindMask::of(&[SymbolKind::Function])) {
                return sym.type_expr.clone();
            }
            // Function names fall back to the global namespace (spec §4.E).
            if let Some(sym) = ctx.store.find(crate::util::short_name(name), KindMask::of(&[SymbolKind::Function])) {
                return sym.type_expr.clone();
            }
            TypeSet::empty()
        }

        NodeKind::Subscript => {
            let Some(base) = node.children.first() else { return TypeSet::empty() };
            let base_type = resolve_expression_type(base, ctx);
            if let Some(elem) = base_type.is_array_of() {
                return elem;
            }
            if base_type.atoms().iter().any(|a| a == "string") {
                return TypeSet::single("string");
            }
            if base_type.atoms().iter().any(|a| a == "array") {
                return TypeSet::single("mixed");
            }
            TypeSet::empty()
        }

        NodeKind::Ternary { short } => {
            if *short {
                let then_ty = resolve_expression_type(&node.children[0], ctx);
                let else_ty = node.children.get(1).map(|n| resolve_expression_type(n, ctx)).unwrap_or_default();
                let mut out = then_ty;
                out.union(&else_ty);
                out
            } else {
                let then_ty = node.children.get(1).map(|n| resolve_expression_type(n, ctx)).unwrap_or_default();
                let else_ty = node.children.get(2).map(|n| resolve_expression_type(n, ctx)).unwrap_or_default();
                let mut out = then_ty;
                out.union(&else_ty);
                out
            }
        }

        // An assignment expression evaluates to its assigned value, so a
        // chained assignment `$a = $b = 1` types `$a` through `$b`'s rhs.
        NodeKind::Assignment => node.children.get(1).map(|rhs| resolve_expression_type(rhs, ctx)).unwrap_or_default(),

        NodeKind::QualifiedName { text } => TypeSet::single(text.clone()),

        NodeKind::MemberName { text } => TypeSet::single(text.clone()),

        NodeKind::ArrayLiteral => TypeSet::single("array"),

        NodeKind::Paren if node.children.len() == 1 => resolve_expression_type(&node.children[0], ctx),

        _ => TypeSet::empty(),
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

fn literal_type(kind: LiteralKind) -> TypeSet {
    match kind {
        LiteralKind::Int => TypeSet::single("int"),
        LiteralKind::Float => TypeSet::single("float"),
        LiteralKind::String => TypeSet::single("string"),
        LiteralKind::Bool => TypeSet::single("bool"),
        LiteralKind::Null => TypeSet::single("null"),
        LiteralKind::Array => TypeSet::single("array"),
    }
}

/// Extract the textual class designator preceding `::`, if `node` is a
/// name-shaped expression (qualified name or `self`/`static`/`parent`).
fn designator_of(node: &Node) -> Option<String> {
    match &node.kind {
        NodeKind::QualifiedName { text } => Some(text.clone()),
        _ => None,
    }
}

/// Resolve a class-position name, substituting `self`/`static`/`parent`
/// from the current class context (spec §4.H "scoped name `C::` designator").
pub fn resolve_class_designator(text: &str, names: &NameResolver) -> String {
    match text {
        "self" | "Self" => names.class_name(),
        "static" | "Static" => names.class_name(),
        "parent" | "Parent" => names.parent_class_name().unwrap_or_default(),
        _ => names.resolve_qualified_name(text, UseKind::Class),
    }
}

/// Union the declared type strings of a set of symbols, deduplicating atoms.
pub fn merge_types(symbols: &[crate::symbol::Symbol]) -> TypeSet {
    let mut out = TypeSet::empty();
    for sym in symbols {
        out.union(&sym.type_expr);
    }
    out
}

/// Replace `self`/`static`/`$this`-shaped atoms in a resolved member type
/// with the receiver's own FQN, mirroring [`resolve_class_designator`]'s
/// conflation of those same names at the class-designator position. Without
/// this, a fluent method declared `public function self(): static` types
/// every call in a chain as the literal atom `"static"` instead of the
/// receiver's class, and the next `->` in the chain fails to resolve.
fn substitute_self_static(types: TypeSet, class_fqn: &str) -> TypeSet {
    let mut out = TypeSet::empty();
    for atom in types.atoms() {
        match atom.as_str() {
            "self" | "Self" | "static" | "Static" | "$this" => out.insert(format!("\\{}", class_fqn)),
            _ => out.insert(atom.clone()),
        }
    }
    out
}
