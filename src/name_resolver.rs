//! Component E: PHP namespace + `use`-alias name resolution (spec §4.E).
//!
//! The resolver never consults the symbol store itself — callers perform
//! the function/constant global-namespace fallback spec §4.E assigns them.

use crate::cst::UseKind;
use crate::util::{join_namespace, strip_leading_separator};

#[derive(Debug, Clone)]
pub struct UseImport {
    pub kind: UseKind,
    pub fqn: String,
    pub alias: String,
}

#[derive(Debug, Clone, Default)]
struct ClassContextFrame {
    class_fqn: String,
    parent_fqn: Option<String>,
}

/// Current namespace, `use` imports, and the class-context stack (spec §3
/// "NameResolver state").
#[derive(Debug, Default)]
pub struct NameResolver {
    namespace: String,
    uses: Vec<UseImport>,
    class_stack: Vec<ClassContextFrame>,
}

impl NameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_namespace(&mut self, namespace: impl Into<String>) {
        self.namespace = namespace.into();
        self.uses.clear();
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn add_use(&mut self, kind: UseKind, fqn: impl Into<String>, alias: impl Into<String>) {
        self.uses.push(UseImport { kind, fqn: strip_leading_separator(&fqn.into()).to_string(), alias: alias.into() });
    }

    pub fn push_class_context(&mut self, class_fqn: impl Into<String>, parent_fqn: Option<String>) {
        self.class_stack.push(ClassContextFrame { class_fqn: class_fqn.into(), parent_fqn });
    }

    pub fn pop_class_context(&mut self) {
        self.class_stack.pop();
    }

    /// The innermost class context's FQN, or empty outside any class.
    pub fn class_name(&self) -> String {
        self.class_stack.last().map(|f| f.class_fqn.clone()).unwrap_or_default()
    }

    /// The short (unqualified) name of the current class context.
    pub fn class_base_name(&self) -> String {
        crate::util::short_name(&self.class_name()).to_string()
    }

    pub fn parent_class_name(&self) -> Option<String> {
        self.class_stack.last().and_then(|f| f.parent_fqn.clone())
    }

    /// For an unqualified name, the resolved FQN assuming it is NOT found
    /// as an import or declared symbol — i.e. a fresh declaration (spec
    /// §4.E `resolveNotFoundClassName`).
    pub fn resolve_not_found_class_name(&self, text: &str) -> String {
        join_namespace(&self.namespace, text)
    }

    /// Strip a leading `namespace\` and prepend the current namespace.
    pub fn resolve_relative_name(&self, text: &str) -> String {
        let rest = text
            .strip_prefix("namespace\\")
            .or_else(|| text.strip_prefix("Namespace\\"))
            .unwrap_or(text);
        join_namespace(&self.namespace, rest)
    }

    /// Resolve a possibly-aliased name against the `use` list filtered by
    /// `kind`. Fully-qualified names (leading `\`) are returned as-is
    /// (normalized without the leading separator).
    pub fn resolve_qualified_name(&self, text: &str, kind: UseKind) -> String {
        if let Some(fqn) = text.strip_prefix('\\') {
            return fqn.to_string();
        }
        if let Some(rest) = text.strip_prefix("namespace\\").or_else(|| text.strip_prefix("Namespace\\")) {
            return join_namespace(&self.namespace, rest);
        }

        let mut segments = text.splitn(2, '\\');
        let first = segments.next().unwrap_or("");
        let remainder = segments.next();

        if let Some(import) = self.uses.iter().find(|u| u.kind == kind && u.alias.eq_ignore_ascii_case(first)) {
            return match remainder {
                Some(rest) => format!("{}\\{}", import.fqn, rest),
                None => import.fqn.clone(),
            };
        }

        join_namespace(&self.namespace, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_through_use_alias() {
        let mut nr = NameResolver::new();
        nr.set_namespace("Y");
        nr.add_use(UseKind::Class, "X\\A", "A");
        assert_eq!(nr.resolve_qualified_name("A", UseKind::Class), "X\\A");
    }

    #[test]
    fn nested_member_through_use_alias() {
        let mut nr = NameResolver::new();
        nr.set_namespace("Y");
        nr.add_use(UseKind::Class, "X\\A", "A");
        assert_eq!(nr.resolve_qualified_name("A\\B", UseKind::Class), "X\\A\\B");
    }

    #[test]
    fn unqualified_name_without_import_uses_current_namespace() {
        let mut nr = NameResolver::new();
        nr.set_namespace("App");
        assert_eq!(nr.resolve_qualified_name("Widget", UseKind::Class), "App\\Widget");
    }

    #[test]
    fn fully_qualified_name_passes_through() {
        let nr = NameResolver::new();
        assert_eq!(nr.resolve_qualified_name("\\PDO", UseKind::Class), "PDO");
    }

    #[test]
    fn class_context_stack_tracks_self_and_parent() {
        let mut nr = NameResolver::new();
        nr.push_class_context("App\\User", Some("App\\Model".to_string()));
        assert_eq!(nr.class_name(), "App\\User");
        assert_eq!(nr.parent_class_name(), Some("App\\Model".to_string()));
        nr.pop_class_context();
        assert_eq!(nr.class_name(), "");
    }
}
