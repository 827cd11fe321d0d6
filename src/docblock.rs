//! PHPDoc tag extraction.
//!
//! A small, line-oriented scanner over `/** ... */` comment text. It does
//! not attempt to parse the full phpDocumentor type grammar (generics,
//! shapes, conditional types) — just the `@var`/`@param`/`@return` type
//! atom a declaration needs when no native PHP type hint is present,
//! mirroring the teacher's `docblock.rs` / `docblock/types.rs` split
//! between "tag scanning" and "type-string parsing" without the generics
//! support this crate's scope doesn't need.

/// Extract the type from a `@var`/`@return` style tag: `@tag Type description...`.
pub fn extract_tag_type(doc: Option<&str>, tag: &str) -> Option<String> {
    let doc = doc?;
    let needle = format!("@{}", tag);
    for line in doc.lines() {
        let line = line.trim().trim_start_matches('*').trim();
        if let Some(rest) = line.strip_prefix(&needle) {
            let rest = rest.trim();
            let ty = rest.split_whitespace().next();
            return ty.map(normalize_doc_type);
        }
    }
    None
}

/// Extract the type for a specific `@param Type $name` tag.
pub fn extract_param_tag(doc: Option<&str>, param_name: &str) -> Option<String> {
    let doc = doc?;
    if param_name.is_empty() {
        return None;
    }
    for line in doc.lines() {
        let line = line.trim().trim_start_matches('*').trim();
        if let Some(rest) = line.strip_prefix("@param") {
            let mut parts = rest.trim().split_whitespace();
            let ty = parts.next()?;
            let name = parts.next().unwrap_or("");
            if name == param_name {
                return Some(normalize_doc_type(ty));
            }
        }
    }
    None
}

/// Normalize phpDoc type syntax (`int[]`, `?int`, `array<int>`) into the
/// type-string atom grammar this crate's resolver consumes.
fn normalize_doc_type(ty: &str) -> String {
    // phpDocumentor generic array syntax `array<T>` → our `T[]`.
    if let Some(inner) = ty.strip_prefix("array<").and_then(|s| s.strip_suffix('>')) {
        return format!("{}[]", inner);
    }
    ty.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn var_tag_extracts_array_type() {
        let doc = "/**\n * @var int[] $xs\n */";
        assert_eq!(extract_tag_type(Some(doc), "var"), Some("int[]".to_string()));
    }

    #[test]
    fn return_tag_extracts_type() {
        let doc = "/** @return string */";
        assert_eq!(extract_tag_type(Some(doc), "return"), Some("string".to_string()));
    }

    #[test]
    fn param_tag_matches_by_name() {
        let doc = "/**\n * @param int $a\n * @param string $b\n */";
        assert_eq!(extract_param_tag(Some(doc), "$b"), Some("string".to_string()));
        assert_eq!(extract_param_tag(Some(doc), "$missing"), None);
    }

    #[test]
    fn generic_array_syntax_normalizes() {
        assert_eq!(normalize_doc_type("array<int>"), "int[]");
    }
}
