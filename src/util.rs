//! Small, shared helpers: LSP position/offset conversion and name
//! shortening. Cross-file resolution lives in [`crate::name_resolver`] and
//! [`crate::symbol_store`]; traversal lives in [`crate::traversal`].

use tower_lsp::lsp_types::Position;

/// Convert an LSP `Position` (line, UTF-16 character) to a byte offset.
///
/// Characters are treated as single-byte, which is sufficient for the vast
/// majority of PHP source. Positions past the end of the file clamp to the
/// content length.
pub fn position_to_byte_offset(content: &str, position: Position) -> u32 {
    let mut offset = 0usize;
    for (line_idx, line) in content.split('\n').enumerate() {
        if line_idx == position.line as usize {
            let char_offset = position.character as usize;
            let byte_col = line
                .char_indices()
                .nth(char_offset)
                .map(|(idx, _)| idx)
                .unwrap_or(line.len());
            return (offset + byte_col) as u32;
        }
        offset += line.len() + 1;
    }
    content.len() as u32
}

/// Convert a byte offset back to an LSP `Position`.
pub fn byte_offset_to_position(content: &str, offset: u32) -> Position {
    let offset = offset as usize;
    let mut line = 0u32;
    let mut line_start = 0usize;
    for (idx, ch) in content.char_indices() {
        if idx >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            line_start = idx + 1;
        }
    }
    let character = content[line_start..offset.min(content.len())].chars().count() as u32;
    Position { line, character }
}

/// Extract the short (unqualified) name from a potentially fully-qualified
/// name: `"\A\B\C"` or `"A\B\C"` → `"C"`.
pub fn short_name(name: &str) -> &str {
    name.rsplit('\\').next().unwrap_or(name)
}

/// Strip a leading namespace separator, the normalization chosen for FQNs
/// stored internally (spec §4.E leaves this implementation-defined, as
/// long as it's consistent — we keep FQNs without the leading `\` on the
/// wire and add it back only when presenting to a user).
pub fn strip_leading_separator(name: &str) -> &str {
    name.strip_prefix('\\').unwrap_or(name)
}

/// Join a namespace and a local name into a canonical FQN (no leading `\`).
pub fn join_namespace(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}\\{}", namespace, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_name_strips_namespace() {
        assert_eq!(short_name("Illuminate\\Support\\Collection"), "Collection");
        assert_eq!(short_name("Collection"), "Collection");
    }

    #[test]
    fn position_offset_roundtrip() {
        let content = "line one\nline two\nline three";
        let pos = Position { line: 1, character: 5 };
        let offset = position_to_byte_offset(content, pos);
        assert_eq!(offset, 9 + 5);
        let back = byte_offset_to_position(content, offset);
        assert_eq!(back, pos);
    }
}
