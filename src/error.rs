//! Error kinds (spec §7).
//!
//! Propagation policy: user-facing queries never raise for data-dependent
//! failures — `NotFound` and `ResolutionFailure` are modeled as `Option`/
//! empty `Vec`/empty type string at the call site, never as a variant
//! here. Only structural contract violations are `Result` errors the
//! façade can receive. Plain hand-rolled `Display`/`Error` impls are used
//! rather than pulling in `thiserror` for a handful of variants, matching
//! the teacher's preference for small enums without extra derive crates.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Adding a document URI already present.
    DuplicateKey(String),
    /// Scope-stack underflow, branch underflow, visitor re-entry. Fatal:
    /// the façade catches this, logs it, and leaves global state
    /// untouched rather than propagating a panic across a request.
    InternalInvariantViolation(String),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::DuplicateKey(uri) => write!(f, "document already open: {}", uri),
            CoreError::InternalInvariantViolation(msg) => write!(f, "internal invariant violation: {}", msg),
        }
    }
}

impl std::error::Error for CoreError {}
