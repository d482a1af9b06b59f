//! Error types for the hm-schema crate.

use hm_core::{TargetKind, UnknownTarget};

/// Errors raised by catalog lookups and validator construction.
///
/// Both variants are call-level failures: they occur before any row is
/// processed.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The target identifier is not in the catalog.
    #[error(transparent)]
    UnknownTarget(#[from] UnknownTarget),

    /// A field pattern failed to compile.
    #[error("invalid pattern for {target}.{field}: {source}")]
    InvalidPattern {
        /// Target that declares the field.
        target: TargetKind,
        /// Field carrying the pattern.
        field: &'static str,
        /// The regex compilation error.
        #[source]
        source: regex::Error,
    },
}

impl CatalogError {
    /// Creates an unknown-target error.
    #[must_use]
    pub fn unknown_target(name: impl Into<String>) -> Self {
        Self::UnknownTarget(UnknownTarget(name.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_target_is_transparent() {
        let err = CatalogError::unknown_target("invoices");
        assert_eq!(err.to_string(), "unknown migration target 'invoices'");
    }
}
