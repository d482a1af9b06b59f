//! Error types for the hm-core crate.
//!
//! This module provides [`ConfigError`] for configuration loading failures and
//! [`UnknownTarget`] for target identifiers outside the supported set.

use camino::Utf8PathBuf;

/// Errors that can occur during configuration loading and validation.
///
/// # Examples
///
/// ```
/// use hm_core::ConfigError;
/// use camino::Utf8PathBuf;
///
/// let error = ConfigError::MissingFile(Utf8PathBuf::from("/etc/hm/config.json"));
/// assert!(error.to_string().contains("/etc/hm/config.json"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("configuration file not found: {0}")]
    MissingFile(Utf8PathBuf),

    /// A configuration option has an invalid value.
    #[error("invalid configuration option '{option}': {reason}")]
    InvalidOption {
        /// The dotted name of the invalid option.
        option: String,
        /// Explanation of why the option is invalid.
        reason: String,
    },

    /// An I/O error occurred while reading configuration.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Creates a new [`ConfigError::InvalidOption`] error.
    #[inline]
    pub fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }
}

/// A target identifier that is not part of the closed set of migration targets.
///
/// Returned before any processing happens; callers surface it as a call-level
/// failure.
///
/// # Examples
///
/// ```
/// use hm_core::{TargetKind, UnknownTarget};
///
/// let err: UnknownTarget = "invoices".parse::<TargetKind>().unwrap_err();
/// assert_eq!(err.0, "invoices");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown migration target '{0}'")]
pub struct UnknownTarget(pub String);
