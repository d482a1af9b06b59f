//! Error types for the hm-engine crate.
//!
//! This module provides [`StoreError`] for datastore failures and
//! [`EngineError`] for call-level failures of a preview or migration.
//!
//! # Error Recovery Strategy
//!
//! - **Row errors** ([`StoreError::Rejected`], [`StoreError::NotFound`]):
//!   the row is skipped with a field error, the run continues
//! - **Connection errors** ([`StoreError::Connection`], [`StoreError::Persist`],
//!   [`StoreError::Corrupt`]): the run stops and surfaces the partial result
//!   through [`EngineError::DatastoreConnection`]

use std::fmt;

use camino::Utf8PathBuf;
use hm_core::{ConfigError, MigrationResult, TargetKind};
use hm_schema::CatalogError;

use crate::store::RecordId;

/// Errors returned by a [`Datastore`](crate::Datastore).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The datastore refused this record (constraint, size, ...).
    #[error("record rejected: {message}")]
    Rejected {
        /// Datastore message.
        message: String,
    },

    /// The record to update no longer exists.
    #[error("{target} record {id} not found")]
    NotFound {
        /// Target table.
        target: TargetKind,
        /// Record id.
        id: RecordId,
    },

    /// The datastore cannot be reached.
    #[error("datastore unavailable: {message}")]
    Connection {
        /// Connection failure description.
        message: String,
    },

    /// The store file could not be read or written.
    #[error("failed to access store file {path}: {source}")]
    Persist {
        /// Store file path.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The store file is not valid store JSON.
    #[error("store file {path} is corrupt: {source}")]
    Corrupt {
        /// Store file path.
        path: Utf8PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Creates a new [`StoreError::Rejected`] error.
    #[inline]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Creates a new [`StoreError::Connection`] error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a new [`StoreError::Persist`] error.
    #[inline]
    pub fn persist(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Persist {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if the error only affects the current row.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Rejected { .. } | Self::NotFound { .. })
    }

    /// Returns `true` if the run must stop.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }
}

/// The category of an [`EngineError`], for structured reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineErrorKind {
    /// Catalog or validator construction failed.
    Catalog,
    /// The mapping does not fit the target.
    InvalidMapping,
    /// The requested source table is not in the dump.
    SourceTableNotFound,
    /// The datastore became unreachable mid-run.
    DatastoreConnection,
    /// The engine configuration is invalid.
    Config,
}

impl EngineErrorKind {
    /// Stable identifier for logs and JSON output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Catalog => "catalog",
            Self::InvalidMapping => "invalid_mapping",
            Self::SourceTableNotFound => "source_table_not_found",
            Self::DatastoreConnection => "datastore_connection",
            Self::Config => "config",
        }
    }
}

impl fmt::Display for EngineErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Call-level failures of a preview or migration.
///
/// Row-level problems never surface here: they are recorded in the
/// [`MigrationResult`].
///
/// # Examples
///
/// ```
/// use hm_core::TargetKind;
/// use hm_engine::{EngineError, EngineErrorKind};
///
/// let err = EngineError::invalid_mapping(
///     TargetKind::Patients,
///     vec!["nickname".to_owned()],
///     vec!["last_name".to_owned()],
/// );
/// assert_eq!(err.kind(), EngineErrorKind::InvalidMapping);
/// assert_eq!(
///     err.to_string(),
///     "invalid mapping for patients: unknown fields [nickname]; unmapped required fields [last_name]"
/// );
/// ```
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Catalog lookup or validator construction failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The mapping names unknown target fields or leaves required ones
    /// unmapped.
    #[error("invalid mapping for {target}: {}", mapping_problems(.unknown_fields, .unmapped_required))]
    InvalidMapping {
        /// Target the mapping was checked against.
        target: TargetKind,
        /// Mapped fields the target does not declare.
        unknown_fields: Vec<String>,
        /// Required fields with no source column.
        unmapped_required: Vec<String>,
    },

    /// The requested source table has no statements in the dump.
    #[error("source table '{table}' not found in dump (tables: {})", .available.join(", "))]
    SourceTableNotFound {
        /// The requested table.
        table: String,
        /// Tables that are present.
        available: Vec<String>,
    },

    /// The datastore became unreachable; the run stopped.
    #[error("datastore connection failed after {} rows: {message}", .partial.total_processed())]
    DatastoreConnection {
        /// Connection failure description.
        message: String,
        /// Counts accumulated before the failure (`success` and `completed`
        /// are `false`).
        partial: Box<MigrationResult>,
    },

    /// The engine configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl EngineError {
    /// Creates a new [`EngineError::InvalidMapping`] error.
    #[must_use]
    pub fn invalid_mapping(
        target: TargetKind,
        unknown_fields: Vec<String>,
        unmapped_required: Vec<String>,
    ) -> Self {
        Self::InvalidMapping {
            target,
            unknown_fields,
            unmapped_required,
        }
    }

    /// Returns the error category.
    #[must_use]
    pub const fn kind(&self) -> EngineErrorKind {
        match self {
            Self::Catalog(_) => EngineErrorKind::Catalog,
            Self::InvalidMapping { .. } => EngineErrorKind::InvalidMapping,
            Self::SourceTableNotFound { .. } => EngineErrorKind::SourceTableNotFound,
            Self::DatastoreConnection { .. } => EngineErrorKind::DatastoreConnection,
            Self::Config(_) => EngineErrorKind::Config,
        }
    }

    /// Returns the partial result of an aborted run, if any.
    #[must_use]
    pub fn partial_result(&self) -> Option<&MigrationResult> {
        match self {
            Self::DatastoreConnection { partial, .. } => Some(&**partial),
            _ => None,
        }
    }
}

fn mapping_problems(unknown: &[String], unmapped: &[String]) -> String {
    let mut parts = Vec::with_capacity(2);
    if !unknown.is_empty() {
        parts.push(format!("unknown fields [{}]", unknown.join(", ")));
    }
    if !unmapped.is_empty() {
        parts.push(format!("unmapped required fields [{}]", unmapped.join(", ")));
    }
    parts.join("; ")
}
