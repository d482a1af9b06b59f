//! Core types, errors, and configuration for the legacy dump migration engine.
//!
//! This crate provides the foundational types shared across the workspace:
//!
//! - Error types for configuration and target lookup
//! - Configuration structures ([`Config`] and its sections)
//! - Domain types ([`Value`], [`SourceRow`], [`FieldMapping`], [`PreviewData`],
//!   [`MigrationResult`])
//! - Type aliases for `FxHashMap`/`FxHashSet` (faster than std)
//!
//! # Data Flow
//!
//! ```text
//! dump text ──► SourceRow ──► PreviewData (sampled, cached by the client)
//!                   │
//!                   └──► Record (projected through a FieldMapping)
//!                             │
//!                             └──► MigrationResult
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod hash;
pub mod types;

pub use config::{Config, ExecuteConfig, MappingConfig, PreviewConfig};
pub use error::{ConfigError, UnknownTarget};
pub use hash::{FxHashMap, FxHashSet, fx_hash_map, fx_hash_set};
pub use types::{
    FieldError, FieldErrorKind, FieldMapping, MigrationResult, ParseIssue, ParseIssueKind,
    PreviewData, Record, RowError, RowPosition, SourceRow, TargetKind, Value,
};
