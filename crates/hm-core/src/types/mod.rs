//! Domain types for the migration engine.
//!
//! # Module Organization
//!
//! - [`value`] - Typed literal values and candidate records
//! - [`row`] - Parsed source rows and their positions
//! - [`target`] - The closed set of migration targets
//! - [`mapping`] - Operator-confirmed field mappings
//! - [`issue`] - Row-level parse issues
//! - [`result`] - Field errors and migration results
//! - [`preview`] - Preview data exchanged with the operator
//!
//! All public types are re-exported here and at the crate root:
//!
//! ```
//! use hm_core::{FieldMapping, MigrationResult, SourceRow, TargetKind, Value};
//! ```

mod issue;
mod mapping;
mod preview;
mod result;
mod row;
mod target;
mod value;

pub use issue::{ParseIssue, ParseIssueKind};
pub use mapping::FieldMapping;
pub use preview::PreviewData;
pub use result::{FieldError, FieldErrorKind, MigrationResult, RowError};
pub use row::{RowPosition, SourceRow};
pub use target::TargetKind;
pub use value::{Record, Value};
