//! Field errors and migration results.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::issue::ParseIssue;
use super::row::RowPosition;

/// Why a field failed validation (or could not be written).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[non_exhaustive]
pub enum FieldErrorKind {
    /// A required field is absent, `NULL`, or blank.
    #[error("is required")]
    Required,

    /// The value has the wrong shape for the field's declared type.
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        /// The declared type.
        expected: String,
        /// The value's type.
        found: String,
    },

    /// The text exceeds the field's maximum length.
    #[error("is {actual} characters long, maximum is {max}")]
    TooLong {
        /// Declared maximum, in characters.
        max: usize,
        /// Actual length, in characters.
        actual: usize,
    },

    /// The value is not one of the declared enum values.
    #[error("must be one of: {}", .allowed.join(", "))]
    NotAllowed {
        /// Declared values.
        allowed: Vec<String>,
    },

    /// The text does not match the field's pattern.
    #[error("does not match the expected format {pattern}")]
    PatternMismatch {
        /// The declared pattern.
        pattern: String,
    },

    /// The value cannot be read as a number.
    #[error("is not a number")]
    NotANumber,

    /// The value cannot be read as a calendar date.
    #[error("is not a valid date (expected YYYY-MM-DD)")]
    InvalidDate,

    /// The value is not shaped like an email address.
    #[error("is not a valid email address")]
    InvalidEmail,

    /// The datastore rejected the record.
    #[error("could not be written: {message}")]
    Write {
        /// Datastore message.
        message: String,
    },
}

/// A field-level validation error.
///
/// # Examples
///
/// ```
/// use hm_core::{FieldError, FieldErrorKind};
///
/// let err = FieldError::new("first_name", FieldErrorKind::Required);
/// assert_eq!(err.to_string(), "first_name is required");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{field} {kind}")]
pub struct FieldError {
    /// Target field name.
    pub field: String,
    /// What is wrong with it.
    pub kind: FieldErrorKind,
}

impl FieldError {
    /// Creates a new field error.
    #[inline]
    #[must_use]
    pub fn new(field: impl Into<String>, kind: FieldErrorKind) -> Self {
        Self {
            field: field.into(),
            kind,
        }
    }
}

/// All errors recorded against one skipped row.
///
/// Uses `SmallVec` since a skipped row rarely has more than a handful of
/// failing fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    /// Position of the row in the dump.
    pub position: RowPosition,
    /// Field errors, in rule order.
    pub errors: SmallVec<[FieldError; 4]>,
}

impl RowError {
    /// Creates a new row error.
    #[must_use]
    pub fn new(position: RowPosition, errors: impl IntoIterator<Item = FieldError>) -> Self {
        Self {
            position,
            errors: errors.into_iter().collect(),
        }
    }
}

/// The outcome of one migration run.
///
/// Produced once per execution and not mutated afterwards. Malformed rows from
/// the parse pass are listed in `malformed_rows` but are not counted in any
/// of the three counters.
///
/// # Invariants
///
/// - `records_inserted + records_updated + records_skipped` equals the number
///   of rows the run processed
/// - `success` is `true` iff `records_skipped == 0` and the run `completed`
///
/// # Examples
///
/// ```
/// use hm_core::MigrationResult;
///
/// let result = MigrationResult::default();
/// assert_eq!(result.total_processed(), 0);
/// assert!(!result.success);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationResult {
    /// `true` iff the run completed with no skipped rows.
    pub success: bool,
    /// `false` if the run was stopped early or aborted.
    pub completed: bool,
    /// Rows inserted as new records.
    pub records_inserted: u64,
    /// Rows that updated an existing record.
    pub records_updated: u64,
    /// Rows skipped for validation or write errors.
    pub records_skipped: u64,
    /// Errors for skipped rows, in file order.
    pub per_row_errors: Vec<RowError>,
    /// Malformed tuples and statements from the parse pass.
    pub malformed_rows: Vec<ParseIssue>,
}

impl MigrationResult {
    /// Rows that were inserted, updated or skipped.
    #[inline]
    #[must_use]
    pub const fn total_processed(&self) -> u64 {
        self.records_inserted + self.records_updated + self.records_skipped
    }
}

#[cfg(test)]
mod tests {
    use smallvec::smallvec;

    use super::*;

    #[test]
    fn test_field_error_messages() {
        let too_long = FieldError::new("phone_number", FieldErrorKind::TooLong { max: 20, actual: 25 });
        insta::assert_snapshot!(too_long.to_string(), @"phone_number is 25 characters long, maximum is 20");

        let not_allowed = FieldError::new(
            "gender",
            FieldErrorKind::NotAllowed {
                allowed: vec!["male".to_owned(), "female".to_owned()],
            },
        );
        insta::assert_snapshot!(not_allowed.to_string(), @"gender must be one of: male, female");
    }

    #[test]
    fn test_totals() {
        let result = MigrationResult {
            success: false,
            completed: true,
            records_inserted: 2,
            records_updated: 3,
            records_skipped: 1,
            per_row_errors: Vec::new(),
            malformed_rows: Vec::new(),
        };
        assert_eq!(result.total_processed(), 6);
    }

    #[test]
    fn test_row_error_serialization() {
        let row_error = RowError {
            position: RowPosition::new(2, 1, 2, 1),
            errors: smallvec![FieldError::new("icn", FieldErrorKind::InvalidDate)],
        };
        let json = serde_json::to_string(&row_error).unwrap();
        let parsed: RowError = serde_json::from_str(&json).unwrap();
        assert_eq!(row_error, parsed);
    }
}
