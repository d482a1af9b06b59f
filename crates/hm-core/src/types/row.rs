//! Parsed source rows and their positions within a dump.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::value::Value;

/// Where a row (or a statement-level problem) sits in the dump.
///
/// # Field Conventions
///
/// - `row` is the 1-based ordinal of the tuple across the whole dump,
///   counting malformed tuples too, so operators can find it in the file
/// - `statement` is the 1-based index of the `INSERT` statement
/// - `tuple` is the 1-based index within the statement's `VALUES` list
///   (`0` for statement-level problems)
/// - `line` is the 1-based line of the tuple's opening parenthesis
///
/// # Examples
///
/// ```
/// use hm_core::RowPosition;
///
/// let pos = RowPosition::new(3, 1, 3, 7);
/// assert_eq!(pos.to_string(), "row 3 (statement 1, tuple 3, line 7)");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct RowPosition {
    /// Row ordinal across the dump (1-indexed).
    pub row: u32,
    /// Statement index (1-indexed).
    pub statement: u32,
    /// Tuple index within the statement (1-indexed, `0` for the statement itself).
    pub tuple: u32,
    /// Line number (1-indexed).
    pub line: u32,
}

impl RowPosition {
    /// Creates a new row position.
    #[inline]
    #[must_use]
    pub const fn new(row: u32, statement: u32, tuple: u32, line: u32) -> Self {
        Self {
            row,
            statement,
            tuple,
            line,
        }
    }
}

impl fmt::Display for RowPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tuple == 0 {
            write!(f, "statement {} (line {})", self.statement, self.line)
        } else {
            write!(
                f,
                "row {} (statement {}, tuple {}, line {})",
                self.row, self.statement, self.tuple, self.line
            )
        }
    }
}

/// One tuple from an `INSERT` statement, paired with its column names.
///
/// Column names are shared between all rows of a statement. Values are stored
/// positionally; use [`get`](Self::get) or [`iter`](Self::iter) for named
/// access. Rows are immutable once parsed.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use hm_core::{RowPosition, SourceRow, Value};
///
/// let columns: Arc<[String]> = vec!["fname".to_owned(), "icn".to_owned()].into();
/// let row = SourceRow::new(
///     Arc::from("legacy_patients"),
///     columns,
///     vec![Value::from("Ann"), Value::Null],
///     RowPosition::new(1, 1, 1, 1),
/// );
///
/// assert_eq!(row.get("fname"), Some(&Value::from("Ann")));
/// assert_eq!(row.get("missing"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRow {
    /// Table named by the originating statement.
    pub table: Arc<str>,
    /// Column names in statement order.
    pub columns: Arc<[String]>,
    /// Literal values, positionally aligned with `columns`.
    pub values: Vec<Value>,
    /// Position of the tuple in the dump.
    pub position: RowPosition,
}

impl SourceRow {
    /// Creates a new row.
    ///
    /// Callers guarantee `columns.len() == values.len()`; the parser reports a
    /// malformed row instead of constructing a mismatched one.
    #[must_use]
    pub fn new(
        table: Arc<str>,
        columns: Arc<[String]>,
        values: Vec<Value>,
        position: RowPosition,
    ) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self {
            table,
            columns,
            values,
            position,
        }
    }

    /// Returns the value for `column`, if the row has it.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.values.get(idx))
    }

    /// Iterates over `(column, value)` pairs in statement order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Number of columns in the row.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the row has no columns.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> SourceRow {
        let columns: Arc<[String]> = vec!["fname".to_owned(), "lname".to_owned()].into();
        SourceRow::new(
            Arc::from("legacy_patients"),
            columns,
            vec![Value::from("Ann"), Value::from("Lee")],
            RowPosition::new(2, 1, 2, 4),
        )
    }

    #[test]
    fn test_iter_preserves_order() {
        let row = sample_row();
        let pairs: Vec<_> = row.iter().map(|(c, v)| (c.to_owned(), v.render().into_owned())).collect();
        assert_eq!(
            pairs,
            vec![
                ("fname".to_owned(), "Ann".to_owned()),
                ("lname".to_owned(), "Lee".to_owned())
            ]
        );
        assert_eq!(row.len(), 2);
        assert!(!row.is_empty());
    }

    #[test]
    fn test_statement_position_display() {
        let pos = RowPosition::new(0, 4, 0, 12);
        assert_eq!(pos.to_string(), "statement 4 (line 12)");
    }

    #[test]
    fn test_row_serialization() {
        let row = sample_row();
        let json = serde_json::to_string(&row).unwrap();
        let parsed: SourceRow = serde_json::from_str(&json).unwrap();
        assert_eq!(row, parsed);
    }
}
