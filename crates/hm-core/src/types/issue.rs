//! Row-level parse issues.
//!
//! A [`ParseIssue`] never aborts parsing: the offending tuple (or statement)
//! is excluded and the parser moves on.

use serde::{Deserialize, Serialize};

use super::row::RowPosition;

/// What went wrong with a tuple or statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[non_exhaustive]
pub enum ParseIssueKind {
    /// The tuple's literal count differs from the statement's column count.
    #[error("expected {expected} values, found {found}")]
    ColumnCountMismatch {
        /// Number of declared columns.
        expected: usize,
        /// Number of literals in the tuple.
        found: usize,
    },

    /// The `INSERT` statement has no parenthesized column list.
    #[error("INSERT statement has no column list")]
    MissingColumnList,

    /// A column name appears twice in the column list.
    #[error("duplicate column '{column}'")]
    DuplicateColumn {
        /// The repeated column name.
        column: String,
    },

    /// The `INSERT` statement has no `VALUES` clause.
    #[error("INSERT statement has no VALUES clause")]
    MissingValues,

    /// A quoted string runs to the end of the input.
    #[error("unterminated quoted string")]
    UnterminatedString,

    /// A tuple's closing parenthesis is missing.
    #[error("unterminated value tuple")]
    UnterminatedTuple,

    /// A token appeared where the statement grammar does not allow it.
    #[error("unexpected '{found}'")]
    UnexpectedToken {
        /// The offending text (truncated).
        found: String,
    },
}

/// A malformed tuple or statement, with its position.
///
/// # Examples
///
/// ```
/// use hm_core::{ParseIssue, ParseIssueKind, RowPosition};
///
/// let issue = ParseIssue::new(
///     RowPosition::new(2, 1, 2, 3),
///     Some("legacy_patients".to_owned()),
///     ParseIssueKind::ColumnCountMismatch { expected: 3, found: 2 },
/// );
/// assert_eq!(
///     issue.to_string(),
///     "row 2 (statement 1, tuple 2, line 3): expected 3 values, found 2"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{position}: {kind}")]
pub struct ParseIssue {
    /// Where the problem is.
    pub position: RowPosition,
    /// Table named by the statement, if the parser got that far.
    pub table: Option<String>,
    /// What the problem is.
    pub kind: ParseIssueKind,
}

impl ParseIssue {
    /// Creates a new parse issue.
    #[inline]
    #[must_use]
    pub const fn new(position: RowPosition, table: Option<String>, kind: ParseIssueKind) -> Self {
        Self {
            position,
            table,
            kind,
        }
    }

    /// Returns `true` if the issue belongs to `table` (case-insensitive).
    #[must_use]
    pub fn is_for_table(&self, table: &str) -> bool {
        self.table
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case(table))
    }

    /// Returns `true` if the issue covers a whole statement rather than one
    /// tuple.
    #[inline]
    #[must_use]
    pub const fn is_statement_level(&self) -> bool {
        self.position.tuple == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_level_display() {
        let issue = ParseIssue::new(
            RowPosition::new(0, 2, 0, 9),
            Some("legacy_patients".to_owned()),
            ParseIssueKind::DuplicateColumn {
                column: "icn".to_owned(),
            },
        );
        assert!(issue.is_statement_level());
        assert!(issue.is_for_table("LEGACY_PATIENTS"));
        insta::assert_snapshot!(issue.to_string(), @"statement 2 (line 9): duplicate column 'icn'");
    }

    #[test]
    fn test_serialization() {
        let issue = ParseIssue::new(
            RowPosition::new(5, 1, 5, 6),
            None,
            ParseIssueKind::ColumnCountMismatch {
                expected: 3,
                found: 2,
            },
        );
        let json = serde_json::to_string(&issue).unwrap();
        let parsed: ParseIssue = serde_json::from_str(&json).unwrap();
        assert_eq!(issue, parsed);
        assert!(json.contains(r#""kind":"column_count_mismatch""#));
    }
}
