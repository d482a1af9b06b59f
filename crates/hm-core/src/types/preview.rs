//! Preview data exchanged with the operator.

use serde::{Deserialize, Serialize};

use super::issue::ParseIssue;
use super::mapping::FieldMapping;
use super::row::SourceRow;
use super::target::TargetKind;

/// A read-only, sampled look at a dump before a migration is confirmed.
///
/// Not persisted by the engine: callers cache it (typically client-side, as
/// JSON) between the preview and confirm steps. [`to_json`](Self::to_json)
/// and [`from_json`](Self::from_json) round-trip without loss.
///
/// # Examples
///
/// ```
/// use hm_core::{FieldMapping, PreviewData, TargetKind};
///
/// let preview = PreviewData {
///     source_table: "legacy_patients".to_owned(),
///     target: TargetKind::Patients,
///     columns: vec!["fname".to_owned()],
///     sample: Vec::new(),
///     total_rows: 0,
///     malformed_count: 0,
///     parse_issues: Vec::new(),
///     other_tables: Vec::new(),
///     suggested_mapping: FieldMapping::new().with("first_name", "fname"),
///     unmapped_required: vec!["last_name".to_owned()],
/// };
///
/// let json = preview.to_json()?;
/// assert_eq!(PreviewData::from_json(&json)?, preview);
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewData {
    /// Source table the preview was built from.
    pub source_table: String,
    /// Chosen migration target.
    pub target: TargetKind,
    /// Columns discovered for the source table, in first-seen order.
    pub columns: Vec<String>,
    /// The first valid rows of the source table, up to the sample size.
    pub sample: Vec<SourceRow>,
    /// Valid rows found for the source table across the whole dump.
    pub total_rows: u64,
    /// Malformed tuples and statements across the whole dump.
    pub malformed_count: u64,
    /// The first parse issues, capped by configuration.
    pub parse_issues: Vec<ParseIssue>,
    /// Other tables present in the dump (not sampled).
    pub other_tables: Vec<String>,
    /// Mapping suggested by name matching, for the operator to confirm.
    pub suggested_mapping: FieldMapping,
    /// Required target fields the suggestion leaves unmapped.
    pub unmapped_required: Vec<String>,
}

impl PreviewData {
    /// Returns `true` if the suggested mapping covers every required field.
    #[inline]
    #[must_use]
    pub fn is_mapping_complete(&self) -> bool {
        self.unmapped_required.is_empty()
    }

    /// Serializes the preview for caching.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serializes the preview as indented JSON, for files meant to be edited.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Restores a cached preview.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::types::{ParseIssueKind, RowPosition, Value};

    #[test]
    fn test_round_trip_with_sample_and_issues() {
        let columns: Arc<[String]> = vec!["fname".to_owned(), "dob".to_owned()].into();
        let row = SourceRow::new(
            Arc::from("legacy_patients"),
            columns,
            vec![Value::from("Ann"), Value::Integer(19_900_402)],
            RowPosition::new(1, 1, 1, 2),
        );
        let preview = PreviewData {
            source_table: "legacy_patients".to_owned(),
            target: TargetKind::Patients,
            columns: vec!["fname".to_owned(), "dob".to_owned()],
            sample: vec![row],
            total_rows: 1,
            malformed_count: 1,
            parse_issues: vec![ParseIssue::new(
                RowPosition::new(2, 1, 2, 3),
                Some("legacy_patients".to_owned()),
                ParseIssueKind::ColumnCountMismatch {
                    expected: 2,
                    found: 1,
                },
            )],
            other_tables: vec!["legacy_visits".to_owned()],
            suggested_mapping: FieldMapping::new()
                .with("first_name", "fname")
                .with("date_of_birth", "dob"),
            unmapped_required: vec!["last_name".to_owned()],
        };

        let json = preview.to_json_pretty().unwrap();
        let restored = PreviewData::from_json(&json).unwrap();
        assert_eq!(restored, preview);
        assert!(!restored.is_mapping_complete());
    }
}
