//! Confirmed migration plans.

use serde::{Deserialize, Serialize};

use hm_core::{FieldMapping, PreviewData, Record, SourceRow, TargetKind, Value};
use hm_schema::TargetSchema;

use crate::error::EngineError;

/// What to migrate: a target, the source table and the operator-confirmed
/// mapping.
///
/// # Examples
///
/// ```
/// use hm_core::{FieldMapping, TargetKind};
/// use hm_engine::MigrationPlan;
///
/// let mapping = FieldMapping::new()
///     .with("first_name", "fname")
///     .with("last_name", "lname")
///     .with("identification_card_number", "icn");
/// let plan = MigrationPlan::new(TargetKind::Patients, mapping)
///     .with_source_table("legacy_patients");
///
/// assert!(plan.check(hm_schema::schema(plan.target)).is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationPlan {
    /// Target table.
    pub target: TargetKind,
    /// Source table to read; the first table in the dump when `None`.
    pub source_table: Option<String>,
    /// Target field → source column.
    pub mapping: FieldMapping,
}

impl MigrationPlan {
    /// Creates a plan reading the dump's first table.
    #[must_use]
    pub const fn new(target: TargetKind, mapping: FieldMapping) -> Self {
        Self {
            target,
            source_table: None,
            mapping,
        }
    }

    /// Sets the source table.
    #[must_use]
    pub fn with_source_table(mut self, table: impl Into<String>) -> Self {
        self.source_table = Some(table.into());
        self
    }

    /// Builds a plan from a cached preview, accepting its suggested mapping.
    #[must_use]
    pub fn from_preview(preview: &PreviewData) -> Self {
        Self {
            target: preview.target,
            source_table: Some(preview.source_table.clone()),
            mapping: preview.suggested_mapping.clone(),
        }
    }

    /// Checks the mapping against the target schema.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidMapping`] if the mapping names fields the
    /// target does not declare, or leaves required fields unmapped.
    pub fn check(&self, schema: &TargetSchema) -> Result<(), EngineError> {
        let unknown: Vec<String> = self
            .mapping
            .iter()
            .filter(|(field, _)| !schema.has_field(field))
            .map(|(field, _)| field.to_owned())
            .collect();
        let unmapped: Vec<String> = schema
            .required_fields()
            .filter(|rule| self.mapping.source_for(rule.name).is_none())
            .map(|rule| rule.name.to_owned())
            .collect();

        if unknown.is_empty() && unmapped.is_empty() {
            Ok(())
        } else {
            Err(EngineError::invalid_mapping(schema.target, unknown, unmapped))
        }
    }

    /// Projects a source row onto target fields.
    ///
    /// Source columns the mapping does not reference are dropped. A mapped
    /// column the row lacks becomes [`Value::Null`], which validation then
    /// treats as missing. Column names match exactly first, then ignoring
    /// ASCII case.
    #[must_use]
    pub fn project(&self, row: &SourceRow) -> Record {
        self.mapping
            .iter()
            .map(|(field, column)| {
                let value = row
                    .get(column)
                    .or_else(|| {
                        row.iter()
                            .find(|(name, _)| name.eq_ignore_ascii_case(column))
                            .map(|(_, value)| value)
                    })
                    .cloned()
                    .unwrap_or(Value::Null);
                (field.to_owned(), value)
            })
            .collect()
    }

    /// Returns `true` if `table` is this plan's source table (ignoring ASCII
    /// case).
    #[must_use]
    pub fn reads_table(&self, table: &str) -> bool {
        self.source_table
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case(table))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use hm_core::RowPosition;
    use hm_schema::{LAB_RESULTS, PATIENTS};

    use super::*;

    fn patient_mapping() -> FieldMapping {
        FieldMapping::new()
            .with("first_name", "fname")
            .with("last_name", "lname")
            .with("identification_card_number", "icn")
    }

    #[test]
    fn test_check_accepts_complete_mapping() {
        let plan = MigrationPlan::new(TargetKind::Patients, patient_mapping());
        assert!(plan.check(&PATIENTS).is_ok());
    }

    #[test]
    fn test_check_reports_unknown_and_unmapped() {
        let mapping = FieldMapping::new()
            .with("first_name", "fname")
            .with("nickname", "nick");
        let err = MigrationPlan::new(TargetKind::Patients, mapping)
            .check(&PATIENTS)
            .unwrap_err();
        insta::assert_snapshot!(
            err.to_string(),
            @"invalid mapping for patients: unknown fields [nickname]; unmapped required fields [last_name, identification_card_number]"
        );
    }

    #[test]
    fn test_check_against_wrong_target() {
        let err = MigrationPlan::new(TargetKind::LabResults, patient_mapping())
            .check(&LAB_RESULTS)
            .unwrap_err();
        let EngineError::InvalidMapping {
            unknown_fields,
            unmapped_required,
            ..
        } = err
        else {
            panic!("expected InvalidMapping, got {err:?}");
        };
        assert_eq!(unknown_fields.len(), 3);
        assert_eq!(unmapped_required.len(), 4);
    }

    #[test]
    fn test_project() {
        let row = SourceRow::new(
            Arc::from("legacy_patients"),
            Arc::from(vec!["FName".to_owned(), "icn".to_owned(), "extra".to_owned()]),
            vec![Value::from("Ann"), Value::from("1234567890123456"), Value::from("x")],
            RowPosition::new(1, 1, 1, 1),
        );
        let record = MigrationPlan::new(TargetKind::Patients, patient_mapping()).project(&row);

        assert_eq!(record.len(), 3);
        assert_eq!(record["first_name"], Value::from("Ann"));
        assert_eq!(record["last_name"], Value::Null);
        assert_eq!(record["identification_card_number"], Value::from("1234567890123456"));
    }

    #[test]
    fn test_reads_table() {
        let plan = MigrationPlan::new(TargetKind::Patients, patient_mapping())
            .with_source_table("Legacy_Patients");
        assert!(plan.reads_table("legacy_patients"));
        assert!(!plan.reads_table("visits"));
        assert!(!MigrationPlan::new(TargetKind::Patients, FieldMapping::new()).reads_table("x"));
    }
}
