//! Preview building and mapping suggestions.
//!
//! A preview is one read-only pass over the dump. It counts every row and
//! issue, keeps only the first few valid rows of the selected source table,
//! and proposes a [`FieldMapping`] for the operator to confirm.

use std::collections::BTreeMap;

use tracing::{debug, info};

use hm_core::{Config, FieldMapping, FxHashSet, PreviewData, TargetKind, fx_hash_set};
use hm_dump::DumpParser;
use hm_schema::{TargetSchema, schema};

use crate::error::EngineError;

/// Built-in column aliases, keyed by target field.
const SYNONYMS: &[(&str, &[&str])] = &[
    ("first_name", &["fname", "firstname", "given_name", "forename", "first"]),
    ("last_name", &["lname", "lastname", "surname", "family_name", "last"]),
    (
        "identification_card_number",
        &["icn", "id_card", "id_number", "national_id", "card_number"],
    ),
    ("date_of_birth", &["dob", "birth_date", "birthdate", "birthday"]),
    ("gender", &["sex"]),
    ("email", &["email_address", "mail"]),
    ("phone_number", &["phone", "tel", "telephone", "mobile", "contact_number"]),
    ("address", &["addr", "street_address", "home_address"]),
    ("blood_type", &["blood_group", "bloodgroup", "abo"]),
    (
        "patient_identification_card_number",
        &["patient_icn", "icn", "patient_id_number", "patient_card_number"],
    ),
    ("test_name", &["test", "analyte", "exam", "lab_test"]),
    ("test_date", &["collection_date", "collected_on", "sample_date", "date"]),
    ("result_value", &["result", "value", "reading"]),
    ("unit", &["units", "uom"]),
    ("reference_range", &["ref_range", "normal_range", "range"]),
    ("status", &["state", "result_status"]),
    ("notes", &["note", "comment", "comments", "remarks"]),
];

/// Builds [`PreviewData`] from dump text.
///
/// # Examples
///
/// ```
/// use hm_core::{Config, TargetKind};
/// use hm_engine::PreviewBuilder;
///
/// let dump = "INSERT INTO legacy_patients (fname, lname, icn) VALUES
///     ('Ann', 'Lee', '1234567890123456'),
///     ('Bo', 'Ng');";
///
/// let config = Config::default();
/// let preview = PreviewBuilder::new(&config).build(dump, TargetKind::Patients, None)?;
///
/// assert_eq!(preview.source_table, "legacy_patients");
/// assert_eq!(preview.total_rows, 1);
/// assert_eq!(preview.malformed_count, 1);
/// assert_eq!(preview.suggested_mapping.source_for("identification_card_number"), Some("icn"));
/// assert!(preview.is_mapping_complete());
/// # Ok::<(), hm_engine::EngineError>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PreviewBuilder<'a> {
    config: &'a Config,
}

impl<'a> PreviewBuilder<'a> {
    /// Creates a builder using the `preview` and `mapping` sections of
    /// `config`.
    #[inline]
    #[must_use]
    pub const fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Parses the whole dump and assembles a preview for `target`.
    ///
    /// `source_table` selects the table to sample (ignoring ASCII case);
    /// without it the first table with a well-formed row is used, or the
    /// first table named at all if none has one. An empty dump yields an
    /// empty preview with a blank source table.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SourceTableNotFound`] if `source_table` is given
    /// but the dump has no statement for it.
    pub fn build(
        &self,
        text: &str,
        target: TargetKind,
        source_table: Option<&str>,
    ) -> Result<PreviewData, EngineError> {
        let limits = self.config.preview;
        let mut tables = TableList::default();
        let mut selected: Option<String> = source_table.map(str::to_owned);

        let mut columns: Vec<String> = Vec::new();
        let mut seen_columns: FxHashSet<String> = fx_hash_set();
        let mut sample = Vec::with_capacity(limits.sample_size);
        let mut total_rows = 0_u64;
        let mut malformed_count = 0_u64;
        let mut parse_issues = Vec::new();

        let mut parser = DumpParser::new(text);
        for item in parser.by_ref() {
            match item {
                Ok(row) => {
                    tables.note(&row.table);
                    let selected = selected.get_or_insert_with(|| row.table.to_string());
                    if !row.table.eq_ignore_ascii_case(selected) {
                        continue;
                    }

                    total_rows += 1;
                    for column in row.columns.iter() {
                        if seen_columns.insert(column.to_ascii_lowercase()) {
                            columns.push(column.clone());
                        }
                    }
                    if sample.len() < limits.sample_size {
                        sample.push(row);
                    }
                }
                Err(issue) => {
                    debug!(issue = %issue, "Malformed input in preview");
                    if let Some(table) = issue.table.as_deref() {
                        tables.note(table);
                    }
                    malformed_count += 1;
                    if parse_issues.len() < limits.max_reported_issues {
                        parse_issues.push(issue);
                    }
                }
            }
        }

        let source_table = match (selected, source_table) {
            (Some(wanted), Some(_)) => tables.resolve(&wanted).ok_or_else(|| {
                EngineError::SourceTableNotFound {
                    table: wanted,
                    available: tables.names.clone(),
                }
            })?,
            (Some(first), None) => first,
            // No well-formed row anywhere: fall back to the first table named.
            (None, _) => tables.names.first().cloned().unwrap_or_default(),
        };
        let other_tables = tables
            .names
            .into_iter()
            .filter(|t| !t.eq_ignore_ascii_case(&source_table))
            .collect();

        let schema = schema(target);
        let suggested_mapping = suggest_mapping(schema, &columns, &self.config.mapping.synonyms);
        let unmapped_required = schema
            .required_fields()
            .filter(|rule| suggested_mapping.source_for(rule.name).is_none())
            .map(|rule| rule.name.to_owned())
            .collect();

        info!(
            source_table = %source_table,
            target = %target,
            rows = total_rows,
            malformed = malformed_count,
            statements = parser.statements_seen(),
            tuples = parser.rows_seen(),
            mapped = suggested_mapping.len(),
            "Built preview"
        );

        Ok(PreviewData {
            source_table,
            target,
            columns,
            sample,
            total_rows,
            malformed_count,
            parse_issues,
            other_tables,
            suggested_mapping,
            unmapped_required,
        })
    }
}

/// Table names in first-seen order, deduplicated ignoring ASCII case.
#[derive(Debug, Default)]
struct TableList {
    names: Vec<String>,
}

impl TableList {
    fn note(&mut self, table: &str) {
        if self.resolve(table).is_none() {
            self.names.push(table.to_owned());
        }
    }

    /// The dump's spelling of `table`.
    fn resolve(&self, table: &str) -> Option<String> {
        self.names
            .iter()
            .find(|t| t.eq_ignore_ascii_case(table))
            .cloned()
    }
}

/// Suggests a mapping from source `columns` onto the fields of `schema`.
///
/// Two passes over the target fields, in catalog order:
///
/// 1. A column whose name equals the field name, ignoring ASCII case
/// 2. A column whose normalized name (lowercase, separators removed) equals
///    the normalized field name or one of its aliases, built-in or from
///    `extra_synonyms`
///
/// Each column is suggested for at most one field. Fields without a match
/// are left out.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
///
/// use hm_engine::suggest_mapping;
/// use hm_schema::PATIENTS;
///
/// let columns = ["DOB".to_owned(), "First Name".to_owned(), "sex".to_owned()];
/// let mapping = suggest_mapping(&PATIENTS, &columns, &BTreeMap::new());
///
/// assert_eq!(mapping.source_for("date_of_birth"), Some("DOB"));
/// assert_eq!(mapping.source_for("first_name"), Some("First Name"));
/// assert_eq!(mapping.source_for("gender"), Some("sex"));
/// assert_eq!(mapping.source_for("last_name"), None);
/// ```
#[must_use]
pub fn suggest_mapping(
    schema: &TargetSchema,
    columns: &[String],
    extra_synonyms: &BTreeMap<String, Vec<String>>,
) -> FieldMapping {
    let mut mapping = FieldMapping::new();
    let mut used = vec![false; columns.len()];

    for rule in schema.fields {
        let hit = columns
            .iter()
            .enumerate()
            .find(|(idx, column)| !used[*idx] && column.trim().eq_ignore_ascii_case(rule.name));
        if let Some((idx, column)) = hit {
            used[idx] = true;
            mapping.insert(rule.name, column.clone());
        }
    }

    let normalized: Vec<String> = columns.iter().map(|c| normalize(c)).collect();
    for rule in schema.fields {
        if mapping.source_for(rule.name).is_some() {
            continue;
        }

        let builtin = SYNONYMS
            .iter()
            .find(|(field, _)| *field == rule.name)
            .map_or(&[][..], |(_, aliases)| aliases);
        let configured = extra_synonyms.get(rule.name).map_or(&[][..], Vec::as_slice);
        let aliases: Vec<String> = std::iter::once(rule.name)
            .chain(builtin.iter().copied())
            .chain(configured.iter().map(String::as_str))
            .map(normalize)
            .collect();

        let hit = normalized
            .iter()
            .enumerate()
            .find(|(idx, name)| !used[*idx] && aliases.contains(name));
        if let Some((idx, _)) = hit {
            used[idx] = true;
            mapping.insert(rule.name, columns[idx].clone());
        }
    }

    debug!(target = %schema.target, mapped = mapping.len(), "Suggested mapping");
    mapping
}

/// Lowercases and drops everything but letters and digits.
fn normalize(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
