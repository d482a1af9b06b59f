//! Natural (dedup) keys.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use hm_core::Record;

use crate::catalog::TargetSchema;

/// The normalized values of a record's dedup-key fields, in key order.
///
/// Each part is the rendered value, trimmed, and lowercased when the field's
/// rule is case-insensitive. Two records are the same entity iff their keys
/// are equal.
///
/// # Examples
///
/// ```
/// use hm_core::{Record, Value};
/// use hm_schema::{LAB_RESULTS, dedup_key};
///
/// let mut record = Record::new();
/// record.insert("patient_identification_card_number".into(), Value::from("1234567890123456"));
/// record.insert("test_name".into(), Value::from("HbA1c"));
/// record.insert("test_date".into(), Value::from("2024-01-15"));
///
/// let key = dedup_key(&LAB_RESULTS, &record).unwrap();
/// assert_eq!(key.to_string(), "1234567890123456 / hba1c / 2024-01-15");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DedupKey(SmallVec<[String; 3]>);

impl DedupKey {
    /// The key parts, in key order.
    #[inline]
    #[must_use]
    pub fn parts(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" / "))
    }
}

/// Computes the dedup key of a (coerced) record.
///
/// Returns `None` if any key field is absent or blank. Required-field
/// validation makes that impossible for records that passed
/// [`Validator::validate`](crate::Validator::validate).
#[must_use]
pub fn dedup_key(schema: &TargetSchema, record: &Record) -> Option<DedupKey> {
    schema
        .dedup_key
        .iter()
        .map(|name| {
            let value = record.get(*name).filter(|v| !v.is_blank())?;
            let rendered = value.render();
            let part = rendered.trim();
            let case_insensitive = schema.field(name).is_some_and(|rule| rule.case_insensitive);
            Some(if case_insensitive {
                part.to_lowercase()
            } else {
                part.to_owned()
            })
        })
        .collect::<Option<SmallVec<_>>>()
        .map(DedupKey)
}
