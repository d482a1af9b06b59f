//! Operator-confirmed field mappings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Maps target field names to source column names.
///
/// Keyed by target field so a field maps from at most one column. Ordering is
/// deterministic, which keeps serialized previews stable.
///
/// # Examples
///
/// ```
/// use hm_core::FieldMapping;
///
/// let mapping = FieldMapping::new()
///     .with("first_name", "fname")
///     .with("last_name", "lname");
///
/// assert_eq!(mapping.source_for("first_name"), Some("fname"));
/// assert_eq!(mapping.source_for("email"), None);
/// assert_eq!(mapping.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMapping {
    fields: BTreeMap<String, String>,
}

impl FieldMapping {
    /// Creates an empty mapping.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `target_field ← source_column`, builder style.
    #[must_use]
    pub fn with(mut self, target_field: impl Into<String>, source_column: impl Into<String>) -> Self {
        self.insert(target_field, source_column);
        self
    }

    /// Adds or replaces the source column for `target_field`.
    ///
    /// Returns the previously mapped column, if any.
    pub fn insert(
        &mut self,
        target_field: impl Into<String>,
        source_column: impl Into<String>,
    ) -> Option<String> {
        self.fields.insert(target_field.into(), source_column.into())
    }

    /// Removes the mapping for `target_field`.
    pub fn remove(&mut self, target_field: &str) -> Option<String> {
        self.fields.remove(target_field)
    }

    /// Returns the source column mapped to `target_field`.
    #[must_use]
    pub fn source_for(&self, target_field: &str) -> Option<&str> {
        self.fields.get(target_field).map(String::as_str)
    }

    /// Iterates over `(target_field, source_column)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(t, s)| (t.as_str(), s.as_str()))
    }

    /// Number of mapped fields.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if nothing is mapped.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<T: Into<String>, S: Into<String>> FromIterator<(T, S)> for FieldMapping {
    fn from_iter<I: IntoIterator<Item = (T, S)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(t, s)| (t.into(), s.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces() {
        let mut mapping = FieldMapping::new().with("first_name", "fname");
        let previous = mapping.insert("first_name", "given_name");
        assert_eq!(previous.as_deref(), Some("fname"));
        assert_eq!(mapping.source_for("first_name"), Some("given_name"));
        assert_eq!(mapping.len(), 1);
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let mapping: FieldMapping = [("last_name", "lname"), ("first_name", "fname")]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&mapping).unwrap();
        assert_eq!(json, r#"{"first_name":"fname","last_name":"lname"}"#);

        let parsed: FieldMapping = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, mapping);
    }
}
