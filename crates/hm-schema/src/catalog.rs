//! The built-in schema catalog.
//!
//! Each supported [`TargetKind`] has a static [`TargetSchema`]: its ordered
//! field rules and the fields forming its dedup key. The catalog is plain
//! data, fixed at compile time and never mutated.
//!
//! # Built-in Targets
//!
//! | Target | Dedup key | Key case rules |
//! |--------|-----------|----------------|
//! | `patients` | `identification_card_number` | exact |
//! | `lab_results` | `patient_identification_card_number`, `test_name`, `test_date` | `test_name` ignores case |

use serde::Serialize;

use hm_core::{TargetKind, UnknownTarget};

/// Sixteen ASCII digits, the shape of a national identification card number.
const ICN_PATTERN: &str = r"^\d{16}$";

/// The declared type of a target field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Free text (numeric literals are accepted and stringified).
    String,
    /// A finite number.
    Number,
    /// A calendar date.
    Date,
    /// An email address.
    Email,
    /// One of the rule's allowed values.
    Enum,
}

impl FieldType {
    /// Name used in type-mismatch messages.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Date => "date",
            Self::Email => "email",
            Self::Enum => "enum",
        }
    }
}

/// The validation rule for one target field.
///
/// Rules are built with `const` builder methods so catalogs can be declared
/// as statics.
///
/// # Examples
///
/// ```
/// use hm_schema::{FieldRule, FieldType};
///
/// const RULE: FieldRule = FieldRule::new("phone_number", FieldType::String).max_length(20);
/// assert!(!RULE.required);
/// assert_eq!(RULE.max_length, Some(20));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldRule {
    /// Target field name.
    pub name: &'static str,
    /// Whether a non-blank value must be present.
    pub required: bool,
    /// Declared type.
    pub field_type: FieldType,
    /// Maximum length in characters, for text-like types.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Allowed values; empty means unrestricted.
    #[serde(skip_serializing_if = "is_unrestricted")]
    pub allowed: &'static [&'static str],
    /// Regular expression the text must match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<&'static str>,
    /// Whether enum membership and dedup keys ignore case.
    pub case_insensitive: bool,
}

impl FieldRule {
    /// Creates an optional rule with no further constraints.
    #[must_use]
    pub const fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            required: false,
            field_type,
            max_length: None,
            allowed: &[],
            pattern: None,
            case_insensitive: false,
        }
    }

    /// Marks the field as required.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the maximum length in characters.
    #[must_use]
    pub const fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    /// Restricts the field to `values`.
    #[must_use]
    pub const fn allowed(mut self, values: &'static [&'static str]) -> Self {
        self.allowed = values;
        self
    }

    /// Requires the text to match `pattern`.
    #[must_use]
    pub const fn pattern(mut self, pattern: &'static str) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Makes comparisons on this field ignore case.
    #[must_use]
    pub const fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    /// Finds the declared spelling of `value` among the allowed values.
    #[must_use]
    pub fn allowed_match(&self, value: &str) -> Option<&'static str> {
        self.allowed.iter().copied().find(|allowed| {
            if self.case_insensitive {
                allowed.eq_ignore_ascii_case(value)
            } else {
                *allowed == value
            }
        })
    }
}

/// A target's field rules and dedup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TargetSchema {
    /// The target this schema describes.
    pub target: TargetKind,
    /// Field rules, in validation order.
    pub fields: &'static [FieldRule],
    /// Fields forming the natural key, in key order.
    pub dedup_key: &'static [&'static str],
}

impl TargetSchema {
    /// Looks up a field rule by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&'static FieldRule> {
        self.fields.iter().find(|rule| rule.name == name)
    }

    /// Returns `true` if the schema declares `name`.
    #[inline]
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Iterates over the required fields, in rule order.
    pub fn required_fields(&self) -> impl Iterator<Item = &'static FieldRule> {
        self.fields.iter().filter(|rule| rule.required)
    }
}

fn is_unrestricted(values: &&'static [&'static str]) -> bool {
    values.is_empty()
}

static PATIENT_FIELDS: [FieldRule; 9] = [
    FieldRule::new("first_name", FieldType::String)
        .required()
        .max_length(100),
    FieldRule::new("last_name", FieldType::String)
        .required()
        .max_length(100),
    FieldRule::new("identification_card_number", FieldType::String)
        .required()
        .max_length(16)
        .pattern(ICN_PATTERN),
    FieldRule::new("date_of_birth", FieldType::Date),
    FieldRule::new("gender", FieldType::Enum)
        .allowed(&["male", "female", "other"])
        .case_insensitive(),
    FieldRule::new("email", FieldType::Email).max_length(255),
    FieldRule::new("phone_number", FieldType::String).max_length(20),
    FieldRule::new("address", FieldType::String).max_length(255),
    FieldRule::new("blood_type", FieldType::Enum)
        .allowed(&["A+", "A-", "B+", "B-", "AB+", "AB-", "O+", "O-"])
        .case_insensitive(),
];

static LAB_RESULT_FIELDS: [FieldRule; 8] = [
    FieldRule::new("patient_identification_card_number", FieldType::String)
        .required()
        .pattern(ICN_PATTERN),
    FieldRule::new("test_name", FieldType::String)
        .required()
        .max_length(100)
        .case_insensitive(),
    FieldRule::new("test_date", FieldType::Date).required(),
    FieldRule::new("result_value", FieldType::Number).required(),
    FieldRule::new("unit", FieldType::String).max_length(20),
    FieldRule::new("reference_range", FieldType::String).max_length(50),
    FieldRule::new("status", FieldType::Enum)
        .allowed(&["pending", "completed", "cancelled"])
        .case_insensitive(),
    FieldRule::new("notes", FieldType::String).max_length(1000),
];

/// Schema of the `patients` target.
pub static PATIENTS: TargetSchema = TargetSchema {
    target: TargetKind::Patients,
    fields: &PATIENT_FIELDS,
    dedup_key: &["identification_card_number"],
};

/// Schema of the `lab_results` target.
pub static LAB_RESULTS: TargetSchema = TargetSchema {
    target: TargetKind::LabResults,
    fields: &LAB_RESULT_FIELDS,
    dedup_key: &["patient_identification_card_number", "test_name", "test_date"],
};

/// Returns the schema of `target`.
///
/// # Examples
///
/// ```
/// use hm_core::TargetKind;
///
/// let schema = hm_schema::schema(TargetKind::Patients);
/// assert_eq!(schema.dedup_key, ["identification_card_number"]);
/// ```
#[must_use]
pub const fn schema(target: TargetKind) -> &'static TargetSchema {
    match target {
        TargetKind::Patients => &PATIENTS,
        TargetKind::LabResults => &LAB_RESULTS,
    }
}

/// Returns the schema named `name` (case-insensitive).
///
/// # Errors
///
/// Returns [`UnknownTarget`] if `name` is not a supported target.
///
/// # Examples
///
/// ```
/// let schema = hm_schema::lookup("lab_results")?;
/// assert_eq!(schema.fields.len(), 8);
/// assert!(hm_schema::lookup("invoices").is_err());
/// # Ok::<(), hm_core::UnknownTarget>(())
/// ```
pub fn lookup(name: &str) -> Result<&'static TargetSchema, UnknownTarget> {
    name.parse().map(schema)
}

/// Ordered field rules of `target`.
#[inline]
#[must_use]
pub const fn rules_for(target: TargetKind) -> &'static [FieldRule] {
    schema(target).fields
}

/// Dedup key fields of `target`.
#[inline]
#[must_use]
pub const fn dedup_key_for(target: TargetKind) -> &'static [&'static str] {
    schema(target).dedup_key
}

/// Every built-in schema, in catalog order.
pub fn all() -> impl Iterator<Item = &'static TargetSchema> {
    TargetKind::ALL.into_iter().map(schema)
}
