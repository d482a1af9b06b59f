//! Field validation and coercion.
//!
//! A [`Validator`] checks one candidate record against a target's rules and,
//! once the record is valid, coerces it to the canonical form written to the
//! datastore.
//!
//! # Rule Order
//!
//! Rules are applied in catalog order. For each rule:
//!
//! 1. Absent or blank and required: exactly one `Required` error, nothing else
//! 2. Absent or blank and optional: no checks
//! 3. Otherwise the type-specific checks run, and may report several errors
//!    for the same field (e.g. too long *and* not matching the pattern)

use std::borrow::Cow;
use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

use hm_core::{FieldError, FieldErrorKind, Record, TargetKind, Value};

use crate::catalog::{FieldRule, FieldType, TargetSchema, schema};
use crate::error::CatalogError;

/// Conservative `local@domain.tld` shape: no whitespace, exactly one `@`.
const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

/// Accepted date shapes, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Accepted date-time shapes; the time part is dropped.
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

static PATIENTS_VALIDATOR: OnceLock<Validator> = OnceLock::new();
static LAB_RESULTS_VALIDATOR: OnceLock<Validator> = OnceLock::new();

/// Validates and coerces records for one target.
///
/// Construction compiles the target's patterns; reuse one validator for a
/// whole run, or use the cached [`Validator::for_target`]. Validators are
/// `Send + Sync` and can be shared across rayon workers.
///
/// # Examples
///
/// ```
/// use hm_core::{FieldErrorKind, Record, TargetKind, Value};
/// use hm_schema::Validator;
///
/// let validator = Validator::for_target(TargetKind::Patients)?;
///
/// let mut record = Record::new();
/// record.insert("first_name".into(), Value::from("Bo"));
/// record.insert("last_name".into(), Value::from("Ng"));
/// record.insert("identification_card_number".into(), Value::from("bad-icn"));
///
/// let errors = validator.validate(&record);
/// assert_eq!(errors.len(), 1);
/// assert_eq!(errors[0].field, "identification_card_number");
/// assert!(matches!(errors[0].kind, FieldErrorKind::PatternMismatch { .. }));
/// # Ok::<(), hm_schema::CatalogError>(())
/// ```
#[derive(Debug)]
pub struct Validator {
    schema: &'static TargetSchema,
    /// Compiled patterns, parallel to `schema.fields`.
    patterns: Vec<Option<Regex>>,
    email: Regex,
}

impl Validator {
    /// Creates a validator for `schema`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidPattern`] if a field pattern does not
    /// compile.
    pub fn new(schema: &'static TargetSchema) -> Result<Self, CatalogError> {
        let compile = |field: &'static str, pattern: &str| {
            Regex::new(pattern).map_err(|source| CatalogError::InvalidPattern {
                target: schema.target,
                field,
                source,
            })
        };

        let patterns = schema
            .fields
            .iter()
            .map(|rule| rule.pattern.map(|p| compile(rule.name, p)).transpose())
            .collect::<Result<Vec<_>, _>>()?;
        let email = compile("email", EMAIL_PATTERN)?;

        Ok(Self {
            schema,
            patterns,
            email,
        })
    }

    /// Returns the shared validator for a built-in target.
    ///
    /// The validator is built once and cached for all subsequent calls.
    /// This function is thread-safe.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidPattern`] if a field pattern does not
    /// compile.
    pub fn for_target(target: TargetKind) -> Result<&'static Self, CatalogError> {
        let cell = match target {
            TargetKind::Patients => &PATIENTS_VALIDATOR,
            TargetKind::LabResults => &LAB_RESULTS_VALIDATOR,
        };
        if let Some(validator) = cell.get() {
            return Ok(validator);
        }

        let validator = Self::new(schema(target))?;
        Ok(cell.get_or_init(|| validator))
    }

    /// The schema this validator checks against.
    #[inline]
    #[must_use]
    pub const fn schema(&self) -> &'static TargetSchema {
        self.schema
    }

    /// Validates `record`, returning every field error in rule order.
    ///
    /// An empty result means the record is valid. Keys that no rule
    /// declares are ignored.
    #[must_use]
    pub fn validate(&self, record: &Record) -> Vec<FieldError> {
        let mut errors = Vec::new();
        for (rule, pattern) in self.schema.fields.iter().zip(&self.patterns) {
            match record.get(rule.name) {
                Some(value) if !value.is_blank() => {
                    self.check_value(rule, pattern.as_ref(), value, &mut errors);
                }
                _ if rule.required => errors.push(FieldError::new(rule.name, FieldErrorKind::Required)),
                _ => {}
            }
        }
        errors
    }

    fn check_value(
        &self,
        rule: &FieldRule,
        pattern: Option<&Regex>,
        value: &Value,
        errors: &mut Vec<FieldError>,
    ) {
        let mut push = |kind| errors.push(FieldError::new(rule.name, kind));

        match rule.field_type {
            FieldType::Number => {
                if value.as_f64().is_none() {
                    push(FieldErrorKind::NotANumber);
                }
            }
            FieldType::Date => {
                if parse_date(value).is_none() {
                    push(FieldErrorKind::InvalidDate);
                }
            }
            FieldType::String | FieldType::Email | FieldType::Enum => {
                let Some(text) = text_of(value) else {
                    push(FieldErrorKind::TypeMismatch {
                        expected: rule.field_type.as_str().to_owned(),
                        found: value.type_name().to_owned(),
                    });
                    return;
                };

                if let Some(max) = rule.max_length {
                    let actual = text.chars().count();
                    if actual > max {
                        push(FieldErrorKind::TooLong { max, actual });
                    }
                }
                if !rule.allowed.is_empty() && rule.allowed_match(&text).is_none() {
                    push(FieldErrorKind::NotAllowed {
                        allowed: rule.allowed.iter().map(|v| (*v).to_owned()).collect(),
                    });
                }
                if pattern.is_some_and(|regex| !regex.is_match(&text)) {
                    push(FieldErrorKind::PatternMismatch {
                        pattern: rule.pattern.unwrap_or_default().to_owned(),
                    });
                }
                if rule.field_type == FieldType::Email && !self.email.is_match(&text) {
                    push(FieldErrorKind::InvalidEmail);
                }
            }
        }
    }

    /// Converts a valid record into its canonical form.
    ///
    /// Only declared fields are kept. Text is trimmed, numbers become
    /// [`Value::Integer`] or [`Value::Float`], dates become [`Value::Date`]
    /// and enum values take their declared spelling. Blank values become
    /// [`Value::Null`]. Values that cannot be converted are kept as they are,
    /// so call this only after [`validate`](Self::validate) returned no
    /// errors.
    #[must_use]
    pub fn coerce(&self, record: &Record) -> Record {
        self.schema
            .fields
            .iter()
            .filter_map(|rule| {
                let value = record.get(rule.name)?;
                Some((rule.name.to_owned(), coerce_value(rule, value)))
            })
            .collect()
    }

    /// Validates and coerces in one step.
    ///
    /// # Errors
    ///
    /// Returns the field errors if the record is invalid.
    pub fn check(&self, record: &Record) -> Result<Record, Vec<FieldError>> {
        let errors = self.validate(record);
        if errors.is_empty() {
            Ok(self.coerce(record))
        } else {
            Err(errors)
        }
    }
}

/// Validates `record` against the built-in rules of `target`.
///
/// # Errors
///
/// Returns [`CatalogError::InvalidPattern`] if the target's validator
/// cannot be built.
pub fn validate(record: &Record, target: TargetKind) -> Result<Vec<FieldError>, CatalogError> {
    Ok(Validator::for_target(target)?.validate(record))
}

/// Text view of a value for text-like fields: trimmed text, or a rendered
/// number.
fn text_of(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::Text(s) => Some(Cow::Borrowed(s.trim())),
        Value::Integer(_) | Value::Float(_) => Some(value.render()),
        Value::Null | Value::Bool(_) | Value::Date(_) => None,
    }
}

/// Reads a calendar date from a date value or date-shaped text.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use hm_core::Value;
/// use hm_schema::parse_date;
///
/// let expected = NaiveDate::from_ymd_opt(1990, 4, 2);
/// assert_eq!(parse_date(&Value::from("1990-04-02")), expected);
/// assert_eq!(parse_date(&Value::from("1990/04/02")), expected);
/// assert_eq!(parse_date(&Value::from("1990-04-02 08:30:00")), expected);
/// assert_eq!(parse_date(&Value::from("1990-02-30")), None);
/// ```
#[must_use]
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Date(d) => Some(*d),
        Value::Text(s) => {
            let s = s.trim();
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .or_else(|| {
                    DATETIME_FORMATS
                        .iter()
                        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                        .map(|dt| dt.date())
                })
        }
        _ => None,
    }
}

fn coerce_value(rule: &FieldRule, value: &Value) -> Value {
    if value.is_blank() {
        return Value::Null;
    }
    match rule.field_type {
        FieldType::Number => match value {
            Value::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .map(Value::Integer)
                    .or_else(|_| s.parse::<f64>().map(Value::Float))
                    .unwrap_or_else(|_| value.clone())
            }
            _ => value.clone(),
        },
        FieldType::Date => parse_date(value).map_or_else(|| value.clone(), Value::Date),
        FieldType::Enum => text_of(value)
            .and_then(|text| rule.allowed_match(&text))
            .map_or_else(|| value.clone(), Value::from),
        FieldType::String | FieldType::Email => text_of(value)
            .map_or_else(|| value.clone(), |text| Value::Text(text.into_owned())),
    }
}
