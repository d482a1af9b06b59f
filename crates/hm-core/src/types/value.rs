//! Typed literal values.
//!
//! Dump literals and candidate record fields are carried as [`Value`], a
//! tagged variant, so validation can match on every shape exhaustively.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A candidate record keyed by target field name.
///
/// `BTreeMap` keeps field iteration deterministic for logging and
/// serialization.
pub type Record = BTreeMap<String, Value>;

/// A single typed value.
///
/// The parser only produces [`Null`](Self::Null), [`Bool`](Self::Bool),
/// [`Integer`](Self::Integer), [`Float`](Self::Float) and
/// [`Text`](Self::Text). [`Date`](Self::Date) appears once a validated record
/// is coerced to its target's declared types.
///
/// # Examples
///
/// ```
/// use hm_core::Value;
///
/// let v = Value::from("Ann");
/// assert_eq!(v.as_text(), Some("Ann"));
/// assert!(!v.is_blank());
/// assert!(Value::Null.is_blank());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// SQL `NULL`.
    Null,
    /// `TRUE` / `FALSE`.
    Bool(bool),
    /// Integral number that fits in an `i64`.
    Integer(i64),
    /// Any other number.
    Float(f64),
    /// Text (quoted strings, and unrecognized bare tokens).
    Text(String),
    /// Calendar date.
    Date(NaiveDate),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns `true` if this value counts as "empty" for required checks:
    /// `NULL`, or text that is blank after trimming.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Bool(_) | Self::Integer(_) | Self::Float(_) | Self::Date(_) => false,
        }
    }

    /// Returns the inner string for [`Value::Text`].
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as `f64` if it is numeric or numeric text.
    ///
    /// # Examples
    ///
    /// ```
    /// use hm_core::Value;
    ///
    /// assert_eq!(Value::Integer(4).as_f64(), Some(4.0));
    /// assert_eq!(Value::from(" 5.5 ").as_f64(), Some(5.5));
    /// assert_eq!(Value::from("five").as_f64(), None);
    /// ```
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => f.is_finite().then_some(*f),
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            Self::Null | Self::Bool(_) | Self::Date(_) => None,
        }
    }

    /// A short name for the variant, used in type-mismatch messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Float(_) => "number",
            Self::Text(_) => "text",
            Self::Date(_) => "date",
        }
    }

    /// Renders the value as text without allocating for [`Value::Text`].
    ///
    /// `NULL` renders as the empty string and dates as `YYYY-MM-DD`.
    ///
    /// # Examples
    ///
    /// ```
    /// use hm_core::Value;
    ///
    /// assert_eq!(Value::Integer(42).render(), "42");
    /// assert_eq!(Value::Null.render(), "");
    /// ```
    #[must_use]
    pub fn render(&self) -> Cow<'_, str> {
        match self {
            Self::Null => Cow::Borrowed(""),
            Self::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
            Self::Integer(i) => Cow::Owned(i.to_string()),
            Self::Float(f) => Cow::Owned(f.to_string()),
            Self::Text(s) => Cow::Borrowed(s),
            Self::Date(d) => Cow::Owned(d.format("%Y-%m-%d").to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Text(s) => write!(f, "'{s}'"),
            other => f.write_str(&other.render()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}
