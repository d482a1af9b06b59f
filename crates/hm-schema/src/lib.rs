//! Target schema catalog and field validation.
//!
//! This crate describes what the current schema accepts and checks candidate
//! records against it:
//!
//! - [`catalog`]: the closed set of targets, their ordered [`FieldRule`]s and
//!   dedup keys
//! - [`Validator`]: field-level validation and coercion to canonical values
//! - [`DedupKey`]: the natural key used to tell inserts from updates
//!
//! # Examples
//!
//! ```
//! use hm_core::{Record, TargetKind, Value};
//! use hm_schema::{Validator, dedup_key};
//!
//! let validator = Validator::for_target(TargetKind::Patients)?;
//!
//! let mut record = Record::new();
//! record.insert("first_name".into(), Value::from("Ann"));
//! record.insert("last_name".into(), Value::from("Lee"));
//! record.insert("identification_card_number".into(), Value::from("1234567890123456"));
//!
//! let canonical = validator.check(&record).expect("valid record");
//! let key = dedup_key(validator.schema(), &canonical);
//! assert_eq!(key.unwrap().to_string(), "1234567890123456");
//! # Ok::<(), hm_schema::CatalogError>(())
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod catalog;
pub mod error;
mod key;
mod validator;

pub use catalog::{
    FieldRule, FieldType, LAB_RESULTS, PATIENTS, TargetSchema, dedup_key_for, lookup, rules_for,
    schema,
};
pub use error::CatalogError;
pub use key::{DedupKey, dedup_key};
pub use validator::{Validator, parse_date, validate};
