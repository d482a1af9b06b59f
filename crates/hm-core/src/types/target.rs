//! The closed set of migration targets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UnknownTarget;

/// A destination table in the current schema.
///
/// The set is closed: parsing any other identifier yields [`UnknownTarget`].
///
/// # Examples
///
/// ```
/// use hm_core::TargetKind;
///
/// let target: TargetKind = "lab_results".parse().unwrap();
/// assert_eq!(target, TargetKind::LabResults);
/// assert_eq!(target.as_str(), "lab_results");
/// assert!("invoices".parse::<TargetKind>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// Patient demographics.
    Patients,
    /// Laboratory test results.
    LabResults,
}

impl TargetKind {
    /// Every supported target, in catalog order.
    pub const ALL: [Self; 2] = [Self::Patients, Self::LabResults];

    /// The target's table name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Patients => "patients",
            Self::LabResults => "lab_results",
        }
    }

    /// A human-readable label.
    #[inline]
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Patients => "Patients",
            Self::LabResults => "Lab results",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetKind {
    type Err = UnknownTarget;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownTarget(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_is_case_insensitive() {
        assert_eq!("PATIENTS".parse::<TargetKind>(), Ok(TargetKind::Patients));
        assert_eq!(" lab_results ".parse::<TargetKind>(), Ok(TargetKind::LabResults));
    }

    #[test]
    fn test_from_str_unknown() {
        let err = "doctors".parse::<TargetKind>().unwrap_err();
        assert_eq!(err, UnknownTarget("doctors".to_owned()));
    }

    #[test]
    fn test_serialization() {
        assert_eq!(
            serde_json::to_string(&TargetKind::LabResults).unwrap(),
            r#""lab_results""#
        );
    }
}
