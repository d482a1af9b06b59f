//! Configuration structures for the migration engine.
//!
//! This module provides configuration types for each stage of a migration:
//!
//! - [`PreviewConfig`] - Sample size and issue reporting for previews
//! - [`MappingConfig`] - Extra column-name synonyms for mapping suggestions
//! - [`ExecuteConfig`] - Scope, parallelism and progress reporting for runs
//! - [`Config`] - Root configuration combining all settings
//!
//! All configuration types implement [`Default`], and every section is
//! `#[serde(default)]` so partial JSON files are accepted.

use std::collections::BTreeMap;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for the preview step.
///
/// # Examples
///
/// ```
/// use hm_core::PreviewConfig;
///
/// let config = PreviewConfig::default();
/// assert_eq!(config.sample_size, 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Maximum number of valid rows included in a preview sample.
    pub sample_size: usize,

    /// Maximum number of parse issues carried in a preview.
    ///
    /// The malformed-row count is always exact; only the issue list is capped.
    pub max_reported_issues: usize,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            sample_size: 10,
            max_reported_issues: 50,
        }
    }
}

/// Configuration for mapping suggestions.
///
/// `synonyms` extends the built-in synonym table: each key is a target field
/// name and each value lists source column aliases for it.
///
/// # Examples
///
/// ```
/// use hm_core::MappingConfig;
///
/// let json = r#"{"synonyms": {"first_name": ["given"]}}"#;
/// let config: MappingConfig = serde_json::from_str(json).unwrap();
/// assert_eq!(config.synonyms["first_name"], vec!["given"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    /// Additional target field → source alias entries.
    pub synonyms: BTreeMap<String, Vec<String>>,
}

/// Configuration for migration runs.
///
/// # Examples
///
/// ```
/// use hm_core::ExecuteConfig;
///
/// let config = ExecuteConfig::default();
/// assert!(config.scope.is_none());
/// assert!(config.parallel_validation);
/// assert_eq!(config.progress_interval, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecuteConfig {
    /// Organisational unit that dedup lookups and inserts are scoped to.
    pub scope: Option<String>,

    /// Whether row projection and validation may run on the rayon pool.
    ///
    /// Writes are always sequential within a run.
    pub parallel_validation: bool,

    /// Emit a progress log line every this many processed rows.
    pub progress_interval: u64,
}

impl Default for ExecuteConfig {
    fn default() -> Self {
        Self {
            scope: None,
            parallel_validation: true,
            progress_interval: 100,
        }
    }
}

/// Root configuration for the migration engine.
///
/// # Examples
///
/// ```
/// use hm_core::Config;
///
/// let config = Config::default();
/// let json = serde_json::to_string_pretty(&config).unwrap();
/// assert!(json.contains("sample_size"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Preview configuration.
    pub preview: PreviewConfig,

    /// Mapping suggestion configuration.
    pub mapping: MappingConfig,

    /// Migration run configuration.
    pub execute: ExecuteConfig,
}

impl Config {
    /// Loads and validates a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingFile`] if `path` does not exist
    /// - [`ConfigError::Io`] / [`ConfigError::Parse`] on read or parse failure
    /// - [`ConfigError::InvalidOption`] if [`validate`](Self::validate) fails
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::MissingFile(path.to_owned()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks option values that the type system cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] for a zero sample size, a zero
    /// progress interval, or an empty synonym alias.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.preview.sample_size == 0 {
            return Err(ConfigError::invalid_option(
                "preview.sample_size",
                "must be at least 1",
            ));
        }

        if self.execute.progress_interval == 0 {
            return Err(ConfigError::invalid_option(
                "execute.progress_interval",
                "must be at least 1",
            ));
        }

        for (field, aliases) in &self.mapping.synonyms {
            if aliases.iter().any(|alias| alias.trim().is_empty()) {
                return Err(ConfigError::invalid_option(
                    format!("mapping.synonyms.{field}"),
                    "aliases must not be blank",
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use camino::Utf8PathBuf;

    use super::*;

    #[test]
    fn test_preview_config_defaults() {
        let config = PreviewConfig::default();
        assert_eq!(config.sample_size, 10);
        assert_eq!(config.max_reported_issues, 50);
    }

    #[test]
    fn test_execute_config_defaults() {
        let config = ExecuteConfig::default();
        assert_eq!(config.scope, None);
        assert!(config.parallel_validation);
        assert_eq!(config.progress_interval, 100);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_config_deserialize_with_missing_fields() {
        let json = r#"{"execute": {"scope": "north-wing"}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.execute.scope.as_deref(), Some("north-wing"));
        // Other fields should have defaults
        assert!(config.execute.parallel_validation);
        assert_eq!(config.preview.sample_size, 10);
    }

    #[test]
    fn test_validate_rejects_zero_sample_size() {
        let mut config = Config::default();
        config.preview.sample_size = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("preview.sample_size"));
    }

    #[test]
    fn test_validate_rejects_blank_alias() {
        let mut config = Config::default();
        config
            .mapping
            .synonyms
            .insert("first_name".to_owned(), vec!["  ".to_owned()]);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("mapping.synonyms.first_name"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Utf8Path::new("/nonexistent/hm-config.json")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"preview": {{"sample_size": 3}}}}"#).unwrap();
        let path = Utf8PathBuf::from_path_buf(file.path().to_path_buf()).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.preview.sample_size, 3);
        assert_eq!(config.preview.max_reported_issues, 50);
    }
}
