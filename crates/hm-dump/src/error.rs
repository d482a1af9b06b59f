//! Error types for the hm-dump crate.
//!
//! Parsing itself never fails: malformed input is reported row by row as
//! [`ParseIssue`](hm_core::ParseIssue). [`DumpError`] only covers getting the
//! dump text into memory.

use camino::Utf8PathBuf;

/// Errors that can occur while loading a dump file.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use hm_dump::{DumpError, read_dump};
///
/// let err = read_dump(Utf8Path::new("/nonexistent/dump.sql")).unwrap_err();
/// assert!(matches!(err, DumpError::NotFound(_)));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    /// The dump file does not exist.
    #[error("dump file not found: {0}")]
    NotFound(Utf8PathBuf),

    /// The dump file could not be read.
    #[error("failed to read dump file {path}: {source}")]
    Read {
        /// Path of the dump file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The dump file is not valid UTF-8.
    #[error("dump file {path} is not valid UTF-8 (first bad byte at offset {offset})")]
    Encoding {
        /// Path of the dump file.
        path: Utf8PathBuf,
        /// Byte offset of the first invalid sequence.
        offset: usize,
    },
}

impl DumpError {
    /// Creates a read error.
    #[must_use]
    pub fn read(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }
}
