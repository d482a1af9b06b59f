//! Loading dump text from disk.

use camino::Utf8Path;

use crate::error::DumpError;

/// Reads a dump file into memory.
///
/// The whole file is loaded since [`DumpParser`](crate::DumpParser) borrows
/// its input. A leading UTF-8 byte order mark is stripped.
///
/// # Errors
///
/// Returns [`DumpError::NotFound`] if the file does not exist,
/// [`DumpError::Read`] if it cannot be read, and [`DumpError::Encoding`] if
/// it is not valid UTF-8.
pub fn read_dump(path: &Utf8Path) -> Result<String, DumpError> {
    if !path.exists() {
        return Err(DumpError::NotFound(path.to_owned()));
    }
    let bytes = std::fs::read(path).map_err(|e| DumpError::read(path, e))?;
    let mut text = String::from_utf8(bytes).map_err(|e| DumpError::Encoding {
        path: path.to_owned(),
        offset: e.utf8_error().valid_up_to(),
    })?;
    if text.starts_with('\u{feff}') {
        text.replace_range(..'\u{feff}'.len_utf8(), "");
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use camino::Utf8PathBuf;

    use super::*;

    fn temp_path(dir: &tempfile::TempDir, name: &str) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join(name)).unwrap()
    }

    #[test]
    fn test_reads_and_strips_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_path(&dir, "dump.sql");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all("\u{feff}INSERT INTO t (a) VALUES (1);".as_bytes())
            .unwrap();

        let text = read_dump(&path).unwrap();
        assert!(text.starts_with("INSERT"));
    }

    #[test]
    fn test_rejects_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_path(&dir, "latin1.sql");
        std::fs::write(&path, b"INSERT INTO t (a) VALUES ('Jos\xe9');").unwrap();

        let err = read_dump(&path).unwrap_err();
        assert!(matches!(err, DumpError::Encoding { offset: 30, .. }));
    }
}
