//! Streaming `INSERT` statement parser.
//!
//! This module provides [`DumpParser`], a lazy iterator over the rows of a
//! dump. Each item is either a valid [`SourceRow`] or a [`ParseIssue`]
//! describing a tuple (or whole statement) that was excluded.

use std::sync::Arc;

use hm_core::{ParseIssue, ParseIssueKind, RowPosition, SourceRow, Value, fx_hash_set};

use crate::lexer::Cursor;
use crate::literal::decode_bare;

/// Header of the `INSERT` statement currently being read.
#[derive(Debug)]
struct Statement {
    table: Arc<str>,
    columns: Arc<[String]>,
    /// Tuples read so far.
    tuples: u32,
}

/// Fault-tolerant parser over dump text.
///
/// Statements other than `INSERT` (DDL, `SET`, `LOCK TABLES`, ...) are
/// skipped silently. A malformed tuple is reported as a [`ParseIssue`] and
/// excluded; parsing continues with the next tuple. A statement whose header
/// is malformed is reported once, with `tuple == 0`, and skipped. Only an
/// unterminated quoted string or tuple ends the parse early, since nothing
/// after it can be located reliably.
///
/// Rows are yielded in file order. The parser does not collect anything, so
/// memory use is bounded by the largest row regardless of dump size.
///
/// # Examples
///
/// ```
/// use hm_core::ParseIssueKind;
/// use hm_dump::DumpParser;
///
/// let dump = "INSERT INTO legacy_patients (fname, lname, icn) VALUES \
///             ('Ann', 'Lee', '1234567890123456'), ('Ann', 'Lee');";
/// let mut parser = DumpParser::new(dump);
///
/// let row = parser.next().unwrap().unwrap();
/// assert_eq!(row.get("fname").and_then(|v| v.as_text()), Some("Ann"));
///
/// let issue = parser.next().unwrap().unwrap_err();
/// assert_eq!(
///     issue.kind,
///     ParseIssueKind::ColumnCountMismatch { expected: 3, found: 2 }
/// );
/// assert!(parser.next().is_none());
/// ```
#[derive(Debug)]
pub struct DumpParser<'a> {
    cursor: Cursor<'a>,
    /// `INSERT` statements seen so far.
    statements: u32,
    /// Tuples seen so far, valid or not.
    rows: u32,
    current: Option<Statement>,
}

impl<'a> DumpParser<'a> {
    /// Creates a parser over `text`.
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        Self {
            cursor: Cursor::new(text),
            statements: 0,
            rows: 0,
            current: None,
        }
    }

    /// Number of `INSERT` statements encountered so far.
    #[inline]
    #[must_use]
    pub const fn statements_seen(&self) -> u32 {
        self.statements
    }

    /// Number of tuples encountered so far, including malformed ones.
    #[inline]
    #[must_use]
    pub const fn rows_seen(&self) -> u32 {
        self.rows
    }

    /// Reads the statement header after `INSERT`, up to and including
    /// `VALUES`.
    fn read_header(&mut self) -> Result<Statement, (Option<String>, ParseIssueKind)> {
        let cursor = &mut self.cursor;
        cursor.skip_trivia();
        cursor.eat_keyword("IGNORE");
        cursor.skip_trivia();
        if !cursor.eat_keyword("INTO") {
            return Err((None, unexpected(cursor)));
        }
        cursor.skip_trivia();
        let Some(table) = cursor.read_identifier() else {
            return Err((None, unexpected(cursor)));
        };

        cursor.skip_trivia();
        if !cursor.eat(b'(') {
            return Err((Some(table), ParseIssueKind::MissingColumnList));
        }
        let mut columns = Vec::new();
        let mut seen = fx_hash_set();
        loop {
            cursor.skip_trivia();
            let Some(column) = cursor.read_identifier() else {
                return Err((Some(table), unexpected(cursor)));
            };
            if !seen.insert(column.to_ascii_lowercase()) {
                return Err((Some(table), ParseIssueKind::DuplicateColumn { column }));
            }
            columns.push(column);
            cursor.skip_trivia();
            match cursor.peek() {
                Some(b',') => {
                    cursor.bump();
                }
                Some(b')') => {
                    cursor.bump();
                    break;
                }
                _ => return Err((Some(table), unexpected(cursor))),
            }
        }

        cursor.skip_trivia();
        if !cursor.eat_keyword("VALUES") && !cursor.eat_keyword("VALUE") {
            return Err((Some(table), ParseIssueKind::MissingValues));
        }

        Ok(Statement {
            table: Arc::from(table),
            columns: columns.into(),
            tuples: 0,
        })
    }
}

impl Iterator for DumpParser<'_> {
    type Item = Result<SourceRow, ParseIssue>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.cursor.skip_trivia();

            if let Some(statement) = self.current.as_mut() {
                match self.cursor.peek() {
                    Some(b'(') => {
                        self.rows += 1;
                        return Some(read_tuple(
                            &mut self.cursor,
                            statement,
                            self.rows,
                            self.statements,
                        ));
                    }
                    Some(b',') => {
                        self.cursor.bump();
                    }
                    Some(b';') => {
                        self.cursor.bump();
                        self.current = None;
                    }
                    None => self.current = None,
                    // Trailing clauses such as `ON DUPLICATE KEY UPDATE`.
                    Some(_) => {
                        self.cursor.skip_statement();
                        self.current = None;
                    }
                }
                continue;
            }

            if self.cursor.is_eof() {
                return None;
            }
            if self.cursor.eat(b';') {
                continue;
            }
            if !self.cursor.eat_keyword("INSERT") && !self.cursor.eat_keyword("REPLACE") {
                self.cursor.skip_statement();
                continue;
            }

            self.statements += 1;
            let line = self.cursor.line();
            match self.read_header() {
                Ok(statement) => self.current = Some(statement),
                Err((table, kind)) => {
                    let position = RowPosition::new(self.rows, self.statements, 0, line);
                    self.cursor.skip_statement();
                    return Some(Err(ParseIssue::new(position, table, kind)));
                }
            }
        }
    }
}

/// Reads one tuple starting at its opening parenthesis.
///
/// Malformed tuples are skipped up to their closing parenthesis. If the
/// tuple cannot be delimited at all the cursor is exhausted.
fn read_tuple(
    cursor: &mut Cursor<'_>,
    statement: &mut Statement,
    row: u32,
    statement_index: u32,
) -> Result<SourceRow, ParseIssue> {
    statement.tuples += 1;
    let position = RowPosition::new(row, statement_index, statement.tuples, cursor.line());
    let expected = statement.columns.len();
    let issue = |kind| ParseIssue::new(position, Some(statement.table.to_string()), kind);

    cursor.bump();
    cursor.skip_trivia();
    if cursor.eat(b')') {
        return Err(issue(ParseIssueKind::ColumnCountMismatch { expected, found: 0 }));
    }

    let mut values = Vec::with_capacity(expected);
    loop {
        cursor.skip_trivia();
        let value = match cursor.peek() {
            Some(b'\'' | b'"') => cursor.read_quoted().map(Value::Text),
            Some(_) => cursor.read_bare().map(decode_bare),
            None => Err(ParseIssueKind::UnterminatedTuple),
        };
        match value {
            Ok(value) => values.push(value),
            Err(kind) => {
                cursor.exhaust();
                return Err(issue(kind));
            }
        }

        cursor.skip_trivia();
        match cursor.peek() {
            Some(b',') => {
                cursor.bump();
            }
            Some(b')') => {
                cursor.bump();
                break;
            }
            None => return Err(issue(ParseIssueKind::UnterminatedTuple)),
            Some(_) => {
                let kind = unexpected(cursor);
                if !cursor.skip_tuple_rest() {
                    cursor.exhaust();
                }
                return Err(issue(kind));
            }
        }
    }

    if values.len() != expected {
        return Err(issue(ParseIssueKind::ColumnCountMismatch {
            expected,
            found: values.len(),
        }));
    }

    Ok(SourceRow::new(
        Arc::clone(&statement.table),
        Arc::clone(&statement.columns),
        values,
        position,
    ))
}

fn unexpected(cursor: &Cursor<'_>) -> ParseIssueKind {
    ParseIssueKind::UnexpectedToken {
        found: cursor.snippet(),
    }
}

/// Parses a whole dump, returning every valid row and every issue.
///
/// Convenience for small inputs and tests; prefer [`DumpParser`] for large
/// dumps.
///
/// # Examples
///
/// ```
/// let (rows, issues) = hm_dump::parse_dump("INSERT INTO t (a) VALUES (1), (2, 3);");
/// assert_eq!(rows.len(), 1);
/// assert_eq!(issues.len(), 1);
/// ```
#[must_use]
pub fn parse_dump(text: &str) -> (Vec<SourceRow>, Vec<ParseIssue>) {
    let mut rows = Vec::new();
    let mut issues = Vec::new();
    for item in DumpParser::new(text) {
        match item {
            Ok(row) => rows.push(row),
            Err(issue) => issues.push(issue),
        }
    }
    (rows, issues)
}
