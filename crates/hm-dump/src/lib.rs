//! Fault-tolerant reader for SQL `INSERT` dumps.
//!
//! This crate turns the text of a legacy database dump into [`SourceRow`]s,
//! one per `VALUES` tuple, without ever aborting on bad input:
//!
//! - Statements other than `INSERT`/`REPLACE` are skipped
//! - Malformed tuples become [`ParseIssue`]s and are excluded
//! - Malformed statement headers become a single statement-level issue
//! - Rows keep their position (row, statement, tuple, line) for reporting
//!
//! # Overview
//!
//! The main entry point is [`DumpParser`], a lazy iterator:
//!
//! ```
//! use hm_dump::DumpParser;
//!
//! let dump = "
//!     CREATE TABLE legacy_patients (fname TEXT, dob TEXT);
//!     INSERT INTO legacy_patients (fname, dob) VALUES
//!         ('Ann', '1990-04-02'),
//!         ('Bob');
//! ";
//!
//! for item in DumpParser::new(dump) {
//!     match item {
//!         Ok(row) => println!("{}: {:?}", row.position, row.get("fname")),
//!         Err(issue) => eprintln!("skipped {issue}"),
//!     }
//! }
//! ```
//!
//! # Accepted Syntax
//!
//! | Construct | Example |
//! |-----------|---------|
//! | Statement | `INSERT [IGNORE] INTO t (a, b) VALUES (...), (...);` |
//! | Identifiers | `t`, `` `t` ``, `"t"`, `[t]`, `db.t` (last segment kept) |
//! | Strings | `'O''Brien'`, `'O\'Brien'`, `"text"` |
//! | Comments | `-- line`, `# line`, `/* block */` |
//!
//! See [`decode_literal`] for how unquoted literals are typed.
//!
//! [`SourceRow`]: hm_core::SourceRow

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
mod lexer;
mod literal;
mod parser;
mod source;

pub use error::DumpError;
pub use literal::decode_literal;
pub use parser::{DumpParser, parse_dump};
pub use source::read_dump;

// Issue types live in hm-core so previews and results can carry them.
pub use hm_core::{ParseIssue, ParseIssueKind};
