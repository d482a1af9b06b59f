//! Byte cursor over dump text.
//!
//! The cursor knows just enough SQL to walk `INSERT` statements: whitespace,
//! the three comment styles, identifiers, quoted strings and balanced
//! parentheses. It tracks the current line for error reporting.
//!
//! All delimiters the cursor looks for are ASCII, and UTF-8 continuation
//! bytes never collide with ASCII, so scanning bytes is safe for multibyte
//! text. Slices are only taken at ASCII boundaries.

use hm_core::ParseIssueKind;

/// Maximum length of the text quoted in an `UnexpectedToken` issue.
const SNIPPET_LEN: usize = 24;

/// A forward-only cursor over dump text.
#[derive(Debug, Clone)]
pub(crate) struct Cursor<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: u32,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            line: 1,
        }
    }

    /// Current 1-based line.
    #[inline]
    pub(crate) const fn line(&self) -> u32 {
        self.line
    }

    #[inline]
    pub(crate) fn is_eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    #[inline]
    pub(crate) fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    #[inline]
    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    /// Moves to the end of the input.
    ///
    /// Used once the rest of the text can no longer be split into
    /// statements reliably.
    pub(crate) fn exhaust(&mut self) {
        self.pos = self.bytes.len();
    }

    /// Consumes one byte.
    pub(crate) fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
        }
        Some(b)
    }

    /// Consumes `expected` if it is the next byte.
    pub(crate) fn eat(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Skips whitespace and comments (`-- `, `#` and `/* */`).
    pub(crate) fn skip_trivia(&mut self) {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(b), _) if b.is_ascii_whitespace() => {
                    self.bump();
                }
                (Some(b'-'), Some(b'-')) | (Some(b'#'), _) => self.skip_line(),
                (Some(b'/'), Some(b'*')) => self.skip_block_comment(),
                _ => return,
            }
        }
    }

    fn skip_line(&mut self) {
        while let Some(b) = self.bump() {
            if b == b'\n' {
                return;
            }
        }
    }

    fn skip_block_comment(&mut self) {
        self.pos += 2;
        while !self.is_eof() {
            if self.peek() == Some(b'*') && self.peek_at(1) == Some(b'/') {
                self.pos += 2;
                return;
            }
            self.bump();
        }
    }

    /// Consumes `keyword` if the next word matches it, ignoring case.
    pub(crate) fn eat_keyword(&mut self, keyword: &str) -> bool {
        let end = self.pos + keyword.len();
        let Some(word) = self.bytes.get(self.pos..end) else {
            return false;
        };
        if !word.eq_ignore_ascii_case(keyword.as_bytes()) {
            return false;
        }
        if self.bytes.get(end).copied().is_some_and(is_ident_byte) {
            return false;
        }
        self.pos = end;
        true
    }

    /// Reads a possibly schema-qualified identifier and returns its last
    /// segment, unquoted.
    pub(crate) fn read_identifier(&mut self) -> Option<String> {
        let mut name = self.read_identifier_segment()?;
        while self.peek() == Some(b'.') {
            self.bump();
            name = self.read_identifier_segment()?;
        }
        Some(name)
    }

    fn read_identifier_segment(&mut self) -> Option<String> {
        let close = match self.peek()? {
            b'`' => b'`',
            b'"' => b'"',
            b'[' => b']',
            b if is_ident_byte(b) => {
                let start = self.pos;
                while self.peek().is_some_and(is_ident_byte) {
                    self.pos += 1;
                }
                return Some(self.src[start..self.pos].to_owned());
            }
            _ => return None,
        };
        self.bump();
        let start = self.pos;
        loop {
            match self.peek()? {
                b if b == close => {
                    let name = self.src[start..self.pos].to_owned();
                    self.bump();
                    return Some(name);
                }
                b'\n' => return None,
                _ => self.pos += 1,
            }
        }
    }

    /// Reads a quoted string starting at the opening quote.
    ///
    /// Resolves backslash escapes and doubled quotes.
    pub(crate) fn read_quoted(&mut self) -> Result<String, ParseIssueKind> {
        let Some(quote) = self.bump() else {
            return Err(ParseIssueKind::UnterminatedString);
        };
        let mut out = String::new();
        let mut segment = self.pos;
        loop {
            let Some(b) = self.peek() else {
                return Err(ParseIssueKind::UnterminatedString);
            };
            if b == b'\\' {
                out.push_str(&self.src[segment..self.pos]);
                self.pos += 1;
                let Some(escaped) = self.src[self.pos..].chars().next() else {
                    return Err(ParseIssueKind::UnterminatedString);
                };
                self.pos += escaped.len_utf8();
                if escaped == '\n' {
                    self.line += 1;
                }
                out.push(unescape(escaped));
                segment = self.pos;
            } else if b == quote {
                out.push_str(&self.src[segment..self.pos]);
                self.pos += 1;
                if self.peek() == Some(quote) {
                    out.push(char::from(quote));
                    self.pos += 1;
                    segment = self.pos;
                } else {
                    return Ok(out);
                }
            } else {
                self.bump();
            }
        }
    }

    /// Reads an unquoted token up to the next `,` or `)` at nesting depth
    /// zero, returning it trimmed.
    ///
    /// Nested parentheses and quoted strings inside the token are kept
    /// verbatim, so expressions like `NOW()` or `CONCAT('a', 'b')` survive as
    /// one token.
    pub(crate) fn read_bare(&mut self) -> Result<&'a str, ParseIssueKind> {
        let start = self.pos;
        let mut depth = 0_u32;
        while let Some(b) = self.peek() {
            match b {
                b',' | b')' if depth == 0 => break,
                b'(' => {
                    depth += 1;
                    self.pos += 1;
                }
                b')' => {
                    depth -= 1;
                    self.pos += 1;
                }
                b'\'' | b'"' => {
                    self.read_quoted()?;
                }
                _ => {
                    self.bump();
                }
            }
        }
        Ok(self.src[start..self.pos].trim())
    }

    /// Skips to just past the `)` closing the current tuple.
    ///
    /// Returns `false` if the input ends first.
    pub(crate) fn skip_tuple_rest(&mut self) -> bool {
        let mut depth = 0_u32;
        while let Some(b) = self.peek() {
            match b {
                b'\'' | b'"' => {
                    if self.read_quoted().is_err() {
                        return false;
                    }
                }
                b'(' => {
                    depth += 1;
                    self.pos += 1;
                }
                b')' if depth == 0 => {
                    self.pos += 1;
                    return true;
                }
                b')' => {
                    depth -= 1;
                    self.pos += 1;
                }
                _ => {
                    self.bump();
                }
            }
        }
        false
    }

    /// Skips to just past the next `;` outside quotes and comments.
    pub(crate) fn skip_statement(&mut self) {
        while let Some(b) = self.peek() {
            match (b, self.peek_at(1)) {
                (b';', _) => {
                    self.pos += 1;
                    return;
                }
                (b'\'' | b'"' | b'`', _) => {
                    if b == b'`' {
                        if self.read_identifier_segment().is_none() {
                            self.bump();
                        }
                    } else if self.read_quoted().is_err() {
                        return;
                    }
                }
                (b'-', Some(b'-')) | (b'#', _) => self.skip_line(),
                (b'/', Some(b'*')) => self.skip_block_comment(),
                _ => {
                    self.bump();
                }
            }
        }
    }

    /// The text at the cursor, truncated for error messages.
    pub(crate) fn snippet(&self) -> String {
        let rest = &self.src[self.pos..];
        if rest.is_empty() {
            return "end of input".to_owned();
        }
        let line = rest.lines().next().unwrap_or(rest);
        line.chars().take(SNIPPET_LEN).collect()
    }
}

/// Returns `true` for bytes allowed in an unquoted identifier.
#[inline]
const fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// Resolves the character after a backslash.
#[must_use]
pub(crate) const fn unescape(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '0' => '\0',
        'b' => '\u{8}',
        'Z' => '\u{1a}',
        other => other,
    }
}
