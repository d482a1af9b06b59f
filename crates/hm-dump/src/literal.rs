//! Literal decoding.
//!
//! | Literal | Value |
//! |---------|-------|
//! | `'text'`, `"text"` | [`Value::Text`] (escapes resolved) |
//! | `NULL` (any case) | [`Value::Null`] |
//! | `TRUE`, `FALSE` | [`Value::Bool`] |
//! | `42`, `-7` | [`Value::Integer`] (if it fits `i64`) |
//! | `3.5`, `1e3`, `99999999999999999999` | [`Value::Float`] (if finite) |
//! | `007`, `1e999` | [`Value::Text`], verbatim |
//! | anything else | [`Value::Text`], verbatim |
//!
//! Integers with a leading zero are digit strings (card numbers, codes), and
//! reading them as numbers would drop the zeros.

use hm_core::Value;

use crate::lexer::Cursor;

/// Decodes a single SQL literal as it appears inside a `VALUES` tuple.
///
/// Unquoted tokens that are not `NULL`, a boolean or a number are kept as
/// opaque text, so expressions such as `NOW()` pass through unchanged. A
/// quoted literal that is not properly terminated is also kept verbatim.
///
/// # Examples
///
/// ```
/// use hm_dump::decode_literal;
/// use hm_core::Value;
///
/// assert_eq!(decode_literal("'O''Brien'"), Value::from("O'Brien"));
/// assert_eq!(decode_literal("null"), Value::Null);
/// assert_eq!(decode_literal("-42"), Value::Integer(-42));
/// assert_eq!(decode_literal("2.5e1"), Value::Float(25.0));
/// assert_eq!(decode_literal("NOW()"), Value::from("NOW()"));
/// ```
#[must_use]
pub fn decode_literal(raw: &str) -> Value {
    let raw = raw.trim();
    if raw.starts_with(['\'', '"']) {
        let mut cursor = Cursor::new(raw);
        if let Ok(text) = cursor.read_quoted() {
            cursor.skip_trivia();
            if cursor.is_eof() {
                return Value::Text(text);
            }
        }
        return Value::Text(raw.to_owned());
    }
    decode_bare(raw)
}

/// Decodes an unquoted token.
pub(crate) fn decode_bare(raw: &str) -> Value {
    if raw.eq_ignore_ascii_case("NULL") {
        return Value::Null;
    }
    if raw.eq_ignore_ascii_case("TRUE") {
        return Value::Bool(true);
    }
    if raw.eq_ignore_ascii_case("FALSE") {
        return Value::Bool(false);
    }
    let decoded = match classify_number(raw) {
        Some(NumberShape::Integer) if has_leading_zero(raw) => None,
        Some(NumberShape::Integer) => raw
            .parse::<i64>()
            .ok()
            .map(Value::Integer)
            .or_else(|| finite_float(raw)),
        Some(NumberShape::Decimal) => finite_float(raw),
        None => None,
    };
    decoded.unwrap_or_else(|| Value::Text(raw.to_owned()))
}

/// Parses a float, refusing infinities (JSON cannot carry them).
fn finite_float(raw: &str) -> Option<Value> {
    raw.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(Value::Float)
}

/// `0123`, `-0042`; a lone `0` is an ordinary number.
fn has_leading_zero(raw: &str) -> bool {
    let digits = raw.trim_start_matches(['+', '-']);
    digits.len() > 1 && digits.starts_with('0')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NumberShape {
    Integer,
    Decimal,
}

/// Checks `raw` against `[+-]? digits [. digits?]? ([eE] [+-]? digits)?`
/// (or `.digits` with no leading digits).
fn classify_number(raw: &str) -> Option<NumberShape> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }

    let int_start = i;
    while bytes.get(i).is_some_and(u8::is_ascii_digit) {
        i += 1;
    }
    let mut digits = i - int_start;
    let mut shape = NumberShape::Integer;

    if bytes.get(i) == Some(&b'.') {
        shape = NumberShape::Decimal;
        i += 1;
        let frac_start = i;
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        digits += i - frac_start;
    }
    if digits == 0 {
        return None;
    }

    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        shape = NumberShape::Decimal;
        i += 1;
        if matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let exp_start = i;
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        if i == exp_start {
            return None;
        }
    }

    (i == bytes.len()).then_some(shape)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_ignore_case() {
        assert_eq!(decode_literal("NULL"), Value::Null);
        assert_eq!(decode_literal("Null"), Value::Null);
        assert_eq!(decode_literal("true"), Value::Bool(true));
        assert_eq!(decode_literal("FALSE"), Value::Bool(false));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(decode_literal("0"), Value::Integer(0));
        assert_eq!(decode_literal("+12"), Value::Integer(12));
        assert_eq!(decode_literal("-0.5"), Value::Float(-0.5));
        assert_eq!(decode_literal(".5"), Value::Float(0.5));
        assert_eq!(decode_literal("7."), Value::Float(7.0));
        assert_eq!(decode_literal("1E-2"), Value::Float(0.01));
        assert_eq!(
            decode_literal("99999999999999999999"),
            Value::Float(99_999_999_999_999_999_999.0)
        );
    }

    #[test]
    fn test_non_numbers_stay_text() {
        assert_eq!(decode_literal("1e"), Value::from("1e"));
        assert_eq!(decode_literal("0x1F"), Value::from("0x1F"));
        assert_eq!(decode_literal("-"), Value::from("-"));
        assert_eq!(decode_literal("."), Value::from("."));
        assert_eq!(decode_literal("CURRENT_DATE"), Value::from("CURRENT_DATE"));
    }

    #[test]
    fn test_leading_zero_integers_stay_text() {
        assert_eq!(
            decode_literal("0123456789012345"),
            Value::from("0123456789012345")
        );
        assert_eq!(decode_literal("-007"), Value::from("-007"));
        assert_eq!(decode_literal("-0"), Value::Integer(0));
        assert_eq!(decode_literal("0.25"), Value::Float(0.25));
    }

    #[test]
    fn test_overflowing_floats_stay_text() {
        assert_eq!(decode_literal("1e999"), Value::from("1e999"));
        assert_eq!(decode_literal("-1e999"), Value::from("-1e999"));
        assert_eq!(decode_literal("1e-999"), Value::Float(0.0));
    }

    #[test]
    fn test_quoted_literals() {
        assert_eq!(decode_literal("'1990-04-02'"), Value::from("1990-04-02"));
        assert_eq!(decode_literal("\"double\""), Value::from("double"));
        assert_eq!(decode_literal("'NULL'"), Value::from("NULL"));
        assert_eq!(decode_literal("''"), Value::from(""));
    }

    #[test]
    fn test_broken_quoted_literal_is_verbatim() {
        assert_eq!(decode_literal("'open"), Value::from("'open"));
        assert_eq!(decode_literal("'a' 'b'"), Value::from("'a' 'b'"));
    }
}
