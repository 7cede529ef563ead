//! SQL literal encoding for text-protocol statements.
//!
//! Parameters are bound client side: each value is rendered as a SQL
//! literal and spliced into the statement text in place of its placeholder.

use bytes::BufMut;

use crate::error::TypeError;
use crate::value::SqlValue;

/// Options that affect how literals are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    /// The server runs with `NO_BACKSLASH_ESCAPES`; quotes are doubled and
    /// backslashes are sent verbatim.
    pub no_backslash_escapes: bool,
    /// Send UUIDs as 16-byte `BINARY(16)` values instead of strings.
    pub old_guids: bool,
}

impl EncodeOptions {
    /// Create default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether the server has `NO_BACKSLASH_ESCAPES` enabled.
    #[must_use]
    pub fn no_backslash_escapes(mut self, enabled: bool) -> Self {
        self.no_backslash_escapes = enabled;
        self
    }

    /// Set whether UUIDs are sent as binary.
    #[must_use]
    pub fn old_guids(mut self, enabled: bool) -> Self {
        self.old_guids = enabled;
        self
    }
}

/// Append `value` to `dst` as a SQL literal.
///
/// # Example
///
/// ```
/// use mysql_types::{SqlValue, encode::{EncodeOptions, append_sql_literal}};
///
/// let mut sql = Vec::new();
/// append_sql_literal(&mut sql, &SqlValue::from("it's"), EncodeOptions::new()).unwrap();
/// assert_eq!(sql, b"'it\\'s'");
/// ```
pub fn append_sql_literal<B: BufMut>(
    dst: &mut B,
    value: &SqlValue,
    options: EncodeOptions,
) -> Result<(), TypeError> {
    match value {
        SqlValue::Null => dst.put_slice(b"NULL"),
        SqlValue::Bool(true) => dst.put_slice(b"TRUE"),
        SqlValue::Bool(false) => dst.put_slice(b"FALSE"),
        SqlValue::Int(v) => dst.put_slice(v.to_string().as_bytes()),
        SqlValue::UInt(v) => dst.put_slice(v.to_string().as_bytes()),
        SqlValue::Float(v) => append_float(dst, v.is_finite(), format!("{v:?}"))?,
        SqlValue::Double(v) => append_float(dst, v.is_finite(), format!("{v:?}"))?,
        SqlValue::String(v) => append_quoted(dst, v.as_bytes(), options),
        SqlValue::Binary(v) => {
            dst.put_slice(b"_binary");
            append_quoted(dst, v, options);
        }
        #[cfg(feature = "decimal")]
        SqlValue::Decimal(v) => dst.put_slice(v.to_string().as_bytes()),
        #[cfg(feature = "uuid")]
        SqlValue::Uuid(v) => {
            if options.old_guids {
                dst.put_slice(b"_binary");
                append_quoted(dst, v.as_bytes(), options);
            } else {
                dst.put_u8(b'\'');
                dst.put_slice(v.hyphenated().to_string().as_bytes());
                dst.put_u8(b'\'');
            }
        }
        #[cfg(feature = "chrono")]
        SqlValue::Date(v) => append_temporal(dst, &v.format("%Y-%m-%d")),
        #[cfg(feature = "chrono")]
        SqlValue::Time(v) => append_temporal(dst, &v.format("%H:%M:%S%.6f")),
        #[cfg(feature = "chrono")]
        SqlValue::DateTime(v) => append_temporal(dst, &v.format("%Y-%m-%d %H:%M:%S%.6f")),
        #[cfg(feature = "json")]
        SqlValue::Json(v) => append_quoted(dst, v.to_string().as_bytes(), options),
    }
    Ok(())
}

fn append_float<B: BufMut>(dst: &mut B, finite: bool, text: String) -> Result<(), TypeError> {
    if !finite {
        return Err(TypeError::NonFiniteFloat);
    }
    dst.put_slice(text.as_bytes());
    // A bare integer literal would be typed as DECIMAL by the server.
    if !text.contains(['e', 'E']) {
        dst.put_slice(b"e0");
    }
    Ok(())
}

#[cfg(feature = "chrono")]
fn append_temporal<B: BufMut>(dst: &mut B, formatted: &impl std::fmt::Display) {
    dst.put_slice(format!("'{formatted}'").as_bytes());
}

/// Append `raw` inside single quotes, escaped for the server's SQL mode.
pub fn append_quoted<B: BufMut>(dst: &mut B, raw: &[u8], options: EncodeOptions) {
    dst.put_u8(b'\'');
    if options.no_backslash_escapes {
        for &b in raw {
            if b == b'\'' {
                dst.put_u8(b'\'');
            }
            dst.put_u8(b);
        }
    } else {
        for &b in raw {
            match b {
                b'\\' => dst.put_slice(b"\\\\"),
                b'\'' => dst.put_slice(b"\\'"),
                0 => dst.put_slice(b"\\0"),
                b'\n' => dst.put_slice(b"\\n"),
                b'\r' => dst.put_slice(b"\\r"),
                0x1A => dst.put_slice(b"\\Z"),
                _ => dst.put_u8(b),
            }
        }
    }
    dst.put_u8(b'\'');
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn literal_bytes(value: impl Into<SqlValue>, options: EncodeOptions) -> Vec<u8> {
        let mut out = Vec::new();
        append_sql_literal(&mut out, &value.into(), options).unwrap();
        out
    }

    fn literal(value: impl Into<SqlValue>, options: EncodeOptions) -> String {
        String::from_utf8(literal_bytes(value, options)).unwrap()
    }

    #[test]
    fn test_scalars() {
        let o = EncodeOptions::new();
        assert_eq!(literal(SqlValue::Null, o), "NULL");
        assert_eq!(literal(true, o), "TRUE");
        assert_eq!(literal(false, o), "FALSE");
        assert_eq!(literal(-17i64, o), "-17");
        assert_eq!(literal(u64::MAX, o), "18446744073709551615");
    }

    #[test]
    fn test_floats_carry_exponent() {
        let o = EncodeOptions::new();
        assert_eq!(literal(1.5f64, o), "1.5e0");
        assert_eq!(literal(2.0f64, o), "2.0e0");
        assert_eq!(literal(1e300f64, o), "1e300");

        let mut out = Vec::new();
        let err = append_sql_literal(&mut out, &SqlValue::Double(f64::NAN), o).unwrap_err();
        assert_eq!(err, TypeError::NonFiniteFloat);
    }

    #[test]
    fn test_backslash_escaping() {
        let o = EncodeOptions::new();
        assert_eq!(literal("it's", o), r"'it\'s'");
        assert_eq!(literal("a\\b", o), r"'a\\b'");
        assert_eq!(literal("line\nbreak\0", o), r"'line\nbreak\0'");
    }

    #[test]
    fn test_no_backslash_escapes_doubles_quotes() {
        let o = EncodeOptions::new().no_backslash_escapes(true);
        assert_eq!(literal("it's", o), "'it''s'");
        assert_eq!(literal("a\\b", o), "'a\\b'");
    }

    #[test]
    fn test_binary() {
        let o = EncodeOptions::new();
        let value = SqlValue::Binary(Bytes::from_static(b"a'\x00"));
        assert_eq!(literal(value, o), r"_binary'a\'\0'");
    }

    #[cfg(feature = "chrono")]
    #[test]
    fn test_datetime() {
        let dt = chrono::NaiveDate::from_ymd_opt(2023, 7, 4)
            .unwrap()
            .and_hms_micro_opt(9, 5, 3, 120)
            .unwrap();
        assert_eq!(
            literal(dt, EncodeOptions::new()),
            "'2023-07-04 09:05:03.000120'"
        );
        assert_eq!(
            literal(dt.date(), EncodeOptions::new()),
            "'2023-07-04'"
        );
    }

    #[cfg(feature = "uuid")]
    #[test]
    fn test_uuid() {
        let id = uuid::Uuid::from_u128(0x0011_2233_4455_6677_8899_aabb_ccdd_eeff);
        assert_eq!(
            literal(id, EncodeOptions::new()),
            "'00112233-4455-6677-8899-aabbccddeeff'"
        );

        // Binary form is not UTF-8; the leading zero byte is escaped.
        let mut expected = b"_binary'\\0".to_vec();
        expected.extend_from_slice(&id.as_bytes()[1..]);
        expected.push(b'\'');
        assert_eq!(literal_bytes(id, EncodeOptions::new().old_guids(true)), expected);
    }
}
