//! Text-protocol decoding for SQL values.
//!
//! Result rows of `COM_QUERY` carry every value as a length-encoded string.
//! This module interprets that text according to the column definition.

use bytes::Bytes;
use mysql_protocol::{ColumnDefinition, ColumnType};

use crate::error::TypeError;
use crate::value::SqlValue;

/// Decode one text-protocol cell.
///
/// `None` (the `0xFB` marker on the wire) decodes to [`SqlValue::Null`].
pub fn decode_text_value(
    raw: Option<Bytes>,
    column: &ColumnDefinition,
) -> Result<SqlValue, TypeError> {
    let Some(raw) = raw else {
        return Ok(SqlValue::Null);
    };

    match column.column_type {
        ColumnType::Null => Ok(SqlValue::Null),
        ColumnType::Tiny
        | ColumnType::Short
        | ColumnType::Int24
        | ColumnType::Long
        | ColumnType::LongLong => decode_integer(&raw, column.is_unsigned()),
        ColumnType::Year => decode_integer(&raw, false),
        ColumnType::Float => decode_float(&raw),
        ColumnType::Double => decode_double(&raw),
        ColumnType::Decimal | ColumnType::NewDecimal => decode_decimal(&raw),
        ColumnType::Date => decode_date(&raw),
        ColumnType::Time => decode_time(&raw),
        ColumnType::DateTime | ColumnType::Timestamp => decode_datetime(&raw),
        ColumnType::Bit => Ok(decode_bit(&raw)),
        ColumnType::Json => decode_json(raw),
        ColumnType::Geometry => Ok(SqlValue::Binary(raw)),
        _ if column.is_binary() => Ok(SqlValue::Binary(raw)),
        _ => Ok(SqlValue::String(utf8(&raw)?.to_owned())),
    }
}

fn utf8(raw: &[u8]) -> Result<&str, TypeError> {
    std::str::from_utf8(raw).map_err(|e| TypeError::InvalidEncoding(e.to_string()))
}

fn decode_integer(raw: &[u8], unsigned: bool) -> Result<SqlValue, TypeError> {
    let text = utf8(raw)?;
    if unsigned {
        text.parse::<u64>()
            .map(SqlValue::UInt)
            .map_err(|_| TypeError::InvalidNumber(text.to_owned()))
    } else {
        text.parse::<i64>()
            .map(SqlValue::Int)
            .map_err(|_| TypeError::InvalidNumber(text.to_owned()))
    }
}

fn decode_float(raw: &[u8]) -> Result<SqlValue, TypeError> {
    let text = utf8(raw)?;
    text.parse::<f32>()
        .map(SqlValue::Float)
        .map_err(|_| TypeError::InvalidNumber(text.to_owned()))
}

fn decode_double(raw: &[u8]) -> Result<SqlValue, TypeError> {
    let text = utf8(raw)?;
    text.parse::<f64>()
        .map(SqlValue::Double)
        .map_err(|_| TypeError::InvalidNumber(text.to_owned()))
}

#[cfg(feature = "decimal")]
fn decode_decimal(raw: &[u8]) -> Result<SqlValue, TypeError> {
    use std::str::FromStr;

    let text = utf8(raw)?;
    rust_decimal::Decimal::from_str(text)
        .map(SqlValue::Decimal)
        .map_err(|e| TypeError::InvalidDecimal(e.to_string()))
}

#[cfg(not(feature = "decimal"))]
fn decode_decimal(raw: &[u8]) -> Result<SqlValue, TypeError> {
    // Without decimal support the exact text is preserved.
    Ok(SqlValue::String(utf8(raw)?.to_owned()))
}

/// BIT(n) arrives as the raw big-endian bytes of the value.
fn decode_bit(raw: &[u8]) -> SqlValue {
    let start = raw.len().saturating_sub(8);
    let value = raw[start..]
        .iter()
        .fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
    SqlValue::UInt(value)
}

#[cfg(feature = "json")]
fn decode_json(raw: Bytes) -> Result<SqlValue, TypeError> {
    serde_json::from_slice(&raw)
        .map(SqlValue::Json)
        .map_err(|e| TypeError::InvalidJson(e.to_string()))
}

#[cfg(not(feature = "json"))]
fn decode_json(raw: Bytes) -> Result<SqlValue, TypeError> {
    Ok(SqlValue::String(utf8(&raw)?.to_owned()))
}

#[cfg(feature = "chrono")]
fn decode_date(raw: &[u8]) -> Result<SqlValue, TypeError> {
    let text = utf8(raw)?;
    chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map(SqlValue::Date)
        .map_err(|_| TypeError::InvalidDateTime(text.to_owned()))
}

#[cfg(not(feature = "chrono"))]
fn decode_date(raw: &[u8]) -> Result<SqlValue, TypeError> {
    Ok(SqlValue::String(utf8(raw)?.to_owned()))
}

#[cfg(feature = "chrono")]
fn decode_time(raw: &[u8]) -> Result<SqlValue, TypeError> {
    let text = utf8(raw)?;
    // TIME spans -838:59:59..838:59:59; only time-of-day values map to NaiveTime.
    chrono::NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
        .map(SqlValue::Time)
        .map_err(|_| TypeError::InvalidDateTime(text.to_owned()))
}

#[cfg(not(feature = "chrono"))]
fn decode_time(raw: &[u8]) -> Result<SqlValue, TypeError> {
    Ok(SqlValue::String(utf8(raw)?.to_owned()))
}

#[cfg(feature = "chrono")]
fn decode_datetime(raw: &[u8]) -> Result<SqlValue, TypeError> {
    let text = utf8(raw)?;
    chrono::NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .map(SqlValue::DateTime)
        .map_err(|_| TypeError::InvalidDateTime(text.to_owned()))
}

#[cfg(not(feature = "chrono"))]
fn decode_datetime(raw: &[u8]) -> Result<SqlValue, TypeError> {
    Ok(SqlValue::String(utf8(raw)?.to_owned()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mysql_protocol::ColumnFlags;
    use mysql_protocol::resultset::BINARY_COLLATION;

    fn decode(text: &str, column: &ColumnDefinition) -> Result<SqlValue, TypeError> {
        decode_text_value(Some(Bytes::copy_from_slice(text.as_bytes())), column)
    }

    #[test]
    fn test_null_cell() {
        let column = ColumnDefinition::new("c", ColumnType::Long);
        assert_eq!(decode_text_value(None, &column).unwrap(), SqlValue::Null);
    }

    #[test]
    fn test_signed_and_unsigned_integers() {
        let signed = ColumnDefinition::new("c", ColumnType::LongLong);
        assert_eq!(decode("-42", &signed).unwrap(), SqlValue::Int(-42));

        let unsigned =
            ColumnDefinition::new("c", ColumnType::LongLong).with_flags(ColumnFlags::UNSIGNED);
        assert_eq!(
            decode("18446744073709551615", &unsigned).unwrap(),
            SqlValue::UInt(u64::MAX)
        );
        assert!(matches!(
            decode("-1", &unsigned),
            Err(TypeError::InvalidNumber(_))
        ));
    }

    #[test]
    fn test_strings_and_blobs() {
        let text = ColumnDefinition::new("c", ColumnType::VarString);
        assert_eq!(
            decode("héllo", &text).unwrap(),
            SqlValue::String("héllo".into())
        );

        let mut blob = ColumnDefinition::new("c", ColumnType::Blob).with_flags(ColumnFlags::BINARY);
        blob.character_set = BINARY_COLLATION;
        assert_eq!(
            decode("\u{1}\u{2}", &blob).unwrap(),
            SqlValue::Binary(Bytes::from_static(&[1, 2]))
        );
    }

    #[test]
    fn test_invalid_utf8() {
        let text = ColumnDefinition::new("c", ColumnType::VarString);
        let result = decode_text_value(Some(Bytes::from_static(&[0xFF, 0xFE])), &text);
        assert!(matches!(result, Err(TypeError::InvalidEncoding(_))));
    }

    #[test]
    fn test_bit() {
        let column = ColumnDefinition::new("c", ColumnType::Bit);
        let value = decode_text_value(Some(Bytes::from_static(&[0x01, 0x02])), &column).unwrap();
        assert_eq!(value, SqlValue::UInt(0x0102));
    }

    #[cfg(feature = "chrono")]
    #[test]
    fn test_temporal() {
        let column = ColumnDefinition::new("c", ColumnType::DateTime);
        let value = decode("2024-02-29 13:45:10.250000", &column).unwrap();
        let expected = chrono::NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_micro_opt(13, 45, 10, 250_000)
            .unwrap();
        assert_eq!(value, SqlValue::DateTime(expected));

        let date = ColumnDefinition::new("c", ColumnType::Date);
        assert!(matches!(
            decode("0000-00-00", &date),
            Err(TypeError::InvalidDateTime(_))
        ));
    }

    #[cfg(feature = "decimal")]
    #[test]
    fn test_decimal() {
        let column = ColumnDefinition::new("c", ColumnType::NewDecimal);
        let value = decode("123.4500", &column).unwrap();
        assert_eq!(value.type_name(), "DECIMAL");
    }
}
