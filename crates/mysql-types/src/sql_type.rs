//! Declared MySQL column and parameter types.

use std::fmt;

/// A MySQL data type as declared in a schema.
///
/// Used for stored-procedure parameter metadata, where the server reports
/// the `DATA_TYPE` column of `information_schema.parameters`. Signedness is
/// tracked separately since `DATA_TYPE` never carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum SqlType {
    /// BIT(n).
    Bit,
    /// TINYINT.
    TinyInt,
    /// SMALLINT.
    SmallInt,
    /// MEDIUMINT.
    MediumInt,
    /// INT / INTEGER.
    Int,
    /// BIGINT.
    BigInt,
    /// FLOAT.
    Float,
    /// DOUBLE / REAL.
    Double,
    /// DECIMAL / NUMERIC.
    Decimal,
    /// CHAR.
    Char,
    /// VARCHAR.
    VarChar,
    /// TINYTEXT, TEXT, MEDIUMTEXT, LONGTEXT.
    Text,
    /// BINARY.
    Binary,
    /// VARBINARY.
    VarBinary,
    /// TINYBLOB, BLOB, MEDIUMBLOB, LONGBLOB.
    Blob,
    /// DATE.
    Date,
    /// TIME.
    Time,
    /// DATETIME.
    DateTime,
    /// TIMESTAMP.
    Timestamp,
    /// YEAR.
    Year,
    /// ENUM.
    Enum,
    /// SET.
    Set,
    /// JSON.
    Json,
    /// Spatial types (GEOMETRY, POINT, ...).
    Geometry,
}

impl SqlType {
    /// Map a `DATA_TYPE` value from `information_schema` to a type.
    ///
    /// Matching is case-insensitive. Returns `None` for names this driver
    /// does not know.
    #[must_use]
    pub fn from_data_type(data_type: &str) -> Option<Self> {
        let ty = match data_type.trim().to_ascii_lowercase().as_str() {
            "bit" => Self::Bit,
            "tinyint" | "bool" | "boolean" => Self::TinyInt,
            "smallint" => Self::SmallInt,
            "mediumint" => Self::MediumInt,
            "int" | "integer" => Self::Int,
            "bigint" => Self::BigInt,
            "float" => Self::Float,
            "double" | "real" => Self::Double,
            "decimal" | "numeric" => Self::Decimal,
            "char" => Self::Char,
            "varchar" => Self::VarChar,
            "tinytext" | "text" | "mediumtext" | "longtext" => Self::Text,
            "binary" => Self::Binary,
            "varbinary" => Self::VarBinary,
            "tinyblob" | "blob" | "mediumblob" | "longblob" => Self::Blob,
            "date" => Self::Date,
            "time" => Self::Time,
            "datetime" => Self::DateTime,
            "timestamp" => Self::Timestamp,
            "year" => Self::Year,
            "enum" => Self::Enum,
            "set" => Self::Set,
            "json" => Self::Json,
            "geometry" | "point" | "linestring" | "polygon" | "multipoint"
            | "multilinestring" | "multipolygon" | "geometrycollection" => Self::Geometry,
            _ => return None,
        };
        Some(ty)
    }

    /// Whether values of this type are integers.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            Self::TinyInt | Self::SmallInt | Self::MediumInt | Self::Int | Self::BigInt | Self::Year
        )
    }

    /// Whether values of this type are raw bytes.
    #[must_use]
    pub const fn is_binary(self) -> bool {
        matches!(
            self,
            Self::Binary | Self::VarBinary | Self::Blob | Self::Geometry
        )
    }

    /// Upper-case SQL name of the type.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bit => "BIT",
            Self::TinyInt => "TINYINT",
            Self::SmallInt => "SMALLINT",
            Self::MediumInt => "MEDIUMINT",
            Self::Int => "INT",
            Self::BigInt => "BIGINT",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::Decimal => "DECIMAL",
            Self::Char => "CHAR",
            Self::VarChar => "VARCHAR",
            Self::Text => "TEXT",
            Self::Binary => "BINARY",
            Self::VarBinary => "VARBINARY",
            Self::Blob => "BLOB",
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::DateTime => "DATETIME",
            Self::Timestamp => "TIMESTAMP",
            Self::Year => "YEAR",
            Self::Enum => "ENUM",
            Self::Set => "SET",
            Self::Json => "JSON",
            Self::Geometry => "GEOMETRY",
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_data_type() {
        assert_eq!(SqlType::from_data_type("int"), Some(SqlType::Int));
        assert_eq!(SqlType::from_data_type("VARCHAR"), Some(SqlType::VarChar));
        assert_eq!(SqlType::from_data_type("longblob"), Some(SqlType::Blob));
        assert_eq!(SqlType::from_data_type("point"), Some(SqlType::Geometry));
        assert_eq!(SqlType::from_data_type("vector"), None);
    }

    #[test]
    fn test_classification() {
        assert!(SqlType::BigInt.is_integer());
        assert!(!SqlType::Decimal.is_integer());
        assert!(SqlType::VarBinary.is_binary());
        assert_eq!(SqlType::DateTime.to_string(), "DATETIME");
    }
}
