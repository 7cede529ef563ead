//! Text-protocol result set payloads.
//!
//! A `COM_QUERY` reply that returns rows is laid out as:
//!
//! ```text
//! column count (length-encoded int)
//! ColumnDefinition41 * column count
//! EOF
//! text row * n
//! EOF | ERR
//! ```

use bitflags::bitflags;
use bytes::Bytes;

use crate::codec::{PayloadReader, PayloadWriter};
use crate::error::ProtocolError;

/// Length of the fixed-size block inside a column definition.
const COLUMN_FIXED_FIELDS_LEN: u64 = 0x0C;

/// Column type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum ColumnType {
    Decimal = 0x00,
    Tiny = 0x01,
    Short = 0x02,
    Long = 0x03,
    Float = 0x04,
    Double = 0x05,
    Null = 0x06,
    Timestamp = 0x07,
    LongLong = 0x08,
    Int24 = 0x09,
    Date = 0x0A,
    Time = 0x0B,
    DateTime = 0x0C,
    Year = 0x0D,
    VarChar = 0x0F,
    Bit = 0x10,
    Json = 0xF5,
    NewDecimal = 0xF6,
    Enum = 0xF7,
    Set = 0xF8,
    TinyBlob = 0xF9,
    MediumBlob = 0xFA,
    LongBlob = 0xFB,
    Blob = 0xFC,
    VarString = 0xFD,
    String = 0xFE,
    Geometry = 0xFF,
}

impl ColumnType {
    /// Create a column type from a raw byte value.
    pub fn from_u8(value: u8) -> Result<Self, ProtocolError> {
        Ok(match value {
            0x00 => Self::Decimal,
            0x01 => Self::Tiny,
            0x02 => Self::Short,
            0x03 => Self::Long,
            0x04 => Self::Float,
            0x05 => Self::Double,
            0x06 => Self::Null,
            0x07 => Self::Timestamp,
            0x08 => Self::LongLong,
            0x09 => Self::Int24,
            0x0A => Self::Date,
            0x0B => Self::Time,
            0x0C => Self::DateTime,
            0x0D => Self::Year,
            0x0F => Self::VarChar,
            0x10 => Self::Bit,
            0xF5 => Self::Json,
            0xF6 => Self::NewDecimal,
            0xF7 => Self::Enum,
            0xF8 => Self::Set,
            0xF9 => Self::TinyBlob,
            0xFA => Self::MediumBlob,
            0xFB => Self::LongBlob,
            0xFC => Self::Blob,
            0xFD => Self::VarString,
            0xFE => Self::String,
            0xFF => Self::Geometry,
            other => return Err(ProtocolError::UnknownColumnType(other)),
        })
    }

    /// Whether the type is an integer type.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            Self::Tiny | Self::Short | Self::Long | Self::LongLong | Self::Int24 | Self::Year
        )
    }

    /// Whether values of this type may contain arbitrary bytes.
    #[must_use]
    pub const fn is_blob(self) -> bool {
        matches!(
            self,
            Self::TinyBlob | Self::MediumBlob | Self::LongBlob | Self::Blob | Self::Geometry
        )
    }
}

bitflags! {
    /// Column definition flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ColumnFlags: u16 {
        /// Column cannot be NULL.
        const NOT_NULL = 0x0001;
        /// Part of the primary key.
        const PRIMARY_KEY = 0x0002;
        /// Part of a unique key.
        const UNIQUE_KEY = 0x0004;
        /// Part of a non-unique key.
        const MULTIPLE_KEY = 0x0008;
        /// BLOB or TEXT column.
        const BLOB = 0x0010;
        /// Unsigned integer column.
        const UNSIGNED = 0x0020;
        /// Zero-fill column.
        const ZEROFILL = 0x0040;
        /// Binary collation.
        const BINARY = 0x0080;
        /// ENUM column.
        const ENUM = 0x0100;
        /// AUTO_INCREMENT column.
        const AUTO_INCREMENT = 0x0200;
        /// TIMESTAMP column.
        const TIMESTAMP = 0x0400;
        /// SET column.
        const SET = 0x0800;
    }
}

/// Collation id of the `binary` character set.
pub const BINARY_COLLATION: u16 = 63;

/// Column metadata (`ColumnDefinition41`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    /// Schema of the source table.
    pub schema: String,
    /// Table alias.
    pub table: String,
    /// Physical table name.
    pub org_table: String,
    /// Column alias.
    pub name: String,
    /// Physical column name.
    pub org_name: String,
    /// Collation id.
    pub character_set: u16,
    /// Maximum display length.
    pub column_length: u32,
    /// Column type.
    pub column_type: ColumnType,
    /// Column flags.
    pub flags: ColumnFlags,
    /// Number of decimals.
    pub decimals: u8,
}

impl ColumnDefinition {
    /// Create a column definition with just a name and type.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            schema: String::new(),
            table: String::new(),
            org_table: String::new(),
            name: name.into(),
            org_name: String::new(),
            character_set: crate::handshake::UTF8MB4_GENERAL_CI as u16,
            column_length: 0,
            column_type,
            flags: ColumnFlags::empty(),
            decimals: 0,
        }
    }

    /// Set the column flags.
    #[must_use]
    pub fn with_flags(mut self, flags: ColumnFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Whether the column holds unsigned integers.
    #[must_use]
    pub fn is_unsigned(&self) -> bool {
        self.flags.contains(ColumnFlags::UNSIGNED)
    }

    /// Whether the column uses the binary character set.
    #[must_use]
    pub fn is_binary(&self) -> bool {
        self.character_set == BINARY_COLLATION
    }

    /// Decode a column definition payload.
    pub fn decode(payload: impl Into<Bytes>) -> Result<Self, ProtocolError> {
        let mut r = PayloadReader::new(payload);
        let _catalog = r.read_length_encoded_bytes()?;
        let schema = r.read_length_encoded_string()?;
        let table = r.read_length_encoded_string()?;
        let org_table = r.read_length_encoded_string()?;
        let name = r.read_length_encoded_string()?;
        let org_name = r.read_length_encoded_string()?;
        let fixed_len = r.read_length_encoded_int()?;
        if fixed_len < COLUMN_FIXED_FIELDS_LEN {
            return Err(ProtocolError::UnexpectedEof {
                needed: COLUMN_FIXED_FIELDS_LEN as usize,
                remaining: fixed_len as usize,
            });
        }
        let character_set = r.read_u16()?;
        let column_length = r.read_u32()?;
        let column_type = ColumnType::from_u8(r.read_u8()?)?;
        let flags = ColumnFlags::from_bits_truncate(r.read_u16()?);
        let decimals = r.read_u8()?;

        Ok(Self {
            schema,
            table,
            org_table,
            name,
            org_name,
            character_set,
            column_length,
            column_type,
            flags,
            decimals,
        })
    }

    /// Encode the column definition (server side).
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut w = PayloadWriter::with_capacity(32 + self.name.len() * 2);
        w.write_length_encoded_string("def");
        w.write_length_encoded_string(&self.schema);
        w.write_length_encoded_string(&self.table);
        w.write_length_encoded_string(&self.org_table);
        w.write_length_encoded_string(&self.name);
        w.write_length_encoded_string(&self.org_name);
        w.write_length_encoded_int(COLUMN_FIXED_FIELDS_LEN);
        w.write_fixed_int(u64::from(self.character_set), 2);
        w.write_fixed_int(u64::from(self.column_length), 4);
        w.write_u8(self.column_type as u8);
        w.write_fixed_int(u64::from(self.flags.bits()), 2);
        w.write_u8(self.decimals);
        w.write_fixed_int(0, 2);
        w.freeze()
    }
}

/// Largest column count a server can send; InnoDB tables are capped at 4096.
pub const MAX_COLUMNS: u64 = 4096;

/// Decode the column count that starts a result set.
///
/// Counts above [`MAX_COLUMNS`] are rejected so a corrupt header cannot
/// drive allocation.
pub fn decode_column_count(payload: impl Into<Bytes>) -> Result<usize, ProtocolError> {
    let mut r = PayloadReader::new(payload);
    let count = r.read_length_encoded_int()?;
    if count > MAX_COLUMNS {
        return Err(ProtocolError::TooManyColumns {
            count,
            max: MAX_COLUMNS,
        });
    }
    Ok(count as usize)
}

/// Decode a text-protocol row into one optional value per column.
pub fn decode_text_row(
    payload: impl Into<Bytes>,
    column_count: usize,
) -> Result<Vec<Option<Bytes>>, ProtocolError> {
    let mut r = PayloadReader::new(payload);
    // Every value takes at least one byte.
    let mut values = Vec::with_capacity(column_count.min(r.remaining()));
    for _ in 0..column_count {
        values.push(r.read_length_encoded_bytes_or_null()?);
    }
    if !r.is_empty() {
        return Err(ProtocolError::TrailingBytes(r.remaining()));
    }
    Ok(values)
}

/// Encode a text-protocol row (server side).
#[must_use]
pub fn encode_text_row<V: AsRef<[u8]>>(values: &[Option<V>]) -> Bytes {
    let mut w = PayloadWriter::new();
    for value in values {
        match value {
            Some(v) => w.write_length_encoded_string(v),
            None => w.write_length_encoded_null(),
        }
    }
    w.freeze()
}
