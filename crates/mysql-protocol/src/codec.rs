//! Byte-level reader and writer for protocol payloads.
//!
//! Every structured payload in this crate is decoded through a
//! [`PayloadReader`] and encoded through a [`PayloadWriter`]. Both operate on
//! one contiguous logical payload; physical packet framing is handled by the
//! codec layer.
//!
//! ## Length-encoded integers
//!
//! | First byte | Meaning |
//! |------------|---------|
//! | `0x00..=0xFA` | the value itself |
//! | `0xFB` | SQL `NULL` (only valid inside text rows) |
//! | `0xFC` | 2-byte little-endian value follows |
//! | `0xFD` | 3-byte little-endian value follows |
//! | `0xFE` | 8-byte little-endian value follows |
//! | `0xFF` | invalid (error packet header) |

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;

/// Prefix byte marking a SQL `NULL` in a length-encoded position.
pub const LENENC_NULL: u8 = 0xFB;
/// Prefix byte for a 2-byte length-encoded integer.
pub const LENENC_U16: u8 = 0xFC;
/// Prefix byte for a 3-byte length-encoded integer.
pub const LENENC_U24: u8 = 0xFD;
/// Prefix byte for an 8-byte length-encoded integer.
pub const LENENC_U64: u8 = 0xFE;

/// Number of bytes `value` occupies when written as a length-encoded integer.
#[must_use]
pub const fn length_encoded_int_size(value: u64) -> usize {
    if value < 0xFB {
        1
    } else if value <= 0xFFFF {
        3
    } else if value <= 0xFF_FFFF {
        4
    } else {
        9
    }
}

/// Cursor over one logical payload.
///
/// All reads are bounds-checked and fail with [`ProtocolError::UnexpectedEof`]
/// instead of panicking. Byte-string reads are zero-copy slices of the
/// underlying buffer.
#[derive(Debug, Clone)]
pub struct PayloadReader {
    buf: Bytes,
    offset: usize,
}

impl PayloadReader {
    /// Create a reader positioned at the start of `buf`.
    pub fn new(buf: impl Into<Bytes>) -> Self {
        Self {
            buf: buf.into(),
            offset: 0,
        }
    }

    /// Bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    /// Whether every byte has been consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Current read position.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Look at the next byte without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        self.buf.get(self.offset).copied()
    }

    fn ensure(&self, needed: usize) -> Result<(), ProtocolError> {
        let remaining = self.remaining();
        if remaining < needed {
            return Err(ProtocolError::UnexpectedEof { needed, remaining });
        }
        Ok(())
    }

    /// Skip `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<(), ProtocolError> {
        self.ensure(n)?;
        self.offset += n;
        Ok(())
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8, ProtocolError> {
        self.ensure(1)?;
        let b = self.buf[self.offset];
        self.offset += 1;
        Ok(b)
    }

    /// Read one byte and verify it equals `expected`.
    ///
    /// `context` names the field in the error message, e.g.
    /// `"error payload signature"`.
    pub fn read_byte(&mut self, expected: u8, context: &'static str) -> Result<(), ProtocolError> {
        let actual = self.read_u8()?;
        if actual != expected {
            return Err(ProtocolError::UnexpectedByte {
                context,
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// Read a little-endian unsigned integer of `width` bytes (1 to 8).
    pub fn read_fixed_int(&mut self, width: usize) -> Result<u64, ProtocolError> {
        if width == 0 || width > 8 {
            return Err(ProtocolError::InvalidIntegerWidth(width));
        }
        self.ensure(width)?;
        let value = self.buf[self.offset..self.offset + width]
            .iter()
            .rev()
            .fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
        self.offset += width;
        Ok(value)
    }

    /// Read a 2-byte little-endian integer.
    pub fn read_u16(&mut self) -> Result<u16, ProtocolError> {
        self.read_fixed_int(2).map(|v| v as u16)
    }

    /// Read a 3-byte little-endian integer.
    pub fn read_u24(&mut self) -> Result<u32, ProtocolError> {
        self.read_fixed_int(3).map(|v| v as u32)
    }

    /// Read a 4-byte little-endian integer.
    pub fn read_u32(&mut self) -> Result<u32, ProtocolError> {
        self.read_fixed_int(4).map(|v| v as u32)
    }

    /// Read an 8-byte little-endian integer.
    pub fn read_u64(&mut self) -> Result<u64, ProtocolError> {
        self.read_fixed_int(8)
    }

    /// Read a length-encoded integer.
    ///
    /// The `0xFB` NULL sentinel is rejected here; use
    /// [`read_length_encoded_int_or_null`](Self::read_length_encoded_int_or_null)
    /// where a NULL is legal.
    pub fn read_length_encoded_int(&mut self) -> Result<u64, ProtocolError> {
        match self.read_length_encoded_int_or_null()? {
            Some(value) => Ok(value),
            None => Err(ProtocolError::InvalidLengthPrefix(LENENC_NULL)),
        }
    }

    /// Read a length-encoded integer, mapping the `0xFB` sentinel to `None`.
    pub fn read_length_encoded_int_or_null(&mut self) -> Result<Option<u64>, ProtocolError> {
        let prefix = self.read_u8()?;
        match prefix {
            0x00..=0xFA => Ok(Some(u64::from(prefix))),
            LENENC_NULL => Ok(None),
            LENENC_U16 => self.read_fixed_int(2).map(Some),
            LENENC_U24 => self.read_fixed_int(3).map(Some),
            LENENC_U64 => self.read_fixed_int(8).map(Some),
            other => Err(ProtocolError::InvalidLengthPrefix(other)),
        }
    }

    /// Read exactly `n` bytes.
    pub fn read_byte_string(&mut self, n: usize) -> Result<Bytes, ProtocolError> {
        self.ensure(n)?;
        let bytes = self.buf.slice(self.offset..self.offset + n);
        self.offset += n;
        Ok(bytes)
    }

    /// Read a length-encoded byte string.
    pub fn read_length_encoded_bytes(&mut self) -> Result<Bytes, ProtocolError> {
        let len = self.read_length_encoded_int()?;
        let len = usize::try_from(len).map_err(|_| ProtocolError::UnexpectedEof {
            needed: usize::MAX,
            remaining: self.remaining(),
        })?;
        self.read_byte_string(len)
    }

    /// Read a length-encoded byte string that may be NULL.
    pub fn read_length_encoded_bytes_or_null(&mut self) -> Result<Option<Bytes>, ProtocolError> {
        match self.read_length_encoded_int_or_null()? {
            None => Ok(None),
            Some(len) => {
                let len = usize::try_from(len).map_err(|_| ProtocolError::UnexpectedEof {
                    needed: usize::MAX,
                    remaining: self.remaining(),
                })?;
                self.read_byte_string(len).map(Some)
            }
        }
    }

    /// Read a length-encoded UTF-8 string.
    pub fn read_length_encoded_string(&mut self) -> Result<String, ProtocolError> {
        let bytes = self.read_length_encoded_bytes()?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| ProtocolError::InvalidUtf8("length-encoded string"))
    }

    /// Read bytes up to (not including) the next zero byte, consuming the
    /// terminator.
    pub fn read_null_terminated_bytes(&mut self) -> Result<Bytes, ProtocolError> {
        let rest = &self.buf[self.offset..];
        let end = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(ProtocolError::MissingNullTerminator)?;
        let bytes = self.buf.slice(self.offset..self.offset + end);
        self.offset += end + 1;
        Ok(bytes)
    }

    /// Read a null-terminated UTF-8 string.
    pub fn read_null_terminated_string(&mut self) -> Result<String, ProtocolError> {
        let bytes = self.read_null_terminated_bytes()?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| ProtocolError::InvalidUtf8("null-terminated string"))
    }

    /// Consume and return every remaining byte.
    pub fn read_remaining(&mut self) -> Bytes {
        let bytes = self.buf.slice(self.offset..);
        self.offset = self.buf.len();
        bytes
    }
}

/// Builder for one logical payload.
#[derive(Debug, Default, Clone)]
pub struct PayloadWriter {
    buf: BytesMut,
}

impl PayloadWriter {
    /// Create an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Number of bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Append one byte.
    pub fn write_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    /// Append raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    /// Append the low `width` bytes of `value`, little-endian.
    ///
    /// `width` is clamped to 8.
    pub fn write_fixed_int(&mut self, value: u64, width: usize) {
        let width = width.min(8);
        self.buf.put_slice(&value.to_le_bytes()[..width]);
    }

    /// Append a length-encoded integer using the smallest encoding.
    pub fn write_length_encoded_int(&mut self, value: u64) {
        match length_encoded_int_size(value) {
            1 => self.buf.put_u8(value as u8),
            3 => {
                self.buf.put_u8(LENENC_U16);
                self.write_fixed_int(value, 2);
            }
            4 => {
                self.buf.put_u8(LENENC_U24);
                self.write_fixed_int(value, 3);
            }
            _ => {
                self.buf.put_u8(LENENC_U64);
                self.write_fixed_int(value, 8);
            }
        }
    }

    /// Append the `0xFB` NULL marker used in text rows.
    pub fn write_length_encoded_null(&mut self) {
        self.buf.put_u8(LENENC_NULL);
    }

    /// Append a length-encoded byte string.
    pub fn write_length_encoded_string(&mut self, value: impl AsRef<[u8]>) {
        let value = value.as_ref();
        self.write_length_encoded_int(value.len() as u64);
        self.buf.put_slice(value);
    }

    /// Append a string followed by a zero byte.
    pub fn write_null_terminated_string(&mut self, value: impl AsRef<[u8]>) {
        self.buf.put_slice(value.as_ref());
        self.buf.put_u8(0);
    }

    /// Finish and return the payload.
    #[must_use]
    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }

    /// Finish and return the mutable buffer.
    #[must_use]
    pub fn into_inner(self) -> BytesMut {
        self.buf
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn encode_lenenc(value: u64) -> Bytes {
        let mut w = PayloadWriter::new();
        w.write_length_encoded_int(value);
        w.freeze()
    }

    #[test]
    fn test_length_encoded_prefixes() {
        assert_eq!(&encode_lenenc(0)[..], &[0x00]);
        assert_eq!(&encode_lenenc(250)[..], &[0xFA]);
        assert_eq!(&encode_lenenc(251)[..], &[0xFC, 0xFB, 0x00]);
        assert_eq!(&encode_lenenc(65535)[..], &[0xFC, 0xFF, 0xFF]);
        assert_eq!(&encode_lenenc(65536)[..], &[0xFD, 0x00, 0x00, 0x01]);
        assert_eq!(&encode_lenenc(16_777_215)[..], &[0xFD, 0xFF, 0xFF, 0xFF]);
        assert_eq!(encode_lenenc(16_777_216)[0], 0xFE);
        assert_eq!(encode_lenenc(u64::MAX).len(), 9);
    }

    #[test]
    fn test_null_sentinel() {
        let mut r = PayloadReader::new(&[0xFB][..]);
        assert_eq!(r.read_length_encoded_int_or_null().unwrap(), None);

        let mut r = PayloadReader::new(&[0xFB][..]);
        assert_eq!(
            r.read_length_encoded_int(),
            Err(ProtocolError::InvalidLengthPrefix(0xFB))
        );
    }

    #[test]
    fn test_invalid_prefix() {
        let mut r = PayloadReader::new(&[0xFF, 0x00, 0x00][..]);
        assert_eq!(
            r.read_length_encoded_int(),
            Err(ProtocolError::InvalidLengthPrefix(0xFF))
        );
    }

    #[test]
    fn test_short_buffer_is_error() {
        let mut r = PayloadReader::new(&[0xFD, 0x01][..]);
        assert!(matches!(
            r.read_length_encoded_int(),
            Err(ProtocolError::UnexpectedEof { needed: 3, remaining: 1 })
        ));

        let mut r = PayloadReader::new(&[0x01, 0x02][..]);
        assert!(r.read_fixed_int(4).is_err());
        assert!(r.read_fixed_int(9).is_err());
    }

    #[test]
    fn test_fixed_int_little_endian() {
        let mut r = PayloadReader::new(&[0x84, 0x03, 0x01, 0x02, 0x03][..]);
        assert_eq!(r.read_fixed_int(2).unwrap(), 900);
        assert_eq!(r.read_u24().unwrap(), 0x030201);
        assert!(r.is_empty());
    }

    #[test]
    fn test_null_terminated_string() {
        let mut r = PayloadReader::new(&b"8.0.36\0rest"[..]);
        assert_eq!(r.read_null_terminated_string().unwrap(), "8.0.36");
        assert_eq!(&r.read_remaining()[..], b"rest");

        let mut r = PayloadReader::new(&b"unterminated"[..]);
        assert_eq!(
            r.read_null_terminated_string(),
            Err(ProtocolError::MissingNullTerminator)
        );
    }

    #[test]
    fn test_length_encoded_string() {
        let mut w = PayloadWriter::new();
        w.write_length_encoded_string("def");
        w.write_null_terminated_string("x");
        let mut r = PayloadReader::new(w.freeze());
        assert_eq!(r.read_length_encoded_string().unwrap(), "def");
        assert_eq!(r.read_null_terminated_string().unwrap(), "x");
    }

    #[test]
    fn test_read_byte_reports_mismatch() {
        let mut r = PayloadReader::new(&[0x00][..]);
        let err = r.read_byte(0xFF, "error payload signature").unwrap_err();
        assert_eq!(
            err.to_string(),
            "expected error payload signature byte 0xFF, got 0x00"
        );
    }

    proptest! {
        #[test]
        fn lenenc_roundtrip_small(v in 0u64..=250) {
            let bytes = encode_lenenc(v);
            prop_assert_eq!(bytes.len(), 1);
            prop_assert_eq!(PayloadReader::new(bytes).read_length_encoded_int().unwrap(), v);
        }

        #[test]
        fn lenenc_roundtrip_u16(v in 251u64..=65_535) {
            let bytes = encode_lenenc(v);
            prop_assert_eq!(bytes[0], LENENC_U16);
            prop_assert_eq!(PayloadReader::new(bytes).read_length_encoded_int().unwrap(), v);
        }

        #[test]
        fn lenenc_roundtrip_u24(v in 65_536u64..=16_777_215) {
            let bytes = encode_lenenc(v);
            prop_assert_eq!(bytes[0], LENENC_U24);
            prop_assert_eq!(PayloadReader::new(bytes).read_length_encoded_int().unwrap(), v);
        }

        #[test]
        fn lenenc_roundtrip_u64(v in 16_777_216u64..=u64::MAX) {
            let bytes = encode_lenenc(v);
            prop_assert_eq!(bytes[0], LENENC_U64);
            prop_assert_eq!(PayloadReader::new(bytes).read_length_encoded_int().unwrap(), v);
        }

        #[test]
        fn reader_never_panics(data in proptest::collection::vec(any::<u8>(), 0..64)) {
            let mut r = PayloadReader::new(data);
            let _ = r.read_length_encoded_bytes_or_null();
            let _ = r.read_null_terminated_string();
            let _ = r.read_fixed_int(8);
        }
    }
}
