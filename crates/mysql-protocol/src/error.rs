//! Protocol error types.

use thiserror::Error;

/// Errors raised while decoding or encoding protocol payloads.
///
/// A `ProtocolError` means the bytes on the wire did not match the expected
/// layout. The session that produced them cannot be trusted afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// The payload ended before a field could be read.
    #[error("unexpected end of payload: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof {
        /// Bytes required by the field being read.
        needed: usize,
        /// Bytes left in the payload.
        remaining: usize,
    },

    /// Packet header is incomplete.
    #[error("incomplete packet header: expected {expected} bytes, got {actual}")]
    IncompletePacket {
        /// Bytes required.
        expected: usize,
        /// Bytes available.
        actual: usize,
    },

    /// A one-byte signature or tag did not have the expected value.
    #[error("expected {context} byte 0x{expected:02X}, got 0x{actual:02X}")]
    UnexpectedByte {
        /// What the byte identifies (e.g. "error payload signature").
        context: &'static str,
        /// Expected value.
        expected: u8,
        /// Value found on the wire.
        actual: u8,
    },

    /// Invalid prefix byte for a length-encoded integer.
    #[error("invalid length-encoded integer prefix 0x{0:02X}")]
    InvalidLengthPrefix(u8),

    /// Fixed integer width outside 1..=8.
    #[error("invalid fixed integer width {0}")]
    InvalidIntegerWidth(usize),

    /// A null-terminated string had no terminator.
    #[error("missing null terminator")]
    MissingNullTerminator,

    /// String data was not valid UTF-8.
    #[error("invalid UTF-8 in {0}")]
    InvalidUtf8(&'static str),

    /// The server speaks a handshake protocol version we do not implement.
    #[error("unsupported handshake protocol version {0}")]
    UnsupportedProtocolVersion(u8),

    /// The server requested an authentication plugin we do not implement.
    #[error("unsupported authentication plugin '{0}'")]
    UnsupportedAuthPlugin(String),

    /// The server does not support a capability the client requires.
    #[error("server does not support required capability: {0}")]
    MissingCapability(&'static str),

    /// A reply started with a header byte that is not valid at this point.
    #[error("unexpected {context} header byte 0x{header:02X}")]
    UnexpectedHeader {
        /// Which exchange was in progress.
        context: &'static str,
        /// Header byte received.
        header: u8,
    },

    /// Packet sequence id did not follow the previous one.
    #[error("packet out of order: expected sequence {expected}, got {actual}")]
    OutOfOrder {
        /// Expected sequence id.
        expected: u8,
        /// Sequence id received.
        actual: u8,
    },

    /// Payload exceeds the protocol maximum.
    #[error("payload of {size} bytes exceeds maximum {max}")]
    PayloadTooLarge {
        /// Size of the payload.
        size: usize,
        /// Maximum allowed.
        max: usize,
    },

    /// Unknown column type code.
    #[error("unknown column type 0x{0:02X}")]
    UnknownColumnType(u8),

    /// A result set header announced more columns than a table can have.
    #[error("result set header announces {count} columns, maximum is {max}")]
    TooManyColumns {
        /// Column count received.
        count: u64,
        /// Maximum allowed.
        max: u64,
    },

    /// Trailing bytes left after a payload was fully decoded.
    #[error("{0} trailing bytes after payload")]
    TrailingBytes(usize),
}
