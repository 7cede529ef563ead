//! Codec error types.

use mysql_protocol::ProtocolError;
use thiserror::Error;

/// Errors raised by the framing layer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CodecError {
    /// I/O error on the underlying transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed packet or payload.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The peer closed the connection.
    #[error("connection closed")]
    ConnectionClosed,

    /// A single packet exceeded the protocol maximum.
    #[error("packet too large: {size} bytes (max {max})")]
    PacketTooLarge {
        /// Size of the packet payload.
        size: usize,
        /// Maximum allowed.
        max: usize,
    },

    /// The remaining I/O time budget was exhausted.
    #[error("I/O timeout expired")]
    Timeout,
}

impl CodecError {
    /// Whether this error means the transport is no longer usable.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::PacketTooLarge { .. })
    }
}
