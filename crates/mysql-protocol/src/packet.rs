//! Packet header definitions.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;

/// Packet header size in bytes (3-byte length + 1-byte sequence id).
pub const PACKET_HEADER_SIZE: usize = 4;

/// Largest payload a single packet can carry.
///
/// A packet whose payload is exactly this size signals that the logical
/// payload continues in the next packet.
pub const MAX_PACKET_PAYLOAD: usize = 0xFF_FFFF;

/// Largest logical payload body the client advertises as its max packet size.
pub const MAX_PAYLOAD_BODY: u32 = 0xFF_FFF0;

/// Packet header.
///
/// Every packet begins with a 4-byte header carrying the payload length and a
/// sequence id. The sequence id starts at 0 for each command and increments
/// with every packet in either direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacketHeader {
    /// Payload length (excluding the header), at most [`MAX_PACKET_PAYLOAD`].
    pub length: u32,
    /// Packet sequence number (wraps at 255).
    pub sequence_id: u8,
}

impl PacketHeader {
    /// Create a new packet header.
    #[must_use]
    pub const fn new(length: u32, sequence_id: u8) -> Self {
        Self {
            length,
            sequence_id,
        }
    }

    /// Parse a packet header from bytes.
    pub fn decode(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        if src.remaining() < PACKET_HEADER_SIZE {
            return Err(ProtocolError::IncompletePacket {
                expected: PACKET_HEADER_SIZE,
                actual: src.remaining(),
            });
        }

        let length = src.get_uint_le(3) as u32;
        let sequence_id = src.get_u8();

        Ok(Self {
            length,
            sequence_id,
        })
    }

    /// Encode the packet header to bytes.
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_uint_le(u64::from(self.length & 0xFF_FFFF), 3);
        dst.put_u8(self.sequence_id);
    }

    /// Encode the packet header to a new `Bytes` buffer.
    #[must_use]
    pub fn encode_to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(PACKET_HEADER_SIZE);
        self.encode(&mut buf);
        buf.freeze()
    }

    /// Payload length as `usize`.
    #[must_use]
    pub const fn payload_length(&self) -> usize {
        self.length as usize
    }

    /// Whether another packet of the same logical payload follows.
    #[must_use]
    pub const fn has_continuation(&self) -> bool {
        self.length as usize == MAX_PACKET_PAYLOAD
    }

    /// Set the sequence id.
    #[must_use]
    pub const fn with_sequence_id(mut self, id: u8) -> Self {
        self.sequence_id = id;
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip() {
        let header = PacketHeader::new(0x01_02_03, 7);

        let bytes = header.encode_to_bytes();
        assert_eq!(&bytes[..], &[0x03, 0x02, 0x01, 0x07]);

        let mut cursor = bytes.as_ref();
        let decoded = PacketHeader::decode(&mut cursor).unwrap();
        assert_eq!(header, decoded);
    }

    #[test]
    fn test_incomplete_header() {
        let mut cursor: &[u8] = &[0x01, 0x00];
        assert_eq!(
            PacketHeader::decode(&mut cursor),
            Err(ProtocolError::IncompletePacket {
                expected: 4,
                actual: 2
            })
        );
    }

    #[test]
    fn test_continuation() {
        assert!(PacketHeader::new(MAX_PACKET_PAYLOAD as u32, 0).has_continuation());
        assert!(!PacketHeader::new(MAX_PAYLOAD_BODY, 0).has_continuation());
        assert!(!PacketHeader::new(0, 0).has_continuation());
    }
}
