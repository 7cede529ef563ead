//! MySQL packet codec implementation.

use bytes::{BufMut, Bytes, BytesMut};
use mysql_protocol::ProtocolError;
use mysql_protocol::packet::{MAX_PACKET_PAYLOAD, PACKET_HEADER_SIZE, PacketHeader};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::CodecError;

/// A packet with header and payload.
#[derive(Debug, Clone)]
pub struct Packet {
    /// Packet header.
    pub header: PacketHeader,
    /// Packet payload (excluding header).
    pub payload: Bytes,
}

impl Packet {
    /// Create a new packet. The sequence id is assigned by the codec.
    #[must_use]
    pub fn new(payload: Bytes) -> Self {
        Self {
            header: PacketHeader::new(payload.len() as u32, 0),
            payload,
        }
    }

    /// Get the total packet size including header.
    #[must_use]
    pub fn total_size(&self) -> usize {
        PACKET_HEADER_SIZE + self.payload.len()
    }

    /// Whether the logical payload continues in the next packet.
    #[must_use]
    pub fn has_continuation(&self) -> bool {
        self.payload.len() == MAX_PACKET_PAYLOAD
    }
}

/// Packet codec for tokio-util framing.
///
/// The codec owns the sequence id shared by both directions: every packet
/// written or read advances it by one, and it restarts at 0 when a new
/// command begins (see [`reset_sequence`](Self::reset_sequence)).
#[derive(Debug)]
pub struct MySqlCodec {
    /// Expected sequence id of the next packet in either direction.
    sequence_id: u8,
    /// Whether out-of-order sequence ids are rejected on decode.
    strict_sequence: bool,
}

impl MySqlCodec {
    /// Create a new codec with sequence checking enabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sequence_id: 0,
            strict_sequence: true,
        }
    }

    /// Enable or disable rejection of out-of-order packets.
    #[must_use]
    pub fn with_strict_sequence(mut self, strict: bool) -> Self {
        self.strict_sequence = strict;
        self
    }

    /// Sequence id the next packet will carry.
    #[must_use]
    pub fn sequence_id(&self) -> u8 {
        self.sequence_id
    }

    /// Restart the sequence at 0 for a new command.
    pub fn reset_sequence(&mut self) {
        self.sequence_id = 0;
    }

    fn next_sequence_id(&mut self) -> u8 {
        let id = self.sequence_id;
        self.sequence_id = self.sequence_id.wrapping_add(1);
        id
    }
}

impl Default for MySqlCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for MySqlCodec {
    type Item = Packet;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < PACKET_HEADER_SIZE {
            return Ok(None);
        }

        let length = usize::from(src[0]) | usize::from(src[1]) << 8 | usize::from(src[2]) << 16;
        let total = PACKET_HEADER_SIZE + length;

        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let mut packet_bytes = src.split_to(total);
        let header = PacketHeader::decode(&mut packet_bytes)?;

        if self.strict_sequence && header.sequence_id != self.sequence_id {
            return Err(ProtocolError::OutOfOrder {
                expected: self.sequence_id,
                actual: header.sequence_id,
            }
            .into());
        }
        self.sequence_id = header.sequence_id.wrapping_add(1);

        tracing::trace!(
            length = length,
            sequence_id = header.sequence_id,
            continued = header.has_continuation(),
            "decoded packet"
        );

        Ok(Some(Packet {
            header,
            payload: packet_bytes.freeze(),
        }))
    }
}

impl Encoder<Packet> for MySqlCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let length = item.payload.len();
        if length > MAX_PACKET_PAYLOAD {
            return Err(CodecError::PacketTooLarge {
                size: length,
                max: MAX_PACKET_PAYLOAD,
            });
        }

        dst.reserve(PACKET_HEADER_SIZE + length);

        let header = PacketHeader::new(length as u32, self.next_sequence_id());
        header.encode(dst);
        dst.put_slice(&item.payload);

        tracing::trace!(
            length = length,
            sequence_id = header.sequence_id,
            "encoded packet"
        );

        Ok(())
    }
}
