//! Logical payload reassembly.
//!
//! A logical payload of `0xFFFFFF` bytes or more is split across several
//! packets. Every packet except the last carries exactly `0xFFFFFF` bytes; a
//! payload whose length is an exact multiple of that is terminated by an empty
//! packet.

use bytes::{Bytes, BytesMut};
use mysql_protocol::packet::MAX_PACKET_PAYLOAD;

use crate::packet_codec::Packet;

/// Reassembles packets into complete logical payloads.
#[derive(Debug, Default)]
pub struct PayloadAssembler {
    /// Buffer for accumulating packet payloads.
    buffer: BytesMut,
    /// Number of packets accumulated.
    packet_count: usize,
}

impl PayloadAssembler {
    /// Create a new assembler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a packet into the assembler.
    ///
    /// Returns `Some(payload)` if this packet completes a logical payload,
    /// `None` if more packets are needed.
    pub fn push(&mut self, packet: Packet) -> Option<Bytes> {
        let continued = packet.payload.len() == MAX_PACKET_PAYLOAD;

        // Fast path: a single packet needs no buffering.
        if self.packet_count == 0 && !continued {
            return Some(packet.payload);
        }

        self.buffer.extend_from_slice(&packet.payload);
        self.packet_count += 1;

        tracing::trace!(
            packet_count = self.packet_count,
            buffer_len = self.buffer.len(),
            continued = continued,
            "assembling payload"
        );

        if continued {
            None
        } else {
            self.packet_count = 0;
            Some(self.buffer.split().freeze())
        }
    }

    /// Check if the assembler has partial data buffered.
    #[must_use]
    pub fn has_partial(&self) -> bool {
        self.packet_count > 0
    }

    /// Get the number of packets accumulated so far.
    #[must_use]
    pub fn packet_count(&self) -> usize {
        self.packet_count
    }

    /// Clear any partial payload data.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.packet_count = 0;
    }
}

/// Split a logical payload into packet-sized chunks.
///
/// The result always ends with a chunk shorter than `MAX_PACKET_PAYLOAD`,
/// which may be empty.
#[must_use]
pub fn split_payload(payload: &Bytes) -> Vec<Bytes> {
    let mut chunks = Vec::with_capacity(payload.len() / MAX_PACKET_PAYLOAD + 1);
    let mut offset = 0;
    loop {
        let end = (offset + MAX_PACKET_PAYLOAD).min(payload.len());
        chunks.push(payload.slice(offset..end));
        if end - offset < MAX_PACKET_PAYLOAD {
            break;
        }
        offset = end;
    }
    chunks
}
