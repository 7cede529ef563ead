//! Connection-phase payloads.
//!
//! The server opens every connection with an [`InitialHandshake`]
//! (protocol version 10). The client answers with a [`HandshakeResponse`]
//! (`HandshakeResponse41`) carrying the user name, the authentication
//! response computed from the server nonce, and optionally the initial
//! database.

use bytes::Bytes;

use crate::capabilities::{CapabilityFlags, StatusFlags};
use crate::codec::{PayloadReader, PayloadWriter};
use crate::error::ProtocolError;
use crate::packet::MAX_PAYLOAD_BODY;

/// Handshake protocol version implemented by this crate.
pub const PROTOCOL_VERSION: u8 = 10;

/// `utf8mb4_general_ci` collation id.
pub const UTF8MB4_GENERAL_CI: u8 = 45;

/// Length of the first part of the nonce.
const AUTH_DATA_PART1_LEN: usize = 8;

/// Minimum length of the second part of the nonce (including its trailing NUL).
const AUTH_DATA_PART2_MIN_LEN: usize = 13;

/// Number of reserved bytes after the auth data length.
const HANDSHAKE_RESERVED_LEN: usize = 10;

/// Number of reserved bytes in the handshake response.
const RESPONSE_RESERVED_LEN: usize = 23;

/// The server's initial handshake (`HandshakeV10`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialHandshake {
    /// Handshake protocol version (always 10).
    pub protocol_version: u8,
    /// Human-readable server version.
    pub server_version: String,
    /// Server-side connection (thread) id, used by `KILL QUERY`.
    pub connection_id: u32,
    /// Nonce for the authentication scramble.
    pub auth_plugin_data: Bytes,
    /// Capabilities offered by the server.
    pub capabilities: CapabilityFlags,
    /// Default collation id.
    pub character_set: u8,
    /// Initial server status.
    pub status: StatusFlags,
    /// Default authentication plugin name.
    pub auth_plugin_name: String,
}

impl InitialHandshake {
    /// Decode a handshake payload.
    pub fn decode(payload: impl Into<Bytes>) -> Result<Self, ProtocolError> {
        let mut r = PayloadReader::new(payload);

        let protocol_version = r.read_u8()?;
        if protocol_version != PROTOCOL_VERSION {
            return Err(ProtocolError::UnsupportedProtocolVersion(protocol_version));
        }

        let server_version = r.read_null_terminated_string()?;
        let connection_id = r.read_u32()?;
        let part1 = r.read_byte_string(AUTH_DATA_PART1_LEN)?;
        r.skip(1)?;
        let mut capability_bits = u32::from(r.read_u16()?);

        let mut character_set = 0;
        let mut status = StatusFlags::empty();
        let mut auth_data_len = 0usize;
        if !r.is_empty() {
            character_set = r.read_u8()?;
            status = StatusFlags::from_bits_truncate(r.read_u16()?);
            capability_bits |= u32::from(r.read_u16()?) << 16;
            auth_data_len = usize::from(r.read_u8()?);
            r.skip(HANDSHAKE_RESERVED_LEN)?;
        }
        let capabilities = CapabilityFlags::from_bits_truncate(capability_bits);

        let mut nonce = part1.to_vec();
        if capabilities.contains(CapabilityFlags::SECURE_CONNECTION) {
            let part2_len = AUTH_DATA_PART2_MIN_LEN
                .max(auth_data_len.saturating_sub(AUTH_DATA_PART1_LEN))
                .min(r.remaining());
            let part2 = r.read_byte_string(part2_len)?;
            let trimmed = part2.strip_suffix(&[0]).unwrap_or(&part2[..]);
            nonce.extend_from_slice(trimmed);
        }

        let auth_plugin_name = if capabilities.contains(CapabilityFlags::PLUGIN_AUTH) {
            // Some servers omit the terminator on the final field.
            match r.read_null_terminated_string() {
                Ok(name) => name,
                Err(ProtocolError::MissingNullTerminator) => {
                    String::from_utf8(r.read_remaining().to_vec())
                        .map_err(|_| ProtocolError::InvalidUtf8("auth plugin name"))?
                }
                Err(e) => return Err(e),
            }
        } else {
            String::new()
        };

        Ok(Self {
            protocol_version,
            server_version,
            connection_id,
            auth_plugin_data: Bytes::from(nonce),
            capabilities,
            character_set,
            status,
            auth_plugin_name,
        })
    }

    /// Encode the handshake (server side).
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut w = PayloadWriter::with_capacity(64 + self.server_version.len());
        w.write_u8(self.protocol_version);
        w.write_null_terminated_string(&self.server_version);
        w.write_fixed_int(u64::from(self.connection_id), 4);

        let nonce = &self.auth_plugin_data;
        let split = nonce.len().min(AUTH_DATA_PART1_LEN);
        let mut part1 = [0u8; AUTH_DATA_PART1_LEN];
        part1[..split].copy_from_slice(&nonce[..split]);
        w.write_bytes(&part1);
        w.write_u8(0);

        let bits = self.capabilities.bits();
        w.write_fixed_int(u64::from(bits & 0xFFFF), 2);
        w.write_u8(self.character_set);
        w.write_fixed_int(u64::from(self.status.bits()), 2);
        w.write_fixed_int(u64::from(bits >> 16), 2);
        w.write_u8((nonce.len() + 1).min(255) as u8);
        w.write_bytes(&[0; HANDSHAKE_RESERVED_LEN]);

        if self.capabilities.contains(CapabilityFlags::SECURE_CONNECTION) {
            let part2 = &nonce[split..];
            w.write_bytes(part2);
            let written = part2.len() + 1;
            w.write_u8(0);
            for _ in written..AUTH_DATA_PART2_MIN_LEN {
                w.write_u8(0);
            }
        }
        if self.capabilities.contains(CapabilityFlags::PLUGIN_AUTH) {
            w.write_null_terminated_string(&self.auth_plugin_name);
        }
        w.freeze()
    }
}

/// The client's handshake response (`HandshakeResponse41`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeResponse {
    /// Capabilities the client will use.
    pub capabilities: CapabilityFlags,
    /// Largest packet the client is willing to receive.
    pub max_packet_size: u32,
    /// Collation id for the connection.
    pub character_set: u8,
    /// Login user name.
    pub username: String,
    /// Authentication response (scrambled password).
    pub auth_response: Bytes,
    /// Initial database, sent when `CONNECT_WITH_DB` is set.
    pub database: Option<String>,
    /// Authentication plugin the response was computed with.
    pub auth_plugin_name: String,
}

impl HandshakeResponse {
    /// Create a response with default packet size and character set.
    pub fn new(
        capabilities: CapabilityFlags,
        username: impl Into<String>,
        auth_response: impl Into<Bytes>,
    ) -> Self {
        Self {
            capabilities,
            max_packet_size: MAX_PAYLOAD_BODY,
            character_set: UTF8MB4_GENERAL_CI,
            username: username.into(),
            auth_response: auth_response.into(),
            database: None,
            auth_plugin_name: String::new(),
        }
    }

    /// Set the initial database and the matching capability bit.
    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self.capabilities |= CapabilityFlags::CONNECT_WITH_DB;
        self
    }

    /// Set the authentication plugin name.
    #[must_use]
    pub fn with_auth_plugin(mut self, name: impl Into<String>) -> Self {
        self.auth_plugin_name = name.into();
        self
    }

    /// Encode the response.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut w = PayloadWriter::with_capacity(64 + self.username.len() + self.auth_response.len());
        w.write_fixed_int(u64::from(self.capabilities.bits()), 4);
        w.write_fixed_int(u64::from(self.max_packet_size), 4);
        w.write_u8(self.character_set);
        w.write_bytes(&[0; RESPONSE_RESERVED_LEN]);
        w.write_null_terminated_string(&self.username);

        if self
            .capabilities
            .contains(CapabilityFlags::PLUGIN_AUTH_LENENC_CLIENT_DATA)
        {
            w.write_length_encoded_string(&self.auth_response);
        } else if self.capabilities.contains(CapabilityFlags::SECURE_CONNECTION) {
            w.write_u8(self.auth_response.len().min(255) as u8);
            w.write_bytes(&self.auth_response[..self.auth_response.len().min(255)]);
        } else {
            w.write_null_terminated_string(&self.auth_response);
        }

        if self.capabilities.contains(CapabilityFlags::CONNECT_WITH_DB) {
            w.write_null_terminated_string(self.database.as_deref().unwrap_or_default());
        }
        if self.capabilities.contains(CapabilityFlags::PLUGIN_AUTH) {
            w.write_null_terminated_string(&self.auth_plugin_name);
        }
        w.freeze()
    }

    /// Decode a response (server side).
    pub fn decode(payload: impl Into<Bytes>) -> Result<Self, ProtocolError> {
        let mut r = PayloadReader::new(payload);
        let capabilities = CapabilityFlags::from_bits_truncate(r.read_u32()?);
        if !capabilities.contains(CapabilityFlags::PROTOCOL_41) {
            return Err(ProtocolError::MissingCapability("PROTOCOL_41"));
        }
        let max_packet_size = r.read_u32()?;
        let character_set = r.read_u8()?;
        r.skip(RESPONSE_RESERVED_LEN)?;
        let username = r.read_null_terminated_string()?;

        let auth_response = if capabilities.contains(CapabilityFlags::PLUGIN_AUTH_LENENC_CLIENT_DATA) {
            r.read_length_encoded_bytes()?
        } else if capabilities.contains(CapabilityFlags::SECURE_CONNECTION) {
            let len = usize::from(r.read_u8()?);
            r.read_byte_string(len)?
        } else {
            r.read_null_terminated_bytes()?
        };

        let database = if capabilities.contains(CapabilityFlags::CONNECT_WITH_DB) {
            Some(r.read_null_terminated_string()?)
        } else {
            None
        };
        let auth_plugin_name = if capabilities.contains(CapabilityFlags::PLUGIN_AUTH) && !r.is_empty() {
            r.read_null_terminated_string()?
        } else {
            String::new()
        };

        Ok(Self {
            capabilities,
            max_packet_size,
            character_set,
            username,
            auth_response,
            database,
            auth_plugin_name,
        })
    }
}
