//! Command-phase request encoding.
//!
//! Each request is a single logical payload whose first byte selects the
//! command. The sequence id restarts at 0 for every command.

use bytes::Bytes;

use crate::codec::{PayloadReader, PayloadWriter};
use crate::error::ProtocolError;
use crate::handshake::UTF8MB4_GENERAL_CI;

/// Command byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandKind {
    /// Close the connection.
    Quit = 0x01,
    /// Change the default database.
    InitDb = 0x02,
    /// Execute a text-protocol statement.
    Query = 0x03,
    /// Check that the server is alive.
    Ping = 0x0E,
    /// Re-authenticate and reset session state.
    ChangeUser = 0x11,
    /// Reset session state without re-authenticating.
    ResetConnection = 0x1F,
}

impl CommandKind {
    /// Create a command kind from a raw byte value.
    pub fn from_u8(value: u8) -> Result<Self, ProtocolError> {
        match value {
            0x01 => Ok(Self::Quit),
            0x02 => Ok(Self::InitDb),
            0x03 => Ok(Self::Query),
            0x0E => Ok(Self::Ping),
            0x11 => Ok(Self::ChangeUser),
            0x1F => Ok(Self::ResetConnection),
            _ => Err(ProtocolError::UnexpectedHeader {
                context: "command",
                header: value,
            }),
        }
    }
}

/// Encode a command that has no arguments (`COM_QUIT`, `COM_PING`,
/// `COM_RESET_CONNECTION`).
#[must_use]
pub fn encode_command(kind: CommandKind) -> Bytes {
    Bytes::copy_from_slice(&[kind as u8])
}

/// Encode a `COM_QUERY` request.
///
/// # Example
///
/// ```
/// use mysql_protocol::command::encode_query;
///
/// let payload = encode_query("SELECT 1");
/// assert_eq!(payload[0], 0x03);
/// assert_eq!(&payload[1..], b"SELECT 1");
/// ```
#[must_use]
pub fn encode_query(sql: &str) -> Bytes {
    let mut w = PayloadWriter::with_capacity(1 + sql.len());
    w.write_u8(CommandKind::Query as u8);
    w.write_bytes(sql.as_bytes());
    w.freeze()
}

/// Encode a `COM_INIT_DB` request.
#[must_use]
pub fn encode_init_db(database: &str) -> Bytes {
    let mut w = PayloadWriter::with_capacity(1 + database.len());
    w.write_u8(CommandKind::InitDb as u8);
    w.write_bytes(database.as_bytes());
    w.freeze()
}

/// `COM_CHANGE_USER` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeUser {
    /// User to authenticate as.
    pub username: String,
    /// Authentication response computed from the last nonce.
    pub auth_response: Bytes,
    /// Database to select.
    pub database: String,
    /// Collation id.
    pub character_set: u8,
    /// Authentication plugin the response was computed with.
    pub auth_plugin_name: String,
}

impl ChangeUser {
    /// Create a request with the default character set.
    pub fn new(username: impl Into<String>, auth_response: impl Into<Bytes>) -> Self {
        Self {
            username: username.into(),
            auth_response: auth_response.into(),
            database: String::new(),
            character_set: UTF8MB4_GENERAL_CI,
            auth_plugin_name: String::new(),
        }
    }

    /// Set the database.
    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Set the authentication plugin name.
    #[must_use]
    pub fn with_auth_plugin(mut self, name: impl Into<String>) -> Self {
        self.auth_plugin_name = name.into();
        self
    }

    /// Encode the request.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut w = PayloadWriter::with_capacity(
            8 + self.username.len() + self.auth_response.len() + self.database.len(),
        );
        w.write_u8(CommandKind::ChangeUser as u8);
        w.write_null_terminated_string(&self.username);
        let auth_len = self.auth_response.len().min(255);
        w.write_u8(auth_len as u8);
        w.write_bytes(&self.auth_response[..auth_len]);
        w.write_null_terminated_string(&self.database);
        w.write_fixed_int(u64::from(self.character_set), 2);
        w.write_null_terminated_string(&self.auth_plugin_name);
        w.freeze()
    }

    /// Decode the request (server side).
    pub fn decode(payload: impl Into<Bytes>) -> Result<Self, ProtocolError> {
        let mut r = PayloadReader::new(payload);
        r.read_byte(CommandKind::ChangeUser as u8, "change user command")?;
        let username = r.read_null_terminated_string()?;
        let auth_len = usize::from(r.read_u8()?);
        let auth_response = r.read_byte_string(auth_len)?;
        let database = r.read_null_terminated_string()?;
        let character_set = if r.remaining() >= 2 {
            r.read_u16()? as u8
        } else {
            UTF8MB4_GENERAL_CI
        };
        let auth_plugin_name = if r.is_empty() {
            String::new()
        } else {
            r.read_null_terminated_string()?
        };
        Ok(Self {
            username,
            auth_response,
            database,
            character_set,
            auth_plugin_name,
        })
    }
}
