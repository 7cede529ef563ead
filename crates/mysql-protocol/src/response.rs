//! Generic response payloads.
//!
//! Every command reply starts with a header byte that selects how the rest of
//! the payload is laid out:
//!
//! | Header | Payload |
//! |--------|---------|
//! | `0x00` | [`OkPayload`] |
//! | `0xFF` | [`ErrorPayload`] |
//! | `0xFE` (short) | [`EofPayload`] |
//! | `0xFE` (connection phase) | [`AuthSwitchRequest`] |
//! | `0x01` (connection phase) | [`AuthMoreData`] |
//!
//! Anything else in a command reply is the column count of a result set.

use bytes::Bytes;

use crate::capabilities::StatusFlags;
use crate::codec::{PayloadReader, PayloadWriter};
use crate::error::ProtocolError;

/// Header byte of an OK payload.
pub const OK_HEADER: u8 = 0x00;
/// Header byte of an auth-more-data payload.
pub const AUTH_MORE_DATA_HEADER: u8 = 0x01;
/// Header byte of a `LOCAL INFILE` request.
pub const LOCAL_INFILE_HEADER: u8 = 0xFB;
/// Header byte of an EOF payload or auth switch request.
pub const EOF_HEADER: u8 = 0xFE;
/// Header byte of an error payload.
pub const ERROR_HEADER: u8 = 0xFF;

/// Marker that precedes the SQL state in an error payload.
const SQL_STATE_MARKER: u8 = b'#';
/// SQL state reported when the server omits one.
pub const DEFAULT_SQL_STATE: &str = "HY000";
/// Length of a SQL state.
const SQL_STATE_LEN: usize = 5;
/// EOF payloads are always shorter than this.
const MAX_EOF_LEN: usize = 9;

/// Whether `payload` is an EOF payload (as opposed to an OK payload or row
/// that happens to start with `0xFE`).
#[must_use]
pub fn is_eof(payload: &[u8]) -> bool {
    payload.first() == Some(&EOF_HEADER) && payload.len() < MAX_EOF_LEN
}

/// Whether `payload` is an error payload.
#[must_use]
pub fn is_error(payload: &[u8]) -> bool {
    payload.first() == Some(&ERROR_HEADER)
}

/// Successful completion of a command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OkPayload {
    /// Rows affected (or found, with `FOUND_ROWS`).
    pub affected_rows: u64,
    /// Last `AUTO_INCREMENT` id generated.
    pub last_insert_id: u64,
    /// Server status after the command.
    pub status: StatusFlags,
    /// Number of warnings.
    pub warnings: u16,
    /// Human-readable info string.
    pub info: String,
}

impl OkPayload {
    /// Decode an OK payload.
    pub fn decode(payload: impl Into<Bytes>) -> Result<Self, ProtocolError> {
        let mut r = PayloadReader::new(payload);
        let header = r.read_u8()?;
        if header != OK_HEADER && header != EOF_HEADER {
            return Err(ProtocolError::UnexpectedHeader {
                context: "OK payload",
                header,
            });
        }
        let affected_rows = r.read_length_encoded_int()?;
        let last_insert_id = r.read_length_encoded_int()?;
        let status = StatusFlags::from_bits_truncate(r.read_u16()?);
        let warnings = r.read_u16()?;
        let info = String::from_utf8_lossy(&r.read_remaining()).into_owned();

        Ok(Self {
            affected_rows,
            last_insert_id,
            status,
            warnings,
            info,
        })
    }

    /// Encode the payload.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut w = PayloadWriter::with_capacity(16 + self.info.len());
        w.write_u8(OK_HEADER);
        w.write_length_encoded_int(self.affected_rows);
        w.write_length_encoded_int(self.last_insert_id);
        w.write_fixed_int(u64::from(self.status.bits()), 2);
        w.write_fixed_int(u64::from(self.warnings), 2);
        w.write_bytes(self.info.as_bytes());
        w.freeze()
    }
}

/// Server-reported error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPayload {
    /// Server error code (e.g. 1045, 1146).
    pub code: u16,
    /// Five-character SQL state.
    pub state: String,
    /// Error message.
    pub message: String,
}

impl ErrorPayload {
    /// Create an error payload.
    pub fn new(code: u16, state: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            state: state.into(),
            message: message.into(),
        }
    }

    /// Decode an error payload.
    ///
    /// The SQL state is optional on the wire: when the byte after the code is
    /// not `#`, the state defaults to `HY000` and that byte is the first byte
    /// of the message.
    pub fn decode(payload: impl Into<Bytes>) -> Result<Self, ProtocolError> {
        let mut r = PayloadReader::new(payload);
        r.read_byte(ERROR_HEADER, "error payload signature")?;
        let code = r.read_u16()?;

        let state = if r.peek() == Some(SQL_STATE_MARKER) {
            r.skip(1)?;
            let state = r.read_byte_string(SQL_STATE_LEN)?;
            String::from_utf8_lossy(&state).into_owned()
        } else {
            DEFAULT_SQL_STATE.to_string()
        };
        let message = String::from_utf8_lossy(&r.read_remaining()).into_owned();

        Ok(Self {
            code,
            state,
            message,
        })
    }

    /// Encode the payload with a SQL state marker.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut w = PayloadWriter::with_capacity(9 + self.message.len());
        w.write_u8(ERROR_HEADER);
        w.write_fixed_int(u64::from(self.code), 2);
        w.write_u8(SQL_STATE_MARKER);
        let mut state = [b'0'; SQL_STATE_LEN];
        let len = self.state.len().min(SQL_STATE_LEN);
        state[..len].copy_from_slice(&self.state.as_bytes()[..len]);
        w.write_bytes(&state);
        w.write_bytes(self.message.as_bytes());
        w.freeze()
    }
}

/// End of a column-definition or row sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EofPayload {
    /// Number of warnings.
    pub warnings: u16,
    /// Server status.
    pub status: StatusFlags,
}

impl EofPayload {
    /// Decode an EOF payload.
    pub fn decode(payload: impl Into<Bytes>) -> Result<Self, ProtocolError> {
        let mut r = PayloadReader::new(payload);
        r.read_byte(EOF_HEADER, "EOF payload signature")?;
        if r.remaining() >= MAX_EOF_LEN - 1 {
            return Err(ProtocolError::TrailingBytes(r.remaining()));
        }
        let warnings = r.read_u16()?;
        let status = StatusFlags::from_bits_truncate(r.read_u16()?);
        Ok(Self { warnings, status })
    }

    /// Encode the payload.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut w = PayloadWriter::with_capacity(5);
        w.write_u8(EOF_HEADER);
        w.write_fixed_int(u64::from(self.warnings), 2);
        w.write_fixed_int(u64::from(self.status.bits()), 2);
        w.freeze()
    }
}

/// Request from the server to restart authentication with another plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSwitchRequest {
    /// Plugin to switch to.
    pub plugin_name: String,
    /// New nonce for that plugin.
    pub plugin_data: Bytes,
}

impl AuthSwitchRequest {
    /// Decode an auth switch request.
    pub fn decode(payload: impl Into<Bytes>) -> Result<Self, ProtocolError> {
        let mut r = PayloadReader::new(payload);
        r.read_byte(EOF_HEADER, "auth switch signature")?;
        let plugin_name = r.read_null_terminated_string()?;
        let mut plugin_data = r.read_remaining();
        if plugin_data.last() == Some(&0) {
            plugin_data.truncate(plugin_data.len() - 1);
        }
        Ok(Self {
            plugin_name,
            plugin_data,
        })
    }

    /// Encode the request (server side).
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut w = PayloadWriter::with_capacity(3 + self.plugin_name.len() + self.plugin_data.len());
        w.write_u8(EOF_HEADER);
        w.write_null_terminated_string(&self.plugin_name);
        w.write_bytes(&self.plugin_data);
        w.write_u8(0);
        w.freeze()
    }
}

/// Extra authentication data sent by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthMoreData {
    /// Plugin-specific data.
    pub data: Bytes,
}

impl AuthMoreData {
    /// `caching_sha2_password`: the cached scramble matched.
    pub const FAST_AUTH_SUCCESS: u8 = 0x03;
    /// `caching_sha2_password`: the server needs the full password.
    pub const PERFORM_FULL_AUTHENTICATION: u8 = 0x04;

    /// Decode an auth-more-data payload.
    pub fn decode(payload: impl Into<Bytes>) -> Result<Self, ProtocolError> {
        let mut r = PayloadReader::new(payload);
        r.read_byte(AUTH_MORE_DATA_HEADER, "auth more data signature")?;
        Ok(Self {
            data: r.read_remaining(),
        })
    }

    /// Encode the payload (server side).
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut w = PayloadWriter::with_capacity(1 + self.data.len());
        w.write_u8(AUTH_MORE_DATA_HEADER);
        w.write_bytes(&self.data);
        w.freeze()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_with_state() {
        let payload = Bytes::from_static(b"\xFF\x84\x03#42S23Bad");
        let err = ErrorPayload::decode(payload).unwrap();
        assert_eq!(err.code, 900);
        assert_eq!(err.state, "42S23");
        assert_eq!(err.message, "Bad");
    }

    #[test]
    fn test_error_without_state() {
        let payload = Bytes::from_static(b"\xFF\x84\x03Bad");
        let err = ErrorPayload::decode(payload).unwrap();
        assert_eq!(err.code, 900);
        assert_eq!(err.state, "HY000");
        assert_eq!(err.message, "Bad");
    }

    #[test]
    fn test_error_bad_signature() {
        let err = ErrorPayload::decode(Bytes::from_static(b"\x00\x84\x03")).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::UnexpectedByte {
                expected: 0xFF,
                actual: 0x00,
                ..
            }
        ));
    }

    #[test]
    fn test_error_encode() {
        let err = ErrorPayload::new(1146, "42S02", "Table 'test.missing' doesn't exist");
        assert_eq!(ErrorPayload::decode(err.encode()).unwrap(), err);
    }

    #[test]
    fn test_ok_decode() {
        let payload = Bytes::from_static(&[0x00, 0x03, 0xFC, 0x00, 0x01, 0x02, 0x00, 0x01, 0x00]);
        let ok = OkPayload::decode(payload).unwrap();
        assert_eq!(ok.affected_rows, 3);
        assert_eq!(ok.last_insert_id, 256);
        assert_eq!(ok.status, StatusFlags::AUTOCOMMIT);
        assert_eq!(ok.warnings, 1);
        assert!(ok.info.is_empty());
    }

    #[test]
    fn test_ok_truncated() {
        assert!(OkPayload::decode(Bytes::from_static(&[0x00, 0x01])).is_err());
        assert!(OkPayload::decode(Bytes::new()).is_err());
    }

    #[test]
    fn test_eof_detection() {
        let eof = EofPayload {
            warnings: 0,
            status: StatusFlags::MORE_RESULTS_EXISTS,
        }
        .encode();
        assert!(is_eof(&eof));
        assert_eq!(
            EofPayload::decode(eof).unwrap().status,
            StatusFlags::MORE_RESULTS_EXISTS
        );
        assert!(!is_eof(&[0xFE; 12]));
        assert!(!is_eof(&[0x00]));
    }

    #[test]
    fn test_auth_switch() {
        let request = AuthSwitchRequest {
            plugin_name: "mysql_native_password".into(),
            plugin_data: Bytes::from_static(b"01234567890123456789"),
        };
        let decoded = AuthSwitchRequest::decode(request.encode()).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_auth_more_data() {
        let more = AuthMoreData::decode(Bytes::from_static(&[0x01, 0x03])).unwrap();
        assert_eq!(&more.data[..], &[AuthMoreData::FAST_AUTH_SUCCESS]);
    }
}
