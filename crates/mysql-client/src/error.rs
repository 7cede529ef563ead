//! Client error types.

use mysql_protocol::ErrorPayload;
use thiserror::Error;

/// Server error codes that indicate a transient condition.
const TRANSIENT_SERVER_CODES: &[u16] = &[
    1040, // ER_CON_COUNT_ERROR: too many connections
    1205, // ER_LOCK_WAIT_TIMEOUT
    1213, // ER_LOCK_DEADLOCK
    1317, // ER_QUERY_INTERRUPTED
];

/// Errors that can occur during client operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Malformed or unexpected data from the server.
    #[error("protocol error: {0}")]
    Protocol(#[from] mysql_protocol::ProtocolError),

    /// Could not connect to any host.
    #[error("connection failed: {message}")]
    Connection {
        /// What failed.
        message: String,
        /// Transport error from the last host tried.
        #[source]
        source: Option<std::io::Error>,
    },

    /// Connection closed unexpectedly.
    #[error("connection closed")]
    ConnectionClosed,

    /// An operation did not finish in time.
    #[error("{0}")]
    Timeout(String),

    /// Server returned an error.
    #[error("server error {code} ({state}): {message}")]
    Server {
        /// MySQL error number.
        code: u16,
        /// Five-character SQLSTATE.
        state: String,
        /// Error message.
        message: String,
    },

    /// Statement parameters could not be bound.
    #[error("{0}")]
    Binding(String),

    /// Framing or transport error.
    #[error("codec error: {0}")]
    Codec(mysql_codec::CodecError),

    /// Authentication failed on the client side.
    #[error("authentication failed: {0}")]
    Auth(#[from] mysql_auth::AuthError),

    /// Type conversion error.
    #[error("type error: {0}")]
    Type(#[from] mysql_types::TypeError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The operation was cancelled.
    #[error("operation cancelled")]
    Cancelled,
}

impl From<mysql_codec::CodecError> for Error {
    fn from(e: mysql_codec::CodecError) -> Self {
        match e {
            mysql_codec::CodecError::Timeout => Self::Timeout("I/O operation timed out".into()),
            mysql_codec::CodecError::ConnectionClosed => Self::ConnectionClosed,
            mysql_codec::CodecError::Protocol(p) => Self::Protocol(p),
            mysql_codec::CodecError::Io(io) => Self::Io(io),
            other => Self::Codec(other),
        }
    }
}

impl From<ErrorPayload> for Error {
    fn from(e: ErrorPayload) -> Self {
        Self::Server {
            code: e.code,
            state: e.state,
            message: e.message,
        }
    }
}

impl Error {
    /// Check if this error is transient and may succeed on retry.
    ///
    /// Transient errors include timeouts, connection issues, and
    /// server errors such as deadlocks and lock wait timeouts.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Connection { .. } | Self::ConnectionClosed | Self::Io(_) => true,
            Self::Server { code, .. } => TRANSIENT_SERVER_CODES.contains(code),
            _ => false,
        }
    }

    /// Check if this error indicates a protocol/driver bug.
    ///
    /// Protocol errors typically indicate a bug in the driver implementation
    /// or an incompatible server rather than a user error.
    #[must_use]
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }

    /// Check if the error left the session unusable.
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionClosed
                | Self::Io(_)
                | Self::Codec(_)
                | Self::Protocol(_)
                | Self::Timeout(_)
        )
    }

    /// Check if this is a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Check if this is a server error with a specific number.
    #[must_use]
    pub fn is_server_error(&self, code: u16) -> bool {
        matches!(self, Self::Server { code: c, .. } if *c == code)
    }

    /// Get the MySQL error number if this is a server error.
    #[must_use]
    pub fn server_code(&self) -> Option<u16> {
        match self {
            Self::Server { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Get the SQLSTATE if this is a server error.
    #[must_use]
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Self::Server { state, .. } => Some(state),
            _ => None,
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
