//! Capability and server status flags.

use bitflags::bitflags;

bitflags! {
    /// Capability flags exchanged during the handshake.
    ///
    /// The server advertises what it supports in the initial handshake; the
    /// client answers with the subset it wants to use.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CapabilityFlags: u32 {
        /// Use the improved version of old password authentication.
        const LONG_PASSWORD = 0x0000_0001;
        /// Send found rows instead of affected rows in the OK payload.
        const FOUND_ROWS = 0x0000_0002;
        /// Get all column flags.
        const LONG_FLAG = 0x0000_0004;
        /// A database name can be specified in the handshake response.
        const CONNECT_WITH_DB = 0x0000_0008;
        /// Compression protocol supported.
        const COMPRESS = 0x0000_0020;
        /// `LOAD DATA LOCAL` supported.
        const LOCAL_FILES = 0x0000_0080;
        /// Parser ignores spaces before `(`.
        const IGNORE_SPACE = 0x0000_0100;
        /// New 4.1 protocol.
        const PROTOCOL_41 = 0x0000_0200;
        /// Interactive client.
        const INTERACTIVE = 0x0000_0400;
        /// Switch to TLS after the handshake.
        const SSL = 0x0000_0800;
        /// Transaction status flags in OK/EOF payloads.
        const TRANSACTIONS = 0x0000_2000;
        /// 4.1 authentication.
        const SECURE_CONNECTION = 0x0000_8000;
        /// Multiple statements per `COM_QUERY`.
        const MULTI_STATEMENTS = 0x0001_0000;
        /// Multiple result sets per reply.
        const MULTI_RESULTS = 0x0002_0000;
        /// Multiple result sets from prepared statements.
        const PS_MULTI_RESULTS = 0x0004_0000;
        /// Pluggable authentication.
        const PLUGIN_AUTH = 0x0008_0000;
        /// Connection attributes in the handshake response.
        const CONNECT_ATTRS = 0x0010_0000;
        /// Length-encoded auth response in the handshake response.
        const PLUGIN_AUTH_LENENC_CLIENT_DATA = 0x0020_0000;
        /// Session state change information in OK payloads.
        const SESSION_TRACK = 0x0080_0000;
        /// OK payloads replace EOF payloads.
        const DEPRECATE_EOF = 0x0100_0000;
    }
}

impl CapabilityFlags {
    /// Capabilities this client always requests when the server offers them.
    #[must_use]
    pub fn client_default() -> Self {
        Self::LONG_PASSWORD
            | Self::LONG_FLAG
            | Self::PROTOCOL_41
            | Self::TRANSACTIONS
            | Self::SECURE_CONNECTION
            | Self::MULTI_STATEMENTS
            | Self::MULTI_RESULTS
            | Self::PS_MULTI_RESULTS
            | Self::PLUGIN_AUTH
            | Self::PLUGIN_AUTH_LENENC_CLIENT_DATA
    }
}

bitflags! {
    /// Server status flags carried by OK and EOF payloads.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StatusFlags: u16 {
        /// A transaction is active.
        const IN_TRANSACTION = 0x0001;
        /// Autocommit is enabled.
        const AUTOCOMMIT = 0x0002;
        /// More result sets follow.
        const MORE_RESULTS_EXISTS = 0x0008;
        /// No good index was used.
        const NO_GOOD_INDEX_USED = 0x0010;
        /// No index was used.
        const NO_INDEX_USED = 0x0020;
        /// A read-only cursor was opened.
        const CURSOR_EXISTS = 0x0040;
        /// The last row of a cursor was sent.
        const LAST_ROW_SENT = 0x0080;
        /// A database was dropped.
        const DB_DROPPED = 0x0100;
        /// Backslash is not an escape character in string literals.
        const NO_BACKSLASH_ESCAPES = 0x0200;
        /// Metadata changed.
        const METADATA_CHANGED = 0x0400;
        /// The query was slow.
        const QUERY_WAS_SLOW = 0x0800;
        /// Output parameters follow.
        const PS_OUT_PARAMS = 0x1000;
        /// In a read-only transaction.
        const IN_TRANS_READONLY = 0x2000;
        /// Session state changed.
        const SESSION_STATE_CHANGED = 0x4000;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_default_omits_optional_features() {
        let caps = CapabilityFlags::client_default();
        assert!(caps.contains(CapabilityFlags::PROTOCOL_41 | CapabilityFlags::PLUGIN_AUTH));
        assert!(!caps.contains(CapabilityFlags::DEPRECATE_EOF));
        assert!(!caps.contains(CapabilityFlags::SSL));
        assert!(!caps.contains(CapabilityFlags::COMPRESS));
    }

    #[test]
    fn test_status_bits() {
        let status = StatusFlags::from_bits_truncate(0x0202);
        assert!(status.contains(StatusFlags::NO_BACKSLASH_ESCAPES));
        assert!(status.contains(StatusFlags::AUTOCOMMIT));
    }
}
