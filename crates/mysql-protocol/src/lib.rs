//! # mysql-protocol
//!
//! Pure implementation of the MySQL client/server protocol payloads.
//!
//! This crate provides packet header definitions, length-encoded integer and
//! string handling, connection-phase payloads (handshake and authentication
//! exchange), generic OK/ERR/EOF responses, command encoding, and text
//! protocol result set decoding.
//!
//! ## Design Philosophy
//!
//! This crate is intentionally IO-agnostic. It contains no networking logic and
//! makes no assumptions about the async runtime. Higher-level crates build upon
//! this foundation to provide async I/O capabilities.
//!
//! ## Example
//!
//! ```rust
//! use mysql_protocol::ErrorPayload;
//!
//! let err = ErrorPayload::decode(&b"\xFF\x84\x03#42S23Bad"[..]).unwrap();
//! assert_eq!(err.code, 900);
//! assert_eq!(err.state, "42S23");
//! assert_eq!(err.message, "Bad");
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod capabilities;
pub mod codec;
pub mod command;
pub mod error;
pub mod handshake;
pub mod packet;
pub mod response;
pub mod resultset;
pub mod version;

pub use capabilities::{CapabilityFlags, StatusFlags};
pub use codec::{PayloadReader, PayloadWriter};
pub use command::{ChangeUser, CommandKind, encode_command, encode_init_db, encode_query};
pub use error::ProtocolError;
pub use handshake::{HandshakeResponse, InitialHandshake};
pub use packet::{MAX_PACKET_PAYLOAD, MAX_PAYLOAD_BODY, PACKET_HEADER_SIZE, PacketHeader};
pub use response::{AuthMoreData, AuthSwitchRequest, EofPayload, ErrorPayload, OkPayload};
pub use resultset::{ColumnDefinition, ColumnFlags, ColumnType};
pub use version::ServerVersion;
