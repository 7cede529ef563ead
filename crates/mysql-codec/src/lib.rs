//! # mysql-codec
//!
//! Async framing layer for MySQL packet handling.
//!
//! This crate transforms raw byte streams into logical protocol payloads,
//! handling packet reassembly across TCP segment boundaries and payload
//! continuation for payloads of 16 MiB and more.
//!
//! ## Features
//!
//! - Packet reassembly across TCP segments
//! - Payload reassembly from multiple `0xFFFFFF`-byte packets
//! - Sequence id tracking shared by both directions
//! - A per-command I/O time budget
//! - Integration with tokio-util's codec framework
//!
//! ## Architecture
//!
//! The codec layer sits between raw TCP streams and the higher-level client:
//!
//! ```text
//! TCP Stream → MySqlCodec (packet framing) → PayloadAssembler → Session
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod connection;
pub mod error;
pub mod framed;
pub mod message;
pub mod packet_codec;

pub use connection::Connection;
pub use error::CodecError;
pub use framed::PacketStream;
pub use message::{PayloadAssembler, split_payload};
pub use packet_codec::{MySqlCodec, Packet};
