//! # mysql-types
//!
//! MySQL to Rust type mappings and conversions.
//!
//! This crate provides bidirectional mapping between MySQL data types and
//! Rust types: decoding text-protocol result cells into [`SqlValue`]s and
//! rendering values as SQL literals for client-side parameter binding.
//!
//! ## Features
//!
//! - `chrono` (default): Enable date/time type support via chrono
//! - `uuid` (default): Enable UUID type support
//! - `decimal` (default): Enable decimal type support via rust_decimal
//! - `json`: Enable JSON type support via serde_json
//!
//! ## Type Mappings
//!
//! | MySQL Type | Rust Type |
//! |------------|-----------|
//! | `TINYINT`..`BIGINT` | `i8`..`i64` |
//! | `TINYINT UNSIGNED`..`BIGINT UNSIGNED` | `u8`..`u64` |
//! | `FLOAT` | `f32` |
//! | `DOUBLE` | `f64` |
//! | `DECIMAL` | `rust_decimal::Decimal` |
//! | `CHAR`/`VARCHAR`/`TEXT` | `String` |
//! | `BINARY`/`VARBINARY`/`BLOB` | `Vec<u8>` |
//! | `DATE` | `chrono::NaiveDate` |
//! | `TIME` | `chrono::NaiveTime` |
//! | `DATETIME`/`TIMESTAMP` | `chrono::NaiveDateTime` |
//! | `CHAR(36)` | `uuid::Uuid` |
//! | `JSON` | `serde_json::Value` |

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod decode;
pub mod encode;
pub mod error;
pub mod from_sql;
pub mod sql_type;
pub mod to_sql;
pub mod value;

pub use decode::decode_text_value;
pub use encode::{EncodeOptions, append_sql_literal};
pub use error::TypeError;
pub use from_sql::FromSql;
pub use sql_type::SqlType;
pub use to_sql::ToSql;
pub use value::SqlValue;
