//! # mysql-client
//!
//! Async MySQL sessions, client-side statement binding, and stored-procedure
//! metadata.
//!
//! This crate sits on top of the wire codec and provides the pieces a pool
//! or a command API builds on:
//!
//! - [`Session`]: one authenticated connection; handshake, authentication
//!   (`mysql_native_password`, `caching_sha2_password` fast path),
//!   `COM_QUERY` with text result sets, reset, ping, cancel, dispose
//! - [`StatementPreparer`]: binds `@name` and `?` placeholders as SQL
//!   literals into a single `COM_QUERY` payload
//! - [`CachedProcedure`]: routine parameter metadata and alignment
//! - [`Config`]: connection settings and connection-string parsing
//!
//! ## Session States
//!
//! ```text
//! Created -> Connecting -> Connected <-> Querying -> Cancelling
//!                              |            |
//!                              +-> Closed <-+ (dispose)
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mysql_client::{Config, ParameterCollection, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_connection_string(
//!         "Server=localhost;Database=shop;User ID=app;Password=secret;"
//!     )?;
//!
//!     let mut session = Session::connect(Arc::new(config), 0, Session::next_id()).await?;
//!
//!     let params = ParameterCollection::new().with("@status", "shipped");
//!     let orders = session
//!         .query_with("SELECT id, total FROM orders WHERE status = @status", &params)
//!         .await?;
//!
//!     for row in &orders.rows {
//!         let id: u64 = row.get(0)?;
//!         println!("order {id}");
//!     }
//!
//!     session.dispose().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod cancel;
pub mod config;
pub mod error;
pub mod io;
pub mod parameter;
pub mod parser;
pub mod preparer;
pub mod procedure;
pub mod row;
pub mod session;
pub mod state;

pub use cancel::CancelHandle;
pub use config::{Config, LoadBalance};
pub use error::{Error, Result};
pub use io::IoBehavior;
pub use parameter::{Parameter, ParameterCollection, ParameterDirection};
pub use parser::{ParseHandler, SqlParser};
pub use preparer::{StatementPreparer, StatementPreparerOptions};
pub use procedure::{CachedParameter, CachedProcedure, NormalizedSchema};
pub use row::{Column, ResultSet, Row};
pub use session::Session;
pub use state::SessionState;

// Re-exports for callers that only depend on this crate
pub use mysql_auth::Credentials;
pub use mysql_types::{FromSql, SqlType, SqlValue, ToSql};
