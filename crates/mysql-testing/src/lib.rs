//! # mysql-testing
//!
//! Test infrastructure for MySQL driver development.
//!
//! This crate provides a mock MySQL server and fixtures so the client and
//! pool can be exercised end to end without a database instance.
//!
//! ## Features
//!
//! - Mock MySQL server for unit tests (no Docker required)
//! - Canned responses by statement text or prefix
//! - Command recording for assertions
//! - Fixtures for routine metadata and test databases
//!
//! ## Mock Server Example
//!
//! ```rust,ignore
//! use mysql_testing::mock_server::{MockMySqlServer, MockResponse, MockColumn, ScalarValue};
//!
//! #[tokio::test]
//! async fn test_with_mock_server() {
//!     // Create a mock server with pre-configured responses
//!     let server = MockMySqlServer::builder()
//!         .with_response(
//!             "SELECT * FROM users WHERE id = 1",
//!             MockResponse::rows(
//!                 vec![MockColumn::int("id"), MockColumn::varchar("name")],
//!                 vec![vec![ScalarValue::Int(1), ScalarValue::String("Alice".into())]],
//!             ),
//!         )
//!         .build()
//!         .await
//!         .unwrap();
//!
//!     // Connect your client with server.connection_string()
//!     let conn_str = server.connection_string();
//!     // ...
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod fixtures;
pub mod mock_server;

pub use fixtures::{RoutineParameter, TestFixture, routine_parameters};
pub use mock_server::{
    MockColumn, MockMySqlServer, MockResponse, MockServerBuilder, MockServerConfig,
    MockServerError, RecordedCommand, ScalarValue,
};
