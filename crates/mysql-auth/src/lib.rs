//! # mysql-auth
//!
//! Authentication plugins for MySQL connections.
//!
//! This crate provides the password scramble functions and plugin selection,
//! isolated from connection logic for better modularity and testing.
//!
//! ## Supported Plugins
//!
//! | Plugin | Description |
//! |--------|-------------|
//! | `mysql_native_password` | SHA1 challenge-response |
//! | `caching_sha2_password` | SHA256 challenge-response (fast path only) |
//! | `mysql_clear_password` | Recognised, refused without TLS |

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod credentials;
pub mod error;
pub mod plugin;
pub mod scramble;

pub use credentials::Credentials;
pub use error::AuthError;
pub use plugin::AuthPlugin;
