//! # mysql-driver-pool
//!
//! Session pooling for the MySQL driver.
//!
//! Pools are keyed by the normalized connection string and owned by an
//! explicit [`PoolRegistry`]. A pool bounds the number of live sessions with
//! a semaphore, reuses the most recently returned session first, and resets
//! sessions (`COM_RESET_CONNECTION`, or `COM_CHANGE_USER` on older servers)
//! before they are reused.
//!
//! ## Features
//!
//! - RAII [`PooledSession`] leases, returned on drop
//! - Generation-based invalidation with [`Pool::clear`]
//! - Leak recovery for leases that vanish without being returned
//! - Idle reaping that keeps the minimum pool size
//! - [`Connection`] façade with a per-connection stored-procedure cache
//! - [`BlockingConnection`] for synchronous callers
//!
//! ## Example
//!
//! ```rust,ignore
//! use mysql_client::Config;
//! use mysql_driver_pool::{Connection, PoolRegistry};
//!
//! let registry = PoolRegistry::new();
//! let _reaper = registry.start_reaper();
//!
//! let config = Config::from_connection_string(
//!     "Server=db;User=app;Password=secret;Database=shop;Max Pool Size=20",
//! )?;
//! let mut conn = Connection::open(&registry, config).await?;
//! let orders = conn.query("SELECT id, total FROM orders").await?;
//! conn.close().await?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod blocking;
pub mod config;
pub mod connection;
pub mod error;
pub mod lifecycle;
pub mod pool;
pub mod registry;

pub use blocking::{BlockingConnection, blocking_runtime};
pub use config::PoolConfig;
pub use connection::Connection;
pub use error::PoolError;
pub use lifecycle::SessionHealth;
pub use pool::{Pool, PoolStatus, PooledSession};
pub use registry::{PoolRegistry, REAPER_INTERVAL, ReaperHandle};

pub use tokio_util::sync::CancellationToken;
