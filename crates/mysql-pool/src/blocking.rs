//! Blocking adapter over [`Connection`].
//!
//! The driver has one async implementation. `BlockingConnection` drives its
//! futures on a Tokio runtime it shares with other blocking connections, so
//! pooled sessions stay bound to a reactor that outlives any single caller.
//!
//! ```rust,ignore
//! use mysql_driver_pool::{BlockingConnection, PoolRegistry, blocking_runtime};
//!
//! let runtime = blocking_runtime()?;
//! let registry = PoolRegistry::new();
//! let config = Config::from_connection_string("Server=db;User=app;Password=secret")?;
//!
//! let mut conn = BlockingConnection::open(runtime, &registry, config)?;
//! let count = conn.execute("DELETE FROM sessions WHERE expired = 1")?;
//! conn.close()?;
//! ```

use std::sync::Arc;

use mysql_client::{CachedProcedure, Config, IoBehavior, ParameterCollection, ResultSet};
use tokio::runtime::Runtime;

use crate::connection::Connection;
use crate::error::PoolError;
use crate::registry::PoolRegistry;

/// Build a multi-threaded runtime suitable for [`BlockingConnection`].
///
/// Worker threads keep spawned pool returns and the reaper running while no
/// caller is blocked on the runtime.
pub fn blocking_runtime() -> std::io::Result<Arc<Runtime>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("mysql-blocking")
        .build()?;
    Ok(Arc::new(runtime))
}

/// A [`Connection`] driven from synchronous code.
///
/// Every pool return is completed before the call that triggers it returns.
/// Do not call its methods from inside an async context.
pub struct BlockingConnection {
    runtime: Arc<Runtime>,
    connection: Option<Connection>,
}

impl BlockingConnection {
    /// Open a connection, leasing from `registry` when pooling is enabled.
    pub fn open(
        runtime: Arc<Runtime>,
        registry: &PoolRegistry,
        config: Config,
    ) -> Result<Self, PoolError> {
        let connection = runtime.block_on(Connection::open(registry, config))?;
        Ok(Self {
            runtime,
            connection: Some(connection),
        })
    }

    /// Execute a statement and return the affected row count.
    pub fn execute(&mut self, sql: &str) -> Result<u64, PoolError> {
        let (runtime, connection) = self.parts()?;
        Ok(runtime.block_on(connection.execute(sql))?)
    }

    /// Execute a statement with bound parameters.
    pub fn execute_with(
        &mut self,
        sql: &str,
        parameters: &ParameterCollection,
    ) -> Result<u64, PoolError> {
        let (runtime, connection) = self.parts()?;
        Ok(runtime.block_on(connection.execute_with(sql, parameters))?)
    }

    /// Run a query and return its first result set.
    pub fn query(&mut self, sql: &str) -> Result<ResultSet, PoolError> {
        let (runtime, connection) = self.parts()?;
        Ok(runtime.block_on(connection.query(sql))?)
    }

    /// Run a query with bound parameters.
    pub fn query_with(
        &mut self,
        sql: &str,
        parameters: &ParameterCollection,
    ) -> Result<ResultSet, PoolError> {
        let (runtime, connection) = self.parts()?;
        Ok(runtime.block_on(connection.query_with(sql, parameters))?)
    }

    /// Switch the current database.
    pub fn change_database(&mut self, database: &str) -> Result<(), PoolError> {
        let (runtime, connection) = self.parts()?;
        Ok(runtime.block_on(connection.change_database(database))?)
    }

    /// Look up parameter metadata for a stored routine.
    pub fn get_cached_procedure(
        &mut self,
        name: &str,
    ) -> Result<Option<Arc<CachedProcedure>>, PoolError> {
        let (runtime, connection) = self.parts()?;
        Ok(runtime.block_on(connection.get_cached_procedure(name))?)
    }

    /// The async connection this adapter drives.
    pub fn connection(&self) -> Option<&Connection> {
        self.connection.as_ref()
    }

    /// Close the connection, waiting for the pool return to finish.
    pub fn close(mut self) -> Result<(), PoolError> {
        match self.connection.take() {
            Some(connection) => self
                .runtime
                .block_on(connection.close_with(IoBehavior::Synchronous)),
            None => Ok(()),
        }
    }

    fn parts(&mut self) -> Result<(&Runtime, &mut Connection), PoolError> {
        let connection = self
            .connection
            .as_mut()
            .ok_or(PoolError::Client(mysql_client::Error::ConnectionClosed))?;
        Ok((&*self.runtime, connection))
    }
}

impl Drop for BlockingConnection {
    fn drop(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };

        if tokio::runtime::Handle::try_current().is_ok() {
            // block_on would panic here; let the lease return itself on our runtime.
            let _guard = self.runtime.enter();
            drop(connection);
        } else if let Err(e) = self
            .runtime
            .block_on(connection.close_with(IoBehavior::Synchronous))
        {
            tracing::warn!(error = %e, "failed to close blocking connection");
        }
    }
}

impl std::fmt::Debug for BlockingConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingConnection")
            .field("connection", &self.connection)
            .finish_non_exhaustive()
    }
}
