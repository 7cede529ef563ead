//! Pooled or unpooled connection façade.

use std::collections::HashMap;
use std::sync::Arc;

use mysql_client::{
    CachedProcedure, CancelHandle, Config, IoBehavior, NormalizedSchema, ParameterCollection,
    ResultSet, Session,
};
use tokio_util::sync::CancellationToken;

use crate::error::PoolError;
use crate::pool::PooledSession;
use crate::registry::PoolRegistry;

enum Lease {
    Pooled(PooledSession),
    Unpooled(Session),
}

/// An open connection, leased from a pool or owned outright.
///
/// Stored-procedure metadata fetched through
/// [`Connection::get_cached_procedure`] is cached for the lifetime of the
/// connection.
pub struct Connection {
    lease: Lease,
    config: Arc<Config>,
    procedures: HashMap<String, Arc<CachedProcedure>>,
}

impl Connection {
    /// Open a connection, leasing from `registry` when pooling is enabled.
    pub async fn open(registry: &PoolRegistry, config: Config) -> Result<Self, PoolError> {
        Self::open_with_cancel(registry, config, None).await
    }

    /// Open a connection; `cancel` aborts a wait for a pool permit.
    pub async fn open_with_cancel(
        registry: &PoolRegistry,
        config: Config,
        cancel: Option<&CancellationToken>,
    ) -> Result<Self, PoolError> {
        config.validate()?;

        let (lease, config) = match registry.get_pool(&config)? {
            Some(pool) => {
                let session = pool.get(cancel).await?;
                (Lease::Pooled(session), Arc::clone(pool.client_config()))
            }
            None => {
                let config = Arc::new(config);
                let session = Session::connect(Arc::clone(&config), 0, Session::next_id()).await?;
                (Lease::Unpooled(session), config)
            }
        };

        Ok(Self {
            lease,
            config,
            procedures: HashMap::new(),
        })
    }

    /// Check if the session came from a pool.
    #[must_use]
    pub fn is_pooled(&self) -> bool {
        matches!(self.lease, Lease::Pooled(_))
    }

    /// The underlying session.
    #[must_use]
    pub fn session(&self) -> &Session {
        match &self.lease {
            Lease::Pooled(session) => session,
            Lease::Unpooled(session) => session,
        }
    }

    /// The underlying session, mutably.
    pub fn session_mut(&mut self) -> &mut Session {
        match &mut self.lease {
            Lease::Pooled(session) => session,
            Lease::Unpooled(session) => session,
        }
    }

    /// The configuration the connection was opened with.
    #[must_use]
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Current database.
    #[must_use]
    pub fn database(&self) -> Option<&str> {
        self.session().database()
    }

    /// Switch the current database.
    pub async fn change_database(&mut self, database: &str) -> mysql_client::Result<()> {
        self.session_mut().change_database(database).await
    }

    /// Execute a statement and return the affected row count.
    pub async fn execute(&mut self, sql: &str) -> mysql_client::Result<u64> {
        self.session_mut().execute(sql).await
    }

    /// Execute a statement with bound parameters.
    pub async fn execute_with(
        &mut self,
        sql: &str,
        parameters: &ParameterCollection,
    ) -> mysql_client::Result<u64> {
        self.session_mut().execute_with(sql, parameters).await
    }

    /// Run a query and return its first result set.
    pub async fn query(&mut self, sql: &str) -> mysql_client::Result<ResultSet> {
        self.session_mut().query(sql).await
    }

    /// Run a query with bound parameters.
    pub async fn query_with(
        &mut self,
        sql: &str,
        parameters: &ParameterCollection,
    ) -> mysql_client::Result<ResultSet> {
        self.session_mut().query_with(sql, parameters).await
    }

    /// Handle for cancelling the running command from another task.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.session().cancel_handle()
    }

    /// Best-effort cancel of the running command. Returns `true` if a
    /// `KILL QUERY` was issued.
    pub async fn cancel(&self) -> bool {
        self.cancel_handle().cancel().await
    }

    /// Look up parameter metadata for a stored routine.
    ///
    /// Unqualified names resolve against the current database. Returns
    /// `Ok(None)` on servers older than 5.5.3, which lack
    /// `information_schema.parameters`.
    pub async fn get_cached_procedure(
        &mut self,
        name: &str,
    ) -> mysql_client::Result<Option<Arc<CachedProcedure>>> {
        if !self.session().server_version().is_at_least(5, 5, 3) {
            tracing::debug!(
                server_version = self.session().server_version().raw(),
                "server does not expose routine parameters"
            );
            return Ok(None);
        }

        let normalized = NormalizedSchema::normalize(name, self.database())?;
        let key = normalized.fully_qualified();
        if let Some(procedure) = self.procedures.get(&key) {
            return Ok(Some(Arc::clone(procedure)));
        }

        let procedure = Arc::new(
            CachedProcedure::fill(self.session_mut(), &normalized.schema, &normalized.component)
                .await?,
        );
        self.procedures.insert(key, Arc::clone(&procedure));
        Ok(Some(procedure))
    }

    /// Close the connection, completing the pool return as configured by
    /// `Force Synchronous`.
    pub async fn close(self) -> Result<(), PoolError> {
        let io_behavior = IoBehavior::from_force_synchronous(self.config.force_synchronous);
        self.close_with(io_behavior).await
    }

    /// Close the connection with an explicit [`IoBehavior`].
    ///
    /// Pooled sessions go back to their pool; unpooled ones are closed.
    pub async fn close_with(self, io_behavior: IoBehavior) -> Result<(), PoolError> {
        match self.lease {
            Lease::Pooled(session) => {
                session.return_to_pool(io_behavior).await;
                Ok(())
            }
            Lease::Unpooled(mut session) => Ok(session.dispose().await?),
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("session", self.session())
            .field("pooled", &self.is_pooled())
            .field("cached_procedures", &self.procedures.len())
            .finish()
    }
}
