//! Connection pool implementation.
//!
//! A pool hands out [`PooledSession`] leases bounded by a counting semaphore
//! sized to the maximum pool size. Returned sessions go to the front of the
//! idle list and are leased again from the front, so the back of the list
//! holds the sessions that have been idle longest; sweeps work from there.
//!
//! Every lease carries a token whose `Weak` handle sits in the pool's leak
//! map. A lease that disappears without being returned (dropped outside a
//! runtime, or detached and abandoned) leaves a dead `Weak` behind, and the
//! next leak scan gives its permit back.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use mysql_client::{Config, IoBehavior, Session};
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::config::{LEAK_SCAN_INTERVAL, PoolConfig, SWEEP_PERMIT_WAIT};
use crate::error::PoolError;
use crate::lifecycle::{SessionHealth, is_idle_expired};

type LeaseToken = Arc<()>;

/// A pool of sessions sharing one client configuration.
///
/// Cloning a `Pool` is cheap; all clones share the same sessions.
#[derive(Clone)]
pub struct Pool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    client_config: Arc<Config>,
    config: PoolConfig,
    generation: AtomicU64,
    permits: Semaphore,
    idle: Mutex<VecDeque<Session>>,
    leased: Mutex<HashMap<u64, Weak<()>>>,
    last_leak_scan: Mutex<Option<Instant>>,
    sweep: Semaphore,
}

impl Pool {
    /// Create a pool sized from the client configuration.
    ///
    /// No sessions are opened until the first [`Pool::get`].
    pub fn new(client_config: Arc<Config>) -> Result<Self, PoolError> {
        let config = PoolConfig::from_client_config(&client_config);
        Self::with_config(client_config, config)
    }

    /// Create a pool with explicit pool settings.
    pub fn with_config(client_config: Arc<Config>, config: PoolConfig) -> Result<Self, PoolError> {
        config.validate()?;
        tracing::info!(
            hosts = %client_config.hosts.join(","),
            min = config.min_size,
            max = config.max_size,
            "creating connection pool"
        );

        Ok(Self {
            inner: Arc::new(PoolInner {
                permits: Semaphore::new(config.max_size as usize),
                client_config,
                config,
                generation: AtomicU64::new(0),
                idle: Mutex::new(VecDeque::new()),
                leased: Mutex::new(HashMap::new()),
                last_leak_scan: Mutex::new(None),
                sweep: Semaphore::new(1),
            }),
        })
    }

    /// Lease a session from the pool.
    ///
    /// Waits for a permit for at most the configured connect timeout, or
    /// until `cancel` fires. The most recently returned idle session is
    /// reused if it belongs to the current generation and answers a ping;
    /// otherwise a new session is opened.
    pub async fn get(&self, cancel: Option<&CancellationToken>) -> Result<PooledSession, PoolError> {
        if self.inner.permits.available_permits() == 0 {
            self.maybe_recover_leaked_sessions();
        }

        self.acquire_permit(cancel).await?;
        let permit = PermitGuard::new(&self.inner.permits);
        let session = self.lease_session().await?;
        permit.disarm();

        let token = LeaseToken::default();
        self.inner
            .leased
            .lock()
            .insert(session.id(), Arc::downgrade(&token));
        tracing::debug!(session_id = session.id(), "leased session");

        Ok(PooledSession {
            lease: Some((session, token)),
            pool: self.clone(),
        })
    }

    /// Give a leased session back to this pool.
    ///
    /// Equivalent to [`PooledSession::return_to_pool`].
    pub async fn return_session(&self, session: PooledSession, io_behavior: IoBehavior) {
        if !Arc::ptr_eq(&self.inner, &session.pool.inner) {
            tracing::warn!(
                session_id = session.id(),
                "session returned to a pool it was not leased from"
            );
        }
        session.return_to_pool(io_behavior).await;
    }

    /// Invalidate every session opened so far.
    ///
    /// Idle sessions from older generations are closed now; leased ones are
    /// closed when they come back.
    pub async fn clear(&self) {
        let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::info!(generation, "clearing connection pool");
        self.clean(false, move |session| session.pool_generation() != generation)
            .await;
    }

    /// Recover leaked leases and close sessions idle longer than the idle
    /// timeout, keeping at least `min_size` sessions.
    pub async fn reap(&self) {
        self.recover_leaked_sessions();

        let idle_timeout = self.inner.config.idle_timeout;
        if idle_timeout.is_zero() {
            return;
        }
        self.clean(true, move |session| is_idle_expired(session, idle_timeout))
            .await;
    }

    /// Release the permits of leases that were dropped without being
    /// returned. Returns the number of permits recovered.
    pub fn recover_leaked_sessions(&self) -> usize {
        let recovered = {
            let mut leased = self.inner.leased.lock();
            let before = leased.len();
            leased.retain(|_, token| token.strong_count() > 0);
            before - leased.len()
        };

        if recovered > 0 {
            self.inner.permits.add_permits(recovered);
            tracing::debug!(recovered, "recovered leaked sessions");
        }
        recovered
    }

    /// Get the current pool status.
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        let max = self.inner.config.max_size;
        let available = self.inner.permits.available_permits() as u32;
        PoolStatus {
            idle: self.inner.idle.lock().len() as u32,
            leased: max.saturating_sub(available),
            max,
            generation: self.generation(),
        }
    }

    /// Current pool generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::Acquire)
    }

    /// Get the pool configuration.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Get the client configuration sessions are opened with.
    #[must_use]
    pub fn client_config(&self) -> &Arc<Config> {
        &self.inner.client_config
    }

    fn maybe_recover_leaked_sessions(&self) {
        let now = Instant::now();
        {
            let mut last = self.inner.last_leak_scan.lock();
            if last.is_some_and(|at| now.duration_since(at) < LEAK_SCAN_INTERVAL) {
                return;
            }
            *last = Some(now);
        }
        self.recover_leaked_sessions();
    }

    async fn acquire_permit(&self, cancel: Option<&CancellationToken>) -> Result<(), PoolError> {
        let acquire = async {
            match self.inner.config.acquire_timeout() {
                Some(limit) => tokio::time::timeout(limit, self.inner.permits.acquire())
                    .await
                    .map_err(|_| PoolError::AcquisitionTimeout(limit)),
                None => Ok(self.inner.permits.acquire().await),
            }
        };

        let permit = tokio::select! {
            biased;
            () = cancelled(cancel) => return Err(PoolError::Cancelled),
            result = acquire => result?,
        };

        // The permit semaphore is never closed.
        let permit = permit.map_err(|_| PoolError::Cancelled)?;
        permit.forget();
        Ok(())
    }

    async fn lease_session(&self) -> Result<Session, PoolError> {
        let generation = self.generation();
        let idle = self.inner.idle.lock().pop_front();

        if let Some(mut session) = idle {
            if session.pool_generation() != generation {
                tracing::debug!(session_id = session.id(), "discarding stale idle session");
                dispose_quietly(session).await;
            } else if session.try_ping().await {
                return Ok(session);
            } else {
                tracing::debug!(session_id = session.id(), "idle session failed ping");
                dispose_quietly(session).await;
            }
        }

        let session = Session::connect(
            Arc::clone(&self.inner.client_config),
            generation,
            Session::next_id(),
        )
        .await?;
        Ok(session)
    }

    async fn release(&self, mut session: Session, token: LeaseToken) {
        let _permit = PermitGuard::new(&self.inner.permits);
        self.inner.leased.lock().remove(&session.id());
        drop(token);
        session.revoke_cancel_handles();

        let health = SessionHealth::of(&session, self.generation(), self.inner.config.max_lifetime);
        if !health.is_healthy() {
            tracing::debug!(session_id = session.id(), reason = %health, "closing returned session");
            dispose_quietly(session).await;
            return;
        }

        if self.inner.config.connection_reset {
            if let Err(e) = session.reset_connection().await {
                tracing::debug!(session_id = session.id(), error = %e, "reset failed; closing session");
                dispose_quietly(session).await;
                return;
            }
        }
        session.mark_returned();

        // A clear may have run while the reset was in flight.
        let stale = {
            let mut idle = self.inner.idle.lock();
            if session.pool_generation() == self.generation() {
                idle.push_front(session);
                None
            } else {
                Some(session)
            }
        };
        match stale {
            Some(session) => dispose_quietly(session).await,
            None => tracing::trace!("session returned to idle list"),
        }
    }

    async fn clean<F>(&self, respect_min: bool, should_close: F)
    where
        F: Fn(&Session) -> bool + Send + Sync,
    {
        let Ok(_sweep) = self.inner.sweep.acquire().await else {
            return;
        };

        let mut closed = 0usize;
        loop {
            if respect_min && self.total_sessions() <= self.inner.config.min_size as usize {
                break;
            }

            let permit =
                match tokio::time::timeout(SWEEP_PERMIT_WAIT, self.inner.permits.acquire()).await {
                    Ok(Ok(permit)) => permit,
                    _ => break,
                };

            let candidate = self.inner.idle.lock().pop_back();
            let Some(session) = candidate else {
                break;
            };

            if should_close(&session) {
                dispose_quietly(session).await;
                closed += 1;
                drop(permit);
            } else {
                self.inner.idle.lock().push_back(session);
                break;
            }
        }

        if closed > 0 {
            tracing::debug!(closed, "swept idle sessions");
        }
    }

    fn total_sessions(&self) -> usize {
        let leased = (self.inner.config.max_size as usize)
            .saturating_sub(self.inner.permits.available_permits());
        leased + self.inner.idle.lock().len()
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("config", &self.inner.config)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

async fn cancelled(token: Option<&CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

async fn dispose_quietly(mut session: Session) {
    if let Err(e) = session.dispose().await {
        tracing::warn!(session_id = session.id(), error = %e, "failed to close session");
    }
}

/// Gives one forgotten permit back when dropped, unless disarmed.
struct PermitGuard<'a> {
    permits: &'a Semaphore,
    armed: bool,
}

impl<'a> PermitGuard<'a> {
    fn new(permits: &'a Semaphore) -> Self {
        Self {
            permits,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PermitGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.permits.add_permits(1);
        }
    }
}

/// Status information about the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Sessions on the idle list.
    pub idle: u32,
    /// Permits currently held, including leaks not yet recovered.
    pub leased: u32,
    /// Maximum pool size.
    pub max: u32,
    /// Current generation.
    pub generation: u64,
}

/// A session leased from a [`Pool`].
///
/// Dereferences to [`Session`]. Dropping the lease returns the session on
/// the current Tokio runtime; use [`PooledSession::return_to_pool`] to choose
/// how the return is completed.
pub struct PooledSession {
    lease: Option<(Session, LeaseToken)>,
    pool: Pool,
}

impl PooledSession {
    /// Return the session to its pool.
    ///
    /// With [`IoBehavior::Synchronous`] the health check, reset and idle-list
    /// push complete before this returns; with [`IoBehavior::Asynchronous`]
    /// they run on a spawned task.
    pub async fn return_to_pool(mut self, io_behavior: IoBehavior) {
        let Some((session, token)) = self.lease.take() else {
            return;
        };
        let pool = self.pool.clone();
        match io_behavior {
            IoBehavior::Synchronous => pool.release(session, token).await,
            IoBehavior::Asynchronous => {
                tokio::spawn(async move { pool.release(session, token).await });
            }
        }
    }

    /// Take the session out of the pool's hands.
    ///
    /// The pool gets the permit back at its next leak scan.
    #[must_use]
    pub fn detach(mut self) -> Option<Session> {
        let (session, _token) = self.lease.take()?;
        tracing::debug!(session_id = session.id(), "session detached from pool");
        Some(session)
    }

    /// The pool this session was leased from.
    #[must_use]
    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

impl std::ops::Deref for PooledSession {
    type Target = Session;

    fn deref(&self) -> &Session {
        match &self.lease {
            Some((session, _)) => session,
            None => unreachable!("pooled session used after return"),
        }
    }
}

impl std::ops::DerefMut for PooledSession {
    fn deref_mut(&mut self) -> &mut Session {
        match &mut self.lease {
            Some((session, _)) => session,
            None => unreachable!("pooled session used after return"),
        }
    }
}

impl std::fmt::Debug for PooledSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledSession")
            .field("session", &self.lease.as_ref().map(|(session, _)| session))
            .finish_non_exhaustive()
    }
}

impl Drop for PooledSession {
    fn drop(&mut self) {
        let Some((session, token)) = self.lease.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let pool = self.pool.clone();
                handle.spawn(async move { pool.release(session, token).await });
            }
            Err(_) => {
                // Dropping the token leaves a dead entry for the leak scan.
                tracing::warn!(
                    session_id = session.id(),
                    "no runtime to return session; permit will be recovered by the leak scan"
                );
            }
        }
    }
}
