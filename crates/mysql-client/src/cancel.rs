//! Query cancellation support.
//!
//! MySQL has no out-of-band cancel signal on the session's own socket.
//! Instead a [`CancelHandle`] opens a short-lived second session to the same
//! host and issues `KILL QUERY <connection id>` for the session it was taken
//! from.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//!
//! // Get a cancel handle before starting the query
//! let cancel_handle = session.cancel_handle();
//!
//! // Spawn a task to cancel after 5 seconds
//! tokio::spawn(async move {
//!     tokio::time::sleep(Duration::from_secs(5)).await;
//!     cancel_handle.cancel().await;
//! });
//!
//! // Fails with server error 1317 if it is still running after 5 seconds
//! let result = session.query("SELECT SLEEP(60)").await;
//! ```
//!
//! ## Important Notes
//!
//! - The `CancelHandle` is cloneable and can be shared across tasks
//! - At most one cancel is in flight per session
//! - A handle only acts on commands of the lease it was taken under; once
//!   the session is returned to a pool the handle does nothing
//! - A successful `KILL QUERY` does not guarantee the query was interrupted;
//!   it may already have finished
//! - The session remains usable once the interrupted reply has been read

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::Result;
use crate::session::Session;
use crate::state::{SessionState, SharedState};

/// Connect timeout for the session that issues `KILL QUERY`.
pub const CANCEL_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Handle for cancelling the in-flight command on a session.
///
/// # Thread Safety
///
/// The `CancelHandle` is `Send + Sync` and can be safely shared between tasks.
#[derive(Clone)]
pub struct CancelHandle {
    state: Arc<Mutex<SharedState>>,
    lease: u64,
    config: Arc<Config>,
    host: String,
    connection_id: u32,
    session_id: u64,
}

impl CancelHandle {
    pub(crate) fn new(
        state: Arc<Mutex<SharedState>>,
        lease: u64,
        config: Arc<Config>,
        host: String,
        connection_id: u32,
        session_id: u64,
    ) -> Self {
        Self {
            state,
            lease,
            config,
            host,
            connection_id,
            session_id,
        }
    }

    /// Server connection id this handle targets.
    #[must_use]
    pub fn connection_id(&self) -> u32 {
        self.connection_id
    }

    /// Move the session from `Querying` to `Cancelling`.
    ///
    /// Returns `false` if no command is running, a cancel is already in
    /// flight, or the session has changed hands since the handle was taken.
    pub fn try_start_cancel(&self) -> bool {
        let mut shared = self.state.lock();
        if shared.lease == self.lease && shared.state == SessionState::Querying {
            shared.state = SessionState::Cancelling;
            true
        } else {
            false
        }
    }

    /// Move the session back from `Cancelling` to `Querying` after a failed
    /// cancel attempt.
    pub fn abort_cancel(&self) {
        let mut shared = self.state.lock();
        if shared.lease == self.lease && shared.state == SessionState::Cancelling {
            shared.state = SessionState::Querying;
        }
    }

    /// Whether the command this handle started cancelling is still running.
    fn is_cancelling(&self) -> bool {
        let shared = self.state.lock();
        shared.lease == self.lease && shared.state == SessionState::Cancelling
    }

    /// Issue `KILL QUERY` over a fresh, unpooled session.
    ///
    /// Does nothing if the session is no longer `Cancelling` (the command
    /// finished in the meantime).
    pub async fn do_cancel(&self) -> Result<()> {
        if !self.is_cancelling() {
            return Ok(());
        }

        let mut config = Config::clone(&self.config)
            .host(self.host.clone())
            .pooling(false)
            .connect_timeout(CANCEL_CONNECT_TIMEOUT);
        config.database = None;

        let mut killer = Session::connect(Arc::new(config), 0, Session::next_id()).await?;
        // The command may have finished while the cancel session connected.
        let issued = self.is_cancelling();
        let result = if issued {
            killer
                .execute(&format!("KILL QUERY {}", self.connection_id))
                .await
                .map(|_| ())
        } else {
            Ok(())
        };
        if let Err(e) = killer.dispose().await {
            tracing::debug!(error = %e, "failed to dispose cancel session");
        }
        result?;

        if issued {
            tracing::debug!(
                session_id = self.session_id,
                connection_id = self.connection_id,
                "issued KILL QUERY"
            );
        }
        Ok(())
    }

    /// Cancel the in-flight command, if any.
    ///
    /// Returns `true` if `KILL QUERY` was issued. Failures are logged and
    /// roll the session back to `Querying`.
    pub async fn cancel(&self) -> bool {
        if !self.try_start_cancel() {
            return false;
        }
        match self.do_cancel().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    session_id = self.session_id,
                    connection_id = self.connection_id,
                    error = %e,
                    "failed to cancel query"
                );
                self.abort_cancel();
                false
            }
        }
    }
}

impl std::fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelHandle")
            .field("host", &self.host)
            .field("connection_id", &self.connection_id)
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(state: SessionState) -> CancelHandle {
        CancelHandle::new(
            Arc::new(Mutex::new(SharedState { state, lease: 0 })),
            0,
            Arc::new(Config::default()),
            "localhost".into(),
            42,
            1,
        )
    }

    #[test]
    fn test_start_only_while_querying() {
        assert!(!handle(SessionState::Connected).try_start_cancel());
        assert!(!handle(SessionState::Closed).try_start_cancel());

        let h = handle(SessionState::Querying);
        assert!(h.try_start_cancel());
        // A second cancel while one is in flight is refused.
        assert!(!h.try_start_cancel());
    }

    #[test]
    fn test_abort_rolls_back() {
        let h = handle(SessionState::Querying);
        assert!(h.try_start_cancel());
        h.abort_cancel();
        assert_eq!(h.state.lock().state, SessionState::Querying);
        assert!(h.try_start_cancel());
    }

    #[test]
    fn test_handle_from_earlier_lease_is_inert() {
        let h = handle(SessionState::Querying);
        h.state.lock().lease += 1;

        assert!(!h.try_start_cancel());
        assert_eq!(h.state.lock().state, SessionState::Querying);

        // A handle taken under the new lease still works.
        let current = CancelHandle {
            lease: 1,
            ..h.clone()
        };
        assert!(current.try_start_cancel());
        h.abort_cancel();
        assert_eq!(h.state.lock().state, SessionState::Cancelling);
    }

    #[tokio::test]
    async fn test_do_cancel_noop_when_not_cancelling() {
        let h = handle(SessionState::Connected);
        assert!(h.do_cancel().await.is_ok());
    }

    #[tokio::test]
    async fn test_cancel_idle_session_is_noop() {
        assert!(!handle(SessionState::Connected).cancel().await);
    }
}
