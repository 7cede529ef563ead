//! Session lifecycle checks.
//!
//! Decides what happens to a session when it comes back to the pool and
//! whether an idle session has outlived its welcome.

use std::time::Duration;

use mysql_client::Session;

/// Outcome of checking a returned session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionHealth {
    /// The session can go back on the idle list.
    Healthy,
    /// The transport failed, the session was closed, or a command was
    /// abandoned before its reply was read.
    Broken,
    /// The session was opened before the pool was last cleared.
    Stale,
    /// The caller switched databases with `COM_INIT_DB`.
    DatabaseChanged,
    /// The session is older than the configured lifetime.
    Expired,
}

impl SessionHealth {
    /// Check `session` against the pool's current generation and lifetime.
    #[must_use]
    pub fn of(session: &Session, generation: u64, max_lifetime: Duration) -> Self {
        Self::classify(
            session.is_connected(),
            session.pool_generation() == generation,
            session.database_override().is_some(),
            session.created_at().elapsed(),
            max_lifetime,
        )
    }

    fn classify(
        connected: bool,
        current_generation: bool,
        database_changed: bool,
        age: Duration,
        max_lifetime: Duration,
    ) -> Self {
        if !connected {
            Self::Broken
        } else if !current_generation {
            Self::Stale
        } else if database_changed {
            Self::DatabaseChanged
        } else if !max_lifetime.is_zero() && age >= max_lifetime {
            Self::Expired
        } else {
            Self::Healthy
        }
    }

    /// Whether the session may be reused.
    #[must_use]
    pub fn is_healthy(self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// Short label used in log fields.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Broken => "broken",
            Self::Stale => "stale",
            Self::DatabaseChanged => "database_changed",
            Self::Expired => "expired",
        }
    }
}

impl std::fmt::Display for SessionHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check if a session has been idle for at least `idle_timeout`.
#[must_use]
pub fn is_idle_expired(session: &Session, idle_timeout: Duration) -> bool {
    session.last_returned_at().elapsed() >= idle_timeout
}
