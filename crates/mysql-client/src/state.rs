//! Session state tracking.
//!
//! ## State Transitions
//!
//! ```text
//! Created -> Connecting (via Session::connect())
//! Connecting -> Connected (handshake and authentication complete)
//! Connected -> Querying (command sent)
//! Querying -> Connected (reply fully read)
//! Querying -> Cancelling (CancelHandle::try_start_cancel())
//! Cancelling -> Querying (CancelHandle::abort_cancel())
//! Cancelling -> Connected (reply fully read)
//! any -> Failed (I/O or protocol error)
//! any -> Closed (Session::dispose())
//! ```
//!
//! The state is shared with [`CancelHandle`](crate::CancelHandle), so it lives
//! behind a lock rather than in the type system. Starting a command while
//! another is still `Querying` means the earlier reply was abandoned, so the
//! session goes to `Failed` instead.

/// Runtime state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Not yet connected.
    #[default]
    Created,
    /// Handshake in progress.
    Connecting,
    /// Authenticated and idle.
    Connected,
    /// A command is in flight.
    Querying,
    /// A `KILL QUERY` is being issued for the in-flight command.
    Cancelling,
    /// The transport is broken; the session must be discarded.
    Failed,
    /// The session was disposed.
    Closed,
}

impl SessionState {
    /// Whether the session can carry further commands.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Connected | Self::Querying | Self::Cancelling)
    }

    /// Whether a command is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Querying | Self::Cancelling)
    }
}

/// State shared between a session and its cancel handles.
#[derive(Debug, Default)]
pub(crate) struct SharedState {
    pub(crate) state: SessionState,
    /// Bumped whenever the session changes hands. Cancel handles taken under
    /// an earlier lease no longer match and are inert.
    pub(crate) lease: u64,
}

impl SharedState {
    pub(crate) fn connected() -> Self {
        Self {
            state: SessionState::Connected,
            lease: 0,
        }
    }
}
