//! Pool error types.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during pool operations.
#[derive(Debug, Error)]
pub enum PoolError {
    /// No pool permit became available within the connect timeout.
    #[error("timeout expired while waiting for a pooled session after {0:?}")]
    AcquisitionTimeout(Duration),

    /// The caller's cancellation token fired while waiting.
    #[error("session acquisition was cancelled")]
    Cancelled,

    /// Pool configuration error.
    #[error("pool configuration error: {0}")]
    Configuration(String),

    /// Opening, resetting or using a session failed.
    #[error(transparent)]
    Client(#[from] mysql_client::Error),
}

impl PoolError {
    /// Whether retrying the acquisition could succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::AcquisitionTimeout(_) => true,
            Self::Client(e) => e.is_transient(),
            Self::Cancelled | Self::Configuration(_) => false,
        }
    }
}
