//! Pool configuration.

use std::time::Duration;

use mysql_client::Config;

use crate::error::PoolError;

/// Maximum time a clean sweep waits for a pool permit before giving up.
pub const SWEEP_PERMIT_WAIT: Duration = Duration::from_millis(10);

/// Minimum spacing between two leak scans triggered by `Pool::get`.
pub const LEAK_SCAN_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration for the connection pool.
///
/// Usually derived from the client [`Config`] with
/// [`PoolConfig::from_client_config`]; the builder methods exist for tests and
/// for callers that size pools independently of their connection strings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct PoolConfig {
    /// Number of sessions the reaper keeps open.
    pub min_size: u32,

    /// Maximum number of sessions leased or idle at once.
    pub max_size: u32,

    /// Time to wait for a permit before timing out. Zero waits forever.
    pub connection_timeout: Duration,

    /// Idle time after which the reaper closes a session. Zero disables it.
    pub idle_timeout: Duration,

    /// Age after which a returned session is closed. Zero disables it.
    pub max_lifetime: Duration,

    /// Whether to reset sessions before putting them back on the idle list.
    pub connection_reset: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::from_client_config(&Config::default())
    }
}

impl PoolConfig {
    /// Create a new pool configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the pool settings out of a client configuration.
    #[must_use]
    pub fn from_client_config(config: &Config) -> Self {
        Self {
            min_size: config.min_pool_size,
            max_size: config.max_pool_size,
            connection_timeout: config.connect_timeout,
            idle_timeout: config.connection_idle_timeout,
            max_lifetime: config.connection_lifetime,
            connection_reset: config.connection_reset,
        }
    }

    /// Set the minimum pool size.
    #[must_use]
    pub fn min_size(mut self, count: u32) -> Self {
        self.min_size = count;
        self
    }

    /// Set the maximum pool size.
    #[must_use]
    pub fn max_size(mut self, count: u32) -> Self {
        self.max_size = count;
        self
    }

    /// Set the permit acquisition timeout.
    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set the idle session timeout.
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the maximum session lifetime.
    #[must_use]
    pub fn max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime = lifetime;
        self
    }

    /// Enable or disable the reset on return.
    #[must_use]
    pub fn connection_reset(mut self, enabled: bool) -> Self {
        self.connection_reset = enabled;
        self
    }

    /// `connection_timeout` as an optional budget; zero means none.
    #[must_use]
    pub fn acquire_timeout(&self) -> Option<Duration> {
        (!self.connection_timeout.is_zero()).then_some(self.connection_timeout)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.max_size == 0 {
            return Err(PoolError::Configuration(
                "max_size must be greater than 0".into(),
            ));
        }
        if self.min_size > self.max_size {
            return Err(PoolError::Configuration(
                "maximum pool size must be greater than or equal to minimum pool size".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PoolConfig::default();
        assert_eq!(config.min_size, 0);
        assert_eq!(config.max_size, 100);
        assert_eq!(config.idle_timeout, Duration::from_secs(180));
        assert_eq!(config.max_lifetime, Duration::ZERO);
        assert!(config.connection_reset);
        assert_eq!(config.acquire_timeout(), Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_from_connection_string() {
        let client = Config::from_connection_string(
            "Server=db;Min Pool Size=2;Max Pool Size=4;Connection Lifetime=30;\
             Connection Idle Timeout=5;Connection Reset=false;Connect Timeout=0",
        )
        .unwrap();
        let config = PoolConfig::from_client_config(&client);

        assert_eq!(config.min_size, 2);
        assert_eq!(config.max_size, 4);
        assert_eq!(config.max_lifetime, Duration::from_secs(30));
        assert_eq!(config.idle_timeout, Duration::from_secs(5));
        assert!(!config.connection_reset);
        assert_eq!(config.acquire_timeout(), None);
    }

    #[test]
    fn test_config_builder_methods() {
        let config = PoolConfig::new()
            .min_size(5)
            .max_size(50)
            .connection_timeout(Duration::from_secs(60))
            .idle_timeout(Duration::from_secs(120))
            .max_lifetime(Duration::from_secs(3600))
            .connection_reset(false);

        assert_eq!(config.min_size, 5);
        assert_eq!(config.max_size, 50);
        assert_eq!(config.connection_timeout, Duration::from_secs(60));
        assert_eq!(config.idle_timeout, Duration::from_secs(120));
        assert_eq!(config.max_lifetime, Duration::from_secs(3600));
        assert!(!config.connection_reset);
    }

    #[test]
    fn test_config_validation() {
        assert!(PoolConfig::new().min_size(5).max_size(5).validate().is_ok());

        let err = PoolConfig::new().min_size(20).max_size(10).validate().unwrap_err();
        assert!(err.to_string().contains("greater than or equal to minimum"));

        let err = PoolConfig::new().min_size(0).max_size(0).validate().unwrap_err();
        assert!(err.to_string().contains("max_size must be greater than 0"));
    }
}
