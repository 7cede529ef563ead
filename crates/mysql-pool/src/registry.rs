//! Pool registry and background reaper.
//!
//! A [`PoolRegistry`] owns one [`Pool`] per distinct normalized connection
//! string. Pools are created on first use and live as long as the registry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use mysql_client::Config;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::error::PoolError;
use crate::pool::Pool;

/// Interval between reaper runs.
pub const REAPER_INTERVAL: Duration = if cfg!(debug_assertions) {
    Duration::from_secs(1)
} else {
    Duration::from_secs(60)
};

/// Registry of pools keyed by [`Config::pool_key`].
///
/// Cloning is cheap; clones share the same pools.
#[derive(Clone, Default)]
pub struct PoolRegistry {
    pools: Arc<Mutex<HashMap<String, Pool>>>,
}

impl PoolRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the pool for `config`, creating it on first use.
    ///
    /// Returns `Ok(None)` when the configuration disables pooling.
    pub fn get_pool(&self, config: &Config) -> Result<Option<Pool>, PoolError> {
        if !config.pooling {
            return Ok(None);
        }

        let key = config.pool_key();
        let mut pools = self.pools.lock();
        if let Some(pool) = pools.get(&key) {
            return Ok(Some(pool.clone()));
        }

        let pool = Pool::new(Arc::new(config.clone()))?;
        pools.insert(key, pool.clone());
        Ok(Some(pool))
    }

    /// Clear the pool for `config`, if one exists.
    pub async fn clear_pool(&self, config: &Config) {
        let pool = self.pools.lock().get(&config.pool_key()).cloned();
        if let Some(pool) = pool {
            pool.clear().await;
        }
    }

    /// Clear every pool in the registry.
    pub async fn clear_all_pools(&self) {
        for pool in self.snapshot() {
            pool.clear().await;
        }
    }

    /// Reap every pool in the registry.
    pub async fn reap_all(&self) {
        for pool in self.snapshot() {
            pool.reap().await;
        }
    }

    /// Number of pools created so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pools.lock().len()
    }

    /// Check if no pool has been created yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pools.lock().is_empty()
    }

    /// Start reaping all pools every [`REAPER_INTERVAL`].
    ///
    /// The reaper stops when the returned handle is stopped or dropped.
    pub fn start_reaper(&self) -> ReaperHandle {
        self.start_reaper_with_interval(REAPER_INTERVAL)
    }

    /// Start reaping all pools at a custom interval.
    pub fn start_reaper_with_interval(&self, interval: Duration) -> ReaperHandle {
        let registry = self.clone();
        let token = CancellationToken::new();
        let stop = token.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::debug!(interval_ms = interval.as_millis() as u64, "pool reaper started");

            loop {
                tokio::select! {
                    () = stop.cancelled() => break,
                    _ = ticker.tick() => {
                        let registry = registry.clone();
                        // A panicking sweep must not end the reaper.
                        if let Err(e) = tokio::spawn(async move { registry.reap_all().await }).await {
                            tracing::warn!(error = %e, "pool reaper run failed");
                        }
                    }
                }
            }

            tracing::debug!("pool reaper stopped");
        });

        ReaperHandle {
            token,
            task: Some(task),
        }
    }

    fn snapshot(&self) -> Vec<Pool> {
        self.pools.lock().values().cloned().collect()
    }
}

impl std::fmt::Debug for PoolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolRegistry")
            .field("pools", &self.len())
            .finish()
    }
}

/// Handle to a running reaper task.
#[must_use = "the reaper stops when its handle is dropped"]
#[derive(Debug)]
pub struct ReaperHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ReaperHandle {
    /// Stop the reaper and wait for it to finish.
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "pool reaper ended abnormally");
            }
        }
    }

    /// Check if the reaper task is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for ReaperHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
