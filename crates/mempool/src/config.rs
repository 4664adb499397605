//! Pool configuration

use std::sync::Arc;

use crate::backoff::{SpinThenYield, YieldStrategy};
use crate::error::{PoolError, PoolResult};

/// Configuration for [`Pool`](crate::Pool)
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of slots. Fixed for the pool's lifetime.
    pub capacity: usize,

    /// Name used in logs and error messages
    pub name: String,

    /// Enable statistics tracking
    pub track_stats: bool,

    /// Maximum push attempts when returning an index to the free queue.
    ///
    /// The free queue always has room for a released index, so hitting this
    /// bound means the pool's bookkeeping is broken.
    pub max_release_retries: usize,

    /// Where release retries wait between attempts
    pub yield_strategy: Arc<dyn YieldStrategy>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: 128,
            name: "mempool".to_string(),
            track_stats: true,
            max_release_retries: 100_000,
            yield_strategy: Arc::new(SpinThenYield),
        }
    }
}

impl PoolConfig {
    /// Default configuration with the given capacity
    #[must_use]
    pub fn bounded(capacity: usize) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    /// Production configuration - no statistics on the hot path
    #[must_use]
    pub fn production(capacity: usize) -> Self {
        Self {
            capacity,
            track_stats: false,
            ..Default::default()
        }
    }

    /// Debug configuration - statistics on, release retries give up early
    #[must_use]
    pub fn debug(capacity: usize) -> Self {
        Self {
            capacity,
            track_stats: true,
            max_release_retries: 1_000,
            ..Default::default()
        }
    }

    #[must_use = "builder methods must be chained or built"]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use = "builder methods must be chained or built"]
    pub fn with_stats(mut self, track_stats: bool) -> Self {
        self.track_stats = track_stats;
        self
    }

    #[must_use = "builder methods must be chained or built"]
    pub fn with_max_release_retries(mut self, max_release_retries: usize) -> Self {
        self.max_release_retries = max_release_retries;
        self
    }

    #[must_use = "builder methods must be chained or built"]
    pub fn with_yield_strategy<S>(mut self, strategy: S) -> Self
    where
        S: YieldStrategy + 'static,
    {
        self.yield_strategy = Arc::new(strategy);
        self
    }

    /// Check the configuration before building a pool from it
    pub fn validate(&self) -> PoolResult<()> {
        if self.capacity == 0 {
            return Err(PoolError::invalid_config("capacity must be non-zero"));
        }
        if self.max_release_retries == 0 {
            return Err(PoolError::invalid_config(
                "max_release_retries must be non-zero",
            ));
        }
        Ok(())
    }
}
