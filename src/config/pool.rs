//! Worker pool configuration.

use super::parse::{env_opt, env_parse, Lookup};
use super::ConfigError;
use crate::pool::{DEFAULT_POOL_NAME, MAX_QUEUE_CAPACITY, MAX_WORKERS};
use std::num::NonZeroUsize;

/// Pool configuration loaded from environment.
///
/// All values are resolved at construction time.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Pool name, used for thread names and metric labels.
    pub name: String,
    /// Resolved worker count (never zero).
    worker_count: NonZeroUsize,
    /// Resolved queue capacity (never zero).
    queue_capacity: NonZeroUsize,
}

impl PoolConfig {
    /// Load configuration from a variable lookup.
    pub fn from_lookup(env: Lookup<'_>) -> Result<Self, ConfigError> {
        let worker_count = Self::parse_worker_count(env)?;
        let queue_capacity = Self::parse_queue_capacity(env, worker_count)?;

        Ok(Self {
            name: env_opt(env, "POOL_NAME").unwrap_or_else(|| DEFAULT_POOL_NAME.to_string()),
            worker_count,
            queue_capacity,
        })
    }

    #[inline]
    pub fn worker_count(&self) -> usize {
        self.worker_count.get()
    }

    #[inline]
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity.get()
    }

    fn parse_worker_count(env: Lookup<'_>) -> Result<NonZeroUsize, ConfigError> {
        let workers: usize = env_parse(env, "POOL_WORKERS", 0)?;

        // Resolve 0 to CPU count
        let count = if workers == 0 {
            num_cpus::get()
        } else {
            workers
        };

        if count > MAX_WORKERS {
            return Err(ConfigError::Invalid {
                key: "POOL_WORKERS".into(),
                message: format!("at most {} workers are supported", MAX_WORKERS),
            });
        }

        NonZeroUsize::new(count).ok_or_else(|| ConfigError::Invalid {
            key: "POOL_WORKERS".into(),
            message: "worker count cannot be zero".into(),
        })
    }

    fn parse_queue_capacity(
        env: Lookup<'_>,
        workers: NonZeroUsize,
    ) -> Result<NonZeroUsize, ConfigError> {
        let capacity: usize = env_parse(env, "POOL_QUEUE_CAPACITY", 0)?;
        if capacity > MAX_QUEUE_CAPACITY {
            return Err(ConfigError::Invalid {
                key: "POOL_QUEUE_CAPACITY".into(),
                message: format!("at most {} slots are supported", MAX_QUEUE_CAPACITY),
            });
        }

        // Resolve 0 to one slot per worker
        Ok(NonZeroUsize::new(capacity).unwrap_or(workers))
    }
}
