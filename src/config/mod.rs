//! Configuration module for workpool.
//!
//! This module provides centralized configuration loading from environment variables.
//!
//! # Example
//!
//! ```rust,ignore
//! use workpool::config::Config;
//!
//! let config = Config::from_env()?;
//! println!("Workers: {}", config.pool.worker_count());
//! ```

mod demo;
mod error;
mod logging;
mod parse;
mod pool;

pub use demo::DemoConfig;
pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use parse::{parse_duration, Lookup};
pub use pool::PoolConfig;

/// Complete application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Worker pool configuration.
    pub pool: PoolConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
    /// Demo run configuration.
    pub demo: DemoConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&parse::process_env)
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_lookup(env: Lookup<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            pool: PoolConfig::from_lookup(env)?,
            logging: LoggingConfig::from_lookup(env)?,
            demo: DemoConfig::from_lookup(env)?,
        })
    }

    /// Print configuration summary to log.
    pub fn log_summary(&self) {
        use tracing::info;

        info!("Configuration loaded:");
        info!("  Pool: {}", self.pool.name);
        info!("  Workers: {}", self.pool.worker_count());
        info!("  Queue capacity: {}", self.pool.queue_capacity());
        info!("  Log format: {:?}", self.logging.format);
        info!("  Demo jobs: {}", self.demo.jobs);

        match self.demo.job_delay {
            Some(delay) => info!("  Job delay: {}ms", delay.as_millis()),
            None => info!("  Job delay: off"),
        }

        if self.demo.metrics_dump {
            info!("  Metrics dump: enabled");
        }
    }
}
