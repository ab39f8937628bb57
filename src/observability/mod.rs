//! Observability for worker pools.
//!
//! Logging goes through `tracing` (see [`crate::logging`] for subscriber
//! setup). This module holds the Prometheus metrics each pool records.
//!
//! ```rust,ignore
//! let pool = workpool::Pool::new(4)?;
//! pool.submit(workpool::Job::noop(1))?;
//! pool.wait();
//! println!("{}", pool.metrics().export());
//! ```

pub mod metrics;

pub use metrics::PoolMetrics;
