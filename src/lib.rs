//! workpool - bounded worker pool with a dispatching loop.
//!
//! A fixed set of worker threads is fed from a bounded FIFO queue by a
//! single dispatcher, which hands each job to whichever worker most recently
//! announced itself idle. A shared pending counter lets callers block until
//! every submitted job has run.
//!
//! # Features
//!
//! - **Backpressure**: `submit` blocks while the queue is full
//! - **Completion tracking**: `wait` blocks until all submitted jobs finished
//! - **Job results**: every submit returns a [`JobHandle`] (blocking or async)
//! - **Cooperative stop**: per-worker `stop_worker` and pool-wide `shutdown`
//! - **Observability**: `tracing` events and per-pool Prometheus metrics
//!
//! # Example
//!
//! ```rust,no_run
//! use workpool::{Job, Pool};
//!
//! let pool = Pool::new(5)?;
//! for id in 1..=20 {
//!     pool.submit(Job::noop(id))?;
//! }
//! pool.wait();
//! assert_eq!(pool.pending_count(), 0);
//! # Ok::<(), workpool::PoolError>(())
//! ```

/// Package version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod config;
pub mod job;
pub mod logging;
pub mod observability;
pub mod pool;

// Re-exports for convenience
pub use config::Config;
pub use job::{Job, JobHandle, JobId, JobReport};
pub use pool::{global, Pool, PoolError, PoolResult, PoolStats, WorkerState};
