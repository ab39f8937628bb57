//! Worker pool error types.

use std::fmt;
use std::time::Duration;

/// Errors that can occur during pool operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The pool was asked for zero workers or a zero-sized queue.
    InvalidConfiguration(String),

    /// The OS refused to start a worker or dispatcher thread.
    Spawn(String),

    /// The pool has been shut down.
    Shutdown,

    /// `stop_worker` was called with an id outside the pool.
    UnknownWorker {
        /// Requested worker id.
        id: usize,
        /// Number of workers in the pool.
        workers: usize,
    },

    /// Every worker has stopped, so the job could not be delivered.
    NoWorkers,

    /// The result channel was closed before a result was sent.
    ChannelClosed,

    /// Waiting for a job result timed out.
    Timeout(Duration),

    /// The job panicked while running on a worker.
    WorkerPanic(String),

    /// The job returned an error.
    Execution(String),
}

impl PoolError {
    /// Check if this is a configuration error.
    pub fn is_invalid_configuration(&self) -> bool {
        matches!(self, PoolError::InvalidConfiguration(_))
    }

    /// Check if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, PoolError::Timeout(_))
    }

    /// Check if this is a shutdown error.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, PoolError::Shutdown)
    }

    /// Check if the job itself failed (returned an error or panicked).
    pub fn is_job_failure(&self) -> bool {
        matches!(self, PoolError::Execution(_) | PoolError::WorkerPanic(_))
    }

    /// Get the error message for logging.
    pub fn message(&self) -> &str {
        match self {
            PoolError::InvalidConfiguration(msg) => msg,
            PoolError::Spawn(_) => "Thread spawn failed",
            PoolError::Shutdown => "Pool shutdown",
            PoolError::UnknownWorker { .. } => "Unknown worker",
            PoolError::NoWorkers => "No workers available",
            PoolError::ChannelClosed => "Channel closed",
            PoolError::Timeout(_) => "Job timeout",
            PoolError::WorkerPanic(_) => "Worker panic",
            PoolError::Execution(msg) => msg,
        }
    }
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::InvalidConfiguration(msg) => {
                write!(f, "invalid configuration: {}", msg)
            }
            PoolError::Spawn(msg) => {
                write!(f, "failed to spawn thread: {}", msg)
            }
            PoolError::Shutdown => {
                write!(f, "pool has been shut down")
            }
            PoolError::UnknownWorker { id, workers } => {
                write!(f, "unknown worker {} (pool has {} workers)", id, workers)
            }
            PoolError::NoWorkers => {
                write!(f, "no workers left to run the job")
            }
            PoolError::ChannelClosed => {
                write!(f, "result channel closed unexpectedly")
            }
            PoolError::Timeout(duration) => {
                write!(f, "job timeout after {}ms", duration.as_millis())
            }
            PoolError::WorkerPanic(msg) => {
                write!(f, "worker panic: {}", msg)
            }
            PoolError::Execution(msg) => {
                write!(f, "execution error: {}", msg)
            }
        }
    }
}

impl std::error::Error for PoolError {}

impl From<String> for PoolError {
    fn from(msg: String) -> Self {
        PoolError::Execution(msg)
    }
}

impl From<&str> for PoolError {
    fn from(msg: &str) -> Self {
        PoolError::Execution(msg.to_string())
    }
}

/// Result type alias for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;
