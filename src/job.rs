//! Jobs, job reports and result handles.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::oneshot;

use crate::pool::{PoolError, PoolResult};

/// Boxed unit of work run by a worker.
pub type Task = Box<dyn FnOnce() -> Result<(), String> + Send + 'static>;

/// Opaque job identifier chosen by the submitter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for JobId {
    fn from(id: u64) -> Self {
        JobId(id)
    }
}

/// A unit of work submitted to the pool.
pub struct Job {
    id: JobId,
    task: Task,
}

impl Job {
    /// Create a job from a fallible closure.
    pub fn new<F>(id: u64, task: F) -> Self
    where
        F: FnOnce() -> Result<(), String> + Send + 'static,
    {
        Self {
            id: JobId(id),
            task: Box::new(task),
        }
    }

    /// Create a job with an empty body.
    pub fn noop(id: u64) -> Self {
        Self::new(id, || Ok(()))
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub(crate) fn into_task(self) -> Task {
        self.task
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Outcome of a job that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobReport {
    /// Job id.
    pub id: JobId,
    /// Worker that ran the job.
    pub worker: usize,
    /// Position in which the dispatcher took the job off the queue (0-based).
    pub sequence: u64,
    /// Time between submit and the start of execution.
    #[serde(serialize_with = "serialize_micros")]
    pub queue_wait: Duration,
    /// Time spent running the job.
    #[serde(serialize_with = "serialize_micros")]
    pub exec_time: Duration,
}

fn serialize_micros<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_micros() as u64)
}

/// Handle to the result of a submitted job.
///
/// Dropping the handle does not cancel the job.
#[derive(Debug)]
pub struct JobHandle {
    id: JobId,
    rx: oneshot::Receiver<PoolResult<JobReport>>,
}

impl JobHandle {
    pub(crate) fn new(id: JobId, rx: oneshot::Receiver<PoolResult<JobReport>>) -> Self {
        Self { id, rx }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    /// Block the current thread until the job finishes.
    ///
    /// Must not be called from within an async runtime; use [`JobHandle::result`] there.
    pub fn wait(self) -> PoolResult<JobReport> {
        self.rx
            .blocking_recv()
            .unwrap_or(Err(PoolError::ChannelClosed))
    }

    /// Wait for the job to finish.
    pub async fn result(self) -> PoolResult<JobReport> {
        self.rx.await.unwrap_or(Err(PoolError::ChannelClosed))
    }

    /// Wait for the job to finish, giving up after `timeout`.
    ///
    /// The job keeps running after a timeout; only the wait is abandoned.
    pub async fn result_timeout(self, timeout: Duration) -> PoolResult<JobReport> {
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(PoolError::ChannelClosed),
            Err(_) => Err(PoolError::Timeout(timeout)),
        }
    }
}
