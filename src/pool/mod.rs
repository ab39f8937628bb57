//! Bounded worker pool with a dispatching loop.
//!
//! # Architecture
//!
//! ```text
//!  submit() ──▶ ┌──────────────────┐      ┌────────────┐
//!               │ job queue (FIFO) │ ───▶ │ dispatcher │
//!               └──────────────────┘      └─────┬──────┘
//!                                               │ takes next idle inbox
//!               ┌───────────────────────┐       │
//!               │ availability registry │ ◀─────┘
//!               └───────────▲───────────┘
//!                 register  │  ┌─────────┐ ┌─────────┐ ┌─────────┐
//!                 when idle └──│ Worker0 │ │ Worker1 │ │ Worker2 │ ...
//!                              └─────────┘ └─────────┘ └─────────┘
//!                                    │ done ──▶ pending counter ──▶ wait()
//! ```
//!
//! Jobs leave the queue in submit order; completion order across workers is
//! unspecified. The registry is an unordered pool of idle tokens: a job goes
//! to whichever worker registered next, not the one idle the longest.

mod dispatcher;
mod error;
mod global;
mod pending;
mod worker;

pub use error::{PoolError, PoolResult};
pub use global::global;
pub use pending::PendingCounter;
pub use worker::WorkerState;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam::channel::{self, SendError, Sender};
use serde::Serialize;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::config::PoolConfig;
use crate::job::{Job, JobHandle};
use crate::observability::metrics::{
    PoolMetrics, STATUS_ABANDONED, STATUS_ERROR, STATUS_PANIC, STATUS_SUCCESS,
};
use worker::{WorkerHandle, WorkerRequest};

/// Default pool name, used for thread names and metric labels.
pub const DEFAULT_POOL_NAME: &str = "workpool";

/// Upper bound on workers per pool.
pub const MAX_WORKERS: usize = 1024;

/// Upper bound on queue capacity. The queue buffer is allocated up front.
pub const MAX_QUEUE_CAPACITY: usize = 1 << 16;

/// State shared by the pool, the dispatcher and every worker.
pub(crate) struct Shared {
    pub pending: PendingCounter,
    pub metrics: PoolMetrics,
}

impl Shared {
    pub fn new(pool_name: &str) -> PoolResult<Self> {
        let metrics = PoolMetrics::new(pool_name)
            .map_err(|e| PoolError::InvalidConfiguration(format!("metrics: {}", e)))?;
        Ok(Self {
            pending: PendingCounter::new(),
            metrics,
        })
    }
}

/// Point-in-time counters for a pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Jobs accepted by `submit`.
    pub submitted: u64,
    /// Jobs that ran and returned `Ok`.
    pub succeeded: u64,
    /// Jobs that ran and returned an error.
    pub failed: u64,
    /// Jobs that panicked.
    pub panicked: u64,
    /// Jobs resolved without running because no worker was left.
    pub abandoned: u64,
    /// Submitted but unfinished jobs.
    pub pending: usize,
    /// Workers running a job right now.
    pub busy_workers: usize,
    /// Workers that have not stopped.
    pub live_workers: usize,
}

/// A fixed set of worker threads fed by a single dispatcher.
///
/// Dropping the pool performs [`Pool::shutdown`].
pub struct Pool {
    id: Uuid,
    name: String,
    worker_count: usize,
    queue_capacity: usize,
    /// `None` once the queue is closed.
    queue_tx: Mutex<Option<Sender<WorkerRequest>>>,
    workers: Vec<WorkerHandle>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    shared: Arc<Shared>,
    shutdown: AtomicBool,
    /// Held for the whole of `shutdown`, so every caller returns after the joins.
    shutdown_lock: Mutex<()>,
}

impl Pool {
    /// Create a pool with `max_workers` workers and a queue of the same size.
    pub fn new(max_workers: usize) -> PoolResult<Self> {
        Self::with_capacity(max_workers, max_workers, DEFAULT_POOL_NAME)
    }

    /// Create a pool from loaded configuration.
    pub fn from_config(config: &PoolConfig) -> PoolResult<Self> {
        Self::with_capacity(
            config.worker_count(),
            config.queue_capacity(),
            config.name.clone(),
        )
    }

    /// Create a pool with a custom queue capacity.
    ///
    /// # Errors
    /// `InvalidConfiguration` if `max_workers` or `queue_capacity` is zero or
    /// above [`MAX_WORKERS`] / [`MAX_QUEUE_CAPACITY`]; no thread is started in
    /// that case. `Spawn` if a thread cannot be created.
    pub fn with_capacity(
        max_workers: usize,
        queue_capacity: usize,
        name: impl Into<String>,
    ) -> PoolResult<Self> {
        let name = name.into();

        if max_workers == 0 {
            return Err(PoolError::InvalidConfiguration(
                "worker count must be positive".into(),
            ));
        }
        if queue_capacity == 0 {
            return Err(PoolError::InvalidConfiguration(
                "queue capacity must be positive".into(),
            ));
        }
        if max_workers > MAX_WORKERS {
            return Err(PoolError::InvalidConfiguration(format!(
                "worker count {} exceeds maximum {}",
                max_workers, MAX_WORKERS
            )));
        }
        if queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(PoolError::InvalidConfiguration(format!(
                "queue capacity {} exceeds maximum {}",
                queue_capacity, MAX_QUEUE_CAPACITY
            )));
        }

        let shared = Arc::new(Shared::new(&name)?);
        let (queue_tx, queue_rx) = channel::bounded::<WorkerRequest>(queue_capacity);
        let (registry_tx, registry_rx) = channel::bounded(max_workers);

        // Each live worker holds at most one registry entry, so registering never blocks.
        debug_assert!(registry_tx
            .capacity()
            .is_some_and(|capacity| capacity >= max_workers));

        let mut workers = Vec::with_capacity(max_workers);
        for id in 0..max_workers {
            match worker::spawn(id, &name, registry_tx.clone(), Arc::clone(&shared)) {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    stop_and_join(&workers);
                    return Err(e);
                }
            }
        }
        // Only workers may keep the registry open.
        drop(registry_tx);

        let dispatcher =
            match dispatcher::spawn(&name, queue_rx, registry_rx, Arc::clone(&shared)) {
                Ok(handle) => handle,
                Err(e) => {
                    stop_and_join(&workers);
                    return Err(e);
                }
            };

        let id = Uuid::new_v4();
        tracing::info!(
            pool = %name,
            pool_id = %id,
            workers = max_workers,
            capacity = queue_capacity,
            "worker pool created"
        );

        Ok(Self {
            id,
            name,
            worker_count: max_workers,
            queue_capacity,
            queue_tx: Mutex::new(Some(queue_tx)),
            workers,
            dispatcher: Mutex::new(Some(dispatcher)),
            shared,
            shutdown: AtomicBool::new(false),
            shutdown_lock: Mutex::new(()),
        })
    }

    fn queue_sender(&self) -> MutexGuard<'_, Option<Sender<WorkerRequest>>> {
        self.queue_tx.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Submit a job.
    ///
    /// Blocks while the queue is full. The returned handle may be dropped if
    /// the caller does not need the result.
    ///
    /// # Errors
    /// `Shutdown` if the pool no longer accepts jobs.
    pub fn submit(&self, job: Job) -> PoolResult<JobHandle> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(PoolError::Shutdown);
        }

        // Clone under the lock, send after releasing it.
        let sender = self.queue_sender().clone().ok_or(PoolError::Shutdown)?;

        let job_id = job.id();
        let (reply, rx) = oneshot::channel();

        self.shared.pending.add();
        self.shared.metrics.record_submitted();

        if let Err(SendError(_request)) = sender.send(WorkerRequest::new(job, reply)) {
            self.shared.metrics.record_rejected();
            self.shared.pending.done();
            return Err(PoolError::Shutdown);
        }

        tracing::trace!(pool = %self.name, job = %job_id, "job queued");
        Ok(JobHandle::new(job_id, rx))
    }

    /// Submit a closure as job `id`.
    pub fn submit_fn<F>(&self, id: u64, task: F) -> PoolResult<JobHandle>
    where
        F: FnOnce() -> Result<(), String> + Send + 'static,
    {
        self.submit(Job::new(id, task))
    }

    /// Block until every submitted job has finished.
    ///
    /// Jobs submitted while waiting are waited for too.
    pub fn wait(&self) {
        self.shared.pending.wait();
    }

    /// Like [`Pool::wait`], giving up after `timeout`. Returns true if drained.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.shared.pending.wait_timeout(timeout)
    }

    /// Ask one worker to stop after its current job.
    ///
    /// Remaining workers keep draining the queue. Repeated calls are no-ops.
    pub fn stop_worker(&self, id: usize) -> PoolResult<()> {
        let worker = self.workers.get(id).ok_or(PoolError::UnknownWorker {
            id,
            workers: self.worker_count,
        })?;
        worker.stop();
        Ok(())
    }

    /// Stop accepting jobs, run everything already queued, then stop and join
    /// every worker.
    ///
    /// Idempotent. Concurrent callers all return once the workers are joined.
    /// Must not be called from inside a job.
    pub fn shutdown(&self) {
        let _exclusive = self
            .shutdown_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return; // Already shut down
        }

        tracing::info!(pool = %self.name, pending = self.pending_count(), "shutting down worker pool");

        // Closing the queue lets the dispatcher exit once it is drained.
        drop(self.queue_sender().take());

        let dispatcher = self
            .dispatcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = dispatcher {
            if handle.join().is_err() {
                tracing::error!(pool = %self.name, "dispatcher thread panicked");
            }
        }

        stop_and_join(&self.workers);

        tracing::info!(pool = %self.name, "worker pool shut down");
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Unique id of this pool instance.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of workers the pool was built with.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Submitted but unfinished jobs.
    pub fn pending_count(&self) -> usize {
        self.shared.pending.get()
    }

    /// State of every worker, indexed by worker id.
    pub fn worker_states(&self) -> Vec<WorkerState> {
        self.workers.iter().map(WorkerHandle::state).collect()
    }

    pub fn idle_workers(&self) -> usize {
        self.workers
            .iter()
            .filter(|w| w.state() == WorkerState::Idle)
            .count()
    }

    pub fn stats(&self) -> PoolStats {
        let metrics = &self.shared.metrics;
        let states = self.worker_states();
        PoolStats {
            submitted: metrics.jobs_submitted_total.get() as u64,
            succeeded: metrics.completed(STATUS_SUCCESS),
            failed: metrics.completed(STATUS_ERROR),
            panicked: metrics.completed(STATUS_PANIC),
            abandoned: metrics.completed(STATUS_ABANDONED),
            pending: self.pending_count(),
            busy_workers: states
                .iter()
                .filter(|s| **s == WorkerState::Executing)
                .count(),
            live_workers: states
                .iter()
                .filter(|s| **s != WorkerState::Stopped)
                .count(),
        }
    }

    pub fn metrics(&self) -> &PoolMetrics {
        &self.shared.metrics
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("worker_count", &self.worker_count)
            .field("queue_capacity", &self.queue_capacity)
            .field("pending", &self.pending_count())
            .finish()
    }
}

fn stop_and_join(workers: &[WorkerHandle]) {
    for worker in workers {
        worker.stop();
    }
    for worker in workers {
        worker.join();
        tracing::trace!(worker = worker.id(), "worker joined");
    }
}
