//! Worker threads.
//!
//! A worker loops between two wait points: it publishes its inbox to the
//! availability registry, then blocks until it is handed a job or told to
//! stop. Stop requests are only observed at that idle point, so a job that
//! has started always runs to completion.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use crossbeam::select;
use serde::Serialize;
use tokio::sync::oneshot;

use super::error::{PoolError, PoolResult};
use super::Shared;
use crate::job::{Job, JobReport};
use crate::observability::metrics::{
    STATUS_ABANDONED, STATUS_ERROR, STATUS_PANIC, STATUS_SUCCESS,
};

/// A queued job together with its reply channel.
pub(crate) struct WorkerRequest {
    pub job: Job,
    pub reply: oneshot::Sender<PoolResult<JobReport>>,
    pub queued_at: Instant,
    /// Dequeue position, assigned by the dispatcher.
    pub sequence: u64,
}

impl WorkerRequest {
    pub fn new(job: Job, reply: oneshot::Sender<PoolResult<JobReport>>) -> Self {
        Self {
            job,
            reply,
            queued_at: Instant::now(),
            sequence: 0,
        }
    }

    /// Resolve a job that will never run.
    pub fn abandon(self, shared: &Shared, error: PoolError) {
        shared
            .metrics
            .record_completed(STATUS_ABANDONED, self.queued_at.elapsed(), None);
        let _ = self.reply.send(Err(error));
        shared.pending.done();
    }
}

/// Registry entry: the inbox of a worker that is waiting for a job.
pub(crate) struct IdleWorker {
    pub id: usize,
    pub inbox: Sender<WorkerRequest>,
}

/// Lifecycle state of a worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum WorkerState {
    /// Registered as available, waiting for a job or a stop signal.
    Idle = 0,
    /// Running a job.
    Executing = 1,
    /// Terminated.
    Stopped = 2,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkerState::Idle,
            1 => WorkerState::Executing,
            _ => WorkerState::Stopped,
        }
    }
}

/// Pool-side handle to a worker thread.
pub(crate) struct WorkerHandle {
    id: usize,
    stop_tx: Sender<()>,
    state: Arc<AtomicU8>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl WorkerHandle {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Ask the worker to stop at its next idle point. Repeated calls are no-ops.
    pub fn stop(&self) {
        match self.stop_tx.try_send(()) {
            Ok(()) => tracing::debug!(worker = self.id, "stop requested"),
            // Already requested, or the worker has exited.
            Err(TrySendError::Full(())) | Err(TrySendError::Disconnected(())) => {}
        }
    }

    /// Wait for the worker thread to exit.
    pub fn join(&self) {
        let handle = self
            .thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!(worker = self.id, "worker thread panicked");
            }
        }
    }
}

/// State moved onto the worker thread.
struct Worker {
    id: usize,
    registry: Sender<IdleWorker>,
    inbox_tx: Sender<WorkerRequest>,
    inbox_rx: Receiver<WorkerRequest>,
    stop_rx: Receiver<()>,
    state: Arc<AtomicU8>,
    shared: Arc<Shared>,
}

/// Start worker `id` on a thread named `<pool>-<id>`.
pub(crate) fn spawn(
    id: usize,
    pool_name: &str,
    registry: Sender<IdleWorker>,
    shared: Arc<Shared>,
) -> PoolResult<WorkerHandle> {
    // Zero capacity: a job changes hands only when the worker takes it,
    // so a worker that stops never strands a job in its inbox.
    let (inbox_tx, inbox_rx) = channel::bounded(0);
    let (stop_tx, stop_rx) = channel::bounded(1);
    let state = Arc::new(AtomicU8::new(WorkerState::Idle as u8));

    let worker = Worker {
        id,
        registry,
        inbox_tx,
        inbox_rx,
        stop_rx,
        state: Arc::clone(&state),
        shared,
    };

    let thread = thread::Builder::new()
        .name(format!("{}-{}", pool_name, id))
        .spawn(move || worker.run())
        .map_err(|e| PoolError::Spawn(e.to_string()))?;

    Ok(WorkerHandle {
        id,
        stop_tx,
        state,
        thread: Mutex::new(Some(thread)),
    })
}

impl Worker {
    fn set_state(&self, state: WorkerState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn run(self) {
        tracing::debug!(worker = self.id, "worker started");
        self.shared.metrics.workers_total.inc();

        loop {
            // A stop that arrived while executing is honoured before re-registering.
            if self.stop_rx.try_recv().is_ok() {
                break;
            }

            self.set_state(WorkerState::Idle);
            let idle = IdleWorker {
                id: self.id,
                inbox: self.inbox_tx.clone(),
            };
            if self.registry.send(idle).is_err() {
                tracing::debug!(worker = self.id, "registry closed");
                break;
            }

            select! {
                recv(self.inbox_rx) -> request => match request {
                    Ok(request) => self.execute(request),
                    Err(_) => break,
                },
                // A dropped stop sender means the pool is gone.
                recv(self.stop_rx) -> _ => break,
            }
        }

        self.set_state(WorkerState::Stopped);
        self.shared.metrics.workers_total.dec();
        tracing::debug!(worker = self.id, "worker stopped");
    }

    fn execute(&self, request: WorkerRequest) {
        let WorkerRequest {
            job,
            reply,
            queued_at,
            sequence,
        } = request;
        let job_id = job.id();

        self.set_state(WorkerState::Executing);
        self.shared.metrics.workers_busy.inc();

        let started = Instant::now();
        let queue_wait = started.duration_since(queued_at);
        tracing::trace!(worker = self.id, job = %job_id, sequence, "job started");

        let outcome = panic::catch_unwind(AssertUnwindSafe(job.into_task()));
        let exec_time = started.elapsed();

        let (result, status) = match outcome {
            Ok(Ok(())) => (
                Ok(JobReport {
                    id: job_id,
                    worker: self.id,
                    sequence,
                    queue_wait,
                    exec_time,
                }),
                STATUS_SUCCESS,
            ),
            Ok(Err(message)) => {
                tracing::warn!(worker = self.id, job = %job_id, error = %message, "job failed");
                (Err(PoolError::Execution(message)), STATUS_ERROR)
            }
            Err(payload) => {
                let message = panic_message(&*payload);
                tracing::error!(worker = self.id, job = %job_id, panic = %message, "job panicked");
                (Err(PoolError::WorkerPanic(message)), STATUS_PANIC)
            }
        };

        tracing::trace!(
            worker = self.id,
            job = %job_id,
            exec_us = duration_micros(exec_time),
            "job finished"
        );

        self.shared.metrics.workers_busy.dec();
        self.shared
            .metrics
            .record_completed(status, queue_wait, Some(exec_time));
        // The submitter may have dropped its handle.
        let _ = reply.send(result);
        self.shared.pending.done();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn duration_micros(d: Duration) -> u64 {
    d.as_micros() as u64
}
