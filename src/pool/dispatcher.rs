//! Dispatcher loop: matches queued jobs to idle workers.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{Receiver, SendError};

use super::error::{PoolError, PoolResult};
use super::worker::{IdleWorker, WorkerRequest};
use super::Shared;

/// Start the dispatcher on a thread named `<pool>-dispatch`.
///
/// The thread exits once every queue sender is dropped and the queue is drained.
pub(crate) fn spawn(
    pool_name: &str,
    queue: Receiver<WorkerRequest>,
    registry: Receiver<IdleWorker>,
    shared: Arc<Shared>,
) -> PoolResult<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("{}-dispatch", pool_name))
        .spawn(move || run(queue, registry, shared))
        .map_err(|e| PoolError::Spawn(e.to_string()))
}

fn run(queue: Receiver<WorkerRequest>, registry: Receiver<IdleWorker>, shared: Arc<Shared>) {
    tracing::debug!("dispatcher started");

    // Queue order is submit order; the sequence number makes it observable.
    for (sequence, mut request) in (0u64..).zip(queue.iter()) {
        request.sequence = sequence;
        if let Err(request) = deliver(request, &registry) {
            tracing::warn!(job = %request.job.id(), "no workers left, abandoning job");
            request.abandon(&shared, PoolError::NoWorkers);
        }
    }

    tracing::debug!("dispatcher stopped");
}

/// Hand `request` to the next idle worker.
///
/// Entries left behind by workers that stopped after registering are skipped.
/// Gives the request back when no worker can ever take it.
fn deliver(
    mut request: WorkerRequest,
    registry: &Receiver<IdleWorker>,
) -> Result<(), WorkerRequest> {
    loop {
        let Ok(idle) = registry.recv() else {
            return Err(request);
        };

        match idle.inbox.send(request) {
            Ok(()) => {
                tracing::trace!(worker = idle.id, "job dispatched");
                return Ok(());
            }
            Err(SendError(returned)) => {
                tracing::trace!(worker = idle.id, "skipping stopped worker");
                request = returned;
            }
        }
    }
}
