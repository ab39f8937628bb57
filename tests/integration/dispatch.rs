//! Dispatch tests: exactly-once execution, FIFO dequeue, backpressure.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::helpers::*;
use workpool::{Job, Pool};

/// Five workers, twenty jobs: all run exactly once and the counter drains.
#[test]
fn test_five_workers_twenty_jobs() {
    init_tracing();
    let pool = Pool::new(5).unwrap();
    let log = RunLog::default();

    log.submit_all(&pool, 1..=20);
    pool.wait();

    assert_eq!(pool.pending_count(), 0);
    log.assert_exactly_once(1..=20);
}

/// Submitting nothing and waiting returns immediately.
#[test]
fn test_wait_with_no_jobs() {
    let pool = Pool::new(3).unwrap();
    assert!(pool.wait_timeout(Duration::from_millis(1)));
    pool.wait();
}

/// Exactly-once holds for any worker count.
#[test]
fn test_exactly_once_across_worker_counts() {
    init_tracing();
    for workers in 1..=6 {
        let pool = Pool::new(workers).unwrap();
        let log = RunLog::default();

        log.submit_all(&pool, 1..=64);
        pool.wait();

        log.assert_exactly_once(1..=64);
    }
}

/// The dispatcher takes jobs off the queue in submit order.
#[test]
fn test_dequeue_order_is_fifo() {
    init_tracing();
    let pool = Pool::with_capacity(4, 8, "fifo").unwrap();

    let handles: Vec<_> = (1..=100u64)
        .map(|id| {
            pool.submit_fn(id, move || {
                // Uneven durations so completion order differs from queue order.
                thread::sleep(Duration::from_micros((id % 7) * 50));
                Ok(())
            })
            .unwrap()
        })
        .collect();

    for handle in handles {
        let id = handle.id();
        let report = handle.wait().unwrap();
        assert_eq!(report.id, id);
        assert_eq!(report.sequence, id.0 - 1);
    }
}

/// With one worker, execution order equals submit order.
#[test]
fn test_single_worker_runs_in_submit_order() {
    let pool = Pool::new(1).unwrap();
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));

    for id in 1..=25u64 {
        let order = Arc::clone(&order);
        pool.submit_fn(id, move || {
            order.lock().unwrap().push(id);
            Ok(())
        })
        .unwrap();
    }
    pool.wait();

    assert_eq!(*order.lock().unwrap(), (1..=25).collect::<Vec<_>>());
}

/// A tiny queue and slow jobs make submit block, but everything finishes.
#[test]
fn test_backpressure_does_not_deadlock() {
    init_tracing();
    let pool = Pool::with_capacity(2, 1, "tiny").unwrap();
    let log = RunLog::default();

    for id in 1..=40u64 {
        let log = log.clone();
        pool.submit(Job::new(id, move || {
            thread::sleep(Duration::from_millis(1));
            log.record(id);
            Ok(())
        }))
        .unwrap();
    }

    assert!(pool.wait_timeout(Duration::from_secs(30)));
    log.assert_exactly_once(1..=40);
}

/// Many threads submitting at once: nothing lost, nothing duplicated.
#[test]
fn test_concurrent_submitters() {
    init_tracing();
    let pool = Arc::new(Pool::with_capacity(4, 4, "concurrent").unwrap());
    let log = RunLog::default();

    let submitters: Vec<_> = (0..8u64)
        .map(|t| {
            let pool = Arc::clone(&pool);
            let log = log.clone();
            thread::spawn(move || {
                log.submit_all(&pool, (t * 100 + 1)..=(t * 100 + 25));
            })
        })
        .collect();
    for submitter in submitters {
        submitter.join().unwrap();
    }

    pool.wait();
    log.assert_exactly_once((0..8u64).flat_map(|t| (t * 100 + 1)..=(t * 100 + 25)));
}

/// Jobs submitted while another thread waits are waited for as well.
#[test]
fn test_wait_covers_jobs_submitted_during_wait() {
    let pool = Arc::new(Pool::with_capacity(2, 64, "racing").unwrap());
    let log = RunLog::default();

    let (go_tx, go_rx) = std::sync::mpsc::channel::<()>();
    pool.submit_fn(0, move || {
        let _ = go_rx.recv_timeout(Duration::from_secs(5));
        Ok(())
    })
    .unwrap();

    let waiter = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || pool.wait())
    };

    log.submit_all(&pool, 1..=10);
    go_tx.send(()).unwrap();
    waiter.join().unwrap();

    // The waiter may return before or after the late jobs; a final wait settles it.
    pool.wait();
    log.assert_exactly_once(1..=10);
}
