//! Lifecycle tests: stopping workers, shutdown, drop, timed waits.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use crate::helpers::*;
use workpool::{Pool, PoolError, WorkerState};

/// A stopped worker takes no further jobs; the others drain the queue.
#[test]
fn test_stopped_worker_gets_no_jobs() {
    init_tracing();
    let pool = Pool::with_capacity(3, 8, "stop-one").unwrap();

    pool.stop_worker(0).unwrap();
    assert!(wait_for(Duration::from_secs(5), || {
        pool.worker_states()[0] == WorkerState::Stopped
    }));

    let handles: Vec<_> = (1..=30u64)
        .map(|id| pool.submit_fn(id, || Ok(())).unwrap())
        .collect();
    for handle in handles {
        let report = handle.wait().unwrap();
        assert_ne!(report.worker, 0, "job {} ran on a stopped worker", report.id);
    }

    pool.wait();
    let stats = pool.stats();
    assert_eq!(stats.succeeded, 30);
    assert_eq!(stats.live_workers, 2);
}

/// Stopping the same worker twice is harmless.
#[test]
fn test_stop_worker_twice() {
    let pool = Pool::new(2).unwrap();
    pool.stop_worker(1).unwrap();
    pool.stop_worker(1).unwrap();

    pool.submit_fn(1, || Ok(())).unwrap().wait().unwrap();
    assert!(matches!(
        pool.stop_worker(7),
        Err(PoolError::UnknownWorker { id: 7, workers: 2 })
    ));
}

/// A stop requested mid-job takes effect after the job; later jobs fail with
/// NoWorkers instead of hanging `wait`.
#[test]
fn test_stop_during_execution_is_deferred() {
    init_tracing();
    let pool = Pool::new(1).unwrap();
    let (release_tx, release_rx) = mpsc::channel::<()>();

    let first = pool
        .submit_fn(1, move || {
            release_rx
                .recv_timeout(Duration::from_secs(5))
                .map_err(|e| e.to_string())
        })
        .unwrap();

    assert!(wait_for(Duration::from_secs(5), || {
        pool.worker_states()[0] == WorkerState::Executing
    }));
    pool.stop_worker(0).unwrap();
    assert_eq!(pool.worker_states()[0], WorkerState::Executing);

    release_tx.send(()).unwrap();
    assert!(first.wait().is_ok());

    let second = pool.submit_fn(2, || Ok(())).unwrap();
    assert_eq!(second.wait(), Err(PoolError::NoWorkers));

    pool.wait();
    assert_eq!(pool.pending_count(), 0);
    assert_eq!(pool.stats().abandoned, 1);
}

/// Stopping every worker resolves queued jobs instead of deadlocking.
#[test]
fn test_all_workers_stopped() {
    let pool = Pool::with_capacity(2, 8, "all-stopped").unwrap();
    pool.stop_worker(0).unwrap();
    pool.stop_worker(1).unwrap();
    assert!(wait_for(Duration::from_secs(5), || pool.stats().live_workers == 0));

    let handles: Vec<_> = (1..=5u64)
        .map(|id| pool.submit_fn(id, || Ok(())).unwrap())
        .collect();

    assert!(pool.wait_timeout(Duration::from_secs(5)));
    for handle in handles {
        assert_eq!(handle.wait(), Err(PoolError::NoWorkers));
    }
}

/// `wait_timeout` reports false while a job is still running.
#[test]
fn test_wait_timeout_expires() {
    let pool = Pool::new(1).unwrap();
    let (release_tx, release_rx) = mpsc::channel::<()>();

    pool.submit_fn(1, move || {
        let _ = release_rx.recv_timeout(Duration::from_secs(5));
        Ok(())
    })
    .unwrap();

    assert!(!pool.wait_timeout(Duration::from_millis(30)));
    assert_eq!(pool.pending_count(), 1);

    release_tx.send(()).unwrap();
    assert!(pool.wait_timeout(Duration::from_secs(5)));
}

/// Dropping the pool runs everything already queued.
#[test]
fn test_drop_drains_queue() {
    init_tracing();
    let ran = Arc::new(AtomicUsize::new(0));
    {
        let pool = Pool::with_capacity(2, 32, "dropped").unwrap();
        for id in 0..32u64 {
            let ran = Arc::clone(&ran);
            pool.submit_fn(id, move || {
                ran.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();
        }
    }
    assert_eq!(ran.load(Ordering::SeqCst), 32);
}

/// After shutdown every worker is stopped and submit is refused.
#[test]
fn test_shutdown_stops_workers() {
    let pool = Pool::new(3).unwrap();
    pool.submit_fn(1, || Ok(())).unwrap();
    pool.shutdown();

    assert_eq!(pool.pending_count(), 0);
    assert_eq!(pool.stats().live_workers, 0);
    assert_eq!(pool.submit_fn(2, || Ok(())).unwrap_err(), PoolError::Shutdown);
}

/// A second `shutdown` racing the first waits for the workers to be joined.
#[test]
fn test_concurrent_shutdown_waits_for_workers() {
    init_tracing();
    let pool = Arc::new(Pool::new(1).unwrap());
    let (release_tx, release_rx) = mpsc::channel::<()>();

    pool.submit_fn(1, move || {
        let _ = release_rx.recv_timeout(Duration::from_secs(5));
        Ok(())
    })
    .unwrap();
    assert!(wait_for(Duration::from_secs(5), || {
        pool.worker_states()[0] == WorkerState::Executing
    }));

    let first = {
        let pool = Arc::clone(&pool);
        std::thread::spawn(move || pool.shutdown())
    };
    assert!(wait_for(Duration::from_secs(5), || pool.is_shutdown()));

    let releaser = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        let _ = release_tx.send(());
    });

    pool.shutdown();
    assert_eq!(pool.worker_states(), vec![WorkerState::Stopped]);
    assert_eq!(pool.pending_count(), 0);

    first.join().unwrap();
    releaser.join().unwrap();
}

/// Two pools in one process keep separate counters and metrics.
#[test]
fn test_pools_are_independent() {
    let a = Pool::with_capacity(1, 4, "pool-a").unwrap();
    let b = Pool::with_capacity(1, 4, "pool-b").unwrap();
    assert_ne!(a.id(), b.id());

    a.submit_fn(1, || Ok(())).unwrap();
    a.submit_fn(2, || Ok(())).unwrap();
    b.submit_fn(1, || Ok(())).unwrap();
    a.wait();
    b.wait();

    assert_eq!(a.stats().submitted, 2);
    assert_eq!(b.stats().submitted, 1);
    assert!(a.metrics().export().contains("pool=\"pool-a\""));
}
