//! Job handle tests: awaiting results from async code.

use std::time::Duration;

use futures_util::future::join_all;
use workpool::{JobId, Pool, PoolError};

/// Handles can be awaited together from a runtime.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_join_all_handles() {
    let pool = Pool::new(4).unwrap();

    let handles: Vec<_> = (1..=16u64)
        .map(|id| pool.submit_fn(id, || Ok(())).unwrap())
        .collect();

    let results = join_all(handles.into_iter().map(|h| h.result())).await;
    let mut ids: Vec<JobId> = results.into_iter().map(|r| r.unwrap().id).collect();
    ids.sort();
    assert_eq!(ids, (1..=16).map(JobId).collect::<Vec<_>>());
}

/// A timed-out wait leaves the job running.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_result_timeout() {
    let pool = Pool::new(1).unwrap();
    let handle = pool
        .submit_fn(1, || {
            std::thread::sleep(Duration::from_millis(200));
            Ok(())
        })
        .unwrap();

    let err = handle
        .result_timeout(Duration::from_millis(10))
        .await
        .unwrap_err();
    assert_eq!(err, PoolError::Timeout(Duration::from_millis(10)));

    let next = pool.submit_fn(2, || Ok(())).unwrap();
    assert!(next.result().await.is_ok());
    assert_eq!(pool.stats().succeeded, 2);
}

/// Errors and panics reach the handle; the pool keeps serving.
#[test]
fn test_failures_reach_handles() {
    let pool = Pool::new(2).unwrap();

    let failed = pool.submit_fn(1, || Err("bad input".into())).unwrap();
    let panicked = pool.submit_fn(2, || panic!("worker blew up")).unwrap();
    let fine = pool.submit_fn(3, || Ok(())).unwrap();

    tokio_test::block_on(async {
        assert_eq!(
            failed.result().await,
            Err(PoolError::Execution("bad input".into()))
        );
        let err = panicked.result().await.unwrap_err();
        assert!(err.is_job_failure());
        assert_eq!(err, PoolError::WorkerPanic("worker blew up".into()));
        assert_eq!(fine.result().await.unwrap().id, JobId(3));
    });
}

/// Dropping a handle does not cancel or lose the job.
#[test]
fn test_dropped_handle_still_runs() {
    let pool = Pool::new(1).unwrap();
    drop(pool.submit_fn(1, || Ok(())).unwrap());
    pool.wait();
    assert_eq!(pool.stats().succeeded, 1);
}
