//! Test helpers and utilities

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use workpool::{JobHandle, Pool};

/// Route pool logs to the test harness output (once per process).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "workpool=warn".into()),
        )
        .with_test_writer()
        .try_init();
}

/// Poll `condition` until it holds or `timeout` elapses.
pub fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}

/// Per-id execution counter shared with jobs.
#[derive(Clone, Default)]
pub struct RunLog(Arc<Mutex<HashMap<u64, usize>>>);

#[allow(dead_code)]
impl RunLog {
    pub fn record(&self, id: u64) {
        *self.0.lock().unwrap().entry(id).or_insert(0) += 1;
    }

    /// Ids that ran, each with its run count.
    pub fn counts(&self) -> HashMap<u64, usize> {
        self.0.lock().unwrap().clone()
    }

    /// Submit jobs `ids` that record themselves here.
    pub fn submit_all(
        &self,
        pool: &Pool,
        ids: impl IntoIterator<Item = u64>,
    ) -> Vec<JobHandle> {
        ids.into_iter()
            .map(|id| {
                let log = self.clone();
                pool.submit_fn(id, move || {
                    log.record(id);
                    Ok(())
                })
                .expect("submit failed")
            })
            .collect()
    }

    /// Assert every id in `ids` ran exactly once and nothing else ran.
    pub fn assert_exactly_once(&self, ids: impl IntoIterator<Item = u64>) {
        let counts = self.counts();
        let expected: Vec<u64> = ids.into_iter().collect();
        assert_eq!(counts.len(), expected.len(), "unexpected set of jobs ran");
        for id in expected {
            assert_eq!(counts.get(&id), Some(&1), "job {} did not run exactly once", id);
        }
    }
}
