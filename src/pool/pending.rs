//! Wait-group style counter of submitted but unfinished jobs.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Count of jobs that were submitted and have not finished running.
#[derive(Debug, Default)]
pub struct PendingCounter {
    count: Mutex<usize>,
    drained: Condvar,
}

impl PendingCounter {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        // The guarded value is a plain integer; a panic elsewhere cannot leave it torn.
        self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record one more pending job.
    pub fn add(&self) {
        *self.lock() += 1;
    }

    /// Record that one pending job finished.
    ///
    /// Wakes every waiter when the count reaches zero. Never drops below zero.
    pub fn done(&self) {
        let mut count = self.lock();
        debug_assert!(*count > 0, "pending counter underflow");
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.drained.notify_all();
        }
    }

    pub fn get(&self) -> usize {
        *self.lock()
    }

    /// Block until the count reaches zero.
    pub fn wait(&self) {
        let count = self.lock();
        let _drained = self
            .drained
            .wait_while(count, |count| *count > 0)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Block until the count reaches zero or `timeout` elapses.
    ///
    /// Returns true if the count reached zero.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut count = self.lock();
        while *count > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            count = self
                .drained
                .wait_timeout(count, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }
}
