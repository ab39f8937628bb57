//! Process-wide pool accessor.
//!
//! Prefer building a [`Pool`] at the top of the application and passing it
//! down. This accessor exists for callers that cannot be handed one.

use std::sync::{Mutex, OnceLock, PoisonError};

use super::{Pool, PoolResult};

static POOL: OnceLock<Pool> = OnceLock::new();

/// Serialises first construction so only one pool's threads are ever started.
static INIT: Mutex<()> = Mutex::new(());

/// Get the process-wide pool, creating it with `max_workers` on first use.
///
/// Later calls return the same pool and ignore their argument. Construction
/// runs at most once even under concurrent first calls. A failed construction
/// (zero workers) leaves the accessor uninitialised.
pub fn global(max_workers: usize) -> PoolResult<&'static Pool> {
    if let Some(pool) = POOL.get() {
        return Ok(pool);
    }

    let _guard = INIT.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(pool) = POOL.get() {
        return Ok(pool);
    }

    let pool = Pool::new(max_workers)?;
    Ok(POOL.get_or_init(|| pool))
}
