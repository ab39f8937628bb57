use std::sync::Arc;
use std::time::Instant;

use futures_util::future::join_all;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use workpool::config::DemoConfig;
use workpool::{logging, Config, Job, JobHandle, Pool, PoolResult};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn main() -> Result<(), BoxError> {
    let config = Config::from_env()?;

    logging::init(&config.logging)?;

    info!("Starting workpool {}...", workpool::VERSION);
    config.log_summary();

    // Only used to watch for Ctrl-C and await handles; jobs run on pool threads.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let pool = Arc::new(Pool::from_config(&config.pool)?);
    let started = Instant::now();

    let interrupted = runtime.block_on(async {
        // Submit blocks while the queue is full, so it runs off the runtime thread.
        let submitter = {
            let pool = Arc::clone(&pool);
            let demo = config.demo.clone();
            tokio::task::spawn_blocking(move || submit_jobs(&pool, &demo))
        };

        tokio::select! {
            finished = await_jobs(submitter) => finished.map(|()| false),
            _ = tokio::signal::ctrl_c() => Ok::<_, BoxError>(true),
        }
    })?;

    if interrupted {
        warn!(
            pending = pool.pending_count(),
            "Interrupted, running queued jobs before exit..."
        );
    } else {
        pool.wait();
    }

    pool.shutdown();

    let stats = pool.stats();
    let failed = stats.failed + stats.panicked + stats.abandoned;
    let elapsed_ms = started.elapsed().as_millis() as u64;
    if interrupted {
        info!(
            submitted = stats.submitted,
            succeeded = stats.succeeded,
            failed,
            elapsed_ms,
            "stopped after interrupt"
        );
    } else {
        info!(
            submitted = stats.submitted,
            succeeded = stats.succeeded,
            failed,
            elapsed_ms,
            "all jobs finished"
        );
    }

    if config.demo.metrics_dump {
        print!("{}", pool.metrics().export());
    }

    Ok(())
}

/// Submit jobs `1..=demo.jobs`. Stops early once the pool is shut down.
fn submit_jobs(pool: &Pool, demo: &DemoConfig) -> PoolResult<Vec<JobHandle>> {
    let mut handles = Vec::new();
    for id in 1..=demo.jobs {
        let delay = demo.job_delay;
        let job = Job::new(id, move || {
            if let Some(delay) = delay {
                std::thread::sleep(delay);
            }
            info!(job = id, "job ran");
            Ok(())
        });
        handles.push(pool.submit(job)?);
    }
    Ok(handles)
}

async fn await_jobs(submitter: JoinHandle<PoolResult<Vec<JobHandle>>>) -> Result<(), BoxError> {
    let handles = submitter.await??;
    for result in join_all(handles.into_iter().map(JobHandle::result)).await {
        if let Err(e) = result {
            warn!(error = %e, "job did not complete");
        }
    }
    Ok(())
}
