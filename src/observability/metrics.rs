//! Prometheus metrics for a worker pool.
//!
//! Each [`Pool`](crate::Pool) owns its own registry, labelled with the pool
//! name, so several pools can live in one process without clashing.

use prometheus::{
    Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Completion status label values.
pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_ERROR: &str = "error";
pub const STATUS_PANIC: &str = "panic";
pub const STATUS_ABANDONED: &str = "abandoned";

/// Prometheus registry with all pool metrics.
pub struct PoolMetrics {
    registry: Registry,

    /// Jobs accepted by `submit`
    pub jobs_submitted_total: Counter,

    /// Jobs finished, by status
    pub jobs_completed_total: CounterVec,

    /// Job execution time in seconds
    pub job_duration_seconds: Histogram,

    /// Time from submit to start of execution in seconds
    pub job_queue_wait_seconds: Histogram,

    /// Submitted but unfinished jobs
    pub jobs_pending: Gauge,

    /// Workers currently running a job
    pub workers_busy: Gauge,

    /// Workers that have not stopped
    pub workers_total: Gauge,
}

impl PoolMetrics {
    /// Create a registry for the pool called `pool`.
    pub fn new(pool: &str) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Job timing buckets (in seconds)
        let job_buckets = vec![
            0.00001, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0,
        ];

        let jobs_submitted_total = Counter::with_opts(
            Opts::new("workpool_jobs_submitted_total", "Total jobs submitted")
                .const_label("pool", pool),
        )?;
        registry.register(Box::new(jobs_submitted_total.clone()))?;

        let jobs_completed_total = CounterVec::new(
            Opts::new("workpool_jobs_completed_total", "Total jobs finished")
                .const_label("pool", pool),
            &["status"],
        )?;
        registry.register(Box::new(jobs_completed_total.clone()))?;

        let job_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "workpool_job_duration_seconds",
                "Job execution duration in seconds",
            )
            .const_label("pool", pool)
            .buckets(job_buckets.clone()),
        )?;
        registry.register(Box::new(job_duration_seconds.clone()))?;

        let job_queue_wait_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "workpool_job_queue_wait_seconds",
                "Time between submit and execution start in seconds",
            )
            .const_label("pool", pool)
            .buckets(job_buckets),
        )?;
        registry.register(Box::new(job_queue_wait_seconds.clone()))?;

        let jobs_pending = Gauge::with_opts(
            Opts::new("workpool_jobs_pending", "Submitted but unfinished jobs")
                .const_label("pool", pool),
        )?;
        registry.register(Box::new(jobs_pending.clone()))?;

        let workers_busy = Gauge::with_opts(
            Opts::new("workpool_workers_busy", "Number of busy workers").const_label("pool", pool),
        )?;
        registry.register(Box::new(workers_busy.clone()))?;

        let workers_total = Gauge::with_opts(
            Opts::new("workpool_workers_total", "Number of running workers")
                .const_label("pool", pool),
        )?;
        registry.register(Box::new(workers_total.clone()))?;

        Ok(Self {
            registry,
            jobs_submitted_total,
            jobs_completed_total,
            job_duration_seconds,
            job_queue_wait_seconds,
            jobs_pending,
            workers_busy,
            workers_total,
        })
    }

    pub fn record_submitted(&self) {
        self.jobs_submitted_total.inc();
        self.jobs_pending.inc();
    }

    /// Record a finished job. `exec_time` is `None` for jobs that never ran.
    pub fn record_completed(&self, status: &str, queue_wait: Duration, exec_time: Option<Duration>) {
        self.jobs_completed_total.with_label_values(&[status]).inc();
        self.jobs_pending.dec();
        if let Some(exec_time) = exec_time {
            self.job_queue_wait_seconds.observe(queue_wait.as_secs_f64());
            self.job_duration_seconds.observe(exec_time.as_secs_f64());
        }
    }

    /// Undo `record_submitted` for a job the queue refused.
    pub fn record_rejected(&self) {
        self.jobs_pending.dec();
    }

    pub fn completed(&self, status: &str) -> u64 {
        self.jobs_completed_total.with_label_values(&[status]).get() as u64
    }

    /// Export metrics in Prometheus text format.
    pub fn export(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::warn!(error = %e, "failed to encode metrics");
            return String::new();
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }

    /// Get the Prometheus registry (for custom metrics).
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
