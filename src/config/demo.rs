//! Settings for the demo binary.

use std::time::Duration;

use super::parse::{env_bool, env_duration, env_parse, Lookup};
use super::ConfigError;

/// Demo run configuration loaded from environment.
#[derive(Clone, Debug)]
pub struct DemoConfig {
    /// Number of jobs to submit (ids 1..=jobs).
    pub jobs: u64,
    /// Time each demo job sleeps (None = no-op body).
    pub job_delay: Option<Duration>,
    /// Print Prometheus metrics at exit.
    pub metrics_dump: bool,
}

impl DemoConfig {
    pub fn from_lookup(env: Lookup<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            jobs: env_parse(env, "DEMO_JOBS", 20)?,
            job_delay: env_duration(env, "DEMO_JOB_DELAY", "off")?,
            metrics_dump: env_bool(env, "METRICS_DUMP", false),
        })
    }
}
