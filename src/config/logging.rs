//! Logging configuration.

use super::parse::{env_or, Lookup};
use super::ConfigError;

/// Output format of log lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable `tracing_subscriber` text output.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Logging configuration loaded from environment.
#[derive(Clone, Debug)]
pub struct LoggingConfig {
    /// Log level filter (from LOG_LEVEL or RUST_LOG).
    pub filter: String,
    /// Service name for structured logging.
    pub service_name: String,
    /// Output format (from LOG_FORMAT).
    pub format: LogFormat,
}

impl LoggingConfig {
    /// Load configuration from a variable lookup.
    ///
    /// LOG_LEVEL accepts simple values: trace, debug, info, warn, error
    /// RUST_LOG accepts full tracing filter syntax: workpool=debug
    pub fn from_lookup(env: Lookup<'_>) -> Result<Self, ConfigError> {
        let format = match env_or(env, "LOG_FORMAT", "text").to_lowercase().as_str() {
            "text" => LogFormat::Text,
            "json" => LogFormat::Json,
            other => {
                return Err(ConfigError::Invalid {
                    key: "LOG_FORMAT".into(),
                    message: format!("expected text or json, got '{}'", other),
                })
            }
        };

        Ok(Self {
            filter: Self::resolve_log_filter(env),
            service_name: env_or(env, "SERVICE_NAME", "workpool"),
            format,
        })
    }

    /// Resolve log filter.
    ///
    /// Priority: LOG_LEVEL > RUST_LOG > default (info)
    fn resolve_log_filter(env: Lookup<'_>) -> String {
        if let Some(level) = env("LOG_LEVEL") {
            let level = level.to_lowercase();
            match level.as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => {
                    return format!("workpool={}", level);
                }
                _ => {
                    // Invalid level, fall through to RUST_LOG
                    eprintln!(
                        "Warning: Invalid LOG_LEVEL '{}', expected: trace, debug, info, warn, error",
                        level
                    );
                }
            }
        }

        if let Some(filter) = env("RUST_LOG") {
            return filter;
        }

        "workpool=info".to_string()
    }
}
