//! Environment variable parsing utilities.
//!
//! Every helper takes a lookup function instead of reading the process
//! environment directly, so loaders can be exercised without mutating it.

use std::str::FromStr;
use std::time::Duration;

use super::ConfigError;

/// Variable lookup: returns the raw value of `key`, if set.
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Lookup backed by the process environment.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get variable with default value.
pub fn env_or(env: Lookup<'_>, key: &str, default: &str) -> String {
    env(key).unwrap_or_else(|| default.to_string())
}

/// Get optional variable (None if empty or missing).
pub fn env_opt(env: Lookup<'_>, key: &str) -> Option<String> {
    env(key).filter(|s| !s.is_empty())
}

/// Parse variable as boolean.
/// Treats "1", "true" (case-insensitive) as true.
pub fn env_bool(env: Lookup<'_>, key: &str, default: bool) -> bool {
    env(key)
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(default)
}

/// Parse variable with type conversion. Empty or missing yields `default`.
pub fn env_parse<T: FromStr>(env: Lookup<'_>, key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env(key) {
        Some(v) if !v.is_empty() => v.trim().parse().map_err(|e: T::Err| ConfigError::Parse {
            key: key.into(),
            value: v,
            error: e.to_string(),
        }),
        _ => Ok(default),
    }
}

/// Parse duration string (e.g., "250ms", "30s", "2m", "1h").
/// Plain numbers are seconds. Returns None for "off" or "0".
pub fn parse_duration(s: &str) -> Result<Option<Duration>, String> {
    let s = s.trim().to_lowercase();

    if s == "off" || s == "0" || s.is_empty() {
        return Ok(None);
    }

    let (num_str, unit) = if let Some(num) = s.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = s.strip_suffix('s') {
        (num, "s")
    } else if let Some(num) = s.strip_suffix('m') {
        (num, "m")
    } else if let Some(num) = s.strip_suffix('h') {
        (num, "h")
    } else {
        // Try parsing as seconds
        return s
            .parse::<u64>()
            .map(|secs| Some(Duration::from_secs(secs)).filter(|d| !d.is_zero()))
            .map_err(|_| format!("invalid duration: {}", s));
    };

    let num: u64 = num_str
        .parse()
        .map_err(|_| format!("invalid number: {}", num_str))?;

    let duration = match unit {
        "ms" => Duration::from_millis(num),
        "s" => Duration::from_secs(num),
        "m" => Duration::from_secs(num.checked_mul(60).ok_or("duration too large")?),
        "h" => Duration::from_secs(num.checked_mul(3600).ok_or("duration too large")?),
        _ => return Err(format!("invalid unit: {}", unit)),
    };

    Ok(Some(duration).filter(|d| !d.is_zero()))
}

/// Parse variable as duration.
pub fn env_duration(
    env: Lookup<'_>,
    key: &str,
    default: &str,
) -> Result<Option<Duration>, ConfigError> {
    let value = env_or(env, key, default);
    parse_duration(&value).map_err(|e| ConfigError::Parse {
        key: key.into(),
        value,
        error: e,
    })
}

#[cfg(test)]
pub(crate) fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: std::collections::HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| map.get(key).cloned()
}
