//! Environment variable helpers
//!
//! Typed parsing with defaults, used by the logging setup and the
//! `ServerConfig` `EV_*` overrides.

use std::str::FromStr;

/// Get environment variable parsed as type T, or return default.
///
/// ```ignore
/// let workers: usize = env_get("EV_WORKERS", 4);
/// let depth: usize = env_get("EV_QUEUE_DEPTH", 1024);
/// ```
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Get environment variable as boolean.
///
/// Accepts "1", "true", "yes", "on" (case-insensitive) as true; any
/// other set value is false; unset returns the default.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => matches!(val.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}
