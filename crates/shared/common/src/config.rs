//! Shared configuration structures and environment parsing helpers.
//!
//! Service configs are assembled from a key lookup function rather than
//! reading the process environment directly, so tests can feed a map.
//! A missing required key or a malformed value is a configuration error;
//! optional keys fall back to their defaults.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Base service configuration shared by all services.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Service name for logging and tracing
    pub service_name: String,
    /// Log level
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_name: "streamhub".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            service_name: optional_or(&lookup, "SERVICE_NAME", &defaults.service_name),
            log_level: optional_or(&lookup, "LOG_LEVEL", &defaults.log_level),
        }
    }
}

/// Lookup backed by the process environment.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Read a key that must be present and non-blank.
pub fn required<F>(lookup: &F, key: &str) -> AppResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AppError::configuration(format!("{} must be set", key))),
    }
}

/// Read an optional key, treating blank values as absent.
pub fn optional_or<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Parse an optional key with `FromStr`, rejecting malformed values.
pub fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> AppResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key).filter(|value| !value.trim().is_empty()) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::configuration(format!("{} is not valid: {:?}", key, raw))),
    }
}

/// Parse a lifetime such as `15m`, `10d` or a bare number of seconds.
///
/// Zero is rejected.
pub fn parse_ttl(key: &str, raw: &str) -> AppResult<Duration> {
    let raw = raw.trim();
    let ttl = match raw.parse::<u64>() {
        Ok(seconds) => Duration::from_secs(seconds),
        Err(_) => humantime::parse_duration(raw)
            .map_err(|e| AppError::configuration(format!("{} is not a duration: {}", key, e)))?,
    };

    if ttl.is_zero() {
        return Err(AppError::configuration(format!("{} must be positive", key)));
    }
    Ok(ttl)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_required_missing_and_blank() {
        let env = lookup(&[("BLANK", "   ")]);
        assert!(matches!(required(&env, "MISSING"), Err(AppError::Configuration(_))));
        assert!(matches!(required(&env, "BLANK"), Err(AppError::Configuration(_))));
    }

    #[test]
    fn test_optional_default() {
        let env = lookup(&[("SET", "value")]);
        assert_eq!(optional_or(&env, "SET", "fallback"), "value");
        assert_eq!(optional_or(&env, "UNSET", "fallback"), "fallback");
    }

    #[test]
    fn test_parse_or_rejects_garbage() {
        let env = lookup(&[("GOOD", " 42 "), ("BAD", "forty-two")]);
        assert_eq!(parse_or(&env, "GOOD", 0u32).unwrap(), 42);
        assert_eq!(parse_or(&env, "UNSET", 7u32).unwrap(), 7);
        assert!(parse_or(&env, "BAD", 0u32).is_err());
    }

    #[test]
    fn test_parse_ttl_forms() {
        assert_eq!(parse_ttl("T", "15m").unwrap(), Duration::from_secs(900));
        assert_eq!(parse_ttl("T", "10d").unwrap(), Duration::from_secs(864_000));
        assert_eq!(parse_ttl("T", "30").unwrap(), Duration::from_secs(30));
    }

    #[test]
    fn test_parse_ttl_rejects_zero_and_garbage() {
        assert!(parse_ttl("T", "0").is_err());
        assert!(parse_ttl("T", "0s").is_err());
        assert!(parse_ttl("T", "soon").is_err());
        assert!(parse_ttl("T", "-5").is_err());
    }

    #[test]
    fn test_service_config_defaults() {
        let config = ServiceConfig::from_lookup(lookup(&[("LOG_LEVEL", "debug")]));
        assert_eq!(config.service_name, "streamhub");
        assert_eq!(config.log_level, "debug");
    }
}
