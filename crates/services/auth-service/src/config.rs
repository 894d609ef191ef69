//! Auth service configuration.

use common::{optional_or, parse_or, parse_ttl, process_env, required, AppResult};
use domain::{WorkFactor, DEFAULT_ACCESS_TOKEN_EXPIRY, DEFAULT_REFRESH_TOKEN_EXPIRY};

use crate::service::TokenConfig;

/// Auth service configuration.
#[derive(Debug, Clone)]
pub struct AuthServiceConfig {
    /// Signing secrets and lifetimes for both token kinds
    pub tokens: TokenConfig,
    /// Argon2 parameters for newly hashed passwords
    pub work_factor: WorkFactor,
}

impl AuthServiceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(process_env)
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    /// A missing secret, a malformed lifetime or an invalid hashing
    /// parameter is a configuration error.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let access_secret = required(&lookup, "ACCESS_TOKEN_SECRET")?;
        let refresh_secret = required(&lookup, "REFRESH_TOKEN_SECRET")?;
        let access_ttl = parse_ttl(
            "ACCESS_TOKEN_EXPIRY",
            &optional_or(&lookup, "ACCESS_TOKEN_EXPIRY", DEFAULT_ACCESS_TOKEN_EXPIRY),
        )?;
        let refresh_ttl = parse_ttl(
            "REFRESH_TOKEN_EXPIRY",
            &optional_or(&lookup, "REFRESH_TOKEN_EXPIRY", DEFAULT_REFRESH_TOKEN_EXPIRY),
        )?;

        let defaults = WorkFactor::default();
        let work_factor = WorkFactor {
            memory_kib: parse_or(&lookup, "HASH_MEMORY_KIB", defaults.memory_kib)?,
            iterations: parse_or(&lookup, "HASH_ITERATIONS", defaults.iterations)?,
            parallelism: parse_or(&lookup, "HASH_PARALLELISM", defaults.parallelism)?,
        };

        Ok(Self {
            tokens: TokenConfig::new(access_secret, access_ttl, refresh_secret, refresh_ttl)?,
            work_factor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::AppError;
    use std::collections::HashMap;
    use std::time::Duration;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const SECRETS: [(&str, &str); 2] = [
        ("ACCESS_TOKEN_SECRET", "access-secret-0123456789abcdef0123456789"),
        ("REFRESH_TOKEN_SECRET", "refresh-secret-0123456789abcdef0123456789"),
    ];

    #[test]
    fn test_defaults() {
        let config = AuthServiceConfig::from_lookup(lookup(&SECRETS)).unwrap();

        assert_eq!(config.tokens.access().ttl(), Duration::from_secs(15 * 60));
        assert_eq!(config.tokens.refresh().ttl(), Duration::from_secs(10 * 86_400));
        assert_eq!(config.work_factor, WorkFactor::default());
    }

    #[test]
    fn test_overrides() {
        let mut pairs = SECRETS.to_vec();
        pairs.extend([
            ("ACCESS_TOKEN_EXPIRY", "1h"),
            ("REFRESH_TOKEN_EXPIRY", "86400"),
            ("HASH_ITERATIONS", "3"),
        ]);
        let config = AuthServiceConfig::from_lookup(lookup(&pairs)).unwrap();

        assert_eq!(config.tokens.access().ttl(), Duration::from_secs(3600));
        assert_eq!(config.tokens.refresh().ttl(), Duration::from_secs(86_400));
        assert_eq!(config.work_factor.iterations, 3);
    }

    #[test]
    fn test_missing_secret_is_configuration_error() {
        let err = AuthServiceConfig::from_lookup(lookup(&SECRETS[..1])).unwrap_err();
        assert!(matches!(err, AppError::Configuration(ref msg) if msg.contains("REFRESH_TOKEN_SECRET")));
    }

    #[test]
    fn test_malformed_expiry_is_configuration_error() {
        let mut pairs = SECRETS.to_vec();
        pairs.push(("ACCESS_TOKEN_EXPIRY", "whenever"));
        assert!(matches!(
            AuthServiceConfig::from_lookup(lookup(&pairs)),
            Err(AppError::Configuration(_))
        ));
    }

    #[test]
    fn test_debug_output_has_no_secrets() {
        let config = AuthServiceConfig::from_lookup(lookup(&SECRETS)).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("access-secret"));
        assert!(!rendered.contains("refresh-secret"));
    }
}
