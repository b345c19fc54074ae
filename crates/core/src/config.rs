//! Shared configuration.
//!
//! Handles loading of the environment variables every engine crate reads (§6
//! "Environment / configuration inputs the core consumes").

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Configuration shared by every periodic driver and the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Database connection URL.
    pub database_url: String,

    /// Default guild timezone for newly observed guilds.
    pub default_timezone: String,

    /// Default feed-poll interval, in seconds (§4.4 default: 5 minutes).
    pub poll_interval_secs: u64,

    /// Entries older than this are never posted, even if new (§4.4 step 3).
    pub max_post_age_secs: i64,

    /// Consecutive terminal failures after which a feed auto-disables (§4.3).
    pub failure_threshold: u32,

    /// Maximum retry attempts per retry-fabric operation (§4.3).
    pub max_retries: u32,

    /// Base delay for exponential backoff, in seconds (§4.3).
    pub base_retry_delay_secs: f64,

    /// Total timeout for a single outbound HTTP call, in seconds (§5).
    pub http_timeout_secs: u64,

    /// Process-wide connection cap (§4.2).
    pub max_connections: usize,

    /// Per-host connection cap (§4.2).
    pub max_connections_per_host: usize,
}

impl CoreConfig {
    const DEFAULT_TIMEZONE: &'static str = "Europe/Berlin";
    const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;
    const DEFAULT_MAX_POST_AGE_SECS: i64 = 86_400;
    const DEFAULT_FAILURE_THRESHOLD: u32 = 3;
    const DEFAULT_MAX_RETRIES: u32 = 3;
    const DEFAULT_BASE_RETRY_DELAY_SECS: f64 = 2.0;
    const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
    const DEFAULT_MAX_CONNECTIONS: usize = 100;
    const DEFAULT_MAX_CONNECTIONS_PER_HOST: usize = 10;

    /// Load configuration from environment variables, falling back to the stated
    /// defaults for anything not set. Also loads a `.env` file if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            default_timezone: env::var("DEFAULT_TIMEZONE")
                .unwrap_or_else(|_| Self::DEFAULT_TIMEZONE.to_string()),
            poll_interval_secs: env_parse_or("FEED_POLL_INTERVAL_SECS", Self::DEFAULT_POLL_INTERVAL_SECS)?,
            max_post_age_secs: env_parse_or("MAX_POST_AGE_SECS", Self::DEFAULT_MAX_POST_AGE_SECS)?,
            failure_threshold: env_parse_or("FAILURE_THRESHOLD", Self::DEFAULT_FAILURE_THRESHOLD)?,
            max_retries: env_parse_or("MAX_RETRIES", Self::DEFAULT_MAX_RETRIES)?,
            base_retry_delay_secs: env_parse_or(
                "BASE_RETRY_DELAY_SECS",
                Self::DEFAULT_BASE_RETRY_DELAY_SECS,
            )?,
            http_timeout_secs: env_parse_or("HTTP_TIMEOUT_SECS", Self::DEFAULT_HTTP_TIMEOUT_SECS)?,
            max_connections: env_parse_or("HTTP_MAX_CONNECTIONS", Self::DEFAULT_MAX_CONNECTIONS)?,
            max_connections_per_host: env_parse_or(
                "HTTP_MAX_CONNECTIONS_PER_HOST",
                Self::DEFAULT_MAX_CONNECTIONS_PER_HOST,
            )?,
        })
    }

    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn env_parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("failed to parse {key}: {e}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_parse_or_falls_back_to_default() {
        // SAFETY-free: the variable is never set in the test process.
        let value: u64 = env_parse_or("SYNCD_TEST_UNSET_VAR_XYZ", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn http_timeout_converts_seconds() {
        let cfg = CoreConfig {
            database_url: String::new(),
            default_timezone: CoreConfig::DEFAULT_TIMEZONE.to_string(),
            poll_interval_secs: 300,
            max_post_age_secs: 86_400,
            failure_threshold: 3,
            max_retries: 3,
            base_retry_delay_secs: 2.0,
            http_timeout_secs: 45,
            max_connections: 100,
            max_connections_per_host: 10,
        };
        assert_eq!(cfg.http_timeout(), Duration::from_secs(45));
    }
}
