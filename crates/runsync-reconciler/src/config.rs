// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for runsync-reconciler.

use std::net::SocketAddr;
use std::time::Duration;

/// Default staleness threshold: six hours without a status write.
pub const DEFAULT_STALE_THRESHOLD: Duration = Duration::from_secs(6 * 3600);

/// Reconciler configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Run store URL (`postgres://...` or `sqlite:...`)
    pub database_url: String,
    /// HTTP address for the admin API
    pub http_addr: SocketAddr,
    /// A running run with no status write for longer than this is stale
    pub stale_threshold: Duration,
    /// Upper bound on a single execution status fetch
    pub fetch_timeout: Duration,
    /// Interval between background sweeps
    pub sweep_interval: Duration,
    /// Whether the background sweep runs at all
    pub sweep_enabled: bool,
    /// Maximum runs reconciled concurrently within one sweep
    pub sweep_concurrency: usize,
    /// Page size when listing running runs
    pub sweep_batch_size: i64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("RUNSYNC_DATABASE_URL")
            .or_else(|| lookup("DATABASE_URL"))
            .ok_or(ConfigError::MissingEnvVar(
                "RUNSYNC_DATABASE_URL or DATABASE_URL",
            ))?;

        let port: u16 = parse_or(&lookup, "RUNSYNC_HTTP_PORT", 8080)?;
        let http_addr = SocketAddr::from(([0, 0, 0, 0], port));

        let stale_threshold_secs: u64 = parse_or(
            &lookup,
            "RUNSYNC_STALE_THRESHOLD_SECS",
            DEFAULT_STALE_THRESHOLD.as_secs(),
        )?;
        let fetch_timeout_ms: u64 = parse_or(&lookup, "RUNSYNC_FETCH_TIMEOUT_MS", 15_000)?;
        let sweep_interval_secs: u64 = parse_or(&lookup, "RUNSYNC_SWEEP_INTERVAL_SECS", 300)?;
        let sweep_concurrency: usize = parse_or(&lookup, "RUNSYNC_SWEEP_CONCURRENCY", 4)?;
        let sweep_batch_size: i64 = parse_or(&lookup, "RUNSYNC_SWEEP_BATCH_SIZE", 500)?;

        let sweep_enabled = lookup("RUNSYNC_SWEEP_ENABLED")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(true);

        if stale_threshold_secs == 0 {
            return Err(ConfigError::InvalidValue("RUNSYNC_STALE_THRESHOLD_SECS"));
        }
        if fetch_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue("RUNSYNC_FETCH_TIMEOUT_MS"));
        }
        if sweep_concurrency == 0 {
            return Err(ConfigError::InvalidValue("RUNSYNC_SWEEP_CONCURRENCY"));
        }
        if sweep_batch_size <= 0 {
            return Err(ConfigError::InvalidValue("RUNSYNC_SWEEP_BATCH_SIZE"));
        }

        Ok(Self {
            database_url,
            http_addr,
            stale_threshold: Duration::from_secs(stale_threshold_secs),
            fetch_timeout: Duration::from_millis(fetch_timeout_ms),
            sweep_interval: Duration::from_secs(sweep_interval_secs),
            sweep_enabled,
            sweep_concurrency,
            sweep_batch_size,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue(key)),
        None => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),
    /// An environment variable could not be parsed or is out of range.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(lookup(&[("RUNSYNC_DATABASE_URL", "sqlite::memory:")]))
            .unwrap();
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.http_addr.port(), 8080);
        assert_eq!(config.stale_threshold, Duration::from_secs(21_600));
        assert_eq!(config.fetch_timeout, Duration::from_secs(15));
        assert_eq!(config.sweep_interval, Duration::from_secs(300));
        assert!(config.sweep_enabled);
        assert_eq!(config.sweep_concurrency, 4);
        assert_eq!(config.sweep_batch_size, 500);
    }

    #[test]
    fn test_database_url_fallback() {
        let config =
            Config::from_vars(lookup(&[("DATABASE_URL", "postgres://localhost/runs")])).unwrap();
        assert_eq!(config.database_url, "postgres://localhost/runs");
    }

    #[test]
    fn test_missing_database_url() {
        let err = Config::from_vars(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_vars(lookup(&[
            ("RUNSYNC_DATABASE_URL", "sqlite::memory:"),
            ("RUNSYNC_HTTP_PORT", "9100"),
            ("RUNSYNC_STALE_THRESHOLD_SECS", "3600"),
            ("RUNSYNC_FETCH_TIMEOUT_MS", "20000"),
            ("RUNSYNC_SWEEP_INTERVAL_SECS", "60"),
            ("RUNSYNC_SWEEP_ENABLED", "false"),
            ("RUNSYNC_SWEEP_CONCURRENCY", "8"),
            ("RUNSYNC_SWEEP_BATCH_SIZE", "50"),
        ]))
        .unwrap();

        assert_eq!(config.http_addr.port(), 9100);
        assert_eq!(config.stale_threshold, Duration::from_secs(3600));
        assert_eq!(config.fetch_timeout, Duration::from_secs(20));
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
        assert!(!config.sweep_enabled);
        assert_eq!(config.sweep_concurrency, 8);
        assert_eq!(config.sweep_batch_size, 50);
    }

    #[test]
    fn test_invalid_values() {
        let err = Config::from_vars(lookup(&[
            ("RUNSYNC_DATABASE_URL", "sqlite::memory:"),
            ("RUNSYNC_HTTP_PORT", "not-a-port"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue("RUNSYNC_HTTP_PORT")));

        let err = Config::from_vars(lookup(&[
            ("RUNSYNC_DATABASE_URL", "sqlite::memory:"),
            ("RUNSYNC_SWEEP_CONCURRENCY", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue("RUNSYNC_SWEEP_CONCURRENCY")
        ));
    }

    #[test]
    fn test_zero_fetch_timeout_is_rejected() {
        let err = Config::from_vars(lookup(&[
            ("RUNSYNC_DATABASE_URL", "sqlite::memory:"),
            ("RUNSYNC_FETCH_TIMEOUT_MS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue("RUNSYNC_FETCH_TIMEOUT_MS")
        ));
    }
}
