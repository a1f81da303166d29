//! Environment-driven configuration and dependency wiring.

pub mod dependencies;

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use catalog_repository::GatewayConfig;
use tracing::warn;

pub use dependencies::{ConnectionMode, Dependencies};

/// Default OpenSearch URL.
pub const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default connection retry interval in seconds.
pub const DEFAULT_RETRY_INTERVAL_SECS: u64 = 15;

pub const DEFAULT_MAX_BATCH_SIZE: usize = 1000;

pub const DEFAULT_STORE_RETRY_BASE_MS: u64 = 100;

/// Locks older than this are reported by the sweeper.
pub const DEFAULT_LOCK_SWEEP_AGE_SECS: u64 = 3600;

/// Settings read from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub opensearch_url: String,
    pub index_prefix: String,
    pub connection_mode: ConnectionMode,
    pub retry_interval: Duration,
    /// PostgreSQL URL of the dedup queue; the in-memory queue is used without one.
    pub dedup_queue_url: Option<String>,
    pub max_batch_size: usize,
    pub store_retry_base: Duration,
    pub export_dir: PathBuf,
    pub lock_sweep_age: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            opensearch_url: DEFAULT_OPENSEARCH_URL.to_string(),
            index_prefix: String::new(),
            connection_mode: ConnectionMode::Retry,
            retry_interval: Duration::from_secs(DEFAULT_RETRY_INTERVAL_SECS),
            dedup_queue_url: None,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            store_retry_base: Duration::from_millis(DEFAULT_STORE_RETRY_BASE_MS),
            export_dir: PathBuf::from("."),
            lock_sweep_age: Duration::from_secs(DEFAULT_LOCK_SWEEP_AGE_SECS),
        }
    }
}

fn parsed<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(variable = name, value = %raw, "Unparseable value, using default");
            default
        }),
        Err(_) => default,
    }
}

impl Settings {
    /// Read settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `INDEX_PREFIX`: Prefix for the per-core indices (default: none)
    /// - `OPENSEARCH_CONNECTION_MODE`: "fail-fast" or "retry" (default: retry)
    /// - `OPENSEARCH_RETRY_INTERVAL_SECS`: Retry interval in seconds (default: 15)
    /// - `DEDUP_QUEUE_URL`: PostgreSQL URL of the dedup queue (default: in-memory)
    /// - `MAX_BATCH_SIZE`: Documents per write (default: 1000)
    /// - `STORE_RETRY_BASE_MS`: First retry delay of index operations (default: 100)
    /// - `EXPORT_DIR`: Directory for snapshots and backups (default: .)
    /// - `LOCK_SWEEP_AGE_SECS`: Age of a stale lock (default: 3600)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            opensearch_url: env::var("OPENSEARCH_URL").unwrap_or(defaults.opensearch_url),
            index_prefix: env::var("INDEX_PREFIX").unwrap_or_default(),
            connection_mode: ConnectionMode::from_env(),
            retry_interval: Duration::from_secs(parsed(
                "OPENSEARCH_RETRY_INTERVAL_SECS",
                DEFAULT_RETRY_INTERVAL_SECS,
            )),
            dedup_queue_url: env::var("DEDUP_QUEUE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            max_batch_size: parsed("MAX_BATCH_SIZE", DEFAULT_MAX_BATCH_SIZE),
            store_retry_base: Duration::from_millis(parsed(
                "STORE_RETRY_BASE_MS",
                DEFAULT_STORE_RETRY_BASE_MS,
            )),
            export_dir: env::var("EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.export_dir),
            lock_sweep_age: Duration::from_secs(parsed(
                "LOCK_SWEEP_AGE_SECS",
                DEFAULT_LOCK_SWEEP_AGE_SECS,
            )),
        }
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        let defaults = GatewayConfig::default();
        GatewayConfig::with_max_batch_size(self.max_batch_size)
            .with_retry(self.store_retry_base, defaults.retry_attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_config_from_settings() {
        let settings = Settings {
            max_batch_size: 50,
            store_retry_base: Duration::from_millis(10),
            ..Settings::default()
        };
        let config = settings.gateway_config();
        assert_eq!(config.max_batch_size, Some(50));
        assert_eq!(config.retry_base_delay, Duration::from_millis(10));
        assert_eq!(config.retry_attempts, GatewayConfig::default().retry_attempts);
    }

    #[test]
    fn test_unparseable_value_falls_back() {
        assert_eq!(parsed("CATALOG_ENGINE_TEST_UNSET_VARIABLE", 7u64), 7);
    }
}
