//! Configuration types for the IndexGateway.

use std::time::Duration;

/// Configuration for the IndexGateway.
///
/// Controls batch limits and the retry policy applied to transient backend failures.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Maximum number of documents allowed in a single `put`.
    ///
    /// Set to `None` to disable the limit (not recommended for production).
    /// Defaults to 1000 if not specified.
    pub max_batch_size: Option<usize>,

    /// First backoff delay; doubled on each further attempt.
    pub retry_base_delay: Duration,

    /// Retries after the first attempt. A transient failure is retried once by default.
    pub retry_attempts: usize,

    /// Page size used by `stream`.
    pub scan_page_size: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_batch_size: Some(1000),
            retry_base_delay: Duration::from_millis(100),
            retry_attempts: 1,
            scan_page_size: 500,
        }
    }
}

impl GatewayConfig {
    /// Create a config with no batch size limit.
    ///
    /// # Warning
    ///
    /// Removing batch size limits can lead to memory issues and timeouts when
    /// writing very large batches.
    pub fn unlimited() -> Self {
        Self {
            max_batch_size: None,
            ..Self::default()
        }
    }

    /// Create a config with a custom batch size limit.
    pub fn with_max_batch_size(max_batch_size: usize) -> Self {
        Self {
            max_batch_size: Some(max_batch_size),
            ..Self::default()
        }
    }

    pub fn with_retry(mut self, base_delay: Duration, attempts: usize) -> Self {
        self.retry_base_delay = base_delay;
        self.retry_attempts = attempts;
        self
    }

    pub fn with_scan_page_size(mut self, size: usize) -> Self {
        self.scan_page_size = size.max(1);
        self
    }
}
