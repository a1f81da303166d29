//! Dependency initialization and wiring for the catalog engine.

use std::env;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use catalog_repository::opensearch::IndexConfig;
use catalog_repository::{IndexGateway, OpenSearchProvider};

use super::Settings;
use crate::dedup::{CandidateGenerator, CandidateQueue, DedupConfig, DedupJob, QueueSource};
use crate::engine::Engine;
use crate::sweeper::LockSweeper;
use crate::CatalogError;

/// What to do when the index cluster is unreachable at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Give up on the first failed attempt.
    FailFast,
    /// Keep trying every `OPENSEARCH_RETRY_INTERVAL_SECS`.
    Retry,
}

impl ConnectionMode {
    /// Reads `OPENSEARCH_CONNECTION_MODE` (`fail-fast` or `retry`, default `retry`).
    pub(super) fn from_env() -> Self {
        match env::var("OPENSEARCH_CONNECTION_MODE")
            .unwrap_or_else(|_| "retry".to_string())
            .to_lowercase()
            .as_str()
        {
            "fail-fast" | "failfast" | "fail_fast" => Self::FailFast,
            "retry" => Self::Retry,
            _ => {
                warn!("Invalid OPENSEARCH_CONNECTION_MODE, defaulting to 'retry'");
                Self::Retry
            }
        }
    }
}

/// Container for all initialized dependencies.
pub struct Dependencies {
    pub settings: Settings,
    pub gateway: Arc<IndexGateway>,
    pub engine: Engine,
}

impl Dependencies {
    /// Build the gateway and engine from the environment. Only fails in
    /// fail-fast mode; otherwise waits for the cluster.
    pub async fn new() -> Result<Self, CatalogError> {
        let settings = Settings::from_env();

        info!(
            opensearch_url = %settings.opensearch_url,
            index_prefix = %settings.index_prefix,
            connection_mode = ?settings.connection_mode,
            retry_interval_secs = settings.retry_interval.as_secs(),
            dedup_queue = if settings.dedup_queue_url.is_some() { "postgres" } else { "memory" },
            "Initializing dependencies"
        );

        let provider = Self::connect_to_opensearch(
            &settings.opensearch_url,
            IndexConfig::new(settings.index_prefix.clone()),
            settings.connection_mode,
            settings.retry_interval,
        )
        .await?;

        info!("OpenSearch connection established");

        let gateway = Arc::new(IndexGateway::with_config(
            Arc::new(provider),
            settings.gateway_config(),
        ));
        let engine = Engine::new(gateway.clone());

        Ok(Self {
            settings,
            gateway,
            engine,
        })
    }

    /// Create every core index that does not exist yet.
    pub async fn init_indices(&self) -> Result<(), CatalogError> {
        self.gateway
            .ensure_cores()
            .await
            .map_err(|e| CatalogError::config(format!("Failed to ensure indices exist: {}", e)))
    }

    pub async fn queue(&self) -> Result<Arc<dyn CandidateQueue>, CatalogError> {
        let source = match &self.settings.dedup_queue_url {
            Some(url) => QueueSource::postgres(url.clone()),
            None => QueueSource::memory(),
        };
        Ok(source.into_queue().await?)
    }

    pub async fn dedup_job(&self, config: DedupConfig) -> Result<DedupJob, CatalogError> {
        let generator = CandidateGenerator::new(self.gateway.clone(), config);
        Ok(DedupJob::new(generator, self.queue().await?))
    }

    pub fn sweeper(&self) -> Result<LockSweeper, CatalogError> {
        let max_age = chrono::Duration::from_std(self.settings.lock_sweep_age)
            .map_err(|e| CatalogError::config(format!("Invalid LOCK_SWEEP_AGE_SECS: {}", e)))?;
        Ok(LockSweeper::new(self.engine.store().clone(), max_age))
    }

    /// Open the provider, retrying according to `mode`.
    async fn connect_to_opensearch(
        url: &str,
        index_config: IndexConfig,
        mode: ConnectionMode,
        retry_interval: Duration,
    ) -> Result<OpenSearchProvider, CatalogError> {
        loop {
            match OpenSearchProvider::new(url, index_config.clone()).await {
                Ok(provider) => return Ok(provider),
                Err(e) => match mode {
                    ConnectionMode::FailFast => {
                        return Err(CatalogError::config(format!(
                            "Failed to connect to OpenSearch: {}",
                            e
                        )));
                    }
                    ConnectionMode::Retry => {
                        warn!(
                            opensearch_url = %url,
                            error = %e,
                            retry_interval_secs = retry_interval.as_secs(),
                            "Failed to connect to OpenSearch, retrying..."
                        );
                        sleep(retry_interval).await;
                    }
                },
            }
        }
    }
}
