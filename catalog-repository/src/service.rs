//! Index gateway service.
//!
//! This module provides the main service for interacting with the document store.
//! Application code uses it for every read and write; it validates requests, applies
//! batch limits, retries transient backend failures and scopes reads by visibility.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use catalog_shared::{
    fields, Core, DocGroup, IndexDocument, Query, SearchPage, SearchRequest, Visibility,
};
use futures::stream::{self, Stream, TryStreamExt};
use serde_json::Value;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::{debug, warn};

use crate::config::GatewayConfig;
use crate::errors::IndexError;
use crate::interfaces::IndexProvider;
use crate::types::{BatchOperationSummary, GroupRequest, ScanRequest};
use crate::utils;

/// The main service for interacting with the document store.
///
/// Wraps an `IndexProvider` and adds:
/// - id and field validation
/// - the configured batch size limit on `put`
/// - retry with exponential backoff on transient failures, then `StoreUnavailable`
/// - the mandatory `-editorial_status:deleted` filter on `Visibility::Public` reads
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use catalog_repository::{IndexGateway, InMemoryProvider};
/// use catalog_shared::{Core, IndexDocument, SearchRequest, Visibility};
///
/// # async fn example() -> Result<(), catalog_repository::IndexError> {
/// let gateway = IndexGateway::new(Arc::new(InMemoryProvider::new()));
/// gateway.put(Core::Work, vec![IndexDocument::new("W1")]).await?;
/// let page = gateway
///     .find(Core::Work, SearchRequest::match_all(), Visibility::Public)
///     .await?;
/// assert_eq!(page.total, 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct IndexGateway {
    provider: Arc<dyn IndexProvider>,
    config: GatewayConfig,
}

impl IndexGateway {
    /// Create a gateway with default configuration.
    pub fn new(provider: Arc<dyn IndexProvider>) -> Self {
        Self {
            provider,
            config: GatewayConfig::default(),
        }
    }

    /// Create a gateway with custom configuration.
    pub fn with_config(provider: Arc<dyn IndexProvider>, config: GatewayConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Check if batch size exceeds the configured limit.
    fn validate_batch_size(&self, size: usize) -> Result<(), IndexError> {
        if let Some(max) = self.config.max_batch_size {
            if size > max {
                return Err(IndexError::batch_size_exceeded(size, max));
            }
        }
        Ok(())
    }

    /// Add the deleted-records filter for public reads.
    pub fn scope(query: Query, visibility: Visibility) -> Query {
        match visibility {
            Visibility::All => query,
            Visibility::Public if query == Query::MatchAll => Query::not_deleted(),
            Visibility::Public => Query::and(vec![query, Query::not_deleted()]),
        }
    }

    fn is_visible(doc: &IndexDocument, visibility: Visibility) -> bool {
        visibility == Visibility::All || doc.get_str(fields::EDITORIAL_STATUS) != Some("deleted")
    }

    /// Run `action`, retrying transient failures with exponential backoff.
    ///
    /// Delays start at `retry_base_delay` and double on each attempt. A failure that is
    /// still transient after the last retry becomes `StoreUnavailable`.
    async fn with_retry<T, A, Fut>(&self, operation: &str, mut action: A) -> Result<T, IndexError>
    where
        A: FnMut() -> Fut,
        Fut: Future<Output = Result<T, IndexError>>,
    {
        let base_ms = (self.config.retry_base_delay.as_millis() as u64).max(2);
        let strategy = ExponentialBackoff::from_millis(2)
            .factor(base_ms / 2)
            .max_delay(Duration::from_secs(5))
            .map(jitter)
            .take(self.config.retry_attempts);

        let mut attempt = 0usize;
        let result = RetryIf::spawn(
            strategy,
            || {
                attempt += 1;
                if attempt > 1 {
                    debug!(operation, attempt, "Retrying index operation");
                }
                action()
            },
            |e: &IndexError| e.is_transient(),
        )
        .await;

        result.map_err(|e| {
            if e.is_transient() {
                warn!(operation, error = %e, "Index operation failed after retries");
                IndexError::store_unavailable(format!("{}: {}", operation, e))
            } else {
                e
            }
        })
    }

    /// Create every core's index if missing.
    pub async fn ensure_cores(&self) -> Result<(), IndexError> {
        for core in Core::all() {
            self.with_retry("ensure_core_exists", || {
                self.provider.ensure_core_exists(*core)
            })
            .await?;
        }
        Ok(())
    }

    /// Paged, faceted query.
    ///
    /// The engine-wide tie-breaks (`changed desc`, then `id asc`) are appended to the
    /// requested sort.
    pub async fn find(
        &self,
        core: Core,
        request: SearchRequest,
        visibility: Visibility,
    ) -> Result<SearchPage, IndexError> {
        for facet in &request.facets {
            utils::validate_field_name(facet)?;
        }
        let mut request = request.with_default_tie_breaks();
        request.query = Self::scope(request.query, visibility);

        self.with_retry("find", || self.provider.search(core, &request))
            .await
    }

    /// Id-list retrieval. Missing ids are omitted; order is not guaranteed.
    pub async fn get(
        &self,
        core: Core,
        ids: &[String],
        visibility: Visibility,
    ) -> Result<Vec<IndexDocument>, IndexError> {
        for id in ids {
            utils::validate_document_id(id)?;
        }
        let docs = self
            .with_retry("get", || self.provider.get_documents(core, ids))
            .await?;
        Ok(docs
            .into_iter()
            .filter(|doc| Self::is_visible(doc, visibility))
            .collect())
    }

    /// Single document lookup.
    pub async fn get_one(
        &self,
        core: Core,
        id: &str,
        visibility: Visibility,
    ) -> Result<Option<IndexDocument>, IndexError> {
        let ids = [id.to_string()];
        Ok(self.get(core, &ids, visibility).await?.into_iter().next())
    }

    /// Upsert whole documents.
    ///
    /// # Returns
    ///
    /// * `Ok(BatchOperationSummary)` - Per-document outcome; `failed > 0` means some
    ///   documents were rejected and the caller must treat the write as partial
    /// * `Err(IndexError::BatchSizeExceeded)` - If the batch exceeds `max_batch_size`
    /// * `Err(IndexError::StoreUnavailable)` - If the backend kept failing
    pub async fn put(
        &self,
        core: Core,
        docs: Vec<IndexDocument>,
    ) -> Result<BatchOperationSummary, IndexError> {
        if docs.is_empty() {
            return Ok(BatchOperationSummary::empty());
        }

        self.validate_batch_size(docs.len())?;
        for doc in &docs {
            utils::validate_document_id(doc.id().unwrap_or_default())?;
        }

        let summary = self
            .with_retry("put", || self.provider.put_documents(core, &docs))
            .await?;
        if !summary.is_complete() {
            warn!(
                core = %core,
                failed = summary.failed,
                total = summary.total,
                "Partial write rejected by the store"
            );
        }
        Ok(summary)
    }

    /// Atomic single-field set.
    pub async fn patch(
        &self,
        core: Core,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<(), IndexError> {
        utils::validate_document_id(id)?;
        utils::validate_field_name(field)?;
        self.with_retry("patch", || {
            self.provider.patch_document(core, id, field, &value)
        })
        .await
    }

    pub async fn delete(&self, core: Core, id: &str) -> Result<(), IndexError> {
        utils::validate_document_id(id)?;
        self.with_retry("delete", || self.provider.delete_document(core, id))
            .await
    }

    /// Lazily scan every matching document of a core in id order.
    ///
    /// Pages are fetched on demand with an id cursor, so the sequence is finite and
    /// memory stays bounded by one page regardless of core size. A document modified
    /// during the scan may appear once with either version.
    pub fn stream(
        &self,
        core: Core,
        query: Query,
        fields: Option<Vec<String>>,
        visibility: Visibility,
    ) -> impl Stream<Item = Result<IndexDocument, IndexError>> + '_ {
        let query = Self::scope(query, visibility);
        let page_size = self.config.scan_page_size;

        // State: `None` once exhausted, otherwise the cursor to resume after.
        stream::try_unfold(Some(None::<String>), move |cursor| {
            let request = ScanRequest::new(query.clone(), page_size).with_fields(fields.clone());
            async move {
                let Some(after) = cursor else {
                    return Ok(None);
                };
                let request = request.after(after);
                let page = self
                    .with_retry("stream", || self.provider.scan_page(core, &request))
                    .await?;
                debug!(core = %core, docs = page.docs.len(), "Fetched scan page");
                Ok(Some((page.docs, page.next.map(Some))))
            }
        })
        .map_ok(|docs| stream::iter(docs.into_iter().map(Ok::<IndexDocument, IndexError>)))
        .try_flatten()
    }

    /// Enumerate groups of documents sharing a field value.
    pub async fn group(
        &self,
        core: Core,
        mut request: GroupRequest,
        visibility: Visibility,
    ) -> Result<Vec<DocGroup>, IndexError> {
        utils::validate_field_name(&request.field)?;
        request.query = Self::scope(request.query, visibility);
        self.with_retry("group", || self.provider.group(core, &request))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryProvider;
    use crate::types::ScanPage;
    use async_trait::async_trait;
    use futures::StreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails the first `failures` calls with a transient error, then delegates.
    struct FlakyProvider {
        inner: InMemoryProvider,
        failures: usize,
        calls: AtomicUsize,
        error: IndexError,
    }

    impl FlakyProvider {
        fn new(failures: usize, error: IndexError) -> Self {
            Self {
                inner: InMemoryProvider::new(),
                failures,
                calls: AtomicUsize::new(0),
                error,
            }
        }

        fn fail(&self) -> Result<(), IndexError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(self.error.clone());
            }
            Ok(())
        }
    }

    #[async_trait]
    impl IndexProvider for FlakyProvider {
        async fn ensure_core_exists(&self, core: Core) -> Result<(), IndexError> {
            self.inner.ensure_core_exists(core).await
        }

        async fn search(
            &self,
            core: Core,
            request: &SearchRequest,
        ) -> Result<SearchPage, IndexError> {
            self.fail()?;
            self.inner.search(core, request).await
        }

        async fn get_documents(
            &self,
            core: Core,
            ids: &[String],
        ) -> Result<Vec<IndexDocument>, IndexError> {
            self.fail()?;
            self.inner.get_documents(core, ids).await
        }

        async fn put_documents(
            &self,
            core: Core,
            docs: &[IndexDocument],
        ) -> Result<BatchOperationSummary, IndexError> {
            self.fail()?;
            self.inner.put_documents(core, docs).await
        }

        async fn patch_document(
            &self,
            core: Core,
            id: &str,
            field: &str,
            value: &Value,
        ) -> Result<(), IndexError> {
            self.fail()?;
            self.inner.patch_document(core, id, field, value).await
        }

        async fn delete_document(&self, core: Core, id: &str) -> Result<(), IndexError> {
            self.fail()?;
            self.inner.delete_document(core, id).await
        }

        async fn scan_page(
            &self,
            core: Core,
            request: &ScanRequest,
        ) -> Result<ScanPage, IndexError> {
            self.inner.scan_page(core, request).await
        }

        async fn group(
            &self,
            core: Core,
            request: &GroupRequest,
        ) -> Result<Vec<DocGroup>, IndexError> {
            self.inner.group(core, request).await
        }
    }

    fn fast_config() -> GatewayConfig {
        GatewayConfig::default().with_retry(Duration::from_millis(2), 1)
    }

    fn doc_with_status(id: &str, status: &str) -> IndexDocument {
        let mut doc = IndexDocument::new(id);
        doc.set(fields::EDITORIAL_STATUS, status);
        doc
    }

    #[tokio::test]
    async fn test_put_empty() {
        let gateway = IndexGateway::new(Arc::new(InMemoryProvider::new()));
        let result = gateway.put(Core::Work, vec![]).await.unwrap();
        assert_eq!(result.total, 0);
        assert!(result.results.is_empty());
    }

    #[tokio::test]
    async fn test_put_exceeds_batch_size() {
        let gateway = IndexGateway::with_config(
            Arc::new(InMemoryProvider::new()),
            GatewayConfig::with_max_batch_size(2),
        );
        let docs = (0..3).map(|i| IndexDocument::new(format!("W{}", i))).collect();
        let result = gateway.put(Core::Work, docs).await;
        assert!(matches!(
            result,
            Err(IndexError::BatchSizeExceeded { provided: 3, max: 2 })
        ));
    }

    #[tokio::test]
    async fn test_put_rejects_blank_id() {
        let gateway = IndexGateway::new(Arc::new(InMemoryProvider::new()));
        let result = gateway.put(Core::Work, vec![IndexDocument::new("")]).await;
        assert!(matches!(result, Err(IndexError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_transient_failure_retried_once() {
        let provider = Arc::new(FlakyProvider::new(1, IndexError::connection("reset")));
        let gateway = IndexGateway::with_config(provider.clone(), fast_config());

        let summary = gateway
            .put(Core::Work, vec![IndexDocument::new("W1")])
            .await
            .unwrap();
        assert_eq!(summary.succeeded, 1);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_repeated_failure_is_store_unavailable() {
        let provider = Arc::new(FlakyProvider::new(5, IndexError::connection("refused")));
        let gateway = IndexGateway::with_config(provider.clone(), fast_config());

        let result = gateway.delete(Core::Work, "W1").await;
        assert!(matches!(result, Err(IndexError::StoreUnavailable(_))));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_failure_not_retried() {
        let provider = Arc::new(FlakyProvider::new(
            5,
            IndexError::update("failed with status 400: mapper_parsing_exception"),
        ));
        let gateway = IndexGateway::with_config(provider.clone(), fast_config());

        let result = gateway.delete(Core::Work, "W1").await;
        assert!(matches!(result, Err(IndexError::UpdateError(_))));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_public_reads_hide_deleted() {
        let gateway = IndexGateway::new(Arc::new(InMemoryProvider::new()));
        gateway
            .put(
                Core::Work,
                vec![doc_with_status("W1", "new"), doc_with_status("W2", "deleted")],
            )
            .await
            .unwrap();

        let public = gateway
            .find(Core::Work, SearchRequest::match_all(), Visibility::Public)
            .await
            .unwrap();
        assert_eq!(public.total, 1);

        let all = gateway
            .find(Core::Work, SearchRequest::match_all(), Visibility::All)
            .await
            .unwrap();
        assert_eq!(all.total, 2);

        assert!(gateway
            .get_one(Core::Work, "W2", Visibility::Public)
            .await
            .unwrap()
            .is_none());
        assert!(gateway
            .get_one(Core::Work, "W2", Visibility::All)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_stream_visits_every_document_once() {
        let gateway = IndexGateway::with_config(
            Arc::new(InMemoryProvider::new()),
            GatewayConfig::default().with_scan_page_size(4),
        );
        let docs: Vec<_> = (0..10)
            .map(|i| doc_with_status(&format!("W{:02}", i), "new"))
            .collect();
        gateway.put(Core::Work, docs).await.unwrap();

        let ids: Vec<String> = gateway
            .stream(Core::Work, Query::MatchAll, None, Visibility::Public)
            .map(|doc| doc.unwrap().id().unwrap_or_default().to_string())
            .collect()
            .await;
        assert_eq!(ids.len(), 10);
        assert_eq!(ids.first().map(String::as_str), Some("W00"));
        assert_eq!(ids.last().map(String::as_str), Some("W09"));
    }

    #[tokio::test]
    async fn test_patch_missing_is_not_found() {
        let gateway = IndexGateway::new(Arc::new(InMemoryProvider::new()));
        let result = gateway
            .patch(Core::Work, "W1", fields::LOCKED, Value::Bool(true))
            .await;
        assert!(matches!(result, Err(IndexError::DocumentNotFound(_))));
    }
}
