//! Index provider trait definition.
//!
//! This module defines the abstract interface for document store operations,
//! allowing for different backend implementations (OpenSearch, in-memory).

use async_trait::async_trait;
use catalog_shared::{Core, DocGroup, IndexDocument, SearchPage, SearchRequest};
use serde_json::Value;

use crate::errors::IndexError;
use crate::types::{BatchOperationSummary, GroupRequest, ScanPage, ScanRequest};

/// Abstracts the underlying document store.
///
/// Every core (work, person, organisation, group) is an independent partition.
/// Implementations are injected into `IndexGateway`, which adds validation, batch
/// limits, retries and visibility scoping on top. Providers themselves never retry.
///
/// # Index Initialization
///
/// Call `ensure_core_exists` for each core during startup before performing
/// document operations.
#[async_trait]
pub trait IndexProvider: Send + Sync {
    /// Ensure the index backing `core` exists, creating it with mappings if necessary.
    async fn ensure_core_exists(&self, core: Core) -> Result<(), IndexError>;

    /// Run a paged, faceted query.
    ///
    /// Results follow `request.sort`; documents equal on every sort key keep id order.
    async fn search(&self, core: Core, request: &SearchRequest) -> Result<SearchPage, IndexError>;

    /// Fetch documents by id. Missing ids are omitted; order is not guaranteed.
    async fn get_documents(
        &self,
        core: Core,
        ids: &[String],
    ) -> Result<Vec<IndexDocument>, IndexError>;

    /// Upsert whole documents by id.
    ///
    /// # Returns
    ///
    /// * `Ok(BatchOperationSummary)` - Per-document outcome; callers must inspect `failed`
    /// * `Err(IndexError)` - If the request failed entirely
    async fn put_documents(
        &self,
        core: Core,
        docs: &[IndexDocument],
    ) -> Result<BatchOperationSummary, IndexError>;

    /// Atomically set a single field of an existing document.
    ///
    /// Fails with `DocumentNotFound` when the document does not exist.
    async fn patch_document(
        &self,
        core: Core,
        id: &str,
        field: &str,
        value: &Value,
    ) -> Result<(), IndexError>;

    /// Delete a document. Deleting a missing document succeeds.
    async fn delete_document(&self, core: Core, id: &str) -> Result<(), IndexError>;

    /// Fetch one page of an id-ordered scan.
    async fn scan_page(&self, core: Core, request: &ScanRequest) -> Result<ScanPage, IndexError>;

    /// Group matching documents on the value of a keyword field.
    async fn group(&self, core: Core, request: &GroupRequest)
        -> Result<Vec<DocGroup>, IndexError>;
}
