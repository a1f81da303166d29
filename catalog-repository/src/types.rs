//! Request and response types for index operations.

use catalog_shared::{IndexDocument, Query};

use crate::errors::IndexError;

/// Result of a batch operation for a single document.
#[derive(Debug, Clone)]
pub struct BatchOperationResult {
    /// The document id.
    pub id: String,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error if the operation failed.
    pub error: Option<IndexError>,
}

impl BatchOperationResult {
    pub fn ok(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            success: true,
            error: None,
        }
    }

    pub fn failed(id: impl Into<String>, error: IndexError) -> Self {
        Self {
            id: id.into(),
            success: false,
            error: Some(error),
        }
    }
}

/// Summary of a batch operation containing aggregate statistics and individual results.
///
/// A write is only accepted as a whole when `failed == 0`; otherwise the per-document
/// results say which ids were rejected and why.
#[derive(Debug, Clone, Default)]
pub struct BatchOperationSummary {
    /// Total number of items in the batch.
    pub total: usize,
    /// Number of successful operations.
    pub succeeded: usize,
    /// Number of failed operations.
    pub failed: usize,
    /// Individual results for each item.
    pub results: Vec<BatchOperationResult>,
}

impl BatchOperationSummary {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_results(results: Vec<BatchOperationResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }

    /// Failed results only.
    pub fn failures(&self) -> impl Iterator<Item = &BatchOperationResult> {
        self.results.iter().filter(|r| !r.success)
    }
}

/// One page of an id-ordered scan over a core.
///
/// Scans sort on `id` ascending and resume after the last id seen, so a full pass
/// terminates even while other writers modify the core.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub query: Query,
    pub fields: Option<Vec<String>>,
    pub page_size: usize,
    /// Resume strictly after this id.
    pub after: Option<String>,
}

impl ScanRequest {
    pub fn new(query: Query, page_size: usize) -> Self {
        Self {
            query,
            fields: None,
            page_size,
            after: None,
        }
    }

    pub fn with_fields(mut self, fields: Option<Vec<String>>) -> Self {
        self.fields = fields;
        self
    }

    pub fn after(mut self, id: Option<String>) -> Self {
        self.after = id;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScanPage {
    pub docs: Vec<IndexDocument>,
    /// Cursor for the next page; `None` when the scan is exhausted.
    pub next: Option<String>,
}

/// Grouped query: documents sharing a value of `field`.
#[derive(Debug, Clone)]
pub struct GroupRequest {
    pub field: String,
    pub query: Query,
    /// Only groups with at least this many documents are returned.
    pub min_size: usize,
    /// Maximum number of groups.
    pub limit: usize,
    /// Maximum documents returned per group.
    pub docs_per_group: usize,
}

impl GroupRequest {
    pub fn new(field: impl Into<String>, query: Query) -> Self {
        Self {
            field: field.into(),
            query,
            min_size: 2,
            limit: 100,
            docs_per_group: 10,
        }
    }
}
