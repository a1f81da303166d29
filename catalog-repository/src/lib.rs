//! # Catalog Repository
//!
//! The index gateway of the editorial catalog. It defines the `IndexProvider` trait
//! over a faceted document store, an OpenSearch implementation, an in-memory
//! implementation for development and tests, and the `IndexGateway` service that adds
//! validation, batch limits, retries and visibility scoping.

pub mod config;
pub mod errors;
pub mod interfaces;
pub mod memory;
pub mod opensearch;
pub mod service;
pub mod types;
pub mod utils;

pub use config::GatewayConfig;
pub use errors::IndexError;
pub use interfaces::IndexProvider;
pub use memory::InMemoryProvider;
pub use opensearch::OpenSearchProvider;
pub use service::IndexGateway;
pub use types::{
    BatchOperationResult, BatchOperationSummary, GroupRequest, ScanPage, ScanRequest,
};
pub use utils::{validate_document_id, validate_field_name};
