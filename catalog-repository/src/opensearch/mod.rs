//! OpenSearch implementation of the index provider.
//!
//! This module provides a concrete implementation of `IndexProvider`
//! using OpenSearch as the backend.

mod index_config;
mod provider;
mod query_dsl;

pub use index_config::{get_index_settings, IndexConfig};
pub use provider::OpenSearchProvider;
pub use query_dsl::{query_to_dsl, search_body};
