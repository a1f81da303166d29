//! # Catalog Shared
//!
//! This crate defines the data structures shared across the catalog metadata engine:
//! the four entity records (works, persons, organisations, working groups) with their
//! common administrative envelope, the flat index document the records are projected
//! into, and the structured query types understood by every index provider.

pub mod types;

pub use types::envelope::{Catalog, EditorialStatus, Envelope, Role, Visibility};
pub use types::group::WorkingGroup;
pub use types::index_document::{fields, IndexDocument};
pub use types::organisation::Organisation;
pub use types::person::Person;
pub use types::query::{Query, QueryParseError, SearchRequest, SortField};
pub use types::record::{Core, Record};
pub use types::search_result::{DocGroup, FacetCount, SearchPage};
pub use types::work::{PubType, Work};
