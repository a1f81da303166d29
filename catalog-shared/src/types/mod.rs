//! This module defines the core data structures and types used across the catalog engine.

pub mod envelope;
pub mod group;
pub mod index_document;
pub mod organisation;
pub mod person;
pub mod query;
pub mod record;
pub mod search_result;
pub mod work;

pub use envelope::{Catalog, EditorialStatus, Envelope, Role, Visibility};
pub use index_document::IndexDocument;
pub use record::{Core, Record};
