//! Error types for the index gateway.
//!
//! This module provides a unified error type for all index operations.

mod index_error;

pub use index_error::IndexError;
