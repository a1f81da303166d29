//! Interface definitions for the index provider.
//!
//! This module defines the abstract `IndexProvider` trait that allows
//! for dependency injection and swappable store implementations.

mod index_provider;

pub use index_provider::IndexProvider;
