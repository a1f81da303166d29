//! # Catalog Engine
//!
//! Editorial metadata engine for the university bibliography catalogs. It keeps
//! works, persons, organisations and working groups in a faceted index and
//! guards every write with schema validation and the editorial workflow.
//!
//! ## Architecture
//!
//! A save flows through the engine in a fixed order:
//!
//! 1. **Schema**: validates and normalises the submitted record
//! 2. **Workflow**: advances the editorial status for the caller's role
//! 3. **Projector**: flattens the record into a search document, denormalising
//!    linked entities
//! 4. **Store**: writes the document through the index gateway
//! 5. **Reconciler**: installs reciprocal links on linked records under a lock
//!
//! Offline jobs work directly on the index: snapshot export and import
//! ([`bulk`]), dedup candidate generation ([`dedup`]) and stale lock sweeping
//! ([`sweeper`]).
//!
//! ## Modules
//!
//! - [`config`]: Environment settings and dependency initialization
//! - [`engine`]: The editorial facade
//! - [`schema`]: Entity schemas and validation
//! - [`workflow`]: Editorial status transitions
//! - [`projector`]: Record to search document projection
//! - [`store`]: Record persistence on top of the gateway
//! - [`reconcile`]: Reciprocal link maintenance and record locks
//! - [`bulk`]: Snapshot export, backup and import
//! - [`dedup`]: Person dedup candidates and their queue
//! - [`citation`]: CSL-JSON bridge
//! - [`sweeper`]: Stale lock detection
//! - [`errors`]: Error and warning types

pub mod bulk;
pub mod citation;
pub mod config;
pub mod dedup;
pub mod engine;
pub mod errors;
pub mod projector;
pub mod reconcile;
pub mod schema;
pub mod store;
pub mod sweeper;
pub mod workflow;

pub use config::{Dependencies, Settings};
pub use engine::{Actor, Engine, SaveReport};
pub use errors::{EngineError, FieldError, Warning, WarningKind};

use thiserror::Error;

/// Errors that can occur while starting or running the engine binary.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Engine error.
    #[error("Engine error: {0}")]
    EngineError(#[from] EngineError),
}

impl CatalogError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
