//! Error and warning types for the editorial engine.
//!
//! Hard failures abort an operation and surface as [`EngineError`]. Problems that
//! must not fail a save that has already been committed (missing link targets,
//! reciprocal-link failures, hidden fields after a pubtype change) are collected as
//! [`Warning`] values instead.

use std::fmt;

use catalog_repository::IndexError;
use catalog_shared::{Core, QueryParseError};
use serde::Serialize;
use thiserror::Error;

/// Kind of a single field-level validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldErrorKind {
    Required,
    Pattern,
    Checksum,
    Enumeration,
    Type,
    NotApplicable,
}

impl FieldErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldErrorKind::Required => "required",
            FieldErrorKind::Pattern => "pattern",
            FieldErrorKind::Checksum => "checksum",
            FieldErrorKind::Enumeration => "enumeration",
            FieldErrorKind::Type => "type",
            FieldErrorKind::NotApplicable => "not_applicable",
        }
    }
}

/// A schema violation at a field path such as `person[0].gnd`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub path: String,
    pub kind: FieldErrorKind,
    pub message: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, kind: FieldErrorKind, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.path, self.kind.as_str(), self.message)
    }
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors that abort an engine operation.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The submitted record violates its schema. Nothing was written.
    #[error("Validation failed: {}", join_field_errors(.0))]
    ValidationFailed(Vec<FieldError>),

    #[error("{core} record not found: {id}")]
    NotFound { core: Core, id: String },

    /// Lock already held, or id collision on create.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Transient store failure that persisted through the retry.
    #[error("Store unavailable (correlation id {correlation_id}): {message}")]
    StoreUnavailable {
        correlation_id: String,
        message: String,
    },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("External lookup failed: {0}")]
    ExternalLookupFailed(String),

    /// Non-transient store failure.
    #[error("Index error: {0}")]
    Index(IndexError),

    #[error("Invalid query: {0}")]
    InvalidQuery(#[from] QueryParseError),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn not_found(core: Core, id: impl Into<String>) -> Self {
        Self::NotFound {
            core,
            id: id.into(),
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    pub fn queue(msg: impl Into<String>) -> Self {
        Self::Queue(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Map a gateway error into the engine's vocabulary, attaching the
    /// correlation id of the running operation to store outages.
    pub fn from_index(err: IndexError, correlation_id: &str) -> Self {
        match err {
            IndexError::StoreUnavailable(message) => Self::StoreUnavailable {
                correlation_id: correlation_id.to_string(),
                message,
            },
            IndexError::DocumentNotFound(message) => match parse_not_found(&message) {
                Some((core, id)) => Self::NotFound { core, id },
                None => Self::Index(IndexError::DocumentNotFound(message)),
            },
            other => Self::Index(other),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::ValidationFailed(_))
    }
}

/// Recover core and id from a `core=<core>, id=<id>` not-found message.
fn parse_not_found(message: &str) -> Option<(Core, String)> {
    let (core, id) = message.strip_prefix("core=")?.split_once(", id=")?;
    Some((core.parse().ok()?, id.to_string()))
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        Self::Queue(err.to_string())
    }
}

/// Kind of a non-fatal problem reported alongside a successful operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A referenced record is missing from its core.
    MissingReference,
    /// An authority id could not be resolved against the person core.
    AuthorityLookup,
    /// A reciprocal relation could not be installed on a target.
    LinkReconciliation,
    /// A lock could not be released; the sweeper will find it.
    LockRelease,
    /// Populated fields do not apply to the record's pubtype and are hidden.
    HiddenFields,
    /// A record could not be read back or deserialised.
    Unreadable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    /// Id (or field path) the warning is about.
    pub target: String,
    pub message: String,
}

impl Warning {
    pub fn new(kind: WarningKind, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.into(),
            message: message.into(),
        }
    }

    pub fn missing_reference(core: Core, id: &str) -> Self {
        Self::new(
            WarningKind::MissingReference,
            id,
            format!("referenced {} record {} is not in the index", core, id),
        )
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {}: {}", self.kind, self.target, self.message)
    }
}
