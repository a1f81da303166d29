//! Record-level access to the index.
//!
//! Wraps the gateway with blob deserialisation on the way out and projection on
//! the way in, so the rest of the engine deals in [`Record`] values.

use std::sync::Arc;

use catalog_repository::{IndexError, IndexGateway};
use catalog_shared::types::envelope::{index_time, now};
use catalog_shared::{fields, Core, IndexDocument, Record, Visibility};
use serde_json::Value;
use tracing::{debug, error};

use crate::errors::Warning;
use crate::projector::{self, Snapshot};

/// A stored record together with the index document it was read from.
#[derive(Debug, Clone)]
pub struct Stored {
    pub record: Record,
    pub doc: IndexDocument,
}

impl Stored {
    pub fn is_locked(&self) -> bool {
        self.doc.is_locked()
    }
}

#[derive(Clone)]
pub struct RecordStore {
    gateway: Arc<IndexGateway>,
}

impl RecordStore {
    pub fn new(gateway: Arc<IndexGateway>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &IndexGateway {
        &self.gateway
    }

    /// Read and deserialise a record.
    pub async fn load(
        &self,
        core: Core,
        id: &str,
        visibility: Visibility,
    ) -> Result<Option<Stored>, IndexError> {
        let Some(doc) = self.gateway.get_one(core, id, visibility).await? else {
            return Ok(None);
        };
        let record = projector::record_from_doc(core, &doc).map_err(|e| {
            IndexError::parse(format!("unreadable blob of {} {}: {}", core, id, e))
        })?;
        Ok(Some(Stored { record, doc }))
    }

    pub async fn exists(&self, core: Core, id: &str) -> Result<bool, IndexError> {
        Ok(self
            .gateway
            .get_one(core, id, Visibility::All)
            .await?
            .is_some())
    }

    /// Project `record` against the current state of the records it references
    /// and write it. `locked` is the value the index field carries after the write;
    /// a locked write refreshes `locked_since`.
    pub async fn write(&self, record: &Record, locked: bool) -> Result<Vec<Warning>, IndexError> {
        let snapshot = Snapshot::load(&self.gateway, record).await?;
        let projection = projector::project(record, &snapshot)
            .map_err(|e| IndexError::serialization(e.to_string()))?;
        let mut doc = projection.doc;
        if locked {
            doc.set(fields::LOCKED, true);
            doc.set(fields::LOCKED_SINCE, index_time(&now()));
        }

        let core = record.core();
        let summary = self.gateway.put(core, vec![doc]).await?;
        if let Some(failure) = summary.failures().next() {
            let reason = failure
                .error
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "rejected".to_string());
            error!(core = %core, id = %failure.id, error = %reason, "Store rejected record");
            return Err(IndexError::update(format!(
                "{} {} was rejected: {}",
                core, failure.id, reason
            )));
        }
        debug!(core = %core, id = %record.id(), warnings = projection.warnings.len(), "Record written");
        Ok(projection.warnings)
    }

    /// Set or clear the lock flag. Locking stamps `locked_since` first, so a
    /// flagged record always carries its lock time; unlocking clears it afterwards.
    pub async fn set_locked(&self, core: Core, id: &str, locked: bool) -> Result<(), IndexError> {
        if locked {
            self.gateway
                .patch(core, id, fields::LOCKED_SINCE, Value::String(index_time(&now())))
                .await?;
            self.gateway
                .patch(core, id, fields::LOCKED, Value::Bool(true))
                .await
        } else {
            self.gateway
                .patch(core, id, fields::LOCKED, Value::Bool(false))
                .await?;
            self.gateway
                .patch(core, id, fields::LOCKED_SINCE, Value::Null)
                .await
        }
    }

    pub async fn purge(&self, core: Core, id: &str) -> Result<(), IndexError> {
        self.gateway.delete(core, id).await
    }
}
