//! Stale lock detection.
//!
//! A crash between acquiring and releasing a record lock leaves the record
//! locked for good. The sweeper lists such records; a superadmin clears them.

use catalog_shared::types::envelope::{index_time, now};
use catalog_shared::{fields, Core, Query, Role, Visibility};
use chrono::{DateTime, Duration, Utc};
use futures::{pin_mut, TryStreamExt};
use serde::Serialize;
use tracing::{info, instrument};

use crate::engine::Actor;
use crate::errors::EngineError;
use crate::store::RecordStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaleLock {
    pub core: Core,
    pub id: String,
    pub changed: Option<String>,
    pub locked_since: Option<String>,
}

pub struct LockSweeper {
    store: RecordStore,
    max_age: Duration,
}

impl LockSweeper {
    pub fn new(store: RecordStore, max_age: Duration) -> Self {
        Self { store, max_age }
    }

    /// Records locked since before `at - max_age`. Locks that carry no
    /// `locked_since` stamp are aged by `changed` instead.
    pub fn stale_query(&self, at: DateTime<Utc>) -> Query {
        let cutoff = index_time(&(at - self.max_age));
        Query::and(vec![
            Query::term(fields::LOCKED, "true"),
            Query::or(vec![
                Query::before(fields::LOCKED_SINCE, cutoff.clone()),
                Query::and(vec![
                    Query::not(Query::exists(fields::LOCKED_SINCE)),
                    Query::before(fields::CHANGED, cutoff),
                ]),
            ]),
        ])
    }

    #[instrument(skip(self), fields(core = %core))]
    pub async fn scan(&self, core: Core) -> Result<Vec<StaleLock>, EngineError> {
        let fields = Some(vec![
            fields::ID.to_string(),
            fields::CHANGED.to_string(),
            fields::LOCKED_SINCE.to_string(),
        ]);
        let docs = self
            .store
            .gateway()
            .stream(core, self.stale_query(now()), fields, Visibility::All);
        pin_mut!(docs);

        let mut stale = Vec::new();
        while let Some(doc) = docs
            .try_next()
            .await
            .map_err(|e| EngineError::from_index(e, "sweep"))?
        {
            stale.push(StaleLock {
                core,
                id: doc.id().unwrap_or_default().to_string(),
                changed: doc.get_str(fields::CHANGED).map(str::to_string),
                locked_since: doc.get_str(fields::LOCKED_SINCE).map(str::to_string),
            });
        }
        info!(stale = stale.len(), "Lock scan finished");
        Ok(stale)
    }

    /// Clear the lock of one record.
    pub async fn unlock(&self, actor: &Actor, core: Core, id: &str) -> Result<(), EngineError> {
        if actor.role != Role::Superadmin {
            return Err(EngineError::permission_denied(
                "clearing a record lock requires the superadmin role",
            ));
        }
        let exists = self
            .store
            .exists(core, id)
            .await
            .map_err(|e| EngineError::from_index(e, "unlock"))?;
        if !exists {
            return Err(EngineError::not_found(core, id));
        }
        self.store
            .set_locked(core, id, false)
            .await
            .map_err(|e| EngineError::from_index(e, "unlock"))?;
        info!(core = %core, id, user = %actor.user, "Lock cleared");
        Ok(())
    }
}
