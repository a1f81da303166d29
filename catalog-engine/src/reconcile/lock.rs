//! Cooperative record locks.
//!
//! A lock is the `locked` flag of the index document plus its `locked_since`
//! stamp. It carries no owner and no expiry; stale locks are found by the sweeper.
//!
//! Locks are advisory. Writers check the flag before acquiring, but acquiring is an
//! unconditional patch, so two writers that both read the record as unlocked can
//! both take the lock. The flag keeps well-behaved writers apart over longer
//! saves; it does not exclude concurrent writers.

use catalog_repository::IndexError;
use catalog_shared::Core;
use tracing::{debug, warn};

use crate::errors::{Warning, WarningKind};
use crate::store::RecordStore;

/// A held lock. Must be passed to [`RecordLock::release`] on every path.
///
/// Holding one does not keep other writers out; see the module docs.
#[must_use = "a held lock has to be released"]
#[derive(Debug)]
pub struct RecordLock {
    core: Core,
    id: String,
}

impl RecordLock {
    pub async fn acquire(store: &RecordStore, core: Core, id: &str) -> Result<Self, IndexError> {
        store.set_locked(core, id, true).await?;
        debug!(core = %core, id, "Lock acquired");
        Ok(Self {
            core,
            id: id.to_string(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Clear the flag. A record that no longer exists counts as released.
    pub async fn release(self, store: &RecordStore) -> Result<(), IndexError> {
        match store.set_locked(self.core, &self.id, false).await {
            Ok(()) | Err(IndexError::DocumentNotFound(_)) => {
                debug!(core = %self.core, id = %self.id, "Lock released");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Release and turn a failure into a warning.
    pub async fn release_or_warn(self, store: &RecordStore) -> Option<Warning> {
        let core = self.core;
        let id = self.id.clone();
        match self.release(store).await {
            Ok(()) => None,
            Err(e) => {
                warn!(core = %core, id = %id, error = %e, "Failed to release lock");
                Some(Warning::new(
                    WarningKind::LockRelease,
                    id,
                    format!("lock on {} could not be released: {}", core, e),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_repository::{IndexGateway, InMemoryProvider};
    use catalog_shared::{fields, IndexDocument, Visibility};
    use std::sync::Arc;

    async fn store_with(id: &str) -> RecordStore {
        let gateway = Arc::new(IndexGateway::new(Arc::new(InMemoryProvider::new())));
        gateway.ensure_cores().await.unwrap();
        gateway
            .put(Core::Group, vec![IndexDocument::new(id)])
            .await
            .unwrap();
        RecordStore::new(gateway)
    }

    #[tokio::test]
    async fn test_acquire_does_not_exclude_second_holder() {
        let store = store_with("G1").await;
        let first = RecordLock::acquire(&store, Core::Group, "G1").await.unwrap();
        let second = RecordLock::acquire(&store, Core::Group, "G1").await.unwrap();

        first.release(&store).await.unwrap();
        let doc = store
            .gateway()
            .get_one(Core::Group, "G1", Visibility::All)
            .await
            .unwrap()
            .unwrap();
        assert!(!doc.is_locked());
        second.release(&store).await.unwrap();
    }

    #[tokio::test]
    async fn test_lock_is_stamped_and_cleared() {
        let store = store_with("G1").await;
        let lock = RecordLock::acquire(&store, Core::Group, "G1").await.unwrap();
        let locked = store
            .gateway()
            .get_one(Core::Group, "G1", Visibility::All)
            .await
            .unwrap()
            .unwrap();
        assert!(locked.is_locked());
        assert!(locked.get_str(fields::LOCKED_SINCE).is_some());

        lock.release(&store).await.unwrap();
        let released = store
            .gateway()
            .get_one(Core::Group, "G1", Visibility::All)
            .await
            .unwrap()
            .unwrap();
        assert!(!released.is_locked());
        assert!(released.get_str(fields::LOCKED_SINCE).is_none());
    }

    #[tokio::test]
    async fn test_release_of_purged_record_succeeds() {
        let store = store_with("G1").await;
        let lock = RecordLock::acquire(&store, Core::Group, "G1").await.unwrap();
        store.purge(Core::Group, "G1").await.unwrap();
        assert!(lock.release_or_warn(&store).await.is_none());
    }
}
