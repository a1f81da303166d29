//! Reciprocal link installation.
//!
//! After a record is committed, every record it points at through a symmetric
//! relation is opened under its lock and given the inverse relation if it lacks
//! it. Targets are written through [`RecordStore::write`], which never fans out
//! again, so reconciliation cannot recurse. Failures on a target become warnings;
//! the source record stays committed.

pub mod lock;

use catalog_shared::types::envelope::now;
use catalog_shared::types::organisation::ChildRef;
use catalog_shared::types::work::{HasPart, IsPartOf, OtherVersion};
use catalog_shared::{Core, Record, Visibility};
use tracing::{debug, info, instrument, warn};

use crate::errors::{Warning, WarningKind};
use crate::store::RecordStore;
use lock::RecordLock;

/// The relation to install on a target, pointing back at the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inverse {
    /// Target is a host: add the source to `has_part`.
    HasPart,
    /// Target is a part: add the source to `is_part_of`.
    IsPartOf,
    OtherVersion,
    /// Target is the parent organisation: add the source to `children`.
    Child { label: String },
    /// Target is a child organisation: point its `parent_id` at the source.
    Parent { label: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub core: Core,
    pub target: String,
    pub inverse: Inverse,
}

/// Outgoing symmetric links of a record, in relation-list order, without
/// duplicates or self references.
pub fn links(record: &Record) -> Vec<Link> {
    let source = record.id();
    let mut found: Vec<Link> = Vec::new();
    let mut add = |core: Core, target: &str, inverse: Inverse| {
        let target = target.trim();
        if target.is_empty() || target == source {
            return;
        }
        let link = Link {
            core,
            target: target.to_string(),
            inverse,
        };
        if !found.contains(&link) {
            found.push(link);
        }
    };

    match record {
        Record::Work(work) => {
            for id in work.host_ids() {
                add(Core::Work, id, Inverse::HasPart);
            }
            for id in work.part_ids() {
                add(Core::Work, id, Inverse::IsPartOf);
            }
            for id in work.other_version_ids() {
                add(Core::Work, id, Inverse::OtherVersion);
            }
        }
        Record::Organisation(org) => {
            let label = org.pref_label.trim().to_string();
            add(
                Core::Organisation,
                &org.parent_id,
                Inverse::Child {
                    label: label.clone(),
                },
            );
            for id in org.child_ids() {
                add(
                    Core::Organisation,
                    id,
                    Inverse::Parent {
                        label: label.clone(),
                    },
                );
            }
        }
        Record::Person(_) | Record::Group(_) => {}
    }
    found
}

/// Install `inverse` of `source` on `target`. Returns whether anything changed,
/// or why the relation cannot be installed.
pub fn install(target: &mut Record, source: &str, inverse: &Inverse) -> Result<bool, String> {
    match (target, inverse) {
        (Record::Work(work), Inverse::HasPart) => {
            if work.part_ids().any(|id| id == source) {
                return Ok(false);
            }
            work.has_part.push(HasPart {
                has_part: source.to_string(),
            });
            Ok(true)
        }
        (Record::Work(work), Inverse::IsPartOf) => {
            if work.host_ids().any(|id| id == source) {
                return Ok(false);
            }
            work.is_part_of.push(IsPartOf::new(source));
            Ok(true)
        }
        (Record::Work(work), Inverse::OtherVersion) => {
            if work.other_version_ids().any(|id| id == source) {
                return Ok(false);
            }
            work.other_version.push(OtherVersion {
                other_version: source.to_string(),
            });
            Ok(true)
        }
        (Record::Organisation(org), Inverse::Child { label }) => {
            match org.children.iter_mut().find(|c| c.child_id == source) {
                Some(child) if child.child_label == *label => Ok(false),
                Some(child) => {
                    child.child_label = label.clone();
                    Ok(true)
                }
                None => {
                    org.children.push(ChildRef {
                        child_id: source.to_string(),
                        child_label: label.clone(),
                    });
                    Ok(true)
                }
            }
        }
        (Record::Organisation(org), Inverse::Parent { label }) => {
            let current = org.parent_id.trim();
            if current == source {
                if org.parent_label == *label {
                    return Ok(false);
                }
                org.parent_label = label.clone();
                return Ok(true);
            }
            if !current.is_empty() {
                return Err(format!(
                    "organisation {} already has parent {}",
                    org.envelope.id, current
                ));
            }
            org.parent_id = source.to_string();
            org.parent_label = label.clone();
            Ok(true)
        }
        (other, inverse) => Err(format!(
            "{:?} cannot be installed on a {} record",
            inverse,
            other.core()
        )),
    }
}

fn link_warning(link: &Link, message: impl Into<String>) -> Warning {
    Warning::new(WarningKind::LinkReconciliation, link.target.clone(), message)
}

/// Installs reciprocal relations for committed records.
#[derive(Clone)]
pub struct Reconciler {
    store: RecordStore,
}

impl Reconciler {
    pub fn new(store: RecordStore) -> Self {
        Self { store }
    }

    /// Reconcile every outgoing link of `record`, one target at a time.
    #[instrument(skip(self, record), fields(core = %record.core(), id = %record.id()))]
    pub async fn reconcile(&self, record: &Record) -> Vec<Warning> {
        let links = links(record);
        if links.is_empty() {
            return Vec::new();
        }
        let mut warnings = Vec::new();
        for link in &links {
            warnings.extend(self.reconcile_target(record.id(), link).await);
        }
        info!(
            targets = links.len(),
            warnings = warnings.len(),
            "Reconciled reciprocal links"
        );
        warnings
    }

    async fn reconcile_target(&self, source: &str, link: &Link) -> Vec<Warning> {
        match self.store.load(link.core, &link.target, Visibility::All).await {
            Ok(Some(stored)) if stored.is_locked() => {
                warn!(target_id = %link.target, "Link target is locked by another writer");
                return vec![link_warning(link, "target is locked by another writer")];
            }
            Ok(Some(_)) => {}
            Ok(None) => return vec![Warning::missing_reference(link.core, &link.target)],
            Err(e) => return vec![link_warning(link, e.to_string())],
        }

        let lock = match RecordLock::acquire(&self.store, link.core, &link.target).await {
            Ok(lock) => lock,
            Err(e) => return vec![link_warning(link, format!("lock failed: {}", e))],
        };

        let mut warnings = Vec::new();
        if let Err(warning) = self.update_target(source, link).await {
            warn!(target_id = %link.target, warning = %warning, "Reciprocal link not installed");
            warnings.push(warning);
        }
        warnings.extend(lock.release_or_warn(&self.store).await);
        warnings
    }

    /// Read the locked target, install the inverse and write it back still locked.
    async fn update_target(&self, source: &str, link: &Link) -> Result<(), Warning> {
        let mut stored = self
            .store
            .load(link.core, &link.target, Visibility::All)
            .await
            .map_err(|e| link_warning(link, e.to_string()))?
            .ok_or_else(|| Warning::missing_reference(link.core, &link.target))?;

        let changed =
            install(&mut stored.record, source, &link.inverse).map_err(|m| link_warning(link, m))?;
        if !changed {
            debug!(target_id = %link.target, "Reciprocal link already present");
            return Ok(());
        }

        stored.record.envelope_mut().touch(now());
        self.store
            .write(&stored.record, true)
            .await
            .map_err(|e| link_warning(link, e.to_string()))?;
        Ok(())
    }
}
