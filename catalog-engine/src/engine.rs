//! The editorial engine.
//!
//! Every save follows the same path: validate, advance the workflow, project and
//! write, then reconcile reciprocal links. Each operation runs inside a span that
//! carries a fresh correlation id; store outages are reported with it.

use std::sync::Arc;

use catalog_repository::{IndexError, IndexGateway};
use catalog_shared::types::envelope::now;
use catalog_shared::{
    Catalog, Core, EditorialStatus, Record, Role, SearchPage, SearchRequest, Visibility,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::citation::{self, CslItem, HostContext};
use crate::errors::{EngineError, Warning, WarningKind};
use crate::reconcile::lock::RecordLock;
use crate::reconcile::Reconciler;
use crate::schema::{self, validate::is_blank};
use crate::store::{RecordStore, Stored};
use crate::workflow::{self, Event, Outcome};

/// The caller of an editorial operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user: String,
    pub role: Role,
    /// Catalog new records are filed under when they name none.
    pub catalog: Option<Catalog>,
}

impl Actor {
    pub fn new(user: impl Into<String>, role: Role) -> Self {
        Self {
            user: user.into(),
            role,
            catalog: None,
        }
    }

    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn visibility(&self) -> Visibility {
        Visibility::for_role(self.role)
    }
}

/// Outcome of a successful save or delete.
#[derive(Debug, Clone, Serialize)]
pub struct SaveReport {
    pub core: Core,
    pub id: String,
    /// `None` once the record has been purged.
    pub status: Option<EditorialStatus>,
    pub warnings: Vec<Warning>,
    /// Populated fields the record's pubtype no longer declares.
    pub hidden_fields: Vec<String>,
}

impl SaveReport {
    fn new(record: &Record, warnings: Vec<Warning>) -> Self {
        Self {
            core: record.core(),
            id: record.id().to_string(),
            status: Some(record.envelope().editorial_status),
            warnings,
            hidden_fields: Vec::new(),
        }
    }
}

fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Opaque id for records created without one.
fn new_record_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn str_field<'a>(value: &'a Value, field: &str) -> &'a str {
    value.get(field).and_then(Value::as_str).map_or("", str::trim)
}

/// Fill the envelope fields a submission may leave out: the id, the owner and
/// the catalog. Persons with a GND are keyed by it; an id supplied alongside a
/// different GND is kept as an alias.
fn prefill(core: Core, value: &mut Value, actor: &Actor) {
    let Value::Object(map) = value else {
        return;
    };
    let supplied = map
        .get("id")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    let gnd = map
        .get("gnd")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    let id = if core == Core::Person && !gnd.is_empty() {
        if !supplied.is_empty() && supplied != gnd {
            let aliases = map.entry("same_as").or_insert_with(|| json!([]));
            if let Value::Array(aliases) = aliases {
                if !aliases.iter().any(|a| a.as_str() == Some(supplied.as_str())) {
                    aliases.push(json!(supplied));
                }
            }
        }
        gnd
    } else if supplied.is_empty() {
        new_record_id()
    } else {
        supplied
    };
    map.insert("id".into(), json!(id));

    if map.get("owner").map_or(true, is_blank) {
        map.insert("owner".into(), json!([actor.user]));
    }
    if map.get("catalog").map_or(true, is_blank) {
        if let Some(catalog) = actor.catalog {
            map.insert("catalog".into(), json!([catalog.as_str()]));
        }
    }
}

/// Carry stored envelope fields into an update submission before validation.
fn carry_envelope(value: &mut Value, stored: &Record) {
    let Value::Object(map) = value else {
        return;
    };
    let envelope = stored.envelope();
    map.insert("id".into(), json!(envelope.id));
    if map.get("owner").map_or(true, is_blank) {
        map.insert("owner".into(), json!(envelope.owner));
    }
    if map.get("catalog").map_or(true, is_blank) {
        map.insert("catalog".into(), json!(envelope.catalog));
    }
    if !map.contains_key("editorial_status") {
        map.insert(
            "editorial_status".into(),
            json!(envelope.editorial_status.as_str()),
        );
    }
}

/// The editorial engine facade.
#[derive(Clone)]
pub struct Engine {
    store: RecordStore,
    reconciler: Reconciler,
}

impl Engine {
    pub fn new(gateway: Arc<IndexGateway>) -> Self {
        let store = RecordStore::new(gateway);
        Self {
            reconciler: Reconciler::new(store.clone()),
            store,
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Load a record the caller may see. Deleted records are `NotFound` for
    /// everyone below superadmin.
    async fn load_existing(
        &self,
        actor: &Actor,
        core: Core,
        id: &str,
        correlation_id: &str,
    ) -> Result<Stored, EngineError> {
        self.store
            .load(core, id, actor.visibility())
            .await
            .map_err(|e| EngineError::from_index(e, correlation_id))?
            .ok_or_else(|| EngineError::not_found(core, id))
    }

    /// Validate and store a new record with status `new`.
    pub async fn create(
        &self,
        actor: &Actor,
        core: Core,
        value: Value,
    ) -> Result<SaveReport, EngineError> {
        let cid = new_correlation_id();
        let span = info_span!("create", correlation_id = %cid, core = %core, user = %actor.user);
        self.create_record(actor, core, value, &cid)
            .instrument(span)
            .await
    }

    async fn create_record(
        &self,
        actor: &Actor,
        core: Core,
        mut value: Value,
        cid: &str,
    ) -> Result<SaveReport, EngineError> {
        prefill(core, &mut value, actor);
        let mut record =
            schema::validate_record(core, value).map_err(EngineError::ValidationFailed)?;

        let id = record.id().to_string();
        let exists = self
            .store
            .exists(core, &id)
            .await
            .map_err(|e| EngineError::from_index(e, cid))?;
        if exists {
            return Err(EngineError::conflict(format!("{} {} already exists", core, id)));
        }

        let current = record.envelope().editorial_status;
        let Outcome::Status(status) = workflow::advance(Event::Create, current, actor.role)?
        else {
            return Err(EngineError::conflict("create cannot purge"));
        };
        let envelope = record.envelope_mut();
        envelope.editorial_status = status;
        envelope.deskman = Some(actor.user.clone());
        envelope.locked = false;
        envelope.created = None;
        envelope.touch(now());

        let mut warnings = self
            .store
            .write(&record, false)
            .await
            .map_err(|e| EngineError::from_index(e, cid))?;
        warnings.extend(self.reconciler.reconcile(&record).await);

        info!(id = %id, warnings = warnings.len(), "Record created");
        Ok(SaveReport::new(&record, warnings))
    }

    /// Replace a stored record with a new submission.
    ///
    /// A person whose GND now differs from its id is re-keyed: the record moves to
    /// the GND, the old id is kept in `same_as` and the old document is removed.
    pub async fn update(
        &self,
        actor: &Actor,
        core: Core,
        id: &str,
        value: Value,
    ) -> Result<SaveReport, EngineError> {
        let cid = new_correlation_id();
        let span = info_span!("update", correlation_id = %cid, core = %core, id = %id, user = %actor.user);
        self.update_record(actor, core, id, value, &cid)
            .instrument(span)
            .await
    }

    async fn update_record(
        &self,
        actor: &Actor,
        core: Core,
        id: &str,
        mut value: Value,
        cid: &str,
    ) -> Result<SaveReport, EngineError> {
        let stored = self.load_existing(actor, core, id, cid).await?;
        if stored.is_locked() {
            return Err(EngineError::conflict(format!("{} {} is locked", core, id)));
        }

        carry_envelope(&mut value, &stored.record);
        let check = schema::validate_update(&stored.record, value)
            .map_err(EngineError::ValidationFailed)?;
        let mut record = check.record;

        let previous = stored.record.envelope();
        let requested = record.envelope().editorial_status;
        let Outcome::Status(status) = workflow::advance(
            Event::Update { requested },
            previous.editorial_status,
            actor.role,
        )?
        else {
            return Err(EngineError::conflict("update cannot purge"));
        };
        let envelope = record.envelope_mut();
        envelope.editorial_status = status;
        envelope.deskman = Some(actor.user.clone());
        envelope.locked = false;
        envelope.created = previous.created;
        for alias in &previous.same_as {
            envelope.add_alias(alias.clone());
        }
        envelope.touch(now());

        let new_id = match &record {
            Record::Person(person) => person.preferred_id().to_string(),
            _ => id.to_string(),
        };
        if new_id != id {
            let taken = self
                .store
                .exists(core, &new_id)
                .await
                .map_err(|e| EngineError::from_index(e, cid))?;
            if taken {
                return Err(EngineError::conflict(format!(
                    "{} {} already exists",
                    core, new_id
                )));
            }
            let envelope = record.envelope_mut();
            envelope.id = new_id.clone();
            envelope.add_alias(id);
        }

        let lock = RecordLock::acquire(&self.store, core, id)
            .await
            .map_err(|e| EngineError::from_index(e, cid))?;
        let written = self.commit(&record, id).await;
        let release = lock.release_or_warn(&self.store).await;
        let mut warnings = written.map_err(|e| EngineError::from_index(e, cid))?;
        warnings.extend(release);

        if !check.hidden_fields.is_empty() {
            warnings.push(Warning::new(
                WarningKind::HiddenFields,
                record.id(),
                format!(
                    "fields not shown for this pubtype: {}",
                    check.hidden_fields.join(", ")
                ),
            ));
        }
        warnings.extend(self.reconciler.reconcile(&record).await);

        info!(id = %record.id(), status = %status, warnings = warnings.len(), "Record updated");
        let mut report = SaveReport::new(&record, warnings);
        report.hidden_fields = check.hidden_fields;
        Ok(report)
    }

    /// Write `record` while `locked_id` is held. A record that moved to a new id
    /// is written unlocked and the old document removed.
    async fn commit(&self, record: &Record, locked_id: &str) -> Result<Vec<Warning>, IndexError> {
        if record.id() == locked_id {
            return self.store.write(record, true).await;
        }
        let warnings = self.store.write(record, false).await?;
        self.store.purge(record.core(), locked_id).await?;
        info!(from = %locked_id, to = %record.id(), "Record re-keyed");
        Ok(warnings)
    }

    /// Admin delete marks the record `deleted`; superadmin delete purges it.
    /// Back-references on linked records are left in place.
    pub async fn delete(
        &self,
        actor: &Actor,
        core: Core,
        id: &str,
    ) -> Result<SaveReport, EngineError> {
        let cid = new_correlation_id();
        let span = info_span!("delete", correlation_id = %cid, core = %core, id = %id, user = %actor.user);
        self.delete_record(actor, core, id, &cid)
            .instrument(span)
            .await
    }

    async fn delete_record(
        &self,
        actor: &Actor,
        core: Core,
        id: &str,
        cid: &str,
    ) -> Result<SaveReport, EngineError> {
        let stored = self.load_existing(actor, core, id, cid).await?;
        if stored.is_locked() {
            return Err(EngineError::conflict(format!("{} {} is locked", core, id)));
        }
        let status = stored.record.envelope().editorial_status;

        match workflow::advance(Event::Delete, status, actor.role)? {
            Outcome::Purge => {
                self.store
                    .purge(core, id)
                    .await
                    .map_err(|e| EngineError::from_index(e, cid))?;
                info!(id = %id, "Record purged");
                Ok(SaveReport {
                    core,
                    id: id.to_string(),
                    status: None,
                    warnings: Vec::new(),
                    hidden_fields: Vec::new(),
                })
            }
            Outcome::Status(next) => {
                let mut record = stored.record;
                let envelope = record.envelope_mut();
                envelope.editorial_status = next;
                envelope.deskman = Some(actor.user.clone());
                envelope.touch(now());

                let lock = RecordLock::acquire(&self.store, core, id)
                    .await
                    .map_err(|e| EngineError::from_index(e, cid))?;
                let written = self.store.write(&record, true).await;
                let release = lock.release_or_warn(&self.store).await;
                let mut warnings = written.map_err(|e| EngineError::from_index(e, cid))?;
                warnings.extend(release);

                info!(id = %id, "Record marked deleted");
                Ok(SaveReport::new(&record, warnings))
            }
        }
    }

    /// Read a record. Deleted records are only visible to superadmins.
    pub async fn get(&self, actor: &Actor, core: Core, id: &str) -> Result<Record, EngineError> {
        let cid = new_correlation_id();
        let stored = self
            .store
            .load(core, id, actor.visibility())
            .await
            .map_err(|e| EngineError::from_index(e, &cid))?;
        stored
            .map(|s| s.record)
            .ok_or_else(|| EngineError::not_found(core, id))
    }

    pub async fn find(
        &self,
        actor: &Actor,
        core: Core,
        request: SearchRequest,
    ) -> Result<SearchPage, EngineError> {
        let cid = new_correlation_id();
        self.store
            .gateway()
            .find(core, request, actor.visibility())
            .await
            .map_err(|e| EngineError::from_index(e, &cid))
    }

    /// CSL item for a work, with its first host resolved.
    pub async fn citation(&self, actor: &Actor, id: &str) -> Result<CslItem, EngineError> {
        let Record::Work(work) = self.get(actor, Core::Work, id).await? else {
            return Err(EngineError::not_found(Core::Work, id));
        };
        let host = match work.host_ids().next() {
            Some(host_id) => match self.get(actor, Core::Work, host_id).await {
                Ok(Record::Work(host)) => HostContext::of(&host),
                Ok(_) | Err(EngineError::NotFound { .. }) => HostContext::none(),
                Err(e) => return Err(e),
            },
            None => HostContext::none(),
        };
        Ok(citation::to_csl(&work, &host))
    }

    /// Store a record from a snapshot. Ids are preserved, so importing the same
    /// record twice overwrites it.
    pub async fn import(
        &self,
        actor: &Actor,
        core: Core,
        value: Value,
    ) -> Result<SaveReport, EngineError> {
        let cid = new_correlation_id();
        let span = info_span!("import", correlation_id = %cid, core = %core);
        self.import_record(actor, core, value, &cid)
            .instrument(span)
            .await
    }

    async fn import_record(
        &self,
        actor: &Actor,
        core: Core,
        mut value: Value,
        cid: &str,
    ) -> Result<SaveReport, EngineError> {
        let supplied = str_field(&value, "editorial_status")
            .parse::<EditorialStatus>()
            .unwrap_or_default();
        let Outcome::Status(status) =
            workflow::advance(Event::Import { supplied }, supplied, actor.role)?
        else {
            return Err(EngineError::conflict("import cannot purge"));
        };

        prefill(core, &mut value, actor);
        let mut record =
            schema::validate_record(core, value).map_err(EngineError::ValidationFailed)?;

        let existing = self
            .store
            .load(core, record.id(), Visibility::All)
            .await
            .map_err(|e| EngineError::from_index(e, cid))?;
        if existing.as_ref().is_some_and(Stored::is_locked) {
            return Err(EngineError::conflict(format!(
                "{} {} is locked",
                core,
                record.id()
            )));
        }

        let envelope = record.envelope_mut();
        envelope.editorial_status = status;
        envelope.locked = false;
        envelope.touch(now());

        let mut warnings = self
            .store
            .write(&record, false)
            .await
            .map_err(|e| EngineError::from_index(e, cid))?;
        warnings.extend(self.reconciler.reconcile(&record).await);
        if existing.is_some() {
            warn!(id = %record.id(), "Import overwrote an existing record");
        }
        Ok(SaveReport::new(&record, warnings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefill_keys_person_by_gnd() {
        let actor = Actor::new("editor", Role::User).with_catalog(Catalog::Rub);
        let mut value = json!({ "id": "c0ffee", "name": "Doe, Jane", "gnd": "123456789" });
        prefill(Core::Person, &mut value, &actor);
        assert_eq!(value["id"], "123456789");
        assert_eq!(value["same_as"], json!(["c0ffee"]));
        assert_eq!(value["owner"], json!(["editor"]));
        assert_eq!(value["catalog"], json!(["Ruhr-Universität Bochum"]));
    }

    #[test]
    fn test_prefill_assigns_fresh_ids() {
        let actor = Actor::new("editor", Role::User);
        let mut value = json!({ "pubtype": "Monograph", "title": "T", "owner": ["a"] });
        prefill(Core::Work, &mut value, &actor);
        let id = value["id"].as_str().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(value["owner"], json!(["a"]));
        assert!(value.get("catalog").is_none());
    }

    #[test]
    fn test_carry_envelope_keeps_id_and_tenancy() {
        let mut stored = catalog_shared::Person::new("P1", "Doe, Jane");
        stored.envelope.owner = vec!["editor".into()];
        stored.envelope.catalog = vec![Catalog::Tudo];
        let stored = Record::from(stored);
        let mut value = json!({ "id": "other", "name": "Doe, Jane" });
        carry_envelope(&mut value, &stored);
        assert_eq!(value["id"], "P1");
        assert_eq!(value["catalog"], json!(["Technische Universität Dortmund"]));
        assert_eq!(value["editorial_status"], "new");
    }
}
