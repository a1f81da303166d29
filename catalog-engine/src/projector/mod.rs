//! Record projection.
//!
//! A record is flattened into an [`IndexDocument`]: envelope fields map directly,
//! the full record goes into the `wtf_json` blob, and linked entities are
//! denormalised into facet fields. Projection itself is pure. Everything it needs
//! from other cores is fetched beforehand into a [`Snapshot`].

pub mod dates;
mod group;
mod organisation;
mod person;
pub mod subjects;
mod work;

use std::collections::{BTreeSet, HashMap};

use catalog_repository::{IndexError, IndexGateway};
use catalog_shared::types::envelope::index_time;
use catalog_shared::{fields, Core, Envelope, IndexDocument, Record, Visibility};
use serde_json::Value;
use tracing::debug;

use crate::errors::Warning;

/// Projected field names shared with the dedup generator and the citation bridge.
pub mod names {
    /// `gnd#<gnd>#<display name>` and `orcid#<orcid>#<display name>` tokens.
    pub const PERSON_AUTHORITY: &str = "person_authority";
    /// `<gnd>#<display name>` tokens.
    pub const PND: &str = "pnd";
    pub const FPERSON: &str = "fperson";
    /// Lowercased family name of a person record.
    pub const NAME_FAMILY: &str = "name_family";
    /// Lowercased given-name tokens of a person record.
    pub const NAME_GIVEN: &str = "name_given";
    pub const MEMBER_OF: &str = "member_of";
    pub const IS_PART_OF_ID: &str = "is_part_of_id";
    pub const HAS_PART_ID: &str = "has_part_id";
    pub const ISXN: &str = "isxn";
}

/// Documents of other cores a projection may read, keyed by core and id.
#[derive(Debug, Default, Clone)]
pub struct Snapshot {
    docs: HashMap<Core, HashMap<String, IndexDocument>>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, core: Core, doc: IndexDocument) {
        if let Some(id) = doc.id().map(str::to_string) {
            self.docs.entry(core).or_default().insert(id, doc);
        }
    }

    pub fn get(&self, core: Core, id: &str) -> Option<&IndexDocument> {
        self.docs.get(&core).and_then(|docs| docs.get(id))
    }

    /// Label of a referenced record, if it is in the snapshot.
    pub fn label(&self, core: Core, id: &str) -> Option<&str> {
        let field = match core {
            Core::Work => "title",
            Core::Person => "name",
            Core::Organisation | Core::Group => "pref_label",
        };
        self.get(core, id).and_then(|doc| doc.get_str(field))
    }

    /// Fetch every record `record` references, regardless of status.
    pub async fn load(gateway: &IndexGateway, record: &Record) -> Result<Self, IndexError> {
        let mut snapshot = Self::new();
        for (core, ids) in references(record) {
            if ids.is_empty() {
                continue;
            }
            let ids: Vec<String> = ids.into_iter().collect();
            let docs = gateway.get(core, &ids, Visibility::All).await?;
            debug!(core = %core, requested = ids.len(), found = docs.len(), "Loaded references");
            for doc in docs {
                snapshot.insert(core, doc);
            }
        }
        Ok(snapshot)
    }
}

fn ids<'a>(values: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
    values
        .into_iter()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Ids per core that projecting `record` reads.
pub fn references(record: &Record) -> Vec<(Core, BTreeSet<String>)> {
    match record {
        Record::Work(work) => {
            let linked = ids(work
                .host_ids()
                .chain(work.part_ids())
                .chain(work.other_version_ids()));
            vec![
                (Core::Work, linked),
                (Core::Person, ids(work.person.iter().map(|p| p.gnd.as_str()))),
                (
                    Core::Organisation,
                    ids(work.affiliation_context.iter().map(String::as_str)),
                ),
                (Core::Group, ids(work.group_context.iter().map(String::as_str))),
            ]
        }
        Record::Person(person) => vec![
            (
                Core::Organisation,
                ids(person.affiliation.iter().map(|a| a.organisation_id.as_str())),
            ),
            (Core::Group, ids(person.group.iter().map(|g| g.group_id.as_str()))),
        ],
        Record::Organisation(org) => vec![(
            Core::Organisation,
            ids(std::iter::once(org.parent_id.as_str()).chain(org.child_ids())),
        )],
        Record::Group(group) => {
            let parent = ids(std::iter::once(group.parent_id.as_str()));
            vec![(Core::Organisation, parent.clone()), (Core::Group, parent)]
        }
    }
}

/// A projected document with the warnings raised while resolving references.
#[derive(Debug, Clone)]
pub struct Projection {
    pub doc: IndexDocument,
    pub warnings: Vec<Warning>,
}

/// Project a record into its index document.
///
/// The stored blob and the `locked` field always start out unlocked; writers
/// holding a lock set the index field themselves.
pub fn project(record: &Record, snapshot: &Snapshot) -> Result<Projection, serde_json::Error> {
    let mut blob = record.to_value()?;
    if let Value::Object(map) = &mut blob {
        map.insert(fields::LOCKED.to_string(), Value::Bool(false));
    }

    let mut doc = IndexDocument::new(record.id());
    doc.set(fields::WTF_JSON, serde_json::to_string(&blob)?);
    envelope_fields(&mut doc, record.envelope());

    let mut warnings = Vec::new();
    match record {
        Record::Work(w) => work::project(w, snapshot, &mut doc, &mut warnings),
        Record::Person(p) => person::project(p, snapshot, &mut doc),
        Record::Organisation(o) => organisation::project(o, snapshot, &mut doc),
        Record::Group(g) => group::project(g, snapshot, &mut doc),
    }
    Ok(Projection { doc, warnings })
}

fn envelope_fields(doc: &mut IndexDocument, envelope: &Envelope) {
    doc.set(fields::LOCKED, false);
    doc.set(fields::EDITORIAL_STATUS, envelope.editorial_status.as_str());
    if let Some(created) = &envelope.created {
        doc.set(fields::CREATED, index_time(created));
    }
    if let Some(changed) = &envelope.changed {
        doc.set(fields::CHANGED, index_time(changed));
    }
    doc.set(
        fields::CATALOG,
        envelope
            .catalog
            .iter()
            .map(|c| c.as_str().to_string())
            .collect::<Vec<_>>(),
    );
    doc.set(fields::OWNER, envelope.owner.clone());
    if let Some(deskman) = &envelope.deskman {
        doc.set_nonempty(fields::DESKMAN, deskman);
    }
    doc.set(fields::SAME_AS, envelope.same_as.clone());
}

/// Deserialise the blob of an index document.
pub fn record_from_doc(core: Core, doc: &IndexDocument) -> Result<Record, serde_json::Error> {
    let blob = doc.blob().unwrap_or("{}");
    Record::from_blob(core, blob)
}
