//! Person (researcher) records.

use serde::{Deserialize, Serialize};

use super::envelope::{Catalog, Envelope};

/// Affiliation of a person with an organisation over a labelled time span.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Affiliation {
    #[serde(default)]
    pub organisation_id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
}

/// Membership of a person in a working group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GroupMembership {
    #[serde(default)]
    pub group_id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
}

/// A URL with a typed label (`homepage`, `profile`, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct UrlEntry {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Person {
    #[serde(flatten)]
    pub envelope: Envelope,
    /// "Family, Given".
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub also_known_as: Vec<String>,
    #[serde(default)]
    pub gnd: String,
    #[serde(default)]
    pub orcid: String,
    #[serde(default)]
    pub viaf: String,
    #[serde(default)]
    pub isni: String,
    #[serde(default)]
    pub researcher_id: String,
    #[serde(default)]
    pub scopus_id: String,
    #[serde(default)]
    pub arxiv_id: String,
    #[serde(default)]
    pub affiliation: Vec<Affiliation>,
    #[serde(default)]
    pub group: Vec<GroupMembership>,
    #[serde(default)]
    pub url: Vec<UrlEntry>,
    #[serde(default)]
    pub status: Vec<String>,
    /// Catalogs this person counts as a member of.
    #[serde(default)]
    pub member_of: Vec<Catalog>,
    #[serde(default)]
    pub research_interest: Vec<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub note: String,
}

impl Person {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            envelope: Envelope::new(id),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Family name part of "Family, Given".
    pub fn family_name(&self) -> &str {
        split_name(&self.name).0
    }

    /// Given name part of "Family, Given"; empty when no comma is present.
    pub fn given_name(&self) -> &str {
        split_name(&self.name).1
    }

    /// The id a person should be stored under: the GND id when present,
    /// otherwise whatever id the record already carries.
    pub fn preferred_id(&self) -> &str {
        let gnd = self.gnd.trim();
        if gnd.is_empty() {
            &self.envelope.id
        } else {
            gnd
        }
    }
}

/// Split a "Family, Given" display name. Names without a comma are treated as a
/// bare family name.
pub fn split_name(name: &str) -> (&str, &str) {
    match name.split_once(',') {
        Some((family, given)) => (family.trim(), given.trim()),
        None => (name.trim(), ""),
    }
}
