//! Entity kinds and the record sum type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::envelope::Envelope;
use super::group::WorkingGroup;
use super::organisation::Organisation;
use super::person::Person;
use super::work::Work;

/// A named logical partition of the document store holding one entity kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Core {
    Work,
    Person,
    Organisation,
    Group,
}

impl Core {
    pub fn as_str(&self) -> &'static str {
        match self {
            Core::Work => "work",
            Core::Person => "person",
            Core::Organisation => "organisation",
            Core::Group => "group",
        }
    }

    pub fn all() -> &'static [Core] {
        &[Core::Work, Core::Person, Core::Organisation, Core::Group]
    }
}

impl fmt::Display for Core {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Core {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "work" | "works" | "publication" | "hb2" => Ok(Core::Work),
            "person" | "persons" => Ok(Core::Person),
            "organisation" | "organisations" | "organization" => Ok(Core::Organisation),
            "group" | "groups" => Ok(Core::Group),
            other => Err(format!("unknown core '{}'", other)),
        }
    }
}

/// A record of any entity kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Record {
    Work(Box<Work>),
    Person(Person),
    Organisation(Organisation),
    Group(WorkingGroup),
}

impl Record {
    pub fn core(&self) -> Core {
        match self {
            Record::Work(_) => Core::Work,
            Record::Person(_) => Core::Person,
            Record::Organisation(_) => Core::Organisation,
            Record::Group(_) => Core::Group,
        }
    }

    pub fn envelope(&self) -> &Envelope {
        match self {
            Record::Work(w) => &w.envelope,
            Record::Person(p) => &p.envelope,
            Record::Organisation(o) => &o.envelope,
            Record::Group(g) => &g.envelope,
        }
    }

    pub fn envelope_mut(&mut self) -> &mut Envelope {
        match self {
            Record::Work(w) => &mut w.envelope,
            Record::Person(p) => &mut p.envelope,
            Record::Organisation(o) => &mut o.envelope,
            Record::Group(g) => &mut g.envelope,
        }
    }

    pub fn id(&self) -> &str {
        &self.envelope().id
    }

    /// Human readable label: title for works, name for persons, preferred label otherwise.
    pub fn label(&self) -> &str {
        match self {
            Record::Work(w) => &w.title,
            Record::Person(p) => &p.name,
            Record::Organisation(o) => &o.pref_label,
            Record::Group(g) => &g.pref_label,
        }
    }

    /// Deserialise a blob value for the given core.
    pub fn from_value(core: Core, value: Value) -> serde_json::Result<Self> {
        Ok(match core {
            Core::Work => Record::Work(Box::new(serde_json::from_value(value)?)),
            Core::Person => Record::Person(serde_json::from_value(value)?),
            Core::Organisation => Record::Organisation(serde_json::from_value(value)?),
            Core::Group => Record::Group(serde_json::from_value(value)?),
        })
    }

    /// Deserialise a `wtf_json` blob for the given core.
    pub fn from_blob(core: Core, blob: &str) -> serde_json::Result<Self> {
        let value: Value = serde_json::from_str(blob)?;
        Self::from_value(core, value)
    }

    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Serialise into the canonical `wtf_json` blob.
    pub fn to_blob(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn as_work(&self) -> Option<&Work> {
        match self {
            Record::Work(w) => Some(w.as_ref()),
            _ => None,
        }
    }

    pub fn as_person(&self) -> Option<&Person> {
        match self {
            Record::Person(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_organisation(&self) -> Option<&Organisation> {
        match self {
            Record::Organisation(o) => Some(o),
            _ => None,
        }
    }
}

impl From<Work> for Record {
    fn from(work: Work) -> Self {
        Record::Work(Box::new(work))
    }
}

impl From<Person> for Record {
    fn from(person: Person) -> Self {
        Record::Person(person)
    }
}

impl From<Organisation> for Record {
    fn from(organisation: Organisation) -> Self {
        Record::Organisation(organisation)
    }
}

impl From<WorkingGroup> for Record {
    fn from(group: WorkingGroup) -> Self {
        Record::Group(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::work::PubType;

    #[test]
    fn test_core_parse_aliases() {
        assert_eq!("works".parse::<Core>().unwrap(), Core::Work);
        assert_eq!("organization".parse::<Core>().unwrap(), Core::Organisation);
        assert!("journal".parse::<Core>().is_err());
    }

    #[test]
    fn test_blob_round_trip_per_core() {
        let records: Vec<Record> = vec![
            Work::new("W1", PubType::Monograph, "Book").into(),
            Person::new("P1", "Doe, Jane").into(),
            Organisation::new("O1", "Faculty of Physics").into(),
            WorkingGroup::new("G1", "Optics Lab").into(),
        ];
        for record in records {
            let blob = record.to_blob().unwrap();
            let back = Record::from_blob(record.core(), &blob).unwrap();
            assert_eq!(back, record);
        }
    }

    #[test]
    fn test_from_blob_requires_pubtype_for_works() {
        assert!(Record::from_blob(Core::Work, r#"{"id":"W1","title":"x"}"#).is_err());
    }
}
