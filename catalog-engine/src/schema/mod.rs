//! Entity schemas and validators.
//!
//! A schema is chosen per record: publications are validated against the
//! sub-schema of their pubtype, the other cores against a single table. Each
//! variant can validate, normalise and enumerate the sub-records of a blob value.
//!
//! Descriptor tables are assembled once per process into a [`SchemaRegistry`].

pub mod fields;
pub mod identifiers;
pub mod validate;
pub mod vocabulary;

use std::collections::HashMap;
use std::sync::OnceLock;

use catalog_shared::{Core, PubType, Record};
use serde_json::{Map, Value};

use crate::errors::{FieldError, FieldErrorKind};
use fields::{FieldKind, FieldSpec};
use validate::{is_blank, Walker};
use vocabulary::Vocabulary;

/// Descriptor tables per core, envelope included, plus the field names each
/// pubtype declares.
pub struct SchemaRegistry {
    tables: HashMap<Core, Vec<FieldSpec>>,
    declared: HashMap<PubType, Vec<&'static str>>,
}

impl SchemaRegistry {
    fn build() -> Self {
        let with_envelope = |payload: &[FieldSpec]| -> Vec<FieldSpec> {
            fields::ENVELOPE.iter().chain(payload).copied().collect()
        };
        let tables = HashMap::from([
            (Core::Work, with_envelope(fields::WORK)),
            (Core::Person, with_envelope(fields::PERSON)),
            (Core::Organisation, with_envelope(fields::ORGANISATION)),
            (Core::Group, with_envelope(fields::GROUP)),
        ]);
        let declared = PubType::all()
            .iter()
            .map(|t| {
                let names = fields::WORK
                    .iter()
                    .filter(|spec| spec.applies_to(*t))
                    .map(|spec| spec.name)
                    .collect();
                (*t, names)
            })
            .collect();
        Self { tables, declared }
    }

    pub fn table(&self, core: Core) -> &[FieldSpec] {
        self.tables.get(&core).map(Vec::as_slice).unwrap_or_default()
    }

    /// Payload field names the sub-schema of `pubtype` declares.
    pub fn declared_fields(&self, pubtype: PubType) -> &[&'static str] {
        self.declared
            .get(&pubtype)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

static REGISTRY: OnceLock<SchemaRegistry> = OnceLock::new();

pub fn registry() -> &'static SchemaRegistry {
    REGISTRY.get_or_init(SchemaRegistry::build)
}

/// The schema a record is validated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntitySchema {
    Publication(PubType),
    Person,
    Organisation,
    Group,
}

/// A nested sub-record found while iterating a blob.
#[derive(Debug, Clone, PartialEq)]
pub struct SubRecord<'a> {
    pub path: String,
    pub field: &'static str,
    pub value: &'a Map<String, Value>,
}

/// Result of validating an update against the stored record.
#[derive(Debug)]
pub struct UpdateCheck {
    pub record: Record,
    /// Populated fields of the stored record that the new pubtype does not declare.
    pub hidden_fields: Vec<String>,
}

impl EntitySchema {
    /// Pick the schema for a blob value of the given core. Publications need a
    /// recognisable `pubtype`.
    pub fn for_value(core: Core, value: &Value) -> Result<Self, Vec<FieldError>> {
        match core {
            Core::Work => {
                let token = value.get("pubtype").and_then(Value::as_str).unwrap_or("");
                Vocabulary::PubType
                    .canonical(token)
                    .and_then(|t| t.parse().ok())
                    .map(EntitySchema::Publication)
                    .ok_or_else(|| {
                        vec![FieldError::new(
                            "pubtype",
                            if token.trim().is_empty() {
                                FieldErrorKind::Required
                            } else {
                                FieldErrorKind::Enumeration
                            },
                            format!("'{}' is not a known pubtype", token),
                        )]
                    })
            }
            Core::Person => Ok(EntitySchema::Person),
            Core::Organisation => Ok(EntitySchema::Organisation),
            Core::Group => Ok(EntitySchema::Group),
        }
    }

    pub fn core(&self) -> Core {
        match self {
            EntitySchema::Publication(_) => Core::Work,
            EntitySchema::Person => Core::Person,
            EntitySchema::Organisation => Core::Organisation,
            EntitySchema::Group => Core::Group,
        }
    }

    fn pubtype(&self) -> Option<PubType> {
        match self {
            EntitySchema::Publication(t) => Some(*t),
            _ => None,
        }
    }

    pub fn fields(&self) -> &'static [FieldSpec] {
        registry().table(self.core())
    }

    /// Normalise a blob value and check it. Returns the normalised value, or every
    /// violation found.
    pub fn normalise(&self, value: Value) -> Result<Value, Vec<FieldError>> {
        let Value::Object(mut map) = value else {
            return Err(vec![FieldError::new(
                "",
                FieldErrorKind::Type,
                "a record must be a JSON object",
            )]);
        };
        let mut walker = Walker::new(self.pubtype());
        walker.object(self.fields(), &mut map, "");
        if walker.errors.is_empty() {
            Ok(Value::Object(map))
        } else {
            Err(walker.errors)
        }
    }

    /// Violations of `value` without keeping the normalised form.
    pub fn validate(&self, value: &Value) -> Vec<FieldError> {
        self.normalise(value.clone()).err().unwrap_or_default()
    }

    /// Every nested sub-record of the value, in descriptor order.
    pub fn sub_records<'a>(&self, value: &'a Value) -> Vec<SubRecord<'a>> {
        let mut found = Vec::new();
        if let Value::Object(map) = value {
            collect_sub_records(self.fields(), map, "", &mut found);
        }
        found
    }

    /// Populated payload fields of `stored` that this schema does not declare.
    pub fn hidden_fields(&self, stored: &Value) -> Vec<String> {
        let Some(pubtype) = self.pubtype() else {
            return Vec::new();
        };
        let declared = registry().declared_fields(pubtype);
        fields::WORK
            .iter()
            .filter(|spec| !declared.contains(&spec.name))
            .filter(|spec| stored.get(spec.name).is_some_and(|v| !is_blank(v)))
            .map(|spec| spec.name.to_string())
            .collect()
    }
}

fn collect_sub_records<'a>(
    specs: &[FieldSpec],
    map: &'a Map<String, Value>,
    prefix: &str,
    found: &mut Vec<SubRecord<'a>>,
) {
    for spec in specs {
        let FieldKind::Record(nested) = spec.kind else {
            continue;
        };
        let path = if prefix.is_empty() {
            spec.name.to_string()
        } else {
            format!("{}.{}", prefix, spec.name)
        };
        let entries: Vec<(String, &Map<String, Value>)> = match map.get(spec.name) {
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .filter_map(|(i, item)| item.as_object().map(|m| (format!("{}[{}]", path, i), m)))
                .collect(),
            Some(Value::Object(m)) => vec![(path.clone(), m)],
            _ => Vec::new(),
        };
        for (entry_path, entry) in entries {
            collect_sub_records(nested, entry, &entry_path, found);
            found.push(SubRecord {
                path: entry_path,
                field: spec.name,
                value: entry,
            });
        }
    }
}

/// Validate and normalise a record for the given core and deserialise it.
pub fn validate_record(core: Core, value: Value) -> Result<Record, Vec<FieldError>> {
    let schema = EntitySchema::for_value(core, &value)?;
    let normalised = schema.normalise(value)?;
    Record::from_value(core, normalised).map_err(|e| {
        vec![FieldError::new("", FieldErrorKind::Type, e.to_string())]
    })
}

/// Validate `next` as a replacement of `stored`. Fields the new pubtype hides are
/// reported and carried over from the stored record when the submission left
/// them empty, so they survive in the blob.
pub fn validate_update(stored: &Record, next: Value) -> Result<UpdateCheck, Vec<FieldError>> {
    let core = stored.core();
    let schema = EntitySchema::for_value(core, &next)?;
    let stored_value = stored
        .to_value()
        .map_err(|e| vec![FieldError::new("", FieldErrorKind::Type, e.to_string())])?;
    let hidden_fields = schema.hidden_fields(&stored_value);

    let mut next = next;
    if let (Value::Object(target), Value::Object(source)) = (&mut next, &stored_value) {
        for name in &hidden_fields {
            let empty = target.get(name.as_str()).map_or(true, is_blank);
            if empty {
                if let Some(previous) = source.get(name.as_str()) {
                    target.insert(name.clone(), previous.clone());
                }
            }
        }
    }

    let normalised = schema.normalise(next)?;
    let record = Record::from_value(core, normalised)
        .map_err(|e| vec![FieldError::new("", FieldErrorKind::Type, e.to_string())])?;
    Ok(UpdateCheck {
        record,
        hidden_fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_shared::Work;
    use serde_json::json;

    fn work_value(pubtype: &str) -> Value {
        json!({
            "id": "W1",
            "catalog": ["Technische Universität Dortmund"],
            "owner": ["editor"],
            "pubtype": pubtype,
            "title": "Title"
        })
    }

    #[test]
    fn test_registry_is_shared() {
        let a = registry() as *const SchemaRegistry;
        let b = registry() as *const SchemaRegistry;
        assert_eq!(a, b);
        assert!(registry().table(Core::Person).iter().any(|f| f.name == "orcid"));
        assert!(registry()
            .declared_fields(PubType::Patent)
            .contains(&"patent_number"));
        assert!(!registry()
            .declared_fields(PubType::Monograph)
            .contains(&"patent_number"));
    }

    #[test]
    fn test_unknown_pubtype_is_rejected() {
        let errors = validate_record(Core::Work, work_value("Pamphlet")).unwrap_err();
        assert_eq!(errors[0].path, "pubtype");
        assert_eq!(errors[0].kind, FieldErrorKind::Enumeration);
    }

    #[test]
    fn test_validate_record_round_trips() {
        let record = validate_record(Core::Work, work_value("Monograph")).unwrap();
        let work = record.as_work().unwrap();
        assert_eq!(work.pubtype, PubType::Monograph);
        let again = validate_record(Core::Work, record.to_value().unwrap()).unwrap();
        assert_eq!(again, record);
    }

    #[test]
    fn test_sub_records_are_enumerated() {
        let mut value = work_value("ArticleJournal");
        value["person"] = json!([{ "name": "Doe, Jane" }, { "name": "Roe, Rick" }]);
        value["is_part_of"] = json!([{ "is_part_of": "J1", "volume": "3" }]);
        let schema = EntitySchema::for_value(Core::Work, &value).unwrap();
        let subs = schema.sub_records(&value);
        let paths: Vec<_> = subs.iter().map(|s| s.path.as_str()).collect();
        assert_eq!(paths, vec!["person[0]", "person[1]", "is_part_of[0]"]);
    }

    #[test]
    fn test_pubtype_change_hides_fields_and_keeps_them() {
        let mut stored = Work::new("W1", PubType::Patent, "Widget");
        stored.envelope.catalog = vec![catalog_shared::Catalog::Tudo];
        stored.envelope.owner = vec!["editor".into()];
        stored.patent_number = Some("EP123".into());
        let stored = Record::from(stored);

        let mut next = stored.to_value().unwrap();
        next["pubtype"] = json!("Monograph");
        next["patent_number"] = Value::Null;

        let check = validate_update(&stored, next).unwrap();
        assert_eq!(check.hidden_fields, vec!["patent_number".to_string()]);
        let work = check.record.as_work().unwrap();
        assert_eq!(work.pubtype, PubType::Monograph);
        assert_eq!(work.patent_number.as_deref(), Some("EP123"));
    }
}
