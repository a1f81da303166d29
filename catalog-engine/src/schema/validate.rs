//! Normalisation and constraint checks over blob values.
//!
//! The walker rewrites a record's JSON value in place (trimmed strings, blank
//! repeat entries dropped, enumeration tokens replaced by canonical ids) and
//! collects every violation with its field path instead of stopping at the first.

use catalog_shared::PubType;
use serde_json::{Map, Value};

use super::fields::{FieldKind, FieldSpec, Pattern};
use super::identifiers;
use crate::errors::{FieldError, FieldErrorKind};

/// Walk state shared by one validation run.
pub(crate) struct Walker {
    pubtype: Option<PubType>,
    pub(crate) errors: Vec<FieldError>,
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

/// Whether a value carries no content. Flags never count as content, so a
/// sub-record holding only `false`/`true` switches is blank.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(_) => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Number(_) => false,
        Value::Array(items) => items.iter().all(is_blank),
        Value::Object(map) => map.values().all(is_blank),
    }
}

fn check_pattern(pattern: Pattern, value: &str) -> Option<(FieldErrorKind, &'static str)> {
    let (ok, kind, message) = match pattern {
        Pattern::Doi => (identifiers::is_doi(value), FieldErrorKind::Pattern, "not a valid DOI"),
        Pattern::IsoDate => (
            identifiers::is_iso_date(value),
            FieldErrorKind::Pattern,
            "expected YYYY, YYYY-MM or YYYY-MM-DD",
        ),
        Pattern::Isbn => (
            identifiers::is_valid_isbn(value),
            FieldErrorKind::Checksum,
            "ISBN checksum does not match",
        ),
        Pattern::Issn => (
            identifiers::is_valid_issn(value),
            FieldErrorKind::Checksum,
            "ISSN checksum does not match",
        ),
        Pattern::Ismn => (
            identifiers::is_valid_ismn(value),
            FieldErrorKind::Checksum,
            "ISMN checksum does not match",
        ),
        Pattern::Gnd => (identifiers::is_gnd(value), FieldErrorKind::Pattern, "not a GND id"),
        Pattern::Orcid => (identifiers::is_orcid(value), FieldErrorKind::Pattern, "not an ORCID"),
        Pattern::Viaf => (identifiers::is_viaf(value), FieldErrorKind::Pattern, "not a VIAF id"),
        Pattern::Isni => (identifiers::is_isni(value), FieldErrorKind::Pattern, "not an ISNI"),
        Pattern::OrganisationAuthority => (
            identifiers::is_organisation_authority(value),
            FieldErrorKind::Pattern,
            "expected a GND, VIAF or ISNI id",
        ),
        Pattern::Uri => (identifiers::is_uri(value), FieldErrorKind::Pattern, "not a URL"),
        Pattern::Email => (
            identifiers::is_email(value),
            FieldErrorKind::Pattern,
            "not an email address",
        ),
    };
    (!ok).then_some((kind, message))
}

impl Walker {
    pub(crate) fn new(pubtype: Option<PubType>) -> Self {
        Self {
            pubtype,
            errors: Vec::new(),
        }
    }

    fn error(&mut self, path: &str, kind: FieldErrorKind, message: impl Into<String>) {
        self.errors.push(FieldError::new(path, kind, message));
    }

    fn is_required(&self, spec: &FieldSpec) -> bool {
        spec.required
            || self
                .pubtype
                .is_some_and(|t| spec.required_for.contains(&t))
    }

    /// Normalise and check the fields of one object. Keys without a descriptor
    /// are left untouched.
    pub(crate) fn object(&mut self, specs: &[FieldSpec], map: &mut Map<String, Value>, prefix: &str) {
        for spec in specs {
            let path = join(prefix, spec.name);
            // Fields that do not apply to the pubtype are kept but never rejected.
            let check = self.pubtype.map_or(true, |t| spec.applies_to(t));
            let required = check && self.is_required(spec);

            let Some(value) = map.get_mut(spec.name) else {
                if required {
                    self.error(&path, FieldErrorKind::Required, "missing");
                }
                continue;
            };

            if spec.repeatable {
                self.repeated(spec, value, &path, check);
            } else {
                self.single(spec, value, &path, check);
            }

            if required && is_blank(value) {
                self.error(&path, FieldErrorKind::Required, "must not be empty");
            }
        }
    }

    fn repeated(&mut self, spec: &FieldSpec, value: &mut Value, path: &str, check: bool) {
        let mut items = match value.take() {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            single => vec![single],
        };
        items.retain(|item| !is_blank(item) || matches!(spec.kind, FieldKind::Flag));

        for (i, item) in items.iter_mut().enumerate() {
            self.single(spec, item, &format!("{}[{}]", path, i), check);
        }
        *value = Value::Array(items);
    }

    fn single(&mut self, spec: &FieldSpec, value: &mut Value, path: &str, check: bool) {
        match spec.kind {
            FieldKind::Text => {
                let text = match value.take() {
                    Value::String(s) => s.trim().to_string(),
                    Value::Number(n) => n.to_string(),
                    Value::Null => String::new(),
                    other => {
                        *value = other;
                        if check {
                            self.error(path, FieldErrorKind::Type, "expected a string");
                        }
                        return;
                    }
                };
                let text = match spec.pattern {
                    Some(Pattern::Doi) => identifiers::normalize_doi(&text),
                    _ => text,
                };
                if check && !text.is_empty() {
                    if let Some((kind, message)) =
                        spec.pattern.and_then(|p| check_pattern(p, &text))
                    {
                        self.error(path, kind, format!("{} ('{}')", message, text));
                    }
                }
                *value = Value::String(text);
            }
            FieldKind::Flag => {
                let flag = match &*value {
                    Value::Bool(b) => Some(*b),
                    Value::Null => Some(false),
                    Value::String(s) => match s.trim().to_lowercase().as_str() {
                        "true" | "1" | "yes" | "on" => Some(true),
                        "false" | "0" | "no" | "off" | "" => Some(false),
                        _ => None,
                    },
                    _ => None,
                };
                match flag {
                    Some(b) => *value = Value::Bool(b),
                    None if check => self.error(path, FieldErrorKind::Type, "expected a boolean"),
                    None => {}
                }
            }
            FieldKind::Enumeration(vocabulary) => {
                let token = match &*value {
                    Value::String(s) => s.trim().to_string(),
                    Value::Null => String::new(),
                    _ => {
                        if check {
                            self.error(path, FieldErrorKind::Type, "expected a string");
                        }
                        return;
                    }
                };
                if token.is_empty() {
                    *value = Value::String(token);
                    return;
                }
                match vocabulary.canonical(&token) {
                    Some(id) => *value = Value::String(id.to_string()),
                    None => {
                        if check {
                            self.error(
                                path,
                                FieldErrorKind::Enumeration,
                                format!("'{}' is not a known {}", token, vocabulary.name()),
                            );
                        }
                        *value = Value::String(token);
                    }
                }
            }
            FieldKind::Record(fields) => {
                if value.is_null() {
                    *value = Value::Object(Map::new());
                }
                match value {
                    Value::Object(map) => self.object(fields, map, path),
                    _ if check => self.error(path, FieldErrorKind::Type, "expected an object"),
                    _ => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::fields::{ENVELOPE, WORK};
    use serde_json::json;

    fn run(value: Value, pubtype: PubType) -> (Value, Vec<FieldError>) {
        let Value::Object(mut map) = value else {
            panic!("object expected");
        };
        let mut walker = Walker::new(Some(pubtype));
        walker.object(ENVELOPE, &mut map, "");
        walker.object(WORK, &mut map, "");
        (Value::Object(map), walker.errors)
    }

    fn base() -> Value {
        json!({
            "id": "W1",
            "catalog": ["rub"],
            "owner": ["editor"],
            "pubtype": "monograph",
            "title": "  A Title  "
        })
    }

    #[test]
    fn test_normalises_tokens_and_whitespace() {
        let (value, errors) = run(base(), PubType::Monograph);
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(value["title"], "A Title");
        assert_eq!(value["pubtype"], "Monograph");
        assert_eq!(value["catalog"], json!(["Ruhr-Universität Bochum"]));
    }

    #[test]
    fn test_drops_blank_repeat_entries() {
        let mut value = base();
        value["keyword"] = json!(["", " physics ", "   "]);
        value["person"] = json!([{ "name": "" }, { "name": "Doe, Jane", "role": ["Author"] }]);
        let (value, errors) = run(value, PubType::Monograph);
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(value["keyword"], json!(["physics"]));
        assert_eq!(value["person"].as_array().map(Vec::len), Some(1));
        assert_eq!(value["person"][0]["role"], json!(["aut"]));
    }

    #[test]
    fn test_reports_paths_of_violations() {
        let mut value = base();
        value["DOI"] = json!(["10.1000/ok", "not-a-doi"]);
        value["person"] = json!([{ "name": "Doe, Jane", "gnd": "abc" }]);
        value["issued"] = json!(["03/2021"]);
        let (_, errors) = run(value, PubType::Monograph);
        let paths: Vec<_> = errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["issued[0]", "DOI[1]", "person[0].gnd"]);
    }

    #[test]
    fn test_doi_prefix_is_stripped_before_matching() {
        let mut value = base();
        value["DOI"] = json!(["https://doi.org/10.1000/ABC"]);
        let (value, errors) = run(value, PubType::Monograph);
        assert!(errors.is_empty());
        assert_eq!(value["DOI"], json!(["10.1000/abc"]));
    }

    #[test]
    fn test_conditional_requirement() {
        let mut value = base();
        value["pubtype"] = json!("Patent");
        let (_, errors) = run(value, PubType::Patent);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "patent_number");
        assert_eq!(errors[0].kind, FieldErrorKind::Required);
    }

    #[test]
    fn test_inapplicable_fields_are_not_checked() {
        let mut value = base();
        value["priority_date"] = json!("not a date");
        let (value, errors) = run(value, PubType::Monograph);
        assert!(errors.is_empty());
        assert_eq!(value["priority_date"], "not a date");
    }

    #[test]
    fn test_empty_optional_field_passes() {
        let mut value = base();
        value["ISBN"] = json!([""]);
        value["email"] = json!("");
        let (_, errors) = run(value, PubType::Monograph);
        assert!(errors.is_empty());
    }
}
