//! Flat index documents.
//!
//! A record is projected into an `IndexDocument`: a flat JSON object with the envelope
//! fields, denormalised facet fields and the serialised record in `wtf_json`. The
//! blob stays authoritative for every field the index does not carry.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field names with meaning to the engine regardless of entity kind.
pub mod fields {
    pub const ID: &str = "id";
    pub const WTF_JSON: &str = "wtf_json";
    pub const LOCKED: &str = "locked";
    /// Index time the current lock holder last touched the record.
    pub const LOCKED_SINCE: &str = "locked_since";
    pub const EDITORIAL_STATUS: &str = "editorial_status";
    pub const CHANGED: &str = "changed";
    pub const CREATED: &str = "created";
    pub const CATALOG: &str = "catalog";
    pub const OWNER: &str = "owner";
    pub const DESKMAN: &str = "deskman";
    pub const SAME_AS: &str = "same_as";
    pub const DEDUP_SIGNATURE: &str = "dedup_signature";
}

/// Document representation for the search index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexDocument(Map<String, Value>);

impl IndexDocument {
    /// Create a document carrying only its id.
    ///
    /// # Example
    ///
    /// ```
    /// use catalog_shared::IndexDocument;
    ///
    /// let mut doc = IndexDocument::new("W1");
    /// doc.push("fperson", "Doe, Jane");
    /// assert_eq!(doc.id(), Some("W1"));
    /// assert_eq!(doc.get_strs("fperson"), vec!["Doe, Jane"]);
    /// ```
    pub fn new(id: impl Into<String>) -> Self {
        let mut map = Map::new();
        map.insert(fields::ID.to_string(), Value::String(id.into()));
        Self(map)
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn id(&self) -> Option<&str> {
        self.get_str(fields::ID)
    }

    /// The serialised record, if the document carries one.
    pub fn blob(&self) -> Option<&str> {
        self.get_str(fields::WTF_JSON)
    }

    pub fn is_locked(&self) -> bool {
        matches!(self.0.get(fields::LOCKED), Some(Value::Bool(true)))
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    /// All string values of a field, whether stored as a scalar or an array.
    pub fn get_strs(&self, field: &str) -> Vec<&str> {
        match self.0.get(field) {
            Some(Value::String(s)) => vec![s.as_str()],
            Some(Value::Array(values)) => values.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    /// Set a string field unless the value is blank.
    pub fn set_nonempty(&mut self, field: &str, value: &str) {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            self.set(field, trimmed);
        }
    }

    /// Append a value to a multi-valued field, creating it as needed.
    /// Blank strings and exact duplicates are ignored.
    pub fn push(&mut self, field: &str, value: impl Into<Value>) {
        let value = value.into();
        if let Value::String(s) = &value {
            if s.trim().is_empty() {
                return;
            }
        }
        let entry = self
            .0
            .entry(field.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !entry.is_array() {
            let previous = entry.take();
            *entry = Value::Array(vec![previous]);
        }
        if let Value::Array(values) = entry {
            if !values.contains(&value) {
                values.push(value);
            }
        }
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    /// Keep only the listed fields (plus the id).
    pub fn retain_fields(&mut self, keep: &[String]) {
        self.0
            .retain(|key, _| key == fields::ID || keep.iter().any(|k| k == key));
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl From<Map<String, Value>> for IndexDocument {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_push_promotes_scalar_and_skips_duplicates() {
        let mut doc = IndexDocument::new("W1");
        doc.set("isxn", "1234-5678");
        doc.push("isxn", "1234-5678");
        doc.push("isxn", "978-3-16-148410-0");
        doc.push("isxn", "  ");
        assert_eq!(doc.get("isxn"), Some(&json!(["1234-5678", "978-3-16-148410-0"])));
    }

    #[test]
    fn test_locked_flag() {
        let mut doc = IndexDocument::new("W1");
        assert!(!doc.is_locked());
        doc.set(fields::LOCKED, true);
        assert!(doc.is_locked());
    }

    #[test]
    fn test_retain_fields_keeps_id() {
        let mut doc = IndexDocument::new("W1");
        doc.set("title", "A");
        doc.set(fields::WTF_JSON, "{}");
        doc.retain_fields(&["wtf_json".to_string()]);
        assert_eq!(doc.field_names().count(), 2);
        assert!(doc.blob().is_some());
    }

    #[test]
    fn test_serializes_as_flat_object() {
        let mut doc = IndexDocument::new("W1");
        doc.set("fdate", "2020");
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value, json!({"id": "W1", "fdate": "2020"}));
    }
}
