//! Direct evaluation of structured queries against documents.
//!
//! Field semantics follow keyword fields in OpenSearch: values compare exactly,
//! multi-valued fields match when any value matches, and fuzzy matching uses
//! Levenshtein distance with `AUTO` fuzziness.

use std::cmp::Ordering;

use catalog_shared::{IndexDocument, Query, SortField};
use serde_json::Value;

/// Edits allowed by `AUTO` fuzziness for a term of `len` characters.
pub fn auto_fuzziness(len: usize) -> usize {
    match len {
        0..=2 => 0,
        3..=5 => 1,
        _ => 2,
    }
}

/// All scalar values of a field rendered as strings.
pub fn field_values(doc: &IndexDocument, field: &str) -> Vec<String> {
    fn scalar(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    match doc.get(field) {
        Some(Value::Array(values)) => values.iter().filter_map(scalar).collect(),
        Some(value) => scalar(value).into_iter().collect(),
        None => Vec::new(),
    }
}

pub fn matches(doc: &IndexDocument, query: &Query) -> bool {
    match query {
        Query::MatchAll => true,
        Query::Term { field, value } => field_values(doc, field).iter().any(|v| v == value),
        Query::Terms { field, values } => field_values(doc, field)
            .iter()
            .any(|v| values.contains(v)),
        Query::Exists { field } => field_values(doc, field).iter().any(|v| !v.is_empty()),
        Query::Prefix { field, value } => field_values(doc, field)
            .iter()
            .any(|v| v.starts_with(value.as_str())),
        Query::Fuzzy { field, value } => {
            let allowed = auto_fuzziness(value.chars().count());
            field_values(doc, field)
                .iter()
                .any(|v| strsim::levenshtein(v, value) <= allowed)
        }
        Query::Range { field, gte, lt } => field_values(doc, field).iter().any(|v| {
            gte.as_ref().map_or(true, |lower| v.as_str() >= lower.as_str())
                && lt.as_ref().map_or(true, |upper| v.as_str() < upper.as_str())
        }),
        Query::Ids(ids) => doc.id().is_some_and(|id| ids.iter().any(|i| i == id)),
        Query::Not(inner) => !matches(doc, inner),
        Query::And(clauses) => clauses.iter().all(|c| matches(doc, c)),
        Query::Or(clauses) => clauses.iter().any(|c| matches(doc, c)),
    }
}

/// Order two documents by the sort keys; missing values sort last in both
/// directions and remaining ties fall back to id order.
pub fn compare(a: &IndexDocument, b: &IndexDocument, sort: &[SortField]) -> Ordering {
    for key in sort {
        let left = field_values(a, &key.field).into_iter().next();
        let right = field_values(b, &key.field).into_iter().next();
        let ordering = match (left, right) {
            (Some(l), Some(r)) => {
                if key.descending {
                    r.cmp(&l)
                } else {
                    l.cmp(&r)
                }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    a.id().cmp(&b.id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> IndexDocument {
        match value {
            Value::Object(map) => IndexDocument::from_map(map),
            _ => IndexDocument::default(),
        }
    }

    #[test]
    fn test_auto_fuzziness_thresholds() {
        assert_eq!(auto_fuzziness(2), 0);
        assert_eq!(auto_fuzziness(3), 1);
        assert_eq!(auto_fuzziness(5), 1);
        assert_eq!(auto_fuzziness(6), 2);
    }

    #[test]
    fn test_fuzzy_match() {
        let person = doc(json!({ "id": "P1", "name_family": "smith" }));
        assert!(matches(&person, &Query::fuzzy("name_family", "smyth")));
        assert!(!matches(&person, &Query::fuzzy("name_family", "smoke")));
        assert!(!matches(&doc(json!({"id": "P2", "name_family": "li"})), &Query::fuzzy("name_family", "lu")));
    }

    #[test]
    fn test_multi_valued_and_boolean_fields() {
        let work = doc(json!({
            "id": "W1",
            "catalog": ["Ruhr-Universität Bochum", "Technische Universität Dortmund"],
            "locked": true
        }));
        assert!(matches(&work, &Query::term("catalog", "Technische Universität Dortmund")));
        assert!(matches(&work, &Query::term("locked", "true")));
        assert!(matches(&work, &Query::not_deleted()));
        assert!(!matches(&work, &Query::exists("doi")));
    }

    #[test]
    fn test_range_on_timestamps() {
        let work = doc(json!({ "id": "W1", "changed": "2024-03-01T10:00:00.000Z" }));
        assert!(matches(&work, &Query::before("changed", "2024-03-01T11:00:00.000Z")));
        assert!(!matches(&work, &Query::before("changed", "2024-03-01T10:00:00.000Z")));
    }

    #[test]
    fn test_compare_missing_values_sort_last() {
        let a = doc(json!({ "id": "A", "changed": "2024" }));
        let b = doc(json!({ "id": "B" }));
        let sort = [SortField::desc("changed"), SortField::asc("id")];
        assert_eq!(compare(&a, &b, &sort), Ordering::Less);
        assert_eq!(compare(&b, &a, &sort), Ordering::Greater);
    }
}
