//! Search result types.
//!
//! This module defines the response structures returned from index reads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::index_document::IndexDocument;

/// One bucket of a facet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FacetCount {
    pub value: String,
    pub count: u64,
}

/// A page of documents with computed facets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SearchPage {
    /// Documents of the requested page, in sort order.
    pub docs: Vec<IndexDocument>,

    /// Total number of matching documents.
    /// May be greater than the number of returned documents due to pagination.
    pub total: u64,

    /// Facet buckets keyed by field, each ordered by descending count.
    #[serde(default)]
    pub facets: BTreeMap<String, Vec<FacetCount>>,
}

impl SearchPage {
    /// Create an empty page.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns true if there are no documents on this page.
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Returns the number of documents on this page.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn facet(&self, field: &str) -> &[FacetCount] {
        self.facets.get(field).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Documents sharing one value of the grouping field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocGroup {
    pub key: String,
    pub docs: Vec<IndexDocument>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_page_empty() {
        let page = SearchPage::empty();
        assert!(page.is_empty());
        assert_eq!(page.len(), 0);
        assert_eq!(page.total, 0);
        assert!(page.facet("catalog").is_empty());
    }

    #[test]
    fn test_serialization() {
        let mut page = SearchPage {
            docs: vec![IndexDocument::new("W1")],
            total: 1,
            facets: BTreeMap::new(),
        };
        page.facets.insert(
            "fdate".to_string(),
            vec![FacetCount {
                value: "2020".to_string(),
                count: 1,
            }],
        );

        let json = serde_json::to_string(&page).unwrap();
        let deserialized: SearchPage = serde_json::from_str(&json).unwrap();

        assert_eq!(page, deserialized);
    }
}
