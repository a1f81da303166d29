//! In-memory implementation of the index provider.
//!
//! Used for development and tests. Documents live in one ordered map per core and
//! queries are evaluated directly by [`matcher`], with the same semantics the
//! OpenSearch provider gets from keyword mappings.

pub mod matcher;

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use catalog_shared::{
    Core, DocGroup, FacetCount, IndexDocument, Query, SearchPage, SearchRequest,
};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::errors::IndexError;
use crate::interfaces::IndexProvider;
use crate::types::{
    BatchOperationResult, BatchOperationSummary, GroupRequest, ScanPage, ScanRequest,
};

type CoreMap = BTreeMap<String, IndexDocument>;

/// In-memory document store.
pub struct InMemoryProvider {
    cores: RwLock<HashMap<Core, CoreMap>>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self {
            cores: RwLock::new(HashMap::new()),
        }
    }

    /// Snapshot of a single stored document.
    pub async fn document(&self, core: Core, id: &str) -> Option<IndexDocument> {
        self.cores
            .read()
            .await
            .get(&core)
            .and_then(|docs| docs.get(id).cloned())
    }

    /// Number of documents stored in a core.
    pub async fn count(&self, core: Core) -> usize {
        self.cores.read().await.get(&core).map_or(0, BTreeMap::len)
    }

    /// Ids of every document in a core, in id order.
    pub async fn ids(&self, core: Core) -> Vec<String> {
        self.cores
            .read()
            .await
            .get(&core)
            .map(|docs| docs.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn matching<'a>(docs: Option<&'a CoreMap>, query: &Query) -> Vec<&'a IndexDocument> {
        docs.map(|docs| {
            docs.values()
                .filter(|doc| matcher::matches(doc, query))
                .collect()
        })
        .unwrap_or_default()
    }

    fn facet_counts(docs: &[&IndexDocument], field: &str, limit: usize) -> Vec<FacetCount> {
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for doc in docs {
            let mut values = matcher::field_values(doc, field);
            values.sort();
            values.dedup();
            for value in values {
                *counts.entry(value).or_default() += 1;
            }
        }
        let mut buckets: Vec<FacetCount> = counts
            .into_iter()
            .map(|(value, count)| FacetCount { value, count })
            .collect();
        buckets.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
        buckets.truncate(limit);
        buckets
    }
}

impl Default for InMemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn project(doc: &IndexDocument, fields: Option<&Vec<String>>) -> IndexDocument {
    let mut doc = doc.clone();
    if let Some(keep) = fields {
        doc.retain_fields(keep);
    }
    doc
}

#[async_trait]
impl IndexProvider for InMemoryProvider {
    async fn ensure_core_exists(&self, core: Core) -> Result<(), IndexError> {
        self.cores.write().await.entry(core).or_default();
        Ok(())
    }

    async fn search(&self, core: Core, request: &SearchRequest) -> Result<SearchPage, IndexError> {
        let cores = self.cores.read().await;
        let mut hits = Self::matching(cores.get(&core), &request.effective_query());
        hits.sort_by(|a, b| matcher::compare(a, b, &request.sort));

        let facets = request
            .facets
            .iter()
            .map(|field| {
                (
                    field.clone(),
                    Self::facet_counts(&hits, field, request.facet_limit),
                )
            })
            .collect();

        Ok(SearchPage {
            total: hits.len() as u64,
            docs: hits
                .into_iter()
                .skip(request.start)
                .take(request.rows)
                .map(|doc| project(doc, request.fields.as_ref()))
                .collect(),
            facets,
        })
    }

    async fn get_documents(
        &self,
        core: Core,
        ids: &[String],
    ) -> Result<Vec<IndexDocument>, IndexError> {
        let cores = self.cores.read().await;
        let Some(docs) = cores.get(&core) else {
            return Ok(Vec::new());
        };
        Ok(ids.iter().filter_map(|id| docs.get(id).cloned()).collect())
    }

    async fn put_documents(
        &self,
        core: Core,
        docs: &[IndexDocument],
    ) -> Result<BatchOperationSummary, IndexError> {
        let mut cores = self.cores.write().await;
        let stored = cores.entry(core).or_default();
        let results = docs
            .iter()
            .map(|doc| match doc.id() {
                Some(id) if !id.trim().is_empty() => {
                    stored.insert(id.to_string(), doc.clone());
                    BatchOperationResult::ok(id)
                }
                _ => BatchOperationResult::failed(
                    String::new(),
                    IndexError::validation("Document without id"),
                ),
            })
            .collect();
        Ok(BatchOperationSummary::from_results(results))
    }

    async fn patch_document(
        &self,
        core: Core,
        id: &str,
        field: &str,
        value: &Value,
    ) -> Result<(), IndexError> {
        let mut cores = self.cores.write().await;
        let doc = cores
            .get_mut(&core)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| IndexError::document_not_found(core.as_str(), id))?;
        doc.set(field, value.clone());
        Ok(())
    }

    async fn delete_document(&self, core: Core, id: &str) -> Result<(), IndexError> {
        if let Some(docs) = self.cores.write().await.get_mut(&core) {
            docs.remove(id);
        }
        Ok(())
    }

    async fn scan_page(&self, core: Core, request: &ScanRequest) -> Result<ScanPage, IndexError> {
        let cores = self.cores.read().await;
        let Some(docs) = cores.get(&core) else {
            return Ok(ScanPage::default());
        };

        let page: Vec<IndexDocument> = docs
            .iter()
            .filter(|(id, _)| request.after.as_ref().map_or(true, |after| *id > after))
            .filter(|(_, doc)| matcher::matches(doc, &request.query))
            .take(request.page_size)
            .map(|(_, doc)| project(doc, request.fields.as_ref()))
            .collect();

        let next = if page.len() < request.page_size {
            None
        } else {
            page.last().and_then(|d| d.id()).map(str::to_string)
        };
        Ok(ScanPage { docs: page, next })
    }

    async fn group(
        &self,
        core: Core,
        request: &GroupRequest,
    ) -> Result<Vec<DocGroup>, IndexError> {
        let cores = self.cores.read().await;
        let hits = Self::matching(cores.get(&core), &request.query);

        let mut groups: BTreeMap<String, Vec<IndexDocument>> = BTreeMap::new();
        for doc in hits {
            for key in matcher::field_values(doc, &request.field) {
                groups.entry(key).or_default().push(doc.clone());
            }
        }

        let mut groups: Vec<DocGroup> = groups
            .into_iter()
            .filter(|(_, docs)| docs.len() >= request.min_size.max(1))
            .map(|(key, docs)| DocGroup { key, docs })
            .collect();
        groups.sort_by(|a, b| b.docs.len().cmp(&a.docs.len()).then_with(|| a.key.cmp(&b.key)));
        groups.truncate(request.limit);
        for group in &mut groups {
            group.docs.truncate(request.docs_per_group);
        }
        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_shared::{fields, SortField};

    fn work(id: &str, changed: &str, status: &str) -> IndexDocument {
        let mut doc = IndexDocument::new(id);
        doc.set(fields::CHANGED, changed);
        doc.set(fields::EDITORIAL_STATUS, status);
        doc.set("fdate", &changed[..4]);
        doc
    }

    #[tokio::test]
    async fn test_search_sorts_pages_and_facets() {
        let provider = InMemoryProvider::new();
        provider
            .put_documents(
                Core::Work,
                &[
                    work("W1", "2021-01-01T00:00:00.000Z", "new"),
                    work("W2", "2022-01-01T00:00:00.000Z", "new"),
                    work("W3", "2022-01-01T00:00:00.000Z", "deleted"),
                ],
            )
            .await
            .unwrap();

        let request = SearchRequest::match_all()
            .with_facet("fdate")
            .with_page(0, 2)
            .with_default_tie_breaks();
        let page = provider.search(Core::Work, &request).await.unwrap();

        assert_eq!(page.total, 3);
        let ids: Vec<_> = page.docs.iter().filter_map(|d| d.id()).collect();
        assert_eq!(ids, vec!["W2", "W3"]);
        assert_eq!(page.facet("fdate")[0].value, "2022");
        assert_eq!(page.facet("fdate")[0].count, 2);

        let visible = provider
            .search(
                Core::Work,
                &SearchRequest::match_all()
                    .with_filter(Query::not_deleted())
                    .with_sort(SortField::asc("id")),
            )
            .await
            .unwrap();
        assert_eq!(visible.total, 2);
    }

    #[tokio::test]
    async fn test_patch_missing_document() {
        let provider = InMemoryProvider::new();
        let result = provider
            .patch_document(Core::Person, "P1", fields::LOCKED, &Value::Bool(true))
            .await;
        assert!(matches!(result, Err(IndexError::DocumentNotFound(_))));
    }

    #[tokio::test]
    async fn test_scan_pages_by_id() {
        let provider = InMemoryProvider::new();
        let docs: Vec<_> = (1..=5).map(|i| IndexDocument::new(format!("W{}", i))).collect();
        provider.put_documents(Core::Work, &docs).await.unwrap();

        let first = provider
            .scan_page(Core::Work, &ScanRequest::new(Query::MatchAll, 3))
            .await
            .unwrap();
        assert_eq!(first.docs.len(), 3);
        assert_eq!(first.next.as_deref(), Some("W3"));

        let second = provider
            .scan_page(
                Core::Work,
                &ScanRequest::new(Query::MatchAll, 3).after(first.next),
            )
            .await
            .unwrap();
        assert_eq!(second.docs.len(), 2);
        assert!(second.next.is_none());
    }

    #[tokio::test]
    async fn test_group_on_signature() {
        let provider = InMemoryProvider::new();
        let mut docs = Vec::new();
        for (id, sig) in [("W1", "a"), ("W2", "a"), ("W3", "b")] {
            let mut doc = IndexDocument::new(id);
            doc.set(fields::DEDUP_SIGNATURE, sig);
            docs.push(doc);
        }
        provider.put_documents(Core::Work, &docs).await.unwrap();

        let groups = provider
            .group(
                Core::Work,
                &GroupRequest::new(fields::DEDUP_SIGNATURE, Query::MatchAll),
            )
            .await
            .unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].key, "a");
        assert_eq!(groups[0].docs.len(), 2);
    }
}
