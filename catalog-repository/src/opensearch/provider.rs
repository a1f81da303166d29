//! OpenSearch provider implementation.
//!
//! This module provides the concrete implementation of `IndexProvider`
//! using the OpenSearch Rust crate.

use std::collections::BTreeMap;

use async_trait::async_trait;
use catalog_shared::{
    fields, Core, DocGroup, FacetCount, IndexDocument, SearchPage, SearchRequest,
};
use opensearch::{
    http::request::JsonBody,
    http::response::Response,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesExistsParts},
    params::Refresh,
    BulkParts, DeleteParts, MgetParts, OpenSearch, SearchParts, UpdateParts,
};
use serde_json::{json, Value};
use tracing::{debug, error, info};
use url::Url;

use crate::errors::IndexError;
use crate::interfaces::IndexProvider;
use crate::opensearch::index_config::{get_index_settings, IndexConfig};
use crate::opensearch::query_dsl::{query_to_dsl, search_body};
use crate::types::{
    BatchOperationResult, BatchOperationSummary, GroupRequest, ScanPage, ScanRequest,
};
use crate::utils;

/// OpenSearch provider implementation.
///
/// # Example
///
/// ```ignore
/// use catalog_repository::opensearch::{IndexConfig, OpenSearchProvider};
/// use catalog_shared::{Core, SearchRequest};
///
/// let provider = OpenSearchProvider::new("http://localhost:9200", IndexConfig::new("hb2")).await?;
/// provider.ensure_core_exists(Core::Work).await?;
/// let page = provider.search(Core::Work, &SearchRequest::match_all()).await?;
/// ```
pub struct OpenSearchProvider {
    client: OpenSearch,
    index_config: IndexConfig,
}

impl OpenSearchProvider {
    /// Create a new OpenSearch provider connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    /// * `index_config` - Index naming configuration
    pub async fn new(url: &str, index_config: IndexConfig) -> Result<Self, IndexError> {
        let parsed_url = Url::parse(url).map_err(|e| IndexError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| IndexError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        // Probe the cluster so connection problems surface at startup.
        client
            .ping()
            .send()
            .await
            .map_err(|e| IndexError::connection(e.to_string()))?;

        info!(
            url = %url,
            prefix = %index_config.prefix,
            "Created OpenSearch provider"
        );

        Ok(Self {
            client,
            index_config,
        })
    }

    fn index(&self, core: Core) -> String {
        self.index_config.index_name(core)
    }

    /// Return the body of a failed response as an error built by `make`.
    async fn check(
        response: Response,
        operation: &str,
        make: fn(String) -> IndexError,
    ) -> Result<Value, IndexError> {
        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, operation, "Request failed");
            return Err(make(format!(
                "{} failed with status {}: {}",
                operation,
                status.as_u16(),
                error_body
            )));
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| IndexError::parse(e.to_string()))
    }

    fn parse_hits(body: &Value) -> Vec<IndexDocument> {
        body["hits"]["hits"]
            .as_array()
            .map(|hits| hits.iter().filter_map(source_of).collect())
            .unwrap_or_default()
    }

    fn parse_facets(body: &Value, facets: &[String]) -> BTreeMap<String, Vec<FacetCount>> {
        facets
            .iter()
            .map(|field| {
                let buckets = body["aggregations"][field.as_str()]["buckets"]
                    .as_array()
                    .map(|buckets| {
                        buckets
                            .iter()
                            .map(|b| FacetCount {
                                value: bucket_key(&b["key"]),
                                count: b["doc_count"].as_u64().unwrap_or(0),
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                (field.clone(), buckets)
            })
            .collect()
    }
}

fn source_of(hit: &Value) -> Option<IndexDocument> {
    match &hit["_source"] {
        Value::Object(map) => Some(IndexDocument::from_map(map.clone())),
        _ => None,
    }
}

fn bucket_key(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl IndexProvider for OpenSearchProvider {
    async fn ensure_core_exists(&self, core: Core) -> Result<(), IndexError> {
        let index = self.index(core);
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index.as_str()]))
            .send()
            .await
            .map_err(|e| IndexError::connection(e.to_string()))?;

        if response.status_code().is_success() {
            debug!(index = %index, "Index already exists");
            return Ok(());
        }

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(&index))
            .body(get_index_settings(core))
            .send()
            .await
            .map_err(|e| IndexError::index_creation(e.to_string()))?;
        Self::check(response, "Index creation", IndexError::IndexCreationError).await?;

        info!(index = %index, core = %core, "Created index");
        Ok(())
    }

    async fn search(&self, core: Core, request: &SearchRequest) -> Result<SearchPage, IndexError> {
        let index = self.index(core);
        let response = self
            .client
            .search(SearchParts::Index(&[index.as_str()]))
            .body(search_body(request))
            .send()
            .await
            .map_err(|e| IndexError::connection(e.to_string()))?;
        let body = Self::check(response, "Search", IndexError::QueryError).await?;

        Ok(SearchPage {
            docs: Self::parse_hits(&body),
            total: body["hits"]["total"]["value"].as_u64().unwrap_or(0),
            facets: Self::parse_facets(&body, &request.facets),
        })
    }

    async fn get_documents(
        &self,
        core: Core,
        ids: &[String],
    ) -> Result<Vec<IndexDocument>, IndexError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let index = self.index(core);
        let response = self
            .client
            .mget(MgetParts::Index(&index))
            .body(json!({ "ids": ids }))
            .send()
            .await
            .map_err(|e| IndexError::connection(e.to_string()))?;
        let body = Self::check(response, "Get", IndexError::QueryError).await?;

        Ok(body["docs"]
            .as_array()
            .map(|docs| {
                docs.iter()
                    .filter(|d| d["found"].as_bool().unwrap_or(false))
                    .filter_map(source_of)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn put_documents(
        &self,
        core: Core,
        docs: &[IndexDocument],
    ) -> Result<BatchOperationSummary, IndexError> {
        if docs.is_empty() {
            return Ok(BatchOperationSummary::empty());
        }

        let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(docs.len() * 2);
        for doc in docs {
            let id = doc
                .id()
                .ok_or_else(|| IndexError::validation("Document without id"))?;
            body.push(JsonBody::new(json!({ "index": { "_id": id } })));
            let source =
                serde_json::to_value(doc).map_err(|e| IndexError::serialization(e.to_string()))?;
            body.push(JsonBody::new(source));
        }

        let index = self.index(core);
        let response = self
            .client
            .bulk(BulkParts::Index(&index))
            .refresh(Refresh::WaitFor)
            .body(body)
            .send()
            .await
            .map_err(|e| IndexError::connection(e.to_string()))?;
        let body = Self::check(response, "Bulk", IndexError::UpdateError).await?;

        let results = body["items"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .map(|item| {
                        let op = &item["index"];
                        let id = op["_id"].as_str().unwrap_or_default().to_string();
                        match op.get("error") {
                            Some(err) if !err.is_null() => BatchOperationResult::failed(
                                id,
                                IndexError::update(format!(
                                    "Bulk item failed with status {}: {}",
                                    op["status"], err
                                )),
                            ),
                            _ => BatchOperationResult::ok(id),
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        let summary = BatchOperationSummary::from_results(results);
        debug!(
            core = %core,
            total = summary.total,
            failed = summary.failed,
            "Bulk write finished"
        );
        Ok(summary)
    }

    async fn patch_document(
        &self,
        core: Core,
        id: &str,
        field: &str,
        value: &Value,
    ) -> Result<(), IndexError> {
        utils::validate_field_name(field)?;
        let index = self.index(core);
        let response = self
            .client
            .update(UpdateParts::IndexId(&index, id))
            .refresh(Refresh::WaitFor)
            .body(json!({ "doc": { field: value } }))
            .send()
            .await
            .map_err(|e| IndexError::connection(e.to_string()))?;

        if response.status_code().as_u16() == 404 {
            return Err(IndexError::document_not_found(core.as_str(), id));
        }
        Self::check(response, "Patch", IndexError::UpdateError).await?;

        debug!(core = %core, id = %id, field = %field, "Document patched");
        Ok(())
    }

    async fn delete_document(&self, core: Core, id: &str) -> Result<(), IndexError> {
        let index = self.index(core);
        let response = self
            .client
            .delete(DeleteParts::IndexId(&index, id))
            .refresh(Refresh::WaitFor)
            .send()
            .await
            .map_err(|e| IndexError::connection(e.to_string()))?;

        // 404 is acceptable - document may not exist
        let status = response.status_code();
        if !status.is_success() && status.as_u16() != 404 {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Delete request failed");
            return Err(IndexError::delete(format!(
                "Delete failed with status {}: {}",
                status.as_u16(),
                error_body
            )));
        }

        debug!(core = %core, id = %id, "Document deleted");
        Ok(())
    }

    async fn scan_page(&self, core: Core, request: &ScanRequest) -> Result<ScanPage, IndexError> {
        let mut body = json!({
            "query": query_to_dsl(&request.query),
            "size": request.page_size,
            "sort": [{ (fields::ID): "asc" }],
        });
        if let Some(projection) = &request.fields {
            let mut source = projection.clone();
            if !source.iter().any(|f| f == fields::ID) {
                source.push(fields::ID.to_string());
            }
            body["_source"] = json!(source);
        }
        if let Some(after) = &request.after {
            body["search_after"] = json!([after]);
        }

        let index = self.index(core);
        let response = self
            .client
            .search(SearchParts::Index(&[index.as_str()]))
            .body(body)
            .send()
            .await
            .map_err(|e| IndexError::connection(e.to_string()))?;
        let body = Self::check(response, "Scan", IndexError::QueryError).await?;

        let docs = Self::parse_hits(&body);
        let next = if docs.len() < request.page_size {
            None
        } else {
            docs.last().and_then(|d| d.id()).map(str::to_string)
        };
        Ok(ScanPage { docs, next })
    }

    async fn group(
        &self,
        core: Core,
        request: &GroupRequest,
    ) -> Result<Vec<DocGroup>, IndexError> {
        utils::validate_field_name(&request.field)?;
        let body = json!({
            "query": query_to_dsl(&request.query),
            "size": 0,
            "aggs": {
                "groups": {
                    "terms": {
                        "field": request.field,
                        "min_doc_count": request.min_size,
                        "size": request.limit
                    },
                    "aggs": {
                        "docs": { "top_hits": { "size": request.docs_per_group } }
                    }
                }
            }
        });

        let index = self.index(core);
        let response = self
            .client
            .search(SearchParts::Index(&[index.as_str()]))
            .body(body)
            .send()
            .await
            .map_err(|e| IndexError::connection(e.to_string()))?;
        let body = Self::check(response, "Group", IndexError::QueryError).await?;

        Ok(body["aggregations"]["groups"]["buckets"]
            .as_array()
            .map(|buckets| {
                buckets
                    .iter()
                    .map(|b| DocGroup {
                        key: bucket_key(&b["key"]),
                        docs: Self::parse_hits(&b["docs"]),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hits_and_facets() {
        let body = json!({
            "hits": {
                "total": { "value": 2 },
                "hits": [
                    { "_id": "W1", "_source": { "id": "W1", "fdate": "2020" } },
                    { "_id": "W2", "_source": { "id": "W2", "fdate": "2021" } }
                ]
            },
            "aggregations": {
                "fdate": { "buckets": [
                    { "key": "2020", "doc_count": 1 },
                    { "key": 2021, "doc_count": 1 }
                ] }
            }
        });

        let docs = OpenSearchProvider::parse_hits(&body);
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].id(), Some("W2"));

        let facets = OpenSearchProvider::parse_facets(&body, &["fdate".to_string()]);
        assert_eq!(facets["fdate"][0].value, "2020");
        assert_eq!(facets["fdate"][1].value, "2021");
    }

    #[test]
    fn test_parse_facets_missing_aggregation() {
        let facets = OpenSearchProvider::parse_facets(&json!({}), &["catalog".to_string()]);
        assert!(facets["catalog"].is_empty());
    }
}
