//! Translation of structured queries into OpenSearch query DSL.

use catalog_shared::{fields, Query, SearchRequest, SortField};
use serde_json::{json, Map, Value};

pub fn query_to_dsl(query: &Query) -> Value {
    match query {
        Query::MatchAll => json!({ "match_all": {} }),
        Query::Term { field, value } => json!({ "term": { field: value } }),
        Query::Terms { field, values } => json!({ "terms": { field: values } }),
        Query::Exists { field } => json!({ "exists": { "field": field } }),
        Query::Prefix { field, value } => json!({ "prefix": { field: value } }),
        Query::Fuzzy { field, value } => json!({
            "fuzzy": { field: { "value": value, "fuzziness": "AUTO" } }
        }),
        Query::Range { field, gte, lt } => {
            let mut bounds = Map::new();
            if let Some(gte) = gte {
                bounds.insert("gte".to_string(), json!(gte));
            }
            if let Some(lt) = lt {
                bounds.insert("lt".to_string(), json!(lt));
            }
            json!({ "range": { field: bounds } })
        }
        Query::Ids(ids) => json!({ "terms": { (fields::ID): ids } }),
        Query::Not(inner) => json!({ "bool": { "must_not": [query_to_dsl(inner)] } }),
        Query::And(clauses) => json!({
            "bool": { "must": clauses.iter().map(query_to_dsl).collect::<Vec<_>>() }
        }),
        Query::Or(clauses) => json!({
            "bool": {
                "should": clauses.iter().map(query_to_dsl).collect::<Vec<_>>(),
                "minimum_should_match": 1
            }
        }),
    }
}

pub fn sort_to_dsl(sort: &[SortField]) -> Value {
    Value::Array(
        sort.iter()
            .map(|s| {
                json!({
                    s.field.as_str(): {
                        "order": if s.descending { "desc" } else { "asc" },
                        "unmapped_type": "keyword"
                    }
                })
            })
            .collect(),
    )
}

/// Full `_search` body for a paged, faceted request.
pub fn search_body(request: &SearchRequest) -> Value {
    let mut body = json!({
        "query": query_to_dsl(&request.effective_query()),
        "from": request.start,
        "size": request.rows,
        "track_total_hits": true,
        "sort": sort_to_dsl(&request.sort),
    });

    if let Some(projection) = &request.fields {
        body["_source"] = json!(projection);
    }

    if !request.facets.is_empty() {
        let aggs: Map<String, Value> = request
            .facets
            .iter()
            .map(|field| {
                (
                    field.clone(),
                    json!({ "terms": { "field": field, "size": request.facet_limit } }),
                )
            })
            .collect();
        body["aggs"] = Value::Object(aggs);
    }

    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_deleted_filter() {
        let dsl = query_to_dsl(&Query::not_deleted());
        assert_eq!(
            dsl,
            json!({ "bool": { "must_not": [{ "term": { "editorial_status": "deleted" } }] } })
        );
    }

    #[test]
    fn test_fuzzy_uses_auto_fuzziness() {
        let dsl = query_to_dsl(&Query::fuzzy("name_family", "smith"));
        assert_eq!(dsl["fuzzy"]["name_family"]["fuzziness"], "AUTO");
    }

    #[test]
    fn test_range_omits_missing_bounds() {
        let dsl = query_to_dsl(&Query::before("changed", "2024-01-01T00:00:00.000Z"));
        assert_eq!(
            dsl,
            json!({ "range": { "changed": { "lt": "2024-01-01T00:00:00.000Z" } } })
        );
    }

    #[test]
    fn test_search_body_with_facets_and_projection() {
        let request = SearchRequest::new(Query::term("pubtype", "Monograph"))
            .with_filter(Query::not_deleted())
            .with_facet("fdate")
            .with_fields(vec!["id".to_string(), "title".to_string()])
            .with_page(20, 10)
            .with_default_tie_breaks();
        let body = search_body(&request);

        assert_eq!(body["from"], 20);
        assert_eq!(body["size"], 10);
        assert_eq!(body["aggs"]["fdate"]["terms"]["field"], "fdate");
        assert_eq!(body["_source"], json!(["id", "title"]));
        assert_eq!(body["sort"][0]["changed"]["order"], "desc");
        assert_eq!(body["sort"][1]["id"]["order"], "asc");
        assert_eq!(body["query"]["bool"]["must"].as_array().map(Vec::len), Some(2));
    }
}
