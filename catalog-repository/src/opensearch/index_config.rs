//! OpenSearch index configuration and mappings.
//!
//! Each core lives in its own index, optionally prefixed (e.g. `test_work`).

use catalog_shared::Core;
use serde_json::{json, Value};

/// Configuration for the per-core indices.
#[derive(Debug, Clone, Default)]
pub struct IndexConfig {
    /// Prefix prepended to every core name.
    pub prefix: String,
}

impl IndexConfig {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Name of the index backing `core`.
    pub fn index_name(&self, core: Core) -> String {
        if self.prefix.is_empty() {
            core.as_str().to_string()
        } else {
            format!("{}_{}", self.prefix, core.as_str())
        }
    }
}

/// Get the index settings and mappings for a core.
///
/// The configuration includes:
/// - **Keyword by default**: every string field is a facetable keyword
/// - **Text label fields**: `title` / `name` / `pref_label` are also analysed for search
/// - **Date fields**: envelope timestamps, `locked_since` and `date_boost`
/// - **wtf_json**: stored in `_source` only, never indexed
pub fn get_index_settings(core: Core) -> Value {
    let label_field = match core {
        Core::Work => "title",
        Core::Person => "name",
        Core::Organisation | Core::Group => "pref_label",
    };

    let mut properties = json!({
        "id": { "type": "keyword" },
        "wtf_json": { "type": "keyword", "index": false, "doc_values": false },
        "locked": { "type": "boolean" },
        "locked_since": { "type": "date" },
        "editorial_status": { "type": "keyword" },
        "catalog": { "type": "keyword" },
        "owner": { "type": "keyword" },
        "deskman": { "type": "keyword" },
        "same_as": { "type": "keyword" },
        "created": { "type": "date" },
        "changed": { "type": "date" }
    });
    if let Some(map) = properties.as_object_mut() {
        map.insert(
            label_field.to_string(),
            json!({
                "type": "keyword",
                "fields": { "text": { "type": "text" } }
            }),
        );
        if core == Core::Work {
            map.insert("date_boost".to_string(), json!({ "type": "date" }));
        }
    }

    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 1
        },
        "mappings": {
            "date_detection": false,
            "dynamic_templates": [
                {
                    "strings_as_keywords": {
                        "match_mapping_type": "string",
                        "mapping": { "type": "keyword", "ignore_above": 8191 }
                    }
                }
            ],
            "properties": properties
        }
    })
}
