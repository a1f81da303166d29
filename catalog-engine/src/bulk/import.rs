use std::collections::HashSet;
use std::path::Path;

use catalog_shared::{Core, Role};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::engine::{Actor, Engine};
use crate::errors::EngineError;

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Stop at the first failing record instead of collecting failures.
    pub stop_on_error: bool,
}

/// A snapshot element that could not be imported.
#[derive(Debug, Clone, Serialize)]
pub struct ImportFailure {
    /// Position in the snapshot array.
    pub index: usize,
    pub id: Option<String>,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    /// Elements skipped because an earlier element had the same id.
    pub duplicates: usize,
    pub failures: Vec<ImportFailure>,
}

/// Parse a snapshot file body.
pub fn read_snapshot(bytes: &[u8]) -> Result<Vec<Value>, EngineError> {
    match serde_json::from_slice::<Value>(bytes)? {
        Value::Array(records) => Ok(records),
        _ => Err(EngineError::serialization("a snapshot must be a JSON array")),
    }
}

/// Import every element of a snapshot into `core`.
#[instrument(skip(engine, actor, records, options), fields(core = %core, records = records.len()))]
pub async fn import_snapshot(
    engine: &Engine,
    actor: &Actor,
    core: Core,
    records: Vec<Value>,
    options: &ImportOptions,
) -> Result<ImportSummary, EngineError> {
    if actor.role != Role::Superadmin {
        return Err(EngineError::permission_denied(
            "importing records requires the superadmin role",
        ));
    }

    let mut summary = ImportSummary::default();
    let mut seen = HashSet::new();
    for (index, value) in records.into_iter().enumerate() {
        let id = value
            .get("id")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);
        if let Some(id) = &id {
            if !seen.insert(id.clone()) {
                summary.duplicates += 1;
                continue;
            }
        }

        match engine.import(actor, core, value).await {
            Ok(report) => {
                summary.imported += 1;
                for warning in &report.warnings {
                    warn!(id = %report.id, warning = %warning, "Import warning");
                }
            }
            Err(e) => {
                warn!(index, id = ?id, error = %e, "Record not imported");
                if options.stop_on_error {
                    return Err(e);
                }
                summary.failures.push(ImportFailure {
                    index,
                    id,
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        imported = summary.imported,
        failed = summary.failures.len(),
        duplicates = summary.duplicates,
        "Import finished"
    );
    Ok(summary)
}

pub async fn import_file(
    engine: &Engine,
    actor: &Actor,
    core: Core,
    path: &Path,
    options: &ImportOptions,
) -> Result<ImportSummary, EngineError> {
    let bytes = tokio::fs::read(path).await?;
    let records = read_snapshot(&bytes)?;
    import_snapshot(engine, actor, core, records, options).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_snapshot_requires_array() {
        assert_eq!(read_snapshot(br#"[{"id":"a"},{"id":"b"}]"#).unwrap().len(), 2);
        assert!(matches!(
            read_snapshot(br#"{"id":"a"}"#),
            Err(EngineError::Serialization(_))
        ));
        assert!(read_snapshot(b"not json").is_err());
    }
}
