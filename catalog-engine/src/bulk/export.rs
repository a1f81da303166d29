use std::collections::HashSet;
use std::path::{Path, PathBuf};

use catalog_repository::IndexGateway;
use catalog_shared::{fields, Core, EditorialStatus, IndexDocument, Query, Visibility};
use chrono::{DateTime, Datelike, Utc, Weekday};
use futures::{pin_mut, TryStreamExt};
use serde_json::Value;
use tokio::fs::{self, File};
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};

use crate::errors::EngineError;

#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub dir: PathBuf,
    /// Records to include, e.g. `-editorial_status:imported`.
    pub filter: Query,
    pub visibility: Visibility,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            filter: Query::MatchAll,
            visibility: Visibility::All,
        }
    }
}

impl ExportConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, filter: Query) -> Self {
        self.filter = filter;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub records: usize,
    /// Documents seen twice during the scan and written once.
    pub duplicates: usize,
}

#[derive(Debug, Clone)]
pub struct BackupSummary {
    pub path: PathBuf,
    pub not_imported_path: PathBuf,
    pub records: usize,
    pub not_imported: usize,
}

/// `<core>_<unix seconds>.json`
pub fn snapshot_file_name(core: Core, at: DateTime<Utc>) -> String {
    format!("{}_{}.json", core, at.timestamp())
}

fn weekday_de(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Montag",
        Weekday::Tue => "Dienstag",
        Weekday::Wed => "Mittwoch",
        Weekday::Thu => "Donnerstag",
        Weekday::Fri => "Freitag",
        Weekday::Sat => "Samstag",
        Weekday::Sun => "Sonntag",
    }
}

/// `<weekday>/<YYYY-MM-DD_HH-MM-SS>_<core>.json` and its `.not_imported.json` sibling.
fn backup_paths(dir: &Path, core: Core, at: DateTime<Utc>) -> (PathBuf, PathBuf) {
    let folder = dir.join(weekday_de(at.weekday()));
    let stem = format!("{}_{}", at.format("%Y-%m-%d_%H-%M-%S"), core);
    (
        folder.join(format!("{}.json", stem)),
        folder.join(format!("{}.not_imported.json", stem)),
    )
}

/// Streams blobs into a JSON array.
struct ArrayWriter<W> {
    inner: W,
    written: usize,
}

impl<W: AsyncWrite + Unpin> ArrayWriter<W> {
    async fn open(mut inner: W) -> Result<Self, EngineError> {
        inner.write_all(b"[").await?;
        Ok(Self { inner, written: 0 })
    }

    async fn push(&mut self, blob: &str) -> Result<(), EngineError> {
        if self.written > 0 {
            self.inner.write_all(b",\n").await?;
        } else {
            self.inner.write_all(b"\n").await?;
        }
        self.inner.write_all(blob.as_bytes()).await?;
        self.written += 1;
        Ok(())
    }

    async fn close(mut self) -> Result<usize, EngineError> {
        self.inner.write_all(b"\n]\n").await?;
        self.inner.flush().await?;
        Ok(self.written)
    }
}

/// The blob of a scanned document, re-serialised compactly. Documents without a
/// readable blob are skipped.
fn blob_of(core: Core, doc: &IndexDocument) -> Option<(String, Value)> {
    let id = doc.id().unwrap_or_default();
    let Some(raw) = doc.blob() else {
        warn!(core = %core, id, "Document has no blob, skipped");
        return None;
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => Some((id.to_string(), value)),
        Err(e) => {
            warn!(core = %core, id, error = %e, "Unreadable blob, skipped");
            None
        }
    }
}

fn blob_fields() -> Option<Vec<String>> {
    Some(vec![
        fields::ID.to_string(),
        fields::WTF_JSON.to_string(),
        fields::EDITORIAL_STATUS.to_string(),
    ])
}

/// Export the matching records of `core` to `<dir>/<core>_<epoch>.json`.
#[instrument(skip(gateway, config), fields(core = %core))]
pub async fn export(
    gateway: &IndexGateway,
    core: Core,
    config: &ExportConfig,
) -> Result<ExportSummary, EngineError> {
    fs::create_dir_all(&config.dir).await?;
    let path = config.dir.join(snapshot_file_name(core, Utc::now()));
    let mut out = ArrayWriter::open(BufWriter::new(File::create(&path).await?)).await?;

    let docs = gateway.stream(core, config.filter.clone(), blob_fields(), config.visibility);
    pin_mut!(docs);
    let mut seen = HashSet::new();
    let mut duplicates = 0usize;
    while let Some(doc) = docs
        .try_next()
        .await
        .map_err(|e| EngineError::from_index(e, "export"))?
    {
        let Some((id, blob)) = blob_of(core, &doc) else {
            continue;
        };
        if !seen.insert(id) {
            duplicates += 1;
            continue;
        }
        out.push(&serde_json::to_string(&blob)?).await?;
    }
    let records = out.close().await?;

    info!(path = %path.display(), records, duplicates, "Export finished");
    Ok(ExportSummary {
        path,
        records,
        duplicates,
    })
}

/// Full backup of `core` into a weekday folder, with the records that did not
/// come from an import also written to a `.not_imported.json` sibling.
#[instrument(skip(gateway, dir), fields(core = %core))]
pub async fn backup(
    gateway: &IndexGateway,
    core: Core,
    dir: &Path,
    at: DateTime<Utc>,
) -> Result<BackupSummary, EngineError> {
    let (path, not_imported_path) = backup_paths(dir, core, at);
    if let Some(folder) = path.parent() {
        fs::create_dir_all(folder).await?;
    }
    let mut all = ArrayWriter::open(BufWriter::new(File::create(&path).await?)).await?;
    let mut pending =
        ArrayWriter::open(BufWriter::new(File::create(&not_imported_path).await?)).await?;

    let docs = gateway.stream(core, Query::MatchAll, blob_fields(), Visibility::All);
    pin_mut!(docs);
    let mut seen = HashSet::new();
    while let Some(doc) = docs
        .try_next()
        .await
        .map_err(|e| EngineError::from_index(e, "backup"))?
    {
        let Some((id, blob)) = blob_of(core, &doc) else {
            continue;
        };
        if !seen.insert(id) {
            continue;
        }
        let serialised = serde_json::to_string(&blob)?;
        all.push(&serialised).await?;
        if doc.get_str(fields::EDITORIAL_STATUS) != Some(EditorialStatus::Imported.as_str()) {
            pending.push(&serialised).await?;
        }
    }
    let records = all.close().await?;
    let not_imported = pending.close().await?;
    debug!(path = %path.display(), "Backup written");

    info!(records, not_imported, "Backup finished");
    Ok(BackupSummary {
        path,
        not_imported_path,
        records,
        not_imported,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_file_names() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 15, 2).unwrap();
        assert_eq!(snapshot_file_name(Core::Work, at), "work_1709284502.json");

        let (main, pending) = backup_paths(Path::new("/backup"), Core::Person, at);
        assert_eq!(main, PathBuf::from("/backup/Freitag/2024-03-01_09-15-02_person.json"));
        assert_eq!(
            pending,
            PathBuf::from("/backup/Freitag/2024-03-01_09-15-02_person.not_imported.json")
        );
    }

    #[tokio::test]
    async fn test_array_writer_produces_json() {
        let mut buffer = Vec::new();
        let mut out = ArrayWriter::open(&mut buffer).await.unwrap();
        out.push(r#"{"id":"a"}"#).await.unwrap();
        out.push(r#"{"id":"b"}"#).await.unwrap();
        assert_eq!(out.close().await.unwrap(), 2);

        let parsed: Vec<Value> = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1]["id"], "b");
    }

    #[tokio::test]
    async fn test_empty_array() {
        let mut buffer = Vec::new();
        let out = ArrayWriter::open(&mut buffer).await.unwrap();
        assert_eq!(out.close().await.unwrap(), 0);
        let parsed: Vec<Value> = serde_json::from_slice(&buffer).unwrap();
        assert!(parsed.is_empty());
    }
}
