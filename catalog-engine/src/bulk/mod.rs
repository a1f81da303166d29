//! Snapshot transfer.
//!
//! A snapshot is a JSON array of record blobs from one core. Export writes one by
//! scanning the core in id order; import runs every element through the regular
//! import path of the engine.

pub mod export;
pub mod import;

pub use export::{backup, export, snapshot_file_name, BackupSummary, ExportConfig, ExportSummary};
pub use import::{import_file, import_snapshot, read_snapshot, ImportFailure, ImportOptions, ImportSummary};
