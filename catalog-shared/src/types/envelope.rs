//! Administrative envelope shared by every entity kind.
//!
//! The envelope carries identity, timestamps, workflow state, tenancy and the
//! cooperative lock flag. It is flattened into each record's blob, so its keys sit at
//! the top level of `wtf_json` next to the payload fields.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Workflow state of a record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum EditorialStatus {
    #[default]
    New,
    InProcess,
    Processed,
    FinalEditing,
    Finalized,
    Imported,
    Deleted,
}

impl EditorialStatus {
    /// Returns the wire value used in the blob and in the index.
    pub fn as_str(&self) -> &'static str {
        match self {
            EditorialStatus::New => "new",
            EditorialStatus::InProcess => "in_process",
            EditorialStatus::Processed => "processed",
            EditorialStatus::FinalEditing => "final_editing",
            EditorialStatus::Finalized => "finalized",
            EditorialStatus::Imported => "imported",
            EditorialStatus::Deleted => "deleted",
        }
    }

    pub fn all() -> &'static [EditorialStatus] {
        &[
            EditorialStatus::New,
            EditorialStatus::InProcess,
            EditorialStatus::Processed,
            EditorialStatus::FinalEditing,
            EditorialStatus::Finalized,
            EditorialStatus::Imported,
            EditorialStatus::Deleted,
        ]
    }
}

impl fmt::Display for EditorialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EditorialStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EditorialStatus::all()
            .iter()
            .find(|status| status.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown editorial status '{}'", s))
    }
}

/// Tenant tag partitioning records by owning institution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Catalog {
    #[serde(rename = "Ruhr-Universität Bochum")]
    Rub,
    #[serde(rename = "Technische Universität Dortmund")]
    Tudo,
    #[serde(rename = "Temporäre Daten")]
    Temporary,
}

impl Catalog {
    /// Returns the catalog label used in blobs, facets and queue keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Catalog::Rub => "Ruhr-Universität Bochum",
            Catalog::Tudo => "Technische Universität Dortmund",
            Catalog::Temporary => "Temporäre Daten",
        }
    }

    /// Short code used to build per-catalog index field names (`member_rub`, ...).
    pub fn code(&self) -> &'static str {
        match self {
            Catalog::Rub => "rub",
            Catalog::Tudo => "tudo",
            Catalog::Temporary => "tmp",
        }
    }

    pub fn all() -> &'static [Catalog] {
        &[Catalog::Rub, Catalog::Tudo, Catalog::Temporary]
    }
}

impl fmt::Display for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Catalog {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Catalog::all()
            .iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(trimmed) || c.code() == trimmed)
            .copied()
            .ok_or_else(|| format!("unknown catalog '{}'", s))
    }
}

/// Role of the caller performing an editorial operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
    Superadmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::Superadmin => "superadmin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            "superadmin" => Ok(Role::Superadmin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Which records a read may observe.
///
/// Records in status `deleted` are only visible to superadmin reads and to the
/// engine's own internal reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Deleted records are filtered out.
    Public,
    /// Every record is visible.
    All,
}

impl Visibility {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Superadmin => Visibility::All,
            Role::User | Role::Admin => Visibility::Public,
        }
    }
}

/// Administrative fields present on every entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Envelope {
    #[serde(default)]
    pub id: String,
    #[serde(default, with = "blob_time")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, with = "blob_time")]
    pub changed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub editorial_status: EditorialStatus,
    #[serde(default)]
    pub catalog: Vec<Catalog>,
    #[serde(default)]
    pub owner: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deskman: Option<String>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub same_as: Vec<String>,
}

impl Envelope {
    /// Create an envelope with the given id and no timestamps.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Record `alias` in `same_as` unless it is already present or equals the id.
    pub fn add_alias(&mut self, alias: impl Into<String>) {
        let alias = alias.into();
        if alias.is_empty() || alias == self.id || self.same_as.contains(&alias) {
            return;
        }
        self.same_as.push(alias);
    }

    /// Stamp `changed` (and `created` on first save) with the given instant.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        let now = now.trunc_subsecs(6);
        if self.created.is_none() {
            self.created = Some(now);
        }
        self.changed = Some(now);
    }
}

/// Current time truncated to the precision kept in the blob.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Format a timestamp the way the index stores it: ISO-8601 with milliseconds.
pub fn index_time(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Serde adapter writing timestamps in the human format kept in the blob
/// (`2024-03-01 09:15:02.123456`). Absent timestamps serialize as an empty string.
pub mod blob_time {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_str(&ts.format(FORMAT).to_string()),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => parse(s).map(Some).map_err(serde::de::Error::custom),
        }
    }

    /// Parse either the human blob format or RFC 3339.
    pub fn parse(s: &str) -> Result<DateTime<Utc>, String> {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
            return Ok(naive.and_utc());
        }
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| format!("invalid timestamp '{}': {}", s, e))
    }
}
