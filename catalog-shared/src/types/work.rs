//! Publication records ("works").
//!
//! A work is the richest of the four entity kinds. Besides the common envelope it
//! carries bibliographic description, identifiers, contributor lists, host/part
//! relations and a handful of fields that only apply to particular publication types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::envelope::{Catalog, Envelope};

/// Publication type discriminator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PubType {
    ArticleJournal,
    ArticleNewspaper,
    AudioVideoDocument,
    Chapter,
    ChapterInLegalCommentary,
    ChapterInMonograph,
    Collection,
    Conference,
    Edition,
    InternetDocument,
    Journal,
    Lecture,
    LegalCommentary,
    Monograph,
    MultivolumeWork,
    Newspaper,
    Other,
    Patent,
    PressRelease,
    ReportDoc,
    ResearchData,
    Series,
    Software,
    SpecialIssue,
    Standard,
    Thesis,
    Translation,
}

impl PubType {
    pub fn all() -> &'static [PubType] {
        use PubType::*;
        &[
            ArticleJournal,
            ArticleNewspaper,
            AudioVideoDocument,
            Chapter,
            ChapterInLegalCommentary,
            ChapterInMonograph,
            Collection,
            Conference,
            Edition,
            InternetDocument,
            Journal,
            Lecture,
            LegalCommentary,
            Monograph,
            MultivolumeWork,
            Newspaper,
            Other,
            Patent,
            PressRelease,
            ReportDoc,
            ResearchData,
            Series,
            Software,
            SpecialIssue,
            Standard,
            Thesis,
            Translation,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        use PubType::*;
        match self {
            ArticleJournal => "ArticleJournal",
            ArticleNewspaper => "ArticleNewspaper",
            AudioVideoDocument => "AudioVideoDocument",
            Chapter => "Chapter",
            ChapterInLegalCommentary => "ChapterInLegalCommentary",
            ChapterInMonograph => "ChapterInMonograph",
            Collection => "Collection",
            Conference => "Conference",
            Edition => "Edition",
            InternetDocument => "InternetDocument",
            Journal => "Journal",
            Lecture => "Lecture",
            LegalCommentary => "LegalCommentary",
            Monograph => "Monograph",
            MultivolumeWork => "MultivolumeWork",
            Newspaper => "Newspaper",
            Other => "Other",
            Patent => "Patent",
            PressRelease => "PressRelease",
            ReportDoc => "ReportDoc",
            ResearchData => "ResearchData",
            Series => "Series",
            Software => "Software",
            SpecialIssue => "SpecialIssue",
            Standard => "Standard",
            Thesis => "Thesis",
            Translation => "Translation",
        }
    }

    /// Kind of host this type is, which decides the denormalised title field
    /// written for parts that reference it.
    pub fn host_kind(&self) -> HostKind {
        match self {
            PubType::Journal | PubType::SpecialIssue => HostKind::Journal,
            PubType::Newspaper => HostKind::Newspaper,
            PubType::Series => HostKind::Series,
            _ => HostKind::Container,
        }
    }
}

impl fmt::Display for PubType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PubType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PubType::all()
            .iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| format!("unknown pubtype '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKind {
    Journal,
    Newspaper,
    Series,
    Container,
}

/// A contributor embedded in a work.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PersonRef {
    /// Display name in "Family, Given" form.
    #[serde(default)]
    pub name: String,
    /// MARC relator codes (`aut`, `edt`, `ctb`, ...).
    #[serde(default)]
    pub role: Vec<String>,
    #[serde(default)]
    pub gnd: String,
    #[serde(default)]
    pub orcid: String,
    #[serde(default)]
    pub member_of: Vec<Catalog>,
    #[serde(default)]
    pub corresponding_author: bool,
}

impl PersonRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn has_role(&self, code: &str) -> bool {
        self.role.iter().any(|r| r == code)
    }
}

/// A corporate contributor embedded in a work.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CorporationRef {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: Vec<String>,
    #[serde(default)]
    pub gnd: String,
    #[serde(default)]
    pub viaf: String,
    #[serde(default)]
    pub isni: String,
    #[serde(default)]
    pub member_of: Vec<Catalog>,
}

/// Reference from a part to its host, with the part's position inside it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct IsPartOf {
    #[serde(default)]
    pub is_part_of: String,
    #[serde(default)]
    pub volume: String,
    #[serde(default)]
    pub issue: String,
    #[serde(default)]
    pub page_first: String,
    #[serde(default)]
    pub page_last: String,
    #[serde(default)]
    pub number: String,
}

impl IsPartOf {
    pub fn new(host_id: impl Into<String>) -> Self {
        Self {
            is_part_of: host_id.into(),
            ..Default::default()
        }
    }
}

/// Reference from a host to one of its parts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct HasPart {
    #[serde(default)]
    pub has_part: String,
}

/// Reference to another version of the same work.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct OtherVersion {
    #[serde(default)]
    pub other_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Abstract {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub shareable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EventInfo {
    #[serde(default)]
    pub event_name: String,
    #[serde(default)]
    pub event_place: String,
    #[serde(default)]
    pub startdate_conference: String,
    #[serde(default)]
    pub enddate_conference: String,
    #[serde(default)]
    pub numbering: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct OpenAccess {
    #[serde(default)]
    pub project_identifier: String,
    #[serde(default)]
    pub access_level: String,
    #[serde(default)]
    pub license_url: String,
    #[serde(default)]
    pub sherpa_romeo: String,
    #[serde(default)]
    pub mime_type: String,
}

/// A publication record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Work {
    #[serde(flatten)]
    pub envelope: Envelope,
    pub pubtype: PubType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub issued: Vec<String>,
    #[serde(default)]
    pub language: Vec<String>,
    #[serde(default, rename = "abstract")]
    pub abstracts: Vec<Abstract>,
    #[serde(default)]
    pub keyword: Vec<String>,
    #[serde(default)]
    pub keyword_temporal: Vec<String>,
    #[serde(default)]
    pub keyword_geographic: Vec<String>,
    #[serde(default)]
    pub mesh_subject: Vec<String>,
    #[serde(default)]
    pub stw_subject: Vec<String>,
    #[serde(default)]
    pub ddc_subject: Vec<String>,
    #[serde(default)]
    pub swd_subject: Vec<String>,
    #[serde(default)]
    pub lcsh_subject: Vec<String>,
    #[serde(default)]
    pub thesoz_subject: Vec<String>,
    #[serde(default, rename = "DOI")]
    pub doi: Vec<String>,
    #[serde(default, rename = "ISBN")]
    pub isbn: Vec<String>,
    #[serde(default, rename = "ISMN")]
    pub ismn: Vec<String>,
    #[serde(default, rename = "ISSN")]
    pub issn: Vec<String>,
    #[serde(default, rename = "ZDBID")]
    pub zdb: Vec<String>,
    #[serde(default, rename = "PMID")]
    pub pmid: Vec<String>,
    #[serde(default, rename = "WOSID")]
    pub wosid: Vec<String>,
    #[serde(default, rename = "URN")]
    pub urn: Vec<String>,
    #[serde(default, rename = "HBZID")]
    pub hbz: Vec<String>,
    #[serde(default)]
    pub person: Vec<PersonRef>,
    #[serde(default)]
    pub corporation: Vec<CorporationRef>,
    #[serde(default)]
    pub is_part_of: Vec<IsPartOf>,
    #[serde(default)]
    pub has_part: Vec<HasPart>,
    #[serde(default)]
    pub other_version: Vec<OtherVersion>,
    /// Organisation ids this work is attributed to.
    #[serde(default)]
    pub affiliation_context: Vec<String>,
    /// Working group ids this work is attributed to.
    #[serde(default)]
    pub group_context: Vec<String>,
    #[serde(default)]
    pub event: Vec<EventInfo>,
    #[serde(default)]
    pub open_access: OpenAccess,
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub publisher_place: String,
    #[serde(default)]
    pub edition: String,
    #[serde(default)]
    pub number_of_pages: String,
    #[serde(default)]
    pub note: String,

    // Patent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patent_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority_date: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ipc_keyword: Vec<String>,

    // Standard
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard_revision: Option<String>,

    // Software
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operating_system: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub software_version: Option<String>,

    // Thesis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thesis_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thesis_institution: Option<String>,

    // ResearchData
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_repository: Option<String>,
}

impl Work {
    /// Create an otherwise empty work of the given type.
    pub fn new(id: impl Into<String>, pubtype: PubType, title: impl Into<String>) -> Self {
        Self {
            envelope: Envelope::new(id),
            pubtype,
            subtype: None,
            title: title.into(),
            subtitle: String::new(),
            issued: Vec::new(),
            language: Vec::new(),
            abstracts: Vec::new(),
            keyword: Vec::new(),
            keyword_temporal: Vec::new(),
            keyword_geographic: Vec::new(),
            mesh_subject: Vec::new(),
            stw_subject: Vec::new(),
            ddc_subject: Vec::new(),
            swd_subject: Vec::new(),
            lcsh_subject: Vec::new(),
            thesoz_subject: Vec::new(),
            doi: Vec::new(),
            isbn: Vec::new(),
            ismn: Vec::new(),
            issn: Vec::new(),
            zdb: Vec::new(),
            pmid: Vec::new(),
            wosid: Vec::new(),
            urn: Vec::new(),
            hbz: Vec::new(),
            person: Vec::new(),
            corporation: Vec::new(),
            is_part_of: Vec::new(),
            has_part: Vec::new(),
            other_version: Vec::new(),
            affiliation_context: Vec::new(),
            group_context: Vec::new(),
            event: Vec::new(),
            open_access: OpenAccess::default(),
            publisher: String::new(),
            publisher_place: String::new(),
            edition: String::new(),
            number_of_pages: String::new(),
            note: String::new(),
            patent_number: None,
            application_number: None,
            priority_date: None,
            ipc_keyword: Vec::new(),
            standard_number: None,
            standard_revision: None,
            operating_system: Vec::new(),
            software_version: None,
            thesis_type: None,
            thesis_institution: None,
            data_format: None,
            data_repository: None,
        }
    }

    /// The first issued date, which drives the date facets.
    pub fn primary_issued(&self) -> Option<&str> {
        self.issued
            .iter()
            .map(|d| d.trim())
            .find(|d| !d.is_empty())
    }

    pub fn host_ids(&self) -> impl Iterator<Item = &str> {
        self.is_part_of
            .iter()
            .map(|r| r.is_part_of.as_str())
            .filter(|id| !id.is_empty())
    }

    pub fn part_ids(&self) -> impl Iterator<Item = &str> {
        self.has_part
            .iter()
            .map(|r| r.has_part.as_str())
            .filter(|id| !id.is_empty())
    }

    pub fn other_version_ids(&self) -> impl Iterator<Item = &str> {
        self.other_version
            .iter()
            .map(|r| r.other_version.as_str())
            .filter(|id| !id.is_empty())
    }
}
