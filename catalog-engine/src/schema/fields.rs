//! Field descriptor tables for the four entity kinds.
//!
//! Every descriptor names a blob key, its semantic type and its constraints. The
//! tables are plain data; [`super::validate`] interprets them.

use catalog_shared::PubType;

use super::vocabulary::Vocabulary;

/// Constraint checked on the (normalised) string value of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    Doi,
    IsoDate,
    Isbn,
    Issn,
    Ismn,
    Gnd,
    Orcid,
    Viaf,
    Isni,
    OrganisationAuthority,
    Uri,
    Email,
}

#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Text,
    Flag,
    Enumeration(Vocabulary),
    /// Nested sub-record with its own descriptors.
    Record(&'static [FieldSpec]),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub repeatable: bool,
    pub required: bool,
    pub pattern: Option<Pattern>,
    /// Publication types the field belongs to; `None` means every type.
    pub pubtypes: Option<&'static [PubType]>,
    /// Publication types for which the field must be populated.
    pub required_for: &'static [PubType],
}

impl FieldSpec {
    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Text,
            repeatable: false,
            required: false,
            pattern: None,
            pubtypes: None,
            required_for: &[],
        }
    }

    pub const fn flag(name: &'static str) -> Self {
        Self {
            kind: FieldKind::Flag,
            ..Self::text(name)
        }
    }

    pub const fn date(name: &'static str) -> Self {
        Self::text(name).pattern(Pattern::IsoDate)
    }

    pub const fn uri(name: &'static str) -> Self {
        Self::text(name).pattern(Pattern::Uri)
    }

    pub const fn enumeration(name: &'static str, vocabulary: Vocabulary) -> Self {
        Self {
            kind: FieldKind::Enumeration(vocabulary),
            ..Self::text(name)
        }
    }

    pub const fn record(name: &'static str, fields: &'static [FieldSpec]) -> Self {
        Self {
            kind: FieldKind::Record(fields),
            ..Self::text(name)
        }
    }

    pub const fn repeat(mut self) -> Self {
        self.repeatable = true;
        self
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn pattern(mut self, pattern: Pattern) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub const fn only_for(mut self, pubtypes: &'static [PubType]) -> Self {
        self.pubtypes = Some(pubtypes);
        self
    }

    pub const fn required_for(mut self, pubtypes: &'static [PubType]) -> Self {
        self.required_for = pubtypes;
        self
    }

    pub fn applies_to(&self, pubtype: PubType) -> bool {
        self.pubtypes.map_or(true, |types| types.contains(&pubtype))
    }
}

pub const ENVELOPE: &[FieldSpec] = &[
    FieldSpec::text("id").required(),
    FieldSpec::text("created"),
    FieldSpec::text("changed"),
    FieldSpec::enumeration("editorial_status", Vocabulary::EditorialStatus),
    FieldSpec::enumeration("catalog", Vocabulary::Catalog)
        .repeat()
        .required(),
    FieldSpec::text("owner").repeat().required(),
    FieldSpec::text("deskman"),
    FieldSpec::flag("locked"),
    FieldSpec::text("same_as").repeat(),
];

const URL: &[FieldSpec] = &[FieldSpec::uri("url").required(), FieldSpec::text("label")];

const ABSTRACT: &[FieldSpec] = &[
    FieldSpec::text("content").required(),
    FieldSpec::enumeration("language", Vocabulary::Language),
    FieldSpec::flag("shareable"),
];

const PERSON_REF: &[FieldSpec] = &[
    FieldSpec::text("name").required(),
    FieldSpec::enumeration("role", Vocabulary::Relator).repeat(),
    FieldSpec::text("gnd").pattern(Pattern::Gnd),
    FieldSpec::text("orcid").pattern(Pattern::Orcid),
    FieldSpec::enumeration("member_of", Vocabulary::Catalog).repeat(),
    FieldSpec::flag("corresponding_author"),
];

const CORPORATION_REF: &[FieldSpec] = &[
    FieldSpec::text("name").required(),
    FieldSpec::enumeration("role", Vocabulary::Relator).repeat(),
    FieldSpec::text("gnd").pattern(Pattern::OrganisationAuthority),
    FieldSpec::text("viaf").pattern(Pattern::Viaf),
    FieldSpec::text("isni").pattern(Pattern::Isni),
    FieldSpec::enumeration("member_of", Vocabulary::Catalog).repeat(),
];

const IS_PART_OF: &[FieldSpec] = &[
    FieldSpec::text("is_part_of").required(),
    FieldSpec::text("volume"),
    FieldSpec::text("issue"),
    FieldSpec::text("page_first"),
    FieldSpec::text("page_last"),
    FieldSpec::text("number"),
];

const HAS_PART: &[FieldSpec] = &[FieldSpec::text("has_part").required()];

const OTHER_VERSION: &[FieldSpec] = &[FieldSpec::text("other_version").required()];

const EVENT: &[FieldSpec] = &[
    FieldSpec::text("event_name").required(),
    FieldSpec::text("event_place"),
    FieldSpec::date("startdate_conference"),
    FieldSpec::date("enddate_conference"),
    FieldSpec::text("numbering"),
];

const OPEN_ACCESS: &[FieldSpec] = &[
    FieldSpec::text("project_identifier"),
    FieldSpec::enumeration("access_level", Vocabulary::AccessLevel),
    FieldSpec::uri("license_url"),
    FieldSpec::uri("sherpa_romeo"),
    FieldSpec::text("mime_type"),
];

const PATENT: &[PubType] = &[PubType::Patent];
const STANDARD: &[PubType] = &[PubType::Standard];
const SOFTWARE: &[PubType] = &[PubType::Software];
const THESIS: &[PubType] = &[PubType::Thesis];
const RESEARCH_DATA: &[PubType] = &[PubType::ResearchData];

pub const WORK: &[FieldSpec] = &[
    FieldSpec::enumeration("pubtype", Vocabulary::PubType).required(),
    FieldSpec::text("subtype"),
    FieldSpec::text("title").required(),
    FieldSpec::text("subtitle"),
    FieldSpec::date("issued").repeat(),
    FieldSpec::enumeration("language", Vocabulary::Language).repeat(),
    FieldSpec::record("abstract", ABSTRACT).repeat(),
    FieldSpec::text("keyword").repeat(),
    FieldSpec::text("keyword_temporal").repeat(),
    FieldSpec::text("keyword_geographic").repeat(),
    FieldSpec::text("mesh_subject").repeat(),
    FieldSpec::text("stw_subject").repeat(),
    FieldSpec::text("ddc_subject").repeat(),
    FieldSpec::text("swd_subject").repeat(),
    FieldSpec::text("lcsh_subject").repeat(),
    FieldSpec::text("thesoz_subject").repeat(),
    FieldSpec::text("DOI").repeat().pattern(Pattern::Doi),
    FieldSpec::text("ISBN").repeat().pattern(Pattern::Isbn),
    FieldSpec::text("ISMN").repeat().pattern(Pattern::Ismn),
    FieldSpec::text("ISSN").repeat().pattern(Pattern::Issn),
    FieldSpec::text("ZDBID").repeat(),
    FieldSpec::text("PMID").repeat(),
    FieldSpec::text("WOSID").repeat(),
    FieldSpec::text("URN").repeat(),
    FieldSpec::text("HBZID").repeat(),
    FieldSpec::record("person", PERSON_REF).repeat(),
    FieldSpec::record("corporation", CORPORATION_REF).repeat(),
    FieldSpec::record("is_part_of", IS_PART_OF).repeat(),
    FieldSpec::record("has_part", HAS_PART).repeat(),
    FieldSpec::record("other_version", OTHER_VERSION).repeat(),
    FieldSpec::text("affiliation_context").repeat(),
    FieldSpec::text("group_context").repeat(),
    FieldSpec::record("event", EVENT).repeat(),
    FieldSpec::record("open_access", OPEN_ACCESS),
    FieldSpec::text("publisher"),
    FieldSpec::text("publisher_place"),
    FieldSpec::text("edition"),
    FieldSpec::text("number_of_pages"),
    FieldSpec::text("note"),
    FieldSpec::text("patent_number")
        .only_for(PATENT)
        .required_for(PATENT),
    FieldSpec::text("application_number").only_for(PATENT),
    FieldSpec::date("priority_date").only_for(PATENT),
    FieldSpec::text("ipc_keyword").repeat().only_for(PATENT),
    FieldSpec::text("standard_number")
        .only_for(STANDARD)
        .required_for(STANDARD),
    FieldSpec::text("standard_revision").only_for(STANDARD),
    FieldSpec::text("operating_system").repeat().only_for(SOFTWARE),
    FieldSpec::text("software_version").only_for(SOFTWARE),
    FieldSpec::enumeration("thesis_type", Vocabulary::ThesisType).only_for(THESIS),
    FieldSpec::text("thesis_institution").only_for(THESIS),
    FieldSpec::text("data_format").only_for(RESEARCH_DATA),
    FieldSpec::text("data_repository").only_for(RESEARCH_DATA),
];

const AFFILIATION: &[FieldSpec] = &[
    FieldSpec::text("organisation_id").required(),
    FieldSpec::text("label"),
    FieldSpec::date("start_date"),
    FieldSpec::date("end_date"),
];

const GROUP_MEMBERSHIP: &[FieldSpec] = &[
    FieldSpec::text("group_id").required(),
    FieldSpec::text("label"),
    FieldSpec::date("start_date"),
    FieldSpec::date("end_date"),
];

pub const PERSON: &[FieldSpec] = &[
    FieldSpec::text("name").required(),
    FieldSpec::text("also_known_as").repeat(),
    FieldSpec::text("gnd").pattern(Pattern::Gnd),
    FieldSpec::text("orcid").pattern(Pattern::Orcid),
    FieldSpec::text("viaf").pattern(Pattern::Viaf),
    FieldSpec::text("isni").pattern(Pattern::Isni),
    FieldSpec::text("researcher_id"),
    FieldSpec::text("scopus_id"),
    FieldSpec::text("arxiv_id"),
    FieldSpec::record("affiliation", AFFILIATION).repeat(),
    FieldSpec::record("group", GROUP_MEMBERSHIP).repeat(),
    FieldSpec::record("url", URL).repeat(),
    FieldSpec::text("status").repeat(),
    FieldSpec::enumeration("member_of", Vocabulary::Catalog).repeat(),
    FieldSpec::text("research_interest").repeat(),
    FieldSpec::text("email").pattern(Pattern::Email),
    FieldSpec::text("note"),
];

const CHILD: &[FieldSpec] = &[
    FieldSpec::text("child_id").required(),
    FieldSpec::text("child_label"),
];

const DESTATIS: &[FieldSpec] = &[
    FieldSpec::text("destatis_id").required(),
    FieldSpec::text("destatis_label"),
];

pub const ORGANISATION: &[FieldSpec] = &[
    FieldSpec::text("pref_label").required(),
    FieldSpec::text("alt_label").repeat(),
    FieldSpec::text("account").repeat(),
    FieldSpec::text("gnd").pattern(Pattern::OrganisationAuthority),
    FieldSpec::text("viaf").pattern(Pattern::Viaf),
    FieldSpec::text("isni").pattern(Pattern::Isni),
    FieldSpec::text("parent_id"),
    FieldSpec::text("parent_label"),
    FieldSpec::record("children", CHILD).repeat(),
    FieldSpec::record("destatis", DESTATIS).repeat(),
    FieldSpec::date("start_date"),
    FieldSpec::date("end_date"),
    FieldSpec::record("url", URL).repeat(),
    FieldSpec::text("note"),
];

const FUND: &[FieldSpec] = &[
    FieldSpec::text("organisation"),
    FieldSpec::text("project_id"),
    FieldSpec::text("label").required(),
];

pub const GROUP: &[FieldSpec] = &[
    FieldSpec::text("pref_label").required(),
    FieldSpec::text("alt_label").repeat(),
    FieldSpec::text("gnd").pattern(Pattern::Gnd),
    FieldSpec::record("funds", FUND).repeat(),
    FieldSpec::text("parent_id"),
    FieldSpec::date("start_date"),
    FieldSpec::date("end_date"),
    FieldSpec::record("url", URL).repeat(),
    FieldSpec::text("note"),
];
