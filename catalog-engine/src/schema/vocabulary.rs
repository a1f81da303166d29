//! Enumeration sources for schema fields.
//!
//! Each vocabulary maps submitted tokens (codes, labels, differently cased
//! spellings) onto the canonical id stored in the blob.

use catalog_shared::{Catalog, EditorialStatus, PubType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vocabulary {
    Catalog,
    EditorialStatus,
    PubType,
    Language,
    /// MARC relator codes for contributor roles.
    Relator,
    AccessLevel,
    ThesisType,
}

/// `(canonical id, accepted aliases)`.
type Table = &'static [(&'static str, &'static [&'static str])];

const LANGUAGES: Table = &[
    ("ger", &["de", "deu", "german", "deutsch"]),
    ("eng", &["en", "english", "englisch"]),
    ("fre", &["fr", "fra", "french", "französisch"]),
    ("spa", &["es", "spanish", "spanisch"]),
    ("ita", &["it", "italian", "italienisch"]),
    ("dut", &["nl", "nld", "dutch", "niederländisch"]),
    ("por", &["pt", "portuguese", "portugiesisch"]),
    ("rus", &["ru", "russian", "russisch"]),
    ("pol", &["pl", "polish", "polnisch"]),
    ("tur", &["tr", "turkish", "türkisch"]),
    ("chi", &["zh", "zho", "chinese", "chinesisch"]),
    ("jpn", &["ja", "japanese", "japanisch"]),
    ("lat", &["la", "latin", "latein"]),
    ("gre", &["el", "ell", "greek", "griechisch"]),
    ("mul", &["multiple", "mehrsprachig"]),
    ("und", &["undetermined", "unbestimmt"]),
];

const RELATORS: Table = &[
    ("aut", &["author", "autor"]),
    ("edt", &["editor", "herausgeber", "hrsg"]),
    ("ctb", &["contributor", "mitwirkender"]),
    ("trl", &["translator", "übersetzer"]),
    ("ths", &["thesis advisor", "betreuer"]),
    ("rev", &["reviewer", "gutachter"]),
    ("ill", &["illustrator"]),
    ("pht", &["photographer", "fotograf"]),
    ("inv", &["inventor", "erfinder"]),
    ("prg", &["programmer", "programmierer"]),
    ("his", &["host institution"]),
    ("red", &["redactor", "redakteur"]),
    ("ive", &["interviewee"]),
    ("ivr", &["interviewer"]),
    ("spk", &["speaker", "sprecher"]),
];

const ACCESS_LEVELS: Table = &[
    ("public", &["open", "oa", "öffentlich"]),
    ("restricted", &["embargo", "eingeschränkt"]),
    ("closed", &["private", "geschlossen"]),
];

const THESIS_TYPES: Table = &[
    ("bachelor", &["bachelor thesis", "bachelorarbeit"]),
    ("master", &["master thesis", "masterarbeit"]),
    ("diploma", &["diplomarbeit", "diplom"]),
    ("magister", &["magisterarbeit"]),
    ("staatsexamen", &["state examination"]),
    ("doctoral", &["dissertation", "phd", "doctoral thesis"]),
    ("habilitation", &["habilitationsschrift"]),
];

fn lookup(table: Table, token: &str) -> Option<&'static str> {
    let lower = token.trim().to_lowercase();
    table
        .iter()
        .find(|(id, aliases)| *id == lower || aliases.iter().any(|a| *a == lower))
        .map(|(id, _)| *id)
}

impl Vocabulary {
    pub fn name(&self) -> &'static str {
        match self {
            Vocabulary::Catalog => "catalog",
            Vocabulary::EditorialStatus => "editorial status",
            Vocabulary::PubType => "pubtype",
            Vocabulary::Language => "language",
            Vocabulary::Relator => "relator code",
            Vocabulary::AccessLevel => "access level",
            Vocabulary::ThesisType => "thesis type",
        }
    }

    /// The canonical id for `token`, or `None` when the token is not part of
    /// the vocabulary.
    pub fn canonical(&self, token: &str) -> Option<&'static str> {
        match self {
            Vocabulary::Catalog => token.parse::<Catalog>().ok().map(|c| c.as_str()),
            Vocabulary::EditorialStatus => token
                .trim()
                .to_lowercase()
                .replace([' ', '-'], "_")
                .parse::<EditorialStatus>()
                .ok()
                .map(|s| s.as_str()),
            Vocabulary::PubType => token.parse::<PubType>().ok().map(|t| t.as_str()),
            Vocabulary::Language => lookup(LANGUAGES, token),
            Vocabulary::Relator => lookup(RELATORS, token),
            Vocabulary::AccessLevel => lookup(ACCESS_LEVELS, token),
            Vocabulary::ThesisType => lookup(THESIS_TYPES, token),
        }
    }
}
