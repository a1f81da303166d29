//! CSL-JSON bridge.
//!
//! Works are exchanged with reference managers as CSL items. The host of a part
//! (journal, collection, series) is supplied separately through [`HostContext`]
//! since the work itself only stores its id.

use catalog_shared::types::person::split_name;
use catalog_shared::types::work::{IsPartOf, PersonRef};
use catalog_shared::{PubType, Work};
use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

/// Internal pubtype and CSL type. The first row for a CSL type wins when reading.
const TYPE_TABLE: &[(PubType, &str)] = &[
    (PubType::ArticleJournal, "article-journal"),
    (PubType::ArticleNewspaper, "article-newspaper"),
    (PubType::Monograph, "book"),
    (PubType::Collection, "book"),
    (PubType::MultivolumeWork, "book"),
    (PubType::Edition, "book"),
    (PubType::LegalCommentary, "book"),
    (PubType::Translation, "book"),
    (PubType::Chapter, "chapter"),
    (PubType::ChapterInMonograph, "chapter"),
    (PubType::ChapterInLegalCommentary, "chapter"),
    (PubType::Conference, "paper-conference"),
    (PubType::Thesis, "thesis"),
    (PubType::Patent, "patent"),
    (PubType::ReportDoc, "report"),
    (PubType::ResearchData, "dataset"),
    (PubType::Software, "software"),
    (PubType::Standard, "standard"),
    (PubType::InternetDocument, "webpage"),
    (PubType::Lecture, "speech"),
    (PubType::AudioVideoDocument, "motion_picture"),
    (PubType::Journal, "periodical"),
    (PubType::SpecialIssue, "periodical"),
    (PubType::Newspaper, "periodical"),
    (PubType::Series, "collection"),
    (PubType::PressRelease, "article"),
    (PubType::Other, "article"),
];

pub fn csl_type(pubtype: PubType) -> &'static str {
    TYPE_TABLE
        .iter()
        .find(|(t, _)| *t == pubtype)
        .map_or("article", |(_, csl)| csl)
}

pub fn pubtype_of(csl: &str) -> PubType {
    TYPE_TABLE
        .iter()
        .find(|(_, c)| c.eq_ignore_ascii_case(csl.trim()))
        .map_or(PubType::Other, |(t, _)| *t)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CslName {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub family: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub given: String,
    /// Corporate or unparsed names.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub literal: String,
}

impl CslName {
    fn from_display(name: &str) -> Self {
        let (family, given) = split_name(name);
        Self {
            family: family.to_string(),
            given: given.to_string(),
            literal: String::new(),
        }
    }

    fn literal(name: &str) -> Self {
        Self {
            literal: name.trim().to_string(),
            ..Default::default()
        }
    }

    /// "Family, Given", or the literal.
    pub fn display(&self) -> String {
        match (self.family.trim(), self.given.trim()) {
            ("", _) => self.literal.trim().to_string(),
            (family, "") => family.to_string(),
            (family, given) => format!("{}, {}", family, given),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CslDate {
    #[serde(rename = "date-parts", default)]
    pub date_parts: Vec<Vec<i32>>,
}

impl CslDate {
    /// Parse `YYYY`, `YYYY-MM` or `YYYY-MM-DD`.
    pub fn from_iso(date: &str) -> Option<Self> {
        let parts = date
            .trim()
            .split('-')
            .map(|p| p.parse::<i32>().ok())
            .collect::<Option<Vec<_>>>()?;
        (!parts.is_empty() && parts.len() <= 3).then(|| Self {
            date_parts: vec![parts],
        })
    }

    pub fn to_iso(&self) -> Option<String> {
        let parts = self.date_parts.first()?;
        let (year, rest) = parts.split_first()?;
        let mut iso = format!("{:04}", year);
        for part in rest.iter().take(2) {
            iso.push_str(&format!("-{:02}", part));
        }
        Some(iso)
    }
}

/// A CSL-JSON item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CslItem {
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub author: Vec<CslName>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub editor: Vec<CslName>,
    #[serde(rename = "container-title", default, skip_serializing_if = "Option::is_none")]
    pub container_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued: Option<CslDate>,
    #[serde(rename = "DOI", default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(rename = "ISBN", default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(rename = "ISSN", default, skip_serializing_if = "Option::is_none")]
    pub issn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(rename = "publisher-place", default, skip_serializing_if = "Option::is_none")]
    pub publisher_place: Option<String>,
    #[serde(rename = "abstract", default, skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
}

/// What a citation needs to know about the host of a part.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostContext {
    pub title: Option<String>,
    pub issn: Vec<String>,
    pub isbn: Vec<String>,
}

impl HostContext {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn of(host: &Work) -> Self {
        Self {
            title: non_empty(&host.title),
            issn: host.issn.clone(),
            isbn: host.isbn.clone(),
        }
    }
}

/// A work read from a CSL item, with the host title it named.
#[derive(Debug, Clone, PartialEq)]
pub struct CslImport {
    pub work: Work,
    pub container_title: Option<String>,
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn first(values: &[String]) -> Option<String> {
    values.iter().find_map(|v| non_empty(v))
}

/// `"12-34"` into first and last page. En dashes count as separators.
pub fn split_pages(page: &str) -> (String, String) {
    match page.trim().split_once(['-', '–']) {
        Some((first, last)) => (first.trim().to_string(), last.trim().to_string()),
        None => (page.trim().to_string(), String::new()),
    }
}

fn join_pages(first: &str, last: &str) -> Option<String> {
    match (first.trim(), last.trim()) {
        ("", "") => None,
        (first, "") => Some(first.to_string()),
        ("", last) => Some(last.to_string()),
        (first, last) => Some(format!("{}-{}", first, last)),
    }
}

pub fn to_csl(work: &Work, host: &HostContext) -> CslItem {
    let mut author = Vec::new();
    let mut editor = Vec::new();
    for person in &work.person {
        let name = CslName::from_display(&person.name);
        let is_editor = person.has_role("edt");
        if is_editor {
            editor.push(name.clone());
        }
        if person.has_role("aut") || !is_editor {
            author.push(name);
        }
    }
    for corporation in &work.corporation {
        let name = CslName::literal(&corporation.name);
        if corporation.role.iter().any(|r| r == "edt") {
            editor.push(name);
        } else {
            author.push(name);
        }
    }

    let position = work.is_part_of.first();
    CslItem {
        id: work.envelope.id.clone(),
        item_type: csl_type(work.pubtype).to_string(),
        title: work.title.trim().to_string(),
        author,
        editor,
        container_title: host.title.clone(),
        volume: position.and_then(|p| non_empty(&p.volume)),
        issue: position.and_then(|p| non_empty(&p.issue)),
        page: position.and_then(|p| join_pages(&p.page_first, &p.page_last)),
        issued: work.primary_issued().and_then(CslDate::from_iso),
        doi: first(&work.doi),
        isbn: first(&work.isbn).or_else(|| first(&host.isbn)),
        issn: first(&work.issn).or_else(|| first(&host.issn)),
        language: first(&work.language),
        publisher: non_empty(&work.publisher),
        publisher_place: non_empty(&work.publisher_place),
        abstract_text: work.abstracts.first().and_then(|a| non_empty(&a.content)),
    }
}

pub fn from_csl(item: &CslItem) -> Result<CslImport, EngineError> {
    if item.id.trim().is_empty() {
        return Err(EngineError::serialization("CSL item has no id"));
    }
    let mut work = Work::new(item.id.trim(), pubtype_of(&item.item_type), item.title.trim());

    for (names, role) in [(&item.author, "aut"), (&item.editor, "edt")] {
        for name in names {
            let display = name.display();
            if display.is_empty() {
                continue;
            }
            let mut person = PersonRef::new(display);
            person.role.push(role.to_string());
            work.person.push(person);
        }
    }

    if let Some(issued) = item.issued.as_ref().and_then(CslDate::to_iso) {
        work.issued.push(issued);
    }
    let optional = |v: &Option<String>| v.as_deref().and_then(non_empty);
    work.doi.extend(optional(&item.doi));
    work.isbn.extend(optional(&item.isbn));
    work.issn.extend(optional(&item.issn));
    work.language.extend(optional(&item.language));
    work.publisher = optional(&item.publisher).unwrap_or_default();
    work.publisher_place = optional(&item.publisher_place).unwrap_or_default();
    if let Some(content) = optional(&item.abstract_text) {
        work.abstracts.push(catalog_shared::types::work::Abstract {
            content,
            ..Default::default()
        });
    }

    let volume = optional(&item.volume);
    let issue = optional(&item.issue);
    let page = optional(&item.page);
    if volume.is_some() || issue.is_some() || page.is_some() {
        let (page_first, page_last) = page.as_deref().map(split_pages).unwrap_or_default();
        work.is_part_of.push(IsPartOf {
            volume: volume.unwrap_or_default(),
            issue: issue.unwrap_or_default(),
            page_first,
            page_last,
            ..Default::default()
        });
    }

    Ok(CslImport {
        work,
        container_title: optional(&item.container_title),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_shared::types::work::CorporationRef;

    fn article() -> Work {
        let mut work = Work::new("W1", PubType::ArticleJournal, "On Widgets");
        work.issued.push("2019-05".to_string());
        work.doi.push("10.1000/xyz".to_string());
        let mut author = PersonRef::new("Smith, John");
        author.role.push("aut".to_string());
        let mut editor = PersonRef::new("Doe, Jane");
        editor.role.push("edt".to_string());
        let mut contributor = PersonRef::new("Roe, Richard");
        contributor.role.push("ctb".to_string());
        work.person = vec![author, editor, contributor];
        work.corporation.push(CorporationRef {
            name: "Widget Society".to_string(),
            ..Default::default()
        });
        work.is_part_of.push(IsPartOf {
            is_part_of: "J1".to_string(),
            volume: "7".to_string(),
            page_first: "12".to_string(),
            page_last: "34".to_string(),
            ..Default::default()
        });
        work
    }

    #[test]
    fn test_to_csl() {
        let mut journal = Work::new("J1", PubType::Journal, "Widget Review");
        journal.issn.push("1234-5679".to_string());
        let item = to_csl(&article(), &HostContext::of(&journal));

        assert_eq!(item.item_type, "article-journal");
        assert_eq!(item.container_title.as_deref(), Some("Widget Review"));
        assert_eq!(item.page.as_deref(), Some("12-34"));
        assert_eq!(item.volume.as_deref(), Some("7"));
        assert_eq!(item.issn.as_deref(), Some("1234-5679"));
        assert_eq!(item.issued.unwrap().date_parts, vec![vec![2019, 5]]);

        let authors: Vec<String> = item.author.iter().map(CslName::display).collect();
        assert_eq!(authors, vec!["Smith, John", "Roe, Richard", "Widget Society"]);
        assert_eq!(item.editor[0].family, "Doe");
        assert_eq!(item.editor[0].given, "Jane");
    }

    #[test]
    fn test_csl_json_keys() {
        let value = serde_json::to_value(to_csl(&article(), &HostContext::none())).unwrap();
        assert_eq!(value["type"], "article-journal");
        assert_eq!(value["DOI"], "10.1000/xyz");
        assert_eq!(value["issued"]["date-parts"][0][0], 2019);
        assert!(value.get("container-title").is_none());
    }

    #[test]
    fn test_from_csl() {
        let item: CslItem = serde_json::from_value(serde_json::json!({
            "id": "ext-1",
            "type": "chapter",
            "title": "A Chapter",
            "author": [{"family": "Smith", "given": "John"}],
            "editor": [{"literal": "Editorial Board"}],
            "container-title": "The Collection",
            "page": "101–120",
            "issued": {"date-parts": [[2020, 1, 9]]},
            "ISBN": "978-3-16-148410-0"
        }))
        .unwrap();

        let imported = from_csl(&item).unwrap();
        let work = imported.work;
        assert_eq!(work.pubtype, PubType::Chapter);
        assert_eq!(work.issued, vec!["2020-01-09"]);
        assert_eq!(work.person[0].name, "Smith, John");
        assert!(work.person[0].has_role("aut"));
        assert_eq!(work.person[1].name, "Editorial Board");
        assert!(work.person[1].has_role("edt"));
        assert_eq!(work.is_part_of[0].page_first, "101");
        assert_eq!(work.is_part_of[0].page_last, "120");
        assert_eq!(imported.container_title.as_deref(), Some("The Collection"));
    }

    #[test]
    fn test_unknown_csl_type_reads_as_other() {
        assert_eq!(pubtype_of("manuscript"), PubType::Other);
        assert_eq!(pubtype_of("BOOK"), PubType::Monograph);
        assert_eq!(csl_type(PubType::Collection), "book");
    }

    #[test]
    fn test_split_pages() {
        assert_eq!(split_pages("5"), ("5".to_string(), String::new()));
        assert_eq!(split_pages("5 - 9"), ("5".to_string(), "9".to_string()));
    }
}
