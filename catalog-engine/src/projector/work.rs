use catalog_shared::types::work::{HostKind, IsPartOf};
use catalog_shared::{fields, Catalog, Core, IndexDocument, PubType, Work};
use serde_json::{json, Value};

use super::dates::split_issued;
use super::names;
use super::subjects::{self, SubjectScheme};
use super::Snapshot;
use crate::errors::{Warning, WarningKind};

pub(super) fn project(
    work: &Work,
    snapshot: &Snapshot,
    doc: &mut IndexDocument,
    warnings: &mut Vec<Warning>,
) {
    doc.set("pubtype", work.pubtype.as_str());
    if let Some(subtype) = &work.subtype {
        doc.set_nonempty("subtype", subtype);
    }
    doc.set("title", work.title.trim());
    doc.set_nonempty("subtitle", &work.subtitle);
    doc.set_nonempty("publisher", &work.publisher);
    doc.set_nonempty("publisher_place", &work.publisher_place);
    doc.set_nonempty("edition", &work.edition);
    doc.set_nonempty("note", &work.note);

    for language in &work.language {
        doc.push("language", language.as_str());
    }
    for (field, values) in [
        ("keyword", &work.keyword),
        ("keyword_temporal", &work.keyword_temporal),
        ("keyword_geographic", &work.keyword_geographic),
    ] {
        for value in values {
            doc.push(field, value.as_str());
        }
    }
    for entry in &work.abstracts {
        doc.push("abstract", entry.content.as_str());
    }
    for event in &work.event {
        doc.push("event_name", event.event_name.as_str());
    }
    doc.set_nonempty("oa_access_level", &work.open_access.access_level);

    dates(work, doc);
    identifiers(work, doc);
    subject_fields(work, doc);
    persons(work, snapshot, doc, warnings);
    corporations(work, doc);
    relations(work, snapshot, doc, warnings);
    contexts(work, snapshot, doc);
    type_specific(work, doc);
    dedup_signature(work, doc);
}

fn dates(work: &Work, doc: &mut IndexDocument) {
    for issued in &work.issued {
        doc.push("issued", issued.as_str());
    }
    let Some(issued) = work.primary_issued().and_then(split_issued) else {
        return;
    };
    doc.set("date", issued.date);
    doc.set("fdate", issued.fdate);
    if let Some(boost) = issued.date_boost {
        doc.set("date_boost", boost);
    }
}

fn identifiers(work: &Work, doc: &mut IndexDocument) {
    let unified = [
        ("doi", &work.doi),
        ("isbn", &work.isbn),
        ("issn", &work.issn),
        ("ismn", &work.ismn),
        ("pmid", &work.pmid),
        ("wosid", &work.wosid),
        ("urn", &work.urn),
        ("zdbid", &work.zdb),
    ];
    for (field, values) in unified {
        for value in values {
            doc.push(field, value.as_str());
            doc.push(names::ISXN, value.as_str());
        }
    }
    for value in &work.hbz {
        doc.push("hbzid", value.as_str());
    }
}

fn subject_fields(work: &Work, doc: &mut IndexDocument) {
    let schemes = [
        (SubjectScheme::Ddc, &work.ddc_subject),
        (SubjectScheme::Stw, &work.stw_subject),
        (SubjectScheme::TheSoz, &work.thesoz_subject),
        (SubjectScheme::Mesh, &work.mesh_subject),
        (SubjectScheme::Swd, &work.swd_subject),
        (SubjectScheme::Lcsh, &work.lcsh_subject),
    ];
    for (scheme, values) in schemes {
        for value in values {
            let (id, label) = subjects::resolve(scheme, value);
            doc.push(&format!("{}_subject", scheme.code()), id.as_str());
            doc.push("subject_id", format!("{}:{}", scheme.code(), id));
            doc.push("subject", label);
        }
    }
}

fn member_flags(doc: &mut IndexDocument, catalogs: impl IntoIterator<Item = Catalog>) {
    for catalog in catalogs {
        doc.set(format!("member_{}", catalog.code()), true);
        doc.push(names::MEMBER_OF, catalog.as_str());
    }
}

fn persons(work: &Work, snapshot: &Snapshot, doc: &mut IndexDocument, warnings: &mut Vec<Warning>) {
    for person in &work.person {
        let name = person.name.trim();
        if name.is_empty() {
            continue;
        }
        doc.push("person", name);
        doc.push(names::FPERSON, name);
        if person.has_role("aut") {
            doc.push("author", name);
        }
        if person.has_role("edt") {
            doc.push("editor", name);
        }
        if person.corresponding_author {
            doc.push("corresponding_author", name);
        }
        member_flags(doc, person.member_of.iter().copied());

        let gnd = person.gnd.trim();
        if !gnd.is_empty() {
            doc.push(names::PND, format!("{}#{}", gnd, name));
            doc.push(names::PERSON_AUTHORITY, format!("gnd#{}#{}", gnd, name));
            match snapshot.get(Core::Person, gnd) {
                Some(record) => {
                    let catalogs: Vec<Catalog> = record
                        .get_strs(names::MEMBER_OF)
                        .into_iter()
                        .filter_map(|c| c.parse().ok())
                        .collect();
                    member_flags(doc, catalogs);
                }
                None => warnings.push(Warning::new(
                    WarningKind::AuthorityLookup,
                    gnd,
                    format!("no person record for GND {} ({})", gnd, name),
                )),
            }
        }
        let orcid = person.orcid.trim();
        if !orcid.is_empty() {
            doc.push(names::PERSON_AUTHORITY, format!("orcid#{}#{}", orcid, name));
        }
    }
}

fn corporations(work: &Work, doc: &mut IndexDocument) {
    for corporation in &work.corporation {
        let name = corporation.name.trim();
        if name.is_empty() {
            continue;
        }
        doc.push("corporation", name);
        doc.push("fcorporation", name);
        let gnd = corporation.gnd.trim();
        if !gnd.is_empty() {
            doc.push("corporation_authority", format!("gnd#{}#{}", gnd, name));
        }
        member_flags(doc, corporation.member_of.iter().copied());
    }
}

fn host_title_field(host: &IndexDocument) -> &'static str {
    let kind = host
        .get_str("pubtype")
        .and_then(|t| t.parse::<PubType>().ok())
        .map_or(HostKind::Container, |t| t.host_kind());
    match kind {
        HostKind::Journal => "journal_title",
        HostKind::Newspaper => "newspaper_title",
        HostKind::Series => "series_title",
        HostKind::Container => "container_title",
    }
}

fn host_entry(link: &IsPartOf, host: Option<&IndexDocument>) -> Value {
    let mut entry = json!({
        "is_part_of": link.is_part_of,
        "volume": link.volume,
        "issue": link.issue,
        "page_first": link.page_first,
        "page_last": link.page_last,
        "number": link.number,
    });
    if let (Some(host), Value::Object(map)) = (host, &mut entry) {
        map.insert("title".into(), json!(host.get_str("title").unwrap_or_default()));
        for field in ["issn", "isbn", "zdbid"] {
            map.insert(field.into(), json!(host.get_strs(field)));
        }
    }
    entry
}

fn relations(work: &Work, snapshot: &Snapshot, doc: &mut IndexDocument, warnings: &mut Vec<Warning>) {
    for link in work.is_part_of.iter().filter(|l| !l.is_part_of.trim().is_empty()) {
        let id = link.is_part_of.trim();
        doc.push(names::IS_PART_OF_ID, id);
        let host = snapshot.get(Core::Work, id);
        match host {
            Some(host) => {
                let title = host.get_str("title").unwrap_or_default();
                doc.push(host_title_field(host), title);
                doc.push("host_title", title);
            }
            None => warnings.push(Warning::missing_reference(Core::Work, id)),
        }
        doc.push("is_part_of", host_entry(link, host));
    }

    for id in work.part_ids() {
        doc.push(names::HAS_PART_ID, id);
        let title = snapshot.label(Core::Work, id);
        if title.is_none() {
            warnings.push(Warning::missing_reference(Core::Work, id));
        }
        doc.push("has_part", json!({ "has_part": id, "title": title.unwrap_or_default() }));
    }

    for id in work.other_version_ids() {
        doc.push("other_version_id", id);
        let title = snapshot.label(Core::Work, id);
        if title.is_none() {
            warnings.push(Warning::missing_reference(Core::Work, id));
        }
        doc.push(
            "other_version",
            json!({ "other_version": id, "title": title.unwrap_or_default() }),
        );
    }
}

/// Affiliation and working-group context, labelled where the target exists.
fn contexts(work: &Work, snapshot: &Snapshot, doc: &mut IndexDocument) {
    for id in work.affiliation_context.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        doc.push("affiliation_id", id);
        doc.push(
            "affiliation",
            snapshot.label(Core::Organisation, id).unwrap_or(id),
        );
    }
    for id in work.group_context.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        doc.push("group_id", id);
        doc.push("group", snapshot.label(Core::Group, id).unwrap_or(id));
    }
}

fn type_specific(work: &Work, doc: &mut IndexDocument) {
    let single = [
        ("patent_number", &work.patent_number),
        ("application_number", &work.application_number),
        ("priority_date", &work.priority_date),
        ("standard_number", &work.standard_number),
        ("standard_revision", &work.standard_revision),
        ("software_version", &work.software_version),
        ("thesis_type", &work.thesis_type),
        ("thesis_institution", &work.thesis_institution),
        ("data_format", &work.data_format),
        ("data_repository", &work.data_repository),
    ];
    for (field, value) in single {
        if let Some(value) = value {
            doc.set_nonempty(field, value);
        }
    }
    for value in &work.ipc_keyword {
        doc.push("ipc_keyword", value.as_str());
    }
    for value in &work.operating_system {
        doc.push("operating_system", value.as_str());
    }
}

/// Lowercased alphanumeric title plus year, shared by likely duplicates.
fn dedup_signature(work: &Work, doc: &mut IndexDocument) {
    let title: String = work
        .title
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect();
    if title.is_empty() {
        return;
    }
    let year = work
        .primary_issued()
        .and_then(split_issued)
        .map(|d| d.fdate)
        .unwrap_or_default();
    doc.set(fields::DEDUP_SIGNATURE, format!("{}#{}", title, year));
}
