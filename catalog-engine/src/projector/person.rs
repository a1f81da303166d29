use catalog_shared::types::person::split_name;
use catalog_shared::{Core, IndexDocument, Person};

use super::names;
use super::Snapshot;

pub(super) fn project(person: &Person, snapshot: &Snapshot, doc: &mut IndexDocument) {
    let name = person.name.trim();
    doc.set("name", name);
    doc.push(names::FPERSON, name);

    let (family, given) = split_name(name);
    if !family.is_empty() {
        doc.set(names::NAME_FAMILY, family.to_lowercase());
    }
    for token in given.split_whitespace() {
        doc.push(names::NAME_GIVEN, token.to_lowercase());
    }
    for alias in &person.also_known_as {
        doc.push("also_known_as", alias.trim());
    }

    for (field, value) in [
        ("gnd", &person.gnd),
        ("orcid", &person.orcid),
        ("viaf", &person.viaf),
        ("isni", &person.isni),
        ("researcher_id", &person.researcher_id),
        ("scopus_id", &person.scopus_id),
        ("arxiv_id", &person.arxiv_id),
        ("email", &person.email),
    ] {
        doc.set_nonempty(field, value);
    }
    if !person.gnd.trim().is_empty() {
        doc.push(names::PND, format!("{}#{}", person.gnd.trim(), name));
    }

    for affiliation in &person.affiliation {
        let id = affiliation.organisation_id.trim();
        if id.is_empty() {
            doc.push("affiliation", affiliation.label.trim());
            continue;
        }
        doc.push("affiliation_id", id);
        let label = snapshot
            .label(Core::Organisation, id)
            .unwrap_or(affiliation.label.trim());
        doc.push("affiliation", if label.is_empty() { id } else { label });
    }

    for membership in &person.group {
        let id = membership.group_id.trim();
        if id.is_empty() {
            doc.push("group", membership.label.trim());
            continue;
        }
        doc.push("group_id", id);
        let label = snapshot
            .label(Core::Group, id)
            .unwrap_or(membership.label.trim());
        doc.push("group", if label.is_empty() { id } else { label });
    }

    for catalog in &person.member_of {
        doc.push(names::MEMBER_OF, catalog.as_str());
        doc.set(format!("member_{}", catalog.code()), true);
    }
    for status in &person.status {
        doc.push("status", status.as_str());
    }
    for interest in &person.research_interest {
        doc.push("research_interest", interest.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projector::project as project_record;
    use catalog_shared::types::person::Affiliation;
    use catalog_shared::{Catalog, Record};

    #[test]
    fn test_name_tokens() {
        let mut person = Person::new("P1", "van Dyke, Anna Maria");
        person.gnd = "118540238".into();
        person.member_of = vec![Catalog::Rub];
        let doc = project_record(&Record::from(person), &Snapshot::new()).unwrap().doc;

        assert_eq!(doc.get_str(names::NAME_FAMILY), Some("van dyke"));
        assert_eq!(doc.get_strs(names::NAME_GIVEN), vec!["anna", "maria"]);
        assert_eq!(doc.get_strs(names::PND), vec!["118540238#van Dyke, Anna Maria"]);
        assert_eq!(doc.get_strs(names::MEMBER_OF), vec!["Ruhr-Universität Bochum"]);
        assert_eq!(doc.get("member_rub"), Some(&serde_json::Value::Bool(true)));
    }

    #[test]
    fn test_affiliation_label_prefers_organisation_record() {
        let mut person = Person::new("P1", "Doe, Jane");
        person.affiliation.push(Affiliation {
            organisation_id: "O1".into(),
            label: "stale label".into(),
            ..Default::default()
        });
        person.affiliation.push(Affiliation {
            organisation_id: "O2".into(),
            label: "Stored label".into(),
            ..Default::default()
        });
        let mut snapshot = Snapshot::new();
        let mut org = IndexDocument::new("O1");
        org.set("pref_label", "Fakultät Physik");
        snapshot.insert(Core::Organisation, org);

        let doc = project_record(&Record::from(person), &snapshot).unwrap().doc;
        assert_eq!(doc.get_strs("affiliation"), vec!["Fakultät Physik", "Stored label"]);
        assert_eq!(doc.get_strs("affiliation_id"), vec!["O1", "O2"]);
    }
}
