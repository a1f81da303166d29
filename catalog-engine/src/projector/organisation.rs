use catalog_shared::{Core, IndexDocument, Organisation};

use super::Snapshot;

pub(super) fn project(org: &Organisation, snapshot: &Snapshot, doc: &mut IndexDocument) {
    doc.set("pref_label", org.pref_label.trim());
    for label in &org.alt_label {
        doc.push("alt_label", label.trim());
    }
    for account in &org.account {
        doc.push("account", account.trim());
    }
    for (field, value) in [
        ("gnd", &org.gnd),
        ("viaf", &org.viaf),
        ("isni", &org.isni),
        ("start_date", &org.start_date),
        ("end_date", &org.end_date),
    ] {
        doc.set_nonempty(field, value);
    }

    let parent = org.parent_id.trim();
    if !parent.is_empty() {
        doc.set("parent_id", parent);
        let label = snapshot
            .label(Core::Organisation, parent)
            .unwrap_or(org.parent_label.trim());
        doc.set_nonempty("parent_label", label);
    }

    for child in org.children.iter().filter(|c| !c.child_id.trim().is_empty()) {
        let id = child.child_id.trim();
        doc.push("children_id", id);
        let label = snapshot
            .label(Core::Organisation, id)
            .unwrap_or(child.child_label.trim());
        doc.push("children", if label.is_empty() { id } else { label });
    }

    for entry in &org.destatis {
        doc.push("destatis_id", entry.destatis_id.trim());
        doc.push("destatis_label", entry.destatis_label.trim());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projector::project as project_record;
    use catalog_shared::types::organisation::ChildRef;
    use catalog_shared::Record;

    #[test]
    fn test_parent_and_children_labels() {
        let mut org = Organisation::new("O2", "Lehrstuhl Optik");
        org.parent_id = "O1".into();
        org.parent_label = "Old name".into();
        org.children.push(ChildRef {
            child_id: "O3".into(),
            child_label: "Arbeitsbereich Laser".into(),
        });
        let mut snapshot = Snapshot::new();
        let mut parent = IndexDocument::new("O1");
        parent.set("pref_label", "Fakultät Physik");
        snapshot.insert(Core::Organisation, parent);

        let doc = project_record(&Record::from(org), &snapshot).unwrap().doc;
        assert_eq!(doc.get_str("parent_id"), Some("O1"));
        assert_eq!(doc.get_str("parent_label"), Some("Fakultät Physik"));
        assert_eq!(doc.get_strs("children"), vec!["Arbeitsbereich Laser"]);
        assert_eq!(doc.get_strs("children_id"), vec!["O3"]);
    }

    #[test]
    fn test_missing_parent_keeps_stored_label() {
        let mut org = Organisation::new("O2", "Lehrstuhl Optik");
        org.parent_id = "O9".into();
        org.parent_label = "Fakultät Chemie".into();
        let doc = project_record(&Record::from(org), &Snapshot::new()).unwrap().doc;
        assert_eq!(doc.get_str("parent_label"), Some("Fakultät Chemie"));
    }
}
