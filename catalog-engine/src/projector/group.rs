use catalog_shared::{Core, IndexDocument, WorkingGroup};

use super::Snapshot;

pub(super) fn project(group: &WorkingGroup, snapshot: &Snapshot, doc: &mut IndexDocument) {
    doc.set("pref_label", group.pref_label.trim());
    for label in &group.alt_label {
        doc.push("alt_label", label.trim());
    }
    doc.set_nonempty("gnd", &group.gnd);
    doc.set_nonempty("start_date", &group.start_date);
    doc.set_nonempty("end_date", &group.end_date);

    let parent = group.parent_id.trim();
    if !parent.is_empty() {
        doc.set("parent_id", parent);
        // Groups hang off either an organisation or another group.
        let label = snapshot
            .label(Core::Organisation, parent)
            .or_else(|| snapshot.label(Core::Group, parent));
        if let Some(label) = label {
            doc.set_nonempty("parent_label", label);
        }
    }

    for fund in &group.funds {
        doc.push("fund", fund.label.trim());
        doc.push("project_id", fund.project_id.trim());
        doc.push("funder", fund.organisation.trim());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projector::project as project_record;
    use catalog_shared::types::group::Fund;
    use catalog_shared::Record;

    #[test]
    fn test_group_parent_and_funds() {
        let mut group = WorkingGroup::new("G2", "Quantenoptik");
        group.parent_id = "G1".into();
        group.funds.push(Fund {
            organisation: "DFG".into(),
            project_id: "SFB 823".into(),
            label: "Sonderforschungsbereich".into(),
        });
        let mut snapshot = Snapshot::new();
        let mut parent = IndexDocument::new("G1");
        parent.set("pref_label", "Optik");
        snapshot.insert(Core::Group, parent);

        let doc = project_record(&Record::from(group), &snapshot).unwrap().doc;
        assert_eq!(doc.get_str("parent_label"), Some("Optik"));
        assert_eq!(doc.get_strs("project_id"), vec!["SFB 823"]);
        assert_eq!(doc.get_strs("funder"), vec!["DFG"]);
    }
}
