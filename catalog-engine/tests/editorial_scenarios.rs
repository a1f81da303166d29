//! End-to-end editorial scenarios.
//!
//! Each test drives the real engine against the in-memory index provider.

mod common;

use std::io::Write;
use std::sync::Arc;

use catalog_engine::bulk::{import_file, ImportOptions};
use catalog_engine::dedup::{
    CandidateGenerator, CandidateQueue, DedupConfig, DedupJob, InMemoryQueue,
};
use catalog_engine::EngineError;
use catalog_shared::{fields, Catalog, Core, EditorialStatus, Record, Visibility};
use serde_json::json;

use common::{admin, harness, superadmin, user};

#[tokio::test]
async fn test_create_article_with_host() {
    let h = harness().await;
    h.engine
        .create(
            &user(),
            Core::Work,
            json!({ "id": "J1", "pubtype": "Journal", "title": "Journal J" }),
        )
        .await
        .unwrap();

    let report = h
        .engine
        .create(
            &user(),
            Core::Work,
            json!({
                "pubtype": "ArticleJournal",
                "title": "Title A",
                "is_part_of": [{ "is_part_of": "J1" }],
                "person": [{ "name": "Doe, Jane", "gnd": "123456789" }],
            }),
        )
        .await
        .unwrap();

    assert_eq!(report.status, Some(EditorialStatus::New));
    let doc = h.provider.document(Core::Work, &report.id).await.unwrap();
    assert_eq!(doc.get_str("journal_title"), Some("Journal J"));
    assert_eq!(doc.get_str(fields::EDITORIAL_STATUS), Some("new"));
    assert!(!doc.is_locked());

    let Record::Work(journal) = h.engine.get(&user(), Core::Work, "J1").await.unwrap() else {
        panic!("J1 is not a work");
    };
    let parts: Vec<_> = journal.part_ids().collect();
    assert_eq!(parts, vec![report.id.as_str()]);
    assert!(!h.provider.document(Core::Work, "J1").await.unwrap().is_locked());
}

#[tokio::test]
async fn test_update_advances_status() {
    let h = harness().await;
    let created = h
        .engine
        .create(
            &user(),
            Core::Work,
            json!({ "pubtype": "Monograph", "title": "First Draft" }),
        )
        .await
        .unwrap();

    let updated = h
        .engine
        .update(
            &user(),
            Core::Work,
            &created.id,
            json!({ "pubtype": "Monograph", "title": "Second Draft" }),
        )
        .await
        .unwrap();
    assert_eq!(updated.status, Some(EditorialStatus::InProcess));

    // A processed record reviewed by a superadmin moves to final editing.
    let mut record = h.engine.get(&superadmin(), Core::Work, &created.id).await.unwrap();
    record.envelope_mut().editorial_status = EditorialStatus::Processed;
    h.engine.store().write(&record, false).await.unwrap();

    let reviewed = h
        .engine
        .update(
            &superadmin(),
            Core::Work,
            &created.id,
            json!({ "pubtype": "Monograph", "title": "Second Draft", "editorial_status": "processed" }),
        )
        .await
        .unwrap();
    assert_eq!(reviewed.status, Some(EditorialStatus::FinalEditing));
}

#[tokio::test]
async fn test_delete_by_admin_and_superadmin() {
    let h = harness().await;
    let x = h
        .engine
        .create(&user(), Core::Work, json!({ "pubtype": "Monograph", "title": "X" }))
        .await
        .unwrap();

    assert!(matches!(
        h.engine.delete(&user(), Core::Work, &x.id).await,
        Err(EngineError::PermissionDenied(_))
    ));

    let report = h.engine.delete(&admin(), Core::Work, &x.id).await.unwrap();
    assert_eq!(report.status, Some(EditorialStatus::Deleted));
    let record = h.engine.get(&superadmin(), Core::Work, &x.id).await.unwrap();
    assert_eq!(record.envelope().editorial_status, EditorialStatus::Deleted);
    assert!(matches!(
        h.engine.get(&admin(), Core::Work, &x.id).await,
        Err(EngineError::NotFound { .. })
    ));

    let purged = h.engine.delete(&superadmin(), Core::Work, &x.id).await.unwrap();
    assert_eq!(purged.status, None);
    assert!(h.provider.document(Core::Work, &x.id).await.is_none());
    assert!(matches!(
        h.engine.get(&superadmin(), Core::Work, &x.id).await,
        Err(EngineError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_import_snapshot_reports_malformed_record() {
    let h = harness().await;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let snapshot = json!([
        { "id": "M1", "pubtype": "Monograph", "title": "Book One" },
        { "id": "M2", "pubtype": "Monograph", "title": "Book Two", "editorial_status": "finalized" },
        { "id": "M3", "pubtype": "Monograph" },
    ]);
    file.write_all(snapshot.to_string().as_bytes()).unwrap();

    let summary = import_file(
        &h.engine,
        &superadmin(),
        Core::Work,
        file.path(),
        &ImportOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(summary.imported, 2);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].id.as_deref(), Some("M3"));
    assert_eq!(h.provider.count(Core::Work).await, 2);

    let m1 = h.engine.get(&superadmin(), Core::Work, "M1").await.unwrap();
    assert_eq!(m1.envelope().editorial_status, EditorialStatus::Imported);
    assert_eq!(m1.envelope().catalog, vec![Catalog::Rub]);
    let m2 = h.engine.get(&superadmin(), Core::Work, "M2").await.unwrap();
    assert_eq!(m2.envelope().editorial_status, EditorialStatus::Finalized);

    // Re-importing overwrites instead of duplicating.
    import_file(&h.engine, &superadmin(), Core::Work, file.path(), &ImportOptions::default())
        .await
        .unwrap();
    assert_eq!(h.provider.count(Core::Work).await, 2);

    assert!(matches!(
        import_file(&h.engine, &admin(), Core::Work, file.path(), &ImportOptions::default()).await,
        Err(EngineError::PermissionDenied(_))
    ));
}

#[tokio::test]
async fn test_dedup_exact_match_scores_100() {
    let h = harness().await;
    h.engine
        .create(&user(), Core::Person, json!({ "name": "Smith, John" }))
        .await
        .unwrap();
    let work = h
        .engine
        .create(
            &user(),
            Core::Work,
            json!({
                "pubtype": "Monograph",
                "title": "Collected Papers",
                "person": [{ "name": "Smith, John", "gnd": "118540238", "role": ["aut"] }],
            }),
        )
        .await
        .unwrap();

    let queue = Arc::new(InMemoryQueue::new());
    let generator = CandidateGenerator::new(h.gateway.clone(), DedupConfig::default());
    let run = DedupJob::new(generator, queue.clone())
        .start()
        .join()
        .await
        .unwrap();
    assert!(run.completed);
    assert_eq!(run.works_rejected, 0);

    let (publication_id, task) = queue.pop(Catalog::Rub).await.unwrap().unwrap();
    assert_eq!(publication_id, work.id);
    let candidate = &task["candidates"][0];
    assert_eq!(candidate["display_name"], "Smith, John");
    assert_eq!(candidate["local_id"], "118540238");
    assert_eq!(candidate["probability"], 100);
}

#[tokio::test]
async fn test_duplicate_person_authority_conflicts() {
    let h = harness().await;
    let first = h
        .engine
        .create(
            &user(),
            Core::Person,
            json!({ "name": "Smith, John", "gnd": "118540238" }),
        )
        .await
        .unwrap();
    assert_eq!(first.id, "118540238");

    let second = h
        .engine
        .create(
            &user(),
            Core::Person,
            json!({ "name": "Smith, J.", "gnd": "118540238" }),
        )
        .await;
    assert!(matches!(second, Err(EngineError::Conflict(_))));
    assert_eq!(h.provider.count(Core::Person).await, 1);

    let stored = h
        .engine
        .store()
        .load(Core::Person, "118540238", Visibility::All)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.record.as_person().unwrap().name, "Smith, John");
}
