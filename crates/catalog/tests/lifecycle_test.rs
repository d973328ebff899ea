//! Integration tests for the Record lifecycle.

mod common;

use catalog::model::MemberSpec;
use catalog::store::{DocKind, EdgeKind};
use catalog::{CatalogError, Status, VersionedKind};

use common::{collection_input, elastic, record_input, setup};

// =============================================================================
// Create / Publish
// =============================================================================

#[test]
fn test_create_then_publish_keeps_version() {
    let (catalog, org) = setup();
    let id = catalog
        .create_record(&record_input(0.0), &org, Status::Draft, "")
        .unwrap();

    let draft = catalog.record(&id).unwrap();
    assert_eq!(draft.version_info().status, Status::Draft);
    assert_eq!(draft.version_info().version, "1");

    catalog.publish_record(&id).unwrap();

    let published = catalog.record(&id).unwrap();
    assert_eq!(published.version_info().status, Status::Published);
    assert_eq!(published.version_info().version, "1");

    let history = catalog.history_of_record(&id).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].key, id);
    assert_eq!(history[0].version_info.status, Status::Published);
    assert_eq!(history[0].version_info.version, "1");
}

#[test]
fn test_create_published_directly() {
    let (catalog, org) = setup();
    let id = catalog
        .create_record(&record_input(0.0), &org, Status::Published, "import")
        .unwrap();

    let record = catalog.record(&id).unwrap();
    assert_eq!(record.version_info().status, Status::Published);
    assert_eq!(record.version_info().commit_message.as_deref(), Some("import"));
}

#[test]
fn test_create_with_archived_status_fails() {
    let (catalog, org) = setup();
    let err = catalog
        .create_record(&record_input(0.0), &org, Status::Archived, "")
        .unwrap_err();
    assert!(err.is_invalid_transition());
}

#[test]
fn test_create_for_unknown_organization_fails() {
    let (catalog, _) = setup();
    let err = catalog
        .create_record(&record_input(0.0), "no-such-org", Status::Draft, "")
        .unwrap_err();
    assert!(matches!(err, CatalogError::NotFound { .. }));
}

#[test]
fn test_publish_non_draft_fails() {
    let (catalog, org) = setup();
    let id = catalog
        .create_record(&record_input(0.0), &org, Status::Published, "")
        .unwrap();
    assert!(catalog.publish_record(&id).unwrap_err().is_invalid_transition());
}

#[test]
fn test_record_stores_references() {
    let (catalog, org) = setup();
    let id = catalog
        .create_record(&record_input(0.0), &org, Status::Draft, "")
        .unwrap();

    let record = catalog.record(&id).unwrap();
    assert_eq!(record.references.len(), 1);
    let stats = catalog.store().stats().unwrap();
    assert_eq!(stats.edges_of(EdgeKind::References), 1);
    assert_eq!(stats.documents_of(DocKind::Reference), 1);
}

// =============================================================================
// Edit / Fork
// =============================================================================

#[test]
fn test_edit_published_forks_next_version() {
    let (catalog, org) = setup();
    let id1 = catalog
        .create_record(&record_input(0.0), &org, Status::Draft, "")
        .unwrap();
    catalog.publish_record(&id1).unwrap();

    let id2 = catalog
        .update_record(&id1, &record_input(99.0), "fix threshold")
        .unwrap();
    assert_ne!(id1, id2);

    let draft = catalog.record(&id2).unwrap();
    assert_eq!(draft.version_info().status, Status::Draft);
    assert_eq!(draft.version_info().version, "2");
    assert_eq!(draft.version_info().commit_message.as_deref(), Some("fix threshold"));
    assert_eq!(draft.document.parameters["threshold"], serde_json::json!(99.0));
    assert_eq!(draft.document.organization, org);

    // The draft is not public yet: history still shows only version 1.
    let history = catalog.history_of_record(&id2).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].key, id1);

    let stats = catalog.store().stats().unwrap();
    assert_eq!(stats.edges_of(EdgeKind::RecordHistory), 1);

    catalog.publish_record(&id2).unwrap();
    let history = catalog.history_of_record(&id2).unwrap();
    let summary: Vec<(&str, Status, &str)> = history
        .iter()
        .map(|e| (e.key.as_str(), e.version_info.status, e.version_info.version.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (id2.as_str(), Status::Published, "2"),
            (id1.as_str(), Status::Archived, "1"),
        ]
    );

    // Querying from the old end gives the same lineage.
    assert_eq!(catalog.history_of_record(&id1).unwrap(), history);
}

#[test]
fn test_edit_draft_in_place() {
    let (catalog, org) = setup();
    let id = catalog
        .create_record(&record_input(0.0), &org, Status::Draft, "")
        .unwrap();

    let same = catalog.update_record(&id, &record_input(5.0), "tweak").unwrap();
    assert_eq!(same, id);

    let record = catalog.record(&id).unwrap();
    assert_eq!(record.version_info().version, "1");
    assert_eq!(record.document.parameters["threshold"], serde_json::json!(5.0));
    assert_eq!(catalog.store().stats().unwrap().documents_of(DocKind::Record), 1);
}

#[test]
fn test_second_draft_in_lineage_is_rejected() {
    let (catalog, org) = setup();
    let id1 = catalog
        .create_record(&record_input(0.0), &org, Status::Published, "")
        .unwrap();
    let id2 = catalog.update_record(&id1, &record_input(1.0), "").unwrap();

    let err = catalog.update_record(&id1, &record_input(2.0), "").unwrap_err();
    assert!(err.is_invalid_transition());

    // Editing the existing draft is still fine.
    assert_eq!(catalog.update_record(&id2, &record_input(2.0), "").unwrap(), id2);
}

#[test]
fn test_edit_archived_or_retracted_fails() {
    let (catalog, org) = setup();
    let id1 = catalog
        .create_record(&record_input(0.0), &org, Status::Published, "")
        .unwrap();
    let id2 = catalog.update_record(&id1, &record_input(1.0), "").unwrap();
    catalog.publish_record(&id2).unwrap();

    assert!(catalog
        .update_record(&id1, &record_input(3.0), "")
        .unwrap_err()
        .is_invalid_transition());

    catalog.retract_record(&id2, "bad data").unwrap();
    assert!(catalog
        .update_record(&id2, &record_input(3.0), "")
        .unwrap_err()
        .is_invalid_transition());
}

#[test]
fn test_stale_revision_is_conflict() {
    let (catalog, org) = setup();
    let id = catalog
        .create_record(&record_input(0.0), &org, Status::Draft, "")
        .unwrap();
    let rev = catalog.record(&id).unwrap().rev;

    catalog
        .update_record_at(&id, rev, &record_input(1.0), "first writer")
        .unwrap();

    let err = catalog
        .update_record_at(&id, rev, &record_input(2.0), "second writer")
        .unwrap_err();
    assert!(matches!(err, CatalogError::Conflict { .. }));

    let record = catalog.record(&id).unwrap();
    assert_eq!(record.document.parameters["threshold"], serde_json::json!(1.0));
}

#[test]
fn test_publish_archives_only_own_lineage() {
    let (catalog, org) = setup();
    let a1 = catalog
        .create_record(&record_input(0.0), &org, Status::Published, "")
        .unwrap();
    let b1 = catalog
        .create_record(&record_input(0.0), &org, Status::Published, "")
        .unwrap();

    let a2 = catalog.update_record(&a1, &record_input(1.0), "").unwrap();
    catalog.publish_record(&a2).unwrap();

    assert_eq!(catalog.record(&a1).unwrap().version_info().status, Status::Archived);
    assert_eq!(catalog.record(&a2).unwrap().version_info().status, Status::Published);
    assert_eq!(catalog.record(&b1).unwrap().version_info().status, Status::Published);
}

#[test]
fn test_versions_keep_increasing() {
    let (catalog, org) = setup();
    let mut id = catalog
        .create_record(&record_input(0.0), &org, Status::Published, "")
        .unwrap();

    for i in 1..=4 {
        id = catalog.update_record(&id, &record_input(i as f64), "").unwrap();
        catalog.publish_record(&id).unwrap();
    }

    let history = catalog.history_of_record(&id).unwrap();
    let versions: Vec<&str> = history.iter().map(|e| e.version_info.version.as_str()).collect();
    assert_eq!(versions, vec!["5", "4", "3", "2", "1"]);

    let published = history
        .iter()
        .filter(|e| e.version_info.status == Status::Published)
        .count();
    assert_eq!(published, 1);
}

// =============================================================================
// Retract / Delete
// =============================================================================

#[test]
fn test_retract_requires_message_and_published() {
    let (catalog, org) = setup();
    let id = catalog
        .create_record(&record_input(0.0), &org, Status::Draft, "")
        .unwrap();

    assert!(catalog.retract_record(&id, "error found").unwrap_err().is_invalid_transition());

    catalog.publish_record(&id).unwrap();
    assert!(catalog.retract_record(&id, "").unwrap_err().is_invalid_transition());

    catalog.retract_record(&id, "error found").unwrap();
    let record = catalog.record(&id).unwrap();
    assert_eq!(record.version_info().status, Status::Retracted);
    assert_eq!(record.version_info().retract_message.as_deref(), Some("error found"));

    assert!(catalog.retract_record(&id, "again").unwrap_err().is_invalid_transition());
}

#[test]
fn test_retracted_version_stays_in_history() {
    let (catalog, org) = setup();
    let id = catalog
        .create_record(&record_input(0.0), &org, Status::Published, "")
        .unwrap();
    catalog.retract_record(&id, "wrong units").unwrap();

    let history = catalog.history_of_record(&id).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].version_info.status, Status::Retracted);
}

#[test]
fn test_delete_only_drafts() {
    let (catalog, org) = setup();
    let id1 = catalog
        .create_record(&record_input(0.0), &org, Status::Published, "")
        .unwrap();
    assert!(catalog.delete_draft_record(&id1).unwrap_err().is_invalid_transition());

    let id2 = catalog.update_record(&id1, &record_input(1.0), "").unwrap();
    catalog.delete_draft_record(&id2).unwrap();

    assert!(matches!(
        catalog.record(&id2).unwrap_err(),
        CatalogError::NotFound { .. }
    ));
    let stats = catalog.store().stats().unwrap();
    assert_eq!(stats.documents_of(DocKind::Record), 1);
    assert_eq!(stats.edges_of(EdgeKind::RecordHistory), 0);
    assert_eq!(stats.edges_of(EdgeKind::References), 1);

    // With the draft gone the published version can be forked again.
    assert!(catalog.update_record(&id1, &record_input(2.0), "").is_ok());
}

#[test]
fn test_collection_member_cannot_be_deleted_or_retracted_directly() {
    let (catalog, org) = setup();
    let input = collection_input("set").with_member(MemberSpec::new(elastic(0.0)));

    let draft_cid = catalog
        .create_collection(&input, &org, Status::Draft, "")
        .unwrap();
    let draft_member = catalog.collection(&draft_cid).unwrap().members[0].clone();
    let err = catalog.delete_draft_record(&draft_member).unwrap_err();
    assert!(err.is_invalid_transition());
    assert!(err.to_string().contains(&draft_cid));

    let published_cid = catalog
        .create_collection(&input, &org, Status::Published, "")
        .unwrap();
    let published_member = catalog.collection(&published_cid).unwrap().members[0].clone();
    assert!(catalog
        .retract_record(&published_member, "nope")
        .unwrap_err()
        .is_invalid_transition());
}

#[test]
fn test_unknown_record_is_not_found() {
    let (catalog, _) = setup();
    assert!(matches!(
        catalog.publish_record("404").unwrap_err(),
        CatalogError::NotFound { .. }
    ));
    assert!(matches!(
        catalog.history_of_record("404").unwrap_err(),
        CatalogError::NotFound { .. }
    ));
}

// =============================================================================
// Ownership
// =============================================================================

#[test]
fn test_is_owner() {
    let (catalog, org) = setup();
    let other = catalog.upsert_organization("Other Lab").unwrap();
    catalog.add_member("ann@plasma.org", &org).unwrap();
    catalog.add_member("bob@other.org", &other).unwrap();

    let id = catalog
        .create_record(&record_input(0.0), &org, Status::Draft, "")
        .unwrap();

    assert!(catalog.is_owner(VersionedKind::Record, &id, "ann@plasma.org").unwrap());
    assert!(!catalog.is_owner(VersionedKind::Record, &id, "bob@other.org").unwrap());
    assert!(!catalog.is_owner(VersionedKind::Record, &id, "nobody@x.org").unwrap());
}
