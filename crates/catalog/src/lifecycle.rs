//! Version state machine for Records and Collections.
//!
//! ```text
//!            publish              retract
//!   draft ───────────▶ published ─────────▶ retracted
//!     ▲                    │
//!     │ fork (v+1)         │ newer version published
//!     └────────────────────┤
//!                          ▼
//!                      archived
//! ```
//!
//! All functions operate inside a caller-provided transaction and check the
//! current status before writing anything.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{CatalogError, Result};
use crate::lineage;
use crate::model::{CollectionDocument, RecordDocument, Status, VersionInfo};
use crate::store::{DocId, DocKind, Document, EdgeKind, Transaction};

/// The two versioned document kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionedKind {
    Record,
    Collection,
}

impl VersionedKind {
    /// Document collection holding this kind.
    pub fn doc_kind(&self) -> DocKind {
        match self {
            VersionedKind::Record => DocKind::Record,
            VersionedKind::Collection => DocKind::Collection,
        }
    }

    /// Edge collection linking versions of this kind.
    pub fn history_edge(&self) -> EdgeKind {
        match self {
            VersionedKind::Record => EdgeKind::RecordHistory,
            VersionedKind::Collection => EdgeKind::CollectionHistory,
        }
    }

    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            VersionedKind::Record => "Record",
            VersionedKind::Collection => "Collection",
        }
    }

    /// Document id for a key of this kind.
    pub fn id(&self, key: &str) -> DocId {
        DocId::new(self.doc_kind(), key)
    }
}

/// A document with a lifecycle.
pub trait Versioned: Serialize + DeserializeOwned {
    const KIND: VersionedKind;

    fn version_info(&self) -> &VersionInfo;

    fn version_info_mut(&mut self) -> &mut VersionInfo;

    /// Owning organization key.
    fn organization(&self) -> &str;
}

impl Versioned for RecordDocument {
    const KIND: VersionedKind = VersionedKind::Record;

    fn version_info(&self) -> &VersionInfo {
        &self.version_info
    }

    fn version_info_mut(&mut self) -> &mut VersionInfo {
        &mut self.version_info
    }

    fn organization(&self) -> &str {
        &self.organization
    }
}

impl Versioned for CollectionDocument {
    const KIND: VersionedKind = VersionedKind::Collection;

    fn version_info(&self) -> &VersionInfo {
        &self.version_info
    }

    fn version_info_mut(&mut self) -> &mut VersionInfo {
        &mut self.version_info
    }

    fn organization(&self) -> &str {
        &self.organization
    }
}

/// Outcome of [`fork_or_edit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    /// Key of the draft that now holds the new content.
    pub key: String,

    /// True when a new version was forked, false for an in-place draft edit.
    pub forked: bool,
}

/// Load and decode a versioned document.
pub fn load<D: Versioned>(tx: &dyn Transaction, key: &str) -> Result<(Document, D)> {
    let doc = tx.get_required(&D::KIND.id(key))?;
    let decoded = doc.decode()?;
    Ok((doc, decoded))
}

fn write_back<D: Versioned>(tx: &mut dyn Transaction, doc: &Document, value: &D) -> Result<Document> {
    tx.replace(&doc.id, serde_json::to_value(value)?, Some(doc.rev))
}

fn transition_error(kind: VersionedKind, key: &str, action: &str, status: Status) -> CatalogError {
    CatalogError::InvalidStateTransition(format!(
        "Cannot {} {} '{}' with status {}",
        action,
        kind.label(),
        key,
        status
    ))
}

/// Insert the first version of a new lineage.
///
/// The document must be at version "1" with status draft or published.
pub fn create_draft<D: Versioned>(tx: &mut dyn Transaction, document: &D) -> Result<String> {
    let info = document.version_info();
    if !info.status.is_initial() {
        return Err(CatalogError::InvalidStateTransition(format!(
            "A new {} cannot start with status {}",
            D::KIND.label(),
            info.status
        )));
    }
    if info.number()? != 1 {
        return Err(CatalogError::Validation(format!(
            "A new {} starts at version 1, got '{}'",
            D::KIND.label(),
            info.version
        )));
    }

    let doc = tx.insert(D::KIND.doc_kind(), serde_json::to_value(document)?)?;
    debug!(id = %doc.id, status = %info.status, "created first version");
    Ok(doc.key().to_string())
}

/// Publish a draft, archiving the published version of its lineage if any.
pub fn publish<D: Versioned>(tx: &mut dyn Transaction, key: &str, max_depth: usize) -> Result<()> {
    let (doc, mut current) = load::<D>(tx, key)?;
    let status = current.version_info().status;
    if status != Status::Draft {
        return Err(transition_error(D::KIND, key, "publish", status));
    }

    for member in lineage::lineage_members(tx, D::KIND, key, max_depth)? {
        if member.key != key && member.version_info.status == Status::Published {
            let (member_doc, mut previous) = load::<D>(tx, &member.key)?;
            previous.version_info_mut().status = Status::Archived;
            write_back(tx, &member_doc, &previous)?;
            debug!(id = %member_doc.id, "archived previous version");
        }
    }

    current.version_info_mut().status = Status::Published;
    write_back(tx, &doc, &current)?;
    info!(id = %doc.id, version = %current.version_info().version, "published");
    Ok(())
}

/// Retract a published version with a message explaining why.
pub fn retract<D: Versioned>(tx: &mut dyn Transaction, key: &str, message: &str) -> Result<()> {
    let (doc, mut current) = load::<D>(tx, key)?;
    let status = current.version_info().status;
    if status != Status::Published {
        return Err(transition_error(D::KIND, key, "retract", status));
    }

    let message = message.trim();
    if message.is_empty() {
        return Err(CatalogError::InvalidStateTransition(format!(
            "Retracting {} '{}' requires a message",
            D::KIND.label(),
            key
        )));
    }

    let info = current.version_info_mut();
    info.status = Status::Retracted;
    info.retract_message = Some(message.to_string());
    write_back(tx, &doc, &current)?;
    info!(id = %doc.id, "retracted");
    Ok(())
}

/// Remove a draft together with its edge to the version it was forked from.
pub fn delete_draft<D: Versioned>(tx: &mut dyn Transaction, key: &str) -> Result<()> {
    let (doc, current) = load::<D>(tx, key)?;
    let status = current.version_info().status;
    if status != Status::Draft {
        return Err(transition_error(D::KIND, key, "delete", status));
    }

    let history = D::KIND.history_edge();
    for edge in tx.edges_from(history, &doc.id)? {
        tx.remove_edge(history, &edge.from, &edge.to)?;
    }
    tx.remove(&doc.id)?;
    info!(id = %doc.id, "deleted draft");
    Ok(())
}

/// Apply new content to a versioned document.
///
/// A draft is edited in place and keeps its key and version. A published
/// version is forked into a new draft at version + 1 with a history edge back
/// to it, unless its lineage already has a draft. Any other status is an
/// invalid transition. The version info of `content` is replaced.
pub fn fork_or_edit<D: Versioned>(
    tx: &mut dyn Transaction,
    key: &str,
    mut content: D,
    commit_message: &str,
    expected_rev: Option<u64>,
    max_depth: usize,
) -> Result<Revision> {
    let (doc, current) = load::<D>(tx, key)?;

    if let Some(expected) = expected_rev {
        if expected != doc.rev {
            return Err(CatalogError::Conflict {
                id: doc.id.to_string(),
                expected,
                actual: doc.rev,
            });
        }
    }

    match current.version_info().status {
        Status::Draft => {
            *content.version_info_mut() = current.version_info().edited(commit_message);
            write_back(tx, &doc, &content)?;
            debug!(id = %doc.id, "edited draft in place");
            Ok(Revision {
                key: key.to_string(),
                forked: false,
            })
        }
        Status::Published => {
            if let Some(draft) = lineage::find_draft(tx, D::KIND, key, max_depth)? {
                return Err(CatalogError::InvalidStateTransition(format!(
                    "{} '{}' already has draft '{}'; edit that draft instead",
                    D::KIND.label(),
                    key,
                    draft.key
                )));
            }

            *content.version_info_mut() = current.version_info().successor(commit_message)?;
            let forked = tx.insert(D::KIND.doc_kind(), serde_json::to_value(&content)?)?;
            tx.upsert_edge(D::KIND.history_edge(), &forked.id, &doc.id, Value::Null)?;
            info!(
                id = %forked.id,
                from = %doc.id,
                version = %content.version_info().version,
                "forked new draft"
            );
            Ok(Revision {
                key: forked.key().to_string(),
                forked: true,
            })
        }
        status => Err(transition_error(D::KIND, key, "update", status)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DataTable;
    use crate::store::{GraphStore, MemoryStore};
    use indexmap::IndexMap;

    const DEPTH: usize = 64;

    fn record(status: Status, threshold: f64) -> RecordDocument {
        let mut parameters = IndexMap::new();
        parameters.insert("threshold".to_string(), serde_json::json!(threshold));
        RecordDocument {
            organization: "org".to_string(),
            reaction: "r".to_string(),
            parameters,
            data: DataTable::default(),
            version_info: VersionInfo::initial(status, ""),
        }
    }

    fn status_of(store: &MemoryStore, key: &str) -> Status {
        store
            .transact(|tx| load::<RecordDocument>(tx, key))
            .unwrap()
            .1
            .version_info
            .status
    }

    #[test]
    fn test_publish_draft() {
        let store = MemoryStore::new();
        let key = store
            .transact(|tx| create_draft(tx, &record(Status::Draft, 1.0)))
            .unwrap();

        store
            .transact(|tx| publish::<RecordDocument>(tx, &key, DEPTH))
            .unwrap();
        assert_eq!(status_of(&store, &key), Status::Published);

        let err = store
            .transact(|tx| publish::<RecordDocument>(tx, &key, DEPTH))
            .unwrap_err();
        assert!(err.is_invalid_transition());
    }

    #[test]
    fn test_create_rejects_non_initial_status() {
        let store = MemoryStore::new();
        let err = store
            .transact(|tx| create_draft(tx, &record(Status::Archived, 1.0)))
            .unwrap_err();
        assert!(err.is_invalid_transition());
    }

    #[test]
    fn test_fork_then_publish_archives_previous() {
        let store = MemoryStore::new();
        let v1 = store
            .transact(|tx| create_draft(tx, &record(Status::Published, 1.0)))
            .unwrap();

        let revision = store
            .transact(|tx| fork_or_edit(tx, &v1, record(Status::Draft, 2.0), "bump", None, DEPTH))
            .unwrap();
        assert!(revision.forked);
        assert_ne!(revision.key, v1);

        let (_, forked) = store
            .transact(|tx| load::<RecordDocument>(tx, &revision.key))
            .unwrap();
        assert_eq!(forked.version_info.version, "2");
        assert_eq!(forked.version_info.status, Status::Draft);
        assert_eq!(forked.version_info.commit_message.as_deref(), Some("bump"));

        store
            .transact(|tx| publish::<RecordDocument>(tx, &revision.key, DEPTH))
            .unwrap();
        assert_eq!(status_of(&store, &v1), Status::Archived);
        assert_eq!(status_of(&store, &revision.key), Status::Published);
    }

    #[test]
    fn test_edit_draft_in_place() {
        let store = MemoryStore::new();
        let key = store
            .transact(|tx| create_draft(tx, &record(Status::Draft, 1.0)))
            .unwrap();

        let revision = store
            .transact(|tx| fork_or_edit(tx, &key, record(Status::Draft, 5.0), "tweak", Some(1), DEPTH))
            .unwrap();
        assert_eq!(revision, Revision { key: key.clone(), forked: false });
        assert_eq!(store.stats().unwrap().edges_of(EdgeKind::RecordHistory), 0);

        let err = store
            .transact(|tx| fork_or_edit(tx, &key, record(Status::Draft, 6.0), "stale", Some(1), DEPTH))
            .unwrap_err();
        assert!(matches!(err, CatalogError::Conflict { .. }));
    }

    #[test]
    fn test_second_fork_is_rejected() {
        let store = MemoryStore::new();
        let v1 = store
            .transact(|tx| create_draft(tx, &record(Status::Published, 1.0)))
            .unwrap();
        store
            .transact(|tx| fork_or_edit(tx, &v1, record(Status::Draft, 2.0), "", None, DEPTH))
            .unwrap();

        let err = store
            .transact(|tx| fork_or_edit(tx, &v1, record(Status::Draft, 3.0), "", None, DEPTH))
            .unwrap_err();
        assert!(err.is_invalid_transition());
    }

    #[test]
    fn test_retract_requires_message() {
        let store = MemoryStore::new();
        let key = store
            .transact(|tx| create_draft(tx, &record(Status::Published, 1.0)))
            .unwrap();

        let err = store
            .transact(|tx| retract::<RecordDocument>(tx, &key, "   "))
            .unwrap_err();
        assert!(err.is_invalid_transition());

        store
            .transact(|tx| retract::<RecordDocument>(tx, &key, "error found"))
            .unwrap();
        let (_, doc) = store
            .transact(|tx| load::<RecordDocument>(tx, &key))
            .unwrap();
        assert_eq!(doc.version_info.status, Status::Retracted);
        assert_eq!(doc.version_info.retract_message.as_deref(), Some("error found"));
    }

    #[test]
    fn test_delete_draft_only() {
        let store = MemoryStore::new();
        let published = store
            .transact(|tx| create_draft(tx, &record(Status::Published, 1.0)))
            .unwrap();
        let err = store
            .transact(|tx| delete_draft::<RecordDocument>(tx, &published))
            .unwrap_err();
        assert!(err.is_invalid_transition());

        let draft = store
            .transact(|tx| fork_or_edit(tx, &published, record(Status::Draft, 2.0), "", None, DEPTH))
            .unwrap();
        store
            .transact(|tx| delete_draft::<RecordDocument>(tx, &draft.key))
            .unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.documents_of(DocKind::Record), 1);
        assert_eq!(stats.edges_of(EdgeKind::RecordHistory), 0);
    }

    #[test]
    fn test_update_archived_is_rejected() {
        let store = MemoryStore::new();
        let v1 = store
            .transact(|tx| create_draft(tx, &record(Status::Published, 1.0)))
            .unwrap();
        let v2 = store
            .transact(|tx| fork_or_edit(tx, &v1, record(Status::Draft, 2.0), "", None, DEPTH))
            .unwrap();
        store
            .transact(|tx| publish::<RecordDocument>(tx, &v2.key, DEPTH))
            .unwrap();

        let err = store
            .transact(|tx| fork_or_edit(tx, &v1, record(Status::Draft, 3.0), "", None, DEPTH))
            .unwrap_err();
        assert!(err.is_invalid_transition());
    }
}
