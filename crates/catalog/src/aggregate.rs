//! Composition of Collections from member Records.
//!
//! A Collection submission carries shared state and reference dictionaries
//! plus a list of member specifications. Members that name an existing Record
//! of the same organization are compared with it structurally: unchanged
//! members are reused as they are, changed ones are forked (or edited, when
//! already a draft). Everything else becomes a new Record.
//!
//! The Record helpers here are shared with the standalone Record operations
//! of [`Catalog`](crate::Catalog).

use std::collections::HashSet;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, info};

use crate::canonical::structurally_equal;
use crate::config::CatalogConfig;
use crate::dedup;
use crate::error::{CatalogError, Result};
use crate::lifecycle::{self, Revision, VersionedKind};
use crate::lineage;
use crate::model::{
    CollectionDocument, CollectionInput, RecordContent, RecordDocument, Reference,
    ResolvedRecord, State, Status, StoredCollection, StoredRecord, VersionInfo,
};
use crate::store::{DocId, DocKind, EdgeKind, Transaction};

/// Local id -> stored key maps for one submission.
#[derive(Debug, Clone, Default)]
pub struct ResolvedIds {
    pub states: IndexMap<String, String>,
    pub references: IndexMap<String, String>,
}

/// Upsert the state and reference dictionaries of a submission.
pub fn resolve_dictionaries(
    tx: &mut dyn Transaction,
    states: &IndexMap<String, State>,
    references: &IndexMap<String, Reference>,
) -> Result<ResolvedIds> {
    Ok(ResolvedIds {
        states: dedup::upsert_states(tx, states)?,
        references: dedup::upsert_references(tx, references)?,
    })
}

/// Replace the local ids of `content` with stored keys, upserting its reaction.
pub fn resolve_content(
    tx: &mut dyn Transaction,
    content: &RecordContent,
    ids: &ResolvedIds,
) -> Result<ResolvedRecord> {
    let reaction = dedup::upsert_reaction(tx, &content.reaction, &ids.states)?;
    let references = content
        .references
        .iter()
        .map(|local| {
            ids.references.get(local).cloned().ok_or_else(|| {
                CatalogError::Validation(format!("Unknown reference '{}'", local))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ResolvedRecord {
        reaction,
        parameters: content.parameters.clone(),
        data: content.data.clone(),
        references,
    }
    .normalized())
}

fn record_id(key: &str) -> DocId {
    DocId::new(DocKind::Record, key)
}

fn collection_id(key: &str) -> DocId {
    DocId::new(DocKind::Collection, key)
}

/// Read a Record with its reference keys.
pub fn load_record(tx: &dyn Transaction, key: &str) -> Result<StoredRecord> {
    let (doc, document) = lifecycle::load::<RecordDocument>(tx, key)?;
    let mut references: Vec<String> = tx
        .edges_from(EdgeKind::References, &doc.id)?
        .into_iter()
        .map(|edge| edge.to.key)
        .collect();
    references.sort();

    Ok(StoredRecord {
        key: key.to_string(),
        rev: doc.rev,
        document,
        references,
    })
}

/// Read a Collection with its member keys.
pub fn load_collection(tx: &dyn Transaction, key: &str) -> Result<StoredCollection> {
    let (doc, document) = lifecycle::load::<CollectionDocument>(tx, key)?;
    let mut members: Vec<String> = tx
        .edges_to(EdgeKind::IsPartOf, &doc.id)?
        .into_iter()
        .map(|edge| edge.from.key)
        .collect();
    members.sort();

    Ok(StoredCollection {
        key: key.to_string(),
        rev: doc.rev,
        document,
        members,
    })
}

/// Keys of the Collections a Record belongs to.
pub fn collections_of_record(tx: &dyn Transaction, key: &str) -> Result<Vec<String>> {
    let mut keys: Vec<String> = tx
        .edges_from(EdgeKind::IsPartOf, &record_id(key))?
        .into_iter()
        .map(|edge| edge.to.key)
        .collect();
    keys.sort();
    Ok(keys)
}

/// Fail when a Record belongs to any Collection.
pub fn ensure_not_member(tx: &dyn Transaction, key: &str, action: &str) -> Result<()> {
    let collections = collections_of_record(tx, key)?;
    if collections.is_empty() {
        return Ok(());
    }
    Err(CatalogError::InvalidStateTransition(format!(
        "Cannot {} Record '{}': it belongs to Collection {}; {} the Collection instead",
        action,
        key,
        collections.join(", "),
        action
    )))
}

fn sync_references(tx: &mut dyn Transaction, key: &str, references: &[String]) -> Result<()> {
    let record = record_id(key);
    let wanted: HashSet<&str> = references.iter().map(String::as_str).collect();

    for edge in tx.edges_from(EdgeKind::References, &record)? {
        if !wanted.contains(edge.to.key.as_str()) {
            tx.remove_edge(EdgeKind::References, &edge.from, &edge.to)?;
        }
    }
    for reference in references {
        let target = DocId::new(DocKind::Reference, reference.as_str());
        tx.get_required(&target)?;
        tx.upsert_edge(EdgeKind::References, &record, &target, Value::Null)?;
    }
    Ok(())
}

/// Insert the first version of a Record.
pub fn insert_record(
    tx: &mut dyn Transaction,
    resolved: &ResolvedRecord,
    organization: &str,
    status: Status,
    commit_message: &str,
) -> Result<String> {
    let document = RecordDocument {
        organization: organization.to_string(),
        reaction: resolved.reaction.clone(),
        parameters: resolved.parameters.clone(),
        data: resolved.data.clone(),
        version_info: VersionInfo::initial(status, commit_message),
    };
    let key = lifecycle::create_draft(tx, &document)?;
    sync_references(tx, &key, &resolved.references)?;
    Ok(key)
}

/// Fork or edit a Record with new resolved content. The organization stays.
pub fn revise_record(
    tx: &mut dyn Transaction,
    key: &str,
    resolved: &ResolvedRecord,
    commit_message: &str,
    expected_rev: Option<u64>,
    max_depth: usize,
) -> Result<Revision> {
    let (_, current) = lifecycle::load::<RecordDocument>(tx, key)?;
    let document = RecordDocument {
        organization: current.organization,
        reaction: resolved.reaction.clone(),
        parameters: resolved.parameters.clone(),
        data: resolved.data.clone(),
        version_info: current.version_info,
    };

    let revision =
        lifecycle::fork_or_edit(tx, key, document, commit_message, expected_rev, max_depth)?;
    sync_references(tx, &revision.key, &resolved.references)?;
    Ok(revision)
}

/// Delete a draft Record that belongs to no Collection.
pub fn delete_record(tx: &mut dyn Transaction, key: &str) -> Result<()> {
    ensure_not_member(tx, key, "delete")?;
    remove_draft_record(tx, key)
}

fn remove_draft_record(tx: &mut dyn Transaction, key: &str) -> Result<()> {
    lifecycle::delete_draft::<RecordDocument>(tx, key)?;
    let record = record_id(key);
    for edge in tx.edges_from(EdgeKind::References, &record)? {
        tx.remove_edge(EdgeKind::References, &edge.from, &edge.to)?;
    }
    Ok(())
}

/// Retract a published Record that belongs to no Collection.
pub fn retract_record(tx: &mut dyn Transaction, key: &str, message: &str) -> Result<()> {
    ensure_not_member(tx, key, "retract")?;
    lifecycle::retract::<RecordDocument>(tx, key, message)
}

/// The stored Record a member id refers to, if it exists and belongs to
/// `organization`.
fn owned_record(
    tx: &dyn Transaction,
    key: &str,
    organization: &str,
) -> Result<Option<StoredRecord>> {
    if tx.get(&record_id(key))?.is_none() {
        debug!(key, "member id does not exist; inserting as new record");
        return Ok(None);
    }
    let record = load_record(tx, key)?;
    if record.document.organization != organization {
        debug!(key, "member id belongs to another organization; inserting as new record");
        return Ok(None);
    }
    Ok(Some(record))
}

struct MemberContext<'a> {
    collection_key: &'a str,
    collection_name: &'a str,
    organization: &'a str,
    new_member_status: Status,
    commit_message: &'a str,
    config: &'a CatalogConfig,
}

/// Resolve every member of `input` to a Record key and link it to the
/// Collection. Returns the member keys in submission order.
fn attach_members(
    tx: &mut dyn Transaction,
    input: &CollectionInput,
    ids: &ResolvedIds,
    ctx: &MemberContext<'_>,
) -> Result<Vec<String>> {
    let collection = collection_id(ctx.collection_key);
    let mut members = Vec::with_capacity(input.processes.len());

    for member in &input.processes {
        let resolved = resolve_content(tx, &member.content, ids)?;

        let existing = match &member.id {
            Some(id) => owned_record(tx, id, ctx.organization)?,
            None => None,
        };

        let key = match existing {
            Some(stored) => {
                let unchanged = structurally_equal(
                    &serde_json::to_value(stored.resolved())?,
                    &serde_json::to_value(&resolved)?,
                );
                if unchanged {
                    debug!(record = %stored.key, "reusing unchanged member");
                    stored.key
                } else {
                    let message = ctx
                        .config
                        .indirect_commit_message(ctx.collection_name, ctx.collection_key);
                    revise_record(
                        tx,
                        &stored.key,
                        &resolved,
                        &message,
                        None,
                        ctx.config.max_lineage_depth,
                    )?
                    .key
                }
            }
            None => insert_record(
                tx,
                &resolved,
                ctx.organization,
                ctx.new_member_status,
                ctx.commit_message,
            )?,
        };

        tx.upsert_edge(EdgeKind::IsPartOf, &record_id(&key), &collection, Value::Null)?;
        members.push(key);
    }

    Ok(members)
}

fn collection_document(
    input: &CollectionInput,
    ids: &ResolvedIds,
    organization: &str,
    version_info: VersionInfo,
) -> Result<CollectionDocument> {
    let published_in = match &input.published_in {
        Some(local) => Some(ids.references.get(local).cloned().ok_or_else(|| {
            CatalogError::Validation(format!("Unknown reference '{}'", local))
        })?),
        None => None,
    };

    Ok(CollectionDocument {
        name: input.name.clone(),
        description: input.description.clone(),
        complete: input.complete,
        published_in,
        organization: organization.to_string(),
        version_info,
    })
}

/// Create a Collection and its members.
pub fn create_collection(
    tx: &mut dyn Transaction,
    input: &CollectionInput,
    organization: &str,
    status: Status,
    commit_message: &str,
    config: &CatalogConfig,
) -> Result<String> {
    let ids = resolve_dictionaries(tx, &input.states, &input.references)?;

    let document = collection_document(
        input,
        &ids,
        organization,
        VersionInfo::initial(status, commit_message),
    )?;
    let key = lifecycle::create_draft(tx, &document)?;

    let ctx = MemberContext {
        collection_key: &key,
        collection_name: &input.name,
        organization,
        new_member_status: config.new_member_status.member_status(Some(status)),
        commit_message,
        config,
    };
    let members = attach_members(tx, input, &ids, &ctx)?;

    info!(collection = %key, members = members.len(), "created collection");
    Ok(key)
}

/// Apply a new submission to an existing Collection.
///
/// A published Collection is forked into a new draft whose membership is
/// built from scratch; the old version keeps its edges. A draft is edited in
/// place and loses membership of Records no longer listed.
pub fn update_collection(
    tx: &mut dyn Transaction,
    key: &str,
    input: &CollectionInput,
    commit_message: &str,
    expected_rev: Option<u64>,
    config: &CatalogConfig,
) -> Result<String> {
    let (_, current) = lifecycle::load::<CollectionDocument>(tx, key)?;
    let organization = current.organization.clone();

    let ids = resolve_dictionaries(tx, &input.states, &input.references)?;

    let document = collection_document(input, &ids, &organization, current.version_info)?;
    let revision = lifecycle::fork_or_edit(
        tx,
        key,
        document,
        commit_message,
        expected_rev,
        config.max_lineage_depth,
    )?;

    let ctx = MemberContext {
        collection_key: &revision.key,
        collection_name: &input.name,
        organization: &organization,
        new_member_status: config.new_member_status.member_status(None),
        commit_message,
        config,
    };
    let members = attach_members(tx, input, &ids, &ctx)?;

    if !revision.forked {
        let keep: HashSet<&str> = members.iter().map(String::as_str).collect();
        let collection = collection_id(&revision.key);
        for edge in tx.edges_to(EdgeKind::IsPartOf, &collection)? {
            if !keep.contains(edge.from.key.as_str()) {
                tx.remove_edge(EdgeKind::IsPartOf, &edge.from, &edge.to)?;
                debug!(record = %edge.from, "dropped stale member");
            }
        }
    }

    info!(
        collection = %revision.key,
        forked = revision.forked,
        members = members.len(),
        "updated collection"
    );
    Ok(revision.key)
}

fn require_status(
    current: &CollectionDocument,
    key: &str,
    expected: Status,
    action: &str,
) -> Result<()> {
    let status = current.version_info.status;
    if status == expected {
        Ok(())
    } else {
        Err(CatalogError::InvalidStateTransition(format!(
            "Cannot {} Collection '{}' with status {}",
            action, key, status
        )))
    }
}

/// Fail when publishing the draft members of a Collection would archive a
/// Record that a Collection outside its lineage still holds.
fn ensure_predecessors_unshared(
    tx: &dyn Transaction,
    stored: &StoredCollection,
    max_depth: usize,
) -> Result<()> {
    let lineage: HashSet<String> =
        lineage::lineage_members(tx, VersionedKind::Collection, &stored.key, max_depth)?
            .into_iter()
            .map(|entry| entry.key)
            .collect();

    let mut conflicts = Vec::new();
    for member in &stored.members {
        if load_record(tx, member)?.version_info().status != Status::Draft {
            continue;
        }
        for edge in tx.edges_from(EdgeKind::RecordHistory, &record_id(member))? {
            let others: Vec<String> = collections_of_record(tx, &edge.to.key)?
                .into_iter()
                .filter(|other| !lineage.contains(other))
                .collect();
            if !others.is_empty() {
                conflicts.push(format!(
                    "draft Record '{}' replaces Record '{}' which is part of Collection(s) {}",
                    member,
                    edge.to.key,
                    others.join(", ")
                ));
            }
        }
    }

    if conflicts.is_empty() {
        Ok(())
    } else {
        Err(CatalogError::InvalidStateTransition(format!(
            "Cannot publish Collection '{}': {}",
            stored.key,
            conflicts.join("; ")
        )))
    }
}

/// Publish a draft Collection together with its draft members.
pub fn publish_collection(tx: &mut dyn Transaction, key: &str, max_depth: usize) -> Result<()> {
    let stored = load_collection(tx, key)?;
    require_status(&stored.document, key, Status::Draft, "publish")?;
    ensure_predecessors_unshared(tx, &stored, max_depth)?;

    for member in &stored.members {
        let record = load_record(tx, member)?;
        if record.version_info().status == Status::Draft {
            lifecycle::publish::<RecordDocument>(tx, member, max_depth)?;
        }
    }
    lifecycle::publish::<CollectionDocument>(tx, key, max_depth)
}

/// Delete a draft Collection and the draft Records that belong only to it.
pub fn delete_collection(tx: &mut dyn Transaction, key: &str) -> Result<()> {
    let stored = load_collection(tx, key)?;
    require_status(&stored.document, key, Status::Draft, "delete")?;

    let collection = collection_id(key);
    for member in &stored.members {
        tx.remove_edge(EdgeKind::IsPartOf, &record_id(member), &collection)?;

        let record = load_record(tx, member)?;
        if record.version_info().status == Status::Draft
            && collections_of_record(tx, member)?.is_empty()
        {
            remove_draft_record(tx, member)?;
            debug!(record = %member, "removed exclusive draft member");
        }
    }
    lifecycle::delete_draft::<CollectionDocument>(tx, key)
}

/// Retract a published Collection and the published members that no other
/// published or draft Collection holds.
pub fn retract_collection(tx: &mut dyn Transaction, key: &str, message: &str) -> Result<()> {
    let stored = load_collection(tx, key)?;
    lifecycle::retract::<CollectionDocument>(tx, key, message)?;

    for member in &stored.members {
        let record = load_record(tx, member)?;
        if record.version_info().status != Status::Published {
            continue;
        }

        let mut exclusive = true;
        for other in collections_of_record(tx, member)? {
            if other == key {
                continue;
            }
            let status = load_collection(tx, &other)?.version_info().status;
            if matches!(status, Status::Published | Status::Draft) {
                exclusive = false;
                break;
            }
        }
        if exclusive {
            lifecycle::retract::<RecordDocument>(tx, member, message)?;
        }
    }
    Ok(())
}
