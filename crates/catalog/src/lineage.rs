//! Lineage traversal over history edges.
//!
//! History edges point from a newer version to the version it was forked
//! from, but a lineage may be queried from any of its members, so the walk
//! follows edges in both directions. The traversal keeps a visited set and
//! refuses to go deeper than a configured bound; a lineage that deep is
//! treated as corrupt rather than walked forever.

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{CatalogError, Result};
use crate::lifecycle::VersionedKind;
use crate::model::{Status, VersionInfo};
use crate::store::{DocId, Transaction};

/// Default bound on traversal depth.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// One version in a lineage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub key: String,

    #[serde(flatten)]
    pub version_info: VersionInfo,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VersionHeader {
    version_info: VersionInfo,
}

/// Every member of the lineage containing `key`, drafts included, in
/// traversal order starting with `key` itself.
pub fn lineage_members(
    tx: &dyn Transaction,
    kind: VersionedKind,
    key: &str,
    max_depth: usize,
) -> Result<Vec<HistoryEntry>> {
    let start = kind.id(key);
    let edge_kind = kind.history_edge();

    let first = tx.get_required(&start)?;
    let mut members = vec![HistoryEntry {
        key: key.to_string(),
        version_info: first.decode::<VersionHeader>()?.version_info,
    }];

    let mut visited: HashSet<DocId> = HashSet::from([start.clone()]);
    let mut queue: VecDeque<(DocId, usize)> = VecDeque::from([(start, 0)]);

    while let Some((id, depth)) = queue.pop_front() {
        let neighbours = tx
            .edges_from(edge_kind, &id)?
            .into_iter()
            .map(|e| e.to)
            .chain(tx.edges_to(edge_kind, &id)?.into_iter().map(|e| e.from));

        for next in neighbours {
            if visited.contains(&next) {
                continue;
            }
            if depth + 1 > max_depth {
                return Err(CatalogError::Storage(format!(
                    "Malformed lineage: {} is more than {} versions away from {}",
                    next,
                    max_depth,
                    kind.id(key)
                )));
            }
            visited.insert(next.clone());

            let Some(doc) = tx.get(&next)? else {
                warn!(from = %id, to = %next, "history edge points to a missing document");
                continue;
            };
            members.push(HistoryEntry {
                key: next.key.clone(),
                version_info: doc.decode::<VersionHeader>()?.version_info,
            });
            queue.push_back((next, depth + 1));
        }
    }

    Ok(members)
}

/// Public history of the lineage containing `key`: drafts excluded, newest
/// version first.
pub fn history_of(
    tx: &dyn Transaction,
    kind: VersionedKind,
    key: &str,
    max_depth: usize,
) -> Result<Vec<HistoryEntry>> {
    let mut numbered = lineage_members(tx, kind, key, max_depth)?
        .into_iter()
        .filter(|entry| entry.version_info.status.is_public())
        .map(|entry| Ok((entry.version_info.number()?, entry)))
        .collect::<Result<Vec<_>>>()?;

    numbered.sort_by(|(a, _), (b, _)| b.cmp(a));
    Ok(numbered.into_iter().map(|(_, entry)| entry).collect())
}

/// The draft of the lineage containing `key`, if there is one.
pub fn find_draft(
    tx: &dyn Transaction,
    kind: VersionedKind,
    key: &str,
    max_depth: usize,
) -> Result<Option<HistoryEntry>> {
    Ok(lineage_members(tx, kind, key, max_depth)?
        .into_iter()
        .find(|entry| entry.version_info.status == Status::Draft))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DocKind, EdgeKind, GraphStore, MemoryStore};
    use serde_json::{Value, json};

    fn version(status: &str, version: u32) -> Value {
        json!({"versionInfo": {
            "status": status,
            "version": version.to_string(),
            "createdOn": "2026-01-01T00:00:00Z"
        }})
    }

    /// Builds a chain v1 <- v2 <- ... and returns the keys oldest first.
    fn chain(store: &MemoryStore, statuses: &[&str]) -> Vec<String> {
        store
            .transact(|tx| {
                let mut keys: Vec<String> = Vec::new();
                for (i, status) in statuses.iter().enumerate() {
                    let doc = tx.insert(DocKind::Record, version(status, i as u32 + 1))?;
                    if let Some(prev) = keys.last() {
                        tx.upsert_edge(
                            EdgeKind::RecordHistory,
                            &doc.id,
                            &DocId::new(DocKind::Record, prev.clone()),
                            Value::Null,
                        )?;
                    }
                    keys.push(doc.key().to_string());
                }
                Ok(keys)
            })
            .unwrap()
    }

    fn versions(entries: &[HistoryEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.version_info.version.as_str()).collect()
    }

    #[test]
    fn test_history_from_either_end() {
        let store = MemoryStore::new();
        let keys = chain(&store, &["archived", "archived", "published", "draft"]);

        for key in &keys {
            let history = store
                .transact(|tx| history_of(tx, VersionedKind::Record, key, DEFAULT_MAX_DEPTH))
                .unwrap();
            assert_eq!(versions(&history), vec!["3", "2", "1"]);
        }
    }

    #[test]
    fn test_lineage_includes_drafts() {
        let store = MemoryStore::new();
        let keys = chain(&store, &["published", "draft"]);

        let draft = store
            .transact(|tx| find_draft(tx, VersionedKind::Record, &keys[0], DEFAULT_MAX_DEPTH))
            .unwrap()
            .unwrap();
        assert_eq!(draft.key, keys[1]);
    }

    #[test]
    fn test_depth_guard() {
        let store = MemoryStore::new();
        let keys = chain(&store, &["archived", "archived", "archived", "published"]);

        let err = store
            .transact(|tx| history_of(tx, VersionedKind::Record, &keys[3], 2))
            .unwrap_err();
        assert!(matches!(err, CatalogError::Storage(_)));

        let ok = store
            .transact(|tx| history_of(tx, VersionedKind::Record, &keys[3], 3))
            .unwrap();
        assert_eq!(ok.len(), 4);
    }

    #[test]
    fn test_cycle_terminates() {
        let store = MemoryStore::new();
        let keys = chain(&store, &["archived", "archived", "published"]);
        store
            .transact(|tx| {
                tx.upsert_edge(
                    EdgeKind::RecordHistory,
                    &DocId::new(DocKind::Record, keys[0].clone()),
                    &DocId::new(DocKind::Record, keys[2].clone()),
                    Value::Null,
                )
            })
            .unwrap();

        let history = store
            .transact(|tx| history_of(tx, VersionedKind::Record, &keys[1], DEFAULT_MAX_DEPTH))
            .unwrap();
        assert_eq!(versions(&history), vec!["3", "2", "1"]);
    }

    #[test]
    fn test_dangling_edge_is_skipped() {
        let store = MemoryStore::new();
        let keys = chain(&store, &["published"]);
        store
            .transact(|tx| {
                tx.upsert_edge(
                    EdgeKind::RecordHistory,
                    &DocId::new(DocKind::Record, keys[0].clone()),
                    &DocId::new(DocKind::Record, "gone"),
                    Value::Null,
                )
            })
            .unwrap();

        let history = store
            .transact(|tx| history_of(tx, VersionedKind::Record, &keys[0], DEFAULT_MAX_DEPTH))
            .unwrap();
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_unknown_key_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .transact(|tx| history_of(tx, VersionedKind::Collection, "nope", DEFAULT_MAX_DEPTH))
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { .. }));
    }
}
