//! In-memory graph store.
//!
//! Transactions are serialized: the store lock is held for the whole closure,
//! which works on a private copy of the state. The copy replaces the shared
//! state only when the closure succeeds, so a failed operation leaves no trace
//! and two racing operations on the same lineage can never interleave.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{DocId, DocKind, Document, Edge, EdgeKind, GraphStore, Transaction, Upserted};
use crate::error::{CatalogError, Result};

/// The complete contents of a [`MemoryStore`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreState {
    #[serde(default)]
    documents: BTreeMap<DocKind, BTreeMap<String, Document>>,

    #[serde(default)]
    edges: BTreeMap<EdgeKind, Vec<Edge>>,

    /// Last minted numeric key.
    #[serde(default)]
    last_key: u64,
}

impl StoreState {
    fn mint_key(&mut self) -> String {
        self.last_key += 1;
        self.last_key.to_string()
    }

    fn edges_of(&self, kind: EdgeKind) -> &[Edge] {
        self.edges.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Document counts by collection.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            documents: DocKind::all()
                .into_iter()
                .map(|k| (k, self.documents.get(&k).map_or(0, BTreeMap::len)))
                .collect(),
            edges: EdgeKind::all()
                .into_iter()
                .map(|k| (k, self.edges_of(k).len()))
                .collect(),
        }
    }
}

/// Counts of stored documents and edges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreStats {
    pub documents: BTreeMap<DocKind, usize>,
    pub edges: BTreeMap<EdgeKind, usize>,
}

impl StoreStats {
    /// Number of documents in one collection.
    pub fn documents_of(&self, kind: DocKind) -> usize {
        self.documents.get(&kind).copied().unwrap_or(0)
    }

    /// Number of edges in one edge collection.
    pub fn edges_of(&self, kind: EdgeKind) -> usize {
        self.edges.get(&kind).copied().unwrap_or(0)
    }
}

/// In-memory [`GraphStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
    commits: AtomicU64,
    rollbacks: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given state.
    pub fn from_state(state: StoreState) -> Self {
        Self {
            state: Mutex::new(state),
            commits: AtomicU64::new(0),
            rollbacks: AtomicU64::new(0),
        }
    }

    /// A copy of the current committed state.
    pub fn snapshot(&self) -> Result<StoreState> {
        Ok(self.lock()?.clone())
    }

    /// Document and edge counts of the committed state.
    pub fn stats(&self) -> Result<StoreStats> {
        Ok(self.lock()?.stats())
    }

    /// Number of committed transactions since creation.
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::Relaxed)
    }

    /// Number of rolled back transactions since creation.
    pub fn rollback_count(&self) -> u64 {
        self.rollbacks.load(Ordering::Relaxed)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, StoreState>> {
        self.state
            .lock()
            .map_err(|_| CatalogError::Storage("Store lock poisoned".to_string()))
    }
}

impl GraphStore for MemoryStore {
    fn transact<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut dyn Transaction) -> Result<T>,
    {
        let mut guard = self.lock()?;
        let mut txn = MemoryTransaction {
            state: guard.clone(),
            writes: 0,
        };

        match op(&mut txn) {
            Ok(value) => {
                if txn.writes > 0 {
                    *guard = txn.state;
                    debug!(writes = txn.writes, "transaction committed");
                }
                self.commits.fetch_add(1, Ordering::Relaxed);
                Ok(value)
            }
            Err(e) => {
                debug!(writes = txn.writes, error = %e, "transaction rolled back");
                self.rollbacks.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }
}

/// Working copy of the state for one transaction.
struct MemoryTransaction {
    state: StoreState,
    writes: usize,
}

impl MemoryTransaction {
    fn documents_mut(&mut self, kind: DocKind) -> &mut BTreeMap<String, Document> {
        self.state.documents.entry(kind).or_default()
    }
}

impl Transaction for MemoryTransaction {
    fn get(&self, id: &DocId) -> Result<Option<Document>> {
        Ok(self
            .state
            .documents
            .get(&id.kind)
            .and_then(|docs| docs.get(&id.key))
            .cloned())
    }

    fn insert(&mut self, kind: DocKind, body: Value) -> Result<Document> {
        let key = self.state.mint_key();
        let doc = Document {
            id: DocId::new(kind, key.clone()),
            rev: 1,
            body,
        };
        self.documents_mut(kind).insert(key, doc.clone());
        self.writes += 1;
        Ok(doc)
    }

    fn insert_keyed(&mut self, id: &DocId, body: Value) -> Result<Upserted> {
        if let Some(existing) = self.get(id)? {
            return Ok(Upserted {
                document: existing,
                created: false,
            });
        }
        let doc = Document {
            id: id.clone(),
            rev: 1,
            body,
        };
        self.documents_mut(id.kind).insert(id.key.clone(), doc.clone());
        self.writes += 1;
        Ok(Upserted {
            document: doc,
            created: true,
        })
    }

    fn replace(&mut self, id: &DocId, body: Value, expected_rev: Option<u64>) -> Result<Document> {
        let doc = self
            .documents_mut(id.kind)
            .get_mut(&id.key)
            .ok_or_else(|| CatalogError::not_found(id.kind.as_str(), id.key.clone()))?;

        if let Some(expected) = expected_rev {
            if doc.rev != expected {
                return Err(CatalogError::Conflict {
                    id: id.to_string(),
                    expected,
                    actual: doc.rev,
                });
            }
        }

        doc.rev += 1;
        doc.body = body;
        let updated = doc.clone();
        self.writes += 1;
        Ok(updated)
    }

    fn remove(&mut self, id: &DocId) -> Result<()> {
        self.documents_mut(id.kind)
            .remove(&id.key)
            .ok_or_else(|| CatalogError::not_found(id.kind.as_str(), id.key.clone()))?;
        self.writes += 1;
        Ok(())
    }

    fn scan(&self, kind: DocKind, filter: &dyn Fn(&Document) -> bool) -> Result<Vec<Document>> {
        Ok(self
            .state
            .documents
            .get(&kind)
            .map(|docs| docs.values().filter(|d| filter(d)).cloned().collect())
            .unwrap_or_default())
    }

    fn upsert_edge(
        &mut self,
        kind: EdgeKind,
        from: &DocId,
        to: &DocId,
        props: Value,
    ) -> Result<bool> {
        let edges = self.state.edges.entry(kind).or_default();
        if edges.iter().any(|e| &e.from == from && &e.to == to) {
            return Ok(false);
        }
        edges.push(Edge {
            from: from.clone(),
            to: to.clone(),
            props,
        });
        self.writes += 1;
        Ok(true)
    }

    fn remove_edge(&mut self, kind: EdgeKind, from: &DocId, to: &DocId) -> Result<bool> {
        let Some(edges) = self.state.edges.get_mut(&kind) else {
            return Ok(false);
        };
        let before = edges.len();
        edges.retain(|e| !(&e.from == from && &e.to == to));
        let removed = edges.len() != before;
        if removed {
            self.writes += 1;
        }
        Ok(removed)
    }

    fn edges_from(&self, kind: EdgeKind, from: &DocId) -> Result<Vec<Edge>> {
        Ok(self
            .state
            .edges_of(kind)
            .iter()
            .filter(|e| &e.from == from)
            .cloned()
            .collect())
    }

    fn edges_to(&self, kind: EdgeKind, to: &DocId) -> Result<Vec<Edge>> {
        Ok(self
            .state
            .edges_of(kind)
            .iter()
            .filter(|e| &e.to == to)
            .cloned()
            .collect())
    }
}
