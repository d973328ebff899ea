//! Graph-capable document store interface.
//!
//! The catalog never talks to a database directly. It issues typed operations
//! against a [`Transaction`] obtained from a [`GraphStore`], and every public
//! catalog operation runs inside exactly one transaction: either all of its
//! writes land, or none do.
//!
//! ```text
//! Catalog ──transact──▶ GraphStore ──▶ &mut dyn Transaction
//!                                        ├── documents (Record, Collection, State, ...)
//!                                        └── edges (RecordHistory, IsPartOf, Consumes, ...)
//! ```
//!
//! [`MemoryStore`] is the in-process implementation used by the CLI and tests.

mod memory;
mod persistence;

pub use memory::{MemoryStore, StoreState, StoreStats};
pub use persistence::{Snapshot, SNAPSHOT_FORMAT_VERSION};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CatalogError, Result};

/// Document collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DocKind {
    Record,
    Collection,
    State,
    Reaction,
    Reference,
    Organization,
    User,
}

impl DocKind {
    /// Collection name as used in document ids.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocKind::Record => "Record",
            DocKind::Collection => "Collection",
            DocKind::State => "State",
            DocKind::Reaction => "Reaction",
            DocKind::Reference => "Reference",
            DocKind::Organization => "Organization",
            DocKind::User => "User",
        }
    }

    /// All document collections.
    pub fn all() -> [DocKind; 7] {
        [
            DocKind::Record,
            DocKind::Collection,
            DocKind::State,
            DocKind::Reaction,
            DocKind::Reference,
            DocKind::Organization,
            DocKind::User,
        ]
    }
}

impl std::fmt::Display for DocKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Edge collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// Newer Record version -> the version it was forked from.
    RecordHistory,
    /// Newer Collection version -> the version it was forked from.
    CollectionHistory,
    /// Record -> Collection membership.
    IsPartOf,
    /// Reaction -> consumed State, with `count`.
    Consumes,
    /// Reaction -> produced State, with `count`.
    Produces,
    /// Record -> Reference.
    References,
    /// User -> Organization affiliation.
    OrganizationMembership,
    /// Parent State level -> child State level.
    HasDirectSubstate,
    /// Leaf State level -> compound State.
    InCompound,
}

impl EdgeKind {
    /// Edge collection name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::RecordHistory => "RecordHistory",
            EdgeKind::CollectionHistory => "CollectionHistory",
            EdgeKind::IsPartOf => "IsPartOf",
            EdgeKind::Consumes => "Consumes",
            EdgeKind::Produces => "Produces",
            EdgeKind::References => "References",
            EdgeKind::OrganizationMembership => "OrganizationMembership",
            EdgeKind::HasDirectSubstate => "HasDirectSubstate",
            EdgeKind::InCompound => "InCompound",
        }
    }

    /// All edge collections.
    pub fn all() -> [EdgeKind; 9] {
        [
            EdgeKind::RecordHistory,
            EdgeKind::CollectionHistory,
            EdgeKind::IsPartOf,
            EdgeKind::Consumes,
            EdgeKind::Produces,
            EdgeKind::References,
            EdgeKind::OrganizationMembership,
            EdgeKind::HasDirectSubstate,
            EdgeKind::InCompound,
        ]
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully qualified document id, displayed as `Collection/key`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocId {
    pub kind: DocKind,
    pub key: String,
}

impl DocId {
    /// Create a document id.
    pub fn new(kind: DocKind, key: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
        }
    }
}

impl std::fmt::Display for DocId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.key)
    }
}

/// A stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,

    /// Revision, starting at 1 and bumped on every replace.
    pub rev: u64,

    /// JSON body.
    pub body: Value,
}

impl Document {
    /// Document key.
    pub fn key(&self) -> &str {
        &self.id.key
    }

    /// Decode the body into a typed value.
    ///
    /// A body that does not match the expected shape is a storage error: the
    /// store handed back something the catalog never wrote.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.body.clone()).map_err(|e| {
            CatalogError::Storage(format!("Malformed document '{}': {}", self.id, e))
        })
    }
}

/// A directed edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: DocId,
    pub to: DocId,

    /// Edge attributes, e.g. `{"count": 2}`.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub props: Value,
}

/// Result of a keyed insert-if-absent.
#[derive(Debug, Clone, PartialEq)]
pub struct Upserted {
    /// The stored document (newly inserted or pre-existing).
    pub document: Document,

    /// Whether this call inserted it.
    pub created: bool,
}

/// Operations available inside one transaction.
pub trait Transaction {
    /// Fetch a document.
    fn get(&self, id: &DocId) -> Result<Option<Document>>;

    /// Insert a document under a freshly minted key.
    fn insert(&mut self, kind: DocKind, body: Value) -> Result<Document>;

    /// Insert a document under a caller-chosen key unless that key exists,
    /// in which case the existing document is returned untouched.
    fn insert_keyed(&mut self, id: &DocId, body: Value) -> Result<Upserted>;

    /// Replace a document body. With `expected_rev`, fails with
    /// [`CatalogError::Conflict`] when the stored revision differs.
    fn replace(&mut self, id: &DocId, body: Value, expected_rev: Option<u64>) -> Result<Document>;

    /// Remove a document. Edges are left to the caller.
    fn remove(&mut self, id: &DocId) -> Result<()>;

    /// All documents of a kind matching a predicate, in key order.
    fn scan(&self, kind: DocKind, filter: &dyn Fn(&Document) -> bool) -> Result<Vec<Document>>;

    /// Insert an edge unless an edge with the same endpoints exists.
    /// Returns whether a new edge was inserted.
    fn upsert_edge(&mut self, kind: EdgeKind, from: &DocId, to: &DocId, props: Value)
        -> Result<bool>;

    /// Remove the edge with the given endpoints. Returns whether one existed.
    fn remove_edge(&mut self, kind: EdgeKind, from: &DocId, to: &DocId) -> Result<bool>;

    /// Outbound edges of a document.
    fn edges_from(&self, kind: EdgeKind, from: &DocId) -> Result<Vec<Edge>>;

    /// Inbound edges of a document.
    fn edges_to(&self, kind: EdgeKind, to: &DocId) -> Result<Vec<Edge>>;

    /// Fetch a document that must exist.
    fn get_required(&self, id: &DocId) -> Result<Document> {
        self.get(id)?
            .ok_or_else(|| CatalogError::not_found(id.kind.as_str(), id.key.clone()))
    }
}

/// A store that runs closures as atomic transactions.
pub trait GraphStore: Send + Sync {
    /// Run `op` in a transaction. Commits when `op` returns `Ok`, rolls back
    /// every write when it returns `Err`.
    fn transact<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut dyn Transaction) -> Result<T>;
}
