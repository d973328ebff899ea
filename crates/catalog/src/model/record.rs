//! Records: single versioned measurement documents.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::content::{Reaction, Reference, State};
use super::table::DataTable;
use super::version::VersionInfo;

/// Caller-supplied content of a Record.
///
/// States and references are named by local ids that are resolved against
/// the dictionaries of the enclosing [`RecordInput`] or collection input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordContent {
    /// The reaction this record measures, with local state ids.
    pub reaction: Reaction,

    /// Scalar parameters, e.g. `{"mass_ratio": 1.36e-5}`.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: IndexMap<String, Value>,

    /// Raw measured values.
    #[serde(default)]
    pub data: DataTable,

    /// Local reference ids.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
}

impl RecordContent {
    /// Create content for a reaction with no parameters or data.
    pub fn new(reaction: Reaction) -> Self {
        Self {
            reaction,
            parameters: IndexMap::new(),
            data: DataTable::default(),
            references: Vec::new(),
        }
    }

    /// Set a scalar parameter.
    pub fn with_parameter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    /// Set the data table.
    pub fn with_data(mut self, data: DataTable) -> Self {
        self.data = data;
        self
    }

    /// Add a local reference id.
    pub fn with_reference(mut self, local_id: impl Into<String>) -> Self {
        self.references.push(local_id.into());
        self
    }
}

/// A standalone Record submission: content plus the states and references
/// its local ids refer to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordInput {
    /// Local state id -> state.
    #[serde(default)]
    pub states: IndexMap<String, State>,

    /// Local reference id -> reference.
    #[serde(default)]
    pub references: IndexMap<String, Reference>,

    /// The record itself.
    pub content: RecordContent,
}

impl RecordInput {
    /// Create an input with no states or references.
    pub fn new(content: RecordContent) -> Self {
        Self {
            states: IndexMap::new(),
            references: IndexMap::new(),
            content,
        }
    }

    /// Register a state under a local id.
    pub fn with_state(mut self, local_id: impl Into<String>, state: State) -> Self {
        self.states.insert(local_id.into(), state);
        self
    }

    /// Register a reference under a local id.
    pub fn with_reference(mut self, local_id: impl Into<String>, reference: Reference) -> Self {
        self.references.insert(local_id.into(), reference);
        self
    }
}

/// Record content with every local id replaced by a stored id.
///
/// This is the form used for "is this member unchanged" comparisons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRecord {
    /// Stored reaction id.
    pub reaction: String,

    #[serde(default)]
    pub parameters: IndexMap<String, Value>,

    #[serde(default)]
    pub data: DataTable,

    /// Stored reference ids, sorted and deduplicated.
    #[serde(default)]
    pub references: Vec<String>,
}

impl ResolvedRecord {
    /// Normalize the reference list.
    pub fn normalized(mut self) -> Self {
        self.references.sort();
        self.references.dedup();
        self
    }
}

/// The Record document as persisted. References live on `References` edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDocument {
    /// Owning organization key.
    pub organization: String,

    /// Stored reaction id.
    pub reaction: String,

    #[serde(default)]
    pub parameters: IndexMap<String, Value>,

    #[serde(default)]
    pub data: DataTable,

    pub version_info: VersionInfo,
}

/// A Record read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRecord {
    /// Document key.
    pub key: String,

    /// Store revision, for optimistic concurrency.
    pub rev: u64,

    #[serde(flatten)]
    pub document: RecordDocument,

    /// Stored reference ids.
    pub references: Vec<String>,
}

impl StoredRecord {
    /// Version info shortcut.
    pub fn version_info(&self) -> &VersionInfo {
        &self.document.version_info
    }

    /// The comparable, id-resolved form of this record.
    pub fn resolved(&self) -> ResolvedRecord {
        ResolvedRecord {
            reaction: self.document.reaction.clone(),
            parameters: self.document.parameters.clone(),
            data: self.document.data.clone(),
            references: self.references.clone(),
        }
        .normalized()
    }
}
