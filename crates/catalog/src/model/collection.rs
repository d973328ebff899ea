//! Collections: named, versioned groups of Records.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::content::{Reference, State};
use super::record::RecordContent;
use super::version::VersionInfo;

/// One member of a collection submission.
///
/// With an `id` the member refers to an existing Record which is reused when
/// unchanged and forked when changed; without one it becomes a new Record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(flatten)]
    pub content: RecordContent,
}

impl MemberSpec {
    /// A brand-new member.
    pub fn new(content: RecordContent) -> Self {
        Self { id: None, content }
    }

    /// A member referring to an existing Record.
    pub fn existing(id: impl Into<String>, content: RecordContent) -> Self {
        Self {
            id: Some(id.into()),
            content,
        }
    }
}

/// Caller-supplied content of a Collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInput {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Whether the collection is a complete set for its reactions.
    #[serde(default)]
    pub complete: bool,

    /// Local state id -> state, shared by all members.
    #[serde(default)]
    pub states: IndexMap<String, State>,

    /// Local reference id -> reference, shared by all members.
    #[serde(default)]
    pub references: IndexMap<String, Reference>,

    /// Local id of the reference the collection itself was published in.
    #[serde(default, rename = "publishedIn", skip_serializing_if = "Option::is_none")]
    pub published_in: Option<String>,

    /// Member records.
    #[serde(default)]
    pub processes: Vec<MemberSpec>,
}

impl CollectionInput {
    /// Create an empty collection input.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            complete: false,
            states: IndexMap::new(),
            references: IndexMap::new(),
            published_in: None,
            processes: Vec::new(),
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

    /// Add a member.
    pub fn with_member(mut self, member: MemberSpec) -> Self {
        self.processes.push(member);
        self
    }

    /// Name the local reference the collection was published in.
    pub fn with_published_in(mut self, local_id: impl Into<String>) -> Self {
        self.published_in = Some(local_id.into());
        self
    }

    /// Set the completeness flag.
    pub fn with_complete(mut self, complete: bool) -> Self {
        self.complete = complete;
        self
    }
}

/// The Collection document as persisted. Members live on `IsPartOf` edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionDocument {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub complete: bool,

    /// Key of the Reference the collection was published in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_in: Option<String>,

    /// Owning organization key.
    pub organization: String,

    pub version_info: VersionInfo,
}

/// A Collection read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredCollection {
    pub key: String,

    /// Store revision, for optimistic concurrency.
    pub rev: u64,

    #[serde(flatten)]
    pub document: CollectionDocument,

    /// Keys of member Records, sorted.
    pub members: Vec<String>,
}

impl StoredCollection {
    /// Version info shortcut.
    pub fn version_info(&self) -> &VersionInfo {
        &self.document.version_info
    }
}
