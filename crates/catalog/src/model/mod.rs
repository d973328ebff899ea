//! Typed documents: what callers submit and what the store holds.

mod collection;
mod content;
mod record;
mod table;
mod version;

pub use collection::{CollectionDocument, CollectionInput, MemberSpec, StoredCollection};
pub use content::{ElectronicLevel, Reaction, ReactionEntry, Reference, State, VibrationalLevel};
pub use record::{RecordContent, RecordDocument, RecordInput, ResolvedRecord, StoredRecord};
pub use table::DataTable;
pub use version::{Status, VersionInfo};
