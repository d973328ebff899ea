//! Catalog: versioned lifecycle engine for scientific measurement data.
//!
//! Records (single measurements) and Collections (curated groups of Records)
//! move through a draft → published → archived/retracted lifecycle. Every
//! edit of a published version forks a new draft linked to its predecessor,
//! so the full lineage of a document can always be reconstructed.
//!
//! # Core Principles
//!
//! - **Immutable history**: published versions are never edited, only superseded
//! - **Content addressing**: States, Reactions and References are stored once
//!   per distinct content and shared by every Record that mentions them
//! - **Atomic operations**: each public operation commits completely or not at all
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use catalog::{Catalog, MemoryStore, Status};
//! use catalog::model::{CollectionInput, MemberSpec, Reaction, ReactionEntry, RecordContent, State};
//!
//! let catalog = Catalog::new(Arc::new(MemoryStore::new()));
//! let org = catalog.upsert_organization("Plasma Lab").unwrap();
//!
//! let elastic = RecordContent::new(Reaction::new(
//!     vec![ReactionEntry::new("e", 1), ReactionEntry::new("Ar", 1)],
//!     vec![ReactionEntry::new("e", 1), ReactionEntry::new("Ar", 1)],
//! ));
//! let input = CollectionInput::new("Argon", "Electron scattering on argon")
//!     .with_state("e", State::new("e", -1))
//!     .with_state("Ar", State::new("Ar", 0))
//!     .with_member(MemberSpec::new(elastic));
//!
//! let id = catalog.create_collection(&input, &org, Status::Draft, "initial import").unwrap();
//! catalog.publish_collection(&id).unwrap();
//!
//! println!("Members: {}", catalog.collection(&id).unwrap().members.len());
//! ```

pub mod aggregate;
pub mod canonical;
pub mod config;
pub mod dedup;
pub mod error;
pub mod lifecycle;
pub mod lineage;
pub mod model;
pub mod ownership;
pub mod store;
pub mod validation;

mod catalog;

pub use crate::catalog::Catalog;
pub use config::{CatalogConfig, MemberStatusPolicy};
pub use error::{CatalogError, Result};
pub use lifecycle::VersionedKind;
pub use lineage::HistoryEntry;
pub use model::{Status, VersionInfo};
pub use ownership::{Actor, AffiliationProvider, OwnershipGate, Role};
pub use store::{GraphStore, MemoryStore};
