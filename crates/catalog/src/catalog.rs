//! Main Catalog struct and public API.

use std::sync::Arc;

use tracing::{debug, info};

use crate::aggregate;
use crate::config::CatalogConfig;
use crate::dedup;
use crate::error::Result;
use crate::lifecycle::{self, VersionedKind};
use crate::lineage::{self, HistoryEntry};
use crate::model::{
    CollectionDocument, CollectionInput, RecordDocument, RecordInput, Reference, State, Status,
    StoredCollection, StoredRecord,
};
use crate::ownership::{self, OwnershipGate, StoreAffiliations};
use crate::store::{DocId, DocKind, GraphStore};
use crate::validation;

/// Versioned catalog of Records and Collections over a graph store.
///
/// Every method runs in exactly one store transaction. Mutating methods do
/// not check who is calling; consult [`Catalog::gate`] or
/// [`Catalog::is_owner`] first.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use catalog::{Catalog, MemoryStore, Status};
/// use catalog::model::{Reaction, ReactionEntry, RecordContent, RecordInput, State};
///
/// let catalog = Catalog::new(Arc::new(MemoryStore::new()));
/// let org = catalog.upsert_organization("Plasma Lab").unwrap();
///
/// let input = RecordInput::new(RecordContent::new(Reaction::new(
///     vec![ReactionEntry::new("e", 1), ReactionEntry::new("Ar", 1)],
///     vec![ReactionEntry::new("e", 1), ReactionEntry::new("Ar", 1)],
/// )))
/// .with_state("e", State::new("e", -1))
/// .with_state("Ar", State::new("Ar", 0));
///
/// let id = catalog.create_record(&input, &org, Status::Draft, "").unwrap();
/// catalog.publish_record(&id).unwrap();
/// assert_eq!(catalog.history_of_record(&id).unwrap().len(), 1);
/// ```
#[derive(Debug)]
pub struct Catalog<S: GraphStore> {
    store: Arc<S>,
    config: CatalogConfig,
}

impl<S: GraphStore> Clone for Catalog<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

impl<S: GraphStore> Catalog<S> {
    /// Create a catalog with default configuration.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, CatalogConfig::default())
    }

    /// Create a catalog with custom configuration.
    pub fn with_config(store: Arc<S>, config: CatalogConfig) -> Self {
        Self { store, config }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Current configuration.
    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    fn depth(&self) -> usize {
        self.config.max_lineage_depth
    }

    // --- Records ---

    /// Create the first version of a Record.
    ///
    /// `status` must be draft or published. The organization must exist.
    pub fn create_record(
        &self,
        input: &RecordInput,
        organization: &str,
        status: Status,
        commit_message: &str,
    ) -> Result<String> {
        validation::validate_record_input(input)?;
        let key = self.store.transact(|tx| {
            tx.get_required(&DocId::new(DocKind::Organization, organization))?;
            let ids = aggregate::resolve_dictionaries(tx, &input.states, &input.references)?;
            let resolved = aggregate::resolve_content(tx, &input.content, &ids)?;
            aggregate::insert_record(tx, &resolved, organization, status, commit_message)
        })?;
        info!(record = %key, %status, "created record");
        Ok(key)
    }

    /// Apply new content to a Record.
    ///
    /// A draft is edited in place and its key is returned. A published Record
    /// is forked into a new draft at the next version and the new key is
    /// returned.
    pub fn update_record(&self, key: &str, input: &RecordInput, commit_message: &str) -> Result<String> {
        self.revise_record(key, input, commit_message, None)
    }

    /// Like [`Catalog::update_record`], but fails with a conflict unless the
    /// Record is still at revision `expected_rev`.
    pub fn update_record_at(
        &self,
        key: &str,
        expected_rev: u64,
        input: &RecordInput,
        commit_message: &str,
    ) -> Result<String> {
        self.revise_record(key, input, commit_message, Some(expected_rev))
    }

    fn revise_record(
        &self,
        key: &str,
        input: &RecordInput,
        commit_message: &str,
        expected_rev: Option<u64>,
    ) -> Result<String> {
        validation::validate_record_input(input)?;
        let depth = self.depth();
        let revision = self.store.transact(|tx| {
            let ids = aggregate::resolve_dictionaries(tx, &input.states, &input.references)?;
            let resolved = aggregate::resolve_content(tx, &input.content, &ids)?;
            aggregate::revise_record(tx, key, &resolved, commit_message, expected_rev, depth)
        })?;
        info!(record = %revision.key, from = key, forked = revision.forked, "updated record");
        Ok(revision.key)
    }

    /// Publish a draft Record, archiving the published version of its lineage.
    pub fn publish_record(&self, key: &str) -> Result<()> {
        let depth = self.depth();
        self.store
            .transact(|tx| lifecycle::publish::<RecordDocument>(tx, key, depth))
    }

    /// Retract a published Record. Records inside a Collection are retracted
    /// through the Collection.
    pub fn retract_record(&self, key: &str, message: &str) -> Result<()> {
        self.store
            .transact(|tx| aggregate::retract_record(tx, key, message))
    }

    /// Delete a draft Record that belongs to no Collection.
    pub fn delete_draft_record(&self, key: &str) -> Result<()> {
        self.store.transact(|tx| aggregate::delete_record(tx, key))
    }

    /// Public history of a Record's lineage, newest first.
    pub fn history_of_record(&self, key: &str) -> Result<Vec<HistoryEntry>> {
        let depth = self.depth();
        self.store
            .transact(|tx| lineage::history_of(tx, VersionedKind::Record, key, depth))
    }

    /// Read a Record.
    pub fn record(&self, key: &str) -> Result<StoredRecord> {
        self.store.transact(|tx| aggregate::load_record(tx, key))
    }

    /// Keys of the Collections a Record belongs to.
    pub fn record_collections(&self, key: &str) -> Result<Vec<String>> {
        self.store.transact(|tx| {
            tx.get_required(&DocId::new(DocKind::Record, key))?;
            aggregate::collections_of_record(tx, key)
        })
    }

    /// All Records, optionally filtered by status.
    pub fn list_records(&self, status: Option<Status>) -> Result<Vec<StoredRecord>> {
        self.store.transact(|tx| {
            let keys: Vec<String> = tx
                .scan(DocKind::Record, &|_| true)?
                .into_iter()
                .map(|doc| doc.id.key)
                .collect();
            let mut records = Vec::with_capacity(keys.len());
            for key in keys {
                let record = aggregate::load_record(tx, &key)?;
                if status.is_none_or(|s| record.version_info().status == s) {
                    records.push(record);
                }
            }
            Ok(records)
        })
    }

    // --- Collections ---

    /// Create the first version of a Collection and its members.
    pub fn create_collection(
        &self,
        input: &CollectionInput,
        organization: &str,
        status: Status,
        commit_message: &str,
    ) -> Result<String> {
        validation::validate_collection_input(input)?;
        self.store.transact(|tx| {
            tx.get_required(&DocId::new(DocKind::Organization, organization))?;
            aggregate::create_collection(
                tx,
                input,
                organization,
                status,
                commit_message,
                &self.config,
            )
        })
    }

    /// Apply a new submission to a Collection. Returns the key of the draft
    /// holding it, which differs from `key` when a published Collection was
    /// forked.
    pub fn update_collection(
        &self,
        key: &str,
        input: &CollectionInput,
        commit_message: &str,
    ) -> Result<String> {
        validation::validate_collection_input(input)?;
        self.store.transact(|tx| {
            aggregate::update_collection(tx, key, input, commit_message, None, &self.config)
        })
    }

    /// Like [`Catalog::update_collection`], but fails with a conflict unless
    /// the Collection is still at revision `expected_rev`.
    pub fn update_collection_at(
        &self,
        key: &str,
        expected_rev: u64,
        input: &CollectionInput,
        commit_message: &str,
    ) -> Result<String> {
        validation::validate_collection_input(input)?;
        self.store.transact(|tx| {
            aggregate::update_collection(
                tx,
                key,
                input,
                commit_message,
                Some(expected_rev),
                &self.config,
            )
        })
    }

    /// Publish a draft Collection and its draft members.
    pub fn publish_collection(&self, key: &str) -> Result<()> {
        let depth = self.depth();
        self.store
            .transact(|tx| aggregate::publish_collection(tx, key, depth))?;
        info!(collection = key, "published collection");
        Ok(())
    }

    /// Retract a published Collection and its exclusively owned members.
    pub fn retract_collection(&self, key: &str, message: &str) -> Result<()> {
        self.store
            .transact(|tx| aggregate::retract_collection(tx, key, message))?;
        info!(collection = key, "retracted collection");
        Ok(())
    }

    /// Delete a draft Collection and its exclusive draft members.
    pub fn delete_collection(&self, key: &str) -> Result<()> {
        self.store
            .transact(|tx| aggregate::delete_collection(tx, key))?;
        info!(collection = key, "deleted collection");
        Ok(())
    }

    /// Public history of a Collection's lineage, newest first.
    pub fn history_of_collection(&self, key: &str) -> Result<Vec<HistoryEntry>> {
        let depth = self.depth();
        self.store
            .transact(|tx| lineage::history_of(tx, VersionedKind::Collection, key, depth))
    }

    /// Read a Collection.
    pub fn collection(&self, key: &str) -> Result<StoredCollection> {
        self.store
            .transact(|tx| aggregate::load_collection(tx, key))
    }

    /// The member Records of a Collection.
    pub fn members_of(&self, key: &str) -> Result<Vec<StoredRecord>> {
        self.store.transact(|tx| {
            let collection = aggregate::load_collection(tx, key)?;
            collection
                .members
                .iter()
                .map(|member| aggregate::load_record(tx, member))
                .collect()
        })
    }

    /// All Collections, optionally filtered by status.
    pub fn list_collections(&self, status: Option<Status>) -> Result<Vec<StoredCollection>> {
        self.store.transact(|tx| {
            let keys: Vec<String> = tx
                .scan(DocKind::Collection, &|_| true)?
                .into_iter()
                .map(|doc| doc.id.key)
                .collect();
            let mut collections = Vec::with_capacity(keys.len());
            for key in keys {
                let collection = aggregate::load_collection(tx, &key)?;
                if status.is_none_or(|s| collection.version_info().status == s) {
                    collections.push(collection);
                }
            }
            Ok(collections)
        })
    }

    // --- Sub-entities and ownership ---

    /// Store an Organization by name, returning its key.
    pub fn upsert_organization(&self, name: &str) -> Result<String> {
        self.store
            .transact(|tx| dedup::upsert_organization(tx, name))
    }

    /// Link a user to an organization. Returns whether the link is new.
    pub fn add_member(&self, email: &str, organization: &str) -> Result<bool> {
        self.store
            .transact(|tx| ownership::add_membership(tx, email, organization))
    }

    /// Store a State and its level hierarchy, returning the key of its most
    /// specific level.
    pub fn upsert_state(&self, state: &State) -> Result<String> {
        self.store.transact(|tx| dedup::upsert_state(tx, state))
    }

    /// Store a Reference, returning its key.
    pub fn upsert_reference(&self, reference: &Reference) -> Result<String> {
        self.store
            .transact(|tx| dedup::upsert_reference(tx, reference))
    }

    /// Ownership gate backed by this catalog's membership edges.
    pub fn gate(&self) -> OwnershipGate<StoreAffiliations<S>> {
        OwnershipGate::new(StoreAffiliations::new(Arc::clone(&self.store)))
    }

    /// Whether the user belongs to the organization owning a Record or
    /// Collection.
    pub fn is_owner(&self, kind: VersionedKind, key: &str, email: &str) -> Result<bool> {
        let organization = self.store.transact(|tx| match kind {
            VersionedKind::Record => {
                Ok(lifecycle::load::<RecordDocument>(tx, key)?.1.organization)
            }
            VersionedKind::Collection => {
                Ok(lifecycle::load::<CollectionDocument>(tx, key)?.1.organization)
            }
        })?;
        let owner = self.gate().is_member(&organization, email)?;
        debug!(kind = kind.label(), key, email, owner, "ownership check");
        Ok(owner)
    }
}
