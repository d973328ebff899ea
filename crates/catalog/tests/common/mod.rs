//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use catalog::model::{
    CollectionInput, MemberSpec, Reaction, ReactionEntry, RecordContent, RecordInput, Reference,
    State,
};
use catalog::{Catalog, MemoryStore};

/// A fresh catalog with one organization. Returns the catalog and the
/// organization key.
pub fn setup() -> (Catalog<MemoryStore>, String) {
    let catalog = Catalog::new(Arc::new(MemoryStore::new()));
    let org = catalog
        .upsert_organization("Plasma Lab")
        .expect("Failed to create organization");
    (catalog, org)
}

/// e + Ar -> e + Ar
pub fn elastic_reaction() -> Reaction {
    Reaction::new(
        vec![ReactionEntry::new("e", 1), ReactionEntry::new("Ar", 1)],
        vec![ReactionEntry::new("e", 1), ReactionEntry::new("Ar", 1)],
    )
    .with_type_tags(vec!["Elastic".to_string()])
}

/// e + Ar -> 2e + Ar+
pub fn ionization_reaction() -> Reaction {
    Reaction::new(
        vec![ReactionEntry::new("e", 1), ReactionEntry::new("Ar", 1)],
        vec![ReactionEntry::new("e", 2), ReactionEntry::new("Ar+", 1)],
    )
    .with_type_tags(vec!["Ionization".to_string()])
}

pub fn elastic(threshold: f64) -> RecordContent {
    RecordContent::new(elastic_reaction())
        .with_parameter("threshold", serde_json::json!(threshold))
        .with_reference("hayashi")
}

pub fn ionization(threshold: f64) -> RecordContent {
    RecordContent::new(ionization_reaction())
        .with_parameter("threshold", serde_json::json!(threshold))
}

pub fn hayashi() -> Reference {
    Reference::titled("Electron collision cross sections for argon").with_doi("10.1000/argon.1981")
}

/// Standalone record input for the elastic process.
pub fn record_input(threshold: f64) -> RecordInput {
    RecordInput::new(elastic(threshold))
        .with_state("e", State::new("e", -1))
        .with_state("Ar", State::new("Ar", 0))
        .with_reference("hayashi", hayashi())
}

/// Collection input with the argon state and reference dictionaries and no
/// members.
pub fn collection_input(description: &str) -> CollectionInput {
    CollectionInput::new("Argon", description)
        .with_state("e", State::new("e", -1))
        .with_state("Ar", State::new("Ar", 0))
        .with_state("Ar+", State::new("Ar", 1))
        .with_reference("hayashi", hayashi())
}

/// Collection input with one new elastic and one new ionization member.
pub fn two_member_input() -> CollectionInput {
    collection_input("argon set")
        .with_member(MemberSpec::new(elastic(0.0)))
        .with_member(MemberSpec::new(ionization(15.76)))
}
