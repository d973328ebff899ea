//! Content-addressed upserts of immutable sub-entities.
//!
//! The key of a State, Reaction, Reference or Organization is the fingerprint
//! of its canonical content. Upserting content that is already stored is a
//! pure read; nothing is written and the existing key is returned.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, trace};

use crate::canonical::{fingerprint, structurally_equal};
use crate::error::{CatalogError, Result};
use crate::model::{ElectronicLevel, Reaction, Reference, State, VibrationalLevel};
use crate::store::{DocId, DocKind, EdgeKind, Transaction, Upserted};

/// Store `content` under its fingerprint unless an equal document exists.
///
/// A document under the same key with different content is a fingerprint
/// collision and fails with [`CatalogError::Storage`].
pub fn upsert(tx: &mut dyn Transaction, kind: DocKind, content: &Value) -> Result<Upserted> {
    let id = DocId::new(kind, fingerprint(kind, content));

    if let Some(existing) = tx.get(&id)? {
        if !structurally_equal(&existing.body, content) {
            return Err(CatalogError::Storage(format!(
                "Fingerprint collision on '{}': stored content differs",
                id
            )));
        }
        trace!(id = %id, "reused existing content");
        return Ok(Upserted {
            document: existing,
            created: false,
        });
    }

    let upserted = tx.insert_keyed(&id, content.clone())?;
    debug!(id = %id, "inserted content-addressed document");
    Ok(upserted)
}

fn upsert_serialized<T: Serialize>(
    tx: &mut dyn Transaction,
    kind: DocKind,
    content: &T,
) -> Result<Upserted> {
    upsert(tx, kind, &serde_json::to_value(content)?)
}

/// Store a State and every level above it.
///
/// Each level becomes its own State, linked parent -> child with
/// `HasDirectSubstate`. A State with several leaf levels is also stored whole
/// as a compound, with `InCompound` edges from each leaf. Returns the key of
/// the most specific level, or of the compound.
pub fn upsert_state(tx: &mut dyn Transaction, state: &State) -> Result<String> {
    let root = upsert_serialized(tx, DocKind::State, &state.root())?;
    let leaf_count = state.leaf_count();
    let mut leaves = Vec::with_capacity(leaf_count);

    if leaf_count == 0 {
        return Ok(root.document.key().to_string());
    }

    for electronic in &state.electronic {
        let level = ElectronicLevel::new(electronic.label.clone());
        let elec_state = state.root().with_electronic(level.clone());
        let elec = upsert_substate(tx, &root.document.id, &elec_state)?;

        if electronic.vibrational.is_empty() {
            leaves.push(elec);
            continue;
        }

        for vibrational in &electronic.vibrational {
            let vib_level = VibrationalLevel::new(vibrational.label.clone());
            let vib_state = state
                .root()
                .with_electronic(level.clone().with_vibrational(vib_level.clone()));
            let vib = upsert_substate(tx, &elec, &vib_state)?;

            if vibrational.rotational.is_empty() {
                leaves.push(vib);
                continue;
            }

            for rotational in &vibrational.rotational {
                let rot_state = state.root().with_electronic(
                    level
                        .clone()
                        .with_vibrational(vib_level.clone().with_rotational(rotational.clone())),
                );
                leaves.push(upsert_substate(tx, &vib, &rot_state)?);
            }
        }
    }

    if let [leaf] = leaves.as_slice() {
        return Ok(leaf.key.clone());
    }

    let compound = upsert_serialized(tx, DocKind::State, state)?;
    for leaf in &leaves {
        tx.upsert_edge(EdgeKind::InCompound, leaf, &compound.document.id, Value::Null)?;
    }
    if compound.created {
        debug!(state = %state.summary(), leaves = leaf_count, "stored compound state");
    }
    Ok(compound.document.key().to_string())
}

fn upsert_substate(tx: &mut dyn Transaction, parent: &DocId, child: &State) -> Result<DocId> {
    let stored = upsert_serialized(tx, DocKind::State, child)?;
    tx.upsert_edge(
        EdgeKind::HasDirectSubstate,
        parent,
        &stored.document.id,
        Value::Null,
    )?;
    Ok(stored.document.id)
}

/// Upsert a dictionary of States, returning local id -> stored key.
pub fn upsert_states(
    tx: &mut dyn Transaction,
    states: &IndexMap<String, State>,
) -> Result<IndexMap<String, String>> {
    states
        .iter()
        .map(|(local, state)| Ok((local.clone(), upsert_state(tx, state)?)))
        .collect()
}

/// Store a Reference.
pub fn upsert_reference(tx: &mut dyn Transaction, reference: &Reference) -> Result<String> {
    Ok(upsert_serialized(tx, DocKind::Reference, reference)?
        .document
        .key()
        .to_string())
}

/// Upsert a dictionary of References, returning local id -> stored key.
pub fn upsert_references(
    tx: &mut dyn Transaction,
    references: &IndexMap<String, Reference>,
) -> Result<IndexMap<String, String>> {
    references
        .iter()
        .map(|(local, reference)| Ok((local.clone(), upsert_reference(tx, reference)?)))
        .collect()
}

/// Store an Organization by name.
pub fn upsert_organization(tx: &mut dyn Transaction, name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CatalogError::Validation(
            "Organization name must not be empty".to_string(),
        ));
    }
    Ok(upsert(tx, DocKind::Organization, &json!({ "name": name }))?
        .document
        .key()
        .to_string())
}

/// Store a Reaction whose entries use local state ids.
///
/// The reaction is resolved through `states` and canonicalised, so entry and
/// tag order never produce a second copy. A newly stored reaction gets one
/// `Consumes`/`Produces` edge per distinct state, carrying the summed count.
pub fn upsert_reaction(
    tx: &mut dyn Transaction,
    reaction: &Reaction,
    states: &IndexMap<String, String>,
) -> Result<String> {
    let resolved = reaction.resolve(states)?.canonical();
    let stored = upsert_serialized(tx, DocKind::Reaction, &resolved)?;

    if stored.created {
        for (edge, side) in [
            (EdgeKind::Consumes, &resolved.lhs),
            (EdgeKind::Produces, &resolved.rhs),
        ] {
            let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
            for entry in side {
                *counts.entry(entry.state.as_str()).or_default() += entry.count;
            }
            for (state, count) in counts {
                let state_id = DocId::new(DocKind::State, state);
                tx.get_required(&state_id)?;
                tx.upsert_edge(edge, &stored.document.id, &state_id, json!({ "count": count }))?;
            }
        }
    }

    Ok(stored.document.key().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ReactionEntry;
    use crate::store::{GraphStore, MemoryStore};

    fn argon() -> State {
        State::new("Ar", 0)
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let store = MemoryStore::new();
        let first = store.transact(|tx| upsert_state(tx, &argon())).unwrap();
        let second = store.transact(|tx| upsert_state(tx, &argon())).unwrap();

        assert_eq!(first, second);
        assert_eq!(store.stats().unwrap().documents_of(DocKind::State), 1);
    }

    #[test]
    fn test_collision_is_storage_error() {
        let store = MemoryStore::new();
        let content = json!({"particle": "Ar", "charge": 0});
        let key = fingerprint(DocKind::State, &content);

        let err = store
            .transact(|tx| {
                tx.insert_keyed(&DocId::new(DocKind::State, key.clone()), json!({"other": 1}))?;
                upsert(tx, DocKind::State, &content)
            })
            .unwrap_err();
        assert!(matches!(err, CatalogError::Storage(_)));
    }

    #[test]
    fn test_state_tree_levels_and_edges() {
        let store = MemoryStore::new();
        let state = State::new("N2", 0).with_electronic(
            ElectronicLevel::new("X").with_vibrational(VibrationalLevel::new("1")),
        );

        let key = store.transact(|tx| upsert_state(tx, &state)).unwrap();
        let stats = store.stats().unwrap();

        // root, electronic, vibrational
        assert_eq!(stats.documents_of(DocKind::State), 3);
        assert_eq!(stats.edges_of(EdgeKind::HasDirectSubstate), 2);
        assert_eq!(stats.edges_of(EdgeKind::InCompound), 0);
        assert_eq!(key, fingerprint(DocKind::State, &serde_json::to_value(&state).unwrap()));
    }

    #[test]
    fn test_compound_state() {
        let store = MemoryStore::new();
        let state = State::new("Ar", 0)
            .with_electronic(ElectronicLevel::new("1s5"))
            .with_electronic(ElectronicLevel::new("1s3"));

        let key = store.transact(|tx| upsert_state(tx, &state)).unwrap();
        let stats = store.stats().unwrap();

        // root, two leaves, compound
        assert_eq!(stats.documents_of(DocKind::State), 4);
        assert_eq!(stats.edges_of(EdgeKind::InCompound), 2);

        let again = store.transact(|tx| upsert_state(tx, &state)).unwrap();
        assert_eq!(key, again);
        assert_eq!(store.stats().unwrap(), stats);
    }

    #[test]
    fn test_rotational_leaves_form_compound() {
        let store = MemoryStore::new();
        let state = State::new("N2", 0).with_electronic(
            ElectronicLevel::new("X").with_vibrational(
                VibrationalLevel::new("0")
                    .with_rotational("1")
                    .with_rotational("2"),
            ),
        );
        assert_eq!(state.leaf_count(), 2);

        let key = store.transact(|tx| upsert_state(tx, &state)).unwrap();
        let stats = store.stats().unwrap();

        // root, X, v=0, J=1, J=2, compound
        assert_eq!(stats.documents_of(DocKind::State), 6);
        assert_eq!(stats.edges_of(EdgeKind::HasDirectSubstate), 4);
        assert_eq!(stats.edges_of(EdgeKind::InCompound), 2);
        assert_eq!(key, fingerprint(DocKind::State, &serde_json::to_value(&state).unwrap()));
    }

    #[test]
    fn test_shared_levels_are_reused() {
        let store = MemoryStore::new();
        let ground = State::new("He", 0).with_electronic(ElectronicLevel::new("1S"));
        let excited = State::new("He", 0).with_electronic(ElectronicLevel::new("2S"));

        store.transact(|tx| upsert_state(tx, &ground)).unwrap();
        store.transact(|tx| upsert_state(tx, &excited)).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.documents_of(DocKind::State), 3);
        assert_eq!(stats.edges_of(EdgeKind::HasDirectSubstate), 2);
    }

    #[test]
    fn test_reaction_order_independent() {
        let store = MemoryStore::new();
        let states: IndexMap<String, State> = [
            ("e".to_string(), State::new("e", -1)),
            ("Ar".to_string(), argon()),
        ]
        .into_iter()
        .collect();

        let forward = Reaction::new(
            vec![ReactionEntry::new("e", 1), ReactionEntry::new("Ar", 1)],
            vec![ReactionEntry::new("e", 2), ReactionEntry::new("Ar", 1)],
        );
        let shuffled = Reaction::new(
            vec![ReactionEntry::new("Ar", 1), ReactionEntry::new("e", 1)],
            vec![ReactionEntry::new("Ar", 1), ReactionEntry::new("e", 2)],
        );

        let (a, b) = store
            .transact(|tx| {
                let ids = upsert_states(tx, &states)?;
                Ok((
                    upsert_reaction(tx, &forward, &ids)?,
                    upsert_reaction(tx, &shuffled, &ids)?,
                ))
            })
            .unwrap();

        assert_eq!(a, b);
        let stats = store.stats().unwrap();
        assert_eq!(stats.documents_of(DocKind::Reaction), 1);
        assert_eq!(stats.edges_of(EdgeKind::Consumes), 2);
        assert_eq!(stats.edges_of(EdgeKind::Produces), 2);
    }

    #[test]
    fn test_reaction_unknown_state_is_validation_error() {
        let store = MemoryStore::new();
        let reaction = Reaction::new(vec![ReactionEntry::new("ghost", 1)], vec![]);
        let err = store
            .transact(|tx| upsert_reaction(tx, &reaction, &IndexMap::new()))
            .unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
    }

    #[test]
    fn test_organization_by_name() {
        let store = MemoryStore::new();
        let a = store.transact(|tx| upsert_organization(tx, "Plasma Lab")).unwrap();
        let b = store.transact(|tx| upsert_organization(tx, " Plasma Lab ")).unwrap();
        assert_eq!(a, b);

        let err = store.transact(|tx| upsert_organization(tx, "  ")).unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
    }
}
