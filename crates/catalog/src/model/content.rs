//! Content-addressed sub-entities: physical states, reactions and references.
//!
//! These values are immutable once stored. Two inserts with structurally
//! equal content resolve to the same stored id.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CatalogError, Result};

/// A physical state of a particle.
///
/// Electronic, vibrational and rotational levels form a hierarchy; each level
/// is stored as its own State when inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// Particle name, e.g. `"Ar"` or `"N2"`.
    pub particle: String,

    /// Net charge in units of the elementary charge.
    #[serde(default)]
    pub charge: i32,

    /// Electronic levels. More than one leaf level makes this a compound state.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub electronic: Vec<ElectronicLevel>,
}

/// An electronic level of a [`State`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectronicLevel {
    /// Level designation, e.g. `"X"` or `"1s5"`.
    pub label: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vibrational: Vec<VibrationalLevel>,
}

/// A vibrational level of an [`ElectronicLevel`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VibrationalLevel {
    /// Vibrational quantum number or label, e.g. `"0"`.
    pub label: String,

    /// Rotational level labels.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rotational: Vec<String>,
}

impl State {
    /// Create a ground-level state with no electronic detail.
    pub fn new(particle: impl Into<String>, charge: i32) -> Self {
        Self {
            particle: particle.into(),
            charge,
            electronic: Vec::new(),
        }
    }

    /// Add an electronic level.
    pub fn with_electronic(mut self, level: ElectronicLevel) -> Self {
        self.electronic.push(level);
        self
    }

    /// Human-readable summary, e.g. `N2^+{X}{v=0}`.
    pub fn summary(&self) -> String {
        let mut out = self.particle.clone();
        match self.charge {
            0 => {}
            1 => out.push_str("^+"),
            -1 => out.push_str("^-"),
            c if c > 0 => out.push_str(&format!("^{}+", c)),
            c => out.push_str(&format!("^{}-", -c)),
        }
        if !self.electronic.is_empty() {
            let levels: Vec<String> = self
                .electronic
                .iter()
                .map(ElectronicLevel::summary)
                .collect();
            out.push_str(&levels.join("|"));
        }
        out
    }

    /// The same particle and charge without any level detail.
    pub fn root(&self) -> Self {
        Self::new(self.particle.clone(), self.charge)
    }

    /// Number of most-specific levels described by this state.
    pub fn leaf_count(&self) -> usize {
        self.electronic
            .iter()
            .map(|e| {
                if e.vibrational.is_empty() {
                    1
                } else {
                    e.vibrational
                        .iter()
                        .map(|v| v.rotational.len().max(1))
                        .sum()
                }
            })
            .sum()
    }
}

impl ElectronicLevel {
    /// Create an electronic level without vibrational detail.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            vibrational: Vec::new(),
        }
    }

    /// Add a vibrational level.
    pub fn with_vibrational(mut self, level: VibrationalLevel) -> Self {
        self.vibrational.push(level);
        self
    }

    fn summary(&self) -> String {
        let mut out = format!("{{{}}}", self.label);
        if !self.vibrational.is_empty() {
            let levels: Vec<String> = self
                .vibrational
                .iter()
                .map(|v| {
                    let mut s = format!("{{v={}}}", v.label);
                    if !v.rotational.is_empty() {
                        s.push_str(&format!("{{J={}}}", v.rotational.join("|")));
                    }
                    s
                })
                .collect();
            out.push_str(&levels.join("|"));
        }
        out
    }
}

impl VibrationalLevel {
    /// Create a vibrational level without rotational detail.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            rotational: Vec::new(),
        }
    }

    /// Add a rotational level label.
    pub fn with_rotational(mut self, label: impl Into<String>) -> Self {
        self.rotational.push(label.into());
        self
    }
}

/// One side entry of a reaction: a state reference and its stoichiometric count.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReactionEntry {
    /// State id. Local (caller-chosen) before resolution, stored id after.
    pub state: String,

    /// Number of particles in this state.
    #[serde(default = "default_count")]
    pub count: u32,
}

fn default_count() -> u32 {
    1
}

impl ReactionEntry {
    /// Create an entry.
    pub fn new(state: impl Into<String>, count: u32) -> Self {
        Self {
            state: state.into(),
            count,
        }
    }
}

/// A reaction between physical states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    /// Consumed states.
    pub lhs: Vec<ReactionEntry>,

    /// Produced states.
    pub rhs: Vec<ReactionEntry>,

    /// Whether the reaction also runs backwards.
    #[serde(default)]
    pub reversible: bool,

    /// Process type tags, e.g. `"Elastic"`, `"Ionization"`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_tags: Vec<String>,
}

impl Reaction {
    /// Create an irreversible reaction without type tags.
    pub fn new(lhs: Vec<ReactionEntry>, rhs: Vec<ReactionEntry>) -> Self {
        Self {
            lhs,
            rhs,
            reversible: false,
            type_tags: Vec::new(),
        }
    }

    /// Set the type tags.
    pub fn with_type_tags(mut self, tags: Vec<String>) -> Self {
        self.type_tags = tags;
        self
    }

    /// Set reversibility.
    pub fn reversible(mut self, reversible: bool) -> Self {
        self.reversible = reversible;
        self
    }

    /// All state ids referenced on either side.
    pub fn state_ids(&self) -> impl Iterator<Item = &str> {
        self.lhs.iter().chain(self.rhs.iter()).map(|e| e.state.as_str())
    }

    /// Map local state ids to stored ids.
    ///
    /// Fails with a validation error when a local id is missing from `ids`.
    pub fn resolve(&self, ids: &IndexMap<String, String>) -> Result<Reaction> {
        let map_side = |side: &[ReactionEntry]| -> Result<Vec<ReactionEntry>> {
            side.iter()
                .map(|entry| {
                    ids.get(&entry.state)
                        .map(|stored| ReactionEntry::new(stored.clone(), entry.count))
                        .ok_or_else(|| {
                            CatalogError::Validation(format!(
                                "Reaction refers to unknown state '{}'",
                                entry.state
                            ))
                        })
                })
                .collect()
        };

        Ok(Reaction {
            lhs: map_side(&self.lhs)?,
            rhs: map_side(&self.rhs)?,
            reversible: self.reversible,
            type_tags: self.type_tags.clone(),
        })
    }

    /// Canonical form: entries and tags sorted so that ordering never affects
    /// equality or fingerprints.
    pub fn canonical(&self) -> Reaction {
        let mut lhs = self.lhs.clone();
        let mut rhs = self.rhs.clone();
        let mut type_tags = self.type_tags.clone();
        lhs.sort();
        rhs.sort();
        type_tags.sort();
        type_tags.dedup();
        Reaction {
            lhs,
            rhs,
            reversible: self.reversible,
            type_tags,
        }
    }
}

/// A bibliographic reference in CSL-JSON shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    /// CSL item type, e.g. `"article-journal"`.
    #[serde(rename = "type", default = "default_reference_type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Digital Object Identifier.
    #[serde(rename = "DOI", default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,

    /// Remaining CSL fields (authors, issued date, container title, ...).
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

fn default_reference_type() -> String {
    "article-journal".to_string()
}

impl Reference {
    /// Create a reference with a title.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            kind: default_reference_type(),
            title: Some(title.into()),
            doi: None,
            extra: IndexMap::new(),
        }
    }

    /// Set the DOI.
    pub fn with_doi(mut self, doi: impl Into<String>) -> Self {
        self.doi = Some(doi.into());
        self
    }

    /// Set an additional CSL field.
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.extra.insert(name.into(), value);
        self
    }
}
