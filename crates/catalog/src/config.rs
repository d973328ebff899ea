//! Catalog configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};
use crate::lineage::DEFAULT_MAX_DEPTH;
use crate::model::Status;

/// Initial status of Records created as brand-new members of a Collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatusPolicy {
    /// New members of a Collection created published are published too;
    /// every other path creates them as drafts.
    #[default]
    MirrorOnCreate,
    /// New members always start as drafts.
    AlwaysDraft,
}

impl MemberStatusPolicy {
    /// Status for a new member given the status the Collection is created
    /// with, or `None` when the Collection is being revised.
    pub fn member_status(&self, creating_with: Option<Status>) -> Status {
        match (self, creating_with) {
            (MemberStatusPolicy::MirrorOnCreate, Some(Status::Published)) => Status::Published,
            _ => Status::Draft,
        }
    }
}

/// Configuration for a [`Catalog`](crate::Catalog).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Maximum lineage traversal depth before a lineage is reported malformed.
    pub max_lineage_depth: usize,

    /// Commit message for members forked by a Collection edit. `{name}` and
    /// `{key}` are replaced by the Collection's name and key.
    pub indirect_commit_template: String,

    /// Initial status of brand-new Collection members.
    pub new_member_status: MemberStatusPolicy,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            max_lineage_depth: DEFAULT_MAX_DEPTH,
            indirect_commit_template: "Indirect draft by editing collection {name} / {key}"
                .to_string(),
            new_member_status: MemberStatusPolicy::default(),
        }
    }
}

impl CatalogConfig {
    /// Set the maximum lineage depth.
    pub fn with_max_lineage_depth(mut self, depth: usize) -> Self {
        self.max_lineage_depth = depth;
        self
    }

    /// Set the indirect commit message template.
    pub fn with_indirect_commit_template(mut self, template: impl Into<String>) -> Self {
        self.indirect_commit_template = template.into();
        self
    }

    /// Set the new-member status policy.
    pub fn with_new_member_status(mut self, policy: MemberStatusPolicy) -> Self {
        self.new_member_status = policy;
        self
    }

    /// Commit message for a member forked by editing a Collection.
    pub fn indirect_commit_message(&self, name: &str, key: &str) -> String {
        self.indirect_commit_template
            .replace("{name}", name)
            .replace("{key}", key)
    }

    /// Load configuration from a JSON file. Missing fields take defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            CatalogError::Persistence(format!(
                "Failed to read config '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: CatalogConfig = serde_json::from_str(&text)?;
        if config.max_lineage_depth == 0 {
            return Err(CatalogError::Validation(
                "max_lineage_depth must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }
}
