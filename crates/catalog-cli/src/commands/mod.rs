//! CLI command implementations.

pub mod collection;
pub mod org;
pub mod record;
pub mod status;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use colored::{ColoredString, Colorize};
use serde::de::DeserializeOwned;
use tracing::debug;

use catalog::{Actor, Catalog, CatalogConfig, HistoryEntry, MemoryStore, Status};

use crate::cli::Cli;

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// An opened catalog plus the identity commands run as.
pub struct Session {
    pub catalog: Catalog<MemoryStore>,
    store_path: PathBuf,
    actor: Option<Actor>,
}

impl Session {
    /// Load the snapshot (or start empty) and apply configuration.
    pub fn open(cli: &Cli) -> Result<Self, Box<dyn std::error::Error>> {
        let config = match &cli.config {
            Some(path) => CatalogConfig::load(path)?,
            None => CatalogConfig::default(),
        };
        let store = MemoryStore::open(&cli.store)?;
        debug!(store = %cli.store.display(), "catalog opened");

        let actor = cli.actor.as_ref().map(|email| {
            cli.roles
                .iter()
                .fold(Actor::new(email.clone()), |actor, role| actor.with_role((*role).into()))
        });

        Ok(Self {
            catalog: Catalog::with_config(Arc::new(store), config),
            store_path: cli.store.clone(),
            actor,
        })
    }

    /// Require that the acting user may edit entities of `organization`.
    /// Without `--as` the local operator is trusted.
    pub fn authorize(&self, organization: &str) -> CommandResult {
        if let Some(actor) = &self.actor {
            self.catalog.gate().authorize(actor, organization)?;
        }
        Ok(())
    }

    /// Require that the acting user may publish or retract entities of
    /// `organization`.
    pub fn authorize_publish(&self, organization: &str) -> CommandResult {
        if let Some(actor) = &self.actor {
            self.catalog.gate().authorize_publish(actor, organization)?;
        }
        Ok(())
    }

    /// Write the catalog back, keeping the previous snapshot in history.
    pub fn save(self) -> CommandResult {
        self.catalog.store().save_with_history(&self.store_path)?;
        Ok(())
    }
}

/// Read a JSON submission file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, Box<dyn std::error::Error>> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
    Ok(serde_json::from_str(&contents)?)
}

/// Status with its conventional color.
pub fn status_label(status: Status) -> ColoredString {
    match status {
        Status::Draft => status.label().blue(),
        Status::Published => status.label().green(),
        Status::Archived => status.label().dimmed(),
        Status::Retracted => status.label().red(),
    }
}

/// One line of a version history listing.
pub fn print_history_entry(entry: &HistoryEntry) {
    let info = &entry.version_info;
    println!(
        "  v{:<4} {:>8}  {:<10} {}  {}",
        info.version,
        entry.key.white().bold(),
        status_label(info.status),
        info.created_on.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
        info.commit_message.as_deref().unwrap_or("").dimmed()
    );
    if let Some(reason) = &info.retract_message {
        println!("         {} {}", "retracted:".red(), reason);
    }
}
