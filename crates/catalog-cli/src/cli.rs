//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use catalog::{Role, Status, VersionedKind};

/// Catalog: versioned measurement records and collections
#[derive(Parser)]
#[command(name = "catalog")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Snapshot file holding the catalog
    #[arg(long, global = true, default_value = "catalog.json", env = "CATALOG_STORE")]
    pub store: PathBuf,

    /// JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Act as this user; mutations are checked against their organizations
    #[arg(long = "as", global = true, value_name = "EMAIL")]
    pub actor: Option<String>,

    /// Roles held by the acting user
    #[arg(long = "role", global = true, value_enum)]
    pub roles: Vec<RoleChoice>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage organizations and their members
    Org {
        #[command(subcommand)]
        command: OrgCommand,
    },

    /// Create, edit and publish single records
    Record {
        #[command(subcommand)]
        command: RecordCommand,
    },

    /// Create, edit and publish collections of records
    Collection {
        #[command(subcommand)]
        command: CollectionCommand,
    },

    /// Show store contents and transaction counts
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum OrgCommand {
    /// Create an organization (or return the existing one with this name)
    Create {
        /// Organization name
        name: String,
    },

    /// Add a user to an organization
    AddMember {
        /// User email
        email: String,

        /// Organization key
        organization: String,
    },

    /// Check whether a user owns a record or collection
    Check {
        /// Entity kind
        #[arg(value_enum)]
        kind: KindChoice,

        /// Entity key
        key: String,

        /// User email
        email: String,
    },
}

#[derive(Subcommand)]
pub enum RecordCommand {
    /// Create a record from a JSON submission
    Create {
        /// Record submission (JSON)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Owning organization key
        #[arg(short, long = "org")]
        organization: String,

        /// Replace the data table with a CSV/TSV file
        #[arg(long)]
        table: Option<PathBuf>,

        /// Publish immediately instead of creating a draft
        #[arg(long)]
        publish: bool,

        /// Commit message
        #[arg(short, long, default_value = "")]
        message: String,
    },

    /// Apply a new submission to a record (forks published records)
    Update {
        /// Record key
        key: String,

        /// Record submission (JSON)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Replace the data table with a CSV/TSV file
        #[arg(long)]
        table: Option<PathBuf>,

        /// Fail unless the record is still at this revision
        #[arg(long)]
        rev: Option<u64>,

        /// Commit message
        #[arg(short, long, default_value = "")]
        message: String,
    },

    /// Publish a draft record
    Publish {
        /// Record key
        key: String,
    },

    /// Retract a published record
    Retract {
        /// Record key
        key: String,

        /// Reason for retraction
        #[arg(short, long)]
        message: String,
    },

    /// Delete a draft record
    Delete {
        /// Record key
        key: String,
    },

    /// Show a record as JSON
    Show {
        /// Record key
        key: String,
    },

    /// Show the public version history of a record
    History {
        /// Record key
        key: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List records
    List {
        /// Only records with this status
        #[arg(long, value_enum)]
        status: Option<StatusChoice>,
    },
}

#[derive(Subcommand)]
pub enum CollectionCommand {
    /// Create a collection and its members from a JSON submission
    Create {
        /// Collection submission (JSON)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Owning organization key
        #[arg(short, long = "org")]
        organization: String,

        /// Publish immediately instead of creating a draft
        #[arg(long)]
        publish: bool,

        /// Commit message
        #[arg(short, long, default_value = "")]
        message: String,
    },

    /// Apply a new submission to a collection (forks published collections)
    Update {
        /// Collection key
        key: String,

        /// Collection submission (JSON)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Fail unless the collection is still at this revision
        #[arg(long)]
        rev: Option<u64>,

        /// Commit message
        #[arg(short, long, default_value = "")]
        message: String,
    },

    /// Publish a draft collection and its draft members
    Publish {
        /// Collection key
        key: String,
    },

    /// Retract a published collection and its exclusive members
    Retract {
        /// Collection key
        key: String,

        /// Reason for retraction
        #[arg(short, long)]
        message: String,
    },

    /// Delete a draft collection and its exclusive draft members
    Delete {
        /// Collection key
        key: String,
    },

    /// Show a collection and its members
    Show {
        /// Collection key
        key: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the public version history of a collection
    History {
        /// Collection key
        key: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List collections
    List {
        /// Only collections with this status
        #[arg(long, value_enum)]
        status: Option<StatusChoice>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum StatusChoice {
    Draft,
    Published,
    Archived,
    Retracted,
}

impl From<StatusChoice> for Status {
    fn from(choice: StatusChoice) -> Self {
        match choice {
            StatusChoice::Draft => Status::Draft,
            StatusChoice::Published => Status::Published,
            StatusChoice::Archived => Status::Archived,
            StatusChoice::Retracted => Status::Retracted,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum RoleChoice {
    Author,
    Publisher,
    Admin,
}

impl From<RoleChoice> for Role {
    fn from(choice: RoleChoice) -> Self {
        match choice {
            RoleChoice::Author => Role::Author,
            RoleChoice::Publisher => Role::Publisher,
            RoleChoice::Admin => Role::Admin,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum KindChoice {
    Record,
    Collection,
}

impl From<KindChoice> for VersionedKind {
    fn from(choice: KindChoice) -> Self {
        match choice {
            KindChoice::Record => VersionedKind::Record,
            KindChoice::Collection => VersionedKind::Collection,
        }
    }
}
