//! Ownership checks against organization affiliations.
//!
//! The catalog does not authenticate anyone. Callers hand it an [`Actor`]
//! they have already identified, and the gate answers whether that actor's
//! organizations include the one owning an entity.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{CatalogError, Result};
use crate::store::{DocId, DocKind, EdgeKind, GraphStore, Transaction};

/// Role of an authenticated actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// May create and edit drafts of their organizations.
    Author,
    /// May also publish and retract.
    Publisher,
    /// May do anything regardless of affiliation.
    Admin,
}

impl Role {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Role::Author => "Author",
            Role::Publisher => "Publisher",
            Role::Admin => "Admin",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "author" => Ok(Role::Author),
            "publisher" => Ok(Role::Publisher),
            "admin" => Ok(Role::Admin),
            other => Err(CatalogError::Validation(format!("Unknown role '{}'", other))),
        }
    }
}

/// A pre-authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub email: String,
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl Actor {
    /// Create an actor with no roles.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            roles: Vec::new(),
        }
    }

    /// Grant a role.
    pub fn with_role(mut self, role: Role) -> Self {
        if !self.roles.contains(&role) {
            self.roles.push(role);
        }
        self
    }

    /// Check if the actor holds a role. Admins hold every role.
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&Role::Admin) || self.roles.contains(&role)
    }
}

/// Source of organization affiliations.
pub trait AffiliationProvider {
    /// Organization keys the user with this email belongs to.
    fn affiliations_of(&self, email: &str) -> Result<Vec<String>>;
}

/// Fixed affiliations, e.g. from an identity provider's token claims.
#[derive(Debug, Clone, Default)]
pub struct StaticAffiliations {
    by_email: HashMap<String, Vec<String>>,
}

impl StaticAffiliations {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an affiliation.
    pub fn with(mut self, email: &str, organization: impl Into<String>) -> Self {
        self.by_email
            .entry(normalize_email(email))
            .or_default()
            .push(organization.into());
        self
    }
}

impl AffiliationProvider for StaticAffiliations {
    fn affiliations_of(&self, email: &str) -> Result<Vec<String>> {
        Ok(self
            .by_email
            .get(&normalize_email(email))
            .cloned()
            .unwrap_or_default())
    }
}

/// Affiliations read from `OrganizationMembership` edges in the store.
#[derive(Debug)]
pub struct StoreAffiliations<S: GraphStore> {
    store: Arc<S>,
}

impl<S: GraphStore> StoreAffiliations<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl<S: GraphStore> AffiliationProvider for StoreAffiliations<S> {
    fn affiliations_of(&self, email: &str) -> Result<Vec<String>> {
        self.store.transact(|tx| affiliations_in(tx, email))
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Document id of the user with this email.
pub fn user_id(email: &str) -> DocId {
    DocId::new(DocKind::User, normalize_email(email))
}

/// Organization keys linked to a user inside an open transaction.
pub fn affiliations_in(tx: &dyn Transaction, email: &str) -> Result<Vec<String>> {
    Ok(tx
        .edges_from(EdgeKind::OrganizationMembership, &user_id(email))?
        .into_iter()
        .map(|edge| edge.to.key)
        .collect())
}

/// Link a user to an organization, creating the user document if needed.
///
/// Returns whether a new membership was recorded.
pub fn add_membership(tx: &mut dyn Transaction, email: &str, organization: &str) -> Result<bool> {
    let email = normalize_email(email);
    if !email.contains('@') {
        return Err(CatalogError::Validation(format!(
            "'{}' is not an email address",
            email
        )));
    }

    let org = DocId::new(DocKind::Organization, organization);
    tx.get_required(&org)?;

    let user = user_id(&email);
    tx.insert_keyed(&user, json!({ "email": email }))?;
    let added = tx.upsert_edge(EdgeKind::OrganizationMembership, &user, &org, Value::Null)?;
    if added {
        debug!(user = %user, organization = %org, "added membership");
    }
    Ok(added)
}

/// Answers ownership and role questions for actors.
#[derive(Debug)]
pub struct OwnershipGate<P: AffiliationProvider> {
    provider: P,
}

impl<P: AffiliationProvider> OwnershipGate<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Whether the user belongs to `organization`.
    pub fn is_member(&self, organization: &str, email: &str) -> Result<bool> {
        Ok(self
            .provider
            .affiliations_of(email)?
            .iter()
            .any(|org| org == organization))
    }

    /// Require that the actor may modify entities of `organization`.
    pub fn authorize(&self, actor: &Actor, organization: &str) -> Result<()> {
        if actor.has_role(Role::Admin) || self.is_member(organization, &actor.email)? {
            Ok(())
        } else {
            Err(CatalogError::Forbidden(format!(
                "{} is not a member of organization '{}'",
                actor.email, organization
            )))
        }
    }

    /// Require that the actor may publish or retract entities of `organization`.
    pub fn authorize_publish(&self, actor: &Actor, organization: &str) -> Result<()> {
        self.authorize(actor, organization)?;
        if actor.has_role(Role::Publisher) {
            Ok(())
        } else {
            Err(CatalogError::Forbidden(format!(
                "{} lacks the {} role",
                actor.email,
                Role::Publisher.label()
            )))
        }
    }
}
