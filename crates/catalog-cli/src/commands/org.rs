//! Organization commands - ownership scopes and their members.

use colored::Colorize;
use catalog::VersionedKind;

use super::{CommandResult, Session};
use crate::cli::KindChoice;

pub fn create(session: Session, name: &str) -> CommandResult {
    let key = session.catalog.upsert_organization(name)?;
    session.save()?;

    println!("{} {} {}", "Organization".green().bold(), key.white().bold(), name);
    Ok(())
}

pub fn add_member(session: Session, email: &str, organization: &str) -> CommandResult {
    session.authorize(organization)?;
    let added = session.catalog.add_member(email, organization)?;
    session.save()?;

    if added {
        println!("{} {} to {}", "Added".green().bold(), email, organization.white().bold());
    } else {
        println!("{} is already a member of {}", email, organization.white().bold());
    }
    Ok(())
}

pub fn check(session: Session, kind: KindChoice, key: &str, email: &str) -> CommandResult {
    let kind: VersionedKind = kind.into();
    if session.catalog.is_owner(kind, key, email)? {
        println!("{} owns {} {}", email, kind.label(), key.white().bold());
        Ok(())
    } else {
        Err(format!("{} does not own {} {}", email, kind.label(), key).into())
    }
}
