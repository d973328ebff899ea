//! Collection commands - submit, publish and inspect collections of records.

use std::path::PathBuf;

use colored::Colorize;
use catalog::Status;
use catalog::model::CollectionInput;

use super::{read_json, status_label, CommandResult, Session};
use crate::cli::StatusChoice;

pub fn create(
    session: Session,
    file: PathBuf,
    organization: &str,
    publish: bool,
    message: &str,
) -> CommandResult {
    let input: CollectionInput = read_json(&file)?;
    let status = if publish {
        session.authorize_publish(organization)?;
        Status::Published
    } else {
        session.authorize(organization)?;
        Status::Draft
    };

    let key = session
        .catalog
        .create_collection(&input, organization, status, message)?;
    let members = session.catalog.collection(&key)?.members.len();
    session.save()?;

    println!(
        "{} Collection {} '{}' ({}) with {} members",
        "Created".green().bold(),
        key.white().bold(),
        input.name,
        status,
        members
    );
    Ok(())
}

pub fn update(
    session: Session,
    key: &str,
    file: PathBuf,
    rev: Option<u64>,
    message: &str,
) -> CommandResult {
    let input: CollectionInput = read_json(&file)?;
    let existing = session.catalog.collection(key)?;
    session.authorize(&existing.document.organization)?;

    let draft = match rev {
        Some(rev) => session.catalog.update_collection_at(key, rev, &input, message)?,
        None => session.catalog.update_collection(key, &input, message)?,
    };
    session.save()?;

    if draft == key {
        println!("{} draft Collection {}", "Edited".green().bold(), draft.white().bold());
    } else {
        println!(
            "{} Collection {} into draft {}",
            "Forked".green().bold(),
            key,
            draft.white().bold()
        );
    }
    Ok(())
}

pub fn publish(session: Session, key: &str) -> CommandResult {
    let existing = session.catalog.collection(key)?;
    session.authorize_publish(&existing.document.organization)?;

    session.catalog.publish_collection(key)?;
    session.save()?;

    println!("{} Collection {}", "Published".green().bold(), key.white().bold());
    Ok(())
}

pub fn retract(session: Session, key: &str, message: &str) -> CommandResult {
    let existing = session.catalog.collection(key)?;
    session.authorize_publish(&existing.document.organization)?;

    session.catalog.retract_collection(key, message)?;
    session.save()?;

    println!("{} Collection {}", "Retracted".yellow().bold(), key.white().bold());
    Ok(())
}

pub fn delete(session: Session, key: &str) -> CommandResult {
    let existing = session.catalog.collection(key)?;
    session.authorize(&existing.document.organization)?;

    session.catalog.delete_collection(key)?;
    session.save()?;

    println!("{} draft Collection {}", "Deleted".red().bold(), key.white().bold());
    Ok(())
}

pub fn show(session: Session, key: &str, json_output: bool) -> CommandResult {
    let collection = session.catalog.collection(key)?;
    let members = session.catalog.members_of(key)?;

    if json_output {
        let output = serde_json::json!({
            "collection": collection,
            "members": members,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let info = collection.version_info();
    println!(
        "{} {} {}",
        "Collection".cyan().bold(),
        collection.key.white().bold(),
        collection.document.name.white()
    );
    println!("  Version:  {} ({})", info.version, status_label(info.status));
    println!("  Owner:    {}", collection.document.organization);
    if !collection.document.description.is_empty() {
        println!("  About:    {}", collection.document.description);
    }
    if let Some(reference) = &collection.document.published_in {
        println!("  Source:   Reference {}", reference);
    }
    if let Some(reason) = &info.retract_message {
        println!("  {} {}", "Retracted:".red(), reason);
    }
    println!();

    println!("{}", "Members:".yellow().bold());
    for record in &members {
        let info = record.version_info();
        println!(
            "  {:>8}  v{:<4} {}",
            record.key.white().bold(),
            info.version,
            status_label(info.status)
        );
    }
    Ok(())
}

pub fn history(session: Session, key: &str, json_output: bool) -> CommandResult {
    let history = session.catalog.history_of_collection(key)?;
    if json_output {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    println!("{} {}", "History of Collection".cyan().bold(), key.white());
    println!();
    if history.is_empty() {
        println!("  {}", "No public versions".dimmed());
    }
    for entry in &history {
        super::print_history_entry(entry);
    }
    Ok(())
}

pub fn list(session: Session, status: Option<StatusChoice>) -> CommandResult {
    let collections = session.catalog.list_collections(status.map(Status::from))?;
    for collection in &collections {
        let info = collection.version_info();
        println!(
            "{:>8}  v{:<4} {:<10} {} ({} members)",
            collection.key.white().bold(),
            info.version,
            status_label(info.status),
            collection.document.name,
            collection.members.len()
        );
    }
    if collections.is_empty() {
        println!("{}", "No collections".dimmed());
    }
    Ok(())
}
