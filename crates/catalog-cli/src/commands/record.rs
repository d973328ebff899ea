//! Record commands - create, edit, publish and inspect single records.

use std::path::PathBuf;

use colored::Colorize;
use catalog::Status;
use catalog::model::{DataTable, RecordInput};

use super::{read_json, CommandResult, Session};
use crate::cli::StatusChoice;

fn read_input(file: PathBuf, table: Option<PathBuf>) -> Result<RecordInput, Box<dyn std::error::Error>> {
    let mut input: RecordInput = read_json(&file)?;
    if let Some(path) = table {
        input.content.data = DataTable::from_path(&path)?;
    }
    Ok(input)
}

pub fn create(
    session: Session,
    file: PathBuf,
    organization: &str,
    table: Option<PathBuf>,
    publish: bool,
    message: &str,
) -> CommandResult {
    let input = read_input(file, table)?;
    let status = if publish {
        session.authorize_publish(organization)?;
        Status::Published
    } else {
        session.authorize(organization)?;
        Status::Draft
    };

    let key = session
        .catalog
        .create_record(&input, organization, status, message)?;
    session.save()?;

    println!("{} Record {} ({})", "Created".green().bold(), key.white().bold(), status);
    Ok(())
}

pub fn update(
    session: Session,
    key: &str,
    file: PathBuf,
    table: Option<PathBuf>,
    rev: Option<u64>,
    message: &str,
) -> CommandResult {
    let input = read_input(file, table)?;
    let existing = session.catalog.record(key)?;
    session.authorize(&existing.document.organization)?;

    let draft = match rev {
        Some(rev) => session.catalog.update_record_at(key, rev, &input, message)?,
        None => session.catalog.update_record(key, &input, message)?,
    };
    session.save()?;

    if draft == key {
        println!("{} draft Record {}", "Edited".green().bold(), draft.white().bold());
    } else {
        println!(
            "{} Record {} into draft {}",
            "Forked".green().bold(),
            key,
            draft.white().bold()
        );
    }
    Ok(())
}

pub fn publish(session: Session, key: &str) -> CommandResult {
    let existing = session.catalog.record(key)?;
    session.authorize_publish(&existing.document.organization)?;

    session.catalog.publish_record(key)?;
    session.save()?;

    println!("{} Record {}", "Published".green().bold(), key.white().bold());
    Ok(())
}

pub fn retract(session: Session, key: &str, message: &str) -> CommandResult {
    let existing = session.catalog.record(key)?;
    session.authorize_publish(&existing.document.organization)?;

    session.catalog.retract_record(key, message)?;
    session.save()?;

    println!("{} Record {}", "Retracted".yellow().bold(), key.white().bold());
    Ok(())
}

pub fn delete(session: Session, key: &str) -> CommandResult {
    let existing = session.catalog.record(key)?;
    session.authorize(&existing.document.organization)?;

    session.catalog.delete_draft_record(key)?;
    session.save()?;

    println!("{} draft Record {}", "Deleted".red().bold(), key.white().bold());
    Ok(())
}

pub fn show(session: Session, key: &str) -> CommandResult {
    let record = session.catalog.record(key)?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

pub fn history(session: Session, key: &str, json_output: bool) -> CommandResult {
    let history = session.catalog.history_of_record(key)?;
    if json_output {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    println!("{} {}", "History of Record".cyan().bold(), key.white());
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
    let records = session.catalog.list_records(status.map(Status::from))?;
    for record in &records {
        let info = record.version_info();
        println!(
            "{:>8}  v{:<4} {:<10} {}",
            record.key.white().bold(),
            info.version,
            super::status_label(info.status),
            record.document.organization.dimmed()
        );
    }
    if records.is_empty() {
        println!("{}", "No records".dimmed());
    }
    Ok(())
}
