//! Status command - show store contents.

use colored::Colorize;
use catalog::Status;
use catalog::store::{DocKind, EdgeKind};

use super::{status_label, CommandResult, Session};

pub fn run(session: Session, json_output: bool) -> CommandResult {
    let store = session.catalog.store();
    let stats = store.stats()?;
    let records = session.catalog.list_records(None)?;
    let collections = session.catalog.list_collections(None)?;

    let count = |status: Status, of: &[Status]| of.iter().filter(|s| **s == status).count();
    let record_statuses: Vec<Status> = records.iter().map(|r| r.version_info().status).collect();
    let collection_statuses: Vec<Status> =
        collections.iter().map(|c| c.version_info().status).collect();

    if json_output {
        let by_status = |of: &[Status]| {
            serde_json::json!({
                "draft": count(Status::Draft, of),
                "published": count(Status::Published, of),
                "archived": count(Status::Archived, of),
                "retracted": count(Status::Retracted, of),
            })
        };
        let status = serde_json::json!({
            "documents": stats.documents,
            "edges": stats.edges,
            "records": by_status(&record_statuses[..]),
            "collections": by_status(&collection_statuses[..]),
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", "Catalog status".cyan().bold());
    println!();

    for (title, of) in [("Records:", &record_statuses[..]), ("Collections:", &collection_statuses[..])] {
        println!("{}", title.yellow().bold());
        for status in [Status::Draft, Status::Published, Status::Archived, Status::Retracted] {
            println!("  {:<10} {}", status_label(status), count(status, of));
        }
        println!();
    }

    println!("{}", "Sub-entities:".yellow().bold());
    for kind in [DocKind::State, DocKind::Reaction, DocKind::Reference, DocKind::Organization] {
        println!("  {:<13} {}", kind.as_str(), stats.documents_of(kind));
    }
    println!();

    println!("{}", "Edges:".yellow().bold());
    for kind in EdgeKind::all() {
        let n = stats.edges_of(kind);
        if n > 0 {
            println!("  {:<22} {}", kind.as_str(), n);
        }
    }
    Ok(())
}
