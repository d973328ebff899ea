//! Catalog CLI - versioned measurement records and collections.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, CollectionCommand, Commands, OrgCommand, RecordCommand};
use commands::Session;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = Session::open(&cli).and_then(|session| run(session, cli.command));

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "catalog=info",
        _ => "catalog=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(session: Session, command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Org { command } => match command {
            OrgCommand::Create { name } => commands::org::create(session, &name),
            OrgCommand::AddMember { email, organization } => {
                commands::org::add_member(session, &email, &organization)
            }
            OrgCommand::Check {
                kind,
                key,
                email,
            } => commands::org::check(session, kind, &key, &email),
        },

        Commands::Record { command } => match command {
            RecordCommand::Create {
                file,
                organization,
                table,
                publish,
                message,
            } => commands::record::create(session, file, &organization, table, publish, &message),
            RecordCommand::Update {
                key,
                file,
                table,
                rev,
                message,
            } => commands::record::update(session, &key, file, table, rev, &message),
            RecordCommand::Publish { key } => commands::record::publish(session, &key),
            RecordCommand::Retract { key, message } => {
                commands::record::retract(session, &key, &message)
            }
            RecordCommand::Delete { key } => commands::record::delete(session, &key),
            RecordCommand::Show { key } => commands::record::show(session, &key),
            RecordCommand::History { key, json } => commands::record::history(session, &key, json),
            RecordCommand::List { status } => commands::record::list(session, status),
        },

        Commands::Collection { command } => match command {
            CollectionCommand::Create {
                file,
                organization,
                publish,
                message,
            } => commands::collection::create(session, file, &organization, publish, &message),
            CollectionCommand::Update {
                key,
                file,
                rev,
                message,
            } => commands::collection::update(session, &key, file, rev, &message),
            CollectionCommand::Publish { key } => commands::collection::publish(session, &key),
            CollectionCommand::Retract { key, message } => {
                commands::collection::retract(session, &key, &message)
            }
            CollectionCommand::Delete { key } => commands::collection::delete(session, &key),
            CollectionCommand::Show { key, json } => commands::collection::show(session, &key, json),
            CollectionCommand::History { key, json } => {
                commands::collection::history(session, &key, json)
            }
            CollectionCommand::List { status } => commands::collection::list(session, status),
        },

        Commands::Status { json } => commands::status::run(session, json),
    }
}
