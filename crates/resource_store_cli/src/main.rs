//! Resource store command-line adapter.
//!
//! # Responsibility
//! - Resolve store configuration from flags and environment.
//! - Map each subcommand onto one store or query operation.
//! - Print exactly one `{data, error}` envelope line per invocation.
//!
//! # Invariants
//! - Store failures are reported through the envelope and a non-zero exit
//!   code, never as a panic.

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::info;
use resource_store_core::envelope::parse_resource_id;
use resource_store_core::{
    categories, core_version, default_log_level, init_logging, parse_draft, ping, CategoryId,
    Envelope, Operation, QueryService, ResourceId, ResourceService, SqliteResourceRepository,
    StoreResult, StoreTarget, STATUS_OK,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "resource-store")]
#[command(about = "Resource store with attachment tracking", version)]
struct Cli {
    /// SQLite database file; an in-memory store is used when absent
    #[arg(long, env = "RESOURCE_STORE_DB")]
    db: Option<PathBuf>,

    /// Log level (trace|debug|info|warn|error)
    #[arg(long, env = "RESOURCE_STORE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Absolute directory for rolling log files; logging is off when absent
    #[arg(long, env = "RESOURCE_STORE_LOG_DIR")]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Liveness probe
    Ping,
    /// Print the core version
    Version,
    /// List the category catalog
    Categories,
    /// Show one catalog entry, by numeric id or exact name
    Category { key: String },
    /// Add a resource from a JSON payload
    Add { payload: String },
    /// Merge a JSON payload into an existing resource
    Update { payload: String },
    /// Fetch one resource
    Get { id: String },
    /// Fetch several resources, all or nothing
    GetMany {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// List resources in one category
    ByCategory { category: i64 },
    /// Delete one resource
    Delete {
        id: String,
        /// Also remove the record derived from its attachment
        #[arg(long)]
        with_attachment: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        let target = cli
            .db
            .as_deref()
            .map_or(StoreTarget::Memory, StoreTarget::File);
        init_logging(level, log_dir, target).context("failed to start logging")?;
    }

    let envelope = run(&cli)?;
    println!("{}", envelope.to_json());

    if !envelope.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

fn run(cli: &Cli) -> anyhow::Result<Envelope> {
    let db = cli.db.as_ref();
    let envelope = match &cli.command {
        Command::Ping => Envelope::success(&ping()),
        Command::Version => Envelope::success(&core_version()),
        Command::Categories => Envelope::success(&categories()),
        Command::Category { key } => with_store(db, |_, query| {
            let result = match key.trim().parse::<i64>() {
                Ok(id) => query.category(CategoryId(id)),
                Err(_) => query.category_named(key.trim()),
            };
            Envelope::from_result(Operation::GetCategory, &result)
        })?,
        Command::Add { payload } => with_store(db, |store, _| {
            let result = parse_draft(payload).and_then(|draft| store.add_resource(&draft));
            Envelope::from_result(Operation::AddResource, &result)
        })?,
        Command::Update { payload } => with_store(db, |store, _| {
            let result = parse_draft(payload).and_then(|draft| store.update_resource(&draft));
            Envelope::from_result(Operation::UpdateResource, &result)
        })?,
        Command::Get { id } => with_store(db, |_, query| {
            let result = parse_resource_id(id).and_then(|id| query.get_resource(id));
            Envelope::from_result(Operation::GetResourceById, &result)
        })?,
        Command::GetMany { ids } => with_store(db, |_, query| {
            let result = parse_ids(ids).and_then(|ids| query.get_resources(&ids));
            Envelope::from_result(Operation::GetResourcesByIds, &result)
        })?,
        Command::ByCategory { category } => with_store(db, |_, query| {
            Envelope::from_result(
                Operation::GetResourcesByCategory,
                &query.get_resources_by_category(CategoryId(*category)),
            )
        })?,
        Command::Delete {
            id,
            with_attachment,
        } => with_store(db, |store, _| {
            let result = parse_resource_id(id).and_then(|id| {
                if *with_attachment {
                    store.delete_resource_with_attachment(id).map(|_| ())
                } else {
                    store.delete_resource(id)
                }
            });
            Envelope::from_result(Operation::DeleteResource, &result.map(|()| STATUS_OK))
        })?,
    };

    Ok(envelope)
}

type Store<'a> = ResourceService<&'a SqliteResourceRepository>;
type Query<'a> = QueryService<&'a SqliteResourceRepository>;

fn with_store<F>(db: Option<&PathBuf>, action: F) -> anyhow::Result<Envelope>
where
    F: for<'a> FnOnce(&Store<'a>, &Query<'a>) -> Envelope,
{
    let repo = open_repository(db)?;
    let store = ResourceService::new(&repo);
    let query = QueryService::new(&repo);
    Ok(action(&store, &query))
}

fn open_repository(db: Option<&PathBuf>) -> anyhow::Result<SqliteResourceRepository> {
    let repo = match db {
        Some(path) => SqliteResourceRepository::open(path)
            .with_context(|| format!("failed to open resource store at {}", path.display()))?,
        None => SqliteResourceRepository::open_in_memory()
            .context("failed to open in-memory resource store")?,
    };
    info!(
        "event=cli_open module=cli status=ok db={}",
        db.map_or_else(|| ":memory:".to_string(), |path| path.display().to_string())
    );
    Ok(repo)
}

fn parse_ids(values: &[String]) -> StoreResult<Vec<ResourceId>> {
    values.iter().map(|value| parse_resource_id(value)).collect()
}
