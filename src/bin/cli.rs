//! parkres CLI
//!
//! Command-line interface for driving the engine against a snapshot file.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use parkres::mutation::FieldChange;
use parkres::{
    Cursor, Engine, EngineConfig, Item, Key, LogicalCommand, MemoryStore, MutationConfig,
    QueryOptions, QueryRequest, Result, Value,
};

/// parkres CLI
#[derive(Parser, Debug)]
#[command(name = "parkres-cli")]
#[command(about = "CLI for the parkres mutation and transaction engine")]
#[command(version)]
struct Args {
    /// Snapshot file holding the store contents
    #[arg(short, long, default_value = "./parkres.snap")]
    snapshot: PathBuf,

    /// Table to operate on
    #[arg(short, long, default_value = "reservations")]
    table: String,

    /// Max items per query page
    #[arg(long, default_value = "100")]
    page_size: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get an item by key
    Get { pk: String, sk: String },

    /// Create an item (field=value, field+=value appends)
    Put {
        pk: String,
        sk: String,
        fields: Vec<String>,

        /// Replace an existing item
        #[arg(long)]
        overwrite: bool,
    },

    /// Update fields of an existing item (field=null removes)
    Update {
        pk: String,
        sk: String,
        fields: Vec<String>,

        /// Version observed when the item was read
        #[arg(long)]
        expected_version: Option<u64>,

        /// Reject the update if the observed version is stale
        #[arg(long)]
        serial: bool,
    },

    /// Delete an item
    Delete {
        pk: String,
        sk: String,

        #[arg(long)]
        expected_version: Option<u64>,
    },

    /// Query a partition
    Query {
        pk: String,

        /// Sort key prefix
        #[arg(long)]
        prefix: Option<String>,

        /// Items per page
        #[arg(long)]
        limit: Option<usize>,

        /// Return one page and print the continuation cursor
        #[arg(long)]
        paginated: bool,

        /// Continue from a cursor
        #[arg(long)]
        cursor: Option<String>,

        #[arg(long)]
        descending: bool,
    },

    /// Allocate the next identifier for a partition
    NextId {
        pk: String,

        /// Sort key of the counter item
        #[arg(long, default_value = "counter")]
        counter_key: String,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,parkres=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    tracing::debug!("parkres CLI v{}", parkres::VERSION);
    tracing::debug!("Snapshot: {}", args.snapshot.display());

    if let Err(e) = run(args) {
        tracing::error!(kind = %e.kind(), "{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let store = Arc::new(MemoryStore::open(&args.snapshot)?.with_page_size(args.page_size));
    let engine = Engine::new(store.clone(), EngineConfig::default())?;
    let table = args.table.as_str();

    let mutated = match args.command {
        Commands::Get { pk, sk } => {
            match engine.get(table, &Key::new(pk, sk))? {
                Some(item) => print_item(&item),
                None => println!("(not found)"),
            }
            false
        }
        Commands::Put {
            pk,
            sk,
            fields,
            overwrite,
        } => {
            let command = parse_command(Key::new(pk, sk), &fields)?;
            let config = cli_config().allow_overwrite(overwrite).build();
            let batch = engine.create(table, vec![command], &config)?;
            let versions = batch.versions();
            let report = engine.commit(batch)?;
            println!("committed {} item(s) {:?}", report.committed, versions);
            true
        }
        Commands::Update {
            pk,
            sk,
            fields,
            expected_version,
            serial,
        } => {
            let mut command = parse_command(Key::new(pk, sk), &fields)?;
            command.expected_version = expected_version;
            let config = cli_config().enforce_serial_updates(serial).build();
            let batch = engine.update(table, vec![command], &config)?;
            let versions = batch.versions();
            let report = engine.commit(batch)?;
            println!("committed {} item(s) {:?}", report.committed, versions);
            true
        }
        Commands::Delete {
            pk,
            sk,
            expected_version,
        } => {
            let mut command = LogicalCommand::new(Key::new(pk, sk));
            command.expected_version = expected_version;
            let batch = engine.delete(table, vec![command], &cli_config().build())?;
            let report = engine.commit(batch)?;
            println!("deleted {} item(s)", report.committed);
            true
        }
        Commands::Query {
            pk,
            prefix,
            limit,
            paginated,
            cursor,
            descending,
        } => {
            let mut request = QueryRequest::partition(pk);
            if let Some(prefix) = prefix {
                request = request.prefix(prefix);
            }
            if let Some(limit) = limit {
                request = request.limit(limit);
            }
            if descending {
                request = request.descending();
            }
            let cursor = cursor.as_deref().map(Cursor::decode).transpose()?;
            let options = QueryOptions { cursor, paginated };

            let result = engine.query(table, request, options)?;
            for item in &result.items {
                print_item(item);
            }
            println!("{} item(s) in {} page(s)", result.items.len(), result.pages);
            if let Some(next) = result.last_evaluated_key {
                println!("next cursor: {}", next.encode()?);
            }
            false
        }
        Commands::NextId { pk, counter_key } => {
            let id = engine.next_identifier(table, &pk, &counter_key)?;
            println!("{}", id);
            true
        }
    };

    if mutated {
        store.save(&args.snapshot)?;
    }
    Ok(())
}

/// Mutation rules for ad-hoc CLI writes
fn cli_config() -> parkres::mutation::MutationConfigBuilder {
    MutationConfig::builder().allow_undeclared_fields(true)
}

/// Parse `field=value` / `field+=value` arguments
fn parse_command(key: Key, fields: &[String]) -> Result<LogicalCommand> {
    let mut command = LogicalCommand::new(key);
    for raw in fields {
        if let Some((field, value)) = raw.split_once("+=") {
            command
                .data
                .insert(field.to_string(), FieldChange::Add(Value::parse_literal(value)));
        } else if let Some((field, value)) = raw.split_once('=') {
            command
                .data
                .insert(field.to_string(), FieldChange::Set(Value::parse_literal(value)));
        } else {
            return Err(parkres::ParkError::InvalidFieldValue {
                key: command.key.clone(),
                field: raw.clone(),
                message: "expected field=value or field+=value".to_string(),
            });
        }
    }
    Ok(command)
}

fn print_item(item: &Item) {
    println!("{}", item.key);
    for (field, value) in &item.attributes {
        println!("  {} = {}", field, value);
    }
}
