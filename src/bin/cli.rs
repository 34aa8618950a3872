//! KVL CLI
//!
//! Command-line interface for inspecting and editing a KVL store directory.
//! Keys and values are taken as UTF-8 strings.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use kvl::wal::WalRecovery;
use kvl::{Config, KeyValueStore, Schema, Utf8Serializer};
use tracing_subscriber::{fmt, EnvFilter};

/// KVL CLI
#[derive(Parser, Debug)]
#[command(name = "kvl-cli")]
#[command(about = "CLI for the KVL typed key-value store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./kvl_data")]
    data_dir: PathBuf,

    /// Table name (names the files inside the data directory)
    #[arg(short, long, default_value = Schema::DEFAULT_TABLE)]
    table: String,

    /// Rows fetched per page while scanning
    #[arg(short, long, default_value_t = Config::DEFAULT_PAGE_SIZE)]
    page_size: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Insert a key only if it is absent
    Add { key: String, value: String },

    /// Insert or replace a key
    Upsert { key: String, value: String },

    /// Replace the value of an existing key
    Update { key: String, value: String },

    /// Delete a key
    Delete { key: String },

    /// Get a value by key
    Get { key: String },

    /// Print every entry in insertion order
    Scan,

    /// Print the number of entries
    Count,

    /// Write the table file and truncate the WAL
    Checkpoint,

    /// Check the WAL without opening (or repairing) the store
    VerifyWal,
}

fn main() -> ExitCode {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,kvl=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let data_dir = args.data_dir.clone();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_engine_failure() => {
            tracing::error!(error = %e, data_dir = %data_dir.display(), "storage engine failure");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> kvl::Result<()> {
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .schema(Schema::new(&args.table))
        .page_size(args.page_size)
        .build();

    if let Commands::VerifyWal = args.command {
        let wal_path = config.wal_path();
        if !wal_path.exists() {
            println!("no WAL at {}", wal_path.display());
            return Ok(());
        }
        let result = WalRecovery::verify(&wal_path)?;
        println!(
            "entries={} corrupted={} last_lsn={} torn_tail={}",
            result.entries_recovered, result.entries_corrupted, result.last_lsn, result.was_truncated
        );
        return Ok(());
    }

    let store: KeyValueStore<String, Utf8Serializer> = KeyValueStore::open_with(config, Utf8Serializer)?;

    match args.command {
        Commands::Add { key, value } => store.add(&key, &value)?,
        Commands::Upsert { key, value } => store.upsert(&key, &value)?,
        Commands::Update { key, value } => store.update(&key, &value)?,
        Commands::Delete { key } => store.delete(&key)?,
        Commands::Get { key } => match store.get(&key)? {
            Some(value) => println!("{}", value),
            None => println!("(nil)"),
        },
        Commands::Scan => {
            for entry in store.scan() {
                let (key, value) = entry?;
                println!("{}\t{}", String::from_utf8_lossy(&key), value);
            }
        }
        Commands::Count => println!("{}", store.len()?),
        Commands::Checkpoint => {
            let table_file = store.checkpoint()?;
            println!("{} rows, {} bytes", table_file.row_count, table_file.file_size);
        }
        // Answered above without opening the store
        Commands::VerifyWal => {}
    }

    store.close()
}
