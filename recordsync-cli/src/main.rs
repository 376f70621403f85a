use anyhow::{Context, Result};
use clap::Parser;
use recordsync_core::config::Config;
use recordsync_core::core_doc::{Document, DocumentHandle, MemoryDocument, Patch};
use recordsync_core::core_records::{ChangeSet, MemoryRecordStore, StoreSnapshot};
use recordsync_core::core_sync::{interpret, DiffEncoder, EncodeStats, SyncCoordinator, SyncError};
use recordsync_core::logging::{init_logging_with_config, LogLevel};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "recordsync")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Set the log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable JSON formatted logging
    #[arg(long)]
    json_logs: bool,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser, Debug)]
enum Command {
    /// Translate a patch batch into store upserts and deletions
    Interpret {
        /// Store snapshot JSON ({"store": {...}, "schema": ...})
        #[arg(long)]
        store: PathBuf,
        /// Patch batch JSON (array of patches)
        #[arg(long)]
        patches: PathBuf,
    },
    /// Apply a store change set to a document and print the resulting patches
    Encode {
        /// Document JSON ({"store": {...}, "schema": ...})
        #[arg(long)]
        document: PathBuf,
        /// Change set JSON ({"added": ..., "updated": ..., "removed": ...})
        #[arg(long)]
        changes: PathBuf,
    },
    /// Load a document into an empty record store and print the store
    Load {
        #[arg(long)]
        document: PathBuf,
    },
    /// Print the effective configuration
    Config,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&contents)
        .map_err(SyncError::from)
        .with_context(|| format!("parsing {}", path.display()))
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            let mut config = Config::from_file(path)?;
            config.apply_env()?;
            config
        }
        None => Config::from_env()?,
    };

    if let Some(level) = &args.log_level {
        if LogLevel::parse(level).is_none() {
            eprintln!("Invalid log level '{}', using '{}'", level, config.logging.level);
        } else {
            config.logging.level = level.clone();
        }
    }
    if args.json_logs {
        config.logging.json_format = true;
    }

    config.validate()?;
    Ok(config)
}

fn run_interpret(store: &Path, patches: &Path) -> Result<serde_json::Value> {
    let snapshot: StoreSnapshot = read_json(store)?;
    let patches: Vec<Patch> = read_json(patches)?;

    let update = interpret(&patches, &snapshot.store)?;
    Ok(json!({
        "upserts": update.upserts,
        "deletions": update.deletions,
    }))
}

fn run_encode(config: &Config, document: &Path, changes: &Path) -> Result<serde_json::Value> {
    let document: Document = read_json(document)?;
    let changes: ChangeSet = read_json(changes)?;

    let doc = MemoryDocument::ready(document);
    let encoder = DiffEncoder::new(config.records.locked_field.as_str());
    let mut stats = EncodeStats::default();
    let patches = doc.change(&mut |d: &mut Document| {
        stats = encoder.encode(d, &changes);
    });
    debug!(?stats, patches = patches.len(), "encoded change set");

    Ok(json!({
        "document": doc.current_value(),
        "patches": patches,
    }))
}

async fn run_load(config: &Config, document: &Path) -> Result<serde_json::Value> {
    let document: Document = read_json(document)?;

    let doc = Arc::new(MemoryDocument::ready(document));
    let store = Arc::new(MemoryRecordStore::new());
    let coordinator = SyncCoordinator::with_config(doc, store.clone(), &config.records);
    let session = coordinator.start().await?;
    let status = session.status();
    session.shutdown();

    Ok(json!({
        "status": status,
        "snapshot": store.snapshot(),
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    init_logging_with_config(config.logging.to_log_config()?)?;
    debug!(config = ?config, "configuration loaded");

    let output = match &args.command {
        Command::Interpret { store, patches } => run_interpret(store, patches)?,
        Command::Encode { document, changes } => run_encode(&config, document, changes)?,
        Command::Load { document } => run_load(&config, document).await?,
        Command::Config => {
            print!("{}", config.to_toml()?);
            return Ok(());
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    info!("recordsync finished");
    Ok(())
}
