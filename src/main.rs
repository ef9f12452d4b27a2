use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pathlab_core::constants::{DEFAULT_DATABASE_NAME, DEFAULT_DATA_DIR};
use pathlab_core::{CoreConfig, NoShareTarget, RecordStore, ShareTarget};

mod cli;
mod commands;
mod share;

use cli::Cli;
use commands::App;
use share::CommandShareTarget;

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var_os(name)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Main entry point for the pathlab CLI
///
/// Resolves configuration once (command-line flags first, then the environment, then
/// defaults), opens the local database and runs a single command against it.
///
/// # Environment Variables
/// - `PATHLAB_DATA_DIR`: Directory holding the database (default: "pathlab_data")
/// - `PATHLAB_DB_NAME`: Database name (default: "PathoReportDB")
/// - `PATHLAB_EXPORT_DIR`: Where backups and reports are downloaded (default: ".")
/// - `PATHLAB_SEED_TAXONOMY`: Default taxonomy JSON loaded while the taxonomy is empty
/// - `PATHLAB_SHARE_COMMAND`: Command used to share files; without it files are downloaded
fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pathlab=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("Use 'pathlab --help' for commands");
        return Ok(());
    };

    let data_dir = cli
        .data_dir
        .or_else(|| env_path("PATHLAB_DATA_DIR"))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
    let database_name = cli
        .db_name
        .or_else(|| env_string("PATHLAB_DB_NAME"))
        .unwrap_or_else(|| DEFAULT_DATABASE_NAME.to_string());
    let export_dir = cli
        .export_dir
        .or_else(|| env_path("PATHLAB_EXPORT_DIR"))
        .unwrap_or_else(|| PathBuf::from("."));
    let seed_taxonomy = cli
        .seed_taxonomy
        .or_else(|| env_path("PATHLAB_SEED_TAXONOMY"));
    let share_command = cli
        .share_command
        .or_else(|| env_string("PATHLAB_SHARE_COMMAND"));

    let cfg = Arc::new(CoreConfig::new(
        data_dir,
        database_name,
        export_dir,
        seed_taxonomy,
    )?);

    let mut store = RecordStore::open(&cfg)
        .with_context(|| format!("failed to open database at {}", cfg.database_dir().display()))?;

    if let Some(seed) = cfg.seed_taxonomy() {
        if let Err(e) = store.seed_taxonomy_if_empty(seed) {
            tracing::warn!("could not seed taxonomy from {}: {e}", seed.display());
        }
    }

    let share_target: Box<dyn ShareTarget> = match share_command
        .as_deref()
        .and_then(|c| CommandShareTarget::new(c, std::env::temp_dir().join("pathlab-share")))
    {
        Some(target) => Box::new(target),
        None => Box::new(NoShareTarget),
    };

    let mut app = App {
        cfg,
        store,
        share_target,
    };
    commands::run(&mut app, command)
}
