//! Backup Sweeper
//!
//! Runs one retention cleanup pass over the backup archives of a bucket.

use anyhow::{Context, Result};
use clap::Parser;
use common::cli::{CommonArgs, Commands, utils};
use common::config::Configuration;
use common::storage::create_object_store;
use std::sync::Arc;
use sweeper::{BackupCleaner, CleanupOutcome, CleanupSettings, ObjectStoreBackend};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    utils::init_logging(&args.common);

    let config = utils::load_config(args.common.config.as_ref())?;

    match args.command.unwrap_or_default() {
        Commands::Config { json } => utils::display_config(&config, json),
        Commands::Validate => utils::validate_config(&config),
        Commands::Version => {
            println!("{}", version_line());
            Ok(())
        }
        Commands::Run { dry_run } => run_cleanup(config, dry_run).await,
    }
}

fn version_line() -> String {
    utils::version_info(
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_RUST_VERSION"),
    )
}

/// Run one cleanup pass. Only startup failures are returned as errors.
async fn run_cleanup(config: Configuration, dry_run: bool) -> Result<()> {
    utils::validate_config(&config)?;

    let object_store =
        create_object_store(&config.storage).context("Failed to initialize object store")?;
    let store = Arc::new(ObjectStoreBackend::new(object_store));

    let mut settings = CleanupSettings::from_config(&config);
    if dry_run {
        settings.dry_run = true;
    }

    tracing::info!(
        bucket = %config.storage.bucket,
        prefix = %settings.search_prefix(),
        policy = %settings.policy,
        dry_run = settings.dry_run,
        "Starting backup sweeper"
    );

    let cleaner = BackupCleaner::new(store, settings);
    match cleaner.run().await {
        CleanupOutcome::Skipped(reason) => tracing::info!(reason = %reason, "Nothing cleaned up"),
        CleanupOutcome::Completed(report) if !report.failed.is_empty() => {
            tracing::warn!(
                failed = report.failed.len(),
                "Some backups could not be deleted and will be retried on the next run"
            );
        }
        CleanupOutcome::Completed(_) => {}
        CleanupOutcome::Aborted(_) => {
            tracing::warn!("Backup cleanup aborted, backups are unchanged");
        }
    }

    cleaner.metrics().summary().log();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_names_the_binary() {
        let version = version_line();
        assert!(version.starts_with("backup-sweeper "));
        assert!(version.contains(env!("CARGO_PKG_VERSION")));
    }
}
