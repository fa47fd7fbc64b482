use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Common CLI arguments
#[derive(Parser, Debug, Clone)]
pub struct CommonArgs {
    #[arg(long, help = "Configuration file path")]
    pub config: Option<PathBuf>,

    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, help = "Enable quiet mode (minimal output)")]
    pub quiet: bool,
}

/// Subcommands of the sweeper binary
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run one cleanup pass (default behavior)
    Run {
        #[arg(long, help = "Log deletion decisions without deleting")]
        dry_run: bool,
    },
    /// Show current configuration and exit
    Config {
        #[arg(long, help = "Show configuration in JSON format")]
        json: bool,
    },
    /// Validate configuration and exit
    Validate,
    /// Show version information and exit
    Version,
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Run { dry_run: false }
    }
}

/// Utility functions for CLI operations
pub mod utils {
    use super::*;
    use crate::config::Configuration;
    use anyhow::{Context, Result};
    use tracing_subscriber::EnvFilter;

    /// Initialize logging based on CLI arguments.
    ///
    /// `RUST_LOG` wins over the verbosity flags when set.
    pub fn init_logging(args: &CommonArgs) {
        let level = if args.quiet {
            "warn"
        } else if args.verbose {
            "debug"
        } else {
            "info"
        };

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    }

    /// Load configuration with optional override from CLI
    pub fn load_config(config_path: Option<&PathBuf>) -> Result<Configuration> {
        match config_path {
            Some(path) => {
                tracing::info!("Loading configuration from: {}", path.display());
                Configuration::load_from_path(path).context("Failed to load configuration")
            }
            None => Configuration::load().context("Failed to load configuration"),
        }
    }

    /// Display configuration in human-readable or JSON format
    pub fn display_config(config: &Configuration, json: bool) -> Result<()> {
        if json {
            let json = serde_json::to_string_pretty(config)
                .context("Failed to serialize configuration to JSON")?;
            println!("{json}");
        } else {
            println!("Backup Sweeper Configuration:");
            println!("=============================");
            println!("Bucket: {}", config.storage.bucket);
            println!("Region: {}", config.storage.region);
            match &config.storage.endpoint {
                Some(endpoint) => println!("Endpoint: {endpoint}"),
                None => println!("Endpoint: default"),
            }
            println!("Path-style addressing: {}", config.storage.force_path_style);

            println!("Backup prefix: {}", config.backup.prefix);
            match &config.backup.subfolder {
                Some(subfolder) => println!("Subfolder: {subfolder}"),
                None => println!("Subfolder: none"),
            }

            if config.retention.is_enabled() {
                match config.retention.max_count {
                    Some(count) => println!("Max count: {count}"),
                    None => println!("Max count: unlimited"),
                }
                match config.retention.max_age_days {
                    Some(days) => println!("Max age: {days} days"),
                    None => println!("Max age: unlimited"),
                }
            } else {
                println!("Retention: disabled");
            }
            println!("Dry run: {}", config.retention.dry_run);
        }
        Ok(())
    }

    /// Validate configuration and report any issues
    pub fn validate_config(config: &Configuration) -> Result<()> {
        tracing::info!("Validating configuration...");
        config.validate().context("Invalid configuration")?;
        tracing::info!("Configuration validation passed");
        Ok(())
    }

    /// Standard version line for a binary, e.g. `backup-sweeper 0.1.0 (1.88.0)`.
    ///
    /// Callers pass their own `CARGO_PKG_*` values.
    pub fn version_info(name: &str, version: &str, rust_version: &str) -> String {
        format!("{name} {version} ({rust_version})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;

    #[test]
    fn test_default_command_is_run() {
        assert!(matches!(
            Commands::default(),
            Commands::Run { dry_run: false }
        ));
    }

    #[test]
    fn test_version_info() {
        assert_eq!(
            utils::version_info("backup-sweeper", "0.1.0", "1.88.0"),
            "backup-sweeper 0.1.0 (1.88.0)"
        );
    }

    #[test]
    fn test_validate_config_reports_missing_bucket() {
        let err = utils::validate_config(&Configuration::default()).unwrap_err();
        assert!(format!("{err:#}").contains("storage.bucket must be set"));
    }
}
