//! filestore CLI
//!
//! Command-line interface for inspecting and editing a file-per-key store.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use filestore_core::{Config, ConfigUpdate, FileStore};

mod commands;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "filestore")]
#[command(about = "filestore - one file per key storage")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long = "config", global = true)]
    config_file: Option<PathBuf>,

    /// Override the storage directory
    #[arg(long, global = true)]
    storage_path: Option<PathBuf>,

    /// Log store operations to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a value under a key
    Set {
        /// Key to store under
        key: String,
        /// Value to store
        value: String,
    },
    /// Print the value stored under a key
    Get {
        /// Key to read
        key: String,
    },
    /// Remove a key
    #[command(alias = "rm")]
    Remove {
        /// Key to remove
        key: String,
    },
    /// List all keys
    #[command(alias = "ls")]
    Keys,
    /// Remove every key
    Clear,
    /// Show storage location and state
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (storage_path, encoding, timeout_ms)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands work on the file, not the store
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), cli.config_file.as_ref(), &output);
    }

    let mut config = Config::load_with_cli_override(cli.config_file.as_ref())
        .context("Failed to load configuration")?;
    if let Some(path) = cli.storage_path {
        config.apply(ConfigUpdate::new().storage_path(path));
    }
    debug!("Using storage root {:?}", config.storage_path);
    let store = FileStore::new(config);

    match cli.command {
        Commands::Set { key, value } => commands::item::set(&store, key, value, &output).await,
        Commands::Get { key } => commands::item::get(&store, key, &output).await,
        Commands::Remove { key } => commands::item::remove(&store, key, &output).await,
        Commands::Keys => commands::item::keys(&store, &output).await,
        Commands::Clear => commands::item::clear(&store, &output).await,
        Commands::Status => commands::status::show(&store, &output).await,
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Initialize logging to stderr
///
/// `RUST_LOG` wins when set; otherwise `--verbose` turns on debug output
/// for the store and warnings are shown by default.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("filestore_core={},filestore_cli={}", level, level))
    });

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
