//! bmsync CLI
//!
//! Command-line interface for inspecting and editing the bmsync local store.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use bmsync_core::store::{RoutedStore, StoreKey, TraceLogLevel};
use bmsync_core::Config;

mod commands;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "bmsync")]
#[command(about = "bmsync - local bookmark store inspection")]
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
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read one or more keys
    Get {
        /// Keys to read (e.g. telemetryEnabled bookmarks)
        #[arg(required = true)]
        keys: Vec<StoreKey>,
    },
    /// Write a value
    Set {
        key: StoreKey,
        /// Value, parsed as JSON when possible, otherwise text
        value: String,
    },
    /// Remove one or more keys
    #[command(alias = "rm")]
    Remove {
        #[arg(required = true)]
        keys: Vec<StoreKey>,
    },
    /// List keys that hold data
    Keys,
    /// Clear all stored data
    Clear,
    /// Manage the trace log
    Log {
        #[command(subcommand)]
        command: LogCommands,
    },
    /// Show configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum LogCommands {
    /// Show all entries, oldest first
    Show,
    /// Append an entry
    Add {
        /// trace, warn or error
        level: TraceLogLevel,
        message: String,
    },
    /// Remove all entries
    Clear,
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    let config = Config::load_with_cli_override(cli.config.as_ref())
        .context("Failed to load configuration")?;
    init_logging(&config);

    if let Commands::Config { command } = &cli.command {
        return match command {
            Some(ConfigCommands::Show) | None => {
                commands::config::show(&config, cli.config.as_ref(), &output)
            }
        };
    }

    let store = Arc::new(RoutedStore::open(&config).context("Failed to open store")?);
    debug!("Opened store in {:?}", config.data_dir);

    match cli.command {
        Commands::Get { keys } => commands::store::get(&store, keys, &output).await,
        Commands::Set { key, value } => commands::store::set(&store, key, value, &output).await,
        Commands::Remove { keys } => commands::store::remove(&store, keys, &output).await,
        Commands::Keys => commands::store::keys(&store, &output).await,
        Commands::Clear => commands::store::clear(&store, &output).await,
        Commands::Log { command } => handle_log_command(command, store, &output).await,
        Commands::Config { .. } => Ok(()),
    }
}

async fn handle_log_command(
    command: LogCommands,
    store: Arc<RoutedStore>,
    output: &Output,
) -> Result<()> {
    match command {
        LogCommands::Show => commands::log::show(store, output).await,
        LogCommands::Add { level, message } => {
            commands::log::add(store, level, message, output).await
        }
        LogCommands::Clear => commands::log::clear(store, output).await,
    }
}

/// Initialize diagnostic logging
///
/// `RUST_LOG` wins over the configured level. Output goes to the configured
/// log file, or stderr when none is set.
fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "bmsync_core={},bmsync={}",
            config.log_level, config.log_level
        ))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    match &config.log_file {
        Some(path) => {
            let file = match OpenOptions::new().create(true).append(true).open(path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Warning: Could not open log file {:?}: {}", path, e);
                    return;
                }
            };
            let _ = builder
                .with_ansi(false)
                .with_writer(Arc::new(file))
                .try_init();
        }
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
}
