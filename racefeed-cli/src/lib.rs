//! Command-line interface for racefeed.
//!
//! Every subcommand layers its options from CLI flags, `RACEFEED_*`
//! environment variables and configuration files before resolving them into
//! a validated config.
#![forbid(unsafe_code)]

mod commands;
mod config;
mod error;

use std::{io::Write, sync::Arc};

use camino::Utf8Path;
use clap::{Parser, Subcommand};
use log::debug;
use racefeed_core::SqliteResultStore;
use racefeed_data::{HttpResultsSource, Ingestor};
use tracing_subscriber::EnvFilter;

pub use error::CliError;

use config::{CheckArgs, HistoryArgs, LookupArgs, ResetArgs, SyncArgs, WatchArgs};

/// Install the global log subscriber.
///
/// `RUST_LOG` overrides the default `info` filter. Records emitted through the
/// `log` facade by the library crates are forwarded to the same output.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(err) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        eprintln!("racefeed: logging unavailable: {err}");
    }
}

/// Run the racefeed CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    execute(cli.command, &mut out)
}

fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)
}

fn open_store(path: &Utf8Path) -> Result<SqliteResultStore, CliError> {
    debug!("opening result database {path}");
    Ok(SqliteResultStore::open(path)?)
}

fn execute(command: Command, out: &mut impl Write) -> Result<(), CliError> {
    match command {
        Command::Sync(args) => {
            let config = args.into_config()?;
            let store = Arc::new(open_store(&config.database)?);
            runtime()?.block_on(async {
                let ingestor = Ingestor::from_config(Arc::new(config.remote), store)?;
                commands::sync(&ingestor, config.partial, out).await
            })
        }
        Command::Check(args) => {
            let remote = args.into_config()?;
            runtime()?.block_on(async {
                let source = HttpResultsSource::new(Arc::new(remote))?;
                commands::check(&source, out).await
            })
        }
        Command::Lookup(args) => {
            let config = args.into_config()?;
            let store = open_store(&config.database)?;
            commands::lookup(&store, &config.bib, out)
        }
        Command::History(args) => {
            let config = args.into_config()?;
            let store = open_store(&config.database)?;
            commands::history(&store, config.action, out)
        }
        Command::Reset(args) => {
            let database = args.into_database()?;
            let store = open_store(&database)?;
            commands::reset(&store, out)
        }
        Command::Watch(args) => {
            let config = args.into_config()?;
            let store = Arc::new(open_store(&config.database)?);
            runtime()?.block_on(async {
                let ingestor = Ingestor::from_config(Arc::new(config.remote), store)?;
                commands::watch(ingestor, config.interval, tokio::signal::ctrl_c(), out).await
            })
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "racefeed",
    about = "Mirror race results from the timing provider into a local database",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Pull results into the local database.
    Sync(SyncArgs),
    /// Validate credentials and event against the API.
    Check(CheckArgs),
    /// Show the stored result for a bib.
    Lookup(LookupArgs),
    /// List or clear the lookup history.
    History(HistoryArgs),
    /// Delete every stored record and history entry.
    Reset(ResetArgs),
    /// Run a partial sync on an interval until interrupted.
    Watch(WatchArgs),
}

#[cfg(test)]
mod tests;
