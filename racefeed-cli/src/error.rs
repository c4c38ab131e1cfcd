//! Error types emitted by the racefeed CLI.
//!
//! Keep this error type reasonably small, as many CLI helpers return
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use racefeed_core::StoreError;
use racefeed_data::{ConfigurationError, IngestError, ScheduleError};
use thiserror::Error;

/// Errors emitted by the racefeed CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Flag name without leading dashes.
        field: &'static str,
        /// Environment variable that also supplies the value.
        env: String,
    },
    /// An option was supplied with an unusable value.
    #[error("invalid --{field}: {reason}")]
    InvalidArgument {
        /// Flag name without leading dashes.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
    /// The remote configuration was rejected.
    #[error(transparent)]
    Remote(#[from] ConfigurationError),
    /// The local result store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// An ingestion run aborted.
    #[error("sync failed: {0}")]
    Ingest(#[from] IngestError),
    /// The auto-update scheduler could not start.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    /// The auto-update task ended abnormally.
    #[error("auto-update task failed: {message}")]
    Scheduler {
        /// Join error text.
        message: String,
    },
    /// Building the Tokio runtime failed.
    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// Waiting for Ctrl-C failed.
    #[error("failed to listen for Ctrl-C: {0}")]
    Signal(#[source] std::io::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}
