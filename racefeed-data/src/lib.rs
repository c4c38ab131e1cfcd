//! Remote access and ingestion logic for racefeed.
//!
//! Responsibilities:
//! - Resolve operator credentials into an immutable [`remote::RemoteConfig`].
//! - Fetch result pages from the provider's HTTP API.
//! - Plan, dispatch and report full and partial resyncs into a
//!   [`racefeed_core::ResultStore`].
//! - Schedule periodic partial resyncs.
//!
//! Boundaries:
//! - Do not encode domain rules (live in `racefeed-core`).
//! - Keep blocking store calls off async executors; they run on
//!   `spawn_blocking`.
//!
//! Invariants:
//! - A config is never mutated once a run starts.
//! - No global mutable state.

#![forbid(unsafe_code)]

pub mod ingest;
pub mod remote;
pub mod schedule;

pub use ingest::{IngestError, IngestReport, Ingestor, PageFailure, SyncMode};
pub use remote::{
    ConfigurationError, HttpResultsSource, RemoteConfig, RemoteCredentials, ResultsSource,
    TransportError, validate_config, validate_event,
};
pub use schedule::{AutoUpdate, DEFAULT_INTERVAL, ScheduleError};
