//! Facade crate for racefeed, a results ingestion engine.
//!
//! This crate re-exports the domain types, the result store seam and the
//! ingestion entry points. The SQLite store sits behind the `store-sqlite`
//! feature.

#![forbid(unsafe_code)]

pub use racefeed_core::{
    AthleteRecord, EventInfo, HistoryEntry, HistoryRecord, PagePlan, PageRange, PageSize,
    ResultPage, ResultStore, StoreError, format_time_of_day, round_up_to_second,
};

#[cfg(feature = "store-sqlite")]
pub use racefeed_core::SqliteResultStore;

pub use racefeed_data::{
    AutoUpdate, ConfigurationError, HttpResultsSource, IngestError, IngestReport, Ingestor,
    RemoteConfig, RemoteCredentials, ResultsSource, SyncMode, TransportError, validate_config,
    validate_event,
};
