//! Core domain types for the racefeed ingestion engine.
//!
//! The crate owns the vocabulary shared by every other member of the
//! workspace: athlete records and the pages that carry them, lookup history,
//! the pagination arithmetic that drives full and partial resyncs, and the
//! [`ResultStore`] contract the ingestion engine writes through.
//!
//! Constructors return `Result` where input can be invalid so that bad
//! configuration surfaces before any network traffic happens.

#![forbid(unsafe_code)]

mod pagination;
mod record;
pub mod store;
mod time;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use pagination::{
    DEFAULT_PAGE_SIZE, PagePlan, PageRange, PageSize, PageSizeError, resume_start_page,
    total_pages,
};
pub use record::{AthleteRecord, EventInfo, HistoryEntry, HistoryRecord, ResultPage};
pub use store::{ResultStore, StoreError};
pub use time::{format_time_of_day, round_up_to_second};

#[cfg(feature = "store-sqlite")]
pub use store::SqliteResultStore;
