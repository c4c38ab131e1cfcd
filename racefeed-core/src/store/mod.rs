//! Persistence contract for ingested results.
//!
//! The [`ResultStore`] trait is what the ingestion engine writes through. It
//! is synchronous; async callers move calls onto a blocking thread. Every
//! method takes `&self` so one store can be shared by concurrent page tasks
//! behind an `Arc`. Implementations serialise writers internally.

use std::error::Error as StdError;

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::{AthleteRecord, HistoryRecord};

#[cfg(feature = "store-sqlite")]
mod sqlite;

#[cfg(feature = "store-sqlite")]
pub use sqlite::SqliteResultStore;

/// Boxed backend error carried by [`StoreError`].
pub type BackendError = Box<dyn StdError + Send + Sync>;

/// Errors raised by [`ResultStore`] implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing database could not be opened or prepared.
    #[error("failed to open result store at {path}: {source}")]
    Open {
        /// Location of the database.
        path: Utf8PathBuf,
        /// Backend error.
        #[source]
        source: BackendError,
    },
    /// A store operation failed. Any open transaction was rolled back.
    #[error("result store operation `{operation}` failed: {source}")]
    Operation {
        /// Short name of the failed operation.
        operation: &'static str,
        /// Backend error.
        #[source]
        source: BackendError,
    },
    /// The write-ahead log checkpoint returned an error.
    #[error("checkpoint failed: {source}")]
    Checkpoint {
        /// Backend error.
        #[source]
        source: BackendError,
    },
    /// The checkpoint could not complete because readers or writers held the log.
    #[error("checkpoint blocked: {checkpointed} of {log_frames} log frames checkpointed")]
    CheckpointBusy {
        /// Frames in the write-ahead log.
        log_frames: i64,
        /// Frames moved into the database.
        checkpointed: i64,
    },
    /// A row count did not fit the reported integer type.
    #[error("record count {count} is out of range")]
    CountOutOfRange {
        /// Raw count reported by the backend.
        count: i64,
    },
    /// A previous writer panicked while holding the store lock.
    #[error("result store lock poisoned")]
    Poisoned,
}

impl StoreError {
    /// Wrap a backend error for `operation`.
    pub fn operation(operation: &'static str, source: impl Into<BackendError>) -> Self {
        Self::Operation {
            operation,
            source: source.into(),
        }
    }

    /// Whether this error came from the checkpoint step.
    #[must_use]
    pub const fn is_checkpoint(&self) -> bool {
        matches!(self, Self::Checkpoint { .. } | Self::CheckpointBusy { .. })
    }
}

/// Local store of athlete records and lookup history.
///
/// # Examples
///
/// ```
/// # #[cfg(feature = "store-sqlite")] {
/// use racefeed_core::{AthleteRecord, ResultStore, SqliteResultStore};
///
/// let store = SqliteResultStore::open_in_memory().expect("open store");
/// let batch = [
///     AthleteRecord::new("1", "Ada", "L", "0:30:00", "0:30:05"),
///     AthleteRecord::new("1", "Ada", "L", "0:30:00", "0:30:05"),
/// ];
/// assert_eq!(store.insert_many(&batch).expect("insert"), 1);
/// assert_eq!(store.record_count().expect("count"), 1);
/// # }
/// ```
pub trait ResultStore: Send + Sync {
    /// Persist `records` atomically and return how many rows were inserted.
    ///
    /// Records whose bib is already stored, or repeated earlier in the same
    /// batch, are skipped. Any other failure leaves the store unchanged.
    fn insert_many(&self, records: &[AthleteRecord]) -> Result<u64, StoreError>;

    /// Number of stored records.
    fn record_count(&self) -> Result<u64, StoreError>;

    /// Flush pending writes so they are durable and visible to other readers.
    fn checkpoint(&self) -> Result<(), StoreError>;

    /// Find the record for `bib`, appending a history entry when it exists.
    ///
    /// Times on the returned record are rounded up to the whole second.
    fn lookup_bib(&self, bib: &str) -> Result<Option<AthleteRecord>, StoreError>;

    /// Lookup history joined with records, newest first.
    fn history(&self) -> Result<Vec<HistoryRecord>, StoreError>;

    /// The most recent lookup, if any.
    fn latest_history(&self) -> Result<Option<HistoryRecord>, StoreError>;

    /// Remove every history entry. Returns the number removed.
    fn clear_history(&self) -> Result<u64, StoreError>;

    /// Remove every history entry and every record.
    fn reset(&self) -> Result<(), StoreError>;
}

impl<S: ResultStore + ?Sized> ResultStore for std::sync::Arc<S> {
    fn insert_many(&self, records: &[AthleteRecord]) -> Result<u64, StoreError> {
        (**self).insert_many(records)
    }

    fn record_count(&self) -> Result<u64, StoreError> {
        (**self).record_count()
    }

    fn checkpoint(&self) -> Result<(), StoreError> {
        (**self).checkpoint()
    }

    fn lookup_bib(&self, bib: &str) -> Result<Option<AthleteRecord>, StoreError> {
        (**self).lookup_bib(bib)
    }

    fn history(&self) -> Result<Vec<HistoryRecord>, StoreError> {
        (**self).history()
    }

    fn latest_history(&self) -> Result<Option<HistoryRecord>, StoreError> {
        (**self).latest_history()
    }

    fn clear_history(&self) -> Result<u64, StoreError> {
        (**self).clear_history()
    }

    fn reset(&self) -> Result<(), StoreError> {
        (**self).reset()
    }
}
