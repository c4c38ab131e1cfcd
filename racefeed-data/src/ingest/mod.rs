//! Full and partial resyncs of the local store.
//!
//! A run probes the remote row count, plans the page range, fans the pages
//! out across bounded concurrent tasks and reports what each page did.
//!
//! Failures are scoped: a page that cannot be fetched or persisted is
//! recorded in the [`IngestReport`] and the run carries on. Only a failed
//! probe, a failed record count, a checkpoint failure, or every requested
//! page failing turns into an [`IngestError`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use racefeed_core::SqliteResultStore;
//! use racefeed_data::{ingest::Ingestor, remote::{RemoteConfig, RemoteCredentials}};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RemoteConfig::new(RemoteCredentials {
//!     login: "timer".into(),
//!     password: "secret".into(),
//!     client_id: "abc".into(),
//!     event_id: "42".into(),
//! })?;
//! let store = Arc::new(SqliteResultStore::open("results.db")?);
//! let ingestor = Ingestor::from_config(Arc::new(config), store)?;
//! let report = ingestor.run_partial().await?;
//! println!("{} new records", report.new_records());
//! # Ok(())
//! # }
//! ```

mod dispatch;
mod report;

use std::{num::NonZeroUsize, sync::Arc};

use log::info;
use racefeed_core::{PagePlan, ResultStore, StoreError};
use thiserror::Error;

pub use report::{IngestReport, PageFailure, PageOutcome, PageStatus, SyncMode};

use crate::remote::{
    ConfigurationError, DEFAULT_MAX_CONCURRENT_PAGES, HttpResultsSource, RemoteConfig,
    ResultsSource, TransportError,
};

/// Errors that abort an ingestion run.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The row-count probe request failed.
    #[error("row-count probe failed")]
    Probe {
        /// Transport failure.
        #[source]
        source: TransportError,
    },
    /// The probe response carried no usable row count.
    #[error("row count unavailable")]
    RowCount {
        /// Header failure.
        #[source]
        source: TransportError,
    },
    /// Counting stored records failed.
    #[error("failed to count stored records {stage} the run")]
    Store {
        /// `before` or `after`.
        stage: &'static str,
        /// Store failure.
        #[source]
        source: StoreError,
    },
    /// A checkpoint failed; remaining pages were skipped.
    #[error("checkpoint failed after storing page {page}")]
    Checkpoint {
        /// Page whose checkpoint failed.
        page: u64,
        /// Store failure.
        #[source]
        source: StoreError,
    },
    /// Every requested page failed.
    #[error("all {} requested pages failed", .0.requested_pages())]
    AllPagesFailed(Box<IngestReport>),
    /// A blocking store task could not be joined.
    #[error("store task failed: {message}")]
    Worker {
        /// Join error text.
        message: String,
    },
}

/// Drives ingestion runs from a results source into a result store.
///
/// Cloning is cheap; clones share the source and store.
#[derive(Clone)]
pub struct Ingestor {
    source: Arc<dyn ResultsSource>,
    store: Arc<dyn ResultStore>,
    max_concurrent_pages: NonZeroUsize,
}

impl std::fmt::Debug for Ingestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ingestor")
            .field("page_size", &self.source.page_size())
            .field("max_concurrent_pages", &self.max_concurrent_pages)
            .finish_non_exhaustive()
    }
}

impl Ingestor {
    /// Create an ingestor with the default concurrency limit.
    #[must_use]
    pub fn new(source: Arc<dyn ResultsSource>, store: Arc<dyn ResultStore>) -> Self {
        Self {
            source,
            store,
            max_concurrent_pages: DEFAULT_MAX_CONCURRENT_PAGES,
        }
    }

    /// Create an ingestor that fetches over HTTP using `config`.
    pub fn from_config(
        config: Arc<RemoteConfig>,
        store: Arc<dyn ResultStore>,
    ) -> Result<Self, ConfigurationError> {
        let limit = config.max_concurrent_pages();
        let source = HttpResultsSource::new(config)?;
        Ok(Self::new(Arc::new(source), store).with_max_concurrent_pages(limit))
    }

    /// Set how many page tasks may run at once.
    #[must_use]
    pub const fn with_max_concurrent_pages(mut self, limit: NonZeroUsize) -> Self {
        self.max_concurrent_pages = limit;
        self
    }

    /// Store the ingestor writes to.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ResultStore> {
        &self.store
    }

    /// Probe the remote row count and compute the page plan.
    pub async fn plan(&self) -> Result<PagePlan, IngestError> {
        let total_rows = self.source.probe_row_count().await.map_err(|source| {
            if source.is_header_error() {
                IngestError::RowCount { source }
            } else {
                IngestError::Probe { source }
            }
        })?;
        let plan = PagePlan::new(total_rows, self.source.page_size());
        info!(
            "remote reports {} rows across {} pages of {}",
            plan.total_rows, plan.total_pages, plan.page_size
        );
        Ok(plan)
    }

    /// Fetch every page the remote reports.
    ///
    /// Records already stored are skipped by the store, so a full run only
    /// adds what is missing. Nothing is requested when the store already
    /// holds the remote total.
    pub async fn run_full(&self) -> Result<IngestReport, IngestError> {
        self.run(SyncMode::Full).await
    }

    /// Fetch only the pages beyond the records already stored.
    ///
    /// The page holding the last stored record is fetched again; its
    /// already-stored rows are skipped. This relies on the remote keeping a
    /// stable row order between runs.
    pub async fn run_partial(&self) -> Result<IngestReport, IngestError> {
        self.run(SyncMode::Partial).await
    }

    async fn run(&self, mode: SyncMode) -> Result<IngestReport, IngestError> {
        let plan = self.plan().await?;
        let records_before = self.count_records("before").await?;
        let range = match mode {
            SyncMode::Full => plan.full_range(records_before),
            SyncMode::Partial => plan.resume_range(records_before),
        };

        if range.is_empty() {
            info!("{mode} sync: store holds {records_before} records, nothing to fetch");
            return Ok(IngestReport::new(
                mode,
                plan,
                range,
                records_before,
                records_before,
                Vec::new(),
            ));
        }

        info!("{mode} sync: requesting {range}");
        let outcomes = dispatch::dispatch(
            Arc::clone(&self.source),
            Arc::clone(&self.store),
            range,
            self.max_concurrent_pages,
        )
        .await
        .map_err(|failure| IngestError::Checkpoint {
            page: failure.page,
            source: failure.source,
        })?;

        let records_after = self.count_records("after").await?;
        let report = IngestReport::new(mode, plan, range, records_before, records_after, outcomes);
        if report.all_failed() {
            return Err(IngestError::AllPagesFailed(Box::new(report)));
        }
        info!("{report}");
        Ok(report)
    }

    async fn count_records(&self, stage: &'static str) -> Result<u64, IngestError> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.record_count())
            .await
            .map_err(|err| IngestError::Worker {
                message: err.to_string(),
            })?
            .map_err(|source| IngestError::Store { stage, source })
    }
}
