//! Per-page outcomes and the run summary built from them.

use std::fmt;

use racefeed_core::{PagePlan, PageRange, StoreError};
use thiserror::Error;

use crate::remote::TransportError;

/// Which pages a run requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Every page the remote reports.
    Full,
    /// Only pages beyond the records already stored.
    Partial,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Full => "full",
            Self::Partial => "partial",
        })
    }
}

/// Why a page did not end up persisted.
#[derive(Debug, Error)]
pub enum PageFailure {
    /// The request for the page failed.
    #[error("fetch failed")]
    Fetch(#[source] TransportError),
    /// The batch could not be written; nothing from it was stored.
    #[error("persist failed")]
    Persist(#[source] StoreError),
    /// The run halted after a checkpoint failure before this page started.
    #[error("skipped after the run halted")]
    Halted,
    /// The page task panicked.
    #[error("page task panicked: {message}")]
    Panicked {
        /// Panic payload, when it was a string.
        message: String,
    },
}

/// What happened to one page.
#[derive(Debug)]
pub enum PageStatus {
    /// The page was fetched and its batch committed.
    Stored {
        /// Records on the page.
        fetched: usize,
        /// Records actually inserted.
        accepted: u64,
    },
    /// The page failed.
    Failed(PageFailure),
}

/// Outcome of one page task.
#[derive(Debug)]
pub struct PageOutcome {
    /// One-based page index.
    pub page: u64,
    /// What happened.
    pub status: PageStatus,
}

impl PageOutcome {
    pub(crate) const fn stored(page: u64, fetched: usize, accepted: u64) -> Self {
        Self {
            page,
            status: PageStatus::Stored { fetched, accepted },
        }
    }

    pub(crate) const fn failed(page: u64, failure: PageFailure) -> Self {
        Self {
            page,
            status: PageStatus::Failed(failure),
        }
    }

    /// Whether the page was stored.
    #[must_use]
    pub const fn is_stored(&self) -> bool {
        matches!(self.status, PageStatus::Stored { .. })
    }
}

/// Summary of an ingestion run.
#[derive(Debug)]
pub struct IngestReport {
    /// Full or partial.
    pub mode: SyncMode,
    /// Plan computed from the row-count probe.
    pub plan: PagePlan,
    /// Pages the run requested.
    pub range: PageRange,
    /// Records stored before the run.
    pub records_before: u64,
    /// Records stored after the run.
    pub records_after: u64,
    outcomes: Vec<PageOutcome>,
}

impl IngestReport {
    pub(crate) fn new(
        mode: SyncMode,
        plan: PagePlan,
        range: PageRange,
        records_before: u64,
        records_after: u64,
        mut outcomes: Vec<PageOutcome>,
    ) -> Self {
        outcomes.sort_unstable_by_key(|outcome| outcome.page);
        Self {
            mode,
            plan,
            range,
            records_before,
            records_after,
            outcomes,
        }
    }

    /// Records added by the run.
    #[must_use]
    pub const fn new_records(&self) -> u64 {
        self.records_after.saturating_sub(self.records_before)
    }

    /// Per-page outcomes ordered by page.
    #[must_use]
    pub fn outcomes(&self) -> &[PageOutcome] {
        &self.outcomes
    }

    /// Number of pages the run requested.
    #[must_use]
    pub const fn requested_pages(&self) -> usize {
        self.outcomes.len()
    }

    /// Number of pages stored.
    #[must_use]
    pub fn stored_pages(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_stored()).count()
    }

    /// Failed pages and why they failed.
    pub fn failures(&self) -> impl Iterator<Item = (u64, &PageFailure)> {
        self.outcomes.iter().filter_map(|outcome| match &outcome.status {
            PageStatus::Failed(failure) => Some((outcome.page, failure)),
            PageStatus::Stored { .. } => None,
        })
    }

    /// Records fetched across stored pages.
    #[must_use]
    pub fn fetched(&self) -> usize {
        self.outcomes
            .iter()
            .map(|outcome| match outcome.status {
                PageStatus::Stored { fetched, .. } => fetched,
                PageStatus::Failed(_) => 0,
            })
            .sum()
    }

    /// Whether pages were requested and none of them was stored.
    #[must_use]
    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty() && self.stored_pages() == 0
    }
}

impl fmt::Display for IngestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} sync of {} remote rows: {} new records, {} of {} pages stored",
            self.mode,
            self.plan.total_rows,
            self.new_records(),
            self.stored_pages(),
            self.requested_pages()
        )
    }
}
