//! Test utilities for results sources.
//!
//! [`StubResultsSource`] serves canned pages, failures and event payloads
//! without network access, and records what was asked of it.

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use racefeed_core::{AthleteRecord, EventInfo, PageSize, ResultPage};

use super::{ROW_COUNT_HEADER, ResultsSource, TransportError};

const STUB_URL: &str = "stub://results";

/// Deterministic [`ResultsSource`] for tests.
///
/// Pages without a canned response are served empty, matching the trailing
/// page a real source returns.
///
/// # Example
///
/// ```
/// use racefeed_core::{AthleteRecord, PageSize};
/// use racefeed_data::remote::test_support::StubResultsSource;
///
/// let records: Vec<_> = (1..=5)
///     .map(|n| AthleteRecord::new(n.to_string(), "A", "B", "0:30:00", "0:30:00"))
///     .collect();
/// let source = StubResultsSource::with_records(PageSize::new(2).expect("page size"), records);
/// assert_eq!(source.canned_pages(), 3);
/// ```
#[derive(Debug)]
pub struct StubResultsSource {
    page_size: PageSize,
    row_count: Result<u64, TransportError>,
    pages: HashMap<u64, Result<Vec<AthleteRecord>, TransportError>>,
    delays: HashMap<u64, Duration>,
    event: Result<EventInfo, TransportError>,
    requested: Mutex<Vec<u64>>,
    probes: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubResultsSource {
    /// Create a source reporting zero rows.
    #[must_use]
    pub fn new(page_size: PageSize) -> Self {
        Self {
            page_size,
            row_count: Ok(0),
            pages: HashMap::new(),
            delays: HashMap::new(),
            event: Err(TransportError::Http {
                url: STUB_URL.to_owned(),
                status: 404,
            }),
            requested: Mutex::new(Vec::new()),
            probes: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Create a source holding `records`, split into pages of `page_size`.
    #[must_use]
    pub fn with_records(page_size: PageSize, records: Vec<AthleteRecord>) -> Self {
        let chunk = usize::try_from(page_size.get()).unwrap_or(usize::MAX);
        let mut source = Self::new(page_size).with_row_count(records.len() as u64);
        for (index, page) in records.chunks(chunk).enumerate() {
            source.pages.insert(index as u64 + 1, Ok(page.to_vec()));
        }
        source
    }

    /// Report `rows` from the row-count probe.
    #[must_use]
    pub fn with_row_count(mut self, rows: u64) -> Self {
        self.row_count = Ok(rows);
        self
    }

    /// Fail the row-count probe with `error`.
    #[must_use]
    pub fn with_probe_error(mut self, error: TransportError) -> Self {
        self.row_count = Err(error);
        self
    }

    /// Fail the row-count probe as if the count header were missing.
    #[must_use]
    pub fn without_row_count_header(self) -> Self {
        self.with_probe_error(TransportError::MissingHeader {
            url: STUB_URL.to_owned(),
            header: ROW_COUNT_HEADER,
        })
    }

    /// Serve `records` for `page`.
    #[must_use]
    pub fn with_page(mut self, page: u64, records: Vec<AthleteRecord>) -> Self {
        self.pages.insert(page, Ok(records));
        self
    }

    /// Fail `page` with `error`.
    #[must_use]
    pub fn with_page_error(mut self, page: u64, error: TransportError) -> Self {
        self.pages.insert(page, Err(error));
        self
    }

    /// Fail `page` with an HTTP 500.
    #[must_use]
    pub fn with_failing_page(self, page: u64) -> Self {
        self.with_page_error(
            page,
            TransportError::Http {
                url: format!("{STUB_URL}/{page}"),
                status: 500,
            },
        )
    }

    /// Delay the response for `page` by `delay`.
    #[must_use]
    pub fn with_page_delay(mut self, page: u64, delay: Duration) -> Self {
        self.delays.insert(page, delay);
        self
    }

    /// Delay every canned page by `delay`.
    #[must_use]
    pub fn with_uniform_delay(mut self, pages: u64, delay: Duration) -> Self {
        for page in 1..=pages {
            self.delays.insert(page, delay);
        }
        self
    }

    /// Serve `info` from the event endpoint.
    #[must_use]
    pub fn with_event(mut self, info: EventInfo) -> Self {
        self.event = Ok(info);
        self
    }

    /// Fail the event endpoint with `error`.
    #[must_use]
    pub fn with_event_error(mut self, error: TransportError) -> Self {
        self.event = Err(error);
        self
    }

    /// Number of pages with canned responses.
    #[must_use]
    pub fn canned_pages(&self) -> usize {
        self.pages.len()
    }

    /// Pages requested so far, sorted.
    ///
    /// # Panics
    ///
    /// Panics if a previous request panicked while recording.
    #[must_use]
    pub fn requested_pages(&self) -> Vec<u64> {
        let mut pages = self.requested.lock().expect("request log lock").clone();
        pages.sort_unstable();
        pages
    }

    /// Number of row-count probes made.
    #[must_use]
    pub fn probe_calls(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    /// Highest number of page requests observed in flight at once.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResultsSource for StubResultsSource {
    fn page_size(&self) -> PageSize {
        self.page_size
    }

    async fn probe_row_count(&self) -> Result<u64, TransportError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.row_count.clone()
    }

    async fn fetch_page(&self, page: u64) -> Result<ResultPage, TransportError> {
        if let Ok(mut requested) = self.requested.lock() {
            requested.push(page);
        }
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(&page) {
            tokio::time::sleep(*delay).await;
        } else {
            tokio::task::yield_now().await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match self.pages.get(&page) {
            Some(Ok(records)) => Ok(ResultPage::new(
                page,
                self.page_size.get(),
                records.clone(),
            )),
            Some(Err(error)) => Err(error.clone()),
            None => Ok(ResultPage::new(page, self.page_size.get(), Vec::new())),
        }
    }

    async fn fetch_event_info(&self) -> Result<EventInfo, TransportError> {
        self.event.clone()
    }
}
