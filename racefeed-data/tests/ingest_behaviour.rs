//! Behavioural tests for full and partial resyncs.

use std::{cell::RefCell, sync::Arc};

use racefeed_core::{AthleteRecord, PageSize, ResultStore, test_support::MemoryResultStore};
use racefeed_data::{
    IngestError, IngestReport, Ingestor, PageFailure, remote::test_support::StubResultsSource,
};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

/// World state for ingestion scenarios.
#[derive(Default)]
struct IngestWorld {
    remote: RefCell<Vec<AthleteRecord>>,
    source: RefCell<Option<StubResultsSource>>,
    store: RefCell<Option<Arc<MemoryResultStore>>>,
    requested: RefCell<Vec<u64>>,
    result: RefCell<Option<Result<IngestReport, IngestError>>>,
}

impl IngestWorld {
    fn store(&self) -> Arc<MemoryResultStore> {
        self.store.borrow().clone().expect("store configured")
    }

    fn run(&self, partial: bool) {
        let source = Arc::new(self.source.take().expect("source configured"));
        let ingestor = Ingestor::new(source.clone(), self.store());
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("build runtime");
        let result = runtime.block_on(async {
            if partial {
                ingestor.run_partial().await
            } else {
                ingestor.run_full().await
            }
        });
        self.requested.replace(source.requested_pages());
        self.result.replace(Some(result));
    }

    fn report_new_records(&self) -> u64 {
        let result = self.result.borrow();
        result
            .as_ref()
            .expect("sync ran")
            .as_ref()
            .expect("sync succeeds")
            .new_records()
    }
}

#[fixture]
fn world() -> IngestWorld {
    IngestWorld::default()
}

fn athletes(count: u64) -> Vec<AthleteRecord> {
    (1..=count)
        .map(|n| {
            AthleteRecord::new(
                n.to_string(),
                "Runner",
                format!("No{n}"),
                "1:02:03.4",
                "1:02:09",
            )
        })
        .collect()
}

// --- Given steps ---

#[given("a remote event with {rows} results in pages of {size}")]
fn given_remote(world: &IngestWorld, rows: u64, size: u32) {
    let records = athletes(rows);
    let page_size = PageSize::new(size).expect("non-zero page size");
    world.remote.replace(records.clone());
    world
        .source
        .replace(Some(StubResultsSource::with_records(page_size, records)));
}

#[given("a remote event that does not report its row count")]
fn given_remote_without_count(world: &IngestWorld) {
    world.source.replace(Some(
        StubResultsSource::new(PageSize::default()).without_row_count_header(),
    ));
}

#[given("an empty local store")]
fn given_empty_store(world: &IngestWorld) {
    world
        .store
        .replace(Some(Arc::new(MemoryResultStore::default())));
}

#[given("a local store already holding {count} of them")]
fn given_partial_store(world: &IngestWorld, count: usize) {
    let stored = world.remote.borrow().iter().take(count).cloned().collect::<Vec<_>>();
    world
        .store
        .replace(Some(Arc::new(MemoryResultStore::with_records(stored))));
}

#[given("page {page} fails with a server error")]
fn given_failing_page(world: &IngestWorld, page: u64) {
    let source = world.source.take().expect("source configured");
    world.source.replace(Some(source.with_failing_page(page)));
}

// --- When steps ---

#[when("a full sync runs")]
fn when_full(world: &IngestWorld) {
    world.run(false);
}

#[when("a partial sync runs")]
fn when_partial(world: &IngestWorld) {
    world.run(true);
}

// --- Then steps ---

#[then("pages {first} to {last} are requested")]
fn then_pages(world: &IngestWorld, first: u64, last: u64) {
    assert_eq!(*world.requested.borrow(), (first..=last).collect::<Vec<_>>());
}

#[then("no pages are requested")]
fn then_no_pages(world: &IngestWorld) {
    assert!(world.requested.borrow().is_empty());
}

#[then("the store holds {count} records")]
fn then_store_count(world: &IngestWorld, count: u64) {
    assert_eq!(world.store().record_count().expect("count"), count);
}

#[then("the report counts {count} new records")]
fn then_new_records(world: &IngestWorld, count: u64) {
    assert_eq!(world.report_new_records(), count);
}

#[then("the report lists page {page} as failed")]
fn then_page_failed(world: &IngestWorld, page: u64) {
    let result = world.result.borrow();
    let report = result
        .as_ref()
        .expect("sync ran")
        .as_ref()
        .expect("sync succeeds");
    let failed: Vec<_> = report.failures().map(|(number, _)| number).collect();
    assert_eq!(failed, vec![page]);
    assert!(matches!(
        report.failures().next(),
        Some((_, PageFailure::Fetch(_)))
    ));
}

#[then("the sync fails because the row count is unavailable")]
fn then_row_count_error(world: &IngestWorld) {
    let result = world.result.borrow();
    assert!(
        matches!(result.as_ref(), Some(Err(IngestError::RowCount { .. }))),
        "unexpected result: {result:?}"
    );
}

// --- Scenario registrations ---

macro_rules! register_scenario {
    ($fn_name:ident, $title:literal) => {
        #[scenario(path = "tests/features/ingest.feature", name = $title)]
        fn $fn_name(world: IngestWorld) {
            let _ = world;
        }
    };
}

register_scenario!(full_sync_into_empty_store, "A full sync into an empty store");
register_scenario!(partial_sync_resumes, "A partial sync resumes from the stored count");
register_scenario!(store_in_sync, "A store in sync requests nothing");
register_scenario!(failing_page_is_isolated, "A failing page does not stop the others");
register_scenario!(missing_row_count_aborts, "A missing row count aborts the sync");
