//! Behavioural tests for `SqliteResultStore` using rstest-bdd.

use std::cell::{Cell, RefCell};

use camino::Utf8PathBuf;
use racefeed_core::{AthleteRecord, ResultStore, SqliteResultStore};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

/// Shared state for result store scenarios.
#[derive(Debug)]
struct StoreWorld {
    temp_dir: TempDir,
    store: RefCell<Option<SqliteResultStore>>,
    accepted: Cell<Option<u64>>,
    lookup: RefCell<Option<Option<AthleteRecord>>>,
}

impl StoreWorld {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("create temp dir"),
            store: RefCell::new(None),
            accepted: Cell::new(None),
            lookup: RefCell::new(None),
        }
    }

    fn with_store<T>(&self, f: impl FnOnce(&SqliteResultStore) -> T) -> T {
        let borrowed = self.store.borrow();
        let store = borrowed.as_ref().expect("store should be open");
        f(store)
    }
}

#[fixture]
fn world() -> StoreWorld {
    StoreWorld::new()
}

fn record(bib: &str) -> AthleteRecord {
    AthleteRecord::new(bib, "Runner", bib, "0:50:00.25", "0:50:05")
}

#[given("an on-disk result store holding bibs 1 and 2")]
fn given_store(world: &StoreWorld) {
    let path = Utf8PathBuf::from_path_buf(world.temp_dir.path().join("results.db"))
        .expect("utf-8 temp path");
    let store = SqliteResultStore::open(&path).expect("open store");
    store
        .insert_many(&[record("1"), record("2")])
        .expect("seed store");
    world.store.replace(Some(store));
}

#[when("a batch with bibs 2, 3 and 3 is persisted")]
fn when_batch_persisted(world: &StoreWorld) {
    let accepted = world.with_store(|store| {
        store
            .insert_many(&[record("2"), record("3"), record("3")])
            .expect("persist batch")
    });
    world.accepted.set(Some(accepted));
}

#[when("bib {bib} is looked up")]
fn when_bib_looked_up(world: &StoreWorld, bib: String) {
    let found = world.with_store(|store| store.lookup_bib(&bib).expect("lookup"));
    world.lookup.replace(Some(found));
}

#[when("the store is reset")]
fn when_reset(world: &StoreWorld) {
    world.with_store(|store| store.reset().expect("reset"));
}

#[then("{count} record is accepted")]
fn then_accepted(world: &StoreWorld, count: u64) {
    assert_eq!(world.accepted.get(), Some(count));
}

#[then("the store holds {count} records")]
fn then_store_holds(world: &StoreWorld, count: u64) {
    let stored = world.with_store(|store| store.record_count().expect("count"));
    assert_eq!(stored, count);
}

#[then("the lookup returns a record")]
fn then_lookup_found(world: &StoreWorld) {
    let lookup = world.lookup.borrow();
    let record = lookup
        .as_ref()
        .and_then(Option::as_ref)
        .expect("lookup should find a record");
    assert_eq!(record.net_time, "00:50:01");
}

#[then("the lookup returns nothing")]
fn then_lookup_missing(world: &StoreWorld) {
    assert!(matches!(*world.lookup.borrow(), Some(None)));
}

#[then("the latest history entry is for bib {bib}")]
fn then_latest_history(world: &StoreWorld, bib: String) {
    let latest = world
        .with_store(|store| store.latest_history().expect("latest history"))
        .expect("a history entry");
    assert_eq!(latest.entry.bib, bib);
}

#[then("the history is empty")]
fn then_history_empty(world: &StoreWorld) {
    let history = world.with_store(|store| store.history().expect("history"));
    assert!(history.is_empty());
}

#[scenario(path = "tests/features/result_store.feature", index = 0)]
fn overlapping_batch(world: StoreWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/result_store.feature", index = 1)]
fn lookup_records_history(world: StoreWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/result_store.feature", index = 2)]
fn unknown_bib(world: StoreWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/result_store.feature", index = 3)]
fn reset_store(world: StoreWorld) {
    let _ = world;
}
