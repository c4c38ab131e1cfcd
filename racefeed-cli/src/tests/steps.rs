//! Behaviour-driven step definitions for the store-backed commands.

use super::helpers::{athletes, text};
use super::*;
use crate::config::HistoryAction;
use camino::Utf8PathBuf;
use racefeed_core::ResultStore;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;
use tempfile::TempDir;

/// Scenario state: a database on disk plus the last command output.
struct LookupWorld {
    _dir: TempDir,
    database: Utf8PathBuf,
    output: RefCell<String>,
}

impl LookupWorld {
    fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let database = Utf8PathBuf::from_path_buf(dir.path().join("results").join("race.db"))
            .expect("utf-8 temp path");
        Self {
            _dir: dir,
            database,
            output: RefCell::new(String::new()),
        }
    }

    /// Open the database the way each command invocation does.
    fn store(&self) -> SqliteResultStore {
        SqliteResultStore::open(&self.database).expect("open database")
    }

    fn capture(
        &self,
        command: impl FnOnce(&SqliteResultStore, &mut Vec<u8>) -> Result<(), CliError>,
    ) {
        let store = self.store();
        let mut out = Vec::new();
        command(&store, &mut out).expect("command succeeds");
        self.output.replace(text(out));
    }

    fn history_bibs(&self) -> Vec<String> {
        self.store()
            .history()
            .expect("history")
            .into_iter()
            .map(|item| item.entry.bib)
            .collect()
    }
}

#[fixture]
fn world() -> LookupWorld {
    LookupWorld::new()
}

fn bib_list(raw: &str) -> Vec<String> {
    raw.trim_matches('"')
        .split(',')
        .map(|bib| bib.trim().to_owned())
        .filter(|bib| !bib.is_empty())
        .collect()
}

#[given("a results database holding {count} athletes")]
fn database_with_athletes(#[from(world)] world: &LookupWorld, count: u64) {
    let inserted = world
        .store()
        .insert_many(&athletes(count))
        .expect("seed records");
    assert_eq!(inserted, count);
}

#[given("bibs {bibs} have been looked up")]
fn bibs_looked_up(#[from(world)] world: &LookupWorld, bibs: String) {
    let store = world.store();
    for bib in bib_list(&bibs) {
        commands::lookup(&store, &bib, &mut Vec::new()).expect("lookup");
    }
}

#[when("I look up bib {bib}")]
fn look_up(#[from(world)] world: &LookupWorld, bib: String) {
    let bib = bib.trim_matches('"').to_owned();
    world.capture(|store, out| commands::lookup(store, &bib, out));
}

#[when("I clear the history")]
fn clear_history(#[from(world)] world: &LookupWorld) {
    world.capture(|store, out| commands::history(store, HistoryAction::Clear, out));
}

#[when("I reset the database")]
fn reset_database(#[from(world)] world: &LookupWorld) {
    world.capture(|store, out| commands::reset(store, out));
}

#[then("the output shows {name} with net time {net}")]
fn output_shows(#[from(world)] world: &LookupWorld, name: String, net: String) {
    let output = world.output.borrow();
    assert!(
        output.contains(name.trim_matches('"')),
        "unexpected output: {output}"
    );
    assert!(
        output.contains(&format!("net {}", net.trim_matches('"'))),
        "unexpected output: {output}"
    );
}

#[then("the output says no result was found")]
fn output_not_found(#[from(world)] world: &LookupWorld) {
    assert!(world.output.borrow().starts_with("no result for bib"));
}

#[then("the history lists bibs {bibs}")]
fn history_lists(#[from(world)] world: &LookupWorld, bibs: String) {
    assert_eq!(world.history_bibs(), bib_list(&bibs));
}

#[then("the history is empty")]
fn history_empty(#[from(world)] world: &LookupWorld) {
    assert!(world.history_bibs().is_empty());
}

#[then("the database still holds {count} athletes")]
fn database_still_holds(#[from(world)] world: &LookupWorld, count: u64) {
    assert_eq!(world.store().record_count().expect("count"), count);
}

#[then("the database holds {count} athletes")]
fn database_holds(#[from(world)] world: &LookupWorld, count: u64) {
    assert_eq!(world.store().record_count().expect("count"), count);
}

macro_rules! register_scenario {
    ($fn_name:ident, $scenario_title:literal) => {
        #[scenario(path = "tests/features/lookup_command.feature", name = $scenario_title)]
        fn $fn_name(world: LookupWorld) {
            let _ = world;
        }
    };
}

register_scenario!(looking_up_stored_bib, "Looking up a stored bib");
register_scenario!(looking_up_unknown_bib, "Looking up an unknown bib");
register_scenario!(clearing_history, "Clearing the history keeps the results");
register_scenario!(resetting_database, "Resetting the database");
