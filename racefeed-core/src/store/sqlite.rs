//! SQLite-backed result store.

use std::{
    fmt,
    sync::{Mutex, MutexGuard},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

use crate::{AthleteRecord, HistoryEntry, HistoryRecord};

use super::{ResultStore, StoreError};

/// SQLite limits bound parameters per statement to 999 by default. Inserts
/// are chunked to remain below that ceiling.
const SQLITE_MAX_VARIABLE_NUMBER: usize = 999;

/// Bound parameters per record row.
const COLUMNS_PER_RECORD: usize = 5;

/// Rows per multi-row `INSERT` statement.
const ROWS_PER_STATEMENT: usize = SQLITE_MAX_VARIABLE_NUMBER / COLUMNS_PER_RECORD;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS records (
        id INTEGER PRIMARY KEY,
        bib TEXT NOT NULL UNIQUE,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        net_time TEXT NOT NULL,
        gun_time TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS history (
        id INTEGER PRIMARY KEY,
        bib TEXT NOT NULL REFERENCES records (bib),
        looked_up_at INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS history_looked_up_at ON history (looked_up_at);
";

const HISTORY_QUERY: &str = "
    SELECT h.bib, h.looked_up_at, r.first_name, r.last_name, r.net_time, r.gun_time
    FROM history AS h
    JOIN records AS r ON r.bib = h.bib
    ORDER BY h.looked_up_at DESC, h.id DESC
";

/// Result store persisted in a SQLite database running in WAL mode.
///
/// A single connection is shared behind a mutex, so concurrent page tasks
/// write one batch at a time.
pub struct SqliteResultStore {
    connection: Mutex<Connection>,
    location: Utf8PathBuf,
}

impl fmt::Debug for SqliteResultStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteResultStore")
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

impl SqliteResultStore {
    /// Open (creating if needed) the database at `path`.
    ///
    /// Missing parent directories are created. The schema is applied on
    /// every open and is idempotent.
    pub fn open(path: impl AsRef<Utf8Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let open_error = |source: Box<dyn std::error::Error + Send + Sync>| StoreError::Open {
            path: path.to_path_buf(),
            source,
        };

        racefeed_fs::prepare_database_path(path).map_err(|err| open_error(Box::new(err)))?;
        let connection = Connection::open(path).map_err(|err| open_error(Box::new(err)))?;
        configure(&connection).map_err(|err| open_error(Box::new(err)))?;
        debug!("opened result store at {path}");

        Ok(Self {
            connection: Mutex::new(connection),
            location: path.to_path_buf(),
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let location = Utf8PathBuf::from(":memory:");
        let open_error = |source: rusqlite::Error| StoreError::Open {
            path: location.clone(),
            source: Box::new(source),
        };
        let connection = Connection::open_in_memory().map_err(open_error)?;
        configure(&connection).map_err(open_error)?;

        Ok(Self {
            connection: Mutex::new(connection),
            location,
        })
    }

    /// Where the database lives; `:memory:` for in-memory stores.
    #[must_use]
    pub fn location(&self) -> &Utf8Path {
        &self.location
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.connection.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn configure(connection: &Connection) -> rusqlite::Result<()> {
    // `journal_mode` reports the resulting mode as a row; in-memory databases
    // stay in `memory` mode.
    let _mode: String =
        connection.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    connection.pragma_update(None, "foreign_keys", "ON")?;
    connection.busy_timeout(BUSY_TIMEOUT)?;
    connection.execute_batch(SCHEMA)
}

fn insert_statement(rows: usize) -> String {
    let row = "(?, ?, ?, ?, ?)";
    let values = vec![row; rows].join(", ");
    format!(
        "INSERT OR IGNORE INTO records (bib, first_name, last_name, net_time, gun_time) \
         VALUES {values}"
    )
}

fn record_params(record: &AthleteRecord) -> [&str; COLUMNS_PER_RECORD] {
    [
        record.bib.as_str(),
        record.first_name.as_str(),
        record.last_name.as_str(),
        record.net_time.as_str(),
        record.gun_time.as_str(),
    ]
}

fn history_from_row(row: &Row<'_>) -> rusqlite::Result<HistoryRecord> {
    let bib: String = row.get(0)?;
    let record = AthleteRecord {
        bib: bib.clone(),
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        net_time: row.get(4)?,
        gun_time: row.get(5)?,
    };
    Ok(HistoryRecord {
        entry: HistoryEntry {
            bib,
            looked_up_at: row.get(1)?,
        },
        record: record.rounded(),
    })
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX))
}

fn count_to_u64(count: i64) -> Result<u64, StoreError> {
    u64::try_from(count).map_err(|_| StoreError::CountOutOfRange { count })
}

impl ResultStore for SqliteResultStore {
    fn insert_many(&self, records: &[AthleteRecord]) -> Result<u64, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut connection = self.lock()?;
        let tx = connection
            .transaction()
            .map_err(|err| StoreError::operation("begin insert", err))?;

        let mut accepted = 0_u64;
        for chunk in records.chunks(ROWS_PER_STATEMENT) {
            let sql = insert_statement(chunk.len());
            let inserted = tx
                .execute(&sql, params_from_iter(chunk.iter().flat_map(record_params)))
                .map_err(|err| StoreError::operation("insert records", err))?;
            accepted += inserted as u64;
        }

        tx.commit()
            .map_err(|err| StoreError::operation("commit insert", err))?;
        debug!(
            "stored {accepted} of {} records ({} skipped as duplicates)",
            records.len(),
            records.len() as u64 - accepted
        );
        Ok(accepted)
    }

    fn record_count(&self) -> Result<u64, StoreError> {
        let connection = self.lock()?;
        let count: i64 = connection
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))
            .map_err(|err| StoreError::operation("count records", err))?;
        count_to_u64(count)
    }

    fn checkpoint(&self) -> Result<(), StoreError> {
        let connection = self.lock()?;
        let (busy, log_frames, checkpointed): (i64, i64, i64) = connection
            .query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .map_err(|err| StoreError::Checkpoint {
                source: Box::new(err),
            })?;
        if busy != 0 {
            return Err(StoreError::CheckpointBusy {
                log_frames,
                checkpointed,
            });
        }
        Ok(())
    }

    fn lookup_bib(&self, bib: &str) -> Result<Option<AthleteRecord>, StoreError> {
        let mut connection = self.lock()?;
        let tx = connection
            .transaction()
            .map_err(|err| StoreError::operation("begin lookup", err))?;

        let found = tx
            .query_row(
                "SELECT bib, first_name, last_name, net_time, gun_time \
                 FROM records WHERE bib = ?1",
                params![bib],
                |row| {
                    Ok(AthleteRecord {
                        bib: row.get(0)?,
                        first_name: row.get(1)?,
                        last_name: row.get(2)?,
                        net_time: row.get(3)?,
                        gun_time: row.get(4)?,
                    })
                },
            )
            .optional()
            .map_err(|err| StoreError::operation("find record", err))?;

        let Some(record) = found else {
            return Ok(None);
        };

        tx.execute(
            "INSERT INTO history (bib, looked_up_at) VALUES (?1, ?2)",
            params![record.bib, unix_now()],
        )
        .map_err(|err| StoreError::operation("append history", err))?;
        tx.commit()
            .map_err(|err| StoreError::operation("commit lookup", err))?;

        Ok(Some(record.rounded()))
    }

    fn history(&self) -> Result<Vec<HistoryRecord>, StoreError> {
        let connection = self.lock()?;
        let mut statement = connection
            .prepare(HISTORY_QUERY)
            .map_err(|err| StoreError::operation("prepare history", err))?;
        let rows = statement
            .query_map([], history_from_row)
            .map_err(|err| StoreError::operation("read history", err))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|err| StoreError::operation("read history", err))
    }

    fn latest_history(&self) -> Result<Option<HistoryRecord>, StoreError> {
        let connection = self.lock()?;
        connection
            .query_row(&format!("{HISTORY_QUERY} LIMIT 1"), [], history_from_row)
            .optional()
            .map_err(|err| StoreError::operation("read latest history", err))
    }

    fn clear_history(&self) -> Result<u64, StoreError> {
        let connection = self.lock()?;
        let removed = connection
            .execute("DELETE FROM history", [])
            .map_err(|err| StoreError::operation("clear history", err))?;
        Ok(removed as u64)
    }

    fn reset(&self) -> Result<(), StoreError> {
        let mut connection = self.lock()?;
        let tx = connection
            .transaction()
            .map_err(|err| StoreError::operation("begin reset", err))?;
        tx.execute("DELETE FROM history", [])
            .map_err(|err| StoreError::operation("clear history", err))?;
        tx.execute("DELETE FROM records", [])
            .map_err(|err| StoreError::operation("clear records", err))?;
        tx.commit()
            .map_err(|err| StoreError::operation("commit reset", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    fn record(bib: &str) -> AthleteRecord {
        AthleteRecord::new(bib, "First", format!("Last{bib}"), "0:40:00.5", "0:40:10")
    }

    #[fixture]
    fn store() -> SqliteResultStore {
        SqliteResultStore::open_in_memory().expect("open in-memory store")
    }

    #[rstest]
    fn inserts_new_records(store: SqliteResultStore) {
        let accepted = store
            .insert_many(&[record("1"), record("2")])
            .expect("insert batch");
        assert_eq!(accepted, 2);
        assert_eq!(store.record_count().expect("count"), 2);
    }

    #[rstest]
    fn skips_stored_and_repeated_bibs(store: SqliteResultStore) {
        store.insert_many(&[record("1")]).expect("seed");
        let accepted = store
            .insert_many(&[record("1"), record("2"), record("2"), record("3")])
            .expect("insert batch");
        assert_eq!(accepted, 2);
        assert_eq!(store.record_count().expect("count"), 3);
    }

    #[rstest]
    fn empty_batch_is_a_no_op(store: SqliteResultStore) {
        assert_eq!(store.insert_many(&[]).expect("insert"), 0);
        assert_eq!(store.record_count().expect("count"), 0);
    }

    #[rstest]
    fn batches_larger_than_parameter_limit_are_chunked(store: SqliteResultStore) {
        let batch: Vec<_> = (0..1_000).map(|n| record(&n.to_string())).collect();
        assert_eq!(store.insert_many(&batch).expect("insert"), 1_000);
        assert_eq!(store.record_count().expect("count"), 1_000);
    }

    #[rstest]
    fn lookup_appends_history_and_rounds_times(store: SqliteResultStore) {
        store.insert_many(&[record("7")]).expect("seed");

        let found = store.lookup_bib("7").expect("lookup").expect("record 7");
        assert_eq!(found.net_time, "00:40:01");
        assert_eq!(found.gun_time, "00:40:10");

        let history = store.history().expect("history");
        assert_eq!(history.len(), 1);
        assert_eq!(history.first().map(|h| h.entry.bib.as_str()), Some("7"));
    }

    #[rstest]
    fn lookup_of_unknown_bib_leaves_history_untouched(store: SqliteResultStore) {
        assert!(store.lookup_bib("404").expect("lookup").is_none());
        assert!(store.history().expect("history").is_empty());
        assert!(store.latest_history().expect("latest").is_none());
    }

    #[rstest]
    fn history_is_newest_first(store: SqliteResultStore) {
        store
            .insert_many(&[record("1"), record("2")])
            .expect("seed");
        store.lookup_bib("1").expect("lookup 1");
        store.lookup_bib("2").expect("lookup 2");
        store.lookup_bib("1").expect("lookup 1 again");

        let bibs: Vec<_> = store
            .history()
            .expect("history")
            .into_iter()
            .map(|h| h.entry.bib)
            .collect();
        assert_eq!(bibs, vec!["1", "2", "1"]);

        let latest = store.latest_history().expect("latest").expect("entry");
        assert_eq!(latest.entry.bib, "1");
    }

    #[rstest]
    fn clear_history_keeps_records(store: SqliteResultStore) {
        store.insert_many(&[record("1")]).expect("seed");
        store.lookup_bib("1").expect("lookup");
        assert_eq!(store.clear_history().expect("clear"), 1);
        assert!(store.history().expect("history").is_empty());
        assert_eq!(store.record_count().expect("count"), 1);
    }

    #[rstest]
    fn reset_removes_records_and_history(store: SqliteResultStore) {
        store.insert_many(&[record("1")]).expect("seed");
        store.lookup_bib("1").expect("lookup");
        store.reset().expect("reset");
        assert_eq!(store.record_count().expect("count"), 0);
        assert!(store.history().expect("history").is_empty());
    }

    #[rstest]
    fn checkpoint_succeeds_on_disk() {
        let dir = TempDir::new().expect("tempdir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("nested/results.db"))
            .expect("utf-8 path");
        let store = SqliteResultStore::open(&path).expect("open store");
        store.insert_many(&[record("1")]).expect("insert");
        store.checkpoint().expect("checkpoint");
        assert_eq!(store.location(), path.as_path());

        drop(store);
        let reopened = SqliteResultStore::open(&path).expect("reopen store");
        assert_eq!(reopened.record_count().expect("count"), 1);
    }

    #[rstest]
    fn open_fails_when_path_is_a_directory() {
        let dir = TempDir::new().expect("tempdir");
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 path");
        let err = SqliteResultStore::open(&path).expect_err("directory is not a database");
        assert!(matches!(err, StoreError::Open { .. }));
    }

    #[rstest]
    #[case(1, 1)]
    #[case(199, 1)]
    #[case(200, 2)]
    fn statement_count_tracks_parameter_limit(#[case] rows: usize, #[case] statements: usize) {
        assert_eq!(rows.div_ceil(ROWS_PER_STATEMENT), statements);
        assert!(ROWS_PER_STATEMENT * COLUMNS_PER_RECORD <= SQLITE_MAX_VARIABLE_NUMBER);
    }
}
