//! Test-only, in-memory `ResultStore` used by unit and behaviour tests.
//!
//! The store can be told to fail inserts or checkpoints so callers can
//! exercise their error paths without a real database.

use std::sync::{
    Mutex, MutexGuard,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use crate::{AthleteRecord, HistoryEntry, HistoryRecord, ResultStore, StoreError};

#[derive(Debug, Default)]
struct State {
    records: Vec<AthleteRecord>,
    history: Vec<HistoryEntry>,
    clock: i64,
}

/// In-memory `ResultStore` with failure injection and call counters.
///
/// Lookups are stamped with a logical clock that increases by one per
/// lookup, so history ordering is deterministic.
#[derive(Debug, Default)]
pub struct MemoryResultStore {
    state: Mutex<State>,
    fail_inserts: AtomicBool,
    fail_checkpoints: AtomicBool,
    inserts: AtomicUsize,
    checkpoints: AtomicUsize,
}

impl MemoryResultStore {
    /// Create a store pre-populated with `records`.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = AthleteRecord>,
    {
        let store = Self::default();
        let seed: Vec<_> = records.into_iter().collect();
        store
            .insert_many(&seed)
            .expect("seeding an in-memory store cannot fail");
        store.inserts.store(0, Ordering::SeqCst);
        store
    }

    /// Make every subsequent `insert_many` call fail.
    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `checkpoint` call fail.
    pub fn fail_checkpoints(&self, fail: bool) {
        self.fail_checkpoints.store(fail, Ordering::SeqCst);
    }

    /// Number of `insert_many` calls observed, including failed ones.
    #[must_use]
    pub fn insert_calls(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    /// Number of `checkpoint` calls observed, including failed ones.
    #[must_use]
    pub fn checkpoint_calls(&self) -> usize {
        self.checkpoints.load(Ordering::SeqCst)
    }

    /// Bibs of stored records in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn bibs(&self) -> Vec<String> {
        self.lock()
            .expect("memory store lock")
            .records
            .iter()
            .map(|record| record.bib.clone())
            .collect()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state.lock().map_err(|_| StoreError::Poisoned)
    }

    fn joined(state: &State, entry: &HistoryEntry) -> Option<HistoryRecord> {
        state
            .records
            .iter()
            .find(|record| record.bib == entry.bib)
            .map(|record| HistoryRecord {
                entry: entry.clone(),
                record: record.rounded(),
            })
    }
}

impl ResultStore for MemoryResultStore {
    fn insert_many(&self, records: &[AthleteRecord]) -> Result<u64, StoreError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::operation(
                "insert records",
                std::io::Error::other("injected insert failure"),
            ));
        }
        let mut state = self.lock()?;
        let mut accepted = 0;
        for record in records {
            if state.records.iter().any(|stored| stored.bib == record.bib) {
                continue;
            }
            state.records.push(record.clone());
            accepted += 1;
        }
        Ok(accepted)
    }

    fn record_count(&self) -> Result<u64, StoreError> {
        Ok(self.lock()?.records.len() as u64)
    }

    fn checkpoint(&self) -> Result<(), StoreError> {
        self.checkpoints.fetch_add(1, Ordering::SeqCst);
        if self.fail_checkpoints.load(Ordering::SeqCst) {
            return Err(StoreError::Checkpoint {
                source: Box::new(std::io::Error::other("injected checkpoint failure")),
            });
        }
        Ok(())
    }

    fn lookup_bib(&self, bib: &str) -> Result<Option<AthleteRecord>, StoreError> {
        let mut state = self.lock()?;
        let Some(record) = state.records.iter().find(|r| r.bib == bib).cloned() else {
            return Ok(None);
        };
        state.clock += 1;
        let looked_up_at = state.clock;
        state.history.push(HistoryEntry {
            bib: record.bib.clone(),
            looked_up_at,
        });
        Ok(Some(record.rounded()))
    }

    fn history(&self) -> Result<Vec<HistoryRecord>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .history
            .iter()
            .rev()
            .filter_map(|entry| Self::joined(&state, entry))
            .collect())
    }

    fn latest_history(&self) -> Result<Option<HistoryRecord>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .history
            .last()
            .and_then(|entry| Self::joined(&state, entry)))
    }

    fn clear_history(&self) -> Result<u64, StoreError> {
        let mut state = self.lock()?;
        let removed = state.history.len() as u64;
        state.history.clear();
        Ok(removed)
    }

    fn reset(&self) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        state.history.clear();
        state.records.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn record(bib: &str) -> AthleteRecord {
        AthleteRecord::new(bib, "Runner", "Tester", "0:20:00", "0:20:01")
    }

    #[rstest]
    fn seeded_store_starts_with_clean_counters() {
        let store = MemoryResultStore::with_records([record("7"), record("3")]);
        assert_eq!(store.bibs(), vec!["7".to_owned(), "3".to_owned()]);
        assert_eq!(store.insert_calls(), 0);
        assert_eq!(store.checkpoint_calls(), 0);
    }

    #[rstest]
    fn counters_include_failed_calls() {
        let store = MemoryResultStore::default();
        store.fail_inserts(true);
        store.fail_checkpoints(true);
        assert!(store.insert_many(&[record("1")]).is_err());
        assert!(store.checkpoint().is_err());
        assert_eq!(store.insert_calls(), 1);
        assert_eq!(store.checkpoint_calls(), 1);
        assert!(store.bibs().is_empty());
    }
}
