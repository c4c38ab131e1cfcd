//! Bounded fan-out of page tasks.
//!
//! Each requested page gets its own task on a `JoinSet`. Tasks are spawned
//! as earlier ones finish, so the set never holds more than the concurrency
//! limit, and a semaphore caps how many fetch-and-persist cycles run at once.
//! Tasks report an outcome instead of failing the run, except for checkpoint
//! failures, which halt it.

use std::{
    any::Any,
    collections::BTreeSet,
    num::NonZeroUsize,
    ops::RangeInclusive,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use log::{debug, warn};
use racefeed_core::{PageRange, ResultStore, StoreError};
use tokio::{sync::Semaphore, task::JoinSet};

use super::report::{PageFailure, PageOutcome};
use crate::remote::ResultsSource;

/// A checkpoint failure reported by the page that hit it.
#[derive(Debug)]
pub(crate) struct CheckpointFailure {
    pub page: u64,
    pub source: StoreError,
}

enum WriteFailure {
    Persist(StoreError),
    Checkpoint(StoreError),
}

#[derive(Clone)]
struct PageContext {
    source: Arc<dyn ResultsSource>,
    store: Arc<dyn ResultStore>,
    permits: Arc<Semaphore>,
    halted: Arc<AtomicBool>,
}

type PageTasks = JoinSet<Result<PageOutcome, CheckpointFailure>>;

/// Spawn tasks for the next pages until `limit` tasks are outstanding.
fn top_up(
    tasks: &mut PageTasks,
    pages: &mut RangeInclusive<u64>,
    context: &PageContext,
    limit: usize,
) {
    while tasks.len() < limit {
        let Some(page) = pages.next() else {
            return;
        };
        tasks.spawn(run_page(context.clone(), page));
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned())
}

/// Fetch and persist every page in `range`, at most `limit` at a time.
///
/// Returns once every task has reported. Outcomes come back in completion
/// order.
pub(crate) async fn dispatch(
    source: Arc<dyn ResultsSource>,
    store: Arc<dyn ResultStore>,
    range: PageRange,
    limit: NonZeroUsize,
) -> Result<Vec<PageOutcome>, CheckpointFailure> {
    let limit = limit.get().min(Semaphore::MAX_PERMITS);
    let context = PageContext {
        source,
        store,
        permits: Arc::new(Semaphore::new(limit)),
        halted: Arc::new(AtomicBool::new(false)),
    };

    let mut pending = range.pages();
    let mut tasks = JoinSet::new();
    top_up(&mut tasks, &mut pending, &context, limit);
    debug!("scheduling {range} with at most {limit} in flight");

    let mut outcomes = Vec::new();
    let mut reported = BTreeSet::new();
    let mut checkpoint_failure = None;
    let mut panics = Vec::new();

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(outcome)) => {
                reported.insert(outcome.page);
                outcomes.push(outcome);
            }
            Ok(Err(failure)) => {
                reported.insert(failure.page);
                warn!("checkpoint failed after page {}: {}", failure.page, failure.source);
                if checkpoint_failure.is_none() {
                    checkpoint_failure = Some(failure);
                }
            }
            Err(err) if err.is_panic() => {
                let message = panic_message(&*err.into_panic());
                warn!("page task panicked: {message}");
                panics.push(message);
            }
            Err(err) => {
                panics.push(err.to_string());
            }
        }
        if checkpoint_failure.is_none() {
            top_up(&mut tasks, &mut pending, &context, limit);
        }
    }

    if let Some(failure) = checkpoint_failure {
        return Err(failure);
    }

    // A panicked task never reports its page; attribute the panics to the
    // pages that are missing.
    let mut panics = panics.into_iter();
    for page in range.pages().filter(|page| !reported.contains(page)) {
        let message = panics
            .next()
            .unwrap_or_else(|| "page task did not report".to_owned());
        outcomes.push(PageOutcome::failed(page, PageFailure::Panicked { message }));
    }

    Ok(outcomes)
}

async fn run_page(context: PageContext, page: u64) -> Result<PageOutcome, CheckpointFailure> {
    let Ok(_permit) = context.permits.acquire().await else {
        return Ok(PageOutcome::failed(page, PageFailure::Halted));
    };
    if context.halted.load(Ordering::SeqCst) {
        return Ok(PageOutcome::failed(page, PageFailure::Halted));
    }

    let batch = match context.source.fetch_page(page).await {
        Ok(batch) => batch,
        Err(err) => {
            warn!("page {page}: {err}");
            return Ok(PageOutcome::failed(page, PageFailure::Fetch(err)));
        }
    };
    let fetched = batch.len();

    let store = Arc::clone(&context.store);
    let written = tokio::task::spawn_blocking(move || {
        let accepted = store
            .insert_many(&batch.records)
            .map_err(WriteFailure::Persist)?;
        store.checkpoint().map_err(WriteFailure::Checkpoint)?;
        Ok::<_, WriteFailure>(accepted)
    })
    .await;

    match written {
        Ok(Ok(accepted)) => {
            debug!("page {page}: stored {accepted} of {fetched} records");
            Ok(PageOutcome::stored(page, fetched, accepted))
        }
        Ok(Err(WriteFailure::Persist(err))) => {
            warn!("page {page}: {err}");
            Ok(PageOutcome::failed(page, PageFailure::Persist(err)))
        }
        Ok(Err(WriteFailure::Checkpoint(source))) => {
            context.halted.store(true, Ordering::SeqCst);
            Err(CheckpointFailure { page, source })
        }
        Err(err) => {
            let message = if err.is_panic() {
                panic_message(&*err.into_panic())
            } else {
                err.to_string()
            };
            Ok(PageOutcome::failed(page, PageFailure::Panicked { message }))
        }
    }
}
