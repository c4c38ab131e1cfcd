//! Subcommand bodies.
//!
//! Each command writes its human-readable output to the supplied writer so
//! the entry point decides where it goes.

use std::{error::Error as _, future::Future, io::Write, sync::Arc, time::Duration};

use racefeed_core::{HistoryRecord, ResultStore, format_time_of_day};
use racefeed_data::{AutoUpdate, Ingestor, ResultsSource, validate_event};

use crate::{CliError, config::HistoryAction};

/// Run a full or partial sync and print the report.
pub(crate) async fn sync(
    ingestor: &Ingestor,
    partial: bool,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let report = if partial {
        ingestor.run_partial().await?
    } else {
        ingestor.run_full().await?
    };
    writeln!(out, "{report}")?;
    for (page, failure) in report.failures() {
        match failure.source() {
            Some(cause) => writeln!(out, "  page {page}: {failure}: {cause}")?,
            None => writeln!(out, "  page {page}: {failure}")?,
        }
    }
    Ok(())
}

/// Validate the configured event and print its name and start time.
pub(crate) async fn check(
    source: &dyn ResultsSource,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let event = validate_event(source).await?;
    writeln!(out, "event {}: {event}", event.event_id)?;
    Ok(())
}

/// Print the stored result for `bib`, recording the lookup.
pub(crate) fn lookup(
    store: &dyn ResultStore,
    bib: &str,
    out: &mut impl Write,
) -> Result<(), CliError> {
    match store.lookup_bib(bib)? {
        Some(record) => writeln!(
            out,
            "{}  {}  net {}  gun {}",
            record.bib,
            record.display_name(),
            record.net_time,
            record.gun_time
        )?,
        None => writeln!(out, "no result for bib {bib}")?,
    }
    Ok(())
}

fn write_history_line(out: &mut impl Write, item: &HistoryRecord) -> std::io::Result<()> {
    writeln!(
        out,
        "{}  {}  {}  net {}",
        format_time_of_day(item.entry.looked_up_at),
        item.record.bib,
        item.record.display_name(),
        item.record.net_time
    )
}

/// List, show the latest, or clear the lookup history.
pub(crate) fn history(
    store: &dyn ResultStore,
    action: HistoryAction,
    out: &mut impl Write,
) -> Result<(), CliError> {
    match action {
        HistoryAction::Clear => {
            let removed = store.clear_history()?;
            writeln!(out, "cleared {removed} history entries")?;
        }
        HistoryAction::Latest => match store.latest_history()? {
            Some(item) => write_history_line(out, &item)?,
            None => writeln!(out, "no lookups recorded")?,
        },
        HistoryAction::List => {
            let items = store.history()?;
            if items.is_empty() {
                writeln!(out, "no lookups recorded")?;
            }
            for item in &items {
                write_history_line(out, item)?;
            }
        }
    }
    Ok(())
}

/// Remove every record and history entry.
pub(crate) fn reset(store: &dyn ResultStore, out: &mut impl Write) -> Result<(), CliError> {
    store.reset()?;
    writeln!(out, "removed all records and history")?;
    Ok(())
}

/// Run partial syncs every `interval` until `shutdown` resolves.
///
/// A run in progress when `shutdown` resolves is allowed to finish.
pub(crate) async fn watch<S>(
    ingestor: Ingestor,
    interval: Duration,
    shutdown: S,
    out: &mut impl Write,
) -> Result<(), CliError>
where
    S: Future<Output = std::io::Result<()>>,
{
    let updater = AutoUpdate::start(Arc::new(ingestor), interval)?;
    writeln!(
        out,
        "syncing every {}s; press Ctrl-C to stop",
        interval.as_secs()
    )?;
    out.flush()?;

    let signalled = shutdown.await;
    updater.stop();
    updater.join().await.map_err(|err| CliError::Scheduler {
        message: err.to_string(),
    })?;
    signalled.map_err(CliError::Signal)?;
    writeln!(out, "stopped")?;
    Ok(())
}
