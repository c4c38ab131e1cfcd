//! Periodic partial resyncs.

use std::{sync::Arc, time::Duration};

use log::{info, warn};
use thiserror::Error;
use tokio::{
    task::{JoinError, JoinHandle},
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::ingest::Ingestor;

/// Interval between automatic runs when none is configured.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Errors raised when starting the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// A zero interval was requested.
    #[error("auto-update interval must be greater than zero")]
    ZeroInterval,
}

/// Handle to a background task running a partial resync every interval.
///
/// The first run happens one interval after start. [`AutoUpdate::stop`]
/// prevents further runs but never interrupts one already in progress.
#[derive(Debug)]
pub struct AutoUpdate {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl AutoUpdate {
    /// Spawn the scheduler on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start(ingestor: Arc<Ingestor>, interval: Duration) -> Result<Self, ScheduleError> {
        if interval.is_zero() {
            return Err(ScheduleError::ZeroInterval);
        }
        let token = CancellationToken::new();
        let handle = tokio::spawn(run_schedule(ingestor, interval, token.clone()));
        info!("auto-update every {}s", interval.as_secs());
        Ok(Self { token, handle })
    }

    /// Stop scheduling further runs.
    pub fn stop(&self) {
        self.token.cancel();
    }

    /// Whether [`AutoUpdate::stop`] has been called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait for the scheduler task to exit after [`AutoUpdate::stop`].
    pub async fn join(self) -> Result<(), JoinError> {
        self.handle.await
    }
}

async fn run_schedule(ingestor: Arc<Ingestor>, interval: Duration, token: CancellationToken) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = token.cancelled() => break,
            _ = ticker.tick() => {}
        }
        match ingestor.run_partial().await {
            Ok(report) => info!("auto-update: {report}"),
            Err(err) => warn!("auto-update failed: {err}"),
        }
    }
    info!("auto-update stopped");
}
