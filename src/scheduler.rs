//! Periodic cache refresh.
//!
//! A [`RefreshScheduler`] drives [`ConfigCache::try_reload`] on a fixed interval from a
//! background task. The first tick fires one interval after [`RefreshScheduler::start`]; ticks
//! that arrive while a reload is still running are dropped rather than queued, so at most one
//! reload per cache is ever in flight.

use crate::{
    cache::ConfigCache,
    errors::{Error, Result},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Default refresh interval in milliseconds.
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 30_000;

/// Schedules periodic reloads of one [`ConfigCache`].
#[derive(Debug, Clone)]
pub struct RefreshScheduler {
    cache: Arc<ConfigCache>,
    interval: Duration,
}

impl RefreshScheduler {
    /// # Errors
    /// Returns [`Error::Validation`] if `interval` is zero.
    pub fn new(cache: Arc<ConfigCache>, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(Error::Validation {
                message: "Refresh interval must be greater than zero".to_string(),
            });
        }
        Ok(Self { cache, interval })
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawns the refresh loop on the current Tokio runtime.
    ///
    /// The loop runs until [`SchedulerHandle::stop`] is called or the handle is dropped.
    #[must_use]
    pub fn start(self) -> SchedulerHandle {
        let (shutdown, receiver) = oneshot::channel();
        let task = tokio::spawn(self.run(receiver));
        SchedulerHandle { shutdown, task }
    }

    async fn run(self, mut shutdown: oneshot::Receiver<()>) {
        info!(
            application = %self.cache.application_name(),
            interval_ms = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX),
            "Starting configuration refresh loop"
        );

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.cache.try_reload().await {
                        Some(true) => debug!("Scheduled reload complete"),
                        Some(false) => warn!("Scheduled reload did not replace the snapshot"),
                        None => debug!("Previous reload still running, tick dropped"),
                    }
                }
                signal = &mut shutdown => {
                    if signal.is_ok() {
                        info!("Refresh loop received shutdown signal, exiting");
                    } else {
                        info!("Scheduler handle dropped, exiting refresh loop");
                    }
                    break;
                }
            }
        }
    }
}

/// Handle to a running refresh loop.
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signals the loop to stop and waits for it to finish.
    ///
    /// A reload already in progress completes before the loop exits; no tick starts afterwards.
    pub async fn stop(self) {
        // The loop may already have exited; nothing to signal then
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            warn!("Refresh loop ended abnormally: {}", e);
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
