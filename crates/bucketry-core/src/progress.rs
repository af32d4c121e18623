//! Progress accounting for long-running inventory processing.
//!
//! The pipeline publishes record counts into an atomic counter; a
//! background reporter task polls it on an interval and emits periodic log
//! lines. The reporter never touches aggregation state and terminates
//! deterministically when processing completes or is cancelled.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

/// Shared record counter published by the aggregation loop.
#[derive(Debug, Default)]
pub struct ProgressCounter {
    objects: AtomicU64,
}

impl ProgressCounter {
    /// Creates a counter starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `n` processed records.
    pub fn add(&self, n: u64) {
        self.objects.fetch_add(n, Ordering::Relaxed);
    }

    /// Records processed so far.
    #[must_use]
    pub fn objects(&self) -> u64 {
        self.objects.load(Ordering::Relaxed)
    }
}

/// Background task logging processing progress on an interval.
#[derive(Debug)]
pub struct ProgressReporter {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl ProgressReporter {
    /// Spawns the reporter on the current runtime.
    #[must_use]
    pub fn spawn(counter: Arc<ProgressCounter>, period: Duration) -> Self {
        let (shutdown, mut rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately; skip it so the first
            // log line appears one full period in.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        info!(objects = counter.objects(), "processing inventory");
                    }
                    _ = rx.changed() => break,
                }
            }
        });
        Self { shutdown, handle }
    }

    /// Stops the reporter and waits for it to exit.
    pub async fn finish(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}
