//! Shared bookkeeping of one poller: retry tracker, latest snapshot and
//! change notification.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use miotac_domain::error::DeviceError;
use miotac_domain::status::StatusSnapshot;
use miotac_domain::time::{Timestamp, now};

use crate::executor::run_blocking;
use crate::polling::availability::{Availability, FailureOutcome, RetryTracker};
use crate::polling::coordinator::UpdateFailed;
use crate::ports::MiotDevice;

/// Receiver side of a poller's snapshot channel. It also fires when only the
/// availability changed.
pub type SnapshotReceiver = watch::Receiver<Option<Arc<StatusSnapshot>>>;

struct Tracked {
    tracker: RetryTracker,
    last_updated: Timestamp,
}

/// State owned by one poller.
///
/// The tracker sits behind a `std` mutex that is only held for bookkeeping,
/// never across an `.await`. Fetches are serialised by a separate async lock
/// so a scheduled poll and a refresh requested by a command never overlap.
pub struct PolledState {
    name: String,
    tracked: Mutex<Tracked>,
    snapshot: watch::Sender<Option<Arc<StatusSnapshot>>>,
    successes: AtomicU64,
    fetch_lock: tokio::sync::Mutex<()>,
}

impl PolledState {
    /// `name` only shows up in logs.
    #[must_use]
    pub fn new(name: impl Into<String>, max_retries: u32) -> Self {
        let (snapshot, _) = watch::channel(None);
        Self {
            name: name.into(),
            tracked: Mutex::new(Tracked {
                tracker: RetryTracker::new(max_retries),
                last_updated: now(),
            }),
            snapshot,
            successes: AtomicU64::new(0),
            fetch_lock: tokio::sync::Mutex::new(()),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fetch one status from `device` and record the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateFailed`] once the consecutive-failure count reaches
    /// the configured maximum. Failures below it are absorbed.
    pub async fn fetch<D: MiotDevice>(&self, device: &Arc<D>) -> Result<(), UpdateFailed> {
        let _guard = self.fetch_lock.lock().await;
        let result = run_blocking(device, D::status).await;
        self.record(result)
    }

    /// Record the outcome of one fetch.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateFailed`] when `result` is a failure that reaches the
    /// configured maximum.
    pub fn record(&self, result: Result<StatusSnapshot, DeviceError>) -> Result<(), UpdateFailed> {
        match result {
            Ok(snapshot) => {
                let previous = {
                    let mut tracked = self.lock();
                    tracked.last_updated = now();
                    tracked.tracker.record_success()
                };
                self.successes.fetch_add(1, Ordering::SeqCst);
                tracing::debug!(poller = %self.name, power = snapshot.power, "got new status");
                if previous == Availability::Unavailable {
                    tracing::info!(poller = %self.name, "device is reachable again");
                }
                self.snapshot.send_replace(Some(Arc::new(snapshot)));
                Ok(())
            }
            Err(error) => {
                let (outcome, max_retries, changed) = {
                    let mut tracked = self.lock();
                    let before = tracked.tracker.availability();
                    let outcome = tracked.tracker.record_failure();
                    let changed = before != tracked.tracker.availability();
                    if changed {
                        tracked.last_updated = now();
                    }
                    (outcome, tracked.tracker.max_retries(), changed)
                };
                if changed {
                    self.notify();
                }
                match outcome {
                    FailureOutcome::Tolerated { retry } => {
                        tracing::info!(
                            poller = %self.name,
                            retry,
                            max_retries,
                            error = %error,
                            "failed to fetch status, keeping last known state"
                        );
                        Ok(())
                    }
                    FailureOutcome::Exhausted { retry } => {
                        tracing::error!(
                            poller = %self.name,
                            retry,
                            max_retries,
                            error = %error,
                            "failed to fetch status, marking unavailable"
                        );
                        Err(UpdateFailed {
                            retries: retry,
                            source: error,
                        })
                    }
                }
            }
        }
    }

    /// Drop availability until the next successful fetch.
    pub fn force_unavailable(&self) {
        let changed = {
            let mut tracked = self.lock();
            let changed = tracked.tracker.force_unavailable();
            if changed {
                tracked.last_updated = now();
            }
            changed
        };
        if changed {
            tracing::warn!(poller = %self.name, "marked unavailable after a failed command");
            self.notify();
        }
    }

    /// Replace the current snapshot with an edited copy. Does nothing before
    /// the first successful fetch.
    pub fn amend_snapshot(&self, edit: impl FnOnce(&mut StatusSnapshot)) {
        let Some(current) = self.current() else {
            return;
        };
        let mut amended = StatusSnapshot::clone(&current);
        edit(&mut amended);
        self.lock().last_updated = now();
        self.snapshot.send_replace(Some(Arc::new(amended)));
    }

    #[must_use]
    pub fn availability(&self) -> Availability {
        self.lock().tracker.availability()
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.availability().is_available()
    }

    /// Consecutive failed fetches since the last success.
    #[must_use]
    pub fn retry(&self) -> u32 {
        self.lock().tracker.retry()
    }

    /// Time of the last snapshot or availability change.
    #[must_use]
    pub fn last_updated(&self) -> Timestamp {
        self.lock().last_updated
    }

    /// Number of successful fetches so far.
    #[must_use]
    pub fn successes(&self) -> u64 {
        self.successes.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn current(&self) -> Option<Arc<StatusSnapshot>> {
        self.snapshot.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> SnapshotReceiver {
        self.snapshot.subscribe()
    }

    /// Wake subscribers without changing the snapshot.
    pub(crate) fn notify(&self) {
        self.snapshot.send_modify(|_| {});
    }

    fn lock(&self) -> MutexGuard<'_, Tracked> {
        self.tracked.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
