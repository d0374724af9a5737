//! Shared polling coordinator: one fetch per interval, many dependents.

use std::future::Future;
use std::sync::Arc;

use miotac_domain::error::DeviceError;
use miotac_domain::status::StatusSnapshot;

use crate::polling::scheduler::Poller;
use crate::polling::state::{PolledState, SnapshotReceiver};
use crate::ports::MiotDevice;

/// The consecutive-failure threshold was reached while polling.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("error communicating with air conditioner after {retries} attempts")]
pub struct UpdateFailed {
    pub retries: u32,
    #[source]
    pub source: DeviceError,
}

/// Polls a device once per tick and fans the snapshot out to every entity
/// built on it. Dependents never fetch on their own.
pub struct UpdateCoordinator<D> {
    device: Arc<D>,
    state: PolledState,
}

impl<D: MiotDevice> UpdateCoordinator<D> {
    #[must_use]
    pub fn new(name: impl Into<String>, device: Arc<D>, max_retries: u32) -> Self {
        Self {
            device,
            state: PolledState::new(name, max_retries),
        }
    }

    #[must_use]
    pub fn device(&self) -> &Arc<D> {
        &self.device
    }

    /// Fetch the device status once.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateFailed`] once the consecutive-failure count reaches
    /// the configured maximum.
    pub async fn refresh(&self) -> Result<(), UpdateFailed> {
        self.state.fetch(&self.device).await
    }

    /// Refresh on behalf of a dependent, logging instead of failing.
    pub async fn request_refresh(&self) {
        if let Err(error) = self.refresh().await {
            tracing::warn!(coordinator = %self.state.name(), error = %error, "requested refresh failed");
        }
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.state.is_available()
    }

    #[must_use]
    pub fn current_snapshot(&self) -> Option<Arc<StatusSnapshot>> {
        self.state.current()
    }

    /// Number of successful fetches so far.
    #[must_use]
    pub fn successes(&self) -> u64 {
        self.state.successes()
    }

    #[must_use]
    pub fn state(&self) -> &PolledState {
        &self.state
    }

    #[must_use]
    pub fn subscribe(&self) -> SnapshotReceiver {
        self.state.subscribe()
    }
}

impl<D: MiotDevice> Poller for UpdateCoordinator<D> {
    fn name(&self) -> &str {
        self.state.name()
    }

    fn poll(&self) -> impl Future<Output = Result<(), UpdateFailed>> + Send {
        self.refresh()
    }

    fn is_available(&self) -> bool {
        UpdateCoordinator::is_available(self)
    }

    fn current_snapshot(&self) -> Option<Arc<StatusSnapshot>> {
        UpdateCoordinator::current_snapshot(self)
    }

    fn subscribe(&self) -> SnapshotReceiver {
        UpdateCoordinator::subscribe(self)
    }
}
