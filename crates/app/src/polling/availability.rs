//! Consecutive-failure counting and the availability it implies.

use serde::Serialize;

/// Availability of an entity group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    /// No fetch has succeeded yet.
    #[default]
    Unknown,
    Available,
    Unavailable,
}

impl Availability {
    #[must_use]
    pub fn is_available(self) -> bool {
        matches!(self, Self::Available)
    }
}

/// What a failed fetch did to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Below the threshold: the previous state and snapshot are kept.
    Tolerated { retry: u32 },
    /// The threshold is reached: the group is now unavailable.
    Exhausted { retry: u32 },
}

impl FailureOutcome {
    #[must_use]
    pub fn retry(self) -> u32 {
        match self {
            Self::Tolerated { retry } | Self::Exhausted { retry } => retry,
        }
    }
}

/// Per-poller retry counter.
///
/// Availability is lost once `max_retries` consecutive fetches have failed
/// and comes back with the next successful fetch.
#[derive(Debug, Clone)]
pub struct RetryTracker {
    max_retries: u32,
    retry: u32,
    availability: Availability,
}

impl RetryTracker {
    /// Create a tracker. A maximum of zero is treated as one.
    #[must_use]
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries: max_retries.max(1),
            retry: 0,
            availability: Availability::Unknown,
        }
    }

    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Consecutive failures since the last success.
    #[must_use]
    pub fn retry(&self) -> u32 {
        self.retry
    }

    #[must_use]
    pub fn availability(&self) -> Availability {
        self.availability
    }

    /// Record a successful fetch and return the previous availability.
    pub fn record_success(&mut self) -> Availability {
        self.retry = 0;
        std::mem::replace(&mut self.availability, Availability::Available)
    }

    /// Record a failed fetch.
    pub fn record_failure(&mut self) -> FailureOutcome {
        self.retry = self.retry.saturating_add(1);
        if self.retry >= self.max_retries {
            self.availability = Availability::Unavailable;
            FailureOutcome::Exhausted { retry: self.retry }
        } else {
            FailureOutcome::Tolerated { retry: self.retry }
        }
    }

    /// Drop availability immediately, leaving the counter untouched.
    ///
    /// Returns `true` when this changed the availability.
    pub fn force_unavailable(&mut self) -> bool {
        let changed = self.availability != Availability::Unavailable;
        self.availability = Availability::Unavailable;
        changed
    }
}
