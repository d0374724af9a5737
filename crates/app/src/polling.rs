//! Status polling: retry counting, availability and scheduling.
//!
//! A poller fetches one [`StatusSnapshot`](miotac_domain::status::StatusSnapshot)
//! per tick. Failures are absorbed until the consecutive-failure count reaches
//! the configured maximum, at which point the poller reports unavailability.

pub mod availability;
pub mod coordinator;
pub mod scheduler;
pub mod state;

pub use availability::{Availability, FailureOutcome, RetryTracker};
pub use coordinator::{UpdateCoordinator, UpdateFailed};
pub use scheduler::{PollScheduler, Poller, spawn_state_publisher};
pub use state::PolledState;
