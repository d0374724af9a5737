//! # miotac-adapter-simulated
//!
//! In-memory air conditioners speaking the device-client ports, used by the
//! daemon's demo mode and by tests.
//!
//! ## Provided types
//!
//! | Type | Port | Behaviour |
//! |------|------|-----------|
//! | [`SimulatedAirConditioner`] | - | Holds a status, applies commands, drifts the room temperature towards the target |
//! | [`SimulatedLink`] | `MiotDevice` | Handle on one unit as seen from one `(host, token)` pair |
//! | [`SimulatedConnector`] | `DeviceConnector` | Resolves hosts to registered units |
//!
//! Unknown hosts answer with [`DeviceError::Unreachable`](miotac_domain::error::DeviceError::Unreachable)
//! and a wrong token with a timeout, the way a real unit silently drops
//! packets it cannot decrypt.
//!
//! ## Dependency rule
//!
//! Depends on `miotac-app` (port traits) and `miotac-domain` only.

mod connector;
mod device;

pub use connector::{SimulatedConnector, SimulatedLink};
pub use device::SimulatedAirConditioner;
